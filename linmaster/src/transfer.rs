//! Frame transfer layer: emits and receives complete LIN frames
//!
//! One call, one bus transaction. [`FrameTransfer::write_frame`] puts a frame
//! on the wire and, because the transceiver echoes every transmitted byte on
//! the receive line, can read the frame back and verify it arrived undamaged.
//! [`FrameTransfer::read_frame`] transmits only the frame header and collects
//! the response a slave publishes into the slot.

use heapless::Vec;

use crate::core::{FrameId, Pid};
use crate::driver::clock::Clock;
use crate::driver::time::{Duration, Instant};
use crate::driver::uart::{PortConfig, Uart};
use crate::format::{frame_checksum, BREAK_BYTE, MAX_FRAME_DATA, SYNC_BYTE};
use crate::reader::FrameReader;

/// Maximum duration of one frame slot, break through checksum \[1; table 3.2\]
pub const FRAME_TIMEOUT: Duration = Duration::millis(50);

/// Quiet period after the wake-up pulse before the cluster is addressable \[1; 2.6.2\]
const WAKEUP_DELAY: Duration = Duration::millis(100);

/// Break, sync and protected identifier
const HEADER_LENGTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// No valid frame was observed within the frame slot. Frames dropped for
    /// a sync, PID or checksum mismatch end up here as well, since the reader
    /// resets silently and waits for another attempt.
    Timeout,
    /// The loopback echo of a transmitted frame differs from what was sent.
    ReadbackMismatch,
    /// A frame carries at most eight data bytes.
    DataTooLong,
}

/// Per-instance configuration of the transfer layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub baud: u32,
    pub rx_pin: Option<u8>,
    pub tx_pin: Option<u8>,
    /// Read the echo of every transmitted frame back and fail the write on a
    /// mismatch. Requires transceiver loopback; half-duplex LIN hardware
    /// provides it inherently.
    pub verify_readback: bool,
    /// Discard the echo without verification. Only consulted when
    /// `verify_readback` is off.
    pub drain_readback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baud: 19_200,
            rx_pin: None,
            tx_pin: None,
            verify_readback: true,
            drain_readback: false,
        }
    }
}

impl Config {
    fn port(&self) -> PortConfig {
        PortConfig {
            baud: self.baud,
            rx_pin: self.rx_pin,
            tx_pin: self.tx_pin,
        }
    }
}

/// Frame-level bus access as the transport layer consumes it
///
/// The seam between frame mechanics and transport policy; the transport layer
/// is written against this trait so it can be exercised without a UART.
pub trait FrameLink {
    /// Transmits a complete frame, or only the header when `data` is empty.
    fn write_frame(&mut self, id: FrameId, data: &[u8]) -> Result<(), FrameError>;

    /// Transmits the frame header and receives `expected_len` data bytes
    /// published by a slave.
    fn read_frame(
        &mut self,
        id: FrameId,
        expected_len: usize,
    ) -> Result<Vec<u8, MAX_FRAME_DATA>, FrameError>;

    /// Wake-up pulse followed by the mandated quiet period.
    fn send_wakeup(&mut self);

    /// Current instant of the link's timebase.
    fn now(&self) -> Instant;
}

/// Master-side frame transmission and reception over a UART
pub struct FrameTransfer<U, C> {
    uart: U,
    clock: C,
    config: Config,
}

impl<U: Uart, C: Clock> FrameTransfer<U, C> {
    pub fn new(uart: U, clock: C, config: Config) -> Self {
        Self {
            uart,
            clock,
            config,
        }
    }

    /// Opens the serial port with the configured baud rate and pins.
    pub fn begin(&mut self) {
        self.uart.begin(&self.config.port());
    }

    /// Closes the serial port.
    pub fn end(&mut self) {
        self.uart.end();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn release(self) -> (U, C) {
        (self.uart, self.clock)
    }

    /// Transmits one frame and verifies or drains the loopback echo per the
    /// configuration. Empty `data` sends a request-only frame: break, sync
    /// and PID without data or checksum.
    pub fn write_frame(&mut self, id: FrameId, data: &[u8]) -> Result<(), FrameError> {
        if data.len() > MAX_FRAME_DATA {
            return Err(FrameError::DataTooLong);
        }
        if data.is_empty() {
            return self.write_empty_frame(id);
        }

        let pid = Pid::from_frame_id(id);
        self.write_header(pid);
        for &byte in data {
            self.uart.write(byte);
        }
        self.uart.write(frame_checksum(pid, data));
        self.uart.flush();

        if self.config.verify_readback {
            let echo = self.receive_frame(pid, data.len())?;
            if echo.as_slice() != data {
                warn!("write frame {:02x}: readback mismatch", id.into_u8());
                return Err(FrameError::ReadbackMismatch);
            }
        } else if self.config.drain_readback {
            self.drain(HEADER_LENGTH + data.len() + 1);
        }

        Ok(())
    }

    fn write_empty_frame(&mut self, id: FrameId) -> Result<(), FrameError> {
        let pid = Pid::from_frame_id(id);
        self.write_header(pid);
        self.uart.flush();

        if self.config.verify_readback {
            self.receive_header(pid)?;
        } else if self.config.drain_readback {
            self.drain(HEADER_LENGTH);
        }

        Ok(())
    }

    /// Requests a frame slot and receives the slave's response body.
    ///
    /// The header is transmitted by the master; data bytes and checksum are
    /// expected from the addressed slave within the frame slot.
    pub fn read_frame(
        &mut self,
        id: FrameId,
        expected_len: usize,
    ) -> Result<Vec<u8, MAX_FRAME_DATA>, FrameError> {
        if expected_len > MAX_FRAME_DATA {
            return Err(FrameError::DataTooLong);
        }

        let pid = Pid::from_frame_id(id);
        self.write_header(pid);
        self.uart.flush();

        self.receive_frame(pid, expected_len)
    }

    /// Holds the bus dominant long enough to wake sleeping nodes, then waits
    /// out the period in which slaves initialize \[1; 2.6.2\].
    pub fn send_wakeup(&mut self) {
        self.send_break();
        self.clock.delay(WAKEUP_DELAY);
    }

    /// Generates the break field.
    ///
    /// A 0x00 byte at half the configured baud rate keeps the line dominant
    /// for 18 nominal bit times, which satisfies the 13-bit-time minimum, and
    /// its stop bit provides the recessive delimiter.
    fn send_break(&mut self) {
        self.uart.flush();
        self.uart.set_baud_rate(self.config.baud / 2);
        self.uart.write(BREAK_BYTE);
        self.uart.flush();
        self.uart.set_baud_rate(self.config.baud);
    }

    fn write_header(&mut self, pid: Pid) {
        self.send_break();
        self.uart.write(SYNC_BYTE);
        self.uart.write(pid.into_u8());
    }

    fn receive_frame(
        &mut self,
        pid: Pid,
        expected_len: usize,
    ) -> Result<Vec<u8, MAX_FRAME_DATA>, FrameError> {
        let mut reader = FrameReader::new(pid, expected_len);
        let deadline = self.clock.now() + FRAME_TIMEOUT;

        while self.clock.now() < deadline && !reader.is_complete() {
            if self.uart.available() == 0 {
                self.clock.relax();
                continue;
            }
            if let Some(byte) = self.uart.read() {
                reader.process_byte(byte);
            }
        }

        if !reader.is_complete() {
            debug!("read frame {:02x}: no valid frame received", pid.into_u8());
            return Err(FrameError::Timeout);
        }

        Ok(reader.into_data())
    }

    fn receive_header(&mut self, pid: Pid) -> Result<(), FrameError> {
        let mut reader = FrameReader::new(pid, 0);
        let deadline = self.clock.now() + FRAME_TIMEOUT;

        while self.clock.now() < deadline && !reader.has_header() {
            if self.uart.available() == 0 {
                self.clock.relax();
                continue;
            }
            if let Some(byte) = self.uart.read() {
                reader.process_byte(byte);
            }
        }

        if !reader.has_header() {
            debug!("read header {:02x}: no frame head received", pid.into_u8());
            return Err(FrameError::Timeout);
        }

        Ok(())
    }

    fn drain(&mut self, count: usize) {
        for _ in 0..count {
            if self.uart.read().is_none() {
                break;
            }
        }
    }
}

impl<U: Uart, C: Clock> FrameLink for FrameTransfer<U, C> {
    fn write_frame(&mut self, id: FrameId, data: &[u8]) -> Result<(), FrameError> {
        FrameTransfer::write_frame(self, id, data)
    }

    fn read_frame(
        &mut self,
        id: FrameId,
        expected_len: usize,
    ) -> Result<Vec<u8, MAX_FRAME_DATA>, FrameError> {
        FrameTransfer::read_frame(self, id, expected_len)
    }

    fn send_wakeup(&mut self) {
        FrameTransfer::send_wakeup(self)
    }

    fn now(&self) -> Instant {
        self.clock.now()
    }
}
