//! Scripted UART and clock doubles for wire-level tests
#![allow(dead_code)]

use std::collections::VecDeque;

use linmaster::driver::clock::Clock;
use linmaster::driver::time::{Duration, Instant};
use linmaster::driver::uart::{PortConfig, Uart};

/// UART double with transceiver-style loopback
///
/// Transmitted bytes are captured for assertions and, while `loopback` is on,
/// echoed into a dedicated queue that `read` drains before the injected
/// input. This reproduces the on-wire ordering of a half-duplex LIN
/// transceiver: the master always sees its own header before the slave's
/// response bytes, even when the whole response is scripted up front.
pub struct MockUart {
    pub loopback: bool,
    tx: Vec<u8>,
    rx: VecDeque<u8>,
    echo: VecDeque<u8>,
    began: bool,
    flushed: bool,
    baud: u32,
}

impl MockUart {
    pub fn new() -> Self {
        Self {
            loopback: true,
            tx: Vec::new(),
            rx: VecDeque::new(),
            echo: VecDeque::new(),
            began: false,
            flushed: true,
            baud: 0,
        }
    }

    /// Queues bytes the "slave" puts on the bus.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Everything the master transmitted, in order.
    pub fn tx_bytes(&self) -> &[u8] {
        &self.tx
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }
}

impl Uart for MockUart {
    fn begin(&mut self, config: &PortConfig) {
        assert!(!self.began, "double call of begin()");
        self.began = true;
        self.flushed = true;
        self.baud = config.baud;
    }

    fn end(&mut self) {
        assert!(self.began, "end() without begin()");
        assert!(self.flushed, "end() with undrained transmit buffer");
        self.began = false;
    }

    fn write(&mut self, byte: u8) -> usize {
        assert!(self.began, "write() without begin()");
        if self.loopback {
            self.echo.push_back(byte);
        }
        self.tx.push(byte);
        self.flushed = false;
        1
    }

    fn read(&mut self) -> Option<u8> {
        self.echo.pop_front().or_else(|| self.rx.pop_front())
    }

    fn available(&self) -> usize {
        self.echo.len() + self.rx.len()
    }

    fn flush(&mut self) {
        assert!(self.began, "flush() without begin()");
        self.flushed = true;
    }

    fn set_baud_rate(&mut self, baud: u32) {
        assert!(self.flushed, "baud change with undrained transmit buffer");
        self.baud = baud;
    }
}

/// Deterministic clock: a millisecond passes for every empty poll
pub struct MockClock {
    now: u32,
}

impl MockClock {
    pub fn new() -> Self {
        Self { now: 0 }
    }

    pub fn elapsed_ms(&self) -> u32 {
        self.now
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        Instant::from_ticks(self.now)
    }

    fn delay(&mut self, duration: Duration) {
        self.now += duration.ticks();
    }

    fn relax(&mut self) {
        self.now += 1;
    }
}
