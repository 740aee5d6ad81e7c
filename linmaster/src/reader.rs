//! Byte-at-a-time frame reception state machine

use heapless::Vec;

use crate::core::Pid;
use crate::format::{frame_checksum, BREAK_BYTE, MAX_FRAME_DATA, SYNC_BYTE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum State {
    WaitForBreak,
    WaitForSync,
    WaitForPid,
    WaitForData,
    WaitForChecksum,
    FrameComplete,
}

/// Recognizes one frame addressed by a known protected identifier
///
/// The reader consumes the byte stream one byte at a time and silently
/// returns to `WaitForBreak` on any deviation: a sync or PID byte that does
/// not match, or a checksum mismatch at the end. Bytes preceding the break
/// are discarded without a state change, so bus noise before the frame is
/// harmless. The reader owns no notion of time; the caller bounds the whole
/// reception with a deadline.
///
/// An `expected_len` of zero observes only the frame header. The caller polls
/// [`FrameReader::has_header`] instead of [`FrameReader::is_complete`]; this
/// is how the echo of a request-only frame is consumed, since no data or
/// checksum follows on the wire.
#[derive(Debug)]
pub struct FrameReader {
    state: State,
    pid: Pid,
    expected_len: usize,
    data: Vec<u8, MAX_FRAME_DATA>,
}

impl FrameReader {
    pub fn new(pid: Pid, expected_len: usize) -> Self {
        debug_assert!(expected_len <= MAX_FRAME_DATA);
        Self {
            state: State::WaitForBreak,
            pid,
            expected_len,
            data: Vec::new(),
        }
    }

    fn reset(&mut self) {
        trace!("frame reader: reset");
        self.state = State::WaitForBreak;
        self.data.clear();
    }

    /// Break, sync and PID have been observed.
    pub fn has_header(&self) -> bool {
        self.state >= State::WaitForData
    }

    pub fn is_complete(&self) -> bool {
        self.state == State::FrameComplete
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8, MAX_FRAME_DATA> {
        self.data
    }

    pub fn process_byte(&mut self, byte: u8) {
        match self.state {
            State::WaitForBreak => {
                if byte == BREAK_BYTE {
                    self.state = State::WaitForSync;
                }
            }

            State::WaitForSync => {
                if byte == SYNC_BYTE {
                    self.state = State::WaitForPid;
                } else {
                    self.reset();
                }
            }

            State::WaitForPid => {
                if byte == self.pid.into_u8() {
                    self.state = State::WaitForData;
                } else {
                    self.reset();
                }
            }

            State::WaitForData => {
                unwrap!(self.data.push(byte));
                if self.data.len() >= self.expected_len {
                    self.state = State::WaitForChecksum;
                }
            }

            State::WaitForChecksum => {
                let expected = frame_checksum(self.pid, &self.data);
                if byte == expected {
                    trace!("frame reader: frame valid, pid {:02x}", self.pid.into_u8());
                    self.state = State::FrameComplete;
                } else {
                    debug!(
                        "frame reader: checksum mismatch, received {:02x}, expected {:02x}",
                        byte, expected
                    );
                    self.reset();
                }
            }

            State::FrameComplete => {}
        }
    }
}
