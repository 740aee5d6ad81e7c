//! On-wire frame field constants and checksum computation

use crate::core::{FrameId, Pid};

/// Break field stand-in byte, transmitted at half the configured baud rate
/// so that its eight data bits cover at least 13 nominal bit times \[1; 2.8.1\]
pub const BREAK_BYTE: u8 = 0x00;
/// Sync field, alternating bit pattern for slave baud calibration \[1; 2.3.1.2\]
pub const SYNC_BYTE: u8 = 0x55;
/// Value of unused PDU positions
pub const FILL_BYTE: u8 = 0xff;
/// A frame carries at most eight data bytes \[1; 2.3.1.4\]
pub const MAX_FRAME_DATA: usize = 8;

/// Checksum model selection \[1; 2.3.1.5\]
///
/// LIN 2.x frames use the enhanced checksum, which covers the protected
/// identifier, except for the diagnostic frames 0x3C/0x3D which keep the
/// classic data-only checksum for LIN 1.x interoperability. The reserved
/// identifiers 0x3E/0x3F fall into the classic range as well; they shall not
/// appear on a LIN 2.x bus, so no further distinction is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChecksumModel {
    Classic,
    Enhanced,
}

impl ChecksumModel {
    pub const fn for_frame_id(id: FrameId) -> Self {
        if id.is_diagnostic() {
            ChecksumModel::Classic
        } else {
            ChecksumModel::Enhanced
        }
    }

    /// Initial accumulator value: the protected identifier for the enhanced
    /// model, zero for the classic model.
    pub const fn seed(self, pid: Pid) -> u8 {
        match self {
            ChecksumModel::Classic => 0x00,
            ChecksumModel::Enhanced => pid.into_u8(),
        }
    }
}

/// Inverted-eight-bit-sum checksum with carry add-back \[1; 2.8.3\]
///
/// Every carry out of the low byte is folded back in, so the running value
/// never exceeds eight significant bits and the accumulator cannot overflow
/// regardless of input length.
#[derive(Debug, Clone, Copy)]
pub struct Checksum(u16);

impl Checksum {
    pub const fn new(seed: u8) -> Self {
        Self(seed as u16)
    }

    pub fn add(&mut self, byte: u8) {
        let sum = self.0 + u16::from(byte);
        self.0 = (sum & 0xff) + (sum >> 8);
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) {
        bytes.iter().for_each(|&byte| self.add(byte));
    }

    pub fn get(&self) -> u8 {
        let folded = (self.0 & 0xff) + (self.0 >> 8);
        !(folded as u8)
    }
}

/// Checksum over a complete frame body as the receiver computes it.
pub fn frame_checksum(pid: Pid, data: &[u8]) -> u8 {
    let model = ChecksumModel::for_frame_id(pid.frame_id());
    let mut checksum = Checksum::new(model.seed(pid));
    checksum.add_bytes(data);
    checksum.get()
}
