//! LIN protocol core data types
//!
//! This crate provides basic data type definitions used by other linmaster crates.
//! Linmaster users should not depend on this crate directly. Use the `linmaster::core`
//! reexport instead.
//!
//! # References:
//!
//! * \[1\] LIN Specification 2.2A
//!   <https://www.lin-cia.org/fileadmin/microsites/lin-cia.org/resources/documents/LIN_2.2A.pdf>
#![no_std]

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue;

/// Frame identifier \[1; 2.3.1.2\]
///
/// A 6-bit value selecting the frame slot. 0x00-0x3B carry regular signal
/// frames, 0x3C and 0x3D carry diagnostic and configuration data, 0x3E and
/// 0x3F are reserved for future protocol enhancements.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameId(u8);

impl FrameId {
    const MAX_VALUE: u8 = 0x3f;
    pub const MAX: FrameId = FrameId(Self::MAX_VALUE);

    /// Master request frame, carries transport-layer PDUs from the master \[1; 2.3.3.3\]
    pub const MASTER_REQUEST: FrameId = FrameId(0x3c);
    /// Slave response frame, carries transport-layer PDUs from a slave \[1; 2.3.3.3\]
    pub const SLAVE_RESPONSE: FrameId = FrameId(0x3d);

    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX_VALUE {
            Some(Self::from_u8_truncating(value))
        } else {
            None
        }
    }

    pub const fn from_u8_truncating(value: u8) -> Self {
        Self(value & Self::MAX_VALUE)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }

    /// Whether the frame is in the diagnostic/reserved range (0x3C and above).
    ///
    /// These frames use the classic checksum model \[1; 2.3.1.5\].
    pub const fn is_diagnostic(self) -> bool {
        self.0 >= Self::MASTER_REQUEST.0
    }
}

impl From<FrameId> for u8 {
    fn from(value: FrameId) -> Self {
        value.into_u8()
    }
}

impl From<FrameId> for usize {
    fn from(value: FrameId) -> Self {
        u8::from(value).into()
    }
}

impl TryFrom<u8> for FrameId {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// Protected identifier \[1; 2.3.1.3\]
///
/// The frame identifier in bits 0-5 plus two parity bits:
/// * `p0 = id0 ^ id1 ^ id2 ^ id4` in bit 6
/// * `p1 = !(id1 ^ id3 ^ id4 ^ id5)` in bit 7
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pid(u8);

impl Pid {
    /// Computes the parity bits and combines them with the frame identifier.
    pub const fn from_frame_id(id: FrameId) -> Self {
        let fid = id.into_u8();
        let p0 = (fid ^ (fid >> 1) ^ (fid >> 2) ^ (fid >> 4)) & 0x1;
        let p1 = !((fid >> 1) ^ (fid >> 3) ^ (fid >> 4) ^ (fid >> 5)) & 0x1;
        Self((p1 << 7) | (p0 << 6) | fid)
    }

    /// Accepts a raw byte only if its parity bits are consistent.
    pub const fn new(value: u8) -> Option<Self> {
        let candidate = Self::from_frame_id(FrameId::from_u8_truncating(value));
        if candidate.0 == value { Some(candidate) } else { None }
    }

    pub const fn frame_id(self) -> FrameId {
        FrameId::from_u8_truncating(self.0)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }
}

impl From<FrameId> for Pid {
    fn from(value: FrameId) -> Self {
        Self::from_frame_id(value)
    }
}

impl From<Pid> for u8 {
    fn from(value: Pid) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for Pid {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// Node address \[1; 4.2.3.2\]
///
/// The full byte range is meaningful on the wire:
/// * 0x00 reserved for the go-to-sleep command
/// * 0x01-0x7D regular slave node addresses
/// * 0x7E functional (diagnostic) address
/// * 0x7F broadcast, used by the master as a wildcard
/// * 0x80-0xFF free usage
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Nad(u8);

impl Nad {
    /// Go-to-sleep target \[1; 2.6.3\]
    pub const SLEEP: Nad = Nad(0x00);
    /// Functional node address, diagnostics only
    pub const FUNCTIONAL: Nad = Nad(0x7e);
    /// Broadcast address; also acts as a wildcard in configuration requests
    pub const BROADCAST: Nad = Nad(0x7f);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }

    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0
    }

    /// Whether the address names a single regular slave node (0x01-0x7D).
    pub const fn is_slave_address(self) -> bool {
        self.0 >= 0x01 && self.0 <= 0x7d
    }
}

impl From<u8> for Nad {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Nad> for u8 {
    fn from(value: Nad) -> Self {
        value.into_u8()
    }
}

/// Negative response code carried in a 0x7F-prefixed diagnostic response \[1; table 4.21\]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Nrc {
    GeneralReject = 0x10,
    ServiceNotSupported = 0x11,
    SubfunctionNotSupported = 0x12,
    IncorrectMessageLengthOrInvalidFormat = 0x13,
    ResponseTooLong = 0x14,
    BusyRepeatRequest = 0x21,
    ConditionsNotCorrect = 0x22,
    RequestOutOfRange = 0x31,
    SecurityAccessDenied = 0x33,
    InvalidKey = 0x35,
}

impl Nrc {
    pub const fn try_from_u8(code: u8) -> Option<Nrc> {
        match code {
            0x10 => Some(Nrc::GeneralReject),
            0x11 => Some(Nrc::ServiceNotSupported),
            0x12 => Some(Nrc::SubfunctionNotSupported),
            0x13 => Some(Nrc::IncorrectMessageLengthOrInvalidFormat),
            0x14 => Some(Nrc::ResponseTooLong),
            0x21 => Some(Nrc::BusyRepeatRequest),
            0x22 => Some(Nrc::ConditionsNotCorrect),
            0x31 => Some(Nrc::RequestOutOfRange),
            0x33 => Some(Nrc::SecurityAccessDenied),
            0x35 => Some(Nrc::InvalidKey),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Nrc::GeneralReject => "general reject",
            Nrc::ServiceNotSupported => "service not supported",
            Nrc::SubfunctionNotSupported => "subfunction not supported",
            Nrc::IncorrectMessageLengthOrInvalidFormat => "incorrect message length or invalid format",
            Nrc::ResponseTooLong => "response too long",
            Nrc::BusyRepeatRequest => "busy repeat request",
            Nrc::ConditionsNotCorrect => "conditions not correct",
            Nrc::RequestOutOfRange => "request out of range",
            Nrc::SecurityAccessDenied => "security access denied",
            Nrc::InvalidKey => "invalid key",
        }
    }
}

impl From<Nrc> for u8 {
    fn from(value: Nrc) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for Nrc {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}
