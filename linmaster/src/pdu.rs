//! Diagnostic PDU carrier and its three frame layouts \[1; 3.2.1\]
//!
//! Every transport-layer message travels in eight-byte PDUs on the two
//! diagnostic frame slots. Byte 0 is the node address, byte 1 the protocol
//! control information, the remainder carries payload padded with 0xFF:
//!
//! ```text
//! Single frame       NAD | 0x0L       | up to 6 payload bytes, L = length
//! First frame        NAD | 0x1H  LL   | first 5 payload bytes, HLL = total length
//! Consecutive frame  NAD | 0x2S       | up to 6 payload bytes, S = sequence number
//! ```

use crate::core::Nad;
use crate::format::FILL_BYTE;

/// A PDU occupies the full data field of its carrier frame
pub const PDU_LENGTH: usize = 8;

/// The first-frame length field is 12 bits wide
pub const MAX_MESSAGE_LENGTH: usize = 0x0fff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PduError {
    /// Carrier size is not 8 bytes, a single-frame length exceeds 6, or a
    /// first-frame announcement fits a single frame
    Malformed,
    /// Consecutive frame did not carry the expected sequence number
    SequenceMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PciKind {
    SingleFrame,
    FirstFrame,
    ConsecutiveFrame,
}

/// Protocol control information byte \[1; 4.2.3.3\]
///
/// The high nibble selects the PDU kind, the low nibble carries the
/// kind-specific value: payload length (SF), length high bits (FF) or
/// sequence number (CF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pci(u8);

impl Pci {
    const KIND_MASK: u8 = 0xf0;
    const VALUE_MASK: u8 = 0x0f;

    const SINGLE: u8 = 0x00;
    const FIRST: u8 = 0x10;
    const CONSECUTIVE: u8 = 0x20;

    pub const fn kind(self) -> Option<PciKind> {
        match self.0 & Self::KIND_MASK {
            Self::SINGLE => Some(PciKind::SingleFrame),
            Self::FIRST => Some(PciKind::FirstFrame),
            Self::CONSECUTIVE => Some(PciKind::ConsecutiveFrame),
            _ => None,
        }
    }

    /// The kind-specific low nibble.
    pub const fn value(self) -> u8 {
        self.0 & Self::VALUE_MASK
    }

    const fn single(len: usize) -> Self {
        Self(Self::SINGLE | (len as u8 & Self::VALUE_MASK))
    }

    const fn first(total_length: usize) -> Self {
        Self(Self::FIRST | ((total_length >> 8) as u8 & Self::VALUE_MASK))
    }

    const fn consecutive(sequence: u8) -> Self {
        Self(Self::CONSECUTIVE | (sequence & Self::VALUE_MASK))
    }
}

impl From<u8> for Pci {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<Pci> for u8 {
    fn from(value: Pci) -> Self {
        value.0
    }
}

/// One eight-byte diagnostic carrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pdu([u8; PDU_LENGTH]);

impl Pdu {
    /// Payload capacity of a single frame
    pub const SINGLE_CAPACITY: usize = 6;
    /// Payload capacity of a first frame, one byte yields to the length field
    pub const FIRST_CAPACITY: usize = 5;
    /// Payload capacity of a consecutive frame
    pub const CONSECUTIVE_CAPACITY: usize = 6;

    /// Encodes a payload of at most six bytes into a single frame.
    pub fn single(nad: Nad, payload: &[u8]) -> Self {
        debug_assert!(payload.len() <= Self::SINGLE_CAPACITY);

        let mut bytes = [FILL_BYTE; PDU_LENGTH];
        bytes[0] = nad.into_u8();
        bytes[1] = Pci::single(payload.len()).into();
        bytes[2..2 + payload.len()].copy_from_slice(payload);
        Self(bytes)
    }

    /// Encodes the opening segment of a multi-frame message. `payload` is the
    /// whole message; its length is announced and its first five bytes are
    /// carried here.
    pub fn first(nad: Nad, payload: &[u8]) -> Self {
        debug_assert!(payload.len() > Self::SINGLE_CAPACITY);
        debug_assert!(payload.len() <= MAX_MESSAGE_LENGTH);

        let mut bytes = [FILL_BYTE; PDU_LENGTH];
        bytes[0] = nad.into_u8();
        bytes[1] = Pci::first(payload.len()).into();
        bytes[2] = payload.len() as u8;
        bytes[3..].copy_from_slice(&payload[..Self::FIRST_CAPACITY]);
        Self(bytes)
    }

    /// Encodes one continuation segment of at most six bytes.
    pub fn consecutive(nad: Nad, sequence: u8, payload: &[u8]) -> Self {
        debug_assert!(payload.len() <= Self::CONSECUTIVE_CAPACITY);

        let mut bytes = [FILL_BYTE; PDU_LENGTH];
        bytes[0] = nad.into_u8();
        bytes[1] = Pci::consecutive(sequence).into();
        bytes[2..2 + payload.len()].copy_from_slice(payload);
        Self(bytes)
    }

    /// The go-to-sleep command PDU \[1; 2.6.3\]
    pub const fn go_to_sleep() -> Self {
        let mut bytes = [FILL_BYTE; PDU_LENGTH];
        bytes[0] = Nad::SLEEP.into_u8();
        Self(bytes)
    }

    pub fn nad(&self) -> Nad {
        Nad::new(self.0[0])
    }

    pub fn pci(&self) -> Pci {
        Pci::from(self.0[1])
    }

    pub fn as_bytes(&self) -> &[u8; PDU_LENGTH] {
        &self.0
    }

    /// Payload of a single frame. Rejects a declared length above the
    /// single-frame capacity.
    pub fn decode_single(&self) -> Result<&[u8], PduError> {
        let len = usize::from(self.pci().value());
        if len > Self::SINGLE_CAPACITY {
            debug!("pdu: single frame declares {} bytes", len);
            return Err(PduError::Malformed);
        }
        Ok(&self.0[2..2 + len])
    }

    /// Announced total length and the five payload bytes of a first frame.
    /// Rejects an announcement that would have fit a single frame.
    pub fn decode_first(&self) -> Result<(usize, &[u8]), PduError> {
        let announced = usize::from(self.pci().value()) << 8 | usize::from(self.0[2]);
        if announced <= Self::SINGLE_CAPACITY {
            debug!("pdu: first frame announces only {} bytes", announced);
            return Err(PduError::Malformed);
        }
        Ok((announced, &self.0[3..]))
    }

    /// The six payload positions of a consecutive frame, provided its
    /// sequence number is the expected one (compared modulo 16). The caller
    /// knows how many of the returned bytes are payload rather than fill.
    pub fn decode_consecutive(&self, expected_sequence: u8) -> Result<&[u8], PduError> {
        if self.pci().value() != expected_sequence & Pci::VALUE_MASK {
            debug!(
                "pdu: sequence number {} received, {} expected",
                self.pci().value(),
                expected_sequence & Pci::VALUE_MASK
            );
            return Err(PduError::SequenceMismatch);
        }
        Ok(&self.0[2..])
    }
}

impl TryFrom<&[u8]> for Pdu {
    type Error = PduError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; PDU_LENGTH] = value.try_into().map_err(|_| PduError::Malformed)?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_round_trip() {
        let pdu = Pdu::single(Nad::new(0x0a), &[0x22, 0x06, 0x2e]);
        assert_eq!(
            pdu.as_bytes(),
            &[0x0a, 0x03, 0x22, 0x06, 0x2e, 0xff, 0xff, 0xff]
        );
        assert_eq!(pdu.nad(), Nad::new(0x0a));
        assert_eq!(pdu.pci().kind(), Some(PciKind::SingleFrame));
        assert_eq!(pdu.decode_single().unwrap(), &[0x22, 0x06, 0x2e]);
    }

    #[test]
    fn test_single_full_capacity() {
        let pdu = Pdu::single(Nad::new(0x0a), &[0x22, 0x06, 0x2e, 0x87, 0x47, 0x41]);
        assert_eq!(
            pdu.as_bytes(),
            &[0x0a, 0x06, 0x22, 0x06, 0x2e, 0x87, 0x47, 0x41]
        );
    }

    #[test]
    fn test_single_rejects_overlength() {
        let pdu = Pdu::try_from([0x0a, 0x07, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06].as_slice());
        assert_eq!(pdu.unwrap().decode_single(), Err(PduError::Malformed));
    }

    #[test]
    fn test_first_round_trip() {
        let payload: [u8; 20] = core::array::from_fn(|i| i as u8);
        let pdu = Pdu::first(Nad::new(0x0a), &payload);
        assert_eq!(
            pdu.as_bytes(),
            &[0x0a, 0x10, 0x14, 0x00, 0x01, 0x02, 0x03, 0x04]
        );

        let (announced, head) = pdu.decode_first().unwrap();
        assert_eq!(announced, 20);
        assert_eq!(head, &payload[..5]);
    }

    #[test]
    fn test_first_length_high_bits() {
        let payload = [0xab; 0x123];
        let pdu = Pdu::first(Nad::new(0x01), &payload);
        assert_eq!(pdu.as_bytes()[1], 0x11);
        assert_eq!(pdu.as_bytes()[2], 0x23);
        assert_eq!(pdu.decode_first().unwrap().0, 0x123);
    }

    #[test]
    fn test_first_rejects_single_frame_length() {
        let pdu = Pdu::try_from([0x0a, 0x10, 0x06, 0x01, 0x02, 0x03, 0x04, 0x05].as_slice());
        assert_eq!(pdu.unwrap().decode_first(), Err(PduError::Malformed));
    }

    #[test]
    fn test_consecutive_round_trip() {
        let pdu = Pdu::consecutive(Nad::new(0x0a), 3, &[0x01, 0x02, 0x03]);
        assert_eq!(
            pdu.as_bytes(),
            &[0x0a, 0x23, 0x01, 0x02, 0x03, 0xff, 0xff, 0xff]
        );
        assert_eq!(
            pdu.decode_consecutive(3).unwrap(),
            &[0x01, 0x02, 0x03, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn test_consecutive_sequence_wraps() {
        let pdu = Pdu::consecutive(Nad::new(0x0a), 0x11, &[0x01]);
        assert_eq!(pdu.as_bytes()[1], 0x21);
        assert!(pdu.decode_consecutive(0x01).is_ok());
        assert!(pdu.decode_consecutive(0x21).is_ok());
        assert_eq!(
            pdu.decode_consecutive(0x02),
            Err(PduError::SequenceMismatch)
        );
    }

    #[test]
    fn test_go_to_sleep_layout() {
        assert_eq!(
            Pdu::go_to_sleep().as_bytes(),
            &[0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn test_carrier_size() {
        assert!(Pdu::try_from([0u8; 7].as_slice()).is_err());
        assert!(Pdu::try_from([0u8; 9].as_slice()).is_err());
        assert!(Pdu::try_from([0u8; 8].as_slice()).is_ok());
    }
}
