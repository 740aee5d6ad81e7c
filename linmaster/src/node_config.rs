//! Node configuration and identification services \[1; 4.2.5, 4.2.6\]
//!
//! Every service follows the same shape: marshal `[SID, arguments...]` into a
//! transport-layer request, exchange it with the addressed node and validate
//! the response. A positive response opens with `RSID = SID | 0x40`; a
//! negative response opens with 0x7F followed by the echoed SID and a
//! negative response code.
//!
//! Wake-up and go-to-sleep are bus management commands rather than
//! configuration services; they are exposed here for completeness of the
//! master-side surface and delegate straight to the lower layers.

use heapless::Vec;

use crate::core::{Nad, Nrc};
use crate::pdu::Pdu;
use crate::transport::{PduTransport, TransportError};

/// Matches any supplier in identification and assignment requests \[1; 4.2.1\]
pub const SUPPLIER_ID_WILDCARD: u16 = 0x7fff;
/// Matches any function in identification and assignment requests \[1; 4.2.1\]
pub const FUNCTION_ID_WILDCARD: u16 = 0x3fff;

/// First payload byte of a negative response
const NEGATIVE_RESPONSE: u8 = 0x7f;

/// Response service identifier offset
const RSID_OFFSET: u8 = 0x40;

/// Largest response message a configuration service accepts
const RESPONSE_CAPACITY: usize = 64;

/// Node configuration service identifiers \[1; 4.2.3.5\]
///
/// 0xB1 was retired with LIN 2.0, 0xB4 and 0xB5 are not issued by this
/// master; the variants document the full reserved range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ServiceId {
    AssignNad = 0xb0,
    AssignFrameId = 0xb1,
    ReadById = 0xb2,
    ConditionalChangeNad = 0xb3,
    DataDump = 0xb4,
    AssignNadViaSnpd = 0xb5,
    SaveConfiguration = 0xb6,
    AssignFrameIdRange = 0xb7,
}

impl ServiceId {
    pub const fn into_u8(self) -> u8 {
        self as u8
    }

    pub const fn rsid(self) -> u8 {
        self.into_u8() | RSID_OFFSET
    }
}

/// Property identifiers of the read-by-identifier service \[1; table 4.19\]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Identifier {
    ProductId = 0x00,
    SerialNumber = 0x01,
}

impl Identifier {
    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceError {
    /// The exchange below the service layer failed
    Transport(TransportError),
    /// Response opened with neither the expected RSID nor 0x7F
    UnexpectedRsid,
    /// The node rejected the request; the raw negative response code is
    /// preserved
    NegativeResponse(u8),
    /// Positive response too short for the requested property
    ResponseTooShort,
}

impl From<TransportError> for ServiceError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

/// LIN product identification \[1; 4.2.1\]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProductId {
    pub supplier: u16,
    pub function: u16,
    pub variant: u8,
}

/// Master-side issuer of node configuration services
pub struct NodeConfig<T> {
    transport: T,
}

impl<T: PduTransport> NodeConfig<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn release(self) -> T {
        self.transport
    }

    /// Wakes a sleeping cluster \[1; 2.6.2\].
    pub fn request_wakeup(&mut self) {
        self.transport.send_wakeup();
    }

    /// Requests all nodes to enter sleep mode \[1; 2.6.3\].
    pub fn request_go_to_sleep(&mut self) -> Result<(), ServiceError> {
        self.transport.send_go_to_sleep()?;
        Ok(())
    }

    /// Assigns a new node address, selecting the target by its product
    /// identification \[1; 4.2.5.1\]. The response still arrives under the
    /// initial address.
    pub fn assign_nad(
        &mut self,
        nad: &mut Nad,
        supplier_id: u16,
        function_id: u16,
        new_nad: Nad,
    ) -> Result<(), ServiceError> {
        let supplier = supplier_id.to_le_bytes();
        let function = function_id.to_le_bytes();
        let request = [
            ServiceId::AssignNad.into_u8(),
            supplier[0],
            supplier[1],
            function[0],
            function[1],
            new_nad.into_u8(),
        ];

        let mut response = [0; RESPONSE_CAPACITY];
        self.exchange(nad, &request, None, &mut response)?;
        Ok(())
    }

    /// Reads one identification property, returning the up-to-five raw bytes
    /// behind the RSID \[1; 4.2.6.1\]. Identifiers 32-63 address user-defined
    /// properties.
    pub fn read_by_id(
        &mut self,
        nad: &mut Nad,
        id: u8,
        supplier_id: u16,
        function_id: u16,
    ) -> Result<Vec<u8, 5>, ServiceError> {
        let supplier = supplier_id.to_le_bytes();
        let function = function_id.to_le_bytes();
        let request = [
            ServiceId::ReadById.into_u8(),
            id,
            supplier[0],
            supplier[1],
            function[0],
            function[1],
        ];

        let mut response = [0; RESPONSE_CAPACITY];
        let response = self.exchange(nad, &request, None, &mut response)?;
        let end = response.len().min(Pdu::SINGLE_CAPACITY);
        Ok(unwrap!(Vec::from_slice(&response[1..end])))
    }

    /// Reads supplier, function and variant of a node \[1; 4.2.6.1\]. Both
    /// the address and the two identifiers accept their wildcard values, so a
    /// single connected node can be identified without prior knowledge.
    pub fn read_product_id(
        &mut self,
        nad: &mut Nad,
        supplier_id: u16,
        function_id: u16,
    ) -> Result<ProductId, ServiceError> {
        let raw = self.read_by_id(nad, Identifier::ProductId.into_u8(), supplier_id, function_id)?;
        if raw.len() < 5 {
            return Err(ServiceError::ResponseTooShort);
        }

        Ok(ProductId {
            supplier: u16::from_le_bytes([raw[0], raw[1]]),
            function: u16::from_le_bytes([raw[2], raw[3]]),
            variant: raw[4],
        })
    }

    /// Reads the optional 32-bit serial number of a node \[1; 4.2.6.1\].
    pub fn read_serial_number(
        &mut self,
        nad: &mut Nad,
        supplier_id: u16,
        function_id: u16,
    ) -> Result<u32, ServiceError> {
        let raw = self.read_by_id(
            nad,
            Identifier::SerialNumber.into_u8(),
            supplier_id,
            function_id,
        )?;
        if raw.len() < 4 {
            return Err(ServiceError::ResponseTooShort);
        }

        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Changes the node address only if a property test passes on the slave
    /// \[1; 4.2.5.2\]: it extracts data byte `byte` (1-based) of the property
    /// selected by `id`, XORs it with `invert`, ANDs it with `mask`, and
    /// applies `new_nad` when the result is zero. The reply arrives under the
    /// new address; on success the caller's `nad` is updated to it.
    pub fn conditional_change_nad(
        &mut self,
        nad: &mut Nad,
        id: u8,
        byte: u8,
        mask: u8,
        invert: u8,
        new_nad: Nad,
    ) -> Result<(), ServiceError> {
        let request = [
            ServiceId::ConditionalChangeNad.into_u8(),
            id,
            byte,
            mask,
            invert,
            new_nad.into_u8(),
        ];

        let mut response = [0; RESPONSE_CAPACITY];
        self.exchange(nad, &request, Some(new_nad), &mut response)?;
        Ok(())
    }

    /// Requests the node to persist its current configuration \[1; 4.2.5.4\].
    pub fn save_configuration(&mut self, nad: &mut Nad) -> Result<(), ServiceError> {
        let request = [ServiceId::SaveConfiguration.into_u8()];

        let mut response = [0; RESPONSE_CAPACITY];
        self.exchange(nad, &request, None, &mut response)?;
        Ok(())
    }

    /// Assigns protected identifiers to four consecutive frame slots starting
    /// at `start_index` \[1; 4.2.5.5\]. A PID byte of 0x00 unassigns the
    /// slot, 0xFF leaves it untouched; neither is a valid PID on its own.
    pub fn assign_frame_id_range(
        &mut self,
        nad: &mut Nad,
        start_index: u8,
        pids: &[u8; 4],
    ) -> Result<(), ServiceError> {
        let request = [
            ServiceId::AssignFrameIdRange.into_u8(),
            start_index,
            pids[0],
            pids[1],
            pids[2],
            pids[3],
        ];

        let mut response = [0; RESPONSE_CAPACITY];
        self.exchange(nad, &request, None, &mut response)?;
        Ok(())
    }

    /// Runs one request/response exchange and validates the response opening.
    fn exchange<'r>(
        &mut self,
        nad: &mut Nad,
        request: &[u8],
        new_nad: Option<Nad>,
        response: &'r mut [u8],
    ) -> Result<&'r [u8], ServiceError> {
        let sid = request[0];
        let length = self.transport.write_pdu(nad, request, new_nad, response)?;
        let response = &response[..length];

        if response.first() == Some(&(sid | RSID_OFFSET)) {
            return Ok(response);
        }

        if response.len() >= 3 && response[0] == NEGATIVE_RESPONSE {
            let code = response[2];
            match Nrc::try_from_u8(code) {
                Some(nrc) => warn!(
                    "service {:02x} rejected: {} ({:02x})",
                    response[1],
                    nrc.name(),
                    code
                ),
                None => warn!(
                    "service {:02x} rejected: unknown code {:02x}",
                    response[1], code
                ),
            }
            return Err(ServiceError::NegativeResponse(code));
        }

        warn!("service {:02x}: unexpected rsid", sid);
        Err(ServiceError::UnexpectedRsid)
    }
}
