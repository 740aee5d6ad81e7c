//! Diagnostic transport layer \[1; 3.2\]
//!
//! Segments a request payload into master-request PDUs, then collects the
//! slave's response PDUs and reassembles them into one message. Reception has
//! two regimes with different error handling:
//!
//! * Before the first acceptable frame, the layer is tolerant: frames with a
//!   foreign node address or a malformed opening PDU are ignored and the slot
//!   is polled again until the deadline runs out. A wildcard request address
//!   is resolved to the address of the first acceptable frame; if that frame
//!   then fails validation, the resolution is rolled back.
//! * Once a first frame has opened a multi-frame message, reception is
//!   strict: any address mismatch, non-consecutive PDU kind or sequence gap
//!   aborts the whole transaction.
//!
//! The response deadline is a rolling 50 ms window restarted on every
//! accepted frame, measured from the acceptance instant.

use core::cmp::min;

use crate::core::{FrameId, Nad};
use crate::pdu::{PciKind, Pdu, MAX_MESSAGE_LENGTH, PDU_LENGTH};
use crate::transfer::{FrameError, FrameLink, FRAME_TIMEOUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// A carrier frame could not be transmitted
    Frame(FrameError),
    /// No complete message was received before the deadline
    NoResponse,
    /// Outbound payload exceeds the 12-bit length announcement
    PayloadTooLong,
    /// The response announces more bytes than the caller's buffer holds
    BufferTooSmall,
    /// Mid-message frame carried a different node address
    NadMismatch,
    /// Mid-message frame was not a consecutive frame
    UnexpectedFrameType,
    /// Consecutive frame out of sequence
    SequenceMismatch,
}

impl From<FrameError> for TransportError {
    fn from(value: FrameError) -> Self {
        Self::Frame(value)
    }
}

/// Splits a payload into the PDU sequence that announces and carries it
/// \[1; 3.2.3\]
///
/// A payload within the single-frame capacity yields exactly one SF. Anything
/// longer yields an FF with the first five bytes followed by CFs of up to six
/// bytes each, sequence-numbered from 1 modulo 16.
pub struct Segments<'a> {
    nad: Nad,
    payload: &'a [u8],
    offset: usize,
    sequence: u8,
    exhausted: bool,
}

impl<'a> Segments<'a> {
    pub fn new(nad: Nad, payload: &'a [u8]) -> Self {
        Self {
            nad,
            payload,
            offset: 0,
            sequence: 0,
            exhausted: false,
        }
    }
}

impl Iterator for Segments<'_> {
    type Item = Pdu;

    fn next(&mut self) -> Option<Pdu> {
        if self.exhausted {
            return None;
        }

        if self.offset == 0 {
            if self.payload.len() <= Pdu::SINGLE_CAPACITY {
                self.exhausted = true;
                return Some(Pdu::single(self.nad, self.payload));
            }
            self.offset = Pdu::FIRST_CAPACITY;
            self.sequence = 1;
            return Some(Pdu::first(self.nad, self.payload));
        }

        let remaining = self.payload.len() - self.offset;
        if remaining == 0 {
            self.exhausted = true;
            return None;
        }

        let take = min(Pdu::CONSECUTIVE_CAPACITY, remaining);
        let pdu = Pdu::consecutive(
            self.nad,
            self.sequence,
            &self.payload[self.offset..self.offset + take],
        );
        self.offset += take;
        self.sequence = self.sequence.wrapping_add(1) & 0x0f;
        Some(pdu)
    }
}

/// Result of feeding one received PDU into the reassembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Frame did not belong to the transaction; keep waiting
    Ignored,
    /// Frame consumed, message not yet complete; restart the deadline
    Accepted,
    /// Message complete with the given length
    Complete(usize),
}

/// Response reassembly state machine
///
/// Pure bookkeeping over caller-provided storage; the transaction driver
/// feeds it PDUs and owns all timing.
struct Reassembly {
    request_nad: Nad,
    accepted_nad: Nad,
    pending_nad: Option<Nad>,
    announced: usize,
    received: usize,
    sequence: u8,
    collecting: bool,
}

impl Reassembly {
    fn new(request_nad: Nad, pending_nad: Option<Nad>) -> Self {
        Self {
            request_nad,
            accepted_nad: request_nad,
            pending_nad,
            announced: 0,
            received: 0,
            sequence: 0,
            collecting: false,
        }
    }

    fn accepted_nad(&self) -> Nad {
        self.accepted_nad
    }

    fn push(&mut self, pdu: &Pdu, buffer: &mut [u8]) -> Result<Step, TransportError> {
        if self.collecting {
            self.push_consecutive(pdu, buffer)
        } else {
            self.push_opening(pdu, buffer)
        }
    }

    fn push_opening(&mut self, pdu: &Pdu, buffer: &mut [u8]) -> Result<Step, TransportError> {
        let nad = pdu.nad();

        // A wildcard request is fulfilled by whoever answers; a pending
        // address change is fulfilled by the node answering under its new
        // address.
        if self.accepted_nad.is_broadcast() || Some(nad) == self.pending_nad {
            self.accepted_nad = nad;
        }
        if nad != self.accepted_nad {
            debug!("transport: frame from nad {:02x} ignored", nad.into_u8());
            return Ok(Step::Ignored);
        }

        match pdu.pci().kind() {
            Some(PciKind::SingleFrame) => match pdu.decode_single() {
                Ok(data) => {
                    if data.len() > buffer.len() {
                        return Err(TransportError::BufferTooSmall);
                    }
                    buffer[..data.len()].copy_from_slice(data);
                    Ok(Step::Complete(data.len()))
                }
                Err(_) => Ok(self.dismiss_opening()),
            },
            Some(PciKind::FirstFrame) => match pdu.decode_first() {
                Ok((announced, head)) => {
                    if announced > buffer.len() {
                        return Err(TransportError::BufferTooSmall);
                    }
                    buffer[..Pdu::FIRST_CAPACITY].copy_from_slice(head);
                    self.announced = announced;
                    self.received = Pdu::FIRST_CAPACITY;
                    self.sequence = 1;
                    self.collecting = true;
                    Ok(Step::Accepted)
                }
                Err(_) => Ok(self.dismiss_opening()),
            },
            _ => Ok(self.dismiss_opening()),
        }
    }

    fn push_consecutive(&mut self, pdu: &Pdu, buffer: &mut [u8]) -> Result<Step, TransportError> {
        if pdu.nad() != self.accepted_nad {
            warn!("transport: nad changed mid-message, aborting");
            return Err(TransportError::NadMismatch);
        }
        if pdu.pci().kind() != Some(PciKind::ConsecutiveFrame) {
            warn!("transport: expected a consecutive frame, aborting");
            return Err(TransportError::UnexpectedFrameType);
        }

        let data = pdu
            .decode_consecutive(self.sequence)
            .map_err(|_| TransportError::SequenceMismatch)?;

        let take = min(data.len(), self.announced - self.received);
        buffer[self.received..self.received + take].copy_from_slice(&data[..take]);
        self.received += take;
        self.sequence = self.sequence.wrapping_add(1) & 0x0f;

        if self.received == self.announced {
            Ok(Step::Complete(self.announced))
        } else {
            Ok(Step::Accepted)
        }
    }

    /// An opening frame failed validation after possibly resolving the
    /// wildcard; undo the resolution so the next candidate gets the same
    /// chance.
    fn dismiss_opening(&mut self) -> Step {
        self.accepted_nad = self.request_nad;
        Step::Ignored
    }
}

/// Request/response message exchange over the diagnostic frame slots
pub struct TransportLayer<L> {
    link: L,
}

/// Message-level access as the node configuration layer consumes it
pub trait PduTransport {
    /// Sends `payload` to `nad` and receives the response message into
    /// `response`, returning its length.
    ///
    /// On success of a wildcard request, `nad` is updated to the responding
    /// node's address. `new_nad` arms the conditional-change flow in which
    /// the reply arrives under the node's new address; on success `nad` is
    /// updated to it.
    fn write_pdu(
        &mut self,
        nad: &mut Nad,
        payload: &[u8],
        new_nad: Option<Nad>,
        response: &mut [u8],
    ) -> Result<usize, TransportError>;

    /// Broadcasts the go-to-sleep command \[1; 2.6.3\]. No response follows.
    fn send_go_to_sleep(&mut self) -> Result<(), TransportError>;

    /// Wake-up pulse followed by the mandated quiet period \[1; 2.6.2\].
    fn send_wakeup(&mut self);
}

impl<L: FrameLink> TransportLayer<L> {
    pub fn new(link: L) -> Self {
        Self { link }
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn release(self) -> L {
        self.link
    }

    pub fn write_pdu(
        &mut self,
        nad: &mut Nad,
        payload: &[u8],
        new_nad: Option<Nad>,
        response: &mut [u8],
    ) -> Result<usize, TransportError> {
        if payload.len() > MAX_MESSAGE_LENGTH {
            return Err(TransportError::PayloadTooLong);
        }

        for pdu in Segments::new(*nad, payload) {
            self.link
                .write_frame(FrameId::MASTER_REQUEST, pdu.as_bytes())?;
        }

        self.read_response(nad, new_nad, response)
    }

    pub fn send_go_to_sleep(&mut self) -> Result<(), TransportError> {
        self.link
            .write_frame(FrameId::MASTER_REQUEST, Pdu::go_to_sleep().as_bytes())?;
        Ok(())
    }

    pub fn send_wakeup(&mut self) {
        self.link.send_wakeup();
    }

    fn read_response(
        &mut self,
        nad: &mut Nad,
        new_nad: Option<Nad>,
        buffer: &mut [u8],
    ) -> Result<usize, TransportError> {
        let mut reassembly = Reassembly::new(*nad, new_nad);
        let mut deadline = self.link.now() + FRAME_TIMEOUT;
        let mut complete = None;

        while complete.is_none() && self.link.now() < deadline {
            let frame = match self.link.read_frame(FrameId::SLAVE_RESPONSE, PDU_LENGTH) {
                Ok(frame) => frame,
                // the per-frame timeout already elapsed inside read_frame;
                // the deadline check above decides whether to keep trying
                Err(_) => continue,
            };
            let pdu = match Pdu::try_from(frame.as_slice()) {
                Ok(pdu) => pdu,
                Err(_) => continue,
            };

            match reassembly.push(&pdu, buffer)? {
                Step::Ignored => {}
                Step::Accepted => deadline = self.link.now() + FRAME_TIMEOUT,
                Step::Complete(length) => complete = Some(length),
            }
        }

        let length = complete.ok_or(TransportError::NoResponse)?;
        if length == 0 {
            return Err(TransportError::NoResponse);
        }

        if nad.is_broadcast() || new_nad.is_some() {
            *nad = reassembly.accepted_nad();
        }
        Ok(length)
    }
}

impl<L: FrameLink> PduTransport for TransportLayer<L> {
    fn write_pdu(
        &mut self,
        nad: &mut Nad,
        payload: &[u8],
        new_nad: Option<Nad>,
        response: &mut [u8],
    ) -> Result<usize, TransportError> {
        TransportLayer::write_pdu(self, nad, payload, new_nad, response)
    }

    fn send_go_to_sleep(&mut self) -> Result<(), TransportError> {
        TransportLayer::send_go_to_sleep(self)
    }

    fn send_wakeup(&mut self) {
        TransportLayer::send_wakeup(self)
    }
}
