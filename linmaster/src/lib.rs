//! # Linmaster
//!
//! This library provides a master-side LIN 2.2A \[1\] bus stack for no_std
//! environments: frame transmission and reception over a half-duplex UART,
//! the diagnostic transport layer for multi-frame messages, and the node
//! configuration and identification services built on top of it. It uses
//! user-provided buffers for message reassembly, requiring no dynamic memory
//! allocation.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  services   ┌────────────────┐  messages   ┌───────────────┐
//! │ NodeConfig ├────────────►│ TransportLayer ├────────────►│ FrameTransfer │
//! └────────────┘ PduTransport└────────────────┘  FrameLink  └───────┬───────┘
//!                                                                   │ bytes
//!                                                          ┌────────▼───────┐
//!                                                          │  Uart + Clock  │
//!                                                          └────────────────┘
//! ```
//!
//! Components:
//! * _FrameTransfer_ owns the UART and the clock. It emits frames (break,
//!   sync, protected identifier, data, checksum), verifies them against the
//!   transceiver's loopback echo, and receives slave responses through a
//!   byte-level state machine under a 50 ms frame deadline.
//! * _TransportLayer_ segments request payloads into eight-byte PDUs on the
//!   master-request frame and reassembles response PDUs from the
//!   slave-response frame, handling node addressing, wildcard resolution and
//!   sequence checking.
//! * _NodeConfig_ marshals the LIN 2.2A node configuration services (assign
//!   NAD, read by identifier, conditional change NAD, save configuration,
//!   assign frame ID range) and decodes positive and negative responses.
//!
//! Each layer consumes the one below through a narrow trait ([`transfer::FrameLink`],
//! [`transport::PduTransport`]), so transport policy and service marshalling
//! can be exercised against test doubles without bus hardware.
//!
//! ## Concurrency model
//!
//! The stack is single-threaded and blocking. A transaction owns the bus from
//! its first transmitted byte until its response, timeout or abort; there is
//! no pipelining and no cancellation. While polling for reception the stack
//! busy-waits on the [`driver::clock::Clock`], invoking its `relax` hook once
//! per empty poll so hosts with a scheduler can yield.
//!
//! # References:
//!
//! * \[1\] LIN Specification 2.2A
//!   <https://www.lin-cia.org/fileadmin/microsites/lin-cia.org/resources/documents/LIN_2.2A.pdf>
#![no_std]

pub use linmaster_core as core;
pub use linmaster_driver as driver;
pub use linmaster_driver::time;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod format;
pub mod node_config;
pub mod pdu;
pub mod reader;
pub mod transfer;
pub mod transport;
