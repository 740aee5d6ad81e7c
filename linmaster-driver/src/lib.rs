//! Linmaster driver interface
//!
//! The crate provides an interface between a UART device driver and the linmaster
//! stack. Limited scope facilitates compatibility across versions. Driver crates
//! should depend on this crate. Linmaster stack users should depend on the
//! `linmaster` crate instead.
//!
//! A LIN master drives a half-duplex single-wire bus through an ordinary UART.
//! The stack therefore needs only a byte-oriented stream with three extras:
//! * a runtime-adjustable bit rate, used to stretch the break field and the
//!   wake-up pulse by halving the baud rate
//! * a blocking `flush`, so the break/baud transitions happen after the last
//!   byte has left the shift register
//! * visibility of the receive buffer fill level, so the stack can poll
//!   without blocking inside the driver
//!
//! LIN transceivers echo transmitted bytes on the receive line. The stack
//! relies on this loopback for frame verification; drivers must not filter it.
//!
//! Time is provided by a separate [`clock::Clock`] so that hosts with a
//! scheduler can substitute their own sleep/yield behavior while embedded
//! targets busy-wait on a millisecond counter.

#![no_std]

pub mod clock;
pub mod uart;

pub mod time {
    //! Millisecond instant and duration types used by all stack deadlines.
    pub type Instant = fugit::TimerInstantU32<1000>;
    pub type Duration = fugit::TimerDurationU32<1000>;
}
