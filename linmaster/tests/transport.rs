//! Wire-level tests of the diagnostic transport layer

mod common;

use common::{MockClock, MockUart};
use linmaster::core::Nad;
use linmaster::transfer::{Config, FrameTransfer};
use linmaster::transport::{TransportError, TransportLayer};

fn transport<'a>(
    uart: &'a mut MockUart,
    clock: &'a mut MockClock,
) -> TransportLayer<FrameTransfer<&'a mut MockUart, &'a mut MockClock>> {
    let mut transfer = FrameTransfer::new(uart, clock, Config::default());
    transfer.begin();
    TransportLayer::new(transfer)
}

#[test]
fn test_go_to_sleep() {
    let mut uart = MockUart::new();
    let mut clock = MockClock::new();

    transport(&mut uart, &mut clock).send_go_to_sleep().unwrap();

    assert_eq!(
        uart.tx_bytes(),
        &[0x00, 0x55, 0x3c, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00]
    );
}

#[test]
fn test_single_frame_exchange() {
    let mut uart = MockUart::new();
    let mut clock = MockClock::new();

    // single-frame response, all six content bytes in use
    uart.inject(&[0x0a, 0x06, 0x62, 0x06, 0x2e, 0x80, 0x00, 0x00, 0xd8]);

    let mut nad = Nad::new(0x0a);
    let mut response = [0u8; 64];
    let length = transport(&mut uart, &mut clock)
        .write_pdu(&mut nad, &[0x22, 0x06, 0x2e], None, &mut response)
        .unwrap();

    assert_eq!(nad, Nad::new(0x0a));
    assert_eq!(&response[..length], &[0x62, 0x06, 0x2e, 0x80, 0x00, 0x00]);

    assert_eq!(
        uart.tx_bytes(),
        &[
            // master request: single frame with three payload bytes
            0x00, 0x55, 0x3c, 0x0a, 0x03, 0x22, 0x06, 0x2e, 0xff, 0xff, 0xff, 0x9c,
            // slave response header
            0x00, 0x55, 0x7d,
        ]
    );
}

#[test]
fn test_multi_frame_response_resolves_wildcard() {
    let mut uart = MockUart::new();
    let mut clock = MockClock::new();

    // 20-byte message: first frame, then three consecutive frames with
    // sequence numbers 1, 2, 3; the last one padded with three fill bytes
    uart.inject(&[0x0a, 0x10, 0x14, 0x62, 0x06, 0x5e, 0x96, 0x54, 0x20]);
    uart.inject(&[0x0a, 0x21, 0x62, 0x06, 0x5e, 0x44, 0x55, 0x78, 0xfb]);
    uart.inject(&[0x0a, 0x22, 0x54, 0x10, 0x01, 0x00, 0xff, 0xee, 0x7f]);
    uart.inject(&[0x0a, 0x23, 0x12, 0x99, 0x21, 0xff, 0xff, 0xff, 0x06]);

    let mut nad = Nad::BROADCAST;
    let mut response = [0u8; 64];
    let length = transport(&mut uart, &mut clock)
        .write_pdu(&mut nad, &[0x22, 0x06, 0x5e], None, &mut response)
        .unwrap();

    assert_eq!(nad, Nad::new(0x0a));
    assert_eq!(
        &response[..length],
        &[
            0x62, 0x06, 0x5e, 0x96, 0x54, // first frame
            0x62, 0x06, 0x5e, 0x44, 0x55, 0x78, // sequence 1
            0x54, 0x10, 0x01, 0x00, 0xff, 0xee, // sequence 2
            0x12, 0x99, 0x21, // sequence 3, fill discarded
        ]
    );

    assert_eq!(
        uart.tx_bytes(),
        &[
            // master request
            0x00, 0x55, 0x3c, 0x7f, 0x03, 0x22, 0x06, 0x5e, 0xff, 0xff, 0xff, 0xf6,
            // one slave response header per received frame
            0x00, 0x55, 0x7d, 0x00, 0x55, 0x7d, 0x00, 0x55, 0x7d, 0x00, 0x55, 0x7d,
        ]
    );
}

#[test]
fn test_multi_frame_request() {
    let mut uart = MockUart::new();
    let mut clock = MockClock::new();

    // 10-byte request: first frame plus one consecutive frame
    uart.inject(&[0x0a, 0x01, 0xf6, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfd]);

    let request = [0x2e, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];
    let mut nad = Nad::new(0x0a);
    let mut response = [0u8; 64];
    let length = transport(&mut uart, &mut clock)
        .write_pdu(&mut nad, &request, None, &mut response)
        .unwrap();

    assert_eq!(&response[..length], &[0xf6]);
    assert_eq!(
        uart.tx_bytes(),
        &[
            // first frame announcing ten bytes, carrying five
            0x00, 0x55, 0x3c, 0x0a, 0x10, 0x0a, 0x2e, 0x01, 0x02, 0x03, 0x04, 0xa3,
            // consecutive frame with the remaining five and one fill byte
            0x00, 0x55, 0x3c, 0x0a, 0x21, 0x05, 0x06, 0x07, 0x08, 0x09, 0xff, 0xb1,
            // slave response header
            0x00, 0x55, 0x7d,
        ]
    );
}

#[test]
fn test_foreign_nad_is_ignored_before_acceptance() {
    let mut uart = MockUart::new();
    let mut clock = MockClock::new();

    // another node's response precedes the addressed node's
    uart.inject(&[0x0b, 0x01, 0xaa, 0xff, 0xff, 0xff, 0xff, 0xff, 0x49]);
    uart.inject(&[0x0a, 0x01, 0xf6, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfd]);

    let mut nad = Nad::new(0x0a);
    let mut response = [0u8; 64];
    let length = transport(&mut uart, &mut clock)
        .write_pdu(&mut nad, &[0x36], None, &mut response)
        .unwrap();

    assert_eq!(&response[..length], &[0xf6]);
    assert_eq!(nad, Nad::new(0x0a));
}

#[test]
fn test_sequence_gap_aborts() {
    let mut uart = MockUart::new();
    let mut clock = MockClock::new();

    // first frame announcing 20 bytes, then a consecutive frame skipping
    // ahead to sequence 2
    uart.inject(&[0x0a, 0x10, 0x14, 0x62, 0x06, 0x5e, 0x96, 0x54, 0x20]);
    uart.inject(&[0x0a, 0x22, 0x54, 0x10, 0x01, 0x00, 0xff, 0xee, 0x7f]);

    let mut nad = Nad::new(0x0a);
    let mut response = [0u8; 64];
    let result = transport(&mut uart, &mut clock).write_pdu(
        &mut nad,
        &[0x22, 0x06, 0x5e],
        None,
        &mut response,
    );

    assert_eq!(result, Err(TransportError::SequenceMismatch));
}

#[test]
fn test_announcement_exceeding_buffer_is_refused() {
    let mut uart = MockUart::new();
    let mut clock = MockClock::new();

    uart.inject(&[0x0a, 0x10, 0x14, 0x62, 0x06, 0x5e, 0x96, 0x54, 0x20]);

    let mut nad = Nad::new(0x0a);
    let mut response = [0u8; 8];
    let result = transport(&mut uart, &mut clock).write_pdu(
        &mut nad,
        &[0x22, 0x06, 0x5e],
        None,
        &mut response,
    );

    assert_eq!(result, Err(TransportError::BufferTooSmall));
}

#[test]
fn test_no_response_times_out() {
    let mut uart = MockUart::new();
    let mut clock = MockClock::new();

    let mut nad = Nad::BROADCAST;
    let mut response = [0u8; 64];
    let result =
        transport(&mut uart, &mut clock).write_pdu(&mut nad, &[0x22], None, &mut response);

    assert_eq!(result, Err(TransportError::NoResponse));
    // the wildcard stays unresolved
    assert_eq!(nad, Nad::BROADCAST);
    assert!(clock.elapsed_ms() >= 50);
}

#[test]
fn test_payload_too_long_is_rejected() {
    let mut uart = MockUart::new();
    let mut clock = MockClock::new();

    let request = [0u8; 0x1000];
    let mut nad = Nad::new(0x0a);
    let mut response = [0u8; 8];
    let result =
        transport(&mut uart, &mut clock).write_pdu(&mut nad, &request, None, &mut response);

    assert_eq!(result, Err(TransportError::PayloadTooLong));
    assert!(uart.tx_bytes().is_empty());
}
