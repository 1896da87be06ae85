//! Discovery session integration tests
//!
//! Drives full device-list exchanges against scripted streams and a real
//! loopback TCP peer, covering:
//! - Well-formed replies (empty, nested interfaces, literal wire bytes)
//! - Sanity ceilings on peer-declared counts
//! - Truncated streams and transport failures
//! - Rejected requests
//!
//! Run with: `cargo test -p client --test session_tests`

use client::transport::TransportSettings;
use client::{SessionError, SessionLimits, list_exported_devices, list_remote_devices};
use common::test_utils::{
    MockStream, ReplyBuilder, create_mock_device_record, create_mock_device_with_interfaces,
    create_mock_hid_device, create_mock_mass_storage_device,
};
use protocol::{
    DEVICE_RECORD_SIZE, INTERFACE_RECORD_SIZE, OP_COMMON_SIZE, OP_REP_DEVLIST,
    REPLY_HEADER_SIZE, REQUEST_SIZE, ReplyHeader, encode_request,
};
use std::io::{ErrorKind, Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

fn limits() -> SessionLimits {
    SessionLimits::default()
}

// ============================================================================
// Well-formed replies
// ============================================================================

mod well_formed {
    use super::*;

    #[test]
    fn test_zero_devices_is_empty_success() {
        let mut stream = MockStream::new(ReplyBuilder::new(0).build());
        let devices = list_remote_devices(&mut stream, "peer", &limits()).unwrap();
        assert!(devices.is_empty());
        assert_eq!(stream.bytes_consumed(), REPLY_HEADER_SIZE);
    }

    #[test]
    fn test_devices_and_interfaces_in_order() {
        let storage = create_mock_mass_storage_device(1);
        let hid = create_mock_hid_device(2);
        let bare = create_mock_device_record(3, 0x1d6b, 0x0104);
        let reply = ReplyBuilder::new(3)
            .device(&storage)
            .device(&hid)
            .device(&bare)
            .build();
        let reply_len = reply.len();

        let mut stream = MockStream::new(reply);
        let devices = list_remote_devices(&mut stream, "peer", &limits()).unwrap();

        assert_eq!(devices, vec![storage, hid, bare]);
        for device in &devices {
            assert_eq!(device.interfaces.len(), device.num_interfaces as usize);
        }
        assert_eq!(stream.bytes_consumed(), reply_len);
    }

    #[test]
    fn test_literal_reply_bytes() {
        let mut reply = Vec::new();
        // Header: version 0x0111, OP_REP_DEVLIST, status 0, 2 devices
        reply.extend_from_slice(&[0x01, 0x11, 0x00, 0x05]);
        reply.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        reply.extend_from_slice(&[0x00, 0x00, 0x00, 0x02]);

        // Device A: busid "1-1", 0x1234:0x5678, 1 interface
        let mut device_a = vec![0u8; DEVICE_RECORD_SIZE];
        device_a[..13].copy_from_slice(b"/sys/bus/1-1\0");
        device_a[256..259].copy_from_slice(b"1-1");
        device_a[300..304].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);
        device_a[311] = 1;
        reply.extend_from_slice(&device_a);
        reply.extend_from_slice(&[0x08, 0x06, 0x50, 0x00]);

        // Device B: busid "1-2", 0xabcd:0x0001, 0 interfaces
        let mut device_b = vec![0u8; DEVICE_RECORD_SIZE];
        device_b[256..259].copy_from_slice(b"1-2");
        device_b[300..304].copy_from_slice(&[0xab, 0xcd, 0x00, 0x01]);
        reply.extend_from_slice(&device_b);

        let mut stream = MockStream::new(reply);
        let devices = list_remote_devices(&mut stream, "peer", &limits()).unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].busid.to_string_lossy(), "1-1");
        assert_eq!(devices[0].path.to_string_lossy(), "/sys/bus/1-1");
        assert_eq!(devices[0].vendor_id, 0x1234);
        assert_eq!(devices[0].product_id, 0x5678);
        assert_eq!(devices[0].interfaces.len(), 1);
        assert_eq!(devices[0].interfaces[0].interface_class, 0x08);
        assert_eq!(devices[0].interfaces[0].interface_subclass, 0x06);
        assert_eq!(devices[0].interfaces[0].interface_protocol, 0x50);

        assert_eq!(devices[1].busid.to_string_lossy(), "1-2");
        assert_eq!(devices[1].vendor_id, 0xabcd);
        assert_eq!(devices[1].product_id, 0x0001);
        assert!(devices[1].interfaces.is_empty());
    }

    #[test]
    fn test_request_frame_sent_once() {
        let mut stream = MockStream::new(ReplyBuilder::new(0).build());
        list_remote_devices(&mut stream, "peer", &limits()).unwrap();
        assert_eq!(stream.written(), &encode_request());
        assert_eq!(stream.written().len(), REQUEST_SIZE);
    }

    #[test]
    fn test_trailing_bytes_are_not_consumed() {
        let reply = ReplyBuilder::new(1)
            .device(&create_mock_device_record(1, 1, 1))
            .raw(&[0xFF; 7])
            .build();
        let mut stream = MockStream::new(reply);
        let devices = list_remote_devices(&mut stream, "peer", &limits()).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(stream.bytes_remaining(), 7);
    }
}

// ============================================================================
// Sanity ceilings
// ============================================================================

mod ceilings {
    use super::*;

    #[test]
    fn test_device_count_over_ceiling_reads_nothing_more() {
        let limits = SessionLimits {
            max_devices: 2,
            max_interfaces: 32,
        };
        let reply = ReplyBuilder::new(3)
            .device(&create_mock_device_record(1, 1, 1))
            .device(&create_mock_device_record(2, 1, 1))
            .device(&create_mock_device_record(3, 1, 1))
            .build();

        let mut stream = MockStream::new(reply);
        let result = list_remote_devices(&mut stream, "peer", &limits);

        assert!(matches!(result, Err(SessionError::ProtocolViolation(_))));
        assert_eq!(stream.bytes_consumed(), REPLY_HEADER_SIZE);
    }

    #[test]
    fn test_huge_device_count_is_rejected_before_allocation() {
        let mut stream = MockStream::new(ReplyBuilder::new(u32::MAX).build());
        let result = list_remote_devices(&mut stream, "peer", &limits());
        assert!(matches!(result, Err(SessionError::ProtocolViolation(_))));
    }

    #[test]
    fn test_device_count_at_ceiling_is_accepted() {
        let limits = SessionLimits {
            max_devices: 2,
            max_interfaces: 32,
        };
        let reply = ReplyBuilder::new(2)
            .device(&create_mock_device_record(1, 1, 1))
            .device(&create_mock_device_record(2, 1, 1))
            .build();
        let mut stream = MockStream::new(reply);
        assert_eq!(
            list_remote_devices(&mut stream, "peer", &limits).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_interface_count_over_ceiling_reads_no_interfaces() {
        let limits = SessionLimits {
            max_devices: 16,
            max_interfaces: 2,
        };
        let device = create_mock_device_with_interfaces(
            1,
            0x1234,
            0x5678,
            &[(0x03, 0, 0), (0x03, 0, 0), (0x03, 0, 0)],
        );
        let mut stream = MockStream::new(ReplyBuilder::new(1).device(&device).build());

        let result = list_remote_devices(&mut stream, "peer", &limits);

        assert!(matches!(result, Err(SessionError::ProtocolViolation(_))));
        assert_eq!(stream.bytes_consumed(), REPLY_HEADER_SIZE + DEVICE_RECORD_SIZE);
    }

    #[test]
    fn test_interface_count_at_ceiling_is_accepted() {
        let limits = SessionLimits {
            max_devices: 16,
            max_interfaces: 2,
        };
        let device =
            create_mock_device_with_interfaces(1, 0x1234, 0x5678, &[(0x03, 0, 0), (0x08, 6, 0x50)]);
        let mut stream = MockStream::new(ReplyBuilder::new(1).device(&device).build());
        let devices = list_remote_devices(&mut stream, "peer", &limits).unwrap();
        assert_eq!(devices[0].interfaces.len(), 2);
    }
}

// ============================================================================
// Truncation and transport failures
// ============================================================================

mod failures {
    use super::*;

    #[test]
    fn test_stream_closes_mid_header() {
        let reply = ReplyBuilder::new(1).build();
        let mut stream = MockStream::new(reply[..REPLY_HEADER_SIZE - 2].to_vec());
        let result = list_remote_devices(&mut stream, "peer", &limits());
        assert!(matches!(result, Err(SessionError::Truncated { .. })));
    }

    #[test]
    fn test_empty_reply() {
        let mut stream = MockStream::new(Vec::new());
        let result = list_remote_devices(&mut stream, "peer", &limits());
        assert!(matches!(
            result,
            Err(SessionError::Truncated {
                expected: OP_COMMON_SIZE,
                ..
            })
        ));
    }

    #[test]
    fn test_stream_closes_after_three_of_ten_devices() {
        let mut builder = ReplyBuilder::new(10);
        for i in 0..3 {
            builder = builder.device(&create_mock_device_record(i, 1, 1));
        }
        let mut stream = MockStream::new(builder.build());

        let result = list_remote_devices(&mut stream, "peer", &limits());

        let Err(SessionError::Truncated { frame, expected }) = result else {
            panic!("Expected Truncated error, got {:?}", result);
        };
        assert_eq!(frame, "device record");
        assert_eq!(expected, DEVICE_RECORD_SIZE);
    }

    #[test]
    fn test_stream_closes_mid_device_record() {
        let reply = ReplyBuilder::new(1)
            .device(&create_mock_device_record(1, 1, 1))
            .build();
        let cut = REPLY_HEADER_SIZE + DEVICE_RECORD_SIZE / 2;
        let mut stream = MockStream::new(reply[..cut].to_vec());
        let result = list_remote_devices(&mut stream, "peer", &limits());
        assert!(matches!(result, Err(SessionError::Truncated { .. })));
    }

    #[test]
    fn test_stream_closes_mid_interfaces() {
        let device = create_mock_hid_device(1);
        let reply = ReplyBuilder::new(1).device(&device).build();
        let cut = reply.len() - INTERFACE_RECORD_SIZE - 1;
        let mut stream = MockStream::new(reply[..cut].to_vec());

        let result = list_remote_devices(&mut stream, "peer", &limits());

        let Err(SessionError::Truncated { frame, .. }) = result else {
            panic!("Expected Truncated error, got {:?}", result);
        };
        assert_eq!(frame, "interface record");
    }

    #[test]
    fn test_connection_reset_is_transport_error() {
        let reply = ReplyBuilder::new(2)
            .device(&create_mock_device_record(1, 1, 1))
            .build();
        let mut stream = MockStream::new(reply).error_at_end(ErrorKind::ConnectionReset);

        let result = list_remote_devices(&mut stream, "peer", &limits());

        let Err(SessionError::Transport(err)) = result else {
            panic!("Expected Transport error, got {:?}", result);
        };
        assert_eq!(err.kind(), ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_read_timeout_is_transport_error() {
        let mut stream = MockStream::new(Vec::new()).error_at_end(ErrorKind::WouldBlock);
        let result = list_remote_devices(&mut stream, "peer", &limits());
        assert!(matches!(result, Err(SessionError::Transport(_))));
    }

    #[test]
    fn test_write_failure_is_transport_error() {
        let mut stream = MockStream::new(ReplyBuilder::new(0).build()).failing_writes();
        let result = list_remote_devices(&mut stream, "peer", &limits());
        assert!(matches!(result, Err(SessionError::Transport(_))));
        assert_eq!(stream.bytes_consumed(), 0);
    }

    #[test]
    fn test_wrong_version_is_protocol_violation() {
        let reply = ReplyBuilder::with_header(ReplyHeader {
            version: 0x0106,
            code: OP_REP_DEVLIST,
            status: 0,
            device_count: 0,
        })
        .build();
        let mut stream = MockStream::new(reply);
        let result = list_remote_devices(&mut stream, "peer", &limits());
        assert!(matches!(result, Err(SessionError::ProtocolViolation(_))));
    }

    #[test]
    fn test_wrong_code_is_protocol_violation() {
        let reply = ReplyBuilder::with_header(ReplyHeader {
            version: protocol::USBIP_VERSION,
            code: 0x0003,
            status: 0,
            device_count: 0,
        })
        .build();
        let mut stream = MockStream::new(reply);
        let result = list_remote_devices(&mut stream, "peer", &limits());
        assert!(matches!(result, Err(SessionError::ProtocolViolation(_))));
    }
}

// ============================================================================
// Rejected requests
// ============================================================================

mod rejected {
    use super::*;

    #[test]
    fn test_failure_status_stops_after_op_common() {
        // Extra bytes after the status must stay unread
        let reply = ReplyBuilder::rejected(1).raw(&[0u8; 16]).build();
        let mut stream = MockStream::new(reply);

        let result = list_remote_devices(&mut stream, "peer", &limits());

        let Err(SessionError::RemoteRejected { status, reason }) = result else {
            panic!("Expected RemoteRejected error, got {:?}", result);
        };
        assert_eq!(status, 1);
        assert!(reason.contains("Not Available"));
        assert_eq!(stream.bytes_consumed(), OP_COMMON_SIZE);
    }

    #[test]
    fn test_negative_status_is_rejected() {
        let mut stream = MockStream::new(ReplyBuilder::rejected(-1).build());
        let result = list_remote_devices(&mut stream, "peer", &limits());
        assert!(matches!(
            result,
            Err(SessionError::RemoteRejected { status: -1, .. })
        ));
    }
}

// ============================================================================
// Loopback TCP peer
// ============================================================================

mod tcp {
    use super::*;

    fn spawn_peer(reply: Vec<u8>) -> (u16, thread::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut request = vec![0u8; REQUEST_SIZE];
            socket.read_exact(&mut request).unwrap();
            socket.write_all(&reply).unwrap();
            request
        });
        (port, handle)
    }

    fn settings() -> TransportSettings {
        TransportSettings {
            connect_timeout: Duration::from_secs(2),
            io_timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_list_over_loopback() {
        let hid = create_mock_hid_device(4);
        let (port, peer) = spawn_peer(ReplyBuilder::new(1).device(&hid).build());

        let devices = list_exported_devices("127.0.0.1", port, &settings(), &limits()).unwrap();

        assert_eq!(devices, vec![hid]);
        assert_eq!(peer.join().unwrap(), encode_request().to_vec());
    }

    #[test]
    fn test_peer_hangs_up_mid_reply() {
        let reply = ReplyBuilder::new(2)
            .device(&create_mock_device_record(1, 1, 1))
            .build();
        let (port, peer) = spawn_peer(reply);

        let err = list_exported_devices("127.0.0.1", port, &settings(), &limits()).unwrap_err();
        peer.join().unwrap();

        assert!(format!("{:#}", err).contains("failed to get device list from 127.0.0.1"));
        let session_err = err.downcast_ref::<SessionError>().unwrap();
        assert!(matches!(session_err, SessionError::Truncated { .. }));
    }
}
