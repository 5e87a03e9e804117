//! Tests for the connection layer
//!
//! These run over in-memory duplex pipes so ordering, disconnect detection and
//! close semantics can be checked without sockets.

use super::*;
use crate::error::{CodecError, ProtocolError};
use crate::types::GazeRecord;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

fn record(n: u64) -> GazeRecord {
    GazeRecord {
        sequence_number: n,
        capture_time_seconds: 1_000 + n,
        capture_time_subsecond: (n * 7) as u32,
        eye_id: n % 2 == 0,
        confidence: if n % 3 == 0 { 0.0 } else { 1.0 },
        gaze_x: n as f32 / 100.0,
        gaze_y: 1.0 - n as f32 / 100.0,
        pupil_diameter: (n % 100) as u32,
    }
}

fn pair() -> (Connection<DuplexStream>, Connection<DuplexStream>) {
    let (a, b) = duplex(256);
    (Connection::new(a, "a"), Connection::new(b, "b"))
}

#[tokio::test]
async fn batches_arrive_in_send_order() {
    let (mut tx, mut rx) = pair();

    let batches: Vec<Batch> =
        (0..20u64).map(|i| (i * 3..i * 3 + (i % 4)).map(record).collect()).collect();

    let expected = batches.clone();
    let sender = tokio::spawn(async move {
        for batch in &batches {
            tx.send(batch).await.unwrap();
        }
        tx.close().await;
        tx.stats()
    });

    for want in &expected {
        let got = rx.receive().await.unwrap();
        assert_eq!(&got, want);
    }

    let stats = sender.await.unwrap();
    assert_eq!(stats.frames_sent, 20);
    assert_eq!(rx.stats().frames_received, 20);
    assert_eq!(rx.stats().bytes_received, stats.bytes_sent);
}

#[tokio::test]
async fn peer_close_is_read_failure_not_violation() {
    let (mut tx, mut rx) = pair();
    tx.close().await;
    drop(tx);

    let err = rx.receive().await.unwrap_err();
    assert!(matches!(err, ConnectionError::ReadFailed { .. }), "got {:?}", err);
}

#[tokio::test]
async fn send_to_departed_peer_is_write_failure() {
    let (mut tx, rx) = pair();
    drop(rx);

    let err = tx.send(&Batch::single(record(1))).await.unwrap_err();
    assert!(matches!(err, ConnectionError::WriteFailed { .. }), "got {:?}", err);
}

#[tokio::test]
async fn malformed_header_is_protocol_violation() {
    let (mut raw, b) = duplex(64);
    let mut rx = Connection::new(b, "b");

    raw.write_all(b"nothex!!").await.unwrap();
    let err = rx.receive().await.unwrap_err();
    assert!(err.is_protocol_violation());
}

#[tokio::test]
async fn truncated_body_is_codec_violation() {
    let (mut raw, b) = duplex(256);
    let mut rx = Connection::new(b, "b");

    // Capture a valid frame, then drop one body byte and fix up the header.
    let payload = codec::encode(&Batch::single(record(5)));
    let short = &payload[..payload.len() - 1];
    raw.write_all(&frame::encode_frame(short).unwrap()).await.unwrap();

    let err = rx.receive().await.unwrap_err();
    assert!(
        matches!(err, ConnectionError::ProtocolViolation(ProtocolError::Codec(CodecError::Truncated { .. }))),
        "got {:?}",
        err
    );
}

#[tokio::test]
async fn close_handle_wakes_pending_receive() {
    let (_tx, mut rx) = pair();
    let handle = rx.close_handle();

    let pending = tokio::spawn(async move {
        let result = rx.receive().await;
        rx.close().await;
        (result, rx.state())
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.close();

    let (result, state) = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("receive woke after close")
        .unwrap();
    let err = result.unwrap_err();
    assert!(err.is_peer_departure());
    assert_eq!(state, ConnectionState::Closed);
}

#[tokio::test]
async fn close_is_idempotent_and_blocks_further_io() {
    let (mut tx, _rx) = pair();
    assert_eq!(tx.state(), ConnectionState::Established);

    tx.close_handle().close();
    assert_eq!(tx.state(), ConnectionState::Closing);

    tx.close().await;
    tx.close().await;
    tx.close_handle().close();
    assert_eq!(tx.state(), ConnectionState::Closed);

    let err = tx.send(&Batch::single(record(0))).await.unwrap_err();
    match err {
        ConnectionError::WriteFailed { source } => {
            assert_eq!(source.kind(), io::ErrorKind::NotConnected)
        }
        other => panic!("Expected WriteFailed, got {:?}", other),
    }
    assert!(tx.receive().await.unwrap_err().is_peer_departure());
}

#[tokio::test]
async fn split_halves_share_one_lifecycle() {
    let (a, b) = pair();
    let (mut a_rx, mut a_tx) = a.split();
    let (mut b_rx, mut b_tx) = b.split();

    a_tx.send(&Batch::single(record(1))).await.unwrap();
    b_tx.send(&Batch::single(record(2))).await.unwrap();
    assert_eq!(b_rx.receive().await.unwrap()[0].sequence_number, 1);
    assert_eq!(a_rx.receive().await.unwrap()[0].sequence_number, 2);

    let handle = a_rx.close_handle();
    a_tx.close().await;
    assert_eq!(handle.state(), ConnectionState::Closed);
    assert!(a_rx.receive().await.unwrap_err().is_peer_departure());
    assert!(b_rx.receive().await.unwrap_err().is_peer_departure());
    assert_eq!(a_tx.stats().frames_sent, 1);
    assert_eq!(b_rx.peer(), "b");
}

#[tokio::test]
async fn send_cut_short_by_close_reaches_peer_as_read_failure() {
    let (mut tx, mut rx) = pair();
    let handle = tx.close_handle();

    // Far larger than the pipe, so the write stalls mid-frame.
    let batch: Batch = (0..100u64).map(record).collect();
    let sending = tokio::spawn(async move {
        let result = tx.send(&batch).await;
        tx.close().await;
        result
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.close();

    let err = tokio::time::timeout(Duration::from_secs(1), sending)
        .await
        .expect("send woke after close")
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, ConnectionError::WriteFailed { .. }), "got {:?}", err);

    // The peer holds a valid header and part of the body, then end of stream.
    let err = rx.receive().await.unwrap_err();
    assert!(matches!(err, ConnectionError::ReadFailed { .. }), "got {:?}", err);
    assert_eq!(rx.stats().frames_received, 0);
}
