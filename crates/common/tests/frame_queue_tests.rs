//! Frame Queue Integration Tests
//!
//! Tests for the channels connecting the depth stream thread with its
//! consumers.
//!
//! # Test Scenarios
//! - Producer thread to blocking consumer hand-off
//! - Async consumption from a Tokio task
//! - Backpressure when the queue is full
//! - Cancellation and completion rendezvous across threads
//!
//! Run with: `cargo test -p common --test frame_queue_tests`

use common::test_utils::DEFAULT_TEST_TIMEOUT;
use common::{CancelToken, DepthFrameSignal, completion_pair, create_frame_queue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// Hand-off Tests
// ============================================================================

#[test]
fn test_frames_arrive_in_order_across_threads() {
    let (tx, rx) = create_frame_queue(16);

    let producer = thread::spawn(move || {
        for sequence in 0..10 {
            assert!(tx.signal(DepthFrameSignal { sequence, len: 422_400 }));
        }
    });

    for expected in 0..10 {
        let frame = rx.recv_blocking().expect("producer closed early");
        assert_eq!(frame.sequence, expected);
        assert_eq!(frame.len, 422_400);
    }

    producer.join().expect("producer panicked");
}

#[tokio::test]
async fn test_async_consumer() {
    let (tx, rx) = create_frame_queue(4);

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        tx.signal(DepthFrameSignal { sequence: 7, len: 3 })
    });

    let frame = tokio::time::timeout(DEFAULT_TEST_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("queue closed");
    assert_eq!(frame.sequence, 7);
    assert!(producer.join().unwrap());
}

#[test]
fn test_cloned_receivers_share_one_queue() {
    let (tx, rx) = create_frame_queue(4);
    let other = rx.clone();

    tx.signal(DepthFrameSignal { sequence: 0, len: 1 });
    tx.signal(DepthFrameSignal { sequence: 1, len: 1 });

    assert_eq!(rx.try_recv().map(|f| f.sequence), Some(0));
    assert_eq!(other.try_recv().map(|f| f.sequence), Some(1));
    assert_eq!(other.try_recv(), None);
}

// ============================================================================
// Backpressure Tests
// ============================================================================

#[test]
fn test_full_queue_never_blocks_producer() {
    let (tx, rx) = create_frame_queue(3);

    let start = Instant::now();
    let delivered = (0..100)
        .filter(|&sequence| tx.signal(DepthFrameSignal { sequence, len: 1 }))
        .count();

    assert_eq!(delivered, 3);
    assert_eq!(rx.pending(), 3);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_zero_capacity_is_clamped() {
    let (tx, rx) = create_frame_queue(0);
    assert!(tx.signal(DepthFrameSignal { sequence: 0, len: 1 }));
    assert_eq!(rx.pending(), 1);
}

#[test]
fn test_signal_after_receivers_dropped() {
    let (tx, rx) = create_frame_queue(2);
    drop(rx);
    assert!(!tx.signal(DepthFrameSignal { sequence: 0, len: 1 }));
}

// ============================================================================
// Shutdown Rendezvous Tests
// ============================================================================

#[test]
fn test_cancel_then_wait_for_completion() {
    let token = CancelToken::new();
    let (guard, completion) = completion_pair();
    let iterations = Arc::new(AtomicU64::new(0));

    let worker_token = token.clone();
    let worker_iterations = iterations.clone();
    let worker = thread::spawn(move || {
        let _guard = guard;
        loop {
            thread::sleep(Duration::from_millis(5));
            if worker_token.is_cancelled() {
                return;
            }
            worker_iterations.fetch_add(1, Ordering::SeqCst);
        }
    });

    thread::sleep(Duration::from_millis(30));
    token.cancel();

    let start = Instant::now();
    completion.wait();
    assert!(start.elapsed() < DEFAULT_TEST_TIMEOUT);

    let after = iterations.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(iterations.load(Ordering::SeqCst), after);

    worker.join().expect("worker panicked");
}

#[test]
fn test_completion_after_worker_already_finished() {
    let (guard, completion) = completion_pair();
    drop(guard);
    assert!(completion.is_complete());
    completion.wait();
}
