//! Integration tests for EventQueue delivery guarantees
//!
//! **Coverage:**
//! - Delivered batches leave nothing behind in storage
//! - Failed uploads survive a restart and are delivered afterwards
//! - Large backlogs are split into capped batches, oldest first
//! - At most one upload is in flight, and producers are never blocked by it
//! - Records enqueued during an upload are kept

use std::sync::Arc;
use std::time::Duration;

use beacon_core::testing::{InMemoryEventStorage, ScriptedUploader};
use beacon_core::{EventQueue, UploadOutcome};
use beacon_domain::{BeaconError, Event, EventQueueConfig, EventRecord};
use chrono::{DateTime, TimeZone, Utc};
use tokio_test::assert_ok;

fn recorded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn record(n: usize) -> EventRecord {
    Event::new(format!("event-{n}")).with_value(n as f64).at(recorded_at()).into_record()
}

fn running() -> EventQueueConfig {
    EventQueueConfig { start_paused: false, ..EventQueueConfig::default() }
}

#[tokio::test]
async fn delivered_record_is_removed_from_storage() {
    let storage = Arc::new(InMemoryEventStorage::new());
    let uploader = Arc::new(ScriptedUploader::new());
    let queue = assert_ok!(EventQueue::load(storage.clone(), uploader.clone(), &running()).await);

    assert_ok!(queue.enqueue(record(1)).await);
    assert_eq!(storage.persisted(), Some(vec![record(1)]));

    assert!(queue.flush_if_due().await);

    assert_eq!(uploader.batches(), vec![vec![record(1)]]);
    assert_eq!(storage.persisted(), Some(vec![]));
}

#[tokio::test]
async fn failed_upload_survives_a_restart() {
    let storage = Arc::new(InMemoryEventStorage::new());
    let offline = Arc::new(ScriptedUploader::new());
    offline.push_outcome(UploadOutcome::Failed(BeaconError::NetworkOffline));

    let queue = assert_ok!(EventQueue::load(storage.clone(), offline, &running()).await);
    assert_ok!(queue.enqueue(record(1)).await);
    queue.flush_if_due().await;
    drop(queue);

    let online = Arc::new(ScriptedUploader::new());
    let restarted = assert_ok!(EventQueue::load(storage.clone(), online.clone(), &running()).await);
    assert_eq!(restarted.records().await, vec![record(1)]);

    restarted.flush_if_due().await;

    assert_eq!(online.batches(), vec![vec![record(1)]]);
    assert!(restarted.is_empty().await);
}

#[tokio::test]
async fn backlog_is_sent_in_capped_batches() {
    let storage = Arc::new(InMemoryEventStorage::new());
    let uploader = Arc::new(ScriptedUploader::new());
    let queue = assert_ok!(EventQueue::load(storage.clone(), uploader.clone(), &running()).await);
    for n in 0..101 {
        assert_ok!(queue.enqueue(record(n)).await);
    }

    assert!(queue.flush_if_due().await);
    assert_eq!(queue.len().await, 1);
    assert!(queue.flush_if_due().await);

    let batches = uploader.batches();
    assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), [100, 1]);
    assert_eq!(batches[0][0], record(0));
    assert_eq!(batches[1][0], record(100));
    assert!(!queue.flush_if_due().await);
}

#[tokio::test]
async fn only_one_upload_is_in_flight() {
    let storage = Arc::new(InMemoryEventStorage::new());
    let uploader = Arc::new(ScriptedUploader::gated());
    let queue =
        Arc::new(assert_ok!(EventQueue::load(storage.clone(), uploader.clone(), &running()).await));
    assert_ok!(queue.enqueue(record(1)).await);

    let flushing = tokio::spawn({
        let queue = Arc::clone(&queue);
        async move { queue.flush_if_due().await }
    });
    while !queue.is_sending() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(!queue.flush_if_due().await);
    assert_ok!(queue.enqueue(record(2)).await);

    uploader.release();
    assert!(assert_ok!(flushing.await));

    assert_eq!(uploader.batches(), vec![vec![record(1)]]);
    assert_eq!(queue.records().await, vec![record(2)]);
    assert_eq!(storage.persisted(), Some(vec![record(2)]));
}

#[tokio::test]
async fn rejected_batch_is_discarded_and_the_rest_kept() {
    let storage = Arc::new(InMemoryEventStorage::new());
    let uploader = Arc::new(ScriptedUploader::new());
    uploader.push_outcome(UploadOutcome::Rejected);
    let settings = EventQueueConfig { max_batch: 2, ..running() };
    let queue = assert_ok!(EventQueue::load(storage.clone(), uploader.clone(), &settings).await);
    for n in 0..3 {
        assert_ok!(queue.enqueue(record(n)).await);
    }

    queue.flush_if_due().await;

    assert_eq!(queue.records().await, vec![record(2)]);
    assert_eq!(storage.persisted(), Some(vec![record(2)]));
}

#[tokio::test]
async fn paused_queue_holds_records() {
    let storage = Arc::new(InMemoryEventStorage::new());
    let uploader = Arc::new(ScriptedUploader::new());
    let queue = assert_ok!(EventQueue::load(storage, uploader.clone(), &running()).await);
    assert_ok!(queue.enqueue(record(1)).await);

    queue.stop().await;
    assert!(!queue.flush_if_due().await);
    queue.start().await;
    assert!(queue.flush_if_due().await);

    assert_eq!(uploader.batches().len(), 1);
}
