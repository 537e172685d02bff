//! Integration tests for the acquisition pipeline lifecycle
//!
//! These tests validate the complete channel workflow:
//! - Building producers and queues from a channel table
//! - Start/stop timing and repeated stops
//! - Backpressure on full queues
//! - Reconfiguring a running channel
//! - Polling and decoding on the monitor side

mod common;

use busdata_monitor::backend::{ChannelManager, ManagerOptions, ProducerState};
use busdata_monitor::config::{ChannelTable, DirectionMode, SourceKind};
use busdata_monitor::monitor::MonitorPoller;
use busdata_monitor::types::Direction;
use common::builders::{ChannelBuilder, SchemaBuilder};
use common::mock_helpers::{direction_tagged_factory, failing_factory, stalled_tx_factory};
use common::{registry_from, run_window};
use serial_test::serial;
use std::thread;
use std::time::{Duration, Instant};

fn registry() -> std::sync::Arc<busdata_monitor::SchemaRegistry> {
    registry_from(&[
        ("cmd", SchemaBuilder::new("cmd", 2).uint("opcode", 0, 0, 8).uint("arg", 1, 0, 8).build()),
        ("status", SchemaBuilder::new("status", 3).uint("ready", 0, 0, 1).build()),
    ])
}

#[test]
#[serial]
fn test_start_then_stop_within_timeout() {
    let table: ChannelTable = [ChannelBuilder::new("CH1", "cmd").freq(1.0).build()]
        .into_iter()
        .collect();
    let options = ManagerOptions::default().with_stop_timeout(Duration::from_secs(1));
    let mut manager = ChannelManager::from_config(&table, &registry(), options).unwrap();

    assert_eq!(manager.start_all().unwrap(), 1);
    let begin = Instant::now();
    assert!(manager.stop_all());
    assert!(begin.elapsed() < Duration::from_secs(1));
    assert_eq!(manager.states_for("CH1"), vec![(Direction::Tx, ProducerState::Idle)]);

    // repeated stops are harmless
    assert!(manager.stop_all());
}

#[test]
#[serial]
fn test_both_directions_share_one_queue() {
    let table: ChannelTable = [ChannelBuilder::new("CH1", "cmd")
        .per_direction("cmd", "status")
        .freq(200.0)
        .build()]
    .into_iter()
    .collect();
    let options = ManagerOptions::default().with_source_factory(direction_tagged_factory());
    let mut manager = ChannelManager::from_config(&table, &registry(), options).unwrap();

    manager.start_all().unwrap();
    thread::sleep(run_window());
    manager.stop_all();

    let entries = manager.queue_for("CH1").unwrap().drain();
    let tx: Vec<_> = entries.iter().filter(|e| e.direction == Direction::Tx).collect();
    let rx: Vec<_> = entries.iter().filter(|e| e.direction == Direction::Rx).collect();
    assert!(!tx.is_empty() && !rx.is_empty());
    assert!(tx.iter().all(|e| e.hex == "01 01"));
    assert!(rx.iter().all(|e| e.hex == "02 02 02"));
}

#[test]
#[serial]
fn test_fast_producer_never_exceeds_capacity() {
    let table: ChannelTable = [ChannelBuilder::new("CH1", "cmd").freq(2000.0).build()]
        .into_iter()
        .collect();
    let options = ManagerOptions::default().with_queue_capacity(8);
    let mut manager = ChannelManager::from_config(&table, &registry(), options).unwrap();

    manager.start_all().unwrap();
    thread::sleep(run_window());
    let reader = manager.queue_for("CH1").unwrap();
    assert!(reader.len() <= 8);
    manager.stop_all();

    let (_, stats) = manager.stats_for("CH1")[0];
    assert_eq!(stats.produced, 8);
    assert!(stats.dropped > 0);
    assert_eq!(reader.drain().len(), 8);
}

#[test]
#[serial]
fn test_stalled_producer_does_not_block_stop_all() {
    let table: ChannelTable = [
        ChannelBuilder::new("A", "cmd")
            .per_direction("cmd", "status")
            .freq(200.0)
            .build(),
        ChannelBuilder::new("B", "status").direction(DirectionMode::Rx).freq(200.0).build(),
    ]
    .into_iter()
    .collect();
    let timeout = Duration::from_millis(300);
    let options = ManagerOptions::default()
        .with_stop_timeout(timeout)
        .with_source_factory(stalled_tx_factory(Duration::from_secs(3)));
    let mut manager = ChannelManager::from_config(&table, &registry(), options).unwrap();

    assert_eq!(manager.start_all().unwrap(), 3);
    thread::sleep(run_window());

    let begin = Instant::now();
    assert!(!manager.stop_all());
    let elapsed = begin.elapsed();
    // one shared deadline, not one timeout per producer
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout * 3, "stop_all took {:?}", elapsed);

    assert_eq!(
        manager.states_for("A"),
        vec![(Direction::Tx, ProducerState::Idle), (Direction::Rx, ProducerState::Idle)]
    );
    assert_eq!(manager.states_for("B"), vec![(Direction::Rx, ProducerState::Idle)]);
    assert!(!manager.is_running("A"));
    assert!(!manager.is_running("B"));
}

#[test]
#[serial]
fn test_failing_source_keeps_running() {
    let table: ChannelTable = [ChannelBuilder::new("CH1", "cmd").freq(500.0).build()]
        .into_iter()
        .collect();
    let options = ManagerOptions::default().with_source_factory(failing_factory());
    let mut manager = ChannelManager::from_config(&table, &registry(), options).unwrap();

    manager.start_all().unwrap();
    thread::sleep(run_window());
    assert!(manager.is_running("CH1"));
    assert!(manager.stop_all());

    let (_, stats) = manager.stats_for("CH1")[0];
    assert!(stats.failed > 1);
    assert_eq!(stats.produced, 0);
    assert!(manager.queue_for("CH1").unwrap().is_empty());
}

#[test]
#[serial]
fn test_pause_and_resume_all() {
    let table: ChannelTable = [
        ChannelBuilder::new("A", "cmd").freq(500.0).build(),
        ChannelBuilder::new("B", "status").direction(DirectionMode::Rx).freq(500.0).build(),
    ]
    .into_iter()
    .collect();
    let mut manager =
        ChannelManager::from_config(&table, &registry(), ManagerOptions::default()).unwrap();

    manager.start_all().unwrap();
    assert_eq!(manager.pause_all(), 2);
    assert_eq!(manager.states_for("B"), vec![(Direction::Rx, ProducerState::Paused)]);
    assert_eq!(manager.resume_all(), 2);
    assert_eq!(manager.resume_all(), 0);
    assert!(manager.stop_all());
}

#[test]
#[serial]
fn test_apply_config_keeps_reader_and_restarts() {
    let table: ChannelTable = [ChannelBuilder::new("CH1", "cmd").freq(200.0).build()]
        .into_iter()
        .collect();
    let options = ManagerOptions::default().with_source(SourceKind::Hardware);
    let mut manager = ChannelManager::from_config(&table, &registry(), options).unwrap();
    let reader = manager.queue_for("CH1").unwrap();

    manager.start_all().unwrap();
    thread::sleep(Duration::from_millis(50));

    let updated = ChannelBuilder::new("CH1", "status")
        .direction(DirectionMode::Rx)
        .freq(200.0)
        .build();
    manager.apply_config(updated).unwrap();
    assert!(manager.is_running("CH1"));
    assert_eq!(manager.schema_for("CH1", Direction::Rx), Some("status"));
    assert_eq!(manager.config_for("CH1").map(|c| c.direction), Some(DirectionMode::Rx));

    reader.clear();
    thread::sleep(Duration::from_millis(50));
    manager.stop_all();

    let entries = reader.drain();
    assert!(!entries.is_empty());
    assert!(entries
        .iter()
        .all(|e| e.direction == Direction::Rx && e.hex == "55 55 55"));
}

#[test]
#[serial]
fn test_poller_decodes_live_frames() {
    let table: ChannelTable = [ChannelBuilder::new("CH1", "cmd")
        .per_direction("cmd", "status")
        .freq(200.0)
        .build()]
    .into_iter()
    .collect();
    let registry = registry();
    let options = ManagerOptions::default().with_source(SourceKind::Hardware);
    let mut manager = ChannelManager::from_config(&table, &registry, options).unwrap();
    let mut poller = MonitorPoller::for_channel(&manager, "CH1")
        .unwrap()
        .with_max_rows(5);

    manager.start_all().unwrap();
    thread::sleep(run_window());
    manager.stop_all();

    let drained = poller.poll();
    assert!(drained > 5);
    assert_eq!(poller.rows().len(), 5);
    assert_eq!(poller.frame_count(), drained as u64);

    for index in 0..poller.rows().len() {
        let frame = poller.inspect(index, &registry).unwrap().unwrap();
        match poller.row(index).unwrap().direction {
            Direction::Tx => assert_eq!(frame.get("opcode").map(|v| v.to_string()), Some("170".into())),
            Direction::Rx => assert_eq!(frame.get("ready").map(|v| v.to_string()), Some("0".into())),
        }
    }
}
