//! Concurrency guarantees of the scheduler
//!
//! These tests verify that:
//! - Cycles for one monitor key never overlap (strictly sequential)
//! - Workers for different monitors run in parallel
//! - stop() interrupts sleeping workers promptly

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use vigil::strategy::{ProbeStrategy, StrategyRegistry};
use vigil::{MonitorConfig, Scheduler};

use super::helpers::{Recording, create_test_monitor, recording_sinks};

/// Probe that tracks per-monitor and global concurrency while it sleeps.
#[derive(Debug)]
struct TrackingStrategy {
    per_monitor: Mutex<HashMap<String, usize>>,
    global: AtomicUsize,
    max_global: AtomicUsize,
    overlapped: AtomicBool,
}

impl TrackingStrategy {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            per_monitor: Mutex::new(HashMap::new()),
            global: AtomicUsize::new(0),
            max_global: AtomicUsize::new(0),
            overlapped: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl ProbeStrategy for TrackingStrategy {
    async fn run(&self, monitor: &MonitorConfig) -> anyhow::Result<bool> {
        {
            let mut per_monitor = self.per_monitor.lock().unwrap();
            let entry = per_monitor.entry(monitor.name.clone()).or_insert(0);
            *entry += 1;
            if *entry > 1 {
                self.overlapped.store(true, Ordering::SeqCst);
            }
        }

        let global = self.global.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_global.fetch_max(global, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(20)).await;

        self.global.fetch_sub(1, Ordering::SeqCst);
        *self
            .per_monitor
            .lock()
            .unwrap()
            .get_mut(&monitor.name)
            .unwrap() -= 1;

        Ok(true)
    }
}

fn registry_with(strategy: Arc<TrackingStrategy>) -> StrategyRegistry {
    let mut registry = StrategyRegistry::empty();
    registry.register("TRACKED", strategy);
    registry
}

#[tokio::test]
async fn cycles_for_one_key_never_overlap() {
    let strategy = TrackingStrategy::new();
    let recording = Arc::new(Recording::default());
    let scheduler = Scheduler::with_registry(
        registry_with(strategy.clone()),
        recording_sinks(&recording),
    );

    // zero interval maximizes the chance of overlap if cycles were concurrent
    scheduler
        .start(vec![create_test_monitor(
            "solo",
            "http://solo.example.com",
            "TRACKED",
            0,
        )])
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    scheduler.stop().await;

    assert!(
        !strategy.overlapped.load(Ordering::SeqCst),
        "two probes ran concurrently for the same monitor key"
    );
    assert!(recording.observed_count() >= 2);
}

#[tokio::test]
async fn different_monitors_run_in_parallel() {
    let strategy = TrackingStrategy::new();
    let recording = Arc::new(Recording::default());
    let scheduler = Scheduler::with_registry(
        registry_with(strategy.clone()),
        recording_sinks(&recording),
    );

    let monitors = (0..4)
        .map(|i| {
            create_test_monitor(
                &format!("svc-{i}"),
                &format!("http://svc-{i}.example.com"),
                "TRACKED",
                0,
            )
        })
        .collect();

    scheduler.start(monitors).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    scheduler.stop().await;

    assert!(
        !strategy.overlapped.load(Ordering::SeqCst),
        "per-key sequencing violated"
    );
    assert!(
        strategy.max_global.load(Ordering::SeqCst) > 1,
        "monitors never ran in parallel"
    );
}

#[tokio::test]
async fn stop_interrupts_sleeping_worker() {
    let strategy = TrackingStrategy::new();
    let recording = Arc::new(Recording::default());
    let scheduler = Scheduler::with_registry(
        registry_with(strategy.clone()),
        recording_sinks(&recording),
    );

    // long interval: the worker spends almost all its time sleeping
    scheduler
        .start(vec![create_test_monitor(
            "sleepy",
            "http://sleepy.example.com",
            "TRACKED",
            3600,
        )])
        .unwrap();

    // let the first cycle complete
    tokio::time::sleep(Duration::from_millis(100)).await;

    let before = Instant::now();
    scheduler.stop().await;

    assert!(
        before.elapsed() < Duration::from_secs(2),
        "stop() had to wait out the full interval"
    );
    assert_eq!(scheduler.machine_count(), 0);
}
