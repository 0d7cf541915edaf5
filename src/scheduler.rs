//! Monitor scheduler
//!
//! Owns one worker task per active monitor and the registry of live state
//! machines, keyed by monitor identity. Each worker loops probe → state
//! transition → event fan-out, waiting out the configured interval in an
//! interruptible select on a shared stop channel.
//!
//! ```text
//! start(monitors)
//!     │ resolves every strategy up front (unsupported kind = fatal)
//!     ├── worker(api)    ──┐
//!     ├── worker(web)    ──┤  probe → transition → fan-out
//!     └── worker(db)     ──┘
//!                          │
//!            {event log, row sink, notifier, observer}
//! ```
//!
//! For a single monitor key, cycles run strictly sequentially - only that
//! monitor's worker advances its state machine. `stop()` joins every
//! worker before clearing the registry, so no event is emitted after it
//! returns.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::config::{MonitorConfig, MonitorKey};
use crate::health::{MonitorEvent, MonitorStateMachine};
use crate::sinks::{EventLog, EventObserver, Notifier, RowSink};
use crate::strategy::{ProbeStrategy, StrategyRegistry, UnsupportedKind};

type MachineRegistry = Arc<Mutex<HashMap<MonitorKey, MonitorStateMachine>>>;

/// The collaborators every event fans out to.
pub struct EventSinks {
    pub log: Arc<dyn EventLog>,
    pub rows: Arc<dyn RowSink>,
    pub notifier: Arc<dyn Notifier>,
    pub observer: Option<Arc<dyn EventObserver>>,
}

/// Errors surfaced by scheduler lifecycle operations.
#[derive(Debug)]
pub enum SchedulerError {
    /// `start` was called while the scheduler is already running.
    AlreadyRunning,

    /// `start` was called after `stop`.
    Stopped,

    /// A monitor references a kind with no registered strategy.
    UnsupportedKind(UnsupportedKind),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::AlreadyRunning => write!(f, "scheduler is already running"),
            SchedulerError::Stopped => write!(f, "scheduler has been stopped"),
            SchedulerError::UnsupportedKind(inner) => write!(f, "{inner}"),
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchedulerError::UnsupportedKind(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<UnsupportedKind> for SchedulerError {
    fn from(err: UnsupportedKind) -> Self {
        SchedulerError::UnsupportedKind(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

pub struct Scheduler {
    registry: StrategyRegistry,
    sinks: Arc<EventSinks>,
    machines: MachineRegistry,
    lifecycle: Mutex<Lifecycle>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl Scheduler {
    /// Scheduler with the built-in GET/POST/SERVER strategies.
    pub fn new(sinks: EventSinks) -> Self {
        Self::with_registry(StrategyRegistry::default(), sinks)
    }

    pub fn with_registry(registry: StrategyRegistry, sinks: EventSinks) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);

        Self {
            registry,
            sinks: Arc::new(sinks),
            machines: Arc::new(Mutex::new(HashMap::new())),
            lifecycle: Mutex::new(Lifecycle::Idle),
            workers: Mutex::new(Vec::new()),
            stop_tx,
            stop_rx,
        }
    }

    /// Spawn one worker per monitor.
    ///
    /// Every strategy is resolved before anything spawns, so a monitor
    /// with an unsupported kind fails the whole call and no worker runs.
    /// Non-reentrant: a second call errors.
    pub fn start(&self, monitors: Vec<MonitorConfig>) -> Result<(), SchedulerError> {
        let mut lifecycle = self.lifecycle.lock().expect("lifecycle poisoned");
        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running => return Err(SchedulerError::AlreadyRunning),
            Lifecycle::Stopped => return Err(SchedulerError::Stopped),
        }

        let mut resolved = Vec::with_capacity(monitors.len());
        for monitor in monitors {
            let strategy = self.registry.resolve(&monitor.kind)?;
            resolved.push((monitor, strategy));
        }

        *lifecycle = Lifecycle::Running;

        let mut workers = self.workers.lock().expect("workers poisoned");
        for (monitor, strategy) in resolved {
            let worker = MonitorWorker {
                monitor,
                strategy,
                machines: Arc::clone(&self.machines),
                sinks: Arc::clone(&self.sinks),
                stop_rx: self.stop_rx.clone(),
            };
            workers.push(tokio::spawn(worker.run()));
        }

        Ok(())
    }

    /// Signal every worker, wait for all of them to exit, then clear the
    /// state-machine registry. Idempotent; no event is emitted after this
    /// returns.
    pub async fn stop(&self) {
        {
            let mut lifecycle = self.lifecycle.lock().expect("lifecycle poisoned");
            *lifecycle = Lifecycle::Stopped;
        }

        let _ = self.stop_tx.send(true);

        let workers: Vec<_> = {
            let mut workers = self.workers.lock().expect("workers poisoned");
            workers.drain(..).collect()
        };

        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                error!("worker task failed during shutdown: {e}");
            }
        }

        self.machines
            .lock()
            .expect("machine registry poisoned")
            .clear();
    }

    /// Execute exactly one probe/transition cycle for a monitor.
    ///
    /// Reuses (or lazily creates) the monitor's persistent state machine
    /// and runs the same event fan-out as the background path, so results
    /// are consistent regardless of trigger source.
    pub async fn run_single_cycle(
        &self,
        monitor: &MonitorConfig,
        strategy_override: Option<Arc<dyn ProbeStrategy>>,
    ) -> Result<MonitorEvent, SchedulerError> {
        let strategy = match strategy_override {
            Some(strategy) => strategy,
            None => self.registry.resolve(&monitor.kind)?,
        };

        Ok(run_cycle(monitor, strategy.as_ref(), &self.machines, &self.sinks).await)
    }

    /// Drop state machines for monitors no longer in the active set.
    ///
    /// Only call while workers are quiesced (before `start` or after
    /// `stop`); a live worker would otherwise recreate its machine with a
    /// fresh "assumed healthy" state on the next cycle.
    pub fn prune_state_machines(&self, active: &[MonitorKey]) {
        let keep: HashSet<&MonitorKey> = active.iter().collect();
        self.machines
            .lock()
            .expect("machine registry poisoned")
            .retain(|key, _| keep.contains(key));
    }

    /// Number of live state machines. Exposed for tests and diagnostics.
    pub fn machine_count(&self) -> usize {
        self.machines
            .lock()
            .expect("machine registry poisoned")
            .len()
    }
}

/// One independent execution unit, owning the cycle loop for one monitor.
struct MonitorWorker {
    monitor: MonitorConfig,
    strategy: Arc<dyn ProbeStrategy>,
    machines: MachineRegistry,
    sinks: Arc<EventSinks>,
    stop_rx: watch::Receiver<bool>,
}

impl MonitorWorker {
    #[instrument(skip(self), fields(monitor = %self.monitor.name))]
    async fn run(mut self) {
        debug!(
            "starting monitor worker for {} with interval {}s",
            self.monitor.key(),
            self.monitor.interval
        );

        loop {
            if *self.stop_rx.borrow() {
                break;
            }

            run_cycle(&self.monitor, self.strategy.as_ref(), &self.machines, &self.sinks).await;

            // zero interval re-runs immediately without a delay
            if self.monitor.interval == 0 {
                continue;
            }

            let wait = Duration::from_secs(self.monitor.interval);
            tokio::select! {
                _ = self.stop_rx.changed() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        debug!("monitor worker stopped");
    }
}

/// Probe once, advance the state machine, fan the event out.
///
/// A probe error is logged and treated as a failed cycle so the state
/// machine still advances deterministically.
async fn run_cycle(
    monitor: &MonitorConfig,
    strategy: &dyn ProbeStrategy,
    machines: &MachineRegistry,
    sinks: &EventSinks,
) -> MonitorEvent {
    let success = match strategy.run(monitor).await {
        Ok(success) => success,
        Err(e) => {
            error!(monitor = %monitor.name, url = %monitor.url, "probe failed: {e:#}");
            false
        }
    };

    let event = {
        let mut machines = machines.lock().expect("machine registry poisoned");
        let machine = machines.entry(monitor.key()).or_default();
        machine.transition(monitor, success, Utc::now(), Local::now())
    };

    handle_event(sinks, &event).await;

    event
}

/// Fan one event out to every sink.
///
/// The steps are independently guarded: a failing notifier or observer
/// cannot undo the log/row writes that already happened, and none of them
/// may kill the worker.
async fn handle_event(sinks: &EventSinks, event: &MonitorEvent) {
    if let Err(e) = sinks.log.record_event(&event.log_action, &event.log_detail) {
        error!("event log rejected entry: {e:#}");
    }

    if let Err(e) = sinks.rows.append_row(&event.csv_row, &event.monitor.name) {
        error!("row sink rejected row: {e:#}");
    }

    if let Some(notification) = &event.notification {
        if let Err(e) = sinks.notifier.dispatch(notification).await {
            error!(
                subject = %notification.subject,
                "notification dispatch failed: {e:#}"
            );
        }
    }

    if let Some(observer) = &sinks.observer {
        if let Err(e) = observer.on_event(event) {
            error!("event observer failed: {e:#}");
        }
    }
}
