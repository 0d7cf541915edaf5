//! Collaborator boundary traits
//!
//! The scheduler fans every cycle's event out to these seams. They are
//! implemented elsewhere (files, mail transport, UI); the engine only
//! depends on the contracts. All implementations must be `Send + Sync`
//! as they are shared across worker tasks.
//!
//! Failures at any seam are caught at the fan-out boundary and logged -
//! a failed email must never stop monitoring.

use async_trait::async_trait;
use tracing::info;

use crate::health::{MonitorEvent, NotificationMessage};

/// Append-only action log.
pub trait EventLog: Send + Sync {
    fn record_event(&self, action: &str, detail: &str) -> anyhow::Result<()>;
}

/// Append-only tabular sink, one row per cycle.
pub trait RowSink: Send + Sync {
    fn append_row(&self, columns: &[String], monitor_name: &str) -> anyhow::Result<()>;
}

/// Notification transport (email or otherwise).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn dispatch(&self, notification: &NotificationMessage) -> anyhow::Result<()>;
}

/// External observer of every emitted event (e.g. a UI).
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &MonitorEvent) -> anyhow::Result<()>;
}

/// Default log sink backed by structured tracing output.
pub struct TracingEventLog;

impl EventLog for TracingEventLog {
    fn record_event(&self, action: &str, detail: &str) -> anyhow::Result<()> {
        info!(action = %action, "{detail}");
        Ok(())
    }
}
