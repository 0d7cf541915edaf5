//! Helper functions for integration tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vigil::health::{MonitorEvent, NotificationMessage};
use vigil::sinks::{EventLog, EventObserver, Notifier, RowSink};
use vigil::{EventSinks, MonitorConfig};

/// Collects everything the scheduler fans out, for later assertions.
#[derive(Default)]
pub struct Recording {
    pub events: Mutex<Vec<(String, String)>>,
    pub rows: Mutex<Vec<Vec<String>>>,
    pub notifications: Mutex<Vec<NotificationMessage>>,
    pub observed: Mutex<Vec<MonitorEvent>>,
}

impl Recording {
    pub fn notification_subjects(&self) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.subject.clone())
            .collect()
    }

    pub fn observed_count(&self) -> usize {
        self.observed.lock().unwrap().len()
    }
}

impl EventLog for Recording {
    fn record_event(&self, action: &str, detail: &str) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push((action.to_string(), detail.to_string()));
        Ok(())
    }
}

impl RowSink for Recording {
    fn append_row(&self, columns: &[String], _monitor_name: &str) -> anyhow::Result<()> {
        self.rows.lock().unwrap().push(columns.to_vec());
        Ok(())
    }
}

#[async_trait]
impl Notifier for Recording {
    async fn dispatch(&self, notification: &NotificationMessage) -> anyhow::Result<()> {
        self.notifications
            .lock()
            .unwrap()
            .push(notification.clone());
        Ok(())
    }
}

impl EventObserver for Recording {
    fn on_event(&self, event: &MonitorEvent) -> anyhow::Result<()> {
        self.observed.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub fn recording_sinks(recording: &Arc<Recording>) -> EventSinks {
    EventSinks {
        log: Arc::clone(recording) as Arc<dyn EventLog>,
        rows: Arc::clone(recording) as Arc<dyn RowSink>,
        notifier: Arc::clone(recording) as Arc<dyn Notifier>,
        observer: Some(Arc::clone(recording) as Arc<dyn EventObserver>),
    }
}

pub fn create_test_monitor(name: &str, url: &str, kind: &str, interval: u64) -> MonitorConfig {
    MonitorConfig {
        name: name.to_string(),
        url: url.to_string(),
        kind: kind.to_string(),
        interval,
        email: None,
        payload: None,
        headers: None,
        language: None,
        timeout: Some(2.0),
    }
}
