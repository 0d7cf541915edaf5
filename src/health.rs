//! Health state machine
//!
//! Turns one boolean probe result per cycle into one of four states and
//! decides whether a notification fires. Only the two transition edges
//! (Outage onset, Recovery) produce a notification - repeated failures
//! surface as `OutageOngoing` cycles with no message, which is what keeps
//! a flapping or long-dead service from flooding the recipients.
//!
//! ```text
//! previous  current   state          notification
//! true      true      Healthy        none
//! false     true      Recovered      recovery
//! true      false     Outage         outage
//! false     false     OutageOngoing  none
//! ```

use chrono::{DateTime, Local, Utc};

use crate::config::MonitorConfig;
use crate::i18n::{self, Language, MessageContext};

/// Result of one probe cycle, derived from the previous and current
/// success bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum MonitorState {
    Healthy,
    Recovered,
    Outage,
    OutageOngoing,
}

impl MonitorState {
    pub fn from_transition(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (true, true) => MonitorState::Healthy,
            (false, true) => MonitorState::Recovered,
            (true, false) => MonitorState::Outage,
            (false, false) => MonitorState::OutageOngoing,
        }
    }

    /// Numeric response code carried in event rows.
    pub fn code(&self) -> u8 {
        match self {
            MonitorState::Healthy => 1,
            MonitorState::Recovered => 2,
            MonitorState::Outage => 3,
            MonitorState::OutageOngoing => 4,
        }
    }

    /// Action token for the event log.
    pub fn log_token(&self) -> &'static str {
        match self {
            MonitorState::Healthy => "healthy",
            MonitorState::Recovered => "recovered",
            MonitorState::Outage => "outage",
            MonitorState::OutageOngoing => "outage-ongoing",
        }
    }

    /// Whether this state produces a notification.
    pub fn notifies(&self) -> bool {
        matches!(self, MonitorState::Outage | MonitorState::Recovered)
    }
}

/// Outbound notification built for Outage and Recovered transitions only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub channel: String,
    pub subject: String,
    pub body: String,
    /// Recipient override from the monitor's email field; `None` lets the
    /// dispatcher fall back to its default recipients.
    pub recipients: Option<String>,
}

/// Immutable record emitted once per cycle.
#[derive(Debug, Clone)]
pub struct MonitorEvent {
    pub monitor: MonitorConfig,
    pub state: MonitorState,
    pub success: bool,
    pub utc: DateTime<Utc>,
    pub local: DateTime<Local>,
    pub message: String,
    pub status_bar: Option<String>,
    pub log_action: String,
    pub log_detail: String,
    pub csv_row: Vec<String>,
    pub notification: Option<NotificationMessage>,
    /// True exactly when this cycle flipped success/failure.
    pub status_changed: bool,
}

/// One success bit of memory per monitor key.
///
/// Created lazily on the first probe and kept for the monitor's lifetime;
/// the initial state is "assumed healthy" so the very first failed probe
/// reports an Outage instead of being absorbed silently.
#[derive(Debug, Clone)]
pub struct MonitorStateMachine {
    last_success: bool,
}

impl MonitorStateMachine {
    pub fn new() -> Self {
        Self { last_success: true }
    }

    /// Advance the machine by one cycle and render the resulting event.
    pub fn transition(
        &mut self,
        monitor: &MonitorConfig,
        success: bool,
        utc: DateTime<Utc>,
        local: DateTime<Local>,
    ) -> MonitorEvent {
        let previous = self.last_success;
        self.last_success = success;

        let state = MonitorState::from_transition(previous, success);
        let lang = Language::from_tag(monitor.language_tag());

        let ctx = MessageContext {
            name: monitor.name.clone(),
            kind: monitor.kind.to_uppercase(),
            url: monitor.url.clone(),
            interval: monitor.interval,
            timestamp: local.format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        let message = i18n::display_line(lang, state, &ctx);
        let status_bar = Some(i18n::status_bar_line(lang, state, &ctx));

        let csv_row = vec![
            ctx.timestamp.clone(),
            ctx.name.clone(),
            ctx.kind.clone(),
            ctx.url.clone(),
            i18n::csv_label(lang, state).to_string(),
            state.code().to_string(),
        ];

        let notification = match state {
            MonitorState::Outage => Some(NotificationMessage {
                channel: "email".to_string(),
                subject: format!("{}-outage", monitor.name),
                body: i18n::outage_body(lang, &ctx),
                recipients: monitor.normalized_email(),
            }),
            MonitorState::Recovered => Some(NotificationMessage {
                channel: "email".to_string(),
                subject: format!("{}-recovery", monitor.name),
                body: i18n::recovery_body(lang, &ctx),
                recipients: monitor.normalized_email(),
            }),
            _ => None,
        };

        MonitorEvent {
            monitor: monitor.clone(),
            state,
            success,
            utc,
            local,
            log_action: state.log_token().to_string(),
            log_detail: message.clone(),
            message,
            status_bar,
            csv_row,
            notification,
            status_changed: previous != success,
        }
    }
}

impl Default for MonitorStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
