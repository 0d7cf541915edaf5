//! Localized text projections for monitor events
//!
//! Purely presentational: nothing here affects control flow. Unknown
//! language tags fall back to English.

use crate::health::MonitorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    En,
    De,
}

impl Language {
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_lowercase().as_str() {
            "de" => Language::De,
            _ => Language::En,
        }
    }
}

/// Everything the templates interpolate for one cycle.
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub name: String,
    pub kind: String,
    pub url: String,
    pub interval: u64,
    pub timestamp: String,
}

/// Human-readable state label used in messages.
pub fn state_label(lang: Language, state: MonitorState) -> &'static str {
    match (lang, state) {
        (Language::En, MonitorState::Healthy) => "available",
        (Language::En, MonitorState::Recovered) => "available again",
        (Language::En, MonitorState::Outage) => "NOT available",
        (Language::En, MonitorState::OutageOngoing) => "still NOT available",
        (Language::De, MonitorState::Healthy) => "erreichbar",
        (Language::De, MonitorState::Recovered) => "wieder erreichbar",
        (Language::De, MonitorState::Outage) => "NICHT erreichbar",
        (Language::De, MonitorState::OutageOngoing) => "weiterhin NICHT erreichbar",
    }
}

/// Short label written into the CSV row.
pub fn csv_label(lang: Language, state: MonitorState) -> &'static str {
    match (lang, state) {
        (Language::En, MonitorState::Healthy) => "ok",
        (Language::En, MonitorState::Recovered) => "recovered",
        (Language::En, MonitorState::Outage) => "outage",
        (Language::En, MonitorState::OutageOngoing) => "outage ongoing",
        (Language::De, MonitorState::Healthy) => "ok",
        (Language::De, MonitorState::Recovered) => "wiederhergestellt",
        (Language::De, MonitorState::Outage) => "Ausfall",
        (Language::De, MonitorState::OutageOngoing) => "Ausfall dauert an",
    }
}

/// Full display line for the event log.
pub fn display_line(lang: Language, state: MonitorState, ctx: &MessageContext) -> String {
    let label = state_label(lang, state);
    match lang {
        Language::En => format!(
            "{}: service {} ({} {}) is {}",
            ctx.timestamp, ctx.name, ctx.kind, ctx.url, label
        ),
        Language::De => format!(
            "{}: Dienst {} ({} {}) ist {}",
            ctx.timestamp, ctx.name, ctx.kind, ctx.url, label
        ),
    }
}

/// One-line summary for a status bar.
pub fn status_bar_line(lang: Language, state: MonitorState, ctx: &MessageContext) -> String {
    format!("{}: {} ({})", ctx.name, state_label(lang, state), ctx.timestamp)
}

/// Notification body for an outage onset.
pub fn outage_body(lang: Language, ctx: &MessageContext) -> String {
    match lang {
        Language::En => format!(
            "Service {} ({} {}) stopped responding at {}.\nChecks run every {} seconds.",
            ctx.name, ctx.kind, ctx.url, ctx.timestamp, ctx.interval
        ),
        Language::De => format!(
            "Dienst {} ({} {}) antwortet seit {} nicht mehr.\nPruefintervall: {} Sekunden.",
            ctx.name, ctx.kind, ctx.url, ctx.timestamp, ctx.interval
        ),
    }
}

/// Notification body for a recovery.
pub fn recovery_body(lang: Language, ctx: &MessageContext) -> String {
    match lang {
        Language::En => format!(
            "Service {} ({} {}) is responding again since {}.",
            ctx.name, ctx.kind, ctx.url, ctx.timestamp
        ),
        Language::De => format!(
            "Dienst {} ({} {}) antwortet seit {} wieder.",
            ctx.name, ctx.kind, ctx.url, ctx.timestamp
        ),
    }
}
