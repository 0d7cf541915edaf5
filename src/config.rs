use std::collections::HashMap;

use tracing::trace;

/// Configuration for a single monitored target.
///
/// Constructed by the external configuration loader and handed to the
/// scheduler by value; the scheduler never mutates it.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct MonitorConfig {
    /// Display name. Unique within one configuration, not globally.
    pub name: String,

    /// Raw address or URL string. SERVER monitors parse this themselves.
    pub url: String,

    /// Monitor kind as written in the config file (GET, POST, SERVER).
    /// Kept loosely typed on purpose; strategy lookup uppercases it.
    #[serde(rename = "type")]
    pub kind: String,

    /// Seconds between cycles. Zero re-runs immediately without a delay.
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Recipient list for notifications, overriding the dispatcher default.
    pub email: Option<String>,

    /// Request body for POST monitors.
    pub payload: Option<serde_json::Value>,

    /// Extra request headers for POST monitors.
    pub headers: Option<HashMap<String, String>>,

    /// Language tag for rendered messages (en, de). Unknown tags fall
    /// back to English.
    pub language: Option<String>,

    /// Per-monitor probe timeout override in seconds.
    pub timeout: Option<f64>,
}

impl MonitorConfig {
    /// Identity of the monitoring unit and its state machine.
    ///
    /// Stable across reconfigurations of the same logical monitor.
    pub fn key(&self) -> MonitorKey {
        MonitorKey {
            name: self.name.clone(),
            url: self.url.clone(),
            kind: self.kind.to_uppercase(),
        }
    }

    /// Recipient list with surrounding whitespace stripped; `None` when
    /// empty so the dispatcher falls back to its default recipients.
    pub fn normalized_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(str::to_string)
    }

    /// Language tag for message rendering, defaulting to English.
    pub fn language_tag(&self) -> &str {
        self.language.as_deref().unwrap_or("en")
    }
}

/// Hashable identity of one concurrent monitoring unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonitorKey {
    pub name: String,
    pub url: String,
    pub kind: String,
}

impl std::fmt::Display for MonitorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{} {}]", self.name, self.kind, self.url)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub monitors: Option<Vec<MonitorConfig>>,
}

fn default_interval() -> u64 {
    60
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config: &Config| trace!("loaded config: {config:?}"))
}
