const TIMEOUT_VAR: &str = "VIGIL_TIMEOUT";

const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

/// Resolve the probe timeout in seconds.
///
/// An explicit per-monitor override wins, then the `VIGIL_TIMEOUT`
/// environment variable, then the built-in default.
pub fn resolve_timeout(explicit: Option<f64>) -> f64 {
    if let Some(timeout) = explicit {
        return timeout;
    }

    let timeout_from_env = std::env::var(TIMEOUT_VAR);
    timeout_from_env.map_or(DEFAULT_TIMEOUT_SECS, |res| {
        res.parse().unwrap_or(DEFAULT_TIMEOUT_SECS)
    })
}
