//! Probe strategies
//!
//! A strategy maps a monitor's declared kind to its composed probe chain.
//! Strategies are stateless apart from the SERVER strategy's bounded
//! address-parse cache, which is safe to discard at any time.
//!
//! Lookup happens once, at scheduler start, through [`StrategyRegistry`];
//! an unsupported kind is a configuration error surfaced as a tagged
//! result, never an exception mid-flight.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::trace;

use crate::config::MonitorConfig;
use crate::probes::http::{http_post_probe, http_probe};
use crate::probes::net::server_check;
use crate::util::resolve_timeout;

/// Capability of running one probe cycle for a monitor.
///
/// Implementations must be `Send + Sync`; they are shared across worker
/// tasks. Errors are caught at the per-cycle boundary and mapped to a
/// failed probe, so transient trouble never kills a worker.
#[async_trait]
pub trait ProbeStrategy: Send + Sync + fmt::Debug {
    async fn run(&self, monitor: &MonitorConfig) -> anyhow::Result<bool>;
}

/// HTTP GET against the monitor's URL.
#[derive(Debug)]
pub struct GetStrategy;

#[async_trait]
impl ProbeStrategy for GetStrategy {
    async fn run(&self, monitor: &MonitorConfig) -> anyhow::Result<bool> {
        let timeout = resolve_timeout(monitor.timeout);
        Ok(http_probe(&monitor.url, timeout).await)
    }
}

/// HTTP POST with the monitor's payload and headers.
#[derive(Debug)]
pub struct PostStrategy;

#[async_trait]
impl ProbeStrategy for PostStrategy {
    async fn run(&self, monitor: &MonitorConfig) -> anyhow::Result<bool> {
        let timeout = resolve_timeout(monitor.timeout);
        Ok(http_post_probe(
            &monitor.url,
            monitor.payload.as_ref(),
            monitor.headers.as_ref(),
            timeout,
        )
        .await)
    }
}

/// Address string broken into its routing parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// Path/query/fragment remainder, preserved verbatim without the
    /// leading slash.
    pub suffix: String,
}

impl ParsedAddress {
    /// Port to dial: the explicit one, else the scheme default.
    pub fn effective_port(&self) -> u16 {
        self.port
            .unwrap_or(if self.scheme == "https" { 443 } else { 80 })
    }
}

/// Parse a free-form address string into `(scheme, host, port, suffix)`.
///
/// A missing scheme defaults to `http`; a `host:port` segment must carry a
/// numeric port.
pub fn parse_network_address(raw: &str) -> anyhow::Result<ParsedAddress> {
    let (scheme, rest) = raw
        .split_once("://")
        .unwrap_or(("http", raw));

    let (host_port, suffix) = rest
        .split_once('/')
        .unwrap_or((rest, ""));

    let (host, port) = match host_port.split_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("invalid port in address '{raw}'"))?;
            (host, Some(port))
        }
        None => (host_port, None),
    };

    if host.is_empty() {
        anyhow::bail!("no host in address '{raw}'");
    }

    Ok(ParsedAddress {
        scheme: scheme.to_string(),
        host: host.to_string(),
        port,
        suffix: suffix.to_string(),
    })
}

/// Composite reachability check for SERVER monitors.
///
/// Parsed addresses are cached per URL string so repeated cycles skip the
/// parse; the cache is bounded and cleared wholesale when full.
#[derive(Debug)]
pub struct ServerStrategy {
    parse_cache: Mutex<HashMap<String, ParsedAddress>>,
}

const PARSE_CACHE_CAP: usize = 128;

impl ServerStrategy {
    pub fn new() -> Self {
        Self {
            parse_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Drop all cached parse results. Called on reconfiguration.
    pub fn clear_cache(&self) {
        self.parse_cache.lock().expect("parse cache poisoned").clear();
    }

    fn parsed(&self, url: &str) -> anyhow::Result<ParsedAddress> {
        let mut cache = self.parse_cache.lock().expect("parse cache poisoned");

        if let Some(hit) = cache.get(url) {
            trace!("address cache hit for {url}");
            return Ok(hit.clone());
        }

        let parsed = parse_network_address(url)?;

        if cache.len() >= PARSE_CACHE_CAP {
            cache.clear();
        }
        cache.insert(url.to_string(), parsed.clone());

        Ok(parsed)
    }
}

impl Default for ServerStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProbeStrategy for ServerStrategy {
    async fn run(&self, monitor: &MonitorConfig) -> anyhow::Result<bool> {
        let address = self.parsed(&monitor.url)?;
        let timeout = resolve_timeout(monitor.timeout);

        Ok(server_check(
            &address.scheme,
            &address.host,
            address.effective_port(),
            &address.suffix,
            timeout,
        )
        .await)
    }
}

/// A monitor kind with no registered strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedKind {
    pub kind: String,
}

impl fmt::Display for UnsupportedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported monitor kind: {}", self.kind)
    }
}

impl std::error::Error for UnsupportedKind {}

/// Registry mapping uppercased monitor kinds to strategies.
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn ProbeStrategy>>,
}

impl StrategyRegistry {
    /// Empty registry with no registrations.
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Register a strategy under a kind; the kind is uppercased.
    pub fn register(&mut self, kind: &str, strategy: Arc<dyn ProbeStrategy>) {
        self.strategies.insert(kind.to_uppercase(), strategy);
    }

    /// Resolve a kind to its strategy, uppercasing the lookup key.
    pub fn resolve(&self, kind: &str) -> Result<Arc<dyn ProbeStrategy>, UnsupportedKind> {
        self.strategies
            .get(&kind.to_uppercase())
            .cloned()
            .ok_or_else(|| UnsupportedKind {
                kind: kind.to_string(),
            })
    }
}

impl Default for StrategyRegistry {
    /// Registry with the built-in GET, POST, and SERVER strategies.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("GET", Arc::new(GetStrategy));
        registry.register("POST", Arc::new(PostStrategy));
        registry.register("SERVER", Arc::new(ServerStrategy::new()));
        registry
    }
}
