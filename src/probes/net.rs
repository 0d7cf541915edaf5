//! Network probe chain
//!
//! Composes the transport-layer probes into the reachability signals the
//! strategies consume. The SERVER verdict computes socket, ping, and
//! auxiliary ICMP signals for diagnostic logging, but the authoritative
//! result is the HTTP probe alone - lower-layer reachability without a
//! responding application is still an outage.

use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument, trace};

use super::http::http_probe;
use super::icmp::{self, icmp_probe, ping_once, system_ping};

/// Echo attempts per ping probe; the total timeout budget is divided
/// evenly across them.
pub const PING_ATTEMPTS: u32 = 3;

/// Pause after a successful echo before the next attempt.
const INTER_ATTEMPT_PAUSE: Duration = Duration::from_millis(700);

/// Plain TCP connect check. No retries.
pub async fn check_socket_connectivity(host: &str, port: u16, timeout_secs: f64) -> bool {
    let budget = Duration::from_secs_f64(timeout_secs);

    match timeout(budget, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            debug!("{host}:{port}: connect failed: {e}");
            false
        }
        Err(_) => {
            debug!("{host}:{port}: connect timed out");
            false
        }
    }
}

/// Multi-attempt raw ICMP ping.
///
/// Resolves the host once, divides the timeout budget evenly across
/// [`PING_ATTEMPTS`] echo requests (sequence numbers increase per attempt),
/// and succeeds when any attempt sees its reply. After a successful attempt
/// the prober pauses up to 700ms (capped by the remaining budget) to avoid
/// flooding the target. Raw-socket errors - privilege above all - switch to
/// the platform ping utility instead of failing the probe.
#[instrument(skip(timeout_secs))]
pub async fn ping_probe(host: &str, timeout_secs: f64) -> bool {
    let Some(dest) = icmp::resolve_host(host).await else {
        debug!("ping probe: could not resolve {host}");
        return false;
    };

    let total = Duration::from_secs_f64(timeout_secs);
    let per_attempt = total / PING_ATTEMPTS;
    let started = Instant::now();

    let mut reachable = false;

    for attempt in 0..PING_ATTEMPTS {
        let sequence = 1 + attempt as u16;

        match ping_once(dest, sequence, per_attempt).await {
            Ok(Some(rtt)) => {
                trace!("{host}: echo {sequence} answered in {rtt:?}");
                reachable = true;

                // pace successful echoes, bounded by what is left of the budget
                if attempt + 1 < PING_ATTEMPTS {
                    let remaining = total.saturating_sub(started.elapsed());
                    let pause = INTER_ATTEMPT_PAUSE.min(remaining);
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                }
            }
            Ok(None) => {
                trace!("{host}: echo {sequence} timed out");
            }
            Err(e) => {
                debug!("{host}: raw socket unavailable ({e}), using system ping");
                return system_ping(host, timeout_secs).await;
            }
        }
    }

    reachable
}

/// Composite SERVER check.
///
/// `suffix` is the path/query remainder of the parsed address, appended
/// verbatim behind the root slash. Socket, ping, and one-shot ICMP results
/// are diagnostics only; the HTTP GET of the reconstructed URL decides.
#[instrument(skip(timeout_secs))]
pub async fn server_check(
    scheme: &str,
    host: &str,
    port: u16,
    suffix: &str,
    timeout_secs: f64,
) -> bool {
    let socket_ok = check_socket_connectivity(host, port, timeout_secs).await;
    let ping_ok = ping_probe(host, timeout_secs).await;
    let icmp_ok = icmp_probe(host, timeout_secs).await;

    debug!("{host}:{port}: socket={socket_ok} ping={ping_ok} icmp={icmp_ok}");

    let url = format!("{scheme}://{host}:{port}/{suffix}");
    let http_ok = http_probe(&url, timeout_secs).await;

    trace!("{url}: http={http_ok} (authoritative)");

    http_ok
}
