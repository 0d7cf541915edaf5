//! HTTP service probes
//!
//! Success is a status code in [200, 400); redirects count as reachable.
//! Transport errors (refused, timeout, DNS) reduce to `false` and never
//! cross the probe boundary.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, trace};

fn is_success(status: u16) -> bool {
    (200..400).contains(&status)
}

fn build_client(timeout: f64) -> Option<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs_f64(timeout))
        .build()
        .inspect_err(|e| debug!("failed to build HTTP client: {e}"))
        .ok()
}

/// GET probe. `true` iff the service answered with a status in [200, 400).
pub async fn http_probe(url: &str, timeout: f64) -> bool {
    let Some(client) = build_client(timeout) else {
        return false;
    };

    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            trace!("{url}: responded with {status}");
            is_success(status)
        }
        Err(e) => {
            debug!("{url}: GET probe failed: {e}");
            false
        }
    }
}

/// POST probe with an optional JSON payload and extra headers.
pub async fn http_post_probe(
    url: &str,
    payload: Option<&serde_json::Value>,
    headers: Option<&HashMap<String, String>>,
    timeout: f64,
) -> bool {
    let Some(client) = build_client(timeout) else {
        return false;
    };

    let mut request = client.post(url);
    if let Some(payload) = payload {
        request = request.json(payload);
    }
    if let Some(headers) = headers {
        for (name, value) in headers {
            request = request.header(name, value);
        }
    }

    match request.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            trace!("{url}: responded with {status}");
            is_success(status)
        }
        Err(e) => {
            debug!("{url}: POST probe failed: {e}");
            false
        }
    }
}
