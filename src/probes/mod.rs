//! Reachability probes
//!
//! Each probe checks one transport layer and reduces every transport-level
//! failure to a boolean result:
//!
//! - **TCP**: plain socket connect ([`net::check_socket_connectivity`])
//! - **ICMP**: raw-socket echo with a subprocess-ping fallback when the
//!   process lacks raw-socket privilege ([`net::ping_probe`],
//!   [`icmp::icmp_probe`])
//! - **HTTP**: GET/POST with status classification ([`http::http_probe`],
//!   [`http::http_post_probe`])
//!
//! The composite SERVER verdict ([`net::server_check`]) logs the lower-layer
//! signals but decides on the HTTP result alone.

pub mod http;
pub mod icmp;
pub mod net;
