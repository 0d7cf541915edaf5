//! Raw-socket ICMP echo prober
//!
//! The blocking send/await primitive runs on the blocking thread pool; the
//! async wrappers here are what the probe chain calls. Opening a raw ICMP
//! socket requires elevated privileges on most platforms - the resulting
//! `PermissionDenied` is propagated so the caller can fall back to the
//! platform ping utility.

use std::io;
use std::mem::MaybeUninit;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::packet::{self, build_echo_request};

/// Identifier stamped into outgoing echo requests.
pub fn echo_id() -> u16 {
    (std::process::id() & 0xFFFF) as u16
}

fn open_raw_socket() -> io::Result<Socket> {
    Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
}

/// Send one echo request and wait for the matching reply.
///
/// Blocks up to `timeout`; each receive recomputes the remaining budget so
/// unrelated ICMP traffic cannot extend the wait. Returns the elapsed
/// round-trip time, or `None` on timeout. Privilege and socket errors are
/// returned to the caller untouched.
pub fn send_and_await_reply(
    dest: IpAddr,
    packet: &[u8],
    sequence: u16,
    timeout: Duration,
) -> io::Result<Option<Duration>> {
    let socket = open_raw_socket()?;

    let addr = SocketAddr::new(dest, 0);
    let sent_at = Instant::now();
    socket.send_to(packet, &addr.into())?;

    let mut buf = [MaybeUninit::<u8>::uninit(); 512];

    loop {
        let elapsed = sent_at.elapsed();
        let Some(remaining) = timeout.checked_sub(elapsed) else {
            return Ok(None);
        };
        if remaining.is_zero() {
            return Ok(None);
        }

        socket.set_read_timeout(Some(remaining))?;

        let received = match socket.recv(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        // SAFETY: recv initialized the first `received` bytes
        let datagram =
            unsafe { std::slice::from_raw_parts(buf.as_ptr() as *const u8, received) };

        match packet::parse_reply(datagram) {
            Some(header) if header.is_echo_reply() && header.sequence == sequence => {
                return Ok(Some(sent_at.elapsed()));
            }
            other => {
                trace!("ignoring non-matching datagram: {other:?}");
                // keep waiting against the shrinking budget
            }
        }
    }
}

/// One echo request/reply round trip, run off the async runtime.
pub async fn ping_once(
    dest: IpAddr,
    sequence: u16,
    timeout: Duration,
) -> io::Result<Option<Duration>> {
    let packet = build_echo_request(echo_id(), sequence);

    tokio::task::spawn_blocking(move || send_and_await_reply(dest, &packet, sequence, timeout))
        .await
        .map_err(io::Error::other)?
}

/// One-shot auxiliary reachability signal.
///
/// Sends a single echo request and accepts any echo reply inside the
/// timeout window, without sequence gating. Every failure - including
/// missing raw-socket privilege - reduces to `false`; the result is only
/// ever logged, never authoritative.
pub async fn icmp_probe(host: &str, timeout: f64) -> bool {
    let Some(dest) = resolve_host(host).await else {
        debug!("icmp probe: could not resolve {host}");
        return false;
    };

    let budget = Duration::from_secs_f64(timeout);
    let result = tokio::task::spawn_blocking(move || one_shot(dest, budget)).await;

    match result {
        Ok(Ok(reachable)) => reachable,
        Ok(Err(e)) => {
            debug!("icmp probe against {host} failed: {e}");
            false
        }
        Err(e) => {
            debug!("icmp probe task for {host} failed: {e}");
            false
        }
    }
}

fn one_shot(dest: IpAddr, timeout: Duration) -> io::Result<bool> {
    let socket = open_raw_socket()?;
    let packet = build_echo_request(echo_id(), 1);

    let addr = SocketAddr::new(dest, 0);
    let sent_at = Instant::now();
    socket.send_to(&packet, &addr.into())?;

    let mut buf = [MaybeUninit::<u8>::uninit(); 512];

    loop {
        let Some(remaining) = timeout.checked_sub(sent_at.elapsed()) else {
            return Ok(false);
        };
        if remaining.is_zero() {
            return Ok(false);
        }

        socket.set_read_timeout(Some(remaining))?;

        let received = match socket.recv(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        // SAFETY: recv initialized the first `received` bytes
        let datagram =
            unsafe { std::slice::from_raw_parts(buf.as_ptr() as *const u8, received) };

        if let Some(header) = packet::parse_reply(datagram) {
            if header.is_echo_reply() {
                return Ok(true);
            }
        }
    }
}

/// Invoke the platform ping utility as an unprivileged fallback.
///
/// Tolerates the utility being absent: spawn failures and non-zero exit
/// codes both reduce to `false`.
pub async fn system_ping(host: &str, timeout: f64) -> bool {
    let output = build_ping_command(host, timeout).output().await;

    match output {
        Ok(output) => output.status.success(),
        Err(e) => {
            debug!("system ping for {host} unavailable: {e}");
            false
        }
    }
}

#[cfg(not(windows))]
fn build_ping_command(host: &str, timeout: f64) -> Command {
    let mut cmd = Command::new("ping");
    cmd.arg("-c")
        .arg("1")
        .arg("-W")
        .arg(format!("{}", timeout.ceil() as u64))
        .arg(host);
    cmd
}

#[cfg(windows)]
fn build_ping_command(host: &str, timeout: f64) -> Command {
    let mut cmd = Command::new("ping");
    cmd.arg("-n")
        .arg("1")
        .arg("-w")
        .arg(format!("{}", (timeout * 1000.0).ceil() as u64))
        .arg(host);
    cmd
}

pub(crate) async fn resolve_host(host: &str) -> Option<IpAddr> {
    let lookup = tokio::net::lookup_host((host, 0)).await.ok()?;

    // raw ICMPv4 socket, so prefer an IPv4 address
    let mut fallback = None;
    for addr in lookup {
        match addr.ip() {
            ip @ IpAddr::V4(_) => return Some(ip),
            ip => fallback = Some(ip),
        }
    }
    fallback
}
