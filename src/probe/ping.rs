//! Reachability probe: one ICMP echo request, boolean verdict.
//!
//! Uses native ICMP sockets when available (blocking sockets in
//! spawn_blocking), falling back to the system ping command otherwise.
//! Every failure mode collapses to `false`; this probe never errors
//! outward and never prints probe output.

use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::process::Stdio;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::process::Command;

use super::ProbeError;

/// ICMP capability state
#[derive(Debug, Clone, Copy, PartialEq)]
enum IcmpCapability {
    /// Native ICMP sockets are available
    Native,
    /// Only command fallback is available
    CommandOnly,
}

static ICMP_CAPABILITY: OnceLock<IcmpCapability> = OnceLock::new();

/// Ping sequence counter for unique identification
static PING_SEQUENCE: AtomicU16 = AtomicU16::new(0);

/// Generate a unique identifier for each echo request so concurrent pings
/// to the same destination can be told apart.
fn generate_ping_id() -> (u16, u16) {
    let identifier: u16 = rand::random();
    let sequence = PING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    (identifier, sequence)
}

/// Detect ICMP capability by attempting to create a socket.
fn detect_icmp_capability() -> IcmpCapability {
    // Try RAW socket first (requires CAP_NET_RAW or root)
    if Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)).is_ok() {
        tracing::debug!("ping probe: using native ICMP (RAW socket, privileged)");
        return IcmpCapability::Native;
    }

    // Try DGRAM (unprivileged on Linux with ping_group_range set, or macOS)
    if Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::ICMPV4)).is_ok() {
        tracing::debug!("ping probe: using native ICMP (DGRAM socket, unprivileged)");
        return IcmpCapability::Native;
    }

    tracing::debug!("ping probe: native ICMP unavailable, using command fallback");
    IcmpCapability::CommandOnly
}

/// Probe reachability of `host` with one echo request.
///
/// Returns `true` only when an echo reply (or a successful ping command
/// exit) arrives within `timeout`. Resolution failures, timeouts, and a
/// missing ping facility all return `false`.
pub async fn probe_ping(host: &str, timeout: Duration) -> bool {
    match run_ping_probe(host, timeout).await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("ping probe failed for {}: {}", host, e);
            false
        }
    }
}

async fn run_ping_probe(host: &str, timeout: Duration) -> Result<(), ProbeError> {
    let capability = *ICMP_CAPABILITY.get_or_init(detect_icmp_capability);

    if capability == IcmpCapability::Native {
        // Resolve before spawn_blocking (DNS is async)
        let ip = resolve_host(host).await?;
        let host_owned = host.to_string();

        let result = tokio::task::spawn_blocking(move || run_blocking_ping(ip, timeout))
            .await
            .map_err(|e| ProbeError::Network(format!("spawn_blocking failed: {}", e)))?;

        match result {
            Ok(()) => return Ok(()),
            Err(e) => {
                // Unprivileged environments can pass socket creation but
                // fail on send; retry through the command path.
                let error_str = format!("{:?}", e);
                if error_str.contains("Permission")
                    || error_str.contains("Operation not permitted")
                    || error_str.contains("denied")
                {
                    tracing::debug!(
                        "native ping failed with permission error for {}, falling back to command",
                        host_owned
                    );
                    return run_ping_command(&host_owned, timeout).await;
                }
                return Err(e);
            }
        }
    }

    run_ping_command(host, timeout).await
}

/// Resolve a host to an IP address.
async fn resolve_host(host: &str) -> Result<IpAddr, ProbeError> {
    // Try direct parse first
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs: Vec<_> = tokio::net::lookup_host(format!("{}:0", host))
        .await
        .map_err(|e| ProbeError::Network(format!("DNS resolution failed: {}", e)))?
        .collect();

    addrs
        .into_iter()
        .next()
        .map(|sa| sa.ip())
        .ok_or_else(|| ProbeError::Network(format!("no addresses found for {}", host)))
}

/// Run blocking ICMP ping. This runs in a dedicated thread via spawn_blocking.
fn run_blocking_ping(ip: IpAddr, timeout: Duration) -> Result<(), ProbeError> {
    match ip {
        IpAddr::V4(v4) => run_blocking_ping_v4(v4, timeout),
        IpAddr::V6(v6) => run_blocking_ping_v6(v6, timeout),
    }
}

/// ICMP Echo Request for IPv4
fn run_blocking_ping_v4(ip: Ipv4Addr, timeout: Duration) -> Result<(), ProbeError> {
    // Try RAW first (privileged), then DGRAM (unprivileged)
    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
        .or_else(|_| Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::ICMPV4)))
        .map_err(|e| ProbeError::Network(format!("failed to create ICMP socket: {}", e)))?;

    socket
        .set_read_timeout(Some(timeout))
        .map_err(|e| ProbeError::Network(format!("failed to set timeout: {}", e)))?;
    socket
        .set_write_timeout(Some(timeout))
        .map_err(|e| ProbeError::Network(format!("failed to set timeout: {}", e)))?;

    let dest = SocketAddr::new(IpAddr::V4(ip), 0);
    socket
        .connect(&dest.into())
        .map_err(|e| ProbeError::Network(format!("failed to connect: {}", e)))?;

    let (identifier, sequence) = generate_ping_id();
    let packet = build_icmp_echo_request(identifier, sequence);

    let start = Instant::now();

    socket.send(&packet).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            ProbeError::Network(format!("Permission denied: {}", e))
        } else {
            ProbeError::Network(format!("failed to send: {}", e))
        }
    })?;

    // Receive loop: wait for OUR reply or timeout
    loop {
        let mut buf: [MaybeUninit<u8>; 1500] = unsafe { MaybeUninit::uninit().assume_init() };
        let len = socket.recv(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut
            {
                ProbeError::Timeout(timeout)
            } else {
                ProbeError::Network(format!("failed to receive: {}", e))
            }
        })?;
        // SAFETY: recv initialized `len` bytes
        let buf: &[u8] = unsafe { std::slice::from_raw_parts(buf.as_ptr() as *const u8, len) };

        if start.elapsed() >= timeout {
            return Err(ProbeError::Timeout(timeout));
        }

        // Verify this is our echo reply.
        // DGRAM sockets deliver just the ICMP header; RAW includes the IP header.
        if len >= 8 {
            let icmp_offset = if buf[0] >> 4 == 4 { 20 } else { 0 };
            if len > icmp_offset + 7 {
                let reply_type = buf[icmp_offset];
                let reply_id = u16::from_be_bytes([buf[icmp_offset + 4], buf[icmp_offset + 5]]);
                let reply_seq = u16::from_be_bytes([buf[icmp_offset + 6], buf[icmp_offset + 7]]);

                // ICMP type 0 = Echo Reply
                if reply_type == 0 && reply_id == identifier && reply_seq == sequence {
                    return Ok(());
                }
                // Wrong packet - keep waiting for the right one
            }
        }
    }
}

/// ICMP Echo Request for IPv6
fn run_blocking_ping_v6(ip: Ipv6Addr, timeout: Duration) -> Result<(), ProbeError> {
    let socket = Socket::new(Domain::IPV6, Type::RAW, Some(Protocol::ICMPV6))
        .or_else(|_| Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::ICMPV6)))
        .map_err(|e| ProbeError::Network(format!("failed to create ICMPv6 socket: {}", e)))?;

    socket
        .set_read_timeout(Some(timeout))
        .map_err(|e| ProbeError::Network(format!("failed to set timeout: {}", e)))?;
    socket
        .set_write_timeout(Some(timeout))
        .map_err(|e| ProbeError::Network(format!("failed to set timeout: {}", e)))?;

    let dest = SocketAddr::new(IpAddr::V6(ip), 0);
    socket
        .connect(&dest.into())
        .map_err(|e| ProbeError::Network(format!("failed to connect: {}", e)))?;

    let (identifier, sequence) = generate_ping_id();
    let packet = build_icmpv6_echo_request(identifier, sequence);

    let start = Instant::now();

    socket.send(&packet).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            ProbeError::Network(format!("Permission denied: {}", e))
        } else {
            ProbeError::Network(format!("failed to send: {}", e))
        }
    })?;

    loop {
        let mut buf: [MaybeUninit<u8>; 1500] = unsafe { MaybeUninit::uninit().assume_init() };
        let len = socket.recv(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut
            {
                ProbeError::Timeout(timeout)
            } else {
                ProbeError::Network(format!("failed to receive: {}", e))
            }
        })?;
        // SAFETY: recv initialized `len` bytes
        let buf: &[u8] = unsafe { std::slice::from_raw_parts(buf.as_ptr() as *const u8, len) };

        if start.elapsed() >= timeout {
            return Err(ProbeError::Timeout(timeout));
        }

        // ICMPv6 type 129 = Echo Reply
        if len >= 8 {
            let reply_type = buf[0];
            let reply_id = u16::from_be_bytes([buf[4], buf[5]]);
            let reply_seq = u16::from_be_bytes([buf[6], buf[7]]);

            if reply_type == 129 && reply_id == identifier && reply_seq == sequence {
                return Ok(());
            }
            // Wrong packet - keep waiting
        }
    }
}

/// Build an ICMP Echo Request packet (type 8, code 0).
fn build_icmp_echo_request(identifier: u16, sequence: u16) -> Vec<u8> {
    let mut packet = vec![0u8; 64]; // 8 byte header + 56 byte payload

    packet[0] = 8; // Type: Echo Request
    packet[1] = 0; // Code: 0
    // Checksum at [2..4], computed below
    packet[4..6].copy_from_slice(&identifier.to_be_bytes());
    packet[6..8].copy_from_slice(&sequence.to_be_bytes());

    let checksum = icmp_checksum(&packet);
    packet[2..4].copy_from_slice(&checksum.to_be_bytes());

    packet
}

/// Build an ICMPv6 Echo Request packet (type 128, code 0).
fn build_icmpv6_echo_request(identifier: u16, sequence: u16) -> Vec<u8> {
    let mut packet = vec![0u8; 64];

    packet[0] = 128; // Type: Echo Request
    packet[1] = 0; // Code: 0
    // Checksum at [2..4] - the kernel computes this for ICMPv6
    packet[4..6].copy_from_slice(&identifier.to_be_bytes());
    packet[6..8].copy_from_slice(&sequence.to_be_bytes());

    packet
}

/// Compute ICMP checksum (RFC 1071).
fn icmp_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut i = 0;

    while i < data.len() - 1 {
        sum += u16::from_be_bytes([data[i], data[i + 1]]) as u32;
        i += 2;
    }

    // Handle odd byte
    if i < data.len() {
        sum += (data[i] as u32) << 8;
    }

    // Fold 32-bit sum to 16 bits
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !sum as u16
}

/// Run ping via command execution (fallback).
///
/// Only the exit status matters; stdout and stderr are captured so probe
/// transcripts never reach the terminal.
async fn run_ping_command(host: &str, timeout: Duration) -> Result<(), ProbeError> {
    let timeout_secs = timeout.as_secs().max(1);

    let output = Command::new("ping")
        .args(["-c", "1", "-W", &timeout_secs.to_string(), host])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ProbeError::Command(format!("failed to execute ping: {}", e)))?;

    if output.status.success() {
        Ok(())
    } else {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.contains("100% packet loss") || stdout.contains("100.0% packet loss") {
            Err(ProbeError::Timeout(timeout))
        } else {
            Err(ProbeError::Command(format!(
                "ping exited with {}",
                output.status
            )))
        }
    }
}
