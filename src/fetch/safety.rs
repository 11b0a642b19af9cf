// src/fetch/safety.rs
// =============================================================================
// This module is the SSRF guard: it decides whether a hostname is safe to
// contact at all.
//
// Why this matters:
// - The URL we analyze is attacker-supplied
// - Without this check, "http://169.254.169.254/latest/meta-data/" would make
//   us hand out cloud credentials, and "http://10.0.0.5/admin" would let an
//   attacker probe internal infrastructure through us
//
// How it works:
// 1. Resolve the hostname to ALL of its addresses (DNS can return several)
// 2. Every single address must be publicly routable and non-sensitive
// 3. DNS failure counts as unsafe (fail closed), not as an error to retry
//
// The caller must re-run this check for the host it is about to connect to on
// every redirect hop. Checking once up front is not enough: a DNS record can
// change between the check and the connect (DNS rebinding), and a redirect
// can point anywhere.
//
// Rust concepts:
// - Pattern matching on enums (url::Host is Domain, Ipv4, or Ipv6)
// - Bit masking: CIDR prefix matching on the integer form of an address
// =============================================================================

use std::net::IpAddr;

use tokio::net::lookup_host;
use tracing::debug;
use url::Host;

/// One blocked network range in CIDR form, e.g. 10.0.0.0/8.
#[derive(Debug, Clone)]
pub struct BlockedNet {
    addr: IpAddr,
    prefix_len: u8,
}

impl BlockedNet {
    /// Builds a range from an address literal and a prefix length.
    ///
    /// Panics if the literal does not parse or the prefix length is longer
    /// than the address family allows (/32 for IPv4, /128 for IPv6); ranges
    /// are constant tables written in source (see config.rs), so either is
    /// a typo.
    pub fn new(addr: &str, prefix_len: u8) -> Self {
        let addr: IpAddr = addr.parse().expect("blocked network literal must parse");
        let max_prefix = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        assert!(
            prefix_len <= max_prefix,
            "prefix length /{} too long for {}",
            prefix_len,
            addr
        );
        Self { addr, prefix_len }
    }

    /// Does this range contain the given address?
    ///
    /// An IPv4 range never contains an IPv6 address and vice versa;
    /// v4-mapped addresses are unmapped by the caller before we get here.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                // Shift away the host bits on both sides and compare.
                // A /0 prefix would shift by 32 (undefined), so treat it
                // as "matches everything".
                let host_bits = 32 - u32::from(self.prefix_len);
                if host_bits >= 32 {
                    return true;
                }
                (u32::from(net) >> host_bits) == (u32::from(*ip) >> host_bits)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let host_bits = 128 - u32::from(self.prefix_len);
                if host_bits >= 128 {
                    return true;
                }
                (u128::from(net) >> host_bits) == (u128::from(*ip) >> host_bits)
            }
            _ => false,
        }
    }
}

/// The injected block policy: which addresses we refuse to contact.
///
/// This is plain data, not hidden module state, so tests can pass a
/// permissive policy and talk to a fixture server on 127.0.0.1.
/// The production default lives in config.rs.
#[derive(Debug, Clone)]
pub struct AddressPolicy {
    /// CIDR ranges that are never safe (loopback, private, link-local, ...).
    pub blocked: Vec<BlockedNet>,
    /// Exact addresses that are never safe regardless of the range table
    /// (cloud metadata endpoints).
    pub metadata_addrs: Vec<IpAddr>,
}

impl AddressPolicy {
    /// A policy that blocks nothing. Useful when the target is a local
    /// fixture server; never use it against attacker-supplied URLs.
    pub fn permissive() -> Self {
        Self {
            blocked: Vec::new(),
            metadata_addrs: Vec::new(),
        }
    }

    /// Is a single resolved address safe to connect to?
    pub fn is_addr_safe(&self, ip: &IpAddr) -> bool {
        // DNS for a dual-stack host can hand back "::ffff:10.0.0.5", which
        // is really the IPv4 address 10.0.0.5. Unmap before checking so the
        // IPv4 block table applies.
        let ip = match ip {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => *ip,
            },
            IpAddr::V4(_) => *ip,
        };

        if self.metadata_addrs.contains(&ip) {
            return false;
        }

        !self.blocked.iter().any(|net| net.contains(&ip))
    }
}

/// Resolves a hostname and reports whether EVERY resolved address is safe.
///
/// Fail-closed rules:
/// - DNS resolution failure => unsafe (we never "retry and hope")
/// - Resolution succeeding with zero addresses => unsafe
/// - One bad address among many good ones => unsafe
///
/// IP-literal hosts skip resolution and are checked directly.
pub async fn is_host_safe(policy: &AddressPolicy, host: &Host<&str>) -> bool {
    match host {
        Host::Ipv4(ip) => policy.is_addr_safe(&IpAddr::V4(*ip)),
        Host::Ipv6(ip) => policy.is_addr_safe(&IpAddr::V6(*ip)),
        Host::Domain(domain) => {
            // Port 0 is a placeholder; we only want the addresses.
            let addrs = match lookup_host((*domain, 0)).await {
                Ok(addrs) => addrs.collect::<Vec<_>>(),
                Err(e) => {
                    debug!(host = %domain, error = %e, "DNS resolution failed, treating as unsafe");
                    return false;
                }
            };

            if addrs.is_empty() {
                return false;
            }

            addrs.iter().all(|addr| {
                let ip = addr.ip();
                let safe = policy.is_addr_safe(&ip);
                if !safe {
                    debug!(host = %domain, %ip, "resolved address blocked by policy");
                }
                safe
            })
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why check ALL resolved addresses?
//    - An attacker-controlled DNS name can mix one public address with one
//      internal address; if we only checked the first, the connection could
//      still land on the internal one
//
// 2. What is url::Host?
//    - The url crate's parsed form of a hostname: a domain name, an IPv4
//      literal, or an IPv6 literal
//    - Matching on it means we never have to strip IPv6 brackets ourselves
//
// 3. What is fail closed?
//    - When we cannot prove something is safe (DNS down, empty answer),
//      we treat it as unsafe
//    - The opposite (fail open) would turn any resolver hiccup into an
//      SSRF bypass
// -----------------------------------------------------------------------------
