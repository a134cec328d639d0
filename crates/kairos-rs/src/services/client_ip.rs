//! Client IP extraction with trusted-proxy `X-Forwarded-For` handling.
//!
//! The socket peer address is always authoritative for trust decisions: a
//! forwarded chain is only honored when the peer itself is inside a
//! configured trusted range, and even then only up to `max_forwarded_depth`
//! hops are read back through the chain.

use actix_web::HttpRequest;
use ipnet::IpNet;
use std::net::IpAddr;
use std::str::FromStr;

/// Trusted-proxy configuration for client IP resolution.
#[derive(Debug, Clone)]
pub struct ClientIpConfig {
    pub trusted_proxies: Vec<IpNet>,
    pub max_forwarded_depth: usize,
}

impl Default for ClientIpConfig {
    fn default() -> Self {
        Self {
            trusted_proxies: Vec::new(),
            max_forwarded_depth: 1,
        }
    }
}

/// Well-known cloud/CDN proxy ranges, for operators who trust a named
/// provider instead of enumerating CIDRs by hand.
pub fn named_provider_ranges(name: &str) -> Vec<IpNet> {
    let ranges: &[&str] = match name.to_ascii_lowercase().as_str() {
        "cloudflare" => &[
            "173.245.48.0/20",
            "103.21.244.0/22",
            "103.22.200.0/22",
            "103.31.4.0/22",
            "141.101.64.0/18",
            "108.162.192.0/18",
            "190.93.240.0/20",
            "188.114.96.0/20",
            "197.234.240.0/22",
            "198.41.128.0/17",
            "162.158.0.0/15",
            "104.16.0.0/13",
            "104.24.0.0/14",
            "172.64.0.0/13",
            "131.0.72.0/22",
        ],
        "aws" => &["3.0.0.0/8", "13.0.0.0/8", "15.0.0.0/8", "18.0.0.0/8", "35.0.0.0/8", "52.0.0.0/8", "54.0.0.0/8"],
        "gcp" => &["34.0.0.0/8", "35.184.0.0/13", "104.154.0.0/15", "130.211.0.0/16"],
        "azure" => &["13.64.0.0/11", "20.0.0.0/8", "40.64.0.0/10", "52.128.0.0/9"],
        _ => &[],
    };
    ranges.iter().filter_map(|r| IpNet::from_str(r).ok()).collect()
}

fn is_trusted(peer: IpAddr, trusted: &[IpNet]) -> bool {
    trusted.iter().any(|net| net.contains(&peer))
}

/// Resolves the client IP for a request: the peer address if untrusted or
/// no `X-Forwarded-For` is present, otherwise the leftmost address in the
/// forwarded chain within `max_forwarded_depth` hops.
pub fn extract_client_ip(req: &HttpRequest, config: &ClientIpConfig) -> Option<IpAddr> {
    let peer_addr = req.peer_addr().map(|addr| addr.ip());

    let Some(peer) = peer_addr else {
        return None;
    };

    if !is_trusted(peer, &config.trusted_proxies) {
        return Some(peer);
    }

    let Some(header) = req.headers().get("x-forwarded-for") else {
        return Some(peer);
    };
    let Ok(header_str) = header.to_str() else {
        return Some(peer);
    };

    let hops: Vec<&str> = header_str.split(',').map(|s| s.trim()).collect();
    let depth = config.max_forwarded_depth.min(hops.len());
    if depth == 0 {
        return Some(peer);
    }

    // Leftmost entry within the trusted depth is the original client.
    for candidate in hops.iter().take(depth) {
        if let Ok(ip) = IpAddr::from_str(candidate) {
            return Some(ip);
        }
    }
    Some(peer)
}
