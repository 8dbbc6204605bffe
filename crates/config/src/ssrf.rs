//! SSRF guard (§4.B): rejects URLs that would let a configured remote
//! config source reach into internal network space, evaluated against the
//! URL *after* `${VAR}` interpolation.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::{Ipv4Network, Ipv6Network};
use url::Url;

use crate::error::RemoteConfigError;
use crate::model::RemoteSecurity;

/// Checks `url` against the SSRF policy described in §4.B. Returns the
/// parsed [`Url`] on success.
pub fn check(url_str: &str, security: &RemoteSecurity) -> Result<Url, RemoteConfigError> {
    let url = Url::parse(url_str).map_err(|e| RemoteConfigError::SsrfRejected(format!("invalid URL: {e}")))?;

    let scheme = url.scheme();
    let scheme_ok = if security.enforce_https {
        scheme == "https"
    } else {
        scheme == "http" || scheme == "https"
    };

    if !scheme_ok {
        let required = if security.enforce_https { "https" } else { "http or https" };
        return Err(RemoteConfigError::SsrfRejected(format!(
            "scheme '{scheme}' rejected, {required} required"
        )));
    }

    if !security.allow_private_ips {
        let host = url
            .host_str()
            .ok_or_else(|| RemoteConfigError::SsrfRejected("URL has no host".to_string()))?;

        if is_blocked_host(host) {
            return Err(RemoteConfigError::SsrfRejected(format!(
                "host '{host}' resolves to a blocked network range"
            )));
        }
    }

    Ok(url)
}

fn is_blocked_host(host: &str) -> bool {
    let bare_host = host.trim_start_matches('[').trim_end_matches(']');

    if host.eq_ignore_ascii_case("localhost") || host.to_ascii_lowercase().ends_with(".localhost") {
        return true;
    }

    if let Ok(ipv4) = bare_host.parse::<Ipv4Addr>() {
        return is_blocked_ipv4(ipv4);
    }

    if let Ok(ipv6) = bare_host.parse::<Ipv6Addr>() {
        return is_blocked_ipv6(ipv6);
    }

    false
}

fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    const BLOCKED: &[(Ipv4Addr, u8)] = &[
        (Ipv4Addr::new(127, 0, 0, 0), 8),
        (Ipv4Addr::new(10, 0, 0, 0), 8),
        (Ipv4Addr::new(172, 16, 0, 0), 12),
        (Ipv4Addr::new(192, 168, 0, 0), 16),
        (Ipv4Addr::new(169, 254, 0, 0), 16),
        (Ipv4Addr::new(0, 0, 0, 0), 8),
        (Ipv4Addr::new(224, 0, 0, 0), 4),
        (Ipv4Addr::new(240, 0, 0, 0), 4),
    ];

    BLOCKED.iter().any(|(net, prefix)| {
        Ipv4Network::new(*net, *prefix)
            .map(|network| network.contains(ip))
            .unwrap_or(false)
    })
}

fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    if ip.is_unspecified() || ip.is_loopback() {
        return true;
    }

    if let Some(ipv4) = ipv4_mapped_or_compatible(ip) {
        return is_blocked_ipv4(ipv4);
    }

    const BLOCKED: &[(Ipv6Addr, u8)] = &[
        // link-local fe80::/10
        (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10),
        // unique-local fc00::/7 (covers fd00::/8 as well)
        (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7),
    ];

    BLOCKED.iter().any(|(net, prefix)| {
        Ipv6Network::new(*net, *prefix)
            .map(|network| network.contains(ip))
            .unwrap_or(false)
    })
}

/// Extracts the embedded IPv4 address from an IPv4-mapped (`::ffff:a.b.c.d`)
/// or IPv4-compatible (`::a.b.c.d`) IPv6 address, if any.
fn ipv4_mapped_or_compatible(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return Some(v4);
    }

    let segments = ip.segments();
    if segments[0..5] == [0, 0, 0, 0, 0] && segments[5] == 0 {
        let octets = ip.octets();
        let candidate = Ipv4Addr::new(octets[12], octets[13], octets[14], octets[15]);
        if candidate != Ipv4Addr::UNSPECIFIED {
            return Some(candidate);
        }
    }

    None
}

/// Reports whether `addr` falls in any blocked range, for use by callers
/// that already have a resolved [`IpAddr`] rather than a host string.
pub fn is_blocked_ip(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => is_blocked_ipv6(v6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_security() -> RemoteSecurity {
        RemoteSecurity::default()
    }

    #[test]
    fn rejects_plain_http_by_default() {
        let err = check("http://example.com/config", &default_security()).unwrap_err();
        assert!(matches!(err, RemoteConfigError::SsrfRejected(_)));
    }

    #[test]
    fn accepts_https_public_host() {
        assert!(check("https://example.com/config", &default_security()).is_ok());
    }

    #[test]
    fn rejects_loopback() {
        assert!(check("https://127.0.0.1/config", &default_security()).is_err());
        assert!(check("https://localhost/config", &default_security()).is_err());
        assert!(check("https://sub.localhost/config", &default_security()).is_err());
    }

    #[test]
    fn rejects_private_ranges() {
        for host in ["10.0.0.5", "172.16.0.5", "192.168.1.5", "169.254.1.1", "0.0.0.5"] {
            let url = format!("https://{host}/config");
            assert!(check(&url, &default_security()).is_err(), "expected {host} to be blocked");
        }
    }

    #[test]
    fn rejects_multicast_and_reserved() {
        assert!(check("https://224.0.0.1/config", &default_security()).is_err());
        assert!(check("https://240.0.0.1/config", &default_security()).is_err());
    }

    #[test]
    fn rejects_ipv6_loopback_and_link_local() {
        assert!(check("https://[::1]/config", &default_security()).is_err());
        assert!(check("https://[::]/config", &default_security()).is_err());
        assert!(check("https://[fe80::1]/config", &default_security()).is_err());
        assert!(check("https://[fc00::1]/config", &default_security()).is_err());
        assert!(check("https://[fd12::1]/config", &default_security()).is_err());
    }

    #[test]
    fn rejects_ipv4_mapped_ipv6_private_address() {
        assert!(check("https://[::ffff:10.0.0.1]/config", &default_security()).is_err());
    }

    #[test]
    fn allow_private_ips_bypasses_the_block_list() {
        let security = RemoteSecurity { allow_private_ips: true, enforce_https: true };
        assert!(check("https://10.0.0.5/config", &security).is_ok());
    }

    #[test]
    fn enforce_https_false_allows_http() {
        let security = RemoteSecurity { allow_private_ips: false, enforce_https: false };
        assert!(check("http://example.com/config", &security).is_ok());
    }
}
