//! URL safety checks for outbound requests and redirects.
//!
//! Every destination a tenant can configure (webhook URLs, Slack incoming
//! webhooks, SMTP relays, payment callback URLs) passes through these
//! predicates before the gateway talks to it.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use tokio::net::lookup_host;
use url::{Host, Url};

/// Domains payment providers redirect through after checkout.
pub const PAYMENT_REDIRECT_DOMAINS: &[&str] = &[
    "tap.company",
    "stripe.com",
    "paypal.com",
    "razorpay.com",
    "paystack.com",
    "paystack.co",
    "flutterwave.com",
    "mercadopago.com",
    "mercadopago.com.br",
    "mollie.com",
    "skrill.com",
    "coingate.com",
    "paymentwall.com",
    "toyyibpay.com",
    "payfast.co.za",
    "iyzipay.com",
    "sspay.my",
    "paytabs.com",
    "benefit-gateway.bh",
    "cashfree.com",
    "aamarpay.com",
    "paytr.com",
    "yookassa.ru",
    "midtrans.com",
    "xendit.co",
    "nepalste.com.np",
    "payhere.lk",
    "authorize.net",
    "khalti.com",
    "easebuzz.in",
    "fedapay.com",
    "cinetpay.com",
];

/// Reason a URL or host was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsafeUrl {
    #[error("URL could not be parsed: {0}")]
    Invalid(String),

    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("Loopback host: {0}")]
    LoopbackHost(String),

    #[error("Private or reserved address: {0}")]
    PrivateAddress(IpAddr),

    #[error("DNS resolution failed for {host}: {reason}")]
    DnsResolution { host: String, reason: String },
}

/// Outbound destination policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboundPolicy {
    /// Permit loopback and private-network destinations. Local development only.
    pub allow_private_network: bool,
}

/// Returns true for loopback, private, link-local, unique-local and unspecified addresses.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_ipv4(mapped);
            }
            is_private_ipv6(v6)
        }
    }
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    // 10/8, 172.16/12, 192.168/16, 169.254/16, 127/8
    ip.is_private() || ip.is_loopback() || ip.is_link_local() || ip.is_unspecified()
}

fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xffc0) == 0xfe80 // fe80::/10
        || (first & 0xfe00) == 0xfc00 // fc00::/7, covers fd00::/8
}

fn is_loopback_name(host: &str) -> bool {
    host == "localhost" || host.ends_with(".localhost")
}

fn normalize_host(host: &str) -> String {
    host.trim()
        .trim_end_matches('.')
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_ascii_lowercase()
}

/// Returns true if `url` may be the target of a server-initiated request.
pub async fn is_safe_for_outbound_request(url: &str) -> bool {
    check_outbound_url(url, OutboundPolicy::default()).await.is_ok()
}

/// Validates an outbound URL and returns it parsed.
///
/// Hostnames are resolved and rejected if any resolved address is private.
/// Resolution failures are treated as unsafe.
pub async fn check_outbound_url(raw: &str, policy: OutboundPolicy) -> Result<Url, UnsafeUrl> {
    let url = Url::parse(raw.trim()).map_err(|e| UnsafeUrl::Invalid(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UnsafeUrl::UnsupportedScheme(other.to_string())),
    }

    let port = url.port_or_known_default().unwrap_or(443);
    match url.host() {
        None => Err(UnsafeUrl::MissingHost),
        Some(Host::Ipv4(ip)) => check_ip(IpAddr::V4(ip), policy).map(|_| url.clone()),
        Some(Host::Ipv6(ip)) => check_ip(IpAddr::V6(ip), policy).map(|_| url.clone()),
        Some(Host::Domain(domain)) => {
            let domain = domain.to_string();
            check_outbound_host(&domain, port, policy).await?;
            Ok(url.clone())
        }
    }
}

/// Validates a bare host (e.g. an SMTP relay) for an outbound connection.
pub async fn check_outbound_host(
    host: &str,
    port: u16,
    policy: OutboundPolicy,
) -> Result<(), UnsafeUrl> {
    let host = normalize_host(host);
    if host.is_empty() {
        return Err(UnsafeUrl::MissingHost);
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return check_ip(ip, policy);
    }

    if policy.allow_private_network {
        return Ok(());
    }

    if is_loopback_name(&host) {
        return Err(UnsafeUrl::LoopbackHost(host));
    }

    let addresses = lookup_host((host.as_str(), port))
        .await
        .map_err(|e| UnsafeUrl::DnsResolution {
            host: host.clone(),
            reason: e.to_string(),
        })?;

    let mut resolved_any = false;
    for addr in addresses {
        resolved_any = true;
        if is_private_ip(addr.ip()) {
            return Err(UnsafeUrl::PrivateAddress(addr.ip()));
        }
    }

    if !resolved_any {
        return Err(UnsafeUrl::DnsResolution {
            host,
            reason: "no addresses".to_string(),
        });
    }

    Ok(())
}

fn check_ip(ip: IpAddr, policy: OutboundPolicy) -> Result<(), UnsafeUrl> {
    if !policy.allow_private_network && is_private_ip(ip) {
        return Err(UnsafeUrl::PrivateAddress(ip));
    }
    Ok(())
}

/// Returns true if `url` is acceptable as a redirect target.
///
/// With a non-empty allowlist the host must equal, or be a subdomain of, one
/// of the allowed domains. With an empty allowlist any host that is not a
/// private IP literal passes.
pub fn is_safe_redirect_url(url: &str, allowed_domains: &[&str]) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    let host = match parsed.host() {
        Some(Host::Domain(domain)) => normalize_host(domain),
        Some(Host::Ipv4(ip)) => {
            return allowed_domains.is_empty() && !is_private_ip(IpAddr::V4(ip));
        }
        Some(Host::Ipv6(ip)) => {
            return allowed_domains.is_empty() && !is_private_ip(IpAddr::V6(ip));
        }
        None => return false,
    };
    if host.is_empty() {
        return false;
    }

    if allowed_domains.is_empty() {
        return true;
    }

    allowed_domains.iter().any(|allowed| {
        let allowed = normalize_host(allowed);
        host == allowed || host.ends_with(&format!(".{}", allowed))
    })
}

/// Returns true if the URL points at this application's own host.
pub fn is_own_app_url(url: &str, app_host: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    match parsed.host_str() {
        Some(host) => normalize_host(host) == normalize_host(app_host),
        None => false,
    }
}

/// The payment provider redirect allowlist.
pub fn payment_redirect_domains() -> &'static [&'static str] {
    PAYMENT_REDIRECT_DOMAINS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_private_ipv4_ranges() {
        for addr in [
            "10.0.0.1",
            "10.255.255.255",
            "172.16.0.1",
            "172.31.255.254",
            "192.168.1.1",
            "169.254.169.254",
            "127.0.0.1",
            "127.10.0.3",
            "0.0.0.0",
        ] {
            assert!(is_private_ip(ip(addr)), "{} should be private", addr);
        }
    }

    #[test]
    fn test_public_ipv4() {
        assert!(!is_private_ip(ip("8.8.8.8")));
        assert!(!is_private_ip(ip("172.32.0.1")));
        assert!(!is_private_ip(ip("1.1.1.1")));
    }

    #[test]
    fn test_private_ipv6_ranges() {
        assert!(is_private_ip(ip("::1")));
        assert!(is_private_ip(ip("::")));
        assert!(is_private_ip(ip("fe80::1")));
        assert!(is_private_ip(ip("fc00::1")));
        assert!(is_private_ip(ip("fd12:3456::1")));
        assert!(is_private_ip(ip("::ffff:10.0.0.1")));
        assert!(!is_private_ip(ip("2606:4700:4700::1111")));
    }

    #[tokio::test]
    async fn test_rejects_non_http_schemes() {
        assert!(!is_safe_for_outbound_request("ftp://x").await);
        assert!(!is_safe_for_outbound_request("javascript:alert(1)").await);
        assert!(!is_safe_for_outbound_request("file:///etc/passwd").await);
        assert!(!is_safe_for_outbound_request("not a url").await);
    }

    #[tokio::test]
    async fn test_rejects_private_literals_and_loopback_names() {
        assert!(!is_safe_for_outbound_request("http://127.0.0.1/hook").await);
        assert!(!is_safe_for_outbound_request("http://10.1.2.3:8080/").await);
        assert!(!is_safe_for_outbound_request("http://169.254.169.254/latest").await);
        assert!(!is_safe_for_outbound_request("http://[::1]/").await);
        assert!(!is_safe_for_outbound_request("http://localhost:3000/").await);
        assert!(!is_safe_for_outbound_request("http://api.localhost/").await);
    }

    #[tokio::test]
    async fn test_public_ip_literal_is_safe() {
        assert!(is_safe_for_outbound_request("https://8.8.8.8/dns").await);
    }

    #[tokio::test]
    async fn test_unresolvable_host_fails_closed() {
        let result =
            check_outbound_url("https://no-such-host.invalid/", OutboundPolicy::default()).await;
        assert!(matches!(result, Err(UnsafeUrl::DnsResolution { .. })));
    }

    #[tokio::test]
    async fn test_policy_allows_private_network() {
        let policy = OutboundPolicy {
            allow_private_network: true,
        };
        assert!(check_outbound_url("http://127.0.0.1:9000/x", policy)
            .await
            .is_ok());
        assert!(check_outbound_host("localhost", 25, policy).await.is_ok());
        // scheme checks still apply
        assert!(check_outbound_url("ftp://127.0.0.1/", policy).await.is_err());
    }

    #[tokio::test]
    async fn test_check_outbound_host_literal() {
        let policy = OutboundPolicy::default();
        assert_eq!(
            check_outbound_host("192.168.0.10", 587, policy).await,
            Err(UnsafeUrl::PrivateAddress(ip("192.168.0.10")))
        );
        assert!(check_outbound_host("8.8.4.4", 587, policy).await.is_ok());
        assert_eq!(
            check_outbound_host("  ", 587, policy).await,
            Err(UnsafeUrl::MissingHost)
        );
    }

    #[test]
    fn test_payment_redirect_allowlist() {
        let domains = payment_redirect_domains();
        assert!(domains.len() >= 30);
        assert!(is_safe_redirect_url("https://tap.company/x", domains));
        assert!(is_safe_redirect_url("https://checkout.stripe.com/pay", domains));
        assert!(!is_safe_redirect_url("https://evil.com/x", domains));
        assert!(!is_safe_redirect_url("https://stripe.com.evil.com/x", domains));
        assert!(!is_safe_redirect_url("https://notstripe.com/x", domains));
    }

    #[test]
    fn test_redirect_without_allowlist() {
        assert!(is_safe_redirect_url("https://example.org/done", &[]));
        assert!(!is_safe_redirect_url("http://192.168.1.1/admin", &[]));
        assert!(!is_safe_redirect_url("javascript:alert(1)", &[]));
        assert!(is_safe_redirect_url("http://8.8.8.8/", &[]));
    }

    #[test]
    fn test_redirect_ip_literal_never_matches_allowlist() {
        assert!(!is_safe_redirect_url("https://8.8.8.8/", &["stripe.com"]));
    }

    #[test]
    fn test_is_own_app_url() {
        assert!(is_own_app_url("https://App.Example.com/dashboard", "app.example.com"));
        assert!(!is_own_app_url("https://other.example.com/", "app.example.com"));
        assert!(!is_own_app_url("garbage", "app.example.com"));
    }
}
