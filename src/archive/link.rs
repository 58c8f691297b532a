//! Link validation and completion.
//!
//! A link is accepted if the raw text, or the raw text behind `https://` or
//! `https://www.`, parses as an http(s) URL whose host is a public domain or a
//! globally routable address. The first candidate that passes is stored verbatim.
//! Completion needs a dotted host (or a bracketed IPv6 address): a lone word
//! such as `broken` is never turned into `https://www.broken`.

use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

use super::error::{ArchiveError, Result};

const COMPLETION_PREFIXES: [&str; 3] = ["", "https://", "https://www."];

/// Validate `raw` and return the form that should be stored.
pub fn normalize_link(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return Err(ArchiveError::InvalidLink(raw.to_string()));
    }

    // A link that already names its scheme is never completed
    let prefixes: &[&str] = if raw.contains("://") {
        &COMPLETION_PREFIXES[..1]
    } else if is_dotted_host(raw) {
        &COMPLETION_PREFIXES
    } else {
        return Err(ArchiveError::InvalidLink(raw.to_string()));
    };

    prefixes
        .iter()
        .map(|prefix| format!("{prefix}{raw}"))
        .find(|candidate| is_public_url(candidate))
        .ok_or_else(|| ArchiveError::InvalidLink(raw.to_string()))
}

/// Whether the host part of a scheme-less link looks like a domain or an address.
fn is_dotted_host(raw: &str) -> bool {
    let end = raw.find(['/', '?', '#']).unwrap_or(raw.len());
    let host = &raw[..end];
    host.starts_with('[') || host.split(':').next().is_some_and(|name| name.contains('.'))
}

/// Syntactic check: http(s) scheme and a public host.
pub fn is_public_url(candidate: &str) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    match url.host() {
        Some(Host::Domain(domain)) => is_public_domain(domain),
        Some(Host::Ipv4(addr)) => is_public_ipv4(addr),
        Some(Host::Ipv6(addr)) => is_public_ipv6(addr),
        None => false,
    }
}

fn is_public_domain(domain: &str) -> bool {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let label_ok = |label: &&str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    };
    if !labels.iter().all(label_ok) {
        return false;
    }

    // Punycode TLDs (xn--) are the only non-alphabetic ones
    labels.last().is_some_and(|tld| {
        tld.len() >= 2 && (tld.chars().all(char::is_alphabetic) || tld.starts_with("xn--"))
    })
}

fn is_public_ipv4(addr: Ipv4Addr) -> bool {
    !(addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_unspecified()
        || addr.is_broadcast()
        || addr.is_documentation())
}

fn is_public_ipv6(addr: Ipv6Addr) -> bool {
    let unique_local = (addr.segments()[0] & 0xfe00) == 0xfc00;
    let link_local = (addr.segments()[0] & 0xffc0) == 0xfe80;
    !(addr.is_loopback() || addr.is_unspecified() || unique_local || link_local)
}
