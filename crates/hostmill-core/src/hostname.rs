//! Hostname well-formedness and IP-literal detection
//!
//! Shared by rule validation (every blocked hostname must parse) and
//! compression (bare domain lines are rewritten to `||domain^`).

use std::net::IpAddr;

use crate::psl;

/// Parsed view of a hostname, as needed by rule validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainInfo {
    /// Registrable domain (suffix plus one label); `None` for IP literals
    /// and for hostnames that are themselves a public suffix.
    pub registrable: Option<String>,
    pub is_ip: bool,
    /// Public suffix of the hostname; `None` for IP literals.
    pub public_suffix: Option<String>,
}

/// True when the token is an IPv4/IPv6 literal, with an optional `%zone`
/// suffix as seen in `/etc/hosts` files (e.g. `fe80::1%lo0`).
pub fn is_ip_literal(token: &str) -> bool {
    let addr = token.split('%').next().unwrap_or(token);
    addr.parse::<IpAddr>().is_ok()
}

/// Check hostname well-formedness: 1-253 chars, dot-separated labels of
/// 1-63 chars, alphanumerics, hyphens and underscores, no hyphen at a label
/// edge. Case-insensitive; does not consult the public suffix list.
pub fn is_well_formed(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 {
        return false;
    }

    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    })
}

/// True for a bare domain name: well-formed, at least two labels, not an IP.
pub fn is_plain_domain(text: &str) -> bool {
    !is_ip_literal(text) && text.contains('.') && is_well_formed(text)
}

/// Parse a hostname into the pieces validation needs.
/// Returns `None` when the text is neither an IP literal nor a well-formed
/// hostname.
pub fn parse_domain(host: &str) -> Option<DomainInfo> {
    if is_ip_literal(host) {
        return Some(DomainInfo {
            registrable: None,
            is_ip: true,
            public_suffix: None,
        });
    }

    if !is_well_formed(host) {
        return None;
    }

    Some(DomainInfo {
        registrable: psl::registrable_domain(host),
        is_ip: false,
        public_suffix: Some(psl::public_suffix(host)),
    })
}
