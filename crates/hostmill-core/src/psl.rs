//! Public-suffix queries for rule validation and compression
//!
//! Validation needs to know whether a hostname is exactly a public suffix
//! (blocking a whole TLD is rejected unless a limiting modifier is present),
//! and compression walks parent domains. A full Public Suffix List can be
//! installed at startup via [`install_list`]; without one, a builtin
//! heuristic (single-label TLDs plus the common two-part suffixes) is used.
//!
//! # Examples
//!
//! ```
//! use hostmill_core::psl::{public_suffix, is_public_suffix};
//!
//! assert_eq!(public_suffix("sub.example.com"), "com");
//! assert_eq!(public_suffix("example.co.uk"), "co.uk");
//! assert!(is_public_suffix("org"));
//! assert!(!is_public_suffix("example.org"));
//! ```

use std::sync::RwLock;

use publicsuffix::{List, Psl};

/// Error installing a Public Suffix List.
#[derive(Debug, thiserror::Error)]
pub enum PslError {
    #[error("failed to parse public suffix list: {0}")]
    BadList(String),
}

static SUFFIX_LIST: RwLock<Option<List>> = RwLock::new(None);

/// Install a full Public Suffix List from its standard text format.
/// Replaces any previously installed list.
pub fn install_list(text: &str) -> Result<(), PslError> {
    let list: List = text.parse().map_err(|e| PslError::BadList(format!("{e}")))?;
    *SUFFIX_LIST.write().unwrap() = Some(list);
    log::info!("public suffix list installed");
    Ok(())
}

/// True when a full Public Suffix List has been installed.
pub fn has_list() -> bool {
    SUFFIX_LIST.read().unwrap().is_some()
}

/// Common two-part suffixes for the builtin fallback.
const COMMON_TWO_PART_SUFFIXES: &[&str] = &[
    "co.uk", "co.jp", "co.nz", "co.za", "co.in", "co.kr",
    "com.au", "com.br", "com.cn", "com.mx", "com.tw", "com.hk",
    "net.au", "net.nz",
    "org.uk", "org.au",
    "gov.uk", "gov.au",
    "ac.uk", "ac.jp",
    "ne.jp", "or.jp",
];

/// Get the public suffix of a hostname.
///
/// With an installed list the answer is exact; otherwise the builtin
/// heuristic is used. The result is lowercase.
pub fn public_suffix(host: &str) -> String {
    let host = host.to_lowercase();
    let host = host.trim_matches('.');

    if let Some(list) = SUFFIX_LIST.read().unwrap().as_ref() {
        if let Some(suffix) = list.suffix(host.as_bytes()) {
            return String::from_utf8_lossy(suffix.as_bytes()).into_owned();
        }
    }

    fallback_suffix(host).to_string()
}

/// Builtin suffix heuristic: the last label, or the last two labels when
/// they form one of the common two-part suffixes.
fn fallback_suffix(host: &str) -> &str {
    let labels: Vec<&str> = host.split('.').collect();
    let n = labels.len();

    if n >= 2 {
        let two_start = host.len() - labels[n - 2].len() - labels[n - 1].len() - 1;
        let last_two = &host[two_start..];
        if COMMON_TWO_PART_SUFFIXES.contains(&last_two) {
            return last_two;
        }
    }

    labels[n - 1]
}

/// True when the hostname is exactly a public suffix (e.g. "org", "co.uk").
pub fn is_public_suffix(host: &str) -> bool {
    let host = host.to_lowercase();
    let host = host.trim_matches('.');
    !host.is_empty() && public_suffix(host) == host
}

/// The registrable domain: public suffix plus one label. `None` when the
/// hostname is itself a public suffix (there is nothing registered).
pub fn registrable_domain(host: &str) -> Option<String> {
    let normalized = host.to_lowercase();
    let normalized = normalized.trim_matches('.');
    let suffix = public_suffix(normalized);

    if normalized == suffix {
        return None;
    }

    let prefix = &normalized[..normalized.len() - suffix.len() - 1];
    let label = prefix.rsplit('.').next()?;
    Some(format!("{label}.{suffix}"))
}

/// Get the parent domain (strip the leftmost label).
pub fn parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}
