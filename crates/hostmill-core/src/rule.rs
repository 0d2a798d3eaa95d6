//! Rule line classifier
//!
//! Turns a raw line of source text into a typed rule record: comment, empty
//! line, `/etc/hosts` rule, or network (adblock) rule. Lines that fail to
//! parse cleanly classify as `Invalid` and are dropped later by validation;
//! classification itself never fails.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::hostname;

/// Anchored `||hostname^` shape. The interior may not contain another
/// separator character.
static HOST_ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|\|([^/^|]+)\^$").expect("host anchor regex"));

/// A single classified rule line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Original line text, unmodified.
    pub text: String,
    pub kind: RuleKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    Comment,
    Empty,
    /// `/etc/hosts`-syntax line. The hostname list may be empty (a lone
    /// address), which validation rejects.
    Host { hostnames: Vec<String> },
    Network(NetworkRule),
    /// The line could not be parsed as any rule shape.
    Invalid { reason: String },
}

/// Parsed fields of a network (adblock) rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRule {
    pub pattern: String,
    /// Leading `@@`.
    pub is_exception: bool,
    /// `$`-delimited modifiers, in source order. Empty for `/regex/` bodies.
    pub modifiers: Vec<Modifier>,
    /// Set only when the pattern is exactly `||hostname^` with no wildcard.
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    pub name: String,
    pub value: Option<String>,
}

impl Modifier {
    pub fn new(name: &str, value: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }
}

impl Rule {
    /// Classify a raw line.
    pub fn classify(line: &str) -> Rule {
        let trimmed = line.trim();

        let kind = if trimmed.is_empty() {
            RuleKind::Empty
        } else if is_comment(trimmed) {
            RuleKind::Comment
        } else if let Some(hostnames) = parse_host_rule(trimmed) {
            RuleKind::Host { hostnames }
        } else {
            parse_network_rule(trimmed)
        };

        Rule {
            text: line.to_string(),
            kind,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, RuleKind::Comment)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, RuleKind::Empty)
    }

    /// True for comment and blank lines, which carry no rule semantics.
    pub fn is_insubstantial(&self) -> bool {
        matches!(self.kind, RuleKind::Comment | RuleKind::Empty)
    }

    /// Reconstruct the rule text from its parsed fields. Comment, empty,
    /// host, and invalid rules reproduce their original text.
    pub fn to_line(&self) -> String {
        match &self.kind {
            RuleKind::Network(net) => net.to_line(),
            _ => self.text.clone(),
        }
    }
}

impl NetworkRule {
    /// `(@@)(pattern)($name[=value],...)` reconstruction.
    pub fn to_line(&self) -> String {
        let mut out = String::new();
        if self.is_exception {
            out.push_str("@@");
        }
        out.push_str(&self.pattern);
        if !self.modifiers.is_empty() {
            out.push('$');
            for (i, m) in self.modifiers.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&m.name);
                if let Some(value) = &m.value {
                    out.push('=');
                    out.push_str(value);
                }
            }
        }
        out
    }

    /// True when the pattern is a `/regex/` body.
    pub fn is_regex_pattern(&self) -> bool {
        is_regex_body(&self.pattern)
    }

    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.iter().any(|m| m.name == name)
    }
}

/// A line is a comment iff it starts with `!`, starts with `# `, equals `#`,
/// or starts with `####`.
pub fn is_comment(line: &str) -> bool {
    line.starts_with('!') || line.starts_with("# ") || line == "#" || line.starts_with("####")
}

/// The interior of an anchored `||body^` pattern, if the pattern has exactly
/// that shape. Unlike [`NetworkRule::hostname`], the body may contain `*`.
pub fn host_anchor_body(pattern: &str) -> Option<&str> {
    HOST_ANCHOR_RE
        .captures(pattern)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Detect and extract an `/etc/hosts` rule: a leading IPv4/IPv6 address
/// (optional `%zone`), whitespace, hostnames, optional trailing `#comment`.
/// Returns the hostname list, which is empty for a lone address.
fn parse_host_rule(line: &str) -> Option<Vec<String>> {
    let before_comment = line.split('#').next().unwrap_or("").trim();
    let mut tokens = before_comment.split_whitespace();

    let addr = tokens.next()?;
    if !hostname::is_ip_literal(addr) {
        return None;
    }

    Some(tokens.map(str::to_string).collect())
}

fn parse_network_rule(line: &str) -> RuleKind {
    let (is_exception, rest) = match line.strip_prefix("@@") {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    if rest.is_empty() {
        return RuleKind::Invalid {
            reason: "nothing after exception prefix".to_string(),
        };
    }

    // A /regex/ body keeps any '$' it contains; modifiers are only split
    // out when a replace= option is present.
    if is_regex_body(rest) {
        return RuleKind::Network(NetworkRule {
            pattern: rest.to_string(),
            is_exception,
            modifiers: Vec::new(),
            hostname: None,
        });
    }

    let (pattern, modifier_text) = match find_last_unescaped(rest, b'$') {
        Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
        None => (rest, None),
    };

    let modifiers = modifier_text.map(parse_modifiers).unwrap_or_default();

    let hostname = host_anchor_body(pattern)
        .filter(|body| !body.contains('*'))
        .map(str::to_string);

    RuleKind::Network(NetworkRule {
        pattern: pattern.to_string(),
        is_exception,
        modifiers,
        hostname,
    })
}

/// True for `/.../` bodies. A `$` inside the body does not end the pattern
/// unless it introduces a `replace=` option.
fn is_regex_body(text: &str) -> bool {
    if text.len() <= 1 || !text.starts_with('/') || !text.ends_with('/') {
        return false;
    }
    match find_last_unescaped(text, b'$') {
        None => true,
        Some(idx) => !text[idx + 1..].contains("replace="),
    }
}

/// Index of the last occurrence of `needle` not escaped by a preceding `\`.
/// A delimiter is escaped iff an odd number of backslashes precedes it.
fn find_last_unescaped(text: &str, needle: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    for idx in (0..bytes.len()).rev() {
        if bytes[idx] != needle {
            continue;
        }
        let mut backslashes = 0;
        while backslashes < idx && bytes[idx - backslashes - 1] == b'\\' {
            backslashes += 1;
        }
        if backslashes % 2 == 0 {
            return Some(idx);
        }
    }
    None
}

/// Split a raw modifier string on unescaped commas, then each token on the
/// first `=` into name/value.
fn parse_modifiers(text: &str) -> Vec<Modifier> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut modifiers = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;

    for idx in 0..=bytes.len() {
        let at_delimiter =
            idx < bytes.len() && bytes[idx] == b',' && (idx == 0 || bytes[idx - 1] != b'\\');
        if idx == bytes.len() || at_delimiter {
            let token = &text[start..idx];
            match token.split_once('=') {
                Some((name, value)) => modifiers.push(Modifier::new(name, Some(value))),
                None => modifiers.push(Modifier::new(token, None)),
            }
            start = idx + 1;
        }
    }

    modifiers
}
