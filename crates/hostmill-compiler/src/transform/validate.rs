//! Rule validation
//!
//! Checks every rule for acceptability and deletes the ones that fail,
//! together with the comment block immediately above them. Runs as a single
//! backward scan building a keep mask, so cascade removal stays linear.

use hostmill_core::hostname;
use hostmill_core::psl;
use hostmill_core::rule::{host_anchor_body, NetworkRule, Rule, RuleKind};
use log::debug;

use crate::config::TransformationKind;
use crate::diagnostics::{IssueKind, Severity, ValidationIssue};
use crate::transform::{TransformContext, Transformation};

/// Modifiers accepted on network rules in a DNS blocklist.
const SUPPORTED_MODIFIERS: [&str; 8] = [
    "important",
    "~important",
    "ctag",
    "dnstype",
    "dnsrewrite",
    "denyallow",
    "badfilter",
    "client",
];

/// Modifiers that deliberately limit a rule's scope; they exempt a rule
/// from the bare-public-suffix rejection.
const LIMITING_MODIFIERS: [&str; 3] = ["denyallow", "badfilter", "client"];

const MIN_PATTERN_LENGTH: usize = 5;

pub struct Validate {
    allow_ip: bool,
}

impl Validate {
    pub fn new(allow_ip: bool) -> Self {
        Self { allow_ip }
    }
}

impl Transformation for Validate {
    fn kind(&self) -> TransformationKind {
        if self.allow_ip {
            TransformationKind::ValidateAllowIp
        } else {
            TransformationKind::Validate
        }
    }

    fn apply(&self, lines: Vec<String>, ctx: &TransformContext<'_>) -> Vec<String> {
        let rules: Vec<Rule> = lines.iter().map(|l| Rule::classify(l)).collect();
        let mut keep = vec![true; lines.len()];

        // Backward scan: when a rule is removed, the contiguous run of
        // comment/blank lines immediately above it goes too, stopping at
        // the previous kept rule.
        let mut cascading = false;
        for idx in (0..rules.len()).rev() {
            let rule = &rules[idx];

            if rule.is_insubstantial() {
                keep[idx] = !cascading;
                continue;
            }

            match check_rule(rule, self.allow_ip) {
                Ok(()) => cascading = false,
                Err((kind, message)) => {
                    keep[idx] = false;
                    cascading = true;
                    let issue = ValidationIssue {
                        kind,
                        severity: Severity::Error,
                        rule_text: lines[idx].clone(),
                        message,
                        line_number: idx + 1,
                        source_name: ctx.source_name.map(str::to_string),
                    };
                    debug!(
                        "dropping rule '{}' at line {}: {} ({})",
                        issue.rule_text, issue.line_number, issue.message, issue.kind
                    );
                    ctx.observer.rule_rejected(&issue);
                }
            }
        }

        lines
            .into_iter()
            .zip(keep)
            .filter_map(|(line, kept)| kept.then_some(line))
            .collect()
    }
}

type CheckResult = Result<(), (IssueKind, String)>;

fn check_rule(rule: &Rule, allow_ip: bool) -> CheckResult {
    match &rule.kind {
        RuleKind::Comment | RuleKind::Empty => Ok(()),
        RuleKind::Invalid { reason } => {
            Err((IssueKind::ParseError, format!("unparseable rule: {reason}")))
        }
        RuleKind::Host { hostnames } => check_host_rule(hostnames, allow_ip),
        RuleKind::Network(net) => check_network_rule(net, allow_ip),
    }
}

fn check_host_rule(hostnames: &[String], allow_ip: bool) -> CheckResult {
    if hostnames.is_empty() {
        return Err((
            IssueKind::EmptyHostRule,
            "hosts line carries no hostnames".to_string(),
        ));
    }
    for host in hostnames {
        check_hostname(host, allow_ip, false)?;
    }
    Ok(())
}

fn check_network_rule(net: &NetworkRule, allow_ip: bool) -> CheckResult {
    for modifier in &net.modifiers {
        if !SUPPORTED_MODIFIERS.contains(&modifier.name.as_str()) {
            return Err((
                IssueKind::UnsupportedModifier,
                format!("modifier '{}' is not supported", modifier.name),
            ));
        }
    }

    // Regex bodies are accepted as-is; the pattern checks below only make
    // sense for plain patterns.
    if net.is_regex_pattern() {
        return Ok(());
    }

    let pattern = net.pattern.as_str();
    if pattern.len() < MIN_PATTERN_LENGTH {
        return Err((
            IssueKind::PatternTooShort,
            format!("pattern shorter than {MIN_PATTERN_LENGTH} characters"),
        ));
    }

    let stripped = pattern.strip_prefix("://").unwrap_or(pattern);
    if !stripped
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'*' | b'|' | b'^'))
    {
        return Err((
            IssueKind::ForbiddenCharacters,
            "pattern contains characters with no meaning in DNS rules".to_string(),
        ));
    }

    if let Some(caret) = pattern.find('^') {
        let after = &pattern[caret + 1..];
        if after.contains('*') {
            return Err((
                IssueKind::BadSeparator,
                "wildcard after the domain separator".to_string(),
            ));
        }
        if let Some(next) = after.chars().next() {
            if next != '|' {
                return Err((
                    IssueKind::BadSeparator,
                    "unexpected character after the domain separator".to_string(),
                ));
            }
        }
    }

    let limiting = LIMITING_MODIFIERS
        .iter()
        .any(|name| net.has_modifier(name));

    if let Some(body) = host_anchor_body(pattern) {
        // ||*.suffix^ is a deliberately broad pattern, accepted without
        // hostname validation.
        if let Some(rest) = body.strip_prefix("*.") {
            if psl::is_public_suffix(rest) {
                return Ok(());
            }
        }
        check_hostname(body, allow_ip, limiting)?;
    }

    Ok(())
}

fn check_hostname(host: &str, allow_ip: bool, limiting: bool) -> CheckResult {
    let info = match hostname::parse_domain(host) {
        Some(info) => info,
        None => {
            return Err((
                IssueKind::InvalidHostname,
                format!("'{host}' is not a valid hostname"),
            ))
        }
    };

    if info.is_ip {
        if allow_ip {
            return Ok(());
        }
        return Err((
            IssueKind::IpAddressRule,
            format!("'{host}' is an IP address"),
        ));
    }

    if info.registrable.is_none() && !limiting {
        return Err((
            IssueKind::PublicSuffixBlock,
            format!("'{host}' would block an entire public suffix"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingObserver, NoopObserver};

    fn validate(lines: &[&str]) -> Vec<String> {
        let ctx = TransformContext {
            observer: &NoopObserver,
            source_name: None,
        };
        Validate::new(false).apply(lines.iter().map(|s| s.to_string()).collect(), &ctx)
    }

    fn validate_allow_ip(lines: &[&str]) -> Vec<String> {
        let ctx = TransformContext {
            observer: &NoopObserver,
            source_name: None,
        };
        Validate::new(true).apply(lines.iter().map(|s| s.to_string()).collect(), &ctx)
    }

    #[test]
    fn test_keeps_valid_rules() {
        let kept = validate(&[
            "! comment",
            "||example.org^",
            "@@||allowed.example.org^$important",
            "0.0.0.0 tracker.example.org",
            "/banner[0-9]+/",
        ]);
        assert_eq!(kept.len(), 5);
    }

    #[test]
    fn test_pattern_too_short() {
        assert!(validate(&["||ab^"]).is_empty());
        assert!(validate(&["a.io"]).is_empty());
        assert_eq!(validate(&["||a.co^"]), vec!["||a.co^"]);
    }

    #[test]
    fn test_bare_public_suffix_rejected() {
        assert!(validate(&["||org^"]).is_empty());
        assert!(validate(&["||co.uk^"]).is_empty());
    }

    #[test]
    fn test_limiting_modifier_exempts_public_suffix() {
        let line = "||org^$denyallow=example.org";
        assert_eq!(validate(&[line]), vec![line]);
        let line = "||org^$badfilter";
        assert_eq!(validate(&[line]), vec![line]);
        // A non-limiting modifier does not exempt
        assert!(validate(&["||org^$important"]).is_empty());
    }

    #[test]
    fn test_wildcard_public_suffix_accepted() {
        assert_eq!(validate(&["||*.org^"]), vec!["||*.org^"]);
        // Wildcard below the suffix boundary is not a hostname
        assert!(validate(&["||*.example.org^"]).is_empty());
    }

    #[test]
    fn test_unsupported_modifier() {
        assert!(validate(&["||example.org^$third-party"]).is_empty());
        assert_eq!(
            validate(&["||example.org^$dnstype=AAAA"]),
            vec!["||example.org^$dnstype=AAAA"]
        );
    }

    #[test]
    fn test_forbidden_characters() {
        assert!(validate(&["||example.org/path^"]).is_empty());
        assert!(validate(&["example.org##banner"]).is_empty());
        assert!(validate(&["||example.org^$unknown##"]).is_empty());
    }

    #[test]
    fn test_scheme_prefix_stripped() {
        assert_eq!(validate(&["://ads.example.org"]), vec!["://ads.example.org"]);
    }

    #[test]
    fn test_separator_rules() {
        assert!(validate(&["||example.org^*"]).is_empty());
        assert!(validate(&["||example.org^extra"]).is_empty());
        assert_eq!(validate(&["||example.org^|"]), vec!["||example.org^|"]);
    }

    #[test]
    fn test_regex_patterns_always_accepted() {
        assert_eq!(validate(&["/ab/"]), vec!["/ab/"]);
        assert_eq!(validate(&["/banner\\d+$/"]), vec!["/banner\\d+$/"]);
    }

    #[test]
    fn test_ip_rules() {
        assert!(validate(&["||127.0.0.1^"]).is_empty());
        assert_eq!(validate_allow_ip(&["||127.0.0.1^"]), vec!["||127.0.0.1^"]);

        assert!(validate(&["0.0.0.0 192.168.0.1"]).is_empty());
        assert_eq!(
            validate_allow_ip(&["0.0.0.0 192.168.0.1"]),
            vec!["0.0.0.0 192.168.0.1"]
        );
    }

    #[test]
    fn test_empty_host_rule_rejected() {
        assert!(validate(&["0.0.0.0"]).is_empty());
    }

    #[test]
    fn test_comment_cascade() {
        let kept = validate(&[
            "! kept comment",
            "||valid.org^",
            "! doomed comment",
            "! another doomed one",
            "||ab^",
            "||also-valid.org^",
        ]);
        assert_eq!(kept, vec!["! kept comment", "||valid.org^", "||also-valid.org^"]);
    }

    #[test]
    fn test_cascade_stops_at_kept_rule() {
        let kept = validate(&["||valid.org^", "||ab^"]);
        assert_eq!(kept, vec!["||valid.org^"]);
    }

    #[test]
    fn test_trailing_comments_kept() {
        let kept = validate(&["||valid.org^", "! trailing"]);
        assert_eq!(kept, vec!["||valid.org^", "! trailing"]);
    }

    #[test]
    fn test_issues_reported() {
        let observer = CollectingObserver::new();
        let ctx = TransformContext {
            observer: &observer,
            source_name: Some("unit"),
        };
        Validate::new(false).apply(vec!["||ab^".to_string(), "||org^".to_string()], &ctx);
        let issues = observer.take_issues();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.kind == IssueKind::PatternTooShort));
        assert!(issues.iter().any(|i| i.kind == IssueKind::PublicSuffixBlock));
        assert!(issues.iter().all(|i| i.source_name.as_deref() == Some("unit")));
    }
}
