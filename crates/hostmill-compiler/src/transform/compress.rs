//! Redundant-rule compression
//!
//! Rewrites host rules and bare domains to `||domain^` form, drops exact
//! hostname duplicates, and removes rules whose hostname is already covered
//! by an ancestor-domain rule.

use std::collections::HashSet;

use hostmill_core::hostname;
use hostmill_core::psl;
use hostmill_core::rule::{Rule, RuleKind};
use log::debug;

use crate::config::TransformationKind;
use crate::transform::{TransformContext, Transformation};

/// One rule normalized for compression.
struct BlockRecord {
    rule_text: String,
    can_compress: bool,
    hostname: Option<String>,
    original_text: String,
}

impl BlockRecord {
    fn blocked(hostname: String, rule_text: String, original: &str) -> Self {
        Self {
            rule_text,
            can_compress: true,
            hostname: Some(hostname),
            original_text: original.to_string(),
        }
    }

    fn opaque(original: &str) -> Self {
        Self {
            rule_text: original.to_string(),
            can_compress: false,
            hostname: None,
            original_text: original.to_string(),
        }
    }
}

pub struct Compress;

impl Transformation for Compress {
    fn kind(&self) -> TransformationKind {
        TransformationKind::Compress
    }

    fn apply(&self, lines: Vec<String>, _ctx: &TransformContext<'_>) -> Vec<String> {
        // First pass: normalize to block records, dropping exact hostname
        // duplicates as they appear.
        let mut seen: HashSet<String> = HashSet::new();
        let mut records: Vec<BlockRecord> = Vec::with_capacity(lines.len());

        for line in &lines {
            for record in normalize(line) {
                match &record.hostname {
                    Some(host) if record.can_compress => {
                        if seen.insert(host.clone()) {
                            records.push(record);
                        }
                    }
                    _ => records.push(record),
                }
            }
        }

        // Second pass: a record is redundant when any ancestor domain of
        // its hostname is itself blocked.
        let mut discard = vec![false; records.len()];
        for (idx, record) in records.iter().enumerate() {
            let Some(host) = record.hostname.as_deref() else {
                continue;
            };
            let mut ancestor = psl::parent_domain(host);
            while let Some(parent) = ancestor {
                if seen.contains(parent) {
                    debug!(
                        "dropping '{}': covered by ancestor domain '{parent}'",
                        record.original_text
                    );
                    discard[idx] = true;
                    break;
                }
                ancestor = psl::parent_domain(parent);
            }
        }

        // Final pass: one linear filter, preserving insertion order.
        records
            .into_iter()
            .zip(discard)
            .filter_map(|(record, dropped)| (!dropped).then_some(record.rule_text))
            .collect()
    }
}

/// Rewrite one line into block records.
///
/// Host rules fan out to one `||h^` record per hostname; bare domains become
/// `||domain^`; a plain blocking rule with an extractable hostname keeps its
/// text. Anything else passes through untouched.
fn normalize(line: &str) -> Vec<BlockRecord> {
    let rule = Rule::classify(line);

    match &rule.kind {
        RuleKind::Host { hostnames } if !hostnames.is_empty() => hostnames
            .iter()
            .map(|h| {
                let host = h.to_lowercase();
                BlockRecord::blocked(host.clone(), format!("||{host}^"), line)
            })
            .collect(),
        RuleKind::Network(net)
            if !net.is_exception && net.modifiers.is_empty() && net.hostname.is_some() =>
        {
            let host = net.hostname.as_deref().unwrap_or_default().to_lowercase();
            vec![BlockRecord::blocked(host, line.trim().to_string(), line)]
        }
        RuleKind::Network(_) => {
            let trimmed = line.trim();
            if hostname::is_plain_domain(trimmed) {
                let host = trimmed.to_lowercase();
                vec![BlockRecord::blocked(host.clone(), format!("||{host}^"), line)]
            } else {
                vec![BlockRecord::opaque(line)]
            }
        }
        _ => vec![BlockRecord::opaque(line)],
    }
}
