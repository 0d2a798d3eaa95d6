//! Line-level transformations
//!
//! The straightforward stages: whitespace trimming, comment and empty-line
//! removal, punycode conversion, modifier stripping, allowlist inversion,
//! and the final-newline guarantee.

use hostmill_core::rule::{host_anchor_body, is_comment, Rule, RuleKind};
use log::debug;

use crate::config::TransformationKind;
use crate::transform::{TransformContext, Transformation};

pub struct TrimLines;

impl Transformation for TrimLines {
    fn kind(&self) -> TransformationKind {
        TransformationKind::TrimLines
    }

    fn apply(&self, lines: Vec<String>, _ctx: &TransformContext<'_>) -> Vec<String> {
        lines.into_iter().map(|l| l.trim().to_string()).collect()
    }
}

pub struct RemoveComments;

impl Transformation for RemoveComments {
    fn kind(&self) -> TransformationKind {
        TransformationKind::RemoveComments
    }

    fn apply(&self, lines: Vec<String>, _ctx: &TransformContext<'_>) -> Vec<String> {
        lines.into_iter().filter(|l| !is_comment(l.trim())).collect()
    }
}

pub struct RemoveEmptyLines;

impl Transformation for RemoveEmptyLines {
    fn kind(&self) -> TransformationKind {
        TransformationKind::RemoveEmptyLines
    }

    fn apply(&self, lines: Vec<String>, _ctx: &TransformContext<'_>) -> Vec<String> {
        lines.into_iter().filter(|l| !l.trim().is_empty()).collect()
    }
}

pub struct InsertFinalNewLine;

impl Transformation for InsertFinalNewLine {
    fn kind(&self) -> TransformationKind {
        TransformationKind::InsertFinalNewLine
    }

    fn apply(&self, mut lines: Vec<String>, _ctx: &TransformContext<'_>) -> Vec<String> {
        if lines.last().map(|l| !l.is_empty()).unwrap_or(true) {
            lines.push(String::new());
        }
        lines
    }
}

/// Strips the `$...` modifier list from network rules, leaving the bare
/// pattern (and exception prefix) behind.
pub struct RemoveModifiers;

impl Transformation for RemoveModifiers {
    fn kind(&self) -> TransformationKind {
        TransformationKind::RemoveModifiers
    }

    fn apply(&self, lines: Vec<String>, _ctx: &TransformContext<'_>) -> Vec<String> {
        lines
            .into_iter()
            .map(|line| match Rule::classify(&line).kind {
                RuleKind::Network(mut net) if !net.modifiers.is_empty() => {
                    net.modifiers.clear();
                    net.to_line()
                }
                _ => line,
            })
            .collect()
    }
}

/// Turns blocking rules into exception rules, producing an allowlist.
pub struct InvertAllow;

impl Transformation for InvertAllow {
    fn kind(&self) -> TransformationKind {
        TransformationKind::InvertAllow
    }

    fn apply(&self, lines: Vec<String>, _ctx: &TransformContext<'_>) -> Vec<String> {
        lines
            .into_iter()
            .map(|line| match Rule::classify(&line).kind {
                RuleKind::Network(net) if !net.is_exception => {
                    format!("@@{}", line.trim())
                }
                _ => line,
            })
            .collect()
    }
}

/// Converts internationalized hostnames to their punycode (ASCII) form.
pub struct ConvertToAscii;

impl Transformation for ConvertToAscii {
    fn kind(&self) -> TransformationKind {
        TransformationKind::ConvertToAscii
    }

    fn apply(&self, lines: Vec<String>, _ctx: &TransformContext<'_>) -> Vec<String> {
        lines
            .into_iter()
            .map(|line| {
                if line.is_ascii() {
                    line
                } else {
                    convert_line(&line)
                }
            })
            .collect()
    }
}

fn convert_line(line: &str) -> String {
    match Rule::classify(line).kind {
        RuleKind::Host { hostnames } => {
            let mut out = line.to_string();
            for host in hostnames {
                if !host.is_ascii() {
                    if let Some(ascii) = to_ascii(&host) {
                        out = out.replace(&host, &ascii);
                    }
                }
            }
            out
        }
        RuleKind::Network(net) => {
            if let Some(body) = host_anchor_body(&net.pattern) {
                if let Some(ascii) = to_ascii(body) {
                    return line.replace(body, &ascii);
                }
            }
            let trimmed = line.trim();
            if !trimmed.contains(' ') {
                if let Some(ascii) = to_ascii(trimmed) {
                    return ascii;
                }
            }
            line.to_string()
        }
        _ => line.to_string(),
    }
}

fn to_ascii(host: &str) -> Option<String> {
    match idna::domain_to_ascii(host) {
        Ok(ascii) if !ascii.is_empty() => Some(ascii),
        Ok(_) => None,
        Err(e) => {
            debug!("cannot convert '{host}' to ascii: {e}");
            None
        }
    }
}
