//! Exact-text deduplication
//!
//! Keeps the first occurrence of every substantive rule. A comment or blank
//! line is dropped when the next substantive rule below it is a duplicate,
//! so comment blocks stay attached to the rule they describe.

use std::collections::HashSet;

use hostmill_core::rule::Rule;
use log::debug;

use crate::config::TransformationKind;
use crate::transform::{TransformContext, Transformation};

pub struct Deduplicate;

impl Transformation for Deduplicate {
    fn kind(&self) -> TransformationKind {
        TransformationKind::Deduplicate
    }

    fn apply(&self, lines: Vec<String>, _ctx: &TransformContext<'_>) -> Vec<String> {
        let insubstantial: Vec<bool> = lines
            .iter()
            .map(|l| Rule::classify(l).is_insubstantial())
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut keep = vec![true; lines.len()];

        for idx in 0..lines.len() {
            if insubstantial[idx] {
                // Attached to the next substantive rule: dropped iff that
                // rule is a known duplicate.
                let next = (idx + 1..lines.len()).find(|&j| !insubstantial[j]);
                if let Some(j) = next {
                    if seen.contains(lines[j].as_str()) {
                        keep[idx] = false;
                    }
                }
            } else if !seen.insert(lines[idx].as_str()) {
                debug!("dropping duplicate rule '{}'", lines[idx]);
                keep[idx] = false;
            }
        }

        lines
            .iter()
            .zip(keep)
            .filter_map(|(line, kept)| kept.then(|| line.clone()))
            .collect()
    }
}
