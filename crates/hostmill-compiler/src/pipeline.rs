//! Transformation pipeline
//!
//! Applies exclusion filtering, then inclusion filtering, then the
//! requested transformations in canonical order. Used twice per compile:
//! once per source and once over the merged list.

use std::time::Instant;

use hostmill_core::wildcard::Wildcard;
use log::debug;

use crate::compile::CompileError;
use crate::config::TransformationKind;
use crate::transform::{instantiate, resolve_order, TransformContext};

/// Pattern lists with their `_sources` variants already resolved to text.
#[derive(Debug, Default)]
pub struct PipelineConfig {
    pub transformations: Vec<TransformationKind>,
    pub exclusions: Vec<String>,
    pub inclusions: Vec<String>,
}

/// Run the full pipeline over a rule sequence.
pub fn run(
    lines: Vec<String>,
    cfg: &PipelineConfig,
    ctx: &TransformContext<'_>,
) -> Result<Vec<String>, CompileError> {
    let mut lines = apply_exclusions(lines, &cfg.exclusions, ctx)?;
    lines = apply_inclusions(lines, &cfg.inclusions, ctx)?;

    for kind in resolve_order(&cfg.transformations) {
        let stage = instantiate(kind);
        let input_len = lines.len();
        ctx.observer.stage_started(kind, input_len);

        let started = Instant::now();
        lines = stage.apply(lines, ctx);

        ctx.observer
            .stage_completed(kind, input_len, lines.len(), started.elapsed());
    }

    Ok(lines)
}

/// Drop every line matching any exclusion pattern.
fn apply_exclusions(
    lines: Vec<String>,
    exclusions: &[String],
    ctx: &TransformContext<'_>,
) -> Result<Vec<String>, CompileError> {
    if exclusions.is_empty() {
        return Ok(lines);
    }

    let (plain, patterns) = compile_wildcards(exclusions)?;

    Ok(lines
        .into_iter()
        .filter(|line| {
            let matched = plain
                .iter()
                .chain(patterns.iter())
                .find(|w| w.matches(line));
            match matched {
                Some(wildcard) => {
                    debug!("excluding '{line}': matches '{}'", wildcard.pattern());
                    ctx.observer.line_filtered(line, Some(wildcard.pattern()));
                    false
                }
                None => true,
            }
        })
        .collect())
}

/// Keep only lines matching at least one inclusion pattern. Configured
/// inclusions that compile to zero wildcards keep nothing.
fn apply_inclusions(
    lines: Vec<String>,
    inclusions: &[String],
    ctx: &TransformContext<'_>,
) -> Result<Vec<String>, CompileError> {
    if inclusions.is_empty() {
        return Ok(lines);
    }

    let (plain, patterns) = compile_wildcards(inclusions)?;

    Ok(lines
        .into_iter()
        .filter(|line| {
            let included = plain
                .iter()
                .chain(patterns.iter())
                .any(|w| w.matches(line));
            if !included {
                debug!("dropping '{line}': matches no inclusion pattern");
                ctx.observer.line_filtered(line, None);
            }
            included
        })
        .collect())
}

/// Compile pattern entries, partitioned into plain substring matchers and
/// compiled patterns. Blank entries and comment entries are skipped; a
/// malformed pattern is a fatal configuration error.
fn compile_wildcards(entries: &[String]) -> Result<(Vec<Wildcard>, Vec<Wildcard>), CompileError> {
    let mut plain = Vec::new();
    let mut patterns = Vec::new();

    for entry in entries {
        let entry = entry.trim();
        if entry.is_empty() || entry.starts_with('!') || entry.starts_with('#') {
            continue;
        }
        let wildcard = Wildcard::compile(entry).map_err(|source| CompileError::BadPattern {
            pattern: entry.to_string(),
            source,
        })?;
        if wildcard.is_plain() {
            plain.push(wildcard);
        } else {
            patterns.push(wildcard);
        }
    }

    Ok((plain, patterns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NoopObserver;

    fn ctx() -> TransformContext<'static> {
        TransformContext {
            observer: &NoopObserver,
            source_name: None,
        }
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exclusions_drop_matches() {
        let cfg = PipelineConfig {
            exclusions: vec!["example.org".to_string()],
            ..Default::default()
        };
        let out = run(lines(&["||example.org^", "||other.net^"]), &cfg, &ctx()).unwrap();
        assert_eq!(out, vec!["||other.net^"]);
    }

    #[test]
    fn test_exclusion_regex() {
        let cfg = PipelineConfig {
            exclusions: vec!["/^@@/".to_string()],
            ..Default::default()
        };
        let out = run(lines(&["@@||a.org^", "||a.org^"]), &cfg, &ctx()).unwrap();
        assert_eq!(out, vec!["||a.org^"]);
    }

    #[test]
    fn test_inclusions_keep_only_matches() {
        let cfg = PipelineConfig {
            inclusions: vec!["*.tracker.*".to_string()],
            ..Default::default()
        };
        let out = run(
            lines(&["||ads.tracker.net^", "||clean.org^"]),
            &cfg,
            &ctx(),
        )
        .unwrap();
        assert_eq!(out, vec!["||ads.tracker.net^"]);
    }

    #[test]
    fn test_inclusions_with_zero_wildcards_keep_nothing() {
        let cfg = PipelineConfig {
            inclusions: vec!["! just a comment".to_string()],
            ..Default::default()
        };
        let out = run(lines(&["||a.org^"]), &cfg, &ctx()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_bad_pattern_is_fatal() {
        let cfg = PipelineConfig {
            exclusions: vec!["/[broken/".to_string()],
            ..Default::default()
        };
        assert!(run(lines(&["||a.org^"]), &cfg, &ctx()).is_err());
    }

    #[test]
    fn test_transformations_run_in_canonical_order() {
        // Deduplicate runs before RemoveEmptyLines and InsertFinalNewLine
        // regardless of the requested order.
        let cfg = PipelineConfig {
            transformations: vec![
                TransformationKind::InsertFinalNewLine,
                TransformationKind::RemoveEmptyLines,
                TransformationKind::Deduplicate,
            ],
            ..Default::default()
        };
        let out = run(
            lines(&["||a.org^", "", "||a.org^"]),
            &cfg,
            &ctx(),
        )
        .unwrap();
        assert_eq!(out, vec!["||a.org^", ""]);
    }

    #[test]
    fn test_stage_events_observed() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[derive(Default)]
        struct Counter(AtomicUsize, AtomicUsize);
        impl crate::diagnostics::PipelineObserver for Counter {
            fn stage_started(&self, _k: TransformationKind, _n: usize) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
            fn stage_completed(
                &self,
                _k: TransformationKind,
                _i: usize,
                _o: usize,
                _e: std::time::Duration,
            ) {
                self.1.fetch_add(1, Ordering::Relaxed);
            }
        }

        let counter = Counter::default();
        let cfg = PipelineConfig {
            transformations: vec![
                TransformationKind::TrimLines,
                TransformationKind::Deduplicate,
            ],
            ..Default::default()
        };
        let observer_ctx = TransformContext {
            observer: &counter,
            source_name: None,
        };
        run(lines(&["||a.org^"]), &cfg, &observer_ctx).unwrap();
        assert_eq!(counter.0.load(Ordering::Relaxed), 2);
        assert_eq!(counter.1.load(Ordering::Relaxed), 2);
    }
}
