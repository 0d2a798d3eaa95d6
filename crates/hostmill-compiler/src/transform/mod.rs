//! Rule-list transformations
//!
//! Each transformation consumes the previous stage's full output and
//! produces the next stage's input. The execution order is fixed by
//! [`CANONICAL_ORDER`] no matter how the configuration lists them.

pub mod compress;
pub mod dedup;
pub mod simple;
pub mod validate;

use crate::config::TransformationKind;
use crate::diagnostics::PipelineObserver;

/// Canonical execution order. Requested transformations are applied as the
/// subsequence of this list; anything else (`Other`) is ignored.
pub const CANONICAL_ORDER: [TransformationKind; 11] = [
    TransformationKind::ConvertToAscii,
    TransformationKind::TrimLines,
    TransformationKind::RemoveComments,
    TransformationKind::Compress,
    TransformationKind::RemoveModifiers,
    TransformationKind::InvertAllow,
    TransformationKind::Validate,
    TransformationKind::ValidateAllowIp,
    TransformationKind::Deduplicate,
    TransformationKind::RemoveEmptyLines,
    TransformationKind::InsertFinalNewLine,
];

/// Shared context handed to every transformation. Carries only side
/// channels; transformations must not read configuration from it.
pub struct TransformContext<'a> {
    pub observer: &'a dyn PipelineObserver,
    pub source_name: Option<&'a str>,
}

/// A single pipeline stage. One entry point; implementations never fail,
/// they absorb per-rule problems as diagnostics.
pub trait Transformation {
    fn kind(&self) -> TransformationKind;

    fn apply(&self, lines: Vec<String>, ctx: &TransformContext<'_>) -> Vec<String>;
}

/// Resolve the requested set against the canonical order.
pub fn resolve_order(requested: &[TransformationKind]) -> Vec<TransformationKind> {
    CANONICAL_ORDER
        .iter()
        .copied()
        .filter(|kind| requested.contains(kind))
        .collect()
}

/// Instantiate the transformation for an identifier. `Other` has no
/// implementation and must be filtered out by [`resolve_order`] first.
pub fn instantiate(kind: TransformationKind) -> Box<dyn Transformation> {
    match kind {
        TransformationKind::ConvertToAscii => Box::new(simple::ConvertToAscii),
        TransformationKind::TrimLines => Box::new(simple::TrimLines),
        TransformationKind::RemoveComments => Box::new(simple::RemoveComments),
        TransformationKind::Compress => Box::new(compress::Compress),
        TransformationKind::RemoveModifiers => Box::new(simple::RemoveModifiers),
        TransformationKind::InvertAllow => Box::new(simple::InvertAllow),
        TransformationKind::Validate => Box::new(validate::Validate::new(false)),
        TransformationKind::ValidateAllowIp => Box::new(validate::Validate::new(true)),
        TransformationKind::Deduplicate => Box::new(dedup::Deduplicate),
        TransformationKind::RemoveEmptyLines => Box::new(simple::RemoveEmptyLines),
        TransformationKind::InsertFinalNewLine => Box::new(simple::InsertFinalNewLine),
        TransformationKind::Other => unreachable!("Other is filtered by resolve_order"),
    }
}
