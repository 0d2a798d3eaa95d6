//! Hostmill Blocklist Compiler
//!
//! Compiles one or more textual blocklist/allowlist sources (DNS-hosts
//! syntax or adblock filter syntax) into a single normalized, deduplicated,
//! validated rule list.
//!
//! Compilation proceeds per source: fetched raw text runs through the
//! directive preprocessor (`!#include`, `!#if`), then through that source's
//! transformation pipeline. The per-source results are joined in declaration
//! order and the whole-list pipeline (exclusions, inclusions, and the
//! canonically ordered transformations) runs once over the merged sequence.
//!
//! # Modules
//!
//! - `config`: JSON configuration model
//! - `fetch`: the `ContentFetcher` seam and its file/memory implementations
//! - `preprocessor`: conditional-compilation and inclusion directives
//! - `pipeline`: exclusion/inclusion filtering and ordered transformations
//! - `transform`: the individual transformations
//! - `diagnostics`: structured issues and the pipeline observer
//! - `compile`: the top-level entry point

pub mod compile;
pub mod conditions;
pub mod config;
pub mod diagnostics;
pub mod fetch;
pub mod pipeline;
pub mod preprocessor;
pub mod transform;

pub use compile::{CompileError, Compiler};
pub use config::{Configuration, Source, TransformationKind};
pub use diagnostics::{NoopObserver, PipelineObserver, Severity, ValidationIssue};
pub use fetch::{ContentFetcher, FetchError, FileFetcher, MemoryFetcher};
