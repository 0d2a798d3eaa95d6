//! Top-level compilation
//!
//! Fans out per-source work (fetch, directive resolution, per-source
//! pipeline), joins the results in source-declaration order, and runs the
//! whole-list pipeline once over the merged sequence.

use hostmill_core::wildcard::WildcardError;
use log::info;
use rayon::prelude::*;

use crate::config::{Configuration, Source};
use crate::diagnostics::{NoopObserver, PipelineObserver};
use crate::fetch::{ContentFetcher, FetchError};
use crate::pipeline::{self, PipelineConfig};
use crate::preprocessor::DirectiveResolver;
use crate::transform::TransformContext;

/// Default bound on `!#include` recursion depth.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A top-level source (or a pattern source list) could not be fetched.
    /// Include failures inside a source are warnings, not errors.
    #[error("failed to fetch source '{source}'")]
    Fetch {
        source: String,
        #[source]
        cause: FetchError,
    },
    #[error("bad exclusion/inclusion pattern '{pattern}'")]
    BadPattern {
        pattern: String,
        #[source]
        source: WildcardError,
    },
    #[error("configuration declares no sources")]
    NoSources,
}

/// Compiles a configuration into the final rule list.
pub struct Compiler<'a> {
    fetcher: &'a dyn ContentFetcher,
    observer: &'a dyn PipelineObserver,
    max_include_depth: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(fetcher: &'a dyn ContentFetcher) -> Self {
        Self {
            fetcher,
            observer: &NoopObserver,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn PipelineObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Compile every source and merge the results.
    pub fn compile(&self, config: &Configuration) -> Result<Vec<String>, CompileError> {
        if config.sources.is_empty() {
            return Err(CompileError::NoSources);
        }

        // Each source owns its visited set and rule sequence; the only
        // join point is the ordered collect below.
        let per_source: Vec<Result<Vec<String>, CompileError>> = config
            .sources
            .par_iter()
            .map(|source| self.compile_source(source, config))
            .collect();

        let mut merged = Vec::new();
        for result in per_source {
            merged.extend(result?);
        }

        info!(
            "compiled {} sources into {} rules, running whole-list transformations",
            config.sources.len(),
            merged.len()
        );

        let cfg = PipelineConfig {
            transformations: config.transformations.clone(),
            exclusions: self.collect_patterns(&config.exclusions, &config.exclusions_sources)?,
            inclusions: self.collect_patterns(&config.inclusions, &config.inclusions_sources)?,
        };
        let ctx = TransformContext {
            observer: self.observer,
            source_name: None,
        };
        pipeline::run(merged, &cfg, &ctx)
    }

    fn compile_source(
        &self,
        source: &Source,
        config: &Configuration,
    ) -> Result<Vec<String>, CompileError> {
        info!("compiling source '{}'", source.display_name());

        let resolver = DirectiveResolver::new(
            self.fetcher,
            self.max_include_depth,
            config.target_platform.as_deref(),
        );
        let lines = resolver
            .resolve(&source.source)
            .map_err(|cause| CompileError::Fetch {
                source: source.source.clone(),
                cause,
            })?;

        let cfg = PipelineConfig {
            transformations: source.transformations.clone(),
            exclusions: self.collect_patterns(&source.exclusions, &source.exclusions_sources)?,
            inclusions: self.collect_patterns(&source.inclusions, &source.inclusions_sources)?,
        };
        let ctx = TransformContext {
            observer: self.observer,
            source_name: Some(source.display_name()),
        };
        pipeline::run(lines, &cfg, &ctx)
    }

    /// Merge inline patterns with the contents of pattern source lists.
    /// Pattern sources are configuration, so a fetch failure here is fatal.
    fn collect_patterns(
        &self,
        inline: &[String],
        sources: &[String],
    ) -> Result<Vec<String>, CompileError> {
        let mut patterns: Vec<String> = inline.to_vec();
        for source in sources {
            let content = self
                .fetcher
                .fetch(source)
                .map_err(|cause| CompileError::Fetch {
                    source: source.clone(),
                    cause,
                })?;
            patterns.extend(content.lines().map(str::to_string));
        }
        Ok(patterns)
    }
}
