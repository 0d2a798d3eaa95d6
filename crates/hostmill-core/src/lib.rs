//! Hostmill Core Library
//!
//! This crate provides the vocabulary of the hostmill blocklist compiler:
//! rule classification, wildcard patterns, hostname validation, and
//! public-suffix queries. It performs no I/O and holds no configuration;
//! the compilation pipeline lives in `hostmill-compiler`.
//!
//! # Modules
//!
//! - `rule`: line classifier producing typed rule records
//! - `wildcard`: glob/regex patterns for inclusion and exclusion filtering
//! - `hostname`: hostname well-formedness and IP-literal detection
//! - `psl`: public-suffix queries backed by an optional Public Suffix List

pub mod hostname;
pub mod psl;
pub mod rule;
pub mod wildcard;

// Re-export commonly used types
pub use rule::{Modifier, NetworkRule, Rule, RuleKind};
pub use wildcard::{Wildcard, WildcardError};
