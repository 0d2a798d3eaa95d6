//! Compilation configuration
//!
//! The JSON shape consumed by the compiler: list metadata, the ordered
//! source declarations, and the requested transformations plus
//! exclusion/inclusion pattern lists at both the source and list level.

use serde::{Deserialize, Serialize};

/// Whole-list compilation configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Configuration {
    /// Name of the compiled list, used in the generated header.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Sources, compiled and joined in declaration order.
    #[serde(default)]
    pub sources: Vec<Source>,

    /// Transformations applied to the merged list. Execution follows the
    /// canonical order regardless of the order given here.
    #[serde(default)]
    pub transformations: Vec<TransformationKind>,

    /// Wildcard patterns; matching rules are dropped from the merged list.
    #[serde(default)]
    pub exclusions: Vec<String>,
    /// Sources (paths/URLs) of additional exclusion patterns, one per line.
    #[serde(default)]
    pub exclusions_sources: Vec<String>,

    /// Wildcard patterns; when non-empty, only matching rules are kept.
    #[serde(default)]
    pub inclusions: Vec<String>,
    #[serde(default)]
    pub inclusions_sources: Vec<String>,

    /// Platform identifier substituted into `!#if` conditions. With the
    /// default `None`, every platform identifier evaluates to `false`, so
    /// platform-conditional blocks select their `!#else` branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_platform: Option<String>,
}

/// One upstream list to compile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Source {
    /// Display name; defaults to the source id in logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Path or URL understood by a registered `ContentFetcher`.
    pub source: String,

    /// Declared syntax of the upstream list.
    #[serde(rename = "type", default)]
    pub kind: SourceKind,

    /// Transformations applied to this source alone, before merging.
    #[serde(default)]
    pub transformations: Vec<TransformationKind>,

    #[serde(default)]
    pub exclusions: Vec<String>,
    #[serde(default)]
    pub exclusions_sources: Vec<String>,
    #[serde(default)]
    pub inclusions: Vec<String>,
    #[serde(default)]
    pub inclusions_sources: Vec<String>,
}

impl Source {
    /// Name for diagnostics: the declared name or the source id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.source)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Adblock,
    Hosts,
}

/// Transformation identifiers as they appear in configuration. Unrecognized
/// names deserialize to `Other` and are ignored by the canonical-order
/// filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransformationKind {
    ConvertToAscii,
    TrimLines,
    RemoveComments,
    Compress,
    RemoveModifiers,
    InvertAllow,
    Validate,
    ValidateAllowIp,
    Deduplicate,
    RemoveEmptyLines,
    InsertFinalNewLine,
    Other,
}

impl TransformationKind {
    fn from_name(name: &str) -> Self {
        match name {
            "ConvertToAscii" => Self::ConvertToAscii,
            "TrimLines" => Self::TrimLines,
            "RemoveComments" => Self::RemoveComments,
            "Compress" => Self::Compress,
            "RemoveModifiers" => Self::RemoveModifiers,
            "InvertAllow" => Self::InvertAllow,
            "Validate" => Self::Validate,
            "ValidateAllowIp" => Self::ValidateAllowIp,
            "Deduplicate" => Self::Deduplicate,
            "RemoveEmptyLines" => Self::RemoveEmptyLines,
            "InsertFinalNewLine" => Self::InsertFinalNewLine,
            _ => Self::Other,
        }
    }
}

impl<'de> Deserialize<'de> for TransformationKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        let kind = TransformationKind::from_name(&name);
        if kind == TransformationKind::Other {
            log::warn!("unknown transformation '{name}', ignoring");
        }
        Ok(kind)
    }
}
