use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read source file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse source document: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unsupported source_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("source name must not be empty")]
    EmptySourceName,
    #[error("duplicate source name '{0}'")]
    DuplicateSource(String),
    #[error("overlay name must not be empty in source '{source_name}'")]
    EmptyOverlayName { source_name: String },
    #[error("empty package name in source '{source_name}'")]
    EmptyPackageName { source_name: String },
    #[error("empty channel for package '{package}' in source '{source_name}'")]
    EmptyChannel {
        source_name: String,
        package: String,
    },
    #[error(
        "overlay '{overlay}' in source '{source_name}' both redefines and removes package '{package}'"
    )]
    SelfContradictoryOverlay {
        source_name: String,
        overlay: String,
        package: String,
    },
    #[error(
        "overlay '{overlay}' in source '{source_name}' sets package '{package}' to both '{first}' and '{second}'"
    )]
    DuplicateOverlayEntry {
        source_name: String,
        overlay: String,
        package: String,
        first: String,
        second: String,
    },
}

/// On-disk source document, version 1.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SourceDocumentV1 {
    pub source_version: u32,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceSection>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    pub name: String,
    #[serde(default)]
    pub packages: Vec<PackageDecl>,
    #[serde(default, rename = "overlay")]
    pub overlays: Vec<OverlaySection>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OverlaySection {
    pub name: String,
    /// Packages this overlay defines or redefines, with their channel, in
    /// declaration order.
    #[serde(default)]
    pub channels: IndexMap<String, String>,
    /// Packages this overlay drops from the running set.
    #[serde(default)]
    pub remove: Vec<String>,
}

/// A package is either a bare name (stable channel) or a table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PackageDecl {
    Name(String),
    Table(PackageTable),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PackageTable {
    pub name: String,
    #[serde(default)]
    pub channel: Option<String>,
}

impl PackageDecl {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Table(table) => &table.name,
        }
    }

    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::Table(table) => table.channel.as_deref(),
        }
    }
}

pub fn parse_source_str(input: &str) -> Result<SourceDocumentV1, SourceError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_source_file(path: impl AsRef<Path>) -> Result<SourceDocumentV1, SourceError> {
    let content = fs::read_to_string(path)?;
    parse_source_str(&content)
}
