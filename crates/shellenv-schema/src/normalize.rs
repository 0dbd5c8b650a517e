use crate::source::{parse_source_file, OverlaySection, SourceDocumentV1, SourceError, SourceSection};
use crate::types::{Channel, PackageName, SourceName};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// A package requested on a release channel. The name is the uniqueness key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PackageRef {
    pub name: PackageName,
    pub channel: Channel,
}

impl PackageRef {
    pub fn new(name: impl Into<PackageName>, channel: Channel) -> Self {
        Self {
            name: name.into(),
            channel,
        }
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.channel)
    }
}

/// What an overlay does to a single package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverlayAction {
    /// Define the package, or redefine it on the given channel.
    SetChannel(Channel),
    /// Drop the package from the running set.
    Remove,
}

impl fmt::Display for OverlayAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetChannel(channel) => write!(f, "channel {channel}"),
            Self::Remove => f.write_str("removal"),
        }
    }
}

/// A validated overlay: one action per package name, in declaration order.
///
/// Packages an overlay introduces enter the running set in this order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Overlay {
    pub name: String,
    pub actions: IndexMap<PackageName, OverlayAction>,
}

impl Overlay {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn set_channel(mut self, package: &str, channel: Channel) -> Self {
        self.actions
            .insert(PackageName::new(package), OverlayAction::SetChannel(channel));
        self
    }

    #[must_use]
    pub fn remove(mut self, package: &str) -> Self {
        self.actions
            .insert(PackageName::new(package), OverlayAction::Remove);
        self
    }
}

/// A validated, immutable environment source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentSource {
    pub name: SourceName,
    pub overlays: Vec<Overlay>,
    pub packages: Vec<PackageRef>,
}

impl EnvironmentSource {
    pub fn new(name: impl Into<SourceName>) -> Self {
        Self {
            name: name.into(),
            overlays: Vec::new(),
            packages: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        self.overlays.push(overlay);
        self
    }

    #[must_use]
    pub fn with_package(mut self, name: &str, channel: Channel) -> Self {
        self.packages.push(PackageRef::new(name, channel));
        self
    }
}

impl SourceDocumentV1 {
    /// Validate the document and turn every `[[source]]` into an [`EnvironmentSource`],
    /// preserving declaration order.
    pub fn normalize(&self) -> Result<Vec<EnvironmentSource>, SourceError> {
        if self.source_version != 1 {
            return Err(SourceError::UnsupportedVersion(self.source_version));
        }

        let mut seen = BTreeSet::new();
        let mut out = Vec::with_capacity(self.sources.len());
        for section in &self.sources {
            let source = normalize_source(section)?;
            if !seen.insert(source.name.clone()) {
                return Err(SourceError::DuplicateSource(source.name.into_inner()));
            }
            out.push(source);
        }
        Ok(out)
    }
}

/// Parse and normalize several source documents, in the given order.
///
/// Source names must be unique across all documents.
pub fn load_sources<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<EnvironmentSource>, SourceError> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for path in paths {
        for source in parse_source_file(path)?.normalize()? {
            if !seen.insert(source.name.clone()) {
                return Err(SourceError::DuplicateSource(source.name.into_inner()));
            }
            out.push(source);
        }
    }
    Ok(out)
}

fn normalize_source(section: &SourceSection) -> Result<EnvironmentSource, SourceError> {
    let name = section.name.trim().to_owned();
    if name.is_empty() {
        return Err(SourceError::EmptySourceName);
    }

    let overlays = section
        .overlays
        .iter()
        .map(|o| normalize_overlay(&name, o))
        .collect::<Result<Vec<_>, _>>()?;

    let mut packages = Vec::with_capacity(section.packages.len());
    for decl in &section.packages {
        let pkg_name = decl.name().trim();
        if pkg_name.is_empty() {
            return Err(SourceError::EmptyPackageName { source_name: name });
        }
        let channel = match decl.channel() {
            None => Channel::Stable,
            Some(raw) => Channel::parse(raw).ok_or_else(|| SourceError::EmptyChannel {
                source_name: name.clone(),
                package: pkg_name.to_owned(),
            })?,
        };
        packages.push(PackageRef::new(pkg_name, channel));
    }

    Ok(EnvironmentSource {
        name: SourceName::new(name),
        overlays,
        packages,
    })
}

fn normalize_overlay(source_name: &str, section: &OverlaySection) -> Result<Overlay, SourceError> {
    let name = section.name.trim().to_owned();
    if name.is_empty() {
        return Err(SourceError::EmptyOverlayName {
            source_name: source_name.to_owned(),
        });
    }

    let mut actions: IndexMap<PackageName, OverlayAction> = IndexMap::new();
    for (pkg, raw_channel) in &section.channels {
        let pkg = pkg.trim();
        if pkg.is_empty() {
            return Err(SourceError::EmptyPackageName {
                source_name: source_name.to_owned(),
            });
        }
        let channel = Channel::parse(raw_channel).ok_or_else(|| SourceError::EmptyChannel {
            source_name: source_name.to_owned(),
            package: pkg.to_owned(),
        })?;
        // Keys that only differ in surrounding whitespace collapse here.
        match actions.get(pkg) {
            Some(OverlayAction::SetChannel(first)) if *first != channel => {
                return Err(SourceError::DuplicateOverlayEntry {
                    source_name: source_name.to_owned(),
                    overlay: name,
                    package: pkg.to_owned(),
                    first: first.to_string(),
                    second: channel.to_string(),
                });
            }
            Some(_) => {}
            None => {
                actions.insert(PackageName::new(pkg), OverlayAction::SetChannel(channel));
            }
        }
    }

    for pkg in &section.remove {
        let pkg = pkg.trim();
        if pkg.is_empty() {
            return Err(SourceError::EmptyPackageName {
                source_name: source_name.to_owned(),
            });
        }
        if let Some(OverlayAction::SetChannel(_)) = actions.get(pkg) {
            return Err(SourceError::SelfContradictoryOverlay {
                source_name: source_name.to_owned(),
                overlay: name,
                package: pkg.to_owned(),
            });
        }
        actions.insert(PackageName::new(pkg), OverlayAction::Remove);
    }

    Ok(Overlay { name, actions })
}
