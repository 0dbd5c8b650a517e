use crate::CoreError;
use shellenv_schema::{
    EnvironmentSource, Overlay, OverlayAction, PackageName, PackageRef, PlatformPackageSet,
    ResolvedPackage,
};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Ordered package set keyed by name.
///
/// A package keeps the position of its first insertion. Redefining it
/// replaces the channel in place; removing it drops the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSet {
    entries: Vec<PackageRef>,
}

impl PackageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `pkg`, or overwrite the channel of the package with the same name.
    pub fn upsert(&mut self, pkg: PackageRef) {
        match self.entries.iter_mut().find(|p| p.name == pkg.name) {
            Some(existing) => existing.channel = pkg.channel,
            None => self.entries.push(pkg),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<PackageRef> {
        let idx = self.entries.iter().position(|p| p.name == name)?;
        Some(self.entries.remove(idx))
    }

    pub fn get(&self, name: &str) -> Option<&PackageRef> {
        self.entries.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageRef> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<PackageRef> {
        self.entries
    }
}

impl FromIterator<PackageRef> for PackageSet {
    fn from_iter<I: IntoIterator<Item = PackageRef>>(iter: I) -> Self {
        let mut set = Self::new();
        for pkg in iter {
            set.upsert(pkg);
        }
        set
    }
}

/// Apply one overlay to a package set, producing the next set.
pub fn apply_overlay(overlay: &Overlay, mut set: PackageSet) -> PackageSet {
    for (name, action) in &overlay.actions {
        match action {
            OverlayAction::SetChannel(channel) => {
                set.upsert(PackageRef::new(name.clone(), channel.clone()));
            }
            OverlayAction::Remove => {
                set.remove(name);
            }
        }
    }
    trace!(overlay = %overlay.name, packages = set.len(), "applied overlay");
    set
}

/// Reject a source whose overlays disagree about the same package.
///
/// Overlays of one source are applied as a single step, so two of them
/// declaring different actions for one name has no defined winner.
fn check_overlay_conflicts(source: &EnvironmentSource) -> Result<(), CoreError> {
    let mut declared: BTreeMap<&PackageName, (&str, &OverlayAction)> = BTreeMap::new();
    for overlay in &source.overlays {
        for (name, action) in &overlay.actions {
            match declared.get(name) {
                Some((first_overlay, first)) if *first != action => {
                    return Err(CoreError::ConflictingOverlay {
                        source_name: source.name.to_string(),
                        package: name.to_string(),
                        first_overlay: (*first_overlay).to_owned(),
                        first: (*first).clone(),
                        second_overlay: overlay.name.clone(),
                        second: action.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    declared.insert(name, (overlay.name.as_str(), action));
                }
            }
        }
    }
    Ok(())
}

/// Merge sources into one deduplicated, ordered package list.
///
/// For each source in order, its overlays are folded over the running set,
/// then its explicit packages are upserted. Later sources override earlier
/// ones by name.
pub fn merge_packages(sources: &[EnvironmentSource]) -> Result<Vec<PackageRef>, CoreError> {
    let mut set = PackageSet::new();
    for source in sources {
        check_overlay_conflicts(source)?;
        set = source
            .overlays
            .iter()
            .fold(set, |acc, overlay| apply_overlay(overlay, acc));
        for pkg in &source.packages {
            if let Some(prev) = set.get(&pkg.name) {
                if prev.channel != pkg.channel {
                    debug!(
                        source = %source.name,
                        package = %pkg.name,
                        from = %prev.channel,
                        to = %pkg.channel,
                        "package overridden"
                    );
                }
            }
            set.upsert(pkg.clone());
        }
    }
    Ok(set.into_vec())
}

/// Merge sources and bind each package to the library artifact it provides
/// in `platform_set`.
pub fn merge(
    sources: &[EnvironmentSource],
    platform_set: &PlatformPackageSet,
) -> Result<Vec<ResolvedPackage>, CoreError> {
    let packages = merge_packages(sources)?;
    Ok(packages
        .into_iter()
        .map(|pkg| {
            let lib_dir = platform_set
                .library_dir(&pkg.name, &pkg.channel)
                .map(str::to_owned);
            ResolvedPackage {
                name: pkg.name,
                channel: pkg.channel,
                lib_dir,
            }
        })
        .collect())
}
