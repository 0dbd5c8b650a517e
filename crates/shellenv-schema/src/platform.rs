//! Supported platforms and the package catalog available on each.
//!
//! The platform table is plain configuration: resolution only ever consults a
//! [`PlatformTable`] handed to it, which is either the built-in default, a TOML
//! file supplied by the user, or one assembled in code.

use crate::types::{Channel, PackageName, PlatformId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformTableError {
    #[error("failed to read platform table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse platform table: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("platform id must not be empty")]
    EmptyPlatformId,
    #[error("duplicate platform '{0}' in platform table")]
    DuplicatePlatform(String),
    #[error("empty library directory for package '{package}' on platform '{platform}'")]
    EmptyLibraryDir { platform: String, package: String },
    #[error("package '{package}' listed more than once for platform '{platform}'")]
    DuplicatePackage { platform: String, package: String },
}

/// Built-in table covering the four common Nix systems.
pub const BUILTIN_PLATFORM_TABLE: &str = r#"
[[platform]]
id = "x86_64-linux"

[platform.packages.openssl]
lib = "/nix/store/x86_64-linux/openssl-3.0.13/lib"

[platform.packages.zlib]
lib = "/nix/store/x86_64-linux/zlib-1.3.1/lib"

[platform.packages.rust]
lib = "/nix/store/x86_64-linux/rust-stable/lib"
channels = { nightly = "/nix/store/x86_64-linux/rust-nightly/lib" }

[platform.packages.pkg-config]

[[platform]]
id = "aarch64-linux"

[platform.packages.openssl]
lib = "/nix/store/aarch64-linux/openssl-3.0.13/lib"

[platform.packages.zlib]
lib = "/nix/store/aarch64-linux/zlib-1.3.1/lib"

[platform.packages.rust]
lib = "/nix/store/aarch64-linux/rust-stable/lib"
channels = { nightly = "/nix/store/aarch64-linux/rust-nightly/lib" }

[platform.packages.pkg-config]

[[platform]]
id = "x86_64-darwin"

[platform.packages.openssl]
lib = "/nix/store/x86_64-darwin/openssl-3.0.13/lib"

[platform.packages.libiconv]
lib = "/nix/store/x86_64-darwin/libiconv-107/lib"

[platform.packages.rust]
lib = "/nix/store/x86_64-darwin/rust-stable/lib"
channels = { nightly = "/nix/store/x86_64-darwin/rust-nightly/lib" }

[platform.packages.pkg-config]

[[platform]]
id = "aarch64-darwin"

[platform.packages.openssl]
lib = "/nix/store/aarch64-darwin/openssl-3.0.13/lib"

[platform.packages.libiconv]
lib = "/nix/store/aarch64-darwin/libiconv-107/lib"

[platform.packages.rust]
lib = "/nix/store/aarch64-darwin/rust-stable/lib"
channels = { nightly = "/nix/store/aarch64-darwin/rust-nightly/lib" }

[platform.packages.pkg-config]
"#;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct PlatformTableFile {
    #[serde(default)]
    platform: Vec<PlatformSection>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct PlatformSection {
    id: String,
    #[serde(default)]
    library_path_var: Option<String>,
    #[serde(default)]
    packages: BTreeMap<String, CatalogEntry>,
}

/// Catalog record for one package on one platform.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    /// Library directory for any channel without its own entry.
    #[serde(default)]
    pub lib: Option<String>,
    /// Channel-specific library directories.
    #[serde(default)]
    pub channels: BTreeMap<String, String>,
}

impl CatalogEntry {
    /// Library directory this package contributes on `channel`, if any.
    pub fn library_dir(&self, channel: &Channel) -> Option<&str> {
        self.channels
            .get(channel.as_str())
            .or(self.lib.as_ref())
            .map(String::as_str)
    }
}

/// The catalog of packages available for one platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformPackageSet {
    pub platform: PlatformId,
    /// Environment variable holding the dynamic-library search path.
    pub library_path_var: String,
    pub catalog: BTreeMap<PackageName, CatalogEntry>,
}

impl PlatformPackageSet {
    pub fn new(platform: impl Into<PlatformId>) -> Self {
        let platform = platform.into();
        let library_path_var = default_library_path_var(&platform).to_owned();
        Self {
            platform,
            library_path_var,
            catalog: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_package(mut self, name: &str, entry: CatalogEntry) -> Self {
        self.catalog.insert(PackageName::new(name), entry);
        self
    }

    /// Library directory contributed by `name` on `channel`. Packages missing
    /// from the catalog contribute nothing.
    pub fn library_dir(&self, name: &str, channel: &Channel) -> Option<&str> {
        self.catalog.get(name)?.library_dir(channel)
    }
}

/// Finite, read-only table of supported platforms.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformTable {
    platforms: BTreeMap<PlatformId, PlatformPackageSet>,
}

impl PlatformTable {
    pub fn builtin() -> Result<Self, PlatformTableError> {
        Self::parse_str(BUILTIN_PLATFORM_TABLE)
    }

    pub fn parse_str(input: &str) -> Result<Self, PlatformTableError> {
        let file: PlatformTableFile = toml::from_str(input)?;
        let mut table = Self::default();
        for section in file.platform {
            let id = section.id.trim().to_owned();
            if id.is_empty() {
                return Err(PlatformTableError::EmptyPlatformId);
            }
            for (package, entry) in &section.packages {
                let empty = entry.lib.as_deref().is_some_and(|l| l.trim().is_empty())
                    || entry.channels.values().any(|l| l.trim().is_empty());
                if empty {
                    return Err(PlatformTableError::EmptyLibraryDir {
                        platform: id,
                        package: package.clone(),
                    });
                }
            }
            let mut set = PlatformPackageSet::new(id.as_str());
            if let Some(var) = section.library_path_var {
                set.library_path_var = var;
            }
            for (name, entry) in section.packages {
                let name = PackageName::new(name.trim());
                if set.catalog.contains_key(&name) {
                    return Err(PlatformTableError::DuplicatePackage {
                        platform: id,
                        package: name.into_inner(),
                    });
                }
                set.catalog.insert(name, entry);
            }
            table.insert(set)?;
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, PlatformTableError> {
        let content = fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    /// Register a platform. Each id may only appear once.
    pub fn insert(&mut self, set: PlatformPackageSet) -> Result<(), PlatformTableError> {
        if self.platforms.contains_key(&set.platform) {
            return Err(PlatformTableError::DuplicatePlatform(
                set.platform.into_inner(),
            ));
        }
        self.platforms.insert(set.platform.clone(), set);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert) for tables assembled in code.
    /// Unlike `insert`, a platform already present is replaced.
    #[must_use]
    pub fn with_platform(mut self, set: PlatformPackageSet) -> Self {
        self.platforms.insert(set.platform.clone(), set);
        self
    }

    pub fn get(&self, id: &str) -> Option<&PlatformPackageSet> {
        self.platforms.get(id)
    }

    /// Supported platform ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &PlatformId> {
        self.platforms.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlatformPackageSet> {
        self.platforms.values()
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

/// Location of the user's platform table, `~/.config/shellenv/platforms.toml`.
pub fn default_table_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config/shellenv/platforms.toml"))
}

/// `DYLD_LIBRARY_PATH` for darwin platforms, `LD_LIBRARY_PATH` otherwise.
pub fn default_library_path_var(platform: &str) -> &'static str {
    if platform.ends_with("-darwin") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    }
}

/// Operating systems the host detection recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Darwin,
}

impl Os {
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Darwin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
        }
    }
}

/// CPU architectures the host detection recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    Aarch64,
}

impl Arch {
    pub fn current() -> Option<Self> {
        match std::env::consts::ARCH {
            "x86_64" => Some(Self::X86_64),
            "aarch64" => Some(Self::Aarch64),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }
}

/// Architecture and OS pair, rendered as `<arch>-<os>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub arch: Arch,
    pub os: Os,
}

impl Platform {
    pub fn new(arch: Arch, os: Os) -> Self {
        Self { arch, os }
    }

    /// Detect the host platform. `None` when the host is not recognised.
    pub fn current() -> Option<Self> {
        Some(Self {
            arch: Arch::current()?,
            os: Os::current()?,
        })
    }

    pub fn id(&self) -> PlatformId {
        PlatformId::new(self.to_string())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.arch.as_str(), self.os.as_str())
    }
}
