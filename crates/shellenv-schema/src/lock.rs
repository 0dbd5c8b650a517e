use crate::environment::ResolvedEnvironment;
use crate::identity::EnvIdentity;
use crate::normalize::EnvironmentSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const LOCK_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("lock file parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("lock file serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("unsupported lock_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error(
        "lock file env_id mismatch for '{platform}': lock has '{lock_id}', recomputed '{computed_id}'"
    )]
    EnvIdMismatch {
        platform: String,
        lock_id: String,
        computed_id: String,
    },
    #[error("lock file lists platform '{0}' more than once")]
    DuplicatePlatform(String),
    #[error("lock file source drift: {0}")]
    SourceDrift(String),
}

/// One locked environment: the record plus the identity it hashed to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockedEnvironment {
    pub env_id: String,
    pub short_id: String,
    pub resolved: ResolvedEnvironment,
}

/// Captures every environment resolved from a set of sources so later runs
/// can detect drift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockFile {
    pub lock_version: u32,
    /// Source names, in merge order.
    pub sources: Vec<String>,
    #[serde(default, rename = "environment")]
    pub environments: Vec<LockedEnvironment>,
}

impl LockFile {
    pub fn from_resolved(sources: &[EnvironmentSource], envs: &[ResolvedEnvironment]) -> Self {
        let environments = envs
            .iter()
            .map(|env| {
                let identity = env.identity();
                LockedEnvironment {
                    env_id: identity.env_id.into_inner(),
                    short_id: identity.short_id.into_inner(),
                    resolved: env.clone(),
                }
            })
            .collect();

        LockFile {
            lock_version: LOCK_VERSION,
            sources: sources.iter().map(|s| s.name.to_string()).collect(),
            environments,
        }
    }

    /// Recompute every environment's identity and compare it to the stored one.
    pub fn verify_integrity(&self) -> Result<Vec<EnvIdentity>, LockError> {
        if self.lock_version != LOCK_VERSION {
            return Err(LockError::UnsupportedVersion(self.lock_version));
        }

        let mut seen = BTreeSet::new();
        let mut identities = Vec::with_capacity(self.environments.len());
        for locked in &self.environments {
            let platform = locked.resolved.platform.as_str();
            if !seen.insert(platform) {
                return Err(LockError::DuplicatePlatform(platform.to_owned()));
            }
            let identity = locked.resolved.identity();
            if locked.env_id != identity.env_id.as_str()
                || locked.short_id != identity.short_id.as_str()
            {
                return Err(LockError::EnvIdMismatch {
                    platform: platform.to_owned(),
                    lock_id: locked.env_id.clone(),
                    computed_id: identity.env_id.into_inner(),
                });
            }
            identities.push(identity);
        }
        Ok(identities)
    }

    /// Check that the lock was produced from the given sources, in the same order.
    pub fn verify_sources(&self, sources: &[EnvironmentSource]) -> Result<(), LockError> {
        let current: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        if self.sources != current {
            return Err(LockError::SourceDrift(format!(
                "lock has [{}], sources are [{}]",
                self.sources.join(", "),
                current.join(", ")
            )));
        }
        Ok(())
    }

    pub fn environment(&self, platform: &str) -> Option<&LockedEnvironment> {
        self.environments
            .iter()
            .find(|e| e.resolved.platform == platform)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), LockError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LockError::Io(e.error))?;
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::ResolvedPackage;
    use crate::types::{Channel, PackageName, PlatformId};

    fn sample_env(platform: &str) -> ResolvedEnvironment {
        ResolvedEnvironment {
            platform: PlatformId::new(platform),
            library_path_var: "LD_LIBRARY_PATH".to_owned(),
            library_path: vec!["/nix/store/openssl/lib".to_owned()],
            init_statements: vec!["export LD_LIBRARY_PATH='/nix/store/openssl/lib'".to_owned()],
            packages: vec![
                ResolvedPackage {
                    name: PackageName::new("openssl"),
                    channel: Channel::Stable,
                    lib_dir: Some("/nix/store/openssl/lib".to_owned()),
                },
                ResolvedPackage {
                    name: PackageName::new("rust"),
                    channel: Channel::Nightly,
                    lib_dir: None,
                },
            ],
        }
    }

    fn sample_sources() -> Vec<EnvironmentSource> {
        vec![
            EnvironmentSource::new("toolchain").with_package("openssl", Channel::Stable),
            EnvironmentSource::new("nightly").with_package("rust", Channel::Nightly),
        ]
    }

    fn sample_lock() -> LockFile {
        LockFile::from_resolved(
            &sample_sources(),
            &[sample_env("x86_64-linux"), sample_env("aarch64-linux")],
        )
    }

    #[test]
    fn lock_roundtrip() {
        let lock = sample_lock();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shellenv.lock");

        lock.write_to_file(&path).unwrap();
        let loaded = LockFile::read_from_file(&path).unwrap();
        assert_eq!(lock, loaded);
    }

    #[test]
    fn lock_roundtrip_with_empty_environment() {
        let mut env = sample_env("x86_64-linux");
        env.packages.clear();
        env.library_path.clear();
        env.init_statements = vec!["export LD_LIBRARY_PATH=''".to_owned()];
        let lock = LockFile::from_resolved(&[], &[env]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shellenv.lock");
        lock.write_to_file(&path).unwrap();
        assert_eq!(LockFile::read_from_file(&path).unwrap(), lock);
    }

    #[test]
    fn lock_integrity_check_passes() {
        let ids = sample_lock().verify_integrity().unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn lock_integrity_fails_on_tamper() {
        let mut lock = sample_lock();
        lock.environments[0].resolved.library_path[0] = "/tmp/evil".to_owned();
        let err = lock.verify_integrity().unwrap_err();
        assert!(matches!(err, LockError::EnvIdMismatch { platform, .. } if platform == "x86_64-linux"));
    }

    #[test]
    fn lock_integrity_fails_when_lib_dir_moves_into_channel() {
        let mut lock = sample_lock();
        let pkg = &mut lock.environments[0].resolved.packages[0];
        pkg.channel = Channel::Custom(format!("stablelib:{}", pkg.lib_dir.take().unwrap()));
        assert!(matches!(
            lock.verify_integrity(),
            Err(LockError::EnvIdMismatch { .. })
        ));
    }

    #[test]
    fn lock_rejects_duplicate_platforms() {
        let lock = LockFile::from_resolved(
            &sample_sources(),
            &[sample_env("x86_64-linux"), sample_env("x86_64-linux")],
        );
        assert!(matches!(
            lock.verify_integrity(),
            Err(LockError::DuplicatePlatform(_))
        ));
    }

    #[test]
    fn lock_rejects_unknown_version() {
        let mut lock = sample_lock();
        lock.lock_version = 9;
        assert!(matches!(
            lock.verify_integrity(),
            Err(LockError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn source_order_is_verified() {
        let lock = sample_lock();
        assert!(lock.verify_sources(&sample_sources()).is_ok());

        let mut reordered = sample_sources();
        reordered.reverse();
        assert!(matches!(
            lock.verify_sources(&reordered),
            Err(LockError::SourceDrift(_))
        ));
    }

    #[test]
    fn environment_lookup_by_platform() {
        let lock = sample_lock();
        assert!(lock.environment("aarch64-linux").is_some());
        assert!(lock.environment("x86_64-darwin").is_none());
    }
}
