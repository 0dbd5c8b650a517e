use crate::builder::ShellEnvBuilder;
use crate::merge::merge;
use crate::resolver::PlatformResolver;
use crate::CoreError;
use rayon::prelude::*;
use shellenv_schema::{
    default_table_path, EnvironmentSource, LockFile, PlatformTable, ResolvedEnvironment,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Snapshot of inherited environment variables, keyed by name.
///
/// Callers capture this once from the process environment (or build it by
/// hand in tests); resolution never reads the process environment itself.
pub type InheritedEnv = BTreeMap<String, String>;

/// Resolution pipeline over a fixed platform table.
#[derive(Debug, Clone)]
pub struct Engine {
    table: PlatformTable,
}

impl Engine {
    pub fn new(table: PlatformTable) -> Self {
        Self { table }
    }

    /// Engine over the built-in platform table.
    pub fn with_builtin_table() -> Result<Self, CoreError> {
        Ok(Self::new(PlatformTable::builtin()?))
    }

    /// Load the table from `path` when given; otherwise use the user table at
    /// `~/.config/shellenv/platforms.toml` if present, else the built-in one.
    pub fn from_table_file(path: Option<&Path>) -> Result<Self, CoreError> {
        if let Some(path) = path {
            info!("loading platform table from {}", path.display());
            return Ok(Self::new(PlatformTable::load(path)?));
        }
        if let Some(user) = default_table_path().filter(|p| p.is_file()) {
            info!("loading platform table from {}", user.display());
            return Ok(Self::new(PlatformTable::load(&user)?));
        }
        debug!("using built-in platform table");
        Self::with_builtin_table()
    }

    pub fn table(&self) -> &PlatformTable {
        &self.table
    }

    /// Resolve `sources` for one platform.
    ///
    /// `existing_library_path` is the inherited value of the platform's
    /// library-path variable; it is kept as the prefix of the result.
    pub fn resolve(
        &self,
        sources: &[EnvironmentSource],
        platform: &str,
        existing_library_path: Option<&str>,
    ) -> Result<ResolvedEnvironment, CoreError> {
        let set = PlatformResolver::new(&self.table).resolve(platform)?;
        let packages = merge(sources, set)?;
        debug!(
            platform = %set.platform,
            packages = packages.len(),
            "merged sources"
        );
        let env = ShellEnvBuilder::for_platform(set).build(packages, existing_library_path);
        info!(
            platform = %env.platform,
            short_id = %env.identity().short_id,
            "resolved environment"
        );
        Ok(env)
    }

    /// Resolve `sources` for every platform in `platforms`, in parallel.
    ///
    /// Results come back in request order with duplicates dropped. Any
    /// failure fails the whole call; the error reported is the one for the
    /// earliest failing platform.
    pub fn resolve_all<S: AsRef<str> + Sync>(
        &self,
        sources: &[EnvironmentSource],
        platforms: &[S],
        inherited: &InheritedEnv,
    ) -> Result<Vec<ResolvedEnvironment>, CoreError> {
        let mut requested: Vec<&str> = Vec::with_capacity(platforms.len());
        for p in platforms {
            let p = p.as_ref().trim();
            if !requested.contains(&p) {
                requested.push(p);
            }
        }

        let results: Vec<Result<ResolvedEnvironment, CoreError>> = requested
            .par_iter()
            .map(|platform| {
                let existing = PlatformResolver::new(&self.table)
                    .resolve(platform)
                    .ok()
                    .and_then(|set| inherited.get(&set.library_path_var))
                    .map(String::as_str);
                self.resolve(sources, platform, existing)
            })
            .collect();

        results.into_iter().collect()
    }

    /// Resolve every platform and capture the results in a lock file.
    pub fn lock<S: AsRef<str> + Sync>(
        &self,
        sources: &[EnvironmentSource],
        platforms: &[S],
        inherited: &InheritedEnv,
    ) -> Result<(Vec<ResolvedEnvironment>, LockFile), CoreError> {
        let envs = self.resolve_all(sources, platforms, inherited)?;
        let lock = LockFile::from_resolved(sources, &envs);
        Ok((envs, lock))
    }

    /// Re-resolve a lock file's platforms from `sources` and check that
    /// nothing drifted.
    pub fn verify_lock(
        &self,
        lock: &LockFile,
        sources: &[EnvironmentSource],
        inherited: &InheritedEnv,
    ) -> Result<Vec<String>, CoreError> {
        lock.verify_integrity()?;
        lock.verify_sources(sources)?;

        let platforms: Vec<&str> = lock
            .environments
            .iter()
            .map(|e| e.resolved.platform.as_str())
            .collect();
        let fresh = self.resolve_all(sources, &platforms, inherited)?;

        let mut drifted = Vec::new();
        for env in &fresh {
            let matches = lock
                .environment(&env.platform)
                .is_some_and(|locked| locked.resolved == *env);
            if !matches {
                drifted.push(env.platform.to_string());
            }
        }
        Ok(drifted)
    }
}
