use crate::identity::{compute_env_id, EnvIdentity};
use crate::types::{Channel, PackageName, PlatformId};
use serde::{Deserialize, Serialize};

/// A merged package bound to the library artifact it provides on a platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResolvedPackage {
    pub name: PackageName,
    pub channel: Channel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lib_dir: Option<String>,
}

/// Final, immutable description of a ready-to-use shell session for one platform.
///
/// `packages` stays last so the TOML lock file can nest it as an array of
/// tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedEnvironment {
    pub platform: PlatformId,
    pub library_path_var: String,
    pub library_path: Vec<String>,
    pub init_statements: Vec<String>,
    pub packages: Vec<ResolvedPackage>,
}

impl ResolvedEnvironment {
    /// The library search path as a colon-joined list.
    pub fn library_path_string(&self) -> String {
        self.library_path.join(":")
    }

    pub fn identity(&self) -> EnvIdentity {
        compute_env_id(self)
    }
}
