//! Resolution pipeline for shellenv.
//!
//! Platform Resolver → Input Merger → Shell Environment Builder. Each stage is
//! a pure function of its inputs; the [`Engine`] wires them together and
//! resolves several platforms in parallel.

pub mod builder;
pub mod engine;
pub mod merge;
pub mod resolver;

pub use builder::{export_statement, shell_quote, ShellEnvBuilder};
pub use engine::{Engine, InheritedEnv};
pub use merge::{apply_overlay, merge, merge_packages, PackageSet};
pub use resolver::PlatformResolver;

use shellenv_schema::OverlayAction;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported platform '{platform}' (supported: {})", .supported.join(", "))]
    UnsupportedPlatform {
        platform: String,
        supported: Vec<String>,
    },
    #[error(
        "conflicting overlays in source '{source_name}' for package '{package}': \
         '{first_overlay}' declares {first}, '{second_overlay}' declares {second}"
    )]
    ConflictingOverlay {
        source_name: String,
        package: String,
        first_overlay: String,
        first: OverlayAction,
        second_overlay: String,
        second: OverlayAction,
    },
    #[error("source error: {0}")]
    Source(#[from] shellenv_schema::SourceError),
    #[error("platform table error: {0}")]
    PlatformTable(#[from] shellenv_schema::PlatformTableError),
    #[error("lock error: {0}")]
    Lock(#[from] shellenv_schema::LockError),
}

impl CoreError {
    /// Stable name of the failure class, used in CLI messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedPlatform { .. } => "UnsupportedPlatform",
            Self::ConflictingOverlay { .. } => "ConflictingOverlay",
            Self::Source(_) => "SourceError",
            Self::PlatformTable(_) => "PlatformTableError",
            Self::Lock(_) => "LockError",
        }
    }
}
