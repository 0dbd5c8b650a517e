//! Source documents, platform tables, lock files, and environment identity for shellenv.
//!
//! This crate defines the schema layer: TOML source-document parsing
//! (`SourceDocumentV1`), validated sources (`EnvironmentSource`), the injectable
//! platform table (`PlatformTable`), the resolved environment record and its
//! deterministic identity (`compute_env_id`), lock file generation/verification
//! (`LockFile`), and built-in starter templates.

pub mod environment;
pub mod identity;
pub mod lock;
pub mod normalize;
pub mod platform;
pub mod source;
pub mod template;
pub mod types;

pub use environment::{ResolvedEnvironment, ResolvedPackage};
pub use identity::{compute_env_id, EnvIdentity};
pub use lock::{LockError, LockFile, LockedEnvironment, LOCK_VERSION};
pub use normalize::{load_sources, EnvironmentSource, Overlay, OverlayAction, PackageRef};
pub use platform::{
    default_library_path_var, default_table_path, Arch, CatalogEntry, Os, Platform,
    PlatformPackageSet, PlatformTable, PlatformTableError, BUILTIN_PLATFORM_TABLE,
};
pub use source::{
    parse_source_file, parse_source_str, OverlaySection, PackageDecl, PackageTable,
    SourceDocumentV1, SourceError, SourceSection,
};
pub use template::{get_template, list_templates, Template, BUILTIN_TEMPLATES};
pub use types::{Channel, EnvId, PackageName, PlatformId, ShortId, SourceName};
