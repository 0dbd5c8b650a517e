use shellenv_core::{merge, merge_packages, CoreError, Engine, InheritedEnv, ShellEnvBuilder};
use shellenv_schema::{
    load_sources, CatalogEntry, Channel, EnvironmentSource, Overlay, PlatformPackageSet,
    PlatformTable,
};
use std::fs;
use std::path::{Path, PathBuf};

fn write_source(dir: &Path, file: &str, content: &str) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, content).unwrap();
    path
}

fn toolchain_document() -> &'static str {
    r#"
source_version = 1

[[source]]
name = "toolchain"
packages = ["openssl", "pkg-config", { name = "rust", channel = "stable" }]

[[source]]
name = "nightly"

[[source.overlay]]
name = "rust-overlay"
channels = { rust = "nightly" }
"#
}

fn abc_table() -> PlatformTable {
    PlatformTable::default().with_platform(
        PlatformPackageSet::new("x86_64-linux").with_package(
            "abc",
            CatalogEntry {
                lib: Some("/nix/store/abc/lib".to_owned()),
                ..CatalogEntry::default()
            },
        ),
    )
}

// Determinism: same inputs give byte-identical records.
#[test]
fn resolution_is_deterministic() {
    let project = tempfile::tempdir().unwrap();
    let path = write_source(project.path(), "shellenv.toml", toolchain_document());
    let engine = Engine::with_builtin_table().unwrap();

    let first = engine
        .resolve(&load_sources(&[&path]).unwrap(), "x86_64-linux", Some("/opt/lib"))
        .unwrap();
    let second = engine
        .resolve(&load_sources(&[&path]).unwrap(), "x86_64-linux", Some("/opt/lib"))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.identity(), second.identity());
}

// Determinism holds under parallel multi-platform resolution too.
#[test]
fn parallel_resolution_matches_sequential() {
    let project = tempfile::tempdir().unwrap();
    let path = write_source(project.path(), "shellenv.toml", toolchain_document());
    let sources = load_sources(&[&path]).unwrap();
    let engine = Engine::with_builtin_table().unwrap();
    let platforms: Vec<String> = engine.table().ids().map(ToString::to_string).collect();

    let parallel = engine
        .resolve_all(&sources, &platforms, &InheritedEnv::new())
        .unwrap();
    let sequential: Vec<_> = platforms
        .iter()
        .map(|p| engine.resolve(&sources, p, None).unwrap())
        .collect();

    assert_eq!(parallel, sequential);
}

// Override order: later source wins, in either direction.
#[test]
fn override_order_between_sources() {
    let a = EnvironmentSource::new("A").with_package("x", Channel::Stable);
    let b = EnvironmentSource::new("B").with_package("x", Channel::Nightly);

    let ab = merge_packages(&[a.clone(), b.clone()]).unwrap();
    assert_eq!(ab.len(), 1);
    assert_eq!(ab[0].name, "x");
    assert_eq!(ab[0].channel, Channel::Nightly);

    let ba = merge_packages(&[b, a]).unwrap();
    assert_eq!(ba.len(), 1);
    assert_eq!(ba[0].channel, Channel::Stable);
}

// Library path prefix preservation through the whole pipeline.
#[test]
fn existing_library_path_is_preserved_as_prefix() {
    let engine = Engine::new(abc_table());
    let sources = [EnvironmentSource::new("base").with_package("abc", Channel::Stable)];

    let env = engine
        .resolve(&sources, "x86_64-linux", Some("/opt/lib"))
        .unwrap();

    assert_eq!(env.library_path_string(), "/opt/lib:/nix/store/abc/lib");
    assert_eq!(env.init_statements.len(), 1);
    assert!(env.init_statements[0].contains("/opt/lib:/nix/store/abc/lib"));
}

// Empty input on every supported platform.
#[test]
fn empty_sources_on_every_platform() {
    let table = PlatformTable::builtin().unwrap();
    for set in table.iter() {
        assert!(merge(&[], set).unwrap().is_empty());
        let env = ShellEnvBuilder::for_platform(set).build(Vec::new(), None);
        assert_eq!(env.library_path_string(), "");
        assert_eq!(env.init_statements.len(), 1);
    }
}

// Unsupported platform fails with no partial environment.
#[test]
fn unsupported_platform_is_rejected() {
    let engine = Engine::with_builtin_table().unwrap();
    let sources = [EnvironmentSource::new("base").with_package("openssl", Channel::Stable)];

    let result = engine.resolve(&sources, "plan9-sparc", None);
    match result {
        Err(CoreError::UnsupportedPlatform { platform, .. }) => {
            assert_eq!(platform, "plan9-sparc");
        }
        other => panic!("expected UnsupportedPlatform, got {other:?}"),
    }
}

// Same-source overlay conflict names the package and both channels.
#[test]
fn same_source_conflict_is_reported() {
    let project = tempfile::tempdir().unwrap();
    let path = write_source(
        project.path(),
        "conflict.toml",
        r#"
source_version = 1

[[source]]
name = "toolchain"

[[source.overlay]]
name = "stable-pin"
channels = { x = "stable" }

[[source.overlay]]
name = "nightly-bump"
channels = { x = "nightly" }
"#,
    );
    let sources = load_sources(&[&path]).unwrap();
    let engine = Engine::with_builtin_table().unwrap();

    let err = engine.resolve(&sources, "x86_64-linux", None).unwrap_err();
    assert_eq!(err.kind(), "ConflictingOverlay");
    let msg = err.to_string();
    assert!(msg.contains("'x'"), "message must name the package: {msg}");
    assert!(msg.contains("stable"), "message must name stable: {msg}");
    assert!(msg.contains("nightly"), "message must name nightly: {msg}");
}

// Overlay from one file, packages from another, merged across files.
#[test]
fn sources_from_multiple_files_merge_in_order() {
    let project = tempfile::tempdir().unwrap();
    let base = write_source(
        project.path(),
        "base.toml",
        r#"
source_version = 1
[[source]]
name = "base"
packages = ["rust", "zlib"]
"#,
    );
    let nightly = write_source(
        project.path(),
        "nightly.toml",
        r#"
source_version = 1
[[source]]
name = "nightly"
[[source.overlay]]
name = "rust-overlay"
channels = { rust = "nightly" }
"#,
    );

    let engine = Engine::with_builtin_table().unwrap();
    let env = engine
        .resolve(
            &load_sources(&[&base, &nightly]).unwrap(),
            "aarch64-linux",
            None,
        )
        .unwrap();

    assert_eq!(env.packages[0].channel, Channel::Nightly);
    assert_eq!(
        env.library_path,
        vec![
            "/nix/store/aarch64-linux/rust-nightly/lib",
            "/nix/store/aarch64-linux/zlib-1.3.1/lib",
        ]
    );
    assert_eq!(
        env.init_statements,
        vec![
            "export LD_LIBRARY_PATH='/nix/store/aarch64-linux/rust-nightly/lib:/nix/store/aarch64-linux/zlib-1.3.1/lib'"
        ]
    );

    let reversed = engine
        .resolve(
            &load_sources(&[&nightly, &base]).unwrap(),
            "aarch64-linux",
            None,
        )
        .unwrap();
    assert_eq!(reversed.packages[0].channel, Channel::Stable);
}

// Lock file written to disk verifies cleanly against the same inputs.
#[test]
fn lock_file_survives_disk_roundtrip() {
    let project = tempfile::tempdir().unwrap();
    let path = write_source(project.path(), "shellenv.toml", toolchain_document());
    let sources = load_sources(&[&path]).unwrap();
    let engine = Engine::with_builtin_table().unwrap();

    let (_, lock) = engine
        .lock(
            &sources,
            &["x86_64-linux", "aarch64-darwin"],
            &InheritedEnv::new(),
        )
        .unwrap();
    let lock_path = project.path().join("shellenv.lock");
    lock.write_to_file(&lock_path).unwrap();

    let loaded = shellenv_schema::LockFile::read_from_file(&lock_path).unwrap();
    assert_eq!(loaded, lock);
    let drifted = engine
        .verify_lock(&loaded, &sources, &InheritedEnv::new())
        .unwrap();
    assert!(drifted.is_empty());
}

#[test]
fn overlay_removal_drops_library_dir() {
    let engine = Engine::with_builtin_table().unwrap();
    let sources = [
        EnvironmentSource::new("base")
            .with_package("openssl", Channel::Stable)
            .with_package("zlib", Channel::Stable),
        EnvironmentSource::new("slim").with_overlay(Overlay::new("no-zlib").remove("zlib")),
    ];
    let env = engine.resolve(&sources, "x86_64-linux", None).unwrap();
    assert_eq!(
        env.library_path,
        vec!["/nix/store/x86_64-linux/openssl-3.0.13/lib"]
    );
}
