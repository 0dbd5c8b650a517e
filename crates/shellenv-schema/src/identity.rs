use crate::environment::ResolvedEnvironment;
use crate::types::{EnvId, ShortId};
use serde::Serialize;

/// Deterministic identity of a resolved environment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EnvIdentity {
    pub env_id: EnvId,
    pub short_id: ShortId,
}

/// Feed one tagged, length-prefixed field into the hasher so that no two
/// field sequences share an encoding.
fn update_field(hasher: &mut blake3::Hasher, tag: &[u8], value: &str) {
    hasher.update(tag);
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn update_count(hasher: &mut blake3::Hasher, tag: &[u8], count: usize) {
    hasher.update(tag);
    hasher.update(&(count as u64).to_le_bytes());
}

/// Hash every field that reaches the shell, in a fixed order.
///
/// Two environments share an identity exactly when they would produce the
/// same session: same platform, same packages on the same channels, same
/// library path and the same init statements.
pub fn compute_env_id(env: &ResolvedEnvironment) -> EnvIdentity {
    let mut hasher = blake3::Hasher::new();

    update_field(&mut hasher, b"platform", &env.platform);
    update_field(&mut hasher, b"var", &env.library_path_var);

    update_count(&mut hasher, b"packages", env.packages.len());
    for pkg in &env.packages {
        update_field(&mut hasher, b"pkg", &pkg.name);
        update_field(&mut hasher, b"channel", pkg.channel.as_str());
        match &pkg.lib_dir {
            Some(dir) => update_field(&mut hasher, b"lib", dir),
            None => {
                hasher.update(b"nolib");
            }
        }
    }

    update_count(&mut hasher, b"path", env.library_path.len());
    for entry in &env.library_path {
        update_field(&mut hasher, b"entry", entry);
    }

    update_count(&mut hasher, b"init", env.init_statements.len());
    for stmt in &env.init_statements {
        update_field(&mut hasher, b"stmt", stmt);
    }

    let hex = hasher.finalize().to_hex().to_string();
    let short = hex[..12].to_owned();

    EnvIdentity {
        env_id: EnvId::new(hex),
        short_id: ShortId::new(short),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::ResolvedPackage;
    use crate::types::{Channel, PackageName, PlatformId};

    fn env_with(channel: Channel) -> ResolvedEnvironment {
        ResolvedEnvironment {
            platform: PlatformId::new("x86_64-linux"),
            library_path_var: "LD_LIBRARY_PATH".to_owned(),
            library_path: vec!["/nix/store/rust/lib".to_owned()],
            init_statements: vec!["export LD_LIBRARY_PATH='/nix/store/rust/lib'".to_owned()],
            packages: vec![ResolvedPackage {
                name: PackageName::new("rust"),
                channel,
                lib_dir: Some("/nix/store/rust/lib".to_owned()),
            }],
        }
    }

    #[test]
    fn stable_id_for_identical_environments() {
        assert_eq!(
            compute_env_id(&env_with(Channel::Stable)),
            compute_env_id(&env_with(Channel::Stable))
        );
    }

    #[test]
    fn channel_change_changes_id() {
        assert_ne!(
            compute_env_id(&env_with(Channel::Stable)),
            compute_env_id(&env_with(Channel::Nightly))
        );
    }

    #[test]
    fn platform_change_changes_id() {
        let a = env_with(Channel::Stable);
        let mut b = a.clone();
        b.platform = PlatformId::new("aarch64-linux");
        assert_ne!(compute_env_id(&a), compute_env_id(&b));
    }

    #[test]
    fn field_boundaries_cannot_be_shifted() {
        let mut a = env_with(Channel::Stable);
        a.packages[0].lib_dir = Some("/d".to_owned());
        let mut b = a.clone();
        b.packages[0].channel = Channel::Custom("stablelib:/d".to_owned());
        b.packages[0].lib_dir = None;
        assert_ne!(compute_env_id(&a), compute_env_id(&b));
    }

    #[test]
    fn path_entries_are_not_concatenated() {
        let mut a = env_with(Channel::Stable);
        a.library_path = vec!["/a".to_owned(), "/b".to_owned()];
        let mut b = a.clone();
        b.library_path = vec!["/a/b".to_owned()];
        assert_ne!(compute_env_id(&a), compute_env_id(&b));
    }

    #[test]
    fn short_id_is_12_chars() {
        let id = compute_env_id(&env_with(Channel::Stable));
        assert_eq!(id.env_id.as_str().len(), 64);
        assert_eq!(id.short_id.as_str().len(), 12);
        assert!(id.env_id.as_str().starts_with(id.short_id.as_str()));
    }
}
