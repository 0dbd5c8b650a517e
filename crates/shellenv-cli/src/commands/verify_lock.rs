use super::{core_err, inherited_env, json_pretty, make_engine, read_sources, EXIT_SUCCESS};
use shellenv_schema::LockFile;
use std::path::{Path, PathBuf};

pub fn run(
    lock_path: &Path,
    sources: &[PathBuf],
    platforms_file: Option<&PathBuf>,
    inherit: bool,
    json: bool,
) -> Result<u8, String> {
    let lock = LockFile::read_from_file(lock_path).map_err(core_err)?;
    let identities = lock.verify_integrity().map_err(core_err)?;

    // Without sources only the lock's internal consistency can be checked.
    let drifted = if sources.is_empty() {
        Vec::new()
    } else {
        let engine = make_engine(platforms_file)?;
        let loaded = read_sources(sources)?;
        let inherited = inherited_env(&engine, inherit);
        engine
            .verify_lock(&lock, &loaded, &inherited)
            .map_err(core_err)?
    };

    if json {
        let status = if drifted.is_empty() { "ok" } else { "drift" };
        let payload = serde_json::json!({
            "lock": lock_path.display().to_string(),
            "environments": identities,
            "drifted": drifted,
            "status": status,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        for (locked, identity) in lock.environments.iter().zip(&identities) {
            println!("{:<16} {}", locked.resolved.platform.as_str(), identity.short_id);
        }
    }

    if !drifted.is_empty() {
        return Err(format!("lock drift: {}", drifted.join(", ")));
    }
    if !json {
        println!("lock file OK");
    }
    Ok(EXIT_SUCCESS)
}
