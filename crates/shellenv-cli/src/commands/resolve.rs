use super::{
    colorize_channel, core_err, environment_json, inherited_env, json_pretty, make_engine,
    read_sources, requested_platforms, EXIT_SUCCESS,
};
use shellenv_schema::ResolvedEnvironment;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct ResolveArgs<'a> {
    pub platforms: &'a [String],
    pub sources: &'a [PathBuf],
    pub platforms_file: Option<&'a PathBuf>,
    pub inherit: bool,
    pub lock: Option<&'a PathBuf>,
}

/// Library-path variables exported by more than one of `envs`.
fn shared_library_vars(envs: &[ResolvedEnvironment]) -> Vec<&str> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for env in envs {
        *counts.entry(env.library_path_var.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(var, _)| var)
        .collect()
}

pub fn run(args: &ResolveArgs<'_>, json: bool) -> Result<u8, String> {
    let engine = make_engine(args.platforms_file)?;
    let sources = read_sources(args.sources)?;
    let platforms = requested_platforms(args.platforms)?;
    let inherited = inherited_env(&engine, args.inherit);
    debug!(
        sources = sources.len(),
        platforms = ?platforms,
        inherited = inherited.len(),
        "resolving"
    );

    let envs = if let Some(lock_path) = args.lock {
        let (envs, lock) = engine
            .lock(&sources, &platforms, &inherited)
            .map_err(core_err)?;
        lock.write_to_file(lock_path).map_err(core_err)?;
        if !json {
            eprintln!("wrote {}", lock_path.display());
        }
        envs
    } else {
        engine
            .resolve_all(&sources, &platforms, &inherited)
            .map_err(core_err)?
    };

    if json {
        let payload: Vec<_> = envs.iter().map(environment_json).collect();
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    let multi = envs.len() > 1;
    for var in shared_library_vars(&envs) {
        warn!(
            "several platforms export {var}; evaluating this output keeps only the last one \
             (use --json for multi-platform results)"
        );
    }
    for env in &envs {
        if multi {
            println!("# {}", env.platform);
        }
        for stmt in &env.init_statements {
            println!("{stmt}");
        }

        let identity = env.identity();
        eprintln!("{} ({})", env.platform, identity.short_id);
        for pkg in &env.packages {
            match &pkg.lib_dir {
                Some(dir) => eprintln!("  {} {}  {dir}", pkg.name, colorize_channel(&pkg.channel)),
                None => eprintln!("  {} {}", pkg.name, colorize_channel(&pkg.channel)),
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
