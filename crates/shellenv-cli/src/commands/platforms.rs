use super::{json_pretty, make_engine, EXIT_SUCCESS};
use shellenv_schema::PackageName;
use std::path::PathBuf;

pub fn run(platforms_file: Option<&PathBuf>, json: bool) -> Result<u8, String> {
    let engine = make_engine(platforms_file)?;
    let table = engine.table();

    if json {
        let payload: Vec<_> = table
            .iter()
            .map(|set| {
                serde_json::json!({
                    "platform": set.platform,
                    "library_path_var": set.library_path_var,
                    "packages": set.catalog.keys().collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    if table.is_empty() {
        println!("no platforms configured");
        return Ok(EXIT_SUCCESS);
    }
    for set in table.iter() {
        let packages: Vec<&str> = set.catalog.keys().map(PackageName::as_str).collect();
        println!(
            "{:<16} {:<18} {}",
            set.platform.as_str(),
            set.library_path_var,
            packages.join(", ")
        );
    }
    Ok(EXIT_SUCCESS)
}
