use super::{json_pretty, EXIT_SUCCESS};
use shellenv_schema::{get_template, list_templates, parse_source_str, Template};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn load_template(name: &str) -> Result<&'static Template, String> {
    let template = get_template(name).ok_or_else(|| {
        let known: Vec<&str> = list_templates().iter().map(|t| t.name).collect();
        format!("unknown template '{name}' (expected: {})", known.join(", "))
    })?;
    parse_source_str(template.document)
        .and_then(|doc| doc.normalize())
        .map_err(|e| format!("template error: {e}"))?;
    Ok(template)
}

fn write_atomic(dest: &Path, content: &str) -> Result<(), String> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| format!("write temp file: {e}"))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| format!("write temp file: {e}"))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| format!("fsync temp file: {e}"))?;
    tmp.persist(dest)
        .map_err(|e| format!("persist source file: {}", e.error))?;
    Ok(())
}

pub fn run(dest: &Path, template: &str, force: bool, json: bool) -> Result<u8, String> {
    if dest.exists() && !force {
        return Err(format!(
            "refusing to overwrite existing {} (pass --force)",
            dest.display()
        ));
    }

    let tpl = load_template(template)?;
    write_atomic(dest, tpl.document)?;

    if json {
        let payload = serde_json::json!({
            "status": "written",
            "path": dest.display().to_string(),
            "template": tpl.name,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("wrote {} from template '{}'", dest.display(), tpl.name);
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_template_to_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("shellenv.toml");
        run(&dest, "rust-nightly", false, true).unwrap();

        let written = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(written, get_template("rust-nightly").unwrap().document);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("shellenv.toml");
        std::fs::write(&dest, "keep me").unwrap();

        let err = run(&dest, "minimal", false, true).unwrap_err();
        assert!(err.contains("--force"));
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "keep me");

        run(&dest, "minimal", true, true).unwrap();
        assert_ne!(std::fs::read_to_string(&dest).unwrap(), "keep me");
    }

    #[test]
    fn unknown_template_lists_known_ones() {
        let err = load_template("nope").unwrap_err();
        assert!(err.contains("minimal"));
        assert!(err.contains("rust-stable"));
    }
}
