use serde::Serialize;

/// A starter source document shipped with the binary.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    pub description: &'static str,
    pub document: &'static str,
}

pub const BUILTIN_TEMPLATES: &[Template] = &[
    Template {
        name: "minimal",
        description: "Empty environment with no packages",
        document: r#"source_version = 1

[[source]]
name = "base"
packages = []
"#,
    },
    Template {
        name: "rust-stable",
        description: "Rust toolchain on the stable channel with openssl and pkg-config",
        document: r#"source_version = 1

[[source]]
name = "toolchain"
packages = [{ name = "rust", channel = "stable" }, "openssl", "pkg-config"]
"#,
    },
    Template {
        name: "rust-nightly",
        description: "Rust toolchain switched to nightly through an overlay",
        document: r#"source_version = 1

[[source]]
name = "toolchain"
packages = ["openssl", "pkg-config"]

[[source.overlay]]
name = "rust-overlay"
channels = { rust = "nightly" }
"#,
    },
];

pub fn get_template(name: &str) -> Option<&'static Template> {
    BUILTIN_TEMPLATES.iter().find(|t| t.name == name)
}

pub fn list_templates() -> &'static [Template] {
    BUILTIN_TEMPLATES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_templates_normalize() {
        for template in BUILTIN_TEMPLATES {
            let result = crate::parse_source_str(template.document).and_then(|d| d.normalize());
            assert!(
                result.is_ok(),
                "template '{}' failed to load: {:?}",
                template.name,
                result.err()
            );
        }
    }

    #[test]
    fn get_template_by_name() {
        assert!(get_template("rust-nightly").is_some());
        assert!(get_template("nonexistent").is_none());
    }

    #[test]
    fn all_templates_have_unique_names() {
        let mut names: Vec<&str> = BUILTIN_TEMPLATES.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BUILTIN_TEMPLATES.len());
    }
}
