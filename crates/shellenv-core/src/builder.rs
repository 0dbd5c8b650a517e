use shellenv_schema::{PlatformId, PlatformPackageSet, ResolvedEnvironment, ResolvedPackage};

/// Quote `value` for a POSIX shell using single quotes.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// `export VAR='value'`
pub fn export_statement(var: &str, value: &str) -> String {
    format!("export {var}={}", shell_quote(value))
}

/// Turns a merged package list into a concrete shell environment.
#[derive(Debug, Clone)]
pub struct ShellEnvBuilder {
    platform: PlatformId,
    library_path_var: String,
}

impl ShellEnvBuilder {
    pub fn new(platform: impl Into<PlatformId>, library_path_var: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            library_path_var: library_path_var.into(),
        }
    }

    pub fn for_platform(set: &PlatformPackageSet) -> Self {
        Self::new(set.platform.clone(), set.library_path_var.clone())
    }

    /// Build the environment record.
    ///
    /// The library path is the inherited value, kept in front, followed by one
    /// directory per package that ships a library, in package order. Empty
    /// entries are dropped. Exactly one init statement exports the result.
    pub fn build(
        &self,
        packages: Vec<ResolvedPackage>,
        existing_library_path: Option<&str>,
    ) -> ResolvedEnvironment {
        let inherited = existing_library_path
            .into_iter()
            .flat_map(|v| v.split(':'))
            .map(str::to_owned);
        let contributed = packages.iter().filter_map(|p| p.lib_dir.clone());

        let library_path: Vec<String> = inherited
            .chain(contributed)
            .filter(|entry| !entry.is_empty())
            .collect();

        let init_statements = vec![export_statement(
            &self.library_path_var,
            &library_path.join(":"),
        )];

        ResolvedEnvironment {
            platform: self.platform.clone(),
            library_path_var: self.library_path_var.clone(),
            library_path,
            init_statements,
            packages,
        }
    }
}
