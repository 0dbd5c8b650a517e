use crate::CoreError;
use shellenv_schema::{PlatformPackageSet, PlatformTable};

/// Maps a platform id to the package catalog available for it.
#[derive(Debug, Clone, Copy)]
pub struct PlatformResolver<'a> {
    table: &'a PlatformTable,
}

impl<'a> PlatformResolver<'a> {
    pub fn new(table: &'a PlatformTable) -> Self {
        Self { table }
    }

    /// Look up `platform` in the table. Ids outside the table fail with
    /// [`CoreError::UnsupportedPlatform`].
    pub fn resolve(&self, platform: &str) -> Result<&'a PlatformPackageSet, CoreError> {
        self.table
            .get(platform.trim())
            .ok_or_else(|| CoreError::UnsupportedPlatform {
                platform: platform.to_owned(),
                supported: self.table.ids().map(ToString::to_string).collect(),
            })
    }
}
