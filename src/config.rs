use anyhow::Result;
use serde::Deserialize;

use crate::session::DEFAULT_FILE_NAME;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Private per-application recordings root
    pub recordings_dir: String,
    /// File name used when the caller does not supply one
    #[serde(default = "default_file_name")]
    pub default_file_name: String,
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_falls_back_to_builtin_default() -> Result<()> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                "[service]\nname = \"voxnote\"\n\n[storage]\nrecordings_dir = \"recordings\"\n",
                config::FileFormat::Toml,
            ))
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        assert_eq!(cfg.storage.default_file_name, DEFAULT_FILE_NAME);

        Ok(())
    }
}
