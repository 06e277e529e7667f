use csspress_restructure::{RestructureOptions, Usage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "csspress.config.json";

/// csspress configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Run the structural passes, not only at-rule consolidation
    #[serde(default = "default_restructure")]
    pub restructure: bool,

    /// Group every `@media` with the same prelude at the end of the sheet
    #[serde(default)]
    pub force_media_merge: bool,

    /// Class usage scopes
    #[serde(default)]
    pub usage: Option<Usage>,

    /// Output directory; minified files land next to their sources when unset
    #[serde(default)]
    pub out_dir: Option<String>,
}

fn default_restructure() -> bool {
    true
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn restructure_options(&self) -> RestructureOptions {
        RestructureOptions {
            restructure: self.restructure,
            force_media_merge: self.force_media_merge,
            usage: self.usage.clone(),
        }
    }

    /// Absolute output directory, if one is configured
    pub fn get_out_dir(&self, cwd: &str) -> Option<PathBuf> {
        self.out_dir.as_ref().map(|dir| PathBuf::from(cwd).join(dir))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            restructure: default_restructure(),
            force_media_merge: false,
            usage: None,
            out_dir: None,
        }
    }
}

/// Read a usage file: `{"scopes": [["a", "b"], ["c"]]}`
pub fn load_usage(path: &Path) -> anyhow::Result<Usage> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
