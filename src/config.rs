use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

/// Name of the optional configuration file looked up next to a model root.
pub const CONFIG_FILE_NAME: &str = "reqmodel.toml";

/// Name a domain's only subdomain carries unless configured otherwise.
pub const DEFAULT_SUBDOMAIN_SENTINEL: &str = "default";

pub fn default_subdomain_sentinel() -> String {
    DEFAULT_SUBDOMAIN_SENTINEL.to_string()
}

/// Metadata format of an entity file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFormat {
    #[default]
    Json,
    Yaml,
}

impl MetadataFormat {
    pub const ALL: [MetadataFormat; 2] = [MetadataFormat::Json, MetadataFormat::Yaml];

    /// File extensions accepted for this format, preferred one first.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            MetadataFormat::Json => &["json"],
            MetadataFormat::Yaml => &["yaml", "yml"],
        }
    }

    pub fn extension(self) -> &'static str {
        self.extensions()[0]
    }

    pub fn from_extension(ext: &str) -> Option<MetadataFormat> {
        MetadataFormat::ALL
            .into_iter()
            .find(|format| format.extensions().contains(&ext))
    }
}

/// Settings for reading and writing model trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Format used when writing entity files. Reading always accepts every format.
    pub format: MetadataFormat,
    /// Pretty-print written files.
    pub pretty: bool,
    /// Skip directory entries whose name starts with a dot.
    pub skip_hidden: bool,
    /// Name a domain's only subdomain must carry.
    pub subdomain_sentinel: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            format: MetadataFormat::Json,
            pretty: true,
            skip_hidden: true,
            subdomain_sentinel: default_subdomain_sentinel(),
        }
    }
}

impl TreeConfig {
    pub fn from_toml_str(content: &str) -> Result<TreeConfig, ModelError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a config file, falling back to defaults when it does not exist.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<TreeConfig, ModelError> {
        let path = path.as_ref();
        tracing::debug!("[TreeConfig::from_toml_file] Attempting to read config from: {:?}", path);
        if !path.exists() {
            tracing::debug!("[TreeConfig::from_toml_file] Config file not found, using defaults.");
            return Ok(TreeConfig::default());
        }
        let content = read_to_string(path)?;
        TreeConfig::from_toml_str(&content)
    }

    /// Load `reqmodel.toml` from a model root directory, if present.
    pub fn for_root<P: AsRef<Path>>(root: P) -> Result<TreeConfig, ModelError> {
        let path: PathBuf = root.as_ref().join(CONFIG_FILE_NAME);
        TreeConfig::from_toml_file(path)
    }

    pub fn to_toml_string(&self) -> Result<String, ModelError> {
        Ok(toml::to_string(self)?)
    }
}
