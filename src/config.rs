use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = "evalboard.toml";

/// Top-level configuration loaded from evalboard.toml.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct VizConfig {
    pub serve: ServeConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServeConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    /// Decimal places for table cells.
    pub precision: usize,
    /// Per-field length cap when printing samples; 0 means unlimited.
    pub max_field_len: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            precision: 4,
            max_field_len: 0,
        }
    }
}

/// Load config from evalboard.toml in the given directory, or default.
pub fn load_config(dir: &Path) -> VizConfig {
    let path = dir.join(CONFIG_FILE);
    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("failed to parse {}: {e}", path.display());
                VizConfig::default()
            }
        },
        Err(_) => VizConfig::default(),
    }
}
