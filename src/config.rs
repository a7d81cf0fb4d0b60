use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_store_path")]
    pub store_path: String,
    #[serde(default = "default_scan_root")]
    pub scan_root: String,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub default_depth: usize,
}

fn default_store_path() -> String {
    "dirstat.store".to_string()
}

fn default_scan_root() -> String {
    "/".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            scan_root: default_scan_root(),
            ignore_patterns: Vec::new(),
            default_depth: 0,
        }
    }
}

/// Load `Config.toml` (if present), overridden by `DIRSTAT_*` environment
/// variables. `DIRSTAT_IGNORE_PATTERNS` takes a comma-separated list.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("DIRSTAT")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
