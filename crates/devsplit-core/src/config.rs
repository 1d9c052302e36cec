use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::path::DEFAULT_ROOT_LABEL;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Synthetic first segment shared by every canonical path.
    pub root_label: String,
    pub path_column: String,
    pub type_column: Option<String>,
    pub state_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_label: DEFAULT_ROOT_LABEL.to_string(),
            path_column: "path".to_string(),
            type_column: None,
            state_path: "devsplit_state.json".to_string(),
        }
    }
}

/// Load `Config.*` from the working directory (optional), then apply
/// `DEVSPLIT_*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, Error> {
    let config = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("DEVSPLIT"))
        .build()?;
    from_config(config)
}

pub fn from_config(config: Config) -> Result<AppConfig, Error> {
    Ok(config.try_deserialize::<AppConfig>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_empty_sources_yield_defaults() {
        let config = Config::builder().build().unwrap();
        let app: AppConfig = config.try_deserialize().unwrap();
        assert_eq!(app, AppConfig::default());
        assert_eq!(app.root_label, "root");
        assert!(app.type_column.is_none());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::builder()
            .add_source(ConfigFile::from_str(
                "path_column = \"Point Path\"\ntype_column = \"Kind\"",
                FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let app: AppConfig = config.try_deserialize().unwrap();
        assert_eq!(app.path_column, "Point Path");
        assert_eq!(app.type_column.as_deref(), Some("Kind"));
        assert_eq!(app.state_path, "devsplit_state.json");
    }

    #[test]
    fn test_mistyped_value_is_a_config_error() {
        let config = Config::builder()
            .add_source(ConfigFile::from_str("type_column = [1, 2]", FileFormat::Toml))
            .build()
            .unwrap();
        assert!(matches!(from_config(config), Err(Error::Config(_))));
    }
}
