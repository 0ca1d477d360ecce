use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// File looked up in the working directory.
pub const CONFIG_FILE: &str = "scheduler.toml";

/// Prefix of environment overrides, e.g. `SCHED_DATABASE_PATH`.
pub const ENV_PREFIX: &str = "SCHED_";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite file, created on first use.
    pub database_path: String,
    /// Default number of tasks shown by `list`.
    pub list_limit: i64,
    pub cache: CacheMode,
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// In-process mirror in front of the database
    Memory,
    /// Every read goes to the database
    None,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "scheduler.db".to_string(),
            list_limit: 50,
            cache: CacheMode::Memory,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(CONFIG_FILE))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    /// Extracts a config with defaults underneath whatever `figment` provides.
    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(figment)
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_figment(Figment::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.list_limit, 50);
        assert_eq!(config.cache, CacheMode::Memory);
    }

    #[test]
    fn test_toml_overrides_only_given_keys() {
        let toml = r#"
            database_path = "/tmp/tasks.db"
            cache = "none"
        "#;
        let config = Config::from_figment(Figment::new().merge(Toml::string(toml))).unwrap();
        assert_eq!(config.database_path, "/tmp/tasks.db");
        assert_eq!(config.cache, CacheMode::None);
        assert_eq!(config.list_limit, 50);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_unknown_cache_mode_is_rejected() {
        let figment = Figment::new().merge(Toml::string(r#"cache = "redis""#));
        assert!(Config::from_figment(figment).is_err());
    }
}
