use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{env, fs, path};

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "redis_addr_default")]
    pub redis_addr: String,
    #[serde(default = "cache_ttl_secs_default")]
    pub cache_ttl_secs: u64,
    #[serde(default = "log_level_default")]
    pub log_level: String,
    /// Requests never time out when unset.
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_addr: redis_addr_default(),
            cache_ttl_secs: cache_ttl_secs_default(),
            log_level: log_level_default(),
            http_timeout_secs: None,
        }
    }
}

impl Config {
    fn get_config_dir() -> anyhow::Result<path::PathBuf> {
        let config_dir = if let Ok(xdg_path) = env::var("XDG_CONFIG_HOME") {
            path::PathBuf::from(&xdg_path)
        } else {
            let home = env::var("HOME").with_context(|| "neither XDG_CONFIG_HOME nor HOME is set")?;
            path::Path::new(&home).join(".config")
        };

        Ok(config_dir.join("page_cache"))
    }

    /// Read the config from `PAGE_CACHE_CFG_PATH` or the default config directory, then apply
    /// the `REDIS_ADDR` override. A missing file in the config directory means all defaults.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = if let Ok(cfg_path) = env::var("PAGE_CACHE_CFG_PATH") {
            Self::from_explicit_path(path::Path::new(&cfg_path))?
        } else {
            let file_path = Self::get_config_dir()
                .with_context(|| "fail to locate config directory")?
                .join("config.toml");
            Self::from_file(&file_path)?
        };

        if let Ok(addr) = env::var("REDIS_ADDR") {
            config.redis_addr = addr;
        }

        Ok(config)
    }

    /// Like [`Self::from_file`], but a path the user asked for has to exist.
    pub fn from_explicit_path(file_path: &path::Path) -> anyhow::Result<Self> {
        if !file_path.exists() {
            anyhow::bail!("Config file not found in {file_path:?}");
        }

        Self::from_file(file_path)
    }

    pub fn from_file(file_path: &path::Path) -> anyhow::Result<Self> {
        if !file_path.exists() {
            tracing::debug!("no config file in {file_path:?}, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(file_path)
            .with_context(|| format!("fail to read config file {file_path:?}"))?;
        let config: Self =
            toml::from_str(&content).with_context(|| "fail to parse config from toml")?;

        if config.cache_ttl_secs == 0 {
            anyhow::bail!("cache_ttl_secs must be at least 1");
        }

        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }

    pub fn log_level(&self) -> anyhow::Result<tracing::Level> {
        self.log_level
            .parse()
            .with_context(|| format!("invalid log level `{}`", self.log_level))
    }
}

fn redis_addr_default() -> String {
    "redis://localhost:6379".to_string()
}

fn cache_ttl_secs_default() -> u64 {
    10
}

fn log_level_default() -> String {
    "INFO".to_string()
}

#[test]
fn validate_file_correctness() {
    let dir = tempfile::tempdir().unwrap();
    let config = r#"
        redis_addr = "redis://cache.internal:6380"
        cache_ttl_secs = 30
        log_level = "DEBUG"
        http_timeout_secs = 5
    "#;
    let path = dir.path().join("config.toml");
    fs::write(&path, config).unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.redis_addr, "redis://cache.internal:6380");
    assert_eq!(config.cache_ttl(), Duration::from_secs(30));
    assert_eq!(config.log_level().unwrap(), tracing::Level::DEBUG);
    assert_eq!(config.http_timeout(), Some(Duration::from_secs(5)));
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "log_level = \"WARN\"\n").unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.redis_addr, "redis://localhost:6379");
    assert_eq!(config.cache_ttl(), Duration::from_secs(10));
    assert_eq!(config.http_timeout(), None);

    let missing = Config::from_file(&dir.path().join("nope.toml")).unwrap();
    assert_eq!(missing, Config::default());
}

#[test]
fn reject_bad_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    fs::write(&path, "cache_ttl_secs = 0\n").unwrap();
    assert!(Config::from_file(&path).is_err());

    fs::write(&path, "log_level = \"LOUD\"\n").unwrap();
    assert!(Config::from_file(&path).unwrap().log_level().is_err());
}

#[test]
fn explicit_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    assert!(Config::from_explicit_path(&path).is_err());

    fs::write(&path, "cache_ttl_secs = 20\n").unwrap();
    let config = Config::from_explicit_path(&path).unwrap();
    assert_eq!(config.cache_ttl(), Duration::from_secs(20));
}
