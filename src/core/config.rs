use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let user_data_dir = discover_user_data_dir();
        let log_dir = user_data_dir.join("logs");
        let db_path = user_data_dir.join("fsrag.db");
        let config_path = user_data_dir.join("config.toml");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            user_data_dir,
            log_dir,
            db_path,
            config_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_user_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("FSRAG_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string()));
        return PathBuf::from(base).join("fsrag");
    }

    if cfg!(target_os = "macos") {
        return home_dir()
            .join("Library")
            .join("Application Support")
            .join("fsrag");
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("fsrag")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// AI gateway settings. The key is never read from the config file so it
/// cannot end up in plaintext on disk; `LLM_API_KEY` is the only source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ai.gateway.lovable.dev".to_string(),
            model: "google/gemini-3-flash-preview".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveDataConfig {
    /// Base URL of the aggregation endpoints the fetchers call. Defaults to
    /// this server's own API so the crate is self-contained.
    pub base_url: String,
    /// Timeout for one upstream provider call, in seconds.
    pub upstream_timeout_secs: u64,
}

impl Default for LiveDataConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787/api".to_string(),
            upstream_timeout_secs: 5,
        }
    }
}

/// Fallback values used when the spot-price or FX upstream is unreachable.
/// Explicit configuration rather than module globals so tests can override
/// them per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldConfig {
    pub fallback_price_usd_per_oz: f64,
    pub fallback_usd_to_inr: f64,
}

impl Default for GoldConfig {
    fn default() -> Self {
        Self {
            fallback_price_usd_per_oz: 2650.0,
            fallback_usd_to_inr: 83.5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub live_data: LiveDataConfig,
    pub gold: GoldConfig,
}

impl AppConfig {
    /// Loads the optional config file, then applies environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)?;
            toml::from_str(&raw)?
        } else {
            AppConfig::default()
        };

        if let Ok(url) = env::var("LLM_GATEWAY_URL") {
            config.gateway.base_url = url;
        }
        if let Ok(model) = env::var("LLM_MODEL") {
            config.gateway.model = model;
        }
        if let Ok(key) = env::var("LLM_API_KEY") {
            if !key.is_empty() {
                config.gateway.api_key = Some(key);
            }
        }
        if let Ok(url) = env::var("LIVE_DATA_URL") {
            config.live_data.base_url = url;
        }

        config.gateway.base_url = config.gateway.base_url.trim_end_matches('/').to_string();
        config.live_data.base_url = config.live_data.base_url.trim_end_matches('/').to_string();

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_file_missing() {
        let config = AppConfig::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.gold.fallback_usd_to_inr, 83.5);
        assert_eq!(config.live_data.upstream_timeout_secs, 5);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[gateway]\nbase_url = \"http://localhost:9999/\"\n\n[gold]\nfallback_usd_to_inr = 80.0"
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        // trailing slash trimmed
        assert_eq!(config.gateway.base_url, "http://localhost:9999");
        assert_eq!(config.gold.fallback_usd_to_inr, 80.0);
        // untouched section keeps defaults
        assert_eq!(config.gold.fallback_price_usd_per_oz, 2650.0);
    }
}
