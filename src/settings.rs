use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoadstatError};

pub const API_URL_ENV: &str = "ROADSTAT_API_URL";
pub const TOKEN_ENV: &str = "ROADSTAT_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_district")]
    pub default_district: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_api_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_district() -> String {
    "Не указан".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            api_url: default_api_url(),
            default_district: default_district(),
            timeout_secs: default_timeout_secs(),
            token: None,
        }
    }
}

impl Settings {
    /// API base URL: explicit flag, then `ROADSTAT_API_URL`, then the settings file.
    pub fn resolve_api_url(&self, flag: Option<&str>) -> String {
        let env = std::env::var(API_URL_ENV).ok();
        pick(flag, env.as_deref(), Some(&self.api_url))
            .unwrap_or_else(default_api_url)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn resolve_token(&self, flag: Option<&str>) -> Result<String> {
        let env = std::env::var(TOKEN_ENV).ok();
        pick(flag, env.as_deref(), self.token.as_deref()).ok_or(RoadstatError::MissingToken)
    }

    pub fn journal_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("roadstat.db")
    }
}

fn pick(flag: Option<&str>, env: Option<&str>, stored: Option<&str>) -> Option<String> {
    [flag, env, stored]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("roadstat")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("roadstat")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("ignoring unreadable settings at {}: {e}", path.display());
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| RoadstatError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "api_url": "https://gibdd.example/api"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.api_url, "https://gibdd.example/api");
        assert_eq!(s.default_district, "Не указан");
        assert_eq!(s.timeout_secs, 30);
        assert!(s.token.is_none());
    }

    #[test]
    fn test_token_not_serialized_when_absent() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert!(!json.contains("token"));
    }

    #[test]
    fn test_pick_prefers_flag_then_env_then_stored() {
        assert_eq!(pick(Some("a"), Some("b"), Some("c")).as_deref(), Some("a"));
        assert_eq!(pick(None, Some("b"), Some("c")).as_deref(), Some("b"));
        assert_eq!(pick(Some("  "), None, Some("c")).as_deref(), Some("c"));
        assert_eq!(pick(None, None, None), None);
    }

    #[test]
    fn test_journal_path_under_data_dir() {
        let s = Settings {
            data_dir: "/tmp/roadstat".to_string(),
            ..Settings::default()
        };
        assert_eq!(s.journal_path(), PathBuf::from("/tmp/roadstat/roadstat.db"));
    }
}
