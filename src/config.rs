use crate::error::{ScanError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://api.chavnapantry.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub auth_token: Option<String>,
    /// 送信前の最大幅（px）。0なら縮小しない
    pub max_width: u32,
    pub jpeg_quality: u8,
    pub max_upload_mb: f64,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            auth_token: None,
            max_width: 1024,
            jpeg_quality: 70,
            max_upload_mb: 7.0,
            timeout_seconds: 60,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ScanError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("pantry-scan").join("config.json"))
    }

    /// APIのベースURL（環境変数優先、末尾の / は除去）
    pub fn api_url(&self) -> String {
        let url = std::env::var("PANTRY_API_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.api_url.clone());
        normalize_api_url(&url)
    }

    pub fn get_token(&self) -> Result<String> {
        // 環境変数を優先
        if let Ok(token) = std::env::var("PANTRY_TOKEN") {
            if !token.trim().is_empty() {
                return Ok(token);
            }
        }

        self.auth_token.clone().ok_or(ScanError::MissingToken)
    }

    pub fn set_token(&mut self, token: String) -> Result<()> {
        self.auth_token = Some(token);
        self.save()
    }

    pub fn set_api_url(&mut self, url: String) -> Result<()> {
        self.api_url = normalize_api_url(&url);
        self.save()
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb * 1024.0 * 1024.0) as usize
    }
}

pub fn normalize_api_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
