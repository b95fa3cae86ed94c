use crate::ai_provider::AiProvider;
use crate::error::{MapperError, Result};
use catalog_mapper_common::MatcherConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub provider: AiProvider,
    pub timeout_seconds: u64,
    /// これ未満の信頼度は要確認
    pub review_threshold: u8,
    /// 直接一致を採用する最低重み
    pub direct_match_floor: f64,
    /// 外部モデルの同時呼び出し数
    pub max_concurrency: usize,
    pub apparel_category: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-sonnet-4-20250514".into(),
            provider: AiProvider::default(),
            timeout_seconds: 30,
            review_threshold: 60,
            direct_match_floor: 70.0,
            max_concurrency: 4,
            apparel_category: "Clothing".into(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 設定ディレクトリ（~/.config/catalog-mapper）
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| MapperError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("catalog-mapper"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 環境変数を優先
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.api_key.clone().ok_or(MapperError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    /// 照合エンジン用の設定
    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            direct_match_floor: self.direct_match_floor,
            apparel_category: self.apparel_category.clone(),
        }
    }
}
