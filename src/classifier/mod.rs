//! 外部分類モデル連携モジュール
//!
//! プロンプト文字列を渡して応答テキストを受け取るだけの境界。
//! プロンプト生成と応答の検証は照合エンジン側（catalog_mapper_common）で行う。

mod anthropic;
mod claude_cli;

pub use anthropic::AnthropicClassifier;
pub use claude_cli::ClaudeCliClassifier;

use crate::ai_provider::AiProvider;
use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// 外部分類モデル
///
/// パイプラインでは `Arc<dyn RemoteClassifier>` として保持する。
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    /// ログ表示用の名前
    fn name(&self) -> &str;

    /// プロンプトを送り、応答テキストを返す
    async fn classify(&self, prompt: &str) -> Result<String>;
}

/// 設定から分類モデルを生成
pub fn build_classifier(config: &Config, provider: AiProvider) -> Result<Arc<dyn RemoteClassifier>> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    match provider {
        AiProvider::Anthropic => {
            let api_key = config.get_api_key()?;
            Ok(Arc::new(AnthropicClassifier::new(api_key, config.model.clone(), timeout)?))
        }
        AiProvider::ClaudeCli => Ok(Arc::new(ClaudeCliClassifier::new())),
    }
}
