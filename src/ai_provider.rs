use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// 外部分類モデルの呼び出し方法
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AiProvider {
    /// Anthropic Messages API（HTTP）
    #[default]
    Anthropic,
    /// ローカルの `claude` コマンド
    ClaudeCli,
}

impl AiProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            AiProvider::Anthropic => "anthropic",
            AiProvider::ClaudeCli => "claude-cli",
        }
    }

    /// APIキーが必要か
    pub fn requires_api_key(&self) -> bool {
        matches!(self, AiProvider::Anthropic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names_match_cli_names() {
        let json = serde_json::to_string(&AiProvider::ClaudeCli).unwrap();
        assert_eq!(json, "\"claude-cli\"");
        let parsed = AiProvider::from_str("claude-cli", true).unwrap();
        assert_eq!(parsed, AiProvider::ClaudeCli);
        assert_eq!(parsed.display_name(), "claude-cli");
    }
}
