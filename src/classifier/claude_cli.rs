//! Claude CLI連携モジュール
//!
//! `claude -p <prompt> --output-format text` を子プロセスとして実行し、標準出力を応答とする。
//! タイムアウトで future が破棄された場合は子プロセスも終了させる。

use super::RemoteClassifier;
use crate::error::{MapperError, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Claude CLI 経由の分類
#[derive(Debug, Clone)]
pub struct ClaudeCliClassifier {
    program: String,
}

impl ClaudeCliClassifier {
    pub fn new() -> Self {
        Self {
            program: "claude".to_string(),
        }
    }

    /// 実行ファイルを差し替える
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, prompt: &str) -> Command {
        // Windowsではcmd /c経由（改行・引用符はcmdで崩れるため平坦化）
        #[cfg(windows)]
        let command = {
            let flat = prompt.replace('\n', " ").replace('"', "\\\"");
            let mut c = Command::new("cmd");
            c.args(["/c", self.program.as_str(), "-p", flat.as_str(), "--output-format", "text"]);
            c
        };

        #[cfg(not(windows))]
        let command = {
            let mut c = Command::new(&self.program);
            c.args(["-p", prompt, "--output-format", "text"]);
            c
        };

        command
    }
}

impl Default for ClaudeCliClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteClassifier for ClaudeCliClassifier {
    fn name(&self) -> &str {
        "claude-cli"
    }

    async fn classify(&self, prompt: &str) -> Result<String> {
        let output = self
            .command(prompt)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MapperError::CliExecution(format!("{} 実行エラー: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MapperError::CliExecution(format!(
                "{} failed (code {:?}): {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )));
        }

        let response = String::from_utf8_lossy(&output.stdout).to_string();
        let preview: String = response.chars().take(200).collect();
        debug!(program = %self.program, %preview, "claude cli response");

        Ok(response)
    }
}
