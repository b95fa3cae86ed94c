//! 判定履歴モジュール
//!
//! 過去の判定結果と利用者の修正を JSON ファイルに保存し、
//! 同じ（または似た）商品名の再判定をスキップする。
//! 保存失敗は判定結果に影響させない（ログを出して再試行するのみ）。

use crate::config::Config;
use crate::error::{MapperError, Result};
use catalog_mapper_common::{normalize_text, significant_terms, Correction, CorrectionMap, MatchResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const HISTORY_FILE_NAME: &str = "history.json";

/// 類似商品とみなす有意語の重なり（Jaccard係数）
pub const SIMILARITY_THRESHOLD: f64 = 0.75;

/// 保存の試行回数
const SAVE_ATTEMPTS: u32 = 3;

/// 履歴ファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryFile {
    /// バージョン（互換性チェック用）
    version: u32,
    /// 商品名ハッシュ → 判定結果
    entries: BTreeMap<String, HistoryEntry>,
    /// 利用者による修正
    #[serde(default)]
    corrections: CorrectionMap,
}

/// 履歴エントリ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 商品名（表示・類似検索用）
    pub product_name: String,
    pub result: MatchResult,
    /// 保存日時（RFC 3339）
    pub saved_at: String,
}

impl HistoryFile {
    const CURRENT_VERSION: u32 = 1;

    /// 既定の保存先（~/.config/catalog-mapper/history.json）
    pub fn default_path() -> Result<PathBuf> {
        Ok(Config::config_dir()?.join(HISTORY_FILE_NAME))
    }

    /// 履歴ファイルを読み込み
    ///
    /// 存在しない・壊れている・バージョン不一致の場合は空の履歴を返す。
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("履歴ファイルを開けません ({}): {}", path.display(), e);
                return Self::default();
            }
        };

        let reader = BufReader::new(file);
        match serde_json::from_reader::<_, HistoryFile>(reader) {
            Ok(history) => {
                if history.version != Self::CURRENT_VERSION {
                    warn!("履歴バージョン不一致、空の履歴から開始します");
                    return Self::default();
                }
                history
            }
            Err(e) => {
                warn!("履歴ファイルが壊れています、空の履歴から開始します: {}", e);
                Self::default()
            }
        }
    }

    /// 履歴ファイルを保存
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// 再試行つきで保存（失敗してもエラーにはしない）
    ///
    /// 待ち時間は 100ms, 200ms と倍々で伸ばす。
    pub fn save_with_retry(&self, path: &Path) -> bool {
        let mut last_error: Option<MapperError> = None;

        for attempt in 0..SAVE_ATTEMPTS {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * (1 << (attempt - 1)));
                warn!(
                    "履歴の保存に失敗しました（{}回目）、{}ms後に再試行します",
                    attempt,
                    delay.as_millis()
                );
                std::thread::sleep(delay);
            }

            match self.save(path) {
                Ok(()) => return true,
                Err(e) => last_error = Some(e),
            }
        }

        if let Some(e) = last_error {
            warn!("履歴を保存できませんでした ({}): {}", path.display(), e);
        }
        false
    }

    /// 履歴ファイルを削除
    pub fn clear(path: &Path) -> Result<bool> {
        if path.exists() {
            std::fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 類似商品の過去の判定を探す
    ///
    /// 1. 正規化済み商品名が完全一致 → そのまま
    /// 2. 有意語の Jaccard 係数が閾値以上で最大のもの → 信頼度を係数倍
    pub fn lookup_similar(&self, product_name: &str) -> Option<MatchResult> {
        if let Some(entry) = self.entries.get(&history_key(product_name)) {
            return Some(entry.result.clone());
        }

        let terms: HashSet<String> = significant_terms(product_name).into_iter().collect();
        if terms.is_empty() {
            return None;
        }

        let mut best: Option<(f64, &HistoryEntry)> = None;
        for entry in self.entries.values() {
            let other: HashSet<String> = significant_terms(&entry.product_name).into_iter().collect();
            let similarity = jaccard(&terms, &other);
            if similarity >= SIMILARITY_THRESHOLD && best.map_or(true, |(s, _)| similarity > s) {
                best = Some((similarity, entry));
            }
        }

        best.map(|(similarity, entry)| {
            debug!(
                name = product_name,
                similar_to = %entry.product_name,
                similarity,
                "history hit"
            );
            let confidence = (entry.result.confidence as f64 * similarity).round() as u8;
            MatchResult::new(&entry.result.main_category, &entry.result.sub_category, confidence)
        })
    }

    /// 修正マップ（呼び出し側が所有するコピー）
    pub fn lookup_corrections(&self) -> CorrectionMap {
        self.corrections.clone()
    }

    /// 判定結果を記録（該当なしは記録しない）
    pub fn save_mapping(&mut self, product_name: &str, result: &MatchResult) {
        if result.is_no_match() || normalize_text(product_name).is_empty() {
            return;
        }
        self.entries.insert(
            history_key(product_name),
            HistoryEntry {
                product_name: product_name.trim().to_string(),
                result: result.clone(),
                saved_at: chrono::Local::now().to_rfc3339(),
            },
        );
    }

    /// 修正を記録
    pub fn save_correction(&mut self, from_main: &str, from_sub: &str, correction: Correction) {
        self.corrections.insert(from_main, from_sub, correction);
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.values()
    }

    pub fn corrections_len(&self) -> usize {
        self.corrections.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for HistoryFile {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: BTreeMap::new(),
            corrections: CorrectionMap::new(),
        }
    }
}

/// 商品名のハッシュキー（正規化後の SHA-256）
pub fn history_key(product_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(product_name).as_bytes());
    hex::encode(hasher.finalize())
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
