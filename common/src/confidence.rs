//! 信頼度計算
//!
//! キーワード重複スコアを0〜100の信頼度に変換する。
//! 正規化は `商品名の文字数 × 3`（全文字が商品名一致の重みで寄与した場合の理論上限）。
//! 下流の要確認閾値（60）はこの式に合わせて調整されているため変更しない。
//!
//! 汎用スコアでは構造的に低く出る商品群（iPad 等）は上書きルールで補正する。

use crate::normalizer::normalize_text;
use crate::scoring::CategoryScore;
use crate::types::MatchResult;
use serde::{Deserialize, Serialize};

/// 信頼度上書きルール
///
/// 正規化済み商品名が `trigger` を含み、スコア1位が `category` でないが
/// スコア一覧に `category` が存在する場合、`{category, subcategory, confidence}` を返す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceOverride {
    pub trigger: String,
    pub category: String,
    pub subcategory: String,
    pub confidence: u8,
}

/// 組み込みの上書きルール
pub fn builtin_overrides() -> Vec<ConfidenceOverride> {
    vec![ConfidenceOverride {
        trigger: "ipad".into(),
        category: "Tablets".into(),
        subcategory: "iPad".into(),
        confidence: 90,
    }]
}

/// スコアから信頼度を計算
///
/// `min(100, round(top_score / (商品名文字数 * 3) * 100))`
pub fn confidence_from_score(top_score: f64, product_name: &str) -> u8 {
    let max_possible = (product_name.chars().count() * 3) as f64;
    if max_possible <= 0.0 || top_score <= 0.0 {
        return 0;
    }
    ((top_score / max_possible) * 100.0).round().min(100.0) as u8
}

/// 上書きルールを適用
///
/// # Arguments
/// * `normalized_name` - 正規化済み商品名
/// * `scores` - スコア降順のカテゴリ一覧
/// * `rules` - 上書きルール（先頭から評価）
pub fn apply_overrides(
    normalized_name: &str,
    scores: &[CategoryScore],
    rules: &[ConfidenceOverride],
) -> Option<MatchResult> {
    let top = scores.first()?;

    for rule in rules {
        let trigger = normalize_text(&rule.trigger);
        if trigger.is_empty() || !normalized_name.contains(&trigger) {
            continue;
        }
        if top.category_name.trim().eq_ignore_ascii_case(rule.category.trim()) {
            continue;
        }
        if let Some(target) = scores
            .iter()
            .find(|s| s.category_name.trim().eq_ignore_ascii_case(rule.category.trim()))
        {
            return Some(MatchResult::new(
                target.category_name.clone(),
                rule.subcategory.clone(),
                rule.confidence,
            ));
        }
    }

    None
}
