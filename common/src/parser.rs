//! 外部モデル応答パーサー
//!
//! 応答テキストから最初のJSONオブジェクトを取り出し、カテゴリ体系と照合して検証する。
//! 体系に存在しないカテゴリは絶対にそのまま通さない。

use crate::error::{Error, Result};
use crate::taxonomy::Taxonomy;
use crate::types::MatchResult;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 分類不能を表すカテゴリ名
pub const UNCATEGORIZED: &str = "Uncategorized";

/// これ未満の信頼度は分類不能として扱う
pub const MIN_REMOTE_CONFIDENCE: f64 = 0.3;

/// 分類不能時の信頼度
pub const UNCATEGORIZED_CONFIDENCE: f64 = 0.1;

/// サブカテゴリを先頭のものに差し替えたときの係数
pub const FIRST_SUBCATEGORY_FACTOR: f64 = 0.7;

/// サブカテゴリを Uncategorized にしたときの係数
pub const NO_SUBCATEGORY_FACTOR: f64 = 0.5;

/// 応答テキストから最初のトップレベルJSONオブジェクトを抽出
///
/// 文字列リテラル内の括弧やエスケープは無視する。
/// ```json ... ``` ブロックや前後の説明文があっても構わない。
///
/// # Examples
/// ```
/// use catalog_mapper_common::extract_json_object;
///
/// let reply = "Sure! {\"main_category\": \"Tablets\"} Hope this helps.";
/// assert_eq!(extract_json_object(reply).unwrap(), "{\"main_category\": \"Tablets\"}");
/// ```
pub fn extract_json_object(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| Error::Parse("JSONオブジェクトが見つかりません".into()))?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in response[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&response[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    Err(Error::Parse("JSONオブジェクトが閉じていません".into()))
}

/// 外部モデルの生の回答
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteAnswer {
    #[serde(default, alias = "mainCategory", alias = "category")]
    pub main_category: Option<String>,
    #[serde(default, alias = "subCategory", alias = "sub_category")]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, alias = "noMatch")]
    pub no_match: bool,
}

impl RemoteAnswer {
    /// 0〜1 に正規化した信頼度（1より大きい値は百分率とみなす）
    pub fn normalized_confidence(&self) -> f64 {
        let c = if self.confidence > 1.0 {
            self.confidence / 100.0
        } else {
            self.confidence
        };
        if c.is_finite() {
            c.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// 応答テキストをパース
pub fn parse_remote_response(response: &str) -> Result<RemoteAnswer> {
    let json_str = extract_json_object(response)?;
    let answer: RemoteAnswer = serde_json::from_str(json_str)
        .map_err(|e| Error::Parse(format!("分類応答 JSONパースエラー: {}", e)))?;
    Ok(answer)
}

/// 検証済みの外部モデル判定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVerdict {
    pub main_category: String,
    pub sub_category: String,
    /// 0〜1
    pub confidence: f64,
    pub no_match: bool,
}

impl RemoteVerdict {
    /// 分類不能
    pub fn uncategorized() -> Self {
        Self {
            main_category: UNCATEGORIZED.to_string(),
            sub_category: UNCATEGORIZED.to_string(),
            confidence: UNCATEGORIZED_CONFIDENCE,
            no_match: true,
        }
    }

    /// 照合結果形式（信頼度 0〜100）に変換。分類不能は「該当なし」
    pub fn to_match_result(&self) -> MatchResult {
        if self.no_match {
            return MatchResult::no_match();
        }
        let confidence = (self.confidence * 100.0).round().clamp(0.0, 100.0) as u8;
        MatchResult::new(&self.main_category, &self.sub_category, confidence)
    }
}

/// 回答をカテゴリ体系と照合して検証
///
/// - `no_match` または信頼度 0.3 未満 → 分類不能
/// - カテゴリが体系にない → 分類不能
/// - サブカテゴリが体系にない → 先頭サブカテゴリ（×0.7）、サブカテゴリがなければ Uncategorized（×0.5）
pub fn validate_remote_answer(answer: &RemoteAnswer, taxonomy: &Taxonomy) -> RemoteVerdict {
    let confidence = answer.normalized_confidence();
    if answer.no_match || confidence < MIN_REMOTE_CONFIDENCE {
        return RemoteVerdict::uncategorized();
    }

    let Some(category) = answer
        .main_category
        .as_deref()
        .and_then(|name| taxonomy.find_category(name))
    else {
        return RemoteVerdict::uncategorized();
    };

    let requested = answer.subcategory.as_deref().unwrap_or("").trim();
    let found = if requested.is_empty() {
        None
    } else {
        category.find_subcategory(requested)
    };

    let (sub_category, confidence) = match (found, category.subcategories.first()) {
        (Some(sub), _) => (sub.name.clone(), confidence),
        (None, _) if requested.is_empty() && category.subcategories.is_empty() => (String::new(), confidence),
        (None, Some(first)) => (first.name.clone(), confidence * FIRST_SUBCATEGORY_FACTOR),
        (None, None) => (UNCATEGORIZED.to_string(), confidence * NO_SUBCATEGORY_FACTOR),
    };

    RemoteVerdict {
        main_category: category.name.clone(),
        sub_category,
        confidence,
        no_match: false,
    }
}

/// 応答テキストを解釈（失敗は分類不能として扱い、エラーにはしない）
pub fn interpret_remote_reply(response: &str, taxonomy: &Taxonomy) -> RemoteVerdict {
    match parse_remote_response(response) {
        Ok(answer) => validate_remote_answer(&answer, taxonomy),
        Err(e) => {
            warn!("分類応答を解釈できません: {}", e);
            RemoteVerdict::uncategorized()
        }
    }
}
