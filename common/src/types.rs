//! マッチングの入出力型
//!
//! - ProductText: 照合対象の商品テキスト（名前・説明）
//! - MatchResult: 照合結果（メインカテゴリ・サブカテゴリ・信頼度）

use serde::{Deserialize, Serialize};

/// 照合対象の商品テキスト
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductText {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ProductText {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// 名前だけの商品テキスト
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, String::new())
    }

    /// 名前と説明を連結した生テキスト（性別判定用）
    pub fn combined(&self) -> String {
        if self.description.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.description)
        }
    }
}

/// カテゴリ照合結果
///
/// `confidence == 0` かつカテゴリが空文字の場合は「該当なし」を表す。
/// エラーではなく正常な終端値として扱う。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub main_category: String,
    pub sub_category: String,
    /// 0〜100
    pub confidence: u8,
}

impl MatchResult {
    pub fn new(main_category: impl Into<String>, sub_category: impl Into<String>, confidence: u8) -> Self {
        Self {
            main_category: main_category.into(),
            sub_category: sub_category.into(),
            confidence: confidence.min(100),
        }
    }

    /// 該当なし
    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn is_no_match(&self) -> bool {
        self.confidence == 0 && self.main_category.is_empty()
    }

    /// 信頼度が閾値未満なら人手確認が必要
    pub fn needs_review(&self, threshold: u8) -> bool {
        self.confidence < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_is_default() {
        let result = MatchResult::no_match();
        assert!(result.is_no_match());
        assert_eq!(result.main_category, "");
        assert_eq!(result.sub_category, "");
        assert_eq!(result.confidence, 0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let result = MatchResult::new("Electronics", "Laptops", 250);
        assert_eq!(result.confidence, 100);
    }

    #[test]
    fn test_needs_review() {
        let result = MatchResult::new("Electronics", "Laptops", 59);
        assert!(result.needs_review(60));
        assert!(!MatchResult::new("Electronics", "Laptops", 60).needs_review(60));
    }

    #[test]
    fn test_serialize_camel_case() {
        let result = MatchResult::new("Clothing", "Hats", 95);
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"mainCategory":"Clothing","subCategory":"Hats","confidence":95}"#);
    }

    #[test]
    fn test_combined_text() {
        assert_eq!(ProductText::named("Cap").combined(), "Cap");
        assert_eq!(ProductText::new("Cap", "for men").combined(), "Cap for men");
    }
}
