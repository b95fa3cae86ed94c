//! カテゴリ修正マップ
//!
//! 利用者が手作業で直した (カテゴリ, サブカテゴリ) の置き換え表。
//! キーは `"カテゴリ|サブカテゴリ"`（大文字小文字無視）。
//! 呼び出し側が所有して照合に渡す。

use crate::types::MatchResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 修正後のカテゴリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    pub main_category: String,
    pub sub_category: String,
}

impl Correction {
    pub fn new(main_category: impl Into<String>, sub_category: impl Into<String>) -> Self {
        Self {
            main_category: main_category.into(),
            sub_category: sub_category.into(),
        }
    }
}

/// 修正マップ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrectionMap {
    entries: BTreeMap<String, Correction>,
}

impl CorrectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 照合キーを作る
    pub fn key(main_category: &str, sub_category: &str) -> String {
        format!(
            "{}|{}",
            main_category.trim().to_lowercase(),
            sub_category.trim().to_lowercase()
        )
    }

    pub fn insert(&mut self, main_category: &str, sub_category: &str, correction: Correction) {
        self.entries.insert(Self::key(main_category, sub_category), correction);
    }

    /// `"カテゴリ|サブカテゴリ"` 形式のキーで登録
    ///
    /// 区切りがない場合はサブカテゴリ空として扱う。
    pub fn insert_key(&mut self, raw_key: &str, correction: Correction) {
        let (main, sub) = raw_key.split_once('|').unwrap_or((raw_key, ""));
        self.insert(main, sub, correction);
    }

    pub fn get(&self, main_category: &str, sub_category: &str) -> Option<&Correction> {
        self.entries.get(&Self::key(main_category, sub_category))
    }

    /// 照合結果に修正を適用（信頼度は維持、該当なしはそのまま）
    pub fn apply(&self, result: &MatchResult) -> MatchResult {
        if result.is_no_match() {
            return result.clone();
        }
        match self.get(&result.main_category, &result.sub_category) {
            Some(c) => MatchResult::new(&c.main_category, &c.sub_category, result.confidence),
            None => result.clone(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Correction)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_case_insensitive() {
        assert_eq!(CorrectionMap::key(" Electronics ", "Smartphones"), "electronics|smartphones");
    }

    #[test]
    fn test_apply_keeps_confidence() {
        let mut map = CorrectionMap::new();
        map.insert_key("Clothing|Hats", Correction::new("Accessories", "Headwear"));

        let result = map.apply(&MatchResult::new("clothing", "HATS", 85));
        assert_eq!(result, MatchResult::new("Accessories", "Headwear", 85));
    }

    #[test]
    fn test_apply_passes_through_unknown_and_no_match() {
        let mut map = CorrectionMap::new();
        map.insert_key("|", Correction::new("Misc", "Misc"));

        let unknown = MatchResult::new("Garden", "Hoses", 50);
        assert_eq!(map.apply(&unknown), unknown);
        assert_eq!(map.apply(&MatchResult::no_match()), MatchResult::no_match());
    }

    #[test]
    fn test_insert_key_without_separator() {
        let mut map = CorrectionMap::new();
        map.insert_key("Tablets", Correction::new("Electronics", "Tablets"));
        assert!(map.get("tablets", "").is_some());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut map = CorrectionMap::new();
        map.insert("A", "B", Correction::new("C", "D"));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"a|b":{"mainCategory":"C","subCategory":"D"}}"#);
        let back: CorrectionMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
