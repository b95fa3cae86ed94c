//! 用語マッピングテーブル
//!
//! 既知の商品種別フレーズ（単語・複数語）から (カテゴリ, サブカテゴリ, 重み) を引く辞書。
//! 汎用（家電・生活雑貨）テーブルとファッション用テーブルを1つに統合して使う。
//! 起動時に一度だけ構築し、以降は読み取り専用。

use crate::confidence::{builtin_overrides, ConfidenceOverride};
use crate::error::{Error, Result};
use crate::normalizer::normalize_text;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 用語エントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    pub phrase: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    /// 0〜100
    pub weight: u8,
}

impl TermEntry {
    pub fn new(phrase: &str, category: &str, subcategory: Option<&str>, weight: u8) -> Self {
        Self {
            phrase: phrase.to_string(),
            category: category.to_string(),
            subcategory: subcategory.map(str::to_string),
            weight: weight.min(100),
        }
    }

    pub fn is_multi_word(&self) -> bool {
        self.phrase.contains(' ')
    }
}

/// 用語テーブルのJSONファイル形式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermTableFile {
    #[serde(default)]
    pub terms: Vec<TermEntry>,
    #[serde(default)]
    pub overrides: Vec<ConfidenceOverride>,
}

/// 統合用語テーブル
///
/// - 複数語フレーズ: フレーズ長の降順（同長は辞書順）
/// - 単語: 登録順
#[derive(Debug, Clone, Default)]
pub struct TermTable {
    phrases: Vec<TermEntry>,
    words: Vec<TermEntry>,
    word_index: HashMap<String, usize>,
    overrides: Vec<ConfidenceOverride>,
}

impl TermTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 組み込みテーブル（汎用＋ファッション、同一フレーズはファッション優先）
    pub fn builtin() -> Self {
        let mut table = Self::general();
        table.merge(&Self::fashion());
        table.overrides = builtin_overrides();
        table
    }

    /// 汎用（家電・生活雑貨）テーブル
    pub fn general() -> Self {
        Self::from_rows(GENERAL_TERMS)
    }

    /// ファッション用テーブル
    pub fn fashion() -> Self {
        Self::from_rows(FASHION_TERMS)
    }

    fn from_rows(rows: &[TermRow]) -> Self {
        let mut table = Self::new();
        for (phrase, category, subcategory, weight) in rows {
            table.insert(TermEntry::new(phrase, category, *subcategory, *weight));
        }
        table
    }

    /// JSON文字列から読み込み
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: TermTableFile = serde_json::from_str(json)?;
        let mut table = Self::new();
        for entry in file.terms {
            if entry.category.trim().is_empty() {
                return Err(Error::TermTable(format!("term '{}' has no category", entry.phrase)));
            }
            table.insert(entry);
        }
        table.overrides = file.overrides;
        Ok(table)
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// エントリを追加（同一フレーズは上書き）
    ///
    /// フレーズは正規化してから登録する（"T-Shirt" → "t shirt"）。
    pub fn insert(&mut self, entry: TermEntry) {
        let phrase = normalize_text(&entry.phrase);
        if phrase.is_empty() {
            return;
        }
        let entry = TermEntry {
            phrase,
            weight: entry.weight.min(100),
            ..entry
        };

        if entry.is_multi_word() {
            match self.phrases.iter_mut().find(|e| e.phrase == entry.phrase) {
                Some(existing) => *existing = entry,
                None => self.phrases.push(entry),
            }
            self.phrases.sort_by(|a, b| {
                b.phrase
                    .chars()
                    .count()
                    .cmp(&a.phrase.chars().count())
                    .then_with(|| a.phrase.cmp(&b.phrase))
            });
        } else if let Some(&idx) = self.word_index.get(&entry.phrase) {
            self.words[idx] = entry;
        } else {
            self.word_index.insert(entry.phrase.clone(), self.words.len());
            self.words.push(entry);
        }
    }

    /// 別テーブルをマージ（後から追加した側が優先）
    pub fn merge(&mut self, other: &TermTable) {
        for entry in other.entries() {
            self.insert(entry.clone());
        }
        for rule in &other.overrides {
            self.overrides.retain(|r| r.trigger != rule.trigger);
            self.overrides.push(rule.clone());
        }
    }

    /// 複数語フレーズ（長い順）
    pub fn phrases(&self) -> &[TermEntry] {
        &self.phrases
    }

    /// 単語（登録順）
    pub fn words(&self) -> &[TermEntry] {
        &self.words
    }

    /// 全エントリ（フレーズ → 単語の順）
    pub fn entries(&self) -> impl Iterator<Item = &TermEntry> {
        self.phrases.iter().chain(self.words.iter())
    }

    /// 単語の完全一致検索
    pub fn lookup_word(&self, word: &str) -> Option<&TermEntry> {
        self.word_index.get(word).map(|&idx| &self.words[idx])
    }

    /// 信頼度上書きルール
    pub fn overrides(&self) -> &[ConfidenceOverride] {
        &self.overrides
    }

    pub fn add_override(&mut self, rule: ConfidenceOverride) {
        self.overrides.retain(|r| r.trigger != rule.trigger);
        self.overrides.push(rule);
    }

    pub fn len(&self) -> usize {
        self.phrases.len() + self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type TermRow = (&'static str, &'static str, Option<&'static str>, u8);

// 単語の重みは87以下（部分一致×0.8が採用閾値70に届かない）。
// 他の語の一部になる短い語（top, suit 等）は独立した単語・フレーズとして登録し、完全一致で先に拾う。
const GENERAL_TERMS: &[TermRow] = &[
    ("apple watch", "Electronics", Some("Smartwatches"), 95),
    ("smart watch", "Electronics", Some("Smartwatches"), 90),
    ("wireless earbuds", "Electronics", Some("Headphones"), 90),
    ("bluetooth speaker", "Electronics", Some("Speakers"), 90),
    ("phone case", "Electronics", Some("Phone Accessories"), 90),
    ("screen protector", "Electronics", Some("Phone Accessories"), 90),
    ("usb cable", "Electronics", Some("Cables & Chargers"), 85),
    ("power bank", "Electronics", Some("Cables & Chargers"), 90),
    ("gaming mouse", "Electronics", Some("Computer Accessories"), 90),
    ("mechanical keyboard", "Electronics", Some("Computer Accessories"), 90),
    ("android tablet", "Tablets", Some("Android Tablets"), 90),
    ("coffee maker", "Home & Kitchen", Some("Kitchen Appliances"), 90),
    ("air fryer", "Home & Kitchen", Some("Kitchen Appliances"), 90),
    ("desk lamp", "Home & Kitchen", Some("Lighting"), 85),
    ("yoga mat", "Sports & Outdoors", Some("Fitness"), 90),
    ("water bottle", "Sports & Outdoors", Some("Outdoor Gear"), 80),
    ("face cream", "Beauty", Some("Skincare"), 85),
    ("hair dryer", "Beauty", Some("Hair Care"), 85),
    ("board game", "Toys & Games", Some("Board Games"), 90),
    ("action figure", "Toys & Games", Some("Action Figures"), 90),
    ("toy car", "Toys & Games", Some("Toy Vehicles"), 90),
    ("hockey stick", "Sports & Outdoors", Some("Team Sports"), 90),
    ("smartphone", "Electronics", Some("Smartphones"), 87),
    ("iphone", "Electronics", Some("Smartphones"), 87),
    ("laptop", "Electronics", Some("Laptops"), 87),
    ("headphones", "Electronics", Some("Headphones"), 87),
    ("earbuds", "Electronics", Some("Headphones"), 85),
    ("airpods", "Electronics", Some("Headphones"), 85),
    ("charger", "Electronics", Some("Cables & Chargers"), 80),
    ("keyboard", "Electronics", Some("Computer Accessories"), 80),
    ("mouse", "Electronics", Some("Computer Accessories"), 70),
    ("monitor", "Electronics", Some("Monitors"), 80),
    ("camera", "Electronics", Some("Cameras"), 85),
    ("drone", "Electronics", Some("Cameras"), 80),
    ("speaker", "Electronics", Some("Speakers"), 80),
    ("tablet", "Tablets", None, 85),
    ("watch", "Accessories", Some("Watches"), 75),
    ("blender", "Home & Kitchen", Some("Kitchen Appliances"), 85),
    ("cookware", "Home & Kitchen", Some("Cookware"), 85),
    ("candle", "Home & Kitchen", Some("Home Decor"), 80),
    ("pillow", "Home & Kitchen", Some("Bedding"), 80),
    ("blanket", "Home & Kitchen", Some("Bedding"), 80),
    ("chair", "Home & Kitchen", Some("Furniture"), 80),
    ("mug", "Home & Kitchen", Some("Kitchenware"), 75),
    ("lamp", "Home & Kitchen", Some("Lighting"), 75),
    ("shampoo", "Beauty", Some("Hair Care"), 85),
    ("lipstick", "Beauty", Some("Makeup"), 87),
    ("mascara", "Beauty", Some("Makeup"), 87),
    ("serum", "Beauty", Some("Skincare"), 80),
    ("perfume", "Beauty", Some("Fragrance"), 85),
    ("dumbbell", "Sports & Outdoors", Some("Fitness"), 87),
    ("tent", "Sports & Outdoors", Some("Camping"), 80),
    ("bicycle", "Sports & Outdoors", Some("Cycling"), 85),
    ("puzzle", "Toys & Games", Some("Puzzles"), 85),
    ("lego", "Toys & Games", Some("Building Toys"), 85),
    ("toy", "Toys & Games", None, 75),
];

// 旧実装で個別分岐していた bucket hat / loafer 等もここに集約する。
const FASHION_TERMS: &[TermRow] = &[
    ("t-shirt", "Clothing", Some("T-Shirts"), 90),
    ("bucket hat", "Clothing", Some("Hats"), 95),
    ("baseball cap", "Clothing", Some("Hats"), 90),
    ("denim jacket", "Clothing", Some("Jackets"), 95),
    ("rain jacket", "Clothing", Some("Jackets"), 90),
    ("running shoes", "Clothing", Some("Shoes"), 90),
    ("ankle boots", "Clothing", Some("Boots"), 90),
    ("maxi dress", "Clothing", Some("Dresses"), 95),
    ("swim trunks", "Clothing", Some("Swimwear"), 90),
    ("sports bra", "Clothing", Some("Activewear"), 90),
    ("polo shirt", "Clothing", Some("Shirts"), 90),
    ("tshirt", "Clothing", Some("T-Shirts"), 87),
    ("tee", "Clothing", Some("T-Shirts"), 75),
    ("hoodie", "Clothing", Some("Hoodies & Sweatshirts"), 87),
    ("sweatshirt", "Clothing", Some("Hoodies & Sweatshirts"), 87),
    ("sweater", "Clothing", Some("Knitwear"), 85),
    ("cardigan", "Clothing", Some("Knitwear"), 85),
    ("jeans", "Clothing", Some("Jeans"), 87),
    ("chinos", "Clothing", Some("Pants"), 85),
    ("trousers", "Clothing", Some("Pants"), 85),
    ("leggings", "Clothing", Some("Activewear"), 85),
    ("dress", "Clothing", Some("Dresses"), 85),
    ("skirt", "Clothing", Some("Skirts"), 85),
    ("blouse", "Clothing", Some("Tops"), 85),
    ("top", "Clothing", Some("Tops"), 80),
    ("tops", "Clothing", Some("Tops"), 80),
    ("suit", "Clothing", Some("Suits"), 80),
    ("suits", "Clothing", Some("Suits"), 80),
    ("shirt", "Clothing", Some("Shirts"), 80),
    ("jacket", "Clothing", Some("Jackets"), 85),
    ("coat", "Clothing", Some("Jackets"), 80),
    ("parka", "Clothing", Some("Jackets"), 85),
    ("loafer", "Clothing", Some("Shoes"), 87),
    ("sneaker", "Clothing", Some("Shoes"), 87),
    ("sneakers", "Clothing", Some("Shoes"), 87),
    ("sandals", "Clothing", Some("Shoes"), 85),
    ("heels", "Clothing", Some("Shoes"), 80),
    ("boots", "Clothing", Some("Boots"), 85),
    ("hat", "Clothing", Some("Hats"), 80),
    ("beanie", "Clothing", Some("Hats"), 87),
    ("fedora", "Clothing", Some("Hats"), 87),
    ("scarf", "Clothing", Some("Accessories"), 80),
    ("socks", "Clothing", Some("Socks"), 80),
    ("underwear", "Clothing", Some("Underwear"), 85),
    ("pajamas", "Clothing", Some("Sleepwear"), 85),
    ("bikini", "Clothing", Some("Swimwear"), 87),
    ("swimsuit", "Clothing", Some("Swimwear"), 87),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_merges_both_tables() {
        let table = TermTable::builtin();
        assert!(table.lookup_word("laptop").is_some());
        assert!(table.lookup_word("loafer").is_some());
        assert_eq!(table.len(), GENERAL_TERMS.len() + FASHION_TERMS.len());
        assert!(!table.overrides().is_empty());
    }

    #[test]
    fn test_builtin_word_weights_stay_below_partial_floor() {
        // 部分一致（×0.8）で直接一致の閾値70に届かない
        for entry in TermTable::builtin().words() {
            assert!(entry.weight <= 87, "{} = {}", entry.phrase, entry.weight);
        }
    }

    #[test]
    fn test_phrases_sorted_longest_first() {
        let table = TermTable::builtin();
        let lengths: Vec<usize> = table.phrases().iter().map(|e| e.phrase.chars().count()).collect();
        let mut sorted = lengths.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(lengths, sorted);
        assert_eq!(table.phrases()[0].phrase, "mechanical keyboard");
    }

    #[test]
    fn test_insert_normalizes_phrase() {
        let table = TermTable::fashion();
        // "t-shirt" は正規化で複数語フレーズになる
        assert!(table.phrases().iter().any(|e| e.phrase == "t shirt"));
        assert!(table.lookup_word("t-shirt").is_none());
    }

    #[test]
    fn test_insert_overwrites_same_phrase() {
        let mut table = TermTable::new();
        table.insert(TermEntry::new("Watch", "A", None, 70));
        table.insert(TermEntry::new("watch", "B", Some("Watches"), 80));
        assert_eq!(table.len(), 1);
        let entry = table.lookup_word("watch").unwrap();
        assert_eq!(entry.category, "B");
        assert_eq!(entry.weight, 80);
    }

    #[test]
    fn test_merge_later_wins() {
        let mut table = TermTable::general();
        let mut extra = TermTable::new();
        extra.insert(TermEntry::new("laptop", "Computers", Some("Notebooks"), 99));
        table.merge(&extra);
        assert_eq!(table.lookup_word("laptop").unwrap().category, "Computers");
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{
            "terms": [
                {"phrase": "Gaming Chair", "category": "Furniture", "subcategory": "Chairs", "weight": 88},
                {"phrase": "stool", "category": "Furniture", "weight": 150}
            ],
            "overrides": [
                {"trigger": "kindle", "category": "Tablets", "subcategory": "E-Readers", "confidence": 90}
            ]
        }"#;
        let table = TermTable::from_json_str(json).unwrap();
        assert_eq!(table.phrases()[0].phrase, "gaming chair");
        assert_eq!(table.lookup_word("stool").unwrap().weight, 100);
        assert_eq!(table.lookup_word("stool").unwrap().subcategory, None);
        assert_eq!(table.overrides()[0].trigger, "kindle");
    }

    #[test]
    fn test_from_json_str_rejects_missing_category() {
        let json = r#"{"terms": [{"phrase": "stool", "category": " ", "weight": 80}]}"#;
        assert!(matches!(TermTable::from_json_str(json), Err(Error::TermTable(_))));
    }
}
