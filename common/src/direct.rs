//! 直接一致・部分一致マッチャー
//!
//! 用語テーブルとの照合順序:
//! 1. 複数語フレーズ（長い順）が検索テキストに含まれる → 最初のヒット
//! 2. 商品名の有意語が単語キーと完全一致 → 最初のヒット
//! 3. 有意語と単語キーのどちらかがもう一方を含む → 重み×0.8 の最大値
//!    （同点は単語キーの登録順で先のもの）

use crate::terms::{TermEntry, TermTable};

/// 部分一致時の重み係数
pub const PARTIAL_MATCH_FACTOR: f64 = 0.8;

/// 一致の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Phrase,
    Exact,
    Partial,
}

/// 用語テーブルとの一致結果
#[derive(Debug, Clone, PartialEq)]
pub struct TermMatch {
    pub phrase: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub weight: f64,
    pub kind: MatchKind,
}

impl TermMatch {
    fn from_entry(entry: &TermEntry, weight: f64, kind: MatchKind) -> Self {
        Self {
            phrase: entry.phrase.clone(),
            category: entry.category.clone(),
            subcategory: entry.subcategory.clone(),
            weight,
            kind,
        }
    }
}

/// 用語テーブルから最良の一致を探す
///
/// # Arguments
/// * `product_terms` - 商品名の有意語
/// * `search_text` - 正規化済みの 商品名＋説明
/// * `table` - 統合用語テーブル
pub fn find_term_match(product_terms: &[String], search_text: &str, table: &TermTable) -> Option<TermMatch> {
    // 1. 複数語フレーズ（ソート済みなので最初のヒットが最長）
    if let Some(entry) = table
        .phrases()
        .iter()
        .find(|e| search_text.contains(e.phrase.as_str()))
    {
        return Some(TermMatch::from_entry(entry, entry.weight as f64, MatchKind::Phrase));
    }

    // 2. 単語の完全一致
    if let Some(entry) = product_terms.iter().find_map(|t| table.lookup_word(t)) {
        return Some(TermMatch::from_entry(entry, entry.weight as f64, MatchKind::Exact));
    }

    // 3. 部分一致（単語キーの登録順に走査、同点は先のキーを維持）
    let mut best: Option<TermMatch> = None;
    for entry in table.words() {
        for term in product_terms {
            if !(term.contains(entry.phrase.as_str()) || entry.phrase.contains(term.as_str())) {
                continue;
            }
            let score = entry.weight as f64 * PARTIAL_MATCH_FACTOR;
            if best.as_ref().map_or(true, |b| score > b.weight) {
                best = Some(TermMatch::from_entry(entry, score, MatchKind::Partial));
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{normalize_text, significant_terms};

    fn table() -> TermTable {
        let mut table = TermTable::new();
        table.insert(TermEntry::new("watch", "Category A", None, 80));
        table.insert(TermEntry::new("apple watch", "Category B", Some("Smartwatches"), 90));
        table.insert(TermEntry::new("apple watch band", "Category C", Some("Bands"), 85));
        table.insert(TermEntry::new("laptop", "Electronics", Some("Laptops"), 90));
        table.insert(TermEntry::new("lap", "Other", None, 90));
        table.insert(TermEntry::new("sleeve", "Accessories", None, 60));
        table
    }

    fn run(name: &str, description: &str) -> Option<TermMatch> {
        let terms = significant_terms(name);
        let search = normalize_text(&format!("{} {}", name, description));
        find_term_match(&terms, &search, &table())
    }

    #[test]
    fn test_multi_word_phrase_wins_over_single_word() {
        let m = run("Apple Watch Series 9", "").unwrap();
        assert_eq!(m.category, "Category B");
        assert_eq!(m.kind, MatchKind::Phrase);
    }

    #[test]
    fn test_longest_phrase_first() {
        let m = run("Apple Watch Band", "").unwrap();
        assert_eq!(m.category, "Category C");
    }

    #[test]
    fn test_phrase_found_in_description() {
        let m = run("Series 9 GPS", "the new apple watch").unwrap();
        assert_eq!(m.category, "Category B");
    }

    #[test]
    fn test_exact_word_match() {
        let m = run("Pocket Watch", "").unwrap();
        assert_eq!(m.category, "Category A");
        assert_eq!(m.kind, MatchKind::Exact);
        assert_eq!(m.weight, 80.0);
    }

    #[test]
    fn test_exact_match_uses_name_terms_only() {
        // 説明文の単語は完全一致に使わない
        let m = run("Gift Box", "contains a laptop");
        assert!(m.is_none());
    }

    #[test]
    fn test_partial_match_scaled() {
        let m = run("Laptops Bundle", "").unwrap();
        assert_eq!(m.kind, MatchKind::Partial);
        // laptop(90) と lap(90) は同点 → 先に見つかった laptop を維持
        assert_eq!(m.category, "Electronics");
        assert!((m.weight - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_keeps_highest_score() {
        let m = run("Sleeves Laptops", "").unwrap();
        assert_eq!(m.category, "Electronics");
    }

    #[test]
    fn test_partial_tie_prefers_earlier_key() {
        let mut table = TermTable::new();
        table.insert(TermEntry::new("sleeve", "Category A", None, 80));
        table.insert(TermEntry::new("lap", "Category B", None, 80));

        // 商品名では "laptops" が先だが、キーの登録順で "sleeve" が勝つ
        let terms = significant_terms("Laptops Sleeves");
        let m = find_term_match(&terms, "laptops sleeves", &table).unwrap();
        assert_eq!(m.category, "Category A");
        assert_eq!(m.kind, MatchKind::Partial);
    }

    #[test]
    fn test_no_match() {
        assert!(run("Generic Plastic Widget", "").is_none());
    }
}
