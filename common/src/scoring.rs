//! キーワード重複スコアリング
//!
//! 直接一致で確度が足りない場合のフォールバック。
//! カテゴリ体系の全 (カテゴリ, サブカテゴリ) を商品テキストとのキーワード重複で採点する。
//!
//! - カテゴリ名のキーワードが商品名に含まれる: `文字数 × 3`
//! - 商品名になく検索テキスト（名前＋説明）に含まれる: `文字数`
//! - 商品名の有意語が、このカテゴリに対応付いた用語と部分一致: `重み / 2`

use crate::normalizer::{significant_terms, PreparedText};
use crate::taxonomy::{Category, Taxonomy};
use crate::terms::{TermEntry, TermTable};

/// 商品名一致の重み
pub const NAME_MATCH_MULTIPLIER: f64 = 3.0;

/// サブカテゴリのスコア
#[derive(Debug, Clone, PartialEq)]
pub struct SubcategoryScore {
    pub id: String,
    pub name: String,
    pub score: f64,
}

/// カテゴリのスコア
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    pub category_id: String,
    pub category_name: String,
    pub score: f64,
    /// 最高スコアのサブカテゴリ（サブカテゴリがない場合は None）
    pub best_subcategory: Option<SubcategoryScore>,
}

/// 名前のキーワード重複スコア
fn keyword_score(label: &str, text: &PreparedText) -> f64 {
    significant_terms(label)
        .iter()
        .map(|keyword| {
            let len = keyword.chars().count() as f64;
            if text.name.contains(keyword.as_str()) {
                len * NAME_MATCH_MULTIPLIER
            } else if text.search_text.contains(keyword.as_str()) {
                len
            } else {
                0.0
            }
        })
        .sum()
}

/// 用語テーブル由来の加点
fn term_boost<F>(text: &PreparedText, table: &TermTable, applies: F) -> f64
where
    F: Fn(&TermEntry) -> bool,
{
    let mut boost = 0.0;
    for term in &text.terms {
        for entry in table.entries().filter(|e| applies(*e)) {
            if term.contains(entry.phrase.as_str()) || entry.phrase.contains(term.as_str()) {
                boost += entry.weight as f64 / 2.0;
            }
        }
    }
    boost
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// 1カテゴリを採点
pub fn score_category(text: &PreparedText, category: &Category, table: &TermTable) -> CategoryScore {
    let score = keyword_score(&category.name, text)
        + term_boost(text, table, |e| same_name(&e.category, &category.name));

    let mut best: Option<SubcategoryScore> = None;
    for sub in &category.subcategories {
        let sub_score = keyword_score(&sub.name, text)
            + term_boost(text, table, |e| {
                e.subcategory.as_deref().is_some_and(|s| same_name(s, &sub.name))
            });

        if best.as_ref().map_or(true, |b| sub_score > b.score) {
            best = Some(SubcategoryScore {
                id: sub.id.clone(),
                name: sub.name.clone(),
                score: sub_score,
            });
        }
    }

    CategoryScore {
        category_id: category.id.clone(),
        category_name: category.name.clone(),
        score,
        best_subcategory: best,
    }
}

/// カテゴリ体系全体を採点し、スコア降順で返す（同点は体系の並び順）
pub fn score_taxonomy(text: &PreparedText, taxonomy: &Taxonomy, table: &TermTable) -> Vec<CategoryScore> {
    let mut scores: Vec<CategoryScore> = taxonomy
        .categories()
        .iter()
        .map(|c| score_category(text, c, table))
        .collect();

    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Subcategory;
    use crate::types::ProductText;

    fn sub(name: &str) -> Subcategory {
        Subcategory {
            id: name.to_lowercase(),
            name: name.to_string(),
        }
    }

    fn prepared(name: &str, description: &str) -> PreparedText {
        PreparedText::from_product(&ProductText::new(name, description))
    }

    #[test]
    fn test_name_match_weighs_triple() {
        let category = Category::new("c1", "Garden Tools", vec![]);
        let table = TermTable::new();

        // "garden" が商品名に含まれる → 6 * 3
        let in_name = score_category(&prepared("Garden Hose", ""), &category, &table);
        assert_eq!(in_name.score, 18.0);

        // 説明文にのみ含まれる → 6
        let in_desc = score_category(&prepared("Hose", "for your garden"), &category, &table);
        assert_eq!(in_desc.score, 6.0);
    }

    #[test]
    fn test_short_keywords_ignored() {
        let category = Category::new("c1", "TV & AV", vec![]);
        let result = score_category(&prepared("TV stand", ""), &category, &TermTable::new());
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_term_boost_for_category() {
        let mut table = TermTable::new();
        table.insert(TermEntry::new("laptop", "Computers", Some("Notebooks"), 90));
        let category = Category::new("c1", "Computers", vec![sub("Notebooks"), sub("Desktops")]);

        let result = score_category(&prepared("Gaming Laptops", ""), &category, &table);
        assert_eq!(result.score, 45.0);
        let best = result.best_subcategory.unwrap();
        assert_eq!(best.name, "Notebooks");
        assert_eq!(best.score, 45.0);
    }

    #[test]
    fn test_subcategory_tie_keeps_first() {
        let category = Category::new("c1", "Kitchen", vec![sub("Mugs"), sub("Plates")]);
        let result = score_category(&prepared("Ceramic thing", ""), &category, &TermTable::new());
        let best = result.best_subcategory.unwrap();
        assert_eq!(best.name, "Mugs");
        assert_eq!(best.score, 0.0);
    }

    #[test]
    fn test_best_subcategory_none_without_subcategories() {
        let category = Category::new("c1", "Kitchen", vec![]);
        let result = score_category(&prepared("Kitchen towel", ""), &category, &TermTable::new());
        assert!(result.best_subcategory.is_none());
    }

    #[test]
    fn test_score_taxonomy_sorted_desc() {
        let taxonomy = Taxonomy::new(vec![
            Category::new("c1", "Books", vec![]),
            Category::new("c2", "Garden", vec![sub("Hoses")]),
            Category::new("c3", "Pets", vec![]),
        ]);
        let scores = score_taxonomy(&prepared("Garden hoses", ""), &taxonomy, &TermTable::new());
        assert_eq!(scores[0].category_name, "Garden");
        assert_eq!(scores[0].best_subcategory.as_ref().unwrap().name, "Hoses");
        // 同点は元の並び順
        assert_eq!(scores[1].category_name, "Books");
        assert_eq!(scores[2].category_name, "Pets");
    }
}
