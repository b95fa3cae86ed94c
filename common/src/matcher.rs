//! カテゴリ照合（判定オーケストレーター）
//!
//! 処理の流れ:
//! 1. 用語テーブルとの直接一致・部分一致（重みが採用閾値以上なら採用）
//! 2. アパレルなら性別でサブカテゴリを補正
//! 3. 実際のカテゴリ体系に解決（完全一致 → 部分一致 → カテゴリのみ）
//! 4. 直接一致で決まらなければキーワード重複スコア → 信頼度計算
//!
//! 照合は純粋関数で、同じ入力には常に同じ結果を返す。

use crate::confidence::{apply_overrides, confidence_from_score};
use crate::corrections::CorrectionMap;
use crate::direct::{find_term_match, TermMatch};
use crate::gender::{disambiguate, genders_conflict};
use crate::normalizer::PreparedText;
use crate::scoring::score_taxonomy;
use crate::taxonomy::{Category, Subcategory, Taxonomy};
use crate::terms::TermTable;
use crate::types::{MatchResult, ProductText};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// サブカテゴリが完全一致で解決できた場合の信頼度
pub const EXACT_SUBCATEGORY_CONFIDENCE: u8 = 95;
/// サブカテゴリが部分一致で解決できた場合の信頼度
pub const PARTIAL_SUBCATEGORY_CONFIDENCE: u8 = 85;
/// カテゴリのみ解決できた場合の信頼度
pub const CATEGORY_ONLY_CONFIDENCE: u8 = 80;

/// 照合設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// 直接一致を採用する最低重み
    pub direct_match_floor: f64,
    /// 性別補正の対象となるカテゴリ名
    pub apparel_category: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            direct_match_floor: 70.0,
            apparel_category: "Clothing".to_string(),
        }
    }
}

lazy_static! {
    static ref BUILTIN_MATCHER: CategoryMatcher = CategoryMatcher::builtin();
}

/// 組み込みの用語テーブルと既定設定で照合する
pub fn match_category(name: &str, description: &str, taxonomy: &Taxonomy) -> MatchResult {
    BUILTIN_MATCHER.match_product(&ProductText::new(name, description), taxonomy)
}

/// カテゴリ照合器
///
/// 用語テーブルと設定は構築時に固定され、照合中は変更されない。
#[derive(Debug, Clone)]
pub struct CategoryMatcher {
    table: TermTable,
    config: MatcherConfig,
}

impl CategoryMatcher {
    pub fn new(table: TermTable, config: MatcherConfig) -> Self {
        Self { table, config }
    }

    /// 組み込みテーブル（汎用＋ファッション）と既定設定
    pub fn builtin() -> Self {
        Self::new(TermTable::builtin(), MatcherConfig::default())
    }

    pub fn table(&self) -> &TermTable {
        &self.table
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// 商品1件を照合
    pub fn match_product(&self, product: &ProductText, taxonomy: &Taxonomy) -> MatchResult {
        if taxonomy.is_empty() {
            debug!(name = %product.name, "taxonomy is empty, no match");
            return MatchResult::no_match();
        }

        let text = PreparedText::from_product(product);

        if let Some(term) = find_term_match(&text.terms, &text.search_text, &self.table) {
            if term.weight >= self.config.direct_match_floor {
                if let Some(result) = self.resolve_direct(&term, product, taxonomy) {
                    debug!(
                        name = %product.name,
                        phrase = %term.phrase,
                        kind = ?term.kind,
                        confidence = result.confidence,
                        "direct match"
                    );
                    return result;
                }
                debug!(category = %term.category, "direct match category not in taxonomy");
            } else {
                debug!(phrase = %term.phrase, weight = term.weight, "direct match below floor");
            }
        }

        self.score_match(product, &text, taxonomy)
    }

    /// 照合後に修正マップを適用
    pub fn match_with_corrections(
        &self,
        product: &ProductText,
        taxonomy: &Taxonomy,
        corrections: &CorrectionMap,
    ) -> MatchResult {
        corrections.apply(&self.match_product(product, taxonomy))
    }

    /// 直接一致を実際のカテゴリ体系に解決
    fn resolve_direct(&self, term: &TermMatch, product: &ProductText, taxonomy: &Taxonomy) -> Option<MatchResult> {
        let category = taxonomy
            .find_category(&term.category)
            .or_else(|| taxonomy.find_category_partial(&term.category))?;

        let subcategory = match &term.subcategory {
            Some(sub) if self.is_apparel(&term.category) || self.is_apparel(&category.name) => {
                disambiguate(sub, &product.combined())
            }
            Some(sub) => sub.clone(),
            None => return Some(MatchResult::new(&category.name, "", CATEGORY_ONLY_CONFIDENCE)),
        };

        if let Some(found) = category.find_subcategory(&subcategory) {
            return Some(MatchResult::new(&category.name, &found.name, EXACT_SUBCATEGORY_CONFIDENCE));
        }
        if let Some(found) = find_subcategory_gender_safe(category, &subcategory) {
            return Some(MatchResult::new(&category.name, &found.name, PARTIAL_SUBCATEGORY_CONFIDENCE));
        }
        Some(MatchResult::new(&category.name, subcategory, CATEGORY_ONLY_CONFIDENCE))
    }

    /// キーワード重複スコアによる照合
    fn score_match(&self, product: &ProductText, text: &PreparedText, taxonomy: &Taxonomy) -> MatchResult {
        let scores = score_taxonomy(text, taxonomy, &self.table);

        if let Some(result) = apply_overrides(&text.name, &scores, self.table.overrides()) {
            debug!(name = %product.name, category = %result.main_category, "confidence override applied");
            return result;
        }

        let Some(top) = scores.first() else {
            return MatchResult::no_match();
        };
        if top.score <= 0.0 {
            debug!(name = %product.name, "no keyword overlap");
            return MatchResult::no_match();
        }

        let sub_category = top
            .best_subcategory
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let confidence = confidence_from_score(top.score, &product.name);

        debug!(
            name = %product.name,
            category = %top.category_name,
            score = top.score,
            confidence,
            "keyword scoring"
        );
        MatchResult::new(&top.category_name, sub_category, confidence)
    }

    fn is_apparel(&self, category: &str) -> bool {
        category.trim().eq_ignore_ascii_case(self.config.apparel_category.trim())
    }
}

impl Default for CategoryMatcher {
    fn default() -> Self {
        Self::builtin()
    }
}

/// 部分一致でサブカテゴリを探す（反対の性別のサブカテゴリは除外）
fn find_subcategory_gender_safe<'a>(category: &'a Category, name: &str) -> Option<&'a Subcategory> {
    category
        .subcategories
        .iter()
        .filter(|s| !genders_conflict(&s.name, name))
        .find(|s| crate::taxonomy::overlaps(&s.name, name))
}
