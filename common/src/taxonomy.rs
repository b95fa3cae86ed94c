//! カテゴリ体系（タクソノミー）モジュール
//!
//! 出品先マーケットプレイスのカテゴリ体系（メインカテゴリ → サブカテゴリ一覧）を保持する。
//! 外部から取得したJSONはフィールド名の揺れ（`subcategories` / `subCategories`）や
//! id欠落があるため、読み込み時に正規形へ揃える。照合側は正規形のみを前提とする。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// サブカテゴリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: String,
    pub name: String,
}

/// メインカテゴリ（サブカテゴリ一覧を所有する）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>, subcategories: Vec<Subcategory>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subcategories,
        }
    }

    /// サブカテゴリを名前で検索（大文字小文字無視の完全一致）
    pub fn find_subcategory(&self, name: &str) -> Option<&Subcategory> {
        let name = name.trim().to_lowercase();
        self.subcategories
            .iter()
            .find(|s| s.name.trim().to_lowercase() == name)
    }

    /// サブカテゴリを部分一致で検索（どちらかがもう一方を含む）
    pub fn find_subcategory_partial(&self, name: &str) -> Option<&Subcategory> {
        self.subcategories.iter().find(|s| overlaps(&s.name, name))
    }
}

/// カテゴリ体系
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Taxonomy {
    categories: Vec<Category>,
}

impl Taxonomy {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// JSON文字列から読み込み
    ///
    /// 受け付ける形式:
    /// - カテゴリ配列 `[{...}, ...]`
    /// - `{"categories": [...]}`
    ///
    /// `null` はカテゴリ未取得の呼び出し側バグとしてエラーにする（空配列は正常）。
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: Option<RawTaxonomy> = serde_json::from_str(json)?;
        let raw = raw.ok_or_else(|| {
            Error::Taxonomy("taxonomy is null; pass an empty array when no categories exist".into())
        })?;

        let categories = match raw {
            RawTaxonomy::List(list) => list,
            RawTaxonomy::Wrapped { categories } => categories,
        };

        Ok(Self::from_raw(categories))
    }

    fn from_raw(raw: Vec<RawCategory>) -> Self {
        let categories = raw
            .into_iter()
            .enumerate()
            .map(|(i, cat)| {
                let id = id_or_placeholder(cat.id, || format!("cat-{}", i + 1));
                let name = name_or_placeholder(cat.name, || format!("Category {}", i + 1));

                let subcategories = cat
                    .subcategories
                    .unwrap_or_default()
                    .into_iter()
                    .enumerate()
                    .map(|(j, sub)| match sub {
                        RawSubcategory::Name(name) => Subcategory {
                            id: format!("{}-sub-{}", id, j + 1),
                            name,
                        },
                        RawSubcategory::Object { id: sub_id, name } => Subcategory {
                            id: id_or_placeholder(sub_id, || format!("{}-sub-{}", id, j + 1)),
                            name: name_or_placeholder(name, || format!("Subcategory {}", j + 1)),
                        },
                    })
                    .collect();

                Category {
                    id,
                    name,
                    subcategories,
                }
            })
            .collect();

        Self { categories }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// メインカテゴリを名前で検索（大文字小文字無視の完全一致）
    pub fn find_category(&self, name: &str) -> Option<&Category> {
        let name = name.trim().to_lowercase();
        self.categories
            .iter()
            .find(|c| c.name.trim().to_lowercase() == name)
    }

    /// メインカテゴリを部分一致で検索
    pub fn find_category_partial(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| overlaps(&c.name, name))
    }

    /// 全ての (カテゴリ, サブカテゴリ) の組を列挙
    ///
    /// サブカテゴリを持たないカテゴリは `(category, None)` として1回だけ現れる。
    pub fn pairs(&self) -> impl Iterator<Item = (&Category, Option<&Subcategory>)> {
        self.categories.iter().flat_map(|c| {
            let subs: Vec<Option<&Subcategory>> = if c.subcategories.is_empty() {
                vec![None]
            } else {
                c.subcategories.iter().map(Some).collect()
            };
            subs.into_iter().map(move |s| (c, s))
        })
    }
}

/// 大文字小文字を無視して、どちらかがもう一方を含むか
pub(crate) fn overlaps(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

// =============================================
// 読み込み用の生データ型
// =============================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTaxonomy {
    List(Vec<RawCategory>),
    Wrapped { categories: Vec<RawCategory> },
}

#[derive(Deserialize)]
struct RawCategory {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "subCategories", alias = "sub_categories")]
    subcategories: Option<Vec<RawSubcategory>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSubcategory {
    Name(String),
    Object {
        #[serde(default)]
        id: Option<serde_json::Value>,
        #[serde(default)]
        name: Option<String>,
    },
}

fn id_or_placeholder(value: Option<serde_json::Value>, placeholder: impl FnOnce() -> String) -> String {
    match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => placeholder(),
    }
}

fn name_or_placeholder(value: Option<String>, placeholder: impl FnOnce() -> String) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => placeholder(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_JSON: &str = r#"[
        {"id": "c1", "name": "Electronics", "subcategories": [
            {"id": "s1", "name": "Smartphones"},
            {"id": "s2", "name": "Laptops"}
        ]},
        {"id": 7, "name": "Clothing", "subCategories": [
            {"name": "Men's T-Shirts"},
            "Women's T-Shirts"
        ]},
        {"name": "Tablets"}
    ]"#;

    #[test]
    fn test_load_json() {
        let taxonomy = Taxonomy::from_json_str(TEST_JSON).unwrap();
        assert_eq!(taxonomy.len(), 3);
        assert_eq!(taxonomy.categories()[0].subcategories.len(), 2);
    }

    #[test]
    fn test_field_name_variants_are_normalized() {
        let taxonomy = Taxonomy::from_json_str(TEST_JSON).unwrap();
        let clothing = taxonomy.find_category("clothing").unwrap();
        assert_eq!(clothing.id, "7");
        assert_eq!(clothing.subcategories.len(), 2);
        assert_eq!(clothing.subcategories[0].id, "7-sub-1");
        assert_eq!(clothing.subcategories[1].name, "Women's T-Shirts");
    }

    #[test]
    fn test_missing_fields_get_placeholders() {
        let taxonomy = Taxonomy::from_json_str(TEST_JSON).unwrap();
        let tablets = taxonomy.find_category("Tablets").unwrap();
        assert_eq!(tablets.id, "cat-3");
        assert!(tablets.subcategories.is_empty());

        let unnamed = Taxonomy::from_json_str(r#"[{"id": "x"}]"#).unwrap();
        assert_eq!(unnamed.categories()[0].name, "Category 1");
    }

    #[test]
    fn test_wrapped_format() {
        let taxonomy =
            Taxonomy::from_json_str(r#"{"categories": [{"name": "Beauty", "subcategories": null}]}"#).unwrap();
        assert_eq!(taxonomy.len(), 1);
        assert!(taxonomy.categories()[0].subcategories.is_empty());
    }

    #[test]
    fn test_empty_array_is_valid() {
        let taxonomy = Taxonomy::from_json_str("[]").unwrap();
        assert!(taxonomy.is_empty());
    }

    #[test]
    fn test_null_is_error() {
        let result = Taxonomy::from_json_str("null");
        assert!(matches!(result, Err(Error::Taxonomy(_))));
    }

    #[test]
    fn test_find_category_partial() {
        let taxonomy = Taxonomy::from_json_str(TEST_JSON).unwrap();
        assert_eq!(taxonomy.find_category_partial("tablet").unwrap().name, "Tablets");
        assert!(taxonomy.find_category_partial("").is_none());
    }

    #[test]
    fn test_find_subcategory() {
        let taxonomy = Taxonomy::from_json_str(TEST_JSON).unwrap();
        let electronics = taxonomy.find_category("ELECTRONICS").unwrap();
        assert_eq!(electronics.find_subcategory("laptops").unwrap().id, "s2");
        assert_eq!(electronics.find_subcategory_partial("laptop").unwrap().id, "s2");
        assert!(electronics.find_subcategory("Tablets").is_none());
    }

    #[test]
    fn test_pairs() {
        let taxonomy = Taxonomy::from_json_str(TEST_JSON).unwrap();
        let pairs: Vec<_> = taxonomy
            .pairs()
            .map(|(c, s)| (c.name.as_str(), s.map(|s| s.name.as_str())))
            .collect();
        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs[0], ("Electronics", Some("Smartphones")));
        assert_eq!(pairs[4], ("Tablets", None));
    }
}
