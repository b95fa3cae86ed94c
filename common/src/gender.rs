//! 性別判定（アパレル用サブカテゴリの補正）
//!
//! 商品名・説明に含まれる男性/女性の表記から、サブカテゴリに "Men's " / "Women's " を付与する。
//! 既に性別の修飾があるサブカテゴリはそのまま返す（何度適用しても結果は変わらない）。

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MEN_RE: Regex =
        Regex::new(r"(?i)\bmen['’]?s?\b|\bman['’]?s?\b|\bmale\b").unwrap();
    static ref WOMEN_RE: Regex =
        Regex::new(r"(?i)\bwomen['’]?s?\b|\bwoman['’]?s?\b|\bfemale\b|\bladies\b").unwrap();
    static ref OTHER_QUALIFIER_RE: Regex =
        Regex::new(r"(?i)\bunisex\b|\bboys?['’]?s?\b|\bgirls?['’]?s?\b").unwrap();
}

/// 判定された性別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Men,
    Women,
}

impl Gender {
    /// サブカテゴリに付ける接頭辞
    pub fn prefix(&self) -> &'static str {
        match self {
            Gender::Men => "Men's ",
            Gender::Women => "Women's ",
        }
    }
}

/// テキストから性別を判定
///
/// 片方だけが見つかった場合のみ `Some`。両方・どちらもなしは `None`。
pub fn detect_gender(text: &str) -> Option<Gender> {
    let men = MEN_RE.is_match(text);
    let women = WOMEN_RE.is_match(text);
    match (men, women) {
        (true, false) => Some(Gender::Men),
        (false, true) => Some(Gender::Women),
        _ => None,
    }
}

/// サブカテゴリ名が既に性別・対象の修飾を持つか
pub fn has_gender_qualifier(subcategory: &str) -> bool {
    MEN_RE.is_match(subcategory) || WOMEN_RE.is_match(subcategory) || OTHER_QUALIFIER_RE.is_match(subcategory)
}

/// サブカテゴリに性別の接頭辞を付与
///
/// # Arguments
/// * `subcategory` - 照合で得たサブカテゴリ名
/// * `text` - 商品名＋説明の生テキスト
pub fn disambiguate(subcategory: &str, text: &str) -> String {
    if subcategory.trim().is_empty() || has_gender_qualifier(subcategory) {
        return subcategory.to_string();
    }
    match detect_gender(text) {
        Some(gender) => format!("{}{}", gender.prefix(), subcategory.trim()),
        None => subcategory.to_string(),
    }
}

/// 2つのサブカテゴリ名が反対の性別を指しているか
///
/// "Men's T-Shirts" は "Women's T-Shirts" を部分文字列として含むため、
/// 部分一致で解決するときはこれで除外する。
pub fn genders_conflict(a: &str, b: &str) -> bool {
    matches!(
        (detect_gender(a), detect_gender(b)),
        (Some(Gender::Men), Some(Gender::Women)) | (Some(Gender::Women), Some(Gender::Men))
    )
}
