//! テキスト正規化
//!
//! 小文字化・記号除去・空白統一と、有意語（3文字以上）の抽出。

use crate::types::ProductText;

/// テキストを正規化する
///
/// - 小文字化
/// - 英数字・空白以外はスペースに置換
/// - 連続空白を1つに、前後の空白を除去
pub fn normalize_text(text: &str) -> String {
    let replaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 有意語を抽出（正規化後、3文字以上の語のみ）
pub fn significant_terms(text: &str) -> Vec<String> {
    normalize_text(text)
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// 照合用に前処理済みの商品テキスト
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedText {
    /// 正規化済みの商品名
    pub name: String,
    /// 正規化済みの商品名＋説明
    pub search_text: String,
    /// 商品名の有意語
    pub terms: Vec<String>,
}

impl PreparedText {
    pub fn from_product(product: &ProductText) -> Self {
        Self {
            name: normalize_text(&product.name),
            search_text: normalize_text(&product.combined()),
            terms: significant_terms(&product.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Apple iPad Air (5th Gen)"), "apple ipad air 5th gen");
        assert_eq!(normalize_text("  Men's   T-Shirt!! "), "men s t shirt");
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("---"), "");
    }

    #[test]
    fn test_significant_terms() {
        assert_eq!(
            significant_terms("Apple iPad Air 5th Gen"),
            vec!["apple", "ipad", "air", "5th", "gen"]
        );
        assert_eq!(significant_terms("A to Z kit"), vec!["kit"]);
        assert!(significant_terms("").is_empty());
    }

    #[test]
    fn test_prepared_text() {
        let product = ProductText::new("Bucket Hat", "Cotton, <b>unisex</b>");
        let prepared = PreparedText::from_product(&product);
        assert_eq!(prepared.name, "bucket hat");
        assert_eq!(prepared.search_text, "bucket hat cotton b unisex b");
        assert_eq!(prepared.terms, vec!["bucket", "hat"]);
    }
}
