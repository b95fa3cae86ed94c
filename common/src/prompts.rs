//! プロンプト生成モジュール
//!
//! ローカル照合で確度が足りない商品を外部モデルに分類させるためのプロンプト。
//! カテゴリ体系の全 "Category > Subcategory" を列挙し、その中からのみ選ばせる。

use crate::taxonomy::Taxonomy;
use crate::types::ProductText;

/// プロンプトに含める説明文の最大文字数
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// カテゴリ体系を "Category > Subcategory" の行に展開
///
/// サブカテゴリを持たないカテゴリは "Category" のみ。
pub fn taxonomy_lines(taxonomy: &Taxonomy) -> Vec<String> {
    taxonomy
        .pairs()
        .map(|(category, sub)| match sub {
            Some(sub) => format!("{} > {}", category.name, sub.name),
            None => category.name.clone(),
        })
        .collect()
}

/// 分類プロンプト生成
///
/// # Arguments
/// * `taxonomy` - 出品先のカテゴリ体系
/// * `product` - 分類対象の商品
///
/// # Returns
/// 外部モデルに渡すプロンプト文字列
pub fn build_classification_prompt(taxonomy: &Taxonomy, product: &ProductText) -> String {
    let category_list = taxonomy_lines(taxonomy)
        .iter()
        .map(|line| format!("- {}", line))
        .collect::<Vec<_>>()
        .join("\n");

    let description = truncate_chars(product.description.trim(), MAX_DESCRIPTION_CHARS);
    let description_block = if description.is_empty() {
        String::new()
    } else {
        format!("\nProduct description: {}", description)
    };

    format!(
        r#"You are a product categorization assistant for an e-commerce marketplace.
Classify the product into exactly one category from the list below.

## Allowed categories ("Category > Subcategory")
{category_list}

## Product
Product title: {title}{description_block}

## Output format (strict JSON, nothing else)
{{
  "main_category": "category name exactly as listed",
  "subcategory": "subcategory name exactly as listed",
  "confidence": 0.0 to 1.0,
  "no_match": true/false
}}

## Rules
- Use ONLY the categories and subcategories listed above. Never invent new ones.
- If the category has no subcategory in the list, use an empty string for "subcategory".
- If no category fits, set "no_match" to true and "confidence" to 0.
- Output the JSON object only. No explanations."#,
        title = product.name.trim(),
    )
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{Category, Subcategory};

    fn taxonomy() -> Taxonomy {
        Taxonomy::new(vec![
            Category::new(
                "c1",
                "Electronics",
                vec![
                    Subcategory { id: "s1".into(), name: "Smartphones".into() },
                    Subcategory { id: "s2".into(), name: "Laptops".into() },
                ],
            ),
            Category::new("c2", "Tablets", vec![]),
        ])
    }

    #[test]
    fn test_taxonomy_lines() {
        assert_eq!(
            taxonomy_lines(&taxonomy()),
            vec!["Electronics > Smartphones", "Electronics > Laptops", "Tablets"]
        );
    }

    #[test]
    fn test_prompt_contains_categories_and_title() {
        let prompt = build_classification_prompt(&taxonomy(), &ProductText::named("Pixel 8 Pro"));
        assert!(prompt.contains("- Electronics > Smartphones"));
        assert!(prompt.contains("- Tablets"));
        assert!(prompt.contains("Product title: Pixel 8 Pro"));
        assert!(prompt.contains("\"no_match\""));
        assert!(!prompt.contains("Product description"));
    }

    #[test]
    fn test_prompt_truncates_description() {
        let long = "x".repeat(800);
        let prompt = build_classification_prompt(&taxonomy(), &ProductText::new("Thing", long));
        let line = prompt
            .lines()
            .find(|l| l.starts_with("Product description: "))
            .unwrap();
        assert_eq!(line.len(), "Product description: ".len() + MAX_DESCRIPTION_CHARS + 3);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
