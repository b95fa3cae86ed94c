//! 対話式レビューモジュール
//!
//! 出力CSVのうち「Needs Review = yes」の行を1件ずつ表示し、
//! 候補カテゴリから選ぶか手入力で確定する。
//! 確定した判定は履歴と修正マップに保存され、次回以降の判定に反映される。

use crate::error::{MapperError, Result};
use crate::history::HistoryFile;
use crate::pipeline::MatchSource;
use crate::rows::CsvTable;
use crate::writer::{
    write_csv, CONFIDENCE_COLUMN, MAIN_CATEGORY_COLUMN, NEEDS_REVIEW_COLUMN, SOURCE_COLUMN, SUB_CATEGORY_COLUMN,
};
use catalog_mapper_common::{
    score_taxonomy, Correction, MatchResult, PreparedText, ProductText, TermTable, Taxonomy, UNCATEGORIZED,
};
use dialoguer::{Input, Select};
use std::path::Path;

/// 候補の表示件数
const CANDIDATE_LIMIT: usize = 5;

/// 利用者が確定したカテゴリの信頼度
const REVIEWED_CONFIDENCE: u8 = 100;

/// レビュー対象の行番号
pub fn rows_needing_review(table: &CsvTable) -> Vec<usize> {
    (0..table.len())
        .filter(|&row| table.get(row, NEEDS_REVIEW_COLUMN) == Some("yes"))
        .collect()
}

/// 候補カテゴリ（"Cat > Sub" 形式、スコア順）
///
/// # Arguments
/// * `limit` - 最大件数
pub fn candidate_labels(taxonomy: &Taxonomy, table: &TermTable, product: &ProductText, limit: usize) -> Vec<(String, String)> {
    let text = PreparedText::from_product(product);

    // カテゴリとサブカテゴリの合計で並べる
    let mut ranked: Vec<(f64, String, String)> = score_taxonomy(&text, taxonomy, table)
        .into_iter()
        .map(|score| {
            let (sub_name, sub_score) = score
                .best_subcategory
                .map(|s| (s.name, s.score))
                .unwrap_or_default();
            (score.score + sub_score, score.category_name, sub_name)
        })
        .filter(|(total, _, _)| *total > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    ranked
        .into_iter()
        .take(limit)
        .map(|(_, main, sub)| (main, sub))
        .collect()
}

/// 表示用ラベル
pub fn format_label(main: &str, sub: &str) -> String {
    if sub.is_empty() {
        main.to_string()
    } else {
        format!("{} > {}", main, sub)
    }
}

/// "Cat > Sub" 入力を分解
pub fn parse_label(input: &str) -> Option<(String, String)> {
    let mut parts = input.splitn(2, '>').map(str::trim);
    let main = parts.next().filter(|m| !m.is_empty())?;
    let sub = parts.next().unwrap_or("");
    Some((main.to_string(), sub.to_string()))
}

/// 確定したカテゴリを行に書き込み、履歴に記録
///
/// 元の判定と異なる場合は修正マップにも追加する（フォールバック行を除く）。
pub fn apply_review_choice(
    table: &mut CsvTable,
    history: &mut HistoryFile,
    row: usize,
    product_name: &str,
    main: &str,
    sub: &str,
) {
    let previous_main = table.get(row, MAIN_CATEGORY_COLUMN).unwrap_or("").to_string();
    let previous_sub = table.get(row, SUB_CATEGORY_COLUMN).unwrap_or("").to_string();
    let previous_source = table.get(row, SOURCE_COLUMN).unwrap_or("").to_string();

    table.set(row, MAIN_CATEGORY_COLUMN, main);
    table.set(row, SUB_CATEGORY_COLUMN, sub);
    table.set(row, CONFIDENCE_COLUMN, REVIEWED_CONFIDENCE.to_string());
    table.set(row, NEEDS_REVIEW_COLUMN, "no");
    table.set(row, SOURCE_COLUMN, MatchSource::Manual.as_str());

    history.save_mapping(product_name, &MatchResult::new(main, sub, REVIEWED_CONFIDENCE));

    let changed = !previous_main.eq_ignore_ascii_case(main) || !previous_sub.eq_ignore_ascii_case(sub);
    let correctable = !previous_main.is_empty()
        && previous_main != UNCATEGORIZED
        && previous_source != MatchSource::Fallback.as_str();
    if changed && correctable {
        history.save_correction(&previous_main, &previous_sub, Correction::new(main, sub));
    }
}

/// 対話アクション
enum ReviewAction {
    /// このカテゴリで確定
    Choose(String, String),
    /// この行をスキップ
    Skip,
    /// 残り全部スキップ
    SkipAll,
    /// 保存して終了
    Quit,
}

/// 対話式レビュー
///
/// # Arguments
/// * `csv_path` - categorize の出力CSV
/// * `name_column` - 商品名の列
pub fn run_interactive_review(
    csv_path: &Path,
    output_path: Option<&Path>,
    taxonomy: &Taxonomy,
    terms: &TermTable,
    history: &mut HistoryFile,
    name_column: &str,
) -> Result<usize> {
    let mut table = CsvTable::from_file(csv_path)?;
    if table.column(NEEDS_REVIEW_COLUMN).is_none() {
        return Err(MapperError::CsvParse(format!(
            "「{}」列がありません。先に categorize を実行してください",
            NEEDS_REVIEW_COLUMN
        )));
    }

    let targets = rows_needing_review(&table);
    if targets.is_empty() {
        println!("✓ 要確認の商品はありません");
        return Ok(0);
    }

    println!("🔎 要確認の商品: {}件", targets.len());
    println!("---\n");

    let mut reviewed = 0;
    for (count, &row) in targets.iter().enumerate() {
        let product_name = table.get(row, name_column).unwrap_or("").to_string();
        let current = (
            table.get(row, MAIN_CATEGORY_COLUMN).unwrap_or("").to_string(),
            table.get(row, SUB_CATEGORY_COLUMN).unwrap_or("").to_string(),
        );
        println!(
            "[{}/{}] {} （現在: {}, 信頼度 {}）",
            count + 1,
            targets.len(),
            product_name,
            format_label(&current.0, &current.1),
            table.get(row, CONFIDENCE_COLUMN).unwrap_or("-")
        );

        let candidates = candidate_labels(taxonomy, terms, &ProductText::named(&product_name), CANDIDATE_LIMIT);

        match prompt_review_action(&current, &candidates)? {
            ReviewAction::Choose(main, sub) => {
                apply_review_choice(&mut table, history, row, &product_name, &main, &sub);
                reviewed += 1;
                println!("  → {}\n", format_label(&main, &sub));
            }
            ReviewAction::Skip => println!("  → スキップ\n"),
            ReviewAction::SkipAll => {
                println!("  → 残り全部スキップ\n");
                break;
            }
            ReviewAction::Quit => {
                println!("保存して終了します...");
                break;
            }
        }
    }

    let output = output_path.unwrap_or(csv_path);
    write_csv(output, &table)?;
    println!("\n✓ 保存しました: {}", output.display());

    Ok(reviewed)
}

/// 操作選択プロンプト
fn prompt_review_action(current: &(String, String), candidates: &[(String, String)]) -> Result<ReviewAction> {
    let mut items: Vec<String> = Vec::new();
    let keep_current = !current.0.is_empty() && current.0 != UNCATEGORIZED;
    if keep_current {
        items.push(format!("現在のまま ({})", format_label(&current.0, &current.1)));
    }
    for (main, sub) in candidates {
        items.push(format_label(main, sub));
    }
    let manual = items.len();
    items.push("手入力...".into());
    items.push("スキップ".into());
    items.push("残り全部スキップ".into());
    items.push("保存して終了".into());

    let selection = Select::new()
        .with_prompt("カテゴリを選択")
        .items(&items)
        .default(0)
        .interact()
        .map_err(|e| MapperError::CliExecution(e.to_string()))?;

    let offset = usize::from(keep_current);
    match selection {
        0 if keep_current => Ok(ReviewAction::Choose(current.0.clone(), current.1.clone())),
        i if i < manual => {
            let (main, sub) = &candidates[i - offset];
            Ok(ReviewAction::Choose(main.clone(), sub.clone()))
        }
        i if i == manual => prompt_manual_label(),
        i if i == manual + 1 => Ok(ReviewAction::Skip),
        i if i == manual + 2 => Ok(ReviewAction::SkipAll),
        _ => Ok(ReviewAction::Quit),
    }
}

fn prompt_manual_label() -> Result<ReviewAction> {
    let input: String = Input::new()
        .with_prompt("カテゴリ (例: Clothing > Hats、空でスキップ)")
        .allow_empty(true)
        .interact_text()
        .map_err(|e| MapperError::CliExecution(e.to_string()))?;

    Ok(match parse_label(&input) {
        Some((main, sub)) => ReviewAction::Choose(main, sub),
        None => ReviewAction::Skip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REVIEW_CSV: &str = "Title,Main Category,Sub Category,Confidence,Needs Review,Match Source\n\
Bucket Hat,Clothing,Hats,45,yes,local\n\
iPhone 15,Electronics,Smartphones,95,no,local\n\
Mystery Box,Uncategorized,Uncategorized,0,yes,fallback\n";

    fn taxonomy() -> Taxonomy {
        Taxonomy::from_json_str(
            r#"[
                {"id": "clothing", "name": "Clothing", "subcategories": [{"id": "hats", "name": "Hats"}]},
                {"id": "acc", "name": "Accessories", "subcategories": [{"id": "hw", "name": "Headwear"}]},
                {"id": "garden", "name": "Garden", "subcategories": []}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_rows_needing_review() {
        let table = CsvTable::parse(REVIEW_CSV).unwrap();
        assert_eq!(rows_needing_review(&table), vec![0, 2]);
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("Clothing > Hats"), Some(("Clothing".into(), "Hats".into())));
        assert_eq!(parse_label(" Garden "), Some(("Garden".into(), String::new())));
        assert_eq!(parse_label("   "), None);
        assert_eq!(format_label("Garden", ""), "Garden");
        assert_eq!(format_label("Clothing", "Hats"), "Clothing > Hats");
    }

    #[test]
    fn test_candidates_ranked_by_score() {
        let candidates = candidate_labels(&taxonomy(), &TermTable::new(), &ProductText::named("Wool Hats"), 5);
        assert_eq!(candidates.first(), Some(&("Clothing".to_string(), "Hats".to_string())));
    }

    #[test]
    fn test_apply_choice_records_correction() {
        let mut table = CsvTable::parse(REVIEW_CSV).unwrap();
        let mut history = HistoryFile::default();

        apply_review_choice(&mut table, &mut history, 0, "Bucket Hat", "Accessories", "Headwear");

        assert_eq!(table.get(0, "Main Category"), Some("Accessories"));
        assert_eq!(table.get(0, "Needs Review"), Some("no"));
        assert_eq!(table.get(0, "Match Source"), Some("manual"));
        assert_eq!(
            history.lookup_similar("Bucket Hat"),
            Some(MatchResult::new("Accessories", "Headwear", 100))
        );
        let corrections = history.lookup_corrections();
        assert_eq!(corrections.get("Clothing", "Hats").unwrap().main_category, "Accessories");
    }

    #[test]
    fn test_apply_choice_on_fallback_skips_correction() {
        let mut table = CsvTable::parse(REVIEW_CSV).unwrap();
        let mut history = HistoryFile::default();

        apply_review_choice(&mut table, &mut history, 2, "Mystery Box", "Garden", "");

        assert_eq!(table.get(2, "Confidence"), Some("100"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.corrections_len(), 0);
    }
}
