//! 判定結果のCSV出力モジュール
//!
//! 元のCSVの列と行はそのまま残し、判定結果の列を末尾に追加する。

use crate::error::Result;
use crate::pipeline::CategorizedRow;
use crate::rows::CsvTable;
use std::path::Path;

pub const MAIN_CATEGORY_COLUMN: &str = "Main Category";
pub const SUB_CATEGORY_COLUMN: &str = "Sub Category";
pub const CONFIDENCE_COLUMN: &str = "Confidence";
pub const NEEDS_REVIEW_COLUMN: &str = "Needs Review";
pub const SOURCE_COLUMN: &str = "Match Source";

/// 判定結果を表に書き込む
///
/// 商品名のない行（スキップ）は空欄のまま。
pub fn apply_results(table: &mut CsvTable, rows: &[CategorizedRow]) {
    for column in [
        MAIN_CATEGORY_COLUMN,
        SUB_CATEGORY_COLUMN,
        CONFIDENCE_COLUMN,
        NEEDS_REVIEW_COLUMN,
        SOURCE_COLUMN,
    ] {
        table.ensure_column(column);
    }

    for row in rows {
        if row.source == crate::pipeline::MatchSource::Skipped {
            continue;
        }
        let i = row.row_index;
        table.set(i, MAIN_CATEGORY_COLUMN, row.result.main_category.as_str());
        table.set(i, SUB_CATEGORY_COLUMN, row.result.sub_category.as_str());
        table.set(i, CONFIDENCE_COLUMN, row.result.confidence.to_string());
        table.set(i, NEEDS_REVIEW_COLUMN, if row.needs_review { "yes" } else { "no" });
        table.set(i, SOURCE_COLUMN, row.source.as_str());
    }
}

/// 表をCSV文字列に変換
pub fn render_csv(table: &CsvTable) -> String {
    let mut out = String::new();
    push_line(&mut out, &table.headers);
    for record in &table.records {
        push_line(&mut out, record);
    }
    out
}

/// CSVファイルに書き出し
pub fn write_csv(path: &Path, table: &CsvTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, render_csv(table))?;
    Ok(())
}

fn push_line(out: &mut String, fields: &[String]) {
    let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
