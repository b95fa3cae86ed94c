//! 商品CSV読み込みモジュール
//!
//! Shopify / WooCommerce のエクスポートCSVを読み込み、
//! 照合に必要な (商品名, 説明, 既存カテゴリ) を取り出す。
//! 列名の揺れ（Title / Name / name 等）はここで吸収する。

use crate::error::{MapperError, Result};
use catalog_mapper_common::ProductText;
use clap::ValueEnum;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    static ref HTML_TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
}

/// エクスポート元プラットフォーム
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Platform {
    /// 列名から自動判定
    #[default]
    Auto,
    Shopify,
    #[value(name = "woocommerce")]
    WooCommerce,
}

impl Platform {
    /// ヘッダーからプラットフォームを推定
    pub fn detect(headers: &[String]) -> Self {
        let has = |name: &str| headers.iter().any(|h| h.trim() == name);
        if has("Handle") && has("Title") {
            Platform::Shopify
        } else if has("Name") && (has("Categories") || has("SKU") || has("Short description")) {
            Platform::WooCommerce
        } else {
            Platform::Auto
        }
    }

    fn name_fields(&self) -> &'static [&'static str] {
        match self {
            Platform::Shopify => &["Title"],
            Platform::WooCommerce => &["Name"],
            Platform::Auto => &["Title", "Name", "name", "Product Name", "title"],
        }
    }

    fn description_fields(&self) -> &'static [&'static str] {
        match self {
            Platform::Shopify => &["Body (HTML)"],
            Platform::WooCommerce => &["Description", "Short description"],
            Platform::Auto => &["Body (HTML)", "Description", "Short description", "description"],
        }
    }

    fn category_fields(&self) -> &'static [&'static str] {
        match self {
            Platform::Shopify => &["Product Category", "Type"],
            Platform::WooCommerce => &["Categories"],
            Platform::Auto => &["Product Category", "Type", "Categories", "category"],
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Auto => write!(f, "auto"),
            Platform::Shopify => write!(f, "shopify"),
            Platform::WooCommerce => write!(f, "woocommerce"),
        }
    }
}

/// CSV全体（ヘッダー＋レコード）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl CsvTable {
    /// CSVファイルから読み込み
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MapperError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// CSV文字列をパース
    ///
    /// - ダブルクォート内のカンマ・改行に対応
    /// - `""` はクォート内のダブルクォート
    /// - 空行は無視、列数はヘッダーに揃える
    pub fn parse(content: &str) -> Result<Self> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut records = parse_records(content)?.into_iter();

        let headers: Vec<String> = match records.next() {
            Some(h) => h.into_iter().map(|s| s.trim().to_string()).collect(),
            None => return Ok(Self::default()),
        };

        let records = records
            .enumerate()
            .map(|(i, mut r)| {
                if r.len() > headers.len() {
                    // 末尾の余分な空セル（行末カンマ）だけなら切り詰める
                    if r[headers.len()..].iter().any(|cell| !cell.trim().is_empty()) {
                        return Err(MapperError::CsvParse(format!(
                            "データ{}行目の列数({})がヘッダー({})を超えています",
                            i + 1,
                            r.len(),
                            headers.len()
                        )));
                    }
                    r.truncate(headers.len());
                }
                r.resize(headers.len(), String::new());
                Ok(r)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { headers, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 列番号
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// セルの値（列がなければ None）
    pub fn get(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column(name)?;
        self.records.get(row).and_then(|r| r.get(col)).map(String::as_str)
    }

    /// セルに値を設定（列がなければ末尾に追加）
    pub fn set(&mut self, row: usize, name: &str, value: impl Into<String>) {
        let col = self.ensure_column(name);
        if let Some(record) = self.records.get_mut(row) {
            record[col] = value.into();
        }
    }

    /// 列を追加（既にあればその列番号）
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(col) = self.column(name) {
            return col;
        }
        self.headers.push(name.to_string());
        for record in &mut self.records {
            record.push(String::new());
        }
        self.headers.len() - 1
    }

    /// 候補列のうち最初に値が入っているもの
    fn first_value(&self, row: usize, fields: &[&str]) -> Option<&str> {
        fields
            .iter()
            .filter_map(|f| self.get(row, f))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }
}

/// 照合対象の1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub row_index: usize,
    /// 商品名が空の行（Shopifyのバリエーション行など）は None
    pub product: Option<ProductText>,
    /// CSVに元々入っていたカテゴリ (メイン, サブ)
    pub existing_category: Option<(String, String)>,
}

/// 全行から照合対象を取り出す
pub fn extract_products(table: &CsvTable, platform: Platform) -> Vec<ProductInput> {
    let platform = match platform {
        Platform::Auto => Platform::detect(&table.headers),
        p => p,
    };

    (0..table.len())
        .map(|row| {
            let product = table.first_value(row, platform.name_fields()).map(|name| {
                let description = table
                    .first_value(row, platform.description_fields())
                    .map(strip_html)
                    .unwrap_or_default();
                ProductText::new(name, description)
            });
            let existing_category = table
                .first_value(row, platform.category_fields())
                .and_then(split_category_path);

            ProductInput {
                row_index: row,
                product,
                existing_category,
            }
        })
        .collect()
}

/// HTMLタグを除去し、主な文字参照を戻す
pub fn strip_html(html: &str) -> String {
    let text = HTML_TAG_RE.replace_all(html, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// "A > B > C, D" 形式のカテゴリを (A, C) に分解
///
/// 複数指定は先頭のみ使う。階層が1つならサブカテゴリは空。
fn split_category_path(value: &str) -> Option<(String, String)> {
    let first = value.split(',').next()?.trim();
    let parts: Vec<&str> = first
        .split('>')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        [] => None,
        [main] => Some((main.to_string(), String::new())),
        [main, .., sub] => Some((main.to_string(), sub.to_string())),
    }
}

/// レコード単位にパース（クォート内の改行を含む）
fn parse_records(content: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(MapperError::CsvParse("クォートが閉じていません".into()));
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }

    Ok(records)
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    // 空行はスキップ
    if record.len() == 1 && record[0].trim().is_empty() {
        return;
    }
    records.push(record);
}
