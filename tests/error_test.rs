//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use catalog_mapper::config::Config;
use catalog_mapper::error::MapperError;
use catalog_mapper::rows::CsvTable;
use catalog_mapper_common::{TermTable, Taxonomy};
use std::path::Path;
use tempfile::tempdir;

/// 存在しないCSVを読み込んだ場合
#[test]
fn test_missing_csv() {
    let result = CsvTable::from_file(Path::new("/nonexistent/path/products.csv"));
    assert!(matches!(result, Err(MapperError::FileNotFound(_))));
}

/// 空のCSVはエラーではなく空の表
#[test]
fn test_empty_csv() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, "").unwrap();

    let table = CsvTable::from_file(&path).unwrap();
    assert!(table.is_empty());
    assert!(table.headers.is_empty());
}

/// 壊れたカテゴリ体系
#[test]
fn test_invalid_taxonomy() {
    assert!(Taxonomy::from_json_str("null").is_err());
    assert!(Taxonomy::from_json_str("{ broken").is_err());

    let err: MapperError = Taxonomy::from_file(Path::new("/nonexistent/taxonomy.json"))
        .unwrap_err()
        .into();
    assert!(matches!(err, MapperError::Engine(_)));
}

/// 壊れた用語テーブル
#[test]
fn test_invalid_term_table() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("terms.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    assert!(TermTable::from_file(&path).is_err());
}

/// 壊れた設定ファイル
#[test]
fn test_invalid_config() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "not json").unwrap();

    let result = Config::load_from(&path);
    assert!(matches!(result, Err(MapperError::JsonParse(_))));
}

/// MapperErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        MapperError::Config("テスト設定エラー".to_string()),
        MapperError::MissingApiKey,
        MapperError::FileNotFound("products.csv".to_string()),
        MapperError::CsvParse("クォートが閉じていません".to_string()),
        MapperError::NoProductsFound("products.csv".to_string()),
        MapperError::ApiCall("API呼び出し失敗".to_string()),
        MapperError::CliExecution("claude: not found".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// 照合エンジンのエラーは変換される
#[test]
fn test_engine_error_conversion() {
    let engine = catalog_mapper_common::Error::Taxonomy("カテゴリがありません".into());
    let err: MapperError = engine.into();
    assert!(err.to_string().contains("カテゴリがありません"));
}
