use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`catalog-mapper config --set-api-key YOUR_KEY` で設定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("CSV解析エラー: {0}")]
    CsvParse(String),

    #[error("商品行が見つかりません: {0}")]
    NoProductsFound(String),

    #[error("照合エンジンエラー: {0}")]
    Engine(#[from] catalog_mapper_common::Error),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),
}

pub type Result<T> = std::result::Result<T, MapperError>;
