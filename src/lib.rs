//! catalog-mapper
//!
//! 商品CSVの読み込み、外部分類モデルとの連携、判定履歴、一括判定パイプライン。
//! カテゴリ照合そのものは `catalog_mapper_common` が担う。

pub mod ai_provider;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod review;
pub mod rows;
pub mod writer;
