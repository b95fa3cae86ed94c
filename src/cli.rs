use clap::{Parser, Subcommand};
use crate::ai_provider::AiProvider;
use crate::rows::Platform;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "catalog-mapper")]
#[command(about = "ECサイト商品カテゴリ自動判定ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 商品CSVを一括でカテゴリ判定
    Categorize {
        /// 商品CSV（Shopify / WooCommerce エクスポート）
        #[arg(required = true)]
        input: PathBuf,

        /// カテゴリ体系JSON
        #[arg(short, long, required = true)]
        taxonomy: PathBuf,

        /// 出力CSV（デフォルト: 入力ファイル名_categorized.csv）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// エクスポート元
        #[arg(short, long, default_value = "auto")]
        platform: Platform,

        /// 要確認とする信頼度（デフォルト: 設定ファイルの値）
        #[arg(long)]
        threshold: Option<u8>,

        /// 信頼度が低い商品を外部モデルに問い合わせる
        #[arg(long)]
        ai: bool,

        /// 外部モデルの呼び出し方法（デフォルト: 設定ファイルの値）
        #[arg(long)]
        provider: Option<AiProvider>,

        /// 追加の用語テーブルJSON
        #[arg(long)]
        terms: Option<PathBuf>,

        /// 履歴ファイル（デフォルト: ~/.config/catalog-mapper/history.json）
        #[arg(long)]
        history: Option<PathBuf>,

        /// 履歴を使わない
        #[arg(long)]
        no_history: bool,

        /// 外部モデルの同時呼び出し数
        #[arg(long)]
        concurrency: Option<usize>,

        /// 外部モデル1件あたりのタイムアウト（秒）
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// 商品名1件を判定
    Match {
        /// 商品名
        #[arg(required = true)]
        name: String,

        /// カテゴリ体系JSON
        #[arg(short, long, required = true)]
        taxonomy: PathBuf,

        /// 商品説明
        #[arg(short, long, default_value = "")]
        description: String,

        /// 追加の用語テーブルJSON
        #[arg(long)]
        terms: Option<PathBuf>,

        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 外部モデル用のプロンプトを表示
    Prompt {
        /// 商品名
        #[arg(required = true)]
        name: String,

        /// カテゴリ体系JSON
        #[arg(short, long, required = true)]
        taxonomy: PathBuf,

        /// 商品説明
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// 要確認の商品を対話式で確定
    Review {
        /// categorize の出力CSV
        #[arg(required = true)]
        input: PathBuf,

        /// カテゴリ体系JSON
        #[arg(short, long, required = true)]
        taxonomy: PathBuf,

        /// 出力CSV（デフォルト: 入力ファイルを上書き）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 商品名の列
        #[arg(long, default_value = "Title")]
        name_column: String,

        /// 追加の用語テーブルJSON
        #[arg(long)]
        terms: Option<PathBuf>,

        /// 履歴ファイル
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// カテゴリの修正を登録
    Correct {
        /// 修正元 "カテゴリ|サブカテゴリ"
        #[arg(long, required = true)]
        from: String,

        /// 修正先カテゴリ
        #[arg(long, required = true)]
        to_main: String,

        /// 修正先サブカテゴリ
        #[arg(long, default_value = "")]
        to_sub: String,

        /// 履歴ファイル
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// 判定履歴を管理
    History {
        /// 履歴情報を表示
        #[arg(long)]
        info: bool,

        /// 履歴を削除
        #[arg(long)]
        clear: bool,

        /// 履歴ファイル
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// 設定を管理
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 外部モデルの呼び出し方法を設定
        #[arg(long)]
        set_provider: Option<AiProvider>,

        /// 要確認の閾値を設定
        #[arg(long)]
        set_threshold: Option<u8>,

        /// 現在の設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_categorize() {
        let cli = Cli::parse_from([
            "catalog-mapper",
            "categorize",
            "products.csv",
            "-t",
            "taxonomy.json",
            "--platform",
            "woocommerce",
            "--ai",
            "--provider",
            "claude-cli",
            "--threshold",
            "70",
        ]);
        match cli.command {
            Commands::Categorize {
                input,
                platform,
                ai,
                provider,
                threshold,
                ..
            } => {
                assert_eq!(input, PathBuf::from("products.csv"));
                assert_eq!(platform, Platform::WooCommerce);
                assert!(ai);
                assert_eq!(provider, Some(AiProvider::ClaudeCli));
                assert_eq!(threshold, Some(70));
            }
            _ => panic!("expected categorize"),
        }
    }

    #[test]
    fn test_parse_review_with_terms() {
        let cli = Cli::parse_from([
            "catalog-mapper",
            "review",
            "out.csv",
            "-t",
            "taxonomy.json",
            "--terms",
            "extra.json",
        ]);
        match cli.command {
            Commands::Review { input, terms, name_column, .. } => {
                assert_eq!(input, PathBuf::from("out.csv"));
                assert_eq!(terms, Some(PathBuf::from("extra.json")));
                assert_eq!(name_column, "Title");
            }
            _ => panic!("expected review"),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::parse_from(["catalog-mapper", "history", "--info", "-v"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_verify_command_tree() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
