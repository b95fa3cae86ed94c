use catalog_mapper::{ai_provider, classifier, cli, config, error, history, pipeline, review, rows, writer};
use catalog_mapper_common::{build_classification_prompt, CategoryMatcher, Correction, ProductText, TermTable, Taxonomy};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use error::{MapperError, Result};
use history::HistoryFile;
use pipeline::{record_decisions, BatchSummary, Pipeline, PipelineOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Categorize {
            input,
            taxonomy,
            output,
            platform,
            threshold,
            ai,
            provider,
            terms,
            history,
            no_history,
            concurrency,
            timeout,
        } => {
            println!("🏷  catalog-mapper - カテゴリ判定\n");

            // 1. 読み込み
            println!("[1/4] 商品CSVとカテゴリ体系を読み込み中...");
            let taxonomy = Taxonomy::from_file(&taxonomy)?;
            let mut table = rows::CsvTable::from_file(&input)?;
            let products = rows::extract_products(&table, platform);
            let named = products.iter().filter(|p| p.product.is_some()).count();
            println!(
                "✔ {}行（判定対象 {}件）、カテゴリ {}件\n",
                table.len(),
                named,
                taxonomy.len()
            );

            if named == 0 {
                return Err(MapperError::NoProductsFound(input.display().to_string()));
            }

            // 2. 判定
            let history_path = resolve_history_path(history)?;
            let mut history = if no_history {
                HistoryFile::default()
            } else {
                HistoryFile::load(&history_path)
            };

            let threshold = threshold.unwrap_or(config.review_threshold);
            let options = PipelineOptions {
                review_threshold: threshold,
                remote_timeout: Duration::from_secs(timeout.unwrap_or(config.timeout_seconds)),
                max_concurrency: concurrency.unwrap_or(config.max_concurrency),
                show_progress: !cli.verbose,
            };

            let matcher = CategoryMatcher::new(load_terms(terms.as_deref())?, config.matcher_config());
            let mut batch = Pipeline::new(matcher, taxonomy, options);

            if ai {
                let provider = provider.unwrap_or(config.provider);
                let remote = classifier::build_classifier(&config, provider)?;
                println!("[2/4] 判定中...（外部モデル: {}）", provider.display_name());
                batch = batch.with_classifier(remote);
            } else {
                println!("[2/4] 判定中...");
            }

            let results = batch.run(&products, &history).await;
            let summary = BatchSummary::from_rows(&results);
            println!("✔ 判定完了\n");

            // 3. 出力
            println!("[3/4] 結果を保存中...");
            let output = output.unwrap_or_else(|| default_output_path(&input));
            writer::apply_results(&mut table, &results);
            writer::write_csv(&output, &table)?;
            println!("✔ 結果を保存: {}\n", output.display());

            // 4. 履歴
            if !no_history {
                println!("[4/4] 履歴を更新中...");
                let recorded = record_decisions(&mut history, &results, threshold);
                if history.save_with_retry(&history_path) {
                    println!("✔ {}件を履歴に記録\n", recorded);
                } else {
                    println!("⚠ 履歴を保存できませんでした（判定結果は出力済み）\n");
                }
            }

            print_summary(&summary);
            println!("\n✅ 完了");
        }

        Commands::Match {
            name,
            taxonomy,
            description,
            terms,
            json,
        } => {
            let taxonomy = Taxonomy::from_file(&taxonomy)?;
            let matcher = CategoryMatcher::new(load_terms(terms.as_deref())?, config.matcher_config());
            let result = matcher.match_product(&ProductText::new(&name, &description), &taxonomy);

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if result.is_no_match() {
                println!("該当なし: {}", name);
            } else {
                println!("{}", name);
                println!("  カテゴリ: {}", result.main_category);
                println!("  サブカテゴリ: {}", result.sub_category);
                println!("  信頼度: {}", result.confidence);
                if result.needs_review(config.review_threshold) {
                    println!("  ⚠ 要確認（閾値 {}）", config.review_threshold);
                }
            }
        }

        Commands::Prompt {
            name,
            taxonomy,
            description,
        } => {
            let taxonomy = Taxonomy::from_file(&taxonomy)?;
            println!("{}", build_classification_prompt(&taxonomy, &ProductText::new(name, description)));
        }

        Commands::Review {
            input,
            taxonomy,
            output,
            name_column,
            terms,
            history,
        } => {
            println!("🔎 catalog-mapper - レビュー\n");
            let taxonomy = Taxonomy::from_file(&taxonomy)?;
            let terms = load_terms(terms.as_deref())?;
            let history_path = resolve_history_path(history)?;
            let mut history = HistoryFile::load(&history_path);

            let reviewed = review::run_interactive_review(
                &input,
                output.as_deref(),
                &taxonomy,
                &terms,
                &mut history,
                &name_column,
            )?;

            if reviewed > 0 && !history.save_with_retry(&history_path) {
                println!("⚠ 履歴を保存できませんでした");
            }
        }

        Commands::Correct {
            from,
            to_main,
            to_sub,
            history,
        } => {
            let (from_main, from_sub) = from
                .split_once('|')
                .map(|(m, s)| (m.trim(), s.trim()))
                .unwrap_or((from.trim(), ""));
            if from_main.is_empty() {
                return Err(MapperError::Config("--from は \"カテゴリ|サブカテゴリ\" 形式で指定してください".into()));
            }

            let history_path = resolve_history_path(history)?;
            let mut history = HistoryFile::load(&history_path);
            history.save_correction(from_main, from_sub, Correction::new(&to_main, &to_sub));
            history.save(&history_path)?;
            println!("✔ 修正を登録しました: {}|{} → {}|{}", from_main, from_sub, to_main, to_sub);
        }

        Commands::History { info, clear, history } => {
            let history_path = resolve_history_path(history)?;

            if info || !clear {
                // デフォルトまたは--info: 情報表示
                if history_path.exists() {
                    let history = HistoryFile::load(&history_path);
                    println!("履歴情報:");
                    println!("  パス: {}", history_path.display());
                    println!("  判定件数: {}", history.len());
                    println!("  修正件数: {}", history.corrections_len());
                    if let Ok(meta) = std::fs::metadata(&history_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("履歴ファイルが存在しません: {}", history_path.display());
                }
            }

            if clear {
                match HistoryFile::clear(&history_path) {
                    Ok(true) => println!("✔ 履歴を削除しました: {}", history_path.display()),
                    Ok(false) => println!("履歴ファイルが存在しません"),
                    Err(e) => println!("履歴削除エラー: {}", e),
                }
            }
        }

        Commands::Config {
            set_api_key,
            set_provider,
            set_threshold,
            show,
        } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if let Some(provider) = set_provider {
                config.provider = provider;
                config.save()?;
                println!("✔ 外部モデルを設定しました: {}", provider.display_name());
            }

            if let Some(threshold) = set_threshold {
                config.review_threshold = threshold.min(100);
                config.save()?;
                println!("✔ 要確認の閾値を設定しました: {}", config.review_threshold);
            }

            if show {
                print_config(&config);
            }
        }
    }

    Ok(())
}

/// ログ出力の初期化（RUST_LOG 優先、--verbose で debug）
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "catalog_mapper={level},catalog_mapper_common={level}",
                level = default_level
            ))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_terms(extra: Option<&Path>) -> Result<TermTable> {
    let mut table = TermTable::builtin();
    if let Some(path) = extra {
        table.merge(&TermTable::from_file(path)?);
    }
    Ok(table)
}

fn resolve_history_path(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p),
        None => HistoryFile::default_path(),
    }
}

/// products.csv → products_categorized.csv
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "products".into());
    input.with_file_name(format!("{}_categorized.csv", stem))
}

fn print_summary(summary: &BatchSummary) {
    println!("集計:");
    println!("  合計: {}行", summary.total);
    println!("  履歴: {}件", summary.history);
    println!("  ローカル照合: {}件", summary.local);
    println!("  外部モデル: {}件", summary.remote);
    println!("  フォールバック: {}件", summary.fallback);
    println!("  スキップ: {}行", summary.skipped);
    println!("  要確認: {}件", summary.needs_review);
}

fn print_config(config: &Config) {
    let provider: ai_provider::AiProvider = config.provider;
    println!("設定:");
    println!("  外部モデル: {}", provider.display_name());
    println!("  モデル: {}", config.model);
    println!("  タイムアウト: {}秒", config.timeout_seconds);
    println!("  同時呼び出し数: {}", config.max_concurrency);
    println!("  要確認の閾値: {}", config.review_threshold);
    println!("  直接一致の最低重み: {}", config.direct_match_floor);
    println!("  衣料カテゴリ: {}", config.apparel_category);
    if provider.requires_api_key() {
        println!(
            "  APIキー: {}",
            if config.get_api_key().is_ok() { "設定済み" } else { "未設定" }
        );
    }
}
