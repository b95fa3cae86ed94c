//! 一括カテゴリ判定パイプライン
//!
//! 1行ごとの判定順序:
//! 1. 履歴（類似商品の過去判定、要確認閾値以上なら採用）
//! 2. ローカル照合（rayon で並列）
//! 3. 閾値未満なら外部モデル（tokio タスク、同時実行数とタイムアウトを個別に制限）
//! 4. 修正マップ
//! 5. それでも該当なしなら CSV の既存カテゴリ、なければ Uncategorized
//!
//! 外部モデルの失敗・タイムアウトはローカル結果のまま続行する。

use crate::classifier::RemoteClassifier;
use crate::history::HistoryFile;
use crate::rows::ProductInput;
use catalog_mapper_common::{
    build_classification_prompt, interpret_remote_reply, CategoryMatcher, CorrectionMap, MatchResult, ProductText,
    Taxonomy, UNCATEGORIZED,
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// 判定結果の出どころ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    History,
    Local,
    Remote,
    /// CSVの既存カテゴリ、または Uncategorized
    Fallback,
    /// 利用者が確認・修正した
    Manual,
    /// 商品名のない行（判定対象外）
    Skipped,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::History => "history",
            MatchSource::Local => "local",
            MatchSource::Remote => "remote",
            MatchSource::Fallback => "fallback",
            MatchSource::Manual => "manual",
            MatchSource::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for MatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 1行分の判定結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedRow {
    pub row_index: usize,
    pub product_name: String,
    pub result: MatchResult,
    pub source: MatchSource,
    pub needs_review: bool,
}

/// パイプライン設定
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// これ未満の信頼度は要確認（外部モデルにも問い合わせる）
    pub review_threshold: u8,
    /// 外部モデル1件あたりのタイムアウト
    pub remote_timeout: Duration,
    /// 外部モデルの同時呼び出し数
    pub max_concurrency: usize,
    /// 進捗バーを表示する
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            review_threshold: 60,
            remote_timeout: Duration::from_secs(30),
            max_concurrency: 4,
            show_progress: false,
        }
    }
}

/// 集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub skipped: usize,
    pub history: usize,
    pub local: usize,
    pub remote: usize,
    pub fallback: usize,
    pub manual: usize,
    pub needs_review: usize,
}

impl BatchSummary {
    pub fn from_rows(rows: &[CategorizedRow]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Self::default()
        };
        for row in rows {
            match row.source {
                MatchSource::History => summary.history += 1,
                MatchSource::Local => summary.local += 1,
                MatchSource::Remote => summary.remote += 1,
                MatchSource::Fallback => summary.fallback += 1,
                MatchSource::Manual => summary.manual += 1,
                MatchSource::Skipped => summary.skipped += 1,
            }
            if row.needs_review {
                summary.needs_review += 1;
            }
        }
        summary
    }
}

/// 一括判定パイプライン
pub struct Pipeline {
    matcher: Arc<CategoryMatcher>,
    taxonomy: Arc<Taxonomy>,
    classifier: Option<Arc<dyn RemoteClassifier>>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(matcher: CategoryMatcher, taxonomy: Taxonomy, options: PipelineOptions) -> Self {
        Self {
            matcher: Arc::new(matcher),
            taxonomy: Arc::new(taxonomy),
            classifier: None,
            options,
        }
    }

    /// 外部モデルを使う
    pub fn with_classifier(mut self, classifier: Arc<dyn RemoteClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// 全行を判定
    ///
    /// 戻り値は入力と同じ順序・同じ件数。
    pub async fn run(&self, inputs: &[ProductInput], history: &HistoryFile) -> Vec<CategorizedRow> {
        let corrections = history.lookup_corrections();

        // 1-2. 履歴とローカル照合
        let mut staged = self.match_locally(inputs, history);

        // 3. 外部モデル
        if let Some(classifier) = &self.classifier {
            let targets: Vec<usize> = staged
                .iter()
                .enumerate()
                .filter(|(_, s)| s.source == MatchSource::Local && s.result.confidence < self.options.review_threshold)
                .map(|(i, _)| i)
                .collect();

            if !targets.is_empty() {
                info!(count = targets.len(), classifier = classifier.name(), "remote classification");
                let remote = self.classify_remote(classifier.clone(), inputs, &targets).await;
                for (i, result) in remote {
                    if result.confidence > staged[i].result.confidence {
                        staged[i].result = result;
                        staged[i].source = MatchSource::Remote;
                    }
                }
            }
        }

        // 4-5. 修正マップと最終フォールバック
        inputs
            .iter()
            .zip(staged)
            .map(|(input, stage)| self.finish(input, stage, &corrections))
            .collect()
    }

    /// 履歴とローカル照合（行ごとに独立なので並列）
    fn match_locally(&self, inputs: &[ProductInput], history: &HistoryFile) -> Vec<Stage> {
        let threshold = self.options.review_threshold;

        inputs
            .par_iter()
            .map(|input| {
                let Some(product) = &input.product else {
                    return Stage {
                        result: MatchResult::no_match(),
                        source: MatchSource::Skipped,
                    };
                };

                if let Some(hit) = history.lookup_similar(&product.name) {
                    if hit.confidence >= threshold {
                        match resolve_in_taxonomy(&self.taxonomy, &hit) {
                            Some(result) => {
                                return Stage {
                                    result,
                                    source: MatchSource::History,
                                }
                            }
                            None => debug!(
                                name = %product.name,
                                category = %hit.main_category,
                                sub_category = %hit.sub_category,
                                "history hit not in taxonomy"
                            ),
                        }
                    }
                }

                Stage {
                    result: self.matcher.match_product(product, &self.taxonomy),
                    source: MatchSource::Local,
                }
            })
            .collect()
    }

    /// 外部モデルで判定（失敗・タイムアウトは結果なし）
    async fn classify_remote(
        &self,
        classifier: Arc<dyn RemoteClassifier>,
        inputs: &[ProductInput],
        targets: &[usize],
    ) -> Vec<(usize, MatchResult)> {
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let progress = self.progress_bar(targets.len());
        let timeout = self.options.remote_timeout;
        let mut tasks = JoinSet::new();

        for &i in targets {
            let Some(product) = inputs[i].product.clone() else {
                continue;
            };
            let prompt = build_classification_prompt(&self.taxonomy, &product);
            let classifier = classifier.clone();
            let taxonomy = self.taxonomy.clone();
            let semaphore = semaphore.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                let result = classify_one(classifier.as_ref(), &prompt, &product, &taxonomy, timeout).await;
                result.map(|r| (i, r))
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            progress.inc(1);
            match joined {
                Ok(Some(hit)) => results.push(hit),
                Ok(None) => {}
                Err(e) => warn!("外部モデルのタスクが異常終了しました: {}", e),
            }
        }
        progress.finish_and_clear();

        results
    }

    /// 修正マップ・フォールバックを適用して確定
    fn finish(&self, input: &ProductInput, stage: Stage, corrections: &CorrectionMap) -> CategorizedRow {
        let product_name = input
            .product
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default();

        if stage.source == MatchSource::Skipped {
            return CategorizedRow {
                row_index: input.row_index,
                product_name,
                result: stage.result,
                source: MatchSource::Skipped,
                needs_review: false,
            };
        }

        let (result, source) = if stage.result.is_no_match() {
            let (main, sub) = input
                .existing_category
                .clone()
                .unwrap_or_else(|| (UNCATEGORIZED.to_string(), UNCATEGORIZED.to_string()));
            debug!(name = %product_name, category = %main, "fallback category");
            (MatchResult::new(main, sub, 0), MatchSource::Fallback)
        } else {
            (corrections.apply(&stage.result), stage.source)
        };

        CategorizedRow {
            row_index: input.row_index,
            product_name,
            needs_review: result.needs_review(self.options.review_threshold),
            result,
            source,
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("  [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} 外部モデルで判定中...")
        {
            pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        pb
    }
}

/// 1件分の外部モデル判定
async fn classify_one(
    classifier: &dyn RemoteClassifier,
    prompt: &str,
    product: &ProductText,
    taxonomy: &Taxonomy,
    timeout: Duration,
) -> Option<MatchResult> {
    match tokio::time::timeout(timeout, classifier.classify(prompt)).await {
        Ok(Ok(reply)) => {
            let verdict = interpret_remote_reply(&reply, taxonomy);
            if verdict.no_match {
                debug!(name = %product.name, "remote classifier found no match");
                return None;
            }
            Some(verdict.to_match_result())
        }
        Ok(Err(e)) => {
            warn!("外部モデルの呼び出しに失敗しました ({}): {}", product.name, e);
            None
        }
        Err(_) => {
            warn!(
                "外部モデルが{}秒以内に応答しませんでした ({})",
                timeout.as_secs_f64(),
                product.name
            );
            None
        }
    }
}

/// 履歴の判定を現在のカテゴリ体系に照らし合わせる
///
/// カテゴリとサブカテゴリ（サブカテゴリのないカテゴリなら空）が体系内に
/// あれば、体系側の表記に揃えて返す。
fn resolve_in_taxonomy(taxonomy: &Taxonomy, hit: &MatchResult) -> Option<MatchResult> {
    let category = taxonomy.find_category(&hit.main_category)?;
    if hit.sub_category.trim().is_empty() {
        return category
            .subcategories
            .is_empty()
            .then(|| MatchResult::new(&category.name, "", hit.confidence));
    }
    let sub = category.find_subcategory(&hit.sub_category)?;
    Some(MatchResult::new(&category.name, &sub.name, hit.confidence))
}

/// 確定した判定を履歴に記録
///
/// 要確認閾値以上で、履歴・フォールバック以外のものだけを記録する。
/// 戻り値は記録した件数。
pub fn record_decisions(history: &mut HistoryFile, rows: &[CategorizedRow], threshold: u8) -> usize {
    let mut recorded = 0;
    for row in rows {
        let worth_saving = matches!(row.source, MatchSource::Local | MatchSource::Remote | MatchSource::Manual)
            && row.result.confidence >= threshold;
        if worth_saving {
            history.save_mapping(&row.product_name, &row.result);
            recorded += 1;
        }
    }
    recorded
}

struct Stage {
    result: MatchResult,
    source: MatchSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(source: MatchSource, confidence: u8, needs_review: bool) -> CategorizedRow {
        CategorizedRow {
            row_index: 0,
            product_name: "Thing".into(),
            result: MatchResult::new("A", "B", confidence),
            source,
            needs_review,
        }
    }

    #[test]
    fn test_summary_counts() {
        let rows = vec![
            row(MatchSource::Local, 95, false),
            row(MatchSource::Local, 40, true),
            row(MatchSource::Remote, 80, false),
            row(MatchSource::Fallback, 0, true),
            row(MatchSource::Skipped, 0, false),
        ];
        let summary = BatchSummary::from_rows(&rows);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.local, 2);
        assert_eq!(summary.remote, 1);
        assert_eq!(summary.fallback, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.needs_review, 2);
    }

    #[test]
    fn test_record_decisions_only_confident() {
        let rows = vec![
            row(MatchSource::Local, 95, false),
            row(MatchSource::Local, 40, true),
            row(MatchSource::History, 90, false),
            row(MatchSource::Fallback, 0, true),
        ];
        let mut history = HistoryFile::default();
        assert_eq!(record_decisions(&mut history, &rows, 60), 1);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_source_names() {
        assert_eq!(MatchSource::Remote.to_string(), "remote");
        assert_eq!(MatchSource::Skipped.as_str(), "skipped");
    }
}
