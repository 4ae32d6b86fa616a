//! 句子翻译应用 - 编排层
//!
//! ## 核心流程
//!
//! 1. **读取句子**：从配置的 JSON 文件加载句子列表
//! 2. **切分任务**：按 `sentence_batch_size` 均匀切段，只打乱任务顺序，句子顺序不变
//! 3. **启动 worker**：与抓经文共用 `worker_pool::run_workers`
//! 4. **汇总输出**：`{源}_{目标}_{对照}_parallel.json` 和成功率统计
//!
//! 检查点在 `translation_output_root` 下查找，不会和抓经文的运行混在一起。

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::Translator;
use crate::models::{ChapterRange, ChunkFailure, ResultOrigin, SentenceBatchResult, SentencePair};
use crate::orchestrator::context::RunContext;
use crate::orchestrator::worker_pool::run_workers;
use crate::services::{build_sentence_tasks, load_sentences, write_json};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::utils::RunLog;

/// 单次翻译运行的汇总
#[derive(Debug, Default)]
pub struct TranslationSummary {
    pub total_tasks: usize,
    pub workers: usize,
    pub clean: usize,
    pub partial: usize,
    pub cached: usize,
    pub records: usize,
    pub successful: usize,
    pub failed: usize,
    /// (任务句子范围, 失败段)
    pub failures: Vec<(ChapterRange, ChunkFailure)>,
    pub output_path: Option<PathBuf>,
}

impl TranslationSummary {
    /// 成功译出的记录占比（百分数）
    pub fn success_rate(&self) -> f64 {
        if self.records == 0 {
            return 0.0;
        }
        self.successful as f64 / self.records as f64 * 100.0
    }
}

/// 句子翻译应用
pub struct TranslationApp<T: Translator> {
    run: Arc<RunContext<T>>,
}

impl<T: Translator> TranslationApp<T> {
    /// `config.output_root` 会被换成 `translation_output_root`
    pub fn new(config: Config, translator: T, run_dir: impl Into<PathBuf>, run_log: Option<RunLog>) -> Self {
        let config = Config {
            output_root: config.translation_output_root.clone(),
            ..config
        };
        Self {
            run: Arc::new(RunContext::new(config, translator, run_dir, run_log)),
        }
    }

    pub fn context(&self) -> &RunContext<T> {
        &self.run
    }

    /// 从配置的句子文件运行
    pub async fn run(&self) -> Result<TranslationSummary> {
        let path = self
            .run
            .config
            .sentences_file
            .clone()
            .context("没有配置句子文件 (sentences_file / SENTENCES_FILE)")?;
        let pairs = load_sentences(&path)?;
        self.run_with(pairs).await
    }

    /// 翻译给定的句子列表
    pub async fn run_with(&self, pairs: Vec<SentencePair>) -> Result<TranslationSummary> {
        let config = &self.run.config;
        let tasks = {
            let mut rng = rand::thread_rng();
            build_sentence_tasks(&pairs, &config.languages, config.sentence_batch_size, &mut rng)
        };
        if tasks.is_empty() {
            warn!("⚠️ 没有需要翻译的句子，程序结束");
            return Ok(TranslationSummary::default());
        }

        let total_tasks = tasks.len();
        let workers = config.max_workers.min(total_tasks).max(1);
        self.run.scheduler.set_max_workers(workers);
        log_startup(workers, total_tasks);
        info!(
            "🌐 翻译方向 {}, 共 {} 个句子",
            config.languages.direction(),
            pairs.len()
        );

        let mut results = run_workers(self.run.clone(), tasks, workers, config.queue_timeout()).await;
        // 按句子顺序写出
        results.sort_by_key(|result| result.range.start);

        let mut summary = summarize(&results, total_tasks, workers);
        summary.output_path = self.write_output(&results)?;
        log_summary(&summary, self.run.run_dir());
        Ok(summary)
    }

    fn write_output(&self, results: &[SentenceBatchResult]) -> Result<Option<PathBuf>> {
        let languages = &self.run.config.languages;
        let values: Vec<JsonValue> = results
            .iter()
            .flat_map(|result| result.records.iter())
            .map(|record| record.to_json(languages))
            .collect();

        let path = self.run.run_dir().join(languages.output_file());
        match write_json(&path, &values) {
            Ok(true) => Ok(Some(path)),
            Ok(false) => Ok(None),
            Err(e) => {
                error!("写出平行语料失败: {}", e);
                Err(e)
            }
        }
    }
}

fn summarize(results: &[SentenceBatchResult], total_tasks: usize, workers: usize) -> TranslationSummary {
    let mut summary = TranslationSummary {
        total_tasks,
        workers,
        ..Default::default()
    };

    for result in results {
        summary.records += result.records.len();
        let failed = result.records.iter().filter(|r| r.is_failed()).count();
        summary.failed += failed;
        summary.successful += result.records.len() - failed;
        if result.origin == ResultOrigin::Checkpoint {
            summary.cached += 1;
        }
        if result.is_checkpointable() {
            summary.clean += 1;
        } else {
            summary.partial += 1;
        }
        for failure in &result.failures {
            summary.failures.push((result.range, failure.clone()));
        }
    }
    summary
}

fn log_summary(summary: &TranslationSummary, run_dir: &Path) {
    for (range, failure) in &summary.failures {
        warn!(
            "❌ 任务 {} 中句子 {}: {}",
            range, failure.range, failure.reason
        );
    }
    info!(
        "📝 记录 {} 条, 成功 {} 条, 失败 {} 条, 成功率 {:.1}%",
        summary.records,
        summary.successful,
        summary.failed,
        summary.success_rate()
    );
    if summary.successful == 0 {
        warn!("⚠️ 没有译出任何句子，所有任务都失败了");
    }
    print_final_stats(
        summary.clean,
        summary.partial,
        summary.cached,
        summary.total_tasks,
        run_dir,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureReason, Languages, SentenceTask, TranslationRecord};

    fn result(origin: ResultOrigin, ok: usize, failed: usize) -> SentenceBatchResult {
        let pairs: Vec<SentencePair> = (0..failed)
            .map(|i| SentencePair {
                source: format!("s{}", i),
                original: format!("s{}", i),
            })
            .collect();
        let task = SentenceTask {
            id: 1,
            languages: Languages::default(),
            range: ChapterRange::new(1, (ok + failed) as u32),
            pairs: pairs.clone(),
        };
        let mut result = SentenceBatchResult::empty(&task, origin);
        for i in 0..ok {
            result.records.push(TranslationRecord {
                source: format!("ok{}", i),
                target: "da".into(),
                original: format!("ok{}", i),
            });
        }
        if failed > 0 {
            result.record_failure(task.range, FailureReason::NotFound("none".into()), &pairs);
        }
        result
    }

    #[test]
    fn test_summarize_counts_records_and_tasks() {
        let results = vec![
            result(ResultOrigin::Fresh, 3, 0),
            result(ResultOrigin::Checkpoint, 2, 0),
            result(ResultOrigin::Fresh, 1, 2),
        ];
        let summary = summarize(&results, 3, 2);

        assert_eq!(summary.clean, 2);
        assert_eq!(summary.partial, 1);
        assert_eq!(summary.cached, 1);
        assert_eq!(summary.records, 8);
        assert_eq!(summary.successful, 6);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.failures.len(), 1);
        assert!((summary.success_rate() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_summary_rate_is_zero() {
        assert_eq!(TranslationSummary::default().success_rate(), 0.0);
    }
}
