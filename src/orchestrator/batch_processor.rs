//! 批量任务处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个抓取流程的入口，负责任务分发、worker 生命周期和最终输出。
//!
//! ## 核心流程
//!
//! 1. **切分任务**：书卷 × 译本 × 章节段，打乱顺序
//! 2. **启动 worker**：数量不超过任务数，交给 `worker_pool::run_workers`
//! 3. **等待完成**：所有任务被标记完成后 worker 退出
//! 4. **汇总输出**：单译本文本、平行语料 JSON、统计信息
//!
//! ## 设计特点
//!
//! - **资源所有者**：持有 `RunContext`，worker 只拿到 `Arc`
//! - **失败隔离**：单个任务 panic 只影响它自己的结果

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::Extractor;
use crate::models::{BatchResult, ChapterFailure, MergeStats, MergedVerse, ResultOrigin, VersionId};
use crate::orchestrator::context::RunContext;
use crate::orchestrator::worker_pool::run_workers;
use crate::services::{build_tasks, merge_corpus, write_json, write_version_text};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::utils::RunLog;

pub const CORPUS_FILE: &str = "parallel_corpus.json";

/// 单次运行的汇总
#[derive(Debug, Default)]
pub struct RunSummary {
    pub total_tasks: usize,
    pub workers: usize,
    pub clean: usize,
    pub partial: usize,
    pub cached: usize,
    pub entries: usize,
    /// (任务标签, 章节失败)
    pub failures: Vec<(String, ChapterFailure)>,
    pub merge: MergeStats,
    pub corpus: Vec<MergedVerse>,
    pub corpus_path: Option<PathBuf>,
}

/// 应用主结构
pub struct App<E: Extractor> {
    run: Arc<RunContext<E>>,
}

impl<E: Extractor> App<E> {
    pub fn new(config: Config, extractor: E, run_dir: impl Into<PathBuf>, run_log: Option<RunLog>) -> Self {
        Self {
            run: Arc::new(RunContext::new(config, extractor, run_dir, run_log)),
        }
    }

    pub fn context(&self) -> &RunContext<E> {
        &self.run
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunSummary> {
        let config = &self.run.config;
        let books = config.resolve_books()?;
        let versions = config.resolve_versions()?;

        let tasks = {
            let mut rng = rand::thread_rng();
            build_tasks(&books, &versions, config.batch_size, &mut rng)
        };
        if tasks.is_empty() {
            warn!("⚠️ 没有需要处理的任务，程序结束");
            return Ok(RunSummary::default());
        }

        let total_tasks = tasks.len();
        let workers = config.max_workers.min(total_tasks).max(1);
        self.run.scheduler.set_max_workers(workers);
        log_startup(workers, total_tasks);

        let results = run_workers(self.run.clone(), tasks, workers, config.queue_timeout()).await;

        let mut summary = summarize(&results, total_tasks, workers);
        self.write_outputs(&results, &versions, &mut summary)?;
        log_summary(&summary, self.run.run_dir());

        Ok(summary)
    }

    /// 写出单译本文本与平行语料
    fn write_outputs(
        &self,
        results: &[BatchResult],
        versions: &[VersionId],
        summary: &mut RunSummary,
    ) -> Result<()> {
        let run_dir = self.run.run_dir();
        let entries: Vec<_> = results.iter().flat_map(|r| r.entries.iter().cloned()).collect();

        for &version in versions {
            if let Err(e) = write_version_text(run_dir, version, &entries) {
                error!("写出 {} 文本失败: {}", version, e);
            }
        }

        let (corpus, stats) = merge_corpus(&entries, versions);
        let corpus_path = run_dir.join(CORPUS_FILE);
        match write_json(&corpus_path, &corpus) {
            Ok(true) => summary.corpus_path = Some(corpus_path),
            Ok(false) => {}
            Err(e) => error!("写出平行语料失败: {}", e),
        }

        summary.merge = stats;
        summary.corpus = corpus;
        Ok(())
    }
}

fn summarize(results: &[BatchResult], total_tasks: usize, workers: usize) -> RunSummary {
    let mut summary = RunSummary {
        total_tasks,
        workers,
        ..Default::default()
    };

    for result in results {
        summary.entries += result.entries.len();
        if result.origin == ResultOrigin::Checkpoint {
            summary.cached += 1;
        }
        if result.is_checkpointable() {
            summary.clean += 1;
        } else {
            summary.partial += 1;
        }
        let label = format!(
            "{} {} chapters {}",
            result.version.suffix(),
            result.book.abbr,
            result.range
        );
        for failure in &result.failures {
            summary.failures.push((label.clone(), failure.clone()));
        }
    }
    summary
}

fn log_summary(summary: &RunSummary, run_dir: &Path) {
    for (label, failure) in &summary.failures {
        warn!("❌ {} 第 {} 章: {}", label, failure.chapter, failure.reason);
    }
    info!(
        "📚 经文 {} 节, 合并 {} 条, 缺译本 {} 条",
        summary.entries, summary.merge.merged_records, summary.merge.incomplete_records
    );
    if summary.entries == 0 {
        warn!("⚠️ 没有抓到任何经文，所有任务都失败了");
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
    use crate::models::{find_book, ChapterRange, Entry, FailureReason, Task};

    fn result(origin: ResultOrigin, errors: usize) -> BatchResult {
        let task = Task {
            id: 1,
            book: find_book("Mark").unwrap(),
            version: VersionId::Niv,
            range: ChapterRange::new(1, 2),
        };
        let mut result = BatchResult::empty(&task, origin);
        result.entries.push(Entry {
            book_id: 48,
            book_name: "Mark".into(),
            chapter: 1,
            verse: 1,
            version: VersionId::Niv,
            text: "x".into(),
        });
        for chapter in 0..errors {
            result.error_count += 1;
            result.failures.push(ChapterFailure {
                chapter: chapter as u32 + 1,
                reason: FailureReason::NotFound("gone".into()),
            });
        }
        result
    }

    #[test]
    fn test_summarize_counts_outcomes() {
        let results = vec![
            result(ResultOrigin::Fresh, 0),
            result(ResultOrigin::Checkpoint, 0),
            result(ResultOrigin::Fresh, 2),
        ];
        let summary = summarize(&results, 3, 2);

        assert_eq!(summary.clean, 2);
        assert_eq!(summary.partial, 1);
        assert_eq!(summary.cached, 1);
        assert_eq!(summary.entries, 3);
        assert_eq!(summary.failures.len(), 2);
        assert_eq!(summary.failures[0].0, "NIV MRK chapters 1-2");
    }
}
