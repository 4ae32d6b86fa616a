//! 运行上下文
//!
//! 每次运行创建一个，通过 `Arc` 注入所有 worker；进程内没有全局可变状态。
//! 检查点读写和日志筛选是阻塞文件 I/O，统一放到 `spawn_blocking` 上执行。

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

use crate::config::Config;
use crate::services::{CheckpointKey, CheckpointStore, PacingConfig, PacingScheduler};
use crate::utils::logging::log_task_complete;
use crate::utils::RunLog;

pub const FILTERED_LOG_DIR: &str = "filtered_logs";

/// 单次运行共享的资源
///
/// `backend` 是抽取器或翻译器，每个任务从它打开自己的会话。
pub struct RunContext<B> {
    pub config: Config,
    pub scheduler: PacingScheduler,
    pub checkpoints: CheckpointStore,
    pub backend: B,
    /// 未安装文件日志时（例如测试）为 None，此时不生成筛选日志
    pub run_log: Option<RunLog>,
    run_dir: PathBuf,
}

impl<B> RunContext<B> {
    pub fn new(config: Config, backend: B, run_dir: impl Into<PathBuf>, run_log: Option<RunLog>) -> Self {
        let run_dir = run_dir.into();
        let scheduler = PacingScheduler::new(PacingConfig::from(&config), config.max_workers);
        let checkpoints = CheckpointStore::new(
            config.output_root.clone(),
            run_dir.clone(),
            config.partial_results_dir.clone(),
        );
        Self {
            config,
            scheduler,
            checkpoints,
            backend,
            run_log,
            run_dir,
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// 在阻塞线程池里查找并读取上一次运行的检查点
    pub async fn load_checkpoint<T, K>(&self, key: &K, label: &str) -> Option<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
        K: CheckpointKey + Clone + Send + 'static,
    {
        let store = self.checkpoints.clone();
        let key = key.clone();
        let owned_label = label.to_string();
        run_blocking(label, move || store.load(&key, &owned_label))
            .await
            .flatten()
    }

    /// 在阻塞线程池里写检查点，失败只告警
    pub async fn save_checkpoint<T>(&self, label: &str, records: &[T]) -> Option<PathBuf>
    where
        T: Serialize + Clone + Send + 'static,
    {
        let store = self.checkpoints.clone();
        let records = records.to_vec();
        let owned_label = label.to_string();
        run_blocking(label, move || store.save_or_warn(&owned_label, &records))
            .await
            .flatten()
    }

    /// 任务收尾：打印完成日志，把本任务的日志行切到单独的文件
    ///
    /// 有错误的任务文件名带 `_err` 后缀。
    pub async fn finish_task(&self, label: &str, records: usize, errors: usize) {
        log_task_complete(label, records, errors);

        let Some(run_log) = self.run_log.clone() else {
            return;
        };
        let filename = if errors == 0 {
            label.to_string()
        } else {
            format!("{}_err", label)
        };
        let needle = label.to_string();
        let filtered = run_blocking(label, move || {
            run_log.filter_log(|line| line.contains(&needle), &filename, Some(FILTERED_LOG_DIR))
        })
        .await;
        if let Some(Err(e)) = filtered {
            warn!("{} 筛选日志失败: {}", label, e);
        }
    }
}

async fn run_blocking<R, F>(label: &str, f: F) -> Option<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => Some(value),
        Err(e) => {
            error!("{} 文件 I/O 任务异常结束: {}", label, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{find_book, ChapterRange, Entry, Task, VersionId};

    fn task() -> Task {
        Task {
            id: 1,
            book: find_book("Jude").unwrap(),
            version: VersionId::Niv,
            range: ChapterRange::new(1, 1),
        }
    }

    #[tokio::test]
    async fn test_checkpoint_helpers_round_trip_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output_root: dir.path().to_path_buf(),
            ..Config::default()
        };
        let label = "Worker 1 | Batch 1/1 | NIV JUD chapters 1-1 |";
        let entry = Entry {
            book_id: 65,
            book_name: "Jude".into(),
            chapter: 1,
            verse: 1,
            version: VersionId::Niv,
            text: "Jude, a servant".into(),
        };

        let first = RunContext::new(config.clone(), (), dir.path().join("run_1"), None);
        assert!(first.save_checkpoint(label, &[entry.clone()]).await.is_some());

        let second = RunContext::new(config, (), dir.path().join("run_2"), None);
        let loaded: Vec<Entry> = second.load_checkpoint(&task(), label).await.unwrap();
        assert_eq!(loaded, vec![entry]);
    }

    #[tokio::test]
    async fn test_finish_task_writes_err_log() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("run.log");
        std::fs::write(&log_path, "INFO Worker 1 | Batch 1/1 | x |\nINFO other\n").unwrap();
        let run_log = RunLog::new(dir.path(), &log_path);
        let run = RunContext::new(Config::default(), (), dir.path(), Some(run_log));

        run.finish_task("Worker 1 | Batch 1/1 | x |", 3, 1).await;

        let filtered = dir.path().join(FILTERED_LOG_DIR);
        let names: Vec<String> = std::fs::read_dir(&filtered)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with("_err.log"));
    }
}
