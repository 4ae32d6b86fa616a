//! 检查点服务 - 业务能力层
//!
//! 零错误完成的任务把原始经文列表写入 `<运行目录>/partial_results/`；
//! 下一次运行开始某个任务前，先到上一次运行的目录里找同一签名的文件，找到就直接复用。
//!
//! 文件名由任务标签清洗而来，签名是它的子串：
//! - 章节任务 `{译本}_{书卷}_chapters_{起}-{止}`
//! - 句子任务 `{方向}_sentences_{起}-{止}`，依赖输入句子列表在两次运行之间顺序不变

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

use crate::error::CheckpointError;
use crate::models::{Book, ChapterRange, SentenceTask, Task, VersionId};
use crate::utils::sanitize_filename;

const CHECKPOINT_EXT: &str = "json";
const MAX_FILENAME_LEN: usize = 150;

/// 能在上一次运行里找到检查点的任务
pub trait CheckpointKey {
    /// 文件名主干的匹配规则（正则，不含范围之后的部分和扩展名）
    fn file_stem_pattern(&self) -> String;
}

impl CheckpointKey for Task {
    fn file_stem_pattern(&self) -> String {
        format!(
            r"{}.*{}.*chapters_{}-{}",
            regex::escape(self.version.suffix()),
            regex::escape(self.book.abbr),
            self.range.start,
            self.range.end
        )
    }
}

impl CheckpointKey for SentenceTask {
    fn file_stem_pattern(&self) -> String {
        format!(
            r"{}.*sentences_{}-{}",
            regex::escape(&self.languages.direction()),
            self.range.start,
            self.range.end
        )
    }
}

/// 检查点存储
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    output_root: PathBuf,
    run_dir: PathBuf,
    partial_dir: String,
}

impl CheckpointStore {
    /// # 参数
    /// - `output_root`: 所有运行目录的父目录
    /// - `run_dir`: 本次运行目录，查找上一次运行时会跳过它
    /// - `partial_dir`: 运行目录下存放检查点的子目录名
    pub fn new(
        output_root: impl Into<PathBuf>,
        run_dir: impl Into<PathBuf>,
        partial_dir: impl Into<String>,
    ) -> Self {
        Self {
            output_root: output_root.into(),
            run_dir: run_dir.into(),
            partial_dir: partial_dir.into(),
        }
    }

    /// 任务签名
    pub fn signature(version: VersionId, book: &Book, range: ChapterRange) -> String {
        format!(
            "{}_{}_chapters_{}-{}",
            version.suffix(),
            book.abbr,
            range.start,
            range.end
        )
    }

    /// 本次运行的检查点目录
    pub fn current_dir(&self) -> PathBuf {
        self.run_dir.join(&self.partial_dir)
    }

    /// 上一次运行的目录：按目录名字典序取最后一个，跳过本次运行目录
    pub fn previous_run_dir(&self) -> Option<PathBuf> {
        let current_name = self.run_dir.file_name();
        let entries = fs::read_dir(&self.output_root).ok()?;

        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .filter(|p| p.file_name() != current_name)
            .max_by(|a, b| a.file_name().cmp(&b.file_name()))
    }

    /// 在上一次运行的检查点目录里查找与任务签名匹配的文件
    ///
    /// 范围后面必须紧跟非数字字符或扩展名，`1-1` 不会匹配到 `1-17`。
    /// 有多个匹配时取修改时间最新的。
    pub fn find<K: CheckpointKey>(&self, key: &K) -> Result<Option<PathBuf>, CheckpointError> {
        let Some(prev_run) = self.previous_run_dir() else {
            return Ok(None);
        };
        let dir = prev_run.join(&self.partial_dir);
        if !dir.is_dir() {
            return Ok(None);
        }

        let pattern = checkpoint_pattern(key)?;
        let read_dir = fs::read_dir(&dir).map_err(|source| CheckpointError::Io {
            path: dir.clone(),
            source,
        })?;

        let newest = read_dir
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|name| pattern.is_match(name))
                    .unwrap_or(false)
            })
            .map(|e| {
                let modified = e
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, e.path())
            })
            .max();

        Ok(newest.map(|(_, path)| path))
    }

    /// 尝试复用上一次运行的结果
    ///
    /// 查找或解析失败只记录日志，返回 None，调用方照常执行任务。
    pub fn load<T, K>(&self, key: &K, label: &str) -> Option<Vec<T>>
    where
        T: DeserializeOwned,
        K: CheckpointKey,
    {
        let path = match self.find(key) {
            Ok(Some(path)) => path,
            Ok(None) => {
                debug!("{} 没有可复用的检查点", label);
                return None;
            }
            Err(e) => {
                error!("{} 查找检查点失败: {}", label, e);
                return None;
            }
        };

        match read_records(&path) {
            Ok(records) => {
                info!(
                    "{} ♻️ 复用检查点 {} ({} 条记录)",
                    label,
                    path.display(),
                    records.len()
                );
                Some(records)
            }
            Err(e) => {
                error!("{} 检查点无法读取, 重新抓取: {}", label, e);
                None
            }
        }
    }

    /// 把任务结果写入本次运行的检查点目录
    pub fn save<T: Serialize>(&self, label: &str, records: &[T]) -> Result<PathBuf, CheckpointError> {
        let dir = self.current_dir();
        fs::create_dir_all(&dir).map_err(|source| CheckpointError::Io {
            path: dir.clone(),
            source,
        })?;

        let filename = format!(
            "{}.{}",
            sanitize_filename(label, MAX_FILENAME_LEN),
            CHECKPOINT_EXT
        );
        let path = dir.join(filename);

        let json = serde_json::to_string_pretty(records).map_err(|source| {
            CheckpointError::Json {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(|source| CheckpointError::Io {
            path: path.clone(),
            source,
        })?;

        debug!("{} 检查点已保存: {}", label, path.display());
        Ok(path)
    }

    /// 保存失败只告警，不影响任务结果
    pub fn save_or_warn<T: Serialize>(&self, label: &str, records: &[T]) -> Option<PathBuf> {
        match self.save(label, records) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("{} ⚠️ 检查点保存失败: {}", label, e);
                None
            }
        }
    }
}

fn checkpoint_pattern<K: CheckpointKey>(key: &K) -> Result<Regex, CheckpointError> {
    let pattern = format!(
        r"^.*{}(?:[^0-9][^/]*)?\.{}$",
        key.file_stem_pattern(),
        CHECKPOINT_EXT
    );
    Ok(Regex::new(&pattern)?)
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CheckpointError> {
    let content = fs::read_to_string(path).map_err(|source| CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CheckpointError::Json {
        path: path.to_path_buf(),
        source,
    })
}
