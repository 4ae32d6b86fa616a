//! 任务与批次结果

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::catalog::{Book, VersionId};

/// 闭区间范围（从 1 开始）
///
/// 章节任务里是章节号，句子任务里是句子在输入列表中的序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterRange {
    pub start: u32,
    pub end: u32,
}

impl ChapterRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn chapters(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

impl fmt::Display for ChapterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// 可以放进任务队列的批次任务
///
/// `Display` 是任务在日志前缀里的描述，检查点签名是它的子串。
pub trait BatchTask: fmt::Display + Clone + Send + Sync + 'static {
    /// 打乱后的编号（从 1 开始）
    fn id(&self) -> usize;
}

/// 一个批次任务：某译本某书卷的一段章节
///
/// 创建后不可变，只会被一个 worker 消费一次。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: usize,
    pub book: &'static Book,
    pub version: VersionId,
    pub range: ChapterRange,
}

impl BatchTask for Task {
    fn id(&self) -> usize {
        self.id
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} chapters {}",
            self.version.suffix(),
            self.book.abbr,
            self.range
        )
    }
}

/// 抓取到的单节经文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub book_id: u32,
    pub book_name: String,
    pub chapter: u32,
    pub verse: u32,
    pub version: VersionId,
    pub text: String,
}

/// 章节失败原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// 目标内容不存在，未重试
    NotFound(String),
    /// 重试次数用尽
    Exhausted { attempts: u32, last_error: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NotFound(reason) => write!(f, "未找到: {}", reason),
            FailureReason::Exhausted {
                attempts,
                last_error,
            } => write!(f, "重试 {} 次后失败: {}", attempts, last_error),
        }
    }
}

/// 单个章节的失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterFailure {
    pub chapter: u32,
    pub reason: FailureReason,
}

/// 结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    /// 本次运行实际抓取
    Fresh,
    /// 复用上一次运行的检查点
    Checkpoint,
}

/// 任务结束状态；没有整任务失败的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    CompleteClean,
    CompletePartial,
}

/// 一个任务的执行结果
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub task_id: usize,
    pub book: &'static Book,
    pub version: VersionId,
    pub range: ChapterRange,
    pub entries: Vec<Entry>,
    pub error_count: usize,
    pub failures: Vec<ChapterFailure>,
    pub origin: ResultOrigin,
}

impl BatchResult {
    /// 创建空结果
    pub fn empty(task: &Task, origin: ResultOrigin) -> Self {
        Self {
            task_id: task.id,
            book: task.book,
            version: task.version,
            range: task.range,
            entries: Vec::new(),
            error_count: 0,
            failures: Vec::new(),
            origin,
        }
    }

    pub fn outcome(&self) -> TaskOutcome {
        if self.error_count == 0 {
            TaskOutcome::CompleteClean
        } else {
            TaskOutcome::CompletePartial
        }
    }

    /// 只有零错误的结果才允许写入检查点
    pub fn is_checkpointable(&self) -> bool {
        self.outcome() == TaskOutcome::CompleteClean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::find_book;

    #[test]
    fn test_chapter_range_len() {
        assert_eq!(ChapterRange::new(1, 1).len(), 1);
        assert_eq!(ChapterRange::new(3, 7).len(), 5);
        assert!(ChapterRange::new(5, 4).is_empty());
        assert_eq!(ChapterRange::new(3, 4).to_string(), "3-4");
    }

    #[test]
    fn test_outcome_follows_error_count() {
        let task = Task {
            id: 1,
            book: find_book("Mark").unwrap(),
            version: VersionId::Niv,
            range: ChapterRange::new(1, 2),
        };
        let mut result = BatchResult::empty(&task, ResultOrigin::Fresh);
        assert_eq!(result.outcome(), TaskOutcome::CompleteClean);
        assert!(result.is_checkpointable());

        result.error_count = 1;
        assert_eq!(result.outcome(), TaskOutcome::CompletePartial);
        assert!(!result.is_checkpointable());
        assert_eq!(task.to_string(), "NIV MRK chapters 1-2");
    }
}
