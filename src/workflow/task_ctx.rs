//! 任务处理上下文
//!
//! 封装"哪个 worker 正在处理第几个任务"这一信息，Display 结果就是日志前缀

use std::fmt::Display;

use crate::models::{BatchTask, Task};

/// 任务处理上下文
///
/// 默认任务类型是章节任务；句子翻译任务共用同一个日志前缀格式。
#[derive(Debug, Clone)]
pub struct TaskCtx<T = Task> {
    /// worker 编号（从 1 开始）
    pub worker_id: usize,

    /// 任务本身
    pub task: T,

    /// 任务总数（仅用于日志显示）
    pub total_tasks: usize,
}

impl<T: BatchTask> TaskCtx<T> {
    pub fn new(worker_id: usize, task: T, total_tasks: usize) -> Self {
        Self {
            worker_id,
            task,
            total_tasks,
        }
    }

    /// 日志前缀，也是检查点和筛选日志的文件名来源
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl<T: BatchTask> Display for TaskCtx<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Worker {} | Batch {}/{} | {} |",
            self.worker_id,
            self.task.id(),
            self.total_tasks,
            self.task
        )
    }
}
