//! Worker 池 - 编排层
//!
//! 章节抓取和句子翻译共用的执行骨架：一个任务队列、N 个 worker、一个结果通道。
//! worker 只认识 `TaskRunner`，不知道任务具体做什么。

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::models::BatchTask;
use crate::orchestrator::task_queue::{QueueTimeout, TaskQueue};
use crate::workflow::TaskCtx;

/// 处理单个任务的一方
#[async_trait]
pub trait TaskRunner<T: BatchTask>: Send + Sync + 'static {
    type Output: Send + 'static;

    /// 处理一个任务，总会返回一个结果
    async fn run_task(&self, ctx: &TaskCtx<T>) -> Self::Output;

    /// 任务 panic 时代替它的结果
    fn panicked(&self, ctx: &TaskCtx<T>) -> Self::Output;
}

/// 启动 worker 并收集所有结果
///
/// 流程：任务全部入队 → `join` 等每个任务被标记完成 → 每个 worker 一颗毒丸 → 收集结果
pub async fn run_workers<T, R>(
    runner: Arc<R>,
    tasks: Vec<T>,
    workers: usize,
    queue_timeout: Duration,
) -> Vec<R::Output>
where
    T: BatchTask,
    R: TaskRunner<T>,
{
    let total_tasks = tasks.len();
    let workers = workers.max(1);
    let queue = Arc::new(TaskQueue::new());
    for task in tasks {
        queue.put(task);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut handles = Vec::with_capacity(workers);
    for worker_id in 1..=workers {
        let runner = runner.clone();
        let queue = queue.clone();
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            worker_loop(worker_id, runner, queue, tx, total_tasks, queue_timeout).await;
        }));
    }
    drop(tx);

    queue.join().await;
    info!("✓ 所有任务已完成，通知 worker 退出");
    for _ in 0..workers {
        queue.put_poison_pill();
    }
    for (idx, handle) in handles.into_iter().enumerate() {
        if let Err(e) = handle.await {
            error!("Worker {} 异常退出: {}", idx + 1, e);
        }
    }

    let mut results = Vec::with_capacity(total_tasks);
    while let Ok(result) = rx.try_recv() {
        results.push(result);
    }
    results
}

/// worker 主循环
///
/// 取不到任务（超时）或取到毒丸时退出
async fn worker_loop<T, R>(
    worker_id: usize,
    runner: Arc<R>,
    queue: Arc<TaskQueue<T>>,
    results: UnboundedSender<R::Output>,
    total_tasks: usize,
    timeout: Duration,
) where
    T: BatchTask,
    R: TaskRunner<T>,
{
    debug!("Worker {} 启动", worker_id);

    loop {
        let task = match queue.get(timeout).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                queue.task_done();
                debug!("Worker {} 收到退出信号", worker_id);
                break;
            }
            Err(QueueTimeout) => {
                info!("Worker {} 等待任务超时，退出", worker_id);
                break;
            }
        };

        let ctx = TaskCtx::new(worker_id, task, total_tasks);
        let result = match AssertUnwindSafe(runner.run_task(&ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("{} ❌ 任务处理过程中 panic", ctx);
                runner.panicked(&ctx)
            }
        };

        if results.send(result).is_err() {
            warn!("{} 结果通道已关闭", ctx);
        }
        queue.task_done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChapterRange, Languages, SentenceTask};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 返回任务编号；编号为 2 的任务 panic
    struct Echo {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl TaskRunner<SentenceTask> for Echo {
        type Output = (usize, bool);

        async fn run_task(&self, ctx: &TaskCtx<SentenceTask>) -> (usize, bool) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            if ctx.task.id == 2 {
                panic!("boom");
            }
            (ctx.task.id, true)
        }

        fn panicked(&self, ctx: &TaskCtx<SentenceTask>) -> (usize, bool) {
            (ctx.task.id, false)
        }
    }

    fn tasks(n: usize) -> Vec<SentenceTask> {
        (1..=n)
            .map(|id| SentenceTask {
                id,
                languages: Languages::default(),
                range: ChapterRange::new(id as u32, id as u32),
                pairs: Vec::new(),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_task_yields_one_result() {
        let runner = Arc::new(Echo {
            runs: AtomicUsize::new(0),
        });
        let mut results = run_workers(runner.clone(), tasks(5), 3, Duration::from_secs(60)).await;
        results.sort();

        assert_eq!(runner.runs.load(Ordering::SeqCst), 5);
        assert_eq!(
            results,
            vec![(1, true), (2, false), (3, true), (4, true), (5, true)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tasks_returns_immediately() {
        let runner = Arc::new(Echo {
            runs: AtomicUsize::new(0),
        });
        let results = run_workers(runner, tasks(0), 2, Duration::from_secs(60)).await;
        assert!(results.is_empty());
    }
}
