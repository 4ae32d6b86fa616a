//! 单个任务处理器 - 编排层
//!
//! ## 核心功能
//!
//! 1. **检查点复用**：上一次运行已完整抓取的任务直接复用，并计入调度进度
//! 2. **会话管理**：每个任务打开一个独占会话，结束时关闭（panic 时也关闭）
//! 3. **逐章抓取**：每章先过请求间隔，再交给 `ChapterFlow` 重试
//! 4. **失败隔离**：单章失败只记录并截图，不中断任务
//! 5. **收尾**：零错误时停顿并写检查点；最后切出本任务的日志

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::{resume_unwind, AssertUnwindSafe};
use tracing::{debug, error, warn};

use crate::infrastructure::Extractor;
use crate::models::{BatchResult, ChapterFailure, FailureReason, ResultOrigin, Task};
use crate::orchestrator::context::RunContext;
use crate::orchestrator::worker_pool::TaskRunner;
use crate::utils::logging::log_task_start;
use crate::workflow::{ChapterFlow, ChapterOutcome, TaskCtx};

/// 处理单个任务
///
/// 总会返回一个结果；章节失败体现在 `error_count` 和 `failures` 中。
pub async fn process_task<E: Extractor>(run: &RunContext<E>, ctx: &TaskCtx) -> BatchResult {
    let label = ctx.label();
    let task = &ctx.task;
    log_task_start(&label);

    if let Some(entries) = run.load_checkpoint(task, &label).await {
        let mut result = BatchResult::empty(task, ResultOrigin::Checkpoint);
        result.entries = entries;
        let done = run.scheduler.record_completed(ctx.total_tasks);
        debug!("{} 复用任务计入进度 {}/{}", label, done, ctx.total_tasks);
        // 复制到本次运行目录，下一次运行仍能找到
        run.save_checkpoint(&label, &result.entries).await;
        run.finish_task(&label, result.entries.len(), result.error_count)
            .await;
        return result;
    }

    let mut result = BatchResult::empty(task, ResultOrigin::Fresh);

    match run.backend.open_session(&label).await {
        Ok(mut session) => {
            let fetched = AssertUnwindSafe(fetch_chapters(run, ctx, &mut session, &mut result, &label))
                .catch_unwind()
                .await;
            run.backend.close_session(session).await;
            if let Err(panic) = fetched {
                resume_unwind(panic);
            }
        }
        Err(e) => {
            error!("{} ❌ 无法打开会话: {}", label, e);
            for chapter in task.range.chapters() {
                result.error_count += 1;
                result.failures.push(ChapterFailure {
                    chapter,
                    reason: FailureReason::Exhausted {
                        attempts: 0,
                        last_error: e.to_string(),
                    },
                });
            }
        }
    }

    if result.is_checkpointable() {
        run.scheduler
            .ensure_interval_before_next_batch(ctx.total_tasks, &label)
            .await;
        run.save_checkpoint(&label, &result.entries).await;
    } else {
        warn!(
            "{} ⚠️ 有 {} 章失败，不写检查点",
            label, result.error_count
        );
    }

    run.finish_task(&label, result.entries.len(), result.error_count)
        .await;
    result
}

/// 逐章抓取，结果写进 `result`
async fn fetch_chapters<E: Extractor>(
    run: &RunContext<E>,
    ctx: &TaskCtx,
    session: &mut E::Session,
    result: &mut BatchResult,
    label: &str,
) {
    let flow = ChapterFlow::new(&run.backend, &run.config);

    for chapter in ctx.task.range.chapters() {
        run.scheduler.ensure_batch_interval(label).await;

        match flow.run(session, ctx, chapter, label).await {
            ChapterOutcome::Extracted(entries) => result.entries.extend(entries),
            outcome => {
                if let Some(reason) = outcome.failure() {
                    error!("{} 第 {} 章失败: {}", label, chapter, reason);
                    result.error_count += 1;
                    result.failures.push(ChapterFailure { chapter, reason });
                }
                let artifact_label = format!("{} chapter {} error", label, chapter);
                run.backend.capture_artifact(session, &artifact_label).await;
            }
        }
    }
}

#[async_trait]
impl<E: Extractor> TaskRunner<Task> for RunContext<E> {
    type Output = BatchResult;

    async fn run_task(&self, ctx: &TaskCtx<Task>) -> BatchResult {
        process_task(self, ctx).await
    }

    fn panicked(&self, ctx: &TaskCtx<Task>) -> BatchResult {
        let mut result = BatchResult::empty(&ctx.task, ResultOrigin::Fresh);
        result.error_count = 1;
        result
    }
}
