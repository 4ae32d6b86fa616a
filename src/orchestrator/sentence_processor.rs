//! 单个句子批次处理器 - 编排层
//!
//! 与章节任务同一套收尾规则：检查点复用、独占会话、零错误才写检查点、按标签切日志。
//! 不同之处：
//! - 每个任务随机决定一次请求合并几句
//! - 同一任务累计失败达到阈值后截图并冷却一次
//! - 失败的句子仍写一条记录，译文位置是失败标记

use async_trait::async_trait;
use futures::FutureExt;
use rand::Rng;
use std::panic::{resume_unwind, AssertUnwindSafe};
use tracing::{debug, error, warn};

use crate::infrastructure::Translator;
use crate::models::{
    ChapterRange, FailureReason, ResultOrigin, SentenceBatchResult, SentenceTask, TranslationRecord,
};
use crate::orchestrator::context::RunContext;
use crate::orchestrator::worker_pool::TaskRunner;
use crate::services::scheduler::random_secs;
use crate::utils::logging::log_task_start;
use crate::workflow::{ChunkOutcome, SentenceFlow, TaskCtx};

/// 处理一个句子批次
pub async fn process_sentence_task<T: Translator>(
    run: &RunContext<T>,
    ctx: &TaskCtx<SentenceTask>,
) -> SentenceBatchResult {
    let label = ctx.label();
    let task = &ctx.task;
    log_task_start(&label);

    if let Some(records) = run.load_checkpoint::<TranslationRecord, _>(task, &label).await {
        let mut result = SentenceBatchResult::empty(task, ResultOrigin::Checkpoint);
        result.records = records;
        let done = run.scheduler.record_completed(ctx.total_tasks);
        debug!("{} 复用任务计入进度 {}/{}", label, done, ctx.total_tasks);
        run.save_checkpoint(&label, &result.records).await;
        run.finish_task(&label, result.records.len(), result.error_count)
            .await;
        return result;
    }

    let mut result = SentenceBatchResult::empty(task, ResultOrigin::Fresh);

    match run.backend.open_session(&label).await {
        Ok(mut session) => {
            let translated = AssertUnwindSafe(translate_chunks(run, ctx, &mut session, &mut result, &label))
                .catch_unwind()
                .await;
            run.backend.close_session(session).await;
            if let Err(panic) = translated {
                resume_unwind(panic);
            }
        }
        Err(e) => {
            error!("{} ❌ 无法打开会话: {}", label, e);
            result.record_failure(
                task.range,
                FailureReason::Exhausted {
                    attempts: 0,
                    last_error: e.to_string(),
                },
                &task.pairs,
            );
        }
    }

    if result.is_checkpointable() {
        run.scheduler
            .ensure_interval_before_next_batch(ctx.total_tasks, &label)
            .await;
        run.save_checkpoint(&label, &result.records).await;
    } else {
        warn!(
            "{} ⚠️ 有 {} 段句子失败，不写检查点",
            label, result.error_count
        );
    }

    run.finish_task(&label, result.records.len(), result.error_count)
        .await;
    result
}

/// 逐段翻译，结果写进 `result`
async fn translate_chunks<T: Translator>(
    run: &RunContext<T>,
    ctx: &TaskCtx<SentenceTask>,
    session: &mut T::Session,
    result: &mut SentenceBatchResult,
    label: &str,
) {
    let task = &ctx.task;
    let config = &run.config;
    let per_request = sentences_per_request(config.sentences_per_request_range);
    let flow = SentenceFlow::new(&run.backend, config);
    let total_chunks = task.pairs.len().div_ceil(per_request);
    debug!("{} 每次请求 {} 句, 共 {} 段", label, per_request, total_chunks);

    let mut recent_errors = 0u32;
    for (idx, chunk) in task.pairs.chunks(per_request).enumerate() {
        if recent_errors >= config.error_cooldown_threshold {
            error!("{} 连续错误过多 ({} 次), 暂停", label, recent_errors);
            run.backend
                .capture_artifact(session, &format!("{} too many errors", label))
                .await;
            let delay = random_secs(config.cooldown_delay_range).mul_f64(2.0);
            warn!("{} 冷却 {:.1}s", label, delay.as_secs_f64());
            tokio::time::sleep(delay).await;
            recent_errors = 0;
        }

        run.scheduler.ensure_batch_interval(label).await;

        let start = task.range.start + (idx * per_request) as u32;
        let range = ChapterRange::new(start, start + chunk.len() as u32 - 1);
        debug!("{} 第 {}/{} 段 (句子 {})", label, idx + 1, total_chunks, range);

        match flow.run(session, chunk, label).await {
            ChunkOutcome::Translated(records) => result.records.extend(records),
            outcome => {
                if let Some(reason) = outcome.failure() {
                    error!("{} 句子 {} 失败: {}", label, range, reason);
                    result.record_failure(range, reason, chunk);
                    recent_errors += 1;
                }
                let artifact_label = format!("{} sentences {} error", label, range);
                run.backend.capture_artifact(session, &artifact_label).await;
            }
        }
    }
}

/// 本任务每次请求合并的句子数
fn sentences_per_request((min, max): (u32, u32)) -> usize {
    let min = min.max(1);
    let count = if max > min {
        rand::thread_rng().gen_range(min..=max)
    } else {
        min
    };
    count as usize
}

#[async_trait]
impl<T: Translator> TaskRunner<SentenceTask> for RunContext<T> {
    type Output = SentenceBatchResult;

    async fn run_task(&self, ctx: &TaskCtx<SentenceTask>) -> SentenceBatchResult {
        process_sentence_task(self, ctx).await
    }

    fn panicked(&self, ctx: &TaskCtx<SentenceTask>) -> SentenceBatchResult {
        let mut result = SentenceBatchResult::empty(&ctx.task, ResultOrigin::Fresh);
        result.error_count = 1;
        result
    }
}
