//! 单章抓取流程 - 流程层
//!
//! 核心职责：定义"一章"的抓取与重试
//!
//! - 抓到经文 → 结束
//! - 内容不存在 → 立即结束，不重试
//! - 其他错误 → 随机等待后重试，次数用尽后记录最后一次错误

use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::{Extractor, FetchOutcome};
use crate::models::{ChapterRange, Entry, FailureReason};
use crate::services::scheduler::random_secs;
use crate::workflow::task_ctx::TaskCtx;

/// 单章处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterOutcome {
    Extracted(Vec<Entry>),
    NotFound(String),
    Exhausted { attempts: u32, last_error: String },
}

impl ChapterOutcome {
    /// 失败原因；成功时为 None
    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            ChapterOutcome::Extracted(_) => None,
            ChapterOutcome::NotFound(reason) => Some(FailureReason::NotFound(reason.clone())),
            ChapterOutcome::Exhausted {
                attempts,
                last_error,
            } => Some(FailureReason::Exhausted {
                attempts: *attempts,
                last_error: last_error.clone(),
            }),
        }
    }
}

/// 单章抓取流程
///
/// 不持有会话，只借用调用方的会话
pub struct ChapterFlow<'a, E: Extractor> {
    extractor: &'a E,
    retry_attempts: u32,
    retry_delay_range: (f64, f64),
}

impl<'a, E: Extractor> ChapterFlow<'a, E> {
    pub fn new(extractor: &'a E, config: &Config) -> Self {
        Self {
            extractor,
            retry_attempts: config.retry_attempts.max(1),
            retry_delay_range: config.retry_delay_range,
        }
    }

    pub async fn run(
        &self,
        session: &mut E::Session,
        ctx: &TaskCtx,
        chapter: u32,
        label: &str,
    ) -> ChapterOutcome {
        let task = &ctx.task;
        let range = ChapterRange::new(chapter, chapter);
        let mut last_error = String::new();

        for attempt in 1..=self.retry_attempts {
            let outcome = self
                .extractor
                .fetch_chapter_range(session, task.version, task.book, range, label)
                .await;

            match outcome {
                FetchOutcome::Success(entries) if entries.is_empty() => {
                    return ChapterOutcome::NotFound(format!(
                        "{} {} 没有抓到经文",
                        task.book.name, chapter
                    ));
                }
                FetchOutcome::Success(entries) => return ChapterOutcome::Extracted(entries),
                FetchOutcome::NotFound(reason) => return ChapterOutcome::NotFound(reason),
                FetchOutcome::Retryable(e) => {
                    error!(
                        "{} 第 {}/{} 次尝试失败 ({} {}): {}",
                        label, attempt, self.retry_attempts, task.book.name, chapter, e
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < self.retry_attempts {
                let delay = random_secs(self.retry_delay_range);
                info!("{} {:.1}s 后重试", label, delay.as_secs_f64());
                tokio::time::sleep(delay).await;
            }
        }

        warn!(
            "{} ❌ {} {} 重试 {} 次后仍失败",
            label, task.book.name, chapter, self.retry_attempts
        );
        ChapterOutcome::Exhausted {
            attempts: self.retry_attempts,
            last_error,
        }
    }
}
