//! 句子段翻译流程 - 流程层
//!
//! 一次请求翻译若干句子：原文用合并符号连成一段，译文再按同一符号切回。
//!
//! - 拿到译文且能切回原来的句数 → 结束
//! - 站点没有结果 → 立即结束，不重试
//! - 其他错误（含切分数量不符）→ 随机等待、恢复会话后重试

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ExtractError;
use crate::infrastructure::{FetchOutcome, Translation, Translator};
use crate::models::{FailureReason, SentencePair, TranslationRecord};
use crate::services::scheduler::random_secs;
use crate::utils::{clean_text, collapse_whitespace, truncate_text};

/// 句子之间的合并符号
pub const MERGE_SYMBOL: &str = "<|||>";

pub fn merge_sentences(sentences: &[&str]) -> String {
    sentences.join(format!(" {} ", MERGE_SYMBOL).as_str())
}

/// 按合并符号切回，段数必须与原句数一致
pub fn split_translation(text: &str, expected: usize) -> Result<Vec<String>, ExtractError> {
    let parts: Vec<String> = text.split(MERGE_SYMBOL).map(str::to_string).collect();
    if parts.len() != expected {
        return Err(ExtractError::Other(format!(
            "切分数量不符: 期望 {} 段, 实际 {} 段",
            expected,
            parts.len()
        )));
    }
    Ok(parts)
}

/// 一段句子的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Translated(Vec<TranslationRecord>),
    NotFound(String),
    Exhausted { attempts: u32, last_error: String },
}

impl ChunkOutcome {
    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            ChunkOutcome::Translated(_) => None,
            ChunkOutcome::NotFound(reason) => Some(FailureReason::NotFound(reason.clone())),
            ChunkOutcome::Exhausted {
                attempts,
                last_error,
            } => Some(FailureReason::Exhausted {
                attempts: *attempts,
                last_error: last_error.clone(),
            }),
        }
    }
}

/// 句子段翻译流程，借用调用方的会话
pub struct SentenceFlow<'a, T: Translator> {
    translator: &'a T,
    retry_attempts: u32,
    retry_delay_range: (f64, f64),
}

impl<'a, T: Translator> SentenceFlow<'a, T> {
    pub fn new(translator: &'a T, config: &Config) -> Self {
        Self {
            translator,
            retry_attempts: config.retry_attempts.max(1),
            retry_delay_range: config.retry_delay_range,
        }
    }

    pub async fn run(
        &self,
        session: &mut T::Session,
        chunk: &[SentencePair],
        label: &str,
    ) -> ChunkOutcome {
        let sources: Vec<&str> = chunk.iter().map(|pair| pair.source.as_str()).collect();
        let merged = merge_sentences(&sources);
        info!("{} 翻译 {} 句: {}", label, chunk.len(), truncate_text(&merged, 80));

        let mut last_error = String::new();
        for attempt in 1..=self.retry_attempts {
            let outcome = self.translator.translate(session, &merged, label).await;

            let error = match outcome {
                FetchOutcome::Success(Translation::Pairs(rows)) if rows.is_empty() => {
                    return ChunkOutcome::NotFound(format!("没有译文: {}", truncate_text(&merged, 40)));
                }
                FetchOutcome::Success(Translation::Pairs(rows)) => {
                    let original = merged.trim().to_string();
                    let records = rows
                        .into_iter()
                        .map(|(source, target)| TranslationRecord {
                            source: source.trim().to_string(),
                            target: target.trim().to_string(),
                            original: original.clone(),
                        })
                        .collect();
                    return ChunkOutcome::Translated(records);
                }
                FetchOutcome::Success(Translation::Merged(text)) => match split_translation(&text, chunk.len()) {
                    Ok(parts) => return ChunkOutcome::Translated(to_records(chunk, &parts)),
                    Err(e) => e,
                },
                FetchOutcome::NotFound(reason) => return ChunkOutcome::NotFound(reason),
                FetchOutcome::Retryable(e) => e,
            };

            warn!(
                "{} 第 {}/{} 次翻译失败 ({}): {}",
                label,
                attempt,
                self.retry_attempts,
                truncate_text(&merged, 40),
                error
            );
            last_error = error.to_string();

            if attempt < self.retry_attempts {
                let delay = random_secs(self.retry_delay_range);
                debug!("{} {:.1}s 后重试", label, delay.as_secs_f64());
                tokio::time::sleep(delay).await;
                self.translator.reset_session(session, label).await;
            }
        }

        warn!("{} ❌ 重试 {} 次后仍失败", label, self.retry_attempts);
        ChunkOutcome::Exhausted {
            attempts: self.retry_attempts,
            last_error,
        }
    }
}

fn to_records(chunk: &[SentencePair], parts: &[String]) -> Vec<TranslationRecord> {
    chunk
        .iter()
        .zip(parts)
        .map(|(pair, part)| TranslationRecord {
            source: collapse_whitespace(&pair.source),
            target: clean_text(part),
            original: collapse_whitespace(&pair.original),
        })
        .collect()
}
