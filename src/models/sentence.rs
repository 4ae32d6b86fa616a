//! 句子翻译任务与结果
//!
//! 和章节任务走同一套队列、调度与检查点，只是工作单元换成输入列表里的一段句子。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::models::task::{BatchTask, ChapterRange, FailureReason, ResultOrigin, TaskOutcome};

/// 翻译失败时写在译文位置的标记
pub const NOT_FOUND_MARK: &str = "[NOT FOUND]";
pub const TRANSLATION_FAILED_MARK: &str = "[TRANSLATION FAILED]";

/// 语言代码：原文、译文、对照文本
///
/// 三个代码也是输出 JSON 的字段名，必须互不相同。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Languages {
    pub source: String,
    pub target: String,
    pub original: String,
}

impl Default for Languages {
    fn default() -> Self {
        Self {
            source: "en".to_string(),
            target: "kw".to_string(),
            original: "original".to_string(),
        }
    }
}

impl Languages {
    /// 翻译方向，例如 `EN2KW`
    pub fn direction(&self) -> String {
        format!(
            "{}2{}",
            self.source.to_uppercase(),
            self.target.to_uppercase()
        )
    }

    /// 平行语料文件名 `{源}_{目标}_{对照}_parallel.json`
    pub fn output_file(&self) -> String {
        format!(
            "{}_{}_{}_parallel.json",
            self.source, self.target, self.original
        )
    }
}

/// 一条待翻译的句子和它的对照文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    pub source: String,
    pub original: String,
}

/// 一个句子批次任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceTask {
    pub id: usize,
    pub languages: Languages,
    /// 这批句子在输入列表中的序号范围
    pub range: ChapterRange,
    pub pairs: Vec<SentencePair>,
}

impl BatchTask for SentenceTask {
    fn id(&self) -> usize {
        self.id
    }
}

impl fmt::Display for SentenceTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sentences {}",
            self.languages.direction(),
            self.range
        )
    }
}

/// 一条翻译结果
///
/// 检查点里按固定字段名保存；写出平行语料时换成语言代码做字段名。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub source: String,
    pub target: String,
    pub original: String,
}

impl TranslationRecord {
    /// 译文是失败标记
    pub fn is_failed(&self) -> bool {
        self.target.starts_with(NOT_FOUND_MARK) || self.target.starts_with(TRANSLATION_FAILED_MARK)
    }

    pub fn to_json(&self, languages: &Languages) -> JsonValue {
        let mut map = Map::new();
        map.insert(languages.source.clone(), JsonValue::String(self.source.clone()));
        map.insert(languages.target.clone(), JsonValue::String(self.target.clone()));
        map.insert(
            languages.original.clone(),
            JsonValue::String(self.original.clone()),
        );
        JsonValue::Object(map)
    }
}

/// 失败原因对应的译文标记
pub fn failure_mark(reason: &FailureReason) -> &'static str {
    match reason {
        FailureReason::NotFound(_) => NOT_FOUND_MARK,
        FailureReason::Exhausted { .. } => TRANSLATION_FAILED_MARK,
    }
}

/// 一次请求（若干句子）的失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub range: ChapterRange,
    pub reason: FailureReason,
}

/// 一个句子批次的执行结果
#[derive(Debug, Clone)]
pub struct SentenceBatchResult {
    pub task_id: usize,
    pub range: ChapterRange,
    pub records: Vec<TranslationRecord>,
    pub error_count: usize,
    pub failures: Vec<ChunkFailure>,
    pub origin: ResultOrigin,
}

impl SentenceBatchResult {
    pub fn empty(task: &SentenceTask, origin: ResultOrigin) -> Self {
        Self {
            task_id: task.id,
            range: task.range,
            records: Vec::new(),
            error_count: 0,
            failures: Vec::new(),
            origin,
        }
    }

    /// 记录一段失败的句子：计一次错误，并为每个句子写一条带失败标记的记录
    pub fn record_failure(&mut self, range: ChapterRange, reason: FailureReason, pairs: &[SentencePair]) {
        let mark = failure_mark(&reason);
        self.error_count += 1;
        self.records.extend(pairs.iter().map(|pair| TranslationRecord {
            source: pair.source.clone(),
            target: mark.to_string(),
            original: pair.original.clone(),
        }));
        self.failures.push(ChunkFailure { range, reason });
    }

    pub fn outcome(&self) -> TaskOutcome {
        if self.error_count == 0 {
            TaskOutcome::CompleteClean
        } else {
            TaskOutcome::CompletePartial
        }
    }

    pub fn is_checkpointable(&self) -> bool {
        self.outcome() == TaskOutcome::CompleteClean
    }
}
