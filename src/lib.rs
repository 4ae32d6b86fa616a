//! # Bible Corpus Scraper
//!
//! 并发抓取多语种圣经经文，按 (书卷, 章, 节) 对齐成平行语料；
//! 同一套队列、调度与检查点也用来批量翻译句子列表
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器页面），只暴露能力
//! - `Extractor` - 抽取接口：会话 / 抓章节 / 截图
//! - `BibleComExtractor` - 基于 chromiumoxide 的 bible.com 实现
//! - `Translator` / `KorpusTranslator` - 句子翻译接口与 Korpus Kernewek 实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `partitioner` - 章节 / 句子切分与任务生成
//! - `sentence_source` - 读取待翻译句子
//! - `scheduler` - 请求间隔与任务间停顿（疲劳系数）
//! - `checkpoint` - 检查点读写与跨运行复用
//! - `merger` / `dedup` / `corpus_writer` - 合并、去重、写出
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一章"的抓取和"一段句子"的翻译流程
//! - `TaskCtx` - 上下文封装（worker + 任务），也是日志前缀
//! - `ChapterFlow` - 抓取 → 重试 → 失败记录
//! - `SentenceFlow` - 合并 → 翻译 → 切分 → 重试
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 任务队列、worker、结果汇总
//! - `orchestrator/task_processor` - 单个任务：检查点 → 会话 → 逐章 → 检查点
//! - `orchestrator/translation_app` / `sentence_processor` - 句子翻译的同构版本
//! - `orchestrator/worker_pool` - 两者共用的 worker 池
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{CheckpointError, ConfigError, ExtractError};
pub use infrastructure::{
    BibleComExtractor, Extractor, FetchOutcome, KorpusTranslator, Translation, Translator,
};
pub use models::{
    BatchResult, Book, ChapterRange, Entry, Languages, MergedVerse, SentenceBatchResult, SentencePair,
    SentenceTask, Task, TranslationRecord, VersionId,
};
pub use orchestrator::{App, RunSummary, TranslationApp, TranslationSummary};
pub use workflow::{ChapterFlow, ChapterOutcome, SentenceFlow, TaskCtx};
