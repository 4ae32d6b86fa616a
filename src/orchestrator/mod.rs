//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量任务处理器
//! - 切分任务、启动 worker、等待完成、写出结果
//!
//! ### `task_processor` - 单个任务处理器
//! - 检查点复用、会话管理、逐章抓取、写检查点
//!
//! ### `translation_app` - 句子翻译入口
//! - 读取句子、切分任务、写出平行语料与成功率
//!
//! ### `sentence_processor` - 单个句子批次处理器
//! - 检查点复用、会话管理、逐段翻译、错误冷却
//!
//! ### `worker_pool` - 两种任务共用的 worker 池
//!
//! ### `task_queue` - 带毒丸的任务队列
//!
//! ### `context` - 单次运行共享的资源
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor / translation_app (处理 Vec<Task> / Vec<SentenceTask>)
//!     ↓
//! worker_pool (队列 + worker + panic 隔离)
//!     ↓
//! task_processor / sentence_processor (处理一个任务)
//!     ↓
//! workflow::ChapterFlow / SentenceFlow (处理一章或一段句子，含重试)
//!     ↓
//! services (能力层：scheduler / checkpoint / merger)
//!     ↓
//! infrastructure (基础设施：Extractor / Translator)
//! ```

pub mod batch_processor;
pub mod context;
pub mod sentence_processor;
pub mod task_processor;
pub mod task_queue;
pub mod translation_app;
pub mod worker_pool;

pub use batch_processor::{App, RunSummary, CORPUS_FILE};
pub use context::{RunContext, FILTERED_LOG_DIR};
pub use sentence_processor::process_sentence_task;
pub use task_processor::process_task;
pub use task_queue::{QueueTimeout, TaskQueue};
pub use translation_app::{TranslationApp, TranslationSummary};
pub use worker_pool::{run_workers, TaskRunner};
