pub mod chapter_flow;
pub mod sentence_flow;
pub mod task_ctx;

pub use chapter_flow::{ChapterFlow, ChapterOutcome};
pub use sentence_flow::{merge_sentences, split_translation, ChunkOutcome, SentenceFlow, MERGE_SYMBOL};
pub use task_ctx::TaskCtx;
