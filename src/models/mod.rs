pub mod catalog;
pub mod corpus;
pub mod sentence;
pub mod task;

pub use catalog::{book_by_id, canonical_position, find_book, Book, VersionId, VersionInfo, BOOKS};
pub use corpus::{MergeStats, MergedVerse, VerseKey};
pub use sentence::{
    failure_mark, ChunkFailure, Languages, SentenceBatchResult, SentencePair, SentenceTask,
    TranslationRecord, NOT_FOUND_MARK, TRANSLATION_FAILED_MARK,
};
pub use task::{
    BatchResult, BatchTask, ChapterFailure, ChapterRange, Entry, FailureReason, ResultOrigin, Task,
    TaskOutcome,
};
