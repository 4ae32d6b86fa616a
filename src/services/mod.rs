pub mod checkpoint;
pub mod corpus_writer;
pub mod dedup;
pub mod merger;
pub mod partitioner;
pub mod scheduler;
pub mod sentence_source;

pub use checkpoint::{CheckpointKey, CheckpointStore};
pub use corpus_writer::{write_json, write_json_array, write_version_text};
pub use dedup::{dedup_file, deduplicate, remove_keys, DedupReport, Deduplicated};
pub use merger::merge_corpus;
pub use partitioner::{build_sentence_tasks, build_tasks, split_evenly};
pub use scheduler::{PacingConfig, PacingDecision, PacingScheduler};
pub use sentence_source::load_sentences;
