//! 语料合并服务 - 业务能力层
//!
//! 把所有任务、所有译本的经文按 (书卷, 章, 节) 对齐成平行语料。

use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use crate::models::{canonical_position, Entry, MergeStats, MergedVerse, VerseKey, VersionId};

/// 合并经文
///
/// - 每个键第一次出现时，为所有已知译本预留空字符串
/// - 只有非空文本才会写入，空文本不会覆盖已有内容
/// - 输出按书卷在正典中的位置、章、节排序
///
/// # 参数
/// - `entries`: 所有任务的经文
/// - `known_versions`: 输出中必须出现的译本列
pub fn merge_corpus(
    entries: &[Entry],
    known_versions: &[VersionId],
) -> (Vec<MergedVerse>, MergeStats) {
    let mut by_key: HashMap<VerseKey, MergedVerse> = HashMap::new();

    for entry in entries {
        let key = VerseKey {
            book_id: entry.book_id,
            chapter: entry.chapter,
            verse: entry.verse,
        };

        let record = by_key.entry(key).or_insert_with(|| MergedVerse {
            book_name: entry.book_name.clone(),
            book_id: entry.book_id,
            chapter: entry.chapter,
            verse: entry.verse,
            texts: known_versions
                .iter()
                .map(|v| (*v, String::new()))
                .collect::<BTreeMap<_, _>>(),
        });

        let slot = record.texts.entry(entry.version).or_default();
        if !entry.text.trim().is_empty() {
            *slot = entry.text.clone();
        }
    }

    let unique_keys = by_key.len();
    let mut merged: Vec<MergedVerse> = by_key.into_values().collect();
    merged.sort_by_key(|r| (canonical_position(r.book_id), r.chapter, r.verse));

    let stats = MergeStats {
        total_entries: entries.len(),
        unique_keys,
        merged_records: merged.len(),
        incomplete_records: merged.iter().filter(|r| r.is_incomplete()).count(),
    };

    info!(
        "合并完成: 输入 {} 条, 唯一键 {} 个, 输出 {} 条",
        stats.total_entries, stats.unique_keys, stats.merged_records
    );
    if stats.incomplete_records > 0 {
        warn!(
            "⚠️ {} 条经文缺少部分译本",
            stats.incomplete_records
        );
    }

    (merged, stats)
}
