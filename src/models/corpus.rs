//! 平行语料记录

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::catalog::VersionId;

/// 对齐单位：(书卷, 章, 节)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VerseKey {
    pub book_id: u32,
    pub chapter: u32,
    pub verse: u32,
}

/// 合并后的一节经文，每个已知译本一列
///
/// 没有抓到的译本保留空字符串，字段集合始终完整。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedVerse {
    pub book_name: String,
    pub book_id: u32,
    pub chapter: u32,
    pub verse: u32,
    #[serde(flatten)]
    pub texts: BTreeMap<VersionId, String>,
}

impl MergedVerse {
    pub fn key(&self) -> VerseKey {
        VerseKey {
            book_id: self.book_id,
            chapter: self.chapter,
            verse: self.verse,
        }
    }

    pub fn text(&self, version: VersionId) -> Option<&str> {
        self.texts.get(&version).map(String::as_str)
    }

    /// 仍为空的译本数量
    pub fn missing_count(&self) -> usize {
        self.texts.values().filter(|t| t.is_empty()).count()
    }

    pub fn is_incomplete(&self) -> bool {
        self.missing_count() > 0
    }
}

/// 合并统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub total_entries: usize,
    pub unique_keys: usize,
    pub merged_records: usize,
    pub incomplete_records: usize,
}
