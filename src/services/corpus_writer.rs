//! 语料写出服务 - 业务能力层
//!
//! 只负责把内存中的结果写成文件，不关心结果从哪里来

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::models::{canonical_position, Entry, VersionId};

/// 把单个译本的经文写成可读文本 `bible_<后缀>.txt`
///
/// 书卷按正典顺序，章、节按数字顺序。没有经文时不写文件。
pub fn write_version_text(
    dir: &Path,
    version: VersionId,
    entries: &[Entry],
) -> Result<Option<PathBuf>> {
    let info = version.info();

    // (书卷位置, 书卷名) → 章 → [(节, 文本)]
    let mut books: BTreeMap<(usize, &str), BTreeMap<u32, Vec<(u32, &str)>>> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.version == version) {
        books
            .entry((canonical_position(entry.book_id), entry.book_name.as_str()))
            .or_default()
            .entry(entry.chapter)
            .or_default()
            .push((entry.verse, entry.text.as_str()));
    }

    if books.is_empty() {
        warn!("⚠️ {} 没有任何经文，跳过写出", version);
        return Ok(None);
    }

    let mut out = String::new();
    writeln!(out, "The Holy Bible - {}\n", info.name)?;
    for ((_, book_name), chapters) in books {
        writeln!(out, "{}\n{}\n", book_name, "=".repeat(50))?;
        for (chapter, mut verses) in chapters {
            verses.sort_by_key(|(verse, _)| *verse);
            writeln!(out, "Chapter {}\n{}", chapter, "-".repeat(20))?;
            for (verse, text) in verses {
                writeln!(out, "{} {}", verse, text)?;
            }
            out.push('\n');
        }
        out.push('\n');
    }

    let path = dir.join(info.file);
    fs::write(&path, out).with_context(|| format!("无法写入文件: {}", path.display()))?;
    info!("📖 {} 已写出: {}", version, path.display());
    Ok(Some(path))
}

/// 写出格式化 JSON（两空格缩进，保留非 ASCII 字符）
///
/// # 返回
/// 没有记录时不写文件，返回 false
pub fn write_json<T: Serialize>(path: &Path, records: &[T]) -> Result<bool> {
    if records.is_empty() {
        warn!("⚠️ 没有数据可写入 {}", path.display());
        return Ok(false);
    }
    write_json_array(path, records)?;
    Ok(true)
}

/// 写出 JSON 数组，空列表也写成 `[]`，覆盖同名旧文件
pub fn write_json_array<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).with_context(|| format!("无法写入文件: {}", path.display()))?;
    info!("💾 已写入 {} 条记录: {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(book_id: u32, name: &str, chapter: u32, verse: u32, text: &str) -> Entry {
        Entry {
            book_id,
            book_name: name.into(),
            chapter,
            verse,
            version: VersionId::Niv,
            text: text.into(),
        }
    }

    #[test]
    fn test_version_text_layout() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            entry(48, "Mark", 1, 2, "second"),
            entry(47, "Matthew", 1, 1, "first of matthew"),
            entry(48, "Mark", 1, 1, "first"),
        ];

        let path = write_version_text(dir.path(), VersionId::Niv, &entries)
            .unwrap()
            .unwrap();
        assert!(path.ends_with("bible_niv.txt"));

        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("The Holy Bible - New International Version\n"));
        let matthew = content.find("Matthew").unwrap();
        let mark = content.find("Mark\n").unwrap();
        assert!(matthew < mark);
        assert!(content.find("1 first\n").unwrap() < content.find("2 second\n").unwrap());
    }

    #[test]
    fn test_other_versions_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![entry(48, "Mark", 1, 1, "x")];
        assert!(write_version_text(dir.path(), VersionId::Cpdv, &entries)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_write_json_keeps_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        assert!(write_json(&path, &[serde_json::json!({"t": "Père"})]).unwrap());
        assert!(fs::read_to_string(&path).unwrap().contains("Père"));

        let empty: Vec<serde_json::Value> = Vec::new();
        assert!(!write_json(&dir.path().join("empty.json"), &empty).unwrap());
        assert!(!dir.path().join("empty.json").exists());
    }

    #[test]
    fn test_write_json_array_writes_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let empty: Vec<serde_json::Value> = Vec::new();
        write_json_array(&path, &empty).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }
}
