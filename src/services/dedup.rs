//! 平行语料去重 - 业务能力层
//!
//! 两个字段各自维护一个"已见"集合：只有当原文和译文（去掉首尾空白后）都已经出现过时，
//! 这条记录才算重复。两个值不必来自同一条之前的记录。

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::services::corpus_writer::write_json_array;

/// 去重结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deduplicated {
    pub unique: Vec<JsonValue>,
    pub duplicates: Vec<JsonValue>,
}

/// 去重文件的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupReport {
    pub original: usize,
    pub unique: usize,
    pub duplicates: usize,
}

fn field_value(record: &JsonValue, field: &str) -> String {
    record
        .get(field)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// 保序去重
pub fn deduplicate(records: Vec<JsonValue>, source_field: &str, target_field: &str) -> Deduplicated {
    let mut seen_source: HashSet<String> = HashSet::new();
    let mut seen_target: HashSet<String> = HashSet::new();
    let mut result = Deduplicated::default();

    for record in records {
        let source = field_value(&record, source_field);
        let target = field_value(&record, target_field);

        if seen_source.contains(&source) && seen_target.contains(&target) {
            result.duplicates.push(record);
            continue;
        }

        seen_source.insert(source);
        seen_target.insert(target);
        result.unique.push(record);
    }

    result
}

/// 从每条记录中删除指定字段
pub fn remove_keys(records: &mut [JsonValue], keys: &[String]) {
    if keys.is_empty() {
        return;
    }
    for record in records.iter_mut() {
        if let Some(obj) = record.as_object_mut() {
            for key in keys {
                obj.remove(key);
            }
        }
    }
}

/// 对一个 JSON 数组文件去重
///
/// `unique.json` 与 `duplicates.json` 写到 `folder`（缺省为输入文件所在目录）。
/// 两个文件总会写出，列表为空时写 `[]`，不会留下上一次的旧结果。
pub fn dedup_file(
    input: &Path,
    folder: Option<&Path>,
    source_field: &str,
    target_field: &str,
    keys_to_remove: &[String],
) -> Result<DedupReport> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("无法读取文件: {}", input.display()))?;
    let mut records: Vec<JsonValue> = serde_json::from_str(&content)
        .with_context(|| format!("JSON 解析失败: {}", input.display()))?;

    let original = records.len();
    remove_keys(&mut records, keys_to_remove);
    let result = deduplicate(records, source_field, target_field);

    let out_dir: PathBuf = match folder {
        Some(dir) => dir.to_path_buf(),
        None => input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("无法创建目录: {}", out_dir.display()))?;

    write_json_array(&out_dir.join("unique.json"), &result.unique)?;
    write_json_array(&out_dir.join("duplicates.json"), &result.duplicates)?;

    let report = DedupReport {
        original,
        unique: result.unique.len(),
        duplicates: result.duplicates.len(),
    };
    info!(
        "去重完成: 原始 {} 条, 保留 {} 条, 重复 {} 条",
        report.original, report.unique, report.duplicates
    );
    Ok(report)
}
