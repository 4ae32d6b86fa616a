//! 句子来源
//!
//! 输入是一个 JSON 数组，元素可以是字符串，也可以是 `{"source": .., "original": ..}`。
//! 没有对照文本时用原文本身；空白句子丢弃。

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::models::SentencePair;
use crate::utils::collapse_whitespace;

#[derive(Deserialize)]
#[serde(untagged)]
enum SentenceInput {
    Text(String),
    Pair {
        source: String,
        #[serde(default)]
        original: Option<String>,
    },
}

/// 从 JSON 字符串解析句子列表
pub fn parse_sentences(content: &str) -> Result<Vec<SentencePair>> {
    let inputs: Vec<SentenceInput> = serde_json::from_str(content).context("句子列表 JSON 解析失败")?;

    let pairs: Vec<SentencePair> = inputs
        .into_iter()
        .filter_map(|input| {
            let (source, original) = match input {
                SentenceInput::Text(text) => (text.clone(), text),
                SentenceInput::Pair { source, original } => {
                    let original = original.unwrap_or_else(|| source.clone());
                    (source, original)
                }
            };
            let source = collapse_whitespace(&source);
            if source.is_empty() {
                return None;
            }
            Some(SentencePair {
                source,
                original: collapse_whitespace(&original),
            })
        })
        .collect();

    Ok(pairs)
}

/// 读取句子文件
pub fn load_sentences(path: &Path) -> Result<Vec<SentencePair>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("无法读取句子文件: {}", path.display()))?;
    let pairs = parse_sentences(&content).with_context(|| format!("句子文件无效: {}", path.display()))?;
    if pairs.is_empty() {
        bail!("句子文件中没有可翻译的句子: {}", path.display());
    }
    info!("📄 已加载 {} 个句子: {}", pairs.len(), path.display());
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_inputs() {
        let pairs = parse_sentences(
            r#"["  love ", {"source": "heart", "original": "kolon"}, {"source": "grief"}, "   "]"#,
        )
        .unwrap();

        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], SentencePair { source: "love".into(), original: "love".into() });
        assert_eq!(pairs[1].original, "kolon");
        assert_eq!(pairs[2].original, "grief");
    }

    #[test]
    fn test_empty_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentences.json");
        fs::write(&path, "[]").unwrap();
        assert!(load_sentences(&path).is_err());
        assert!(load_sentences(&dir.path().join("missing.json")).is_err());
    }
}
