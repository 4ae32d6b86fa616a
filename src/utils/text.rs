//! 文本清洗与文件名处理

use regex::Regex;
use std::sync::OnceLock;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn invisible_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("[\u{200B}\u{200C}\u{200D}\u{FEFF}\u{2028}\u{2029}]").expect("valid regex"))
}

fn unsafe_filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_\-\.]").expect("valid regex"))
}

fn underscores_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_+").expect("valid regex"))
}

/// 清洗抓取到的经文
///
/// - 所有空白（含不换行空格）折叠成一个空格
/// - 各类引号统一成单引号
/// - 去掉零宽字符
/// - 去掉整段包裹的方括号
pub fn clean_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let text = whitespace_re().replace_all(text, " ");
    let text: String = text
        .chars()
        .map(|c| match c {
            '"' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();
    let text = invisible_re().replace_all(&text, "");
    let mut text = text.trim();

    if text.len() >= 2 && text.starts_with('[') && text.ends_with(']') {
        text = text[1..text.len() - 1].trim();
    }

    whitespace_re().replace_all(text, " ").into_owned()
}

/// 空白折叠成单个空格并去掉首尾空白，其余字符原样保留
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 把任意文本转成安全的文件名：只保留 `[A-Za-z0-9_.-]`
pub fn sanitize_filename(text: &str, max_length: usize) -> String {
    let sanitized = unsafe_filename_re().replace_all(text, "_");
    let sanitized = underscores_re().replace_all(&sanitized, "_");
    let sanitized = sanitized.trim_matches(|c| c == '.' || c == '-' || c == '_');

    if sanitized.is_empty() {
        return "unnamed".to_string();
    }

    if sanitized.len() <= max_length {
        return sanitized.to_string();
    }

    // 只剩 ASCII，可以按字节截断
    match sanitized.rfind('.') {
        Some(dot) if dot > 0 && sanitized.len() - dot <= 10 && sanitized.len() - dot < max_length => {
            let ext = &sanitized[dot..];
            format!("{}{}", &sanitized[..max_length - ext.len()], ext)
        }
        _ => sanitized[..max_length].to_string(),
    }
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_normalizes_whitespace_and_quotes() {
        assert_eq!(
            clean_text("  Ha\u{00A0}Doue\n\tlavaras: \u{201C}Ra vo\u{201D}  "),
            "Ha Doue lavaras: 'Ra vo'"
        );
        assert_eq!(clean_text("a\u{200B}b"), "ab");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_clean_text_strips_wrapping_brackets() {
        assert_eq!(clean_text("[ text in brackets ]"), "text in brackets");
        assert_eq!(clean_text("[a] and [b]"), "a] and [b");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("Worker 1 | Batch 3/12 | NIV GEN chapters 1-17 |", 80),
            "Worker_1_Batch_3_12_NIV_GEN_chapters_1-17"
        );
        assert_eq!(sanitize_filename("|||", 80), "unnamed");
        assert_eq!(sanitize_filename("abcdefghij.json", 8), "abc.json");
        assert_eq!(sanitize_filename("abcdefghij", 4), "abcd");
    }

    #[test]
    fn test_collapse_whitespace_keeps_quotes() {
        assert_eq!(collapse_whitespace("  \"Ra\n vo\"\t "), "\"Ra vo\"");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
    }
}
