//! 错误类型
//!
//! 领域错误用 `thiserror` 定义；应用层（main / App）统一用 `anyhow` 串联上下文。

use std::path::PathBuf;
use thiserror::Error;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 数值必须大于 0
    #[error("配置项 {name} 必须大于 0")]
    MustBePositive { name: &'static str },

    /// 区间上下界颠倒或为负
    #[error("配置项 {name} 区间无效: ({min}, {max})")]
    InvalidRange {
        name: &'static str,
        min: f64,
        max: f64,
    },

    /// 比例超出 (0, 1]
    #[error("配置项 {name} 必须在 (0, 1] 之间, 当前值: {value}")]
    InvalidRatio { name: &'static str, value: f64 },

    /// 语言代码无效
    #[error("语言代码无效: {0}")]
    InvalidLanguages(String),

    /// 未知书卷
    #[error("未知书卷: {0}")]
    UnknownBook(String),

    /// 未知译本
    #[error("未知译本: {0}")]
    UnknownVersion(String),

    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// 检查点读写错误
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("检查点文件读写失败 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("检查点 JSON 解析失败 ({path}): {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("检查点匹配规则无效: {0}")]
    Pattern(#[from] regex::Error),
}

/// 浏览器抽取错误
#[derive(Debug, Error)]
pub enum ExtractError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {0}")]
    LaunchFailed(String),

    /// 导航失败
    #[error("导航到 {url} 失败: {message}")]
    NavigationFailed { url: String, message: String },

    /// 执行脚本失败
    #[error("执行脚本失败: {0}")]
    ScriptFailed(String),

    /// 截图失败
    #[error("截图失败: {0}")]
    ScreenshotFailed(String),

    /// 其他错误
    #[error("{0}")]
    Other(String),
}

impl From<chromiumoxide::error::CdpError> for ExtractError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ExtractError::ScriptFailed(err.to_string())
    }
}
