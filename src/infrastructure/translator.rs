//! 翻译接口 - 基础设施层
//!
//! 与 `Extractor` 相同的会话模型：每个句子批次独占一个会话，用完即关。

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::ExtractError;
use crate::infrastructure::extractor::FetchOutcome;

/// 一次请求拿到的译文
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// 整段译文，句子之间仍由合并符号分隔
    Merged(String),
    /// 站点直接给出的 (原文, 译文) 行
    Pairs(Vec<(String, String)>),
}

/// 句子翻译器
#[async_trait]
pub trait Translator: Send + Sync + 'static {
    type Session: Send;

    async fn open_session(&self, label: &str) -> Result<Self::Session, ExtractError>;

    /// 翻译一段（可能由多句合并而成的）文本
    async fn translate(
        &self,
        session: &mut Self::Session,
        text: &str,
        label: &str,
    ) -> FetchOutcome<Translation>;

    /// 重试前恢复会话（例如重新加载页面）
    async fn reset_session(&self, _session: &mut Self::Session, _label: &str) {}

    /// 保存诊断截图，失败时返回 None
    async fn capture_artifact(&self, session: &mut Self::Session, label: &str) -> Option<PathBuf>;

    async fn close_session(&self, session: Self::Session);
}
