//! 抽取接口 - 基础设施层
//!
//! 编排层只认识这个 trait：打开会话、抓一段章节、保存诊断截图、关闭会话。
//! 每个任务独占一个会话，会话从不在 worker 之间共享。

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::ExtractError;
use crate::models::{Book, ChapterRange, Entry, VersionId};

/// 一次抓取的结果
///
/// 默认载荷是经文列表；翻译接口用同一个三分结果返回译文。
#[derive(Debug)]
pub enum FetchOutcome<T = Vec<Entry>> {
    /// 抓到内容
    Success(T),
    /// 目标内容不存在，不再重试
    NotFound(String),
    /// 可重试的错误
    Retryable(ExtractError),
}

/// 经文抽取器
#[async_trait]
pub trait Extractor: Send + Sync + 'static {
    /// 单个任务独占的会话（浏览器 + 页面）
    type Session: Send;

    async fn open_session(&self, label: &str) -> Result<Self::Session, ExtractError>;

    /// 抓取 `range` 内的章节，返回的经文已清洗
    async fn fetch_chapter_range(
        &self,
        session: &mut Self::Session,
        version: VersionId,
        book: &'static Book,
        range: ChapterRange,
        label: &str,
    ) -> FetchOutcome;

    /// 保存诊断截图，失败时返回 None
    async fn capture_artifact(&self, session: &mut Self::Session, label: &str) -> Option<PathBuf>;

    async fn close_session(&self, session: Self::Session);
}
