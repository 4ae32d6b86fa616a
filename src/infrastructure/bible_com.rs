//! bible.com 抽取器 - 基础设施层
//!
//! 每个会话启动一个独立的浏览器，逐章导航并在页面里执行 JS 收集经文。

use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::{launch_browser, BrowserHandle};
use crate::error::ExtractError;
use crate::infrastructure::extractor::{Extractor, FetchOutcome};
use crate::infrastructure::js_executor::JsExecutor;
use crate::models::{Book, ChapterRange, Entry, VersionId};
use crate::utils::{clean_text, sanitize_filename, truncate_text};

const BASE_URL: &str = "https://www.bible.com/bible";
const SCREENSHOT_DIR: &str = "screenshots";

/// 收集当前页面的经文
///
/// 没有编号的段落是上一节的延续，拼接到上一节后面。
const EXTRACT_VERSES_JS: &str = r#"
(async () => {
    const selector = '[class*="ChapterContent_verse"]';
    const deadline = Date.now() + __TIMEOUT__;
    let nodes = document.querySelectorAll(selector);
    while (nodes.length === 0 && Date.now() < deadline) {
        await new Promise(r => setTimeout(r, 250));
        nodes = document.querySelectorAll(selector);
    }

    const verses = [];
    for (const node of nodes) {
        const label = node.querySelector('[class*="ChapterContent_label"]');
        const num = label ? label.innerText.trim() : '';
        const text = Array.from(node.querySelectorAll('[class*="ChapterContent_content"]'))
            .map(e => e.innerText.trim())
            .filter(t => t.length > 0)
            .join(' ');
        if (!text) continue;
        if (!/^\d+$/.test(num) && verses.length > 0) {
            verses[verses.length - 1] += ' ' + text;
        } else {
            verses.push(text);
        }
    }
    return verses;
})()
"#;

/// 章节 URL
pub fn chapter_url(version: VersionId, book: &Book, chapter: u32) -> String {
    let info = version.info();
    format!(
        "{}/{}/{}.{}.{}",
        BASE_URL, info.site_id, book.abbr, chapter, info.suffix
    )
}

/// bible.com 会话
pub struct BibleComSession {
    browser: BrowserHandle,
    executor: JsExecutor,
}

/// bible.com 抽取器
#[derive(Debug, Clone)]
pub struct BibleComExtractor {
    run_dir: PathBuf,
    headless: bool,
    page_timeout: Duration,
}

impl BibleComExtractor {
    pub fn new(run_dir: impl Into<PathBuf>, headless: bool, page_timeout: Duration) -> Self {
        Self {
            run_dir: run_dir.into(),
            headless,
            page_timeout,
        }
    }

    async fn fetch_chapter(
        &self,
        executor: &JsExecutor,
        version: VersionId,
        book: &'static Book,
        chapter: u32,
        label: &str,
    ) -> FetchOutcome {
        let url = chapter_url(version, book, chapter);
        info!("{} 抓取 {}/{}: {}", label, chapter, book.chapters, url);

        if let Err(e) = executor.goto(&url).await {
            return FetchOutcome::Retryable(e);
        }

        let js = EXTRACT_VERSES_JS.replace("__TIMEOUT__", &self.page_timeout.as_millis().to_string());
        let verses: Vec<String> = match executor.eval_as(js).await {
            Ok(verses) => verses,
            Err(e) => return FetchOutcome::Retryable(e),
        };

        if verses.is_empty() {
            return FetchOutcome::NotFound(format!("{} {} 没有抓到经文", book.name, chapter));
        }

        info!("{} 第 {} 章抓到 {} 节", label, chapter, verses.len());
        let entries = verses
            .iter()
            .enumerate()
            .map(|(idx, text)| {
                let text = clean_text(text);
                debug!("{} {}:{} {}", label, chapter, idx + 1, truncate_text(&text, 50));
                Entry {
                    book_id: book.id,
                    book_name: book.name.to_string(),
                    chapter,
                    verse: idx as u32 + 1,
                    version,
                    text,
                }
            })
            .collect();
        FetchOutcome::Success(entries)
    }
}

#[async_trait]
impl Extractor for BibleComExtractor {
    type Session = BibleComSession;

    async fn open_session(&self, label: &str) -> Result<Self::Session, ExtractError> {
        debug!("{} 打开浏览器会话", label);
        let browser = launch_browser(self.headless, self.page_timeout).await?;
        let executor = JsExecutor::new(browser.page.clone(), self.page_timeout);
        Ok(BibleComSession { browser, executor })
    }

    async fn fetch_chapter_range(
        &self,
        session: &mut Self::Session,
        version: VersionId,
        book: &'static Book,
        range: ChapterRange,
        label: &str,
    ) -> FetchOutcome {
        let mut entries = Vec::new();
        for chapter in range.chapters() {
            match self.fetch_chapter(&session.executor, version, book, chapter, label).await {
                FetchOutcome::Success(mut chapter_entries) => entries.append(&mut chapter_entries),
                other => return other,
            }
        }
        FetchOutcome::Success(entries)
    }

    async fn capture_artifact(&self, session: &mut Self::Session, label: &str) -> Option<PathBuf> {
        let dir = self.run_dir.join(SCREENSHOT_DIR);
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("{} 无法创建截图目录: {}", label, e);
            return None;
        }

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{}_{}.png", sanitize_filename(label, 120), stamp);
        let path = dir.join(filename);

        match session.executor.screenshot(&path).await {
            Ok(()) => {
                info!("{} 📸 截图已保存: {}", label, path.display());
                Some(path)
            }
            Err(e) => {
                warn!("{} 截图失败: {}", label, e);
                None
            }
        }
    }

    async fn close_session(&self, session: Self::Session) {
        session.browser.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::find_book;

    #[test]
    fn test_chapter_url() {
        let mark = find_book("Mark").unwrap();
        assert_eq!(
            chapter_url(VersionId::Niv, mark, 4),
            "https://www.bible.com/bible/111/MRK.4.NIV"
        );
        assert_eq!(
            chapter_url(VersionId::Koad21, mark, 1),
            "https://www.bible.com/bible/1231/MRK.1.KOAD21"
        );
    }

    #[tokio::test]
    #[ignore = "需要本地 Chromium 和网络"]
    async fn test_fetch_real_chapter() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = BibleComExtractor::new(dir.path(), true, Duration::from_secs(60));
        let jude = find_book("Jude").unwrap();

        let mut session = extractor.open_session("test").await.unwrap();
        let outcome = extractor
            .fetch_chapter_range(&mut session, VersionId::Niv, jude, ChapterRange::new(1, 1), "test")
            .await;
        extractor.close_session(session).await;

        match outcome {
            FetchOutcome::Success(entries) => assert_eq!(entries.len(), 25),
            other => panic!("抓取失败: {:?}", other),
        }
    }
}
