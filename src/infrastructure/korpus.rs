//! Korpus Kernewek 翻译器 - 基础设施层
//!
//! 语料库站点按短语检索，返回 (英文, 康沃尔语) 对照行。

use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::{launch_browser, BrowserHandle};
use crate::error::ExtractError;
use crate::infrastructure::extractor::FetchOutcome;
use crate::infrastructure::js_executor::JsExecutor;
use crate::infrastructure::translator::{Translation, Translator};
use crate::utils::{sanitize_filename, truncate_text};

pub const KORPUS_URL: &str = "https://www.akademikernewek.org.uk/corpus/?locale=en";
const SCREENSHOT_DIR: &str = "screenshots";

/// 填写检索框、点击检索按钮并收集结果行
///
/// 第一次点击后没有结果时再点一次；两次都没有结果返回空列表。
const SEARCH_JS: &str = r#"
(async () => {
    const sleep = ms => new Promise(r => setTimeout(r, ms));
    const deadline = Date.now() + __TIMEOUT__;
    let input = document.querySelector('input.gwt-TextBox.searchBox');
    while (!input && Date.now() < deadline) {
        await sleep(250);
        input = document.querySelector('input.gwt-TextBox.searchBox');
    }
    if (!input) return { error: 'search box not found' };

    const text = __TEXT__;
    for (let i = 0; i < 3 && input.value !== text; i++) {
        input.value = text;
        input.dispatchEvent(new Event('input', { bubbles: true }));
        input.dispatchEvent(new Event('change', { bubbles: true }));
    }
    if (input.value !== text) return { error: 'failed to set search text' };

    const rows = () => Array.from(document.querySelectorAll('tr.even, tr.odd'));
    for (let attempt = 0; attempt < 2; attempt++) {
        const buttons = document.querySelectorAll('button.gwt-Button.searchButton');
        if (buttons.length === 0) return { error: 'search button not found' };
        buttons[buttons.length - 1].click();

        const wait = Date.now() + 5000;
        while (rows().length === 0 && Date.now() < wait) {
            await sleep(250);
        }
        if (rows().length > 0) break;
    }

    const found = rows().map(row => {
        const cells = row.innerText.trim().replace(/"/g, "'").split('\t');
        return [(cells[0] || '').trim(), (cells[1] || '').trim()];
    });
    return { rows: found };
})()
"#;

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    rows: Vec<(String, String)>,
    #[serde(default)]
    error: Option<String>,
}

/// Korpus 会话
pub struct KorpusSession {
    browser: BrowserHandle,
    executor: JsExecutor,
}

/// Korpus Kernewek 翻译器
#[derive(Debug, Clone)]
pub struct KorpusTranslator {
    run_dir: PathBuf,
    headless: bool,
    page_timeout: Duration,
}

impl KorpusTranslator {
    pub fn new(run_dir: impl Into<PathBuf>, headless: bool, page_timeout: Duration) -> Self {
        Self {
            run_dir: run_dir.into(),
            headless,
            page_timeout,
        }
    }

    fn search_js(&self, text: &str) -> Result<String, ExtractError> {
        // 站点对双引号处理不好，统一换成单引号
        let literal = serde_json::to_string(&text.replace('"', "'"))
            .map_err(|e| ExtractError::ScriptFailed(e.to_string()))?;
        Ok(SEARCH_JS
            .replace("__TIMEOUT__", &self.page_timeout.as_millis().to_string())
            .replace("__TEXT__", &literal))
    }
}

#[async_trait]
impl Translator for KorpusTranslator {
    type Session = KorpusSession;

    async fn open_session(&self, label: &str) -> Result<Self::Session, ExtractError> {
        debug!("{} 打开浏览器会话", label);
        let browser = launch_browser(self.headless, self.page_timeout).await?;
        let executor = JsExecutor::new(browser.page.clone(), self.page_timeout);
        if let Err(e) = executor.goto(KORPUS_URL).await {
            browser.close().await;
            return Err(e);
        }
        Ok(KorpusSession { browser, executor })
    }

    async fn translate(
        &self,
        session: &mut Self::Session,
        text: &str,
        label: &str,
    ) -> FetchOutcome<Translation> {
        debug!("{} 检索: {}", label, truncate_text(text, 80));
        let js = match self.search_js(text) {
            Ok(js) => js,
            Err(e) => return FetchOutcome::Retryable(e),
        };

        let result: SearchResult = match session.executor.eval_as(js).await {
            Ok(result) => result,
            Err(e) => return FetchOutcome::Retryable(e),
        };

        if let Some(error) = result.error {
            return FetchOutcome::Retryable(ExtractError::ScriptFailed(error));
        }
        if result.rows.is_empty() {
            return FetchOutcome::NotFound(format!("没有检索结果: {}", truncate_text(text, 40)));
        }

        debug!("{} 检索到 {} 行", label, result.rows.len());
        FetchOutcome::Success(Translation::Pairs(result.rows))
    }

    async fn reset_session(&self, session: &mut Self::Session, label: &str) {
        if let Err(e) = session.executor.goto(KORPUS_URL).await {
            warn!("{} 重新加载页面失败: {}", label, e);
        }
    }

    async fn capture_artifact(&self, session: &mut Self::Session, label: &str) -> Option<PathBuf> {
        let dir = self.run_dir.join(SCREENSHOT_DIR);
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("{} 无法创建截图目录: {}", label, e);
            return None;
        }

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{}_{}.png", sanitize_filename(label, 120), stamp));

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
