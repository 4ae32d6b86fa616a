use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::ExtractError;

/// 一个任务独占的浏览器
pub struct BrowserHandle {
    pub browser: Browser,
    pub page: Page,
    handler: JoinHandle<()>,
}

impl BrowserHandle {
    /// 关闭浏览器并停止事件循环，失败只记录日志
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("关闭浏览器失败: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("等待浏览器退出失败: {}", e);
        }
        self.handler.abort();
    }
}

/// 启动浏览器并打开一个空白页面
///
/// # 参数
/// - `headless`: false 时显示浏览器窗口，便于调试
/// - `page_timeout`: 单次 CDP 请求的超时
pub async fn launch_browser(headless: bool, page_timeout: Duration) -> Result<BrowserHandle, ExtractError> {
    info!("🚀 启动{}浏览器...", if headless { "无头" } else { "" });

    let builder = BrowserConfig::builder();
    let builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    let config = builder
        .request_timeout(page_timeout)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            ExtractError::LaunchFailed(e)
        })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        ExtractError::LaunchFailed(e.to_string())
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    let page = match browser.new_page("about:blank").await {
        Ok(page) => page,
        Err(e) => {
            error!("创建页面失败: {}", e);
            handler.abort();
            return Err(ExtractError::LaunchFailed(e.to_string()));
        }
    };

    Ok(BrowserHandle {
        browser,
        page,
        handler,
    })
}
