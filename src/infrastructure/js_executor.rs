//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"导航 / 执行 JS / 截图"的能力

use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::path::Path;
use std::time::Duration;

use crate::error::ExtractError;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 不认识书卷 / 译本
/// - 不处理重试
pub struct JsExecutor {
    page: Page,
    page_timeout: Duration,
}

impl JsExecutor {
    pub fn new(page: Page, page_timeout: Duration) -> Self {
        Self { page, page_timeout }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 导航到 URL，超过页面超时视为失败
    pub async fn goto(&self, url: &str) -> Result<(), ExtractError> {
        let navigation = self.page.goto(url);
        match tokio::time::timeout(self.page_timeout, navigation).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ExtractError::NavigationFailed {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(ExtractError::NavigationFailed {
                url: url.to_string(),
                message: format!("超时 ({}ms)", self.page_timeout.as_millis()),
            }),
        }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, ExtractError> {
        let result = self.page.evaluate(js_code.into()).await?;
        result
            .into_value()
            .map_err(|e| ExtractError::ScriptFailed(e.to_string()))
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        js_code: impl Into<String>,
    ) -> Result<T, ExtractError> {
        let json_value = self.eval(js_code).await?;
        serde_json::from_value(json_value).map_err(|e| ExtractError::ScriptFailed(e.to_string()))
    }

    /// 整页截图保存为 PNG
    pub async fn screenshot(&self, path: &Path) -> Result<(), ExtractError> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.page
            .save_screenshot(params, path)
            .await
            .map(|_| ())
            .map_err(|e| ExtractError::ScreenshotFailed(e.to_string()))
    }
}
