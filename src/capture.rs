//! Headless browser capture engine
//!
//! Each capture launches its own isolated Chrome process, renders the target
//! URL at a fixed viewport, and records a PNG of the visible frame. The
//! process and its CDP handler task are torn down on every exit path,
//! including timeout.

use crate::{create_browser_config, Config, ScreenshotError, Viewport};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};
use url::Url;

/// Everything the engine needs to produce one image.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub url: Url,
    pub viewport: Viewport,
    pub timeout: Duration,
}

/// Seam between the orchestration layer and the browser.
///
/// The production implementation drives Chrome; tests substitute a stub.
#[async_trait]
pub trait CaptureEngine: Send + Sync {
    async fn capture(&self, request: &CaptureRequest) -> Result<Vec<u8>, ScreenshotError>;
}

/// Chrome-backed capture engine.
pub struct ChromeCaptureEngine {
    config: Config,
}

impl ChromeCaptureEngine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    async fn launch(&self) -> Result<BrowserSession, ScreenshotError> {
        let browser_config = create_browser_config(&self.config)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScreenshotError::BrowserFailed(e.to_string()))?;

        // The handler implements Stream and must be polled for the lifetime
        // of the browser to service CDP traffic.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "CDP handler event error");
                }
            }
        });

        Ok(BrowserSession {
            browser,
            handler: handler_task,
        })
    }

    async fn capture_page(
        &self,
        session: &BrowserSession,
        request: &CaptureRequest,
    ) -> Result<Vec<u8>, ScreenshotError> {
        let page = session
            .browser
            .new_page(request.url.as_str())
            .await
            .map_err(|e| ScreenshotError::NavigationFailed {
                url: request.url.to_string(),
                reason: e.to_string(),
            })?;

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(request.viewport.width)
            .height(request.viewport.height)
            .device_scale_factor(request.viewport.device_scale_factor)
            .mobile(request.viewport.mobile)
            .build()
            .map_err(ScreenshotError::BrowserFailed)?;
        page.execute(metrics)
            .await
            .map_err(|e| ScreenshotError::BrowserFailed(e.to_string()))?;

        // Wait for the network to settle so client-rendered content is
        // included, then give the page a short beat to paint.
        page.wait_for_navigation()
            .await
            .map_err(|e| ScreenshotError::NavigationFailed {
                url: request.url.to_string(),
                reason: e.to_string(),
            })?;
        sleep(self.config.settle_delay).await;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let bytes = page
            .screenshot(params)
            .await
            .map_err(|e| ScreenshotError::BrowserFailed(e.to_string()))?;

        let _ = page.close().await;
        Ok(bytes)
    }
}

#[async_trait]
impl CaptureEngine for ChromeCaptureEngine {
    async fn capture(&self, request: &CaptureRequest) -> Result<Vec<u8>, ScreenshotError> {
        let session = self.launch().await?;

        let outcome = timeout(request.timeout, self.capture_page(&session, request)).await;
        session.close().await;

        match outcome {
            Ok(result) => result,
            Err(_) => Err(ScreenshotError::CaptureTimeout(request.timeout)),
        }
    }
}

/// A running browser plus the task polling its CDP event stream.
struct BrowserSession {
    browser: Browser,
    handler: tokio::task::JoinHandle<()>,
}

impl BrowserSession {
    async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "browser did not close cleanly");
        }
        self.handler.abort();
    }
}
