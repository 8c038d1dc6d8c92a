use std::time::Duration;
use thiserror::Error;
use tokio::sync::AcquireError;

/// Failure taxonomy for the screenshot pipeline.
///
/// `Clone` is required so a single in-flight outcome can be handed to every
/// caller attached to the same capture.
#[derive(Debug, Clone, Error)]
pub enum ScreenshotError {
    #[error("invalid URL `{0}`: expected an absolute http(s) URL")]
    InvalidUrl(String),

    #[error("navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("capture timed out after {0:?}")]
    CaptureTimeout(Duration),

    #[error("browser failure: {0}")]
    BrowserFailed(String),

    #[error("screenshot unavailable: {0}")]
    Unavailable(String),

    #[error("cache I/O error: {0}")]
    CacheIo(String),
}

impl ScreenshotError {
    /// Short stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ScreenshotError::InvalidUrl(_) => "invalid_url",
            ScreenshotError::NavigationFailed { .. } => "navigation",
            ScreenshotError::CaptureTimeout(_) => "timeout",
            ScreenshotError::BrowserFailed(_) => "browser",
            ScreenshotError::Unavailable(_) => "unavailable",
            ScreenshotError::CacheIo(_) => "cache_io",
        }
    }
}

impl From<AcquireError> for ScreenshotError {
    fn from(err: AcquireError) -> Self {
        ScreenshotError::Unavailable(err.to_string())
    }
}

impl From<std::io::Error> for ScreenshotError {
    fn from(err: std::io::Error) -> Self {
        ScreenshotError::CacheIo(err.to_string())
    }
}
