//! Configuration management with serde serialization/deserialization
//!
//! This module provides all configuration structures for the screenshot
//! service, including cache policy, capture limits, and browser settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ScreenshotError;

/// Main configuration structure for the screenshot service
///
/// Controls the HTTP listener, the artifact cache, capture timeouts, and the
/// concurrency cap on simultaneous browser launches.
///
/// # Examples
///
/// ```rust
/// use screenshot_server::Config;
///
/// // Use default configuration
/// let config = Config::default();
///
/// // Create custom configuration
/// let config = Config {
///     max_concurrent_captures: 4,
///     capture_timeout: std::time::Duration::from_secs(15),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Address the HTTP server binds to (default: 127.0.0.1:8080)
    pub listen_addr: String,

    /// Directory where captured artifacts are stored (default: ./screenshot-cache)
    ///
    /// Created on startup if it does not exist. One PNG per capture key.
    pub cache_dir: PathBuf,

    /// How long a cached artifact is considered fresh (default: 24 hours)
    ///
    /// A stale artifact is treated like a miss, but is still served as a
    /// fallback when regeneration fails.
    pub cache_ttl: Duration,

    /// Hard budget for a single browser capture (default: 10 seconds)
    ///
    /// Navigation plus screenshot must finish within this window; the browser
    /// is torn down either way.
    pub capture_timeout: Duration,

    /// Upper bound on the total duration of one HTTP request (default: 30 seconds)
    pub request_timeout: Duration,

    /// Extra quiescence wait after navigation settles (default: 500ms)
    ///
    /// Gives client-rendered content a beat to paint before the frame is
    /// recorded.
    pub settle_delay: Duration,

    /// Maximum number of concurrently running browser captures
    ///
    /// Browser processes are expensive; this caps memory and CPU under load.
    /// Defaults to the CPU count, clamped to 2..=8.
    pub max_concurrent_captures: usize,

    /// Browser viewport used for every capture
    pub viewport: Viewport,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Custom User-Agent string for captures (default: Chrome default)
    pub user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            cache_dir: PathBuf::from("./screenshot-cache"),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            capture_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_millis(500),
            max_concurrent_captures: num_cpus::get().clamp(2, 8),
            viewport: Viewport::default(),
            chrome_path: None,
            user_agent: None,
        }
    }
}

impl Config {
    /// Sanity-check the configuration before startup.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("listen address must not be empty".to_string());
        }
        if self.max_concurrent_captures == 0 {
            return Err("max concurrent captures must be greater than 0".to_string());
        }
        if self.capture_timeout.is_zero() {
            return Err("capture timeout must be greater than 0".to_string());
        }
        if self.request_timeout < self.capture_timeout {
            return Err("request timeout must not be shorter than the capture timeout".to_string());
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err("viewport dimensions must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Browser viewport configuration for captures
///
/// The service renders every page at a fixed desktop viewport; only the
/// above-the-fold region is captured.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Viewport {
    /// Viewport width in pixels (default: 1280)
    pub width: u32,

    /// Viewport height in pixels (default: 800)
    pub height: u32,

    /// Device pixel ratio for high-DPI displays (default: 1.0)
    pub device_scale_factor: f64,

    /// Whether to emulate a mobile device (default: false)
    pub mobile: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            device_scale_factor: 1.0,
            mobile: false,
        }
    }
}

/// Generate Chrome command-line arguments for one capture
///
/// Every capture gets its own user-data and temp directories so concurrent
/// browser processes never trip over each other's profile locks.
pub fn get_chrome_args(config: &Config) -> Vec<String> {
    let unique_id = format!("{}-{}", std::process::id(), uuid::Uuid::new_v4());

    let mut args = vec![
        "--headless".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-background-timer-throttling".to_string(),
        "--disable-backgrounding-occluded-windows".to_string(),
        "--disable-renderer-backgrounding".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--disable-plugins".to_string(),
        "--no-first-run".to_string(),
        "--mute-audio".to_string(),
        "--ignore-certificate-errors".to_string(),
        format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        ),
        format!("--user-data-dir=/tmp/screenshot-server-profile-{unique_id}"),
        format!("--temp-dir=/tmp/screenshot-server-temp-{unique_id}"),
    ];

    if let Some(user_agent) = &config.user_agent {
        args.push(format!("--user-agent={user_agent}"));
    }

    args
}

/// Build a `chromiumoxide` browser configuration from service settings.
pub fn create_browser_config(
    config: &Config,
) -> Result<chromiumoxide::browser::BrowserConfig, ScreenshotError> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport.width, config.viewport.height)
        .args(get_chrome_args(config));

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(ScreenshotError::BrowserFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.capture_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.max_concurrent_captures >= 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_viewport_default() {
        let viewport = Viewport::default();
        assert_eq!(viewport.width, 1280);
        assert_eq!(viewport.height, 800);
        assert_eq!(viewport.device_scale_factor, 1.0);
        assert!(!viewport.mobile);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = Config::default();
        config.max_concurrent_captures = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.viewport.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.request_timeout = Duration::from_secs(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_chrome_args_generation() {
        let config = Config::default();
        let args = get_chrome_args(&config);

        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--disable-gpu".to_string()));
        assert!(args.contains(&format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        )));

        // Unique profile dirs per invocation
        let again = get_chrome_args(&config);
        let profile = |v: &[String]| {
            v.iter()
                .find(|a| a.starts_with("--user-data-dir="))
                .cloned()
                .unwrap()
        };
        assert_ne!(profile(&args), profile(&again));
    }

    #[test]
    fn test_chrome_args_user_agent() {
        let config = Config {
            user_agent: Some("screenshot-server/0.1".to_string()),
            ..Default::default()
        };
        let args = get_chrome_args(&config);
        assert!(args.contains(&"--user-agent=screenshot-server/0.1".to_string()));
    }
}
