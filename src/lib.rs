//! # Screenshot Server
//!
//! A cached on-demand web screenshot service written in Rust. Given a target
//! URL, it returns a rendered-page PNG, reusing a prior capture while fresh
//! (24 hour TTL) and otherwise regenerating it with a headless Chrome
//! browser. Concurrent requests for the same target collapse onto a single
//! capture, and a global cap bounds the number of browsers running at once.
//!
//! ## Features
//!
//! - **Disk artifact cache**: one PNG per target host, atomically published
//! - **Single-flight captures**: no redundant browser work under concurrency
//! - **Serve-stale-on-error**: a stale artifact beats a failed recapture
//! - **Bounded browsers**: semaphore-limited concurrent Chrome processes
//! - **Operational endpoints**: `/health` and Prometheus `/metrics`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use screenshot_server::{Config, ScreenshotService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let service = ScreenshotService::new(config).await?;
//!
//!     let png = service.get_screenshot("https://example.com").await?;
//!     println!("captured {} bytes", png.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## HTTP Usage
//!
//! ```bash
//! screenshot-server serve --port 8080
//! curl 'http://127.0.0.1:8080/screenshot?url=https%3A%2F%2Fexample.com' -o shot.png
//! ```

/// Configuration and settings for the screenshot service
pub mod config;

/// Error types and error handling utilities
pub mod error;

/// Filesystem cache for captured artifacts
pub mod cache;

/// Headless browser capture engine
pub mod capture;

/// Main screenshot service orchestrating cache and capture
pub mod service;

/// HTTP boundary exposing the service
pub mod server;

/// Command-line interface implementation
pub mod cli;

/// Performance metrics collection
pub mod metrics;

/// Utility functions and helpers
pub mod utils;


pub use cache::*;
pub use capture::*;
pub use cli::*;
pub use config::*;
pub use error::*;
pub use server::*;
pub use service::*;
pub use utils::*;
