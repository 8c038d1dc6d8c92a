//! Screenshot orchestration
//!
//! Coordinates cache lookup, freshness evaluation, capture, and write-back.
//! Concurrent requests for the same key collapse onto a single in-flight
//! capture; a global semaphore bounds the number of browsers running at once.

use crate::cache::{CacheStore, CaptureKey};
use crate::capture::{CaptureEngine, CaptureRequest, ChromeCaptureEngine};
use crate::utils::validate_url;
use crate::{metrics, Config, ScreenshotError};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, warn};
use url::Url;

type FlightCell = Arc<OnceCell<Result<Vec<u8>, ScreenshotError>>>;

/// Cached on-demand screenshot service
///
/// The single entry point for callers is [`get_screenshot`]: it returns PNG
/// bytes for a target URL, reusing a fresh cached artifact when one exists
/// and otherwise regenerating it through the capture engine.
///
/// [`get_screenshot`]: ScreenshotService::get_screenshot
pub struct ScreenshotService {
    engine: Arc<dyn CaptureEngine>,
    cache: CacheStore,
    flights: DashMap<CaptureKey, FlightCell>,
    capture_slots: Arc<Semaphore>,
    config: Config,
}

impl ScreenshotService {
    pub async fn new(config: Config) -> Result<Self, ScreenshotError> {
        let engine = Arc::new(ChromeCaptureEngine::new(config.clone()));
        Self::with_engine(config, engine).await
    }

    /// Build the service around an arbitrary capture engine.
    pub async fn with_engine(
        config: Config,
        engine: Arc<dyn CaptureEngine>,
    ) -> Result<Self, ScreenshotError> {
        let cache = CacheStore::open(&config.cache_dir).await?;
        let capture_slots = Arc::new(Semaphore::new(config.max_concurrent_captures));

        Ok(Self {
            engine,
            cache,
            flights: DashMap::new(),
            capture_slots,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn available_capture_slots(&self) -> usize {
        self.capture_slots.available_permits()
    }

    /// Produce PNG bytes for a target URL.
    ///
    /// Fast path: a fresh cached artifact is returned without touching a
    /// browser. Otherwise the caller joins the per-key flight; exactly one
    /// capture runs per key and every attached caller receives its outcome.
    pub async fn get_screenshot(&self, raw_url: &str) -> Result<Vec<u8>, ScreenshotError> {
        let url = validate_url(raw_url)
            .map_err(|_| ScreenshotError::InvalidUrl(raw_url.to_string()))?;
        let key = CaptureKey::from_url(&url)?;

        if let Some(artifact) = self.cache.get(&key).await? {
            if artifact.is_fresh(self.config.cache_ttl) {
                metrics::record_cache_hit();
                debug!(%key, age = ?artifact.age(), "serving fresh artifact");
                return Ok(artifact.bytes);
            }
        }
        metrics::record_cache_miss();

        let flight = {
            let entry = self.flights.entry(key.clone()).or_default();
            Arc::clone(entry.value())
        };
        let outcome = flight
            .get_or_init(|| self.refresh(key.clone(), url))
            .await
            .clone();
        // Only the cell this caller joined is retired; a newer flight for the
        // same key must not be evicted.
        self.flights
            .remove_if(&key, |_, cell| Arc::ptr_eq(cell, &flight));

        outcome
    }

    async fn refresh(&self, key: CaptureKey, url: Url) -> Result<Vec<u8>, ScreenshotError> {
        // Re-check under the flight: a capture that finished between the
        // caller's lookup and joining may already have published.
        let prior = match self.cache.get(&key).await {
            Ok(artifact) => artifact,
            Err(err) => {
                warn!(%key, error = %err, "cache read failed, treating as miss");
                None
            }
        };
        if let Some(artifact) = &prior {
            if artifact.is_fresh(self.config.cache_ttl) {
                return Ok(artifact.bytes.clone());
            }
        }

        let _permit = self.capture_slots.acquire().await?;

        let request = CaptureRequest {
            url: url.clone(),
            viewport: self.config.viewport.clone(),
            timeout: self.config.capture_timeout,
        };
        let started = Instant::now();

        match self.engine.capture(&request).await {
            Ok(bytes) => {
                metrics::record_capture(started.elapsed(), true);
                info!(
                    %key,
                    %url,
                    bytes = bytes.len(),
                    elapsed = ?started.elapsed(),
                    "capture complete"
                );
                if let Err(err) = self.cache.put(&key, &bytes).await {
                    warn!(%key, error = %err, "failed to persist artifact");
                }
                Ok(bytes)
            }
            Err(err) => {
                metrics::record_capture(started.elapsed(), false);
                warn!(%key, %url, kind = err.kind(), error = %err, "capture failed");
                match prior {
                    Some(stale) => {
                        metrics::record_stale_served();
                        warn!(%key, age = ?stale.age(), "serving stale artifact after failed capture");
                        Ok(stale.bytes)
                    }
                    None => Err(err),
                }
            }
        }
    }
}
