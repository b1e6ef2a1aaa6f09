//! Per-symbol precision resolution with a persisted cache
//!
//! Market specs are resolved lazily from exchange instrument metadata and
//! cached indefinitely (no TTL) in a JSON file that survives restarts. A
//! cached entry is only overwritten by an explicit fresh resolution.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::common::errors::Result;
use crate::common::traits::InstrumentMeta;
use crate::common::types::MarketSpec;

/// Resolves and caches per-symbol rounding rules
pub struct PrecisionResolver<I: InstrumentMeta> {
    meta: Arc<I>,
    cache_path: Option<PathBuf>,
    cache: HashMap<String, MarketSpec>,
}

impl<I: InstrumentMeta> PrecisionResolver<I> {
    /// Create a resolver backed by a JSON cache file. An unreadable or
    /// missing file starts the cache empty.
    pub fn new(meta: Arc<I>, cache_path: impl Into<PathBuf>) -> Self {
        let cache_path = cache_path.into();
        let cache = load_cache_file(&cache_path);
        Self {
            meta,
            cache_path: Some(cache_path),
            cache,
        }
    }

    /// Create a resolver with no persistence (used in tests)
    pub fn in_memory(meta: Arc<I>) -> Self {
        Self {
            meta,
            cache_path: None,
            cache: HashMap::new(),
        }
    }

    /// Return the cached spec for a symbol, or query the exchange, cache the
    /// result and persist the cache.
    pub async fn resolve(&mut self, symbol: &str) -> Result<MarketSpec> {
        if let Some(spec) = self.cache.get(symbol) {
            debug!("[{}] precision loaded from cache", symbol);
            return Ok(spec.clone());
        }

        let spec = self.meta.get_market_spec(symbol).await?;
        info!(
            "[{}] precision resolved: price dp {}, amount dp {}, min {}",
            symbol, spec.price_precision, spec.amount_precision, spec.min_amount
        );
        self.cache.insert(symbol.to_string(), spec.clone());
        self.persist();
        Ok(spec)
    }

    /// Force a fresh resolution, overwriting any cached entry
    pub async fn refresh(&mut self, symbol: &str) -> Result<MarketSpec> {
        let spec = self.meta.get_market_spec(symbol).await?;
        self.cache.insert(symbol.to_string(), spec.clone());
        self.persist();
        Ok(spec)
    }

    fn persist(&self) {
        let Some(path) = &self.cache_path else {
            return;
        };
        match serde_json::to_string_pretty(&self.cache) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    warn!("failed to persist precision cache to {:?}: {}", path, e);
                }
            }
            Err(e) => warn!("failed to serialize precision cache: {}", e),
        }
    }
}

fn load_cache_file(path: &PathBuf) -> HashMap<String, MarketSpec> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("ignoring malformed precision cache {:?}: {}", path, e);
                HashMap::new()
            }
        },
        Err(_) => HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::StrategyError;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingMeta {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl InstrumentMeta for CountingMeta {
        async fn get_market_spec(&self, symbol: &str) -> Result<MarketSpec> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if symbol == "UNLISTED" {
                return Err(StrategyError::PrecisionUnavailable(symbol.to_string()));
            }
            Ok(MarketSpec {
                price_precision: 2,
                amount_precision: 3,
                min_amount: dec!(0.001),
                tick_size: dec!(0.01),
            })
        }
    }

    #[tokio::test]
    async fn test_resolve_hits_cache_on_second_call() {
        let meta = Arc::new(CountingMeta {
            calls: AtomicUsize::new(0),
        });
        let mut resolver = PrecisionResolver::in_memory(meta.clone());

        let first = resolver.resolve("BTCUSDT").await.unwrap();
        let second = resolver.resolve("BTCUSDT").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(meta.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unlisted_symbol_fails() {
        let meta = Arc::new(CountingMeta {
            calls: AtomicUsize::new(0),
        });
        let mut resolver = PrecisionResolver::in_memory(meta);
        let err = resolver.resolve("UNLISTED").await.unwrap_err();
        assert!(matches!(err, StrategyError::PrecisionUnavailable(_)));
    }

    #[tokio::test]
    async fn test_cache_survives_restart() {
        let path = std::env::temp_dir().join(format!(
            "precision_cache_test_{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let meta = Arc::new(CountingMeta {
            calls: AtomicUsize::new(0),
        });
        {
            let mut resolver = PrecisionResolver::new(meta.clone(), &path);
            resolver.resolve("BTCUSDT").await.unwrap();
        }
        // a fresh resolver loads the persisted entry and never re-queries
        let mut resolver = PrecisionResolver::new(meta.clone(), &path);
        resolver.resolve("BTCUSDT").await.unwrap();
        assert_eq!(meta.calls.load(Ordering::SeqCst), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_refresh_requeries() {
        let meta = Arc::new(CountingMeta {
            calls: AtomicUsize::new(0),
        });
        let mut resolver = PrecisionResolver::in_memory(meta.clone());
        resolver.resolve("BTCUSDT").await.unwrap();
        resolver.refresh("BTCUSDT").await.unwrap();
        assert_eq!(meta.calls.load(Ordering::SeqCst), 2);
    }
}
