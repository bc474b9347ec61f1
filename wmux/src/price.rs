//! Native-token USD prices with an owned TTL cache.
//!
//! [`PriceFeed`] is constructed by whichever component shows fiat values next
//! to wallet balances; it owns its cache instead of sharing a module-level one.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt;
use std::time::Duration;

use crate::cache::{Clock, SystemClock, TtlCache};
use crate::config::WalletConfig;

/// Error returned by a [`PriceSource`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("price lookup for {symbol} failed: {reason}")]
pub struct PriceError {
    /// Symbol that was looked up.
    pub symbol: String,
    /// Why the lookup failed.
    pub reason: String,
}

impl PriceError {
    /// Creates a price error.
    pub fn new(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

/// Something that can quote a token symbol in USD.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Returns the USD price of one unit of `symbol` (upper-case).
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if no quote is available.
    async fn usd_price(&self, symbol: &str) -> Result<Decimal, PriceError>;
}

/// A [`PriceSource`] wrapper that caches successful quotes.
///
/// Failures are never cached, so the next call retries the source.
pub struct PriceFeed<S, C = SystemClock> {
    source: S,
    cache: TtlCache<String, Decimal, C>,
}

impl<S> PriceFeed<S, SystemClock> {
    /// Creates a feed with the given TTL on the system clock.
    #[must_use]
    pub fn new(source: S, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, SystemClock::new())
    }

    /// Creates a feed using the configured `price_cache_ttl_secs`.
    #[must_use]
    pub fn from_config(source: S, config: &WalletConfig) -> Self {
        Self::new(source, config.price_cache_ttl())
    }
}

impl<S, C> PriceFeed<S, C> {
    /// Creates a feed with an explicit clock.
    pub fn with_clock(source: S, ttl: Duration, clock: C) -> Self {
        Self {
            source,
            cache: TtlCache::with_clock(ttl, clock),
        }
    }
}

impl<S: PriceSource, C: Clock> PriceFeed<S, C> {
    /// Returns the USD price of `symbol`, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the source's [`PriceError`] on a cache miss that fails.
    pub async fn usd_price(&self, symbol: &str) -> Result<Decimal, PriceError> {
        let key = symbol.trim().to_ascii_uppercase();
        if let Some(price) = self.cache.get(&key) {
            return Ok(price);
        }
        match self.source.usd_price(&key).await {
            Ok(price) => {
                self.cache.insert(key, price);
                Ok(price)
            }
            Err(err) => {
                tracing::warn!(symbol = %key, error = %err, "Price lookup failed");
                Err(err)
            }
        }
    }

    /// Converts an amount of `symbol` to USD.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if the price is unavailable.
    pub async fn usd_value(&self, symbol: &str, amount: Decimal) -> Result<Decimal, PriceError> {
        Ok(self.usd_price(symbol).await? * amount)
    }

    /// Drops all cached quotes.
    pub fn invalidate(&self) {
        self.cache.clear();
    }
}

impl<S, C> fmt::Debug for PriceFeed<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceFeed")
            .field("ttl", &self.cache.ttl())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceSource for CountingSource {
        async fn usd_price(&self, symbol: &str) -> Result<Decimal, PriceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match symbol {
                "ETH" => Ok(Decimal::new(3000, 0)),
                "DOT" => Ok(Decimal::new(725, 2)),
                _ => Err(PriceError::new(symbol, "unknown symbol")),
            }
        }
    }

    #[tokio::test]
    async fn test_caches_until_ttl() {
        let clock = ManualClock::new();
        let feed = PriceFeed::with_clock(
            CountingSource::default(),
            Duration::from_secs(60),
            clock.clone(),
        );
        assert_eq!(feed.usd_price("eth").await.unwrap(), Decimal::new(3000, 0));
        assert_eq!(feed.usd_price("ETH").await.unwrap(), Decimal::new(3000, 0));
        assert_eq!(feed.source.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(61));
        feed.usd_price("ETH").await.unwrap();
        assert_eq!(feed.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let feed = PriceFeed::with_clock(
            CountingSource::default(),
            Duration::from_secs(60),
            ManualClock::new(),
        );
        assert!(feed.usd_price("XYZ").await.is_err());
        assert!(feed.usd_price("XYZ").await.is_err());
        assert_eq!(feed.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_usd_value() {
        let feed = PriceFeed::with_clock(
            CountingSource::default(),
            Duration::from_secs(60),
            ManualClock::new(),
        );
        let value = feed.usd_value("dot", Decimal::new(2, 0)).await.unwrap();
        assert_eq!(value, Decimal::new(1450, 2));
    }
}
