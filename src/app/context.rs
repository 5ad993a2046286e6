use std::sync::Arc;

use crate::app::error::Result;
use crate::cache::ResponseCache;
use crate::checker::{ParallelChecker, StockChecker, DEFAULT_WORKERS};
use crate::config::Config;
use crate::fetcher::http_fetcher::{FetchSettings, HttpFetcher};
use crate::fetcher::Fetcher;
use crate::locator::Locator;
use crate::monitor::{Engine, EngineSettings};
use crate::notifier::{self, Notifier};
use crate::parser::Parser;

pub struct AppContext {
    pub config: Config,
    pub locator: Locator,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub cache: Arc<ResponseCache>,
    pub checker: Arc<StockChecker>,
    pub parallel_checker: ParallelChecker,
    pub notifier: Arc<dyn Notifier + Send + Sync>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_workers(config, DEFAULT_WORKERS)
    }

    pub fn with_workers(config: Config, workers: usize) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(HttpFetcher::new(FetchSettings::from_config(&config))?);
        Ok(Self::with_fetcher(config, fetcher, workers))
    }

    /// Wire everything around an existing fetcher.
    pub fn with_fetcher(
        config: Config,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        workers: usize,
    ) -> Self {
        let locator = Locator::new(config.site.domain.clone());
        let cache = Arc::new(ResponseCache::from_config(&config.cache));
        let parser = Parser::new(config.parser.clone());
        let checker = Arc::new(StockChecker::new(fetcher.clone(), parser, cache.clone()));
        let parallel_checker = ParallelChecker::with_workers(checker.clone(), workers);
        let notifier = notifier::from_config(&config.notifier);

        Self {
            config,
            locator,
            fetcher,
            cache,
            checker,
            parallel_checker,
            notifier,
        }
    }

    /// A monitoring engine sharing this context's client, cache and notifier.
    pub fn engine(&self) -> Engine {
        Engine::new(
            self.checker.clone(),
            self.locator.clone(),
            self.notifier.clone(),
            EngineSettings::from_config(&self.config),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::tests::counting_fetcher;
    use crate::config::CacheConfig;

    #[tokio::test]
    async fn test_engine_uses_shared_cache() {
        let config = Config {
            cache: CacheConfig {
                max_age: 60,
                ..CacheConfig::default()
            },
            ..Config::default()
        };
        let ctx = AppContext::with_fetcher(config, counting_fetcher(), 2);

        let target = ctx
            .locator
            .target("https://www.bestbuy.ca/en-ca/product/1234567")
            .unwrap();
        let results = ctx.parallel_checker.check_all(vec![target]).await;
        assert!(results[0].1.is_ok());
        assert_eq!(ctx.cache.len(), 1);

        let engine = ctx.engine();
        let mut events = engine.subscribe();
        engine
            .watch("https://www.bestbuy.ca/en-ca/product/1234567", None)
            .unwrap();
        loop {
            if let crate::monitor::MonitorEvent::Checked { from_cache, .. } =
                events.recv().await.unwrap()
            {
                assert!(from_cache);
                break;
            }
        }
    }

    #[test]
    fn test_locator_follows_configured_domain() {
        let mut config = Config::default();
        config.site.domain = "example.com".to_string();
        let ctx = AppContext::with_fetcher(config, counting_fetcher(), 1);
        assert_eq!(ctx.locator.domain(), "example.com");
    }
}
