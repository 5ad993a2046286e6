//! One availability check: cache, then fetch and parse on a miss.

pub mod parallel;

use std::sync::Arc;

use crate::app::Result;
use crate::cache::ResponseCache;
use crate::domain::AvailabilityRecord;
use crate::fetcher::Fetcher;
use crate::parser::Parser;

pub use parallel::{ParallelChecker, DEFAULT_WORKERS};

/// Outcome of a successful check.
#[derive(Debug, Clone)]
pub struct Check {
    pub record: AvailabilityRecord,
    pub from_cache: bool,
}

pub struct StockChecker {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    parser: Parser,
    cache: Arc<ResponseCache>,
}

impl StockChecker {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        parser: Parser,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            fetcher,
            parser,
            cache,
        }
    }

    pub async fn check(&self, canonical_id: &str) -> Result<Check> {
        if let Some(record) = self.cache.get(canonical_id) {
            tracing::debug!("Cache hit for {}", canonical_id);
            return Ok(Check {
                record,
                from_cache: true,
            });
        }

        let doc = self.fetcher.fetch(canonical_id).await?;
        let record = self.parser.parse(&doc)?;
        self.cache.put(canonical_id, record.clone(), None);

        Ok(Check {
            record,
            from_cache: false,
        })
    }
}
