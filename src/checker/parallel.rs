use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::app::{ReupError, Result};
use crate::checker::{Check, StockChecker};
use crate::domain::TargetRef;

pub const DEFAULT_WORKERS: usize = 10;

/// One-shot checks of many targets with bounded concurrency.
pub struct ParallelChecker {
    checker: Arc<StockChecker>,
    semaphore: Arc<Semaphore>,
}

impl ParallelChecker {
    pub fn new(checker: Arc<StockChecker>) -> Self {
        Self::with_workers(checker, DEFAULT_WORKERS)
    }

    pub fn with_workers(checker: Arc<StockChecker>, workers: usize) -> Self {
        Self {
            checker,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Results come back in input order.
    pub async fn check_all(&self, targets: Vec<TargetRef>) -> Vec<(TargetRef, Result<Check>)> {
        let mut handles = Vec::new();

        for target in targets {
            let checker = self.checker.clone();
            let semaphore = self.semaphore.clone();

            let handle = tokio::spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => checker.check(target.canonical_id()).await,
                    Err(_) => Err(ReupError::Other("worker pool closed".to_string())),
                };
                (target, result)
            });

            handles.push(handle);
        }

        join_all(handles)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                    None
                }
            })
            .collect()
    }
}
