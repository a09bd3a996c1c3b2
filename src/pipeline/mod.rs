//! End-to-end run: holders → inventories → similarity.

use crate::batch::{BatchFailure, BatchRequester, FailureReporter, NoopReporter, Stage};
use crate::config::{ApiConfig, FetchConfig};
use crate::fetcher::HttpGet;
use crate::holders::{HolderCollector, InputError};
use crate::inventory::{InventoryIndex, InventoryIndexer};
use crate::similarity::{analyze, SimilarityResult};
use crate::types::CollectionAddress;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// A failed request, tagged with the stage that issued it.
#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub stage: String,
    pub input: String,
    pub error: String,
}

impl StageFailure {
    fn from_batch(stage: Stage, failure: BatchFailure<String>) -> Self {
        Self {
            stage: stage.to_string(),
            input: failure.input,
            error: failure.error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub collections: usize,
    pub holders: usize,
    pub indexed_accounts: usize,
    pub result: SimilarityResult,
    pub failures: Vec<StageFailure>,
    #[serde(skip)]
    pub index: InventoryIndex,
}

impl PipelineReport {
    /// True when every request in both stages succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Pipeline {
    holders: HolderCollector,
    inventories: InventoryIndexer,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn HttpGet>, api: ApiConfig, fetch: &FetchConfig) -> Self {
        Self::with_reporter(fetcher, api, fetch, Arc::new(NoopReporter))
    }

    pub fn with_reporter(
        fetcher: Arc<dyn HttpGet>,
        api: ApiConfig,
        fetch: &FetchConfig,
        reporter: Arc<dyn FailureReporter>,
    ) -> Self {
        let batch = Arc::new(
            BatchRequester::new(fetcher, fetch.request_timeout())
                .with_max_concurrency(fetch.max_concurrency),
        );
        Self {
            holders: HolderCollector::new(batch.clone(), api.clone())
                .with_reporter(reporter.clone()),
            inventories: InventoryIndexer::new(batch, api).with_reporter(reporter),
        }
    }

    pub async fn run(&self, collections: &[CollectionAddress]) -> Result<PipelineReport, InputError> {
        let holders = self.holders.collect_holders(collections).await?;
        let inventories = self
            .inventories
            .index_inventories(holders.value.as_slice())
            .await;

        let result = analyze(&inventories.value);

        let failures: Vec<StageFailure> = holders
            .failures
            .into_iter()
            .map(|f| StageFailure::from_batch(Stage::Holders, f))
            .chain(
                inventories
                    .failures
                    .into_iter()
                    .map(|f| StageFailure::from_batch(Stage::Inventory, f)),
            )
            .collect();

        info!(
            collections = collections.len(),
            holders = holders.value.len(),
            indexed = inventories.value.len(),
            failures = failures.len(),
            most = result.most_similar.size,
            "pipeline complete"
        );

        Ok(PipelineReport {
            collections: collections.len(),
            holders: holders.value.len(),
            indexed_accounts: inventories.value.len(),
            result,
            failures,
            index: inventories.value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::stub::StubFetcher;
    use crate::fetcher::FetchError;
    use crate::similarity::UNCOMPARED;
    use serde_json::json;

    fn pipeline(stub: Arc<StubFetcher>) -> Pipeline {
        let api = ApiConfig {
            base_url: "http://api".to_string(),
            ..ApiConfig::default()
        };
        Pipeline::new(stub, api, &FetchConfig::default())
    }

    fn addrs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_full_run() {
        let stub = Arc::new(
            StubFetcher::new()
                .json(
                    "http://api/nfts/C1/owners",
                    json!([{"amount": 1, "owner": "A"}, {"amount": 0, "owner": "D"}]),
                )
                .json(
                    "http://api/nfts/C2/owners",
                    json!([{"amount": 2, "owner": "A"}, {"amount": 1, "owner": "B"}, {"amount": 1, "owner": "C"}]),
                )
                .json(
                    "http://api/accounts/A/tokens",
                    json!([{"tokenAddress": "x"}, {"tokenAddress": "y"}]),
                )
                .json(
                    "http://api/accounts/B/tokens",
                    json!([{"tokenAddress": "x"}, {"tokenAddress": "y"}, {"tokenAddress": "z"}]),
                )
                .json("http://api/accounts/C/tokens", json!([{"tokenAddress": "q"}])),
        );

        let report = pipeline(stub.clone())
            .run(&addrs(&["C1", "C2"]))
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.holders, 3);
        assert_eq!(report.indexed_accounts, 3);
        assert_eq!(
            report.result.most_similar.accounts,
            Some(("A".to_string(), "B".to_string()))
        );
        assert_eq!(report.result.most_similar.size, 2);
        assert_eq!(
            report.result.least_similar.accounts,
            Some(("A".to_string(), "C".to_string()))
        );
        assert_eq!(report.result.least_similar.size, 0);
        // 2 holder lists + 3 inventories
        assert_eq!(stub.calls(), 5);
    }

    #[tokio::test]
    async fn test_failed_inventory_excludes_account() {
        let stub = Arc::new(
            StubFetcher::new()
                .json(
                    "http://api/nfts/C1/owners",
                    json!([{"amount": 1, "owner": "A"}, {"amount": 1, "owner": "B"}]),
                )
                .json("http://api/accounts/A/tokens", json!([{"tokenAddress": "x"}]))
                .fail(
                    "http://api/accounts/B/tokens",
                    FetchError::Timeout(std::time::Duration::from_secs(1)),
                ),
        );

        let report = pipeline(stub).run(&addrs(&["C1"])).await.unwrap();

        assert_eq!(report.holders, 2);
        assert_eq!(report.indexed_accounts, 1);
        assert!(!report.index.contains("B"));
        // A alone cannot be compared.
        assert!(!report.result.most_similar.is_comparable());
        assert_eq!(report.result.least_similar.size, UNCOMPARED);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, "inventory");
        assert_eq!(report.failures[0].input, "B");
    }

    #[tokio::test]
    async fn test_no_collections_yields_sentinels() {
        let stub = Arc::new(StubFetcher::new());
        let report = pipeline(stub.clone()).run(&[]).await.unwrap();

        assert_eq!(report.holders, 0);
        assert!(!report.result.most_similar.is_comparable());
        assert!(!report.result.least_similar.is_comparable());
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_report_serializes_without_index() {
        let stub = Arc::new(StubFetcher::new());
        let report = pipeline(stub).run(&addrs(&["C1"])).await.unwrap();

        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("index").is_none());
        assert_eq!(value["failures"][0]["stage"], "holders");
        assert_eq!(value["result"]["most_similar"]["accounts"], serde_json::Value::Null);
    }
}
