//! Holder collection across NFT collections.
//!
//! Fetches every collection's holder list in one batch, keeps owners with a
//! positive amount and deduplicates them. A failed collection lookup is
//! reported and skipped; the remaining collections still contribute.

use crate::batch::{split_outcomes, BatchRequester, FailureReporter, NoopReporter, Request, RequestOutcome, Stage};
use crate::config::ApiConfig;
use crate::types::{Account, CollectionAddress, Collected};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, PartialEq)]
pub enum InputError {
    #[error("collection address at position {0} is blank")]
    BlankCollection(usize),
}

/// One row of a collection's holder list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderEntry {
    pub amount: f64,
    pub owner: String,
}

/// Deduplicated holders, iterated in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct HolderSet {
    accounts: Vec<Account>,
    seen: HashSet<Account>,
}

impl HolderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the account was already present.
    pub fn insert(&mut self, account: Account) -> bool {
        if self.seen.contains(&account) {
            return false;
        }
        self.seen.insert(account.clone());
        self.accounts.push(account);
        true
    }

    pub fn contains(&self, account: &str) -> bool {
        self.seen.contains(account)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn as_slice(&self) -> &[Account] {
        &self.accounts
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }
}

pub struct HolderCollector {
    batch: Arc<BatchRequester>,
    api: ApiConfig,
    reporter: Arc<dyn FailureReporter>,
}

impl HolderCollector {
    pub fn new(batch: Arc<BatchRequester>, api: ApiConfig) -> Self {
        Self {
            batch,
            api,
            reporter: Arc::new(NoopReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Collect every account holding a positive amount of any collection.
    ///
    /// Only a blank address is an error; per-collection request failures
    /// end up in `Collected::failures`.
    pub async fn collect_holders(
        &self,
        collections: &[CollectionAddress],
    ) -> Result<Collected<HolderSet>, InputError> {
        if let Some(pos) = collections.iter().position(|c| c.trim().is_empty()) {
            return Err(InputError::BlankCollection(pos));
        }
        if collections.is_empty() {
            return Ok(Collected::complete(HolderSet::new()));
        }

        let headers = self.api.auth_headers();
        let outcomes: Vec<RequestOutcome<CollectionAddress, Vec<HolderEntry>>> = self
            .batch
            .issue_batch(collections, |collection| {
                Request::get(self.api.holders_url(collection)).with_headers(headers.clone())
            })
            .await;

        let (responses, failures) = split_outcomes(outcomes);
        if !failures.is_empty() {
            self.reporter.report(Stage::Holders, &failures);
        }

        let mut holders = HolderSet::new();
        for (collection, entries) in responses {
            let mut added = 0usize;
            for entry in entries.into_iter().filter(|e| e.amount > 0.0) {
                if holders.insert(entry.owner) {
                    added += 1;
                }
            }
            debug!(collection = %collection, new_holders = added, "collection holders merged");
        }

        info!(
            collections = collections.len(),
            failed = failures.len(),
            holders = holders.len(),
            "holders collected"
        );

        Ok(Collected {
            value: holders,
            failures,
        })
    }
}
