//! Per-account token inventories.
//!
//! Builds the account → token ids index used by the similarity analysis.
//! An account whose inventory request failed is left out of the index
//! entirely, so it never takes part in a comparison.

use crate::batch::{split_outcomes, BatchRequester, FailureReporter, NoopReporter, Request, RequestOutcome, Stage};
use crate::config::ApiConfig;
use crate::types::{Account, Collected, TokenId};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// One row of an account's inventory. Other fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    pub token_address: String,
}

/// Account → token ids, in insertion order. Token lists keep the order and
/// duplicates returned by the API.
#[derive(Debug, Clone, Default)]
pub struct InventoryIndex {
    entries: Vec<(Account, Vec<TokenId>)>,
    positions: HashMap<Account, usize>,
}

impl InventoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, account: Account, tokens: Vec<TokenId>) {
        match self.positions.get(&account) {
            Some(&pos) => self.entries[pos].1 = tokens,
            None => {
                self.positions.insert(account.clone(), self.entries.len());
                self.entries.push((account, tokens));
            }
        }
    }

    pub fn get(&self, account: &str) -> Option<&[TokenId]> {
        self.positions
            .get(account)
            .map(|&pos| self.entries[pos].1.as_slice())
    }

    pub fn contains(&self, account: &str) -> bool {
        self.positions.contains_key(account)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.entries.iter().map(|(a, _)| a)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Account, &[TokenId])> {
        self.entries.iter().map(|(a, t)| (a, t.as_slice()))
    }
}

impl FromIterator<(Account, Vec<TokenId>)> for InventoryIndex {
    fn from_iter<T: IntoIterator<Item = (Account, Vec<TokenId>)>>(iter: T) -> Self {
        let mut index = InventoryIndex::new();
        for (account, tokens) in iter {
            index.insert(account, tokens);
        }
        index
    }
}

pub struct InventoryIndexer {
    batch: Arc<BatchRequester>,
    api: ApiConfig,
    reporter: Arc<dyn FailureReporter>,
}

impl InventoryIndexer {
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

    pub async fn index_inventories(&self, accounts: &[Account]) -> Collected<InventoryIndex> {
        if accounts.is_empty() {
            return Collected::complete(InventoryIndex::new());
        }

        let headers = self.api.auth_headers();
        let outcomes: Vec<RequestOutcome<Account, Vec<InventoryEntry>>> = self
            .batch
            .issue_batch(accounts, |account| {
                Request::get(self.api.inventory_url(account)).with_headers(headers.clone())
            })
            .await;

        let (responses, failures) = split_outcomes(outcomes);
        if !failures.is_empty() {
            self.reporter.report(Stage::Inventory, &failures);
        }

        let index: InventoryIndex = responses
            .into_iter()
            .map(|(account, entries)| {
                let tokens: Vec<TokenId> = entries.into_iter().map(|e| e.token_address).collect();
                (account, tokens)
            })
            .collect();

        info!(
            accounts = accounts.len(),
            indexed = index.len(),
            failed = failures.len(),
            "inventories indexed"
        );

        Collected {
            value: index,
            failures,
        }
    }
}
