//! Concurrent fan-out of GET requests with per-request outcomes.
//!
//! A batch issues one request per input, waits for every request to
//! settle and returns one [`RequestOutcome`] per input in input order.
//! Failures (transport, status, timeout, decode) are captured in place and
//! never abort sibling requests. Outcomes are merged by the caller after
//! the join, so nothing here is shared between in-flight requests.

use crate::fetcher::{FetchError, HttpGet};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A fully built GET request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure<I> {
    pub input: I,
    pub error: FetchError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome<I, T> {
    Success { input: I, value: T },
    Failure(BatchFailure<I>),
}

impl<I, T> RequestOutcome<I, T> {
    pub fn input(&self) -> &I {
        match self {
            RequestOutcome::Success { input, .. } => input,
            RequestOutcome::Failure(f) => &f.input,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success { .. })
    }
}

/// Partition outcomes into successes and failures, keeping input order
/// within each side.
pub fn split_outcomes<I, T>(
    outcomes: Vec<RequestOutcome<I, T>>,
) -> (Vec<(I, T)>, Vec<BatchFailure<I>>) {
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            RequestOutcome::Success { input, value } => successes.push((input, value)),
            RequestOutcome::Failure(f) => failures.push(f),
        }
    }
    (successes, failures)
}

/// Which pipeline stage a batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Holders,
    Inventory,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Holders => write!(f, "holders"),
            Stage::Inventory => write!(f, "inventory"),
        }
    }
}

/// Hook invoked with the failed outcomes of each batch.
pub trait FailureReporter: Send + Sync {
    fn report(&self, stage: Stage, failures: &[BatchFailure<String>]);
}

/// Accepts and discards.
pub struct NoopReporter;

impl FailureReporter for NoopReporter {
    fn report(&self, _stage: Stage, _failures: &[BatchFailure<String>]) {}
}

/// Logs each failure at `warn`.
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn report(&self, stage: Stage, failures: &[BatchFailure<String>]) {
        for f in failures {
            warn!(stage = %stage, input = %f.input, error = %f.error, "request failed");
        }
    }
}

pub struct BatchRequester {
    fetcher: Arc<dyn HttpGet>,
    request_timeout: Duration,
    max_concurrency: Option<usize>,
}

impl BatchRequester {
    pub fn new(fetcher: Arc<dyn HttpGet>, request_timeout: Duration) -> Self {
        Self {
            fetcher,
            request_timeout,
            max_concurrency: None,
        }
    }

    /// Cap the number of in-flight requests. `None` means unbounded.
    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency.map(|n| n.max(1));
        self
    }

    /// Issue one request per input and wait for all of them to settle.
    ///
    /// The returned vector is aligned 1:1 with `inputs`.
    pub async fn issue_batch<I, T, F>(&self, inputs: &[I], request_for: F) -> Vec<RequestOutcome<I, T>>
    where
        I: Clone,
        T: DeserializeOwned,
        F: Fn(&I) -> Request,
    {
        let started = Instant::now();
        let pending = inputs
            .iter()
            .map(|input| self.settle::<I, T>(input.clone(), request_for(input)));

        let outcomes: Vec<RequestOutcome<I, T>> = match self.max_concurrency {
            // `buffered` keeps output order equal to input order.
            Some(cap) => stream::iter(pending).buffered(cap).collect().await,
            None => join_all(pending).await,
        };

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            requests = outcomes.len(),
            failed = failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch settled"
        );

        outcomes
    }

    async fn settle<I, T: DeserializeOwned>(&self, input: I, request: Request) -> RequestOutcome<I, T> {
        debug!(url = %request.url, "issuing request");

        let fetched = tokio::time::timeout(
            self.request_timeout,
            self.fetcher.get_json(&request.url, &request.headers),
        )
        .await;

        let result = match fetched {
            Ok(Ok(body)) => {
                serde_json::from_value::<T>(body).map_err(|e| FetchError::Decode(e.to_string()))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(FetchError::Timeout(self.request_timeout)),
        };

        match result {
            Ok(value) => RequestOutcome::Success { input, value },
            Err(error) => RequestOutcome::Failure(BatchFailure { input, error }),
        }
    }
}
