//! Identifiers and shared result wrappers.

use crate::batch::BatchFailure;

pub type CollectionAddress = String;
pub type Account = String;
pub type TokenId = String;

/// A best-effort result together with the requests that failed while
/// building it. Callers use `failures` to judge how complete `value` is.
#[derive(Debug, Clone)]
pub struct Collected<T> {
    pub value: T,
    pub failures: Vec<BatchFailure<String>>,
}

impl<T> Collected<T> {
    pub fn complete(value: T) -> Self {
        Self {
            value,
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
