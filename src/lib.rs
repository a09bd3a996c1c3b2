//! NFT holder overlap analysis.
//!
//! Collects the holders of a set of NFT collections, fetches each holder's
//! token inventory and finds the most and least similar pair of holders by
//! shared token count.

pub mod batch;
pub mod config;
pub mod fetcher;
pub mod holders;
pub mod inventory;
pub mod pipeline;
pub mod similarity;
pub mod types;
