//! Pairwise token-overlap between holders.
//!
//! Every account is compared with every other account by the number of
//! distinct token ids they share. Each account keeps its best (`most`) and
//! worst (`least`) counterpart, and the global extremes are then picked
//! from those.
//!
//! Only distinct token ids count: holding one unit or five units of a token
//! weighs the same, and duplicates in an inventory never inflate a score.
//!
//! All comparisons are strict, so the first candidate reaching a value in
//! iteration order wins ties. With fewer than two accounts nothing can be
//! compared and both pairs stay at their sentinels; see
//! [`SimilarPair::is_comparable`].

use crate::inventory::InventoryIndex;
use crate::types::{Account, TokenId};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// Initial `least` size, standing in for +infinity.
pub const UNCOMPARED: usize = usize::MAX;

/// Best or worst counterpart seen for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairStat {
    pub size: usize,
    pub counterpart: Option<Account>,
}

impl PairStat {
    fn most() -> Self {
        Self {
            size: 0,
            counterpart: None,
        }
    }

    fn least() -> Self {
        Self {
            size: UNCOMPARED,
            counterpart: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStats {
    pub account: Account,
    pub most: PairStat,
    pub least: PairStat,
}

/// A global extreme. `accounts` is `None` when no pair beat the sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarPair {
    pub accounts: Option<(Account, Account)>,
    pub size: usize,
}

impl SimilarPair {
    /// False for the "no comparison possible" sentinel. A real pair with
    /// zero shared tokens is still comparable.
    pub fn is_comparable(&self) -> bool {
        self.accounts.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarityResult {
    pub most_similar: SimilarPair,
    pub least_similar: SimilarPair,
}

/// Per-account most and least similar counterparts, in index order.
pub fn account_stats(index: &InventoryIndex) -> Vec<AccountStats> {
    let sets: Vec<(&Account, HashSet<&TokenId>)> = index
        .iter()
        .map(|(account, tokens)| (account, tokens.iter().collect()))
        .collect();

    let mut stats = Vec::with_capacity(sets.len());

    for (ai, (account, tokens)) in sets.iter().enumerate() {
        let mut most = PairStat::most();
        let mut least = PairStat::least();

        for (bi, (other, other_tokens)) in sets.iter().enumerate() {
            if ai == bi {
                continue;
            }
            let size = tokens.intersection(other_tokens).count();

            if size > most.size {
                most = PairStat {
                    size,
                    counterpart: Some((*other).clone()),
                };
            }
            if size < least.size {
                least = PairStat {
                    size,
                    counterpart: Some((*other).clone()),
                };
            }
        }

        stats.push(AccountStats {
            account: (*account).clone(),
            most,
            least,
        });
    }

    stats
}

/// Reduce per-account stats to the global most and least similar pairs.
pub fn analyze(index: &InventoryIndex) -> SimilarityResult {
    let stats = account_stats(index);

    let mut most_similar = SimilarPair {
        accounts: None,
        size: 0,
    };
    let mut least_similar = SimilarPair {
        accounts: None,
        size: UNCOMPARED,
    };

    for s in &stats {
        if s.most.size > most_similar.size {
            most_similar = SimilarPair {
                accounts: s.most.counterpart.clone().map(|b| (s.account.clone(), b)),
                size: s.most.size,
            };
        }
        if s.least.size < least_similar.size {
            least_similar = SimilarPair {
                accounts: s.least.counterpart.clone().map(|b| (s.account.clone(), b)),
                size: s.least.size,
            };
        }
    }

    debug!(
        accounts = stats.len(),
        most = most_similar.size,
        least = least_similar.size,
        "similarity analysed"
    );

    SimilarityResult {
        most_similar,
        least_similar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(rows: Vec<(&str, Vec<&str>)>) -> InventoryIndex {
        rows.into_iter()
            .map(|(a, tokens)| {
                let tokens: Vec<TokenId> = tokens.into_iter().map(String::from).collect();
                (a.to_string(), tokens)
            })
            .collect()
    }

    fn pair(a: &str, b: &str, size: usize) -> SimilarPair {
        SimilarPair {
            accounts: Some((a.to_string(), b.to_string())),
            size,
        }
    }

    #[test]
    fn test_two_accounts_single_pair() {
        let idx = index(vec![("A", vec!["x", "y"]), ("B", vec!["x", "z"])]);
        let result = analyze(&idx);

        assert_eq!(result.most_similar, pair("A", "B", 1));
        assert_eq!(result.least_similar, pair("A", "B", 1));
    }

    #[test]
    fn test_degenerate_inputs_return_sentinels() {
        for idx in [index(vec![]), index(vec![("A", vec!["x"])])] {
            let result = analyze(&idx);
            assert_eq!(result.most_similar.size, 0);
            assert!(!result.most_similar.is_comparable());
            assert_eq!(result.least_similar.size, UNCOMPARED);
            assert!(!result.least_similar.is_comparable());
        }
    }

    #[test]
    fn test_zero_overlap_is_distinct_from_sentinel() {
        let idx = index(vec![("A", vec!["x"]), ("B", vec!["y"])]);
        let result = analyze(&idx);

        // A genuine zero-overlap pair is reported as least similar.
        assert_eq!(result.least_similar, pair("A", "B", 0));
        assert!(result.least_similar.is_comparable());
        // No pair beats the initial size of 0, so `most` keeps its sentinel.
        assert!(!result.most_similar.is_comparable());
        assert_eq!(result.most_similar.size, 0);
    }

    #[test]
    fn test_ties_resolve_to_first_in_iteration_order() {
        // A∩B = 2, A∩C = 1, B∩C = 2
        let idx = index(vec![("A", vec!["x", "y"]), ("B", vec!["x", "y", "z"]), ("C", vec!["y", "z"])]);

        let stats = account_stats(&idx);
        assert_eq!(stats[1].most.counterpart.as_deref(), Some("A"));
        assert_eq!(stats[1].least.counterpart.as_deref(), Some("A"));
        assert_eq!(stats[2].most.counterpart.as_deref(), Some("B"));
        assert_eq!(stats[2].least.counterpart.as_deref(), Some("A"));

        let result = analyze(&idx);
        assert_eq!(result.most_similar, pair("A", "B", 2));
        assert_eq!(result.least_similar, pair("A", "C", 1));
    }

    #[test]
    fn test_duplicates_do_not_inflate_intersection() {
        let idx = index(vec![
            ("A", vec!["x", "x", "x", "y"]),
            ("B", vec!["x", "x"]),
            ("C", vec!["y", "q"]),
        ]);

        let result = analyze(&idx);
        assert_eq!(result.most_similar, pair("A", "B", 1));
        assert_eq!(result.least_similar, pair("B", "C", 0));
    }

    #[test]
    fn test_empty_inventories_still_compared() {
        let idx = index(vec![("A", vec![]), ("B", vec!["x"]), ("C", vec!["x"])]);
        let result = analyze(&idx);

        assert_eq!(result.most_similar, pair("B", "C", 1));
        assert_eq!(result.least_similar, pair("A", "B", 0));
    }
}
