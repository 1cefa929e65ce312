//! Leaderboard service implementation
//!
//! Ranks referrers globally or within an event's counting window. Ranking is
//! computed engine-side over fetched edges with a documented total order, so
//! two calls over identical data always produce identical rows.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::models::decision::{LeaderboardRow, LeaderboardScope};
use crate::models::event::ReferralEdge;
use crate::storage::ReferralStore;
use crate::utils::errors::{GroupWardenError, Result};

/// Largest page a single leaderboard call returns
pub const MAX_LIMIT: i64 = 100;

/// One referrer's aggregate standing
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RankedReferrer {
    pub referrer_id: i64,
    pub count: i64,
    pub earliest: DateTime<Utc>,
}

/// Aggregate and order edges: count descending, then earliest edge ascending
/// (first to reach a count ranks higher), then user id ascending. The last key
/// makes the order total, hence reproducible.
pub(crate) fn rank_edges(edges: &[ReferralEdge]) -> Vec<RankedReferrer> {
    let mut per_referrer: HashMap<i64, (i64, DateTime<Utc>)> = HashMap::new();
    for edge in edges {
        per_referrer
            .entry(edge.referrer_id)
            .and_modify(|(count, earliest)| {
                *count += 1;
                if edge.created_at < *earliest {
                    *earliest = edge.created_at;
                }
            })
            .or_insert((1, edge.created_at));
    }

    let mut ranked: Vec<RankedReferrer> = per_referrer
        .into_iter()
        .map(|(referrer_id, (count, earliest))| RankedReferrer { referrer_id, count, earliest })
        .collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(a.earliest.cmp(&b.earliest))
            .then(a.referrer_id.cmp(&b.referrer_id))
    });
    ranked
}

/// Collapse cross-scope duplicates: one edge per (referrer, referred) pair,
/// keeping the earliest. Used by the global board, where a referral attributed
/// both globally and inside an event counts once.
pub(crate) fn dedupe_pairs(mut edges: Vec<ReferralEdge>) -> Vec<ReferralEdge> {
    edges.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    edges.retain(|e| seen.insert((e.referrer_id, e.referred_id)));
    edges
}

/// Global standing over every scope
pub(crate) fn rank_global(edges: Vec<ReferralEdge>) -> Vec<RankedReferrer> {
    rank_edges(&dedupe_pairs(edges))
}

/// Leaderboard service reading the referral graph on demand
#[derive(Debug, Clone)]
pub struct LeaderboardService<S> {
    store: S,
}

impl<S: ReferralStore> LeaderboardService<S> {
    /// Create a new LeaderboardService instance
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Rank referrers in the given scope
    pub async fn leaderboard(
        &self,
        scope: LeaderboardScope,
        limit: i64,
    ) -> Result<Vec<LeaderboardRow>> {
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(GroupWardenError::Validation(format!(
                "leaderboard limit must be within 1..={MAX_LIMIT}, got {limit}"
            )));
        }

        let ranked = match scope {
            LeaderboardScope::Global => rank_global(self.store.edges_global().await?),
            LeaderboardScope::Event(event_id) => {
                let event = self
                    .store
                    .find_event(event_id)
                    .await?
                    .ok_or(GroupWardenError::EventNotFound { code: event_id.to_string() })?;
                let (start, end) = event.window(Utc::now());
                let edges: Vec<ReferralEdge> = self
                    .store
                    .edges_for_event(event_id)
                    .await?
                    .into_iter()
                    .filter(|e| e.created_at >= start && e.created_at <= end)
                    .collect();
                rank_edges(&edges)
            }
        };

        let top: Vec<RankedReferrer> = ranked.into_iter().take(limit as usize).collect();
        let ids: Vec<i64> = top.iter().map(|r| r.referrer_id).collect();
        let users = self.store.find_users(&ids).await?;
        let names: HashMap<i64, String> = users
            .into_iter()
            .map(|u| (u.telegram_id, u.display_name()))
            .collect();

        debug!(scope = ?scope, rows = top.len(), "Leaderboard computed");

        Ok(top
            .into_iter()
            .map(|r| LeaderboardRow {
                user_id: r.referrer_id,
                display_name: names
                    .get(&r.referrer_id)
                    .cloned()
                    .unwrap_or_else(|| r.referrer_id.to_string()),
                referral_count: r.count,
                first_referral_at: r.earliest,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn edge(referrer: i64, referred: i64, event: Option<i64>, offset_secs: i64) -> ReferralEdge {
        ReferralEdge {
            referrer_id: referrer,
            referred_id: referred,
            event_id: event,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_rank_orders_by_count_then_earliest() {
        let edges = vec![
            edge(1, 10, None, 0),
            edge(1, 11, None, 5),
            edge(2, 12, None, 1),
            edge(2, 13, None, 2),
            edge(3, 14, None, 3),
        ];

        let ranked = rank_edges(&edges);
        // 1 and 2 both have two referrals; 1's earliest edge is older
        assert_eq!(ranked[0].referrer_id, 1);
        assert_eq!(ranked[1].referrer_id, 2);
        assert_eq!(ranked[2].referrer_id, 3);
        assert_eq!(ranked[0].count, 2);
        assert_eq!(ranked[2].count, 1);
    }

    #[test]
    fn test_dedupe_keeps_earliest_edge_per_pair() {
        let edges = vec![
            edge(1, 10, Some(5), 10),
            edge(1, 10, None, 0),
            edge(1, 11, None, 20),
        ];

        let deduped = dedupe_pairs(edges);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].event_id, None);

        let ranked = rank_edges(&deduped);
        assert_eq!(ranked[0].count, 2);
    }

    proptest! {
        // Ranking must not depend on input order
        #[test]
        fn test_rank_is_permutation_invariant(seed in 0u64..1000) {
            let mut edges: Vec<ReferralEdge> = (0i64..20)
                .map(|i| edge(i % 5, 100 + i, None, ((seed as i64) + i * 7) % 60))
                .collect();

            let baseline = rank_edges(&edges);
            edges.reverse();
            prop_assert_eq!(rank_edges(&edges), baseline.clone());
            edges.rotate_left(7);
            prop_assert_eq!(rank_edges(&edges), baseline);
        }
    }
}
