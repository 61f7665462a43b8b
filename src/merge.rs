//! Merge engine combining per-source record sets into one deduplicated view
//!
//! Result sets are processed in caller-supplied order. The first sighting of
//! an address seeds the merged record; later sightings fold into it pairwise.
//! For two sources the policy is order-independent; for three or more it is
//! only approximately so, because each combination folds sequentially into the
//! running record. That approximation is intentional and kept as-is.

use std::collections::HashMap;

use crate::types::{now_millis, TokenRecord};

/// Merges per-source record sets into one deduplicated set keyed by address.
///
/// Output preserves first-sighting order, so identical inputs always produce
/// identical output.
pub fn merge_token_sets(source_sets: Vec<Vec<TokenRecord>>) -> Vec<TokenRecord> {
    let mut merged: Vec<TokenRecord> = Vec::new();
    let mut by_address: HashMap<String, usize> = HashMap::new();

    for records in source_sets {
        for record in records {
            match by_address.get(&record.address) {
                None => {
                    by_address.insert(record.address.clone(), merged.len());
                    merged.push(record);
                }
                Some(&slot) => combine(&mut merged[slot], record),
            }
        }
    }

    merged
}

/// Folds `incoming` into `existing` for the same address.
///
/// - price: liquidity-weighted average (equal blend when both sides report 0)
/// - volume, market cap, transaction count: max of the two readings, not
///   additive - reporting windows overlap across sources
/// - liquidity: additive - capital sits in distinct venues
/// - sources: set union
/// - identity fields stay as first seen; `last_updated` becomes merge time
fn combine(existing: &mut TokenRecord, incoming: TokenRecord) {
    let total_liquidity = existing.liquidity_sol + incoming.liquidity_sol;
    let (weight_existing, weight_incoming) = if total_liquidity > 0.0 {
        (
            existing.liquidity_sol / total_liquidity,
            incoming.liquidity_sol / total_liquidity,
        )
    } else {
        (0.5, 0.5)
    };

    existing.price_sol =
        existing.price_sol * weight_existing + incoming.price_sol * weight_incoming;
    existing.volume_sol = existing.volume_sol.max(incoming.volume_sol);
    existing.market_cap_sol = existing.market_cap_sol.max(incoming.market_cap_sol);
    existing.transaction_count = existing.transaction_count.max(incoming.transaction_count);
    existing.liquidity_sol += incoming.liquidity_sol;

    for source in incoming.sources {
        if !existing.sources.contains(&source) {
            existing.sources.push(source);
        }
    }

    existing.last_updated = now_millis();
}
