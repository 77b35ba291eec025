//! Source aggregation: merge candidate lists into one deduplicated work list.
//!
//! Lists are concatenated in the caller's priority order and the first
//! candidate seen for each identity wins. Order is stable so two runs over
//! the same inputs produce the same work list.

use std::collections::HashSet;

use crate::models::Candidate;

/// Merge `lists` in priority order, keeping the first candidate per identity.
pub fn aggregate<I, L>(lists: I) -> Vec<Candidate>
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = Candidate>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for list in lists {
        for candidate in list {
            if seen.insert(candidate.identity.clone()) {
                merged.push(candidate);
            }
        }
    }

    merged
}
