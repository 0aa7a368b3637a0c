//! Pure allocation policies for mass distribution.
//!
//! `allocate` is a total function over its inputs: no storage, no locks, no
//! side effects. Preview and execute both call it, which is what makes the
//! two phases agree on identical inputs.

use communis_types::{FulfillmentStrategy, MemberId};
use serde::{Deserialize, Serialize};

/// One claimant with their capped demand, already in allocation order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub recipient_id: MemberId,
    pub demand: u32,
}

/// One proposed grant. Zero-unit grants are kept in the output so callers
/// can report claimants left unserved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub recipient_id: MemberId,
    pub units: u32,
}

/// Allocate `available` units across `candidates` under the given policy.
///
/// `full` and `partial` are order-sensitive and must be fed a deterministic
/// candidate order. `equal` ignores order entirely.
pub fn allocate(
    strategy: FulfillmentStrategy,
    available: u32,
    candidates: &[Candidate],
) -> Vec<Grant> {
    match strategy {
        FulfillmentStrategy::Full => {
            let mut remaining = available;
            let mut short = false;
            candidates
                .iter()
                .map(|c| {
                    let units = if !short && remaining >= c.demand {
                        remaining -= c.demand;
                        c.demand
                    } else {
                        // First shortfall ends the pass; everyone after the
                        // under-served candidate receives zero.
                        short = true;
                        0
                    };
                    Grant {
                        recipient_id: c.recipient_id.clone(),
                        units,
                    }
                })
                .collect()
        }
        FulfillmentStrategy::Partial => {
            let mut remaining = available;
            candidates
                .iter()
                .map(|c| {
                    let units = c.demand.min(remaining);
                    remaining -= units;
                    Grant {
                        recipient_id: c.recipient_id.clone(),
                        units,
                    }
                })
                .collect()
        }
        FulfillmentStrategy::Equal => {
            let count = candidates.len() as u32;
            let share = if count == 0 { 0 } else { available / count };
            candidates
                .iter()
                .map(|c| Grant {
                    recipient_id: c.recipient_id.clone(),
                    units: c.demand.min(share),
                })
                .collect()
        }
    }
}
