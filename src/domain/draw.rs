//! Randomized prize selection.
//!
//! Two entry points share one weighted selector: [`weighted_pick`] runs a
//! single trial (used by instant draws at participation time), and
//! [`run_batch_draw`] allocates all remaining stock across participants in
//! one pass (used by scheduled draws).
//!
//! Probabilities are percentages, but deliberately not normalized: one
//! roll is taken in `[0, 100)` and walked across cumulative bands in prize
//! declaration order. When eligible probabilities sum below 100 the
//! remainder is a miss; when they sum above 100 the bands past 100 can
//! never be hit, so later prizes are starved. Stored configurations rely
//! on that band arithmetic, so it is kept as is.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

use super::activity::{Prize, Winner};
use super::participant::Participant;

/// Runs one weighted trial over `prizes` and returns the index of the
/// selected prize, or `None` on a miss.
///
/// Eligibility: a prize takes part only if `stock_of` reports stock above
/// zero and its probability is above zero. One roll is drawn in
/// `[0, 100)`; a roll at or beyond the summed eligible probabilities is a
/// miss, otherwise the roll lands in exactly one cumulative band walked in
/// declaration order.
///
/// `stock_of` abstracts over where stock lives: live `remaining` for
/// instant draws, per-name counters for batch draws.
pub fn weighted_pick<F, R>(prizes: &[Prize], stock_of: F, rng: &mut R) -> Option<usize>
where
    F: Fn(&Prize) -> u32,
    R: Rng + ?Sized,
{
    let candidates: Vec<(usize, &Prize)> = prizes
        .iter()
        .enumerate()
        .filter(|(_, prize)| stock_of(prize) > 0 && prize.probability > 0)
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let total = candidates
        .iter()
        .fold(0u32, |acc, (_, prize)| acc.saturating_add(prize.probability));
    let roll = rng.gen_range(0..100u32);
    if roll >= total {
        return None;
    }

    let mut cumulative = 0u32;
    for (index, prize) in candidates {
        cumulative = cumulative.saturating_add(prize.probability);
        if roll < cumulative {
            return Some(index);
        }
    }
    None
}

/// Allocates prize stock across `participants` in one randomized pass.
///
/// Stock is pooled into per-name counters seeded from `quantity` (prize
/// lines sharing a name share one counter). The participant list is
/// shuffled, then each record gets one weighted trial against the live
/// counters; a hit decrements the counter and records a [`Winner`] carrying
/// the participant's identifier. The pass stops early once every counter
/// reaches zero.
///
/// Each participation record wins at most once per draw. Identities that
/// hold several records (duplicate participation enabled) get one trial
/// per record.
pub fn run_batch_draw<R>(
    participants: &[Participant],
    prizes: &[Prize],
    drawn_at: DateTime<Utc>,
    rng: &mut R,
) -> Vec<Winner>
where
    R: Rng + ?Sized,
{
    let mut counters: HashMap<&str, u32> = HashMap::new();
    for prize in prizes {
        let counter = counters.entry(prize.name.as_str()).or_insert(0);
        *counter = counter.saturating_add(prize.quantity);
    }

    let mut order: Vec<&Participant> = participants.iter().collect();
    order.shuffle(rng);

    let mut winners = Vec::new();
    for participant in order {
        if counters.values().all(|&count| count == 0) {
            break;
        }

        let picked = weighted_pick(
            prizes,
            |prize| counters.get(prize.name.as_str()).copied().unwrap_or(0),
            rng,
        );
        let Some(index) = picked else {
            continue;
        };
        let Some(prize) = prizes.get(index) else {
            continue;
        };

        if let Some(stock) = counters.get_mut(prize.name.as_str()) {
            *stock = stock.saturating_sub(1);
        }
        winners.push(Winner {
            identifier: participant.identifier().to_string(),
            prize_name: prize.name.clone(),
            won_at: drawn_at,
        });
    }
    winners
}
