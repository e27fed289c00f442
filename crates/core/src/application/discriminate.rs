// Discrimination Engine
// Interactive narrowing by greedy-minimax probe selection

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::domain::{CandidateSet, EngineDatabase, EngineName, ProbeExpectations, ProbeTable};
use crate::error::{AppError, Result};
use crate::port::Operator;

/// Terminal state of a discrimination session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Exactly one engine survived.
    Identified(EngineName),
    /// No remaining probe separates the survivors.
    Ambiguous(BTreeSet<EngineName>),
}

/// Score one probe over the current candidates: bucket candidates by
/// expected value (candidates without an entry share one "missing"
/// bucket) and return the size of the largest bucket.
fn largest_bucket(entry: &ProbeExpectations, candidates: &CandidateSet) -> usize {
    let mut buckets: HashMap<&str, usize> = HashMap::new();
    let mut recorded = 0usize;
    for name in candidates.iter() {
        if let Some(expected) = entry.expected.get(name) {
            *buckets.entry(expected.as_str()).or_insert(0) += 1;
            recorded += 1;
        }
    }
    let missing = candidates.len() - recorded;
    buckets.values().copied().max().unwrap_or(0).max(missing)
}

/// Greedy minimax: pick the probe whose largest bucket is smallest.
/// Ties keep the earlier probe in merge order. Returns None when no
/// probe separates anyone (best largest bucket == candidate count).
fn choose_probe<'a>(
    view: &'a [ProbeExpectations],
    candidates: &CandidateSet,
) -> Option<&'a ProbeExpectations> {
    let mut best: Option<&ProbeExpectations> = None;
    let mut smallest_max = candidates.len();

    for entry in view {
        let largest = largest_bucket(entry, candidates);
        if largest < smallest_max {
            smallest_max = largest;
            best = Some(entry);
        }
    }
    best
}

/// Interactive narrowing loop.
///
/// Each round the best-partitioning probe is shown to the operator for
/// manual comparison against the system under test (never executed by
/// this core) and the candidate set is filtered by the observed answer.
/// An empty answer matches exactly the engines with no recorded
/// expectation for the probe, never a literal empty string.
pub fn discriminate(
    db: &EngineDatabase,
    seed: BTreeSet<EngineName>,
    operator: &mut dyn Operator,
) -> Result<Outcome> {
    let mut candidates = CandidateSet::new(seed);
    info!(candidates = candidates.len(), "starting discrimination session");

    while candidates.len() > 1 {
        let view = db.probe_view(candidates.as_set(), ProbeTable::Discrimination);
        let Some(entry) = choose_probe(&view, &candidates) else {
            info!(survivors = candidates.len(), "no probe separates remaining candidates");
            return Ok(Outcome::Ambiguous(candidates.into_set()));
        };

        let answer = operator.observe(&entry.probe)?.trim().to_string();
        debug!(probe = %entry.probe, answer = %answer, "operator answer");

        if answer.is_empty() {
            candidates.retain(|name| !entry.expected.contains_key(name));
        } else {
            candidates.retain(|name| entry.expected.get(name) == Some(&answer));
        }

        if candidates.is_empty() {
            return Err(AppError::Contradiction {
                probe: entry.probe.clone(),
                answer,
            });
        }
        info!(survivors = candidates.len(), "round complete");
    }

    // Loop invariant: the set never empties without returning above.
    let survivor = candidates
        .iter()
        .next()
        .cloned()
        .ok_or_else(|| AppError::Internal("empty candidate set".into()))?;
    Ok(Outcome::Identified(survivor))
}
