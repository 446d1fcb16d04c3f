//! Candidate filtering and disambiguation.
//!
//! Filtering runs in a fixed order: exact name and visibility, tag
//! membership, then inclusive size bounds. Whatever survives is reduced to
//! exactly one candidate or reported as ambiguous.

use std::cmp::Ordering;

use opencloud_core::{ObservedState, ProviderError, ProviderResult};
use tracing::debug;

use crate::criteria::FilterCriteria;

/// Returns the candidates that satisfy every supplied criterion.
///
/// Input order is preserved. Adding a criterion never grows the result.
pub fn filter<'a>(
    candidates: &'a [ObservedState],
    criteria: &FilterCriteria,
) -> Vec<&'a ObservedState> {
    candidates
        .iter()
        .filter(|c| matches_identity(c, criteria))
        .filter(|c| matches_tag(c, criteria))
        .filter(|c| matches_size(c, criteria))
        .collect()
}

/// Reduces `candidates` to exactly one match.
///
/// # Errors
///
/// - `ValidationFailed` if the criteria are inconsistent.
/// - `NoMatch` if nothing survives filtering.
/// - `AmbiguousResult` if several survive and `most_recent` is not set.
pub fn select(
    candidates: &[ObservedState],
    criteria: &FilterCriteria,
) -> ProviderResult<ObservedState> {
    criteria.validate()?;

    let survivors = filter(candidates, criteria);
    debug!(
        candidates = candidates.len(),
        survivors = survivors.len(),
        most_recent = criteria.most_recent(),
        "Filtered query candidates"
    );

    match survivors.as_slice() {
        [] => Err(ProviderError::NoMatch {
            candidates: candidates.len(),
        }),
        [only] => Ok((*only).clone()),
        many if criteria.most_recent() => many
            .iter()
            .copied()
            .min_by(|a, b| newest_first(a, b))
            .cloned()
            .ok_or(ProviderError::NoMatch {
                candidates: candidates.len(),
            }),
        many => Err(ProviderError::AmbiguousResult { count: many.len() }),
    }
}

/// Orders by creation time descending, then by id ascending.
fn newest_first(a: &ObservedState, b: &ObservedState) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

fn matches_identity(candidate: &ObservedState, criteria: &FilterCriteria) -> bool {
    criteria.name().is_none_or(|name| candidate.name == name)
        && criteria
            .visibility()
            .is_none_or(|visibility| candidate.visibility == Some(visibility))
}

fn matches_tag(candidate: &ObservedState, criteria: &FilterCriteria) -> bool {
    criteria.tag().is_none_or(|tag| candidate.tags.contains(tag))
}

// Unknown size fails any supplied bound.
fn matches_size(candidate: &ObservedState, criteria: &FilterCriteria) -> bool {
    let lower = criteria
        .size_min()
        .is_none_or(|min| candidate.size_bytes.is_some_and(|size| size >= min));
    let upper = criteria
        .size_max()
        .is_none_or(|max| candidate.size_bytes.is_some_and(|size| size <= max));
    lower && upper
}
