//! "Did you mean" suggestions for misspelled field names.

use strsim::levenshtein;

/// Maximum Levenshtein distance to consider a name as a suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Finds the closest candidate to `query` (case-insensitive).
///
/// Returns `None` for exact matches and for candidates further than
/// [`MAX_SUGGESTION_DISTANCE`] edits away.
pub fn find_similar<'a>(query: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let query_lower = query.to_lowercase();

    let (best_match, best_distance) = candidates
        .into_iter()
        .map(|name| {
            let distance = levenshtein(&query_lower, &name.to_lowercase());
            (name.to_string(), distance)
        })
        .min_by_key(|(_, d)| *d)?;

    if best_distance > 0 && best_distance <= MAX_SUGGESTION_DISTANCE {
        Some(best_match)
    } else {
        None
    }
}
