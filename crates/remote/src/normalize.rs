use buildings::FilterResult;
use foundation::BuildingId;
use tracing::warn;

use crate::error::QueryFailure;
use crate::wire::{FilterEnvelope, FilterResponse};

/// Outcome of evaluating a list of filters: exactly one result per query, in
/// filter order, plus the queries that failed (their results are empty).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    pub results: Vec<FilterResult>,
    pub failures: Vec<QueryFailure>,
}

impl Evaluation {
    pub fn all_matches(&self) -> Vec<BuildingId> {
        let mut seen = std::collections::HashSet::new();
        self.results
            .iter()
            .flat_map(|r| r.matches.iter())
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect()
    }
}

/// Canonical results of a response to a request carrying `queries`.
///
/// A legacy bare array is attributed to filter 0. Envelope entries without an
/// index take their position; entries with an `error` become failures. When an
/// envelope has no per-filter entries, `all_matches` is attributed to filter 0.
pub fn normalize_response(response: FilterResponse, queries: &[String]) -> Evaluation {
    let mut eval = Evaluation::default();
    match response {
        FilterResponse::Legacy(ids) => {
            eval.results.push(FilterResult::new(0, query_at(queries, 0), ids));
        }
        FilterResponse::Envelope(envelope) => normalize_envelope(envelope, queries, &mut eval),
    }
    fill_missing(&mut eval, queries);
    eval
}

fn normalize_envelope(envelope: FilterEnvelope, queries: &[String], eval: &mut Evaluation) {
    if envelope.filter_results.is_empty() {
        if let Some(reason) = envelope.error {
            for (index, query) in queries.iter().enumerate() {
                eval.failures.push(QueryFailure {
                    filter_index: index,
                    query: query.clone(),
                    reason: reason.clone(),
                });
            }
            return;
        }
        eval.results.push(FilterResult::new(
            0,
            query_at(queries, 0),
            envelope.all_matches,
        ));
        return;
    }

    for (position, wire) in envelope.filter_results.into_iter().enumerate() {
        let index = wire.filter_index.unwrap_or(position);
        let query = wire.query.unwrap_or_else(|| query_at(queries, index));
        if eval.results.iter().any(|r| r.filter_index == index) {
            warn!(index, "duplicate filter index in response; keeping the first");
            continue;
        }
        match wire.error {
            Some(reason) => {
                eval.failures.push(QueryFailure {
                    filter_index: index,
                    query: query.clone(),
                    reason,
                });
                eval.results.push(FilterResult::new(index, query, Vec::new()));
            }
            None => eval.results.push(FilterResult::new(index, query, wire.matches)),
        }
    }
}

/// Every query gets a result; results come out sorted by filter index.
fn fill_missing(eval: &mut Evaluation, queries: &[String]) {
    for (index, query) in queries.iter().enumerate() {
        if !eval.results.iter().any(|r| r.filter_index == index) {
            eval.results
                .push(FilterResult::new(index, query.clone(), Vec::new()));
        }
    }
    eval.results.sort_by_key(|r| r.filter_index);
    eval.failures.sort_by_key(|f| f.filter_index);
}

/// Response to a single-query request re-attributed to `filter_index`: every
/// match the response reports belongs to that filter.
pub fn normalize_single(response: FilterResponse, filter_index: usize, query: &str) -> Evaluation {
    let single = vec![query.to_string()];
    let eval = normalize_response(response, &single);

    let mut out = Evaluation::default();
    let mut matches = Vec::new();
    for result in eval.results {
        for id in result.matches {
            if !matches.contains(&id) {
                matches.push(id);
            }
        }
    }
    out.failures = eval
        .failures
        .into_iter()
        .map(|f| QueryFailure {
            filter_index,
            query: query.to_string(),
            reason: f.reason,
        })
        .collect();
    out.results
        .push(FilterResult::new(filter_index, query, matches));
    out
}

fn query_at(queries: &[String], index: usize) -> String {
    queries.get(index).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{normalize_response, normalize_single};
    use crate::wire::FilterResponse;
    use buildings::FilterResult;
    use foundation::BuildingId;
    use pretty_assertions::assert_eq;

    fn parse(json: &str) -> FilterResponse {
        serde_json::from_str(json).expect("response")
    }

    fn qs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn id(n: i64) -> BuildingId {
        BuildingId::from_int(n)
    }

    #[test]
    fn current_envelope_maps_per_filter() {
        let eval = normalize_response(
            parse(r#"{"all_matches":[1],"filter_results":[{"filter_index":0,"matches":[1],"query":"tall"}]}"#),
            &qs(&["tall"]),
        );
        assert_eq!(eval.results, vec![FilterResult::new(0, "tall", vec![id(1)])]);
        assert!(eval.failures.is_empty());
    }

    #[test]
    fn legacy_array_is_filter_zero() {
        let eval = normalize_response(parse(r#"["3", 4]"#), &qs(&["tall", "short"]));
        assert_eq!(
            eval.results,
            vec![
                FilterResult::new(0, "tall", vec![id(3), id(4)]),
                FilterResult::new(1, "short", vec![]),
            ]
        );
    }

    #[test]
    fn per_query_error_is_a_failure_with_empty_matches() {
        let eval = normalize_response(
            parse(
                r#"{"all_matches":[2],"filter_results":[
                    {"filter_index":1,"matches":[2],"query":"short"},
                    {"filter_index":0,"matches":[],"query":"???","error":"could not interpret"}
                ]}"#,
            ),
            &qs(&["???", "short"]),
        );
        assert_eq!(eval.results[0], FilterResult::new(0, "???", vec![]));
        assert_eq!(eval.results[1], FilterResult::new(1, "short", vec![id(2)]));
        assert_eq!(eval.failures.len(), 1);
        assert_eq!(eval.failures[0].filter_index, 0);
        assert_eq!(eval.failures[0].reason, "could not interpret");
    }

    #[test]
    fn envelope_without_entries_uses_all_matches() {
        let eval = normalize_response(parse(r#"{"all_matches":[5,6]}"#), &qs(&["q"]));
        assert_eq!(eval.results, vec![FilterResult::new(0, "q", vec![id(5), id(6)])]);
    }

    #[test]
    fn envelope_error_fails_every_query() {
        let eval = normalize_response(parse(r#"{"error":"model down"}"#), &qs(&["a", "b"]));
        assert_eq!(eval.failures.len(), 2);
        assert!(eval.results.iter().all(|r| r.matches.is_empty()));
        assert_eq!(eval.results.len(), 2);
    }

    #[test]
    fn single_response_is_reattributed() {
        let eval = normalize_single(
            parse(r#"{"all_matches":[1,2],"filter_results":[{"filter_index":0,"matches":[1,2],"query":"x"}]}"#),
            3,
            "x",
        );
        assert_eq!(eval.results, vec![FilterResult::new(3, "x", vec![id(1), id(2)])]);
        assert_eq!(eval.all_matches(), vec![id(1), id(2)]);
    }
}
