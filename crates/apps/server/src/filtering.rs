use std::collections::HashSet;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use remote::wire::{FilterEnvelope, FilterRequest, RawBuilding, WireFilterResult};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::query::{parse_query, Attribute, Criterion};
use crate::{api_error, AppState};

/// Evaluates `{query}` or `{queries}` against the dataset. Always answers
/// with the envelope shape; a query that cannot be interpreted gets an
/// `error` entry and no matches.
pub async fn filter_buildings(
    State(state): State<AppState>,
    Json(request): Json<FilterRequest>,
) -> Result<Json<FilterEnvelope>, (StatusCode, Json<Value>)> {
    let queries = request.into_queries();
    if queries.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "query or queries is required"));
    }

    let criteria: Vec<Result<Criterion, String>> =
        queries.iter().map(|q| parse_query(q)).collect();
    let needs_land_use = criteria
        .iter()
        .any(|c| matches!(c, Ok(c) if c.attribute == Attribute::LandUse));

    let buildings = if needs_land_use {
        state.dataset.buildings_with_land_use().await
    } else {
        state.dataset.buildings().await.map(|b| b.as_ref().clone())
    }
    .map_err(|e| {
        error!("building fetch failed: {e}");
        api_error(StatusCode::BAD_GATEWAY, e)
    })?;

    let envelope = evaluate(&buildings, &queries, criteria);
    info!(
        queries = queries.len(),
        matched = envelope.all_matches.len(),
        "filters evaluated"
    );
    Ok(Json(envelope))
}

pub fn evaluate(
    buildings: &[RawBuilding],
    queries: &[String],
    criteria: Vec<Result<Criterion, String>>,
) -> FilterEnvelope {
    let mut envelope = FilterEnvelope::default();
    let mut seen = HashSet::new();

    for (index, (query, criterion)) in queries.iter().zip(criteria).enumerate() {
        let result = match criterion {
            Ok(criterion) => {
                debug!(index, %criterion, "query interpreted");
                let matches: Vec<_> = buildings
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| criterion.matches(b))
                    .map(|(position, b)| b.resolved_id(position))
                    .collect();
                for id in &matches {
                    if seen.insert(id.clone()) {
                        envelope.all_matches.push(id.clone());
                    }
                }
                WireFilterResult {
                    filter_index: Some(index),
                    query: Some(query.clone()),
                    matches,
                    error: None,
                }
            }
            Err(reason) => {
                debug!(index, %reason, "query not interpreted");
                WireFilterResult {
                    filter_index: Some(index),
                    query: Some(query.clone()),
                    matches: Vec::new(),
                    error: Some(reason),
                }
            }
        };
        envelope.filter_results.push(result);
    }
    envelope
}

#[cfg(test)]
mod tests {
    use super::evaluate;
    use crate::query::parse_query;
    use foundation::BuildingId;
    use pretty_assertions::assert_eq;
    use remote::wire::RawBuilding;

    fn building(id: i64, ground: f64, roof: f64) -> RawBuilding {
        RawBuilding {
            id: Some(BuildingId::from_int(id)),
            grd_elev_min_z: Some(ground),
            rooftop_elev_z: Some(roof),
            ..RawBuilding::default()
        }
    }

    #[test]
    fn union_keeps_first_seen_order() {
        let data = vec![
            building(1, 0.0, 120.0),
            building(2, 0.0, 10.0),
            building(3, 0.0, 60.0),
        ];
        let queries = vec!["taller than 50".to_string(), "shorter than 100".to_string()];
        let criteria = queries.iter().map(|q| parse_query(q)).collect();
        let env = evaluate(&data, &queries, criteria);

        let ids = |v: &[BuildingId]| v.iter().map(|i| i.to_string()).collect::<Vec<_>>();
        assert_eq!(ids(&env.filter_results[0].matches), vec!["1", "3"]);
        assert_eq!(ids(&env.filter_results[1].matches), vec!["2", "3"]);
        assert_eq!(ids(&env.all_matches), vec!["1", "3", "2"]);
    }

    #[test]
    fn uninterpretable_query_gets_error_entry() {
        let data = vec![building(1, 0.0, 120.0)];
        let queries = vec!["nice ones".to_string()];
        let criteria = queries.iter().map(|q| parse_query(q)).collect();
        let env = evaluate(&data, &queries, criteria);
        assert_eq!(env.filter_results.len(), 1);
        assert!(env.filter_results[0].error.is_some());
        assert!(env.filter_results[0].matches.is_empty());
        assert!(env.all_matches.is_empty());
    }

    #[test]
    fn records_without_id_use_position() {
        let mut anon = building(0, 0.0, 200.0);
        anon.id = None;
        let data = vec![building(5, 0.0, 1.0), anon];
        let queries = vec!["taller than 100".to_string()];
        let criteria = queries.iter().map(|q| parse_query(q)).collect();
        let env = evaluate(&data, &queries, criteria);
        assert_eq!(env.all_matches, vec![BuildingId::from_int(1)]);
    }
}
