use std::future::Future;
use std::pin::Pin;

use buildings::{Building, FilterResult};
use catalog::{FilterSetSummary, FilterSpec, SaveOutcome};
use futures_util::future::join_all;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{QueryFailure, RemoteError};
use crate::normalize::{Evaluation, normalize_response, normalize_single};
use crate::wire::{
    DeleteRequest, FilterRequest, FilterResponse, PersistenceEnvelope, RawBuilding, SaveRequest,
    WireFilterName,
};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where building records come from.
pub trait BuildingSource: Send + Sync {
    fn fetch_buildings(&self, with_land_use: bool)
    -> BoxFuture<'_, Result<Vec<Building>, RemoteError>>;
}

/// Free-text filter evaluation. The result always holds one `FilterResult`
/// per query, in query order.
pub trait FilterEvaluator: Send + Sync {
    fn evaluate(&self, queries: Vec<String>) -> BoxFuture<'_, Result<Evaluation, RemoteError>>;
}

/// Named filter sets per user, upserted by `(owner, name)`.
pub trait FilterPersistence: Send + Sync {
    fn save(
        &self,
        owner: String,
        name: String,
        filters: Vec<FilterSpec>,
    ) -> BoxFuture<'_, Result<SaveOutcome, RemoteError>>;
    fn load(&self, owner: String, name: String)
    -> BoxFuture<'_, Result<Vec<FilterSpec>, RemoteError>>;
    fn list(&self, owner: String) -> BoxFuture<'_, Result<Vec<FilterSetSummary>, RemoteError>>;
    fn delete(&self, owner: String, name: String) -> BoxFuture<'_, Result<(), RemoteError>>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum EvaluationMode {
    /// All queries in one `{queries: [...]}` request.
    #[default]
    Batch,
    /// One `{query}` request per filter, issued concurrently.
    PerQuery,
}

/// reqwest client for the backend API rooted at `base_url`
/// (e.g. `http://localhost:5050/api`).
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    mode: EvaluationMode,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            mode: EvaluationMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_filter(&self, request: &FilterRequest) -> Result<FilterResponse, RemoteError> {
        let resp = self
            .http
            .post(self.url("filter-buildings"))
            .json(request)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn evaluate_batch(&self, queries: Vec<String>) -> Result<Evaluation, RemoteError> {
        let request = match queries.as_slice() {
            [only] => FilterRequest::single(only.clone()),
            _ => FilterRequest::batch(queries.clone()),
        };
        let response = self.post_filter(&request).await?;
        Ok(normalize_response(response, &queries))
    }

    async fn evaluate_per_query(&self, queries: Vec<String>) -> Result<Evaluation, RemoteError> {
        let requests = queries.iter().enumerate().map(|(index, query)| async move {
            let outcome = self.post_filter(&FilterRequest::single(query.clone())).await;
            (index, query, outcome)
        });
        let outcomes = join_all(requests).await;

        let all_unavailable = outcomes
            .iter()
            .all(|(_, _, o)| matches!(o, Err(RemoteError::Unavailable(_))));
        if all_unavailable {
            if let Some(err) = outcomes.iter().find_map(|(_, _, o)| o.as_ref().err()) {
                return Err(err.clone());
            }
        }

        let mut eval = Evaluation::default();
        for (index, query, outcome) in outcomes {
            match outcome {
                Ok(response) => {
                    let single = normalize_single(response, index, query);
                    eval.results.extend(single.results);
                    eval.failures.extend(single.failures);
                }
                Err(err) => {
                    warn!(index, %query, %err, "filter query failed");
                    eval.failures.push(QueryFailure {
                        filter_index: index,
                        query: query.clone(),
                        reason: err.to_string(),
                    });
                    eval.results
                        .push(FilterResult::new(index, query.clone(), Vec::new()));
                }
            }
        }
        Ok(eval)
    }

    async fn persistence_get(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<PersistenceEnvelope, RemoteError> {
        let resp = self.http.get(self.url(path)).query(params).send().await?;
        checked_envelope(read_json(resp).await?)
    }
}

/// Decodes a JSON body, mapping HTTP failures onto error kinds.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, RemoteError> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound);
    }
    if status.is_server_error() {
        return Err(RemoteError::Unavailable(format!("HTTP {status}")));
    }
    let text = resp.text().await?;
    if status.is_client_error() {
        let reason = serde_json::from_str::<PersistenceEnvelope>(&text)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(RemoteError::Rejected(reason));
    }
    serde_json::from_str(&text).map_err(|e| RemoteError::Malformed(e.to_string()))
}

fn checked_envelope(envelope: PersistenceEnvelope) -> Result<PersistenceEnvelope, RemoteError> {
    if envelope.success {
        Ok(envelope)
    } else {
        Err(RemoteError::Rejected(
            envelope
                .error
                .unwrap_or_else(|| "request failed".to_string()),
        ))
    }
}

/// `created`, legacy `saved`, or `updated`.
fn parse_action(action: Option<&str>) -> Result<SaveOutcome, RemoteError> {
    match action {
        Some("created") | Some("saved") => Ok(SaveOutcome::Created),
        Some("updated") => Ok(SaveOutcome::Updated),
        other => Err(RemoteError::Malformed(format!(
            "unknown save action {other:?}"
        ))),
    }
}

impl BuildingSource for HttpBackend {
    fn fetch_buildings(
        &self,
        with_land_use: bool,
    ) -> BoxFuture<'_, Result<Vec<Building>, RemoteError>> {
        Box::pin(async move {
            let path = if with_land_use {
                "buildings-with-land-use"
            } else {
                "buildings"
            };
            let resp = self.http.get(self.url(path)).send().await?;
            let raws: Vec<RawBuilding> = read_json(resp).await?;
            debug!(count = raws.len(), path, "fetched buildings");
            Ok(raws
                .into_iter()
                .enumerate()
                .map(|(position, raw)| raw.into_building(position))
                .collect())
        })
    }
}

impl FilterEvaluator for HttpBackend {
    fn evaluate(&self, queries: Vec<String>) -> BoxFuture<'_, Result<Evaluation, RemoteError>> {
        Box::pin(async move {
            if queries.is_empty() {
                return Ok(Evaluation::default());
            }
            let eval = match self.mode {
                EvaluationMode::Batch => self.evaluate_batch(queries).await?,
                EvaluationMode::PerQuery => self.evaluate_per_query(queries).await?,
            };
            for failure in &eval.failures {
                warn!(%failure, "query evaluation failure");
            }
            Ok(eval)
        })
    }
}

impl FilterPersistence for HttpBackend {
    fn save(
        &self,
        owner: String,
        name: String,
        filters: Vec<FilterSpec>,
    ) -> BoxFuture<'_, Result<SaveOutcome, RemoteError>> {
        Box::pin(async move {
            let body = SaveRequest {
                username: owner,
                filter_name: name,
                filters,
            };
            let resp = self
                .http
                .post(self.url("filters/save"))
                .json(&body)
                .send()
                .await?;
            let envelope = checked_envelope(read_json(resp).await?)?;
            parse_action(envelope.action.as_deref())
        })
    }

    fn load(
        &self,
        owner: String,
        name: String,
    ) -> BoxFuture<'_, Result<Vec<FilterSpec>, RemoteError>> {
        Box::pin(async move {
            let envelope = self
                .persistence_get(
                    "filters/load",
                    &[("username", owner.as_str()), ("filter_name", name.as_str())],
                )
                .await?;
            envelope
                .filters
                .ok_or_else(|| RemoteError::Malformed("load response without filters".to_string()))
        })
    }

    fn list(&self, owner: String) -> BoxFuture<'_, Result<Vec<FilterSetSummary>, RemoteError>> {
        Box::pin(async move {
            let envelope = self
                .persistence_get("filters/list", &[("username", owner.as_str())])
                .await?;
            Ok(envelope
                .filter_names
                .unwrap_or_default()
                .into_iter()
                .map(|n| match n {
                    WireFilterName::Entry { name, updated_at } => FilterSetSummary {
                        name,
                        updated_at_ms: updated_at,
                    },
                    WireFilterName::Plain(name) => FilterSetSummary {
                        name,
                        updated_at_ms: 0,
                    },
                })
                .collect())
        })
    }

    fn delete(&self, owner: String, name: String) -> BoxFuture<'_, Result<(), RemoteError>> {
        Box::pin(async move {
            let body = DeleteRequest {
                username: owner,
                filter_name: name,
            };
            let resp = self
                .http
                .delete(self.url("filters/delete"))
                .json(&body)
                .send()
                .await?;
            checked_envelope(read_json(resp).await?)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterEvaluator, HttpBackend, parse_action};
    use crate::error::RemoteError;
    use catalog::SaveOutcome;

    #[test]
    fn save_actions() {
        assert_eq!(parse_action(Some("created")), Ok(SaveOutcome::Created));
        assert_eq!(parse_action(Some("saved")), Ok(SaveOutcome::Created));
        assert_eq!(parse_action(Some("updated")), Ok(SaveOutcome::Updated));
        assert!(matches!(parse_action(None), Err(RemoteError::Malformed(_))));
    }

    #[test]
    fn base_url_is_trimmed() {
        let backend = HttpBackend::new("http://localhost:5050/api/");
        assert_eq!(backend.base_url(), "http://localhost:5050/api");
        assert_eq!(backend.url("filters/save"), "http://localhost:5050/api/filters/save");
    }

    #[tokio::test]
    async fn empty_query_list_needs_no_request() {
        // Nothing listens on port 9; an actual request would fail.
        let backend = HttpBackend::new("http://127.0.0.1:9/api");
        let eval = backend.evaluate(Vec::new()).await.expect("empty evaluation");
        assert!(eval.results.is_empty());
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        let backend = HttpBackend::new("http://127.0.0.1:9/api");
        let err = backend
            .evaluate(vec!["tall".to_string()])
            .await
            .expect_err("no server");
        assert!(matches!(err, RemoteError::Unavailable(_)));
    }
}
