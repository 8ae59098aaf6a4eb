//! Saved filter set endpoints. Every answer is a `PersistenceEnvelope`.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use catalog::{CatalogError, FilterSetStore, SaveOutcome};
use remote::wire::{DeleteRequest, PersistenceEnvelope, SaveRequest, WireFilterName, WireFilterSet};
use serde::Deserialize;
use tracing::{error, info};

use crate::{now_ms, AppState, SharedFilterSets};

type Reply = (StatusCode, Json<PersistenceEnvelope>);

fn reply(envelope: PersistenceEnvelope) -> Reply {
    (StatusCode::OK, Json(envelope))
}

fn failure(err: CatalogError) -> Reply {
    let status = match &err {
        CatalogError::NotFound => StatusCode::NOT_FOUND,
        CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
        CatalogError::Corrupt(_) | CatalogError::Io(_) => {
            error!("filter set store failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(PersistenceEnvelope::failure(err.to_string())))
}

/// Runs `op` against the store on the blocking pool; file-backed stores
/// write to disk while the lock is held.
async fn with_store<T, F>(store: SharedFilterSets, op: F) -> Result<T, CatalogError>
where
    T: Send + 'static,
    F: FnOnce(&mut (dyn FilterSetStore + Send)) -> Result<T, CatalogError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = store.lock();
        op(&mut **guard)
    })
    .await
    .map_err(|e| CatalogError::Io(format!("store task failed: {e}")))?
}

pub async fn save(State(state): State<AppState>, Json(request): Json<SaveRequest>) -> Reply {
    let SaveRequest {
        username,
        filter_name,
        filters,
    } = request;
    let (user, name) = (username.clone(), filter_name.clone());
    let outcome = with_store(state.filter_sets, move |store| {
        store.save(&user, &name, filters, now_ms())
    })
    .await;
    match outcome {
        Ok(outcome) => {
            let action = match outcome {
                SaveOutcome::Created => "created",
                SaveOutcome::Updated => "updated",
            };
            info!(user = %username, name = %filter_name, action, "filter set saved");
            reply(PersistenceEnvelope {
                action: Some(action.to_string()),
                ..PersistenceEnvelope::ok()
            })
        }
        Err(err) => failure(err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoadParams {
    #[serde(default)]
    pub username: String,
    pub filter_name: Option<String>,
}

/// One named set when `filter_name` is given, otherwise every set of the user.
pub async fn load(State(state): State<AppState>, Query(params): Query<LoadParams>) -> Reply {
    if params.username.trim().is_empty() {
        return failure(CatalogError::Invalid("username is required".to_string()));
    }
    let LoadParams {
        username,
        filter_name,
    } = params;
    match filter_name {
        Some(name) => {
            let loaded = with_store(state.filter_sets, move |store| store.load(&username, &name));
            match loaded.await {
                Ok(set) => reply(PersistenceEnvelope {
                    filters: Some(set.filters),
                    ..PersistenceEnvelope::ok()
                }),
                Err(err) => failure(err),
            }
        }
        None => {
            let loaded = with_store(state.filter_sets, move |store| store.load_all(&username));
            match loaded.await {
                Ok(sets) => reply(PersistenceEnvelope {
                    filter_sets: Some(
                        sets.into_iter()
                            .map(|s| WireFilterSet {
                                filter_name: s.name,
                                filters: s.filters,
                                updated_at: s.updated_at_ms,
                            })
                            .collect(),
                    ),
                    ..PersistenceEnvelope::ok()
                }),
                Err(err) => failure(err),
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub username: String,
}

pub async fn list(State(state): State<AppState>, Query(params): Query<ListParams>) -> Reply {
    let listed = with_store(state.filter_sets, move |store| store.list(&params.username));
    match listed.await {
        Ok(names) => reply(PersistenceEnvelope {
            filter_names: Some(
                names
                    .into_iter()
                    .map(|s| WireFilterName::Entry {
                        name: s.name,
                        updated_at: s.updated_at_ms,
                    })
                    .collect(),
            ),
            ..PersistenceEnvelope::ok()
        }),
        Err(err) => failure(err),
    }
}

pub async fn delete(State(state): State<AppState>, Json(request): Json<DeleteRequest>) -> Reply {
    let DeleteRequest {
        username,
        filter_name,
    } = request;
    let (user, name) = (username.clone(), filter_name.clone());
    let deleted = with_store(state.filter_sets, move |store| store.delete(&user, &name));
    match deleted.await {
        Ok(()) => {
            info!(user = %username, name = %filter_name, "filter set deleted");
            reply(PersistenceEnvelope::ok())
        }
        Err(err) => failure(err),
    }
}
