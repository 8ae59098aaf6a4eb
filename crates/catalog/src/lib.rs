//! Named filter sets, keyed by `(owner, name)`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One user-authored filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub query: String,
}

impl FilterSpec {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFilterSet {
    pub owner: String,
    pub name: String,
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub created_at_ms: u64,
    #[serde(default)]
    pub updated_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSetSummary {
    pub name: String,
    pub updated_at_ms: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveOutcome {
    Created,
    Updated,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSetSnapshot {
    /// owner -> name -> set
    pub owners: BTreeMap<String, BTreeMap<String, SavedFilterSet>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    NotFound,
    Invalid(String),
    Corrupt(String),
    Io(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::NotFound => write!(f, "filter set not found"),
            CatalogError::Invalid(msg) => write!(f, "invalid filter set request: {msg}"),
            CatalogError::Corrupt(msg) => write!(f, "filter set storage corrupt: {msg}"),
            CatalogError::Io(msg) => write!(f, "filter set storage error: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Upsert-by-key persistence of filter sets.
pub trait FilterSetStore {
    /// Creates or overwrites the set named `name` for `owner`.
    fn save(
        &mut self,
        owner: &str,
        name: &str,
        filters: Vec<FilterSpec>,
        now_ms: u64,
    ) -> Result<SaveOutcome, CatalogError>;
    fn load(&self, owner: &str, name: &str) -> Result<SavedFilterSet, CatalogError>;
    /// Every set of `owner`, most recently updated first.
    fn load_all(&self, owner: &str) -> Result<Vec<SavedFilterSet>, CatalogError>;
    fn delete(&mut self, owner: &str, name: &str) -> Result<(), CatalogError>;

    /// Names of `owner`'s sets, most recently updated first.
    fn list(&self, owner: &str) -> Result<Vec<FilterSetSummary>, CatalogError> {
        Ok(self
            .load_all(owner)?
            .into_iter()
            .map(|s| FilterSetSummary {
                name: s.name,
                updated_at_ms: s.updated_at_ms,
            })
            .collect())
    }
}

fn validate_key(owner: &str, name: Option<&str>) -> Result<(), CatalogError> {
    if owner.trim().is_empty() {
        return Err(CatalogError::Invalid("username is required".to_string()));
    }
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(CatalogError::Invalid("filter name is required".to_string()));
    }
    Ok(())
}

impl FilterSetSnapshot {
    fn save(
        &mut self,
        owner: &str,
        name: &str,
        filters: Vec<FilterSpec>,
        now_ms: u64,
    ) -> Result<SaveOutcome, CatalogError> {
        validate_key(owner, Some(name))?;
        let sets = self.owners.entry(owner.to_string()).or_default();
        match sets.get_mut(name) {
            Some(existing) => {
                existing.filters = filters;
                existing.updated_at_ms = now_ms;
                Ok(SaveOutcome::Updated)
            }
            None => {
                sets.insert(
                    name.to_string(),
                    SavedFilterSet {
                        owner: owner.to_string(),
                        name: name.to_string(),
                        filters,
                        created_at_ms: now_ms,
                        updated_at_ms: now_ms,
                    },
                );
                Ok(SaveOutcome::Created)
            }
        }
    }

    fn load(&self, owner: &str, name: &str) -> Result<SavedFilterSet, CatalogError> {
        validate_key(owner, Some(name))?;
        self.owners
            .get(owner)
            .and_then(|sets| sets.get(name))
            .cloned()
            .ok_or(CatalogError::NotFound)
    }

    fn load_all(&self, owner: &str) -> Result<Vec<SavedFilterSet>, CatalogError> {
        validate_key(owner, None)?;
        let mut sets: Vec<SavedFilterSet> = self
            .owners
            .get(owner)
            .map(|sets| sets.values().cloned().collect())
            .unwrap_or_default();
        // Newest first; names break ties so the order is stable.
        sets.sort_by(|a, b| {
            b.updated_at_ms
                .cmp(&a.updated_at_ms)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(sets)
    }

    fn delete(&mut self, owner: &str, name: &str) -> Result<(), CatalogError> {
        validate_key(owner, Some(name))?;
        let sets = self.owners.get_mut(owner).ok_or(CatalogError::NotFound)?;
        sets.remove(name).ok_or(CatalogError::NotFound)?;
        if sets.is_empty() {
            self.owners.remove(owner);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryFilterSetStore {
    snapshot: FilterSetSnapshot,
}

impl InMemoryFilterSetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FilterSetStore for InMemoryFilterSetStore {
    fn save(
        &mut self,
        owner: &str,
        name: &str,
        filters: Vec<FilterSpec>,
        now_ms: u64,
    ) -> Result<SaveOutcome, CatalogError> {
        self.snapshot.save(owner, name, filters, now_ms)
    }

    fn load(&self, owner: &str, name: &str) -> Result<SavedFilterSet, CatalogError> {
        self.snapshot.load(owner, name)
    }

    fn load_all(&self, owner: &str) -> Result<Vec<SavedFilterSet>, CatalogError> {
        self.snapshot.load_all(owner)
    }

    fn delete(&mut self, owner: &str, name: &str) -> Result<(), CatalogError> {
        self.snapshot.delete(owner, name)
    }
}

/// Snapshot kept in memory and written through to a JSON file on every
/// change (temp file + rename).
#[derive(Debug)]
pub struct JsonFileFilterSetStore {
    path: PathBuf,
    snapshot: FilterSetSnapshot,
}

impl JsonFileFilterSetStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = path.into();
        let snapshot = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => FilterSetSnapshot::default(),
            Ok(text) => {
                serde_json::from_str(&text).map_err(|e| CatalogError::Corrupt(e.to_string()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FilterSetSnapshot::default(),
            Err(e) => return Err(CatalogError::Io(e.to_string())),
        };
        debug!(path = %path.display(), owners = snapshot.owners.len(), "filter sets opened");
        Ok(Self { path, snapshot })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), CatalogError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CatalogError::Io(e.to_string()))?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(&self.snapshot)
            .map_err(|e| CatalogError::Io(e.to_string()))?;
        std::fs::write(&tmp, text).map_err(|e| CatalogError::Io(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| CatalogError::Io(e.to_string()))?;
        Ok(())
    }

    /// Applies `change` to the snapshot in place; if persisting fails, the
    /// snapshot taken beforehand is restored.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut FilterSetSnapshot) -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        let previous = self.snapshot.clone();
        let out = change(&mut self.snapshot)?;
        if let Err(e) = self.persist() {
            self.snapshot = previous;
            return Err(e);
        }
        Ok(out)
    }
}

impl FilterSetStore for JsonFileFilterSetStore {
    fn save(
        &mut self,
        owner: &str,
        name: &str,
        filters: Vec<FilterSpec>,
        now_ms: u64,
    ) -> Result<SaveOutcome, CatalogError> {
        self.commit(|s| s.save(owner, name, filters, now_ms))
    }

    fn load(&self, owner: &str, name: &str) -> Result<SavedFilterSet, CatalogError> {
        self.snapshot.load(owner, name)
    }

    fn load_all(&self, owner: &str) -> Result<Vec<SavedFilterSet>, CatalogError> {
        self.snapshot.load_all(owner)
    }

    fn delete(&mut self, owner: &str, name: &str) -> Result<(), CatalogError> {
        self.commit(|s| s.delete(owner, name))
    }
}
