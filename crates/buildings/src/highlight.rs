use foundation::BuildingId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::BuildingStore;
use crate::symbology::palette_color;

/// Matches of one evaluated filter, in the order the query service returned
/// them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterResult {
    pub filter_index: usize,
    pub query: String,
    pub matches: Vec<BuildingId>,
}

impl FilterResult {
    pub fn new(filter_index: usize, query: impl Into<String>, matches: Vec<BuildingId>) -> Self {
        Self {
            filter_index,
            query: query.into(),
            matches,
        }
    }
}

/// Resets the store to neutral, then colors every matched building by the
/// first filter (lowest index) that matched it. Returns how many buildings
/// ended up highlighted.
///
/// Ids that cannot be found under any representation are logged and skipped.
/// An empty `results` slice is the "clear all filters" case.
pub fn apply_filters(store: &mut BuildingStore, results: &[FilterResult]) -> usize {
    for presentation in store.presentations_mut() {
        presentation.reset();
    }
    if results.is_empty() {
        return 0;
    }

    let mut ordered: Vec<&FilterResult> = results.iter().collect();
    ordered.sort_by_key(|r| r.filter_index);

    let mut highlighted = 0;
    let mut unresolved = 0;
    for result in ordered {
        let color = palette_color(result.filter_index);
        for id in &result.matches {
            let Some(slot) = store.resolve(id) else {
                debug!(%id, filter = result.filter_index, "identifier mismatch: no such building");
                unresolved += 1;
                continue;
            };
            let Some(presentation) = store.presentation_mut(slot) else {
                continue;
            };
            if presentation.highlighted {
                continue;
            }
            presentation.display_color = color;
            presentation.highlighted = true;
            presentation.owning_filter = Some(result.filter_index);
            highlighted += 1;
        }
    }

    if unresolved > 0 {
        warn!(unresolved, "filter results referenced unknown buildings");
    }
    debug!(highlighted, filters = results.len(), "highlights applied");
    highlighted
}
