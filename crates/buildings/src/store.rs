use std::collections::HashMap;

use foundation::BuildingId;
use foundation::math::Vec2;

use crate::record::Building;
use crate::symbology::{Color, NEUTRAL};

/// Engine-owned presentation state of one building. The only part of a
/// stored building other components may change after load.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Presentation {
    pub display_color: Color,
    pub highlighted: bool,
    pub owning_filter: Option<usize>,
    /// Footprint centre in local meters; refreshed on every scene rebuild.
    pub projected_center: Option<Vec2>,
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            display_color: NEUTRAL,
            highlighted: false,
            owning_filter: None,
            projected_center: None,
        }
    }
}

impl Presentation {
    /// Back to neutral. The projected-centre cache is left alone.
    pub fn reset(&mut self) {
        self.display_color = NEUTRAL;
        self.highlighted = false;
        self.owning_filter = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredBuilding {
    building: Building,
    pub presentation: Presentation,
}

impl StoredBuilding {
    pub fn building(&self) -> &Building {
        &self.building
    }

    pub fn id(&self) -> &BuildingId {
        &self.building.id
    }
}

/// All buildings of the current load, keyed by id.
///
/// Iteration follows insertion order of the load. A later record with an id
/// already present replaces the earlier one in its original position.
#[derive(Debug, Default, Clone)]
pub struct BuildingStore {
    entries: Vec<StoredBuilding>,
    index: HashMap<BuildingId, usize>,
}

impl BuildingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_buildings<I>(buildings: I) -> Self
    where
        I: IntoIterator<Item = Building>,
    {
        let mut store = Self::new();
        store.replace_all(buildings);
        store
    }

    /// Clears the store and repopulates it. Presentation starts neutral.
    pub fn replace_all<I>(&mut self, buildings: I)
    where
        I: IntoIterator<Item = Building>,
    {
        self.entries.clear();
        self.index.clear();
        for building in buildings {
            let stored = StoredBuilding {
                building,
                presentation: Presentation::default(),
            };
            match self.index.get(&stored.building.id) {
                Some(&slot) => self.entries[slot] = stored,
                None => {
                    self.index
                        .insert(stored.building.id.clone(), self.entries.len());
                    self.entries.push(stored);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &BuildingId) -> Option<&StoredBuilding> {
        self.index.get(id).map(|&slot| &self.entries[slot])
    }

    /// Slot of `id`, trying its numeric reading when the id as given is
    /// unknown.
    pub fn resolve(&self, id: &BuildingId) -> Option<usize> {
        if let Some(&slot) = self.index.get(id) {
            return Some(slot);
        }
        let alternate = id.numeric_alternate()?;
        self.index.get(&alternate).copied()
    }

    pub fn at(&self, slot: usize) -> Option<&StoredBuilding> {
        self.entries.get(slot)
    }

    pub fn presentation_mut(&mut self, slot: usize) -> Option<&mut Presentation> {
        self.entries.get_mut(slot).map(|e| &mut e.presentation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredBuilding> + '_ {
        self.entries.iter()
    }

    pub fn presentations_mut(&mut self) -> impl Iterator<Item = &mut Presentation> + '_ {
        self.entries.iter_mut().map(|e| &mut e.presentation)
    }

    pub fn highlighted_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.presentation.highlighted)
            .count()
    }
}
