use foundation::GeoPoint;
use scene::World;
use scene::components::{Drawable3D, Material};
use scene::entity::EntityId;
use tracing::{debug, info};

use crate::mesh::{BuildingRef, MeshBuilder};
use crate::store::{BuildingStore, Presentation};
use crate::symbology::{Color, GRID, palette_color};

pub type BuildingWorld = World<BuildingRef>;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridConfig {
    /// Edge length in meters before scaling.
    pub size: f64,
    pub divisions: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 2000.0,
            divisions: 40,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct RebuildStats {
    pub drawn: usize,
    pub skipped: usize,
}

/// Sole writer of the drawable collection.
///
/// Every rebuild tears the whole scene down and re-adds the reference grid
/// plus one drawable per shapeable building, so what is drawn is always a
/// function of the store as it is now.
#[derive(Debug, Default)]
pub struct SceneSync {
    world: BuildingWorld,
    builder: MeshBuilder,
    grid: GridConfig,
    grid_entity: Option<EntityId>,
}

impl SceneSync {
    pub fn new(builder: MeshBuilder, grid: GridConfig) -> Self {
        Self {
            world: World::new(),
            builder,
            grid,
            grid_entity: None,
        }
    }

    /// Read access for the render loop and picking.
    pub fn world(&self) -> &BuildingWorld {
        &self.world
    }

    pub fn grid_entity(&self) -> Option<EntityId> {
        self.grid_entity
    }

    /// Number of building drawables (the grid excluded).
    pub fn building_count(&self) -> usize {
        self.world.len() - usize::from(self.grid_entity.is_some())
    }

    /// Full teardown and rebuild. Refreshes each building's projected-centre
    /// cache; buildings whose footprint cannot be shaped are skipped.
    pub fn rebuild(
        &mut self,
        store: &mut BuildingStore,
        reference: GeoPoint,
        scale: f64,
    ) -> RebuildStats {
        self.world.clear();
        self.grid_entity = Some(self.world.add(Drawable3D::grid(
            self.grid.size * scale,
            self.grid.divisions,
            Material::opaque(GRID.to_rgb()),
        )));

        let mut stats = RebuildStats::default();
        let mut centers = Vec::with_capacity(store.len());

        for entry in store.iter() {
            let color = highlight_color(&entry.presentation);
            match self.builder.try_build(entry, reference, scale, color) {
                Ok(mesh) => {
                    centers.push(Some(mesh.back_ref.center));
                    self.world.add_with_back_ref(mesh.drawable, mesh.back_ref);
                    stats.drawn += 1;
                }
                Err(err) => {
                    debug!(id = %entry.id(), %err, "skipping building");
                    centers.push(None);
                    stats.skipped += 1;
                }
            }
        }

        for (presentation, center) in store.presentations_mut().zip(centers) {
            presentation.projected_center = center;
        }

        info!(
            drawn = stats.drawn,
            skipped = stats.skipped,
            "scene rebuilt"
        );
        stats
    }
}

/// Color a highlighted building is drawn with: its owning filter's palette
/// entry.
pub fn highlight_color(presentation: &Presentation) -> Color {
    presentation
        .owning_filter
        .map(palette_color)
        .unwrap_or(presentation.display_color)
}
