use foundation::bounds::Aabb3;

use crate::components::Drawable3D;
use crate::entity::EntityId;

/// The drawable collection.
///
/// Components live in parallel slot arrays indexed by [`EntityId`]. `R` is the
/// back-reference payload a drawable can carry to the record it was built
/// from; the scene never interprets it.
///
/// Only one owner should write to a `World` (the scene synchronizer); the render
/// loop and picking read it through `&World`.
#[derive(Debug)]
pub struct World<R> {
    next_index: u32,
    drawables: Vec<Option<Drawable3D>>,
    bounds: Vec<Option<Aabb3>>,
    back_refs: Vec<Option<R>>,
}

impl<R> Default for World<R> {
    fn default() -> Self {
        Self {
            next_index: 0,
            drawables: Vec::new(),
            bounds: Vec::new(),
            back_refs: Vec::new(),
        }
    }
}

impl<R> World<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> EntityId {
        let id = EntityId(self.next_index);
        self.next_index += 1;
        self.ensure_capacity(id.index() as usize);
        id
    }

    /// Spawns an entity carrying `drawable` and returns it.
    pub fn add(&mut self, drawable: Drawable3D) -> EntityId {
        let entity = self.spawn();
        self.set_drawable(entity, drawable);
        entity
    }

    /// Spawns an entity carrying `drawable` with a back-reference attached.
    pub fn add_with_back_ref(&mut self, drawable: Drawable3D, back_ref: R) -> EntityId {
        let entity = self.add(drawable);
        self.set_back_ref(entity, back_ref);
        entity
    }

    /// Sets the drawable and caches its bounds for picking.
    pub fn set_drawable(&mut self, entity: EntityId, drawable: Drawable3D) {
        let idx = entity.index() as usize;
        self.ensure_capacity(idx);
        self.bounds[idx] = drawable.bounds();
        self.drawables[idx] = Some(drawable);
    }

    pub fn set_back_ref(&mut self, entity: EntityId, back_ref: R) {
        let idx = entity.index() as usize;
        self.ensure_capacity(idx);
        self.back_refs[idx] = Some(back_ref);
    }

    pub fn drawable(&self, entity: EntityId) -> Option<&Drawable3D> {
        self.drawables
            .get(entity.index() as usize)
            .and_then(|d| d.as_ref())
    }

    pub fn bounds(&self, entity: EntityId) -> Option<Aabb3> {
        self.bounds.get(entity.index() as usize).and_then(|b| *b)
    }

    pub fn back_ref(&self, entity: EntityId) -> Option<&R> {
        self.back_refs
            .get(entity.index() as usize)
            .and_then(|r| r.as_ref())
    }

    /// Removes every entity and resets id allocation.
    pub fn clear(&mut self) {
        self.next_index = 0;
        self.drawables.clear();
        self.bounds.clear();
        self.back_refs.clear();
    }

    /// Number of live drawables.
    pub fn len(&self) -> usize {
        self.drawables.iter().filter(|d| d.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live drawables in ascending entity order.
    pub fn drawables(&self) -> impl Iterator<Item = (EntityId, &Drawable3D)> + '_ {
        self.drawables
            .iter()
            .enumerate()
            .filter_map(|(idx, d)| d.as_ref().map(|d| (EntityId(idx as u32), d)))
    }

    fn ensure_capacity(&mut self, idx: usize) {
        if self.drawables.len() <= idx {
            let new_len = idx + 1;
            self.drawables.resize_with(new_len, || None);
            self.bounds.resize(new_len, None);
            self.back_refs.resize_with(new_len, || None);
        }
    }
}
