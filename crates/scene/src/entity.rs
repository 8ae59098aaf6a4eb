/// Index of a drawable slot in a [`crate::World`].
///
/// Ids are only meaningful until the next [`crate::World::clear`]; nothing
/// outside the scene should hold on to them across a rebuild.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(&self) -> u32 {
        self.0
    }
}
