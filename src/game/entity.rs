//! Entity Handles with Generational Indices
//!
//! Entities are lightweight identifiers that reference rows in a Scene's
//! component store. The generational index pattern prevents dangling references:
//! - Each entity slot has a generation counter
//! - When an entity is destroyed, its slot can be reused
//! - The generation increments on reuse, invalidating old references
//!
//! Handles also remember which Scene created them, so a handle from one
//! Scene never resolves inside another. Handles are not stable across
//! save/load; use the `Uuid` component for that.

use std::sync::atomic::{AtomicU32, Ordering};

/// Counter for generating scene identities
static SCENE_ID_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Identity of the Scene that owns an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u32);

impl SceneId {
    /// Allocate a process-unique scene identity.
    pub(crate) fn next() -> Self {
        SceneId(SCENE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The id used by `Entity::NULL`; no Scene ever receives it.
    pub const NONE: SceneId = SceneId(0);
}

/// A handle to an entity living in a Scene.
///
/// Consists of an index (which slot in the component store), a generation
/// (which version of that slot) and the owning scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    scene: SceneId,
    /// Index into the component storages
    index: u32,
    /// Generation counter - increments when slot is reused
    generation: u32,
}

impl Entity {
    pub(crate) fn new(scene: SceneId, index: u32, generation: u32) -> Self {
        Self { scene, index, generation }
    }

    /// Get the index of this entity (for component array access).
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Get the generation of this entity.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The Scene this handle belongs to.
    pub fn scene(&self) -> SceneId {
        self.scene
    }

    /// A null/invalid entity reference.
    pub const NULL: Entity = Entity {
        scene: SceneId::NONE,
        index: u32::MAX,
        generation: 0,
    };

    /// Check if this is the null entity.
    pub fn is_null(&self) -> bool {
        self.index == u32::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Entity::NULL
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Allocates and tracks entity lifetimes for one Scene.
///
/// Freed slots are reused with incremented generations to prevent
/// dangling references.
pub struct EntityAllocator {
    scene: SceneId,
    /// Generation counter for each slot
    generations: Vec<u32>,
    /// Whether each slot currently holds a live entity
    alive: Vec<bool>,
    /// Free slots available for reuse (LIFO)
    free_indices: Vec<u32>,
    /// Number of currently alive entities
    alive_count: u32,
}

impl EntityAllocator {
    /// Create a new allocator with no entities.
    pub fn new(scene: SceneId) -> Self {
        Self {
            scene,
            generations: Vec::new(),
            alive: Vec::new(),
            free_indices: Vec::new(),
            alive_count: 0,
        }
    }

    /// Allocate a new entity.
    pub fn allocate(&mut self) -> Entity {
        self.alive_count += 1;

        if let Some(index) = self.free_indices.pop() {
            // Generation was already incremented on free
            self.alive[index as usize] = true;
            Entity::new(self.scene, index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            Entity::new(self.scene, index, 0)
        }
    }

    /// Free an entity, making its slot available for reuse.
    /// Returns true if the entity was alive and is now freed.
    pub fn free(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        let idx = entity.index as usize;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.alive[idx] = false;
        self.free_indices.push(entity.index);
        self.alive_count -= 1;
        true
    }

    /// Check if an entity is currently alive in this allocator's scene.
    pub fn is_alive(&self, entity: Entity) -> bool {
        if entity.is_null() || entity.scene != self.scene {
            return false;
        }
        let idx = entity.index as usize;
        idx < self.generations.len() && self.alive[idx] && self.generations[idx] == entity.generation
    }

    /// Resolve the live entity occupying a slot, if any.
    pub fn entity_at(&self, index: u32) -> Option<Entity> {
        let idx = index as usize;
        if idx < self.alive.len() && self.alive[idx] {
            Some(Entity::new(self.scene, index, self.generations[idx]))
        } else {
            None
        }
    }

    /// Iterate over all live entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        (0..self.generations.len() as u32).filter_map(move |i| self.entity_at(i))
    }

    /// Get the number of currently alive entities.
    pub fn alive_count(&self) -> u32 {
        self.alive_count
    }

    /// Get the total number of slots ever allocated.
    pub fn capacity(&self) -> u32 {
        self.generations.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_free() {
        let mut alloc = EntityAllocator::new(SceneId::next());

        let e1 = alloc.allocate();
        let e2 = alloc.allocate();
        assert_eq!(alloc.alive_count(), 2);
        assert!(alloc.is_alive(e1));
        assert!(alloc.is_alive(e2));

        alloc.free(e1);
        assert_eq!(alloc.alive_count(), 1);
        assert!(!alloc.is_alive(e1));
        assert!(alloc.is_alive(e2));
        assert!(!alloc.free(e1));
    }

    #[test]
    fn test_generation_prevents_reuse_collision() {
        let mut alloc = EntityAllocator::new(SceneId::next());

        let e1 = alloc.allocate();
        alloc.free(e1);

        let e2 = alloc.allocate();
        assert_eq!(e2.index(), e1.index());
        assert_ne!(e2.generation(), e1.generation());
        assert!(!alloc.is_alive(e1));
        assert!(alloc.is_alive(e2));
    }

    #[test]
    fn test_foreign_scene_handle_rejected() {
        let mut a = EntityAllocator::new(SceneId::next());
        let b = EntityAllocator::new(SceneId::next());
        let e = a.allocate();
        assert!(!b.is_alive(e));
    }

    #[test]
    fn test_iter_skips_freed_slots() {
        let mut alloc = EntityAllocator::new(SceneId::next());
        let e0 = alloc.allocate();
        let e1 = alloc.allocate();
        let e2 = alloc.allocate();
        alloc.free(e1);

        let live: Vec<_> = alloc.iter().collect();
        assert_eq!(live, vec![e0, e2]);
        assert_eq!(alloc.entity_at(1), None);
    }

    #[test]
    fn test_null_entity() {
        let alloc = EntityAllocator::new(SceneId::next());
        assert!(!alloc.is_alive(Entity::NULL));
        assert!(Entity::NULL.is_null());
    }
}
