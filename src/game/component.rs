//! Component Storage
//!
//! Components are plain data attached to entities. This module provides
//! `ComponentStorage<T>` - a sparse array that maps entity indices to
//! component data - and `ComponentStore`, the per-Scene map from component
//! type to its storage.
//!
//! We use simple sparse storage rather than archetypes. Gameplay scenes hold
//! hundreds to low thousands of entities, and the simpler approach makes
//! structural changes (add/remove) trivially cheap.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::entity::Entity;

/// Anything `'static` can be attached to an entity.
pub trait Component: 'static {}

impl<T: 'static> Component for T {}

/// Sparse storage for a single component type.
///
/// Uses Option<T> so we can have "holes" where entities don't have
/// this component. The index is the entity's index (not generation),
/// so liveness must be checked by the owning Scene.
pub struct ComponentStorage<T> {
    /// Sparse array indexed by entity.index()
    data: Vec<Option<T>>,
}

impl<T> ComponentStorage<T> {
    /// Create empty storage.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    fn ensure_capacity(&mut self, index: usize) {
        if index >= self.data.len() {
            self.data.resize_with(index + 1, || None);
        }
    }

    /// Insert a component for an entity.
    /// Replaces (and returns) any existing component.
    pub fn insert(&mut self, entity: Entity, component: T) -> Option<T> {
        let idx = entity.index() as usize;
        self.ensure_capacity(idx);
        self.data[idx].replace(component)
    }

    /// Remove a component from an entity.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        self.data.get_mut(entity.index() as usize).and_then(Option::take)
    }

    /// Get a reference to an entity's component.
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.data.get(entity.index() as usize).and_then(|opt| opt.as_ref())
    }

    /// Get a mutable reference to an entity's component.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.data.get_mut(entity.index() as usize).and_then(|opt| opt.as_mut())
    }

    /// Check if an entity has this component.
    pub fn contains(&self, entity: Entity) -> bool {
        self.contains_index(entity.index())
    }

    fn contains_index(&self, index: u32) -> bool {
        matches!(self.data.get(index as usize), Some(Some(_)))
    }

    /// Iterate over all (index, component) pairs.
    /// Note: index is u32, the entity must be validated separately.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(idx, opt)| opt.as_ref().map(|c| (idx as u32, c)))
    }

    /// Iterate mutably over all (index, component) pairs.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.data
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, opt)| opt.as_mut().map(|c| (idx as u32, c)))
    }

    /// Clear the component from an entity slot.
    pub fn clear_slot(&mut self, index: u32) {
        if let Some(slot) = self.data.get_mut(index as usize) {
            *slot = None;
        }
    }

    /// Get the number of entities that have this component.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|opt| opt.is_some()).count()
    }
}

impl<T> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Object-safe view of a `ComponentStorage<T>` used when the concrete
/// component type is not known (entity teardown, destruction hooks).
pub(crate) trait ErasedStorage {
    fn contains_index(&self, index: u32) -> bool;
    fn get_any_mut(&mut self, index: u32) -> Option<&mut dyn Any>;
    fn clear_slot(&mut self, index: u32);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStorage for ComponentStorage<T> {
    fn contains_index(&self, index: u32) -> bool {
        ComponentStorage::contains_index(self, index)
    }

    fn get_any_mut(&mut self, index: u32) -> Option<&mut dyn Any> {
        self.data
            .get_mut(index as usize)
            .and_then(|opt| opt.as_mut())
            .map(|c| c as &mut dyn Any)
    }

    fn clear_slot(&mut self, index: u32) {
        ComponentStorage::clear_slot(self, index);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// All component storages of one Scene, keyed by component type.
#[derive(Default)]
pub struct ComponentStore {
    storages: HashMap<TypeId, Box<dyn ErasedStorage>>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed storage for `T`, if any component of that type was ever added.
    pub fn storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<ComponentStorage<T>>())
    }

    /// Typed mutable storage for `T`, if it exists.
    pub fn storage_mut<T: Component>(&mut self) -> Option<&mut ComponentStorage<T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<ComponentStorage<T>>())
    }

    /// Typed mutable storage for `T`, created on first use.
    pub fn storage_or_insert<T: Component>(&mut self) -> &mut ComponentStorage<T> {
        let storage = self
            .storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentStorage::<T>::new()));
        match storage.as_any_mut().downcast_mut::<ComponentStorage<T>>() {
            Some(typed) => typed,
            // The map is keyed by TypeId::of::<T>, so the box always holds ComponentStorage<T>.
            None => unreachable!("component storage registered under a foreign TypeId"),
        }
    }

    pub(crate) fn erased_mut(&mut self, type_id: TypeId) -> Option<&mut (dyn ErasedStorage + 'static)> {
        self.storages.get_mut(&type_id).map(|s| s.as_mut())
    }

    /// Whether the slot holds a component of the given type.
    pub(crate) fn contains(&self, type_id: TypeId, index: u32) -> bool {
        self.storages
            .get(&type_id)
            .is_some_and(|s| s.contains_index(index))
    }

    /// Drop every component stored for an entity slot.
    pub fn clear_entity(&mut self, index: u32) {
        for storage in self.storages.values_mut() {
            storage.clear_slot(index);
        }
    }
}
