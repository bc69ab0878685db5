// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `World`: archetype discovery, component-store/task-pool registries,
//! and the entity/component/query public API (spec.md §3/§4.6/§6).
//!
//! A `World` must not move once entities have been created from it:
//! `Entity` carries a raw, non-owning pointer back into its `World`
//! (see `entity.rs`) for the ergonomic `entity.set()`/`entity.get()`
//! sugar described in spec.md §6. `registry.rs` boxes each named world
//! so its address stays stable for the process lifetime.

use std::ptr::NonNull;

use smallvec::SmallVec;

#[cfg(feature = "profiling")]
use tracing::{debug, trace};

use crate::archetype::{Archetype, ArchetypeId};
use crate::bitset::BitSignature;
use crate::component::{component_type_id, Component, ComponentTypeId};
use crate::entity::{Entity, EntityTable};
use crate::error::{EcsError, Result};
use crate::intkeymap::IntKeyMap;
use crate::query::{Fetch, Query};
use crate::storage::{ComponentStore, ErasedStore};
use crate::task_pool::{ErasedTaskPool, TaskPool};

/// Tuning knobs for a `World`, all optional with documented defaults
/// (spec.md §6). A plain `Copy` struct with a `Default` impl — no
/// external config crate is warranted at this layer (see SPEC_FULL.md).
#[derive(Debug, Clone, Copy)]
pub struct WorldConfig {
    pub initial_entities: usize,
    pub initial_archetypes: usize,
    /// Also serves as the hard cap on distinct `ComponentTypeId`s a
    /// single world may register (spec.md §3 "Upper bound is a
    /// configured capacity"). Exceeding it fails with
    /// `CapacityExceeded`.
    pub initial_component_types: usize,
    /// Accepted for parity with spec.md §6's documented config surface.
    /// Unused here: a `Query` holds nothing but two `BitSignature`s, so
    /// there is no query-side pool or buffer to pre-size.
    pub initial_queries: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_entities: 1024,
            initial_archetypes: 512,
            initial_component_types: 512,
            initial_queries: 32,
        }
    }
}

/// Snapshot returned by `World::info` (spec.md §6 Introspection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldInfo {
    pub entity_count: usize,
    pub free_count: usize,
    pub archetype_count: usize,
    pub component_type_count: usize,
}

pub struct World {
    config: WorldConfig,
    entities: EntityTable,
    archetypes: Vec<Archetype>,
    /// Maps `signature.hash64()` to every archetype id that currently
    /// hashes there; a hash hit is only accepted after verifying full
    /// signature equality (spec.md §4.3/§9 — the source's "trust the
    /// hash alone" shortcut is explicitly not followed here).
    archetype_buckets: IntKeyMap<SmallVec<[ArchetypeId; 2]>>,
    stores: Vec<Option<Box<dyn ErasedStore>>>,
    task_pools: Vec<Option<Box<dyn ErasedTaskPool>>>,
    lock_depth: u32,
    /// Entities whose signature changed while `lock_depth > 0`; purely
    /// a debug/testing aid (see `debug_check_invariants`) since the
    /// actual deferral is implemented per-archetype (archetype.rs).
    dirty_entities: Vec<u32>,
    destroyed: bool,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        let mut world = Self {
            config,
            entities: EntityTable::with_capacity(config.initial_entities),
            archetypes: Vec::with_capacity(config.initial_archetypes),
            archetype_buckets: IntKeyMap::new(),
            stores: (0..config.initial_component_types).map(|_| None).collect(),
            task_pools: (0..config.initial_component_types).map(|_| None).collect(),
            lock_depth: 0,
            dirty_entities: Vec::new(),
            destroyed: false,
        };
        // The empty (all-zero-signature) archetype always exists at index 0.
        let empty_sig = BitSignature::default();
        let id = world.push_archetype(empty_sig);
        debug_assert_eq!(id.index(), 0);
        world
    }

    // ---------------------------------------------------------------
    // World lifecycle
    // ---------------------------------------------------------------

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.destroyed = true;
        #[cfg(feature = "profiling")]
        debug!("world destroyed");
    }

    pub fn info(&self) -> WorldInfo {
        WorldInfo {
            entity_count: self.entities.alive_count(),
            free_count: self.entities.free_count(),
            archetype_count: self.archetypes.len(),
            component_type_count: self.stores.iter().filter(|s| s.is_some()).count(),
        }
    }

    // ---------------------------------------------------------------
    // Entity lifecycle (spec.md §4.7)
    // ---------------------------------------------------------------

    pub fn create_entity(&mut self) -> Entity {
        let (id, generation) = self.entities.allocate(ArchetypeId::from_index(0));
        self.archetypes[0].add_entity(id);
        // SAFETY: `self` is the `World` this handle is scoped to; see
        // the struct-level safety note and `entity.rs`.
        Entity::new(id, generation, NonNull::from(self))
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        if self.destroyed || entity.world != Some(NonNull::from(self)) {
            return false;
        }
        self.entities.is_alive(entity.id, entity.generation)
    }

    pub fn destroy(&mut self, entity: Entity) -> Result<()> {
        self.check_alive(entity)?;
        self.despawn_internal(entity.id);
        Ok(())
    }

    /// Shared by `destroy` and by `remove::<T>` when removing the last
    /// component recycles the entity (spec.md §4.6/§4.7: "entity
    /// destruction is the same code path as removed last component").
    fn despawn_internal(&mut self, id: u32) {
        if let Some(signature) = self.entities.signature(id).cloned() {
            for bit in signature.ones() {
                if let Some(Some(store)) = self.stores.get_mut(bit) {
                    store.erase_entity(id);
                }
            }
            if let Some(archetype_id) = self.entities.archetype(id) {
                self.archetypes[archetype_id.index()].remove_entity(id);
            }
        }
        self.entities.free(id);
    }

    fn check_alive(&self, entity: Entity) -> Result<()> {
        if self.destroyed {
            return Err(EcsError::WorldDestroyed);
        }
        if entity.world != Some(NonNull::from(self)) {
            return Err(EcsError::WrongWorld);
        }
        if !self.entities.is_alive(entity.id, entity.generation) {
            return Err(EcsError::StaleEntity);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Components (spec.md §4.4/§6)
    // ---------------------------------------------------------------

    fn ensure_capacity(&mut self, type_id: ComponentTypeId) -> Result<()> {
        let idx = type_id.index();
        if idx >= self.config.initial_component_types {
            return Err(EcsError::CapacityExceeded {
                capacity: self.config.initial_component_types,
            });
        }
        if idx >= self.stores.len() {
            self.stores.resize_with(idx + 1, || None);
            self.task_pools.resize_with(idx + 1, || None);
        }
        Ok(())
    }

    fn store_mut<T: Component>(&mut self) -> Result<&mut ComponentStore<T>> {
        let type_id = component_type_id::<T>();
        self.ensure_capacity(type_id)?;
        let slot = &mut self.stores[type_id.index()];
        if slot.is_none() {
            *slot = Some(Box::new(ComponentStore::<T>::new()));
        }
        Ok(slot
            .as_mut()
            .unwrap()
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .expect("store type mismatch for ComponentTypeId"))
    }

    fn store_ref<T: Component>(&self) -> Option<&ComponentStore<T>> {
        let type_id = component_type_id::<T>();
        self.stores
            .get(type_id.index())?
            .as_ref()?
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
    }

    /// Set (insert or overwrite) component `T` on `entity`. Overwriting
    /// an existing component value is an in-place write: no archetype
    /// move. Inserting a new component type resolves (creating if
    /// necessary) the entity's new archetype and moves it there.
    pub fn set<T: Component>(&mut self, entity: Entity, value: T) -> Result<&mut T> {
        self.check_alive(entity)?;
        let id = entity.id;
        let type_id = component_type_id::<T>();
        let already_has = self
            .entities
            .signature(id)
            .is_some_and(|s| s.test(type_id.index()));

        self.store_mut::<T>()?.set(id, value);

        if !already_has {
            self.ensure_capacity(type_id)?;
            let new_signature = {
                let sig = self.entities.signature_mut(id).expect("entity is alive");
                sig.set(type_id.index());
                sig.clone()
            };
            self.move_entity_to_signature(id, new_signature);
        }

        Ok(self
            .store_mut::<T>()?
            .get_mut(id)
            .expect("just inserted/overwritten"))
    }

    /// Mutable access to component `T` on `entity`, or `None` if absent.
    ///
    /// The original source returns a reference to a shared zero-value
    /// sentinel when the component is absent and tells callers to gate
    /// on `has::<T>()` for correctness (spec.md §6) — effectively an
    /// unchecked footgun, since writing through that reference would
    /// corrupt the sentinel for every other absent lookup. `Option<&mut
    /// T>` expresses the same "caller must check" contract directly and
    /// safely, so that redesign is adopted here (see DESIGN.md).
    pub fn get<T: Component>(&mut self, entity: Entity) -> Result<Option<&mut T>> {
        self.check_alive(entity)?;
        let id = entity.id;
        Ok(self
            .stores
            .get_mut(component_type_id::<T>().index())
            .and_then(|slot| slot.as_mut())
            .and_then(|store| store.as_any_mut().downcast_mut::<ComponentStore<T>>())
            .and_then(|store| store.get_mut(id)))
    }

    pub fn has<T: Component>(&self, entity: Entity) -> Result<bool> {
        self.check_alive(entity)?;
        Ok(self
            .entities
            .signature(entity.id)
            .is_some_and(|s| s.test(component_type_id::<T>().index())))
    }

    /// Remove component `T` from `entity`. A no-op if the entity
    /// doesn't carry `T` (spec.md §8). Removing the entity's last
    /// component recycles it instead of moving it to the empty
    /// archetype (spec.md §4.6).
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Result<()> {
        self.check_alive(entity)?;
        let id = entity.id;
        let type_id = component_type_id::<T>();
        if !self.has::<T>(entity)? {
            return Ok(());
        }

        if let Some(Some(store)) = self.stores.get_mut(type_id.index()) {
            store.erase_entity(id);
        }

        let new_count = {
            let sig = self.entities.signature_mut(id).expect("entity is alive");
            sig.clear(type_id.index());
            sig.count()
        };

        if new_count == 0 {
            self.despawn_internal(id);
        } else {
            let new_signature = self.entities.signature(id).unwrap().clone();
            self.move_entity_to_signature(id, new_signature);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Archetype resolution (spec.md §4.6)
    // ---------------------------------------------------------------

    fn push_archetype(&mut self, signature: BitSignature) -> ArchetypeId {
        let hash = signature.hash64();
        let id = ArchetypeId::from_index(self.archetypes.len());
        #[cfg(feature = "profiling")]
        trace!(archetype = id.index(), bits = signature.count(), "new archetype");
        self.archetypes.push(Archetype::new(signature));
        match self.archetype_buckets.get_mut(hash) {
            Some(bucket) => bucket.push(id),
            None => {
                let mut bucket = SmallVec::new();
                bucket.push(id);
                self.archetype_buckets.set(hash, bucket);
            }
        }
        id
    }

    /// Resolve `signature` to an `ArchetypeId`, creating the archetype
    /// if this exact signature hasn't been seen before.
    fn resolve_archetype(&mut self, signature: BitSignature) -> ArchetypeId {
        let hash = signature.hash64();
        if let Some(bucket) = self.archetype_buckets.get(hash) {
            for &candidate in bucket {
                if self.archetypes[candidate.index()].signature() == &signature {
                    return candidate;
                }
            }
        }
        self.push_archetype(signature)
    }

    fn move_entity_to_signature(&mut self, id: u32, new_signature: BitSignature) {
        let old_archetype = self.entities.archetype(id).expect("entity is alive");
        let new_archetype = self.resolve_archetype(new_signature);
        if old_archetype.index() == new_archetype.index() {
            return;
        }
        if self.lock_depth > 0 {
            self.dirty_entities.push(id);
        }
        self.archetypes[old_archetype.index()].remove_entity(id);
        self.archetypes[new_archetype.index()].add_entity(id);
        self.entities.set_archetype(id, new_archetype);
    }

    // ---------------------------------------------------------------
    // Queries (spec.md §4.8)
    // ---------------------------------------------------------------

    pub fn create_query<F: Fetch>(&mut self) -> Query<F> {
        Query::new(self)
    }

    pub(crate) fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub(crate) fn archetypes_mut(&mut self) -> &mut [Archetype] {
        &mut self.archetypes
    }

    pub(crate) fn enter_lock(&mut self) {
        self.lock_depth += 1;
    }

    /// On the transition to `lock_depth == 0`, the deferred per-archetype
    /// replays (already performed by `Archetype::unlock`, called by the
    /// query driver before this) have brought every dirty entity's
    /// archetype membership back in line with `EntityRecord.archetype_ref`,
    /// which was updated eagerly in `move_entity_to_signature`. This just
    /// clears the debug bookkeeping set.
    pub(crate) fn exit_lock(&mut self) {
        debug_assert!(self.lock_depth > 0);
        self.lock_depth -= 1;
        if self.lock_depth == 0 {
            self.dirty_entities.clear();
        }
    }

    pub(crate) fn generation_of(&self, id: u32) -> Option<u32> {
        self.entities.generation_of(id)
    }

    pub(crate) fn is_alive_id(&self, id: u32, generation: u32) -> bool {
        self.entities.is_alive(id, generation)
    }

    /// Reconstruct a handle scoped to this world, for internal callers
    /// (the task-pool driver) that only have raw `(id, generation)`
    /// pairs on hand.
    pub(crate) fn entity_handle(&mut self, id: u32, generation: u32) -> Option<Entity> {
        if self.entities.is_alive(id, generation) {
            Some(Entity::new(id, generation, NonNull::from(&mut *self)))
        } else {
            None
        }
    }

    /// Raw pointer to the value of component `T` on entity `id`, used by
    /// `Query::for_each`/`Fetch` to hand out `&T`/`&mut T` without
    /// holding a live borrow of `World` across the user callback (see
    /// query.rs).
    pub(crate) fn component_value_ptr<T: Component>(&mut self, id: u32) -> Option<*mut T> {
        self.store_mut::<T>().ok()?.get_mut_ptr(id)
    }

    // ---------------------------------------------------------------
    // Events / task pools (spec.md §4.9)
    // ---------------------------------------------------------------

    fn task_pool_mut<T: Component>(&mut self) -> Result<&mut TaskPool<T>> {
        let type_id = component_type_id::<T>();
        self.ensure_capacity(type_id)?;
        let slot = &mut self.task_pools[type_id.index()];
        if slot.is_none() {
            *slot = Some(Box::new(TaskPool::<T>::new()));
        }
        Ok(slot
            .as_mut()
            .unwrap()
            .as_any_mut()
            .downcast_mut::<TaskPool<T>>()
            .expect("task pool type mismatch for ComponentTypeId"))
    }

    pub fn set_event<T: Component>(&mut self, entity: Entity, value: T) -> Result<()> {
        self.check_alive(entity)?;
        self.task_pool_mut::<T>()?
            .add(entity.id, entity.generation, value);
        Ok(())
    }

    /// Drive every registered task pool once. Entries queued by
    /// `set_event` in the previous round are applied as components now;
    /// entries applied in the round before that are removed now (one
    /// tick of visibility, spec.md §4.9).
    pub fn execute_tasks(&mut self) {
        let world_ptr: *mut World = self;
        for slot in self.task_pools.iter_mut().flatten() {
            // SAFETY: single-threaded, synchronous execution; no other
            // code touches `World` while a task pool's `execute` runs.
            unsafe {
                slot.execute(&mut *world_ptr);
            }
        }
    }

    // ---------------------------------------------------------------
    // Test/debug invariant checks (spec.md §8)
    // ---------------------------------------------------------------

    #[cfg(test)]
    pub(crate) fn debug_check_invariants(&self) {
        assert_eq!(self.lock_depth, 0, "invariants only hold outside iteration");
        for archetype in &self.archetypes {
            for &id in archetype.entities() {
                assert_eq!(
                    self.entities.archetype(id),
                    Some(ArchetypeId::from_index(
                        self.archetypes
                            .iter()
                            .position(|a| std::ptr::eq(a, archetype))
                            .unwrap()
                    )),
                    "entity {id} archetype_ref must match its containing archetype"
                );
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Clone, Copy)]
    struct Position {
        x: i32,
        y: i32,
    }
    #[derive(Debug, PartialEq, Clone, Copy)]
    struct Velocity {
        x: i32,
        y: i32,
    }
    struct Tag;

    #[test]
    fn s1_empty_world() {
        let world = World::new();
        let info = world.info();
        assert_eq!(info.entity_count, 0);
        assert_eq!(info.free_count, 0);
        assert_eq!(info.archetype_count, 1);
        assert_eq!(info.component_type_count, 0);
    }

    #[test]
    fn s2_single_entity_two_components() {
        let mut world = World::new();
        let e = world.create_entity();
        e.set(Position { x: 1, y: 2 }).unwrap();
        e.set(Velocity { x: 3, y: 4 }).unwrap();

        let info = world.info();
        assert_eq!(info.entity_count, 1);
        assert_eq!(info.free_count, 0);
        assert_eq!(info.archetype_count, 3);
        assert_eq!(info.component_type_count, 2);

        assert_eq!(*e.get::<Position>().unwrap().unwrap(), Position { x: 1, y: 2 });
        assert!(e.has::<Velocity>().unwrap());
    }

    #[test]
    fn s4_generation_reuse() {
        let mut world = World::new();
        let e1 = world.create_entity();
        let id1 = e1.id();
        let gen1 = e1.generation();
        e1.destroy().unwrap();

        let e2 = world.create_entity();
        assert_eq!(e2.id(), id1);
        assert_eq!(e2.generation(), gen1 + 1);
        assert!(!e1.is_alive());
        assert!(e2.is_alive());
    }

    #[test]
    fn s5_event_one_frame_lifetime() {
        let mut world = World::new();
        let e = world.create_entity();
        e.set_event(Tag).unwrap();
        assert!(!e.has::<Tag>().unwrap());

        world.execute_tasks();
        assert!(e.has::<Tag>().unwrap());

        world.execute_tasks();
        assert!(!e.has::<Tag>().unwrap());
    }

    #[test]
    fn set_then_get_roundtrip() {
        let mut world = World::new();
        let e = world.create_entity();
        e.set(Position { x: 5, y: 6 }).unwrap();
        assert_eq!(*e.get::<Position>().unwrap().unwrap(), Position { x: 5, y: 6 });
    }

    #[test]
    fn set_then_remove_clears_has() {
        let mut world = World::new();
        let e = world.create_entity();
        e.set(Position { x: 0, y: 0 }).unwrap();
        e.set(Velocity { x: 0, y: 0 }).unwrap();
        e.remove::<Position>().unwrap();
        assert!(!e.has::<Position>().unwrap());
        assert!(e.is_alive());
    }

    #[test]
    fn removing_last_component_recycles_entity() {
        let mut world = World::new();
        let e = world.create_entity();
        e.set(Position { x: 0, y: 0 }).unwrap();
        e.remove::<Position>().unwrap();
        assert!(!e.is_alive());
    }

    #[test]
    fn remove_on_entity_without_component_is_noop() {
        let mut world = World::new();
        let e = world.create_entity();
        e.set(Position { x: 0, y: 0 }).unwrap();
        e.remove::<Velocity>().unwrap();
        assert!(e.is_alive());
        assert!(e.has::<Position>().unwrap());
    }

    #[test]
    fn distinct_entities_have_distinct_handles() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        assert_ne!((a.id(), a.generation()), (b.id(), b.generation()));
    }

    #[test]
    fn destroy_then_use_reports_stale_entity() {
        let mut world = World::new();
        let e = world.create_entity();
        e.destroy().unwrap();
        assert_eq!(e.set(Position { x: 0, y: 0 }), Err(EcsError::StaleEntity));
    }

    #[test]
    fn sixty_fifth_entity_grows_table_without_invalidating_existing_ids() {
        let mut world = World::with_config(WorldConfig {
            initial_entities: 64,
            ..WorldConfig::default()
        });
        let first = world.create_entity();
        for _ in 0..64 {
            world.create_entity();
        }
        assert!(first.is_alive());
        assert_eq!(world.info().entity_count, 65);
    }

    #[test]
    fn component_type_capacity_is_enforced() {
        struct OverCap;
        let mut world = World::with_config(WorldConfig {
            initial_component_types: 0,
            ..WorldConfig::default()
        });
        let e = world.create_entity();
        assert_eq!(
            e.set(OverCap {}).map(|_| ()),
            Err(EcsError::CapacityExceeded { capacity: 0 })
        );
    }

    #[test]
    fn world_destroyed_rejects_further_ops() {
        let mut world = World::new();
        let e = world.create_entity();
        world.mark_destroyed();
        assert_eq!(e.is_alive(), false);
        assert_eq!(world.destroy(e), Err(EcsError::WorldDestroyed));
    }
}
