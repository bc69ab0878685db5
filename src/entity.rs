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

//! Entity handles and the generational entity table.
//!
//! An [`Entity`] is a value-typed `{id, generation, world_id}` handle,
//! never owned by user code the way a reference-counted pointer is.
//! The [`EntityTable`] is the single source of truth: a handle is only
//! as good as the generation its slot currently holds.

use std::ptr::NonNull;

use crate::archetype::ArchetypeId;
use crate::bitset::BitSignature;
use crate::component::Component;
use crate::error::Result;
use crate::world::World;

/// Opaque handle to an entity within one world.
///
/// Two handles name the same live entity iff `id`, `generation`, and
/// `world` all match and the table slot `id` still holds `generation`.
/// `generation == 0` is reserved for the empty handle produced by
/// `Entity::default()` / `Entity::NONE`.
///
/// `world` is a non-owning pointer back to the `World` that produced
/// the handle, stored as `Option<NonNull<World>>` rather than a bare
/// `NonNull` so `Entity::NONE` can exist without pointing at garbage:
/// every method below goes through `self.world` with a checked
/// `ok_or`, so a `NONE` handle fails with `WrongWorld` instead of
/// dereferencing a dangling pointer. A `World` must not be moved once
/// entities have been created from it — keep it behind a stable
/// location such as a `Box` (the world registry in `registry.rs` does
/// this for you).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    pub(crate) id: u32,
    pub(crate) generation: u32,
    pub(crate) world: Option<NonNull<World>>,
}

impl Entity {
    /// The empty handle: never a live entity in any world.
    pub const NONE: Entity = Entity {
        id: 0,
        generation: 0,
        world: None,
    };

    pub fn id(self) -> u32 {
        self.id
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    pub(crate) fn new(id: u32, generation: u32, world: NonNull<World>) -> Self {
        Self {
            id,
            generation,
            world: Some(world),
        }
    }

    fn world_mut(self) -> Result<&'static mut World> {
        let mut ptr = self.world.ok_or(crate::error::EcsError::WrongWorld)?;
        // SAFETY: every live `Entity` is produced by `World::create_entity`
        // (or reconstructed by `Query::for_each`) from a `World` that the
        // caller has promised not to move or deallocate while handles to it
        // exist; see the struct-level safety note.
        Ok(unsafe { ptr.as_mut() })
    }

    fn world_ref(self) -> Result<&'static World> {
        let ptr = self.world.ok_or(crate::error::EcsError::WrongWorld)?;
        // SAFETY: see `world_mut`.
        Ok(unsafe { ptr.as_ref() })
    }

    /// Set (insert or overwrite) component `T` on this entity.
    pub fn set<T: Component>(self, value: T) -> Result<&'static mut T> {
        self.world_mut()?.set(self, value)
    }

    /// Mutable access to component `T`, or `None` if the entity doesn't
    /// carry it. See `World::get` for why this returns `Option` rather
    /// than a reference-to-zero-value sentinel.
    pub fn get<T: Component>(self) -> Result<Option<&'static mut T>> {
        self.world_mut()?.get(self)
    }

    pub fn has<T: Component>(self) -> Result<bool> {
        self.world_ref()?.has::<T>(self)
    }

    pub fn remove<T: Component>(self) -> Result<()> {
        self.world_mut()?.remove::<T>(self)
    }

    /// Queue `value` as component `T`, visible for exactly one
    /// `World::execute_tasks` tick (spec.md §4.9).
    pub fn set_event<T: Component>(self, value: T) -> Result<()> {
        self.world_mut()?.set_event(self, value)
    }

    pub fn destroy(self) -> Result<()> {
        self.world_mut()?.destroy(self)
    }

    pub fn is_alive(self) -> bool {
        match self.world_ref() {
            Ok(world) => world.is_alive(self),
            Err(_) => false,
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Entity::NONE
    }
}

#[derive(Debug, Clone)]
enum Slot {
    /// Slot is on the free list; `generation` is what it will be
    /// stamped with when next handed out (bumped at reuse time, not at
    /// destroy time).
    Free { generation: u32 },
    Alive {
        generation: u32,
        signature: BitSignature,
        archetype: ArchetypeId,
    },
}

/// Generational entity records with free-list recycling.
pub struct EntityTable {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
}

impl EntityTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
        }
    }

    /// Allocate a slot bound to `empty_archetype`, recycling a free slot
    /// (bumping its generation, wrapping 0 back to 1) if one exists.
    /// Returns `(id, generation)`.
    pub fn allocate(&mut self, empty_archetype: ArchetypeId) -> (u32, u32) {
        if let Some(id) = self.free_list.pop() {
            let Slot::Free { generation } = self.slots[id as usize] else {
                unreachable!("free list only ever holds free slots")
            };
            let next_gen = if generation == u32::MAX { 1 } else { generation + 1 };
            self.slots[id as usize] = Slot::Alive {
                generation: next_gen,
                signature: BitSignature::default(),
                archetype: empty_archetype,
            };
            (id, next_gen)
        } else {
            let id = self.slots.len() as u32;
            self.slots.push(Slot::Alive {
                generation: 1,
                signature: BitSignature::default(),
                archetype: empty_archetype,
            });
            (id, 1)
        }
    }

    /// Transition an alive slot back to free. Generation is bumped on
    /// next `allocate`, not here.
    pub fn free(&mut self, id: u32) {
        if let Slot::Alive { generation, .. } = self.slots[id as usize] {
            self.slots[id as usize] = Slot::Free { generation };
            self.free_list.push(id);
        }
    }

    pub fn is_alive(&self, id: u32, generation: u32) -> bool {
        matches!(self.slots.get(id as usize), Some(Slot::Alive { generation: g, .. }) if *g == generation)
    }

    pub fn signature(&self, id: u32) -> Option<&BitSignature> {
        match self.slots.get(id as usize) {
            Some(Slot::Alive { signature, .. }) => Some(signature),
            _ => None,
        }
    }

    pub fn archetype(&self, id: u32) -> Option<ArchetypeId> {
        match self.slots.get(id as usize) {
            Some(Slot::Alive { archetype, .. }) => Some(*archetype),
            _ => None,
        }
    }

    pub fn generation_of(&self, id: u32) -> Option<u32> {
        match self.slots.get(id as usize) {
            Some(Slot::Alive { generation, .. }) => Some(*generation),
            Some(Slot::Free { generation }) => Some(*generation),
            None => None,
        }
    }

    /// Mutable access to the signature bitset of a live entity, for the
    /// world to flip bits in place.
    pub fn signature_mut(&mut self, id: u32) -> Option<&mut BitSignature> {
        match self.slots.get_mut(id as usize) {
            Some(Slot::Alive { signature, .. }) => Some(signature),
            _ => None,
        }
    }

    pub fn set_archetype(&mut self, id: u32, archetype: ArchetypeId) {
        if let Some(Slot::Alive { archetype: a, .. }) = self.slots.get_mut(id as usize) {
            *a = archetype;
        }
    }

    /// Number of currently-alive entities.
    pub fn alive_count(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }
}
