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

//! `TaskPool<T>`: deferred "event component" add/remove sequencing.
//!
//! `World::execute_tasks` drives every registered pool once per tick.
//! The normative contract (spec.md §4.9): entries queued by `add` are
//! applied as component `T` on the next `execute`, and held as the
//! removal queue for the *following* `execute`, which removes `T` from
//! each still-alive entity before applying the new batch of adds. Net
//! effect: `T` is visible via `has::<T>()` for exactly one tick between
//! two consecutive `execute_tasks()` calls.

use std::any::Any;

use crate::component::Component;
use crate::world::World;

pub struct TaskPool<T> {
    pending: Vec<(u32, u32, T)>,
    to_remove: Vec<(u32, u32)>,
}

impl<T> Default for TaskPool<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            to_remove: Vec::new(),
        }
    }
}

impl<T> TaskPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `value` to be applied as a component on `(entity_id,
    /// generation)` at the next `execute`. Does not mutate the entity
    /// immediately.
    pub fn add(&mut self, entity_id: u32, generation: u32, value: T) {
        self.pending.push((entity_id, generation, value));
    }

    /// Take this tick's removal queue (entities that received `T` on
    /// the previous `execute`) and this tick's pending additions,
    /// leaving the pool ready to accumulate the next round.
    pub(crate) fn take_round(&mut self) -> (Vec<(u32, u32)>, Vec<(u32, u32, T)>) {
        let removals = std::mem::take(&mut self.to_remove);
        let additions = std::mem::take(&mut self.pending);
        self.to_remove = additions.iter().map(|(id, gen, _)| (*id, *gen)).collect();
        (removals, additions)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Type-erased dispatch so `World::execute_tasks` can drive every
/// registered pool without knowing its `T`.
pub trait ErasedTaskPool: Any + Send + Sync {
    fn execute(&mut self, world: &mut World);
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedTaskPool for TaskPool<T> {
    fn execute(&mut self, world: &mut World) {
        let (removals, additions) = self.take_round();
        for (id, generation) in removals {
            if let Some(entity) = world.entity_handle(id, generation) {
                let _ = world.remove::<T>(entity);
            }
        }
        for (id, generation, value) in additions {
            if let Some(entity) = world.entity_handle(id, generation) {
                let _ = world.set::<T>(entity, value);
            }
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_round_has_no_removals_second_round_removes_first_adds() {
        let mut pool: TaskPool<u8> = TaskPool::new();
        pool.add(1, 1, 9);
        let (removals, additions) = pool.take_round();
        assert!(removals.is_empty());
        assert_eq!(additions, vec![(1, 1, 9)]);

        pool.add(2, 1, 7);
        let (removals, additions) = pool.take_round();
        assert_eq!(removals, vec![(1, 1)]);
        assert_eq!(additions, vec![(2, 1, 7)]);
    }
}
