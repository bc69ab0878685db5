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

//! `ComponentStore<T>`: per-component-type columnar storage keyed by
//! entity id.
//!
//! Thin, typed wrapper over [`SparseDenseMap`] so that iterating the
//! dense `values` array is contiguous in memory — the cache-friendly
//! property `Query::for_each` depends on for its hot path.

use crate::sparse_dense::SparseDenseMap;
use std::any::Any;

pub struct ComponentStore<T> {
    map: SparseDenseMap<T>,
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self {
            map: SparseDenseMap::new(),
        }
    }
}

impl<T> ComponentStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the value for `entity_id`.
    pub fn set(&mut self, entity_id: u32, value: T) {
        self.map.set(entity_id, value);
    }

    pub fn get(&self, entity_id: u32) -> Option<&T> {
        self.map.get(entity_id)
    }

    pub fn get_mut(&mut self, entity_id: u32) -> Option<&mut T> {
        self.map.get_mut(entity_id)
    }

    /// Raw pointer to the value for `entity_id`, for use by the query
    /// iterator, which must hand out `&mut T` without holding a live
    /// borrow of the store across the user callback (see `query.rs`).
    ///
    /// # Safety
    /// The returned pointer is valid only until the next structural
    /// change that touches this store (an insert that grows the dense
    /// array, or a removal that swaps it). Callers must not retain it
    /// past the single callback invocation it was fetched for.
    pub fn get_mut_ptr(&mut self, entity_id: u32) -> Option<*mut T> {
        self.get_mut(entity_id).map(|r| r as *mut T)
    }

    pub fn contains(&self, entity_id: u32) -> bool {
        self.map.contains(entity_id)
    }

    pub fn remove(&mut self, entity_id: u32) -> Option<T> {
        self.map.remove(entity_id)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.count()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Type-erased operations a `World` needs on a component store without
/// knowing its `T`: removing every trace of one entity (on destroy) and
/// dropping everything (on world teardown).
pub trait ErasedStore: Any + Send + Sync {
    fn erase_entity(&mut self, entity_id: u32);
    fn clear_all(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static + Send + Sync> ErasedStore for ComponentStore<T> {
    fn erase_entity(&mut self, entity_id: u32) {
        self.remove(entity_id);
    }

    fn clear_all(&mut self) {
        self.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let mut store: ComponentStore<(f32, f32)> = ComponentStore::new();
        store.set(3, (1.0, 2.0));
        assert_eq!(store.get(3), Some(&(1.0, 2.0)));
        assert!(store.contains(3));
        assert_eq!(store.remove(3), Some((1.0, 2.0)));
        assert!(!store.contains(3));
    }

    #[test]
    fn dense_iteration_is_contiguous() {
        let mut store: ComponentStore<u32> = ComponentStore::new();
        for i in 0..10 {
            store.set(i, i * 2);
        }
        store.remove(3);
        // every remaining value should be reachable and equal to key*2
        for &key in store.map.keys() {
            assert_eq!(store.get(key), Some(&(key * 2)));
        }
        assert_eq!(store.len(), 9);
    }

    #[test]
    fn erased_store_removes_by_id() {
        let mut store: ComponentStore<u8> = ComponentStore::new();
        store.set(1, 9);
        let erased: &mut dyn ErasedStore = &mut store;
        erased.erase_entity(1);
        assert!(!store.contains(1));
    }
}
