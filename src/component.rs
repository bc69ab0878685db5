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

//! Component marker trait and the process-wide `ComponentTypeId`
//! registry.
//!
//! `ComponentTypeId` is assigned the first time a component type `T` is
//! observed by `component_type_id::<T>()`, process-wide, and is stable
//! for the process lifetime (spec.md §3/§9). Two worlds that register
//! different component sets in different orders still agree on ids for
//! any type both of them use, because the counter and the `TypeId` map
//! are global, not per-world.

use std::any::TypeId;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Marker trait for components. Components must be `'static` (no
/// borrowed data) and `Send + Sync` so a world can eventually be moved
/// across threads between ticks even though iteration itself is
/// single-threaded.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// Dense, zero-based index identifying a component type within a
/// process. Stable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

fn registry() -> &'static Mutex<FxHashMap<TypeId, ComponentTypeId>> {
    static REGISTRY: OnceLock<Mutex<FxHashMap<TypeId, ComponentTypeId>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(FxHashMap::default()))
}

static NEXT_ID: AtomicU32 = AtomicU32::new(0);

/// Resolve (assigning on first use) the process-wide `ComponentTypeId`
/// for `T`.
pub fn component_type_id<T: Component>() -> ComponentTypeId {
    let tid = TypeId::of::<T>();
    let mut map = registry().lock();
    *map.entry(tid)
        .or_insert_with(|| ComponentTypeId(NEXT_ID.fetch_add(1, Ordering::Relaxed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    #[test]
    fn same_type_always_same_id() {
        let a1 = component_type_id::<A>();
        let a2 = component_type_id::<A>();
        assert_eq!(a1, a2);
    }

    #[test]
    fn distinct_types_get_distinct_ids() {
        let a = component_type_id::<A>();
        let b = component_type_id::<B>();
        assert_ne!(a, b);
    }
}
