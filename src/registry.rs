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

//! Process-local registry of named worlds (spec.md §6).
//!
//! This is the only boundary in the crate that is actually touched from
//! more than one thread: a coarse mutex guards the name→world map
//! itself, the same way `component.rs` guards its `TypeId` registry.
//! The mutex protects the bookkeeping operations (`create`/`get`/
//! `destroy`) only — once a caller holds the returned `&mut World` it is
//! on its own to serialize access to it, exactly as spec.md §5 describes
//! ("the world registry ... is the only cross-thread surface ... single-
//! threaded within one world").

use std::sync::OnceLock;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{EcsError, Result};
use crate::world::{World, WorldConfig};

fn registry() -> &'static Mutex<FxHashMap<String, Box<World>>> {
    static REGISTRY: OnceLock<Mutex<FxHashMap<String, Box<World>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(FxHashMap::default()))
}

/// Worlds removed from the name map by `destroy`, kept alive (but
/// marked destroyed) for the rest of the process. Entity handles are
/// raw pointers with no reference count (spec.md §3 "Ownership"), so a
/// stale handle must still be able to dereference its `World` to learn
/// it was destroyed rather than fault on freed memory; `destroy` frees
/// the *name* for reuse without freeing the backing allocation.
fn graveyard() -> &'static Mutex<Vec<Box<World>>> {
    static GRAVEYARD: OnceLock<Mutex<Vec<Box<World>>>> = OnceLock::new();
    GRAVEYARD.get_or_init(|| Mutex::new(Vec::new()))
}

/// Create and register a new world under `name`.
///
/// Fails with [`EcsError::NameInUse`] if `name` is already registered
/// (spec.md §6/§7). The returned reference stays valid until `destroy`
/// removes it; the `World` is boxed so its address never changes while
/// registered, matching the stability `Entity` handles depend on (see
/// world.rs).
pub fn create(name: impl Into<String>, config: WorldConfig) -> Result<&'static mut World> {
    let name = name.into();
    let mut map = registry().lock();
    if map.contains_key(&name) {
        return Err(EcsError::NameInUse(name));
    }
    let mut world = Box::new(World::with_config(config));
    let ptr: *mut World = &mut *world;
    map.insert(name, world);
    // SAFETY: `world` now lives in the registry's `Box`, which is never
    // moved or reallocated (map values are boxed, not inlined) until an
    // explicit `destroy` removes it.
    Ok(unsafe { &mut *ptr })
}

/// Look up a previously created world by name.
///
/// Fails with [`EcsError::NoSuchWorld`] if no world is registered under
/// `name`.
pub fn get(name: &str) -> Result<&'static mut World> {
    let mut map = registry().lock();
    let world = map
        .get_mut(name)
        .ok_or_else(|| EcsError::NoSuchWorld(name.to_string()))?;
    let ptr: *mut World = &mut **world;
    // SAFETY: see `create`.
    Ok(unsafe { &mut *ptr })
}

/// Destroy the world registered under `name`, freeing its slot for
/// reuse by a future `create`.
///
/// Fails with [`EcsError::NoSuchWorld`] if no world is registered under
/// `name`. Any entity handle or query still referencing the destroyed
/// world reports `WorldDestroyed` on its next use (spec.md §7).
pub fn destroy(name: &str) -> Result<()> {
    let mut world = {
        let mut map = registry().lock();
        map.remove(name)
            .ok_or_else(|| EcsError::NoSuchWorld(name.to_string()))?
    };
    world.mark_destroyed();
    graveyard().lock().push(world);
    Ok(())
}
