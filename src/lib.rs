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

//! Archetype ECS — an in-process, archetype-based entity-component-
//! system kernel.
//!
//! Entities are generational handles (`Entity`) into a `World`, which
//! groups them by the exact set of component types they carry
//! (`Archetype`) and routes bulk iteration through structural `Query`s.
//! See each module for the invariants it's responsible for; `world.rs`
//! ties archetype resolution, component storage, and the entity table
//! together.

pub mod archetype;
pub mod bitset;
pub mod component;
pub mod entity;
pub mod error;
pub mod intkeymap;
pub mod prelude;
pub mod query;
pub mod registry;
pub mod sparse_dense;
pub mod storage;
pub mod task_pool;
pub mod world;

pub use archetype::{Archetype, ArchetypeId};
pub use component::{component_type_id, Component, ComponentTypeId};
pub use entity::Entity;
pub use error::{EcsError, Result};
pub use query::{Fetch, Query};
pub use task_pool::TaskPool;
pub use world::{World, WorldConfig, WorldInfo};
