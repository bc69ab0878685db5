//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use archetype_ecs::prelude::*;
//! ```

pub use crate::component::Component;
pub use crate::entity::Entity;
pub use crate::error::{EcsError, Result};
pub use crate::query::{Fetch, Query};
pub use crate::task_pool::TaskPool;
pub use crate::world::{World, WorldConfig, WorldInfo};
