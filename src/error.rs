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

//! Error types
//!
//! Every variant is a programming error, not a recoverable runtime
//! condition: the core never retries and never handles an error
//! internally other than the lock-depth deferral of structural changes,
//! which is not an error at all.

use std::fmt;

/// ECS error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Operated on an entity whose generation no longer matches its slot.
    StaleEntity,

    /// Operated on a world that has already been destroyed.
    WorldDestroyed,

    /// An entity handle from one world was used against a different world.
    WrongWorld,

    /// `World::create` was called with a name already in the registry.
    NameInUse(String),

    /// `World::get` was called with a name not present in the registry.
    NoSuchWorld(String),

    /// A query asserted the same component type in both `with` and
    /// `without`.
    QueryConflict,

    /// The configured component-type capacity was exceeded.
    CapacityExceeded { capacity: usize },
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::StaleEntity => write!(f, "entity handle is stale (generation mismatch)"),
            EcsError::WorldDestroyed => write!(f, "world has been destroyed"),
            EcsError::WrongWorld => write!(f, "entity handle belongs to a different world"),
            EcsError::NameInUse(name) => write!(f, "world name already in use: {name}"),
            EcsError::NoSuchWorld(name) => write!(f, "no world registered under name: {name}"),
            EcsError::QueryConflict => {
                write!(f, "component type asserted in both with() and without()")
            }
            EcsError::CapacityExceeded { capacity } => {
                write!(f, "component type capacity exceeded (max {capacity})")
            }
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_non_empty() {
        let variants = [
            EcsError::StaleEntity,
            EcsError::WorldDestroyed,
            EcsError::WrongWorld,
            EcsError::NameInUse("w".into()),
            EcsError::NoSuchWorld("w".into()),
            EcsError::QueryConflict,
            EcsError::CapacityExceeded { capacity: 512 },
        ];
        for v in variants {
            assert!(!v.to_string().is_empty());
        }
    }
}
