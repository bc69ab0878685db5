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

//! Archetype: the set of live entities sharing one component signature.
//!
//! An archetype owns a contiguous entity-id list used for iteration and
//! a re-entrancy counter (`lock_depth`) that turns membership changes
//! into a deferred queue while any query is iterating it. This is the
//! trickiest correctness property in the crate: see spec.md §4.5/§5 and
//! scenario S3 for the behavior this is meant to preserve.

use crate::bitset::BitSignature;
use crate::sparse_dense::SparseDenseSet;

/// Index of an archetype within a world's archetype arena. The empty
/// (all-zero-signature) archetype always lives at index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchetypeId(usize);

impl ArchetypeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
enum DeferredOp {
    Add,
    Remove,
}

pub struct Archetype {
    signature: BitSignature,
    entities: SparseDenseSet,
    lock_depth: u32,
    deferred: Vec<(u32, DeferredOp)>,
}

impl Archetype {
    pub fn new(signature: BitSignature) -> Self {
        Self {
            signature,
            entities: SparseDenseSet::new(),
            lock_depth: 0,
            deferred: Vec::new(),
        }
    }

    pub fn signature(&self) -> &BitSignature {
        &self.signature
    }

    /// Add `entity_id` to this archetype's membership, or enqueue the
    /// add if a query iterator currently holds this archetype locked.
    pub fn add_entity(&mut self, entity_id: u32) {
        if self.lock_depth > 0 {
            self.deferred.push((entity_id, DeferredOp::Add));
        } else {
            self.entities.insert(entity_id);
        }
    }

    /// Remove `entity_id` from this archetype's membership, or enqueue
    /// the removal if locked.
    pub fn remove_entity(&mut self, entity_id: u32) {
        if self.lock_depth > 0 {
            self.deferred.push((entity_id, DeferredOp::Remove));
        } else {
            self.entities.remove(entity_id);
        }
    }

    pub fn contains(&self, entity_id: u32) -> bool {
        self.entities.contains(entity_id)
    }

    /// Entity ids in dense-array (iteration) order.
    pub fn entities(&self) -> &[u32] {
        self.entities.keys()
    }

    pub fn len(&self) -> usize {
        self.entities.count()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Enter a locked region: structural membership changes are
    /// deferred until the matching `unlock`.
    pub fn lock(&mut self) {
        self.lock_depth += 1;
    }

    /// Leave a locked region. On the transition to `lock_depth == 0`,
    /// replays every deferred add/remove in insertion order against
    /// `entities`, then clears the queue. The replay itself runs at
    /// `lock_depth == 0` and is not re-entrant: nothing queued during
    /// replay would be possible since replay never calls back into user
    /// code.
    pub fn unlock(&mut self) {
        debug_assert!(self.lock_depth > 0, "unlock without matching lock");
        self.lock_depth -= 1;
        if self.lock_depth == 0 && !self.deferred.is_empty() {
            for (entity_id, op) in self.deferred.drain(..) {
                match op {
                    DeferredOp::Add => self.entities.insert(entity_id),
                    DeferredOp::Remove => {
                        self.entities.remove(entity_id);
                    }
                }
            }
        }
    }

    pub fn lock_depth(&self) -> u32 {
        self.lock_depth
    }
}
