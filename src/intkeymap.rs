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

//! `IntKeyMap`: an open-addressed `u64 -> V` map used to resolve
//! archetype signatures by hash.
//!
//! Linear-probed, rehashes when the load factor reaches 1.0 (grows to
//! keep at least one empty slot so probing always terminates). Unlike
//! a map keyed directly on a signature's hash with no further check,
//! callers of `get`/`try_get` see every `V` stored under a given `u64`
//! key; the signature-equality verification required by spec.md §4.3 is
//! the caller's job (see `World::resolve_archetype`, which stores a
//! `SmallVec<ArchetypeId>` bucket per hash and compares full signatures
//! before accepting a hit).

#[derive(Clone)]
enum Slot<V> {
    Empty,
    Occupied(u64, V),
    Tombstone,
}

pub struct IntKeyMap<V> {
    slots: Vec<Slot<V>>,
    len: usize,
    /// Tombstones left behind by `remove`. Counted toward the load
    /// factor alongside `len` so that a probe sequence always has an
    /// `Empty` slot to terminate on: `len` alone can stay low forever
    /// under an insert/remove churn pattern while tombstones quietly
    /// fill the table.
    tombstones: usize,
}

impl<V: Clone> Clone for IntKeyMap<V> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            len: self.len,
            tombstones: self.tombstones,
        }
    }
}

const INITIAL_CAPACITY: usize = 16;

impl<V> IntKeyMap<V> {
    pub fn new() -> Self {
        Self {
            slots: (0..INITIAL_CAPACITY).map(|_| Slot::Empty).collect(),
            len: 0,
            tombstones: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn load_factor(&self) -> f32 {
        (self.len + self.tombstones) as f32 / self.slots.len() as f32
    }

    fn probe(&self, key: u64) -> usize {
        let mask = self.slots.len() - 1;
        let mut idx = (key as usize) & mask;
        loop {
            match &self.slots[idx] {
                Slot::Occupied(k, _) if *k == key => return idx,
                Slot::Empty => return idx,
                _ => idx = (idx + 1) & mask,
            }
        }
    }

    pub fn contains(&self, key: u64) -> bool {
        matches!(self.slots[self.probe(key)], Slot::Occupied(_, _))
    }

    pub fn get(&self, key: u64) -> Option<&V> {
        match &self.slots[self.probe(key)] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: u64) -> Option<&mut V> {
        let idx = self.probe(key);
        match &mut self.slots[idx] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    /// Same as `get`, spelled out for parity with spec.md's named
    /// contract (`try_get`).
    pub fn try_get(&self, key: u64) -> Option<&V> {
        self.get(key)
    }

    pub fn set(&mut self, key: u64, value: V) {
        if self.load_factor() >= 1.0 {
            self.rehash();
        }
        let idx = self.probe(key);
        let was_occupied = matches!(self.slots[idx], Slot::Occupied(_, _));
        self.slots[idx] = Slot::Occupied(key, value);
        if !was_occupied {
            self.len += 1;
        }
    }

    pub fn remove(&mut self, key: u64) -> Option<V> {
        let idx = self.probe(key);
        match std::mem::replace(&mut self.slots[idx], Slot::Tombstone) {
            Slot::Occupied(_, v) => {
                self.len -= 1;
                self.tombstones += 1;
                Some(v)
            }
            other => {
                // restore; it wasn't actually occupied
                self.slots[idx] = other;
                None
            }
        }
    }

    fn rehash(&mut self) {
        let new_cap = self.slots.len() * 2;
        let old = std::mem::replace(
            &mut self.slots,
            (0..new_cap).map(|_| Slot::Empty).collect(),
        );
        self.len = 0;
        self.tombstones = 0;
        for slot in old {
            if let Slot::Occupied(k, v) = slot {
                // direct insert: new table is big enough, no recursive rehash
                let idx = {
                    let mask = self.slots.len() - 1;
                    let mut i = (k as usize) & mask;
                    while matches!(self.slots[i], Slot::Occupied(_, _)) {
                        i = (i + 1) & mask;
                    }
                    i
                };
                self.slots[idx] = Slot::Occupied(k, v);
                self.len += 1;
            }
        }
    }
}

impl<V> Default for IntKeyMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
