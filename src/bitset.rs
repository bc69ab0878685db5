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

//! `BitSignature`: a growable bitset over `ComponentTypeId`s.
//!
//! Backed by a `Vec<u64>`, one bit per component type. `count` tracks
//! the number of set bits so archetype-emptiness checks don't need a
//! popcount pass. Hashing and equality treat trailing all-zero words as
//! absent, so two signatures with the same set bits but differently
//! sized backing arrays (e.g. one grew further and then had its high
//! bit cleared) still compare and hash equal.

use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Default)]
pub struct BitSignature {
    words: Vec<u64>,
    count: u32,
}

impl BitSignature {
    /// Create an empty signature capable of holding at least `capacity`
    /// bits without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(64);
        Self {
            words: vec![0; num_words],
            count: 0,
        }
    }

    /// Set the bit at `index`. Resizes automatically if `index` is out
    /// of bounds. `count` only changes on an actual 0→1 transition.
    pub fn set(&mut self, index: usize) {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }
        let mask = 1u64 << bit_idx;
        if self.words[word_idx] & mask == 0 {
            self.words[word_idx] |= mask;
            self.count += 1;
        }
    }

    /// Clear the bit at `index`. `count` only changes on an actual
    /// 1→0 transition. Out-of-range indices are a no-op.
    pub fn clear(&mut self, index: usize) {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if word_idx >= self.words.len() {
            return;
        }
        let mask = 1u64 << bit_idx;
        if self.words[word_idx] & mask != 0 {
            self.words[word_idx] &= !mask;
            self.count -= 1;
        }
    }

    /// Check if the bit at `index` is set.
    pub fn test(&self, index: usize) -> bool {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if word_idx >= self.words.len() {
            return false;
        }
        (self.words[word_idx] & (1u64 << bit_idx)) != 0
    }

    /// Number of set bits.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// True if no bits are set.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Reset to the empty signature without releasing backing storage.
    pub fn clear_all(&mut self) {
        for w in &mut self.words {
            *w = 0;
        }
        self.count = 0;
    }

    /// Superset test: does `self` contain every bit set in `other`?
    pub fn contains(&self, other: &Self) -> bool {
        for (i, &ow) in other.words.iter().enumerate() {
            let sw = self.words.get(i).copied().unwrap_or(0);
            if sw & ow != ow {
                return false;
            }
        }
        true
    }

    /// Returns true if this signature shares any set bit with `other`.
    pub fn intersects(&self, other: &Self) -> bool {
        let len = std::cmp::min(self.words.len(), other.words.len());
        for i in 0..len {
            if (self.words[i] & other.words[i]) != 0 {
                return true;
            }
        }
        false
    }

    /// Iterator over the indices of set bits, ascending.
    pub fn ones(&self) -> OnesIter<'_> {
        OnesIter {
            signature: self,
            word_idx: 0,
            current_word: if self.words.is_empty() {
                0
            } else {
                self.words[0]
            },
        }
    }

    /// Number of significant words, ignoring trailing all-zero words.
    fn significant_len(&self) -> usize {
        self.words
            .iter()
            .rposition(|&w| w != 0)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// 64-bit hash of the signature. Two signatures with identical set
    /// bits hash equal regardless of trailing zero words.
    pub fn hash64(&self) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        self.words[..self.significant_len()].hash(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for BitSignature {
    fn eq(&self, other: &Self) -> bool {
        let a = &self.words[..self.significant_len()];
        let b = &other.words[..other.significant_len()];
        a == b
    }
}

impl Eq for BitSignature {}

pub struct OnesIter<'a> {
    signature: &'a BitSignature,
    word_idx: usize,
    current_word: u64,
}

impl<'a> Iterator for OnesIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let trailing = self.current_word.trailing_zeros();
                self.current_word &= self.current_word - 1;
                return Some(self.word_idx * 64 + trailing as usize);
            }

            self.word_idx += 1;
            if self.word_idx >= self.signature.words.len() {
                return None;
            }
            self.current_word = self.signature.words[self.word_idx];
        }
    }
}
