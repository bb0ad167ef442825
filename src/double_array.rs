// Copyright 2024 The packed-corasick Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The base/check double array, together with the free-slot allocator that is threaded through
//! it.
//!
//! An occupied state `s` reached from `parent` on byte `b` satisfies `check[s] == parent` and
//! `base[parent] + b == s`. Every unoccupied state is a member of a doubly linked list that lives
//! in the very same cells: a free state stores `-(next free state)` in `check` (or `-1` if it is
//! the last one) and `-(previous free state)` in `base`. The list is headed by `check[0]`, which
//! holds `-(first free state)`, or `0` if there are no free states at all. The previous-pointer of
//! the first free state wraps around to the last one, so both ends of the list are reachable in
//! constant time.
//!
//! For example, growing `base: [5 0 0]`, `check: [0 0 0]` by three states gives
//!
//! ```text
//! base:  [  5 0 0 -5 -3 -4 ]
//! check: [ -3 0 0 -4 -5 -1 ]
//! ```
//!
//! where state 3 is the head, state 5 is the tail, and `base[3] == -5` points back at the tail.

use log::trace;

/// The root state. It is always occupied, and `check[ROOT]` doubles as the head of the free list.
pub const ROOT: usize = 0;

/// The `base` value of a state without any outgoing transitions.
///
/// Every real base value is at least `1 - 255`, and `LEAF + 255` is still negative, so no byte can
/// lead out of a leaf.
pub const LEAF: i32 = -1867;

// Negating the `check` value of the last free state yields this. It is never a free state once an
// automaton has at least one transition, since the smallest child of the root always lands on it.
const END_OF_LIST: i32 = 1;

#[derive(Clone, Debug)]
pub struct DoubleArray {
    base: Vec<i32>,
    check: Vec<i32>,
}

impl DoubleArray {
    /// Creates a double array holding only the root, with room for `capacity` states.
    pub fn with_capacity(capacity: usize) -> DoubleArray {
        let mut base = Vec::with_capacity(capacity);
        let mut check = Vec::with_capacity(capacity);
        base.push(0);
        check.push(0);
        DoubleArray {
            base: base,
            check: check,
        }
    }

    /// The number of states, free or occupied.
    pub fn len(&self) -> usize {
        self.check.len()
    }

    pub fn base(&self) -> &[i32] {
        &self.base
    }

    pub fn check(&self) -> &[i32] {
        &self.check
    }

    /// Marks `state` as a state without children.
    pub fn set_leaf(&mut self, state: usize) {
        self.base[state] = LEAF;
    }

    pub fn set_base(&mut self, state: usize, base: i32) {
        self.base[state] = base;
    }

    /// Is `state` currently on the free list?
    pub fn is_free(&self, state: usize) -> bool {
        state != ROOT && self.check[state] < 0
    }

    /// Follows the transition labelled `byte` out of the occupied state `from`, if there is one.
    #[inline(always)]
    pub fn transition(&self, from: usize, byte: u8) -> Option<usize> {
        let to = self.base[from] + byte as i32;
        if to > 0 && (to as usize) < self.check.len() && self.check[to as usize] == from as i32 {
            Some(to as usize)
        } else {
            None
        }
    }

    pub fn first_free(&self) -> Option<usize> {
        match self.check[ROOT] {
            0 => None,
            head => Some(-head as usize),
        }
    }

    pub fn last_free(&self) -> Option<usize> {
        self.first_free().map(|first| -self.base[first] as usize)
    }

    /// The free state following `state` in the list, which is always the next larger free index.
    pub fn next_free(&self, state: usize) -> Option<usize> {
        match -self.check[state] {
            END_OF_LIST => None,
            next => Some(next as usize),
        }
    }

    /// Takes `state` off the free list and makes it a childless child of `parent`.
    ///
    /// Every transition of a state from free to occupied has to go through here; writing `check`
    /// directly leaves the free list pointing at an occupied state.
    pub fn occupy(&mut self, state: usize, parent: usize) {
        debug_assert!(self.is_free(state), "state {} is not free", state);
        match (self.first_free(), self.last_free()) {
            (Some(first), Some(last)) if first == last => {
                self.check[ROOT] = 0;
            }
            (Some(first), _) if first == state => {
                let next = -self.check[state];
                self.check[ROOT] = -next;
                // The new head inherits the pointer to the tail.
                self.base[next as usize] = self.base[state];
            }
            (Some(first), Some(last)) if last == state => {
                let prev = -self.base[state];
                self.base[first] = -prev;
                self.check[prev as usize] = -END_OF_LIST;
            }
            _ => {
                let next = -self.check[state];
                let prev = -self.base[state];
                self.check[prev as usize] = -next;
                self.base[next as usize] = -prev;
            }
        }
        self.check[state] = parent as i32;
        self.base[state] = LEAF;
    }

    /// Appends `n` free states, linking them onto the end of the free list in ascending order.
    pub fn grow_by(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let old_len = self.len();
        trace!("growing double array from {} to {} states", old_len, old_len + n);
        self.base.resize(old_len + n, 0);
        self.check.resize(old_len + n, 0);

        let mut ends = self.first_free().zip(self.last_free());
        for state in old_len..(old_len + n) {
            let s = state as i32;
            match ends {
                Some((first, last)) => {
                    self.base[state] = -(last as i32);
                    self.check[state] = -END_OF_LIST;
                    self.base[first] = -s;
                    self.check[last] = -s;
                    ends = Some((first, state));
                }
                None => {
                    self.check[ROOT] = -s;
                    self.base[state] = -s;
                    self.check[state] = -END_OF_LIST;
                    ends = Some((state, state));
                }
            }
        }
    }

    /// Finds a base such that `base + e` is a free state for every `e` in `edges`, growing the
    /// array if that is the only way to fit them.
    ///
    /// `edges` must be sorted and free of duplicates. Returns `LEAF` if it is empty.
    pub fn find_base(&mut self, edges: &[u8]) -> i32 {
        let (min, max) = match (edges.first(), edges.last()) {
            (Some(&min), Some(&max)) => (min as usize, max as usize),
            _ => return LEAF,
        };
        debug_assert!(edges.windows(2).all(|w| w[0] < w[1]));
        let width = max - min;

        let mut candidate = self.first_free();
        while let Some(free) = candidate {
            // States past the end are about to be appended, so they count as free.
            let fits = edges[1..].iter().all(|&e| {
                let state = free + e as usize - min;
                state >= self.len() || self.is_free(state)
            });
            if fits {
                if free + width >= self.len() {
                    let missing = free + width + 1 - self.len();
                    self.grow_by(missing);
                }
                return free as i32 - min as i32;
            }
            candidate = self.next_free(free);
        }

        let free = self.len();
        self.grow_by(width + 1);
        free as i32 - min as i32
    }

    /// Walks the free list from head to tail.
    #[cfg(test)]
    pub fn free_states(&self) -> Vec<usize> {
        let mut states = Vec::new();
        let mut cur = self.first_free();
        while let Some(state) = cur {
            states.push(state);
            cur = self.next_free(state);
        }
        states
    }

    #[cfg(test)]
    fn from_parts(base: Vec<i32>, check: Vec<i32>) -> DoubleArray {
        DoubleArray {
            base: base,
            check: check,
        }
    }
}
