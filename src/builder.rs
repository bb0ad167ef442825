// Copyright 2024 The packed-corasick Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::VecDeque;
use std::time::Instant;

use log::debug;

use crate::automaton::Automaton;
use crate::double_array::{DoubleArray, ROOT};
use crate::error::{BuildError, Result};

const DEFAULT_CAPACITY: usize = 2048;

/// Options for compiling an [`Automaton`].
///
/// ```
/// use packed_corasick::Builder;
///
/// let ac = Builder::new().dedup(true).build(&["she", "he", "she"]).unwrap();
/// assert_eq!(ac.count("ushers"), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    dedup: bool,
    capacity: usize,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

/// A node of the trie being built.
///
/// The trie is never materialized: since the patterns are sorted, the patterns that go through a
/// node at `depth` are exactly the contiguous range `start..end` of the sorted list.
#[derive(Debug, Clone, Copy)]
struct Node {
    state: usize,
    depth: usize,
    start: usize,
    end: usize,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            dedup: false,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Whether identical patterns should be collapsed into one.
    ///
    /// By default they are not, and a pattern given `n` times is reported `n` times at every
    /// position where it occurs.
    pub fn dedup(mut self, yes: bool) -> Builder {
        self.dedup = yes;
        self
    }

    /// The number of states to reserve room for up front. This never changes the automaton that is
    /// built.
    pub fn capacity(mut self, capacity: usize) -> Builder {
        self.capacity = capacity;
        self
    }

    /// Compiles `patterns` into an automaton.
    ///
    /// # Errors
    /// if any of the patterns is empty.
    pub fn build<I, P>(&self, patterns: I) -> Result<Automaton>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let start = Instant::now();
        let mut pats = Vec::new();
        for (index, pat) in patterns.into_iter().enumerate() {
            let pat = pat.as_ref();
            if pat.is_empty() {
                return Err(BuildError::EmptyPattern { index: index });
            }
            pats.push(pat.to_vec());
        }
        pats.sort_unstable();
        if self.dedup {
            pats.dedup();
        }

        let mut build = Build::new(self.capacity);
        build.run(&pats, self.capacity);
        let ac = Automaton::from_parts(build.da, build.fail, build.output, pats.len());

        debug!(
            "compiled {} patterns into {} states ({} slots) in {:?}",
            pats.len(),
            ac.num_states(),
            ac.len(),
            start.elapsed()
        );
        Ok(ac)
    }
}

/// The in-progress automaton. The arrays here always have the same length.
struct Build {
    da: DoubleArray,
    fail: Vec<usize>,
    output: Vec<Vec<usize>>,
}

impl Build {
    fn new(capacity: usize) -> Build {
        let mut fail = Vec::with_capacity(capacity);
        let mut output = Vec::with_capacity(capacity);
        fail.push(ROOT);
        output.push(Vec::new());
        Build {
            da: DoubleArray::with_capacity(capacity),
            fail: fail,
            output: output,
        }
    }

    /// Builds the goto, fail and output functions breadth-first. `pats` must be sorted.
    fn run(&mut self, pats: &[Vec<u8>], capacity: usize) {
        let mut queue = VecDeque::with_capacity(capacity);
        queue.push_back(Node {
            state: ROOT,
            depth: 0,
            start: 0,
            end: pats.len(),
        });
        let mut edges = Vec::with_capacity(256);

        while let Some(node) = queue.pop_front() {
            if node.start >= node.end {
                self.da.set_leaf(node.state);
                continue;
            }

            // The range is sorted, so the distinct bytes come out sorted too.
            edges.clear();
            for pat in &pats[node.start..node.end] {
                let b = pat[node.depth];
                if edges.last() != Some(&b) {
                    edges.push(b);
                }
            }

            let base = self.da.find_base(&edges);
            self.da.set_base(node.state, base);
            self.fail.resize(self.da.len(), ROOT);
            self.output.resize_with(self.da.len(), Vec::new);

            let mut i = node.start;
            for &edge in &edges {
                let child = (base + edge as i32) as usize;
                self.da.occupy(child, node.state);

                // Children of the root fail to the root, which is where `fail` already points.
                if node.depth > 0 {
                    self.fail[child] = self.fail_target(self.fail[node.state], edge);
                }
                self.output[child] = self.output[self.fail[child]].clone();

                let mut sub = Node {
                    state: child,
                    depth: node.depth + 1,
                    start: i,
                    end: i,
                };
                while i < node.end && pats[i][node.depth] == edge {
                    // Patterns ending here sort before the ones that continue.
                    if pats[i].len() == sub.depth {
                        self.output[child].push(sub.depth);
                        sub.start += 1;
                    }
                    sub.end += 1;
                    i += 1;
                }
                queue.push_back(sub);
            }
        }
    }

    /// Follows the fail links starting at `state` until one of them has a transition on `edge`.
    fn fail_target(&self, mut state: usize, edge: u8) -> usize {
        loop {
            if let Some(next) = self.da.transition(state, edge) {
                return next;
            }
            if state == ROOT {
                return ROOT;
            }
            state = self.fail[state];
        }
    }
}
