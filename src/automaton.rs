// Copyright 2024 The packed-corasick Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt::{Debug, Error as FmtError, Formatter};
use std::mem;

use crate::builder::Builder;
use crate::double_array::{DoubleArray, ROOT};
use crate::error::Result;
use crate::Match;

/// A compiled set of patterns.
///
/// The automaton is immutable, so a single instance can be searched from many threads at once.
#[derive(Clone)]
pub struct Automaton {
    /// The goto function.
    da: DoubleArray,
    /// The fail function. Free states point at the root.
    fail: Vec<usize>,
    /// For every state, the lengths of the patterns that end there, shortest first. This includes
    /// everything in `output[fail[state]]`.
    output: Vec<Vec<usize>>,
    num_patterns: usize,
}

impl Automaton {
    /// Compiles `patterns` with the default options. See [`Builder`] for more control.
    ///
    /// # Errors
    /// if any of the patterns is empty.
    pub fn new<I, P>(patterns: I) -> Result<Automaton>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        Builder::new().build(patterns)
    }

    pub(crate) fn from_parts(
        da: DoubleArray,
        fail: Vec<usize>,
        output: Vec<Vec<usize>>,
        num_patterns: usize,
    ) -> Automaton {
        debug_assert!(da.len() == fail.len() && da.len() == output.len());
        Automaton {
            da: da,
            fail: fail,
            output: output,
            num_patterns: num_patterns,
        }
    }

    /// Returns the number of patterns this automaton was compiled from.
    pub fn num_patterns(&self) -> usize {
        self.num_patterns
    }

    /// Returns the number of occupied states, including the root.
    pub fn num_states(&self) -> usize {
        1 + (1..self.da.len()).filter(|&s| !self.da.is_free(s)).count()
    }

    /// Returns the length of the state arrays, counting free states as well as occupied ones.
    pub fn len(&self) -> usize {
        self.da.len()
    }

    /// Returns the approximate size on the heap used by this automaton.
    pub fn approximate_size(&self) -> usize {
        let arrays = self.da.len() * (2 * mem::size_of::<i32>() + mem::size_of::<usize>());
        let outputs = self.output.iter().fold(0, |a, out| {
            a + mem::size_of::<Vec<usize>>() + out.capacity() * mem::size_of::<usize>()
        });
        arrays + outputs
    }

    /// Returns every occurrence of every pattern in `haystack`, overlapping ones included.
    ///
    /// Matches are ordered by where they end. Matches that end at the same place are ordered from
    /// shortest to longest.
    pub fn find_all<'t, T: AsRef<[u8]> + ?Sized>(&self, haystack: &'t T) -> Vec<Match<'t>> {
        self.find_iter(haystack).collect()
    }

    /// Returns a lazy iterator over the same matches that [`find_all`](Automaton::find_all)
    /// returns.
    pub fn find_iter<'a, 't, T: AsRef<[u8]> + ?Sized>(&'a self, haystack: &'t T) -> FindIter<'a, 't> {
        FindIter {
            ac: self,
            haystack: haystack.as_ref(),
            pos: 0,
            state: ROOT,
            pending: &[],
        }
    }

    /// Returns true if any pattern occurs in `haystack`.
    pub fn is_match<T: AsRef<[u8]> + ?Sized>(&self, haystack: &T) -> bool {
        self.find_iter(haystack).next().is_some()
    }

    /// Returns the number of matches in `haystack`, without building them.
    pub fn count<T: AsRef<[u8]> + ?Sized>(&self, haystack: &T) -> usize {
        let mut state = ROOT;
        let mut count = 0;
        for &b in haystack.as_ref() {
            state = self.next_state(state, b);
            count += self.output[state].len();
        }
        count
    }

    /// The state reached from `state` on `byte`, going through as many fail links as it takes.
    ///
    /// Each fail link leads to a strictly shallower state, so this is amortized constant time over
    /// a whole haystack.
    #[inline(always)]
    fn next_state(&self, mut state: usize, byte: u8) -> usize {
        loop {
            if let Some(next) = self.da.transition(state, byte) {
                return next;
            }
            if state == ROOT {
                return ROOT;
            }
            state = self.fail[state];
        }
    }

    /// Panics unless all of the structural invariants hold.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let len = self.da.len();
        let (base, check) = (self.da.base(), self.da.check());
        assert!(len == self.fail.len() && len == self.output.len());

        // The free list visits exactly the free states, in ascending order, with consistent back
        // pointers.
        let free = self.da.free_states();
        let expected: Vec<usize> = (1..len).filter(|&s| check[s] < 0).collect();
        assert_eq!(free, expected);
        assert!(!free.contains(&1));
        for w in free.windows(2) {
            assert_eq!(-base[w[1]] as usize, w[0]);
        }
        if let (Some(&first), Some(&last)) = (free.first(), free.last()) {
            assert_eq!(-base[first] as usize, last);
            assert_eq!(check[last], -1);
        }

        let mut depth = vec![0; len];
        for s in 1..len {
            if self.da.is_free(s) {
                assert_eq!(self.fail[s], ROOT);
                assert!(self.output[s].is_empty());
                continue;
            }
            let parent = check[s] as usize;
            assert!(!self.da.is_free(parent));
            let edge = s as i32 - base[parent];
            assert!(0 <= edge && edge <= 255, "state {} is not a child of {}", s, parent);
            assert_eq!(self.da.transition(parent, edge as u8), Some(s));
        }
        // Parents always have smaller depth than children, but not necessarily smaller indices.
        let mut changed = true;
        while changed {
            changed = false;
            for s in 1..len {
                if !self.da.is_free(s) && depth[s] != depth[check[s] as usize] + 1 {
                    depth[s] = depth[check[s] as usize] + 1;
                    changed = true;
                }
            }
        }
        for s in 1..len {
            if self.da.is_free(s) {
                continue;
            }
            let f = self.fail[s];
            assert!(f == ROOT || depth[f] < depth[s]);
            if depth[s] == 1 {
                assert_eq!(f, ROOT);
            }
            let out = &self.output[s];
            assert!(self.output[f].iter().all(|l| out.contains(l)));
            assert!(out.iter().all(|&l| 1 <= l && l <= depth[s]));
            assert!(out.windows(2).all(|w| w[0] <= w[1]));
        }
        assert!(self.output[ROOT].is_empty());
    }
}

impl Debug for Automaton {
    fn fmt(&self, f: &mut Formatter) -> std::result::Result<(), FmtError> {
        f.debug_struct("Automaton")
            .field("base", &self.da.base())
            .field("check", &self.da.check())
            .field("fail", &self.fail)
            .field("output", &self.output)
            .finish()
    }
}

/// An iterator over all the matches in a haystack, created by [`Automaton::find_iter`].
///
/// Dropping it part way through stops the search.
#[derive(Debug, Clone)]
pub struct FindIter<'a, 't> {
    ac: &'a Automaton,
    haystack: &'t [u8],
    /// How much of the haystack has been fed into the automaton.
    pos: usize,
    state: usize,
    /// The lengths of the matches ending at `pos` that haven't been returned yet.
    pending: &'a [usize],
}

impl<'a, 't> Iterator for FindIter<'a, 't> {
    type Item = Match<'t>;

    fn next(&mut self) -> Option<Match<'t>> {
        loop {
            if let Some((&len, rest)) = self.pending.split_first() {
                self.pending = rest;
                let start = self.pos - len;
                return Some(Match {
                    bytes: &self.haystack[start..self.pos],
                    start: start,
                });
            }
            let &b = self.haystack.get(self.pos)?;
            self.state = self.ac.next_state(self.state, b);
            self.pos += 1;
            self.pending = &self.ac.output[self.state];
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use quickcheck::TestResult;

    use super::Automaton;

    fn matches(pats: &[&str], text: &str) -> Vec<(String, usize)> {
        let ac = Automaton::new(pats).unwrap();
        ac.check_invariants();
        ac.find_all(text)
            .into_iter()
            .map(|m| (String::from_utf8_lossy(m.bytes()).into_owned(), m.start()))
            .collect()
    }

    macro_rules! find_all {
        ($name:ident, $pats:expr, $text:expr, $expected:expr) => {
            #[test]
            fn $name() {
                let expected: Vec<(String, usize)> =
                    $expected.iter().map(|&(s, i): &(&str, usize)| (s.to_owned(), i)).collect();
                assert_eq!(matches(&$pats, $text), expected);
            }
        }
    }

    find_all!(find_ushers, ["he", "she", "his", "hers"], "ushers", [("he", 2), ("she", 1), ("hers", 2)]);
    find_all!(find_single_byte, ["a"], "aaabbabababa",
              [("a", 0), ("a", 1), ("a", 2), ("a", 5), ("a", 7), ("a", 9), ("a", 11)]);
    find_all!(find_theyre,
              ["they", "their", "theyre", "the", "tea", "te", "team", "go", "goo", "good", "oode"],
              "theyre not a goode team",
              [("the", 0), ("they", 0), ("theyre", 0), ("go", 13), ("goo", 13), ("good", 13),
               ("oode", 14), ("te", 19), ("tea", 19), ("team", 19)]);
    find_all!(find_none, [] as [&str; 0], "there is no patterns", []);
    find_all!(find_inking, ["na", "ink", "ki"], "inking", [("ink", 0), ("ki", 2)]);
    find_all!(find_erican, ["ca", "erica", "rice"], "erican", [("ca", 3), ("erica", 0)]);
    find_all!(find_multibyte, ["锅", "持有人", "potholderz", "MF DOOM"],
              "potholderz by MF DOOM hot shit aw shit 锅 持有人",
              [("potholderz", 0), ("MF DOOM", 14), ("锅", 39), ("持有人", 43)]);
    find_all!(find_empty_haystack, ["a", "ab"], "", []);
    find_all!(find_nested, ["a", "aa", "aaa"], "aaa",
              [("a", 0), ("a", 1), ("aa", 0), ("a", 2), ("aa", 1), ("aaa", 0)]);

    #[test]
    fn match_accessors() {
        let ac = Automaton::new(&["lder"]).unwrap();
        let m = ac.find_iter("potholderz").next().unwrap();
        assert_eq!(m.start(), 5);
        assert_eq!(m.end(), 9);
        assert_eq!(m.len(), 4);
        assert!(!m.is_empty());
        assert_eq!(m.bytes(), b"lder");
    }

    #[test]
    fn count_and_is_match() {
        let ac = Automaton::new(&["he", "she", "his", "hers"]).unwrap();
        assert_eq!(ac.count("ushers"), 3);
        assert_eq!(ac.count("ushers"), ac.find_all("ushers").len());
        assert!(ac.is_match("this"));
        assert!(!ac.is_match("xyz"));
        assert_eq!(ac.num_patterns(), 4);
        assert!(ac.num_states() <= ac.len());
        assert!(ac.approximate_size() > 0);
    }

    #[test]
    fn find_iter_can_stop_early() {
        let ac = Automaton::new(&["a"]).unwrap();
        let text = vec![b'a'; 1000];
        let mut it = ac.find_iter(&text);
        assert_eq!(it.next().map(|m| m.start()), Some(0));
        assert_eq!(it.next().map(|m| m.start()), Some(1));
    }

    #[test]
    fn debug_dump() {
        let ac = Automaton::new(&["ab"]).unwrap();
        let dump = format!("{:?}", ac);
        assert!(dump.contains("base"));
        assert!(dump.contains("check"));
        assert!(dump.contains("fail"));
        assert!(dump.contains("output: [[], [], [2]]"));
    }

    #[test]
    fn shared_between_threads() {
        let ac = Automaton::new(&["he", "she", "his", "hers"]).unwrap();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| assert_eq!(ac.count("ushers ushers"), 6));
            }
        });
    }

    /// Shrinks random bytes down to a three letter alphabet, so that patterns actually show up in
    /// random haystacks.
    fn small_alphabet(bytes: &[u8]) -> Vec<u8> {
        bytes.iter().map(|b| b'a' + b % 3).collect()
    }

    fn prepare(pats: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        pats.iter()
            .filter(|p| !p.is_empty())
            .map(|p| small_alphabet(&p[..p.len().min(6)]))
            .collect()
    }

    /// Every `(start, len)` of every pattern, found the slow way.
    fn naive(pats: &[Vec<u8>], haystack: &[u8]) -> Vec<(usize, usize)> {
        let mut found = Vec::new();
        for pat in pats {
            for start in 0..haystack.len() {
                if haystack[start..].starts_with(pat) {
                    found.push((start, pat.len()));
                }
            }
        }
        found.sort();
        found
    }

    quickcheck! {
        fn round_trip(pats: Vec<Vec<u8>>) -> TestResult {
            let pats = prepare(pats);
            if pats.is_empty() {
                return TestResult::discard();
            }
            let ac = Automaton::new(&pats).unwrap();
            ac.check_invariants();
            TestResult::from_bool(pats.iter().all(|p| {
                ac.find_iter(p).any(|m| m.start() == 0 && m.len() == p.len())
            }))
        }

        fn substring_closure(p: Vec<u8>, cut: usize, prefix: Vec<u8>) -> TestResult {
            let p = small_alphabet(&p);
            if p.is_empty() {
                return TestResult::discard();
            }
            let q = p[cut % p.len()..].to_vec();
            let mut text = small_alphabet(&prefix);
            text.extend_from_slice(&p);
            let ac = Automaton::new(&[&p, &q]).unwrap();
            let ends: BTreeSet<(usize, usize)> = ac.find_iter(&text).map(|m| (m.end(), m.len())).collect();
            TestResult::from_bool(ends.contains(&(text.len(), p.len())) && ends.contains(&(text.len(), q.len())))
        }

        fn no_false_positives(pats: Vec<Vec<u8>>, haystack: Vec<u8>) -> bool {
            let pats = prepare(pats);
            let haystack = small_alphabet(&haystack);
            let ac = Automaton::new(&pats).unwrap();
            ac.find_iter(&haystack).all(|m| {
                pats.iter().any(|p| p[..] == *m.bytes())
                    && m.bytes() == &haystack[m.start()..m.start() + m.len()]
            })
        }

        fn complete(pats: Vec<Vec<u8>>, haystack: Vec<u8>) -> bool {
            let pats = prepare(pats);
            let haystack = small_alphabet(&haystack);
            let ac = Automaton::new(&pats).unwrap();
            let mut found: Vec<(usize, usize)> = ac.find_iter(&haystack).map(|m| (m.start(), m.len())).collect();
            found.sort();
            found == naive(&pats, &haystack) && ac.count(&haystack) == found.len()
        }

        fn ordered_by_end(pats: Vec<Vec<u8>>, haystack: Vec<u8>) -> bool {
            let pats = prepare(pats);
            let haystack = small_alphabet(&haystack);
            let ac = Automaton::new(&pats).unwrap();
            let found = ac.find_all(&haystack);
            found.windows(2).all(|w| (w[0].end(), w[0].len()) <= (w[1].end(), w[1].len()))
        }

        fn idempotent(pats: Vec<Vec<u8>>, haystack: Vec<u8>) -> bool {
            let pats = prepare(pats);
            let haystack = small_alphabet(&haystack);
            let a = Automaton::new(&pats).unwrap();
            let b = Automaton::new(&pats).unwrap();
            a.find_all(&haystack) == b.find_all(&haystack)
        }

        fn empty_set_never_matches(haystack: Vec<u8>) -> bool {
            let ac = Automaton::new(Vec::<Vec<u8>>::new()).unwrap();
            ac.find_all(&haystack).is_empty()
        }

        fn agrees_with_aho_corasick(pats: Vec<Vec<u8>>, haystack: Vec<u8>) -> TestResult {
            let mut pats = prepare(pats);
            pats.sort();
            pats.dedup();
            if pats.is_empty() {
                return TestResult::discard();
            }
            let haystack = small_alphabet(&haystack);
            let ours = Automaton::new(&pats).unwrap();
            let theirs = aho_corasick::AhoCorasick::new(&pats).unwrap();

            let mut expected: Vec<(usize, usize)> =
                theirs.find_overlapping_iter(&haystack).map(|m| (m.start(), m.end())).collect();
            let mut found: Vec<(usize, usize)> = ours.find_iter(&haystack).map(|m| (m.start(), m.end())).collect();
            expected.sort();
            found.sort();
            TestResult::from_bool(found == expected)
        }
    }
}
