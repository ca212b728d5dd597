//! Backtrack generations and the sets/maps built on top of them.
//!
//! A [`Generation`] tags a distinct lookahead context introduced during
//! derivation: generation `0` is the straight-path context; higher numbers
//! mark deferred contexts opened by a nested lookahead assertion that hasn't
//! resolved yet. [`GenSet`] is the set of generations an expression is live
//! in; [`GenMap`] renumbers an inner expression's generations into its
//! parent's numbering scheme across a derivative step.

use std::cmp::Ordering;

/// A backtrack generation tag.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Generation(u32);

impl Generation {
    pub const ZERO: Generation = Generation(0);

    #[inline]
    pub const fn new(n: u32) -> Self {
        Generation(n)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn succ(self) -> Generation {
        Generation(self.0 + 1)
    }
}

impl From<u32> for Generation {
    fn from(n: u32) -> Self {
        Generation(n)
    }
}

/// A finite, strictly ordered set of generations.
///
/// Invariant: the backing vector is always sorted and deduplicated.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct GenSet(Vec<Generation>);

impl GenSet {
    pub fn empty() -> Self {
        GenSet(Vec::new())
    }

    pub fn single(g: Generation) -> Self {
        GenSet(vec![g])
    }

    pub fn from_iter(it: impl IntoIterator<Item = Generation>) -> Self {
        let mut v: Vec<Generation> = it.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        GenSet(v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, g: Generation) -> bool {
        self.0.binary_search(&g).is_ok()
    }

    /// Insert `g`, returning whether it was newly added.
    pub fn insert(&mut self, g: Generation) -> bool {
        match self.0.binary_search(&g) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, g);
                true
            }
        }
    }

    pub fn union(&self, other: &GenSet) -> GenSet {
        let mut v = self.0.clone();
        v.extend(other.0.iter().copied());
        v.sort_unstable();
        v.dedup();
        GenSet(v)
    }

    pub fn min(&self) -> Option<Generation> {
        self.0.first().copied()
    }

    pub fn max(&self) -> Option<Generation> {
        self.0.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Generation> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<Generation> for GenSet {
    fn from_iter<T: IntoIterator<Item = Generation>>(iter: T) -> Self {
        GenSet::from_iter(iter)
    }
}

/// A strictly monotonic partial function from an inner generation space to
/// an outer one.
///
/// Invariant: the backing vector of `(key, value)` pairs is sorted by key,
/// and both keys and values are strictly increasing as the vector is walked
/// in order (so it is also sorted, and injective, by value).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GenMap(Vec<(Generation, Generation)>);

impl GenMap {
    /// The empty map (domain = {}).
    pub fn empty() -> Self {
        GenMap(Vec::new())
    }

    /// The identity map over `0..=max` (inclusive).
    pub fn identity(max: Generation) -> Self {
        GenMap((0..=max.as_u32()).map(|n| (Generation(n), Generation(n))).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `f(g)`. Panics if `g` is not in the domain of `f` — callers are
    /// expected to have checked `back(e) \subseteq dom(f)` beforehand, per
    /// spec.md §4.A.
    pub fn apply(&self, g: Generation) -> Generation {
        match self.0.binary_search_by_key(&g, |&(k, _)| k) {
            Ok(i) => self.0[i].1,
            Err(_) => panic!("generation {g:?} not in domain of generation map"),
        }
    }

    pub fn try_apply(&self, g: Generation) -> Option<Generation> {
        self.0
            .binary_search_by_key(&g, |&(k, _)| k)
            .ok()
            .map(|i| self.0[i].1)
    }

    /// The image of `s` under `f`, i.e. `{ f(g) | g in s }`. O(|s|).
    pub fn apply_set(&self, s: &GenSet) -> GenSet {
        GenSet::from_iter(s.iter().map(|g| self.apply(g)))
    }

    /// `compose(f, g) = \x. f(g(x))`. Requires `range(g) subseteq dom(f)`.
    pub fn compose(&self, inner: &GenMap) -> GenMap {
        GenMap(
            inner
                .0
                .iter()
                .map(|&(k, v)| (k, self.apply(v)))
                .collect(),
        )
    }

    /// Extend with one new mapping `(k, v)`, strictly larger than every key
    /// and value currently present.
    pub fn append(&mut self, k: Generation, v: Generation) {
        if let Some(&(mk, mv)) = self.0.last() {
            debug_assert!(k > mk, "append key must exceed max-key(f)");
            debug_assert!(v > mv, "append value must exceed max-value(f)");
        }
        self.0.push((k, v));
    }

    /// A copy of `self` with one new mapping appended.
    pub fn appended(&self, k: Generation, v: Generation) -> GenMap {
        let mut out = self.clone();
        out.append(k, v);
        out
    }

    pub fn max(&self) -> Option<Generation> {
        self.0.last().map(|&(_, v)| v)
    }

    pub fn max_key(&self) -> Option<Generation> {
        self.0.last().map(|&(k, _)| k)
    }

    pub fn min(&self) -> Option<Generation> {
        self.0.first().map(|&(_, v)| v)
    }

    /// Whether this map is the identity over `0..=max` inclusive.
    pub fn is_identity_over(&self, max: Generation) -> bool {
        self.0.len() as u32 == max.as_u32() + 1
            && self.0.iter().all(|&(k, v)| k == v)
            && self
                .0
                .iter()
                .enumerate()
                .all(|(i, &(k, _))| k.as_u32() == i as u32)
    }
}

impl PartialOrd for GenMap {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            Some(Ordering::Equal)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(n: u32) -> Generation {
        Generation::new(n)
    }

    #[test]
    fn genset_dedups_and_sorts() {
        let s = GenSet::from_iter([g(3), g(1), g(1), g(2)]);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![g(1), g(2), g(3)]);
        assert_eq!(s.min(), Some(g(1)));
        assert_eq!(s.max(), Some(g(3)));
    }

    #[test]
    fn genset_insert_reports_novelty() {
        let mut s = GenSet::empty();
        assert!(s.insert(g(2)));
        assert!(!s.insert(g(2)));
        assert!(s.insert(g(1)));
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![g(1), g(2)]);
    }

    #[test]
    fn genset_union_dedups() {
        let a = GenSet::from_iter([g(1), g(2)]);
        let b = GenSet::from_iter([g(2), g(3)]);
        assert_eq!(a.union(&b).iter().collect::<Vec<_>>(), vec![g(1), g(2), g(3)]);
    }

    #[test]
    fn genmap_apply_and_apply_set() {
        let mut m = GenMap::empty();
        m.append(g(0), g(5));
        m.append(g(1), g(7));
        assert_eq!(m.apply(g(0)), g(5));
        assert_eq!(m.apply(g(1)), g(7));
        let s = GenSet::from_iter([g(0), g(1)]);
        assert_eq!(m.apply_set(&s), GenSet::from_iter([g(5), g(7)]));
    }

    #[test]
    #[should_panic]
    fn genmap_apply_outside_domain_panics() {
        let m = GenMap::empty();
        m.apply(g(0));
    }

    #[test]
    fn genmap_compose() {
        // inner: 0 -> 1; outer: 1 -> 9
        let mut inner = GenMap::empty();
        inner.append(g(0), g(1));
        let mut outer = GenMap::empty();
        outer.append(g(1), g(9));
        let composed = outer.compose(&inner);
        assert_eq!(composed.apply(g(0)), g(9));
    }

    #[test]
    fn genmap_identity_detection() {
        let id = GenMap::identity(g(2));
        assert!(id.is_identity_over(g(2)));
        assert!(!id.is_identity_over(g(1)));

        let mut shifted = GenMap::empty();
        shifted.append(g(0), g(1));
        shifted.append(g(1), g(2));
        assert!(!shifted.is_identity_over(g(1)));
    }

    #[test]
    fn genmap_append_requires_strict_growth() {
        let mut m = GenMap::empty();
        m.append(g(0), g(0));
        m.append(g(1), g(1));
        assert_eq!(m.max_key(), Some(g(1)));
        assert_eq!(m.max(), Some(g(1)));
    }
}
