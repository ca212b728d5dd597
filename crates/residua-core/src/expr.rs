//! The expression algebra (spec.md §3.2, §3.3, §4.B).
//!
//! `Expr` is a closed sum type: every smart constructor (`crate::smooth`)
//! and every derivative (`crate::deriv`) yields a value of one of these
//! variants, never anything else. Compound nodes precompute and store their
//! `match`/`back` generation sets at construction time (the memoization
//! strategy spec.md §5 calls for — "written on first access... invalidated
//! on every derivative step", here realized by the fact that a derivative
//! step always produces a brand new node via a smart constructor, which
//! computes fresh sets rather than reusing stale ones).

use std::rc::Rc;

use crate::gen::{GenMap, GenSet, Generation};
use crate::nonterminal::Nonterminal;

/// One lookahead follower of a [`Expr::Seq`] node: the parallel derivation of
/// the sequence's continuation (`b`) from the point at which the first
/// component exposed lookahead generation `gen` (spec.md §4.D).
#[derive(Clone, Debug)]
pub struct Follower {
    /// The generation key this follower answers to. Followers in a `Seq`'s
    /// `bs` list are kept sorted strictly by this key (spec.md §3.3 inv. 4).
    pub gen: Generation,
    /// The parallel derivation of `b` for this follower.
    pub expr: Box<Expr>,
    /// Renumbers `expr`'s generations into the parent `Seq`'s numbering.
    pub gen_map: GenMap,
    /// The generation at which this follower has itself most recently
    /// matched, if ever (spec.md's `gl`; see DESIGN.md for why this is
    /// `Option` rather than overloading generation `0` as a sentinel).
    pub last_match: Option<Generation>,
}

/// The closed expression algebra (spec.md §3.2).
#[derive(Clone, Debug)]
pub enum Expr {
    /// Matches nothing.
    Fail,
    /// Infinite-loop failure: recursion detected with no progress.
    Inf,
    /// Matches the empty string at generation 0.
    Eps,
    /// Matches the empty string, exposing generation `g`.
    Look(Generation),
    /// Consumes exactly the character `c`.
    Char(char),
    /// Consumes any character in `[lo, hi]` inclusive.
    Range(char, char),
    /// Consumes any character except the end-of-input sentinel.
    Any,
    /// Consumes the literal string `s` (`|s| >= 2`; shorter strings are
    /// normalized away by [`Expr::literal`]).
    Str(Rc<str>),
    /// A nonterminal invocation; always denotes a fresh, undived call to
    /// the referenced rule (see `Nonterminal::fixed_point`).
    Rule(Rc<Nonterminal>),
    /// Negative lookahead.
    Not(Box<Expr>),
    /// Renumbers `e`'s generations via `gen_map`; `gm` is the outer maximum
    /// live generation.
    Map {
        inner: Box<Expr>,
        gen_map: GenMap,
        gm: Generation,
        match_set: GenSet,
        back_set: GenSet,
    },
    /// Ordered choice between `a` and `b`, with per-alternative generation
    /// maps and an outer maximum live generation `gm`.
    Alt {
        a: Box<Expr>,
        b: Box<Expr>,
        a_map: GenMap,
        b_map: GenMap,
        gm: Generation,
        match_set: GenSet,
        back_set: GenSet,
    },
    /// Concatenation, with lookahead followers (spec.md §4.D/§4.E).
    Seq {
        /// First element, currently being consumed.
        a: Box<Expr>,
        /// The gen-zero follower, used when `a` matches at generation 0.
        b: Box<Expr>,
        /// Lookahead followers, one per distinct generation `a` may expose,
        /// strictly sorted by generation key.
        bs: Vec<Follower>,
        /// The match-fail backtrack follower: tracks `b` derived in
        /// parallel from the point `a` matched at generation 0, in case `a`
        /// later continues past that match.
        c: Option<Box<Expr>>,
        /// Gen-map for `c`.
        c_map: GenMap,
        gm: Generation,
        match_set: GenSet,
        back_set: GenSet,
    },
}

/// The variant tag of an [`Expr`], used for case analysis (spec.md §4.B
/// `type(e)`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ExprKind {
    Fail,
    Inf,
    Eps,
    Look,
    Char,
    Range,
    Any,
    Str,
    Rule,
    Not,
    Map,
    Alt,
    Seq,
}

impl Expr {
    /// `type(e)` (spec.md §4.B).
    pub fn type_tag(&self) -> ExprKind {
        match self {
            Expr::Fail => ExprKind::Fail,
            Expr::Inf => ExprKind::Inf,
            Expr::Eps => ExprKind::Eps,
            Expr::Look(_) => ExprKind::Look,
            Expr::Char(_) => ExprKind::Char,
            Expr::Range(_, _) => ExprKind::Range,
            Expr::Any => ExprKind::Any,
            Expr::Str(_) => ExprKind::Str,
            Expr::Rule(_) => ExprKind::Rule,
            Expr::Not(_) => ExprKind::Not,
            Expr::Map { .. } => ExprKind::Map,
            Expr::Alt { .. } => ExprKind::Alt,
            Expr::Seq { .. } => ExprKind::Seq,
        }
    }

    /// Build a literal-string matcher, normalizing short literals: the
    /// empty string is `Eps`, a single character is `Char`, and anything
    /// else is `Str` (spec.md §3.2: `Str(s)` requires `|s| >= 2`).
    pub fn literal(s: &str) -> Expr {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Expr::Eps,
            (Some(c), None) => Expr::Char(c),
            _ => Expr::Str(Rc::from(s)),
        }
    }

    /// `match(e)`: the set of outer generations at which `e` currently
    /// matches the empty remaining input (spec.md §3.3).
    pub fn match_set(&self) -> GenSet {
        match self {
            Expr::Fail | Expr::Inf => GenSet::empty(),
            Expr::Eps => GenSet::single(Generation::ZERO),
            Expr::Look(g) => GenSet::single(*g),
            Expr::Char(_) | Expr::Range(_, _) | Expr::Any | Expr::Str(_) => GenSet::empty(),
            Expr::Rule(r) => rule_match_set(r),
            Expr::Not(_) => GenSet::empty(),
            Expr::Map { match_set, .. }
            | Expr::Alt { match_set, .. }
            | Expr::Seq { match_set, .. } => match_set.clone(),
        }
    }

    /// `back(e)`: the set of outer generations `e` may expose after further
    /// derivative steps (spec.md §3.3).
    pub fn back_set(&self) -> GenSet {
        match self {
            Expr::Fail | Expr::Inf => GenSet::empty(),
            Expr::Eps => GenSet::single(Generation::ZERO),
            Expr::Look(g) => GenSet::single(*g),
            Expr::Char(_) | Expr::Range(_, _) | Expr::Any | Expr::Str(_) => GenSet::empty(),
            Expr::Rule(r) => rule_back_set(r),
            Expr::Not(_) => GenSet::single(Generation::new(1)),
            Expr::Map { back_set, .. } | Expr::Alt { back_set, .. } | Expr::Seq { back_set, .. } => {
                back_set.clone()
            }
        }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Expr::Fail)
    }

    pub fn is_inf(&self) -> bool {
        matches!(self, Expr::Inf)
    }

    /// Either terminal failure variant (spec.md §7: ordinary failure or
    /// unproductive recursion both stop the driver with `false`).
    pub fn is_fail_like(&self) -> bool {
        self.is_fail() || self.is_inf()
    }
}

fn rule_match_set(r: &Nonterminal) -> GenSet {
    if r.fixed_point().is_some_and(|p| p.nullable) {
        GenSet::single(Generation::ZERO)
    } else {
        GenSet::empty()
    }
}

fn rule_back_set(r: &Nonterminal) -> GenSet {
    let Some(pair) = r.fixed_point() else {
        return GenSet::empty();
    };
    let mut s = GenSet::empty();
    if pair.nullable {
        s.insert(Generation::ZERO);
    }
    if pair.exposes_lookahead {
        s.insert(Generation::new(1));
    }
    s
}

/// Structural equality, used by the smart constructors' idempotence checks
/// (spec.md §8 "Applying a smart constructor to an already-smoothed
/// expression returns the same expression"). `Rule` nodes compare by
/// pointer identity — comparing nonterminal bodies structurally would
/// recurse through cyclic grammars.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        use Expr::*;
        match (self, other) {
            (Fail, Fail) | (Inf, Inf) | (Eps, Eps) | (Any, Any) => true,
            (Look(a), Look(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Range(a1, a2), Range(b1, b2)) => a1 == b1 && a2 == b2,
            (Str(a), Str(b)) => a == b,
            (Rule(a), Rule(b)) => Rc::ptr_eq(a, b),
            (Not(a), Not(b)) => a == b,
            (
                Map { inner: ai, gen_map: am, gm: agm, .. },
                Map { inner: bi, gen_map: bm, gm: bgm, .. },
            ) => ai == bi && am == bm && agm == bgm,
            (
                Alt { a: aa, b: ab, a_map: aam, b_map: abm, gm: agm, .. },
                Alt { a: ba, b: bb, a_map: bam, b_map: bbm, gm: bgm, .. },
            ) => aa == ba && ab == bb && aam == bam && abm == bbm && agm == bgm,
            (
                Seq { a: aa, b: ab, bs: abs, c: ac, c_map: acm, gm: agm, .. },
                Seq { a: ba, b: bb, bs: bbs, c: bc, c_map: bcm, gm: bgm, .. },
            ) => {
                aa == ba
                    && ab == bb
                    && acm == bcm
                    && agm == bgm
                    && ac == bc
                    && abs.len() == bbs.len()
                    && abs.iter().zip(bbs.iter()).all(|(x, y)| {
                        x.gen == y.gen
                            && x.expr == y.expr
                            && x.gen_map == y.gen_map
                            && x.last_match == y.last_match
                    })
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_normalizes_short_strings() {
        assert_eq!(Expr::literal(""), Expr::Eps);
        assert_eq!(Expr::literal("a"), Expr::Char('a'));
        assert!(matches!(Expr::literal("ab"), Expr::Str(_)));
    }

    #[test]
    fn primitive_match_back_sets() {
        assert!(Expr::Fail.match_set().is_empty());
        assert!(Expr::Fail.back_set().is_empty());
        assert_eq!(Expr::Eps.match_set(), GenSet::single(Generation::ZERO));
        assert_eq!(Expr::Eps.back_set(), GenSet::single(Generation::ZERO));
        let g = Generation::new(3);
        assert_eq!(Expr::Look(g).match_set(), GenSet::single(g));
        assert_eq!(Expr::Look(g).back_set(), GenSet::single(g));
        assert!(Expr::Char('x').match_set().is_empty());
        assert!(Expr::Any.back_set().is_empty());
    }

    #[test]
    fn not_has_static_depth_one_back_set() {
        let n = Expr::Not(Box::new(Expr::Char('a')));
        assert!(n.match_set().is_empty());
        assert_eq!(n.back_set(), GenSet::single(Generation::new(1)));
    }

    #[test]
    fn rule_sets_come_from_fixed_point_not_recursion() {
        use crate::nonterminal::NullablePair;
        // A deliberately (structurally) left-recursive body: computing its
        // match/back set must not recurse into it.
        let nt = Nonterminal::new("S", Expr::Fail);
        let self_ref = Expr::Rule(Rc::clone(&nt));
        nt.set_body(Expr::Not(Box::new(self_ref)));
        nt.set_fixed_point(NullablePair { nullable: true, exposes_lookahead: false });

        let r = Expr::Rule(nt);
        assert_eq!(r.match_set(), GenSet::single(Generation::ZERO));
    }

    #[test]
    fn fail_and_inf_are_fail_like() {
        assert!(Expr::Fail.is_fail_like());
        assert!(Expr::Inf.is_fail_like());
        assert!(!Expr::Eps.is_fail_like());
    }
}
