//! Fixed-point nullability over the grammar AST (spec.md §4.E).
//!
//! This computes, for every named rule, whether it is nullable (can match
//! the empty string) and whether it exposes a pending lookahead generation,
//! by Kleene iteration over `crate::ast::Matcher` — the same AST the loader
//! consumes, and the same node set `original_source/fixer.cpp`'s visitor
//! computes over (`ast::opt_matcher`/`many_matcher`/etc, not the derived
//! `crate::expr::Expr` algebra, which doesn't have those sugar variants).
//! The loader seeds each `Nonterminal`'s cached fixed point from this
//! table's result before the first derivative is ever taken (spec.md §2:
//! "The nullability fixer runs once over each rule body to seed match/back
//! sets").

use indexmap::IndexMap;

use crate::ast::Matcher;
use crate::nonterminal::NullablePair;

/// Compute the least fixed point of `(nullable, exposes_lookahead)` for
/// every rule in `rules` (spec.md §4.E algorithm):
///
/// 1. Initialize every rule's pair to `(false, false)`.
/// 2. Repeatedly recompute each rule body's pair, using the current cached
///    pair for any `Rule` reference encountered (including references still
///    mid-iteration, per spec.md: "in-progress references contribute the
///    current iteration's value").
/// 3. Terminate when a full pass produces no change.
///
/// Left-recursive rules participate safely: a self- or mutually-recursive
/// `Rule` reference just reads back the *current* iteration's value (bottom
/// `false, false` on the first pass) rather than recursing structurally, so
/// the pass always terminates in a finite number of rounds bounded by the
/// number of rules (each round strictly grows at least one rule's pair
/// under the `(false,false) < (true,false)/(false,true) < (true,true)`
/// partial order, or the pass stops).
pub fn compute(rules: &IndexMap<String, Matcher>) -> IndexMap<String, NullablePair> {
    let mut modes: IndexMap<String, NullablePair> =
        rules.keys().map(|name| (name.clone(), NullablePair::default())).collect();

    loop {
        let mut changed = false;
        for (name, body) in rules {
            let next = eval(body, &modes);
            if next != modes[name] {
                modes.insert(name.clone(), next);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    modes
}

/// One non-iterative evaluation of a matcher's `(nullable, exposes_look)`
/// pair, given the current best-known pairs for every rule name (spec.md
/// §4.E's per-variant table). `crate::loader` reuses this directly (rather
/// than only the whole-grammar [`compute`]) to work out the pair for a
/// synthesized `m*` rule's own body from `m`'s pair.
pub(crate) fn eval(m: &Matcher, modes: &IndexMap<String, NullablePair>) -> NullablePair {
    match m {
        Matcher::Char(_) | Matcher::Range(_) | Matcher::Any => NullablePair::default(),
        Matcher::Str(s) => NullablePair { nullable: s.is_empty(), exposes_lookahead: false },
        Matcher::Empty | Matcher::Action(_) => {
            NullablePair { nullable: true, exposes_lookahead: false }
        }
        Matcher::Fail(_) => NullablePair::default(),
        Matcher::Rule(name) => modes.get(name).copied().unwrap_or_default(),
        Matcher::Look(inner) | Matcher::Not(inner) => {
            // The subexpression's own pair doesn't feed Look/Not's result
            // (fixed at (false, true) regardless), but it must still be
            // evaluated so any rule it references gets pulled into the
            // fixed-point pass.
            let _ = eval(inner, modes);
            NullablePair { nullable: false, exposes_lookahead: true }
        }
        Matcher::Opt(inner) | Matcher::Many(inner) => {
            let p = eval(inner, modes);
            NullablePair { nullable: true, exposes_lookahead: p.exposes_lookahead }
        }
        Matcher::Some(inner) => eval(inner, modes),
        Matcher::Seq(ms) => fold(ms, modes, true, |acc, p| NullablePair {
            nullable: acc.nullable && p.nullable,
            exposes_lookahead: acc.exposes_lookahead && p.exposes_lookahead,
        }),
        Matcher::Alt(ms) => fold(ms, modes, false, |acc, p| NullablePair {
            nullable: acc.nullable || p.nullable,
            exposes_lookahead: acc.exposes_lookahead || p.exposes_lookahead,
        }),
        Matcher::Capture(inner) => eval(inner, modes),
        Matcher::Named(_, inner) => eval(inner, modes),
    }
}

/// Left-fold a non-empty list of sub-matchers' pairs with `combine`; an
/// empty list (malformed input — the loader never produces a zero-element
/// `Seq`/`Alt`) falls back to `empty_nullable`, matching
/// `original_source/fixer.cpp`'s `m.ms.empty()` special case (`mode =
/// {true}`, i.e. nullable with no exposed lookahead).
fn fold(
    ms: &[Matcher],
    modes: &IndexMap<String, NullablePair>,
    empty_nullable: bool,
    combine: impl Fn(NullablePair, NullablePair) -> NullablePair,
) -> NullablePair {
    let mut iter = ms.iter();
    let Some(first) = iter.next() else {
        return NullablePair { nullable: empty_nullable, exposes_lookahead: false };
    };
    let mut acc = eval(first, modes);
    for m in iter {
        acc = combine(acc, eval(m, modes));
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(pairs: &[(&str, Matcher)]) -> IndexMap<String, Matcher> {
        pairs.iter().cloned().map(|(n, m)| (n.to_string(), m)).collect()
    }

    #[test]
    fn primitives() {
        let rs = rules(&[("S", Matcher::Char('a'))]);
        let modes = compute(&rs);
        assert_eq!(modes["S"], NullablePair { nullable: false, exposes_lookahead: false });
    }

    #[test]
    fn empty_and_action_are_nullable() {
        let rs = rules(&[("S", Matcher::Seq(vec![Matcher::Empty, Matcher::Action("x".into())]))]);
        let modes = compute(&rs);
        assert!(modes["S"].nullable);
        assert!(!modes["S"].exposes_lookahead);
    }

    #[test]
    fn look_and_not_expose_lookahead_without_nullable() {
        let rs = rules(&[("S", Matcher::Not(Box::new(Matcher::Char('x'))))]);
        let modes = compute(&rs);
        assert_eq!(modes["S"], NullablePair { nullable: false, exposes_lookahead: true });
    }

    #[test]
    fn opt_and_many_force_nullable_true() {
        let opt = rules(&[("S", Matcher::Opt(Box::new(Matcher::Char('a'))))]);
        assert!(compute(&opt)["S"].nullable);
        let many = rules(&[("S", Matcher::Many(Box::new(Matcher::Char('a'))))]);
        assert!(compute(&many)["S"].nullable);
    }

    #[test]
    fn some_mirrors_subexpression() {
        let rs = rules(&[("S", Matcher::Some(Box::new(Matcher::Char('a'))))]);
        assert!(!compute(&rs)["S"].nullable);
    }

    #[test]
    fn seq_is_conjunction_alt_is_disjunction() {
        let seq = rules(&[(
            "S",
            Matcher::Seq(vec![Matcher::Empty, Matcher::Char('a')]),
        )]);
        assert!(!compute(&seq)["S"].nullable);

        let alt = rules(&[(
            "S",
            Matcher::Alt(vec![Matcher::Empty, Matcher::Char('a')]),
        )]);
        assert!(compute(&alt)["S"].nullable);
    }

    #[test]
    fn left_recursive_rule_reaches_a_fixed_point_without_looping_forever() {
        // N = N '+' '1' / '1'   (spec.md §8 scenario 5)
        let rs = rules(&[(
            "N",
            Matcher::Alt(vec![
                Matcher::Seq(vec![
                    Matcher::Rule("N".into()),
                    Matcher::Char('+'),
                    Matcher::Char('1'),
                ]),
                Matcher::Char('1'),
            ]),
        )]);
        let modes = compute(&rs);
        // The self-referential branch is never nullable (its first element
        // N starts at bottom (false,false) and a Seq needs every element
        // nullable); only the '1' branch feeds the Alt's disjunction, and
        // '1' alone is not nullable.
        assert_eq!(modes["N"], NullablePair { nullable: false, exposes_lookahead: false });
    }

    #[test]
    fn mutually_recursive_rules_converge() {
        // A = B | 'a'; B = A  (both nullable transitively through 'empty'? here neither is)
        let rs = rules(&[
            ("A", Matcher::Alt(vec![Matcher::Rule("B".into()), Matcher::Char('a')])),
            ("B", Matcher::Rule("A".into())),
        ]);
        let modes = compute(&rs);
        assert!(!modes["A"].nullable);
        assert!(!modes["B"].nullable);
    }

    #[test]
    fn rule_ref_to_nullable_rule_propagates() {
        let rs = rules(&[("A", Matcher::Rule("B".into())), ("B", Matcher::Empty)]);
        let modes = compute(&rs);
        assert!(modes["A"].nullable);
        assert!(modes["B"].nullable);
    }
}
