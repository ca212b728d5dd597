//! Smart constructors and smoothing rules (spec.md §4.C).
//!
//! These are the normalization rules applied both at initial construction
//! (via [`crate::loader`]) and after every derivative step (`crate::deriv`):
//! together they keep expressions in canonical reduced form and guarantee
//! termination of derivation on bounded inputs. Grounded on
//! `original_source/norm.hpp` (the "normalizer" visitor), restated as plain
//! functions per spec.md §9 ("pass an explicit normalizer context argument"
//! rather than reach for the original's process-global singleton — there is
//! no such singleton here at all, since none of these rules need shared
//! state beyond their arguments).

use crate::expr::{Expr, Follower};
use crate::gen::{GenMap, GenSet, Generation};

/// `Not(e)` (spec.md §4.C).
pub fn mk_not(e: Expr) -> Expr {
    if e.is_fail() {
        return Expr::Look(Generation::new(1));
    }
    if e.is_inf() {
        return Expr::Inf;
    }
    if !e.match_set().is_empty() {
        return Expr::Fail;
    }
    Expr::Not(Box::new(e))
}

/// `Map(e, eg, gm)` (spec.md §4.C). Preconditions (debug-checked, spec.md
/// §7): `eg` non-empty, `max(back(e)) <= max_key(eg)`, `max(eg) <= gm`.
pub fn mk_map(e: Expr, eg: GenMap, gm: Generation) -> Expr {
    debug_assert!(!eg.is_empty(), "mk_map requires a non-empty generation map");
    debug_assert!(
        e.back_set().max().is_none_or(|m| eg.max_key().is_some_and(|mk| m <= mk)),
        "mk_map requires max(back(e)) <= max_key(eg)"
    );
    debug_assert!(
        eg.max().is_none_or(|m| m <= gm),
        "mk_map requires max(eg) <= gm"
    );

    match &e {
        Expr::Eps => return Expr::Look(eg.apply(Generation::ZERO)),
        Expr::Look(g) => return Expr::Look(eg.apply(*g)),
        Expr::Fail | Expr::Inf => return e,
        _ => {}
    }
    if eg.is_identity_over(gm) {
        return e;
    }
    let match_set = eg.apply_set(&e.match_set());
    let back_set = eg.apply_set(&e.back_set());
    Expr::Map {
        inner: Box::new(e),
        gen_map: eg,
        gm,
        match_set,
        back_set,
    }
}

/// `Alt(a, b, ag, bg, gm)` (spec.md §4.C).
pub fn mk_alt(a: Expr, b: Expr, ag: GenMap, bg: GenMap, gm: Generation) -> Expr {
    if a.is_fail() {
        return mk_map(b, bg, gm);
    }
    if a.is_inf() {
        return Expr::Inf;
    }
    if b.is_fail() || !a.match_set().is_empty() {
        return mk_map(a, ag, gm);
    }
    let match_set = ag.apply_set(&a.match_set()).union(&bg.apply_set(&b.match_set()));
    let back_set = ag.apply_set(&a.back_set()).union(&bg.apply_set(&b.back_set()));
    Expr::Alt {
        a: Box::new(a),
        b: Box::new(b),
        a_map: ag,
        b_map: bg,
        gm,
        match_set,
        back_set,
    }
}

/// `Seq(a, b)` (spec.md §4.C): the top-level sequencing smart constructor,
/// used both by the loader and wherever a fresh two-element sequence is
/// composed during derivation.
pub fn mk_seq(a: Expr, b: Expr) -> Expr {
    if b.is_fail() {
        return Expr::Fail;
    }
    if matches!(b, Expr::Eps) {
        return a;
    }
    if matches!(a, Expr::Eps | Expr::Look(_)) {
        return b;
    }
    if a.is_fail() || a.is_inf() {
        return a;
    }
    build_seq(a, b)
}

/// Build the gen-map for one clone of `b` held by a `Seq`'s bookkeeping —
/// either a lookahead follower tagged `tag`, or the match-fail backtrack
/// follower `c` (tagged generation 0). Inner generation 0 in `b`'s own
/// numbering always maps to `tag`, since that's what "this follower/`c`
/// matched" means from the `Seq`'s point of view; any other generation `b`
/// itself already exposes (e.g. `b` starting with its own `Not`) gets a
/// fresh outer generation above `gm`, the same growth `extend_for_growth`
/// (`crate::deriv`) performs for `Map`/`Alt` — except here it runs over
/// `b`'s *current* back-set rather than waiting for a derivative step to
/// reveal it, since `b` can already carry a non-trivial back-set the moment
/// it's cloned into a follower.
pub(crate) fn seq_follower_gen_map(tag: Generation, b: &Expr, mut gm: Generation) -> (GenMap, Generation) {
    let mut map = GenMap::empty();
    map.append(Generation::ZERO, tag);
    for h in b.back_set().iter().filter(|h| *h != Generation::ZERO) {
        gm = gm.succ();
        map.append(h, gm);
    }
    (map, gm)
}

/// Build a fresh `Seq` node with its lookahead followers and match-fail
/// backtrack follower precomputed from `a`'s current match/back sets
/// (spec.md §4.D "Initial construction from `Seq(a,b)`").
///
/// Also used by `crate::deriv` to rebuild a `Seq` node mid-derivation when a
/// newly-derived `a'` exposes a lookahead generation that has no existing
/// follower yet.
pub fn build_seq(a: Expr, b: Expr) -> Expr {
    let match_a = a.match_set();
    let back_a = a.back_set();

    let mut gm = back_a.max().unwrap_or(Generation::ZERO);

    let c = if match_a.contains(Generation::ZERO) {
        Some(Box::new(b.clone()))
    } else {
        None
    };
    let c_map = if c.is_some() {
        let (map, gm2) = seq_follower_gen_map(Generation::ZERO, &b, gm);
        gm = gm2;
        map
    } else {
        GenMap::empty()
    };

    let mut bs: Vec<Follower> = Vec::new();
    for g in back_a.iter().filter(|g| *g != Generation::ZERO) {
        let (gen_map, gm2) = seq_follower_gen_map(g, &b, gm);
        gm = gm2;
        bs.push(Follower {
            gen: g,
            expr: Box::new(b.clone()),
            gen_map,
            last_match: None,
        });
    }
    bs.sort_by_key(|f| f.gen);

    let (match_set, back_set) = seq_sets(&a, c.as_deref(), &c_map, &bs);

    Expr::Seq {
        a: Box::new(a),
        b: Box::new(b),
        bs,
        c,
        c_map,
        gm,
        match_set,
        back_set,
    }
}

/// `match`/`back` for a `Seq`, recomputed from its parts (spec.md §4.D,
/// "match and back for Seq"). Shared by [`build_seq`] and `crate::deriv`'s
/// reconstruction of `Seq` after a derivative step.
pub fn seq_sets(a: &Expr, c: Option<&Expr>, c_map: &GenMap, bs: &[Follower]) -> (GenSet, GenSet) {
    let match_a = a.match_set();
    let back_a = a.back_set();

    let mut m = GenSet::empty();
    let mut bk = GenSet::empty();

    if let Some(c) = c {
        m = m.union(&c_map.apply_set(&c.match_set()));
    }
    if back_a.contains(Generation::ZERO) {
        bk.insert(Generation::ZERO);
    }

    for f in bs {
        bk = bk.union(&f.gen_map.apply_set(&f.expr.back_set()));
        if let Some(gl) = f.last_match {
            bk.insert(gl);
        }
        if match_a.contains(f.gen) {
            m = m.union(&f.gen_map.apply_set(&f.expr.match_set()));
            if let Some(gl) = f.last_match {
                m.insert(gl);
            }
        }
    }

    (m, bk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_fail_becomes_look_one() {
        assert_eq!(mk_not(Expr::Fail), Expr::Look(Generation::new(1)));
    }

    #[test]
    fn not_inf_stays_inf() {
        assert!(mk_not(Expr::Inf).is_inf());
    }

    #[test]
    fn not_of_matching_expr_becomes_fail() {
        assert_eq!(mk_not(Expr::Eps), Expr::Fail);
    }

    #[test]
    fn not_of_nonmatching_expr_wraps() {
        let n = mk_not(Expr::Char('a'));
        assert!(matches!(n, Expr::Not(_)));
    }

    #[test]
    fn not_is_idempotent_on_smoothed_input() {
        let n = mk_not(Expr::Char('a'));
        let n2 = mk_not(match &n {
            Expr::Not(inner) => (**inner).clone(),
            _ => unreachable!(),
        });
        assert_eq!(n, n2);
    }

    #[test]
    fn map_of_eps_becomes_look() {
        let mut eg = GenMap::empty();
        eg.append(Generation::ZERO, Generation::new(5));
        let m = mk_map(Expr::Eps, eg, Generation::new(5));
        assert_eq!(m, Expr::Look(Generation::new(5)));
    }

    #[test]
    fn map_of_look_renumbers() {
        let mut eg = GenMap::empty();
        eg.append(Generation::new(2), Generation::new(9));
        let m = mk_map(Expr::Look(Generation::new(2)), eg, Generation::new(9));
        assert_eq!(m, Expr::Look(Generation::new(9)));
    }

    #[test]
    fn map_of_fail_or_inf_passes_through() {
        let eg = GenMap::identity(Generation::ZERO);
        assert_eq!(mk_map(Expr::Fail, eg.clone(), Generation::ZERO), Expr::Fail);
        assert!(mk_map(Expr::Inf, eg, Generation::ZERO).is_inf());
    }

    #[test]
    fn map_with_identity_gen_map_is_noop() {
        let eg = GenMap::identity(Generation::ZERO);
        let e = mk_map(Expr::Char('a'), eg, Generation::ZERO);
        assert_eq!(e, Expr::Char('a'));
    }

    #[test]
    fn map_with_nonidentity_wraps() {
        let mut eg = GenMap::identity(Generation::new(1));
        eg = {
            // shift generation 1 up to 2
            let mut v = GenMap::empty();
            v.append(Generation::ZERO, Generation::ZERO);
            v.append(Generation::new(1), Generation::new(2));
            v
        };
        let e = mk_map(Expr::Char('a'), eg, Generation::new(2));
        assert!(matches!(e, Expr::Map { .. }));
    }

    #[test]
    fn alt_folds_away_failed_first_alternative() {
        let gm0 = Generation::ZERO;
        let e = mk_alt(
            Expr::Fail,
            Expr::Char('b'),
            GenMap::identity(gm0),
            GenMap::identity(gm0),
            gm0,
        );
        assert_eq!(e, Expr::Char('b'));
    }

    #[test]
    fn alt_commits_to_matching_first_alternative() {
        let gm0 = Generation::ZERO;
        let e = mk_alt(
            Expr::Eps,
            Expr::Char('b'),
            GenMap::identity(gm0),
            GenMap::identity(gm0),
            gm0,
        );
        assert_eq!(e, Expr::Look(Generation::ZERO));
    }

    #[test]
    fn alt_with_inf_first_alternative_propagates() {
        let gm0 = Generation::ZERO;
        let e = mk_alt(
            Expr::Inf,
            Expr::Char('b'),
            GenMap::identity(gm0),
            GenMap::identity(gm0),
            gm0,
        );
        assert!(e.is_inf());
    }

    #[test]
    fn alt_keeps_both_alternatives_when_undecided() {
        let gm0 = Generation::ZERO;
        let e = mk_alt(
            Expr::Char('a'),
            Expr::Char('b'),
            GenMap::identity(gm0),
            GenMap::identity(gm0),
            gm0,
        );
        assert!(matches!(e, Expr::Alt { .. }));
    }

    #[test]
    fn seq_of_eps_follower_collapses_to_first() {
        assert_eq!(mk_seq(Expr::Char('a'), Expr::Eps), Expr::Char('a'));
    }

    #[test]
    fn seq_with_failing_follower_is_fail() {
        assert_eq!(mk_seq(Expr::Char('a'), Expr::Fail), Expr::Fail);
    }

    #[test]
    fn seq_starting_with_eps_collapses_to_follower() {
        assert_eq!(mk_seq(Expr::Eps, Expr::Char('b')), Expr::Char('b'));
    }

    #[test]
    fn seq_starting_with_look_collapses_to_follower() {
        assert_eq!(mk_seq(Expr::Look(Generation::ZERO), Expr::Char('b')), Expr::Char('b'));
    }

    #[test]
    fn seq_starting_with_fail_or_inf_short_circuits() {
        assert_eq!(mk_seq(Expr::Fail, Expr::Char('b')), Expr::Fail);
        assert!(mk_seq(Expr::Inf, Expr::Char('b')).is_inf());
    }

    #[test]
    fn seq_of_two_unresolved_matchers_builds_a_seq_node() {
        let e = mk_seq(Expr::Char('a'), Expr::Char('b'));
        assert!(matches!(e, Expr::Seq { .. }));
        assert!(e.match_set().is_empty());
        assert!(e.back_set().is_empty());
    }

    #[test]
    fn seq_with_lookahead_first_element_gets_a_follower() {
        let e = mk_seq(mk_not(Expr::Char('x')), Expr::Char('b'));
        match &e {
            Expr::Seq { bs, c, .. } => {
                assert_eq!(bs.len(), 1);
                assert_eq!(bs[0].gen, Generation::new(1));
                assert!(c.is_none());
            }
            _ => panic!("expected Seq, got {e:?}"),
        }
        // The follower's own continuation (`Char('b')`) hasn't exposed any
        // generation yet and never matched, so the Seq's back-set stays
        // empty until `a`'s lookahead actually resolves (spec.md §4.D,
        // "match and back for Seq": back comes from the followers' own
        // back-sets and `gl`, not from `back(a)` directly).
        assert!(e.back_set().is_empty());
    }

    #[test]
    fn seq_with_lookahead_in_both_positions_does_not_panic() {
        // !P !Q: `b` is itself a pending lookahead, so the follower built for
        // `a`'s own exposed generation must map `b`'s back-set wide enough
        // to cover it instead of assuming `b`'s back-set is empty.
        let e = mk_seq(mk_not(Expr::Char('p')), mk_not(Expr::Char('q')));
        match &e {
            Expr::Seq { bs, .. } => {
                assert_eq!(bs.len(), 1);
                let f = &bs[0];
                // The follower's gen_map must cover every generation `b` (the
                // cloned !Q) can expose, not just generation 0.
                for h in f.expr.back_set().iter() {
                    f.gen_map.apply(h); // must not panic
                }
            }
            _ => panic!("expected Seq, got {e:?}"),
        }
    }
}
