//! The derivative engine (spec.md §4.D).
//!
//! `derive(e, x)` computes `∂x e`, the expression matching exactly the
//! suffixes of `e`'s language that begin with `x`, with `x` stripped.
//! `x = '\0'` is the end-of-input sentinel (spec.md §4.D, §6.3); it cannot
//! appear in real input. Every derivative passes its structural result
//! through the smart constructors of `crate::smooth` to keep results in
//! canonical reduced form (spec.md §4.C). Grounded on
//! `original_source/derivs.cpp`'s per-class `deriv`/`d` methods, restated
//! as a single dispatch function over the tagged `Expr` enum per spec.md §9.

use crate::expr::{Expr, Follower};
use crate::gen::{GenMap, Generation};
use crate::smooth::{mk_alt, mk_map, mk_not, mk_seq, seq_follower_gen_map, seq_sets};

/// The end-of-input sentinel character (spec.md §4.D, §6.3).
pub const EOF: char = '\0';

/// `∂x e` (spec.md §4.D).
pub fn derive(e: &Expr, x: char) -> Expr {
    match e {
        Expr::Fail => Expr::Fail,
        Expr::Inf => Expr::Inf,
        Expr::Look(g) => Expr::Look(*g),
        Expr::Eps => Expr::Fail,
        Expr::Char(c) => {
            if x == *c {
                Expr::Eps
            } else {
                Expr::Fail
            }
        }
        Expr::Range(lo, hi) => {
            if x != EOF && *lo <= x && x <= *hi {
                Expr::Eps
            } else {
                Expr::Fail
            }
        }
        Expr::Any => {
            if x == EOF {
                Expr::Fail
            } else {
                Expr::Eps
            }
        }
        Expr::Str(s) => derive_str(s, x),
        Expr::Rule(r) => derive_rule(r, x),
        Expr::Not(inner) => mk_not(derive(inner, x)),
        Expr::Map { inner, gen_map, gm, .. } => derive_map(inner, gen_map, *gm, x),
        Expr::Alt { a, b, a_map, b_map, gm, .. } => derive_alt(a, b, a_map, b_map, *gm, x),
        Expr::Seq { a, b, bs, c, c_map, gm, .. } => {
            derive_seq(a, b, bs, c.as_deref(), c_map, *gm, x)
        }
    }
}

fn derive_str(s: &std::rc::Rc<str>, x: char) -> Expr {
    let mut chars = s.chars();
    let first = chars.next().expect("Str must be non-empty (|s| >= 2 invariant)");
    if first != x {
        return Expr::Fail;
    }
    let rest: String = chars.collect();
    Expr::literal(&rest)
}

/// Every `Rule` node is, by invariant, a fresh call to the referenced
/// nonterminal (`crate::expr` module doc). Its derivative clones the cell's
/// body and derives the clone; the cell itself is never written back to
/// here. Two independent `Rule(r)` occurrences can be live in the same
/// expression DAG at once (e.g. `S = A A`) and must each run their own
/// derivative chain from `A`'s original definition — mutating the shared
/// cell mid-derivation would let one occurrence's progress leak into the
/// other's. `in_deriv` still catches left recursion: a nested, same-step
/// reappearance of the same `Rule(r)` before any input is consumed finds
/// the flag already set and derives to `Inf`.
fn derive_rule(r: &std::rc::Rc<crate::nonterminal::Nonterminal>, x: char) -> Expr {
    match r.with_deriv_guard(|| derive(&r.body(), x)) {
        None => Expr::Inf,
        Some(derived) => derived,
    }
}

/// Whether `new_back_max` introduces a generation beyond what `gen_map`
/// already covers, and if so extend `gen_map`/`gm` with the fresh mapping
/// spec.md §4.D's `Map` row describes. Shared by `Map`, `Alt`, and `Seq`'s
/// derivatives. `gen_map`'s domain already covers the pre-derivative back
/// set by the smart constructors' precondition (spec.md §7), so growth is
/// judged against `gen_map.max_key()`, not the pre-derivative back set
/// directly — a generation that was already in `gen_map`'s domain (e.g. the
/// identity entry for generation 0) needs no fresh mapping even the first
/// time it actually becomes live.
fn extend_for_growth(
    new_back_max: Option<Generation>,
    gen_map: &GenMap,
    gm: Generation,
) -> (GenMap, Generation) {
    let grew = match new_back_max {
        Some(n) => gen_map.max_key().is_none_or(|mk| n > mk),
        None => false,
    };
    if !grew {
        return (gen_map.clone(), gm);
    }
    let new_key = new_back_max.expect("grew implies new_back_max is Some");
    let new_value = gm.succ();
    (gen_map.appended(new_key, new_value), new_value)
}

fn derive_map(inner: &Expr, eg: &GenMap, gm: Generation, x: char) -> Expr {
    let inner2 = derive(inner, x);
    let (eg2, gm2) = extend_for_growth(inner2.back_set().max(), eg, gm);
    mk_map(inner2, eg2, gm2)
}

fn derive_alt(a: &Expr, b: &Expr, ag: &GenMap, bg: &GenMap, gm: Generation, x: char) -> Expr {
    let a2 = derive(a, x);

    if a2.is_fail() {
        let b2 = derive(b, x);
        let (bg2, gm2) = extend_for_growth(b2.back_set().max(), bg, gm);
        return mk_map(b2, bg2, gm2);
    }
    if a2.is_inf() {
        return Expr::Inf;
    }

    let (ag2, gm2) = extend_for_growth(a2.back_set().max(), ag, gm);

    if !a2.match_set().is_empty() {
        return mk_map(a2, ag2, gm2);
    }

    let b2 = derive(b, x);
    if b2.is_fail() {
        return mk_map(a2, ag2, gm2);
    }
    let (bg2, gm3) = extend_for_growth(b2.back_set().max(), bg, gm2);
    let gm_final = gm2.max(gm3);
    mk_alt(a2, b2, ag2, bg2, gm_final)
}

#[allow(clippy::too_many_arguments)]
fn derive_seq(
    a: &Expr,
    b: &Expr,
    bs: &[Follower],
    c: Option<&Expr>,
    c_map: &GenMap,
    gm: Generation,
    x: char,
) -> Expr {
    let a2 = derive(a, x);

    match &a2 {
        Expr::Eps => {
            // `a` has just matched by consuming `x`; `b` hasn't seen `x` yet.
            b.clone()
        }
        Expr::Look(g) if *g == Generation::ZERO => {
            // Generation 0 is the primary live path, tracked via `b`/`c`
            // directly rather than through `bs` (which only tracks the
            // *other* generations `a` may expose).
            b.clone()
        }
        Expr::Look(g) => derive_seq_look(*g, bs, gm, x),
        Expr::Fail => match c {
            Some(c_expr) => c_expr.clone(),
            None => Expr::Fail,
        },
        Expr::Inf => Expr::Inf,
        _ => derive_seq_continue(a2, b, bs, c, c_map, gm, x),
    }
}

fn derive_seq_look(g: Generation, bs: &[Follower], gm: Generation, x: char) -> Expr {
    let Some(f) = bs.iter().find(|f| f.gen == g) else {
        // No tracked follower for a generation `a` claims to expose: the
        // static-depth invariant (spec.md §3.3 inv. 3) means this shouldn't
        // arise from a well-formed grammar; fail closed rather than panic.
        return Expr::Fail;
    };
    let f2 = derive(&f.expr, x);
    if f2.is_fail() {
        return match f.last_match {
            Some(gl) => Expr::Look(gl),
            None => Expr::Fail,
        };
    }
    // `f2` may expose a generation beyond what `f.gen_map` covered at the
    // last step (the same growth `derive_map` extends for) — e.g. `f.expr`
    // is itself a `Seq` whose own lookahead hasn't resolved yet.
    let (gen_map, gm) = extend_for_growth(f2.back_set().max(), &f.gen_map, gm);
    match f.last_match {
        Some(gl) if !f2.match_set().contains(Generation::ZERO) => {
            let gl_map = GenMap::empty().appended(gl, gl);
            mk_alt(f2, Expr::Look(gl), gen_map, gl_map, gm)
        }
        _ => mk_map(f2, gen_map, gm),
    }
}

fn derive_seq_continue(
    a2: Expr,
    b: &Expr,
    bs: &[Follower],
    c: Option<&Expr>,
    c_map: &GenMap,
    gm: Generation,
    x: char,
) -> Expr {
    let match_a2 = a2.match_set();
    let back_a2 = a2.back_set();

    let mut gm = back_a2.max().unwrap_or(gm).max(gm);

    let (c2, c_map2) = if match_a2.contains(Generation::ZERO) {
        match c {
            Some(c_expr) => {
                let derived = derive(c_expr, x);
                let (map, gm2) = extend_for_growth(derived.back_set().max(), c_map, gm);
                gm = gm2;
                (Some(Box::new(derived)), map)
            }
            None => {
                // `c` springs into existence this step: build its gen_map
                // fresh from the undriven `b`, the same way `build_seq` does.
                let (map, gm2) = seq_follower_gen_map(Generation::ZERO, b, gm);
                gm = gm2;
                (Some(Box::new(b.clone())), map)
            }
        }
    } else {
        (None, c_map.clone())
    };

    let mut bs2: Vec<Follower> = Vec::new();
    for f in bs {
        if back_a2.contains(f.gen) {
            let fe2 = derive(&f.expr, x);
            let gl2 = if fe2.match_set().contains(Generation::ZERO) {
                Some(f.gen)
            } else {
                f.last_match
            };
            // `fe2` may expose a generation `f.gen_map` hasn't covered yet,
            // exactly the growth `derive_map`/`derive_alt` extend for.
            let (gen_map, gm2) = extend_for_growth(fe2.back_set().max(), &f.gen_map, gm);
            gm = gm2;
            bs2.push(Follower {
                gen: f.gen,
                expr: Box::new(fe2),
                gen_map,
                last_match: gl2,
            });
        }
    }
    for g in back_a2.iter().filter(|g| *g != Generation::ZERO) {
        if !bs2.iter().any(|f| f.gen == g) {
            let (gen_map, gm2) = seq_follower_gen_map(g, b, gm);
            gm = gm2;
            bs2.push(Follower {
                gen: g,
                expr: Box::new(b.clone()),
                gen_map,
                last_match: None,
            });
        }
    }
    bs2.sort_by_key(|f| f.gen);

    let (match_set, back_set) = seq_sets(&a2, c2.as_deref(), &c_map2, &bs2);

    Expr::Seq {
        a: Box::new(a2),
        b: Box::new(b.clone()),
        bs: bs2,
        c: c2,
        c_map: c_map2,
        gm,
        match_set,
        back_set,
    }
}
