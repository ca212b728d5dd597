//! Builds the initial expression DAG from a grammar AST (spec.md §2
//! "loader").
//!
//! Grounded on `original_source/visitors/dlf-loader.hpp` (the visitor that
//! turns `ast::matcher` nodes into `derivs::expr` nodes) and
//! `original_source/parser.hpp` for the undefined-rule validation this
//! crate performs up front (SPEC_FULL.md §4 item 2) rather than discovering
//! it only as a runtime `Inf`.
//!
//! `m?`/`m*`/`m+` are sugar: spec.md §3.2's closed expression algebra has no
//! `Opt`/`Many`/`Some` variant, so this loader desugars them into the
//! primitives that *are* in the algebra. `m?` is `m / ε` (`initial_alt`).
//! `m*` needs genuine recursion — `m* = (m m*) / ε` — so it gets its own
//! synthesized, self-referential [`Nonterminal`]; `m+` is just `m m*`,
//! reusing that same synthesized rule.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{Grammar, Matcher};
use crate::error::GrammarError;
use crate::expr::Expr;
use crate::gen::{GenMap, Generation};
use crate::nonterminal::{Nonterminal, NullablePair};
use crate::smooth::{mk_alt, mk_seq};
use crate::{nullable, smooth};

/// A loaded grammar: every named rule's [`Nonterminal`] cell, fully wired
/// up (bodies desugared into `Expr`, fixed points seeded), keyed by name in
/// definition order.
pub type NonterminalTable = IndexMap<String, Rc<Nonterminal>>;

/// Build the initial expression DAG for every rule in `grammar` (spec.md
/// §2's loader stage, plus SPEC_FULL.md §4 item 2's construction-time
/// validation).
///
/// Errors if the grammar has no rules, or if any rule body references a
/// nonterminal that isn't defined anywhere in `grammar`.
pub fn load(grammar: &Grammar) -> Result<NonterminalTable, GrammarError> {
    if grammar.is_empty() {
        return Err(GrammarError::Empty);
    }
    validate(grammar)?;

    let modes = nullable::compute(&grammar.rules);

    // Pass 1: placeholder cells for every named rule, so `Rule(name)`
    // references anywhere in the grammar resolve regardless of definition
    // order (mutual/forward recursion).
    let mut table: NonterminalTable = IndexMap::new();
    for name in grammar.rules.keys() {
        table.insert(name.clone(), Nonterminal::new(name.clone(), Expr::Fail));
    }
    for (name, nt) in &table {
        nt.set_fixed_point(modes[name]);
    }

    // Pass 2: desugar each rule body and install it.
    let mut synth = 0u32;
    for (name, body) in &grammar.rules {
        let expr = desugar(body, &table, &modes, &mut synth);
        table[name].set_body(expr);
    }

    Ok(table)
}

fn validate(grammar: &Grammar) -> Result<(), GrammarError> {
    let mut refs = Vec::new();
    for body in grammar.rules.values() {
        body.referenced_rules(&mut refs);
    }
    for rule in refs {
        if !grammar.rules.contains_key(&rule) {
            return Err(GrammarError::UndefinedRule { rule });
        }
    }
    Ok(())
}

fn desugar(
    m: &Matcher,
    table: &NonterminalTable,
    modes: &IndexMap<String, NullablePair>,
    synth: &mut u32,
) -> Expr {
    match m {
        Matcher::Char(c) => Expr::Char(*c),
        Matcher::Str(s) => Expr::literal(s),
        Matcher::Range(ranges) => desugar_range(ranges),
        Matcher::Any => Expr::Any,
        Matcher::Empty => Expr::Eps,
        Matcher::Action(_) => Expr::Eps,
        Matcher::Fail(_) => Expr::Fail,
        Matcher::Rule(name) => {
            Expr::Rule(Rc::clone(table.get(name).expect("validated by `validate`")))
        }
        Matcher::Opt(inner) => initial_alt(desugar(inner, table, modes, synth), Expr::Eps),
        Matcher::Many(inner) => desugar_many(inner, table, modes, synth),
        Matcher::Some(inner) => {
            let head = desugar(inner, table, modes, synth);
            let tail = desugar_many(inner, table, modes, synth);
            mk_seq(head, tail)
        }
        Matcher::Seq(ms) => ms
            .iter()
            .fold(Expr::Eps, |acc, next| mk_seq(acc, desugar(next, table, modes, synth))),
        Matcher::Alt(ms) => ms
            .iter()
            .fold(Expr::Fail, |acc, next| initial_alt(acc, desugar(next, table, modes, synth))),
        Matcher::Look(inner) => {
            smooth::mk_not(smooth::mk_not(desugar(inner, table, modes, synth)))
        }
        Matcher::Not(inner) => smooth::mk_not(desugar(inner, table, modes, synth)),
        Matcher::Capture(inner) => desugar(inner, table, modes, synth),
        Matcher::Named(_, inner) => desugar(inner, table, modes, synth),
    }
}

/// `m* = (m m*) / ε`: a fresh, self-referential [`Nonterminal`]. Always
/// nullable; exposes lookahead iff `m` itself does (spec.md §4.E's `Opt`,
/// `Many` row: "force `(true, second)`").
fn desugar_many(
    inner: &Matcher,
    table: &NonterminalTable,
    modes: &IndexMap<String, NullablePair>,
    synth: &mut u32,
) -> Expr {
    *synth += 1;
    let nt = Nonterminal::new(format!("<many#{synth}>"), Expr::Fail);
    let inner_pair = nullable::eval(inner, modes);
    nt.set_fixed_point(NullablePair { nullable: true, exposes_lookahead: inner_pair.exposes_lookahead });

    let inner_expr = desugar(inner, table, modes, synth);
    let body = initial_alt(mk_seq(inner_expr, Expr::Rule(Rc::clone(&nt))), Expr::Eps);
    nt.set_body(body);

    Expr::Rule(nt)
}

/// Build `Alt(a, b)` with identity generation maps sized to cover both
/// sides' current generations — the natural base case for a freshly
/// composed alternative with no renumbering yet to do (every generation
/// either side can expose is already valid in the parent's numbering,
/// since nothing has diverged the two namespaces at construction time).
fn initial_alt(a: Expr, b: Expr) -> Expr {
    let gm = a
        .back_set()
        .max()
        .unwrap_or(Generation::ZERO)
        .max(b.back_set().max().unwrap_or(Generation::ZERO));
    mk_alt(a, b, GenMap::identity(gm), GenMap::identity(gm), gm)
}

fn desugar_range(ranges: &[(char, char)]) -> Expr {
    let mut iter = ranges.iter();
    let Some(&(lo, hi)) = iter.next() else {
        // An empty range set (no alternatives) matches nothing.
        return Expr::Fail;
    };
    let mut acc = range_expr(lo, hi);
    for &(lo, hi) in iter {
        acc = initial_alt(acc, range_expr(lo, hi));
    }
    acc
}

fn range_expr(lo: char, hi: char) -> Expr {
    if lo == hi { Expr::Char(lo) } else { Expr::Range(lo, hi) }
}
