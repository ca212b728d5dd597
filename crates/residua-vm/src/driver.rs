//! The matcher driver (spec.md §4.F, §6.2).
//!
//! `match_str` is the single public entry point spec.md §6.2 specifies: a
//! grammar, an input stream, and a start-rule name, returning a bool. `run`
//! is the richer form SPEC_FULL.md §4 item 3 adds on top — the same loop,
//! but returning the three-way match/fail/unproductive-recursion outcome
//! (spec.md §7) plus the final input index (spec.md §7: "Error position...
//! is the driver's final input index"), since both are data the loop
//! already computes on its way to the boolean. Grounded on
//! `original_source/matcher.cpp`'s top-level loop and
//! `plotnik-lib/src/engine/vm.rs`'s `VM::run`/`step` shape (fetch next
//! input unit, dispatch, check terminal conditions), generalized from
//! tree-cursor navigation to character-by-character derivation.

use std::rc::Rc;

use residua_core::deriv::{EOF, derive};
use residua_core::expr::Expr;
use residua_core::{Grammar, load};

use crate::error::MatchError;

/// The three outcomes a derivation step can resolve to (spec.md §7).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MatchOutcome {
    /// The input matched the start rule.
    Matched,
    /// Ordinary failure: the grammar does not accept this input.
    Failed,
    /// Unproductive recursion (`Inf`): a left-recursive rule was entered
    /// with no progress. Not a crash — an honest "cannot consume here"
    /// (spec.md §7).
    UnproductiveRecursion,
}

impl MatchOutcome {
    pub fn matched(self) -> bool {
        matches!(self, MatchOutcome::Matched)
    }
}

/// Run the driver loop of spec.md §4.F over `input` against `start_rule`,
/// returning the outcome and the final input index (the number of
/// characters consumed before the loop stopped).
pub fn run(grammar: &Grammar, input: &str, start_rule: &str) -> Result<(MatchOutcome, usize), MatchError> {
    let table = load(grammar)?;
    let nt = table
        .get(start_rule)
        .ok_or_else(|| MatchError::UnknownStartRule(start_rule.to_string()))?;

    let mut e = Expr::Rule(Rc::clone(nt));
    let mut chars = input.chars();
    let mut index = 0usize;

    loop {
        if let Some(outcome) = terminal_outcome(&e) {
            return Ok((outcome, index));
        }
        let x = chars.next().unwrap_or(EOF);
        e = derive(&e, x);
        if x == EOF {
            break;
        }
        index += 1;
    }

    let outcome = if e.match_set().is_empty() { MatchOutcome::Failed } else { MatchOutcome::Matched };
    Ok((outcome, index))
}

/// Whether `e` has already resolved to a terminal outcome without reading
/// further input (spec.md §4.F steps 3a–3c: `Fail`/`Inf` fail, `Eps` or a
/// non-empty match set succeed).
fn terminal_outcome(e: &Expr) -> Option<MatchOutcome> {
    if e.is_inf() {
        return Some(MatchOutcome::UnproductiveRecursion);
    }
    if e.is_fail() {
        return Some(MatchOutcome::Failed);
    }
    if matches!(e, Expr::Eps) || !e.match_set().is_empty() {
        return Some(MatchOutcome::Matched);
    }
    None
}

/// The driver entry point spec.md §6.2 specifies: `match(grammar,
/// input-stream, start-rule-name) -> bool`. No configuration, no options.
pub fn match_str(grammar: &Grammar, input: &str, start_rule: &str) -> Result<bool, MatchError> {
    run(grammar, input, start_rule).map(|(outcome, _)| outcome.matched())
}

/// Render the derivative trace of a match attempt — the expression after
/// each character consumed, `Debug`-formatted — for use in test failure
/// messages. The spirit of the original's `deriv_printer`/`instrumenter`
/// visitor pair, without a standalone pretty-printer binary (SPEC_FULL.md §4
/// item 5).
#[cfg(test)]
fn trace(grammar: &Grammar, input: &str, start_rule: &str) -> String {
    let table = load(grammar).expect("grammar must load to trace it");
    let nt = table.get(start_rule).expect("start rule must exist to trace it");

    let mut e = Expr::Rule(Rc::clone(nt));
    let mut out = format!("{e:?}\n");
    for x in input.chars().chain(std::iter::once(EOF)) {
        e = derive(&e, x);
        out += &format!("--{x:?}--> {e:?}\n");
        if terminal_outcome(&e).is_some() {
            break;
        }
    }
    out
}
