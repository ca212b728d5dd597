//! Grammar-construction errors (SPEC_FULL.md §3, §4 item 2).
//!
//! `thiserror`-derived, one variant per distinguishable failure, following
//! the teacher's error-enum convention (e.g.
//! `plotnik-compiler/src/lib.rs::Error`, `plotnik-lib/src/engine/error.rs`
//! ::RuntimeError`) rather than a `String`-typed or `anyhow` error.

/// A grammar failed to load (spec.md §6.3's loader boundary): the grammar
/// is empty, or some rule body references a nonterminal that was never
/// defined. Both are distinct from "this input doesn't parse" — they're
/// caught once, before any derivative is ever taken, rather than
/// discovered later as a runtime `Inf`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    /// The grammar defines no rules at all.
    #[error("grammar has no rules")]
    Empty,
    /// `rule` is invoked somewhere in the grammar but never defined.
    #[error("rule `{rule}` is referenced but not defined")]
    UndefinedRule { rule: String },
}
