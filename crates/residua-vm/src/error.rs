//! Errors a matcher driver invocation can report (spec.md §6.2, §7).

use residua_core::GrammarError;

/// Either the grammar failed to load, or the caller named a start rule the
/// grammar doesn't define. Both are distinct from the recognizer's own
/// match/fail/unproductive-recursion outcome (spec.md §7's three-way
/// classification), which `MatchOutcome` carries instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("start rule `{0}` is not defined in the grammar")]
    UnknownStartRule(String),
}
