//! Matcher driver for executing a residua recognizer core against an
//! input stream (spec.md §4.F, §6.2).
//!
//! This is the one component of spec.md's core that consumes input: given
//! a grammar, an input string, and a start-rule name, it repeatedly takes
//! derivatives (`residua_core::deriv`) until the expression resolves to a
//! match, an ordinary failure, or unproductive (left-recursive) recursion.

pub mod driver;
pub mod error;

pub use driver::{MatchOutcome, match_str, run};
pub use error::MatchError;
