//! Derivative-based PEG recognizer core.
//!
//! Five components, leaves-first (spec.md §2): the generation-map algebra
//! (`gen`), the expression algebra (`expr`), the smart constructors that
//! keep expressions in canonical reduced form (`smooth`), the derivative
//! engine (`deriv`), and the nullability fixer (`nullable`). `ast` is the
//! grammar AST this crate consumes from an external front-end; `loader`
//! turns it into the expression DAG these components operate over;
//! `nonterminal` is the shared, mutable rule cell `Rule` expressions
//! reference; `error` holds the construction-time failure type.
//!
//! This crate is a *recognizer*: it reports match/no-match at a position.
//! It does not parse `.egg` source, generate code, preserve captured
//! substrings, or execute semantic actions (spec.md §1) — those are left to
//! the external front-end/backend this core is wired into, and to
//! `residua-vm`'s driver for the match/no-match decision itself.

pub mod ast;
pub mod deriv;
pub mod error;
pub mod expr;
pub mod gen;
pub mod loader;
pub mod nonterminal;
pub mod nullable;
pub mod smooth;

pub use ast::{Grammar, Matcher};
pub use error::GrammarError;
pub use expr::{Expr, ExprKind, Follower};
pub use gen::{GenMap, GenSet, Generation};
pub use loader::{NonterminalTable, load};
pub use nonterminal::{Nonterminal, NullablePair};
