//! Nonterminal cells: named, mutable, shared grammar rule bodies.
//!
//! A [`Nonterminal`] is the shared state backing every [`crate::expr::Expr::Rule`]
//! reference to it (spec.md §3.4). Its body is interior-mutable so the
//! loader can install a rule's final definition after constructing
//! self-referential or mutually-recursive bodies (`crate::loader`), but
//! derivation treats the cell as read-only: `crate::deriv::derive` clones
//! the current body and derives the clone, per spec.md §4.D's `Rule` row
//! ("clone `r.body` into a fresh expression... derive it"), never writing
//! the result back. Two independent `Rule` occurrences referencing the same
//! nonterminal (e.g. `S = A A`) must each run their own derivative chain
//! from `A`'s original definition; writing derived state back into the
//! shared cell would let one occurrence's progress corrupt the other's. The
//! `in_deriv` flag is the reentrancy guard that turns left recursion into
//! `Inf` instead of an unbounded recursive descent (spec.md §4.D, §5).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::expr::Expr;

/// Cached fixed-point result for a nonterminal: whether its current body is
/// nullable, and whether it can expose a pending lookahead generation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct NullablePair {
    pub nullable: bool,
    pub exposes_lookahead: bool,
}

/// A named, mutable, shared grammar rule.
pub struct Nonterminal {
    pub name: String,
    body: RefCell<Expr>,
    in_deriv: Cell<bool>,
    fixed: Cell<Option<NullablePair>>,
}

impl Nonterminal {
    pub fn new(name: impl Into<String>, body: Expr) -> Rc<Nonterminal> {
        Rc::new(Nonterminal {
            name: name.into(),
            body: RefCell::new(body),
            in_deriv: Cell::new(false),
            fixed: Cell::new(None),
        })
    }

    pub fn body(&self) -> Expr {
        self.body.borrow().clone()
    }

    pub fn set_body(&self, e: Expr) {
        *self.body.borrow_mut() = e;
    }

    pub fn is_in_deriv(&self) -> bool {
        self.in_deriv.get()
    }

    /// Run `f` with the reentrancy flag held, returning `None` if the flag
    /// was already set (i.e. this nonterminal is already being derived
    /// further up the call stack — left recursion).
    pub fn with_deriv_guard<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        if self.in_deriv.get() {
            return None;
        }
        self.in_deriv.set(true);
        let result = f();
        self.in_deriv.set(false);
        Some(result)
    }

    pub fn fixed_point(&self) -> Option<NullablePair> {
        self.fixed.get()
    }

    pub fn set_fixed_point(&self, pair: NullablePair) {
        self.fixed.set(Some(pair));
    }

    pub fn clear_fixed_point(&self) {
        self.fixed.set(None);
    }
}

impl fmt::Debug for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nonterminal")
            .field("name", &self.name)
            .field("in_deriv", &self.in_deriv.get())
            .field("fixed", &self.fixed.get())
            .finish_non_exhaustive()
    }
}
