//! The consumed grammar AST (spec.md §6.1).
//!
//! This is the interface the out-of-scope PEG-syntax front-end produces and
//! this crate's loader (`crate::loader`) consumes; nothing here parses
//! `.egg` source, that belongs to the external front-end. Grounded on
//! `original_source/ast.hpp`'s `matcher`/`grammar` class hierarchy,
//! restated as a closed enum (spec.md §9 "Deep inheritance... a
//! tagged-variant representation is equivalent and preferred") plus an
//! `IndexMap`-backed rule table (`plotnik-core/src/grammar/types.rs`'s
//! `Vec<(String, Rule)>`-preserves-definition-order idiom, generalized to
//! `IndexMap` since the loader also needs name lookup, not just order).

use indexmap::IndexMap;

/// One node of a grammar rule body, as produced by the (external) front-end.
///
/// This enumerates every matcher kind spec.md §6.1 lists. `Capture` and
/// `Named` are pass-through from the core's point of view (spec.md §1: "the
/// core... does not preserve captured substrings"; §6.1: "named-error...
/// core passes through"); `Action` and `Fail` are treated as the trivial
/// always-succeed / always-fail matchers respectively (§6.1: "action...
/// core... treats as empty", "fail" being the error matcher).
#[derive(Clone, Debug)]
pub enum Matcher {
    /// A single character literal.
    Char(char),
    /// A string literal.
    Str(String),
    /// A set of inclusive character ranges (a single character is a range
    /// with equal endpoints).
    Range(Vec<(char, char)>),
    /// Matches any character except end-of-input.
    Any,
    /// Always matches without consuming input.
    Empty,
    /// Invokes another rule by name.
    Rule(String),
    /// `m?` — zero or one.
    Opt(Box<Matcher>),
    /// `m*` — zero or more.
    Many(Box<Matcher>),
    /// `m+` — one or more.
    Some(Box<Matcher>),
    /// Concatenation.
    Seq(Vec<Matcher>),
    /// Ordered alternation (PEG `/`).
    Alt(Vec<Matcher>),
    /// `&m` — positive lookahead.
    Look(Box<Matcher>),
    /// `!m` — negative lookahead.
    Not(Box<Matcher>),
    /// Wraps `m`, capturing its matched substring. The core ignores the
    /// capture and passes `m`'s recognition behavior through unchanged.
    Capture(Box<Matcher>),
    /// Wraps `m`, naming it for richer front-end error messages on
    /// failure. The core passes `m` through unchanged.
    Named(String, Box<Matcher>),
    /// A semantic action. The core treats this as the empty matcher: it
    /// always succeeds without consuming input; evaluating the action
    /// itself is the backend's job.
    Action(String),
    /// An explicit failure, carrying a front-end error message. The core
    /// treats this as matching nothing.
    Fail(String),
}

impl Matcher {
    /// Every rule name this matcher (transitively) invokes, in first-seen
    /// order, with duplicates removed. Used by the loader's
    /// undefined-rule validation pass.
    pub fn referenced_rules(&self, out: &mut Vec<String>) {
        match self {
            Matcher::Char(_)
            | Matcher::Str(_)
            | Matcher::Range(_)
            | Matcher::Any
            | Matcher::Empty
            | Matcher::Action(_)
            | Matcher::Fail(_) => {}
            Matcher::Rule(name) => {
                if !out.iter().any(|n| n == name) {
                    out.push(name.clone());
                }
            }
            Matcher::Opt(m) | Matcher::Many(m) | Matcher::Some(m) => m.referenced_rules(out),
            Matcher::Seq(ms) | Matcher::Alt(ms) => {
                for m in ms {
                    m.referenced_rules(out);
                }
            }
            Matcher::Look(m) | Matcher::Not(m) | Matcher::Capture(m) => m.referenced_rules(out),
            Matcher::Named(_, m) => m.referenced_rules(out),
        }
    }
}

/// A grammar: a name-indexed, definition-order-preserving set of rules
/// (spec.md §3.5, §6.1 "a sequence of rules... and a map from names to
/// rules"), plus the name of the rule derivation should start from.
#[derive(Clone, Debug)]
pub struct Grammar {
    /// Rule bodies, keyed by name, in definition order (spec.md §4.E's
    /// fixed-point iteration and `crate::loader` both rely on a
    /// deterministic traversal order).
    pub rules: IndexMap<String, Matcher>,
}

impl Grammar {
    pub fn new() -> Self {
        Grammar { rules: IndexMap::new() }
    }

    pub fn with_rule(mut self, name: impl Into<String>, body: Matcher) -> Self {
        self.rules.insert(name.into(), body);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Grammar::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referenced_rules_dedups_and_recurses() {
        let m = Matcher::Seq(vec![
            Matcher::Rule("A".into()),
            Matcher::Alt(vec![Matcher::Rule("B".into()), Matcher::Rule("A".into())]),
            Matcher::Not(Box::new(Matcher::Rule("C".into()))),
        ]);
        let mut refs = Vec::new();
        m.referenced_rules(&mut refs);
        assert_eq!(refs, vec!["A".to_string(), "B".to_string(), "C".to_string()]);
    }

    #[test]
    fn grammar_builder_preserves_definition_order() {
        let g = Grammar::new()
            .with_rule("S", Matcher::Rule("A".into()))
            .with_rule("A", Matcher::Char('a'));
        assert_eq!(g.rules.keys().collect::<Vec<_>>(), vec!["S", "A"]);
    }
}
