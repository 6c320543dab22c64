//! Solution mappings from variable names to RDF terms
//!
//! A `Bindings` is the unit of data flowing through query operators: one
//! partial solution, mapping prefix-less variable names to terms. Operators
//! treat incoming bindings as read-only and derive fresh values through
//! [`Bindings::empty`], [`Bindings::set`], and [`Bindings::union`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Term, TriplePattern};

/// A finite mapping from variable names to RDF terms
///
/// A variable name appears at most once. Iteration order is unspecified but
/// stable for a given instance within one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings {
    entries: HashMap<String, Term>,
}

impl Bindings {
    /// Creates an empty solution mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh empty mapping of the same flavor as this one
    pub fn empty(&self) -> Self {
        Self::new()
    }

    /// Returns true if no variable is bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of bound variables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the term bound to `variable`, if any
    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.entries.get(variable)
    }

    /// Binds `variable` to `term`, replacing any previous entry
    pub fn set(&mut self, variable: impl Into<String>, term: Term) {
        self.entries.insert(variable.into(), term);
    }

    /// Iterates over the bound variable names
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over the entries as `(name, term)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.entries.iter().map(|(name, term)| (name.as_str(), term))
    }

    /// Applies this mapping to a triple pattern
    ///
    /// Every variable position bound here is substituted with its term;
    /// unbound variables are left in place. Substitution never introduces
    /// new variables.
    pub fn bound(&self, pattern: &TriplePattern) -> TriplePattern {
        TriplePattern::new(
            self.resolve(&pattern.subject),
            self.resolve(&pattern.predicate),
            self.resolve(&pattern.object),
        )
    }

    fn resolve(&self, term: &Term) -> Term {
        if let Term::Variable(variable) = term {
            if let Some(bound) = self.get(variable.as_str()) {
                return bound.clone();
            }
        }
        term.clone()
    }

    /// Pointwise union of two mappings
    ///
    /// When both sides bind the same variable, the entry of `self` is kept.
    /// Callers merging solutions of a common query never produce
    /// disagreeing sides, so the tie-break is not observable there.
    pub fn union(&self, other: &Bindings) -> Bindings {
        let mut merged = self.clone();
        for (name, term) in &other.entries {
            merged
                .entries
                .entry(name.clone())
                .or_insert_with(|| term.clone());
        }
        merged
    }
}

impl FromIterator<(String, Term)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (String, Term)>>(iter: I) -> Self {
        Bindings {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, term)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "?{} -> {}", name, term)?;
        }
        write!(f, "}}")
    }
}
