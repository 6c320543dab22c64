//! Triples, triple patterns, and basic graph patterns

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::term::{Term, Variable};

/// A basic graph pattern: an ordered sequence of triple patterns
///
/// BGP semantics are set semantics, but the order is preserved so that
/// derived queries rewrite stably.
pub type Bgp = Vec<TriplePattern>;

/// A triple pattern: a triple whose positions may contain variables
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl TriplePattern {
    /// Creates a new triple pattern
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        TriplePattern {
            subject,
            predicate,
            object,
        }
    }

    /// Iterates over the variables of this pattern, in subject, predicate,
    /// object order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter_map(Term::as_variable)
    }

    /// Returns true if no position contains a variable
    pub fn is_ground(&self) -> bool {
        self.variables().next().is_none()
    }

    /// Converts this pattern into a concrete triple if it is ground
    pub fn to_triple(&self) -> Option<Triple> {
        if self.is_ground() {
            Some(Triple::new(
                self.subject.clone(),
                self.predicate.clone(),
                self.object.clone(),
            ))
        } else {
            None
        }
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// A ground RDF triple
///
/// Groundness is by construction: producers only build triples from
/// variable-free terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    /// Creates a new triple
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Triple {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}
