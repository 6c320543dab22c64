//! In-process graph backed by a triple list
//!
//! `MemoryGraph` is the reference [`Graph`] implementation: naive
//! binding-extension BGP matching over a locked vector. It stands in for a
//! remote endpoint in tests and small local pipelines.

use std::sync::RwLock;

use async_trait::async_trait;
use futures::stream;

use fedgraph_core::{Bindings, Term, Triple, TriplePattern};

use crate::error::FederateError;
use crate::graph::{BindingsStream, Graph, QueryOptions};

/// An in-memory RDF graph
#[derive(Debug, Default)]
pub struct MemoryGraph {
    triples: RwLock<Vec<Triple>>,
}

impl MemoryGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph pre-populated with `triples`
    pub fn with_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        Self {
            triples: RwLock::new(triples.into_iter().collect()),
        }
    }

    /// Returns the number of stored triples
    pub fn len(&self) -> usize {
        self.triples.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if the graph holds no triples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `triple` is stored
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(triple)
    }

    fn snapshot(&self) -> Vec<Triple> {
        self.triples
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Matches one pattern position, extending `binding` when the position is an
/// unbound variable
fn match_term(pattern: &Term, value: &Term, binding: &mut Bindings) -> bool {
    match pattern {
        Term::Variable(variable) => match binding.get(variable.as_str()) {
            Some(bound) => bound == value,
            None => {
                binding.set(variable.as_str(), value.clone());
                true
            }
        },
        other => other == value,
    }
}

fn match_pattern(pattern: &TriplePattern, triple: &Triple, seed: &Bindings) -> Option<Bindings> {
    let mut binding = seed.clone();
    if match_term(&pattern.subject, &triple.subject, &mut binding)
        && match_term(&pattern.predicate, &triple.predicate, &mut binding)
        && match_term(&pattern.object, &triple.object, &mut binding)
    {
        Some(binding)
    } else {
        None
    }
}

#[async_trait]
impl Graph for MemoryGraph {
    fn eval_bgp(&self, bgp: &[TriplePattern], _options: &QueryOptions) -> BindingsStream {
        let triples = self.snapshot();
        let mut solutions = vec![Bindings::new()];
        for pattern in bgp {
            let mut extended = Vec::new();
            for solution in &solutions {
                for triple in &triples {
                    if let Some(next) = match_pattern(pattern, triple, solution) {
                        extended.push(next);
                    }
                }
            }
            solutions = extended;
            if solutions.is_empty() {
                break;
            }
        }
        Box::pin(stream::iter(solutions.into_iter().map(Ok)))
    }

    async fn insert(&self, triple: &Triple) -> Result<(), FederateError> {
        let mut triples = self.triples.write().unwrap_or_else(|e| e.into_inner());
        if !triples.contains(triple) {
            triples.push(triple.clone());
        }
        Ok(())
    }

    async fn delete(&self, triple: &Triple) -> Result<(), FederateError> {
        let mut triples = self.triples.write().unwrap_or_else(|e| e.into_inner());
        triples.retain(|stored| stored != triple);
        Ok(())
    }
}
