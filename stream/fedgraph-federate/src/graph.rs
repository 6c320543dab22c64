//! The graph contract consumed by federation operators
//!
//! A [`Graph`] is anything that can evaluate basic graph patterns and apply
//! per-triple updates - typically a client for a remote SPARQL endpoint,
//! or [`MemoryGraph`](crate::MemoryGraph) for in-process evaluation.
//! Evaluation results are lazy streams: items arrive as they are produced,
//! errors travel in-band as a single terminal `Err`, and completion is the
//! end of the stream.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fedgraph_core::{Bgp, Bindings, Triple, TriplePattern};

use crate::error::FederateError;

/// A lazy, possibly asynchronous sequence of solution mappings
pub type BindingsStream = Pin<Box<dyn Stream<Item = Result<Bindings, FederateError>> + Send>>;

/// A lazy, possibly asynchronous sequence of triples
pub type TripleStream = Pin<Box<dyn Stream<Item = Result<Triple, FederateError>> + Send>>;

/// Opaque evaluation options, passed through to the graph untouched
///
/// Operators neither read nor mutate the bag; only the graph implementation
/// assigns meaning to its entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryOptions {
    entries: HashMap<String, Value>,
}

impl QueryOptions {
    /// Creates an empty options bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`QueryOptions::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Returns the value stored under `key`, if any
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns true if no option is set
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An RDF graph that supports pattern evaluation and per-triple updates
#[async_trait]
pub trait Graph: Send + Sync {
    /// Evaluates a basic graph pattern, yielding every solution mapping
    ///
    /// The stream must terminate in finite time for finite inputs and must
    /// report remote failures as a single `Err` item.
    fn eval_bgp(&self, bgp: &[TriplePattern], options: &QueryOptions) -> BindingsStream;

    /// Evaluates a union of basic graph patterns
    ///
    /// Logically the disjoint union of [`Graph::eval_bgp`] over the members.
    /// Each output carries the variables of whichever member produced it,
    /// verbatim - callers rely on those names to demultiplex. Remote graphs
    /// are expected to override this and pack the whole union into one
    /// request; the provided implementation merges per-member evaluation.
    fn eval_union(&self, bgps: &[Bgp], options: &QueryOptions) -> BindingsStream {
        let members: Vec<BindingsStream> = bgps
            .iter()
            .map(|bgp| self.eval_bgp(bgp, options))
            .collect();
        Box::pin(stream::select_all(members))
    }

    /// Inserts one triple into the graph
    async fn insert(&self, triple: &Triple) -> Result<(), FederateError>;

    /// Deletes one triple from the graph
    async fn delete(&self, triple: &Triple) -> Result<(), FederateError>;
}
