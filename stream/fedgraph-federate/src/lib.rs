//! # FedGraph Federate
//!
//! Streaming evaluation of basic graph patterns against remote RDF graphs.
//!
//! The centerpiece is the [`BoundJoin`] operator: it batches partial
//! solutions flowing out of an upstream operator, rewrites the target BGP
//! once per batched input, ships the whole batch to the remote graph as a
//! single union-of-BGPs query, and demultiplexes the answers back onto the
//! inputs they belong to. This amortizes the per-request cost of remote
//! evaluation, which dominates federated query latency.
//!
//! The crate also provides the dual, update-side sinks ([`InsertConsumer`],
//! [`DeleteConsumer`]) that drain a triple stream into a graph under the
//! same streaming discipline, and [`MemoryGraph`], an in-process [`Graph`]
//! implementation.
//!
//! ## Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use futures::{stream, StreamExt};
//! use fedgraph_core::{Bindings, NamedNode, Term, TriplePattern, Variable};
//! use fedgraph_federate::{BindingsStream, BoundJoin, MemoryGraph, QueryOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let graph = Arc::new(MemoryGraph::new());
//! let bgp = vec![TriplePattern::new(
//!     Term::Variable(Variable::new_unchecked("s")),
//!     Term::NamedNode(NamedNode::new_unchecked("http://xmlns.com/foaf/0.1/knows")),
//!     Term::Variable(Variable::new_unchecked("o")),
//! )];
//!
//! let join = BoundJoin::new(graph, bgp, QueryOptions::new());
//! let source: BindingsStream = Box::pin(stream::iter(vec![Ok(Bindings::new())]));
//! let results: Vec<_> = join.apply(source).collect().await;
//! assert!(results.is_empty()); // the graph holds no triples yet
//! # }
//! ```

pub mod bound_join;
pub mod consumer;
pub mod error;
pub mod graph;
pub mod memory;

pub use bound_join::{BoundJoin, BoundJoinConfig, BIND_JOIN_BUFFER_SIZE};
pub use consumer::{Consumer, DeleteConsumer, ErrorConsumer, InsertConsumer};
pub use error::FederateError;
pub use graph::{BindingsStream, Graph, QueryOptions, TripleStream};
pub use memory::MemoryGraph;

/// Result type alias for federation operations
pub type Result<T> = std::result::Result<T, FederateError>;
