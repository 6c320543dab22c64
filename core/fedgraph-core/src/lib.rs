//! # FedGraph Core
//!
//! Core RDF data model for FedGraph - terms, triple patterns, and the
//! solution mappings (`Bindings`) that federation operators consume and
//! produce.
//!
//! This crate provides the foundational types the rest of the FedGraph
//! workspace depends on:
//!
//! - RDF terms (IRIs, blank nodes, literals, variables)
//! - Triple patterns and basic graph patterns
//! - Variable-to-term solution mappings with substitution and merge
//!
//! ## Examples
//!
//! ```rust
//! use fedgraph_core::{Bindings, NamedNode, Term, TriplePattern, Variable};
//!
//! let pattern = TriplePattern::new(
//!     Term::Variable(Variable::new("s")?),
//!     Term::NamedNode(NamedNode::new("http://xmlns.com/foaf/0.1/knows")?),
//!     Term::Variable(Variable::new("o")?),
//! );
//!
//! let mut bindings = Bindings::new();
//! bindings.set("s", Term::NamedNode(NamedNode::new("http://example.org/Alice")?));
//!
//! // Substitute bound variables into the pattern
//! let bounded = bindings.bound(&pattern);
//! assert!(bounded.subject.is_named_node());
//! assert!(bounded.object.is_variable());
//! # Ok::<(), fedgraph_core::ModelError>(())
//! ```

pub mod bindings;
pub mod error;
pub mod model;

pub use bindings::Bindings;
pub use error::ModelError;
pub use model::{Bgp, BlankNode, Literal, NamedNode, Term, Triple, TriplePattern, Variable};

/// Result type alias for FedGraph core operations
pub type Result<T> = std::result::Result<T, ModelError>;
