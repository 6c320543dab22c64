//! RDF model types
//!
//! Terms, triples, and triple patterns following the RDF 1.1 abstract
//! syntax, restricted to what pattern evaluation over a remote graph needs.

pub mod term;
pub mod triple;

pub use term::{BlankNode, Literal, NamedNode, Term, Variable};
pub use triple::{Bgp, Triple, TriplePattern};
