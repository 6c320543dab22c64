//! Federation error types
//!
//! Every error in this crate is terminal: the first one observed by an
//! operator ends its output, and nothing is retried. The variants are the
//! minimum structural distinction a caller may need to switch on.

use fedgraph_core::ModelError;

/// Error type for federation operators and sinks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FederateError {
    /// The upstream operator feeding this one failed
    #[error("upstream source failed: {0}")]
    Source(String),

    /// The remote graph signalled a failure while evaluating a pattern
    #[error("remote evaluation failed: {0}")]
    Remote(String),

    /// A per-triple write against the target graph failed
    #[error("graph write failed: {0}")]
    Write(String),

    /// The downstream consumer unsubscribed before completion
    #[error("cancelled by downstream")]
    Cancelled,

    /// The update plan could not be prepared for execution
    #[error("update plan cannot run: {0}")]
    Preparation(String),

    /// A term could not be constructed at the federation layer
    #[error(transparent)]
    Model(#[from] ModelError),
}
