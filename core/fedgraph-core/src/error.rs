//! Core error types for FedGraph

/// Error raised when constructing a model type from invalid input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The string is not usable as an IRI
    #[error("invalid IRI: {0:?}")]
    InvalidIri(String),

    /// The string is not a valid blank node label
    #[error("invalid blank node label: {0:?}")]
    InvalidBlankNode(String),

    /// The string is not a valid SPARQL variable name
    #[error("invalid variable name: {0:?}")]
    InvalidVariable(String),

    /// The string is not a valid language tag
    #[error("invalid language tag: {0:?}")]
    InvalidLanguageTag(String),
}
