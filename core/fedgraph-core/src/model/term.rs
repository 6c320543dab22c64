//! Core RDF term types and implementations

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Characters that may never appear inside an IRI reference
const IRI_FORBIDDEN: &[char] = &['<', '>', '"', '{', '}', '|', '^', '`', '\\'];

fn validate_iri(iri: &str) -> Result<(), ModelError> {
    if iri.is_empty() || iri.chars().any(|c| c.is_whitespace() || IRI_FORBIDDEN.contains(&c)) {
        return Err(ModelError::InvalidIri(iri.to_string()));
    }
    Ok(())
}

fn validate_blank_node_label(label: &str) -> Result<(), ModelError> {
    let mut chars = label.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphanumeric() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        None => false,
    };
    if !valid {
        return Err(ModelError::InvalidBlankNode(label.to_string()));
    }
    Ok(())
}

fn validate_variable_name(name: &str) -> Result<(), ModelError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid {
        return Err(ModelError::InvalidVariable(name.to_string()));
    }
    Ok(())
}

fn validate_language_tag(tag: &str) -> Result<(), ModelError> {
    let well_formed = !tag.is_empty()
        && tag.starts_with(|c: char| c.is_ascii_alphabetic())
        && tag
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
    if !well_formed {
        return Err(ModelError::InvalidLanguageTag(tag.to_string()));
    }
    Ok(())
}

/// An IRI reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamedNode {
    iri: String,
}

impl NamedNode {
    /// Creates a new named node, validating the IRI
    ///
    /// # Errors
    /// Returns an error if the IRI is empty or contains characters that are
    /// forbidden in IRI references.
    pub fn new(iri: impl Into<String>) -> Result<Self, ModelError> {
        let iri = iri.into();
        validate_iri(&iri)?;
        Ok(NamedNode { iri })
    }

    /// Creates a new named node without validation
    ///
    /// The caller must ensure the IRI is well formed.
    pub fn new_unchecked(iri: impl Into<String>) -> Self {
        NamedNode { iri: iri.into() }
    }

    /// Returns the IRI as a string slice
    pub fn as_str(&self) -> &str {
        &self.iri
    }
}

impl fmt::Display for NamedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.iri)
    }
}

/// A blank node identifier
///
/// Blank nodes are local identifiers without global meaning. The label is
/// stored without the `_:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlankNode {
    id: String,
}

impl BlankNode {
    /// Creates a new blank node with the given label (with or without the
    /// `_:` prefix)
    ///
    /// # Errors
    /// Returns an error if the label is not valid under the Turtle grammar.
    pub fn new(id: impl Into<String>) -> Result<Self, ModelError> {
        let id = id.into();
        let label = id.strip_prefix("_:").unwrap_or(&id);
        validate_blank_node_label(label)?;
        Ok(BlankNode {
            id: label.to_string(),
        })
    }

    /// Creates a new blank node without validation
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        BlankNode { id: id.into() }
    }

    /// Returns the label (without prefix)
    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.id)
    }
}

/// An RDF literal: a lexical form with an optional datatype or language tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    value: String,
    datatype: Option<NamedNode>,
    language: Option<String>,
}

impl Literal {
    /// Creates a plain string literal
    pub fn new_simple_literal(value: impl Into<String>) -> Self {
        Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    /// Creates a literal with an explicit datatype
    pub fn new_typed_literal(value: impl Into<String>, datatype: NamedNode) -> Self {
        Literal {
            value: value.into(),
            datatype: Some(datatype),
            language: None,
        }
    }

    /// Creates a language-tagged string literal
    ///
    /// # Errors
    /// Returns an error if the language tag is not well formed.
    pub fn new_language_tagged_literal(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let language = language.into();
        validate_language_tag(&language)?;
        Ok(Literal {
            value: value.into(),
            datatype: None,
            language: Some(language),
        })
    }

    /// Returns the lexical form
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the datatype IRI, if any
    pub fn datatype(&self) -> Option<&NamedNode> {
        self.datatype.as_ref()
    }

    /// Returns the language tag, if any
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let escaped = self.value.replace('\\', "\\\\").replace('"', "\\\"");
        write!(f, "\"{}\"", escaped)?;
        if let Some(language) = &self.language {
            write!(f, "@{}", language)?;
        } else if let Some(datatype) = &self.datatype {
            write!(f, "^^{}", datatype)?;
        }
        Ok(())
    }
}

/// A SPARQL variable
///
/// The name is stored without the `?`/`$` prefix; `Display` renders the
/// SPARQL surface form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variable {
    name: String,
}

impl Variable {
    /// Creates a new variable with the given name (with or without prefix)
    ///
    /// # Errors
    /// Returns an error if the name is not a valid SPARQL variable name.
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        let clean = name
            .strip_prefix('?')
            .or_else(|| name.strip_prefix('$'))
            .unwrap_or(&name);
        validate_variable_name(clean)?;
        Ok(Variable {
            name: clean.to_string(),
        })
    }

    /// Creates a new variable without validation
    ///
    /// The caller must ensure the name is valid; used internally where names
    /// are derived from already-validated ones.
    pub fn new_unchecked(name: impl Into<String>) -> Self {
        Variable { name: name.into() }
    }

    /// Returns the variable name (without prefix)
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

/// Union type for all RDF terms
///
/// Any position of a triple pattern holds one of these; fully ground data
/// never contains the `Variable` case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Literal(Literal),
    Variable(Variable),
}

impl Term {
    /// Returns true if this is a named node
    pub fn is_named_node(&self) -> bool {
        matches!(self, Term::NamedNode(_))
    }

    /// Returns true if this is a blank node
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    /// Returns true if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    /// Returns true if this is a variable
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// Returns the named node if this term is a named node
    pub fn as_named_node(&self) -> Option<&NamedNode> {
        match self {
            Term::NamedNode(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the literal if this term is a literal
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the variable if this term is a variable
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Term::Variable(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::NamedNode(n) => write!(f, "{}", n),
            Term::BlankNode(b) => write!(f, "{}", b),
            Term::Literal(l) => write!(f, "{}", l),
            Term::Variable(v) => write!(f, "{}", v),
        }
    }
}

impl From<NamedNode> for Term {
    fn from(node: NamedNode) -> Self {
        Term::NamedNode(node)
    }
}

impl From<BlankNode> for Term {
    fn from(node: BlankNode) -> Self {
        Term::BlankNode(node)
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}

impl From<Variable> for Term {
    fn from(variable: Variable) -> Self {
        Term::Variable(variable)
    }
}
