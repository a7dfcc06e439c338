use std::fmt;

/// The name of an RDF context (named graph), always a URI string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(String);

impl ContextId {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContextId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ContextId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A literal value: a lexical form with either a language tag or a
/// datatype IRI, matching RDF 1.1's literal model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    pub lexical: String,
    pub lang: Option<String>,
    pub datatype: Option<String>,
}

/// An RDF term: an IRI, a blank node, or a literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Self::Iri(value.into())
    }

    pub fn blank(value: impl Into<String>) -> Self {
        Self::BlankNode(value.into())
    }

    pub fn plain_literal(value: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: value.into(),
            lang: None,
            datatype: None,
        })
    }

    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: value.into(),
            lang: Some(lang.into()),
            datatype: None,
        })
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: value.into(),
            lang: None,
            datatype: Some(datatype.into()),
        })
    }

    /// The term's IRI, if it is one; used when matching `?uri` includes
    /// against subjects and objects.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(uri) => Some(uri),
            _ => None,
        }
    }
}

/// A single RDF statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}
