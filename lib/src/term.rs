//! Defines the `Term` and `Triple` types and their conversion to and from
//! the store's textual SPARQL syntax, the oxigraph model, and SPARQL JSON
//! result bindings.

use crate::consts::XSD_STRING;
use anyhow::{anyhow, Result};
use log::warn;
use oxigraph::model::{Literal, NamedNode, Subject, Term as OxTerm, Triple as OxTriple};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single variable binding row returned by a SELECT query.
pub type Binding = HashMap<String, Term>;

/// A typed value occupying a triple position.
///
/// The store does not distinguish literals explicitly typed as plain strings
/// from untyped strings on read, so an `xsd:string` datatype is normalized
/// away on construction and never emitted on encode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Uri(String),
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
    /// Anything the store hands back that is neither an IRI nor a literal
    /// (blank nodes, quoted triples). Encoded as a plain string.
    Other { kind: String, value: String },
}

impl Term {
    pub fn uri(value: impl Into<String>) -> Self {
        Term::Uri(value.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        Term::Literal {
            value: value.into(),
            datatype: normalize_datatype(Some(datatype)),
            language: None,
        }
    }

    pub fn lang_literal(value: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    /// The lexical value of the term, regardless of kind.
    pub fn value(&self) -> &str {
        match self {
            Term::Uri(v) => v,
            Term::Literal { value, .. } => value,
            Term::Other { value, .. } => value,
        }
    }

    /// Encodes the term in the store's wire syntax.
    pub fn to_sparql(&self) -> String {
        match self {
            Term::Uri(v) => format!("<{}>", v),
            Term::Literal {
                value,
                datatype,
                language,
            } => {
                let quoted = format!("\"{}\"", escape_literal(value));
                match (datatype, language) {
                    (Some(dt), _) => format!("{}^^<{}>", quoted, dt),
                    (None, Some(lang)) => format!("{}@{}", quoted, lang),
                    (None, None) => quoted,
                }
            }
            Term::Other { kind, value } => {
                // Not representable in the wire syntax; degrade to a plain
                // string rather than failing the whole batch.
                warn!("escaping non-uri/non-literal term of kind {} as a plain string: {}", kind, value);
                format!("\"{}\"", escape_literal(value))
            }
        }
    }

    pub fn from_oxigraph(term: &OxTerm) -> Self {
        match term {
            OxTerm::NamedNode(n) => Term::Uri(n.as_str().to_string()),
            OxTerm::Literal(lit) => {
                if let Some(lang) = lit.language() {
                    Term::lang_literal(lit.value(), lang)
                } else {
                    Term::Literal {
                        value: lit.value().to_string(),
                        datatype: normalize_datatype(Some(lit.datatype().as_str().to_string())),
                        language: None,
                    }
                }
            }
            OxTerm::BlankNode(b) => Term::Other {
                kind: "bnode".to_string(),
                value: b.as_str().to_string(),
            },
            OxTerm::Triple(t) => Term::Other {
                kind: "triple".to_string(),
                value: t.to_string(),
            },
        }
    }

    pub fn to_oxigraph(&self) -> Result<OxTerm> {
        match self {
            Term::Uri(v) => Ok(NamedNode::new(v)?.into()),
            Term::Literal {
                value,
                datatype,
                language,
            } => match (datatype, language) {
                (Some(dt), _) => {
                    Ok(Literal::new_typed_literal(value.clone(), NamedNode::new(dt)?).into())
                }
                (None, Some(lang)) => {
                    Ok(Literal::new_language_tagged_literal(value.clone(), lang.clone())?.into())
                }
                (None, None) => Ok(Literal::new_simple_literal(value.clone()).into()),
            },
            Term::Other { kind, value } => {
                warn!("representing non-uri/non-literal term of kind {} as a plain string", kind);
                Ok(Literal::new_simple_literal(value.clone()).into())
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sparql())
    }
}

/// An `xsd:string` tag carries no information the store preserves; drop it.
fn normalize_datatype(datatype: Option<String>) -> Option<String> {
    datatype.filter(|dt| dt != XSD_STRING)
}

/// Escapes a literal value for embedding in a double-quoted SPARQL string.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// A subject-predicate-object statement. Subject and predicate are IRIs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Triple {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }

    /// Encodes the triple as a statement in the store's wire syntax.
    pub fn to_sparql(&self) -> String {
        format!(
            "<{}> <{}> {} .",
            self.subject,
            self.predicate,
            self.object.to_sparql()
        )
    }

    /// Builds a triple from a `?s ?p ?o` SELECT binding.
    pub fn from_binding(binding: &Binding) -> Result<Self> {
        let subject = binding
            .get("s")
            .ok_or_else(|| anyhow!("binding is missing ?s"))?;
        let predicate = binding
            .get("p")
            .ok_or_else(|| anyhow!("binding is missing ?p"))?;
        let object = binding
            .get("o")
            .ok_or_else(|| anyhow!("binding is missing ?o"))?;
        Ok(Triple {
            subject: subject.value().to_string(),
            predicate: predicate.value().to_string(),
            object: object.clone(),
        })
    }

    pub fn to_oxigraph(&self) -> Result<OxTriple> {
        let subject: Subject = NamedNode::new(&self.subject)?.into();
        let predicate = NamedNode::new(&self.predicate)?;
        Ok(OxTriple::new(subject, predicate, self.object.to_oxigraph()?))
    }

    pub fn from_oxigraph(triple: &OxTriple) -> Result<Self> {
        let subject = match &triple.subject {
            Subject::NamedNode(n) => n.as_str().to_string(),
            other => return Err(anyhow!("unsupported triple subject: {}", other)),
        };
        Ok(Triple {
            subject,
            predicate: triple.predicate.as_str().to_string(),
            object: Term::from_oxigraph(&triple.object),
        })
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sparql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{XSD_DATETIME, XSD_STRING};

    #[test]
    fn test_plain_string_datatype_is_normalized() {
        let tagged = Term::typed_literal("hello", XSD_STRING);
        let plain = Term::literal("hello");
        assert_eq!(tagged, plain);
        assert_eq!(tagged.to_sparql(), "\"hello\"");
    }

    #[test]
    fn test_plain_string_roundtrip_through_oxigraph() {
        let tagged = Term::typed_literal("hello", XSD_STRING);
        let ox = tagged.to_oxigraph().unwrap();
        let back = Term::from_oxigraph(&ox);
        assert_eq!(back, Term::literal("hello"));
    }

    #[test]
    fn test_typed_literal_encoding() {
        let term = Term::typed_literal("2024-05-01T00:00:00Z", XSD_DATETIME);
        assert_eq!(
            term.to_sparql(),
            format!("\"2024-05-01T00:00:00Z\"^^<{}>", XSD_DATETIME)
        );
    }

    #[test]
    fn test_language_tagged_encoding() {
        let term = Term::lang_literal("vergadering", "nl");
        assert_eq!(term.to_sparql(), "\"vergadering\"@nl");
    }

    #[test]
    fn test_uri_encoding() {
        let term = Term::uri("http://example.com/a");
        assert_eq!(term.to_sparql(), "<http://example.com/a>");
    }

    #[test]
    fn test_escaping() {
        let term = Term::literal("a \"quoted\"\nline\\end");
        assert_eq!(term.to_sparql(), "\"a \\\"quoted\\\"\\nline\\\\end\"");
    }

    #[test]
    fn test_other_term_kind_encodes_as_plain_string() {
        let term = Term::Other {
            kind: "bnode".to_string(),
            value: "b0".to_string(),
        };
        assert_eq!(term.to_sparql(), "\"b0\"");
    }

    #[test]
    fn test_triple_encoding() {
        let t = Triple::new(
            "http://example.com/s",
            "http://example.com/p",
            Term::literal("o"),
        );
        assert_eq!(
            t.to_sparql(),
            "<http://example.com/s> <http://example.com/p> \"o\" ."
        );
    }

    #[test]
    fn test_triple_oxigraph_roundtrip() {
        let t = Triple::new(
            "http://example.com/s",
            "http://example.com/p",
            Term::typed_literal("5", crate::consts::XSD_INTEGER),
        );
        let ox = t.to_oxigraph().unwrap();
        assert_eq!(Triple::from_oxigraph(&ox).unwrap(), t);
    }
}
