//! Defines the store query/update boundary: a `SparqlClient` trait with an
//! embedded oxigraph implementation and a remote SPARQL-protocol client.
//! Everything above this module speaks SPARQL text and `Term` bindings.

use crate::term::{Binding, Term};
use anyhow::{anyhow, Result};
use log::{debug, trace};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// The query/update transport consumed by the release pipeline.
///
/// The backing store is assumed eventually consistent at worst; the transfer
/// engine's verification pass exists specifically to cover that.
pub trait SparqlClient: Send + Sync {
    fn select(&self, query: &str) -> Result<Vec<Binding>>;
    fn update(&self, statement: &str) -> Result<()>;
}

/// An embedded oxigraph store behind the client trait. Used by tests and by
/// single-process deployments that do not talk to a remote endpoint.
/// Clones share the same underlying store.
#[derive(Clone)]
pub struct OxigraphClient {
    store: Store,
}

impl OxigraphClient {
    pub fn new() -> Result<Self> {
        Ok(OxigraphClient {
            store: Store::new()?,
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(OxigraphClient {
            store: Store::open(path)?,
        })
    }
}

impl SparqlClient for OxigraphClient {
    fn select(&self, query: &str) -> Result<Vec<Binding>> {
        trace!("select: {}", query);
        let results = self.store.query(query)?;
        let solutions = match results {
            QueryResults::Solutions(solutions) => solutions,
            _ => return Err(anyhow!("query did not produce solutions: {}", query)),
        };
        let variables = solutions.variables().to_vec();
        let mut rows = Vec::new();
        for solution in solutions {
            let solution = solution?;
            let mut row = Binding::new();
            for variable in &variables {
                if let Some(term) = solution.get(variable.as_str()) {
                    row.insert(variable.as_str().to_string(), Term::from_oxigraph(term));
                }
            }
            rows.push(row);
        }
        Ok(rows)
    }

    fn update(&self, statement: &str) -> Result<()> {
        trace!("update: {}", statement);
        self.store.update(statement)?;
        Ok(())
    }
}

// SPARQL 1.1 JSON results envelope
#[derive(Deserialize)]
struct SparqlJsonResults {
    results: SparqlJsonBindings,
}

#[derive(Deserialize)]
struct SparqlJsonBindings {
    bindings: Vec<HashMap<String, SparqlJsonTerm>>,
}

#[derive(Deserialize)]
struct SparqlJsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    datatype: Option<String>,
    #[serde(rename = "xml:lang")]
    language: Option<String>,
}

impl SparqlJsonTerm {
    fn into_term(self) -> Term {
        match self.kind.as_str() {
            "uri" => Term::uri(self.value),
            // Virtuoso reports "typed-literal" for typed literals
            "literal" | "typed-literal" => {
                if let Some(language) = self.language {
                    Term::lang_literal(self.value, language)
                } else if let Some(datatype) = self.datatype {
                    Term::typed_literal(self.value, datatype)
                } else {
                    Term::literal(self.value)
                }
            }
            other => Term::Other {
                kind: other.to_string(),
                value: self.value,
            },
        }
    }
}

/// A remote SPARQL-protocol endpoint client.
pub struct HttpClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpClient {
            endpoint: endpoint.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl SparqlClient for HttpClient {
    fn select(&self, query: &str) -> Result<Vec<Binding>> {
        debug!("select against {}: {}", self.endpoint, query);
        let resp = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/sparql-results+json")
            .form(&[("query", query)])
            .send()?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "query against {} failed with status {}",
                self.endpoint,
                resp.status()
            ));
        }
        let results: SparqlJsonResults = resp.json()?;
        Ok(results
            .results
            .bindings
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(variable, term)| (variable, term.into_term()))
                    .collect()
            })
            .collect())
    }

    fn update(&self, statement: &str) -> Result<()> {
        debug!("update against {}: {}", self.endpoint, statement);
        let resp = self
            .client
            .post(&self.endpoint)
            .form(&[("update", statement)])
            .send()?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "update against {} failed with status {}",
                self.endpoint,
                resp.status()
            ));
        }
        Ok(())
    }
}
