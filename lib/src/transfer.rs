//! Batch-bounded copy, delete and verification of triple sets across named
//! graphs. All store traffic goes through a `SparqlClient`; batches are
//! dispatched strictly sequentially to bound load on the backing store.

use crate::store::SparqlClient;
use crate::term::Triple;
use anyhow::{anyhow, Result};
use log::{debug, info, warn};

/// Moves or copies arbitrarily large triple sets between named graphs in
/// bounded batches, with a verification-and-repair pass as the correctness
/// backstop for the copy path.
pub struct TransferEngine<'a> {
    client: &'a dyn SparqlClient,
    page_size: usize,
    batch_size: usize,
}

impl<'a> TransferEngine<'a> {
    pub fn new(client: &'a dyn SparqlClient, page_size: usize, batch_size: usize) -> Self {
        TransferEngine {
            client,
            page_size: page_size.max(1),
            batch_size: batch_size.max(1),
        }
    }

    /// Number of triples in the graph; sizes the pagination loop.
    pub fn count(&self, graph: &str) -> Result<usize> {
        let query = format!(
            "SELECT (COUNT(*) AS ?count) WHERE {{ GRAPH <{}> {{ ?s ?p ?o }} }}",
            graph
        );
        self.scalar_count(&query)
    }

    fn scalar_count(&self, query: &str) -> Result<usize> {
        let rows = self.client.select(query)?;
        let count = rows
            .first()
            .and_then(|row| row.get("count"))
            .ok_or_else(|| anyhow!("count query returned no ?count: {}", query))?;
        Ok(count.value().parse()?)
    }

    /// Number of triples present in `source` but absent from `target`.
    pub fn missing_count(&self, source: &str, target: &str) -> Result<usize> {
        let query = format!(
            "SELECT (COUNT(*) AS ?count) WHERE {{ GRAPH <{}> {{ ?s ?p ?o }} \
             FILTER NOT EXISTS {{ GRAPH <{}> {{ ?s ?p ?o }} }} }}",
            source, target
        );
        self.scalar_count(&query)
    }

    /// Reads the full triple set of a graph through bounded paged reads.
    ///
    /// Pages are ordered by an explicit `?s ?p ?o` sort key so that
    /// pagination over the graph is stable; a graph that mutates between the
    /// initial count and a later page can still yield an inconsistent result,
    /// which the verification pass compensates for downstream.
    pub fn fetch_all(&self, graph: &str) -> Result<Vec<Triple>> {
        let total = self.count(graph)?;
        let mut triples = Vec::with_capacity(total);
        let mut offset = 0;
        while offset < total {
            let query = format!(
                "SELECT ?s ?p ?o WHERE {{ GRAPH <{}> {{ ?s ?p ?o }} }} \
                 ORDER BY ?s ?p ?o LIMIT {} OFFSET {}",
                graph, self.page_size, offset
            );
            let rows = self.client.select(&query)?;
            if rows.is_empty() {
                break;
            }
            for row in &rows {
                triples.push(Triple::from_binding(row)?);
            }
            offset += rows.len();
        }
        debug!("fetched {} triples from {}", triples.len(), graph);
        Ok(triples)
    }

    /// Inserts the triples into the graph, one bulk insert per chunk.
    pub fn insert_batch(&self, triples: &[Triple], graph: &str) -> Result<()> {
        for chunk in triples.chunks(self.batch_size) {
            let statements: Vec<String> = chunk.iter().map(|t| t.to_sparql()).collect();
            let update = format!(
                "INSERT DATA {{ GRAPH <{}> {{ {} }} }}",
                graph,
                statements.join(" ")
            );
            self.client.update(&update)?;
        }
        Ok(())
    }

    /// Deletes the triples from the graph, one bulk delete per chunk.
    pub fn delete_batch(&self, triples: &[Triple], graph: &str) -> Result<()> {
        for chunk in triples.chunks(self.batch_size) {
            let statements: Vec<String> = chunk.iter().map(|t| t.to_sparql()).collect();
            let update = format!(
                "DELETE DATA {{ GRAPH <{}> {{ {} }} }}",
                graph,
                statements.join(" ")
            );
            self.client.update(&update)?;
        }
        Ok(())
    }

    /// Empties the graph through repeated bounded deletes.
    ///
    /// The selection of remaining triples is re-evaluated each pass, so no
    /// offset tracking is needed; every delete shrinks the remaining set.
    pub fn delete_all(&self, graph: &str) -> Result<()> {
        loop {
            let query = format!(
                "SELECT ?s ?p ?o WHERE {{ GRAPH <{}> {{ ?s ?p ?o }} }} LIMIT {}",
                graph, self.batch_size
            );
            let rows = self.client.select(&query)?;
            if rows.is_empty() {
                return Ok(());
            }
            let triples: Vec<Triple> = rows
                .iter()
                .map(Triple::from_binding)
                .collect::<Result<_>>()?;
            self.delete_batch(&triples, graph)?;
        }
    }

    /// Copies triples present in `source` but absent from `target` until the
    /// set difference is empty. Compensates for pagination inconsistency or
    /// partial batch failure in the bulk copy step; the sole correctness
    /// backstop for the copy operation. Returns the number of repaired
    /// triples, zero when the difference is already empty.
    pub fn verify_and_repair(&self, source: &str, target: &str) -> Result<usize> {
        let mut missing = self.missing_count(source, target)?;
        if missing == 0 {
            return Ok(0);
        }
        warn!(
            "{} triples in {} are missing from {}; repairing",
            missing, source, target
        );
        let mut repaired = 0;
        while missing > 0 {
            let query = format!(
                "SELECT ?s ?p ?o WHERE {{ GRAPH <{}> {{ ?s ?p ?o }} \
                 FILTER NOT EXISTS {{ GRAPH <{}> {{ ?s ?p ?o }} }} }} LIMIT {}",
                source, target, self.batch_size
            );
            let rows = self.client.select(&query)?;
            if rows.is_empty() {
                return Err(anyhow!(
                    "verification stalled: {} triples remain missing from {} but none are selectable",
                    missing, target
                ));
            }
            let triples: Vec<Triple> = rows
                .iter()
                .map(Triple::from_binding)
                .collect::<Result<_>>()?;
            self.insert_batch(&triples, target)?;
            repaired += triples.len();
            let remaining = self.missing_count(source, target)?;
            if remaining >= missing {
                // Each copied batch must permanently shrink the difference.
                return Err(anyhow!(
                    "verification stalled: difference between {} and {} did not shrink",
                    source, target
                ));
            }
            missing = remaining;
        }
        info!("repaired {} triples in {}", repaired, target);
        Ok(repaired)
    }

    /// Moves every triple from `source` into `target` and empties `source`.
    /// Returns the number of triples moved.
    pub fn move_graph(&self, source: &str, target: &str) -> Result<usize> {
        let total = self.count(source)?;
        info!("moving {} triples from {} to {}", total, source, target);
        let triples = self.fetch_all(source)?;
        self.insert_batch(&triples, target)?;
        self.verify_and_repair(source, target)?;
        self.delete_all(source)?;
        Ok(total)
    }
}
