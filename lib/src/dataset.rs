//! Dataset revisioning: minting a Dataset+Distribution record set for a
//! staging graph, snapshotting the staged content, and deprecating the
//! prior published revision for the same subject.

use crate::config::Config;
use crate::consts::*;
use crate::snapshot::SnapshotStore;
use crate::store::SparqlClient;
use crate::term::{Term, Triple};
use crate::transfer::TransferEngine;
use crate::util::{datetime_literal, mint_resource};
use anyhow::{anyhow, Result};
use chrono::prelude::*;
use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Attachment,
    Snapshot,
    Generic,
}

impl DistributionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionKind::Attachment => "attachment",
            DistributionKind::Snapshot => "snapshot",
            DistributionKind::Generic => "generic",
        }
    }
}

/// One downloadable/describable artifact belonging to a Dataset.
#[derive(Debug, Clone)]
pub struct Distribution {
    pub uri: String,
    pub uuid: String,
    pub kind: DistributionKind,
    pub download_url: Option<String>,
    pub byte_size: Option<u64>,
    pub format: Option<String>,
    pub title: Option<String>,
    pub modified: DateTime<Utc>,
}

/// A published, versioned bundle of metadata describing one release.
/// Never deleted once published, only deprecated via the revision chain.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub uri: String,
    pub uuid: String,
    pub subject: String,
    pub title: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub issued: DateTime<Utc>,
    pub revision_of: Option<String>,
    pub snapshot_file: String,
    pub distributions: Vec<Distribution>,
}

/// Drives the revisioning steps for one release, over a borrowed store
/// client. The snapshot directory comes from the configuration.
pub struct Revisioner<'a> {
    client: &'a dyn SparqlClient,
    config: &'a Config,
    snapshots: SnapshotStore,
}

impl<'a> Revisioner<'a> {
    pub fn new(client: &'a dyn SparqlClient, config: &'a Config) -> Result<Self> {
        Ok(Revisioner {
            client,
            config,
            snapshots: SnapshotStore::new(&config.snapshot_dir)?,
        })
    }

    fn engine(&self) -> TransferEngine<'_> {
        TransferEngine::new(self.client, self.config.page_size, self.config.batch_size)
    }

    /// Allocates a new Dataset identity for the staging graph: snapshots the
    /// staged domain content, then inserts the Dataset's descriptive triples
    /// and one Distribution per attachment-like resource plus one for the
    /// snapshot file itself. All records are written into the staging graph
    /// so they publish atomically with the content they describe.
    pub fn prepare(&self, staging_graph: &str) -> Result<Dataset> {
        let engine = self.engine();
        let (subject, title) = self.find_subject(staging_graph)?;
        let now = Utc::now();
        let (uri, uuid) = mint_resource(&self.config.resource_base_uri, "datasets");
        info!("preparing dataset {} for subject {}", uri, subject);

        // Snapshot the staged content before any catalog records exist in the
        // graph. The snapshot is what deprecation later deletes from the
        // public graph, and published Dataset records must survive that.
        let snapshot_file = format!("dataset-{}.nt", uuid);
        let domain_triples = engine.fetch_all(staging_graph)?;
        let snapshot_size = self.snapshots.write(&snapshot_file, &domain_triples)?;

        let mut dataset = Dataset {
            uri,
            uuid,
            subject,
            title,
            created: now,
            modified: now,
            issued: now,
            revision_of: None,
            snapshot_file: snapshot_file.clone(),
            distributions: Vec::new(),
        };

        for attachment in self.find_attachments(staging_graph)? {
            dataset.distributions.push(attachment);
        }
        let (snap_uri, snap_uuid) = mint_resource(&self.config.resource_base_uri, "distributions");
        dataset.distributions.push(Distribution {
            uri: snap_uri,
            uuid: snap_uuid,
            kind: DistributionKind::Snapshot,
            download_url: Some(format!(
                "{}{}",
                self.config.snapshot_base_url, snapshot_file
            )),
            byte_size: Some(snapshot_size),
            format: Some(SNAPSHOT_FORMAT.to_string()),
            title: Some(snapshot_file),
            modified: now,
        });

        let mut records = dataset_triples(&dataset);
        for distribution in &dataset.distributions {
            records.extend(distribution_triples(&dataset.uri, distribution));
        }
        engine.insert_batch(&records, staging_graph)?;
        Ok(dataset)
    }

    /// Locates the current head of the revision chain for the dataset's
    /// subject in the public graph and deprecates it: links the new Dataset
    /// `prov:wasRevisionOf` the previous one, strips the previous
    /// distributions' download URLs, bumps modification timestamps, and
    /// deletes exactly the triple set recorded in the previous snapshot from
    /// the public graph. Returns the deprecated Dataset URI, if any.
    pub fn deprecate_previous(
        &self,
        dataset: &mut Dataset,
        staging_graph: &str,
    ) -> Result<Option<String>> {
        let engine = self.engine();
        let public = &self.config.public_graph;
        let query = format!(
            "SELECT ?prev ?snapshot WHERE {{ GRAPH <{}> {{ \
             ?prev <{}> <{}> ; <{}> <{}> . \
             OPTIONAL {{ ?prev <{}> ?snapshot }} \
             FILTER NOT EXISTS {{ ?newer <{}> ?prev }} \
             }} }} LIMIT 1",
            public,
            RDF_TYPE,
            DCAT_DATASET,
            DCT_SUBJECT,
            dataset.subject,
            GP_SNAPSHOT_FILE,
            PROV_WAS_REVISION_OF,
        );
        let rows = self.client.select(&query)?;
        let row = match rows.first() {
            Some(row) => row,
            None => {
                info!("no previous dataset for subject {}", dataset.subject);
                return Ok(None);
            }
        };
        let previous = row
            .get("prev")
            .ok_or_else(|| anyhow!("head-of-chain query returned no ?prev"))?
            .value()
            .to_string();
        info!("deprecating previous dataset {}", previous);

        // The revision link rides along in the staging graph so it becomes
        // visible together with the rest of the new Dataset's records.
        engine.insert_batch(
            &[Triple::new(
                dataset.uri.clone(),
                PROV_WAS_REVISION_OF,
                Term::uri(previous.clone()),
            )],
            staging_graph,
        )?;
        dataset.revision_of = Some(previous.clone());

        let now = datetime_literal(&Utc::now());
        // Clear download URLs: the deprecated content becomes unreachable
        // while the distributions' provenance metadata stays in place.
        self.client.update(&format!(
            "DELETE {{ GRAPH <{g}> {{ ?dist <{url}> ?u . ?dist <{modified}> ?m }} }} \
             INSERT {{ GRAPH <{g}> {{ ?dist <{modified}> {now} }} }} \
             WHERE {{ GRAPH <{g}> {{ <{prev}> <{dist_link}> ?dist . \
             OPTIONAL {{ ?dist <{url}> ?u }} OPTIONAL {{ ?dist <{modified}> ?m }} }} }}",
            g = public,
            url = DCAT_DOWNLOAD_URL,
            modified = DCT_MODIFIED,
            now = now.to_sparql(),
            prev = previous,
            dist_link = DCAT_DISTRIBUTION,
        ))?;
        self.client.update(&format!(
            "DELETE {{ GRAPH <{g}> {{ <{prev}> <{modified}> ?m }} }} \
             INSERT {{ GRAPH <{g}> {{ <{prev}> <{modified}> {now} }} }} \
             WHERE {{ GRAPH <{g}> {{ OPTIONAL {{ <{prev}> <{modified}> ?m }} }} }}",
            g = public,
            modified = DCT_MODIFIED,
            now = now.to_sparql(),
            prev = previous,
        ))?;

        // Remove exactly the triples the previous release recorded. A live
        // diff against the current graph could delete triples the
        // superseding dataset also contributes; the snapshot cannot.
        match row.get("snapshot") {
            Some(snapshot) => {
                let recorded = self.snapshots.read(snapshot.value())?;
                info!(
                    "removing {} snapshot triples of {} from {}",
                    recorded.len(),
                    previous,
                    public
                );
                engine.delete_batch(&recorded, public)?;
            }
            None => {
                warn!(
                    "previous dataset {} has no recorded snapshot; leaving its triples in place",
                    previous
                );
            }
        }
        Ok(Some(previous))
    }

    /// Publishes the staging graph into the public graph. By this point every
    /// distribution and the snapshot export are fully prepared, so no
    /// consumer can observe a partially described dataset.
    pub fn release(&self, staging_graph: &str) -> Result<usize> {
        self.engine()
            .move_graph(staging_graph, &self.config.public_graph)
    }

    /// The one entity of `subject_class` a staging graph describes. More
    /// than one instance is a malformed staging graph, not a choice to make.
    fn find_subject(&self, staging_graph: &str) -> Result<(String, Option<String>)> {
        let query = format!(
            "SELECT ?s ?title WHERE {{ GRAPH <{}> {{ ?s <{}> <{}> . \
             OPTIONAL {{ ?s <{}> ?title }} }} }}",
            staging_graph, RDF_TYPE, self.config.subject_class, DCT_TITLE,
        );
        let rows = self.client.select(&query)?;
        let row = rows.first().ok_or_else(|| {
            anyhow!(
                "no subject entity of class {} in staging graph {}",
                self.config.subject_class,
                staging_graph
            )
        })?;
        let subject = row
            .get("s")
            .ok_or_else(|| anyhow!("subject query returned no ?s"))?
            .value()
            .to_string();
        let others: std::collections::HashSet<&str> = rows
            .iter()
            .filter_map(|r| r.get("s"))
            .map(|s| s.value())
            .filter(|s| *s != subject)
            .collect();
        if !others.is_empty() {
            return Err(anyhow!(
                "staging graph {} holds {} entities of class {}; expected exactly one",
                staging_graph,
                others.len() + 1,
                self.config.subject_class
            ));
        }
        let title = rows
            .iter()
            .find_map(|r| r.get("title"))
            .map(|t| t.value().to_string());
        Ok((subject, title))
    }

    fn find_attachments(&self, staging_graph: &str) -> Result<Vec<Distribution>> {
        let query = format!(
            "SELECT ?att ?size ?format ?title WHERE {{ GRAPH <{}> {{ \
             ?att <{}> <{}> . \
             OPTIONAL {{ ?att <{}> ?size }} \
             OPTIONAL {{ ?att <{}> ?format }} \
             OPTIONAL {{ ?att <{}> ?title }} \
             }} }}",
            staging_graph,
            RDF_TYPE,
            self.config.attachment_class,
            NFO_FILE_SIZE,
            DCT_FORMAT,
            NFO_FILE_NAME,
        );
        let now = Utc::now();
        let mut distributions = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for row in self.client.select(&query)? {
            let attachment = match row.get("att") {
                Some(term) => term.value().to_string(),
                None => continue,
            };
            // multi-valued optionals yield one row per combination
            if !seen.insert(attachment.clone()) {
                continue;
            }
            let (uri, uuid) = mint_resource(&self.config.resource_base_uri, "distributions");
            distributions.push(Distribution {
                uri,
                uuid,
                kind: DistributionKind::Attachment,
                download_url: Some(attachment),
                byte_size: row.get("size").and_then(|t| t.value().parse().ok()),
                format: row.get("format").map(|t| t.value().to_string()),
                title: row.get("title").map(|t| t.value().to_string()),
                modified: now,
            });
        }
        Ok(distributions)
    }
}

fn dataset_triples(dataset: &Dataset) -> Vec<Triple> {
    let mut triples = vec![
        Triple::new(dataset.uri.clone(), RDF_TYPE, Term::uri(DCAT_DATASET)),
        Triple::new(
            dataset.uri.clone(),
            DCT_IDENTIFIER,
            Term::literal(dataset.uuid.clone()),
        ),
        Triple::new(
            dataset.uri.clone(),
            DCT_SUBJECT,
            Term::uri(dataset.subject.clone()),
        ),
        Triple::new(
            dataset.uri.clone(),
            DCT_CREATED,
            datetime_literal(&dataset.created),
        ),
        Triple::new(
            dataset.uri.clone(),
            DCT_MODIFIED,
            datetime_literal(&dataset.modified),
        ),
        Triple::new(
            dataset.uri.clone(),
            DCT_ISSUED,
            datetime_literal(&dataset.issued),
        ),
        Triple::new(
            dataset.uri.clone(),
            GP_SNAPSHOT_FILE,
            Term::literal(dataset.snapshot_file.clone()),
        ),
    ];
    if let Some(title) = &dataset.title {
        triples.push(Triple::new(
            dataset.uri.clone(),
            DCT_TITLE,
            Term::literal(title.clone()),
        ));
    }
    triples
}

fn distribution_triples(dataset_uri: &str, distribution: &Distribution) -> Vec<Triple> {
    let mut triples = vec![
        Triple::new(
            dataset_uri,
            DCAT_DISTRIBUTION,
            Term::uri(distribution.uri.clone()),
        ),
        Triple::new(
            distribution.uri.clone(),
            RDF_TYPE,
            Term::uri(DCAT_DISTRIBUTION_CLASS),
        ),
        Triple::new(
            distribution.uri.clone(),
            DCT_IDENTIFIER,
            Term::literal(distribution.uuid.clone()),
        ),
        Triple::new(
            distribution.uri.clone(),
            DCT_TYPE,
            Term::literal(distribution.kind.as_str()),
        ),
        Triple::new(
            distribution.uri.clone(),
            DCT_MODIFIED,
            datetime_literal(&distribution.modified),
        ),
    ];
    if let Some(url) = &distribution.download_url {
        triples.push(Triple::new(
            distribution.uri.clone(),
            DCAT_DOWNLOAD_URL,
            Term::uri(url.clone()),
        ));
    }
    if let Some(size) = distribution.byte_size {
        triples.push(Triple::new(
            distribution.uri.clone(),
            DCAT_BYTE_SIZE,
            Term::typed_literal(size.to_string(), XSD_INTEGER),
        ));
    }
    if let Some(format) = &distribution.format {
        triples.push(Triple::new(
            distribution.uri.clone(),
            DCT_FORMAT,
            Term::literal(format.clone()),
        ));
    }
    if let Some(title) = &distribution.title {
        triples.push(Triple::new(
            distribution.uri.clone(),
            DCT_TITLE,
            Term::literal(title.clone()),
        ));
    }
    triples
}
