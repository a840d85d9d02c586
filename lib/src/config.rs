//! Defines the configuration structure for the release pipeline: store
//! endpoint, graph IRIs, snapshot locations and batch sizing.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// SPARQL endpoint used by the remote client.
    pub endpoint: String,
    /// Long-lived graph datasets are published into.
    pub public_graph: String,
    /// Graph holding the persisted release task records.
    pub tasks_graph: String,
    /// Directory snapshot files are written to.
    pub snapshot_dir: PathBuf,
    /// Public base URL under which snapshot files are served.
    pub snapshot_base_url: String,
    /// Base URI for minted Dataset and Distribution identities.
    pub resource_base_uri: String,
    /// Class of the entity a staging graph describes; the Dataset's subject
    /// link is derived from the one instance of this class.
    pub subject_class: String,
    /// Class of attachment-like resources that get their own Distribution.
    pub attachment_class: String,
    /// Page size for bounded paged reads.
    pub page_size: usize,
    /// Chunk size for bulk inserts and deletes.
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: "http://localhost:8890/sparql".to_string(),
            public_graph: "http://data.graphpub.dev/graphs/public".to_string(),
            tasks_graph: "http://data.graphpub.dev/graphs/release-tasks".to_string(),
            snapshot_dir: PathBuf::from("snapshots"),
            snapshot_base_url: "http://data.graphpub.dev/files/".to_string(),
            resource_base_uri: "http://data.graphpub.dev/id/".to_string(),
            subject_class: "http://www.w3.org/ns/prov#Entity".to_string(),
            attachment_class:
                "http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#FileDataObject"
                    .to_string(),
            page_size: 1000,
            batch_size: 10,
        }
    }
}

impl Config {
    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        let mut file = std::fs::File::create(file)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Prints out the current Config in a clear and readable way for command line output.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Endpoint: {}", self.endpoint);
        println!("  Public graph: {}", self.public_graph);
        println!("  Tasks graph: {}", self.tasks_graph);
        println!("  Snapshot dir: {}", self.snapshot_dir.display());
        println!("  Snapshot base URL: {}", self.snapshot_base_url);
        println!("  Resource base URI: {}", self.resource_base_uri);
        println!("  Subject class: {}", self.subject_class);
        println!("  Attachment class: {}", self.attachment_class);
        println!("  Page size: {}", self.page_size);
        println!("  Batch size: {}", self.batch_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphpub.json");
        let mut config = Config::default();
        config.page_size = 250;
        config.save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphpub.json");
        std::fs::write(&path, r#"{"endpoint": "http://db:8890/sparql"}"#).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.endpoint, "http://db:8890/sparql");
        assert_eq!(loaded.batch_size, Config::default().batch_size);
    }
}
