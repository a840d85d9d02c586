//! Snapshot file I/O: immutable N-Triples exports of a graph at release
//! time, read back verbatim for deprecation-time triple removal.

use crate::term::Triple;
use anyhow::Result;
use log::{debug, info};
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::Triple as OxTriple;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Writes and reads snapshot artifacts under a single directory. File
/// identity is stable for the life of a Dataset; a written snapshot is
/// never rewritten.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(SnapshotStore { dir })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Serializes the triples to `name` and returns the byte size of the
    /// file actually written.
    pub fn write(&self, name: &str, triples: &[Triple]) -> Result<u64> {
        let path = self.path(name);
        info!("writing snapshot {} with {} triples", path.display(), triples.len());
        let mut file = File::create(&path)?;
        let mut serializer =
            RdfSerializer::from_format(RdfFormat::NTriples).for_writer(&mut file);
        for triple in triples {
            let ox: OxTriple = triple.to_oxigraph()?;
            serializer.serialize_triple(&ox)?;
        }
        serializer.finish()?;
        Ok(std::fs::metadata(&path)?.len())
    }

    /// Parses a snapshot back into the exact triple set that was recorded.
    pub fn read(&self, name: &str) -> Result<Vec<Triple>> {
        let path = self.path(name);
        debug!("reading snapshot {}", path.display());
        read_ntriples(&path)
    }
}

fn read_ntriples(path: &Path) -> Result<Vec<Triple>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let parser = RdfParser::from_format(RdfFormat::NTriples).for_reader(reader);
    let mut triples = Vec::new();
    for quad in parser {
        let quad = quad?;
        let ox = OxTriple::new(quad.subject, quad.predicate, quad.object);
        triples.push(Triple::from_oxigraph(&ox)?);
    }
    Ok(triples)
}
