use std::path::Path;

use graphpub::config::Config;
use graphpub::queue::{ReleaseQueue, TaskStatus};
use graphpub::store::{OxigraphClient, SparqlClient};
use graphpub::term::Term;
use graphpub::transfer::TransferEngine;

const PUBLIC: &str = "http://example.com/graphs/public";
const STAGING1: &str = "http://example.com/graphs/staging1";
const STAGING2: &str = "http://example.com/graphs/staging2";
const MEETING: &str = "http://example.com/meetings/42";
const MEETING_CLASS: &str = "http://example.com/vocab#Meeting";
const ATTACHMENT: &str = "http://example.com/files/agenda";

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const DCAT_DATASET: &str = "http://www.w3.org/ns/dcat#Dataset";
const DCAT_DISTRIBUTION: &str = "http://www.w3.org/ns/dcat#distribution";
const DCAT_DOWNLOAD_URL: &str = "http://www.w3.org/ns/dcat#downloadURL";
const PROV_REVISION_OF: &str = "http://www.w3.org/ns/prov#wasRevisionOf";
const DCT_SUBJECT: &str = "http://purl.org/dc/terms/subject";
const NOTE: &str = "http://example.com/vocab#note";

fn test_config(snapshot_dir: &Path) -> Config {
    let mut config = Config::default();
    config.public_graph = PUBLIC.to_string();
    config.tasks_graph = "http://example.com/graphs/tasks".to_string();
    config.snapshot_dir = snapshot_dir.to_path_buf();
    config.subject_class = MEETING_CLASS.to_string();
    config.attachment_class = "http://example.com/vocab#Attachment".to_string();
    config.page_size = 100;
    config.batch_size = 10;
    config
}

fn seed_first_release(client: &dyn SparqlClient) {
    client
        .update(&format!(
            "INSERT DATA {{ GRAPH <{g}> {{ \
             <{m}> <{t}> <{c}> . \
             <{m}> <http://purl.org/dc/terms/title> \"Meeting forty-two\" . \
             <{m}> <{note}> \"old notes\" . \
             <{a}> <{t}> <http://example.com/vocab#Attachment> . \
             <{a}> <http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#fileSize> \"1234\"^^<http://www.w3.org/2001/XMLSchema#integer> . \
             <{a}> <http://purl.org/dc/terms/format> \"application/pdf\" . \
             <{a}> <http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#fileName> \"agenda.pdf\" \
             }} }}",
            g = STAGING1,
            m = MEETING,
            t = RDF_TYPE,
            c = MEETING_CLASS,
            note = NOTE,
            a = ATTACHMENT,
        ))
        .expect("seed first staging graph");
}

fn seed_second_release(client: &dyn SparqlClient) {
    // overlaps with the first release on the meeting's type triple
    client
        .update(&format!(
            "INSERT DATA {{ GRAPH <{g}> {{ \
             <{m}> <{t}> <{c}> . \
             <{m}> <{note}> \"new notes\" \
             }} }}",
            g = STAGING2,
            m = MEETING,
            t = RDF_TYPE,
            c = MEETING_CLASS,
            note = NOTE,
        ))
        .expect("seed second staging graph");
}

fn select(client: &dyn SparqlClient, query: &str) -> Vec<graphpub::term::Binding> {
    client.select(query).expect("select")
}

#[test]
fn test_release_publishes_dataset_with_distributions() {
    let dir = tempfile::tempdir().unwrap();
    let client = OxigraphClient::new().unwrap();
    let config = test_config(dir.path());
    let mut queue = ReleaseQueue::new(Box::new(client.clone()), config.clone());

    seed_first_release(&client);
    queue.enqueue(STAGING1).unwrap();
    assert_eq!(queue.run_pending().unwrap(), 1);
    assert_eq!(queue.tasks().unwrap()[0].status, TaskStatus::Success);

    // the staging graph was consumed
    let engine = TransferEngine::new(&client, 100, 10);
    assert_eq!(engine.count(STAGING1).unwrap(), 0);

    // one dataset for the meeting, carrying the staged title
    let datasets = select(
        &client,
        &format!(
            "SELECT ?ds ?title WHERE {{ GRAPH <{g}> {{ \
             ?ds <{t}> <{dcat}> ; <{subj}> <{m}> ; \
             <http://purl.org/dc/terms/title> ?title }} }}",
            g = PUBLIC,
            t = RDF_TYPE,
            dcat = DCAT_DATASET,
            subj = DCT_SUBJECT,
            m = MEETING,
        ),
    );
    assert_eq!(datasets.len(), 1);
    assert_eq!(
        datasets[0].get("title"),
        Some(&Term::literal("Meeting forty-two"))
    );
    let dataset_uri = datasets[0].get("ds").unwrap().value().to_string();

    // one distribution per attachment plus one for the snapshot export
    let distributions = select(
        &client,
        &format!(
            "SELECT ?dist ?kind ?url ?format WHERE {{ GRAPH <{g}> {{ \
             <{ds}> <{link}> ?dist . \
             ?dist <http://purl.org/dc/terms/type> ?kind . \
             OPTIONAL {{ ?dist <{url}> ?url }} \
             OPTIONAL {{ ?dist <http://purl.org/dc/terms/format> ?format }} \
             }} }}",
            g = PUBLIC,
            ds = dataset_uri,
            link = DCAT_DISTRIBUTION,
            url = DCAT_DOWNLOAD_URL,
        ),
    );
    assert_eq!(distributions.len(), 2);
    let attachment = distributions
        .iter()
        .find(|d| d.get("kind") == Some(&Term::literal("attachment")))
        .expect("attachment distribution");
    assert_eq!(attachment.get("url"), Some(&Term::uri(ATTACHMENT)));
    assert_eq!(
        attachment.get("format"),
        Some(&Term::literal("application/pdf"))
    );
    let snapshot = distributions
        .iter()
        .find(|d| d.get("kind") == Some(&Term::literal("snapshot")))
        .expect("snapshot distribution");
    assert_eq!(
        snapshot.get("format"),
        Some(&Term::literal("application/n-triples"))
    );

    // the snapshot artifact itself was written
    let files = select(
        &client,
        &format!(
            "SELECT ?file WHERE {{ GRAPH <{g}> {{ <{ds}> \
             <http://data.graphpub.dev/vocab#snapshotFile> ?file }} }}",
            g = PUBLIC,
            ds = dataset_uri,
        ),
    );
    assert_eq!(files.len(), 1);
    let path = dir.path().join(files[0].get("file").unwrap().value());
    assert!(path.exists());
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}

#[test]
fn test_staging_graph_with_two_subjects_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let client = OxigraphClient::new().unwrap();
    let config = test_config(dir.path());

    // two meeting entities in one staging graph is malformed input
    seed_first_release(&client);
    client
        .update(&format!(
            "INSERT DATA {{ GRAPH <{g}> {{ \
             <http://example.com/meetings/43> <{t}> <{c}> }} }}",
            g = STAGING1,
            t = RDF_TYPE,
            c = MEETING_CLASS,
        ))
        .unwrap();

    let revisioner = graphpub::dataset::Revisioner::new(&client, &config).unwrap();
    let err = revisioner.prepare(STAGING1).unwrap_err();
    assert!(err.to_string().contains("expected exactly one"));

    // the task route contains the same failure instead of guessing a subject
    let mut queue = ReleaseQueue::new(Box::new(client.clone()), config);
    queue.enqueue(STAGING1).unwrap();
    assert_eq!(queue.run_pending().unwrap(), 1);
    assert_eq!(queue.tasks().unwrap()[0].status, TaskStatus::Failed);
}

#[test]
fn test_new_release_deprecates_previous_dataset_precisely() {
    let dir = tempfile::tempdir().unwrap();
    let client = OxigraphClient::new().unwrap();
    let config = test_config(dir.path());
    let mut queue = ReleaseQueue::new(Box::new(client.clone()), config.clone());

    seed_first_release(&client);
    queue.enqueue(STAGING1).unwrap();
    assert_eq!(queue.run_pending().unwrap(), 1);

    seed_second_release(&client);
    queue.enqueue(STAGING2).unwrap();
    assert_eq!(queue.run_pending().unwrap(), 1);

    // the new dataset revises the old one; both records remain published
    let chain = select(
        &client,
        &format!(
            "SELECT ?new ?old WHERE {{ GRAPH <{g}> {{ \
             ?new <{rev}> ?old . ?old <{t}> <{dcat}> . ?new <{t}> <{dcat}> }} }}",
            g = PUBLIC,
            rev = PROV_REVISION_OF,
            t = RDF_TYPE,
            dcat = DCAT_DATASET,
        ),
    );
    assert_eq!(chain.len(), 1);
    let old_dataset = chain[0].get("old").unwrap().value().to_string();

    // the deprecated distributions lost their download URLs
    let urls = select(
        &client,
        &format!(
            "SELECT ?url WHERE {{ GRAPH <{g}> {{ \
             <{old}> <{link}> ?dist . ?dist <{url_p}> ?url }} }}",
            g = PUBLIC,
            old = old_dataset,
            link = DCAT_DISTRIBUTION,
            url_p = DCAT_DOWNLOAD_URL,
        ),
    );
    assert!(urls.is_empty());

    // exactly the first snapshot's triples were removed: the superseded
    // notes are gone, the overlapping type triple and the new notes remain
    let notes = select(
        &client,
        &format!(
            "SELECT ?note WHERE {{ GRAPH <{g}> {{ <{m}> <{p}> ?note }} }}",
            g = PUBLIC,
            m = MEETING,
            p = NOTE,
        ),
    );
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].get("note"), Some(&Term::literal("new notes")));
    let typed = select(
        &client,
        &format!(
            "SELECT ?m WHERE {{ GRAPH <{g}> {{ <{m}> <{t}> <{c}> }} BIND(<{m}> AS ?m) }}",
            g = PUBLIC,
            m = MEETING,
            t = RDF_TYPE,
            c = MEETING_CLASS,
        ),
    );
    assert_eq!(typed.len(), 1);

    // the old attachment's staged metadata was part of the old snapshot
    let old_attachment = select(
        &client,
        &format!(
            "SELECT ?p ?o WHERE {{ GRAPH <{g}> {{ <{a}> ?p ?o }} }}",
            g = PUBLIC,
            a = ATTACHMENT,
        ),
    );
    assert!(old_attachment.is_empty());
}
