//! Defines constant IRIs for commonly used RDF terms and predicates,
//! primarily from RDF, XSD, DCAT, DCTERMS, PROV and NFO vocabularies,
//! plus the small graphpub application vocabulary.

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

// xsd
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

// dcat
pub const DCAT_DATASET: &str = "http://www.w3.org/ns/dcat#Dataset";
pub const DCAT_DISTRIBUTION_CLASS: &str = "http://www.w3.org/ns/dcat#Distribution";
pub const DCAT_DISTRIBUTION: &str = "http://www.w3.org/ns/dcat#distribution";
pub const DCAT_DOWNLOAD_URL: &str = "http://www.w3.org/ns/dcat#downloadURL";
pub const DCAT_BYTE_SIZE: &str = "http://www.w3.org/ns/dcat#byteSize";

// dcterms
pub const DCT_CREATED: &str = "http://purl.org/dc/terms/created";
pub const DCT_MODIFIED: &str = "http://purl.org/dc/terms/modified";
pub const DCT_ISSUED: &str = "http://purl.org/dc/terms/issued";
pub const DCT_TITLE: &str = "http://purl.org/dc/terms/title";
pub const DCT_SUBJECT: &str = "http://purl.org/dc/terms/subject";
pub const DCT_FORMAT: &str = "http://purl.org/dc/terms/format";
pub const DCT_IDENTIFIER: &str = "http://purl.org/dc/terms/identifier";
pub const DCT_TYPE: &str = "http://purl.org/dc/terms/type";

// prov
pub const PROV_WAS_REVISION_OF: &str = "http://www.w3.org/ns/prov#wasRevisionOf";

// nfo (attachment metadata carried over from staging content)
pub const NFO_FILE_SIZE: &str =
    "http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#fileSize";
pub const NFO_FILE_NAME: &str =
    "http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#fileName";

// adms
pub const ADMS_STATUS: &str = "http://www.w3.org/ns/adms#status";

// graphpub application vocabulary
pub const GP_RELEASE_TASK: &str = "http://data.graphpub.dev/vocab#ReleaseTask";
pub const GP_SOURCE_GRAPH: &str = "http://data.graphpub.dev/vocab#sourceGraph";
pub const GP_SNAPSHOT_FILE: &str = "http://data.graphpub.dev/vocab#snapshotFile";

// release task statuses
pub const STATUS_READY: &str = "http://data.graphpub.dev/statuses/ready";
pub const STATUS_RELEASING: &str = "http://data.graphpub.dev/statuses/releasing";
pub const STATUS_SUCCESS: &str = "http://data.graphpub.dev/statuses/success";
pub const STATUS_FAILED: &str = "http://data.graphpub.dev/statuses/failed";

/// Media type written into the snapshot Distribution record.
pub const SNAPSHOT_FORMAT: &str = "application/n-triples";
