//! Small shared helpers: timestamp literals and resource minting.

use crate::consts::XSD_DATETIME;
use crate::term::Term;
use chrono::prelude::*;
use chrono::SecondsFormat;
use uuid::Uuid;

/// Formats a timestamp as an `xsd:dateTime` literal. Microsecond precision
/// so that creation-order comparisons between task records are stable.
pub fn datetime_literal(dt: &DateTime<Utc>) -> Term {
    Term::typed_literal(
        dt.to_rfc3339_opts(SecondsFormat::Micros, true),
        XSD_DATETIME,
    )
}

/// Parses an `xsd:dateTime` literal value back into a timestamp.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Mints a fresh resource identity under the configured base URI.
/// Returns the full URI and the bare uuid.
pub fn mint_resource(base_uri: &str, kind: &str) -> (String, String) {
    let uuid = Uuid::new_v4().to_string();
    let base = base_uri.trim_end_matches('/');
    (format!("{}/{}/{}", base, kind, uuid), uuid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_literal_roundtrip() {
        let now = Utc::now();
        let lit = datetime_literal(&now);
        let parsed = parse_datetime(lit.value()).unwrap();
        // rfc3339 micros drops sub-microsecond precision
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_mint_resource_shape() {
        let (uri, uuid) = mint_resource("http://data.graphpub.dev/id/", "datasets");
        assert!(uri.starts_with("http://data.graphpub.dev/id/datasets/"));
        assert!(uri.ends_with(&uuid));
    }
}
