//! Result rows as streamed by the search backend.
//!
//! Both the export endpoint and the job results endpoint deliver a sequence
//! of JSON objects, one per row, optionally newline separated. The final row
//! is flagged with `lastrow`.

use crate::error::EventReaderError;
use serde::{Deserialize, Serialize};

/// One row of a search result stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Whether this is an intermediate preview row
    #[serde(default)]
    pub preview: bool,
    /// Position of the row in the result set
    #[serde(default)]
    pub offset: u64,
    /// Whether this is the last row of the stream
    #[serde(default)]
    pub lastrow: bool,
    /// The event fields, absent on pure control rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl ResultRow {
    /// Wrap an event payload as a final-result row.
    #[must_use]
    pub fn with_result(offset: u64, result: serde_json::Value) -> Self {
        Self {
            preview: false,
            offset,
            lastrow: false,
            result: Some(result),
        }
    }

    /// Event payload, if the row carries a non-empty one.
    #[must_use]
    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.result.as_ref().filter(|value| match value {
            serde_json::Value::Null => false,
            serde_json::Value::Object(map) => !map.is_empty(),
            _ => true,
        })
    }
}

/// Decode a row stream body, stopping after the row flagged `lastrow`.
///
/// # Errors
///
/// Returns [`EventReaderError::Decode`] if the body is not a sequence of
/// row objects.
pub fn decode_rows(body: &str) -> Result<Vec<ResultRow>, EventReaderError> {
    let mut rows = Vec::new();

    for row in serde_json::Deserializer::from_str(body).into_iter::<ResultRow>() {
        let row = row?;
        let last = row.lastrow;
        rows.push(row);
        if last {
            break;
        }
    }

    Ok(rows)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_newline_delimited_rows() {
        let body = concat!(
            r#"{"preview":false,"offset":0,"result":{"transaction_id":"tid_1"}}"#,
            "\n",
            r#"{"preview":false,"offset":1,"lastrow":true,"result":{"transaction_id":"tid_2"}}"#,
            "\n",
        );

        let rows = decode_rows(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].offset, 1);
        assert!(rows[1].lastrow);
    }

    #[test]
    fn stops_after_last_row() {
        let body = r#"{"offset":0,"lastrow":true}{"offset":1,"result":{"a":"b"}}"#;
        let rows = decode_rows(body).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn empty_body_yields_no_rows() {
        assert!(decode_rows("").unwrap().is_empty());
        assert!(decode_rows("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = decode_rows(r#"{"offset":0,"result":"#).unwrap_err();
        assert!(matches!(err, EventReaderError::Decode(_)));
    }

    #[test]
    fn payload_skips_empty_results() {
        assert!(ResultRow::default().payload().is_none());
        assert!(ResultRow::with_result(0, json!({})).payload().is_none());
        assert!(ResultRow::with_result(0, json!({"uuid": "x"})).payload().is_some());
    }
}
