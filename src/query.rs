//! Query-response model and normalization.
//!
//! The server answers a query with one result set per semicolon-separated
//! statement, each holding zero or more columnar series:
//!
//! ```json
//! { "results": [ { "series": [ { "columns": [...], "values": [[...]] } ] } ] }
//! ```
//!
//! [`QueryResponse::records`] flattens the first series into row-oriented
//! records; [`QueryResponse::series`] hands back the raw series untouched.
//! Both are pure and usable on any decoded response, including the ones
//! returned by [`Client::execute`](crate::Client::execute).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row normalized into a column-name to value mapping.
pub type Record = serde_json::Map<String, Value>;

/// The decoded body of one query execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// One result set per statement in the query.
    #[serde(default)]
    pub results: Vec<StatementResult>,
    /// Set when the server accepted the request but rejected the query
    /// itself, e.g. a malformed statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The result set of a single statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    /// Series grouped by measurement and, under `GROUP BY`, by tag set.
    /// Absent for an empty result set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<Series>>,
    /// Statement-level failure, e.g. querying a measurement that does not
    /// exist with certain statements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One columnar result group: ordered column names plus row arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Measurement name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Group tags when the statement used `GROUP BY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    /// Ordered column names.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Ordered rows; each value may be a number, string, boolean, or null.
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl QueryResponse {
    /// Normalize the first series of the first result into one [`Record`]
    /// per row, zipping `columns[i]` with `row[i]` and preserving row order.
    ///
    /// An empty result set, or a series without columns, yields an empty
    /// sequence. Multi-series results (e.g. from `GROUP BY`) are not merged;
    /// only the first group is exposed.
    pub fn records(&self) -> Vec<Record> {
        let Some(series) = self.series() else {
            return Vec::new();
        };
        if series.columns.is_empty() {
            return Vec::new();
        }
        series
            .values
            .iter()
            .map(|row| {
                series
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// The raw first series of the first result, unchanged, if any.
    pub fn series(&self) -> Option<&Series> {
        self.results.first()?.series.as_ref()?.first()
    }

    /// Consuming variant of [`series`](Self::series).
    pub fn into_series(self) -> Option<Series> {
        self.results.into_iter().next()?.series?.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(value: Value) -> QueryResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_result_set_yields_no_records() {
        let response = decode(json!({"results": [{}]}));
        assert!(response.records().is_empty());
        assert!(response.series().is_none());
    }

    #[test]
    fn missing_results_yield_no_records() {
        let response = decode(json!({"results": []}));
        assert!(response.records().is_empty());
        assert!(response.into_series().is_none());
    }

    #[test]
    fn rows_zip_into_records_in_order() {
        let response = decode(json!({
            "results": [{
                "series": [{
                    "name": "cpu",
                    "columns": ["time", "value"],
                    "values": [[1000, 0.5], [2000, 0.7]]
                }]
            }]
        }));

        let records = response.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("time"), Some(&json!(1000)));
        assert_eq!(records[0].get("value"), Some(&json!(0.5)));
        assert_eq!(records[1].get("time"), Some(&json!(2000)));
        assert_eq!(records[1].get("value"), Some(&json!(0.7)));
    }

    #[test]
    fn mixed_value_types_survive_normalization() {
        let response = decode(json!({
            "results": [{
                "series": [{
                    "columns": ["time", "host", "up", "note"],
                    "values": [[1000, "server1", true, null]]
                }]
            }]
        }));

        let records = response.records();
        assert_eq!(records[0].get("host"), Some(&json!("server1")));
        assert_eq!(records[0].get("up"), Some(&json!(true)));
        assert_eq!(records[0].get("note"), Some(&Value::Null));
    }

    #[test]
    fn raw_series_passes_through_unchanged() {
        let response = decode(json!({
            "results": [{
                "series": [{
                    "columns": ["time", "value"],
                    "values": [[1000, 0.5], [2000, 0.7]]
                }]
            }]
        }));

        let series = response.into_series().unwrap();
        assert_eq!(series.columns, vec!["time", "value"]);
        assert_eq!(
            series.values,
            vec![
                vec![json!(1000), json!(0.5)],
                vec![json!(2000), json!(0.7)],
            ]
        );
    }

    #[test]
    fn only_first_series_is_exposed() {
        let response = decode(json!({
            "results": [{
                "series": [
                    {
                        "tags": {"server": "server1"},
                        "columns": ["time", "value"],
                        "values": [[1000, 1.0]]
                    },
                    {
                        "tags": {"server": "server2"},
                        "columns": ["time", "value"],
                        "values": [[1000, 2.0]]
                    }
                ]
            }]
        }));

        let records = response.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("value"), Some(&json!(1.0)));
    }

    #[test]
    fn series_without_columns_yields_no_records() {
        let response = decode(json!({
            "results": [{"series": [{"values": [[1000, 0.5]]}]}]
        }));
        assert!(response.records().is_empty());
    }
}
