// Record extraction and flattening
//
// The vendor owns the response schema and documents none of it, so nothing
// here hardcodes a record layout. A RecordPath locates the array(s) of
// record objects inside the payload, and the column set is discovered from
// the records themselves unless the caller pins an explicit field list.

use std::collections::HashSet;
use std::fmt;

use anyhow::{bail, Result};
use serde_json::{Map, Value};
use thiserror::Error;

/// One report record: field names mapped to values, in payload order.
pub type Record = Map<String, Value>;

/// Raised when the response does not have the shape the record path expects
///
/// Paths in messages are rendered from the root, e.g.
/// `$.data.parameters[1].values`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("expected an object at `{0}`")]
    ExpectedObject(String),

    #[error("missing key at `{0}`")]
    MissingKey(String),

    #[error("expected an array at `{0}`")]
    ExpectedArray(String),

    #[error("expected record objects at `{0}`")]
    ExpectedRecords(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    /// Descend into an object by key
    Key(String),

    /// `*`: fan out over every element of an intermediate array
    Each,
}

/// Dot-separated path locating record objects inside the response
///
/// `data.parameters.*.values` descends into `data`, then `parameters`,
/// visits every element of that array, and collects the records found in
/// each element's `values` array. An empty path means the payload itself
/// is the records array.
#[derive(Debug, Clone)]
pub struct RecordPath {
    raw: String,
    segments: Vec<Segment>,
}

impl RecordPath {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self {
                raw: String::new(),
                segments: Vec::new(),
            });
        }

        let mut segments = Vec::new();
        for part in trimmed.split('.') {
            match part {
                "" => bail!("record path `{raw}` has an empty segment"),
                "*" => segments.push(Segment::Each),
                key => segments.push(Segment::Key(key.to_string())),
            }
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// Collect every record the path points at, in payload order.
    ///
    /// An empty array at the end of the path is fine and yields zero
    /// records. Anything that contradicts the path (missing key, wrong
    /// type, non-object record) is a shape error.
    pub fn extract(&self, payload: &Value) -> Result<Vec<Record>, ShapeError> {
        let mut records = Vec::new();
        collect(payload, &self.segments, "$", &mut records)?;
        Ok(records)
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn collect(
    value: &Value,
    segments: &[Segment],
    at: &str,
    out: &mut Vec<Record>,
) -> Result<(), ShapeError> {
    let Some((segment, rest)) = segments.split_first() else {
        // End of the path: this must be the records array.
        let items = value
            .as_array()
            .ok_or_else(|| ShapeError::ExpectedArray(at.to_string()))?;
        for item in items {
            match item {
                Value::Object(map) => out.push(map.clone()),
                _ => return Err(ShapeError::ExpectedRecords(at.to_string())),
            }
        }
        return Ok(());
    };

    match segment {
        Segment::Key(key) => {
            let obj = value
                .as_object()
                .ok_or_else(|| ShapeError::ExpectedObject(at.to_string()))?;
            let child_at = format!("{at}.{key}");
            let child = obj
                .get(key)
                .ok_or_else(|| ShapeError::MissingKey(child_at.clone()))?;
            collect(child, rest, &child_at, out)
        }
        Segment::Each => {
            let items = value
                .as_array()
                .ok_or_else(|| ShapeError::ExpectedArray(at.to_string()))?;
            for (i, item) in items.iter().enumerate() {
                collect(item, rest, &format!("{at}[{i}]"), out)?;
            }
            Ok(())
        }
    }
}

/// Column set for a batch of records: union of field names, in the order
/// they first appear. Depends on serde_json's preserve_order so the header
/// follows the payload rather than alphabetizing it.
pub fn discover_columns(records: &[Record]) -> Vec<String> {
    let mut columns = Vec::new();
    let mut seen = HashSet::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key.clone()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Flatten one record into cells matching `columns`. Fields the record does
/// not have render as empty cells.
pub fn flatten_record(record: &Record, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|column| record.get(column).map(render_cell).unwrap_or_default())
        .collect()
}

/// Text form of one cell. Strings pass through unquoted; null becomes an
/// empty cell; nested structures fall back to compact JSON.
fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
