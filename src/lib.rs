//! # Foundry - Nested Records from Flat Rows
//!
//! Rebuilds the nested shape of a one-to-many join from its flat, sorted
//! result rows in a single forward pass.
//!
//! ## Modules
//!
//! - **mapping**: Parse `column [AS target.path]` mapping specifications
//! - **nest**: Materialize rows into a full tree or stream one group at a time
//!
//! ## Quick Start
//!
//! ```rust
//! use foundry::{MappingSpec, Row};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mapping: MappingSpec =
//!     "cowGroupId, cowGroupName, cowId AS cows.cowId, cowName AS cows.cowName".parse()?;
//!
//! let rows = vec![
//!     Row::new().with("COWGROUPID", 1).with("COWGROUPNAME", "ROLLINGFIELD7")
//!         .with("COWID", 1000).with("COWNAME", "DAISY"),
//!     Row::new().with("COWGROUPID", 2).with("COWGROUPNAME", "SLAUGHTERHOUSE5")
//!         .with("COWID", 1001).with("COWNAME", "BUTTERCUP"),
//!     Row::new().with("COWGROUPID", 2).with("COWGROUPNAME", "SLAUGHTERHOUSE5")
//!         .with("COWID", 1002).with("COWNAME", "STEVE"),
//! ];
//!
//! let tree = mapping.collect_rows(rows)?;
//!
//! assert_eq!(tree.len(), 2);
//! assert_eq!(tree[1]["cows"], json!([
//!     {"cowId": 1001, "cowName": "BUTTERCUP"},
//!     {"cowId": 1002, "cowName": "STEVE"}
//! ]));
//! # Ok(())
//! # }
//! ```

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::io::{BufRead, Write};

mod observability;

pub mod error;
pub mod mapping;
pub mod nest;

// Re-export commonly used types for convenience
pub use error::{MappingError, NestError};
pub use mapping::{MappingEntry, MappingSpec};
pub use nest::{
    Collector, GroupEmitter, GroupSink, NestConfig, NestStats, Nester, Record, RecordExt,
    RecordWriter, Row,
};

/// Convert one JSON value into a row. Only objects are accepted.
pub fn row_from_json(value: Value) -> Result<Row> {
    match value {
        Value::Object(obj) => Ok(Row::from(obj)),
        Value::Array(_) => bail!("Expected a JSON object for a row, found an array"),
        other => bail!("Expected a JSON object for a row, found {}", other),
    }
}

/// Rows from newline-delimited JSON, one object per line. Blank lines are skipped.
pub fn ndjson_rows<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Row>> {
    reader
        .lines()
        .enumerate()
        .filter(|(_, line)| !matches!(line, Ok(l) if l.trim().is_empty()))
        .map(|(idx, line)| {
            let line = line.context("Failed to read line")?;
            let value: Value = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse JSON on line {}", idx + 1))?;
            row_from_json(value).with_context(|| format!("Invalid row on line {}", idx + 1))
        })
}

/// Main entry point: nest a newline-delimited JSON row stream.
///
/// Each top-level group is written as one JSON line as soon as it completes.
/// Returns the number of groups written.
pub fn nest_json<R: BufRead, W: Write>(
    reader: R,
    writer: &mut RecordWriter<W>,
    mapping: &MappingSpec,
) -> Result<usize> {
    let groups =
        mapping.for_each_group(ndjson_rows(reader), |group| writer.write_record(&group))?;
    writer.flush()?;
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_nest_json_streams_groups() {
        let row = |group: i64, name: &str, id: i64, cow: &str| {
            json!({"cowGroupId": group, "cowGroupName": name, "cowId": id, "cowName": cow})
        };
        // Blank lines between rows are skipped
        let input = format!(
            "{}\n\n{}\n{}\n",
            row(1, "ROLLINGFIELD7", 1000, "DAISY"),
            row(2, "SLAUGHTERHOUSE5", 1001, "BUTTERCUP"),
            row(2, "SLAUGHTERHOUSE5", 1002, "STEVE"),
        );
        let mapping = MappingSpec::parse(
            "cowGroupId, cowGroupName, cowId AS cows.cowId, cowName AS cows.cowName",
        )
        .unwrap();

        let mut buffer = Vec::new();
        let mut writer = RecordWriter::new(&mut buffer);
        let groups = nest_json(Cursor::new(input), &mut writer, &mapping).unwrap();
        assert_eq!(groups, 2);

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(
            lines[1],
            json!({"cowGroupId": 2, "cowGroupName": "SLAUGHTERHOUSE5", "cows": [
                {"cowId": 1001, "cowName": "BUTTERCUP"},
                {"cowId": 1002, "cowName": "STEVE"}
            ]})
        );
    }

    #[test]
    fn test_nest_json_rejects_non_object_rows() {
        let mapping = MappingSpec::parse("a").unwrap();
        let mut writer = RecordWriter::new(Vec::new());

        let input = Cursor::new("{\"a\": 1}\n[1, 2]\n");
        let err = nest_json(input, &mut writer, &mapping).unwrap_err();

        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_row_from_json() {
        let row = row_from_json(json!({"Id": 1})).unwrap();
        assert_eq!(row.get("ID"), 1);
        assert!(row_from_json(json!("scalar")).is_err());
    }
}
