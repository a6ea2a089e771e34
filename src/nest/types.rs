use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A materialized record: scalar fields plus level lists of child records.
///
/// Child lists are stored as `Value::Array` of `Value::Object`, so a finished
/// tree serializes with serde_json as-is.
pub type Record = Map<String, Value>;

/// Level-list operations on a [`Record`].
pub trait RecordExt {
    /// The last child record in the `level` list, if the list exists and is not empty.
    fn last_child(&self, level: &str) -> Option<&Record>;

    /// Mutable access to the last child record in the `level` list.
    fn last_child_mut(&mut self, level: &str) -> Option<&mut Record>;

    /// Mutable access to the `level` list itself.
    fn children_mut(&mut self, level: &str) -> Option<&mut Vec<Value>>;

    /// Enter the `level` list, creating it with one fresh child on first entry,
    /// and return its last child.
    ///
    /// Returns `None` when the field exists but is not a list of records.
    fn open_child(&mut self, level: &str) -> Option<&mut Record>;
}

impl RecordExt for Record {
    fn last_child(&self, level: &str) -> Option<&Record> {
        self.get(level)?.as_array()?.last()?.as_object()
    }

    fn last_child_mut(&mut self, level: &str) -> Option<&mut Record> {
        self.get_mut(level)?.as_array_mut()?.last_mut()?.as_object_mut()
    }

    fn children_mut(&mut self, level: &str) -> Option<&mut Vec<Value>> {
        self.get_mut(level)?.as_array_mut()
    }

    fn open_child(&mut self, level: &str) -> Option<&mut Record> {
        self.entry(level.to_string())
            .or_insert_with(|| Value::Array(vec![Value::Object(Map::new())]))
            .as_array_mut()?
            .last_mut()?
            .as_object_mut()
    }
}

/// One flat input row. Column lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Row::default()
    }

    /// Set a column value, replacing any value stored under the same name in any case.
    pub fn insert(&mut self, column: impl AsRef<str>, value: impl Into<Value>) -> Option<Value> {
        self.columns.insert(column.as_ref().to_uppercase(), value.into())
    }

    pub fn with(mut self, column: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Value of `column`. Absent columns read as null.
    pub fn get(&self, column: &str) -> &Value {
        self.get_upper(&column.to_uppercase())
    }

    /// Lookup for a column name that is already uppercased
    pub(crate) fn get_upper(&self, upper: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.columns.get(upper).unwrap_or(&NULL)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(&column.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl From<Map<String, Value>> for Row {
    fn from(obj: Map<String, Value>) -> Self {
        obj.into_iter().collect()
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

/// Configuration for mapping parsing and materialization
#[derive(Debug, Clone)]
pub struct NestConfig {
    /// Separator between segments of a target path
    pub path_separator: String,

    /// Separator between mapping entries
    pub entry_separator: String,

    /// Keyword introducing a target path (matched case-insensitively)
    pub alias_keyword: String,

    /// Skip a row whose mapped values all equal the last materialized row
    pub skip_duplicates: bool,

    /// Fail when a group that owns child lists reappears after it was closed.
    /// Costs one remembered key per group opened under the current parent;
    /// top-level keys are only kept when the sink retains every group.
    pub detect_unsorted: bool,
}

impl Default for NestConfig {
    fn default() -> Self {
        NestConfig {
            path_separator: String::from("."),
            entry_separator: String::from(","),
            alias_keyword: String::from("AS"),
            skip_duplicates: true,
            detect_unsorted: true,
        }
    }
}

/// Counters for one extraction run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestStats {
    /// Rows consumed, including skipped duplicates
    pub rows: u64,

    /// Records created at any depth
    pub records: u64,

    /// Rows skipped as exact duplicates of the previous row
    pub duplicates: u64,

    /// Top-level groups opened
    pub groups: u64,
}
