use crate::error::NestError;
use crate::mapping::MappingSpec;
use crate::nest::sink::GroupSink;
use crate::nest::types::{NestStats, Record, RecordExt, Row};
use crate::observability::{log_debug, log_trace, log_warn};
use serde_json::Value;
use std::collections::HashSet;

static NULL: Value = Value::Null;

/// Streaming materializer for one run over a sorted row stream
///
/// Each pushed row is compared with the last materialized top-level record to
/// find the shallowest depth where a mapped value changed. A new record is
/// built at that depth and appended to the right edge of the tree. The sink
/// decides what happens to a top-level group once the next one opens.
pub struct Nester<'m, S: GroupSink> {
    mapping: &'m MappingSpec,
    sink: S,
    /// Top-level groups still held in memory; the last one is the open group
    open: Vec<Record>,
    /// Group keys already opened at each depth under the current parent
    opened_keys: Vec<HashSet<String>>,
    stats: NestStats,
}

impl<'m, S: GroupSink> Nester<'m, S> {
    pub fn new(mapping: &'m MappingSpec, sink: S) -> Self {
        Nester {
            mapping,
            sink,
            open: Vec::new(),
            opened_keys: vec![HashSet::new(); mapping.levels.len()],
            stats: NestStats::default(),
        }
    }

    /// Materialize one row
    pub fn push(&mut self, row: &Row) -> Result<(), S::Error> {
        self.stats.rows += 1;

        let level = match self.open.last() {
            None => 0,
            Some(last) => match Self::branch_level(self.mapping, last, row)? {
                Some(level) => level,
                None if self.mapping.config.skip_duplicates => {
                    self.stats.duplicates += 1;
                    log_trace!(
                        component = "nest",
                        event = "duplicate_row_skipped",
                        row = self.stats.rows,
                    );
                    return Ok(());
                }
                None => self.mapping.levels.len(),
            },
        };

        self.check_order(level, row)?;

        if level == 0 && !self.open.is_empty() {
            self.sink.group_closed(&mut self.open)?;
        }

        let record = Self::build_record(self.mapping, level, row)?;
        self.attach(level, record)?;
        Ok(())
    }

    /// Hand the remaining groups to the sink and produce its output
    pub fn finish(self) -> Result<S::Output, S::Error> {
        log_debug!(
            component = "nest",
            event = "extraction_finished",
            rows = self.stats.rows,
            records = self.stats.records,
            duplicates = self.stats.duplicates,
            groups = self.stats.groups,
        );
        self.sink.finish(self.open)
    }

    pub fn stats(&self) -> &NestStats {
        &self.stats
    }

    /// Number of top-level groups currently held in memory
    pub fn open_groups(&self) -> usize {
        self.open.len()
    }

    /// Shallowest depth at which `row` differs from the last materialized row.
    ///
    /// `None` means every mapped value is unchanged.
    fn branch_level(
        mapping: &MappingSpec,
        last: &Record,
        row: &Row,
    ) -> Result<Option<usize>, NestError> {
        let mut create_level = mapping.levels.len() + 1;

        for entry in &mapping.entries {
            let container = Self::right_edge(mapping, last, entry.depth())?;
            let last_value = container.get(entry.leaf()).unwrap_or(&NULL);

            if row.get_upper(entry.column()) != last_value && entry.depth() < create_level {
                create_level = entry.depth();
            }
        }

        Ok((create_level <= mapping.levels.len()).then_some(create_level))
    }

    /// Walk from a top-level record to the last record at `depth`
    fn right_edge<'r>(
        mapping: &MappingSpec,
        top: &'r Record,
        depth: usize,
    ) -> Result<&'r Record, NestError> {
        let mut record = top;
        for (d, level) in mapping.levels[..depth].iter().enumerate() {
            record = record
                .last_child(level)
                .ok_or_else(|| missing_container(level, d))?;
        }
        Ok(record)
    }

    fn right_edge_mut<'r>(
        mapping: &MappingSpec,
        top: &'r mut Record,
        depth: usize,
    ) -> Result<&'r mut Record, NestError> {
        let mut record = top;
        for (d, level) in mapping.levels[..depth].iter().enumerate() {
            record = record
                .last_child_mut(level)
                .ok_or_else(|| missing_container(level, d))?;
        }
        Ok(record)
    }

    /// Build the record created at `level`, with a first child in every level
    /// list below it
    fn build_record(mapping: &MappingSpec, level: usize, row: &Row) -> Result<Record, NestError> {
        let mut record = Record::new();

        for entry in mapping.entries.iter().filter(|e| e.depth() >= level) {
            let mut target = &mut record;
            for (offset, name) in mapping.levels[level..entry.depth()].iter().enumerate() {
                target = target
                    .open_child(name)
                    .ok_or_else(|| missing_container(name, level + offset))?;
            }
            target.insert(entry.leaf().to_string(), row.get_upper(entry.column()).clone());
        }

        Ok(record)
    }

    /// Append a record built at `level` to the right edge of the tree
    fn attach(&mut self, level: usize, record: Record) -> Result<(), NestError> {
        if level == 0 {
            self.open.push(record);
            self.stats.groups += 1;
        } else {
            let list_name = &self.mapping.levels[level - 1];
            let top = self
                .open
                .last_mut()
                .ok_or_else(|| missing_container(&self.mapping.levels[0], 0))?;
            let parent = Self::right_edge_mut(self.mapping, top, level - 1)?;
            parent
                .children_mut(list_name)
                .ok_or_else(|| missing_container(list_name, level - 1))?
                .push(Value::Object(record));
        }

        self.stats.records += 1;
        Ok(())
    }

    /// Reject a group that owns child lists and reopens after it was closed.
    ///
    /// A record built at `level` also opens a first child at every deeper
    /// depth, so each of those starts a fresh key set. Top-level keys are
    /// only tracked when the sink retains groups, so a streaming sink holds
    /// at most one group's worth of keys.
    fn check_order(&mut self, level: usize, row: &Row) -> Result<(), NestError> {
        if !self.mapping.config.detect_unsorted {
            return Ok(());
        }

        let first = if level == 0 && !self.sink.retains_groups() {
            1
        } else {
            level
        };
        for depth in first..self.opened_keys.len() {
            let key = group_key(self.mapping, depth, row);
            let keys = &mut self.opened_keys[depth];

            if depth > level {
                keys.clear();
            } else if keys.contains(&key) {
                log_warn!(
                    component = "nest",
                    event = "unsorted_input",
                    depth,
                    key = %key,
                    row = self.stats.rows,
                );
                return Err(NestError::UnsortedInput { depth, key });
            }
            keys.insert(key);
        }
        Ok(())
    }
}

/// Values of the fields stored directly on a record at `depth`, as compact JSON
fn group_key(mapping: &MappingSpec, depth: usize, row: &Row) -> String {
    Value::Array(
        mapping
            .entries_at(depth)
            .map(|e| row.get_upper(e.column()).clone())
            .collect(),
    )
    .to_string()
}

fn missing_container(level: &str, depth: usize) -> NestError {
    log_warn!(
        component = "nest",
        event = "missing_container",
        level = %level,
        depth,
    );
    NestError::MissingContainer {
        level: level.to_string(),
        depth,
    }
}
