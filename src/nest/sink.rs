//! Sinks decide what happens to a top-level group once the next one opens.
//!
//! [`Collector`] keeps every group and returns the whole tree at the end.
//! [`GroupEmitter`] hands each finished group to a callback and forgets it,
//! so memory stays bounded by the largest single group. The order check in
//! the engine keeps no state across top-level groups for a sink that does not
//! retain them: a top-level group that reappears later in the stream is only
//! reported under [`Collector`], while inner groups are checked for both.

use crate::error::NestError;
use crate::mapping::MappingSpec;
use crate::nest::engine::Nester;
use crate::nest::types::{Record, Row};
use crate::observability::log_trace;

/// Receives top-level groups from a [`Nester`]
pub trait GroupSink {
    /// Value produced once the row stream ends
    type Output;

    /// Error type of the run; integrity violations convert into it
    type Error: From<NestError>;

    /// Called before a new top-level group opens.
    ///
    /// `open` holds the groups still in memory, the just-finished group last.
    /// Groups left in `open` stay in the tree.
    fn group_closed(&mut self, open: &mut Vec<Record>) -> Result<(), Self::Error>;

    /// Called once after the last row with every group still in memory
    fn finish(self, open: Vec<Record>) -> Result<Self::Output, Self::Error>;

    /// Whether closed top-level groups stay in memory until the run ends.
    ///
    /// When false, the engine keeps no per-group state beyond the open group.
    fn retains_groups(&self) -> bool;
}

/// Accumulates the full nested list
#[derive(Debug, Clone, Copy, Default)]
pub struct Collector;

impl GroupSink for Collector {
    type Output = Vec<Record>;
    type Error = NestError;

    fn group_closed(&mut self, _open: &mut Vec<Record>) -> Result<(), NestError> {
        Ok(())
    }

    fn finish(self, open: Vec<Record>) -> Result<Vec<Record>, NestError> {
        Ok(open)
    }

    fn retains_groups(&self) -> bool {
        true
    }
}

/// Emits each completed top-level group to a callback, in stream order
pub struct GroupEmitter<F> {
    callback: F,
    emitted: usize,
}

impl<F> GroupEmitter<F> {
    pub fn new(callback: F) -> Self {
        GroupEmitter {
            callback,
            emitted: 0,
        }
    }

    /// Groups handed to the callback so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl<F, E> GroupEmitter<F>
where
    F: FnMut(Record) -> Result<(), E>,
{
    fn emit_all(&mut self, open: &mut Vec<Record>) -> Result<(), E> {
        for group in open.drain(..) {
            (self.callback)(group)?;
            self.emitted += 1;
            log_trace!(
                component = "sink",
                event = "group_emitted",
                emitted = self.emitted,
            );
        }
        Ok(())
    }
}

impl<F, E> GroupSink for GroupEmitter<F>
where
    F: FnMut(Record) -> Result<(), E>,
    E: From<NestError>,
{
    /// Number of groups emitted
    type Output = usize;
    type Error = E;

    fn group_closed(&mut self, open: &mut Vec<Record>) -> Result<(), E> {
        self.emit_all(open)
    }

    fn finish(mut self, mut open: Vec<Record>) -> Result<usize, E> {
        self.emit_all(&mut open)?;
        Ok(self.emitted)
    }

    fn retains_groups(&self) -> bool {
        false
    }
}

impl MappingSpec {
    /// Start a push-style run feeding `sink`
    pub fn nester<S: GroupSink>(&self, sink: S) -> Nester<'_, S> {
        Nester::new(self, sink)
    }

    /// Materialize a fallible row stream into the full tree.
    ///
    /// Errors from the row source are returned unchanged.
    pub fn collect<I, E>(&self, rows: I) -> Result<Vec<Record>, E>
    where
        I: IntoIterator<Item = Result<Row, E>>,
        E: From<NestError>,
    {
        let mut nester = self.nester(Collector);
        for row in rows {
            nester.push(&row?)?;
        }
        Ok(nester.finish()?)
    }

    /// Materialize an infallible row stream into the full tree
    pub fn collect_rows<I>(&self, rows: I) -> Result<Vec<Record>, NestError>
    where
        I: IntoIterator<Item = Row>,
    {
        self.collect(rows.into_iter().map(Ok))
    }

    /// Stream top-level groups to `callback` as each one completes.
    ///
    /// Returns the number of groups emitted. Errors from the row source or
    /// the callback are returned unchanged.
    pub fn for_each_group<I, F, E>(&self, rows: I, callback: F) -> Result<usize, E>
    where
        I: IntoIterator<Item = Result<Row, E>>,
        F: FnMut(Record) -> Result<(), E>,
        E: From<NestError>,
    {
        let mut nester = self.nester(GroupEmitter::new(callback));
        for row in rows {
            nester.push(&row?)?;
        }
        nester.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COWS: &str = "cowGroupId, cowGroupName, cowId AS cows.cowId, cowName AS cows.cowName";

    fn cow_rows() -> Vec<Row> {
        [
            (1, "ROLLINGFIELD7", 1000, "DAISY"),
            (2, "SLAUGHTERHOUSE5", 1001, "BUTTERCUP"),
            (2, "SLAUGHTERHOUSE5", 1002, "STEVE"),
            (3, "GREENACRE", 1003, "ROSE"),
        ]
        .into_iter()
        .map(|(group, name, id, cow)| {
            Row::new()
                .with("cowGroupId", group)
                .with("cowGroupName", name)
                .with("cowId", id)
                .with("cowName", cow)
        })
        .collect()
    }

    #[test]
    fn test_collector_and_emitter_agree() {
        let mapping = MappingSpec::parse(COWS).unwrap();

        let collected = mapping.collect_rows(cow_rows()).unwrap();

        let mut emitted = Vec::new();
        let count = mapping
            .for_each_group(cow_rows().into_iter().map(Ok), |group| {
                emitted.push(group);
                Ok::<_, NestError>(())
            })
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(collected, emitted);
    }

    #[test]
    fn test_emitter_flushes_trailing_group() {
        let mapping = MappingSpec::parse(COWS).unwrap();
        let mut names = Vec::new();

        mapping
            .for_each_group(cow_rows().into_iter().map(Ok), |group| {
                names.push(group["cowGroupName"].clone());
                Ok::<_, NestError>(())
            })
            .unwrap();

        assert_eq!(
            names,
            vec![json!("ROLLINGFIELD7"), json!("SLAUGHTERHOUSE5"), json!("GREENACRE")]
        );
    }

    #[test]
    fn test_empty_stream() {
        let mapping = MappingSpec::parse(COWS).unwrap();

        assert!(mapping.collect_rows(Vec::new()).unwrap().is_empty());

        let count = mapping
            .for_each_group(Vec::<Result<Row, NestError>>::new(), |_| Ok(()))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_row_source_error_passes_through() {
        #[derive(Debug, PartialEq)]
        enum SourceError {
            Disconnected,
            Nest(NestError),
        }

        impl From<NestError> for SourceError {
            fn from(e: NestError) -> Self {
                SourceError::Nest(e)
            }
        }

        let mapping = MappingSpec::parse(COWS).unwrap();
        let mut rows: Vec<Result<Row, SourceError>> = cow_rows().into_iter().map(Ok).collect();
        rows.insert(2, Err(SourceError::Disconnected));

        assert_eq!(
            mapping.collect(rows).unwrap_err(),
            SourceError::Disconnected
        );
    }

    #[test]
    fn test_callback_error_stops_the_run() {
        let mapping = MappingSpec::parse(COWS).unwrap();
        let mut seen = 0;

        let err = mapping
            .for_each_group(cow_rows().into_iter().map(Ok), |_| {
                seen += 1;
                if seen == 2 {
                    anyhow::bail!("sink full");
                }
                Ok(())
            })
            .unwrap_err();

        assert_eq!(err.to_string(), "sink full");
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_emitter_reports_integrity_errors() {
        let mapping = MappingSpec::parse(
            "dept, name AS people.name, type AS people.addresses.type",
        )
        .unwrap();
        let rows = [("ada", "home"), ("bob", "home"), ("ada", "work")]
            .into_iter()
            .map(|(name, kind)| {
                Ok(Row::new().with("dept", "eng").with("name", name).with("type", kind))
            });

        let err = mapping
            .for_each_group(rows, |_| Ok::<_, anyhow::Error>(()))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<NestError>(),
            Some(NestError::UnsortedInput { depth: 1, .. })
        ));
    }

    #[test]
    fn test_collector_reports_reappearing_group() {
        let mapping = MappingSpec::parse(COWS).unwrap();
        let mut rows = cow_rows();
        rows.push(rows[0].clone());

        let err = mapping.collect_rows(rows.clone()).unwrap_err();
        assert!(matches!(err, NestError::UnsortedInput { depth: 0, .. }));

        // The emitter has already released the first group and keeps no key for it
        let count = mapping
            .for_each_group(rows.into_iter().map(Ok), |_| Ok::<_, NestError>(()))
            .unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_emitter_counts_drained_groups() {
        let mut seen = Vec::new();
        let mut emitter = GroupEmitter::new(|group: Record| {
            seen.push(group);
            Ok::<_, NestError>(())
        });
        assert!(!emitter.retains_groups());

        let mut open = vec![Record::new(), Record::new()];
        emitter.group_closed(&mut open).unwrap();
        assert!(open.is_empty());
        assert_eq!(emitter.emitted(), 2);

        assert_eq!(emitter.finish(vec![Record::new()]).unwrap(), 3);
        assert_eq!(seen.len(), 3);
        assert!(Collector.retains_groups());
    }
}
