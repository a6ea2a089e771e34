use thiserror::Error;

/// Errors raised while parsing a mapping specification.
///
/// These are construction-time errors: the mapping string has to be fixed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("mapping specification is empty")]
    Empty,
    #[error("malformed mapping entry '{entry}': expected `column` or `column AS path`")]
    MalformedEntry { entry: String },
    #[error("empty segment in target path '{path}'")]
    EmptySegment { path: String },
    #[error("level conflict at depth {depth}: '{existing}' already uses it, found '{found}'")]
    LevelConflict {
        depth: usize,
        existing: String,
        found: String,
    },
    #[error("field '{field}' has the same name as the list level at depth {depth}")]
    FieldShadowsLevel { field: String, depth: usize },
    #[error("target path '{path}' is mapped more than once")]
    DuplicateTarget { path: String },
}

/// Integrity violations detected while materializing rows.
///
/// Both mean the input was not sorted the way the mapping expects, or the
/// mapping does not match the shape of the result set. Neither is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NestError {
    #[error("list '{level}' at depth {depth} holds no record: input unsorted or mapping mismatch")]
    MissingContainer { level: String, depth: usize },
    #[error("group {key} at depth {depth} reappeared after it was closed: input is not sorted")]
    UnsortedInput { depth: usize, key: String },
}
