use crate::error::MappingError;
use crate::mapping::spec::{MappingEntry, MappingSpec};
use crate::nest::types::NestConfig;
use crate::observability::log_debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Parse `column [AS target.path]` entries into a [`MappingSpec`].
///
/// Every segment of a target path except the last names a level list. The
/// first path to reach a depth fixes the level name for that depth; every
/// other path crossing it must agree.
pub fn parse(spec: &str, config: NestConfig) -> Result<MappingSpec, MappingError> {
    if spec.trim().is_empty() {
        return Err(MappingError::Empty);
    }

    let mut entries = Vec::new();
    let mut levels: Vec<String> = Vec::new();

    for raw in spec.split(config.entry_separator.as_str()) {
        let entry = parse_entry(raw, &config)?;

        for (depth, segment) in entry.path()[..entry.depth()].iter().enumerate() {
            match levels.get(depth) {
                None => levels.push(segment.clone()),
                Some(existing) if existing != segment => {
                    return Err(MappingError::LevelConflict {
                        depth,
                        existing: existing.clone(),
                        found: segment.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        entries.push(entry);
    }

    let mut targets = HashSet::new();
    for entry in &entries {
        if levels.get(entry.depth()).is_some_and(|level| level == entry.leaf()) {
            return Err(MappingError::FieldShadowsLevel {
                field: entry.leaf().to_string(),
                depth: entry.depth(),
            });
        }
        if !targets.insert(entry.path()) {
            return Err(MappingError::DuplicateTarget {
                path: entry.path().join(&config.path_separator),
            });
        }
    }

    log_debug!(
        component = "mapping",
        event = "mapping_parsed",
        entries = entries.len(),
        levels = ?levels,
    );

    Ok(MappingSpec {
        entries,
        levels,
        config,
    })
}

fn parse_entry(raw: &str, config: &NestConfig) -> Result<MappingEntry, MappingError> {
    let malformed = || MappingError::MalformedEntry {
        entry: raw.trim().to_string(),
    };
    let is_alias = |token: &str| token.eq_ignore_ascii_case(&config.alias_keyword);

    let tokens: Vec<&str> = WHITESPACE_REGEX
        .split(raw.trim())
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.iter().filter(|t| is_alias(t)).count() > 1 {
        return Err(malformed());
    }

    let (column, target) = match tokens.as_slice() {
        [column] if !is_alias(column) => (*column, *column),
        [column, alias, target] if is_alias(alias) => (*column, *target),
        _ => return Err(malformed()),
    };

    let path: Vec<String> = target
        .split(config.path_separator.as_str())
        .map(str::to_string)
        .collect();
    if path.iter().any(String::is_empty) {
        return Err(MappingError::EmptySegment {
            path: target.to_string(),
        });
    }

    Ok(MappingEntry::new(column, path))
}
