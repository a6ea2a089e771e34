//! foundry-nest: Rebuild nested JSON from flat, sorted join rows
//!
//! Usage:
//!   # Read a JSON array of rows from a file, print the nested tree
//!   foundry-nest --mapping "id, name, postId AS posts.id, title AS posts.title" rows.json
//!
//!   # Read NDJSON rows from stdin, write one top-level group per line as it completes
//!   cat rows.jsonl | foundry-nest --ndjson --stream -m "id, postId AS posts.id"

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use foundry::{
    ndjson_rows, row_from_json, Collector, GroupEmitter, GroupSink, MappingSpec, NestConfig,
    NestStats, Record, RecordWriter, Row,
};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "foundry-nest")]
#[command(about = "Rebuild nested JSON from flat, sorted join rows", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Mapping specification, e.g. "id, name AS people.name"
    #[arg(long, short = 'm')]
    mapping: String,

    /// Process newline-delimited JSON (one row object per line)
    #[arg(long)]
    ndjson: bool,

    /// Write each top-level group as one JSON line as soon as it completes
    #[arg(long)]
    stream: bool,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Keep rows that repeat the previous row exactly
    #[arg(long)]
    keep_duplicates: bool,

    /// Don't fail when a closed group reappears (input assumed sorted)
    #[arg(long)]
    no_order_check: bool,

    /// Print run statistics to stderr
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = NestConfig {
        skip_duplicates: !args.keep_duplicates,
        detect_unsorted: !args.no_order_check,
        ..NestConfig::default()
    };
    let mapping = MappingSpec::parse_with(&args.mapping, config)
        .context("Invalid mapping specification")?;

    let reader = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(
            File::open(file_path).with_context(|| format!("Failed to open {}", file_path))?,
        )) as Box<dyn BufRead>
    } else {
        Box::new(BufReader::new(std::io::stdin())) as Box<dyn BufRead>
    };

    let rows: Box<dyn Iterator<Item = Result<Row>>> = if args.ndjson {
        Box::new(ndjson_rows(reader))
    } else {
        Box::new(read_array(reader)?.into_iter().map(row_from_json))
    };

    let stdout = std::io::stdout();
    let stats = if args.stream {
        let mut writer = RecordWriter::new(stdout.lock());
        let emitter = GroupEmitter::new(|group: Record| writer.write_record(&group));
        let (_, stats) = run(&mapping, rows, emitter)?;
        writer.flush()?;
        stats
    } else {
        let (tree, stats) = run(&mapping, rows, Collector)?;
        let mut out = stdout.lock();
        if args.compact {
            serde_json::to_writer(&mut out, &tree)?;
        } else {
            serde_json::to_writer_pretty(&mut out, &tree)?;
        }
        writeln!(out)?;
        stats
    };

    if args.stats {
        eprintln!("{}", serde_json::to_string(&stats)?);
    }

    Ok(())
}

/// Push every row through a nester feeding `sink`
fn run<S>(
    mapping: &MappingSpec,
    rows: impl Iterator<Item = Result<Row>>,
    sink: S,
) -> Result<(S::Output, NestStats)>
where
    S: GroupSink,
    anyhow::Error: From<S::Error>,
{
    let mut nester = mapping.nester(sink);
    for row in rows {
        nester.push(&row?)?;
    }
    let stats = *nester.stats();
    Ok((nester.finish()?, stats))
}

/// Read a JSON array of rows using SIMD-accelerated parsing when possible
fn read_array(mut reader: Box<dyn BufRead>) -> Result<Vec<Value>> {
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;

    // simd-json parses in place, so keep the original bytes for the fallback
    let mut scratch = content.clone();
    let value: Value = match simd_json::to_owned_value(&mut scratch) {
        Ok(owned) => {
            let json_str = simd_json::to_string(&owned)?;
            serde_json::from_str(&json_str)?
        }
        Err(_) => serde_json::from_slice(&content).context("Failed to parse JSON input")?,
    };

    match value {
        Value::Array(rows) => Ok(rows),
        Value::Object(obj) => Ok(vec![Value::Object(obj)]),
        other => bail!("Expected a JSON array of row objects, found {}", other),
    }
}
