/// Comparison log codec.
///
/// One record per line, `winner>loser`, in insertion order. Loading is
/// all-or-nothing: the first bad line aborts with its 1-based line number.
///
/// IDs are written in canonical decimal form. Loading accepts anything `i64`
/// parses, so a non-canonical line such as `+1>02` loads as `1>2` and is saved
/// that way; only canonical lines round-trip unchanged.
use std::io::{BufRead, Write};

use crate::error::LoadError;
use crate::graph::ComparisonGraph;
use crate::types::{ComparisonRecord, ItemId};

const SEPARATOR: char = '>';

/// Parse a whole log held in memory.
pub fn parse_comparisons(text: &str) -> Result<ComparisonGraph, LoadError> {
    let mut graph = ComparisonGraph::new();
    for (idx, line) in text.lines().enumerate() {
        push_line(&mut graph, idx + 1, line)?;
    }
    Ok(graph)
}

/// Read a log line by line.
pub fn load_comparisons<R: BufRead>(reader: R) -> Result<ComparisonGraph, LoadError> {
    let mut graph = ComparisonGraph::new();
    for (idx, line) in reader.lines().enumerate() {
        push_line(&mut graph, idx + 1, &line?)?;
    }
    tracing::debug!(records = graph.len(), items = graph.seen_items().len(), "Loaded comparison log");
    Ok(graph)
}

/// Serialize every record, duplicates included, in insertion order.
pub fn save_comparisons(graph: &ComparisonGraph) -> Vec<String> {
    graph.records().iter().map(format_record).collect()
}

pub fn write_comparisons<W: Write>(graph: &ComparisonGraph, mut writer: W) -> std::io::Result<()> {
    for record in graph.records() {
        writeln!(writer, "{}", format_record(record))?;
    }
    writer.flush()
}

pub fn format_record(record: &ComparisonRecord) -> String {
    format!("{}{}{}", record.winner, SEPARATOR, record.loser)
}

/// Parse one `winner>loser` line. `line` is 1-based and only used for errors.
pub fn parse_record(line: usize, content: &str) -> Result<ComparisonRecord, LoadError> {
    let trimmed = content.trim();
    let Some((winner, loser)) = trimmed.split_once(SEPARATOR) else {
        return Err(LoadError::MissingSeparator { line, content: content.to_string() });
    };
    let winner = parse_item(line, winner)?;
    let loser = parse_item(line, loser)?;
    Ok(ComparisonRecord::new(winner, loser))
}

fn parse_item(line: usize, value: &str) -> Result<ItemId, LoadError> {
    let value = value.trim();
    value.parse::<ItemId>().map_err(|source| LoadError::InvalidItem {
        line,
        value: value.to_string(),
        source,
    })
}

fn push_line(graph: &mut ComparisonGraph, line: usize, content: &str) -> Result<(), LoadError> {
    let record = parse_record(line, content)?;
    graph.record(record.winner, record.loser)
        .map_err(|source| LoadError::InvalidRecord { line, source })
}
