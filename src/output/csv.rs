//! CSV serialization of the edge list
//!
//! One row per edge, `follower,followed`, no header. Fields containing the
//! delimiter, the quote character `|` or a line break are wrapped in `|` with
//! embedded quote characters doubled.

use crate::crawler::Edge;
use crate::output::OutputResult;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const QUOTE: char = '|';

/// Writes the edge list to `path`, replacing any previous file
pub fn write_edges_csv(edges: &[Edge], path: &Path) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(format_edges_csv(edges).as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Formats the edge list as CSV text
pub fn format_edges_csv(edges: &[Edge]) -> String {
    let mut csv = String::new();
    for edge in edges {
        csv.push_str(&escape_field(&edge.follower));
        csv.push(',');
        csv.push_str(&escape_field(&edge.followed));
        csv.push('\n');
    }
    csv
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', QUOTE, '\n', '\r']) {
        let doubled = field.replace(QUOTE, "||");
        Cow::Owned(format!("{QUOTE}{doubled}{QUOTE}"))
    } else {
        Cow::Borrowed(field)
    }
}
