//! Flat delimited record parsing for the bundled data tables.
//!
//! Each bundled table (dictionary, pronunciations, homophones) is a text file
//! of `id <TAB> key <TAB> value` records. Comma-delimited files are accepted
//! as a fallback. Malformed lines are skipped, not fatal.

use std::io::{self, BufRead};
use tracing::debug;

/// Parse one record line into (key, value), ignoring the leading id field.
pub(crate) fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut fields = if line.contains('\t') {
        line.splitn(3, '\t')
    } else {
        line.splitn(3, ',')
    };
    let _id = fields.next()?;
    let key = fields.next()?;
    let value = fields.next()?;
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Read all (key, value) records from a delimited table.
pub(crate) fn read_records<R: BufRead>(reader: R) -> io::Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_line(&line) {
            Some((key, value)) => out.push((key.to_string(), value.to_string())),
            None if line.trim().is_empty() || line.starts_with('#') => {}
            None => debug!(lineno, "skipping malformed record line"),
        }
    }
    Ok(out)
}
