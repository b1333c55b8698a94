use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Reads the domain list from a CSV file with a `urls` column.
pub fn load_domains(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    let mut lines = contents.lines();

    let header = lines
        .next()
        .ok_or_else(|| Error::Input("csv file is empty".into()))?;
    let column = header
        .split(',')
        .position(|h| h.trim().trim_matches('"') == "urls")
        .ok_or_else(|| Error::Input("csv has no `urls` column".into()))?;

    let mut domains = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let field = line
            .split(',')
            .nth(column)
            .unwrap_or("")
            .trim()
            .trim_matches('"');
        if !field.is_empty() {
            domains.push(field.to_string());
        }
    }

    if domains.is_empty() {
        return Err(Error::Input("csv contains no domains".into()));
    }
    debug!(count = domains.len(), "domain list loaded");
    Ok(domains)
}
