use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::model::Label;

/// One classified domain.
#[derive(Debug, Clone, Serialize)]
pub struct DomainResult {
    pub domain: String,
    pub label: Label,
}

/// Classification results plus the DGA/benign tallies.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub results: Vec<DomainResult>,
    pub total: usize,
    pub dga_count: usize,
    pub benign_count: usize,
}

impl ClassificationReport {
    pub fn new(domains: Vec<String>, labels: Vec<Label>) -> Self {
        let results: Vec<DomainResult> = domains
            .into_iter()
            .zip(labels)
            .map(|(domain, label)| DomainResult { domain, label })
            .collect();

        let dga_count = results.iter().filter(|r| r.label == Label::Dga).count();
        let benign_count = results.len() - dga_count;

        Self {
            total: results.len(),
            dga_count,
            benign_count,
            results,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<50} {}", "Domain", "DGA/Benign")?;
        for result in &self.results {
            writeln!(f, "{:<50} {}", result.domain, result.label)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "total: {}  dga: {}  benign: {}",
            self.total, self.dga_count, self.benign_count
        )
    }
}
