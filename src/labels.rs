//! Class label table, index-aligned with the model output vector

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Ordered class names; position `i` names output `i`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Load labels from a JSON array (`.json`) or a newline-separated text file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read class labels from {}", path.display()))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let labels = if is_json {
            Self::from_json(&raw)
                .with_context(|| format!("Invalid class label file {}", path.display()))?
        } else {
            Self::from_lines(&raw)
        };

        info!(count = labels.len(), path = %path.display(), "Class labels loaded");
        Ok(labels)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let names: Vec<String> = serde_json::from_str(raw)?;
        Ok(Self::new(names))
    }

    /// One label per line; blank lines are skipped
    pub fn from_lines(raw: &str) -> Self {
        let names = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(names)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Label for `index`, or a positional placeholder when the table is too short
    pub fn name_or_placeholder(&self, index: usize) -> String {
        self.get(index)
            .map(str::to_string)
            .unwrap_or_else(|| format!("clase {}", index))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
