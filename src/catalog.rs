use std::collections::HashMap;
use std::path::Path;

use anyhow::{Result, bail};

use crate::util::read_nonempty_lines;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub code: String,
    pub label: String,
}

impl CatalogEntry {
    /// `"CPS 2232: Data Structure"` becomes code `"CPS 2232"`; a line without a
    /// colon is its own code.
    pub fn from_line(line: &str) -> Self {
        let label = line.trim().to_string();
        let code = label
            .split(':')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        Self { code, label }
    }
}

/// Course list in source order plus a code index built once at load time.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    codes: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = lines
            .into_iter()
            .map(|line| line.as_ref().trim().to_string())
            .filter(|line| !line.is_empty())
            .map(|line| CatalogEntry::from_line(&line))
            .collect::<Vec<CatalogEntry>>();

        // Repeated codes keep their first position and take the last label.
        let mut positions = HashMap::<String, usize>::new();
        let mut codes = Vec::<CatalogEntry>::new();
        for entry in &entries {
            match positions.get(&entry.code) {
                Some(&index) => codes[index].label = entry.label.clone(),
                None => {
                    positions.insert(entry.code.clone(), codes.len());
                    codes.push(entry.clone());
                }
            }
        }

        Self { entries, codes }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let catalog = Self::from_lines(read_nonempty_lines(path)?);
        if catalog.is_empty() {
            bail!("course catalog is empty: {}", path.display());
        }
        Ok(catalog)
    }

    /// Every catalog line, duplicates included.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// One entry per distinct code.
    pub fn code_index(&self) -> &[CatalogEntry] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
