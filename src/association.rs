//! File-stem to organism routing built from the association table.
//!
//! The table has one header line followed by rows of
//! `<organism>\t<stem>,<stem>,...`.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::MalformedRowPolicy;
use crate::error::PsmError;

#[derive(Debug, Clone, Default)]
pub struct AssociationIndex {
    organism_names: Vec<String>,
    seen_organisms: HashSet<String>,
    organism_by_stem: HashMap<String, String>,
    stats: AssociationStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssociationStats {
    /// Stem entries read, duplicates included.
    pub file_associations: usize,
    pub organisms: usize,
    pub skipped_rows: usize,
}

impl AssociationIndex {
    pub fn from_path(path: &Path, policy: MalformedRowPolicy) -> Result<Self, PsmError> {
        let file = File::open(path).map_err(|_| PsmError::AssociationRead(path.to_path_buf()))?;
        Self::from_reader(BufReader::new(file), policy).map_err(|err| match err {
            PsmError::Filesystem(_) => PsmError::AssociationRead(path.to_path_buf()),
            other => other,
        })
    }

    pub fn from_reader<R: BufRead>(reader: R, policy: MalformedRowPolicy) -> Result<Self, PsmError> {
        let mut index = Self::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|err| PsmError::Filesystem(err.to_string()))?;
            if idx == 0 {
                continue;
            }
            let line_number = idx + 1;
            match index.add_row(&line, line_number) {
                Ok(()) => {}
                Err(err) if policy == MalformedRowPolicy::Skip && err.is_line_level() => {
                    warn!("{err}; skipping");
                    index.stats.skipped_rows += 1;
                }
                Err(err) => return Err(err),
            }
        }
        index.stats.organisms = index.organism_names.len();
        info!(
            "The associations file listed {} psm results files from {} organisms",
            index.stats.file_associations, index.stats.organisms
        );
        Ok(index)
    }

    fn add_row(&mut self, line: &str, line_number: usize) -> Result<(), PsmError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        let mut fields = trimmed.split('\t');
        let (Some(name), Some(stems)) = (fields.next(), fields.next()) else {
            return Err(PsmError::MalformedAssociationRow {
                line: line_number,
                content: line.to_string(),
            });
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(PsmError::MalformedAssociationRow {
                line: line_number,
                content: line.to_string(),
            });
        }

        if self.seen_organisms.insert(name.to_string()) {
            self.organism_names.push(name.to_string());
        }
        for stem in stems.split(',') {
            let stem = stem.trim();
            if stem.is_empty() {
                continue;
            }
            if let Some(previous) = self.organism_by_stem.insert(stem.to_string(), name.to_string())
            {
                if previous != name {
                    debug!("file stem {stem} reassigned from {previous} to {name}");
                }
            }
            self.stats.file_associations += 1;
        }
        Ok(())
    }

    pub fn organism_for_stem(&self, stem: &str) -> Option<&str> {
        self.organism_by_stem.get(stem).map(String::as_str)
    }

    /// Distinct organism names in first-seen order.
    pub fn organism_names(&self) -> &[String] {
        &self.organism_names
    }

    pub fn stem_count(&self) -> usize {
        self.organism_by_stem.len()
    }

    pub fn stats(&self) -> AssociationStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_ignored() {
        let table = "Organism\tFiles\n\nEcoli\tsample1\n";
        let index = AssociationIndex::from_reader(table.as_bytes(), MalformedRowPolicy::Abort).unwrap();
        assert_eq!(index.stats().organisms, 1);
        assert_eq!(index.stats().skipped_rows, 0);
    }
}
