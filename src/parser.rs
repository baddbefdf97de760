//! Streaming parser for tab-separated MS-GF+ result files.

use std::io::BufRead;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{AccessionClass, AccessionPrefixes, DecoyPolicy};
use crate::error::PsmError;
use crate::model::Organism;

pub const DEFAULT_Q_VALUE_CUTOFF: f64 = 0.001;

/// Zero-based column positions inside a result line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub charge: usize,
    pub peptide: usize,
    pub protein: usize,
    pub spec_e_value: usize,
    pub q_value: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            charge: 4,
            peptide: 9,
            protein: 10,
            spec_e_value: 14,
            q_value: 17,
        }
    }
}

impl ColumnLayout {
    pub fn required_fields(&self) -> usize {
        [
            self.charge,
            self.peptide,
            self.protein,
            self.spec_e_value,
            self.q_value,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParserSettings {
    pub q_value_cutoff: f64,
    pub prefixes: AccessionPrefixes,
    pub decoy_policy: DecoyPolicy,
    pub columns: ColumnLayout,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            q_value_cutoff: DEFAULT_Q_VALUE_CUTOFF,
            prefixes: AccessionPrefixes::default(),
            decoy_policy: DecoyPolicy::default(),
            columns: ColumnLayout::default(),
        }
    }
}

/// One decoded result line. Only the q-value is interpreted numerically.
#[derive(Debug, Clone, PartialEq)]
pub struct PsmRecord<'a> {
    pub charge: &'a str,
    /// Peptide with the flanking residues removed (`K.PEPTIDE.R` -> `PEPTIDE`).
    pub peptide: &'a str,
    pub protein: &'a str,
    pub spec_e_value: &'a str,
    pub q_value: f64,
}

impl<'a> PsmRecord<'a> {
    /// Splits a result line into its fields. Only a q-value that fails to
    /// parse as a float is an error; `NaN` and infinities parse and are left
    /// to the cutoff check in [`RecordParser::apply`].
    pub fn parse(line: &'a str, line_number: usize, columns: &ColumnLayout) -> Result<Self, PsmError> {
        let fields = line.split('\t').collect::<Vec<_>>();
        let expected = columns.required_fields();
        if fields.len() < expected {
            return Err(PsmError::TruncatedRecord {
                line: line_number,
                found: fields.len(),
                expected,
            });
        }

        let raw_q_value = fields[columns.q_value].trim();
        let q_value = raw_q_value
            .parse::<f64>()
            .map_err(|_| PsmError::InvalidNumericField {
                line: line_number,
                field: "q-value",
                value: raw_q_value.to_string(),
            })?;

        let raw_peptide = fields[columns.peptide];
        let peptide = strip_flanking(raw_peptide).ok_or_else(|| PsmError::MalformedPeptide {
            line: line_number,
            value: raw_peptide.to_string(),
        })?;

        Ok(Self {
            charge: fields[columns.charge],
            peptide,
            protein: fields[columns.protein],
            spec_e_value: fields[columns.spec_e_value],
            q_value,
        })
    }
}

// Columns too short to leave a residue after dropping both flanks are
// malformed rather than attributed as an empty peptide.
fn strip_flanking(peptide: &str) -> Option<&str> {
    let end = peptide.len().checked_sub(2)?;
    if end < 2 {
        return None;
    }
    peptide.get(2..end).filter(|stripped| !stripped.is_empty())
}

/// Outcome of running a single record through the acceptance policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attributed(AccessionClass),
    DecoyExcluded,
    RejectedQValue,
    RejectedContaminant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Data lines read, header excluded.
    pub lines: usize,
    /// Records that passed the q-value and contaminant filters.
    pub accepted: usize,
    pub target_psms: usize,
    pub decoy_psms: usize,
    pub attributed: usize,
    pub rejected_q_value: usize,
    pub rejected_contaminant: usize,
    pub skipped_lines: usize,
}

impl ParseReport {
    pub fn merge(&mut self, other: &ParseReport) {
        self.lines += other.lines;
        self.accepted += other.accepted;
        self.target_psms += other.target_psms;
        self.decoy_psms += other.decoy_psms;
        self.attributed += other.attributed;
        self.rejected_q_value += other.rejected_q_value;
        self.rejected_contaminant += other.rejected_contaminant;
        self.skipped_lines += other.skipped_lines;
    }
}

pub struct RecordParser<'s> {
    settings: &'s ParserSettings,
}

impl<'s> RecordParser<'s> {
    pub fn new(settings: &'s ParserSettings) -> Self {
        Self { settings }
    }

    /// Applies the q-value, contaminant and decoy policy to one record and
    /// attributes it to `organism` when it survives. A `NaN` q-value never
    /// passes the cutoff.
    pub fn apply(&self, record: &PsmRecord<'_>, organism: &mut Organism) -> Disposition {
        if record.q_value.is_nan() || record.q_value > self.settings.q_value_cutoff {
            return Disposition::RejectedQValue;
        }
        let class = self.settings.prefixes.classify(record.protein);
        match class {
            AccessionClass::Contaminant => return Disposition::RejectedContaminant,
            AccessionClass::Decoy if self.settings.decoy_policy == DecoyPolicy::Exclude => {
                return Disposition::DecoyExcluded;
            }
            _ => {}
        }
        organism.add_peptide(record.peptide, record.protein);
        Disposition::Attributed(class)
    }

    /// Consumes a decompressed result stream. Malformed lines are logged and
    /// skipped; only I/O failures abort the stream.
    pub fn parse_stream<R: BufRead>(
        &self,
        mut reader: R,
        organism: &mut Organism,
    ) -> Result<ParseReport, PsmError> {
        let mut report = ParseReport::default();
        let mut buffer = Vec::new();
        let mut line_number = 0;

        loop {
            buffer.clear();
            let read = reader
                .read_until(b'\n', &mut buffer)
                .map_err(|err| PsmError::Filesystem(err.to_string()))?;
            if read == 0 {
                break;
            }
            line_number += 1;
            if line_number == 1 {
                continue;
            }
            let line = String::from_utf8_lossy(&buffer);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            report.lines += 1;

            let record = match PsmRecord::parse(line, line_number, &self.settings.columns) {
                Ok(record) => record,
                Err(err) => {
                    warn!("{err}; skipping");
                    report.skipped_lines += 1;
                    continue;
                }
            };

            match self.apply(&record, organism) {
                Disposition::RejectedQValue => report.rejected_q_value += 1,
                Disposition::RejectedContaminant => report.rejected_contaminant += 1,
                Disposition::DecoyExcluded => {
                    report.accepted += 1;
                    report.decoy_psms += 1;
                }
                Disposition::Attributed(class) => {
                    report.accepted += 1;
                    report.attributed += 1;
                    if class == AccessionClass::Decoy {
                        report.decoy_psms += 1;
                    } else {
                        report.target_psms += 1;
                    }
                }
            }
        }

        debug!(
            "Target PSMs: {}, Decoy PSMs: {}",
            report.target_psms, report.decoy_psms
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_flanking_residues() {
        assert_eq!(strip_flanking("K.PEPTIDE.R"), Some("PEPTIDE"));
        assert_eq!(strip_flanking("-.M+42.011ARK.-"), Some("M+42.011ARK"));
        assert_eq!(strip_flanking("K.R"), None);
        assert_eq!(strip_flanking("K..R"), None);
    }

    #[test]
    fn required_fields_follow_layout() {
        assert_eq!(ColumnLayout::default().required_fields(), 18);
        let layout = ColumnLayout {
            q_value: 20,
            ..ColumnLayout::default()
        };
        assert_eq!(layout.required_fields(), 21);
    }
}
