use std::io::{self, Write};

use serde::Serialize;

use crate::domain::{AccessionPrefixes, PtmMarker};
use crate::model::{IdentificationModel, Organism, TerminalStats};
use crate::pipeline::{ProgressEvent, ProgressSink, RunSummary};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganismOverview {
    pub name: String,
    pub proteins: usize,
    pub decoy_proteins: usize,
    pub spectra: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification: Option<ModificationOverview>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModificationOverview {
    pub marker: char,
    pub modified_proteins: usize,
    pub unmodified_proteins: usize,
    pub terminal: TerminalStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    pub summary: &'a RunSummary,
    pub organisms: Vec<OrganismOverview>,
}

impl OrganismOverview {
    pub fn from_organism(
        organism: &Organism,
        prefixes: &AccessionPrefixes,
        marker: Option<PtmMarker>,
    ) -> Self {
        let modification = marker.map(|marker| {
            let terminal = organism.proteins().fold(TerminalStats::default(), |mut acc, protein| {
                let stats = protein.modified_terminal_stats(marker);
                acc.terminal += stats.terminal;
                acc.total_modified += stats.total_modified;
                acc
            });
            ModificationOverview {
                marker: marker.as_char(),
                modified_proteins: organism.modified_protein_accessions(marker).len(),
                unmodified_proteins: organism.unmodified_protein_accessions(marker).len(),
                terminal,
            }
        });
        Self {
            name: organism.name().to_string(),
            proteins: organism.protein_count(),
            decoy_proteins: organism.decoy_protein_count_with(prefixes),
            spectra: organism.proteins().map(|p| p.total_spectrum_count()).sum(),
            modification,
        }
    }
}

pub fn overview(
    model: &IdentificationModel,
    prefixes: &AccessionPrefixes,
    marker: Option<PtmMarker>,
) -> Vec<OrganismOverview> {
    model
        .organisms_sorted()
        .into_iter()
        .map(|organism| OrganismOverview::from_organism(organism, prefixes, marker))
        .collect()
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport<'_>) -> io::Result<()> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_report(report: &RunReport<'_>) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        Self::write_report(&mut stdout, report)
    }

    pub fn write_report<W: Write>(out: &mut W, report: &RunReport<'_>) -> io::Result<()> {
        let summary = report.summary;
        writeln!(
            out,
            "The associations file listed {} psm results files from {} organisms",
            summary.association.file_associations, summary.association.organisms
        )?;
        writeln!(
            out,
            "Files: {} parsed, {} unroutable, {} missing, {} failed ({} ms)",
            summary.files.parsed,
            summary.files.unroutable,
            summary.files.missing,
            summary.files.failed,
            summary.elapsed_ms
        )?;
        writeln!(
            out,
            "PSMs: {} target, {} decoy, {} above q-value cutoff, {} contaminant, {} malformed lines",
            summary.records.target_psms,
            summary.records.decoy_psms,
            summary.records.rejected_q_value,
            summary.records.rejected_contaminant,
            summary.records.skipped_lines
        )?;
        for file in &summary.unroutable_files {
            writeln!(out, "  unroutable: {file}")?;
        }
        for file in &summary.failed_files {
            writeln!(out, "  failed: {file}")?;
        }

        for organism in &report.organisms {
            write!(
                out,
                "{}\t{} proteins\t{} decoy\t{} spectra",
                organism.name, organism.proteins, organism.decoy_proteins, organism.spectra
            )?;
            if let Some(modification) = &organism.modification {
                write!(
                    out,
                    "\t{} modified ({})\t{} unmodified\t{}/{} terminal",
                    modification.modified_proteins,
                    modification.marker,
                    modification.unmodified_proteins,
                    modification.terminal.terminal,
                    modification.terminal.total_modified
                )?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("[{:>6.1}s] {}", elapsed.as_secs_f64(), event.message),
            None => eprintln!("{}", event.message),
        }
    }
}
