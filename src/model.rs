//! Organism / protein / peptide aggregation state and the modification
//! queries run over it.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::Serialize;

use crate::domain::{AccessionPrefixes, PtmMarker};

/// Peptides observed for one accession, keyed by sequence with the spectrum
/// count as value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protein {
    accession: String,
    kegg_ortholog_accession: Option<String>,
    peptides: HashMap<String, u32>,
}

/// Result of [`Protein::modified_terminal_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TerminalStats {
    /// Modified peptides whose last character is the marker.
    pub terminal: usize,
    /// Peptides with at least one marker attached to a residue.
    pub total_modified: usize,
}

impl Protein {
    pub fn new(accession: impl Into<String>) -> Self {
        Self {
            accession: accession.into(),
            kegg_ortholog_accession: None,
            peptides: HashMap::new(),
        }
    }

    pub fn accession(&self) -> &str {
        &self.accession
    }

    pub fn kegg_ortholog_accession(&self) -> Option<&str> {
        self.kegg_ortholog_accession.as_deref()
    }

    pub fn set_kegg_ortholog_accession(&mut self, accession: impl Into<String>) {
        self.kegg_ortholog_accession = Some(accession.into());
    }

    pub fn add_peptide(&mut self, sequence: &str) {
        match self.peptides.get_mut(sequence) {
            Some(count) => *count += 1,
            None => {
                self.peptides.insert(sequence.to_string(), 1);
            }
        }
    }

    /// Adds the spectrum counts of `other` into this protein.
    pub fn merge(&mut self, other: Protein) {
        if self.kegg_ortholog_accession.is_none() {
            self.kegg_ortholog_accession = other.kegg_ortholog_accession;
        }
        for (sequence, count) in other.peptides {
            *self.peptides.entry(sequence).or_insert(0) += count;
        }
    }

    pub fn peptides(&self) -> &HashMap<String, u32> {
        &self.peptides
    }

    pub fn spectrum_count(&self, sequence: &str) -> u32 {
        self.peptides.get(sequence).copied().unwrap_or(0)
    }

    pub fn total_spectrum_count(&self) -> u64 {
        self.peptides.values().map(|&count| u64::from(count)).sum()
    }

    pub fn is_modified(&self, marker: PtmMarker) -> bool {
        self.peptides
            .keys()
            .any(|sequence| sequence.contains(marker.as_char()))
    }

    pub fn modified_terminal_stats(&self, marker: PtmMarker) -> TerminalStats {
        let mut stats = TerminalStats::default();
        for sequence in self.peptides.keys() {
            if marked_residues(sequence, marker).next().is_none() {
                continue;
            }
            stats.total_modified += 1;
            if sequence.ends_with(marker.as_char()) {
                stats.terminal += 1;
            }
        }
        stats
    }

    /// Residues carrying the marker, one entry per marker occurrence, sorted.
    /// A marker in first position has no residue before it and is skipped.
    pub fn modified_residues(&self, marker: PtmMarker) -> Vec<char> {
        let mut residues = self
            .peptides
            .keys()
            .flat_map(|sequence| marked_residues(sequence, marker))
            .collect::<Vec<_>>();
        residues.sort_unstable();
        residues
    }
}

fn marked_residues(sequence: &str, marker: PtmMarker) -> impl Iterator<Item = char> + '_ {
    let marker = marker.as_char();
    let mut previous = None;
    sequence.chars().filter_map(move |ch| {
        let residue = if ch == marker { previous } else { None };
        previous = Some(ch);
        residue
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organism {
    name: String,
    proteins: HashMap<String, Protein>,
}

impl Organism {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            proteins: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_peptide(&mut self, sequence: &str, accession: &str) {
        self.protein_entry(accession).add_peptide(sequence);
    }

    /// Folds every protein of `other` into this organism.
    pub fn merge(&mut self, other: Organism) {
        for (accession, protein) in other.proteins {
            match self.proteins.entry(accession) {
                Entry::Occupied(mut entry) => entry.get_mut().merge(protein),
                Entry::Vacant(entry) => {
                    entry.insert(protein);
                }
            }
        }
    }

    /// Finds or inserts the protein for `accession`.
    pub fn protein_entry(&mut self, accession: &str) -> &mut Protein {
        match self.proteins.entry(accession.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Protein::new(accession)),
        }
    }

    pub fn protein(&self, accession: &str) -> Option<&Protein> {
        self.proteins.get(accession)
    }

    pub fn proteins(&self) -> impl Iterator<Item = &Protein> {
        self.proteins.values()
    }

    pub fn protein_count(&self) -> usize {
        self.proteins.len()
    }

    pub fn modified_protein_accessions(&self, marker: PtmMarker) -> Vec<&str> {
        self.accessions_where(|protein| protein.is_modified(marker))
    }

    pub fn unmodified_protein_accessions(&self, marker: PtmMarker) -> Vec<&str> {
        self.accessions_where(|protein| !protein.is_modified(marker))
    }

    pub fn decoy_protein_count(&self) -> usize {
        self.decoy_protein_count_with(&AccessionPrefixes::default())
    }

    pub fn decoy_protein_count_with(&self, prefixes: &AccessionPrefixes) -> usize {
        self.proteins
            .keys()
            .filter(|accession| prefixes.is_decoy(accession))
            .count()
    }

    fn accessions_where<F>(&self, predicate: F) -> Vec<&str>
    where
        F: Fn(&Protein) -> bool,
    {
        let mut accessions = self
            .proteins
            .values()
            .filter(|&protein| predicate(protein))
            .map(Protein::accession)
            .collect::<Vec<_>>();
        accessions.sort_unstable();
        accessions
    }
}

/// All organisms of a run, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct IdentificationModel {
    organisms: HashMap<String, Organism>,
}

impl IdentificationModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organisms<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut model = Self::new();
        for name in names {
            model.organism_entry(name.as_ref());
        }
        model
    }

    pub fn organism_entry(&mut self, name: &str) -> &mut Organism {
        self.organisms
            .entry(name.to_string())
            .or_insert_with(|| Organism::new(name))
    }

    pub fn organism(&self, name: &str) -> Option<&Organism> {
        self.organisms.get(name)
    }

    pub fn organism_mut(&mut self, name: &str) -> Option<&mut Organism> {
        self.organisms.get_mut(name)
    }

    pub fn organisms(&self) -> &HashMap<String, Organism> {
        &self.organisms
    }

    /// Organisms sorted by name.
    pub fn organisms_sorted(&self) -> Vec<&Organism> {
        let mut organisms = self.organisms.values().collect::<Vec<_>>();
        organisms.sort_by(|a, b| a.name.cmp(&b.name));
        organisms
    }

    pub fn len(&self) -> usize {
        self.organisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
    }
}
