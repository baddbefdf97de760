use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PsmError;

pub const RESULT_FILE_SUFFIX: &str = ".txt.gz";
pub const DEFAULT_CONTAMINANT_PREFIX: &str = "Con";
pub const DEFAULT_DECOY_PREFIX: &str = "XXX";

static SEARCH_ENGINE_INFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_msgf(?:db|plus)_fht").expect("static regex"));

/// Derives the association stem from a result file name, e.g.
/// `sample1_msgfplus_fht.txt.gz` -> `sample1`. Returns `None` for files that
/// are not gzipped text results.
pub fn result_file_stem(file_name: &str) -> Option<String> {
    let base = file_name.strip_suffix(RESULT_FILE_SUFFIX)?;
    Some(SEARCH_ENGINE_INFIX.replace_all(base, "").into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessionClass {
    Target,
    Decoy,
    Contaminant,
}

/// Accession prefixes marking search-database artefacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessionPrefixes {
    pub contaminant: String,
    pub decoy: String,
}

impl Default for AccessionPrefixes {
    fn default() -> Self {
        Self {
            contaminant: DEFAULT_CONTAMINANT_PREFIX.to_string(),
            decoy: DEFAULT_DECOY_PREFIX.to_string(),
        }
    }
}

impl AccessionPrefixes {
    pub fn classify(&self, accession: &str) -> AccessionClass {
        if accession.starts_with(&self.contaminant) {
            AccessionClass::Contaminant
        } else if accession.starts_with(&self.decoy) {
            AccessionClass::Decoy
        } else {
            AccessionClass::Target
        }
    }

    pub fn is_decoy(&self, accession: &str) -> bool {
        accession.starts_with(&self.decoy)
    }
}

/// What to do with decoy PSMs that pass the q-value filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DecoyPolicy {
    /// Count them and attribute them to the model like any other record.
    #[default]
    Merge,
    /// Count them but keep them out of the model.
    Exclude,
}

impl fmt::Display for DecoyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoyPolicy::Merge => write!(f, "merge"),
            DecoyPolicy::Exclude => write!(f, "exclude"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRowPolicy {
    #[default]
    Skip,
    Abort,
}

impl fmt::Display for MalformedRowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedRowPolicy::Skip => write!(f, "skip"),
            MalformedRowPolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Single character used in peptide strings to flag a modified residue.
/// The marker follows the residue it modifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PtmMarker(char);

impl PtmMarker {
    pub fn new(marker: char) -> Self {
        Self(marker)
    }

    pub fn as_char(&self) -> char {
        self.0
    }
}

impl fmt::Display for PtmMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<char> for PtmMarker {
    fn from(marker: char) -> Self {
        Self(marker)
    }
}

impl FromStr for PtmMarker {
    type Err = PsmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if !ch.is_whitespace() => Ok(Self(ch)),
            _ => Err(PsmError::InvalidPtmMarker(value.to_string())),
        }
    }
}
