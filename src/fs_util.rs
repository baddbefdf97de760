use std::fs;
use std::io::{BufRead, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::MultiGzDecoder;
use tracing::{debug, warn};

use crate::error::PsmError;

/// A candidate result file as listed by a [`ResultSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub file_name: String,
    pub path: Utf8PathBuf,
}

/// Where result files come from: listing plus decompressed access.
pub trait ResultSource {
    /// Human readable location used in diagnostics.
    fn location(&self) -> &str;
    fn list(&self) -> Result<Vec<ResultEntry>, PsmError>;
    fn is_file(&self, entry: &ResultEntry) -> bool;
    fn open(&self, entry: &ResultEntry) -> Result<Box<dyn BufRead + '_>, PsmError>;
}

#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: Utf8PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl ResultSource for DirectorySource {
    fn location(&self) -> &str {
        self.root.as_str()
    }

    fn list(&self) -> Result<Vec<ResultEntry>, PsmError> {
        let dir = fs::read_dir(self.root.as_std_path())
            .map_err(|_| PsmError::ResultDirectoryRead(self.root.as_std_path().to_path_buf()))?;
        let mut entries = Vec::new();
        for entry in dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("unreadable entry in {}: {err}; skipping", self.root);
                    continue;
                }
            };
            let Ok(file_name) = entry.file_name().into_string() else {
                debug!("skipping non UTF-8 file name in {}", self.root);
                continue;
            };
            let path = self.root.join(&file_name);
            entries.push(ResultEntry { file_name, path });
        }
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }

    fn is_file(&self, entry: &ResultEntry) -> bool {
        entry.path.is_file()
    }

    fn open(&self, entry: &ResultEntry) -> Result<Box<dyn BufRead + '_>, PsmError> {
        Ok(Box::new(open_gzip(&entry.path)?))
    }
}

/// Opens a gzip file for line-oriented reading. Concatenated gzip members
/// are read as one stream.
pub fn open_gzip(path: &Utf8Path) -> Result<BufReader<MultiGzDecoder<fs::File>>, PsmError> {
    let file = fs::File::open(path.as_std_path()).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => PsmError::MissingFile(path.as_std_path().to_path_buf()),
        _ => PsmError::Filesystem(format!("open {path}: {err}")),
    })?;
    Ok(BufReader::new(MultiGzDecoder::new(file)))
}
