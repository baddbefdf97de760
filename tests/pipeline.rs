use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use flate2::Compression;
use flate2::write::GzEncoder;

use psm_organism::association::AssociationIndex;
use psm_organism::config::ResolvedConfig;
use psm_organism::domain::MalformedRowPolicy;
use psm_organism::error::PsmError;
use psm_organism::fs_util::{DirectorySource, ResultEntry, ResultSource};
use psm_organism::pipeline::{Pipeline, SilentSink};

const HEADER: &str = "#SpecFile\tSpecID\tScanNum\tFragMethod\tCharge\tPrecursor\tIsotopeError\tPrecursorError(ppm)\tRank\tPeptide\tProtein\tDeNovoScore\tMSGFScore\tEValue\tSpecEValue\tPepQValue\tFDR\tQValue";

fn psm_line(peptide: &str, protein: &str, q_value: &str) -> String {
    let mut fields = vec!["0"; 18];
    fields[4] = "2";
    fields[9] = peptide;
    fields[10] = protein;
    fields[17] = q_value;
    fields.join("\t")
}

fn result_content(lines: &[String]) -> String {
    let mut content = format!("{HEADER}\n");
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    content
}

struct MemorySource {
    files: Vec<(String, Option<String>)>,
}

impl ResultSource for MemorySource {
    fn location(&self) -> &str {
        "memory"
    }

    fn list(&self) -> Result<Vec<ResultEntry>, PsmError> {
        Ok(self
            .files
            .iter()
            .map(|(name, _)| ResultEntry {
                file_name: name.clone(),
                path: Utf8PathBuf::from(name),
            })
            .collect())
    }

    fn is_file(&self, entry: &ResultEntry) -> bool {
        self.files
            .iter()
            .any(|(name, content)| *name == entry.file_name && content.is_some())
    }

    fn open(&self, entry: &ResultEntry) -> Result<Box<dyn BufRead + '_>, PsmError> {
        self.files
            .iter()
            .find(|(name, _)| *name == entry.file_name)
            .and_then(|(_, content)| content.as_deref())
            .map(|content| Box::new(content.as_bytes()) as Box<dyn BufRead + '_>)
            .ok_or_else(|| PsmError::MissingFile(entry.path.clone().into_std_path_buf()))
    }
}

fn ecoli_index() -> AssociationIndex {
    let table = "Organism\tFiles\nEcoli\tsample1,sample2\n";
    AssociationIndex::from_reader(table.as_bytes(), MalformedRowPolicy::Skip).unwrap()
}

#[test]
fn end_to_end_in_memory() {
    let source = MemorySource {
        files: vec![
            (
                "sample1_msgfplus_fht.txt.gz".to_string(),
                Some(result_content(&[
                    psm_line("K.PEPTIDE.R", "XXX_P9", "0.0001"),
                    psm_line("K.PEPTIDE.R", "sp|P1", "0.0001"),
                ])),
            ),
            (
                "sample2.txt.gz".to_string(),
                Some(result_content(&[
                    psm_line("K.PEPTIDE.R", "sp|P1", "0.0005"),
                    psm_line("K.OTHERK.R", "sp|P3", "0.05"),
                ])),
            ),
        ],
    };

    let pipeline = Pipeline::new(source, ResolvedConfig::default());
    let output = pipeline
        .run_with_index(&ecoli_index(), "FileToOrganisms.txt", &SilentSink)
        .unwrap();

    let ecoli = output.model.organism("Ecoli").unwrap();
    assert_eq!(ecoli.protein_count(), 2);
    assert_eq!(ecoli.decoy_protein_count(), 1);
    assert!(ecoli.protein("sp|P3").is_none());
    assert_eq!(ecoli.protein("sp|P1").unwrap().spectrum_count("PEPTIDE"), 2);

    let summary = output.summary;
    assert_eq!(summary.files.parsed, 2);
    assert_eq!(summary.records.target_psms, 2);
    assert_eq!(summary.records.decoy_psms, 1);
    assert_eq!(summary.records.rejected_q_value, 1);
}

#[test]
fn unroutable_and_missing_files_are_skipped() {
    let source = MemorySource {
        files: vec![
            ("notes.txt".to_string(), Some(String::new())),
            (
                "stranger.txt.gz".to_string(),
                Some(result_content(&[psm_line("K.PEPTIDE.R", "P1", "0.0")])),
            ),
            ("sample2_msgfdb_fht.txt.gz".to_string(), None),
            (
                "sample1.txt.gz".to_string(),
                Some(result_content(&[psm_line("K.PEPTIDE.R", "P1", "0.0")])),
            ),
        ],
    };

    let pipeline = Pipeline::new(source, ResolvedConfig::default());
    let output = pipeline
        .run_with_index(&ecoli_index(), "FileToOrganisms.txt", &SilentSink)
        .unwrap();

    let files = output.summary.files;
    assert_eq!(files.listed, 4);
    assert_eq!(files.ignored, 1);
    assert_eq!(files.unroutable, 1);
    assert_eq!(files.missing, 1);
    assert_eq!(files.parsed, 1);
    assert_eq!(output.summary.unroutable_files, vec!["stranger.txt.gz"]);
    assert_eq!(output.model.organism("Ecoli").unwrap().protein_count(), 1);
}

fn write_gzip(path: &Path, content: &str) {
    let file = fs::File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

#[test]
fn end_to_end_on_disk() {
    let temp = tempfile::tempdir().unwrap();
    let results = temp.path().join("MSGF.Searches");
    fs::create_dir_all(&results).unwrap();
    let association = temp.path().join("FileToOrganisms.txt");
    fs::write(
        &association,
        "Organism\tFiles\nEcoli\tsample1, sample2\nBsubtilis\tsample3\n",
    )
    .unwrap();

    write_gzip(
        &results.join("sample1_msgfplus_fht.txt.gz"),
        &result_content(&[
            psm_line("K.PEPTIDE.R", "XXX_P9", "0.0001"),
            psm_line("K.PEPTIDE.R", "P1", "0.0001"),
        ]),
    );
    write_gzip(
        &results.join("sample2_msgfplus_fht.txt.gz"),
        &result_content(&[
            psm_line("K.AK*LR.R", "P1", "0.0002"),
            psm_line("K.OTHERK.R", "P3", "0.5"),
        ]),
    );
    write_gzip(
        &results.join("sample3.txt.gz"),
        &result_content(&[psm_line("K.PEPTIDE.R", "Con_TRYP", "0.0")]),
    );
    fs::create_dir_all(results.join("sample1.txt.gz")).unwrap();

    let directory = Utf8PathBuf::from_path_buf(results).unwrap();
    let pipeline = Pipeline::new(DirectorySource::new(directory), ResolvedConfig::default());
    let output = pipeline.run(&association, &SilentSink).unwrap();

    let ecoli = output.model.organism("Ecoli").unwrap();
    assert_eq!(ecoli.protein_count(), 2);
    assert_eq!(ecoli.decoy_protein_count(), 1);
    assert_eq!(
        ecoli.modified_protein_accessions('*'.into()),
        vec!["P1"]
    );

    let bsubtilis = output.model.organism("Bsubtilis").unwrap();
    assert_eq!(bsubtilis.protein_count(), 0);

    assert_eq!(output.summary.association.file_associations, 3);
    assert_eq!(output.summary.association.organisms, 2);
    assert_eq!(output.summary.files.parsed, 3);
    assert_eq!(output.summary.files.missing, 1);
    assert_eq!(output.summary.records.rejected_contaminant, 1);
}

#[test]
fn unreadable_association_file_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let directory = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let pipeline = Pipeline::new(DirectorySource::new(directory), ResolvedConfig::default());
    let err = pipeline
        .run(&temp.path().join("missing.txt"), &SilentSink)
        .unwrap_err();
    assert_matches!(err, PsmError::AssociationRead(_));
}

#[test]
fn failed_files_contribute_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let results = temp.path().join("MSGF.Searches");
    fs::create_dir_all(&results).unwrap();
    let association = temp.path().join("FileToOrganisms.txt");
    fs::write(&association, "Organism\tFiles\nEcoli\ts1,s2,s3\n").unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(
            result_content(&[
                psm_line("K.PEPTIDE.R", "P1", "0.0"),
                psm_line("K.PEPTIDE.R", "P2", "0.0"),
            ])
            .as_bytes(),
        )
        .unwrap();
    let compressed = encoder.finish().unwrap();
    fs::write(
        results.join("s1.txt.gz"),
        &compressed[..compressed.len() - 6],
    )
    .unwrap();
    fs::write(
        results.join("s2.txt.gz"),
        result_content(&[psm_line("K.PEPTIDE.R", "P3", "0.0")]),
    )
    .unwrap();
    write_gzip(
        &results.join("s3.txt.gz"),
        &result_content(&[psm_line("K.OTHERK.R", "P4", "0.0")]),
    );

    let directory = Utf8PathBuf::from_path_buf(results).unwrap();
    let pipeline = Pipeline::new(DirectorySource::new(directory), ResolvedConfig::default());
    let output = pipeline.run(&association, &SilentSink).unwrap();

    let files = output.summary.files;
    assert_eq!(files.listed, 3);
    assert_eq!(files.failed, 2);
    assert_eq!(files.parsed, 1);
    assert_eq!(output.summary.failed_files, vec!["s1.txt.gz", "s2.txt.gz"]);
    assert_eq!(output.summary.records.accepted, 1);

    let ecoli = output.model.organism("Ecoli").unwrap();
    assert_eq!(ecoli.protein_count(), 1);
    assert!(ecoli.protein("P4").is_some());
}

#[test]
fn unreadable_result_directory_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let association = temp.path().join("FileToOrganisms.txt");
    fs::write(&association, "Organism\tFiles\nEcoli\ts1\n").unwrap();
    let directory = Utf8PathBuf::from_path_buf(temp.path().join("absent")).unwrap();
    let pipeline = Pipeline::new(DirectorySource::new(directory), ResolvedConfig::default());
    let err = pipeline.run(&association, &SilentSink).unwrap_err();
    assert_matches!(err, PsmError::ResultDirectoryRead(_));
}
