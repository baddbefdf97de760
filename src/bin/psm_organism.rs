use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use psm_organism::config::{ConfigLoader, ConfigOverrides};
use psm_organism::domain::{DecoyPolicy, MalformedRowPolicy, PtmMarker};
use psm_organism::error::PsmError;
use psm_organism::fs_util::DirectorySource;
use psm_organism::output::{self, JsonOutput, OutputMode, RunReport, TextOutput};
use psm_organism::pipeline::{Pipeline, ProgressSink};

#[derive(Parser)]
#[command(name = "psm-organism")]
#[command(about = "Aggregate PSM search results into per-organism protein identifications")]
#[command(version, author)]
struct Cli {
    /// Directory holding the gzipped PSM result files
    #[arg(short = 'd', long)]
    directory: Utf8PathBuf,

    /// Tab-separated file mapping organisms to PSM file stems
    #[arg(short = 'o', long)]
    organisms: PathBuf,

    #[arg(long)]
    config: Option<String>,

    /// Maximum accepted q-value
    #[arg(long)]
    qvalue: Option<f64>,

    #[arg(long)]
    decoys: Option<DecoyPolicy>,

    #[arg(long)]
    on_malformed_row: Option<MalformedRowPolicy>,

    /// Character marking modified residues in peptide strings
    #[arg(long)]
    ptm: Option<String>,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<PsmError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PsmError) -> u8 {
    match error {
        PsmError::AssociationRead(_)
        | PsmError::ResultDirectoryRead(_)
        | PsmError::ConfigRead(_)
        | PsmError::ConfigParse(_)
        | PsmError::InvalidConfig(_)
        | PsmError::InvalidPtmMarker(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let marker = cli.ptm.as_deref().map(str::parse::<PtmMarker>).transpose()?;
    let overrides = ConfigOverrides {
        q_value_cutoff: cli.qvalue,
        decoy_policy: cli.decoys,
        malformed_row_policy: cli.on_malformed_row,
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?.with_overrides(&overrides)?;
    let prefixes = config.parser.prefixes.clone();

    let pipeline = Pipeline::new(DirectorySource::new(cli.directory), config);
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Text => &TextOutput,
    };
    let result = pipeline.run(&cli.organisms, sink)?;

    let report = RunReport {
        summary: &result.summary,
        organisms: output::overview(&result.model, &prefixes, marker),
    };
    match output_mode {
        OutputMode::Json => JsonOutput::print_report(&report).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_report(&report).into_diagnostic()?,
    }
    Ok(())
}
