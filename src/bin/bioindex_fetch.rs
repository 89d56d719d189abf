use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use bioindex_fetcher::app::{Fetcher, ProgressSink};
use bioindex_fetcher::bioindex::BioindexHttpClient;
use bioindex_fetcher::config::ConfigLoader;
use bioindex_fetcher::domain::PhenotypeSet;
use bioindex_fetcher::error::FetchError;
use bioindex_fetcher::ledger::{ResumeLedger, read_rsid_list};
use bioindex_fetcher::output::{ConsoleOutput, JsonOutput};

#[derive(Parser)]
#[command(name = "bioindex-fetch")]
#[command(about = "Fetch the strongest BioIndex association per rsid into a resumable CSV")]
#[command(version, author)]
struct Cli {
    /// Text file with one rsid per line
    #[arg(long)]
    rslist: Utf8PathBuf,

    /// Comma-separated phenotype names to keep
    #[arg(long)]
    pheno: PhenotypeSet,

    /// CSV that failed rsids are appended to
    #[arg(long)]
    failed: Utf8PathBuf,

    /// CSV that results are appended to
    #[arg(long)]
    output: Utf8PathBuf,

    /// JSON config overriding the API base URL, origin and inline threshold
    #[arg(long)]
    config: Option<String>,

    /// Print the run summary as JSON instead of progress lines
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<FetchError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &FetchError) -> u8 {
    match error {
        FetchError::InvalidRsid(_)
        | FetchError::InvalidPhenotypes(_)
        | FetchError::InputRead(_)
        | FetchError::ConfigRead(_)
        | FetchError::ConfigParse(_) => 2,
        FetchError::DatasetCatalog(_)
        | FetchError::BioindexHttp(_)
        | FetchError::BioindexStatus { .. }
        | FetchError::MalformedResponse { .. } => 3,
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
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let rsids = read_rsid_list(&cli.rslist)?;

    let mut ledger = ResumeLedger::open(&cli.output, &cli.failed)?;
    let sink: &dyn ProgressSink = if cli.json { &JsonOutput } else { &ConsoleOutput };
    if !cli.json {
        if ledger.processed_count() > 0 {
            println!(
                "found existing output, rsids already processed: {}",
                ledger.processed_count()
            );
        }
        if ledger.failed_count() > 0 {
            println!(
                "found existing failure file, rsids already failed: {}",
                ledger.failed_count()
            );
        }
    }

    let client = BioindexHttpClient::new(&config)?;
    let fetcher = Fetcher::new(client)?;
    let summary = fetcher.run(&rsids, &cli.pheno, &mut ledger, sink)?;

    if cli.json {
        JsonOutput::print_summary(&summary).into_diagnostic()?;
    } else {
        ConsoleOutput::print_summary(&summary);
    }
    Ok(())
}
