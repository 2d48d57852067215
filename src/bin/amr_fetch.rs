use std::process::ExitCode;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use miette::IntoDiagnostic;

use amr_genome_fetch::app::{App, FetchOptions};
use amr_genome_fetch::bvbrc::{BvbrcHttpClient, ClientSettings};
use amr_genome_fetch::config::{ConfigLoader, Overrides, ResolvedConfig};
use amr_genome_fetch::domain::DrugName;
use amr_genome_fetch::error::FetchError;
use amr_genome_fetch::layout::Layout;
use amr_genome_fetch::logging;
use amr_genome_fetch::output::{HumanOutput, JsonOutput, OutputMode};
use amr_genome_fetch::table::read_genome_table;

#[derive(Parser)]
#[command(name = "amr-fetch")]
#[command(
    about = "Read CSV files and download FASTA files corresponding to the genome IDs in the CSV files"
)]
#[command(version, author)]
struct Cli {
    /// Pathogen name; there must be a directory with exactly this name.
    #[arg(long)]
    pathogen: Option<String>,

    /// Anti microbial name; there must be a folder with exactly this name
    /// under the pathogen directory.
    #[arg(long = "anti_microbial", visible_alias = "anti-microbial")]
    anti_microbial: Option<String>,

    /// Name of the CSV file holding the genome IDs.
    #[arg(long)]
    filename: Option<String>,

    /// JSON config file supplying any of the values above.
    #[arg(long)]
    config: Option<String>,

    /// Directory the pathogen folders live in (default: current directory).
    #[arg(long)]
    root: Option<String>,

    /// Download again even if <genome_id>.fa already exists.
    #[arg(long)]
    force: bool,

    #[arg(long)]
    dry_run: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Extra attempts for throttled or failed requests.
    #[arg(long)]
    retries: Option<usize>,
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
        FetchError::MissingArgument(_)
        | FetchError::ConfigRead(_)
        | FetchError::ConfigParse(_)
        | FetchError::InputNotFound(_)
        | FetchError::CsvRead { .. }
        | FetchError::MissingColumn { .. }
        | FetchError::MultipleDrugs(_)
        | FetchError::DrugMismatch { .. }
        | FetchError::NoGenomeIds { .. }
        | FetchError::InvalidDrugName(_)
        | FetchError::InvalidHeader { .. } => 2,
        FetchError::ApiHttp(_) | FetchError::ApiStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let overrides = Overrides {
        pathogen: cli.pathogen,
        anti_microbial: cli.anti_microbial,
        filename: cli.filename,
        timeout_secs: cli.timeout,
        retries: cli.retries,
    };
    let resolved = ConfigLoader::resolve(cli.config.as_deref().map(Utf8Path::new), overrides)?;
    let layout = build_layout(&resolved, cli.root.as_deref())?;

    let input = layout.check_input()?;
    layout.ensure_log_dir()?;
    logging::init(Some(layout.log_path().as_path()))?;
    tracing::info!(
        pathogen = %resolved.pathogen,
        anti_microbial = %resolved.anti_microbial,
        filename = %resolved.filename,
        "resolved configuration"
    );

    let requested: DrugName = resolved.anti_microbial.parse()?;
    let table = read_genome_table(&input)?;

    let settings = ClientSettings {
        timeout: Duration::from_secs(resolved.timeout_secs),
        retries: resolved.retries,
        ..ClientSettings::default()
    }
    .with_overrides(resolved.url.clone(), resolved.headers.clone());
    let client = BvbrcHttpClient::new(settings)?;

    let app = App::new(layout, client);
    let options = FetchOptions {
        force: cli.force,
        dry_run: cli.dry_run,
    };
    let summary = app.run(&table, &requested, options)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_summary(&summary).into_diagnostic()?,
        OutputMode::Human => HumanOutput::print_summary(&summary).into_diagnostic()?,
    }
    Ok(())
}

fn build_layout(resolved: &ResolvedConfig, root: Option<&str>) -> Result<Layout, FetchError> {
    let layout = match root {
        Some(root) => Layout::new(
            Utf8PathBuf::from(root),
            &resolved.pathogen,
            &resolved.anti_microbial,
            &resolved.filename,
        ),
        None => Layout::from_cwd(
            &resolved.pathogen,
            &resolved.anti_microbial,
            &resolved.filename,
        )?,
    };
    Ok(match &resolved.fasta_dir {
        Some(dir) => layout.with_fasta_dir(dir),
        None => layout,
    })
}
