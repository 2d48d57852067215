use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("invalid genome id: {0}")]
    InvalidGenomeId(String),

    #[error("invalid drug name: {0:?}")]
    InvalidDrugName(String),

    #[error("missing required argument --{0} (pass it or provide --config)")]
    MissingArgument(&'static str),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("input file does not exist: {0}")]
    #[diagnostic(help("expected layout is <root>/<pathogen>/<anti_microbial>/<filename>"))]
    InputNotFound(Utf8PathBuf),

    #[error("failed to read CSV {path}: {message}")]
    CsvRead { path: Utf8PathBuf, message: String },

    #[error("CSV {path} has no `Genome ID` or `genome_id` column")]
    MissingColumn { path: Utf8PathBuf },

    #[error("multiple drugs in this file: {}", .0.join(", "))]
    MultipleDrugs(Vec<String>),

    #[error("drug name mismatch: requested {requested}, file lists {found}")]
    DrugMismatch { requested: String, found: String },

    #[error("no genome ids to download: all {rows} rows have a missing genome_id")]
    NoGenomeIds { rows: usize },

    #[error("BV-BRC request failed: {0}")]
    ApiHttp(String),

    #[error("BV-BRC returned status {status} for genome {genome_id}")]
    ApiStatus { genome_id: String, status: u16 },

    #[error("invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
