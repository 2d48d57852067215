use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::domain::GenomeId;
use crate::error::FetchError;

pub const DEFAULT_FASTA_DIR: &str = "fasta_files";
pub const LOG_DIR: &str = "logs";

/// Directory layout of one pathogen/drug download:
///
/// ```text
/// <root>/<pathogen>/<anti_microbial>/<filename>   input CSV
/// <root>/<pathogen>/fasta_files/<genome_id>.fa    output
/// <root>/<pathogen>/logs/download_<pathogen>_<anti_microbial>.log
/// ```
#[derive(Debug, Clone)]
pub struct Layout {
    root: Utf8PathBuf,
    pathogen: String,
    anti_microbial: String,
    filename: String,
    fasta_dir: Utf8PathBuf,
}

impl Layout {
    pub fn new(root: Utf8PathBuf, pathogen: &str, anti_microbial: &str, filename: &str) -> Self {
        let fasta_dir = root.join(pathogen).join(DEFAULT_FASTA_DIR);
        Self {
            root,
            pathogen: pathogen.to_string(),
            anti_microbial: anti_microbial.to_string(),
            filename: filename.to_string(),
            fasta_dir,
        }
    }

    /// Relative directories resolve against `root`.
    pub fn with_fasta_dir(mut self, fasta_dir: &Utf8Path) -> Self {
        self.fasta_dir = self.root.join(fasta_dir);
        self
    }

    pub fn from_cwd(pathogen: &str, anti_microbial: &str, filename: &str) -> Result<Self, FetchError> {
        let cwd = std::env::current_dir().map_err(|err| FetchError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| FetchError::Filesystem("invalid working directory path".to_string()))?;
        Ok(Self::new(root, pathogen, anti_microbial, filename))
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn pathogen(&self) -> &str {
        &self.pathogen
    }

    pub fn anti_microbial(&self) -> &str {
        &self.anti_microbial
    }

    pub fn input_path(&self) -> Utf8PathBuf {
        self.root
            .join(&self.pathogen)
            .join(&self.anti_microbial)
            .join(&self.filename)
    }

    pub fn fasta_dir(&self) -> &Utf8Path {
        &self.fasta_dir
    }

    pub fn fasta_path(&self, id: &GenomeId) -> Utf8PathBuf {
        self.fasta_dir.join(id.file_name())
    }

    pub fn fasta_exists(&self, id: &GenomeId) -> bool {
        self.fasta_path(id).as_std_path().exists()
    }

    pub fn log_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.pathogen).join(LOG_DIR)
    }

    pub fn log_path(&self) -> Utf8PathBuf {
        self.log_dir().join(format!(
            "download_{}_{}.log",
            self.pathogen, self.anti_microbial
        ))
    }

    pub fn ensure_fasta_dir(&self) -> Result<(), FetchError> {
        fs::create_dir_all(self.fasta_dir.as_std_path())
            .map_err(|err| FetchError::Filesystem(format!("create {}: {err}", self.fasta_dir)))
    }

    /// Fails with `InputNotFound` unless the input CSV is in place. Nothing is
    /// created on disk before this passes.
    pub fn check_input(&self) -> Result<Utf8PathBuf, FetchError> {
        let input = self.input_path();
        if !input.as_std_path().is_file() {
            return Err(FetchError::InputNotFound(input));
        }
        Ok(input)
    }

    /// Creates `<pathogen>/logs` only; the pathogen directory must already exist.
    pub fn ensure_log_dir(&self) -> Result<(), FetchError> {
        let dir = self.log_dir();
        match fs::create_dir(dir.as_std_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && dir.as_std_path().is_dir() => {
                Ok(())
            }
            Err(err) => Err(FetchError::Filesystem(format!("create {dir}: {err}"))),
        }
    }

    /// Writes `<genome_id>.fa` through a temp file in the same directory, so an
    /// interrupted run never leaves a truncated file that a rerun would skip.
    pub fn write_fasta(&self, id: &GenomeId, body: &str) -> Result<Utf8PathBuf, FetchError> {
        let dest = self.fasta_path(id);
        let mut temp = Builder::new()
            .prefix(".amr-fetch")
            .tempfile_in(self.fasta_dir.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        temp.write_all(body.as_bytes())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        temp.persist(dest.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        Ok(dest)
    }
}
