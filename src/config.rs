use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

pub const DEFAULT_FILE_NAME: &str = "BVBRC_genome_amr.csv";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// On-disk config file. Mirrors the fixed settings the download used to carry
/// inline: organism and drug, input file name, output directory, endpoint.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub organism: Option<String>,
    #[serde(default)]
    pub drug_name: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub fasta_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,
    #[serde(default)]
    pub http: Option<HttpConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub retries: Option<usize>,
}

/// Values given on the command line. They take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub pathogen: Option<String>,
    pub anti_microbial: Option<String>,
    pub filename: Option<String>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub pathogen: String,
    pub anti_microbial: String,
    pub filename: String,
    pub fasta_dir: Option<Utf8PathBuf>,
    pub url: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub timeout_secs: u64,
    pub retries: usize,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Utf8Path) -> Result<Config, FetchError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| FetchError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| FetchError::ConfigParse(err.to_string()))
    }

    pub fn resolve(
        path: Option<&Utf8Path>,
        overrides: Overrides,
    ) -> Result<ResolvedConfig, FetchError> {
        let config = path.map(Self::load).transpose()?;
        Self::resolve_config(config, overrides)
    }

    /// Without a config file all three of pathogen, drug and file name must
    /// come from the command line; with one, the file name has a default.
    pub fn resolve_config(
        config: Option<Config>,
        overrides: Overrides,
    ) -> Result<ResolvedConfig, FetchError> {
        let from_file = config.is_some();
        let config = config.unwrap_or_default();
        let pathogen = non_empty(overrides.pathogen)
            .or(non_empty(config.organism))
            .ok_or(FetchError::MissingArgument("pathogen"))?;
        let anti_microbial = non_empty(overrides.anti_microbial)
            .or(non_empty(config.drug_name))
            .ok_or(FetchError::MissingArgument("anti_microbial"))?;
        let filename = match non_empty(overrides.filename).or(non_empty(config.file_name)) {
            Some(filename) => filename,
            None if from_file => DEFAULT_FILE_NAME.to_string(),
            None => return Err(FetchError::MissingArgument("filename")),
        };

        let endpoint = config.endpoint.unwrap_or_default();
        let http = config.http.unwrap_or_default();

        Ok(ResolvedConfig {
            pathogen,
            anti_microbial,
            filename,
            fasta_dir: config.fasta_dir,
            url: endpoint.url,
            headers: endpoint.headers,
            timeout_secs: overrides
                .timeout_secs
                .or(http.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            retries: overrides.retries.or(http.retries).unwrap_or(0),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn cli_flags_are_enough() {
        let overrides = Overrides {
            pathogen: Some("klebsiella_pneumoniae".to_string()),
            anti_microbial: Some("amikacin".to_string()),
            filename: Some("amr.csv".to_string()),
            ..Overrides::default()
        };
        let resolved = ConfigLoader::resolve(None, overrides).unwrap();
        assert_eq!(resolved.pathogen, "klebsiella_pneumoniae");
        assert_eq!(resolved.filename, "amr.csv");
        assert_eq!(resolved.fasta_dir, None);
        assert_eq!(resolved.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(resolved.retries, 0);
    }

    #[test]
    fn config_file_values_and_overrides() {
        let config: Config = serde_json::from_str(
            r#"{
                "organism": "klebsiella_pneumoniae",
                "drug_name": "amikacin",
                "fasta_dir": "fasta_files",
                "endpoint": { "headers": { "User-Agent": "test" } },
                "http": { "timeout_secs": 30, "retries": 2 }
            }"#,
        )
        .unwrap();
        let overrides = Overrides {
            anti_microbial: Some("gentamicin".to_string()),
            retries: Some(5),
            ..Overrides::default()
        };

        let resolved = ConfigLoader::resolve_config(Some(config), overrides).unwrap();
        assert_eq!(resolved.pathogen, "klebsiella_pneumoniae");
        assert_eq!(resolved.anti_microbial, "gentamicin");
        assert_eq!(resolved.filename, DEFAULT_FILE_NAME);
        assert_eq!(resolved.fasta_dir.as_deref(), Some(Utf8Path::new("fasta_files")));
        assert_eq!(resolved.url, None);
        assert_eq!(
            resolved.headers.unwrap().get("User-Agent").map(String::as_str),
            Some("test")
        );
        assert_eq!(resolved.timeout_secs, 30);
        assert_eq!(resolved.retries, 5);
    }

    #[test]
    fn missing_flag_without_config() {
        let overrides = Overrides {
            pathogen: Some("klebsiella_pneumoniae".to_string()),
            anti_microbial: Some("amikacin".to_string()),
            ..Overrides::default()
        };
        let err = ConfigLoader::resolve(None, overrides).unwrap_err();
        assert_matches!(err, FetchError::MissingArgument("filename"));
    }
}
