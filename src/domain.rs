use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::FetchError;

static GENOME_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("genome id pattern compiles"));

/// BV-BRC genome identifier, e.g. `573.12345`.
///
/// The text is kept verbatim so that trailing zeros in the suffix survive
/// (`573.120` and `573.12` are different genomes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GenomeId(String);

impl GenomeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.fa", self.0)
    }
}

impl fmt::Display for GenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for GenomeId {
    type Error = FetchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GenomeId> for String {
    fn from(id: GenomeId) -> Self {
        id.0
    }
}

impl FromStr for GenomeId {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if !GENOME_ID_RE.is_match(normalized) {
            return Err(FetchError::InvalidGenomeId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugName(String);

impl DrugName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, other: &DrugName) -> bool {
        self.0.to_lowercase() == other.0.to_lowercase()
    }
}

impl fmt::Display for DrugName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DrugName {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if normalized.is_empty() {
            return Err(FetchError::InvalidDrugName(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrugCheck {
    Match,
    Mismatch,
    Unlabelled,
}

impl DrugCheck {
    pub fn is_accepted(self) -> bool {
        !matches!(self, DrugCheck::Mismatch)
    }
}

/// Compares the drug requested on the command line with the label found in
/// the CSV. A file without a label is accepted, with a warning.
pub fn check_amr_name(requested: &DrugName, from_file: Option<&DrugName>) -> DrugCheck {
    let Some(from_file) = from_file else {
        warn!("the file does not contain the name of the drug; make sure {requested} is correct");
        return DrugCheck::Unlabelled;
    };

    info!(
        requested = %requested.as_str().to_lowercase(),
        file = %from_file.as_str().to_lowercase(),
        "comparing anti microbial names"
    );
    if requested.matches(from_file) {
        info!("names match");
        DrugCheck::Match
    } else {
        warn!("names do not match");
        DrugCheck::Mismatch
    }
}
