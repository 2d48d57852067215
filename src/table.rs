use std::fs::File;

use camino::Utf8Path;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{DrugName, GenomeId};
use crate::error::FetchError;

/// Header used by BV-BRC AMR exports.
pub const EXPORT_ID_COLUMN: &str = "Genome ID";
pub const GENOME_ID_COLUMN: &str = "genome_id";
pub const ANTIBIOTIC_COLUMN: &str = "Antibiotic";

/// Cell spellings read as missing, matched exactly (the pandas `na_values` set).
const MISSING_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeRecord {
    pub genome_id: Option<GenomeId>,
    pub antibiotic: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenomeTable {
    pub columns: Vec<String>,
    pub records: Vec<GenomeRecord>,
    pub skipped_lines: usize,
    pub invalid_ids: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TableStats {
    pub rows: usize,
    pub missing_ids: usize,
    pub missing_fraction: f64,
}

impl TableStats {
    pub fn all_missing(&self) -> bool {
        self.rows == 0 || self.missing_ids == self.rows
    }
}

pub fn read_genome_table(path: &Utf8Path) -> Result<GenomeTable, FetchError> {
    if !path.as_std_path().exists() {
        return Err(FetchError::InputNotFound(path.to_path_buf()));
    }
    let file = File::open(path.as_std_path()).map_err(|err| FetchError::CsvRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let table = parse_genome_table(file, path)?;
    info!(
        path = %path,
        rows = table.records.len(),
        skipped = table.skipped_lines,
        "successfully read the data file"
    );
    Ok(table)
}

/// Parses an AMR export from any reader. `path` is only used in errors.
pub fn parse_genome_table<R: std::io::Read>(
    reader: R,
    path: &Utf8Path,
) -> Result<GenomeTable, FetchError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().map_err(|err| FetchError::CsvRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let columns = canonical_columns(headers);

    let id_index = columns
        .iter()
        .position(|name| name == GENOME_ID_COLUMN)
        .ok_or_else(|| FetchError::MissingColumn {
            path: path.to_path_buf(),
        })?;
    let drug_index = columns.iter().position(|name| name == ANTIBIOTIC_COLUMN);

    let mut records = Vec::new();
    let mut skipped_lines = 0usize;
    let mut invalid_ids = 0usize;

    for (index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(err) if err.is_io_error() => {
                return Err(FetchError::CsvRead {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                });
            }
            Err(err) => {
                warn!(row = index + 1, error = %err, "skipping unreadable line");
                skipped_lines += 1;
                continue;
            }
        };
        // Short rows keep their leading cells; the absent trailing ones read as missing.
        if record.len() > columns.len() {
            warn!(
                row = index + 1,
                expected = columns.len(),
                found = record.len(),
                "skipping line with too many fields"
            );
            skipped_lines += 1;
            continue;
        }

        let genome_id = match present(record.get(id_index)) {
            Some(raw) => match raw.parse::<GenomeId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    debug!(row = index + 1, value = raw, "genome id is not numeric");
                    invalid_ids += 1;
                    None
                }
            },
            None => None,
        };
        let antibiotic = drug_index
            .and_then(|idx| present(record.get(idx)))
            .map(str::to_string);

        records.push(GenomeRecord {
            genome_id,
            antibiotic,
        });
    }

    Ok(GenomeTable {
        columns,
        records,
        skipped_lines,
        invalid_ids,
    })
}

impl GenomeTable {
    pub fn stats(&self) -> TableStats {
        let rows = self.records.len();
        let missing_ids = self
            .records
            .iter()
            .filter(|record| record.genome_id.is_none())
            .count();
        let missing_fraction = if rows == 0 {
            0.0
        } else {
            missing_ids as f64 / rows as f64
        };
        TableStats {
            rows,
            missing_ids,
            missing_fraction,
        }
    }

    /// Distinct antibiotic labels in first-seen order.
    pub fn antibiotics(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for label in self.records.iter().filter_map(|r| r.antibiotic.as_ref()) {
            if !seen.iter().any(|existing| existing == label) {
                seen.push(label.clone());
            }
        }
        seen
    }

    pub fn drug_label(&self) -> Result<Option<DrugName>, FetchError> {
        let mut labels = self.antibiotics();
        match labels.len() {
            0 => Ok(None),
            1 => labels.pop().map(|label| label.parse()).transpose(),
            _ => Err(FetchError::MultipleDrugs(labels)),
        }
    }

    pub fn genome_ids(&self) -> impl Iterator<Item = &GenomeId> {
        self.records.iter().filter_map(|r| r.genome_id.as_ref())
    }
}

fn canonical_columns(headers: &StringRecord) -> Vec<String> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let name = if idx == 0 {
                name.trim_start_matches('\u{feff}')
            } else {
                name
            };
            if name == EXPORT_ID_COLUMN {
                GENOME_ID_COLUMN.to_string()
            } else {
                name.to_string()
            }
        })
        .collect()
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && !MISSING_MARKERS.contains(v))
}
