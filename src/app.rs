use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::bvbrc::SequenceClient;
use crate::domain::{DrugCheck, DrugName, GenomeId, check_amr_name};
use crate::error::FetchError;
use crate::layout::Layout;
use crate::table::{GenomeTable, TableStats};

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Download again even when `<genome_id>.fa` is already present.
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ItemAction {
    Downloaded { bytes: usize },
    Existing,
    Empty,
    Planned,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub genome_id: GenomeId,
    #[serde(flatten)]
    pub action: ItemAction,
    pub path: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub downloaded: usize,
    pub existing: usize,
    pub empty: usize,
    pub planned: usize,
    pub failed: usize,
}

impl RunCounts {
    fn record(&mut self, action: &ItemAction) {
        match action {
            ItemAction::Downloaded { .. } => self.downloaded += 1,
            ItemAction::Existing => self.existing += 1,
            ItemAction::Empty => self.empty += 1,
            ItemAction::Planned => self.planned += 1,
            ItemAction::Failed { .. } => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub pathogen: String,
    pub anti_microbial: String,
    pub input_path: String,
    pub fasta_dir: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: TableStats,
    pub skipped_lines: usize,
    pub counts: RunCounts,
    pub items: Vec<ItemResult>,
}

pub struct App<C: SequenceClient> {
    layout: Layout,
    client: C,
}

impl<C: SequenceClient> App<C> {
    pub fn new(layout: Layout, client: C) -> Self {
        Self { layout, client }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Validates the table against the requested drug, then walks the genome
    /// ids one at a time. Problems with a single genome are logged and
    /// recorded; only table-level problems abort the run.
    pub fn run(
        &self,
        table: &GenomeTable,
        requested: &DrugName,
        options: FetchOptions,
    ) -> Result<RunSummary, FetchError> {
        let started_at = Utc::now();
        info!(
            pathogen = self.layout.pathogen(),
            anti_microbial = self.layout.anti_microbial(),
            input = %self.layout.input_path(),
            output = %self.layout.fasta_dir(),
            "starting download"
        );

        let label = table.drug_label()?;
        if let (DrugCheck::Mismatch, Some(found)) =
            (check_amr_name(requested, label.as_ref()), label.as_ref())
        {
            return Err(FetchError::DrugMismatch {
                requested: requested.to_string(),
                found: found.to_string(),
            });
        }

        let stats = table.stats();
        info!(
            rows = stats.rows,
            missing = stats.missing_ids,
            missing_pct = stats.missing_fraction * 100.0,
            "genome_id column statistics"
        );
        if stats.all_missing() {
            warn!("every genome_id is missing; stopping the download");
            return Err(FetchError::NoGenomeIds { rows: stats.rows });
        }

        if !options.dry_run {
            self.layout.ensure_fasta_dir()?;
        }

        let mut counts = RunCounts::default();
        let mut items = Vec::new();
        for id in table.genome_ids() {
            let item = self.download_one(id, options);
            counts.record(&item.action);
            items.push(item);
        }

        info!(
            downloaded = counts.downloaded,
            existing = counts.existing,
            empty = counts.empty,
            failed = counts.failed,
            "program execution finished"
        );

        Ok(RunSummary {
            pathogen: self.layout.pathogen().to_string(),
            anti_microbial: self.layout.anti_microbial().to_string(),
            input_path: self.layout.input_path().to_string(),
            fasta_dir: self.layout.fasta_dir().to_string(),
            started_at,
            finished_at: Utc::now(),
            stats,
            skipped_lines: table.skipped_lines,
            counts,
            items,
        })
    }

    pub fn download_one(&self, id: &GenomeId, options: FetchOptions) -> ItemResult {
        let path = self.layout.fasta_path(id);
        let action = self.resolve_action(id, options);
        ItemResult {
            genome_id: id.clone(),
            action,
            path: path.to_string(),
        }
    }

    fn resolve_action(&self, id: &GenomeId, options: FetchOptions) -> ItemAction {
        info!(genome_id = %id, "processing genome");
        if !options.force && self.layout.fasta_exists(id) {
            info!(genome_id = %id, "FASTA file exists; skipping the download");
            return ItemAction::Existing;
        }
        if options.dry_run {
            return ItemAction::Planned;
        }

        let body = match self.client.fetch_fasta(id) {
            Ok(body) => body,
            Err(err) => {
                warn!(genome_id = %id, error = %err, "genome sequence request failed");
                return ItemAction::Failed {
                    error: err.to_string(),
                };
            }
        };
        if body.is_empty() {
            info!(genome_id = %id, "empty response; skipping this file");
            return ItemAction::Empty;
        }

        match self.layout.write_fasta(id, &body) {
            Ok(path) => {
                info!(genome_id = %id, path = %path, bytes = body.len(), "FASTA file written to disk");
                ItemAction::Downloaded { bytes: body.len() }
            }
            Err(err) => {
                error!(genome_id = %id, error = %err, "failed to write FASTA file");
                ItemAction::Failed {
                    error: err.to_string(),
                }
            }
        }
    }
}
