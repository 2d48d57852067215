use std::ffi::OsStr;
use std::io::{self, IsTerminal, Write};

use serde::Serialize;

use crate::app::{ItemAction, RunSummary};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

/// ANSI colour only goes to a terminal, and `NO_COLOR` (any non-empty value)
/// turns it off there too.
pub fn color_enabled(is_terminal: bool, no_color: Option<&OsStr>) -> bool {
    is_terminal && no_color.is_none_or(OsStr::is_empty)
}

pub fn stream_color(stream: &impl IsTerminal) -> bool {
    color_enabled(
        stream.is_terminal(),
        std::env::var_os("NO_COLOR").as_deref(),
    )
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(&mut io::stdout(), summary)
    }

    fn print_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        out.write_all(json.as_bytes())?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

pub struct HumanOutput;

impl HumanOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        let stdout = io::stdout();
        let color = stream_color(&stdout);
        Self::write_summary(&mut stdout.lock(), summary, color)
    }

    pub fn write_summary<W: Write>(out: &mut W, summary: &RunSummary, color: bool) -> io::Result<()> {
        let paint = |code: &str, text: String| {
            if color {
                format!("\x1b[{code}m{text}\x1b[0m")
            } else {
                text
            }
        };
        let counts = &summary.counts;

        writeln!(
            out,
            "{}",
            paint("36", format!("{} / {}", summary.pathogen, summary.anti_microbial))
        )?;
        writeln!(out, "  input:  {}", summary.input_path)?;
        writeln!(out, "  output: {}", summary.fasta_dir)?;
        writeln!(
            out,
            "  rows: {} (missing genome_id: {}, skipped lines: {})",
            summary.stats.rows, summary.stats.missing_ids, summary.skipped_lines
        )?;
        writeln!(out, "{}", paint("32", format!("  downloaded: {}", counts.downloaded)))?;
        writeln!(out, "  already present: {}", counts.existing)?;
        if counts.planned > 0 {
            writeln!(out, "  planned: {}", counts.planned)?;
        }
        if counts.empty > 0 {
            writeln!(out, "{}", paint("33", format!("  empty responses: {}", counts.empty)))?;
        }
        if counts.failed > 0 {
            writeln!(out, "{}", paint("31", format!("  failed: {}", counts.failed)))?;
            for item in &summary.items {
                if let ItemAction::Failed { error } = &item.action {
                    writeln!(out, "{}", paint("31", format!("    {}: {error}", item.genome_id)))?;
                }
            }
        }
        Ok(())
    }
}
