//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use webforge_config::Config;
use webforge_types::{ArtifactDownload, BuildRecord, ColorChoice, HealthReport, Phase, SweepReport};

/// What a finished build hands back to the user
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub record: BuildRecord,
    pub artifact: Option<ArtifactDownload>,
    /// Where `--output-dir` placed a copy of the executable
    pub copied_to: Option<PathBuf>,
}

/// Result of one CLI command
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum CommandResult {
    Build(Box<BuildOutcome>),
    Sweep(SweepReport),
    Health(HealthReport),
    Config(Box<Config>),
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    json_output: bool,
    color_choice: ColorChoice,
    term: Term,
}

impl OutputRenderer {
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Whether styled output should be produced
    pub fn colors_enabled(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }

    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            CommandResult::Build(outcome) => self.render_build(outcome),
            CommandResult::Sweep(report) => self.render_sweep(report),
            CommandResult::Health(health) => self.render_health(health),
            CommandResult::Config(config) => render_config(config),
        }
    }

    fn render_build(&self, outcome: &BuildOutcome) -> io::Result<()> {
        let record = &outcome.record;
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("Build"), Cell::new(record.id.to_string())]);
        table.add_row(vec![Cell::new("App"), Cell::new(&record.app_name)]);
        table.add_row(vec![Cell::new("Phase"), self.phase_cell(record.phase)]);
        if let Some(error) = &record.error {
            table.add_row(vec![Cell::new("Error"), Cell::new(error)]);
        }
        if let Some(artifact) = &outcome.artifact {
            table.add_row(vec![
                Cell::new("Executable"),
                Cell::new(artifact.path.display().to_string()),
            ]);
            table.add_row(vec![Cell::new("Download as"), Cell::new(&artifact.filename)]);
            table.add_row(vec![Cell::new("Size"), Cell::new(format_size(artifact.size))]);
        }
        if let Some(copied_to) = &outcome.copied_to {
            table.add_row(vec![
                Cell::new("Copied to"),
                Cell::new(copied_to.display().to_string()),
            ]);
        }
        let elapsed = record.updated_at - record.created_at;
        table.add_row(vec![
            Cell::new("Elapsed"),
            Cell::new(format!("{}s", elapsed.num_seconds())),
        ]);
        println!("{table}");

        if !record.warnings.is_empty() {
            println!();
            println!("{}", self.styled("Warnings:", &Style::new().yellow().bold()));
            for warning in &record.warnings {
                println!("  - {warning}");
            }
        }
        Ok(())
    }

    fn render_sweep(&self, report: &SweepReport) -> io::Result<()> {
        let heading = format!(
            "Scanned {}, removed {}, retained {}",
            report.scanned,
            report.removed.len(),
            report.retained
        );
        println!("{}", self.styled(&heading, &Style::new().bold()));
        for path in &report.removed {
            println!("  removed {}", path.display());
        }
        if !report.errors.is_empty() {
            println!("{}", self.styled("Errors:", &Style::new().red().bold()));
            for error in &report.errors {
                println!("  - {error}");
            }
        }
        Ok(())
    }

    fn render_health(&self, health: &HealthReport) -> io::Result<()> {
        let status = self.styled(&health.status, &Style::new().green().bold());
        println!("{status} webforge {} at {}", health.version, health.timestamp.to_rfc3339());
        Ok(())
    }

    fn phase_cell(&self, phase: Phase) -> Cell {
        let cell = Cell::new(phase.as_str());
        if !self.colors_enabled() {
            return cell;
        }
        match phase {
            Phase::Completed => cell.fg(Color::Green),
            Phase::Failed => cell.fg(Color::Red),
            _ => cell.fg(Color::Yellow),
        }
    }

    fn styled(&self, text: &str, style: &Style) -> String {
        if self.colors_enabled() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}

fn render_config(config: &Config) -> io::Result<()> {
    let toml = config.to_toml().map_err(io::Error::other)?;
    print!("{toml}");
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
