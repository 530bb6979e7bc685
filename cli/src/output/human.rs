//! Human-readable terminal renderer.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize as _;

use crate::application::services::{CloneListing, CloneOutcome, ReapReport};
use crate::domain::AppConfig;
use crate::domain::clone::{Eligibility, format_age};
use crate::output::OutputContext;

/// Renders command results as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    pub fn render_version(&self, version: &str) {
        if !self.ctx.quiet {
            println!("clonekeeper {version}");
        }
    }

    pub fn render_clone_created(&self, name: &str, outcome: &CloneOutcome) {
        println!();
        self.ctx.success(&format!("Clone '{name}' is ready."));
        self.ctx.kv("VM:        ", &outcome.vm.id);
        self.ctx.kv("Timestamp: ", &outcome.timestamp_tag);
        if outcome.source_reverted == Some(false) {
            self.ctx
                .warn("The source was left as a VM; convert it back to a template manually.");
        }
    }

    pub fn render_reap(&self, report: &ReapReport, dry_run: bool) {
        if report.candidates == 0 {
            return;
        }
        println!();
        self.ctx.header("Reap summary:");
        self.ctx.kv("Candidates:", &report.candidates.to_string());
        if dry_run {
            self.ctx.kv("Would reap:", &report.eligible.len().to_string());
        } else {
            self.ctx.kv("Reaped:    ", &report.reaped.len().to_string());
        }
        self.ctx.kv("Active:    ", &report.young.len().to_string());
        if !report.untimed.is_empty() {
            self.ctx.kv("Untimed:   ", &report.untimed.join(", "));
        }
        if !report.missing.is_empty() {
            self.ctx.kv("Missing:   ", &report.missing.join(", "));
        }
        for (name, reason) in &report.failed {
            self.ctx.error(&format!("{name}: {reason}"));
        }
    }

    pub fn render_clones(&self, clones: &[CloneListing]) {
        if clones.is_empty() {
            self.ctx.info("No tracked clones.");
            return;
        }
        if self.ctx.quiet {
            return;
        }
        let width = clones.iter().map(|c| c.name.len()).max().unwrap_or(0).max(4);
        println!(
            "  {}",
            format!("{:<width$}  {:<12}  {:<19}  {:>8}  STATUS", "NAME", "ID", "CREATED", "AGE")
                .style(self.ctx.styles.dim)
        );
        for clone in clones {
            let created = clone
                .created
                .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());
            let age = clone.age().map_or_else(|| "-".to_string(), format_age);
            let status = match clone.eligibility {
                Eligibility::Expired { .. } => format!("{}", "expired".style(self.ctx.styles.warning)),
                Eligibility::Young { .. } => format!("{}", "active".style(self.ctx.styles.success)),
                Eligibility::Untimed => format!("{}", "untimed".style(self.ctx.styles.error)),
            };
            println!(
                "  {:<width$}  {:<12}  {created:<19}  {age:>8}  {status}",
                clone.name, clone.id
            );
        }
    }

    pub fn render_refreshed(&self, name: &str, tag: &str) {
        self.ctx.kv("Timestamp:", &format!("{tag} ({name})"));
    }

    /// Print the effective configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn render_config(&self, config: &AppConfig, path: &Path) -> Result<()> {
        self.ctx.kv("Config file:", &path.display().to_string());
        println!();
        let yaml = serde_yaml::to_string(config).context("cannot serialize config")?;
        print!("{yaml}");
        Ok(())
    }

    pub fn render_config_path(&self, path: &Path) {
        println!("{}", path.display());
    }
}
