//! JSON output helpers.
//!
//! Every `--json` result is a single pretty-printed object on stdout. Failures
//! use the error object from [`format_error`].

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::application::services::{CloneListing, CloneOutcome, ReapReport};
use crate::domain::AppConfig;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Renders command results as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn emit(value: &Value) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("JSON serialization failed")?
        );
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(version: &str) -> Result<()> {
        Self::emit(&json!({ "version": version }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_clone_created(name: &str, outcome: &CloneOutcome) -> Result<()> {
        Self::emit(&clone_created_value(name, outcome))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_reap(report: &ReapReport, dry_run: bool) -> Result<()> {
        Self::emit(&reap_value(report, dry_run))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_clones(clones: &[CloneListing]) -> Result<()> {
        Self::emit(&clones_value(clones))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_deleted(name: &str) -> Result<()> {
        Self::emit(&json!({ "deleted": name }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_refreshed(name: &str, tag: &str) -> Result<()> {
        Self::emit(&json!({ "vm": name, "timestamp_tag": tag }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config(config: &AppConfig, path: &Path) -> Result<()> {
        Self::emit(&json!({ "path": path, "config": config }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config_path(path: &Path) -> Result<()> {
        Self::emit(&json!({ "path": path }))
    }
}

pub(crate) fn clone_created_value(name: &str, outcome: &CloneOutcome) -> Value {
    json!({
        "name": name,
        "vm": outcome.vm,
        "timestamp_tag": outcome.timestamp_tag,
        "source_reverted": outcome.source_reverted,
    })
}

pub(crate) fn reap_value(report: &ReapReport, dry_run: bool) -> Value {
    let failed: Vec<Value> = report
        .failed
        .iter()
        .map(|(name, reason)| json!({ "name": name, "reason": reason }))
        .collect();
    json!({
        "dry_run": dry_run,
        "candidates": report.candidates,
        "reaped": report.reaped,
        "eligible": report.eligible,
        "active": report.young,
        "untimed": report.untimed,
        "missing": report.missing,
        "failed": failed,
    })
}

pub(crate) fn clones_value(clones: &[CloneListing]) -> Value {
    let items: Vec<Value> = clones
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "id": c.id,
                "power_state": c.power_state,
                "created": c.created.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                "age_seconds": c.age().map(|a| a.num_seconds()),
                "status": c.eligibility.label(),
            })
        })
        .collect();
    json!({ "clones": items })
}
