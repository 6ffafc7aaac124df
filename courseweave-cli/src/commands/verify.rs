//! Verify course health and emit diagnostics.

use super::load_course;
use anyhow::{Context, Result};
use courseweave_core::{CourseBuilder, Diagnostic, DiagnosticSeverity};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct VerificationSummary<'a> {
    steps: usize,
    glossary_terms: usize,
    errors: usize,
    warnings: usize,
    infos: usize,
    diagnostics: Vec<&'a Diagnostic>,
}

/// Run the passes without writing output and surface diagnostics.
pub fn verify_course(config_path: &Path, json: bool) -> Result<()> {
    let (config, loader) = load_course(config_path)?;
    let report = CourseBuilder::new(config)
        .verify(&loader)
        .context("Course failed verification")?;

    let diagnostics = &report.diagnostics;
    let summary = VerificationSummary {
        steps: report.included_steps,
        glossary_terms: report.glossary_terms,
        errors: diagnostics.count(DiagnosticSeverity::Error),
        warnings: diagnostics.count(DiagnosticSeverity::Warning),
        infos: diagnostics.count(DiagnosticSeverity::Info),
        diagnostics: diagnostics.iter().collect(),
    };

    if json {
        let payload = serde_json::to_string_pretty(&summary)?;
        println!("{}", payload);
    } else {
        println!(
            "Verification complete: {} steps, {} errors, {} warnings, {} info",
            summary.steps, summary.errors, summary.warnings, summary.infos
        );
        for diag in &summary.diagnostics {
            println!("- {:?} {}: {}", diag.severity, diag.code, diag.message);
        }
    }

    Ok(())
}
