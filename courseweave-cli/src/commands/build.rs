//! Build command implementation.

use super::load_course;
use anyhow::{Context, Result};
use courseweave_core::{CourseBuilder, DiagnosticSeverity};
use courseweave_render::TeraTemplates;
use std::path::Path;

/// Generate the course package described by the config file
pub fn build_course(config_path: &Path, json: bool) -> Result<()> {
    let (config, loader) = load_course(config_path)?;
    tracing::info!("Building course: {}", config.course.title);

    let templates = TeraTemplates::with_overrides(config.templates_dir().as_deref())
        .context("Failed to load templates")?;
    templates
        .check_required()
        .context("Template directory is incomplete")?;

    let output_dir = config.output_dir();
    let builder = CourseBuilder::new(config);
    let report = builder
        .build(&loader, &templates)
        .context("Failed to build course")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Built {} steps into {} ({} pages, {} glossary terms)",
        report.included_steps,
        output_dir.display(),
        report.pages_written,
        report.glossary_terms
    );
    if !report.media.removed.is_empty() || !report.media.renamed.is_empty() {
        println!(
            "Media: removed {}, renamed {}",
            report.media.removed.len(),
            report.media.renamed.len()
        );
    }
    let errors = report.diagnostics.count(DiagnosticSeverity::Error);
    let warnings = report.diagnostics.count(DiagnosticSeverity::Warning);
    if errors + warnings > 0 {
        println!(
            "{} errors and {} warnings were rendered into the pages; run `courseweave verify` for details",
            errors, warnings
        );
    }

    Ok(())
}
