//! Course building: orchestrates loading, the two passes, page output and
//! media cleanup.

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::formatter::Formatter;
use crate::generator::PageGenerator;
use crate::glossary;
use crate::loader::{LoadError, MetadataSource};
use crate::media::{self, MediaReport};
use crate::models::{CourseTree, Location, MEDIA_DIR};
use crate::navigation::Navigation;
use crate::resolver::PageContext;
use crate::symbols::{self, SymbolTables};
use crate::template::{TemplateEngine, TemplateError};
use crate::template_vars;
use crate::writer::PageWriter;
use chrono::Datelike;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Anchor '{name}' defined twice: first in {first}, again in {second}")]
    AnchorRedefined {
        name: String,
        first: Location,
        second: Location,
    },

    #[error("Glossary term '{term}' defined twice: first in {first}, again in {second}")]
    GlossaryRedefined {
        term: String,
        first: Location,
        second: Location,
    },

    #[error("The {kind} '{name}' has no indexorder")]
    MissingIndexOrder { kind: &'static str, name: String },

    #[error("Module {theme}/{module} has no visible steps")]
    EmptyModule { theme: String, module: String },

    #[error("Failed to write {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("IO error on {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Formatter '{0}' not found in PATH")]
    FormatterMissing(String),

    #[error("Formatter failed on {path:?} (exit status {code:?})")]
    FormatterFailed { path: PathBuf, code: Option<i32> },

    #[error("Failed to remove unused media {path:?}: {source}")]
    MediaRemoval { path: PathBuf, source: io::Error },
}

impl BuildError {
    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        BuildError::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub included_steps: usize,
    pub pages_written: usize,
    pub glossary_terms: usize,
    pub references_page: bool,
    pub media: MediaReport,
    pub diagnostics: Diagnostics,
}

/// Main course builder
pub struct CourseBuilder {
    config: Config,
}

impl CourseBuilder {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the whole course into the configured output directory
    pub fn build(
        &self,
        source: &dyn MetadataSource,
        engine: &dyn TemplateEngine,
    ) -> Result<BuildReport, BuildError> {
        let (tree, tables, nav) = self.prepare(source)?;
        let mut diags = Diagnostics::new();

        let output_dir = self.config.output_dir();
        fs::create_dir_all(&output_dir).map_err(|e| BuildError::write(&output_dir, e))?;

        let media_out = output_dir.join(MEDIA_DIR);
        if let Some(media_src) = self.config.media_dir() {
            media::copy_media(&media_src, &media_out)?;
        }

        let formatter = Formatter::locate(&self.config.format)?;
        let common = template_vars! {
            "course_title" => crate::html::escape(&self.config.course.title),
            "course_description" => crate::html::escape(
                self.config.course.description.as_deref().unwrap_or_default()
            ),
            "year" => chrono::Local::now().year(),
        };
        let mut writer = PageWriter::new(&output_dir, engine, formatter, common);

        let generator = PageGenerator::new(&self.config, &tree, &tables, &nav);
        generator.emit_steps(&mut writer, &mut diags)?;
        generator.emit_index_pages(&mut writer)?;
        let glossary_terms = glossary::emit_glossary(
            &tables.glossary,
            &tree,
            generator.resolver(),
            &mut writer,
            &mut diags,
        )?;
        let references_page = generator.emit_references(&mut writer)?;

        for name in &self.config.keep_media {
            writer.used_media_mut().record(name);
        }
        let pages_written = writer.pages_written();
        let mut used = writer.into_used_media();
        // Names the scan cannot see, such as those inside encoded popups
        used.merge(generator.resolver().take_media());
        let media = media::reconcile(&media_out, &used)?;

        tracing::info!(
            "Build finished: {} pages, {} diagnostics",
            pages_written,
            diags.len()
        );

        Ok(BuildReport {
            included_steps: tables.included_steps,
            pages_written,
            glossary_terms,
            references_page,
            media,
            diagnostics: diags,
        })
    }

    /// Check the course without writing anything.
    ///
    /// Fatal problems surface as errors; every step is still resolved so
    /// recoverable problems are collected as diagnostics.
    pub fn verify(&self, source: &dyn MetadataSource) -> Result<BuildReport, BuildError> {
        let (tree, tables, nav) = self.prepare(source)?;
        let mut diags = Diagnostics::new();

        let generator = PageGenerator::new(&self.config, &tree, &tables, &nav);
        for theme in tree.included_themes() {
            for module in theme.included_modules() {
                for step in module.included_steps() {
                    let location =
                        Location::new(&theme.name, &module.name, &step.file, step.output_id);
                    generator
                        .resolver()
                        .resolve(&step.body, PageContext::step(&location), &mut diags);
                }
            }
        }
        let glossary_terms =
            glossary::check_definitions(&tables.glossary, generator.resolver(), &mut diags);

        tracing::info!(
            "Verified {} steps: {} diagnostics",
            tables.included_steps,
            diags.len()
        );

        Ok(BuildReport {
            included_steps: tables.included_steps,
            glossary_terms,
            references_page: !tables.references.is_empty(),
            diagnostics: diags,
            ..BuildReport::default()
        })
    }

    fn prepare(
        &self,
        source: &dyn MetadataSource,
    ) -> Result<(CourseTree, SymbolTables, Navigation), BuildError> {
        let mut tree = source.load()?;
        let tables = symbols::build(&mut tree)?;
        let nav = Navigation::build(&tree)?;
        Ok((tree, tables, nav))
    }
}
