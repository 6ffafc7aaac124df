//! Writes rendered pages to the output directory and tracks their media.

use crate::builder::BuildError;
use crate::formatter::Formatter;
use crate::media::UsedMedia;
use crate::models::PageLevel;
use crate::template::{TemplateEngine, TemplateVars};
use std::fs;
use std::path::{Path, PathBuf};

pub struct PageWriter<'a> {
    output_dir: PathBuf,
    engine: &'a dyn TemplateEngine,
    formatter: Option<Formatter>,
    /// Variables every template receives
    common: TemplateVars,
    used_media: UsedMedia,
    pages_written: usize,
}

impl<'a> PageWriter<'a> {
    pub fn new(
        output_dir: &Path,
        engine: &'a dyn TemplateEngine,
        formatter: Option<Formatter>,
        common: TemplateVars,
    ) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            engine,
            formatter,
            common,
            used_media: UsedMedia::new(),
            pages_written: 0,
        }
    }

    /// Render `template` and write it to `rel_path` below the output root
    pub fn render_page(
        &mut self,
        template: &str,
        rel_path: &str,
        level: PageLevel,
        vars: TemplateVars,
    ) -> Result<(), BuildError> {
        let mut all = self.common.clone();
        all.insert("prefix".to_string(), level.prefix().to_string());
        all.extend(vars);

        let html = self.engine.render(template, &all)?;
        self.write(rel_path, &html)
    }

    /// Write already rendered HTML, format it and scan it for media
    pub fn write(&mut self, rel_path: &str, html: &str) -> Result<(), BuildError> {
        let path = self.output_dir.join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::write(parent, e))?;
        }
        fs::write(&path, html).map_err(|e| BuildError::write(&path, e))?;

        if let Some(formatter) = &self.formatter {
            formatter.format_file(&path)?;
        }

        self.used_media.scan(html);
        self.pages_written += 1;
        tracing::debug!("Wrote {}", rel_path);
        Ok(())
    }

    pub fn used_media_mut(&mut self) -> &mut UsedMedia {
        &mut self.used_media
    }

    pub fn pages_written(&self) -> usize {
        self.pages_written
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn into_used_media(self) -> UsedMedia {
        self.used_media
    }
}
