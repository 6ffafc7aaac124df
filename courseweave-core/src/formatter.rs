//! Optional external formatter (tidy by default) run over written pages.

use crate::builder::BuildError;
use crate::config::FormatConfig;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone)]
pub struct Formatter {
    program: PathBuf,
    args: Vec<String>,
}

impl Formatter {
    /// Locate the formatter binary when formatting is enabled.
    ///
    /// Returns `Ok(None)` when formatting is off; a missing binary is only an
    /// error when it was asked for.
    pub fn locate(config: &FormatConfig) -> Result<Option<Self>, BuildError> {
        if !config.enabled {
            return Ok(None);
        }
        let program = which::which(&config.command)
            .map_err(|_| BuildError::FormatterMissing(config.command.clone()))?;
        tracing::info!("Formatting pages with {}", program.display());
        Ok(Some(Self {
            program,
            args: config.args.clone(),
        }))
    }

    /// Format `path` in place
    pub fn format_file(&self, path: &Path) -> Result<(), BuildError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .status()
            .map_err(|source| BuildError::Io {
                path: self.program.clone(),
                source,
            })?;

        // tidy exits with 1 when it only has warnings
        match status.code() {
            Some(0) | Some(1) => Ok(()),
            code => Err(BuildError::FormatterFailed {
                path: path.to_path_buf(),
                code,
            }),
        }
    }
}
