//! Run-level warning channel for problems that degrade a page instead of
//! aborting the build.

use crate::models::Location;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable machine-readable code, e.g. `link.unresolved`
    pub code: String,
    pub message: String,
    pub severity: DiagnosticSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// Collector passed by `&mut` through the pipeline phases
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            DiagnosticSeverity::Info => tracing::info!("{}: {}", diagnostic.code, diagnostic.message),
            _ => tracing::warn!("{}: {}", diagnostic.code, diagnostic.message),
        }
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, code: &str, message: String, location: Option<&Location>) {
        self.record(code, message, DiagnosticSeverity::Error, location);
    }

    pub fn warn(&mut self, code: &str, message: String, location: Option<&Location>) {
        self.record(code, message, DiagnosticSeverity::Warning, location);
    }

    fn record(
        &mut self,
        code: &str,
        message: String,
        severity: DiagnosticSeverity,
        location: Option<&Location>,
    ) {
        let message = match location {
            Some(loc) => format!("{message} [{loc}]"),
            None => message,
        };
        self.push(Diagnostic {
            code: code.to_string(),
            message,
            severity,
            location: location.cloned(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, severity: DiagnosticSeverity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.items.iter().filter(move |d| d.code == code)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
