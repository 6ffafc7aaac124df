//! Contract with the template engine collaborator.
//!
//! The core only ever asks for a template by name and hands over a flat map
//! of pre-rendered HTML fragments.

use std::collections::BTreeMap;
use thiserror::Error;

pub type TemplateVars = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    Missing(String),

    #[error("Failed to load template '{name}': {message}")]
    Load { name: String, message: String },

    #[error("Failed to render template '{name}': {message}")]
    Render { name: String, message: String },
}

pub trait TemplateEngine {
    /// Render the template called `name` with `vars` substituted
    fn render(&self, name: &str, vars: &TemplateVars) -> Result<String, TemplateError>;
}

impl<T: TemplateEngine + ?Sized> TemplateEngine for &T {
    fn render(&self, name: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
        (**self).render(name, vars)
    }
}

/// Build a [`TemplateVars`] map from `key => value` pairs
#[macro_export]
macro_rules! template_vars {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut vars = $crate::template::TemplateVars::new();
        $( vars.insert(($key).to_string(), ($value).to_string()); )*
        vars
    }};
}
