//! # courseweave-render
//!
//! Template rendering library for courseweave.
//!
//! Page layouts are Tera templates. The defaults are embedded in the binary;
//! a course can replace any of them by dropping `<name>.html` into its
//! template directory.

use courseweave_core::{TemplateEngine, TemplateError, TemplateVars};
use include_dir::{include_dir, Dir};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};

// Embed the default templates so they're available after cargo install
static BUILTIN_TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Templates every build asks for
pub const REQUIRED_TEMPLATES: &[&str] = &[
    "step",
    "theme_map",
    "theme_index",
    "course_index",
    "course_map",
    "frontpage",
    "glossary_page",
    "glossary_index",
    "references",
];

/// Tera-backed template engine
pub struct TeraTemplates {
    tera: Tera,
}

impl TeraTemplates {
    /// Only the embedded defaults
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::with_overrides(None)
    }

    /// Embedded defaults, with any `*.html` in `dir` replacing the built-in
    /// template of the same name
    pub fn with_overrides(dir: Option<&Path>) -> Result<Self, TemplateError> {
        let mut sources: BTreeMap<String, String> = BTreeMap::new();

        for file in BUILTIN_TEMPLATES.files() {
            let Some(name) = template_name(file.path()) else {
                continue;
            };
            let Some(contents) = file.contents_utf8() else {
                return Err(TemplateError::Load {
                    name,
                    message: "built-in template is not valid UTF-8".to_string(),
                });
            };
            sources.insert(name, contents.to_string());
        }

        if let Some(dir) = dir {
            let entries = fs::read_dir(dir).map_err(|e| TemplateError::Load {
                name: dir.display().to_string(),
                message: e.to_string(),
            })?;
            for entry in entries.flatten() {
                let path = entry.path();
                let Some(name) = template_name(&path) else {
                    continue;
                };
                let contents = fs::read_to_string(&path).map_err(|e| TemplateError::Load {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
                tracing::debug!("Template '{}' overridden by {:?}", name, path);
                sources.insert(name, contents);
            }
        }

        Self::from_sources(sources)
    }

    /// Build from raw `(name, source)` pairs, e.g. for tests
    pub fn from_sources(
        sources: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        // Every variable is an already rendered HTML fragment
        tera.autoescape_on(vec![]);

        // Added in one batch so `extends` can see every parent
        let sources: Vec<(String, String)> = sources.into_iter().collect();
        tera.add_raw_templates(sources.iter().map(|(n, s)| (n.as_str(), s.as_str())))
            .map_err(|e| TemplateError::Load {
                name: "templates".to_string(),
                message: error_chain(&e),
            })?;

        tracing::debug!("Loaded {} templates", sources.len());
        Ok(Self { tera })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// First required template that is not available, if any
    pub fn check_required(&self) -> Result<(), TemplateError> {
        match REQUIRED_TEMPLATES.iter().find(|n| !self.has_template(n)) {
            Some(missing) => Err(TemplateError::Missing(missing.to_string())),
            None => Ok(()),
        }
    }
}

impl TemplateEngine for TeraTemplates {
    fn render(&self, name: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
        if !self.has_template(name) {
            return Err(TemplateError::Missing(name.to_string()));
        }

        let mut context = Context::new();
        for (key, value) in vars {
            context.insert(key.as_str(), value);
        }

        self.tera
            .render(name, &context)
            .map_err(|e| TemplateError::Render {
                name: name.to_string(),
                message: error_chain(&e),
            })
    }
}

/// `step.html` -> `step`; `None` for anything that isn't an html file
fn template_name(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("html") {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

// Tera keeps the useful detail (line, missing variable) in the source chain
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    message
}
