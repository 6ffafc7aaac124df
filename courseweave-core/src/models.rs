//! Content model for the course tree: themes, modules and steps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Name of the media directory under the output root
pub const MEDIA_DIR: &str = "media";

/// Name of the glossary directory under the output root
pub const GLOSSARY_DIR: &str = "glossary";

/// The whole course, themes ordered by `indexorder`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseTree {
    pub themes: Vec<Theme>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    /// Directory-derived id
    pub name: String,
    pub title: String,
    pub indexorder: Option<i64>,
    pub excluded: bool,
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub title: String,
    /// Difficulty tag
    pub level: Option<String>,
    pub indexorder: Option<i64>,
    /// Sibling module names this module requires
    pub prerequisites: Vec<String>,
    /// Sibling module names this module leads to
    pub leadsto: Vec<String>,
    pub excluded: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Source filename, also the internal step key
    pub file: String,
    pub source_path: PathBuf,
    pub title: String,
    /// Raw tagged body
    pub body: String,
    pub excluded: bool,
    /// Position among the module's visible steps, assigned in pass 1
    pub output_id: Option<u32>,
}

impl CourseTree {
    pub fn included_themes(&self) -> impl Iterator<Item = &Theme> {
        self.themes.iter().filter(|t| !t.excluded)
    }

    pub fn find_theme(&self, theme: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.name == theme)
    }

    pub fn find_module(&self, theme: &str, module: &str) -> Option<&Module> {
        self.find_theme(theme)?
            .modules
            .iter()
            .find(|m| m.name == module)
    }

    /// Root-relative path of a visible step page, e.g. `basics/intro/step03.html`
    pub fn step_path(&self, theme: &str, module: &str, step: u32) -> Option<String> {
        let m = self.find_module(theme, module)?;
        if step == 0 || step > m.max_step() {
            return None;
        }
        Some(format!("{}/{}/{}", theme, module, m.step_file_name(step)))
    }

    /// Root-relative path for a location, if it points at a visible step
    pub fn location_path(&self, location: &Location) -> Option<String> {
        let step = location.step?;
        self.step_path(&location.theme, &location.module, step)
    }

    /// Count of steps that received an output id
    pub fn included_step_count(&self) -> usize {
        self.themes
            .iter()
            .flat_map(|t| t.modules.iter())
            .map(|m| m.included_steps().count())
            .sum()
    }
}

impl Theme {
    pub fn included_modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(|m| !m.excluded)
    }
}

impl Module {
    /// Visible steps in output order
    pub fn included_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.output_id.is_some())
    }

    /// Largest output id in this module (0 when nothing is visible)
    pub fn max_step(&self) -> u32 {
        self.steps.iter().filter_map(|s| s.output_id).max().unwrap_or(0)
    }

    /// Digits used when zero-padding step file names; never less than two
    pub fn step_width(&self) -> usize {
        self.max_step().to_string().len().max(2)
    }

    pub fn step_file_name(&self, step: u32) -> String {
        format!("step{:0width$}.html", step, width = self.step_width())
    }

    pub fn step_by_id(&self, step: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.output_id == Some(step))
    }
}

/// Where a tag occurrence was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub theme: String,
    pub module: String,
    /// Source filename of the step
    pub file: String,
    /// Output id, absent for excluded steps
    pub step: Option<u32>,
}

impl Location {
    pub fn new(theme: &str, module: &str, file: &str, step: Option<u32>) -> Self {
        Self {
            theme: theme.to_string(),
            module: module.to_string(),
            file: file.to_string(),
            step,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.theme, self.module, self.file)?;
        match self.step {
            Some(step) => write!(f, " (step {})", step),
            None => write!(f, " (excluded)"),
        }
    }
}

/// Directory depth of a generated page below the output root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLevel {
    /// Course-wide pages: front page, course index, map
    Root,
    /// Theme pages and glossary pages
    Theme,
    /// Step pages, two directories deep
    Step,
}

impl PageLevel {
    /// Relative prefix leading back to the output root
    pub fn prefix(self) -> &'static str {
        match self {
            PageLevel::Root => "",
            PageLevel::Theme => "../",
            PageLevel::Step => "../../",
        }
    }
}
