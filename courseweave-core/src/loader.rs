//! Course tree loading and the exclusion filter.
//!
//! On disk a course is laid out as
//!
//! ```text
//! content/
//!   <theme>/theme.yml
//!   <theme>/<module>/module.yml
//!   <theme>/<module>/step1.html ...
//! ```
//!
//! Directories without a metadata file are ignored.

use crate::config::FilterConfig;
use crate::models::{CourseTree, Module, Step, Theme};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use walkdir::WalkDir;

pub const THEME_META: &str = "theme.yml";
pub const MODULE_META: &str = "module.yml";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Content directory {0:?} does not exist")]
    MissingRoot(PathBuf),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid metadata in {path:?}: {source}")]
    Metadata {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Malformed step file {path:?}: {reason}")]
    MalformedStep { path: PathBuf, reason: String },
}

/// Produces a course tree with `excluded` flags already applied
pub trait MetadataSource {
    fn load(&self) -> Result<CourseTree, LoadError>;
}

#[derive(Debug, Deserialize)]
struct ThemeMeta {
    title: String,
    #[serde(default)]
    indexorder: Option<i64>,
    #[serde(default)]
    exclude_resource: bool,
}

#[derive(Debug, Deserialize)]
struct ModuleMeta {
    title: String,
    #[serde(default)]
    indexorder: Option<i64>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    prerequisites: Vec<String>,
    #[serde(default)]
    leadsto: Vec<String>,
    #[serde(default)]
    exclude_resource: bool,
}

/// Decides which themes, modules and steps a build leaves out
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    rules: FilterConfig,
}

impl ExcludeFilter {
    pub fn new(rules: FilterConfig) -> Self {
        Self { rules }
    }

    pub fn theme_excluded(&self, theme: &str) -> bool {
        self.rules.exclude_themes.iter().any(|t| t == theme)
    }

    pub fn module_excluded(&self, theme: &str, module: &str, level: Option<&str>) -> bool {
        if self.theme_excluded(theme) {
            return true;
        }
        let path = format!("{theme}/{module}");
        if self.rules.exclude_modules.iter().any(|m| *m == path) {
            return true;
        }
        if self.rules.levels.is_empty() {
            return false;
        }
        !level.is_some_and(|l| self.rules.levels.iter().any(|allowed| allowed == l))
    }

    pub fn step_excluded(&self, theme: &str, module: &str, file: &str) -> bool {
        let path = format!("{theme}/{module}/{file}");
        self.rules.exclude_steps.iter().any(|s| *s == path)
    }
}

/// Loads a course from the directory layout described in the module docs
pub struct DirectoryLoader {
    root: PathBuf,
    filter: ExcludeFilter,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>, filter: ExcludeFilter) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }

    fn load_theme(&self, dir: &Path, name: &str) -> Result<Theme, LoadError> {
        let meta: ThemeMeta = read_meta(&dir.join(THEME_META))?;
        let excluded = meta.exclude_resource || self.filter.theme_excluded(name);

        let mut modules = Vec::new();
        for module_dir in subdirectories(dir)? {
            let Some(module_name) = dir_name(&module_dir) else {
                continue;
            };
            if !module_dir.join(MODULE_META).is_file() {
                tracing::debug!("Skipping {:?}: no {}", module_dir, MODULE_META);
                continue;
            }
            let mut module = self.load_module(&module_dir, name, &module_name)?;
            module.excluded |= excluded;
            modules.push(module);
        }
        sort_by_indexorder(&mut modules, |m| (m.indexorder, m.name.clone()));

        Ok(Theme {
            name: name.to_string(),
            title: meta.title,
            indexorder: meta.indexorder,
            excluded,
            modules,
        })
    }

    fn load_module(&self, dir: &Path, theme: &str, name: &str) -> Result<Module, LoadError> {
        let meta: ModuleMeta = read_meta(&dir.join(MODULE_META))?;
        let excluded =
            meta.exclude_resource || self.filter.module_excluded(theme, name, meta.level.as_deref());

        let mut steps = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let file = entry.file_name().to_string_lossy().to_string();
            let html = fs::read_to_string(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let (title, body) = parse_step_document(&html).map_err(|reason| {
                LoadError::MalformedStep {
                    path: path.to_path_buf(),
                    reason,
                }
            })?;
            steps.push(Step {
                excluded: self.filter.step_excluded(theme, name, &file),
                file,
                source_path: path.to_path_buf(),
                title,
                body,
                output_id: None,
            });
        }

        Ok(Module {
            name: name.to_string(),
            title: meta.title,
            level: meta.level,
            indexorder: meta.indexorder,
            prerequisites: meta.prerequisites,
            leadsto: meta.leadsto,
            excluded,
            steps,
        })
    }
}

impl MetadataSource for DirectoryLoader {
    fn load(&self) -> Result<CourseTree, LoadError> {
        if !self.root.is_dir() {
            return Err(LoadError::MissingRoot(self.root.clone()));
        }

        let mut themes = Vec::new();
        for theme_dir in subdirectories(&self.root)? {
            let Some(name) = dir_name(&theme_dir) else {
                continue;
            };
            if !theme_dir.join(THEME_META).is_file() {
                tracing::debug!("Skipping {:?}: no {}", theme_dir, THEME_META);
                continue;
            }
            themes.push(self.load_theme(&theme_dir, &name)?);
        }
        sort_by_indexorder(&mut themes, |t| (t.indexorder, t.name.clone()));

        let tree = CourseTree { themes };
        tracing::info!(
            "Loaded {} themes, {} modules, {} steps",
            tree.themes.len(),
            tree.themes.iter().map(|t| t.modules.len()).sum::<usize>(),
            tree.themes
                .iter()
                .flat_map(|t| t.modules.iter())
                .map(|m| m.steps.len())
                .sum::<usize>()
        );
        Ok(tree)
    }
}

static TITLE_REGEX: OnceLock<Regex> = OnceLock::new();
static BODY_REGEX: OnceLock<Regex> = OnceLock::new();

fn title_regex() -> &'static Regex {
    TITLE_REGEX.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap())
}

fn body_regex() -> &'static Regex {
    BODY_REGEX.get_or_init(|| Regex::new(r"(?is)<body[^>]*>(.*?)</body>").unwrap())
}

/// Split an intermediate step file into its title and raw tagged body.
///
/// The document must contain exactly one `<title>` and one `<body>`.
pub fn parse_step_document(html: &str) -> Result<(String, String), String> {
    let titles: Vec<_> = title_regex().captures_iter(html).collect();
    let bodies: Vec<_> = body_regex().captures_iter(html).collect();

    match (titles.as_slice(), bodies.as_slice()) {
        ([title], [body]) => Ok((
            title[1].trim().to_string(),
            body[1].to_string(),
        )),
        (t, b) => Err(format!(
            "expected one <title> and one <body>, found {} and {}",
            t.len(),
            b.len()
        )),
    }
}

fn read_meta<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| LoadError::Metadata {
        path: path.to_path_buf(),
        source,
    })
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| LoadError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}

/// Order by `indexorder`, nodes without one last, ties by name
fn sort_by_indexorder<T>(items: &mut [T], key: impl Fn(&T) -> (Option<i64>, String)) {
    items.sort_by_key(|item| {
        let (order, name) = key(item);
        (order.is_none(), order, name)
    });
}
