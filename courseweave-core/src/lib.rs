//! # courseweave-core
//!
//! Core library for the courseweave course generator.
//!
//! A build walks the course tree twice. Pass 1 numbers the visible steps and
//! collects anchors, glossary terms and citations into symbol tables; pass 2
//! rewrites the bracket tags of every step against those frozen tables and
//! writes the templated pages. Media that no page references is removed at
//! the very end.

pub mod builder;
pub mod config;
pub mod diagnostics;
pub mod formatter;
pub mod generator;
pub mod glossary;
pub mod html;
pub mod loader;
pub mod media;
pub mod models;
pub mod navigation;
pub mod ordering;
pub mod resolver;
pub mod symbols;
pub mod tags;
pub mod template;
pub mod writer;

pub use builder::{BuildError, BuildReport, CourseBuilder};
pub use config::Config;
pub use diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics};
pub use loader::{DirectoryLoader, ExcludeFilter, LoadError, MetadataSource};
pub use models::{CourseTree, Location, Module, PageLevel, Step, Theme};
pub use navigation::{Navigation, Relation};
pub use symbols::{GlossaryEntry, SymbolTables};
pub use template::{TemplateEngine, TemplateError, TemplateVars};
