//! Media bookkeeping: which files pages reference, copying the source media
//! into the output, and removing what nothing references.

use crate::builder::BuildError;
use crate::html::unescape;
use crate::models::MEDIA_DIR;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

static QUOTED_VALUE_REGEX: OnceLock<Regex> = OnceLock::new();
static MEDIA_REF_REGEX: OnceLock<Regex> = OnceLock::new();

/// Quoted attribute values; spaces and entities stay inside the capture
fn quoted_value_regex() -> &'static Regex {
    QUOTED_VALUE_REGEX.get_or_init(|| Regex::new(r#"=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap())
}

/// A media-directory path segment inside one attribute value
fn media_ref_regex() -> &'static Regex {
    MEDIA_REF_REGEX.get_or_init(|| {
        Regex::new(&format!(r#"(?:^|[/('"\s]){}/([^/()<>?#"']+)"#, MEDIA_DIR)).unwrap()
    })
}

/// Media referenced by generated pages: lower-cased name to the name as written
#[derive(Debug, Clone, Default)]
pub struct UsedMedia {
    files: BTreeMap<String, String>,
}

impl UsedMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a filename; the first spelling seen becomes canonical
    pub fn record(&mut self, name: &str) {
        self.files
            .entry(name.to_lowercase())
            .or_insert_with(|| name.to_string());
    }

    /// Record every media-directory reference in the attribute values of a
    /// rendered page. Names are unescaped and percent-decoded first.
    pub fn scan(&mut self, html: &str) {
        for value in quoted_value_regex().captures_iter(html) {
            let Some(value) = value.get(1).or_else(|| value.get(2)) else {
                continue;
            };
            let value = unescape(value.as_str());
            for caps in media_ref_regex().captures_iter(&value) {
                let raw = caps[1].trim();
                let name = urlencoding::decode(raw)
                    .map(|n| n.into_owned())
                    .unwrap_or_else(|_| raw.to_string());
                if !name.is_empty() {
                    self.record(&name);
                }
            }
        }
    }

    /// Add everything in `other`; spellings already recorded win
    pub fn merge(&mut self, other: UsedMedia) {
        for (key, name) in other.files {
            self.files.entry(key).or_insert(name);
        }
    }

    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.files.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaReport {
    pub removed: Vec<String>,
    pub renamed: Vec<(String, String)>,
}

fn remove_media(path: &Path, name: String, report: &mut MediaReport) -> Result<(), BuildError> {
    match fs::remove_file(path) {
        Ok(()) => {
            report.removed.push(name);
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!("Media file {} vanished before removal", name);
            Ok(())
        }
        Err(source) => Err(BuildError::MediaRemoval {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Copy every file below `source` into `media_dir`, flattening subdirectories
pub fn copy_media(source: &Path, media_dir: &Path) -> Result<usize, BuildError> {
    fs::create_dir_all(media_dir).map_err(|e| BuildError::write(media_dir, e))?;
    if !source.is_dir() {
        tracing::warn!("Media directory {:?} does not exist; nothing copied", source);
        return Ok(0);
    }

    // Flattened name to the file that claimed it first
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();
    let mut copied = 0;
    for entry in WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(first) = claimed.get(&name) {
            tracing::warn!(
                "Media file {:?} has the same name as {:?}; keeping the first",
                entry.path(),
                first
            );
            continue;
        }
        let target = media_dir.join(&name);
        fs::copy(entry.path(), &target).map_err(|e| BuildError::write(&target, e))?;
        claimed.insert(name, entry.into_path());
        copied += 1;
    }

    tracing::info!("Copied {} media files", copied);
    Ok(copied)
}

/// Reconcile the files in `media_dir` with `used`.
///
/// Unreferenced files are deleted and files whose name differs from the
/// referenced spelling only by case are renamed. Must run after every page
/// has been written and scanned. Running it twice changes nothing the
/// second time.
pub fn reconcile(media_dir: &Path, used: &UsedMedia) -> Result<MediaReport, BuildError> {
    let mut report = MediaReport::default();
    if !media_dir.is_dir() {
        return Ok(report);
    }

    let entries = fs::read_dir(media_dir).map_err(|source| BuildError::Io {
        path: media_dir.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| BuildError::Io {
            path: media_dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => tracing::warn!("Skipping media file with non UTF-8 name {:?}", raw),
        }
    }
    names.sort();
    let present: BTreeSet<String> = names.iter().cloned().collect();

    for name in names {
        let path = media_dir.join(&name);
        match used.canonical(&name) {
            None => {
                tracing::debug!("Removing unused media {}", name);
                remove_media(&path, name, &mut report)?;
            }
            // The correctly spelled file is already there; this one is stale
            Some(canonical) if canonical != name && present.contains(canonical) => {
                tracing::warn!("Removing {} in favour of existing {}", name, canonical);
                remove_media(&path, name, &mut report)?;
            }
            Some(canonical) if canonical != name => {
                let target = media_dir.join(canonical);
                fs::rename(&path, &target).map_err(|source| BuildError::Io {
                    path: path.clone(),
                    source,
                })?;
                tracing::debug!("Renamed media {} to {}", name, canonical);
                report.renamed.push((name, canonical.to_string()));
            }
            Some(_) => {}
        }
    }

    tracing::info!(
        "Media: {} kept, {} removed, {} renamed",
        used.len(),
        report.removed.len(),
        report.renamed.len()
    );
    Ok(report)
}
