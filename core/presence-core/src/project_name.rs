//! Project name inference.
//!
//! Unity does not expose the open project anywhere stable, so the name is
//! pieced together from two unreliable sources, first success wins:
//!
//! 1. The editor window title, e.g. `MyGame - Unity 2022.3.1f1 - Main.unity`.
//!    Pure string work, see [`extract_from_title`].
//! 2. Unity's per-version `RecentlyUsedAssetPaths.txt`, see
//!    [`extract_from_history`]. The only I/O in this module.
//!
//! When both fail the name is [`UNKNOWN_PROJECT`]; a resolved name is never
//! blank.
//!
//! Any title part containing the brand is treated as a version banner, so a
//! project literally named "Unity Tools" is skipped in favour of another part
//! or the history file.

use std::path::Path;

use fs_err as fs;
use tracing::{debug, warn};

use crate::config::{HistoryConfig, PresenceConfig, TitleRules, UNKNOWN_PROJECT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    Title,
    History,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIdentity {
    name: String,
    source: NameSource,
}

impl ProjectIdentity {
    /// Returns `None` for blank names.
    pub fn new(name: impl Into<String>, source: NameSource) -> Option<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            name: trimmed.to_string(),
            source,
        })
    }

    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_PROJECT.to_string(),
            source: NameSource::Unknown,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> NameSource {
        self.source
    }

    pub fn is_unknown(&self) -> bool {
        self.source == NameSource::Unknown
    }
}

/// Seam used by the reconciler; lets tests observe whether a tick resolved
/// a name at all.
pub trait ProjectNameSource {
    fn resolve(&self, window_title: &str) -> ProjectIdentity;
}

#[derive(Debug, Clone)]
pub struct ProjectNameResolver {
    rules: TitleRules,
    history: HistoryConfig,
}

impl ProjectNameResolver {
    pub fn new(rules: TitleRules, history: HistoryConfig) -> Self {
        Self { rules, history }
    }

    pub fn from_config(config: &PresenceConfig) -> Self {
        Self::new(config.title_rules.clone(), config.history.clone())
    }
}

impl ProjectNameSource for ProjectNameResolver {
    fn resolve(&self, window_title: &str) -> ProjectIdentity {
        resolve_project_name(window_title, &self.rules, &self.history)
    }
}

/// Title first, history second, sentinel last.
pub fn resolve_project_name(
    title: &str,
    rules: &TitleRules,
    history: &HistoryConfig,
) -> ProjectIdentity {
    extract_from_title(title, rules)
        .and_then(|name| ProjectIdentity::new(name, NameSource::Title))
        .or_else(|| {
            extract_from_history(history)
                .and_then(|name| ProjectIdentity::new(name, NameSource::History))
        })
        .unwrap_or_else(|| {
            debug!(title, "Could not determine project name");
            ProjectIdentity::unknown()
        })
}

pub fn extract_from_title(title: &str, rules: &TitleRules) -> Option<String> {
    if title.trim().is_empty() {
        return None;
    }
    split_on_separators(title, rules).or_else(|| strip_brand(title, rules))
}

fn split_on_separators(title: &str, rules: &TitleRules) -> Option<String> {
    rules.separators.iter().find_map(|separator| {
        let parts: Vec<&str> = title.split(separator.as_str()).collect();
        if parts.len() < 2 {
            return None;
        }
        parts
            .into_iter()
            .map(str::trim)
            .find(|part| is_project_part(part, rules))
            .map(str::to_string)
    })
}

fn is_project_part(part: &str, rules: &TitleRules) -> bool {
    !part.is_empty() && !part.contains(&rules.brand) && !part.ends_with(&rules.scene_suffix)
}

/// Last resort for titles without separators, e.g. `MyGame Unity`.
fn strip_brand(title: &str, rules: &TitleRules) -> Option<String> {
    if rules.brand.is_empty() || !title.contains(&rules.brand) {
        return None;
    }

    let mut cleaned = title.replace(&rules.brand, "").trim().to_string();
    for separator in &rules.separators {
        cleaned = cleaned.replace(separator.as_str(), " ").trim().to_string();
    }
    if cleaned.ends_with(&rules.scene_suffix) {
        if let Some(dot) = cleaned.rfind('.') {
            cleaned = cleaned[..dot].trim().to_string();
        }
    }

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Reads the first existing history file and names the project after the
/// parent directory of its most recent entry.
pub fn extract_from_history(history: &HistoryConfig) -> Option<String> {
    let app_data_dir = history.app_data_dir.as_deref()?;

    for version in &history.editor_versions {
        let path = history.history_path(app_data_dir, version);
        debug!(path = %path.display(), "Checking editor history");
        if !path.exists() {
            continue;
        }

        return match read_first_line(&path) {
            Ok(Some(line)) => {
                let name = parent_dir_name(&line);
                debug!(version = %version, recent = %line, project = ?name, "Read editor history");
                name
            }
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, path = %path.display(), "Failed to read editor history");
                None
            }
        };
    }

    None
}

fn read_first_line(path: &Path) -> std::io::Result<Option<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .next()
        .map(|line| line.trim().to_string()))
}

/// Name of the directory containing `path`. Accepts both `/` and `\` since
/// the file is written by the editor on whatever platform it runs.
fn parent_dir_name(path: &str) -> Option<String> {
    let mut segments = path.rsplit(['/', '\\']);
    segments.next()?;
    let parent = segments.next()?.trim();
    if parent.is_empty() || parent.ends_with(':') {
        return None;
    }
    Some(parent.to_string())
}
