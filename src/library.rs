//! Named template lookup.
//!
//! The tree builder resolves `project_template`, `file_template` and
//! `template` references through a [`TemplateLibrary`]. Storage is the
//! caller's business; two implementations are provided: an in-memory one and
//! one backed by a pair of directories.

use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use log::debug;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::constants::{IGNORED_TEMPLATE_DIRS, IGNORED_TEMPLATE_FILES, PROJECT_TEMPLATE_EXT};
use crate::error::{Error, Result};

/// Lookup of named project and file templates.
pub trait TemplateLibrary {
    /// Source of the project template (structure document) called `name`.
    fn project_template(&self, name: &str) -> Option<String>;

    /// Content of the file template called `name`.
    fn file_template(&self, name: &str) -> Option<String>;
}

/// Templates held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLibrary {
    projects: IndexMap<String, String>,
    files: IndexMap<String, String>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project<N: Into<String>, S: Into<String>>(mut self, name: N, source: S) -> Self {
        self.projects.insert(name.into(), source.into());
        self
    }

    pub fn with_file<N: Into<String>, S: Into<String>>(mut self, name: N, content: S) -> Self {
        self.files.insert(name.into(), content.into());
        self
    }
}

impl TemplateLibrary for MemoryLibrary {
    fn project_template(&self, name: &str) -> Option<String> {
        self.projects.get(name).cloned()
    }

    fn file_template(&self, name: &str) -> Option<String> {
        self.files.get(name).cloned()
    }
}

/// Templates stored on disk.
///
/// Project template `name` lives at `<projects>/<name>.yaml`; file template
/// `name` at `<files>/<name>`. Names may contain folders.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLibrary {
    projects: Option<PathBuf>,
    files: Option<PathBuf>,
}

impl DirectoryLibrary {
    pub fn new(projects: Option<PathBuf>, files: Option<PathBuf>) -> Self {
        Self { projects, files }
    }

    /// Names of all project templates, without extension, sorted ignoring case.
    pub fn project_template_names(&self) -> Result<Vec<String>> {
        let Some(dir) = &self.projects else {
            return Ok(Vec::new());
        };
        let names = list_templates(dir)?
            .into_iter()
            .filter_map(|name| {
                name.strip_suffix(&format!(".{PROJECT_TEMPLATE_EXT}"))
                    .map(String::from)
            })
            .collect();
        Ok(names)
    }

    /// Names of all file templates, sorted ignoring case.
    pub fn file_template_names(&self) -> Result<Vec<String>> {
        match &self.files {
            Some(dir) => list_templates(dir),
            None => Ok(Vec::new()),
        }
    }
}

impl TemplateLibrary for DirectoryLibrary {
    fn project_template(&self, name: &str) -> Option<String> {
        let name = name.strip_suffix(&format!(".{PROJECT_TEMPLATE_EXT}")).unwrap_or(name);
        let relative = safe_relative_path(name)?;
        let path = self
            .projects
            .as_ref()?
            .join(format!("{}.{PROJECT_TEMPLATE_EXT}", relative.display()));
        read_template(&path)
    }

    fn file_template(&self, name: &str) -> Option<String> {
        let relative = safe_relative_path(name)?;
        read_template(&self.files.as_ref()?.join(relative))
    }
}

fn read_template(path: &Path) -> Option<String> {
    debug!("Looking up template at {}", path.display());
    if !path.is_file() {
        return None;
    }
    std::fs::read_to_string(path).ok()
}

/// `name` as a relative path, or `None` if it is empty, absolute, or climbs
/// out of the template directory.
fn safe_relative_path(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name.trim().replace('\\', "/"));
    path.file_name()?;
    let safe = path
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    safe.then_some(path)
}

fn ignored_files() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in IGNORED_TEMPLATE_FILES {
        builder.add(Glob::new(pattern).map_err(|e| Error::ConfigError(e.to_string()))?);
    }
    builder
        .build()
        .map_err(|e| Error::ConfigError(e.to_string()))
}

fn list_templates(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let ignored = ignored_files()?;
    let mut names = Vec::new();

    let walker = WalkDir::new(dir).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !IGNORED_TEMPLATE_DIRS.iter().any(|ignored| *ignored == name)
    });
    for entry in walker {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        if !entry.file_type().is_file() || ignored.is_match(entry.file_name()) {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(dir) {
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            names.push(parts.join("/"));
        }
    }
    names.sort_by_key(|name| name.to_lowercase());
    Ok(names)
}
