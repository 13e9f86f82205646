//! Materializes a built tree on disk.
//!
//! Existing paths are never silently clobbered: each collision is routed
//! through the caller's conflict callback, which answers with a
//! [`ConflictDecision`]. Cancellation unwinds the whole call but leaves
//! whatever was already written in place.

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::CANCELLED_MESSAGE;
use crate::error::{Error, Result};
use crate::node::Node;

/// Answer to a path collision.
///
/// `Merge` only makes sense for folders and behaves as `Overwrite` for files;
/// `Keep` only makes sense for files and behaves as `Merge` for folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    /// Replace whatever occupies the path.
    Overwrite,
    /// Write into the existing folder.
    Merge,
    /// Leave the existing path alone and drop this node.
    Skip,
    /// Write the file under the next free numbered name.
    Keep,
    /// Abort the whole generation.
    Cancel,
}

/// Progress callback: `(files_written, total_files)`.
pub type ProgressCallback<'a> = &'a mut dyn FnMut(usize, usize);

/// Conflict callback: `(path, destination_root, is_folder)`.
pub type ConflictCallback<'a> = &'a mut dyn FnMut(&Path, &Path, bool) -> ConflictDecision;

/// Result of a [`generate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    /// Whether generation stopped because the conflict callback cancelled it.
    pub fn is_cancelled(&self) -> bool {
        !self.success && self.message == CANCELLED_MESSAGE
    }
}

/// Why a generation run stopped early.
enum Interrupt {
    Cancelled,
    Failed(Error),
}

impl From<Error> for Interrupt {
    fn from(err: Error) -> Self {
        Interrupt::Failed(err)
    }
}

impl From<std::io::Error> for Interrupt {
    fn from(err: std::io::Error) -> Self {
        Interrupt::Failed(Error::IoError(err))
    }
}

/// Writes the children of `root` under `destination`.
///
/// The root node itself is not created: the caller picks the destination.
/// Without a conflict callback, existing files are overwritten and existing
/// folders merged into.
///
/// # Arguments
/// * `root` - Tree returned by the tree builder
/// * `destination` - Folder the root's children are written into
/// * `on_progress` - Called after every file write
/// * `on_conflict` - Called for every path that already exists
///
/// # Returns
/// * `Outcome` - `success` with a confirmation message, or a failure whose
///   message is either [`CANCELLED_MESSAGE`] or the error that stopped the run
pub fn generate(
    root: &Node,
    destination: &Path,
    on_progress: Option<ProgressCallback<'_>>,
    on_conflict: Option<ConflictCallback<'_>>,
) -> Outcome {
    let mut generator = Generator {
        destination,
        written: 0,
        total: root.file_count(),
        on_progress,
        on_conflict,
    };

    match generator.run(root) {
        Ok(()) => {
            info!("Wrote {} files to {}", generator.written, destination.display());
            Outcome {
                success: true,
                message: format!("Project created in: {}", destination.display()),
            }
        }
        Err(Interrupt::Cancelled) => {
            info!("Generation cancelled after {} files", generator.written);
            Outcome {
                success: false,
                message: CANCELLED_MESSAGE.to_string(),
            }
        }
        Err(Interrupt::Failed(err)) => Outcome {
            success: false,
            message: format!("Error creating project: {err}"),
        },
    }
}

/// The first `name (n).ext` variant of `path` that does not exist yet.
///
/// ```
/// use makeproject::generator::next_available_path;
/// use std::path::Path;
///
/// let path = next_available_path(Path::new("/nonexistent/dir/Demo.md"));
/// assert_eq!(path, Path::new("/nonexistent/dir/Demo (1).md"));
/// ```
pub fn next_available_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|s| format!(".{}", s.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1;
    loop {
        let candidate = path.with_file_name(format!("{stem} ({n}){ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

struct Generator<'a, 'p, 'c> {
    destination: &'a Path,
    written: usize,
    total: usize,
    on_progress: Option<ProgressCallback<'p>>,
    on_conflict: Option<ConflictCallback<'c>>,
}

impl Generator<'_, '_, '_> {
    fn run(&mut self, root: &Node) -> std::result::Result<(), Interrupt> {
        fs::create_dir_all(self.destination)?;
        for child in &root.children {
            let target = self.destination.join(&child.name);
            self.write_node(child, &target)?;
        }
        Ok(())
    }

    fn write_node(&mut self, node: &Node, target: &Path) -> std::result::Result<(), Interrupt> {
        if node.is_folder {
            self.write_folder(node, target)
        } else {
            self.write_file(node, target)
        }
    }

    fn decide(&mut self, path: &Path, is_folder: bool) -> ConflictDecision {
        let decision = match self.on_conflict.as_deref_mut() {
            Some(on_conflict) => on_conflict(path, self.destination, is_folder),
            None if is_folder => ConflictDecision::Merge,
            None => ConflictDecision::Overwrite,
        };
        debug!("Conflict at {}: {:?}", path.display(), decision);
        decision
    }

    fn write_folder(&mut self, node: &Node, target: &Path) -> std::result::Result<(), Interrupt> {
        if exists(target) {
            match self.decide(target, true) {
                ConflictDecision::Overwrite => remove_path(target)?,
                ConflictDecision::Merge | ConflictDecision::Keep => {
                    if !target.is_dir() {
                        remove_path(target)?;
                    }
                }
                ConflictDecision::Skip => {
                    debug!("Skipping folder: {}", target.display());
                    return Ok(());
                }
                ConflictDecision::Cancel => return Err(Interrupt::Cancelled),
            }
        }
        debug!("Creating folder: {}", target.display());
        fs::create_dir_all(target)?;

        for child in &node.children {
            self.write_node(child, &target.join(&child.name))?;
        }
        Ok(())
    }

    fn write_file(&mut self, node: &Node, target: &Path) -> std::result::Result<(), Interrupt> {
        let target = if exists(target) {
            match self.decide(target, false) {
                ConflictDecision::Overwrite | ConflictDecision::Merge => {
                    if target.is_dir() {
                        remove_path(target)?;
                    }
                    target.to_path_buf()
                }
                ConflictDecision::Keep => next_available_path(target),
                ConflictDecision::Skip => {
                    debug!("Skipping file: {}", target.display());
                    return Ok(());
                }
                ConflictDecision::Cancel => return Err(Interrupt::Cancelled),
            }
        } else {
            target.to_path_buf()
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("Writing file: {}", target.display());
        fs::write(&target, &node.content)?;

        self.written += 1;
        if let Some(on_progress) = self.on_progress.as_deref_mut() {
            on_progress(self.written, self.total);
        }
        Ok(())
    }
}

/// Whether anything, including a dangling symlink, occupies `path`.
fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

fn remove_path(path: &Path) -> Result<()> {
    let metadata = path.symlink_metadata().map_err(Error::IoError)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(Error::IoError)
    } else {
        fs::remove_file(path).map_err(Error::IoError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_next_available_path_counts_up() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "").unwrap();
        fs::write(temp_dir.path().join("notes (1).txt"), "").unwrap();
        assert_eq!(next_available_path(&path), temp_dir.path().join("notes (2).txt"));

        let bare = temp_dir.path().join("Makefile");
        assert_eq!(next_available_path(&bare), temp_dir.path().join("Makefile (1)"));
    }

    #[test]
    fn test_default_decisions_overwrite_and_merge() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("src")).unwrap();
        fs::write(temp_dir.path().join("src/old.rs"), "old").unwrap();
        fs::write(temp_dir.path().join("README.md"), "old").unwrap();

        let root = Node::folder(
            "root",
            vec![
                Node::folder("src", vec![Node::file("new.rs", "new")]),
                Node::file("README.md", "new"),
            ],
        );
        let outcome = generate(&root, temp_dir.path(), None, None);

        assert!(outcome.success, "{}", outcome.message);
        assert!(temp_dir.path().join("src/old.rs").exists());
        assert_eq!(fs::read_to_string(temp_dir.path().join("src/new.rs")).unwrap(), "new");
        assert_eq!(fs::read_to_string(temp_dir.path().join("README.md")).unwrap(), "new");
    }

    #[test]
    fn test_merge_replaces_file_in_folder_slot() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("docs"), "not a folder").unwrap();

        let root = Node::folder("root", vec![Node::folder("docs", vec![Node::file("a.md", "a")])]);
        let mut on_conflict = |_: &Path, _: &Path, _: bool| ConflictDecision::Merge;
        let outcome = generate(&root, temp_dir.path(), None, Some(&mut on_conflict));

        assert!(outcome.success);
        assert!(temp_dir.path().join("docs").is_dir());
        assert!(temp_dir.path().join("docs/a.md").is_file());
    }

    #[test]
    fn test_failure_is_reported_not_raised() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let root = Node::folder("root", vec![Node::file("a.txt", "")]);
        let outcome = generate(&root, &blocker.join("inside"), None, None);

        assert!(!outcome.success);
        assert!(!outcome.is_cancelled());
        assert!(outcome.message.starts_with("Error creating project: "));
    }
}
