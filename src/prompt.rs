//! Interactive conflict resolution for the command line.
//! Offers the full choice set, including the "apply to all" variants, and
//! remembers those for the rest of the run so the generator only ever sees
//! the five base decisions.

use clap::ValueEnum;
use dialoguer::Select;
use std::path::Path;

use crate::error::{Error, Result};
use crate::generator::ConflictDecision;

/// One answer the user can give to a conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    Overwrite,
    OverwriteAll,
    Merge,
    MergeAll,
    Skip,
    SkipAll,
    Keep,
    KeepAll,
    Cancel,
}

const FILE_CHOICES: [ConflictChoice; 7] = [
    ConflictChoice::Keep,
    ConflictChoice::KeepAll,
    ConflictChoice::Overwrite,
    ConflictChoice::OverwriteAll,
    ConflictChoice::Skip,
    ConflictChoice::SkipAll,
    ConflictChoice::Cancel,
];

const FOLDER_CHOICES: [ConflictChoice; 7] = [
    ConflictChoice::Merge,
    ConflictChoice::MergeAll,
    ConflictChoice::Overwrite,
    ConflictChoice::OverwriteAll,
    ConflictChoice::Skip,
    ConflictChoice::SkipAll,
    ConflictChoice::Cancel,
];

impl ConflictChoice {
    /// The decision handed to the generator.
    pub fn decision(self) -> ConflictDecision {
        match self {
            ConflictChoice::Overwrite | ConflictChoice::OverwriteAll => ConflictDecision::Overwrite,
            ConflictChoice::Merge | ConflictChoice::MergeAll => ConflictDecision::Merge,
            ConflictChoice::Skip | ConflictChoice::SkipAll => ConflictDecision::Skip,
            ConflictChoice::Keep | ConflictChoice::KeepAll => ConflictDecision::Keep,
            ConflictChoice::Cancel => ConflictDecision::Cancel,
        }
    }

    pub fn applies_to_all(self) -> bool {
        matches!(
            self,
            ConflictChoice::OverwriteAll
                | ConflictChoice::MergeAll
                | ConflictChoice::SkipAll
                | ConflictChoice::KeepAll
        )
    }

    /// Choices offered for a file or a folder, in menu order.
    pub fn options(is_folder: bool) -> &'static [ConflictChoice] {
        if is_folder {
            &FOLDER_CHOICES
        } else {
            &FILE_CHOICES
        }
    }

    fn label(self) -> &'static str {
        match self {
            ConflictChoice::Overwrite => "Overwrite",
            ConflictChoice::OverwriteAll => "Overwrite all",
            ConflictChoice::Merge => "Merge",
            ConflictChoice::MergeAll => "Merge all",
            ConflictChoice::Skip => "Skip",
            ConflictChoice::SkipAll => "Skip all",
            ConflictChoice::Keep => "Keep both",
            ConflictChoice::KeepAll => "Keep both for all",
            ConflictChoice::Cancel => "Cancel",
        }
    }
}

/// Fixed answer to every conflict, or `Ask` to prompt for each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConflictPolicy {
    #[default]
    Ask,
    Overwrite,
    Merge,
    Skip,
    Keep,
    Cancel,
}

impl ConflictPolicy {
    /// Decision this policy stands for, or `None` for `Ask`.
    pub fn decision(self) -> Option<ConflictDecision> {
        match self {
            ConflictPolicy::Ask => None,
            ConflictPolicy::Overwrite => Some(ConflictDecision::Overwrite),
            ConflictPolicy::Merge => Some(ConflictDecision::Merge),
            ConflictPolicy::Skip => Some(ConflictDecision::Skip),
            ConflictPolicy::Keep => Some(ConflictDecision::Keep),
            ConflictPolicy::Cancel => Some(ConflictDecision::Cancel),
        }
    }
}

/// Source of answers to conflict prompts.
pub trait ConflictPrompt {
    fn ask(&self, path: &Path, destination: &Path, is_folder: bool) -> Result<ConflictChoice>;
}

/// Asks on the terminal with a `dialoguer` menu.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl ConflictPrompt for DialoguerPrompter {
    fn ask(&self, path: &Path, destination: &Path, is_folder: bool) -> Result<ConflictChoice> {
        let shown = path.strip_prefix(destination).unwrap_or(path);
        let kind = if is_folder { "Folder" } else { "File" };
        let options = ConflictChoice::options(is_folder);
        let labels: Vec<&str> = options.iter().map(|choice| choice.label()).collect();

        let selection = Select::new()
            .with_prompt(format!("{kind} '{}' already exists", shown.display()))
            .default(0)
            .items(&labels)
            .interact()
            .map_err(|e| Error::PromptError(e.to_string()))?;

        Ok(options[selection])
    }
}

/// Turns prompt answers into generator decisions, remembering "all" answers
/// separately for files and folders.
pub struct ConflictResolver<'a> {
    prompt: &'a dyn ConflictPrompt,
    policy: ConflictPolicy,
    file_default: Option<ConflictDecision>,
    folder_default: Option<ConflictDecision>,
    error: Option<Error>,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(prompt: &'a dyn ConflictPrompt, policy: ConflictPolicy) -> Self {
        Self {
            prompt,
            policy,
            file_default: None,
            folder_default: None,
            error: None,
        }
    }

    /// Decision for a conflict at `path`.
    ///
    /// A failing prompt cancels generation; the failure is kept for
    /// [`ConflictResolver::take_error`].
    pub fn resolve(&mut self, path: &Path, destination: &Path, is_folder: bool) -> ConflictDecision {
        if let Some(decision) = self.policy.decision() {
            return decision;
        }
        let remembered = if is_folder {
            self.folder_default
        } else {
            self.file_default
        };
        if let Some(decision) = remembered {
            return decision;
        }

        match self.prompt.ask(path, destination, is_folder) {
            Ok(choice) => {
                let decision = choice.decision();
                if choice.applies_to_all() {
                    if is_folder {
                        self.folder_default = Some(decision);
                    } else {
                        self.file_default = Some(decision);
                    }
                }
                decision
            }
            Err(err) => {
                self.error = Some(err);
                ConflictDecision::Cancel
            }
        }
    }

    /// The prompt failure that cancelled generation, if any.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}
