//! Common constants used throughout makeproject.

/// Message returned by the generator when a conflict callback cancels the run.
pub const CANCELLED_MESSAGE: &str = "Generation cancelled.";

/// Name used for the root node when no title is given.
pub const DEFAULT_PROJECT_NAME: &str = "Project";

/// Name substituted for a file or folder name that sanitizes to nothing.
pub const UNTITLED: &str = "Untitled";

/// Characters that are replaced with `_` in generated names.
pub const INVALID_NAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Top-level keys of a mapping document that hold its item list.
pub const ITEM_LIST_KEYS: [&str; 2] = ["files", "items"];

/// Extension of project template documents in a template directory.
pub const PROJECT_TEMPLATE_EXT: &str = "yaml";

/// Directories skipped when listing templates.
pub const IGNORED_TEMPLATE_DIRS: [&str; 3] = [".git", ".hg", ".svn"];

/// Files skipped when listing templates.
pub const IGNORED_TEMPLATE_FILES: [&str; 5] =
    [".DS_Store", ".localized", "Thumbs.db", "desktop.ini", "._*"];

/// Example structure document covering every item form.
pub const DEFAULT_STRUCTURE: &str = r#"# Example project template.
# Each item is either a file or a folder in the project.
# Tokens use {mp:token} and are case-insensitive.
#
# Explicit syntax:
# - file: filename for a generated file
# - folder: folder name
#   contents: nested items inside a folder
# - content: inline file contents (supports {mp:token})
# - template: reference a File Template by name
# - file_template: file named after a File Template, filled from it
# - project_template: include another Project Template by name
# - python: run code that sets `result` to, or prints, a YAML list
- file: README.md
  content: |
    # {mp:title}

    {mp:description}

- folder: src
  contents:
    - file: main.py
      template: main.py
    - folder: tests

# Implicit syntax (folder name as the key, list of contents as the value):
- "Teaching - {mp:title}":
  - Quizzes.md
  - file: lesson-plan.md
    content: |
      # Lesson Plan
      {mp:description}
  - folder: resources

# Programmatic items (the block prints a YAML list):
- python: |
    {% for i in range(3) %}
    - file: "Quiz {{ i }}.tex"
      content: "\\section*{Quiz {{ i }}}"
    {% endfor %}
"#;
