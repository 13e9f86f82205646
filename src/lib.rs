//! makeproject builds project folders from declarative structure documents.
//! A structure document lists files and folders, pulls in reusable project
//! and file templates by name, and fills in `{mp:...}` placeholders, some of
//! which run embedded code.

/// Command-line interface module for the makeproject application
pub mod cli;

/// Configuration handling: template folders, custom tokens and the code preamble
/// Supports JSON and YAML formats
pub mod config;

/// Shared constants and the example structure document
pub mod constants;

/// Token contexts placeholders are resolved against
pub mod context;

/// Error types and handling for the makeproject application
pub mod error;

/// Writes a built tree to disk, routing collisions through a conflict callback
pub mod generator;

/// Named project and file template lookup
pub mod library;

/// The output tree of files and folders
pub mod node;

/// YAML parsing of structure documents
pub mod parser;

/// Text fix-ups applied to structure documents before parsing
pub mod preprocess;

/// Interactive conflict prompts
pub mod prompt;

/// Embedded code evaluation behind a scripting engine interface
pub mod script;

/// Placeholder substitution
pub mod substitute;

/// Tree construction from parsed structure documents
pub mod tree;
