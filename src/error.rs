//! Error handling for makeproject.
//! Defines the structured error taxonomy shared by the parser, the token
//! substitution engine, the tree builder and the generator, plus the
//! decorator that attaches a document name and line to an error.

use std::fmt;
use std::io;
use thiserror::Error;

/// Which kind of named template a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Project,
    File,
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateKind::Project => write!(f, "Project"),
            TemplateKind::File => write!(f, "File"),
        }
    }
}

/// Custom error types for makeproject operations.
///
/// Every variant that originates from a structure document carries the
/// offending token, key or template name as a field, so that [`Error::decorate`]
/// can find the line it came from without parsing the message text.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Malformed structured data.
    #[error("{}", parse_message(.line, .message))]
    ParseError { line: Option<usize>, message: String },

    /// A `{mp:Name}` placeholder with no matching token.
    #[error("Unknown token \"{name}\".")]
    UnknownToken { name: String },

    /// A single-key mapping whose value is not an item list.
    #[error("Invalid shorthand folder for \"{key}\".")]
    MalformedShorthand { key: String },

    /// A referenced project or file template does not exist.
    #[error("{kind} template \"{name}\" not found.")]
    MissingTemplate { kind: TemplateKind, name: String },

    /// A project template that (transitively) includes itself.
    #[error("Recursive project template include: {}", .chain.join(" -> "))]
    CyclicInclude { chain: Vec<String> },

    /// Any failure raised by embedded code. `token` names the code token
    /// whose body failed, if the code came from one.
    #[error("Code error in {origin}: {message}")]
    CodeExecution {
        origin: String,
        message: String,
        token: Option<String>,
    },

    /// Code output or a referenced document that does not yield an item list.
    #[error("Invalid items from {origin}: {message}")]
    InvalidItems { origin: String, message: String },

    /// Represents errors that occur during configuration parsing or processing
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// Interactive prompt failed (no terminal, interrupted input).
    #[error("Prompt error: {0}.")]
    PromptError(String),

    /// An error attributed to the document it was raised in.
    #[error("{}", located_message(.document, .line, .source))]
    Located {
        document: String,
        line: Option<usize>,
        source: Box<Error>,
    },
}

fn parse_message(line: &Option<usize>, message: &str) -> String {
    match line {
        Some(line) => format!("Invalid YAML on line {line}"),
        None => format!("Invalid YAML: {message}"),
    }
}

fn located_message(document: &str, line: &Option<usize>, source: &Error) -> String {
    match line {
        Some(line) => format!("{source} (in \"{document}\", line {line})"),
        None => format!("{source} (in \"{document}\")"),
    }
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attributes this error to `document`, whose source text is `text`.
    ///
    /// Decoration happens once: an already located error is returned as is.
    /// The line comes from the error itself for parse errors, otherwise from
    /// the first line of `text` mentioning the token, key or template name
    /// the error carries.
    pub fn decorate(self, document: &str, text: &str) -> Error {
        if let Error::Located { .. } = self {
            return self;
        }
        let line = match &self {
            Error::ParseError { line, .. } => *line,
            _ => self.needle().and_then(|needle| locate_line(text, &needle)),
        };
        Error::Located {
            document: document.to_string(),
            line,
            source: Box::new(self),
        }
    }

    /// Line number of this error, if one is known.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::ParseError { line, .. } | Error::Located { line, .. } => *line,
            _ => None,
        }
    }

    /// Name of the document this error was attributed to.
    pub fn document(&self) -> Option<&str> {
        match self {
            Error::Located { document, .. } => Some(document),
            _ => None,
        }
    }

    /// The undecorated error.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Located { source, .. } => source.root_cause(),
            _ => self,
        }
    }

    fn needle(&self) -> Option<String> {
        match self {
            Error::UnknownToken { name } => Some(format!("mp:{name}")),
            Error::CodeExecution {
                token: Some(name), ..
            } => Some(format!("mp:{name}")),
            Error::MalformedShorthand { key } => Some(key.clone()),
            Error::MissingTemplate { name, .. } => Some(name.clone()),
            Error::CyclicInclude { chain } => chain.last().cloned(),
            _ => None,
        }
    }
}

/// Finds the 1-based line of the first occurrence of `needle` in `text`,
/// ignoring case and blanks between the `mp:` marker and a token name.
pub fn locate_line(text: &str, needle: &str) -> Option<usize> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    text.lines()
        .position(|line| {
            let line = line.to_lowercase();
            line.contains(&needle) || line.replace("mp: ", "mp:").contains(&needle)
        })
        .map(|index| index + 1)
}

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The Error to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{}", err);
    std::process::exit(1);
}
