//! Configuration handling for makeproject.
//! Loads the template directories, custom tokens and the code preamble from a
//! JSON or YAML configuration file.

use crate::error::{Error, Result};
use crate::parser::value_text;
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// How a custom token's value is used at substitution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Substituted as is.
    Text,
    /// Evaluated as code every time it is referenced.
    Python,
}

/// A user-defined token as written in a configuration or tokens file.
///
/// Accepted shapes:
/// - `email: me@example.com`
/// - `year: { type: python, value: "2000 + 26" }`
/// - `year: { python: "2000 + 26" }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CustomToken {
    Typed {
        #[serde(rename = "type")]
        token_type: String,
        #[serde(default)]
        value: serde_yaml::Value,
    },
    Python {
        python: serde_yaml::Value,
    },
    Text(serde_yaml::Value),
}

impl CustomToken {
    pub fn token_type(&self) -> TokenType {
        match self {
            CustomToken::Typed { token_type, .. } if token_type.eq_ignore_ascii_case("python") => {
                TokenType::Python
            }
            CustomToken::Python { .. } => TokenType::Python,
            _ => TokenType::Text,
        }
    }

    pub fn value(&self) -> String {
        match self {
            CustomToken::Typed { value, .. } => value_text(value),
            CustomToken::Python { python } => value_text(python),
            CustomToken::Text(value) => value_text(value),
        }
    }
}

/// makeproject configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding project templates (`<name>.yaml`).
    pub project_templates_dir: Option<PathBuf>,
    /// Directory holding file templates.
    pub file_templates_dir: Option<PathBuf>,
    /// A separate YAML file of custom tokens, merged after `custom_tokens`.
    pub custom_tokens_file: Option<PathBuf>,
    /// Inline custom tokens, in definition order.
    pub custom_tokens: IndexMap<String, CustomToken>,
    /// Code run once before the embedded code of each substitution.
    pub python_preamble: Option<String>,
}

impl Config {
    /// All custom tokens: the inline ones followed by those of
    /// `custom_tokens_file`, later definitions winning.
    pub fn tokens(&self) -> Result<IndexMap<String, CustomToken>> {
        let mut tokens = self.custom_tokens.clone();
        if let Some(path) = &self.custom_tokens_file {
            tokens.extend(load_custom_tokens(path)?);
        }
        Ok(tokens)
    }
}

/// Loads the configuration at `path`; with no path, the defaults.
///
/// # Errors
/// * `Error::IoError` if the file cannot be read
/// * `Error::ConfigError` if the content is neither valid JSON nor YAML
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(Error::IoError)?;
    parse_config(&content)
}

/// Parses configuration content, trying JSON first and YAML second.
pub fn parse_config(content: &str) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    match serde_json::from_str(content) {
        Ok(config) => Ok(config),
        Err(_) => serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Invalid configuration format: {}", e))),
    }
}

/// Reads a YAML mapping of custom tokens.
pub fn load_custom_tokens<P: AsRef<Path>>(path: P) -> Result<IndexMap<String, CustomToken>> {
    let path = path.as_ref();
    debug!("Loading custom tokens from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(Error::IoError)?;
    if content.trim().is_empty() {
        return Ok(IndexMap::new());
    }
    serde_yaml::from_str(&content).map_err(|e| {
        Error::ConfigError(format!("Invalid custom tokens in {}: {}", path.display(), e))
    })
}
