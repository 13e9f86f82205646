//! Token context: the values and code bodies placeholders resolve against.
//!
//! Lookups are case-insensitive. A context is never mutated once shared;
//! entering a narrower scope (a sub-template, a single file) goes through
//! [`TokenContext::with_overrides`], which layers new values over a copy.

use indexmap::IndexMap;
use std::path::Path;

use crate::config::{CustomToken, TokenType};

/// Mapping from token name to value, plus the side table of tokens whose body
/// is code evaluated at substitution time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenContext {
    values: IndexMap<String, String>,
    code: IndexMap<String, String>,
}

impl TokenContext {
    /// Creates a context holding the built-in `title` and `description`
    /// tokens, and `formatted_name` derived from the title.
    pub fn new(title: &str, description: &str) -> Self {
        let mut context = Self::default();
        context.insert("title", title);
        context.insert("description", description);
        context.insert("formatted_name", &formatted_name(title));
        context
    }

    /// Adds the user-defined tokens, in order.
    pub fn with_custom_tokens<'a, I>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a CustomToken)>,
    {
        for (name, token) in tokens {
            let value = token.value();
            match token.token_type() {
                TokenType::Text => self.insert(name, &value),
                TokenType::Python => self.insert_code(name, &value),
            }
        }
        self
    }

    /// Returns a new context with `overrides` layered on top of this one.
    ///
    /// An overridden name always resolves to the given plain value, even if
    /// the parent defined it as code.
    pub fn with_overrides<K, V, I>(&self, overrides: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut context = self.clone();
        for (name, value) in overrides {
            context.insert(name.as_ref(), value.as_ref());
        }
        context
    }

    /// Context for the content of the file called `filename`: adds
    /// `filename`, `file_stem` and `file_ext` (without the leading dot).
    pub fn for_file(&self, filename: &str) -> Self {
        let path = Path::new(filename);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.with_overrides([
            ("filename", filename.to_string()),
            ("file_stem", stem),
            ("file_ext", ext),
        ])
    }

    /// Plain value of `name`, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&name.trim().to_lowercase()).map(String::as_str)
    }

    /// Code body of `name` if it is a code token, ignoring case.
    pub fn code(&self, name: &str) -> Option<&str> {
        self.code.get(&name.trim().to_lowercase()).map(String::as_str)
    }

    pub fn title(&self) -> &str {
        self.get("title").unwrap_or_default()
    }

    /// Plain values keyed by lowercase name, in definition order.
    pub fn values(&self) -> &IndexMap<String, String> {
        &self.values
    }

    fn insert(&mut self, name: &str, value: &str) {
        let key = name.trim().to_lowercase();
        self.code.shift_remove(&key);
        self.values.insert(key, value.to_string());
    }

    fn insert_code(&mut self, name: &str, code: &str) {
        let key = name.trim().to_lowercase();
        self.values.shift_remove(&key);
        self.code.insert(key, code.to_string());
    }
}

/// File-friendly form of a title: lowercase, spaces and dashes as underscores.
pub fn formatted_name(title: &str) -> String {
    title.to_lowercase().replace([' ', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let context = TokenContext::new("Demo", "A demo");
        assert_eq!(context.get("TITLE"), Some("Demo"));
        assert_eq!(context.get("Description"), Some("A demo"));
        assert_eq!(context.get("missing"), None);
    }

    #[test]
    fn test_overrides_do_not_touch_parent() {
        let parent = TokenContext::new("Parent", "");
        let child = parent.with_overrides([("Title", "Child")]);
        assert_eq!(parent.title(), "Parent");
        assert_eq!(child.title(), "Child");
    }

    #[test]
    fn test_custom_tokens_split_text_and_code() {
        let mut tokens = IndexMap::new();
        tokens.insert(
            "Email".to_string(),
            CustomToken::Text(serde_yaml::Value::from("me@example.com")),
        );
        tokens.insert(
            "Year".to_string(),
            CustomToken::Typed {
                token_type: "python".to_string(),
                value: serde_yaml::Value::from("2000 + 26"),
            },
        );
        let context = TokenContext::new("Demo", "").with_custom_tokens(&tokens);
        assert_eq!(context.get("email"), Some("me@example.com"));
        assert_eq!(context.get("year"), None);
        assert_eq!(context.code("YEAR"), Some("2000 + 26"));

        let overridden = context.with_overrides([("year", "1999")]);
        assert_eq!(overridden.code("year"), None);
        assert_eq!(overridden.get("year"), Some("1999"));
    }

    #[test]
    fn test_file_scope() {
        let context = TokenContext::new("Demo", "").for_file("notes.tar.gz");
        assert_eq!(context.get("filename"), Some("notes.tar.gz"));
        assert_eq!(context.get("file_stem"), Some("notes.tar"));
        assert_eq!(context.get("file_ext"), Some("gz"));
        assert_eq!(formatted_name("Linear Algebra-II"), "linear_algebra_ii");
    }
}
