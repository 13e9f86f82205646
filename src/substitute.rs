//! Token substitution engine.
//!
//! Three placeholder forms are resolved, in this order, each pass finishing
//! before the next starts:
//!
//! 1. `{mp.py|<code>}`: a code block. Its `result` binding, or failing that
//!    its output, replaces the placeholder. Lists and mappings are written
//!    back as YAML so a block can emit whole item lists.
//! 2. `{mp.py:<expr>}`: a single expression.
//! 3. `{mp:Name}`: a token looked up in the [`TokenContext`], ignoring case.
//!    Code tokens are run each time they are referenced.
//!
//! The `mp` marker is matched case-insensitively. The extent of the two code
//! forms is found by brace matching, so braces inside the code are fine as
//! long as they balance.

use log::debug;
use regex::Regex;
use std::cell::OnceCell;
use std::sync::LazyLock;

use crate::context::TokenContext;
use crate::error::{Error, Result};
use crate::parser::value_text;
use crate::script::{Execution, MiniJinjaEngine, ScriptEngine, ScriptError, ScriptSession};

static BLOCK_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{mp\.py\|").expect("block pattern is valid"));

static EXPRESSION_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{mp\.py\s*:").expect("expression pattern is valid"));

static NAMED_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{mp:([^}]+)\}").expect("token pattern is valid"));

/// Resolves placeholders against a token context.
pub struct Substituter {
    engine: Box<dyn ScriptEngine>,
    preamble: Option<String>,
}

impl Default for Substituter {
    fn default() -> Self {
        Substituter::new(Box::new(MiniJinjaEngine::new()))
    }
}

impl Substituter {
    pub fn new(engine: Box<dyn ScriptEngine>) -> Self {
        Self {
            engine,
            preamble: None,
        }
    }

    /// Sets code that runs once before the first code placeholder of every
    /// substitution call.
    pub fn with_preamble<S: Into<String>>(mut self, preamble: Option<S>) -> Self {
        self.preamble = preamble.map(Into::into);
        self
    }

    /// Replaces every placeholder in `text`.
    ///
    /// # Errors
    /// * `Error::UnknownToken` if a `{mp:Name}` has no matching token
    /// * `Error::CodeExecution` if embedded code or the preamble fails
    pub fn substitute(&self, text: &str, context: &TokenContext) -> Result<String> {
        if !text.contains('{') {
            return Ok(text.to_string());
        }
        let pass = Pass::new(self, context);

        let text = replace_code_forms(text, &BLOCK_OPEN, |code| pass.block("{mp.py|...} block", code))?;
        let text = replace_code_forms(&text, &EXPRESSION_OPEN, |expr| pass.expression(expr))?;
        pass.named_tokens(&text)
    }

    /// Runs a block of code against `context` in a fresh session and returns
    /// what it produced, for callers that need the raw value.
    pub fn run_block(&self, code: &str, context: &TokenContext, origin: &str) -> Result<Execution> {
        let pass = Pass::new(self, context);
        let code = dedent(code);
        pass.session()?
            .execute(code.trim_matches('\n'))
            .map_err(|e| code_error(origin, e))
    }
}

/// State of one substitution call: the lazily opened script session.
struct Pass<'a> {
    substituter: &'a Substituter,
    context: &'a TokenContext,
    session: OnceCell<Box<dyn ScriptSession>>,
}

impl<'a> Pass<'a> {
    fn new(substituter: &'a Substituter, context: &'a TokenContext) -> Self {
        Self {
            substituter,
            context,
            session: OnceCell::new(),
        }
    }

    fn session(&self) -> Result<&dyn ScriptSession> {
        if let Some(session) = self.session.get() {
            return Ok(session.as_ref());
        }
        let session = self
            .substituter
            .engine
            .session(self.context, self.substituter.preamble.as_deref())
            .map_err(|e| code_error("preamble", e))?;
        Ok(self.session.get_or_init(|| session).as_ref())
    }

    fn block(&self, origin: &str, code: &str) -> Result<String> {
        let code = dedent(code);
        let execution = self
            .session()?
            .execute(code.trim_matches('\n'))
            .map_err(|e| code_error(origin, e))?;
        Ok(match execution.result {
            Some(value) => value_text(&value),
            None => execution.output.trim_end_matches('\n').to_string(),
        })
    }

    fn expression(&self, expression: &str) -> Result<String> {
        let execution = self
            .session()?
            .evaluate(expression.trim())
            .map_err(|e| code_error("{mp.py:...} expression", e))?;
        Ok(expression_text(execution))
    }

    fn named_tokens(&self, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in NAMED_TOKEN.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            out.push_str(&self.token(name.as_str().trim())?);
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn token(&self, name: &str) -> Result<String> {
        if let Some(code) = self.context.code(name) {
            debug!("Evaluating code token {}", name);
            return self.code_token(name, code);
        }
        match self.context.get(name) {
            Some(value) => Ok(value.to_string()),
            None => Err(Error::UnknownToken {
                name: name.to_string(),
            }),
        }
    }

    /// Multi-line bodies run as blocks; single lines are tried as an
    /// expression first and fall back to a block if they do not parse as one.
    fn code_token(&self, name: &str, code: &str) -> Result<String> {
        self.run_code_token(name, code)
            .map_err(|err| match err {
                Error::CodeExecution {
                    origin,
                    message,
                    token: None,
                } => Error::CodeExecution {
                    origin,
                    message,
                    token: Some(name.to_string()),
                },
                other => other,
            })
    }

    fn run_code_token(&self, name: &str, code: &str) -> Result<String> {
        let origin = format!("token \"{name}\"");
        if code.contains('\n') {
            return self.block(&origin, code);
        }
        let stripped = code.trim();
        if stripped.is_empty() {
            return Ok(String::new());
        }
        match self.session()?.evaluate(stripped) {
            Ok(execution) => Ok(expression_text(execution)),
            Err(ScriptError::Syntax(_)) => self.block(&origin, code),
            Err(e) => Err(code_error(&origin, e)),
        }
    }
}

fn expression_text(execution: Execution) -> String {
    match execution.result {
        Some(value) if !value.is_null() => value_text(&value),
        _ if !execution.output.is_empty() => execution.output.trim_end_matches('\n').to_string(),
        _ => String::new(),
    }
}

fn code_error(origin: &str, err: ScriptError) -> Error {
    Error::CodeExecution {
        origin: origin.to_string(),
        message: err.to_string(),
        token: None,
    }
}

/// Replaces every `opener ... }` span, matching braces to find the end.
/// An opener without a closing brace is left as written.
fn replace_code_forms<F>(text: &str, opener: &Regex, mut eval: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = opener.find(rest) {
        let body = &rest[open.end()..];
        let Some(close) = closing_brace(body) else {
            break;
        };
        out.push_str(&rest[..open.start()]);
        out.push_str(&eval(&body[..close])?);
        rest = &body[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, ch) in body.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(index),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Removes the indentation common to all non-blank lines.
pub(crate) fn dedent(code: &str) -> String {
    let indent = code
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    code.lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}
