//! Embedded code evaluation for tokens and `python` items.
//!
//! The substitution engine only relies on the [`ScriptEngine`] contract:
//! expression evaluation, statement execution with captured output, and a
//! `result` binding. The bundled [`MiniJinjaEngine`] fulfils it with Jinja:
//! expressions are Jinja expressions, and a code block is a Jinja template
//! whose rendered text is its output and whose top-level
//! `{% set result = ... %}` is its result.

use cruet::Inflector;
use minijinja::{context, Environment, ErrorKind};
use serde_yaml::Value;
use thiserror::Error;

use crate::context::TokenContext;

/// Template name the preamble is registered under.
const PREAMBLE_TEMPLATE: &str = "__preamble__";

/// Name of the binding code uses to hand back a value.
pub const RESULT_BINDING: &str = "result";

/// Failure raised by embedded code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The code does not parse.
    #[error("{0}")]
    Syntax(String),
    /// The code parsed but failed while running.
    #[error("{0}")]
    Runtime(String),
}

impl From<minijinja::Error> for ScriptError {
    fn from(err: minijinja::Error) -> Self {
        if err.kind() == ErrorKind::SyntaxError {
            ScriptError::Syntax(err.to_string())
        } else {
            ScriptError::Runtime(err.to_string())
        }
    }
}

/// What running a piece of code produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Execution {
    /// Value bound to `result` (or the expression value), if any.
    pub result: Option<Value>,
    /// Captured output.
    pub output: String,
}

/// Entry point of a scripting backend.
pub trait ScriptEngine {
    /// Opens a session bound to `context`. The preamble, when given, runs once
    /// here and whatever it defines is visible to every later call.
    fn session(
        &self,
        context: &TokenContext,
        preamble: Option<&str>,
    ) -> Result<Box<dyn ScriptSession>, ScriptError>;
}

/// Shared execution environment for one substitution pass.
pub trait ScriptSession {
    /// Evaluates a single expression.
    fn evaluate(&self, expression: &str) -> Result<Execution, ScriptError>;

    /// Runs a block of statements.
    fn execute(&self, code: &str) -> Result<Execution, ScriptError>;
}

/// MiniJinja-based scripting engine.
pub struct MiniJinjaEngine {
    /// MiniJinja environment instance
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    /// Creates a new engine with the case-conversion filters registered.
    ///
    /// Block tags swallow their own line, so a loop printing one line per
    /// pass yields exactly those lines.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_filter("snake_case", |value: String| value.to_snake_case());
        env.add_filter("kebab_case", |value: String| value.to_kebab_case());
        env.add_filter("camel_case", |value: String| value.to_camel_case());
        env.add_filter("pascal_case", |value: String| value.to_pascal_case());
        env.add_filter("title_case", |value: String| value.to_title_case());
        env.add_filter("screaming_snake_case", |value: String| {
            value.to_screaming_snake_case()
        });
        Self { env }
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        MiniJinjaEngine::new()
    }
}

impl ScriptEngine for MiniJinjaEngine {
    fn session(
        &self,
        token_context: &TokenContext,
        preamble: Option<&str>,
    ) -> Result<Box<dyn ScriptSession>, ScriptError> {
        let mut env = self.env.clone();
        let bindings = context! {
            context => minijinja::Value::from_serialize(token_context.values()),
        };

        let mut header = String::new();
        if let Some(preamble) = preamble.filter(|p| !p.trim().is_empty()) {
            env.add_template_owned(PREAMBLE_TEMPLATE, preamble.to_string())?;
            let exports: Vec<String> = {
                let tmpl = env.get_template(PREAMBLE_TEMPLATE)?;
                let state = tmpl.eval_to_state(&bindings)?;
                state
                    .exports()
                    .into_iter()
                    .filter(|name| *name != RESULT_BINDING)
                    .map(String::from)
                    .collect()
            };
            if !exports.is_empty() {
                header = format!(
                    "{{% from \"{}\" import {} %}}",
                    PREAMBLE_TEMPLATE,
                    exports.join(", ")
                );
            }
        }

        Ok(Box::new(MiniJinjaSession {
            env,
            bindings,
            header,
        }))
    }
}

struct MiniJinjaSession {
    env: Environment<'static>,
    bindings: minijinja::Value,
    /// Imports of the preamble's definitions, prepended to every snippet.
    header: String,
}

impl MiniJinjaSession {
    fn run(&self, source: &str) -> Result<Execution, ScriptError> {
        let source = format!("{}{}", self.header, source);
        let tmpl = self.env.template_from_str(&source)?;
        let (output, state) = tmpl.render_and_return_state(&self.bindings)?;
        let result = match state.lookup(RESULT_BINDING) {
            Some(value) => Some(
                serde_yaml::to_value(&value).map_err(|e| ScriptError::Runtime(e.to_string()))?,
            ),
            None => None,
        };
        Ok(Execution { result, output })
    }
}

impl ScriptSession for MiniJinjaSession {
    fn evaluate(&self, expression: &str) -> Result<Execution, ScriptError> {
        self.run(&format!(
            "{{% set {} = ({}) %}}",
            RESULT_BINDING,
            expression.trim()
        ))
    }

    fn execute(&self, code: &str) -> Result<Execution, ScriptError> {
        self.run(code)
    }
}
