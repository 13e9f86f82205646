//! Tree construction from parsed structure documents.
//!
//! Every item of a document is classified once into an [`Item`], tested in a
//! fixed priority order, and handed to the handler for that shape. Handlers
//! are pure functions of (item, context, include stack) that return nodes.

use log::{debug, warn};
use serde_yaml::{Mapping, Value};

use crate::constants::DEFAULT_PROJECT_NAME;
use crate::context::{formatted_name, TokenContext};
use crate::error::{Error, Result, TemplateKind};
use crate::library::TemplateLibrary;
use crate::node::{sanitize_filename, Node};
use crate::parser::{item_list, parse_document, value_text};
use crate::substitute::Substituter;

/// Document name that errors from inline `python` items are attributed to.
const PYTHON_BLOCK: &str = "python block";

/// The shapes an item of a structure document can take.
#[derive(Debug, PartialEq)]
enum Item<'v> {
    /// A bare scalar: a file without content.
    ImplicitFile(&'v Value),
    /// `project_template`: another document's items spliced in.
    Include {
        name: &'v Value,
        title: Option<&'v Value>,
        description: Option<&'v Value>,
    },
    /// `file_template`: a file named after, and filled from, a file template.
    FileTemplate(&'v Value),
    /// `file`, with inline `content` or a `template` reference.
    File {
        name: &'v Value,
        content: Option<&'v Value>,
        template: Option<&'v Value>,
    },
    /// `folder`, with optional `contents`.
    Folder {
        name: &'v Value,
        contents: Option<&'v Value>,
    },
    /// `python`: code producing further items.
    Script(&'v Value),
    /// Any other single-key mapping: `{name: [items]}`.
    Shorthand { key: &'v Value, value: &'v Value },
    /// Anything else; contributes nothing.
    Ignored,
}

impl<'v> Item<'v> {
    fn classify(value: &'v Value) -> Item<'v> {
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => Item::ImplicitFile(value),
            Value::Mapping(map) => Self::classify_mapping(map),
            _ => Item::Ignored,
        }
    }

    fn classify_mapping(map: &'v Mapping) -> Item<'v> {
        if let Some(name) = map.get("project_template") {
            return Item::Include {
                name,
                title: map.get("title"),
                description: map.get("description"),
            };
        }
        if let Some(name) = map.get("file_template") {
            return Item::FileTemplate(name);
        }
        if let Some(name) = map.get("file") {
            return Item::File {
                name,
                content: map.get("content"),
                template: map.get("template"),
            };
        }
        if let Some(name) = map.get("folder") {
            return Item::Folder {
                name,
                contents: map.get("contents"),
            };
        }
        if let Some(code) = map.get("python") {
            return Item::Script(code);
        }
        match map.iter().next() {
            Some((key, value)) if map.len() == 1 => Item::Shorthand { key, value },
            _ => Item::Ignored,
        }
    }
}

/// Text of a name-like value.
///
/// An unquoted `{mp:Title}` that slipped past preprocessing parses as the
/// mapping `{"mp:Title": null}`; it is turned back into its placeholder text.
fn token_text(value: &Value) -> String {
    if let Value::Mapping(map) = value {
        if map.len() == 1 {
            if let Some((key, Value::Null)) = map.iter().next() {
                return format!("{{{}}}", value_text(key));
            }
        }
    }
    value_text(value)
}

/// Builds node trees from parsed structure documents.
pub struct TreeBuilder<'a> {
    substituter: &'a Substituter,
    library: &'a dyn TemplateLibrary,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(substituter: &'a Substituter, library: &'a dyn TemplateLibrary) -> Self {
        Self {
            substituter,
            library,
        }
    }

    /// Builds the tree of a parsed document.
    ///
    /// The root is a folder named after the context's title (or `Project`).
    /// `include_stack` lists the project templates already being expanded;
    /// it is empty for a standalone document.
    ///
    /// Returns `Ok(None)` if the document has no item list.
    pub fn build(
        &self,
        data: &Value,
        context: &TokenContext,
        include_stack: &[String],
    ) -> Result<Option<Node>> {
        let Some(items) = item_list(data) else {
            return Ok(None);
        };
        let title = context.title().trim();
        let name = sanitize_filename(if title.is_empty() {
            DEFAULT_PROJECT_NAME
        } else {
            title
        });
        let children = self.collect(items, context, include_stack)?;
        Ok(Some(Node::folder(name, children)))
    }

    /// Parses `source` and builds its tree, attributing any failure to
    /// `document`.
    pub fn build_source(
        &self,
        document: &str,
        source: &str,
        context: &TokenContext,
        include_stack: &[String],
    ) -> Result<Option<Node>> {
        parse_document(source)
            .and_then(|data| self.build(&data, context, include_stack))
            .map_err(|e| e.decorate(document, source))
    }

    fn collect(
        &self,
        items: &[Value],
        context: &TokenContext,
        include_stack: &[String],
    ) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        for item in items {
            nodes.extend(self.item(item, context, include_stack)?);
        }
        Ok(nodes)
    }

    fn item(&self, item: &Value, context: &TokenContext, stack: &[String]) -> Result<Vec<Node>> {
        match Item::classify(item) {
            Item::ImplicitFile(name) => {
                let name = self.name(name, context)?;
                debug!("File: {}", name);
                Ok(vec![Node::file(name, "")])
            }
            Item::Include {
                name,
                title,
                description,
            } => self.include(name, title, description, context, stack),
            Item::FileTemplate(name) => self.file_template(name, context),
            Item::File {
                name,
                content,
                template,
            } => self.file(name, content, template, context),
            Item::Folder { name, contents } => {
                let name = self.name(name, context)?;
                debug!("Folder: {}", name);
                let children = match contents {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Sequence(items)) => self.collect(items, context, stack)?,
                    Some(_) => {
                        warn!("Ignoring contents of folder \"{}\": not a list", name);
                        Vec::new()
                    }
                };
                Ok(vec![Node::folder(name, children)])
            }
            Item::Script(code) => self.script(&token_text(code), context, stack),
            Item::Shorthand { key, value } => {
                let key = token_text(key);
                let name = self.substituter.substitute(&key, context)?;
                match value {
                    Value::Sequence(items) => {
                        let name = sanitize_filename(&name);
                        debug!("Folder: {}", name);
                        let children = self.collect(items, context, stack)?;
                        Ok(vec![Node::folder(name, children)])
                    }
                    _ => Err(Error::MalformedShorthand { key }),
                }
            }
            Item::Ignored => {
                if !item.is_null() {
                    warn!("Ignoring unrecognized item: {}", value_text(item));
                }
                Ok(Vec::new())
            }
        }
    }

    fn name(&self, value: &Value, context: &TokenContext) -> Result<String> {
        let text = self.substituter.substitute(&token_text(value), context)?;
        Ok(sanitize_filename(&text))
    }

    fn template_name(&self, value: &Value, context: &TokenContext) -> Result<String> {
        let text = self.substituter.substitute(&token_text(value), context)?;
        Ok(text.trim().to_string())
    }

    fn include(
        &self,
        name: &Value,
        title: Option<&Value>,
        description: Option<&Value>,
        context: &TokenContext,
        stack: &[String],
    ) -> Result<Vec<Node>> {
        let name = self.template_name(name, context)?;
        if name.is_empty() {
            return Ok(Vec::new());
        }
        if stack.contains(&name) {
            let mut chain = stack.to_vec();
            chain.push(name);
            return Err(Error::CyclicInclude { chain });
        }
        let source = self
            .library
            .project_template(&name)
            .ok_or_else(|| Error::MissingTemplate {
                kind: TemplateKind::Project,
                name: name.clone(),
            })?;

        let mut overrides = Vec::new();
        if let Some(title) = title.filter(|v| !v.is_null()) {
            let title = self.substituter.substitute(&token_text(title), context)?;
            overrides.push(("formatted_name", formatted_name(&title)));
            overrides.push(("title", title));
        }
        if let Some(description) = description.filter(|v| !v.is_null()) {
            let description = self.substituter.substitute(&token_text(description), context)?;
            overrides.push(("description", description));
        }
        let child_context = context.with_overrides(overrides);

        let mut child_stack = stack.to_vec();
        child_stack.push(name.clone());
        debug!("Including project template {}", child_stack.join(" -> "));

        let mut nodes = self
            .expand(&name, &source, &child_context, &child_stack)
            .map_err(|e| e.decorate(&name, &source))?;
        for node in &mut nodes {
            node.attribute(&name);
        }
        Ok(nodes)
    }

    fn expand(
        &self,
        name: &str,
        source: &str,
        context: &TokenContext,
        stack: &[String],
    ) -> Result<Vec<Node>> {
        let data = parse_document(source)?;
        let items = item_list(&data).ok_or_else(|| Error::InvalidItems {
            origin: format!("project template \"{name}\""),
            message: "the document has no item list".to_string(),
        })?;
        self.collect(items, context, stack)
    }

    fn file_template(&self, name: &Value, context: &TokenContext) -> Result<Vec<Node>> {
        let template = self.template_name(name, context)?;
        let filename = sanitize_filename(&template);
        debug!("File from template: {}", filename);
        let content = self.template_content(&template, &context.for_file(&filename))?;
        Ok(vec![Node::file(filename, content)])
    }

    fn file(
        &self,
        name: &Value,
        content: Option<&Value>,
        template: Option<&Value>,
        context: &TokenContext,
    ) -> Result<Vec<Node>> {
        let filename = self.name(name, context)?;
        debug!("File: {}", filename);
        let file_context = context.for_file(&filename);
        let content = match (content, template) {
            (Some(content), _) => self
                .substituter
                .substitute(&token_text(content), &file_context)?,
            (None, Some(template)) => {
                let template = self.template_name(template, context)?;
                self.template_content(&template, &file_context)?
            }
            (None, None) => String::new(),
        };
        Ok(vec![Node::file(filename, content)])
    }

    fn template_content(&self, template: &str, file_context: &TokenContext) -> Result<String> {
        let source = self
            .library
            .file_template(template)
            .ok_or_else(|| Error::MissingTemplate {
                kind: TemplateKind::File,
                name: template.to_string(),
            })?;
        self.substituter
            .substitute(&source, file_context)
            .map_err(|e| e.decorate(template, &source))
    }

    fn script(&self, code: &str, context: &TokenContext, stack: &[String]) -> Result<Vec<Node>> {
        let execution = self.substituter.run_block(code, context, PYTHON_BLOCK)?;
        let invalid = |message: String| Error::InvalidItems {
            origin: PYTHON_BLOCK.to_string(),
            message,
        };

        let items = match execution.result {
            Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(items)) => items,
            Some(_) => return Err(invalid("\"result\" must be a list".to_string())),
            None => {
                let output = execution.output.trim();
                if output.is_empty() {
                    Vec::new()
                } else {
                    let data = parse_document(output)
                        .map_err(|e| invalid(format!("output is not valid YAML: {e}")))?;
                    item_list(&data)
                        .cloned()
                        .ok_or_else(|| invalid("output must be a list".to_string()))?
                }
            }
        };
        debug!("Python block produced {} items", items.len());
        self.collect(&items, context, stack)
            .map_err(|e| e.decorate(PYTHON_BLOCK, code))
    }
}
