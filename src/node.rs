//! The output tree produced by the tree builder.

use std::fmt::Write;

use crate::constants::{INVALID_NAME_CHARS, UNTITLED};

/// One file or folder of the output tree.
///
/// Folders never carry content; files never have children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub content: String,
    pub is_folder: bool,
    pub children: Vec<Node>,
    /// Project template this node was expanded from, if any.
    pub source_template: Option<String>,
}

impl Node {
    pub fn file<N: Into<String>, C: Into<String>>(name: N, content: C) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            is_folder: false,
            children: Vec::new(),
            source_template: None,
        }
    }

    pub fn folder<N: Into<String>>(name: N, children: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            content: String::new(),
            is_folder: true,
            children,
            source_template: None,
        }
    }

    /// Number of files (not folders) in this subtree.
    pub fn file_count(&self) -> usize {
        if !self.is_folder {
            return 1;
        }
        self.children.iter().map(Node::file_count).sum()
    }

    /// Marks this subtree as coming from `template`, keeping any attribution
    /// made by a more deeply nested template.
    pub(crate) fn attribute(&mut self, template: &str) {
        if self.source_template.is_none() {
            self.source_template = Some(template.to_string());
        }
        for child in &mut self.children {
            child.attribute(template);
        }
    }

    /// Indented text rendering of the tree, folders suffixed with `/`.
    ///
    /// ```
    /// use makeproject::node::Node;
    ///
    /// let root = Node::folder("Demo", vec![
    ///     Node::folder("src", vec![Node::file("main.rs", "")]),
    ///     Node::file("README.md", ""),
    /// ]);
    /// assert_eq!(root.render_tree(), "Demo/\n  src/\n    main.rs\n  README.md\n");
    /// ```
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let suffix = if self.is_folder { "/" } else { "" };
        let _ = writeln!(out, "{}{}{}", "  ".repeat(depth), self.name, suffix);
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}

/// Makes `name` safe to use as a file or folder name.
///
/// Filesystem-invalid characters become `_`, surrounding whitespace and
/// trailing dots are removed, and an empty result becomes `Untitled`.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if INVALID_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim().trim_end_matches('.').trim_end();
    match trimmed {
        "" | "." | ".." => UNTITLED.to_string(),
        name => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b:c?.md"), "a_b_c_.md");
        assert_eq!(sanitize_filename("  notes.  "), "notes");
        assert_eq!(sanitize_filename(".gitignore"), ".gitignore");
        assert_eq!(sanitize_filename(""), "Untitled");
        assert_eq!(sanitize_filename(".."), "Untitled");
        assert_eq!(sanitize_filename(" . "), "Untitled");
    }

    #[test]
    fn test_file_count() {
        let root = Node::folder(
            "root",
            vec![
                Node::file("a", ""),
                Node::folder("empty", vec![]),
                Node::folder("f", vec![Node::file("b", ""), Node::file("c", "")]),
            ],
        );
        assert_eq!(root.file_count(), 3);
        assert_eq!(Node::file("x", "").file_count(), 1);
    }

    #[test]
    fn test_attribute_keeps_inner_template() {
        let mut inner = Node::file("b", "");
        inner.source_template = Some("inner".to_string());
        let mut node = Node::folder("f", vec![Node::file("a", ""), inner]);
        node.attribute("outer");
        assert_eq!(node.source_template.as_deref(), Some("outer"));
        assert_eq!(node.children[0].source_template.as_deref(), Some("outer"));
        assert_eq!(node.children[1].source_template.as_deref(), Some("inner"));
    }
}
