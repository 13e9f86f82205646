//! Normalization of raw structure documents before YAML parsing.
//!
//! Structure documents are hand written, so two things regularly trip up a
//! YAML parser: tab indentation, and names that start with a placeholder such
//! as `- {mp:Title}:`, which YAML reads as the start of a flow mapping. Both
//! are fixed here textually. Lines inside block scalars (`content: |`) are
//! never touched.

use regex::Regex;
use std::sync::LazyLock;

/// Indentation unit that replaces every tab character.
const TAB_REPLACEMENT: &str = "  ";

/// A line whose value part begins with an unquoted `{mp` placeholder.
static PLACEHOLDER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<lead>\s*(?:-\s+)*(?:[A-Za-z_][\w\-]*:\s+)?)(?P<body>\{[mM][pP][.:].*?)\s*$")
        .expect("placeholder line pattern is valid")
});

/// A line that opens a block scalar (`key: |`, `- >-`, ...).
static BLOCK_SCALAR_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[:\-]\s+|^\s*)[|>][+\-]?[0-9]?\s*(?:#.*)?$")
        .expect("block scalar pattern is valid")
});

/// Prepares `text` for the structured-data parser.
///
/// Tabs become two spaces, and shorthand names that start with a placeholder
/// are wrapped in single quotes. Every other byte is left as it was.
pub fn preprocess(text: &str) -> String {
    let text = text.replace('\t', TAB_REPLACEMENT);
    let mut block_indent: Option<usize> = None;
    let mut lines = Vec::new();

    for line in text.split('\n') {
        let indent = line.len() - line.trim_start().len();
        if let Some(parent) = block_indent {
            if line.trim().is_empty() || indent > parent {
                lines.push(line.to_string());
                continue;
            }
            block_indent = None;
        }

        if BLOCK_SCALAR_START.is_match(line) {
            block_indent = Some(indent);
            lines.push(line.to_string());
            continue;
        }

        lines.push(quote_placeholder_line(line));
    }

    lines.join("\n")
}

fn quote_placeholder_line(line: &str) -> String {
    let Some(caps) = PLACEHOLDER_LINE.captures(line) else {
        return line.to_string();
    };
    let lead = &caps["lead"];
    let body = &caps["body"];
    let (body, comment) = match comment_start(body) {
        Some(start) => {
            let value = body[..start].trim_end();
            (value, &body[value.len()..])
        }
        None => (body, ""),
    };

    match key_end(body) {
        Some(end) => {
            let (key, rest) = body.split_at(end);
            format!("{lead}{}{rest}{comment}", quote(key))
        }
        None => format!("{lead}{}{comment}", quote(body)),
    }
}

/// Position of a trailing ` #` comment, outside any braces.
fn comment_start(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut previous = None;
    for (index, ch) in body.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '#' if depth == 0 && previous.is_some_and(char::is_whitespace) => {
                return Some(index)
            }
            _ => {}
        }
        previous = Some(ch);
    }
    None
}

/// Position of the `:` that ends a mapping key, outside any braces.
fn key_end(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut chars = body.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => match chars.peek() {
                None => return Some(index),
                Some((_, next)) if next.is_whitespace() => return Some(index),
                _ => {}
            },
            _ => {}
        }
    }
    None
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
