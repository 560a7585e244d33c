//! Sub-command extraction from a parsed command line.
//!
//! Walks the syntax tree and collects every individually-executable command
//! string: pipeline segments, subshell and brace-group wrappers plus their
//! inner lists, and command-substitution bodies at any nesting depth.
//! Results keep first-seen order and are deduplicated.

use super::ast::Node;
use super::grammar;

/// Extract the individual commands from a (possibly compound) command line.
///
/// Empty input yields an empty list. When the grammar rejects the line, the
/// whole trimmed line is returned as a single command so the caller can
/// still evaluate it — a line that cannot be parsed must not slip through
/// unchecked.
pub fn extract_commands(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match grammar::parse(line) {
        Ok(tree) => {
            let mut walk = Walk {
                src: line,
                commands: Vec::new(),
            };
            if let Node::Script { body, .. } = &tree {
                walk.list(body);
            }
            walk.commands
        }
        Err(e) => {
            let head: String = trimmed.chars().take(100).collect();
            log::warn!("parse failed for command: {head} - {e}");
            vec![trimmed.to_string()]
        }
    }
}

struct Walk<'a> {
    src: &'a str,
    commands: Vec<String>,
}

impl Walk<'_> {
    fn add(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() && !self.commands.iter().any(|c| c == text) {
            self.commands.push(text.to_string());
        }
    }

    fn list(&mut self, node: &Node) {
        if let Node::List { pipelines, .. } = node {
            for pipeline in pipelines {
                if let Node::Pipeline { elements, .. } = pipeline {
                    for element in elements {
                        self.element(element);
                    }
                }
            }
        }
    }

    fn element(&mut self, node: &Node) {
        match node {
            Node::Subshell { span, body } | Node::BraceGroup { span, body } => {
                // Wrapper first, then the inner list, then its leaves.
                self.add(span.text(self.src));
                self.add(&strip_trailing_semi(body.text(self.src)));
                self.list(body);
            }
            Node::Command { span, parts } => {
                self.add(span.text(self.src));
                for part in parts {
                    self.substitutions(part);
                }
            }
            _ => {}
        }
    }

    /// Find command substitutions anywhere inside a simple-command part,
    /// including inside double-quoted words. The substitution's own `$(...)`
    /// form is already present in the enclosing command text, so only the
    /// inner list is emitted before recursing.
    fn substitutions(&mut self, node: &Node) {
        match node {
            Node::Substitution { body, .. } => {
                self.add(&strip_trailing_semi(body.text(self.src)));
                self.list(body);
            }
            Node::Word { parts, .. } => {
                for part in parts {
                    self.substitutions(part);
                }
            }
            _ => {}
        }
    }
}

fn strip_trailing_semi(text: &str) -> String {
    let text = text.trim();
    match text.strip_suffix(';') {
        Some(rest) => rest.trim_end().to_string(),
        None => text.to_string(),
    }
}
