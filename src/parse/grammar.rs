//! Memoized recursive-descent PEG parser for a single shell command line.
//!
//! The grammar covers the command-line subset the permission engine needs:
//! pipelines, `&&`/`||`/`;`/`&` lists, subshells, brace groups, command
//! substitutions, redirections, quoting, and variable references. Anything
//! outside that subset (arithmetic expansion, process substitution,
//! here-strings, multi-line scripts) fails the parse; callers fall back to
//! treating the whole line as one command.
//!
//! Every structural rule is memoized per (rule, offset). Failures track the
//! furthest offset reached and the tokens expected there, so the error
//! names the most specific point of divergence rather than the first.

use std::collections::HashMap;

use thiserror::Error;

use super::ast::{Node, Span};

/// Inputs longer than this fail immediately; the extractor's fallback path
/// handles them fail-closed.
const MAX_INPUT_LEN: usize = 100_000;

/// Structural recursion bound. Deeper nesting fails the parse.
const MAX_DEPTH: usize = 120;

const RESERVED_WORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "case", "esac", "for", "while", "until", "do", "done",
    "in", "function",
];

/// Parse failure at the furthest offset the parser reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at offset {offset}: expected one of {expected:?}")]
pub struct ParseError {
    /// Byte offset of the furthest failure.
    pub offset: usize,
    /// Tokens that would have allowed the parse to continue there.
    pub expected: Vec<&'static str>,
}

/// Parse a full command line. The entire input must be consumed.
pub fn parse(src: &str) -> Result<Node, ParseError> {
    if src.len() > MAX_INPUT_LEN {
        return Err(ParseError {
            offset: MAX_INPUT_LEN,
            expected: vec!["input within length limit"],
        });
    }
    let mut parser = Parser::new(src);
    match parser.command_line() {
        Some(node) if parser.pos == src.len() => Ok(node),
        _ => Err(parser.into_error()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Rule {
    List,
    Pipeline,
    Element,
    Command,
    Word,
    Redirect,
    Subst,
    VarRef,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    memo: HashMap<(Rule, usize), Option<(Node, usize)>>,
    failure_at: usize,
    expected: Vec<&'static str>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
            memo: HashMap::new(),
            failure_at: 0,
            expected: Vec::new(),
        }
    }

    fn into_error(self) -> ParseError {
        let mut expected = self.expected;
        if expected.is_empty() {
            expected.push("end of input");
        }
        ParseError {
            offset: self.failure_at,
            expected,
        }
    }

    // ── Primitives ──

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn at(&self, lit: &str) -> bool {
        self.rest().starts_with(lit)
    }

    fn lit(&mut self, lit: &'static str, expect: &'static str) -> bool {
        if self.at(lit) {
            self.pos += lit.len();
            true
        } else {
            self.fail(expect);
            false
        }
    }

    /// Horizontal whitespace only; a newline is a delimiter, not spacing.
    fn spacing(&mut self) {
        while let Some(' ' | '\t') = self.peek() {
            self.pos += 1;
        }
    }

    fn fail(&mut self, expect: &'static str) {
        if self.pos > self.failure_at {
            self.failure_at = self.pos;
            self.expected.clear();
        }
        if self.pos == self.failure_at && !self.expected.contains(&expect) {
            self.expected.push(expect);
        }
    }

    fn memoized(&mut self, rule: Rule, f: fn(&mut Self) -> Option<Node>) -> Option<Node> {
        let start = self.pos;
        if let Some(entry) = self.memo.get(&(rule, start)) {
            return match entry.clone() {
                Some((node, end)) => {
                    self.pos = end;
                    Some(node)
                }
                None => None,
            };
        }
        let result = f(self);
        let end = self.pos;
        self.memo
            .insert((rule, start), result.clone().map(|node| (node, end)));
        result
    }

    // ── Rules ──

    fn command_line(&mut self) -> Option<Node> {
        let start = self.pos;
        self.spacing();
        let body = self.list()?;
        self.spacing();
        Some(Node::Script {
            span: Span::new(start, self.pos),
            body: Box::new(body),
        })
    }

    fn list(&mut self) -> Option<Node> {
        if self.depth >= MAX_DEPTH {
            self.fail("nesting within depth limit");
            return None;
        }
        self.depth += 1;
        let result = self.memoized(Rule::List, Self::list_inner);
        self.depth -= 1;
        result
    }

    fn list_inner(&mut self) -> Option<Node> {
        let start = self.pos;
        let mut pipelines = vec![self.pipeline()?];
        loop {
            let mark = self.pos;
            if self.control_op() {
                if let Some(p) = self.pipeline() {
                    pipelines.push(p);
                    continue;
                }
            }
            self.pos = mark;
            break;
        }
        // Optional trailing `&` or `;`
        let mark = self.pos;
        if !self.trailing_background() {
            self.pos = mark;
            if !self.trailing_semicolon() {
                self.pos = mark;
            }
        }
        Some(Node::List {
            span: Span::new(start, self.pos),
            pipelines,
        })
    }

    fn control_op(&mut self) -> bool {
        self.spacing();
        let ok = if self.at("&&") {
            self.pos += 2;
            true
        } else if self.at("||") {
            self.pos += 2;
            true
        } else if self.at(";") {
            self.pos += 1;
            true
        } else if self.at("&") && !self.at("&&") {
            self.pos += 1;
            true
        } else {
            self.fail("control operator");
            false
        };
        if ok {
            self.spacing();
        }
        ok
    }

    fn trailing_background(&mut self) -> bool {
        self.spacing();
        if self.at("&") && !self.at("&&") {
            self.pos += 1;
            self.spacing();
            true
        } else {
            self.fail("'&'");
            false
        }
    }

    fn trailing_semicolon(&mut self) -> bool {
        self.spacing();
        if self.lit(";", "';'") {
            self.spacing();
            true
        } else {
            false
        }
    }

    fn pipeline(&mut self) -> Option<Node> {
        self.memoized(Rule::Pipeline, Self::pipeline_inner)
    }

    fn pipeline_inner(&mut self) -> Option<Node> {
        let start = self.pos;
        let mut elements = vec![self.element()?];
        loop {
            let mark = self.pos;
            if self.pipe_op() {
                if let Some(e) = self.element() {
                    elements.push(e);
                    continue;
                }
            }
            self.pos = mark;
            break;
        }
        Some(Node::Pipeline {
            span: Span::new(start, self.pos),
            elements,
        })
    }

    fn pipe_op(&mut self) -> bool {
        self.spacing();
        if self.at("|") && !self.at("||") {
            self.pos += 1;
            self.spacing();
            true
        } else {
            self.fail("'|'");
            false
        }
    }

    fn element(&mut self) -> Option<Node> {
        self.memoized(Rule::Element, Self::element_inner)
    }

    fn element_inner(&mut self) -> Option<Node> {
        if let Some(n) = self.group('(', ')') {
            return Some(n);
        }
        if let Some(n) = self.group('{', '}') {
            return Some(n);
        }
        self.simple_command()
    }

    /// Subshell `( list )` or brace group `{ list }`.
    fn group(&mut self, open: char, close: char) -> Option<Node> {
        let start = self.pos;
        let (open_expect, close_expect) = if open == '(' {
            ("'('", "')'")
        } else {
            ("'{'", "'}'")
        };
        if self.peek() != Some(open) {
            self.fail(open_expect);
            return None;
        }
        self.pos += 1;
        self.spacing();
        let Some(body) = self.list() else {
            self.pos = start;
            return None;
        };
        self.spacing();
        if self.peek() != Some(close) {
            self.fail(close_expect);
            self.pos = start;
            return None;
        }
        self.pos += 1;
        let span = Span::new(start, self.pos);
        let body = Box::new(body);
        Some(if open == '(' {
            Node::Subshell { span, body }
        } else {
            Node::BraceGroup { span, body }
        })
    }

    fn simple_command(&mut self) -> Option<Node> {
        self.memoized(Rule::Command, Self::simple_command_inner)
    }

    fn simple_command_inner(&mut self) -> Option<Node> {
        let start = self.pos;
        let mut parts = Vec::new();
        loop {
            if let Some(r) = self.redirection() {
                parts.push(r);
                continue;
            }
            if let Some(s) = self.substitution() {
                parts.push(s);
                continue;
            }
            if let Some(w) = self.command_word() {
                parts.push(w);
                continue;
            }
            break;
        }
        if parts.is_empty() {
            return None;
        }
        Some(Node::Command {
            span: Span::new(start, self.pos),
            parts,
        })
    }

    fn command_word(&mut self) -> Option<Node> {
        if self.reserved_ahead() {
            self.fail("command word");
            return None;
        }
        let word = self.word()?;
        self.spacing();
        Some(word)
    }

    fn reserved_ahead(&self) -> bool {
        let rest = self.rest();
        RESERVED_WORDS.iter().any(|kw| {
            rest.starts_with(kw)
                && !rest[kw.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        })
    }

    fn word(&mut self) -> Option<Node> {
        self.memoized(Rule::Word, Self::word_inner)
    }

    fn word_inner(&mut self) -> Option<Node> {
        if let Some(w) = self.single_quoted() {
            return Some(w);
        }
        if let Some(w) = self.double_quoted() {
            return Some(w);
        }
        if let Some(w) = self.dollar_quoted() {
            return Some(w);
        }
        self.unquoted_word()
    }

    fn single_quoted(&mut self) -> Option<Node> {
        let start = self.pos;
        if self.peek() != Some('\'') {
            self.fail("single-quoted string");
            return None;
        }
        self.pos += 1;
        while let Some(c) = self.peek() {
            if c == '\'' {
                break;
            }
            self.bump();
        }
        if self.peek() != Some('\'') {
            self.fail("closing single quote");
            self.pos = start;
            return None;
        }
        self.pos += 1;
        Some(Node::Word {
            span: Span::new(start, self.pos),
            parts: Vec::new(),
        })
    }

    fn double_quoted(&mut self) -> Option<Node> {
        let start = self.pos;
        if self.peek() != Some('"') {
            self.fail("double-quoted string");
            return None;
        }
        self.pos += 1;
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                None => {
                    self.fail("closing double quote");
                    self.pos = start;
                    return None;
                }
                Some('"') => break,
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('$') => {
                    if let Some(v) = self.var_ref() {
                        parts.push(v);
                    } else if let Some(s) = self.substitution() {
                        parts.push(s);
                    } else {
                        self.bump();
                    }
                }
                Some('`') => {
                    if let Some(s) = self.substitution() {
                        parts.push(s);
                    } else {
                        self.bump();
                    }
                }
                Some(_) => self.bump(),
            }
        }
        self.pos += 1;
        Some(Node::Word {
            span: Span::new(start, self.pos),
            parts,
        })
    }

    /// `$'...'` — escapes allowed, no expansions.
    fn dollar_quoted(&mut self) -> Option<Node> {
        let start = self.pos;
        if !self.at("$'") {
            self.fail("ansi-quoted string");
            return None;
        }
        self.pos += 2;
        loop {
            match self.peek() {
                None => {
                    self.fail("closing single quote");
                    self.pos = start;
                    return None;
                }
                Some('\'') => break,
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some(_) => self.bump(),
            }
        }
        self.pos += 1;
        Some(Node::Word {
            span: Span::new(start, self.pos),
            parts: Vec::new(),
        })
    }

    fn unquoted_word(&mut self) -> Option<Node> {
        let start = self.pos;
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                None => break,
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('$') => {
                    if let Some(v) = self.var_ref() {
                        parts.push(v);
                    } else {
                        // A bare `$` is an ordinary character.
                        self.bump();
                    }
                }
                Some(c) if is_delimiter(c) => break,
                Some(_) => self.bump(),
            }
        }
        if self.pos == start {
            self.fail("word");
            return None;
        }
        Some(Node::Word {
            span: Span::new(start, self.pos),
            parts,
        })
    }

    fn var_ref(&mut self) -> Option<Node> {
        self.memoized(Rule::VarRef, Self::var_ref_inner)
    }

    fn var_ref_inner(&mut self) -> Option<Node> {
        let start = self.pos;
        if self.peek() != Some('$') {
            self.fail("'$'");
            return None;
        }
        self.pos += 1;

        // ${name} with optional :modifier
        if self.at("{") {
            self.pos += 1;
            if !self.eat_ident() {
                self.fail("variable name");
                self.pos = start;
                return None;
            }
            if self.at(":") {
                self.pos += 1;
                if !matches!(self.peek(), Some('-' | '+' | '=' | '?')) {
                    self.fail("parameter modifier");
                    self.pos = start;
                    return None;
                }
                self.pos += 1;
                while let Some(c) = self.peek() {
                    if c == '}' {
                        break;
                    }
                    self.bump();
                }
            }
            if self.peek() != Some('}') {
                self.fail("'}'");
                self.pos = start;
                return None;
            }
            self.pos += 1;
            return Some(Node::VarRef {
                span: Span::new(start, self.pos),
            });
        }

        // $name
        if self.eat_ident() {
            return Some(Node::VarRef {
                span: Span::new(start, self.pos),
            });
        }

        // Special parameters: $? $$ $! $# $@ $* $0..$9 $-
        if let Some(c) = self.peek()
            && (c.is_ascii_digit() || "?$!#@*-".contains(c))
        {
            self.pos += 1;
            return Some(Node::VarRef {
                span: Span::new(start, self.pos),
            });
        }

        self.fail("variable reference");
        self.pos = start;
        None
    }

    /// Consume `[A-Za-z_][A-Za-z0-9_]*`; false if none present.
    fn eat_ident(&mut self) -> bool {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.pos += 1;
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                true
            }
            _ => false,
        }
    }

    fn substitution(&mut self) -> Option<Node> {
        self.memoized(Rule::Subst, Self::substitution_inner)
    }

    fn substitution_inner(&mut self) -> Option<Node> {
        let start = self.pos;
        if self.at("$(") {
            self.pos += 2;
            self.spacing();
            if let Some(body) = self.list() {
                self.spacing();
                if self.at(")") {
                    self.pos += 1;
                    let span = Span::new(start, self.pos);
                    self.spacing();
                    return Some(Node::Substitution {
                        span,
                        body: Box::new(body),
                    });
                }
                self.fail("')'");
            }
            self.pos = start;
            return None;
        }
        if self.at("`") {
            self.pos += 1;
            self.spacing();
            if let Some(body) = self.list() {
                self.spacing();
                if self.at("`") {
                    self.pos += 1;
                    let span = Span::new(start, self.pos);
                    self.spacing();
                    return Some(Node::Substitution {
                        span,
                        body: Box::new(body),
                    });
                }
                self.fail("closing backtick");
            }
            self.pos = start;
            return None;
        }
        self.fail("command substitution");
        None
    }

    fn redirection(&mut self) -> Option<Node> {
        self.memoized(Rule::Redirect, Self::redirection_inner)
    }

    fn redirection_inner(&mut self) -> Option<Node> {
        let start = self.pos;

        // Append: fd? ">>" target
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.lit(">>", "'>>'") {
            self.spacing();
            if self.redirect_target() {
                let span = Span::new(start, self.pos);
                self.spacing();
                return Some(Node::Redirect { span });
            }
        }

        // Output: fd? ">" (not ">>") target
        self.pos = start;
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.at(">") && !self.at(">>") {
            self.pos += 1;
            self.spacing();
            if self.redirect_target() {
                let span = Span::new(start, self.pos);
                self.spacing();
                return Some(Node::Redirect { span });
            }
        } else {
            self.fail("'>'");
        }

        // Heredoc: "<<" "-"? delimiter, then the rest of the line
        self.pos = start;
        if self.at("<<") {
            self.pos += 2;
            if self.at("-") {
                self.pos += 1;
            }
            self.spacing();
            if self.eat_heredoc_delimiter() {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                let span = Span::new(start, self.pos);
                self.spacing();
                return Some(Node::Redirect { span });
            }
            self.fail("heredoc delimiter");
        }

        // Input: "<" (not "<<") target
        self.pos = start;
        if self.at("<") && !self.at("<<") {
            self.pos += 1;
            self.spacing();
            if self.redirect_target() {
                let span = Span::new(start, self.pos);
                self.spacing();
                return Some(Node::Redirect { span });
            }
        } else {
            self.fail("'<'");
        }

        // Fd duplication: 2>&1, 1>&2, 0<&3
        self.pos = start;
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            if self.at(">&") || self.at("<&") {
                self.pos += 2;
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                    let span = Span::new(start, self.pos);
                    self.spacing();
                    return Some(Node::Redirect { span });
                }
                self.fail("file descriptor");
            }
        }

        self.pos = start;
        None
    }

    /// A heredoc delimiter: an identifier, bare or wrapped in single or
    /// double quotes (`<< EOF`, `<< 'EOF'`, `<< "EOF"`).
    fn eat_heredoc_delimiter(&mut self) -> bool {
        let start = self.pos;
        match self.peek() {
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                if self.eat_ident() && self.peek() == Some(q) {
                    self.pos += 1;
                    true
                } else {
                    self.pos = start;
                    false
                }
            }
            _ => self.eat_ident(),
        }
    }

    /// A redirect target: quoted string or an unquoted path token.
    fn redirect_target(&mut self) -> bool {
        let start = self.pos;
        match self.peek() {
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                while let Some(c) = self.peek() {
                    if c == q {
                        break;
                    }
                    if c == '\\' && q == '"' {
                        self.bump();
                    }
                    self.bump();
                }
                if self.peek() == Some(q) {
                    self.pos += 1;
                    true
                } else {
                    self.fail("closing quote");
                    self.pos = start;
                    false
                }
            }
            Some(c) if is_path_start(c) => {
                while let Some(c) = self.peek() {
                    if c == '\\' {
                        self.bump();
                        self.bump();
                    } else if is_path_char(c) {
                        self.bump();
                    } else {
                        break;
                    }
                }
                true
            }
            _ => {
                self.fail("file path");
                false
            }
        }
    }
}

fn is_delimiter(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\n' | '\r' | '|' | '&' | ';' | '<' | '>' | '(' | ')' | '{' | '}' | '"'
            | '\''
            | '`'
    )
}

fn is_path_start(c: char) -> bool {
    c == '/' || c == '~' || c == '.' || c == '_' || c.is_ascii_alphanumeric()
}

fn is_path_char(c: char) -> bool {
    is_path_start(c) || c == '-'
}
