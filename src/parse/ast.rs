//! Syntax tree produced by the grammar engine.
//!
//! Nodes carry byte spans into the original source rather than owned text;
//! the extractor recovers text by slicing. Each variant holds only the
//! children that matter for command extraction — operator tokens, quotes,
//! and redirect targets are consumed during parsing but not retained.

/// Half-open byte range into the parsed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The source text this span covers.
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }
}

/// A node in the parsed command-line tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// The whole command line: surrounding spacing plus one list.
    Script { span: Span, body: Box<Node> },
    /// Pipelines joined by `&&`, `||`, `;`, or `&`, with an optional
    /// trailing `&` or `;`.
    List { span: Span, pipelines: Vec<Node> },
    /// Elements joined by `|`.
    Pipeline { span: Span, elements: Vec<Node> },
    /// `( list )`
    Subshell { span: Span, body: Box<Node> },
    /// `{ list }`
    BraceGroup { span: Span, body: Box<Node> },
    /// A simple command: words, redirections, and substitutions.
    Command { span: Span, parts: Vec<Node> },
    /// `$(list)` or `` `list` ``; the span covers the delimiters.
    Substitution { span: Span, body: Box<Node> },
    /// A redirection operator plus its target (or heredoc body).
    Redirect { span: Span },
    /// One shell word. Double-quoted and unquoted words keep any nested
    /// substitution and variable-reference children; quoting styles that
    /// suppress expansion have no children.
    Word { span: Span, parts: Vec<Node> },
    /// `$name`, `${name...}`, or a special parameter.
    VarRef { span: Span },
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Script { span, .. }
            | Node::List { span, .. }
            | Node::Pipeline { span, .. }
            | Node::Subshell { span, .. }
            | Node::BraceGroup { span, .. }
            | Node::Command { span, .. }
            | Node::Substitution { span, .. }
            | Node::Redirect { span }
            | Node::Word { span, .. }
            | Node::VarRef { span } => *span,
        }
    }

    /// The source text this node matched.
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        self.span().text(src)
    }
}
