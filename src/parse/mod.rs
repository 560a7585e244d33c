pub mod ast;
pub mod extract;
pub mod grammar;

pub use ast::{Node, Span};
pub use extract::extract_commands;
pub use grammar::{ParseError, parse};
