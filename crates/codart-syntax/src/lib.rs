//! Lossless Java syntax trees for source-to-source refactoring.
//!
//! [`parse_java`] produces a rowan tree that reproduces its input byte-for-byte, together with
//! the flat token sequence the tree was built from. Refactorings locate edit points in the tree
//! and address them by index into that token sequence.

pub mod ast;
mod lexer;
mod parser;
mod syntax_kind;

pub use ast::*;
pub use lexer::{lex, lex_with_errors, LexError, Lexer, Token};
pub use parser::{parse_java, JavaParseResult, SyntaxElement, SyntaxNode, SyntaxToken};
pub use syntax_kind::{JavaLanguage, SyntaxKind};

/// A byte range in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

impl TextRange {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    #[inline]
    pub fn len(self) -> u32 {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at {}..{}", .range.start, .range.end)]
pub struct ParseError {
    pub message: String,
    pub range: TextRange,
}

#[cfg(test)]
mod tests;
