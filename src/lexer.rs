use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")] // Skip whitespace
#[logos(error = LexerErrorKind)]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    // Parens delimit atoms even without whitespace: "foo(bar" is three tokens.
    #[regex(r"[^ \t\n\r()]+", |lex| lex.slice().to_string())]
    Atom(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

// Implement Display for easy printing
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Atom(s) => write!(f, "{}", s),
        }
    }
}

// Every byte is whitespace, a paren, or an atom character, so no input
// fails to lex; the kind exists to satisfy logos and to keep the parser
// boundary uniform.
#[derive(Default, Debug, Clone, PartialEq, Error)]
pub enum LexerErrorKind {
    #[default]
    #[error("Invalid Token")]
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct LexerError {
    pub error: LexerErrorKind,
    pub span: Span,
}

// Result type alias for convenience
type LexerRangedResult<T> = Result<T, LexerError>;

// Helper function to tokenize a string directly (useful for tests and parser)
pub fn tokenize(input: &str) -> LexerRangedResult<Vec<Token>> {
    TokenKind::lexer(input)
        .spanned() // Yields (Result<TokenKind, LexerErrorKind>, Range<usize>)
        .map(|(result, range)| match result {
            Ok(kind) => Ok(Token {
                kind,
                span: Span {
                    start: range.start,
                    end: range.end,
                },
            }),
            Err(error) => Err(LexerError {
                error,
                span: Span {
                    start: range.start,
                    end: range.end,
                },
            }),
        })
        .collect()
}
