use crate::Span;
use crate::lexer::{LexerError, Token, TokenKind};
use crate::types::{Node, Sexpr};
use std::iter::Peekable;
use std::vec::IntoIter; // To iterate over Vec<Token>
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(
        "Parse Error [at {}]: Unexpected token '{}', expected {}",
        .found.span,
        .found.kind,
        .expected
    )]
    UnexpectedToken { found: Token, expected: String },
    #[error("Parse Error: Unexpected end of input during parsing. Expected {0}")]
    UnexpectedEof(String),
    #[error("Parse Error [at {0}]: Unexpected ')' where an expression was expected")]
    UnexpectedCloseParen(Span),
    #[error("Parse Error [at {0}]: Unbalanced parentheses, this list never gets its ')'")]
    UnbalancedParens(Span),
    // Propagate lexer errors when parsing directly from a string
    #[error("Lexer Error during parse: {0}")]
    LexerError(#[from] LexerError),
}

// Result type alias for convenience
type ParseResult<T> = Result<T, ParseError>;

/// Classifies one atom token. The order of the parse attempts is
/// load-bearing: "10" must come out as `Integer(10)`, not `Float(10.0)`,
/// and anything that is neither number form is a symbol verbatim.
pub fn atom(token: &str) -> Sexpr {
    if let Ok(n) = token.parse::<i64>() {
        Sexpr::Integer(n)
    } else if let Ok(n) = token.parse::<f64>() {
        Sexpr::Float(n)
    } else {
        Sexpr::Symbol(token.to_string())
    }
}

pub struct Parser {
    // We iterate over owned Tokens, consuming them.
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter().peekable(),
        }
    }

    // Consumes the next token if available.
    fn next_token(&mut self) -> Option<Token> {
        self.tokens.next()
    }

    // Peeks at the next token without consuming.
    fn peek_token(&mut self) -> Option<&Token> {
        self.tokens.peek()
    }

    /// Parses a single S-expression from the token stream.
    pub fn parse_expr(&mut self) -> ParseResult<Node> {
        match self.next_token() {
            Some(Token {
                kind: TokenKind::LParen,
                span,
            }) => self.parse_list(span),
            Some(Token {
                kind: TokenKind::RParen,
                span,
            }) => Err(ParseError::UnexpectedCloseParen(span)),
            Some(Token {
                kind: TokenKind::Atom(text),
                span,
            }) => Ok(Node::new(atom(&text), span)),
            None => Err(ParseError::UnexpectedEof("an expression".to_string())),
        }
    }

    /// Parses the elements of a list whose `(` (at `open_span`) has already
    /// been consumed. Peeks before every element so that running out of
    /// tokens mid-list is an unbalanced-parens failure, never a partially
    /// built list.
    fn parse_list(&mut self, open_span: Span) -> ParseResult<Node> {
        let mut elements = Vec::new();
        loop {
            match self.peek_token() {
                Some(Token {
                    kind: TokenKind::RParen,
                    span,
                }) => {
                    let span = open_span.merge(*span);
                    self.next_token(); // Throw away the closing paren
                    return Ok(Node::new_list(elements, span));
                }
                Some(_) => elements.push(self.parse_expr()?),
                None => return Err(ParseError::UnbalancedParens(open_span)),
            }
        }
    }

    /// Parses the token sequence as exactly one top-level expression.
    /// Anything left over after it is an error rather than silently
    /// ignored input.
    pub fn parse(mut self) -> ParseResult<Node> {
        let expr = self.parse_expr()?;

        if let Some(found) = self.next_token() {
            Err(ParseError::UnexpectedToken {
                found,
                expected: "end of input".to_string(),
            })
        } else {
            Ok(expr)
        }
    }
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> ParseResult<Node> {
    let tokens = crate::lexer::tokenize(input)?;
    Parser::new(tokens).parse()
}
