use crate::{EnvError, EvalError, ParseError};
use ariadne::{Label, Report, ReportKind, Source};

impl EvalError {
    pub fn pretty_print(&self, input: &str) {
        let report = match self {
            EvalError::EnvError(env_error) => match env_error {
                EnvError::UnboundVariable(symbol, span) => {
                    Report::build(ReportKind::Error, ("REPL", span.to_range()))
                        .with_message(format!("Unbound symbol `{}`", symbol))
                        .with_label(
                            Label::new(("REPL", span.to_range()))
                                .with_message("This symbol is not defined in the current scope"),
                        )
                }
            },
            EvalError::NotAProcedure(sexpr, span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message(format!("Not a procedure: {}", sexpr))
                    .with_label(
                        Label::new(("REPL", span.to_range()))
                            .with_message("This expression cannot be called as a procedure"),
                    )
            }
            EvalError::ArityMismatch {
                name,
                expected,
                found,
                span,
            } => Report::build(ReportKind::Error, ("REPL", span.to_range()))
                .with_message(format!("Wrong number of arguments for '{}'", name))
                .with_label(Label::new(("REPL", span.to_range())).with_message(format!(
                    "Expected {} arguments, got {}",
                    expected, found
                ))),
            EvalError::TypeMismatch {
                expected,
                found,
                span,
            } => Report::build(ReportKind::Error, ("REPL", span.to_range()))
                .with_message("Type mismatch")
                .with_label(Label::new(("REPL", span.to_range())).with_message(format!(
                    "Expected {}, found {}",
                    expected,
                    found.type_name()
                ))),
            EvalError::InvalidArguments(message, span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message("Invalid arguments:")
                    .with_label(Label::new(("REPL", span.to_range())).with_message(message))
            }
            EvalError::NotASymbol(sexpr, span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message(format!("Not a symbol: {}", sexpr))
                    .with_label(Label::new(("REPL", span.to_range())).with_message(format!(
                        "Expected a symbol but found a {}",
                        sexpr.type_name()
                    )))
            }
            EvalError::InvalidSpecialForm(message, span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message(format!("Invalid special form: {}", message))
                    .with_label(
                        Label::new(("REPL", span.to_range()))
                            .with_message("This special form is malformed or incomplete"),
                    )
            }
        };
        report
            .finish()
            .print(("REPL", Source::from(input)))
            .unwrap();
    }
}

impl ParseError {
    pub fn pretty_print(&self, input: &str) {
        let report = match self {
            ParseError::UnexpectedToken { found, expected } => {
                Report::build(ReportKind::Error, ("REPL", found.span.to_range()))
                    .with_message(format!("Unexpected token: {}", found.kind))
                    .with_label(
                        Label::new(("REPL", found.span.to_range()))
                            .with_message(format!("Expected {expected}")),
                    )
            }
            ParseError::UnexpectedEof(expected) => {
                let idx = input.len();
                Report::build(ReportKind::Error, ("REPL", idx..idx))
                    .with_message("Unexpected end of input")
                    .with_label(
                        Label::new(("REPL", idx..idx))
                            .with_message(format!("Expected {expected}")),
                    )
            }
            ParseError::UnexpectedCloseParen(span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message("Unexpected `)`")
                    .with_label(
                        Label::new(("REPL", span.to_range()))
                            .with_message("An expression was expected here, not a closing paren"),
                    )
            }
            ParseError::UnbalancedParens(span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message("Unbalanced parentheses")
                    .with_label(
                        Label::new(("REPL", span.to_range()))
                            .with_message("The list opened here is never closed"),
                    )
            }
            ParseError::LexerError(lex_err) => {
                Report::build(ReportKind::Error, ("REPL", lex_err.span.to_range()))
                    .with_message("Lexer Error")
                    .with_label(
                        Label::new(("REPL", lex_err.span.to_range()))
                            .with_message(lex_err.error.to_string()),
                    )
            }
        };
        report
            .finish()
            .print(("REPL", Source::from(input)))
            .unwrap();
    }
}
