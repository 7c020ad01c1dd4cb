use std::cell::RefCell;
use std::rc::Rc;

use lispy::environment::Environment;
use lispy::evaluator::{evaluate, is_truthy, special_form_identifiers};
use lispy::lexer::{TokenKind, tokenize};
use lispy::parser::parse_str;
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};

struct LispyCompleter {
    env: Rc<RefCell<Environment>>,
}

impl LispyCompleter {
    fn new(env: Rc<RefCell<Environment>>) -> Self {
        LispyCompleter { env }
    }
}

impl rustyline::completion::Completer for LispyCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok((
            pos,
            match tokenize(&line[..pos]) {
                Ok(tokens) => {
                    if let Some(TokenKind::Atom(prefix)) = tokens.last().map(|t| t.kind.clone()) {
                        // Candidates come from the live environment, so
                        // definitions made this session complete too.
                        self.env
                            .borrow()
                            .get_identifiers()
                            .union(&special_form_identifiers())
                            .filter_map(|id| {
                                if id.starts_with(&prefix) {
                                    Some(id[prefix.len()..].to_string())
                                } else {
                                    None
                                }
                            })
                            .collect()
                    } else {
                        vec![]
                    }
                }
                Err(_) => vec![],
            },
        ))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct LispyHelper {
    #[rustyline(Validator)]
    validator: LispyValidator,
    #[rustyline(Highlighter)]
    highlighter: LispyHighlighter,
    #[rustyline(Completer)]
    completer: LispyCompleter,
}

struct LispyValidator;

impl Validator for LispyValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut depth: usize = 0;
        for c in ctx.input().chars() {
            match c {
                '(' => depth += 1,
                ')' => {
                    if depth == 0 {
                        // A stray ')' is submitted as-is; the parser reports
                        // it with a span instead of the line editor.
                        return Ok(ValidationResult::Valid(None));
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        if depth > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

struct LispyHighlighter;

impl Highlighter for LispyHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> std::borrow::Cow<'l, str> {
        let mut stack: Vec<usize> = Vec::new();
        let mut highlighted = String::new();
        let cursor = pos.checked_sub(1);

        for (i, c) in line.chars().enumerate() {
            match c {
                '(' => {
                    stack.push(highlighted.len());
                    highlighted.push(c);
                }
                ')' => {
                    if let Some(matching_pos) = stack.pop() {
                        if Some(matching_pos) == cursor || Some(i) == cursor {
                            highlighted.push_str(&format!("\x1b[1;34m{}\x1b[0m", c)); // Blue for the matching pair
                            highlighted
                                .replace_range(matching_pos..=matching_pos, "\x1b[1;34m(\x1b[0m");
                        } else {
                            highlighted.push(c);
                        }
                    } else {
                        highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)); // Red for unmatched closing parens
                    }
                }
                _ => {
                    highlighted.push(c);
                }
            }
        }

        // Parens still open at the end of the line show red too. Reverse
        // order keeps the recorded byte positions valid while inserting.
        for matching_pos in stack.into_iter().rev() {
            highlighted.replace_range(matching_pos..=matching_pos, "\x1b[31m(\x1b[0m");
        }

        std::borrow::Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn main() -> rustyline::Result<()> {
    println!("Lispy REPL v0.1.0");
    println!("Type 'exit' or press Ctrl-D to quit.");

    let global_env = Environment::new_global_populated();
    let h = LispyHelper {
        validator: LispyValidator,
        highlighter: LispyHighlighter,
        completer: LispyCompleter::new(global_env.clone()),
    };
    let config = rustyline::config::Config::builder()
        .edit_mode(rustyline::EditMode::Vi)
        .build();
    let mut rl: Editor<LispyHelper, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history("lispy_history.txt").is_err() {
        println!("No previous history.");
    }

    loop {
        let readline = rl.readline("lispy > ");
        match readline {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let trimmed_input = line.trim();
                if trimmed_input.is_empty() {
                    continue;
                }
                if trimmed_input.eq_ignore_ascii_case("exit") {
                    break;
                }

                match parse_str(trimmed_input) {
                    Ok(node) => {
                        match evaluate(node, global_env.clone()) {
                            Ok(result_node) => {
                                // Falsy results (the empty list from define
                                // and set!, zeros) are not echoed.
                                if is_truthy(&result_node) {
                                    println!("{}", result_node);
                                }
                            }
                            Err(e) => {
                                // Every evaluation error is recoverable; the
                                // loop keeps the environment and continues.
                                e.pretty_print(trimmed_input);
                            }
                        }
                    }
                    Err(parse_err) => {
                        parse_err.pretty_print(trimmed_input);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history("lispy_history.txt")
}
