use crate::environment::{EnvError, Environment};
use crate::source::Span;
use crate::types::{Node, Procedure, Sexpr};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    // Errors from environment lookup
    #[error("{0}")]
    EnvError(#[from] EnvError),
    // Tried to call something that isn't a procedure
    #[error("Evaluation Error: Expected a procedure, but got: {0}")]
    NotAProcedure(Sexpr, Span),
    // Wrong number of arguments for a lambda or fixed-arity primitive
    #[error("Evaluation Error: '{name}' expects {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: String,
        found: usize,
        span: Span,
    },
    // A primitive received the wrong kind of value
    #[error("Evaluation Error: Expected {expected}, but got: {found}")]
    TypeMismatch {
        expected: &'static str,
        found: Sexpr,
        span: Span,
    },
    // Remaining argument errors (e.g. division by zero)
    #[error("Evaluation Error: Invalid arguments - {0}")]
    InvalidArguments(String, Span),
    // Expected a symbol (e.g., for define/set!)
    #[error("Evaluation Error: Expected a symbol, but got: {0}")]
    NotASymbol(Sexpr, Span),
    // Malformed special form (e.g., (if cond))
    #[error("Evaluation Error: Invalid special form - {0}")]
    InvalidSpecialForm(String, Span),
}

// Result type alias for convenience
pub type EvalResult<T = Node> = Result<T, EvalError>;

/// Truthiness for `if`, `not`, and the REPL's print decision. Zero of
/// either numeric kind and the empty list are false; everything else,
/// including every symbol and procedure, is true.
pub fn is_truthy(node: &Node) -> bool {
    match &node.kind {
        Sexpr::Integer(n) => *n != 0,
        Sexpr::Float(n) => *n != 0.0,
        Sexpr::List(elements) => !elements.is_empty(),
        _ => true,
    }
}

/// The keywords `evaluate` handles before falling through to generic
/// application. The REPL completer unions these with the environment's
/// identifiers.
pub fn special_form_identifiers() -> HashSet<String> {
    ["quote", "if", "define", "set!", "lambda"]
        .into_iter()
        .map(String::from)
        .collect()
}

// --- Evaluate Function ---

/// Evaluates a given AST Node within the specified environment.
///
/// Evaluation recurses on the host call stack, so expression depth and
/// non-tail user recursion are bounded by it; blowing the stack aborts
/// the process rather than returning an `EvalError`.
pub fn evaluate(node: Node, env: Rc<RefCell<Environment>>) -> EvalResult {
    match &node.kind {
        // 1. Self-evaluating atoms: numbers and procedure values
        Sexpr::Integer(_) | Sexpr::Float(_) | Sexpr::Procedure(_) => Ok(node),

        // 2. Symbols: Look up in the environment
        Sexpr::Symbol(name) => {
            // Use the symbol's span for error reporting if lookup fails
            Ok(env.borrow().get(name, node.span)?) // Propagate EnvError via From trait
        }

        // 3. Lists: Could be special forms or procedure calls
        Sexpr::List(elements) => {
            if let [first, rest @ ..] = &elements[..] {
                match &first.kind {
                    Sexpr::Symbol(sym_name) if sym_name == "quote" => {
                        evaluate_quote(rest, node.span)
                    }
                    Sexpr::Symbol(sym_name) if sym_name == "if" => {
                        evaluate_if(rest, env, node.span)
                    }
                    Sexpr::Symbol(sym_name) if sym_name == "define" => {
                        evaluate_define(rest, env, node.span)
                    }
                    Sexpr::Symbol(sym_name) if sym_name == "set!" => {
                        evaluate_set(rest, env, node.span)
                    }
                    Sexpr::Symbol(sym_name) if sym_name == "lambda" => {
                        evaluate_lambda(rest, env, node.span)
                    }
                    _ => evaluate_procedure(first, rest, env, node.span),
                }
            } else {
                // () in call position: there is nothing to call
                Err(EvalError::NotAProcedure(node.kind.clone(), node.span))
            }
        }
    }
}

fn evaluate_procedure(
    operator: &Node,
    operands: &[Node],
    env: Rc<RefCell<Environment>>,
    span: Span,
) -> EvalResult {
    // 1. Evaluate the operator expression. Failures propagate untouched so
    //    an unbound operator still reports UnboundVariable, not NotAProcedure.
    let operator_result_node = evaluate(operator.clone(), env.clone())?;

    // 2. Check if the result is a procedure
    let procedure = match operator_result_node.kind {
        Sexpr::Procedure(proc) => proc,
        kind => {
            return Err(EvalError::NotAProcedure(
                kind,          // What was actually found
                operator.span, // Span of the operator expression
            ));
        }
    };

    // 3. Evaluate the operands, strictly left to right
    let mut evaluated_args: Vec<Node> = Vec::with_capacity(operands.len());
    for operand_node in operands {
        evaluated_args.push(evaluate(operand_node.clone(), env.clone())?);
    }

    // 4. Apply the procedure
    apply_procedure(&procedure, evaluated_args, span)
}

/// Applies an already-evaluated procedure to already-evaluated arguments.
/// Shared by generic application and by the `apply`/`map` primitives,
/// which re-enter evaluation from inside a primitive call.
pub fn apply_procedure(procedure: &Procedure, args: Vec<Node>, span: Span) -> EvalResult {
    match procedure {
        Procedure::Primitive(func, _) => {
            // Call the Rust function with evaluated args and original call span
            func(args, span)
        }
        Procedure::Lambda(lambda) => {
            if args.len() != lambda.params.len() {
                return Err(EvalError::ArityMismatch {
                    name: format!("(lambda ({}))", lambda.params.join(" ")),
                    expected: format!("exactly {}", lambda.params.len()),
                    found: args.len(),
                    span,
                });
            }
            // The call frame's parent is the environment captured at the
            // lambda, not the caller's environment.
            let call_env = Environment::new_call_frame(&lambda.params, args, lambda.env.clone());
            evaluate(lambda.body.clone(), call_env)
        }
    }
}

fn evaluate_quote(operands: &[Node], span: Span) -> EvalResult {
    if let [node] = operands {
        // Quote returns the operand unevaluated.
        Ok(node.clone())
    } else {
        Err(EvalError::InvalidSpecialForm(
            "quote expects exactly one argument".to_string(),
            span, // Use the span of the whole (quote ...) form
        ))
    }
}

fn evaluate_if(operands: &[Node], env: Rc<RefCell<Environment>>, span: Span) -> EvalResult {
    if let [condition, consequent, alternate] = operands {
        // Evaluate the condition first; only the chosen branch runs
        let condition_result = evaluate(condition.clone(), env.clone())?;

        if is_truthy(&condition_result) {
            evaluate(consequent.clone(), env)
        } else {
            evaluate(alternate.clone(), env)
        }
    } else {
        Err(EvalError::InvalidSpecialForm(
            "if expects condition, consequent, and alternate".to_string(),
            span, // Span of the whole (if ...) form
        ))
    }
}

fn evaluate_define(operands: &[Node], env: Rc<RefCell<Environment>>, span: Span) -> EvalResult {
    if let [name_node, value_expr] = operands {
        match &name_node.kind {
            Sexpr::Symbol(name) => {
                let value = evaluate(value_expr.clone(), env.clone())?;
                env.borrow_mut().define(name.clone(), value);
                // A definition has no value of its own; the REPL suppresses
                // the empty list as falsy.
                Ok(Node::new_empty_list(span))
            }
            kind => Err(EvalError::NotASymbol(kind.clone(), name_node.span)),
        }
    } else {
        Err(EvalError::InvalidSpecialForm(
            "define expects a name and exactly one expression".to_string(),
            span,
        ))
    }
}

fn evaluate_set(operands: &[Node], env: Rc<RefCell<Environment>>, span: Span) -> EvalResult {
    if let [name_node, value_expr] = operands {
        match &name_node.kind {
            Sexpr::Symbol(name) => {
                let value = evaluate(value_expr.clone(), env.clone())?;
                // set! rebinds in the frame where the name was defined
                env.borrow_mut().set(name, value, name_node.span)?;
                Ok(Node::new_empty_list(span))
            }
            kind => Err(EvalError::NotASymbol(kind.clone(), name_node.span)),
        }
    } else {
        Err(EvalError::InvalidSpecialForm(
            "set! expects a name and exactly one expression".to_string(),
            span,
        ))
    }
}

fn evaluate_lambda(operands: &[Node], env: Rc<RefCell<Environment>>, span: Span) -> EvalResult {
    if let [params_node, body] = operands {
        let param_nodes = match &params_node.kind {
            Sexpr::List(elements) => elements,
            _ => {
                return Err(EvalError::InvalidSpecialForm(
                    "lambda expects a parameter list and a body".to_string(),
                    params_node.span,
                ));
            }
        };

        let mut params = Vec::with_capacity(param_nodes.len());
        for param in param_nodes {
            match &param.kind {
                Sexpr::Symbol(name) => params.push(name.clone()),
                kind => return Err(EvalError::NotASymbol(kind.clone(), param.span)),
            }
        }

        // The current environment is captured by reference, not copied.
        Ok(Node::new_lambda(params, body.clone(), env))
    } else {
        Err(EvalError::InvalidSpecialForm(
            "lambda expects a parameter list and a body".to_string(),
            span,
        ))
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str; // Use parser to create AST nodes easily
    use crate::source::Span;

    // Helper to evaluate input string and check result kind (ignores span)
    fn assert_eval_kind(input: &str, expected_kind: Sexpr, env: Option<Rc<RefCell<Environment>>>) {
        let env = env.unwrap_or_else(Environment::new_global_populated);
        match parse_str(input) {
            Ok(node) => match evaluate(node, env) {
                Ok(result_node) => {
                    assert_eq!(result_node.kind, expected_kind, "Input: '{}'", input)
                }
                Err(e) => panic!("Evaluation failed for input '{}': {}", input, e),
            },
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        }
    }

    // Helper to assert evaluation errors
    fn assert_eval_error(
        input: &str,
        expected_error_variant: &EvalError,
        env: Option<Rc<RefCell<Environment>>>,
    ) {
        let env = env.unwrap_or_else(Environment::new_global_populated);
        match parse_str(input) {
            Ok(node) => match evaluate(node, env) {
                Ok(result) => panic!(
                    "Expected evaluation to fail for input '{}', but got: {:?}",
                    input, result
                ),
                Err(e) => {
                    assert_eq!(
                        std::mem::discriminant(&e),
                        std::mem::discriminant(expected_error_variant),
                        "Input: '{}', Expected error variant like {:?}, got: {:?}",
                        input,
                        expected_error_variant,
                        e
                    );
                }
            },
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        }
    }

    fn unbound_error() -> EvalError {
        EvalError::EnvError(EnvError::UnboundVariable("".into(), Span::default()))
    }

    #[test]
    fn test_eval_self_evaluating() {
        assert_eval_kind("123", Sexpr::Integer(123), None);
        assert_eval_kind("-4.5", Sexpr::Float(-4.5), None);
    }

    #[test]
    fn test_eval_symbol_lookup_ok() {
        let env = Environment::new_global();
        env.borrow_mut()
            .define("x".to_string(), Node::new_integer(100, Span::default()));
        assert_eval_kind("x", Sexpr::Integer(100), Some(env));
    }

    #[test]
    fn test_eval_symbol_lookup_unbound() {
        let env = Environment::new_global(); // Empty env
        assert_eval_error("y", &unbound_error(), Some(env));
    }

    #[test]
    fn test_eval_global_constants() {
        assert_eval_kind("pi", Sexpr::Float(std::f64::consts::PI), None);
        assert_eval_kind("e", Sexpr::Float(std::f64::consts::E), None);
    }

    #[test]
    fn test_eval_quote() {
        assert_eval_kind("(quote 1)", Sexpr::Integer(1), None);
        assert_eval_kind("(quote a)", Sexpr::Symbol("a".to_string()), None);
        assert_eval_kind("(quote ())", Sexpr::List(vec![]), None);

        // (quote (1 2)) -> the list structure, unevaluated
        let env = Environment::new_global();
        match parse_str("(quote (1 2))") {
            Ok(node) => match evaluate(node, env) {
                Ok(result_node) => {
                    if let Sexpr::List(elements) = result_node.kind {
                        assert_eq!(elements.len(), 2);
                        assert_eq!(elements[0].kind, Sexpr::Integer(1));
                        assert_eq!(elements[1].kind, Sexpr::Integer(2));
                    } else {
                        panic!("Expected list, got: {:?}", result_node.kind);
                    }
                }
                Err(e) => panic!("Eval failed: {}", e),
            },
            Err(e) => panic!("Parse failed: {}", e),
        }
    }

    #[test]
    fn test_eval_quote_leaves_operator_unevaluated() {
        // The quoted (+ 1 2) stays a list; nothing is applied
        let env = Environment::new_global_populated();
        match parse_str("(quote (+ 1 2))") {
            Ok(node) => match evaluate(node, env) {
                Ok(result_node) => {
                    if let Sexpr::List(elements) = result_node.kind {
                        assert_eq!(elements[0].kind, Sexpr::Symbol("+".to_string()));
                    } else {
                        panic!("Expected list, got: {:?}", result_node.kind);
                    }
                }
                Err(e) => panic!("Eval failed: {}", e),
            },
            Err(e) => panic!("Parse failed: {}", e),
        }
    }

    #[test]
    fn test_eval_quote_repeated_is_stable() {
        // The same parsed node can be evaluated again; the result does not change.
        let env = Environment::new_global();
        match parse_str("(quote (1 2 3))") {
            Ok(node) => {
                let first = evaluate(node.clone(), env.clone());
                let second = evaluate(node, env);
                match (first, second) {
                    (Ok(a), Ok(b)) => {
                        assert_eq!(a.kind, b.kind);
                        assert!(matches!(a.kind, Sexpr::List(ref elements) if elements.len() == 3));
                    }
                    (a, b) => panic!("Eval failed: {:?} / {:?}", a, b),
                }
            }
            Err(e) => panic!("Parse failed: {}", e),
        }
    }

    #[test]
    fn test_eval_quote_error_arity() {
        let wrong_args_error = EvalError::InvalidSpecialForm("".into(), Span::default()); // Dummy
        assert_eval_error("(quote a b)", &wrong_args_error, None);
        assert_eval_error("(quote)", &wrong_args_error, None);
    }

    #[test]
    fn test_eval_if_truthiness() {
        assert_eval_kind("(if 1 10 20)", Sexpr::Integer(10), None);
        assert_eval_kind("(if 0 10 20)", Sexpr::Integer(20), None);
        assert_eval_kind("(if 0.0 10 20)", Sexpr::Integer(20), None);
        assert_eval_kind("(if 0.5 10 20)", Sexpr::Integer(10), None);
        assert_eval_kind("(if (quote ()) 10 20)", Sexpr::Integer(20), None);
        assert_eval_kind("(if (quote (1)) 10 20)", Sexpr::Integer(10), None);
        assert_eval_kind("(if (quote x) 10 20)", Sexpr::Integer(10), None);
    }

    #[test]
    fn test_eval_if_evaluates_condition() {
        let env = Environment::new_global();
        env.borrow_mut()
            .define("cond".to_string(), Node::new_integer(0, Span::default()));
        assert_eval_kind("(if cond 1 2)", Sexpr::Integer(2), Some(env));
    }

    #[test]
    fn test_eval_if_does_not_evaluate_unused_branch() {
        // Put an unbound variable in the unused branch: no error may surface.
        assert_eval_kind(
            "(if 1 (quote good) unbound-variable)",
            Sexpr::Symbol("good".to_string()),
            None,
        );
        assert_eval_kind(
            "(if 0 unbound-variable (quote good))",
            Sexpr::Symbol("good".to_string()),
            None,
        );
        // Taking the car of () errors, but the branch is never taken
        assert_eval_kind("(if (= 1 1) 10 (car (quote ())))", Sexpr::Integer(10), None);
    }

    #[test]
    fn test_eval_if_error_arity() {
        let arity_error = &EvalError::InvalidSpecialForm("".into(), Span::default());
        assert_eval_error("(if)", arity_error, None);
        assert_eval_error("(if 1)", arity_error, None);
        assert_eval_error("(if 1 2)", arity_error, None); // Alternate is required
        assert_eval_error("(if 1 2 3 4)", arity_error, None);
    }

    #[test]
    fn test_eval_if_error_in_condition() {
        assert_eval_error("(if unbound 1 2)", &unbound_error(), None);
    }

    #[test]
    fn test_eval_define() {
        let env = Environment::new_global_populated();
        // define itself evaluates to the (unprinted) empty list
        assert_eval_kind("(define x 5)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind("x", Sexpr::Integer(5), Some(env.clone()));
        // Redefinition overwrites
        assert_eval_kind("(define x 6)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind("x", Sexpr::Integer(6), Some(env));
    }

    #[test]
    fn test_eval_define_evaluates_value() {
        let env = Environment::new_global_populated();
        assert_eval_kind("(define x (+ 2 3))", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind("x", Sexpr::Integer(5), Some(env));
    }

    #[test]
    fn test_eval_define_errors() {
        let not_symbol = EvalError::NotASymbol(Sexpr::Integer(0), Span::default()); // Dummy
        assert_eval_error("(define 1 2)", &not_symbol, None);
        let invalid_form = EvalError::InvalidSpecialForm("".into(), Span::default());
        assert_eval_error("(define x)", &invalid_form, None);
        assert_eval_error("(define x 1 2)", &invalid_form, None);
    }

    #[test]
    fn test_eval_set() {
        let env = Environment::new_global_populated();
        assert_eval_kind("(define x 5)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind("(set! x 7)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind("x", Sexpr::Integer(7), Some(env));
    }

    #[test]
    fn test_eval_set_unbound() {
        assert_eval_error("(set! nope 1)", &unbound_error(), None);
    }

    #[test]
    fn test_eval_lambda_literal() {
        let env = Environment::new_global();
        match parse_str("(lambda (x) x)") {
            Ok(node) => match evaluate(node, env) {
                Ok(result_node) => {
                    assert!(matches!(result_node.kind, Sexpr::Procedure(_)));
                }
                Err(e) => panic!("Eval failed: {}", e),
            },
            Err(e) => panic!("Parse failed: {}", e),
        }
    }

    #[test]
    fn test_eval_lambda_application() {
        assert_eval_kind("((lambda (x) (* x x)) 5)", Sexpr::Integer(25), None);
        assert_eval_kind("((lambda () 42))", Sexpr::Integer(42), None);
        assert_eval_kind("((lambda (a b) (- a b)) 10 4)", Sexpr::Integer(6), None);
    }

    #[test]
    fn test_eval_lambda_params_shadow_globals() {
        let env = Environment::new_global_populated();
        assert_eval_kind("(define x 1)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind("((lambda (x) (+ x 10)) 5)", Sexpr::Integer(15), Some(env.clone()));
        // The global binding is untouched by the call frame
        assert_eval_kind("x", Sexpr::Integer(1), Some(env));
    }

    #[test]
    fn test_eval_lambda_arity_error() {
        let arity_error = EvalError::ArityMismatch {
            name: "".into(),
            expected: "".into(),
            found: 0,
            span: Span::default(),
        };
        assert_eval_error("((lambda (x) x) 1 2)", &arity_error, None);
        assert_eval_error("((lambda (x y) x) 1)", &arity_error, None);
    }

    #[test]
    fn test_eval_lambda_form_errors() {
        let invalid_form = EvalError::InvalidSpecialForm("".into(), Span::default());
        assert_eval_error("(lambda x x)", &invalid_form, None); // Params must be a list
        assert_eval_error("(lambda (x))", &invalid_form, None); // Body is required
        let not_symbol = EvalError::NotASymbol(Sexpr::Integer(0), Span::default());
        assert_eval_error("(lambda (1) 2)", &not_symbol, None);
    }

    #[test]
    fn test_eval_closure_captures_definition_env() {
        // ((make-adder 3) 4) -> 7: the inner lambda remembers x = 3
        let env = Environment::new_global_populated();
        assert_eval_kind(
            "(define make-adder (lambda (x) (lambda (y) (+ x y))))",
            Sexpr::List(vec![]),
            Some(env.clone()),
        );
        assert_eval_kind("((make-adder 3) 4)", Sexpr::Integer(7), Some(env));
    }

    #[test]
    fn test_eval_closure_sees_later_mutation() {
        // The captured frame is shared, so set! after capture is visible.
        let env = Environment::new_global_populated();
        assert_eval_kind("(define n 1)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind(
            "(define get-n (lambda () n))",
            Sexpr::List(vec![]),
            Some(env.clone()),
        );
        assert_eval_kind("(get-n)", Sexpr::Integer(1), Some(env.clone()));
        assert_eval_kind("(set! n 2)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind("(get-n)", Sexpr::Integer(2), Some(env));
    }

    #[test]
    fn test_eval_returned_closure_sees_outer_set() {
        // The adder returned before the set! reads base through its captured
        // chain, so the mutation shows up on the next call.
        let env = Environment::new_global_populated();
        assert_eval_kind("(define base 10)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind(
            "(define make-adder (lambda (x) (lambda (y) (+ (+ x y) base))))",
            Sexpr::List(vec![]),
            Some(env.clone()),
        );
        assert_eval_kind(
            "(define add3 (make-adder 3))",
            Sexpr::List(vec![]),
            Some(env.clone()),
        );
        assert_eval_kind("(add3 4)", Sexpr::Integer(17), Some(env.clone()));
        assert_eval_kind("(set! base 100)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind("(add3 4)", Sexpr::Integer(107), Some(env));
    }

    #[test]
    fn test_eval_counter_through_set() {
        let env = Environment::new_global_populated();
        assert_eval_kind("(define counter 0)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind(
            "(define bump (lambda () (set! counter (+ counter 1))))",
            Sexpr::List(vec![]),
            Some(env.clone()),
        );
        assert_eval_kind("(bump)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind("(bump)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind("counter", Sexpr::Integer(2), Some(env));
    }

    #[test]
    fn test_eval_operand_order_left_to_right() {
        // Each operand runs against the same env; the define in the first
        // operand position is visible to the later ones.
        assert_eval_kind("(begin (define r 10) (+ r r))", Sexpr::Integer(20), None);
    }

    #[test]
    fn test_eval_circle_area_program() {
        let env = Environment::new_global_populated();
        match parse_str("(begin (define r 10) (* pi (* r r)))") {
            Ok(node) => match evaluate(node, env) {
                Ok(result_node) => match result_node.kind {
                    Sexpr::Float(value) => {
                        assert!((value - 314.1592653589793).abs() < 1e-9, "got {}", value)
                    }
                    kind => panic!("Expected float, got: {:?}", kind),
                },
                Err(e) => panic!("Eval failed: {}", e),
            },
            Err(e) => panic!("Parse failed: {}", e),
        }
    }

    #[test]
    fn test_eval_fib_recursion() {
        let env = Environment::new_global_populated();
        assert_eval_kind(
            "(define fib (lambda (n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2))))))",
            Sexpr::List(vec![]),
            Some(env.clone()),
        );
        assert_eval_kind("(fib 10)", Sexpr::Integer(55), Some(env));
    }

    #[test]
    fn test_eval_not_procedure_error() {
        let not_proc_error = &EvalError::NotAProcedure(Sexpr::Integer(0), Span::default()); // Dummy
        assert_eval_error("(1 2 3)", not_proc_error, None);
        assert_eval_error("((list 1 2) 3)", not_proc_error, None);
        // The empty call has nothing in operator position
        assert_eval_error("()", not_proc_error, None);
        assert_eval_error("(())", not_proc_error, None);
    }

    #[test]
    fn test_eval_unbound_operator_reports_unbound() {
        // The operator's own failure wins over NotAProcedure
        assert_eval_error("(nosuchfn 1 2)", &unbound_error(), None);
    }

    #[test]
    fn test_eval_error_in_operand_propagates() {
        assert_eval_error("(+ 1 nope)", &unbound_error(), None);
    }

    #[test]
    fn test_eval_primitives_through_application() {
        assert_eval_kind("(+ 10 2)", Sexpr::Integer(12), None);
        assert_eval_kind("(+ 10 2.0)", Sexpr::Float(12.0), None);
        assert_eval_kind("(/ 10 2)", Sexpr::Float(5.0), None);
        assert_eval_kind("(+ 1 (* 2 3))", Sexpr::Integer(7), None);
        assert_eval_kind("(- (+ 5 5) (* 2 3))", Sexpr::Integer(4), None);
        assert_eval_kind("(< 1 2)", Sexpr::Integer(1), None);
        assert_eval_kind("(> 1 2)", Sexpr::Integer(0), None);
    }

    #[test]
    fn test_eval_primitive_arity_through_application() {
        let arity_error = EvalError::ArityMismatch {
            name: "".into(),
            expected: "".into(),
            found: 0,
            span: Span::default(),
        };
        assert_eval_error("(+ 1)", &arity_error, None);
        assert_eval_error("(+ 1 2 3)", &arity_error, None);
    }

    #[test]
    fn test_eval_higher_order_primitives() {
        assert_eval_kind("(apply + 1 2)", Sexpr::Integer(3), None);
        assert_eval_kind("(length (map abs (quote (-1 2 -3))))", Sexpr::Integer(3), None);
        assert_eval_kind("(car (map abs (quote (-1 2 -3))))", Sexpr::Integer(1), None);
    }

    #[test]
    fn test_eval_keywords_win_over_bindings() {
        // Special forms are dispatched before lookup; a binding named like
        // one is reachable as a value but never in operator position.
        let env = Environment::new_global_populated();
        assert_eval_kind("(define if 5)", Sexpr::List(vec![]), Some(env.clone()));
        assert_eval_kind("if", Sexpr::Integer(5), Some(env.clone()));
        assert_eval_kind("(if 1 2 3)", Sexpr::Integer(2), Some(env));
    }
}
