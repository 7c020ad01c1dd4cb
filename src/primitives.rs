use crate::evaluator::{EvalError, EvalResult, apply_procedure, is_truthy};
use crate::source::Span;
use crate::types::{Node, Sexpr};

// Checks the number of arguments
macro_rules! check_arity {
    ($args:expr, $expected:expr, $span:expr, $name:expr) => {
        if $args.len() != $expected {
            return Err(EvalError::ArityMismatch {
                name: $name.to_string(),
                expected: format!("exactly {}", $expected),
                found: $args.len(),
                span: $span,
            });
        }
    };
    // Variant for minimum number of args
    ($args:expr, min $expected:expr, $span:expr, $name:expr) => {
        if $args.len() < $expected {
            return Err(EvalError::ArityMismatch {
                name: $name.to_string(),
                expected: format!("at least {}", $expected),
                found: $args.len(),
                span: $span,
            });
        }
    };
}

// Extracts a number from a Node or returns a TypeMismatch error
macro_rules! expect_number {
    ($node:expr) => {
        match $node.kind {
            Sexpr::Integer(n) => Number::Integer(n),
            Sexpr::Float(n) => Number::Float(n),
            _ => {
                return Err(EvalError::TypeMismatch {
                    expected: "a number",
                    found: $node.kind.clone(),
                    span: $node.span,
                });
            }
        }
    };
}

// Borrows the elements of a list argument or returns a TypeMismatch error
macro_rules! expect_list {
    ($node:expr) => {
        match &$node.kind {
            Sexpr::List(elements) => elements,
            _ => {
                return Err(EvalError::TypeMismatch {
                    expected: "a list",
                    found: $node.kind.clone(),
                    span: $node.span,
                });
            }
        }
    };
}

/// A numeric argument, keeping its integer or float identity until an
/// operation forces promotion.
#[derive(Debug, Clone, Copy)]
enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Integer(n) => n as f64,
            Number::Float(n) => n,
        }
    }
}

// Truth is represented as the integers 1 and 0.
fn bool_node(value: bool, span: Span) -> Node {
    Node::new_integer(value as i64, span)
}

/// Structural equality, ignoring source spans. Numbers compare by value
/// across the integer/float split, so (= 1 1.0) holds.
fn values_equal(left: &Sexpr, right: &Sexpr) -> bool {
    match (left, right) {
        (Sexpr::Integer(a), Sexpr::Integer(b)) => a == b,
        (Sexpr::Float(a), Sexpr::Float(b)) => a == b,
        (Sexpr::Integer(a), Sexpr::Float(b)) | (Sexpr::Float(b), Sexpr::Integer(a)) => {
            *a as f64 == *b
        }
        (Sexpr::Symbol(a), Sexpr::Symbol(b)) => a == b,
        (Sexpr::List(a), Sexpr::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(&x.kind, &y.kind))
        }
        (Sexpr::Procedure(a), Sexpr::Procedure(b)) => a == b,
        _ => false,
    }
}

// --- Arithmetic ---

// Binary numeric operation: integers stay integers, any float promotes.
fn arith<FI: Fn(i64, i64) -> i64, FF: Fn(f64, f64) -> f64>(
    args: Vec<Node>,
    span: Span,
    int_op: FI,
    float_op: FF,
    operator: &str,
) -> EvalResult {
    check_arity!(args, 2, span, operator);
    let left = expect_number!(&args[0]);
    let right = expect_number!(&args[1]);
    let kind = match (left, right) {
        (Number::Integer(a), Number::Integer(b)) => Sexpr::Integer(int_op(a, b)),
        (a, b) => Sexpr::Float(float_op(a.as_f64(), b.as_f64())),
    };
    Ok(Node::new(kind, span))
}

pub fn prim_add(args: Vec<Node>, span: Span) -> EvalResult {
    // (+ 1 2) -> 3; (+ 1 2.0) -> 3.0
    arith(args, span, i64::wrapping_add, |a, b| a + b, "+")
}

pub fn prim_sub(args: Vec<Node>, span: Span) -> EvalResult {
    arith(args, span, i64::wrapping_sub, |a, b| a - b, "-")
}

pub fn prim_mul(args: Vec<Node>, span: Span) -> EvalResult {
    arith(args, span, i64::wrapping_mul, |a, b| a * b, "*")
}

pub fn prim_div(args: Vec<Node>, span: Span) -> EvalResult {
    // True division: (/ 10 2) -> 5.0, never an integer
    check_arity!(args, 2, span, "/");
    let left = expect_number!(&args[0]);
    let right = expect_number!(&args[1]);
    if right.as_f64() == 0.0 {
        return Err(EvalError::InvalidArguments(
            "Division by zero".to_string(),
            args[1].span,
        ));
    }
    Ok(Node::new_float(left.as_f64() / right.as_f64(), span))
}

// --- Comparison ---

fn compare_numbers<FI: Fn(i64, i64) -> bool, FF: Fn(f64, f64) -> bool>(
    args: Vec<Node>,
    span: Span,
    int_cmp: FI,
    float_cmp: FF,
    operator: &str,
) -> EvalResult {
    check_arity!(args, 2, span, operator);
    let left = expect_number!(&args[0]);
    let right = expect_number!(&args[1]);
    let result = match (left, right) {
        // Integer pairs compare exactly, without a round trip through f64
        (Number::Integer(a), Number::Integer(b)) => int_cmp(a, b),
        (a, b) => float_cmp(a.as_f64(), b.as_f64()),
    };
    Ok(bool_node(result, span))
}

pub fn prim_greater_than(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |a, b| a > b, |a, b| a > b, ">")
}

pub fn prim_less_than(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |a, b| a < b, |a, b| a < b, "<")
}

pub fn prim_greater_than_or_equals(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |a, b| a >= b, |a, b| a >= b, ">=")
}

pub fn prim_less_than_or_equals(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |a, b| a <= b, |a, b| a <= b, "<=")
}

pub fn prim_equals(args: Vec<Node>, span: Span) -> EvalResult {
    // (=) compares any two values structurally, not only numbers
    check_arity!(args, 2, span, "=");
    Ok(bool_node(values_equal(&args[0].kind, &args[1].kind), span))
}

pub fn prim_is_equal(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 2, span, "equal?");
    Ok(bool_node(values_equal(&args[0].kind, &args[1].kind), span))
}

pub fn prim_is_eq(args: Vec<Node>, span: Span) -> EvalResult {
    // Owned values have no identity to compare, so eq? behaves as equal?.
    check_arity!(args, 2, span, "eq?");
    Ok(bool_node(values_equal(&args[0].kind, &args[1].kind), span))
}

// --- List Primitives ---

pub fn prim_cons(args: Vec<Node>, span: Span) -> EvalResult {
    // (cons item list) -> list with item prepended
    check_arity!(args, 2, span, "cons");
    let elements = expect_list!(&args[1]);
    let mut list = Vec::with_capacity(elements.len() + 1);
    list.push(args[0].clone());
    list.extend(elements.iter().cloned());
    Ok(Node::new_list(list, span))
}

pub fn prim_car(args: Vec<Node>, span: Span) -> EvalResult {
    // (car list) -> first item
    check_arity!(args, 1, span, "car");
    let elements = expect_list!(&args[0]);
    match elements.first() {
        Some(first) => Ok(first.clone()),
        None => Err(EvalError::InvalidArguments(
            "car: cannot take the car of the empty list".to_string(),
            args[0].span,
        )),
    }
}

pub fn prim_cdr(args: Vec<Node>, span: Span) -> EvalResult {
    // (cdr list) -> rest of the list; the cdr of () is ()
    check_arity!(args, 1, span, "cdr");
    let elements = expect_list!(&args[0]);
    let rest: Vec<Node> = elements.iter().skip(1).cloned().collect();
    Ok(Node::new_list(rest, span))
}

pub fn prim_append(args: Vec<Node>, span: Span) -> EvalResult {
    // (append list1 list2) -> concatenation
    check_arity!(args, 2, span, "append");
    let left = expect_list!(&args[0]);
    let right = expect_list!(&args[1]);
    let mut list = Vec::with_capacity(left.len() + right.len());
    list.extend(left.iter().cloned());
    list.extend(right.iter().cloned());
    Ok(Node::new_list(list, span))
}

pub fn prim_list(args: Vec<Node>, span: Span) -> EvalResult {
    // (list a b c) -> (a b c); args are already evaluated nodes
    Ok(Node::new_list(args, span))
}

pub fn prim_length(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "length");
    let elements = expect_list!(&args[0]);
    Ok(Node::new_integer(elements.len() as i64, span))
}

pub fn prim_is_null(args: Vec<Node>, span: Span) -> EvalResult {
    // (null? obj) -> 1 only for the empty list
    check_arity!(args, 1, span, "null?");
    let is_null = matches!(&args[0].kind, Sexpr::List(elements) if elements.is_empty());
    Ok(bool_node(is_null, span))
}

// --- Type Predicates ---

pub fn prim_is_number(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "number?");
    let is_number = matches!(args[0].kind, Sexpr::Integer(_) | Sexpr::Float(_));
    Ok(bool_node(is_number, span))
}

pub fn prim_is_symbol(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "symbol?");
    Ok(bool_node(matches!(args[0].kind, Sexpr::Symbol(_)), span))
}

pub fn prim_is_procedure(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "procedure?");
    Ok(bool_node(matches!(args[0].kind, Sexpr::Procedure(_)), span))
}

pub fn prim_is_list(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "list?");
    Ok(bool_node(matches!(args[0].kind, Sexpr::List(_)), span))
}

pub fn prim_not(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "not");
    Ok(bool_node(!is_truthy(&args[0]), span))
}

// --- Higher-order Primitives ---

pub fn prim_apply(mut args: Vec<Node>, span: Span) -> EvalResult {
    // (apply proc a b c) calls proc with the remaining arguments directly
    check_arity!(args, min 1, span, "apply");
    let proc_node = args.remove(0);
    let procedure = match proc_node.kind {
        Sexpr::Procedure(procedure) => procedure,
        kind => return Err(EvalError::NotAProcedure(kind, proc_node.span)),
    };
    apply_procedure(&procedure, args, span)
}

pub fn prim_map(args: Vec<Node>, span: Span) -> EvalResult {
    // (map proc items) -> list of proc applied to each item, in order
    check_arity!(args, 2, span, "map");
    let procedure = match &args[0].kind {
        Sexpr::Procedure(procedure) => procedure.clone(),
        kind => return Err(EvalError::NotAProcedure(kind.clone(), args[0].span)),
    };
    let elements = expect_list!(&args[1]);
    let mut results = Vec::with_capacity(elements.len());
    for element in elements {
        results.push(apply_procedure(&procedure, vec![element.clone()], span)?);
    }
    Ok(Node::new_list(results, span))
}

pub fn prim_begin(mut args: Vec<Node>, span: Span) -> EvalResult {
    // Operands were already evaluated left to right; the last value wins.
    match args.pop() {
        Some(last) => Ok(last),
        None => Err(EvalError::ArityMismatch {
            name: "begin".to_string(),
            expected: "at least 1".to_string(),
            found: 0,
            span,
        }),
    }
}

// --- Math Primitives ---

pub fn prim_abs(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "abs");
    let kind = match expect_number!(&args[0]) {
        Number::Integer(n) => Sexpr::Integer(n.wrapping_abs()),
        Number::Float(n) => Sexpr::Float(n.abs()),
    };
    Ok(Node::new(kind, span))
}

// Selects one argument by magnitude; the winner keeps its own numeric kind.
fn select_number<F: Fn(f64, f64) -> bool>(
    args: Vec<Node>,
    span: Span,
    prefer_new: F,
    name: &str,
) -> EvalResult {
    check_arity!(args, min 1, span, name);
    let mut best = args[0].clone();
    let mut best_value = expect_number!(&best).as_f64();
    for node in args.iter().skip(1) {
        let value = expect_number!(node).as_f64();
        if prefer_new(value, best_value) {
            best = node.clone();
            best_value = value;
        }
    }
    Ok(Node::new(best.kind, span))
}

pub fn prim_min(args: Vec<Node>, span: Span) -> EvalResult {
    select_number(args, span, |new, best| new < best, "min")
}

pub fn prim_max(args: Vec<Node>, span: Span) -> EvalResult {
    select_number(args, span, |new, best| new > best, "max")
}

// Unary function on the float value of a numeric argument.
fn float_fn<F: Fn(f64) -> f64>(args: Vec<Node>, span: Span, func: F, name: &str) -> EvalResult {
    check_arity!(args, 1, span, name);
    let value = expect_number!(&args[0]).as_f64();
    Ok(Node::new_float(func(value), span))
}

// Unary float-to-integer conversion; integers pass through unchanged.
fn integer_fn<F: Fn(f64) -> f64>(args: Vec<Node>, span: Span, func: F, name: &str) -> EvalResult {
    check_arity!(args, 1, span, name);
    let kind = match expect_number!(&args[0]) {
        Number::Integer(n) => Sexpr::Integer(n),
        Number::Float(n) => {
            if !n.is_finite() {
                return Err(EvalError::InvalidArguments(
                    format!("{}: cannot convert {} to an integer", name, n),
                    args[0].span,
                ));
            }
            Sexpr::Integer(func(n) as i64)
        }
    };
    Ok(Node::new(kind, span))
}

pub fn prim_round(args: Vec<Node>, span: Span) -> EvalResult {
    // Ties go to the even integer: (round 2.5) is 2, (round 3.5) is 4.
    integer_fn(args, span, f64::round_ties_even, "round")
}

pub fn prim_floor(args: Vec<Node>, span: Span) -> EvalResult {
    integer_fn(args, span, f64::floor, "floor")
}

pub fn prim_ceil(args: Vec<Node>, span: Span) -> EvalResult {
    integer_fn(args, span, f64::ceil, "ceil")
}

pub fn prim_sqrt(args: Vec<Node>, span: Span) -> EvalResult {
    float_fn(args, span, f64::sqrt, "sqrt")
}

pub fn prim_exp(args: Vec<Node>, span: Span) -> EvalResult {
    float_fn(args, span, f64::exp, "exp")
}

pub fn prim_log(args: Vec<Node>, span: Span) -> EvalResult {
    // Natural logarithm
    float_fn(args, span, f64::ln, "log")
}

pub fn prim_log10(args: Vec<Node>, span: Span) -> EvalResult {
    float_fn(args, span, f64::log10, "log10")
}

pub fn prim_sin(args: Vec<Node>, span: Span) -> EvalResult {
    float_fn(args, span, f64::sin, "sin")
}

pub fn prim_cos(args: Vec<Node>, span: Span) -> EvalResult {
    float_fn(args, span, f64::cos, "cos")
}

pub fn prim_tan(args: Vec<Node>, span: Span) -> EvalResult {
    float_fn(args, span, f64::tan, "tan")
}

pub fn prim_asin(args: Vec<Node>, span: Span) -> EvalResult {
    float_fn(args, span, f64::asin, "asin")
}

pub fn prim_acos(args: Vec<Node>, span: Span) -> EvalResult {
    float_fn(args, span, f64::acos, "acos")
}

pub fn prim_atan(args: Vec<Node>, span: Span) -> EvalResult {
    float_fn(args, span, f64::atan, "atan")
}

pub fn prim_atan2(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 2, span, "atan2");
    let y = expect_number!(&args[0]).as_f64();
    let x = expect_number!(&args[1]).as_f64();
    Ok(Node::new_float(y.atan2(x), span))
}

pub fn prim_expt(args: Vec<Node>, span: Span) -> EvalResult {
    // Always a float, like the original host's pow
    check_arity!(args, 2, span, "pow");
    let base = expect_number!(&args[0]).as_f64();
    let exponent = expect_number!(&args[1]).as_f64();
    Ok(Node::new_float(base.powf(exponent), span))
}
