use crate::environment::Environment;
use crate::{evaluator::EvalResult, source::Span};
use std::cell::RefCell;
use std::fmt; // For custom display formatting
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Sexpr, // The actual S-expression data
    pub span: Span,  // The source span it covers
}

impl Node {
    pub fn new(kind: Sexpr, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn new_integer(n: i64, span: Span) -> Self {
        Node::new(Sexpr::Integer(n), span)
    }

    pub fn new_float(n: f64, span: Span) -> Self {
        Node::new(Sexpr::Float(n), span)
    }

    pub fn new_symbol(name: String, span: Span) -> Self {
        Node::new(Sexpr::Symbol(name), span)
    }

    pub fn new_list(elements: Vec<Node>, span: Span) -> Self {
        Node::new(Sexpr::List(elements), span)
    }

    /// The empty list `()`, also the absent result of `define`/`set!`.
    pub fn new_empty_list(span: Span) -> Self {
        Node::new(Sexpr::List(Vec::new()), span)
    }

    pub fn new_primitive(func: PrimitiveFunc, name: &str, span: Span) -> Self {
        Node::new(
            Sexpr::Procedure(Procedure::Primitive(func, name.to_string())),
            span,
        )
    }

    pub fn new_lambda(params: Vec<String>, body: Node, env: Rc<RefCell<Environment>>) -> Self {
        let span = body.span;
        Node::new(
            Sexpr::Procedure(Procedure::Lambda(Rc::new(Lambda { params, body, env }))),
            span,
        )
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Delegate to Sexpr's Display implementation
        write!(f, "{}", self.kind)
    }
}

/// An expression of the interpreted language. The same tree is both code
/// (operator first) and data (quoted lists); the parser only ever produces
/// the first four variants, `Procedure` appears during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexpr {
    Symbol(String),  // e.g., +, variable-name, quote
    Integer(i64),    // Classified before Float: "10" is Integer(10)
    Float(f64),
    List(Vec<Node>), // e.g., (+ 1 2); empty for '()
    Procedure(Procedure),
}

impl Sexpr {
    pub fn type_name(&self) -> &'static str {
        match self {
            Sexpr::Symbol(_) => "symbol",
            Sexpr::Integer(_) => "integer",
            Sexpr::Float(_) => "float",
            Sexpr::List(_) => "list",
            Sexpr::Procedure(_) => "procedure",
        }
    }
}

// Implement Display trait for pretty printing the Sexpr values
impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexpr::Symbol(s) => write!(f, "{}", s),
            Sexpr::Integer(n) => write!(f, "{}", n),
            Sexpr::Float(n) => {
                // Keep a decimal point so 10 and 10.0 stay distinguishable.
                if n.is_finite() && n.fract() == 0.0 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Sexpr::List(list) => {
                write!(f, "(")?;
                let mut first = true;
                for expr in list {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", expr)?;
                    first = false;
                }
                write!(f, ")")
            }
            Sexpr::Procedure(procedure) => match procedure {
                Procedure::Primitive(_, name) => write!(f, "#<primitive:{}>", name),
                Procedure::Lambda(lambda) => {
                    write!(f, "#<lambda ({})>", lambda.params.join(" "))
                }
            },
        }
    }
}

pub type PrimitiveFunc = fn(Vec<Node>, Span) -> EvalResult;

/// A user-defined procedure: parameter names, the unevaluated body, and the
/// environment captured at the `lambda`. The environment handle is shared,
/// not copied, so `set!` in the defining scope stays visible to the closure.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Node,
    pub env: Rc<RefCell<Environment>>,
}

#[derive(Clone)] // Need Clone for Sexpr::Procedure
pub enum Procedure {
    Primitive(PrimitiveFunc, String), // The function pointer and its name (for display/debug)
    Lambda(Rc<Lambda>),
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Primitive(_, name) => write!(f, "Primitive({})", name),
            Procedure::Lambda(lambda) => write!(f, "Lambda({})", lambda.params.join(" ")),
        }
    }
}

// Function pointers don't implement PartialEq directly; primitives compare
// by name, lambdas by identity of the shared allocation.
impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Procedure::Primitive(_f1, n1), Procedure::Primitive(_f2, n2)) => n1 == n2,
            (Procedure::Lambda(l1), Procedure::Lambda(l2)) => Rc::ptr_eq(l1, l2),
            _ => false,
        }
    }
}
