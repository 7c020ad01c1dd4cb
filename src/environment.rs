use crate::source::Span;
use crate::types::{Node, PrimitiveFunc};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("Unbound variable: '{0}'")]
    UnboundVariable(String, Span), // Symbol name, span where lookup happened
}

/// One frame of the lexical environment chain. Lookups walk outward through
/// `outer`; frames are shared behind `Rc<RefCell<...>>` so closures see
/// later mutations of the frames they captured.
#[derive(Debug, Default, PartialEq)]
pub struct Environment {
    bindings: HashMap<String, Node>,
    outer: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// Creates a new, empty global environment.
    pub fn new_global() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            bindings: HashMap::new(),
            outer: None,
        }))
    }

    /// Creates a new environment enclosed by an outer one.
    pub fn new_enclosed(outer: Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            bindings: HashMap::new(),
            outer: Some(outer),
        }))
    }

    /// Creates the frame for one procedure call, binding each parameter name
    /// to the corresponding argument. The caller has already checked that
    /// the two slices are the same length.
    pub fn new_call_frame(
        params: &[String],
        args: Vec<Node>,
        outer: Rc<RefCell<Environment>>,
    ) -> Rc<RefCell<Self>> {
        let env = Environment::new_enclosed(outer);
        for (param, arg) in params.iter().zip(args) {
            env.borrow_mut().define(param.clone(), arg);
        }
        env
    }

    /// Defines a variable in the *current* environment frame.
    /// Overwrites if the variable already exists in this frame.
    pub fn define(&mut self, name: String, value: Node) {
        self.bindings.insert(name, value);
    }

    /// Retrieves a variable's value, searching outwards through enclosing scopes.
    pub fn get(&self, name: &str, span: Span) -> Result<Node, EnvError> {
        match self.bindings.get(name) {
            Some(node) => Ok(node.clone()),
            None => match &self.outer {
                Some(outer_env) => outer_env.borrow().get(name, span),
                None => Err(EnvError::UnboundVariable(name.to_string(), span)),
            },
        }
    }

    /// Assigns a new value to an *existing* variable in the frame where it
    /// was defined, searching outwards. Assigning to a name that was never
    /// defined anywhere is an error.
    pub fn set(&mut self, name: &str, value: Node, span: Span) -> Result<(), EnvError> {
        if self.bindings.contains_key(name) {
            self.bindings.insert(name.to_string(), value);
            Ok(())
        } else {
            match &self.outer {
                Some(outer_env) => outer_env.borrow_mut().set(name, value, span),
                None => Err(EnvError::UnboundVariable(name.to_string(), span)),
            }
        }
    }

    /// Registers a primitive procedure under `name`.
    pub fn add_primitive(&mut self, name: &str, func: PrimitiveFunc) {
        self.define(
            name.to_string(),
            Node::new_primitive(func, name, Span::default()),
        );
    }

    /// Collects every identifier visible from this environment, innermost
    /// frames first. Used by the REPL for tab completion.
    pub fn get_identifiers(&self) -> HashSet<String> {
        let mut identifiers = HashSet::new();
        self.add_identifiers(&mut identifiers);
        identifiers
    }

    fn add_identifiers(&self, identifiers: &mut HashSet<String>) {
        for key in self.bindings.keys() {
            identifiers.insert(key.clone());
        }
        if let Some(outer_env) = &self.outer {
            outer_env.borrow().add_identifiers(identifiers);
        }
    }

    /// Creates the global environment with all the standard procedures and
    /// constants bound.
    pub fn new_global_populated() -> Rc<RefCell<Self>> {
        let env = Environment::new_global();
        {
            let mut env = env.borrow_mut();

            // Arithmetic
            env.add_primitive("+", crate::primitives::prim_add);
            env.add_primitive("-", crate::primitives::prim_sub);
            env.add_primitive("*", crate::primitives::prim_mul);
            env.add_primitive("/", crate::primitives::prim_div);

            // Comparison
            env.add_primitive(">", crate::primitives::prim_greater_than);
            env.add_primitive("<", crate::primitives::prim_less_than);
            env.add_primitive(">=", crate::primitives::prim_greater_than_or_equals);
            env.add_primitive("<=", crate::primitives::prim_less_than_or_equals);
            env.add_primitive("=", crate::primitives::prim_equals);
            env.add_primitive("equal?", crate::primitives::prim_is_equal);
            env.add_primitive("eq?", crate::primitives::prim_is_eq);

            // Lists
            env.add_primitive("cons", crate::primitives::prim_cons);
            env.add_primitive("car", crate::primitives::prim_car);
            env.add_primitive("cdr", crate::primitives::prim_cdr);
            env.add_primitive("append", crate::primitives::prim_append);
            env.add_primitive("list", crate::primitives::prim_list);
            env.add_primitive("length", crate::primitives::prim_length);
            env.add_primitive("null?", crate::primitives::prim_is_null);

            // Predicates
            env.add_primitive("number?", crate::primitives::prim_is_number);
            env.add_primitive("symbol?", crate::primitives::prim_is_symbol);
            env.add_primitive("procedure?", crate::primitives::prim_is_procedure);
            env.add_primitive("list?", crate::primitives::prim_is_list);
            env.add_primitive("not", crate::primitives::prim_not);

            // Higher-order
            env.add_primitive("apply", crate::primitives::prim_apply);
            env.add_primitive("map", crate::primitives::prim_map);
            env.add_primitive("begin", crate::primitives::prim_begin);

            // Math
            env.add_primitive("abs", crate::primitives::prim_abs);
            env.add_primitive("round", crate::primitives::prim_round);
            env.add_primitive("min", crate::primitives::prim_min);
            env.add_primitive("max", crate::primitives::prim_max);
            env.add_primitive("expt", crate::primitives::prim_expt);
            env.add_primitive("pow", crate::primitives::prim_expt);
            env.add_primitive("sqrt", crate::primitives::prim_sqrt);
            env.add_primitive("exp", crate::primitives::prim_exp);
            env.add_primitive("log", crate::primitives::prim_log);
            env.add_primitive("log10", crate::primitives::prim_log10);
            env.add_primitive("sin", crate::primitives::prim_sin);
            env.add_primitive("cos", crate::primitives::prim_cos);
            env.add_primitive("tan", crate::primitives::prim_tan);
            env.add_primitive("asin", crate::primitives::prim_asin);
            env.add_primitive("acos", crate::primitives::prim_acos);
            env.add_primitive("atan", crate::primitives::prim_atan);
            env.add_primitive("atan2", crate::primitives::prim_atan2);
            env.add_primitive("floor", crate::primitives::prim_floor);
            env.add_primitive("ceil", crate::primitives::prim_ceil);

            // Constants
            env.define(
                "pi".to_string(),
                Node::new_float(std::f64::consts::PI, Span::default()),
            );
            env.define(
                "e".to_string(),
                Node::new_float(std::f64::consts::E, Span::default()),
            );
            env.define(
                "tau".to_string(),
                Node::new_float(std::f64::consts::TAU, Span::default()),
            );
            env.define(
                "inf".to_string(),
                Node::new_float(f64::INFINITY, Span::default()),
            );
            env.define("nan".to_string(), Node::new_float(f64::NAN, Span::default()));
        }
        env
    }
}
