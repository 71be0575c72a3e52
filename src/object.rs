//! Runtime object model: user functions, classes, and instances.
//!
//! All three are cheap shared handles.  A function value shares its
//! declaration AST with the `fun`/method statement that produced it and keeps
//! the environment active at its point of definition alive as its closure.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::environment::Environment;
use crate::error::Result;
use crate::interpreter::{Flow, Interpreter};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// A user-defined function or method value.
#[derive(Debug, Clone)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Produce a bound method: same declaration, same defining environment,
    /// wrapped in one extra frame fixing `this` to the receiver.
    pub fn bind(&self, instance: &LoxInstance) -> LoxFunction {
        let mut frame = Environment::with_enclosing(Rc::clone(&self.closure));

        frame.define("this", Value::Instance(instance.clone()));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(frame)),
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke the function.  The call frame's parent is the *closure*
    /// captured at definition time, never the caller's frame.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: &[Value],
        out: &mut dyn Write,
    ) -> Result<Value> {
        debug!(
            "Calling function '{}' with {} argument(s)",
            self.name(),
            arguments.len()
        );

        let mut frame = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments.iter()) {
            frame.define(&param.lexeme, argument.clone());
        }

        let flow = interpreter.execute_block(
            &self.declaration.body,
            Rc::new(RefCell::new(frame)),
            out,
        )?;

        if self.is_initializer {
            // `init` always yields the constructed instance, whatever its
            // body returned.  The bound frame holds `this` at distance 0.
            return Environment::get_at(&self.closure, 0, "this", self.declaration.name.line);
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }

    pub fn ptr_eq(&self, other: &LoxFunction) -> bool {
        Rc::ptr_eq(&self.declaration, &other.declaration)
            && Rc::ptr_eq(&self.closure, &other.closure)
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// A class value: name, optional superclass, method table.
#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, LoxFunction>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, LoxFunction>,
    ) -> Self {
        LoxClass {
            name,
            superclass,
            methods,
        }
    }

    /// Look up a method, walking the superclass chain until found or
    /// exhausted.
    pub fn find_method(&self, name: &str) -> Option<LoxFunction> {
        match self.methods.get(name) {
            Some(method) => Some(method.clone()),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    /// Arity of a class call: the initializer's, or zero without one.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug)]
struct InstanceCore {
    class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

/// An instance value: shared class reference plus an owned, lazily populated
/// field table.
#[derive(Debug, Clone)]
pub struct LoxInstance {
    core: Rc<RefCell<InstanceCore>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        LoxInstance {
            core: Rc::new(RefCell::new(InstanceCore {
                class,
                fields: HashMap::new(),
            })),
        }
    }

    /// Property read: own field first, then a method from the class table,
    /// bound to this receiver.
    pub fn get(&self, name: &str) -> Option<Value> {
        let core = self.core.borrow();

        if let Some(field) = core.fields.get(name) {
            return Some(field.clone());
        }

        core.class
            .find_method(name)
            .map(|method| Value::Function(method.bind(self)))
    }

    /// Property write: unconditionally writes the field table.  Never
    /// consults the method table, so a field can shadow a method name.
    pub fn set(&self, name: &str, value: Value) {
        self.core
            .borrow_mut()
            .fields
            .insert(name.to_string(), value);
    }

    pub fn class(&self) -> Rc<LoxClass> {
        Rc::clone(&self.core.borrow().class)
    }

    pub fn ptr_eq(&self, other: &LoxInstance) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.core.borrow().class.name)
    }
}
