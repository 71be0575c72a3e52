//! Tree-walking evaluator.
//!
//! Executes a statement list sequentially, threading one mutable
//! "current frame" pointer through a chained environment model.  Non-local
//! `return` is modelled as an explicit control-flow outcome ([`Flow`]) that
//! every statement-executing call site propagates and only the function-call
//! boundary consumes — never as an error or unwind.  All program output goes
//! through the `out` writer threaded down the evaluation calls.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::mem;
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId};
use crate::object::{LoxClass, LoxFunction, LoxInstance};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing one statement.
///
/// `Return` travels out through every enclosing block execution until the
/// function-call boundary that consumes it; frame pointers are restored along
/// the way exactly as on normal exits.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    /// Resolved-binding table: expression identity → lexical scope distance.
    /// Populated by the resolver before interpretation, read-only afterwards.
    locals: HashMap<ExprId, usize>,
}

impl Interpreter {
    /// Creates a new Interpreter and defines native functions such as `clock`.
    pub fn new() -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: |_args: &[Value]| {
                    let timestamp: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                        .as_secs_f64();

                    Ok(Value::Number(timestamp))
                },
            },
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
        }
    }

    /// Called by the resolver: record the scope distance for a resolvable
    /// expression node.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Interprets a list of statements (a "program").
    ///
    /// Returns the value of the last evaluated expression statement so the
    /// REPL can echo it; plain statements yield nil.
    pub fn interpret(&mut self, statements: &[Stmt], out: &mut dyn Write) -> Result<Value> {
        debug!("Interpreting {} statements", statements.len());

        let mut last = Value::Nil;

        for stmt in statements {
            match stmt {
                Stmt::Expression(expr) => {
                    last = self.evaluate(expr, out)?;
                }

                _ => {
                    last = Value::Nil;

                    if let Flow::Return(_) = self.execute(stmt, out)? {
                        // The resolver rejects top-level `return`; nothing to
                        // unwind to here.
                        break;
                    }
                }
            }
        }

        info!("Interpretation completed successfully");

        Ok(last)
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt, out: &mut dyn Write) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                let _ = self.evaluate(expr, out)?;

                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr, out)?;

                writeln!(out, "{}", value)?;

                Ok(Flow::Normal)
            }

            Stmt::Var(name, initializer) => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr, out)?,
                    None => Value::Nil,
                };

                debug!("Variable '{}' defined with value: {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                // Forced-brace body: runs in the current frame, no swap.
                for stmt in statements {
                    if let Flow::Return(value) = self.execute(stmt, out)? {
                        return Ok(Flow::Return(value));
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::ScopedBlock(statements) => {
                let child = Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, Rc::new(RefCell::new(child)), out)
            }

            Stmt::If(condition, then_branch, else_branch) => {
                let cond_value = self.evaluate(condition, out)?;

                if is_truthy(&cond_value) {
                    self.execute(then_branch, out)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt, out)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While(condition, body) => {
                loop {
                    let cond_value = self.evaluate(condition, out)?;

                    if !is_truthy(&cond_value) {
                        break;
                    }

                    if let Flow::Return(value) = self.execute(body, out)? {
                        return Ok(Flow::Return(value));
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                // The closure is the environment active at the point of
                // definition, not at any call site.
                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);

                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(function));

                Ok(Flow::Normal)
            }

            Stmt::Return(_keyword, expr) => {
                let value = match expr {
                    Some(e) => self.evaluate(e, out)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods, out),
        }
    }

    /// Executes statements in `environment`, restoring the previous frame
    /// pointer on every exit path — normal completion, an in-flight
    /// `Return`, or a runtime error.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
        out: &mut dyn Write,
    ) -> Result<Flow> {
        let previous = mem::replace(&mut self.environment, environment);

        let mut flow = Ok(Flow::Normal);

        for stmt in statements {
            match self.execute(stmt, out) {
                Ok(Flow::Normal) => {}

                other => {
                    flow = other;
                    break;
                }
            }
        }

        self.environment = previous;

        flow
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
        out: &mut dyn Write,
    ) -> Result<Flow> {
        debug!("Declaring class '{}'", name.lexeme);

        // The name is bound to nil first, then re-assigned once the class
        // value is complete.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr, out)? {
                Value::Class(class) => Some(class),

                _ => {
                    return Err(LoxError::runtime(
                        expr.line(),
                        "Superclass must be a class.",
                    ));
                }
            },

            None => None,
        };

        // Method closures see the class's defining environment and, with a
        // superclass, one extra frame binding `super`.
        let method_closure = match &superclass_value {
            Some(class) => {
                let mut frame = Environment::with_enclosing(Rc::clone(&self.environment));

                frame.define("super", Value::Class(Rc::clone(class)));

                Rc::new(RefCell::new(frame))
            }

            None => Rc::clone(&self.environment),
        };

        let mut method_table: HashMap<String, LoxFunction> = HashMap::new();

        for method in methods {
            let is_initializer = method.name.lexeme == "init";

            let function =
                LoxFunction::new(Rc::clone(method), Rc::clone(&method_closure), is_initializer);

            method_table.insert(method.name.lexeme.clone(), function);
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass_value, method_table);

        self.environment.borrow_mut().assign(
            &name.lexeme,
            Value::Class(Rc::new(class)),
            name.line,
        )?;

        Ok(Flow::Normal)
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr, out: &mut dyn Write) -> Result<Value> {
        match expr {
            Expr::Literal(token) => self.evaluate_literal(token),

            Expr::Grouping(inner) => self.evaluate(inner, out),

            Expr::Unary(op, right) => self.evaluate_unary(op, right, out),

            Expr::Binary(left, op, right) => self.evaluate_binary(left, op, right, out),

            Expr::Logical(left, op, right) => {
                let left_val = self.evaluate(left, out)?;

                // Short-circuit: the left value decides, and is itself the
                // result when the right side never runs.
                match op.token_type {
                    TokenType::OR if is_truthy(&left_val) => Ok(left_val),
                    TokenType::AND if !is_truthy(&left_val) => Ok(left_val),
                    _ => self.evaluate(right, out),
                }
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond_value = self.evaluate(condition, out)?;

                if is_truthy(&cond_value) {
                    self.evaluate(then_branch, out)
                } else {
                    self.evaluate(else_branch, out)
                }
            }

            Expr::Variable { name, id } => self.look_up_variable(name, *id),

            Expr::Assign { name, value, id } => {
                let val = self.evaluate(value, out)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            val.clone(),
                            name.line,
                        )?;
                    }

                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(&name.lexeme, val.clone(), name.line)?;
                    }
                }

                Ok(val)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee, out)?;

                let mut arg_values = Vec::with_capacity(arguments.len());

                for arg in arguments {
                    arg_values.push(self.evaluate(arg, out)?);
                }

                self.invoke_callable(&callee_val, paren, &arg_values, out)
            }

            Expr::Get { object, name } => {
                let object_val = self.evaluate(object, out)?;

                match object_val {
                    Value::Instance(instance) => instance.get(&name.lexeme).ok_or_else(|| {
                        LoxError::runtime(
                            name.line,
                            format!("Undefined property '{}'.", name.lexeme),
                        )
                    }),

                    _ => Err(LoxError::runtime(
                        name.line,
                        "Only instances have properties.",
                    )),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object_val = self.evaluate(object, out)?;

                match object_val {
                    Value::Instance(instance) => {
                        let val = self.evaluate(value, out)?;

                        instance.set(&name.lexeme, val.clone());

                        Ok(val)
                    }

                    _ => Err(LoxError::runtime(name.line, "Only instances have fields.")),
                }
            }

            Expr::This { keyword, id } => self.look_up_variable(keyword, *id),

            Expr::Super {
                keyword,
                method,
                id,
            } => self.evaluate_super(keyword, method, *id),
        }
    }

    /// Evaluates a literal token.
    fn evaluate_literal(&self, token: &Token) -> Result<Value> {
        let val = match &token.token_type {
            TokenType::NUMBER(n) => Value::Number(*n),
            TokenType::STRING(s) => Value::String(s.clone()),
            TokenType::TRUE => Value::Bool(true),
            TokenType::FALSE => Value::Bool(false),
            TokenType::NIL => Value::Nil,

            _ => {
                return Err(LoxError::runtime(token.line, "Invalid literal"));
            }
        };

        Ok(val)
    }

    /// Evaluates a unary expression.
    fn evaluate_unary(&mut self, op: &Token, expr: &Expr, out: &mut dyn Write) -> Result<Value> {
        let right_val = self.evaluate(expr, out)?;

        match op.token_type {
            TokenType::MINUS => {
                if let Value::Number(n) = right_val {
                    Ok(Value::Number(-n))
                } else {
                    Err(LoxError::runtime(
                        op.line,
                        "Expected operand to be a number.",
                    ))
                }
            }

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_val))),

            _ => Err(LoxError::runtime(op.line, "Invalid unary operator")),
        }
    }

    /// Evaluates a binary expression (both operands eager, left first).
    fn evaluate_binary(
        &mut self,
        left: &Expr,
        op: &Token,
        right: &Expr,
        out: &mut dyn Write,
    ) -> Result<Value> {
        let left_val = self.evaluate(left, out)?;
        let right_val = self.evaluate(right, out)?;

        match op.token_type {
            // The comma operator: both sides evaluated, right one wins.
            TokenType::COMMA => Ok(right_val),

            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    op.line,
                    "Expected operands to both be numbers or both be strings",
                )),
            },

            TokenType::MINUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(number_operands_error(op)),
            },

            TokenType::STAR => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(number_operands_error(op)),
            },

            TokenType::SLASH => match (left_val, right_val) {
                // IEEE semantics: division by zero yields an infinity.
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
                _ => Err(number_operands_error(op)),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            TokenType::LESS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
                _ => Err(number_operands_error(op)),
            },

            TokenType::LESS_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
                _ => Err(number_operands_error(op)),
            },

            TokenType::GREATER => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
                _ => Err(number_operands_error(op)),
            },

            TokenType::GREATER_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(number_operands_error(op)),
            },

            _ => Err(LoxError::runtime(op.line, "Invalid binary operator")),
        }
    }

    /// Resolved lookup when the resolver found the name; global fallback
    /// otherwise.
    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, &name.lexeme, name.line)
            }

            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }

    fn evaluate_super(&mut self, keyword: &Token, method: &Token, id: ExprId) -> Result<Value> {
        let distance = self.locals.get(&id).copied().ok_or_else(|| {
            LoxError::runtime(keyword.line, "Cannot use 'super' outside of a method.")
        })?;

        let superclass = match Environment::get_at(
            &self.environment,
            distance,
            "super",
            keyword.line,
        )? {
            Value::Class(class) => class,

            _ => {
                return Err(LoxError::runtime(keyword.line, "Superclass must be a class."));
            }
        };

        // `this` sits one frame below the `super` binding.
        let object = match Environment::get_at(
            &self.environment,
            distance.saturating_sub(1),
            "this",
            keyword.line,
        )? {
            Value::Instance(instance) => instance,

            _ => {
                return Err(LoxError::runtime(
                    keyword.line,
                    "Cannot use 'super' outside of a method.",
                ));
            }
        };

        // Lookup starts at the statically known superclass, never at the
        // receiver's own class.
        let found = superclass.find_method(&method.lexeme).ok_or_else(|| {
            LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
        })?;

        Ok(Value::Function(found.bind(&object)))
    }

    /// Invokes a callable (native function, user function, or class).
    fn invoke_callable(
        &mut self,
        callee_val: &Value,
        paren: &Token,
        arg_values: &[Value],
        out: &mut dyn Write,
    ) -> Result<Value> {
        match callee_val {
            // A nil callee is its own error, distinct from "not callable".
            Value::Nil => Err(LoxError::runtime(paren.line, "Cannot call a nil value.")),

            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                check_arity(*arity, arg_values.len(), paren)?;

                func(arg_values).map_err(|msg| LoxError::runtime(paren.line, msg))
            }

            Value::Function(function) => {
                debug!("Calling user-defined function '{}'", function.name());

                check_arity(function.arity(), arg_values.len(), paren)?;

                function.call(self, arg_values, out)
            }

            Value::Class(class) => {
                debug!("Instantiating class '{}'", class.name);

                check_arity(class.arity(), arg_values.len(), paren)?;

                let instance = LoxInstance::new(Rc::clone(class));

                if let Some(initializer) = class.find_method("init") {
                    initializer.bind(&instance).call(self, arg_values, out)?;
                }

                Ok(Value::Instance(instance))
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Truthy: any value except nil and boolean false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

fn number_operands_error(op: &Token) -> LoxError {
    LoxError::runtime(op.line, "Expected operands to be numbers.")
}

/// An arity mismatch names the expected and actual counts.
fn check_arity(expected: usize, actual: usize, paren: &Token) -> Result<()> {
    if expected != actual {
        return Err(LoxError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}.", expected, actual),
        ));
    }

    Ok(())
}
