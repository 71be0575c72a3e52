use std::rc::Rc;

use crate::expr::Expr;
use crate::token::Token;

/// A function or method declaration.
///
/// Shared behind `Rc`: a function value aliases the declaration it was
/// created from, so one method declaration serves every bound instance.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(Expr),

    Print(Expr),

    Var(Token, Option<Expr>),

    /// Brace-delimited body of `if`/`while`/`for` (and desugaring glue):
    /// executes in the *current* scope, no new frame.
    Block(Vec<Stmt>),

    /// Free-standing `{ ... }` statement: executes in a freshly created
    /// child scope.
    ScopedBlock(Vec<Stmt>),

    If(Expr, Box<Stmt>, Option<Box<Stmt>>),

    While(Expr, Box<Stmt>),

    Function(Rc<FunctionDecl>),

    Return(Token, Option<Expr>),

    Class {
        name: Token,
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}
