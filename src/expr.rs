use serde::Serialize;

use crate::token::Token;

/// Identity of a resolvable expression node.
///
/// The parser stamps a fresh id on every `Variable`, `Assign`, `This` and
/// `Super` node; the resolver keys its binding-distance table off these ids.
/// Ids are unique across every parse fed to one interpreter — the REPL driver
/// threads the next free id into each submission's parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExprId(pub usize);

/// Expression AST node. Each node is an immutable tree, owned by whichever
/// statement or parent expression holds it.
#[derive(Debug, Clone, Serialize)]
pub enum Expr {
    /// A literal constant token: number, string, `true`, `false`, or `nil`.
    Literal(Token),

    /// Parenthesized grouped expression.
    Grouping(Box<Expr>),

    /// Prefix unary operator expression: `!x`, `-x`.
    Unary(Token, Box<Expr>),

    /// Infix binary operator expression. The comma operator is a `Binary`
    /// whose operator token is `COMMA`.
    Binary(Box<Expr>, Token, Box<Expr>),

    /// Short-circuiting `and` / `or`.
    Logical(Box<Expr>, Token, Box<Expr>),

    /// Ternary conditional `condition ? then : else`.
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Variable reference.
    Variable { name: Token, id: ExprId },

    /// Assignment expression: `name = value`.
    Assign {
        name: Token,
        value: Box<Expr>,
        id: ExprId,
    },

    /// Call expression. The closing `)` token is retained for error reporting.
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// Property access: `object.name`.
    Get { object: Box<Expr>, name: Token },

    /// Property assignment: `object.name = value`.
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { keyword: Token, id: ExprId },

    /// `super.method` inside a subclass method.
    Super {
        keyword: Token,
        method: Token,
        id: ExprId,
    },
}

impl Expr {
    /// Source line of the node, for diagnostics.
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal(token) => token.line,

            Expr::Grouping(expr) => expr.line(),

            Expr::Unary(token, _) => token.line,

            Expr::Binary(_, token, _) => token.line,

            Expr::Logical(_, token, _) => token.line,

            Expr::Conditional { condition, .. } => condition.line(),

            Expr::Variable { name, .. } => name.line,

            Expr::Assign { name, .. } => name.line,

            Expr::Call { paren, .. } => paren.line,

            Expr::Get { name, .. } => name.line,

            Expr::Set { name, .. } => name.line,

            Expr::This { keyword, .. } => keyword.line,

            Expr::Super { keyword, .. } => keyword.line,
        }
    }
}
