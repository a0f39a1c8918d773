//! Syntax tree and runtime values of the generated output language.

mod expression;
mod statement;
mod value;

pub use expression::{BinaryOp, Expr, LogicalOp, UnaryOp};
pub use statement::{AssignOp, FunctionDecl, Program, Stmt, Target};
pub use value::{Value, format_number};
