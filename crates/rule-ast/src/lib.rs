//! 规则语言 AST 与解析器
//!
//! 提供安全规则语言的词法分析、语法分析和抽象语法树定义。
//! 规则引擎只消费这里产出的 AST，从不直接接触规则文本。

pub mod ast;
mod lexer;
pub mod parser;

pub use ast::{BinaryOp, Expr, Macro, Position, Rule, UnaryOp};
pub use parser::{ParseError, parse_macro, parse_rule};
