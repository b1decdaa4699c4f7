//! 抽象语法树节点定义
//!
//! 每个表达式节点携带源码位置（1 起始的行列号），供编译器产出
//! 能精确定位到出错记号的诊断信息。节点一经解析即不可变。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 源码位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// 一元操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// 逻辑取反 `!`
    Not,
    /// 算术取负 `-`
    Minus,
    /// 按位取反 `^`
    BitNot,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Not => "!",
            Self::Minus => "-",
            Self::BitNot => "^",
        };
        write!(f, "{}", s)
    }
}

/// 二元操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// 模式匹配 `=~`
    Matches,
    /// 模式不匹配 `!~`
    NotMatches,
    In,
    NotIn,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Matches => "=~",
            Self::NotMatches => "!~",
            Self::In => "in",
            Self::NotIn => "not in",
        };
        write!(f, "{}", s)
    }
}

/// 表达式节点
///
/// 标识符不在解析期区分字段、宏和命名常量，三者共享同一命名空间，
/// 由编译器按宏、常量、字段的顺序解析。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    BoolLiteral {
        value: bool,
        pos: Position,
    },
    IntLiteral {
        value: i64,
        pos: Position,
    },
    StringLiteral {
        value: String,
        pos: Position,
    },
    Ident {
        name: String,
        pos: Position,
    },
    Array {
        elements: Vec<Expr>,
        pos: Position,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        pos: Position,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Position,
    },
}

impl Expr {
    /// 节点位置；二元 / 一元节点返回操作符记号的位置
    pub fn pos(&self) -> Position {
        match self {
            Self::BoolLiteral { pos, .. }
            | Self::IntLiteral { pos, .. }
            | Self::StringLiteral { pos, .. }
            | Self::Ident { pos, .. }
            | Self::Array { pos, .. }
            | Self::Unary { pos, .. }
            | Self::Binary { pos, .. } => *pos,
        }
    }
}

/// 规则：事件字段上的布尔表达式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub expr: Expr,
}

/// 宏：具名的可复用 AST 片段，数组字面量或布尔子表达式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    pub expr: Expr,
}
