//! 规则引擎错误类型
//!
//! 除判别字段查询外，所有错误都在编译期检出；编译成功的规则求值永不失败。

use rule_ast::Position;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    /// 字段在当前 Model 中无法解析。
    /// 编译期携带出错标识符的位置；判别字段查询期没有位置信息。
    #[error("字段不存在: {field}")]
    FieldNotFound {
        field: String,
        pos: Option<Position>,
    },

    /// 操作符作用于不兼容类型的操作数，位置指向不匹配的那个操作数
    #[error("类型错误 ({pos}): 期望 {expected} 类型操作数")]
    TypeError { pos: Position, expected: String },

    /// 宏引用成环
    #[error("宏 `{name}` 展开失败 ({pos}): {reason}")]
    MacroResolution {
        name: String,
        pos: Position,
        reason: String,
    },

    /// `=~` / `!~` 的模式在编译期无法编译为正则
    #[error("无效的匹配模式 `{pattern}` ({pos}): {source}")]
    RegexCompile {
        pattern: String,
        pos: Position,
        source: regex::Error,
    },
}

impl RuleError {
    /// 错误关联的源码位置，供诊断工具在出错记号下划线
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::FieldNotFound { pos, .. } => *pos,
            Self::TypeError { pos, .. }
            | Self::MacroResolution { pos, .. }
            | Self::RegexCompile { pos, .. } => Some(*pos),
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
