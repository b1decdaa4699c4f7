//! 带类型的求值器节点
//!
//! 每个求值器同时携带快速求值闭包和调试求值闭包，两者在构造时成对给出，
//! 对任意输入产生一致的结果；调试路径额外经 `tracing` 输出带嵌套深度的求值轨迹。
//! 操作数类型在编译期定死，编译之后不会再变。

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// 每次求值的临时上下文
///
/// 只保存调试轨迹所需的嵌套深度，不含任何规则级状态；
/// 同一个 Context 可在调试 / 非调试两种求值以及判别字段查询之间复用。
#[derive(Debug, Default)]
pub struct Context {
    depth: Cell<u32>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&self) -> u32 {
        let depth = self.depth.get();
        self.depth.set(depth + 1);
        depth
    }

    pub(crate) fn leave(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// 布尔求值闭包；`Rc` 而非 `Arc`：每个并发求值流一个 Model 实例与编译产物
pub type BoolEvalFn = Rc<dyn Fn(&Context) -> bool>;
/// 整型求值闭包
pub type IntEvalFn = Rc<dyn Fn(&Context) -> i64>;
/// 字符串求值闭包
pub type StringEvalFn = Rc<dyn Fn(&Context) -> String>;

/// 操作数类型标签，编译器据此做穷举分派
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    String,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::String => "string",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 布尔求值器
///
/// `field` 是节点源出的字段名：Model 解析出的字段叶子为 `Some`，
/// 字面量与复合节点为 `None`。
pub struct BoolEvaluator {
    pub eval: BoolEvalFn,
    pub debug_eval: BoolEvalFn,
    pub field: Option<String>,
}

/// 整型求值器
pub struct IntEvaluator {
    pub eval: IntEvalFn,
    pub debug_eval: IntEvalFn,
    pub field: Option<String>,
}

/// 字符串求值器
pub struct StringEvaluator {
    pub eval: StringEvalFn,
    pub debug_eval: StringEvalFn,
    pub field: Option<String>,
}

impl fmt::Debug for BoolEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoolEvaluator").field("field", &self.field).finish()
    }
}

impl fmt::Debug for IntEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntEvaluator").field("field", &self.field).finish()
    }
}

impl fmt::Debug for StringEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringEvaluator").field("field", &self.field).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_depth() {
        let ctx = Context::new();
        assert_eq!(ctx.enter(), 0);
        assert_eq!(ctx.enter(), 1);
        ctx.leave();
        assert_eq!(ctx.enter(), 1);
        ctx.leave();
        ctx.leave();
        // 深度不会下溢
        ctx.leave();
        assert_eq!(ctx.enter(), 0);
    }

    #[test]
    fn test_value_kind_display() {
        assert_eq!(ValueKind::Bool.to_string(), "bool");
        assert_eq!(ValueKind::Int.to_string(), "int");
        assert_eq!(ValueKind::String.to_string(), "string");
    }
}
