//! 安全策略表达式引擎
//!
//! 把规则语言 AST 静态类型检查并编译成可执行求值树，支持：
//! - 字段通过可插拔 Model 解析（进程 / 文件系统等子系统各自实现事件绑定）
//! - 比较、位运算、逻辑、模式匹配、集合成员操作符
//! - 宏的编译期内联展开与循环检测
//! - 规则触及的字段类别标签收集
//! - 基于三值部分求值的判别字段分析
//!
//! 编译是一次性的同步 CPU 操作；编译产物不可变，
//! 每个并发求值流使用各自的 Model 实例与 Context。

pub mod compiler;
pub mod constants;
pub mod error;
pub mod evaluator;
pub mod model;
mod operators;
mod partial;

pub use compiler::{MacroSet, RuleEvaluator, compile};
pub use error::{Result, RuleError};
pub use evaluator::{
    BoolEvalFn, BoolEvaluator, Context, IntEvalFn, IntEvaluator, StringEvalFn, StringEvaluator,
    ValueKind,
};
pub use model::{FieldResolution, Model, TypedEvaluator};
