//! 事件数据模型绑定接口
//!
//! Model 把点分字段名解析为带类型的求值器及其类别标签，并持有当前被求值的
//! 事件实例。事件归调用方所有，Model 只保留可重绑的非拥有引用；
//! 重绑不做内部同步，每个并发求值流使用各自的 Model 实例。

use crate::evaluator::{BoolEvaluator, IntEvaluator, StringEvaluator, ValueKind};

/// 按操作数类型区分的求值器变体
#[derive(Debug)]
pub enum TypedEvaluator {
    Bool(BoolEvaluator),
    Int(IntEvaluator),
    String(StringEvaluator),
}

impl TypedEvaluator {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::String(_) => ValueKind::String,
        }
    }
}

/// 字段解析结果：求值器加该字段所属的非空类别标签列表
#[derive(Debug)]
pub struct FieldResolution {
    pub evaluator: TypedEvaluator,
    /// 类别标签，例如 "process"、"fs"
    pub tags: Vec<String>,
}

/// 数据模型能力契约
///
/// 编译期，编译器对规则里每个不同的字段引用恰好调用一次 [`resolve`](Model::resolve)；
/// 求值期，解析出的求值器读取当前绑定的事件。
pub trait Model {
    /// 绑定的具体事件类型，由各子系统（进程 / 文件 / 网络）自行定义
    type Event;

    /// 替换当前绑定的事件实例；可反复调用，内部可变性由实现负责
    fn bind(&self, event: Self::Event);

    /// 解析字段名；返回 `None` 表示该 Model 不认识此字段
    fn resolve(&self, field: &str) -> Option<FieldResolution>;
}
