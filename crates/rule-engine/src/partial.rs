//! 判别字段分析：三值部分求值
//!
//! 对编译出的布尔树做一次三值解释：仅引用目标字段的比较叶子取其具体布尔值，
//! 引用了其它字段的叶子一律视为未决（Unresolved），字面量保持具体值。
//! 组合子按支配律保守传播：AND 遇 False 即 False，OR 遇 True 即 True，
//! NOT 翻转确定值、保持未决。
//!
//! 根结果为确定的 False 时，目标字段就是判别字段：其它字段随便取什么值，
//! 该字段当前的观测值都已足以使规则落空，可据此提前丢弃事件。

use crate::evaluator::{BoolEvalFn, Context};

/// 三值逻辑结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ternary {
    True,
    False,
    Unresolved,
}

impl From<bool> for Ternary {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl Ternary {
    pub(crate) fn and(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, Self::True) => Self::True,
            _ => Self::Unresolved,
        }
    }

    pub(crate) fn or(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::False, Self::False) => Self::False,
            _ => Self::Unresolved,
        }
    }

    pub(crate) fn not(self) -> Ternary {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unresolved => Self::Unresolved,
        }
    }
}

/// 部分求值树：与求值闭包平行的结构骨架，编译期搭好
pub(crate) enum PartialNode {
    /// 布尔字面量
    Literal(bool),
    /// 比较叶子或裸布尔字段；`fields` 是叶子两侧操作数触及字段的并集，
    /// `eval` 与快速求值路径共享同一闭包
    Leaf {
        fields: Vec<String>,
        eval: BoolEvalFn,
    },
    Not(Box<PartialNode>),
    And(Box<PartialNode>, Box<PartialNode>),
    Or(Box<PartialNode>, Box<PartialNode>),
}

impl PartialNode {
    /// 以 `target` 为未决字段做三值求值
    pub(crate) fn eval_with(&self, ctx: &Context, target: &str) -> Ternary {
        match self {
            Self::Literal(value) => (*value).into(),
            Self::Leaf { fields, eval } => {
                // 叶子只涉及目标字段（含无字段的常量比较）时取具体值，
                // 否则视为未决
                if fields.iter().all(|f| f == target) {
                    eval(ctx).into()
                } else {
                    Ternary::Unresolved
                }
            }
            Self::Not(inner) => inner.eval_with(ctx, target).not(),
            Self::And(a, b) => a.eval_with(ctx, target).and(b.eval_with(ctx, target)),
            Self::Or(a, b) => a.eval_with(ctx, target).or(b.eval_with(ctx, target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Ternary::*;
    use super::*;
    use std::rc::Rc;

    const ALL: [Ternary; 3] = [True, False, Unresolved];

    #[test]
    fn test_and_dominance() {
        // False 支配 AND
        for v in ALL {
            assert_eq!(False.and(v), False);
            assert_eq!(v.and(False), False);
        }
        assert_eq!(True.and(True), True);
        assert_eq!(True.and(Unresolved), Unresolved);
        assert_eq!(Unresolved.and(True), Unresolved);
        assert_eq!(Unresolved.and(Unresolved), Unresolved);
    }

    #[test]
    fn test_or_dominance() {
        // True 支配 OR
        for v in ALL {
            assert_eq!(True.or(v), True);
            assert_eq!(v.or(True), True);
        }
        assert_eq!(False.or(False), False);
        assert_eq!(False.or(Unresolved), Unresolved);
        assert_eq!(Unresolved.or(False), Unresolved);
        assert_eq!(Unresolved.or(Unresolved), Unresolved);
    }

    #[test]
    fn test_not() {
        assert_eq!(True.not(), False);
        assert_eq!(False.not(), True);
        assert_eq!(Unresolved.not(), Unresolved);
    }

    fn leaf(fields: &[&str], value: bool) -> PartialNode {
        PartialNode::Leaf {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            eval: Rc::new(move |_| value),
        }
    }

    #[test]
    fn test_leaf_valuation() {
        let ctx = Context::new();
        // 仅目标字段：取具体值
        assert_eq!(leaf(&["a"], true).eval_with(&ctx, "a"), True);
        assert_eq!(leaf(&["a"], false).eval_with(&ctx, "a"), False);
        // 其它字段：未决
        assert_eq!(leaf(&["b"], true).eval_with(&ctx, "a"), Unresolved);
        // 混合字段的比较（如字段对字段）：未决
        assert_eq!(leaf(&["a", "b"], true).eval_with(&ctx, "a"), Unresolved);
        // 两侧都是目标字段：取具体值
        assert_eq!(leaf(&["a", "a"], false).eval_with(&ctx, "a"), False);
        // 常量比较：取具体值
        assert_eq!(leaf(&[], true).eval_with(&ctx, "a"), True);
    }

    #[test]
    fn test_false_branch_under_negation() {
        let ctx = Context::new();
        // !(未决 && false) == True：字面量穿过支配律，而非整棵子树一刀切
        let node = PartialNode::Not(Box::new(PartialNode::And(
            Box::new(leaf(&["b"], true)),
            Box::new(PartialNode::Literal(false)),
        )));
        assert_eq!(node.eval_with(&ctx, "a"), True);
    }
}
