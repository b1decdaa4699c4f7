//! 操作符语义
//!
//! 编译期的节点构造函数。每个构造同时产出快速 / 调试两条求值闭包
//! （调试路径经 `tracing` 输出带嵌套深度的轨迹），并为布尔节点搭好
//! 判别字段分析所需的部分求值骨架。节点的操作数类型在此定死。

use crate::evaluator::{BoolEvalFn, IntEvalFn, StringEvalFn};
use crate::partial::PartialNode;
use regex::Regex;
use std::rc::Rc;
use tracing::{trace, warn};

/// 编译期内部的布尔节点
pub(crate) struct BoolNode {
    pub(crate) eval: BoolEvalFn,
    pub(crate) debug_eval: BoolEvalFn,
    /// 子树触及的字段并集
    pub(crate) fields: Vec<String>,
    pub(crate) partial: PartialNode,
}

/// 编译期内部的整型节点
pub(crate) struct IntNode {
    pub(crate) eval: IntEvalFn,
    pub(crate) debug_eval: IntEvalFn,
    pub(crate) fields: Vec<String>,
}

/// 编译期内部的字符串节点
pub(crate) struct StrNode {
    pub(crate) eval: StringEvalFn,
    pub(crate) debug_eval: StringEvalFn,
    pub(crate) fields: Vec<String>,
    /// 字面量节点保留原文，供 `=~` 在编译期预编译模式
    pub(crate) literal: Option<String>,
}

fn merge_fields(a: &[String], b: &[String]) -> Vec<String> {
    let mut merged = a.to_vec();
    for field in b {
        if !merged.contains(field) {
            merged.push(field.clone());
        }
    }
    merged
}

/// 把通配模式翻译为锚定正则：`*` 匹配任意串
pub(crate) fn pattern_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^{}$", pattern.replace('*', ".*")))
}

// ============================================================================
// 字面量与字段叶子
// ============================================================================

pub(crate) fn bool_literal(value: bool) -> BoolNode {
    let eval: BoolEvalFn = Rc::new(move |_| value);
    BoolNode {
        eval: eval.clone(),
        debug_eval: eval,
        fields: Vec::new(),
        partial: PartialNode::Literal(value),
    }
}

pub(crate) fn int_literal(value: i64) -> IntNode {
    let eval: IntEvalFn = Rc::new(move |_| value);
    IntNode {
        eval: eval.clone(),
        debug_eval: eval,
        fields: Vec::new(),
    }
}

pub(crate) fn str_literal(value: String) -> StrNode {
    let literal = value.clone();
    let eval: StringEvalFn = Rc::new(move |_| value.clone());
    StrNode {
        eval: eval.clone(),
        debug_eval: eval,
        fields: Vec::new(),
        literal: Some(literal),
    }
}

pub(crate) fn bool_field(
    eval: BoolEvalFn,
    debug_eval: BoolEvalFn,
    field: String,
) -> BoolNode {
    BoolNode {
        // 裸布尔字段本身就是一个比较叶子
        partial: PartialNode::Leaf {
            fields: vec![field.clone()],
            eval: eval.clone(),
        },
        eval,
        debug_eval,
        fields: vec![field],
    }
}

pub(crate) fn int_field(eval: IntEvalFn, debug_eval: IntEvalFn, field: String) -> IntNode {
    IntNode {
        eval,
        debug_eval,
        fields: vec![field],
    }
}

pub(crate) fn str_field(eval: StringEvalFn, debug_eval: StringEvalFn, field: String) -> StrNode {
    StrNode {
        eval,
        debug_eval,
        fields: vec![field],
        literal: None,
    }
}

// ============================================================================
// 逻辑组合子：保留结构，短路求值
// ============================================================================

pub(crate) fn bool_and(a: BoolNode, b: BoolNode) -> BoolNode {
    let fields = merge_fields(&a.fields, &b.fields);
    let eval: BoolEvalFn = {
        let (ae, be) = (a.eval, b.eval);
        Rc::new(move |ctx| ae(ctx) && be(ctx))
    };
    let debug_eval: BoolEvalFn = {
        let (ad, bd) = (a.debug_eval, b.debug_eval);
        Rc::new(move |ctx| {
            let depth = ctx.enter();
            let result = ad(ctx) && bd(ctx);
            ctx.leave();
            trace!(depth, op = "&&", result, "求值");
            result
        })
    };
    BoolNode {
        eval,
        debug_eval,
        fields,
        partial: PartialNode::And(Box::new(a.partial), Box::new(b.partial)),
    }
}

pub(crate) fn bool_or(a: BoolNode, b: BoolNode) -> BoolNode {
    let fields = merge_fields(&a.fields, &b.fields);
    let eval: BoolEvalFn = {
        let (ae, be) = (a.eval, b.eval);
        Rc::new(move |ctx| ae(ctx) || be(ctx))
    };
    let debug_eval: BoolEvalFn = {
        let (ad, bd) = (a.debug_eval, b.debug_eval);
        Rc::new(move |ctx| {
            let depth = ctx.enter();
            let result = ad(ctx) || bd(ctx);
            ctx.leave();
            trace!(depth, op = "||", result, "求值");
            result
        })
    };
    BoolNode {
        eval,
        debug_eval,
        fields,
        partial: PartialNode::Or(Box::new(a.partial), Box::new(b.partial)),
    }
}

pub(crate) fn bool_not(a: BoolNode) -> BoolNode {
    let eval: BoolEvalFn = {
        let ae = a.eval;
        Rc::new(move |ctx| !ae(ctx))
    };
    let debug_eval: BoolEvalFn = {
        let ad = a.debug_eval;
        Rc::new(move |ctx| {
            let depth = ctx.enter();
            let result = !ad(ctx);
            ctx.leave();
            trace!(depth, op = "!", result, "求值");
            result
        })
    };
    BoolNode {
        eval,
        debug_eval,
        fields: a.fields,
        partial: PartialNode::Not(Box::new(a.partial)),
    }
}

// ============================================================================
// 比较：产出叶子，不保留子结构
// ============================================================================

pub(crate) fn int_compare(
    op: &'static str,
    a: IntNode,
    b: IntNode,
    cmp: fn(i64, i64) -> bool,
) -> BoolNode {
    let fields = merge_fields(&a.fields, &b.fields);
    let eval: BoolEvalFn = {
        let (ae, be) = (a.eval, b.eval);
        Rc::new(move |ctx| cmp(ae(ctx), be(ctx)))
    };
    let debug_eval: BoolEvalFn = {
        let (ad, bd) = (a.debug_eval, b.debug_eval);
        Rc::new(move |ctx| {
            let depth = ctx.enter();
            let result = cmp(ad(ctx), bd(ctx));
            ctx.leave();
            trace!(depth, op, result, "求值");
            result
        })
    };
    BoolNode {
        partial: PartialNode::Leaf {
            fields: fields.clone(),
            eval: eval.clone(),
        },
        eval,
        debug_eval,
        fields,
    }
}

pub(crate) fn str_compare(
    op: &'static str,
    a: StrNode,
    b: StrNode,
    cmp: fn(&str, &str) -> bool,
) -> BoolNode {
    let fields = merge_fields(&a.fields, &b.fields);
    let eval: BoolEvalFn = {
        let (ae, be) = (a.eval, b.eval);
        Rc::new(move |ctx| cmp(&ae(ctx), &be(ctx)))
    };
    let debug_eval: BoolEvalFn = {
        let (ad, bd) = (a.debug_eval, b.debug_eval);
        Rc::new(move |ctx| {
            let depth = ctx.enter();
            let result = cmp(&ad(ctx), &bd(ctx));
            ctx.leave();
            trace!(depth, op, result, "求值");
            result
        })
    };
    BoolNode {
        partial: PartialNode::Leaf {
            fields: fields.clone(),
            eval: eval.clone(),
        },
        eval,
        debug_eval,
        fields,
    }
}

pub(crate) fn bool_compare(
    op: &'static str,
    a: BoolNode,
    b: BoolNode,
    cmp: fn(bool, bool) -> bool,
) -> BoolNode {
    let fields = merge_fields(&a.fields, &b.fields);
    let eval: BoolEvalFn = {
        let (ae, be) = (a.eval, b.eval);
        Rc::new(move |ctx| cmp(ae(ctx), be(ctx)))
    };
    let debug_eval: BoolEvalFn = {
        let (ad, bd) = (a.debug_eval, b.debug_eval);
        Rc::new(move |ctx| {
            let depth = ctx.enter();
            let result = cmp(ad(ctx), bd(ctx));
            ctx.leave();
            trace!(depth, op, result, "求值");
            result
        })
    };
    BoolNode {
        partial: PartialNode::Leaf {
            fields: fields.clone(),
            eval: eval.clone(),
        },
        eval,
        debug_eval,
        fields,
    }
}

// ============================================================================
// 整型算术 / 位运算
// ============================================================================

pub(crate) fn int_bitwise(
    op: &'static str,
    a: IntNode,
    b: IntNode,
    apply: fn(i64, i64) -> i64,
) -> IntNode {
    let fields = merge_fields(&a.fields, &b.fields);
    let eval: IntEvalFn = {
        let (ae, be) = (a.eval, b.eval);
        Rc::new(move |ctx| apply(ae(ctx), be(ctx)))
    };
    let debug_eval: IntEvalFn = {
        let (ad, bd) = (a.debug_eval, b.debug_eval);
        Rc::new(move |ctx| {
            let depth = ctx.enter();
            let result = apply(ad(ctx), bd(ctx));
            ctx.leave();
            trace!(depth, op, result, "求值");
            result
        })
    };
    IntNode {
        eval,
        debug_eval,
        fields,
    }
}

pub(crate) fn int_unary(op: &'static str, a: IntNode, apply: fn(i64) -> i64) -> IntNode {
    let eval: IntEvalFn = {
        let ae = a.eval;
        Rc::new(move |ctx| apply(ae(ctx)))
    };
    let debug_eval: IntEvalFn = {
        let ad = a.debug_eval;
        Rc::new(move |ctx| {
            let depth = ctx.enter();
            let result = apply(ad(ctx));
            ctx.leave();
            trace!(depth, op, result, "求值");
            result
        })
    };
    IntNode {
        eval,
        debug_eval,
        fields: a.fields,
    }
}

// ============================================================================
// 集合成员与模式匹配
// ============================================================================

pub(crate) fn int_in(a: IntNode, values: Vec<i64>, negate: bool) -> BoolNode {
    let op = if negate { "not in" } else { "in" };
    let fields = a.fields.clone();
    let eval: BoolEvalFn = {
        let ae = a.eval;
        let values = values.clone();
        Rc::new(move |ctx| values.contains(&ae(ctx)) != negate)
    };
    let debug_eval: BoolEvalFn = {
        let ad = a.debug_eval;
        Rc::new(move |ctx| {
            let depth = ctx.enter();
            let result = values.contains(&ad(ctx)) != negate;
            ctx.leave();
            trace!(depth, op, result, "求值");
            result
        })
    };
    BoolNode {
        partial: PartialNode::Leaf {
            fields: fields.clone(),
            eval: eval.clone(),
        },
        eval,
        debug_eval,
        fields,
    }
}

pub(crate) fn str_in(a: StrNode, values: Vec<String>, negate: bool) -> BoolNode {
    let op = if negate { "not in" } else { "in" };
    let fields = a.fields.clone();
    let eval: BoolEvalFn = {
        let ae = a.eval;
        let values = values.clone();
        Rc::new(move |ctx| values.iter().any(|v| *v == ae(ctx)) != negate)
    };
    let debug_eval: BoolEvalFn = {
        let ad = a.debug_eval;
        Rc::new(move |ctx| {
            let depth = ctx.enter();
            let result = values.iter().any(|v| *v == ad(ctx)) != negate;
            ctx.leave();
            trace!(depth, op, result, "求值");
            result
        })
    };
    BoolNode {
        partial: PartialNode::Leaf {
            fields: fields.clone(),
            eval: eval.clone(),
        },
        eval,
        debug_eval,
        fields,
    }
}

/// 编译期预编译好的模式匹配
pub(crate) fn str_matches(a: StrNode, regex: Regex, negate: bool) -> BoolNode {
    let op = if negate { "!~" } else { "=~" };
    let fields = a.fields.clone();
    let eval: BoolEvalFn = {
        let ae = a.eval;
        let regex = regex.clone();
        Rc::new(move |ctx| regex.is_match(&ae(ctx)) != negate)
    };
    let debug_eval: BoolEvalFn = {
        let ad = a.debug_eval;
        Rc::new(move |ctx| {
            let depth = ctx.enter();
            let result = regex.is_match(&ad(ctx)) != negate;
            ctx.leave();
            trace!(depth, op, result, "求值");
            result
        })
    };
    BoolNode {
        partial: PartialNode::Leaf {
            fields: fields.clone(),
            eval: eval.clone(),
        },
        eval,
        debug_eval,
        fields,
    }
}

/// 模式操作数是字段时的运行期匹配；运行期编译失败按不匹配处理，求值不报错
pub(crate) fn str_matches_dynamic(a: StrNode, pattern: StrNode, negate: bool) -> BoolNode {
    let op = if negate { "!~" } else { "=~" };
    let fields = merge_fields(&a.fields, &pattern.fields);

    fn match_once(value: &str, pattern: &str, negate: bool) -> bool {
        match pattern_to_regex(pattern) {
            Ok(regex) => regex.is_match(value) != negate,
            Err(err) => {
                warn!(pattern, %err, "运行期模式编译失败，按不匹配处理");
                negate
            }
        }
    }

    let eval: BoolEvalFn = {
        let (ae, pe) = (a.eval, pattern.eval);
        Rc::new(move |ctx| match_once(&ae(ctx), &pe(ctx), negate))
    };
    let debug_eval: BoolEvalFn = {
        let (ad, pd) = (a.debug_eval, pattern.debug_eval);
        Rc::new(move |ctx| {
            let depth = ctx.enter();
            let result = match_once(&ad(ctx), &pd(ctx), negate);
            ctx.leave();
            trace!(depth, op, result, "求值");
            result
        })
    };
    BoolNode {
        partial: PartialNode::Leaf {
            fields: fields.clone(),
            eval: eval.clone(),
        },
        eval,
        debug_eval,
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Context;

    #[test]
    fn test_pattern_to_regex() {
        let re = pattern_to_regex("/usr/bin/*").unwrap();
        assert!(re.is_match("/usr/bin/cat"));
        assert!(!re.is_match("/usr/sbin/cat"));
        // 锚定：不允许前缀外多余内容
        assert!(!re.is_match("x/usr/bin/cat"));

        assert!(pattern_to_regex("[").is_err());
    }

    #[test]
    fn test_short_circuit() {
        use std::cell::Cell;

        let ctx = Context::new();
        let hits = Rc::new(Cell::new(0));

        let counting = {
            let hits = hits.clone();
            let eval: BoolEvalFn = Rc::new(move |_| {
                hits.set(hits.get() + 1);
                true
            });
            BoolNode {
                eval: eval.clone(),
                debug_eval: eval.clone(),
                fields: Vec::new(),
                partial: PartialNode::Leaf {
                    fields: Vec::new(),
                    eval,
                },
            }
        };

        // false && x：右侧不被求值
        let node = bool_and(bool_literal(false), counting);
        assert!(!(node.eval)(&ctx));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_double_negation_identity() {
        let ctx = Context::new();
        let node = int_unary("-", int_unary("-", int_literal(3), |v| -v), |v| -v);
        assert_eq!((node.eval)(&ctx), 3);
    }

    #[test]
    fn test_membership_negation_consistency() {
        let ctx = Context::new();
        let values = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        for probe in ["a", "b", "c", "d", ""] {
            let node = str_in(str_literal(probe.to_string()), values.clone(), false);
            let negated = str_in(str_literal(probe.to_string()), values.clone(), true);
            assert_ne!((node.eval)(&ctx), (negated.eval)(&ctx), "probe={}", probe);
        }
    }
}
