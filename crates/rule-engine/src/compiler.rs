//! AST 到求值树的编译
//!
//! 单遍递归编译：自底向上推导操作数类型，类型不匹配立即携带出错记号的
//! 位置返回；宏在引用点内联展开，展开栈兼做循环检测。编译成功后规则的
//! 求值永不失败，所有类型 / 解析问题都截在这一层。

use crate::constants;
use crate::error::{Result, RuleError};
use crate::evaluator::{BoolEvalFn, Context, ValueKind};
use crate::model::{Model, TypedEvaluator};
use crate::operators::{
    BoolNode, IntNode, StrNode, bool_and, bool_compare, bool_field, bool_literal, bool_not,
    bool_or, int_bitwise, int_compare, int_field, int_in, int_literal, int_unary,
    pattern_to_regex, str_compare, str_field, str_in, str_literal, str_matches,
    str_matches_dynamic,
};
use crate::partial::{PartialNode, Ternary};
use rule_ast::{BinaryOp, Expr, Macro, Position, Rule, UnaryOp};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// 规则可引用的具名宏集合
pub type MacroSet = HashMap<String, Macro>;

/// 编译产物：不可变的可执行规则
///
/// 编译期选定调试或快速求值路径；判别字段查询始终走快速闭包。
pub struct RuleEvaluator {
    eval: BoolEvalFn,
    tags: Vec<String>,
    fields: Vec<String>,
    partial: PartialNode,
}

impl std::fmt::Debug for RuleEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEvaluator")
            .field("tags", &self.tags)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl RuleEvaluator {
    /// 对当前绑定的事件求值
    pub fn eval(&self, ctx: &Context) -> bool {
        (self.eval)(ctx)
    }

    /// 规则触及字段的类别标签，升序去重
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// 规则引用的全部字段名
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// 判别字段查询：仅凭 `field` 当前的观测值，规则是否已注定落空。
    /// 返回 `true` 时携带该值的事件都可以跳过完整求值直接丢弃。
    pub fn is_discriminator(&self, ctx: &Context, field: &str) -> Result<bool> {
        if !self.fields.iter().any(|f| f == field) {
            return Err(RuleError::FieldNotFound {
                field: field.to_string(),
                pos: None,
            });
        }
        Ok(self.partial.eval_with(ctx, field) == Ternary::False)
    }
}

/// 编译规则
///
/// `debug` 为真时选用调试求值路径（经 `tracing` 输出逐节点轨迹），
/// 两条路径对任意输入结果一致。
pub fn compile<M: Model>(
    rule: &Rule,
    macros: &MacroSet,
    model: &M,
    debug: bool,
) -> Result<RuleEvaluator> {
    let mut state = CompileState {
        model,
        macros,
        expanding: Vec::new(),
        fields: Vec::new(),
        tags: BTreeSet::new(),
    };

    // 规则整体必须是布尔表达式
    let node = match state.compile_expr(&rule.expr)? {
        Compiled::Bool(node) => node,
        _ => {
            return Err(type_error(rule.expr.pos(), ValueKind::Bool.as_str()));
        }
    };

    // BTreeSet 保证标签升序去重
    let tags: Vec<String> = state.tags.into_iter().collect();

    debug!(fields = ?state.fields, tags = ?tags, "规则编译完成");

    Ok(RuleEvaluator {
        eval: if debug { node.debug_eval } else { node.eval },
        tags,
        fields: state.fields,
        partial: node.partial,
    })
}

/// 中间编译结果，类型在节点间自底向上传播
enum Compiled {
    Bool(BoolNode),
    Int(IntNode),
    Str(StrNode),
    Array(CompiledArray),
}

/// 编译期折叠完成的数组字面量
enum CompiledArray {
    Ints(Vec<i64>),
    Strings(Vec<String>),
    Empty,
}

fn kind_name(c: &Compiled) -> &'static str {
    match c {
        Compiled::Bool(_) => ValueKind::Bool.as_str(),
        Compiled::Int(_) => ValueKind::Int.as_str(),
        Compiled::Str(_) => ValueKind::String.as_str(),
        Compiled::Array(_) => "array",
    }
}

fn type_error(pos: Position, expected: &str) -> RuleError {
    RuleError::TypeError {
        pos,
        expected: expected.to_string(),
    }
}

struct CompileState<'a, M: Model> {
    model: &'a M,
    macros: &'a MacroSet,
    /// 宏展开栈，用于循环检测
    expanding: Vec<String>,
    fields: Vec<String>,
    tags: BTreeSet<String>,
}

impl<M: Model> CompileState<'_, M> {
    fn compile_expr(&mut self, expr: &Expr) -> Result<Compiled> {
        match expr {
            Expr::BoolLiteral { value, .. } => Ok(Compiled::Bool(bool_literal(*value))),
            Expr::IntLiteral { value, .. } => Ok(Compiled::Int(int_literal(*value))),
            Expr::StringLiteral { value, .. } => Ok(Compiled::Str(str_literal(value.clone()))),
            Expr::Ident { name, pos } => self.compile_ident(name, *pos),
            Expr::Array { elements, .. } => Ok(Compiled::Array(self.compile_array(elements)?)),
            Expr::Unary { op, operand, .. } => self.compile_unary(*op, operand),
            Expr::Binary { op, lhs, rhs, pos } => self.compile_binary(*op, lhs, rhs, *pos),
        }
    }

    /// 标识符共享命名空间，按宏、命名常量、Model 字段的顺序解析
    fn compile_ident(&mut self, name: &str, pos: Position) -> Result<Compiled> {
        if let Some(macro_def) = self.macros.get(name) {
            if self.expanding.iter().any(|n| n == name) {
                return Err(RuleError::MacroResolution {
                    name: name.to_string(),
                    pos,
                    reason: "检测到循环引用".to_string(),
                });
            }
            self.expanding.push(name.to_string());
            let compiled = self.compile_expr(&macro_def.expr);
            self.expanding.pop();
            return compiled;
        }

        if let Some(value) = constants::lookup(name) {
            return Ok(Compiled::Int(int_literal(value)));
        }

        self.compile_field(name, pos)
    }

    fn compile_field(&mut self, name: &str, pos: Position) -> Result<Compiled> {
        let Some(resolution) = self.model.resolve(name) else {
            return Err(RuleError::FieldNotFound {
                field: name.to_string(),
                pos: Some(pos),
            });
        };

        if !self.fields.iter().any(|f| f == name) {
            self.fields.push(name.to_string());
        }
        self.tags.extend(resolution.tags);

        Ok(match resolution.evaluator {
            TypedEvaluator::Bool(ev) => {
                Compiled::Bool(bool_field(ev.eval, ev.debug_eval, name.to_string()))
            }
            TypedEvaluator::Int(ev) => {
                Compiled::Int(int_field(ev.eval, ev.debug_eval, name.to_string()))
            }
            TypedEvaluator::String(ev) => {
                Compiled::Str(str_field(ev.eval, ev.debug_eval, name.to_string()))
            }
        })
    }

    /// 数组元素要求同类型、不含字段引用，编译期折叠为常量表
    fn compile_array(&mut self, elements: &[Expr]) -> Result<CompiledArray> {
        let ctx = Context::new();
        let mut ints = Vec::new();
        let mut strings = Vec::new();

        for elem in elements {
            match self.compile_expr(elem)? {
                Compiled::Int(node) if node.fields.is_empty() => {
                    if !strings.is_empty() {
                        return Err(type_error(elem.pos(), ValueKind::String.as_str()));
                    }
                    ints.push((node.eval)(&ctx));
                }
                Compiled::Str(node) if node.fields.is_empty() => {
                    if !ints.is_empty() {
                        return Err(type_error(elem.pos(), ValueKind::Int.as_str()));
                    }
                    strings.push((node.eval)(&ctx));
                }
                other => {
                    return Err(type_error(elem.pos(), kind_name(&other)));
                }
            }
        }

        Ok(if !ints.is_empty() {
            CompiledArray::Ints(ints)
        } else if !strings.is_empty() {
            CompiledArray::Strings(strings)
        } else {
            CompiledArray::Empty
        })
    }

    fn compile_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Compiled> {
        match op {
            UnaryOp::Not => {
                let node = self.expect_bool(operand)?;
                Ok(Compiled::Bool(bool_not(node)))
            }
            UnaryOp::Minus => {
                let node = self.expect_int(operand)?;
                Ok(Compiled::Int(int_unary("-", node, |v| v.wrapping_neg())))
            }
            UnaryOp::BitNot => {
                let node = self.expect_int(operand)?;
                Ok(Compiled::Int(int_unary("^", node, |v| !v)))
            }
        }
    }

    fn compile_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        _pos: Position,
    ) -> Result<Compiled> {
        match op {
            BinaryOp::And => {
                let a = self.expect_bool(lhs)?;
                let b = self.expect_bool(rhs)?;
                Ok(Compiled::Bool(bool_and(a, b)))
            }
            BinaryOp::Or => {
                let a = self.expect_bool(lhs)?;
                let b = self.expect_bool(rhs)?;
                Ok(Compiled::Bool(bool_or(a, b)))
            }

            // 相等比较允许任意标量类型，但两侧必须一致；
            // 不一致时定位到右操作数，期望类型取自左侧
            BinaryOp::Eq | BinaryOp::Ne => {
                let a = self.compile_expr(lhs)?;
                let b = self.compile_expr(rhs)?;
                let negate = op == BinaryOp::Ne;
                match (a, b) {
                    (Compiled::Bool(a), Compiled::Bool(b)) => Ok(Compiled::Bool(if negate {
                        bool_compare("!=", a, b, |x, y| x != y)
                    } else {
                        bool_compare("==", a, b, |x, y| x == y)
                    })),
                    (Compiled::Int(a), Compiled::Int(b)) => Ok(Compiled::Bool(if negate {
                        int_compare("!=", a, b, |x, y| x != y)
                    } else {
                        int_compare("==", a, b, |x, y| x == y)
                    })),
                    (Compiled::Str(a), Compiled::Str(b)) => Ok(Compiled::Bool(if negate {
                        str_compare("!=", a, b, |x, y| x != y)
                    } else {
                        str_compare("==", a, b, |x, y| x == y)
                    })),
                    (a, _) => Err(type_error(rhs.pos(), kind_name(&a))),
                }
            }

            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let a = self.expect_int(lhs)?;
                let b = self.expect_int(rhs)?;
                let node = match op {
                    BinaryOp::Lt => int_compare("<", a, b, |x, y| x < y),
                    BinaryOp::Le => int_compare("<=", a, b, |x, y| x <= y),
                    BinaryOp::Gt => int_compare(">", a, b, |x, y| x > y),
                    _ => int_compare(">=", a, b, |x, y| x >= y),
                };
                Ok(Compiled::Bool(node))
            }

            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                let a = self.expect_int(lhs)?;
                let b = self.expect_int(rhs)?;
                let node = match op {
                    BinaryOp::BitAnd => int_bitwise("&", a, b, |x, y| x & y),
                    BinaryOp::BitOr => int_bitwise("|", a, b, |x, y| x | y),
                    _ => int_bitwise("^", a, b, |x, y| x ^ y),
                };
                Ok(Compiled::Int(node))
            }

            // 模式为字符串字面量时在编译期预编译正则，
            // 否则退化为逐次求值的动态匹配
            BinaryOp::Matches | BinaryOp::NotMatches => {
                let a = self.expect_str(lhs)?;
                let p = self.expect_str(rhs)?;
                let negate = op == BinaryOp::NotMatches;
                let node = match p.literal {
                    Some(pattern) => {
                        let regex = pattern_to_regex(&pattern).map_err(|source| {
                            RuleError::RegexCompile {
                                pattern: pattern.clone(),
                                pos: rhs.pos(),
                                source,
                            }
                        })?;
                        str_matches(a, regex, negate)
                    }
                    None => str_matches_dynamic(a, p, negate),
                };
                Ok(Compiled::Bool(node))
            }

            BinaryOp::In | BinaryOp::NotIn => {
                let a = self.compile_expr(lhs)?;
                let b = self.compile_expr(rhs)?;
                let negate = op == BinaryOp::NotIn;
                match (a, b) {
                    (Compiled::Int(a), Compiled::Array(CompiledArray::Ints(values))) => {
                        Ok(Compiled::Bool(int_in(a, values, negate)))
                    }
                    (Compiled::Int(a), Compiled::Array(CompiledArray::Empty)) => {
                        Ok(Compiled::Bool(int_in(a, Vec::new(), negate)))
                    }
                    (Compiled::Str(a), Compiled::Array(CompiledArray::Strings(values))) => {
                        Ok(Compiled::Bool(str_in(a, values, negate)))
                    }
                    (Compiled::Str(a), Compiled::Array(CompiledArray::Empty)) => {
                        Ok(Compiled::Bool(str_in(a, Vec::new(), negate)))
                    }
                    (a @ (Compiled::Int(_) | Compiled::Str(_)), _) => {
                        Err(type_error(rhs.pos(), kind_name(&a)))
                    }
                    (a, _) => Err(type_error(lhs.pos(), kind_name(&a))),
                }
            }
        }
    }

    fn expect_bool(&mut self, expr: &Expr) -> Result<BoolNode> {
        match self.compile_expr(expr)? {
            Compiled::Bool(node) => Ok(node),
            _ => Err(type_error(expr.pos(), ValueKind::Bool.as_str())),
        }
    }

    fn expect_int(&mut self, expr: &Expr) -> Result<IntNode> {
        match self.compile_expr(expr)? {
            Compiled::Int(node) => Ok(node),
            _ => Err(type_error(expr.pos(), ValueKind::Int.as_str())),
        }
    }

    fn expect_str(&mut self, expr: &Expr) -> Result<StrNode> {
        match self.compile_expr(expr)? {
            Compiled::Str(node) => Ok(node),
            _ => Err(type_error(expr.pos(), ValueKind::String.as_str())),
        }
    }
}
