//! 规则引擎性能基准测试
//!
//! 测试覆盖：
//! - 宽 AND 链规则的完整求值性能
//! - 同一规则上判别字段查询的性能

use criterion::{Criterion, criterion_group, criterion_main};
use rule_ast::parse_rule;
use rule_engine::{
    Context, FieldResolution, IntEvaluator, MacroSet, Model, RuleEvaluator, StringEvaluator,
    TypedEvaluator, compile,
};
use std::cell::RefCell;
use std::hint::black_box;
use std::rc::Rc;

#[derive(Debug, Clone)]
struct BenchEvent {
    name: String,
    uid: i64,
}

struct BenchModel {
    event: Rc<RefCell<BenchEvent>>,
}

impl BenchModel {
    fn new(event: BenchEvent) -> Self {
        Self {
            event: Rc::new(RefCell::new(event)),
        }
    }
}

impl Model for BenchModel {
    type Event = BenchEvent;

    fn bind(&self, event: BenchEvent) {
        *self.event.borrow_mut() = event;
    }

    fn resolve(&self, field: &str) -> Option<FieldResolution> {
        match field {
            "process.name" => {
                let event = self.event.clone();
                let eval: rule_engine::StringEvalFn =
                    Rc::new(move |_| event.borrow().name.clone());
                Some(FieldResolution {
                    evaluator: TypedEvaluator::String(StringEvaluator {
                        eval: eval.clone(),
                        debug_eval: eval,
                        field: Some(field.to_string()),
                    }),
                    tags: vec!["process".to_string()],
                })
            }
            "process.uid" => {
                let event = self.event.clone();
                let eval: rule_engine::IntEvalFn = Rc::new(move |_| event.borrow().uid);
                Some(FieldResolution {
                    evaluator: TypedEvaluator::Int(IntEvaluator {
                        eval: eval.clone(),
                        debug_eval: eval,
                        field: Some(field.to_string()),
                    }),
                    tags: vec!["process".to_string()],
                })
            }
            _ => None,
        }
    }
}

/// 100 个相同子句的 AND 链
fn wide_rule(base: &str) -> String {
    vec![base; 100].join(" && ")
}

fn compile_wide(base: &str, event: BenchEvent) -> RuleEvaluator {
    let expr = wide_rule(base);
    let rule = parse_rule(&expr).unwrap();
    let model = BenchModel::new(event);
    compile(&rule, &MacroSet::new(), &model, false).unwrap()
}

fn bench_eval(c: &mut Criterion) {
    let evaluator = compile_wide(
        r#"(process.name == "/usr/bin/ls" && process.uid == 1)"#,
        BenchEvent {
            name: "/usr/bin/ls".to_string(),
            uid: 1,
        },
    );
    let ctx = Context::new();

    c.bench_function("eval_wide_and_chain", |b| {
        b.iter(|| {
            assert!(black_box(evaluator.eval(&ctx)));
        })
    });
}

fn bench_discriminator(c: &mut Criterion) {
    let evaluator = compile_wide(
        r#"(process.name == "/usr/bin/ls" && process.uid != 0)"#,
        BenchEvent {
            name: "/usr/bin/ls".to_string(),
            uid: 1,
        },
    );
    let ctx = Context::new();

    c.bench_function("discriminator_wide_and_chain", |b| {
        b.iter(|| {
            // name 命中、uid 未决，单凭 name 不足以否决整条规则
            let result = evaluator.is_discriminator(&ctx, "process.name").unwrap();
            assert!(!black_box(result));
        })
    });
}

criterion_group!(benches, bench_eval, bench_discriminator);
criterion_main!(benches);
