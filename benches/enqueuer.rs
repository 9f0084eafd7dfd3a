//! Benchmarks for the reachability fixpoint.
//!
//! Programs are generated: a binary class hierarchy where every class overrides a virtual
//! method, allocates the next class and touches a field. This exercises virtual dispatch,
//! single-target cache invalidation, field access tracking and deferred tracing together.
//!
//! - `enqueuer_trace` - one initial pass for growing program sizes
//! - `enqueuer_if_rules` - the same programs with one conditional rule per class
//! - `shaker_run` - initial pass, rewriting and final pass

extern crate shaker;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use shaker::{
    enqueuer::{Enqueuer, Mode},
    prelude::*,
};
use std::hint::black_box;

fn class_name(index: usize) -> String {
    format!("app.C{index}")
}

/// Builds a program of `size` classes reachable from `app.Main.main`.
fn generate(size: usize) -> Program {
    let mut builder = ProgramBuilder::new();
    builder.library_class("java.lang.Object", |c| {
        c.no_superclass()
            .method("<init>", "()void", MethodFlags::PUBLIC, |_| {});
    });

    for index in 0..size {
        let name = class_name(index);
        let parent = if index == 0 {
            "java.lang.Object".to_string()
        } else {
            class_name((index - 1) / 2)
        };
        let next = (index + 1 < size).then(|| class_name(index + 1));

        builder.class(&name, |c| {
            c.extends(&parent)
                .field("value", "int", FieldFlags::PRIVATE)
                .field("scratch", "int", FieldFlags::PRIVATE)
                .init(|m| {
                    m.invoke_direct(&parent, "<init>", "()void")
                        .put_field(&name, "scratch", "int");
                })
                .method("work", "()void", MethodFlags::PUBLIC, |m| {
                    if let Some(next) = &next {
                        m.construct(next).invoke_virtual("app.C0", "work", "()void");
                    }
                    m.get_field(&name, "value", "int")
                        .put_field(&name, "value", "int")
                        .invoke_static(&name, "helper", "()void");
                })
                .method("helper", "()void", MethodFlags::PRIVATE | MethodFlags::STATIC, |_| {})
                .method("unused", "()void", MethodFlags::PUBLIC, |_| {});
        });
    }

    builder.class("app.Main", |c| {
        c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
            m.construct("app.C0").invoke_virtual("app.C0", "work", "()void");
        });
    });
    builder.build().unwrap()
}

fn keep_main() -> RuleSet {
    let mut rules = RuleSet::new();
    rules.add_keep(KeepRule::keep(
        ClassSpec::named("app.Main")
            .unwrap()
            .member(MemberSpec::method("main").unwrap()),
    ));
    rules
}

/// Adds `-if class app.C* -keep class app.C<1> { unused(); }`.
fn with_if_rules(mut rules: RuleSet) -> RuleSet {
    rules.add_if(IfRule::new(
        ClassSpec::named("app.C*").unwrap(),
        KeepRule::keep(
            ClassSpec::named("app.C<1>")
                .unwrap()
                .member(MemberSpec::method("unused").unwrap()),
        ),
    ));
    rules
}

fn bench_trace(c: &mut Criterion) {
    let config = ShakerConfig::default();
    let mut group = c.benchmark_group("enqueuer_trace");
    for size in [64, 512, 2048] {
        let program = generate(size);
        let rules = keep_main();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &program, |b, program| {
            b.iter(|| {
                let result = Enqueuer::new(black_box(program), &rules, &config, Mode::InitialTreeShaking)
                    .run()
                    .unwrap();
                black_box(result)
            });
        });
    }
    group.finish();
}

fn bench_if_rules(c: &mut Criterion) {
    let config = ShakerConfig::default();
    let mut group = c.benchmark_group("enqueuer_if_rules");
    for size in [64, 512] {
        let program = generate(size);
        let rules = with_if_rules(keep_main());
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &program, |b, program| {
            b.iter(|| {
                let result = Enqueuer::new(black_box(program), &rules, &config, Mode::InitialTreeShaking)
                    .run()
                    .unwrap();
                black_box(result)
            });
        });
    }
    group.finish();
}

fn bench_shaker_run(c: &mut Criterion) {
    let shaker = Shaker::new(ShakerConfig::default());
    let rules = keep_main();

    c.bench_function("shaker_run_512", |b| {
        b.iter_batched(
            || generate(512),
            |mut program| {
                let outcome = shaker.run(black_box(&mut program), &rules).unwrap();
                black_box(outcome)
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_trace, bench_if_rules, bench_shaker_run);
criterion_main!(benches);
