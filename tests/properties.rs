//! Structural properties of a pass.
//!
//! These tests check the guarantees other passes rely on rather than individual scenarios:
//! keep information forms a join semi-lattice, marks only grow with more rules, a pass is
//! deterministic and bounded, and the single-target cache answers consistently across
//! invalidation.

use std::collections::HashSet;

use shaker::{
    enqueuer::{ActionKind, Enqueuer, EnqueuerResult, MarkSet},
    keepinfo::{JoinSemiLattice, KeepClassInfo, KeepClassJoiner, KeepConstraints, Lattice},
    prelude::*,
    resolution::{ClassHierarchy, InstantiationInfo, MethodKey, SingleTargetCache, SingleTargetQuery},
    Result,
};
use strum::EnumCount;

/// A small application with virtual dispatch, statics, fields and a library supertype.
fn application() -> Result<Program> {
    let mut builder = ProgramBuilder::new();
    builder.library_class("java.lang.Object", |c| {
        c.no_superclass()
            .method("<init>", "()void", MethodFlags::PUBLIC, |_| {});
    });
    builder.library_class("java.lang.Runnable", |c| {
        c.interface().abstract_method("run", "()void", MethodFlags::PUBLIC);
    });
    builder.class("app.Shape", |c| {
        c.abstract_class()
            .init(|m| {
                m.invoke_direct("java.lang.Object", "<init>", "()void");
            })
            .abstract_method("area", "()int", MethodFlags::PUBLIC);
    });
    for name in ["app.Square", "app.Circle"] {
        builder.class(name, |c| {
            c.extends("app.Shape")
                .field("size", "int", FieldFlags::PRIVATE)
                .init(|m| {
                    m.invoke_direct("app.Shape", "<init>", "()void");
                })
                .method("area", "()int", MethodFlags::PUBLIC, |m| {
                    m.get_field(name, "size", "int");
                });
        });
    }
    builder.class("app.Worker", |c| {
        c.implements("java.lang.Runnable")
            .init(|m| {
                m.invoke_direct("java.lang.Object", "<init>", "()void");
            })
            .method("run", "()void", MethodFlags::PUBLIC, |m| {
                m.get_static("app.Settings", "LEVEL", "int");
            });
    });
    builder.class("app.Settings", |c| {
        c.field("LEVEL", "int", FieldFlags::PUBLIC | FieldFlags::STATIC)
            .clinit(|m| {
                m.put_static("app.Settings", "LEVEL", "int");
            });
    });
    builder.class("app.Main", |c| {
        c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
            m.construct("app.Square")
                .invoke_virtual("app.Shape", "area", "()int")
                .construct("app.Worker");
        })
        .method("extra", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
            m.construct("app.Circle").invoke_static("com.absent.Tool", "use", "()void");
        });
    });
    builder.build()
}

fn keep(members: MemberSpec) -> Result<RuleSet> {
    let mut rules = RuleSet::new();
    rules.add_keep(KeepRule::keep(ClassSpec::named("app.Main")?.member(members)));
    Ok(rules)
}

fn trace(program: &Program, rules: &RuleSet) -> Result<EnqueuerResult> {
    let config = ShakerConfig::default();
    Enqueuer::new(program, rules, &config, Mode::InitialTreeShaking).run()
}

fn is_subset(small: &MarkSet, large: &MarkSet) -> bool {
    small.iter().all(|item| large.contains(item))
}

fn class_infos() -> Vec<KeepClassInfo> {
    let mut minification = KeepClassJoiner::new();
    minification.disallow_minification();
    let mut repackaging = KeepClassJoiner::new();
    repackaging.disallow_repackaging().disallow_optimization();
    let mut pinned = KeepClassJoiner::new();
    pinned.pin().set_check_discarded();

    vec![
        KeepClassInfo::bottom(),
        KeepClassInfo::top(),
        minification.build(),
        repackaging.build(),
        pinned.build(),
    ]
}

#[test]
fn test_keep_info_join_is_a_semi_lattice() {
    let infos = class_infos();
    for a in &infos {
        assert_eq!(a.join(a), *a);
        assert_eq!(a.join(&KeepClassInfo::bottom()), *a);
        assert!(a.join(&KeepClassInfo::top()).is_top());
        assert!(KeepClassInfo::bottom().is_less_than_or_equals(a));

        for b in &infos {
            assert_eq!(a.join(b), b.join(a));
            assert!(a.is_less_than_or_equals(&a.join(b)));
            for c in &infos {
                assert_eq!(a.join(&b.join(c)), a.join(b).join(c));
            }
        }
    }
}

#[test]
fn test_joiner_only_adds_constraints() {
    let mut base = KeepClassJoiner::new();
    base.disallow_minification();
    let info = base.build();

    let mut joiner = info.joiner();
    assert!(!joiner.is_changed());
    assert_eq!(joiner.build(), info);

    joiner.disallow(KeepConstraints::PINNED);
    let grown = joiner.build();
    assert!(info.is_less_than_or_equals(&grown));
    assert!(grown.constraints().contains(KeepConstraints::DISALLOW_MINIFICATION));
    assert!(grown.is_pinned());
}

/// Adding a keep rule never removes anything from any mark set.
#[test]
fn test_more_rules_only_grow_marks() -> Result<()> {
    let program = application()?;
    let small = trace(&program, &keep(MemberSpec::method("main")?)?)?;
    let large = trace(&program, &keep(MemberSpec::all_methods())?)?;

    let (small, large) = (small.marks(), large.marks());
    assert!(is_subset(&small.live_types, &large.live_types));
    assert!(is_subset(&small.instantiated_types, &large.instantiated_types));
    assert!(is_subset(&small.lambda_interfaces, &large.lambda_interfaces));
    assert!(is_subset(&small.initialized_classes, &large.initialized_classes));
    assert!(is_subset(&small.targeted_methods, &large.targeted_methods));
    assert!(is_subset(&small.live_methods, &large.live_methods));
    assert!(is_subset(&small.live_fields, &large.live_fields));
    assert!(is_subset(&small.live_non_program, &large.live_non_program));

    let circle = program.class_by_name("app.Circle").map(|class| class.token);
    assert!(circle.is_some_and(|circle| large.instantiated_types.contains(circle)));
    assert!(circle.is_some_and(|circle| !small.live_types.contains(circle)));
    Ok(())
}

/// Two passes over the same input produce the same outcome.
#[test]
fn test_pass_is_deterministic() -> Result<()> {
    let program = application()?;
    let rules = keep(MemberSpec::all_methods())?;
    let first = trace(&program, &rules)?;
    let second = trace(&program, &rules)?;

    assert_eq!(first.marks(), second.marks());
    assert_eq!(first.keep_info().pinned_items(), second.keep_info().pinned_items());
    assert_eq!(first.missing().descriptors(), second.missing().descriptors());
    assert_eq!(first.pruned_fields(), second.pruned_fields());
    assert_eq!(first.stats().worklist.processed, second.stats().worklist.processed);
    assert!(first.marks().is_consistent());
    Ok(())
}

/// The worklist processes at most one action of each kind per item or instruction.
#[test]
fn test_worklist_is_bounded() -> Result<()> {
    let program = application()?;
    let result = trace(&program, &keep(MemberSpec::all_methods())?)?;

    let items = program.classes().len() + program.methods().len() + program.fields().len();
    let sites: usize = program
        .methods()
        .iter()
        .filter_map(|method| method.code.as_ref())
        .map(|code| code.insns.len() + code.guards.len())
        .sum();
    let stats = &result.stats().worklist;
    assert!(stats.processed <= (items + sites) * ActionKind::COUNT);
    assert_eq!(stats.processed, stats.enqueued);
    assert!(stats.peak <= stats.enqueued);
    Ok(())
}

#[derive(Default)]
struct Instantiated(HashSet<Token>);

impl InstantiationInfo for Instantiated {
    fn is_instantiated(&self, ty: Token) -> bool {
        self.0.contains(&ty)
    }

    fn is_instantiated_via_lambda(&self, _interface: Token) -> bool {
        false
    }

    fn is_pinned(&self, _ty: Token) -> bool {
        false
    }
}

/// Cached answers are stable until a type is instantiated, and a recomputed answer matches a
/// fresh cache.
#[test]
fn test_single_target_cache_stability() -> Result<()> {
    let program = application()?;
    let hierarchy = ClassHierarchy::new(&program);
    let token = |name: &str| program.class_by_name(name).map(|class| class.token);
    let (Some(shape), Some(square), Some(circle)) = (token("app.Shape"), token("app.Square"), token("app.Circle"))
    else {
        panic!("classes defined");
    };

    let area_of = |class: Token| {
        program
            .class(class)
            .and_then(|class| program.methods_of(class).find(|method| program.name(method.name) == "area"))
            .map(|method| (method.token, MethodKey { name: method.name, proto: method.proto }))
    };
    let (Some((area, key)), Some((square_area, _))) = (area_of(shape), area_of(square)) else {
        panic!("methods defined");
    };
    let query = SingleTargetQuery {
        receiver: shape,
        method: area,
        kind: InvokeKind::Virtual,
        context: square_area,
        lower_bound: None,
    };

    let cache = SingleTargetCache::new();
    let mut info = Instantiated::default();
    info.0.insert(square);

    let first = cache.lookup_single_target(&program, &hierarchy, &info, &query);
    assert_eq!(first, Some(square_area));
    assert!(cache.contains(shape, &key));
    assert_eq!(cache.lookup_single_target(&program, &hierarchy, &info, &query), first);
    assert_eq!(cache.stats().positive_hits, 1);

    info.0.insert(circle);
    cache.remove_instantiated_type(&hierarchy, &info, circle);
    assert!(!cache.contains(shape, &key));

    let recomputed = cache.lookup_single_target(&program, &hierarchy, &info, &query);
    let fresh = SingleTargetCache::new().lookup_single_target(&program, &hierarchy, &info, &query);
    assert_eq!(recomputed, None);
    assert_eq!(recomputed, fresh);
    assert!(cache.stats().invalidations >= 1);
    Ok(())
}
