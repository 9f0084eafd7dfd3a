//! Speculative deferral of field accesses that look prunable.
//!
//! Instead of tracing an eligible field access immediately, the driver hands it to
//! [`DeferredTracing`], which keeps it as pending. Once the main fixpoint and the conditional
//! rules are stable, [`DeferredTracing::reconcile`] re-checks every deferred field and returns
//! the accesses of fields that became ineligible, for replay into the worklist. When a
//! reconciliation returns nothing, [`DeferredTracing::commit`] prunes the remaining fields and
//! produces the rewrites of their access sites:
//!
//! | Access        | Replacement                         |
//! |---------------|-------------------------------------|
//! | instance read | `ConstDefault(ty)`                  |
//! | static read   | `InitClass(holder)`, `ConstDefault(ty)` |
//! | instance write| `Pop`                               |
//! | static write  | `Pop`, `InitClass(holder)`          |

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::{
    enqueuer::{FieldAccessFlags, FieldAccessInfoCollection},
    keepinfo::KeepInfoCollection,
    program::{CodeRewrite, FieldAccessKind, FieldDef, FieldRef, Insn, MethodRewrites, Program, Symbol, Token},
    resolution::ClassHierarchy,
};

/// A field access held back from tracing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredAccess {
    /// The reference as written at the access site
    pub field: FieldRef,
    /// Kind of access
    pub kind: FieldAccessKind,
    /// The accessing method
    pub context: Token,
    /// Index of the accessing instruction
    pub site: usize,
    /// Allocated type of a stored value, if known
    pub value: Option<Symbol>,
}

/// Outcome of committing the deferred accesses of a pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeferredCommit {
    /// Fields whose accesses were all removed
    pub pruned_fields: BTreeSet<Token>,
    /// Rewrites of the methods that accessed them
    pub rewrites: MethodRewrites,
}

/// Pending field accesses and the bookkeeping to replay or commit them.
#[derive(Debug, Default)]
pub struct DeferredTracing {
    enabled: bool,
    deferred: BTreeMap<Token, Vec<DeferredAccess>>,
    replayed: usize,
}

impl DeferredTracing {
    /// Creates the deferral state; a disabled instance never defers anything
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        DeferredTracing {
            enabled,
            ..Self::default()
        }
    }

    /// Returns true if deferral is enabled for the pass
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns true if accesses of `field` are currently held back
    #[must_use]
    pub fn is_deferred(&self, field: Token) -> bool {
        self.deferred.contains_key(&field)
    }

    /// Number of fields with held back accesses
    #[must_use]
    pub fn len(&self) -> usize {
        self.deferred.len()
    }

    /// Returns true if nothing is held back
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deferred.is_empty()
    }

    /// Number of accesses handed back for replay so far
    #[must_use]
    pub fn replayed(&self) -> usize {
        self.replayed
    }

    /// Decides whether an access of the resolved `field` may be deferred.
    ///
    /// Deferral requires a program field that is neither pinned nor already traced or flagged,
    /// accessed by an instruction of a method, whose holder is not a record. Stored values
    /// must not have a finalizer. Reads are only deferred inside the initializer of the holder
    /// that matches the access (`<init>` for instance reads, `<clinit>` for static reads).
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn is_eligible(
        &self,
        program: &Program,
        hierarchy: &ClassHierarchy,
        keep_info: &KeepInfoCollection,
        field_access: &FieldAccessInfoCollection,
        field: &FieldDef,
        kind: FieldAccessKind,
        context: Token,
        value: Option<Symbol>,
    ) -> bool {
        if !self.enabled || !context.is_method() {
            return false;
        }
        let Some(holder) = program.class(field.holder) else {
            return false;
        };
        if !holder.is_program() || holder.is_record {
            return false;
        }
        if keep_info.is_pinned(field.token) || field_access.get(field.token).is_some() {
            return false;
        }
        if let Some(value) = value {
            if has_finalizer(program, hierarchy, value) {
                return false;
            }
        }
        if kind.is_read() {
            let Some(method) = program.method(context) else {
                return false;
            };
            let in_initializer = if kind.is_static() {
                method.is_class_initializer()
            } else {
                method.is_instance_initializer()
            };
            return in_initializer && method.holder == field.holder;
        }
        true
    }

    /// Holds back an access of `field`
    pub fn defer(&mut self, field: Token, access: DeferredAccess) {
        log::trace!("deferring access of field {field} in {}", access.context);
        self.deferred.entry(field).or_default().push(access);
    }

    /// Removes and returns the held back accesses of a field that is now traced normally
    pub fn take(&mut self, field: Token) -> Option<Vec<DeferredAccess>> {
        let accesses = self.deferred.remove(&field)?;
        self.replayed += accesses.len();
        Some(accesses)
    }

    /// Re-checks every deferred field against the state at the end of the fixpoint.
    ///
    /// A field stays deferred only while it is not pinned, has no traced or flagged access and
    /// is not both read and written through deferred accesses. The accesses of every other
    /// field are removed and returned in field order for replay.
    pub fn reconcile(
        &mut self,
        keep_info: &KeepInfoCollection,
        field_access: &FieldAccessInfoCollection,
    ) -> Vec<(Token, DeferredAccess)> {
        let ineligible: Vec<Token> = self
            .deferred
            .iter()
            .filter(|(field, accesses)| {
                let read = accesses.iter().any(|access| access.kind.is_read());
                let written = accesses.iter().any(|access| access.kind.is_write());
                keep_info.is_pinned(**field)
                    || field_access.has_traced_access(**field)
                    || field_access.has_any(**field, FieldAccessFlags::all())
                    || (read && written)
            })
            .map(|(field, _)| *field)
            .collect();

        let mut replay = Vec::new();
        for field in ineligible {
            if let Some(accesses) = self.take(field) {
                log::debug!("replaying {} deferred accesses of field {field}", accesses.len());
                replay.extend(accesses.into_iter().map(|access| (field, access)));
            }
        }
        replay
    }

    /// Prunes every field still deferred and rewrites its access sites.
    ///
    /// Rewrites are built per accessing method on the rayon pool and collected in method order.
    pub fn commit(&mut self, program: &Program) -> DeferredCommit {
        let deferred = std::mem::take(&mut self.deferred);
        let pruned_fields: BTreeSet<Token> = deferred.keys().copied().collect();

        let mut by_context: BTreeMap<Token, Vec<DeferredAccess>> = BTreeMap::new();
        for access in deferred.into_values().flatten() {
            by_context.entry(access.context).or_default().push(access);
        }

        let rewrites: MethodRewrites = by_context
            .into_par_iter()
            .map(|(context, accesses)| {
                let mut replacements: Vec<(usize, Vec<Insn>)> = accesses
                    .iter()
                    .map(|access| (access.site, replacement(program, access)))
                    .collect();
                replacements.sort_by_key(|(site, _)| *site);
                (context, CodeRewrite { replacements })
            })
            .collect();

        if !pruned_fields.is_empty() {
            log::debug!(
                "pruned {} fields, rewriting {} methods",
                pruned_fields.len(),
                rewrites.len()
            );
        }
        DeferredCommit {
            pruned_fields,
            rewrites,
        }
    }
}

fn replacement(program: &Program, access: &DeferredAccess) -> Vec<Insn> {
    let holder = access.field.holder;
    match access.kind {
        FieldAccessKind::InstanceRead => vec![Insn::ConstDefault(access.field.ty)],
        FieldAccessKind::StaticRead => vec![Insn::InitClass(holder), Insn::ConstDefault(access.field.ty)],
        FieldAccessKind::InstanceWrite => vec![Insn::Pop],
        FieldAccessKind::StaticWrite => {
            // The holder initializer of the access site runs anyway.
            let in_holder = program
                .method(access.context)
                .and_then(|method| program.class(method.holder))
                .is_some_and(|class| class.name == holder);
            if in_holder {
                vec![Insn::Pop]
            } else {
                vec![Insn::Pop, Insn::InitClass(holder)]
            }
        }
    }
}

/// Returns true if `ty` or a superclass below `java.lang.Object` declares `finalize()`.
///
/// An undefined type may have one.
fn has_finalizer(program: &Program, hierarchy: &ClassHierarchy, ty: Symbol) -> bool {
    let Some(class) = program.class_by_symbol(ty) else {
        return true;
    };
    let finalize = program.intern("finalize");
    let proto = program.intern("()void");
    std::iter::once(class.token)
        .chain(hierarchy.superclass_chain(class.token))
        .filter_map(|token| program.class(token))
        .filter(|class| class.name != program.object_symbol())
        .any(|class| program.find_method(class, finalize, proto).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        keepinfo::KeepFieldJoiner,
        program::{FieldFlags, MethodFlags},
        test::builder_with_object,
    };

    fn program() -> Program {
        let mut builder = builder_with_object();
        builder.class("app.Holder", |c| {
            c.field("cache", "app.Value", FieldFlags::PRIVATE)
                .init(|m| {
                    m.put_field_value("app.Holder", "cache", "app.Value", "app.Value");
                })
                .method("read", "()app.Value", MethodFlags::PUBLIC, |m| {
                    m.get_field("app.Holder", "cache", "app.Value");
                });
        });
        builder.class("app.Value", |_| {});
        builder.class("app.Finalizable", |c| {
            c.method("finalize", "()void", MethodFlags::PROTECTED, |_| {});
        });
        builder.build().unwrap()
    }

    fn access(program: &Program, kind: FieldAccessKind, context: Token) -> DeferredAccess {
        DeferredAccess {
            field: FieldRef {
                holder: program.intern("app.Holder"),
                name: program.intern("cache"),
                ty: program.intern("app.Value"),
            },
            kind,
            context,
            site: 0,
            value: None,
        }
    }

    #[test]
    fn test_eligibility() {
        let program = program();
        let hierarchy = ClassHierarchy::new(&program);
        let holder = program.class_by_name("app.Holder").unwrap();
        let field = program.field(holder.fields[0]).unwrap();
        let init = program.methods_of(holder).find(|m| m.is_instance_initializer()).unwrap();
        let read = program.methods_of(holder).find(|m| program.name(m.name) == "read").unwrap();

        let deferred = DeferredTracing::new(true);
        let keep_info = KeepInfoCollection::new();
        let accesses = FieldAccessInfoCollection::new();
        let eligible = |kind, context, value| {
            deferred.is_eligible(&program, &hierarchy, &keep_info, &accesses, field, kind, context, value)
        };

        assert!(eligible(FieldAccessKind::InstanceWrite, init.token, Some(program.intern("app.Value"))));
        assert!(eligible(FieldAccessKind::InstanceRead, init.token, None));
        assert!(!eligible(FieldAccessKind::InstanceRead, read.token, None));
        assert!(!eligible(FieldAccessKind::InstanceWrite, init.token, Some(program.intern("app.Finalizable"))));
        assert!(!eligible(FieldAccessKind::InstanceWrite, init.token, Some(program.intern("app.Missing"))));
        assert!(!DeferredTracing::new(false).is_eligible(
            &program,
            &hierarchy,
            &keep_info,
            &accesses,
            field,
            FieldAccessKind::InstanceWrite,
            init.token,
            None
        ));
    }

    #[test]
    fn test_reconcile_replays_pinned_fields() {
        let program = program();
        let holder = program.class_by_name("app.Holder").unwrap();
        let field = holder.fields[0];
        let init = program.methods_of(holder).find(|m| m.is_instance_initializer()).unwrap();

        let mut deferred = DeferredTracing::new(true);
        deferred.defer(field, access(&program, FieldAccessKind::InstanceWrite, init.token));
        let mut keep_info = KeepInfoCollection::new();
        let accesses = FieldAccessInfoCollection::new();
        assert!(deferred.reconcile(&keep_info, &accesses).is_empty());

        let mut joiner = KeepFieldJoiner::new();
        joiner.pin();
        keep_info.join_field(field, &joiner);
        let replay = deferred.reconcile(&keep_info, &accesses);
        assert_eq!(replay.len(), 1);
        assert!(deferred.is_empty());
        assert_eq!(deferred.replayed(), 1);
    }

    #[test]
    fn test_commit_rewrites_access_sites() {
        let program = program();
        let holder = program.class_by_name("app.Holder").unwrap();
        let field = holder.fields[0];
        let init = program.methods_of(holder).find(|m| m.is_instance_initializer()).unwrap();

        let mut deferred = DeferredTracing::new(true);
        deferred.defer(field, access(&program, FieldAccessKind::InstanceWrite, init.token));
        let commit = deferred.commit(&program);

        assert!(commit.pruned_fields.contains(&field));
        assert_eq!(commit.rewrites[&init.token].replacements, vec![(0, vec![Insn::Pop])]);
        assert!(deferred.is_empty());
    }
}
