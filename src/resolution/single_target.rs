//! Memoized single-target resolution of virtual calls.
//!
//! The [`SingleTargetCache`] answers "which unique method, if any, runs for this virtual call
//! given everything instantiated so far" and memoizes both positive and negative answers per
//! receiver type. Answers depend on the set of instantiated types, so growing that set
//! invalidates the entries of every type whose answer could change: the newly instantiated type
//! and all supertypes reachable from it and from its already instantiated subtypes.
//!
//! # Thread Safety
//!
//! The cache is a [`DashMap`] with atomic counters. Lookups and insertions go through `&self`
//! and may run concurrently from parallel batch phases; invalidation happens only from the
//! single-threaded worklist driver.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use dashmap::DashMap;

use crate::{
    program::{InvokeKind, Program, Symbol, Token, Visibility},
    resolution::{is_accessible, lookup_virtual_dispatch_target, same_nest, ClassHierarchy},
};

/// Instantiation facts the single-target lookup depends on.
pub trait InstantiationInfo {
    /// Returns true if instances of the class may exist at runtime
    fn is_instantiated(&self, ty: Token) -> bool;

    /// Returns true if the interface is implemented by a lambda instance
    fn is_instantiated_via_lambda(&self, interface: Token) -> bool;

    /// Returns true if the type is pinned and may have subtypes unknown to the analysis
    fn is_pinned(&self, ty: Token) -> bool;
}

/// Name and prototype of a method, the per-receiver cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodKey {
    /// Method name
    pub name: Symbol,
    /// Method prototype
    pub proto: Symbol,
}

/// A single-target question for one call.
#[derive(Debug, Clone, Copy)]
pub struct SingleTargetQuery {
    /// Refined upper bound of the receiver
    pub receiver: Token,
    /// The resolved method of the call
    pub method: Token,
    /// Invocation kind of the call
    pub kind: InvokeKind,
    /// The method containing the call
    pub context: Token,
    /// Exact lower bound of the receiver, if known
    pub lower_bound: Option<Token>,
}

/// Statistics about the cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleTargetStats {
    /// Lookups answered by a cached positive entry.
    pub positive_hits: usize,
    /// Lookups answered by a cached negative entry.
    pub negative_hits: usize,
    /// Lookups that required a full resolution.
    pub misses: usize,
    /// Receiver entries removed by invalidation.
    pub invalidations: usize,
}

/// Per-receiver memoization of single dispatch targets.
#[derive(Debug, Default)]
pub struct SingleTargetCache {
    entries: DashMap<Token, HashMap<MethodKey, Option<Token>>>,
    positive_hits: AtomicUsize,
    negative_hits: AtomicUsize,
    misses: AtomicUsize,
    invalidations: AtomicUsize,
}

impl SingleTargetCache {
    /// Creates an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the unique target of a virtual call, or `None` if there is none or it is unknown.
    ///
    /// Order of evaluation:
    /// 1. Private methods callable from the same nest resolve to themselves.
    /// 2. A cached positive entry is returned (its target must still be defined).
    /// 3. A cached negative entry yields `None`.
    /// 4. A full resolution runs and its answer is memoized.
    ///
    /// Calls whose resolved method is not public or protected are answered uncached, since
    /// their accessibility depends on the caller.
    pub fn lookup_single_target<I: InstantiationInfo + ?Sized>(
        &self,
        program: &Program,
        hierarchy: &ClassHierarchy,
        info: &I,
        query: &SingleTargetQuery,
    ) -> Option<Token> {
        let resolved = program.method(query.method)?;
        let holder = program.class(resolved.holder)?;
        let context = program
            .method(query.context)
            .and_then(|context| program.class(context.holder));

        if resolved.is_private() {
            return context
                .filter(|context| same_nest(holder, context))
                .map(|_| resolved.token);
        }
        if !query.kind.is_virtual_dispatch() || !resolved.is_virtual() {
            return None;
        }
        if let Some(context) = context {
            if !is_accessible(program, hierarchy, resolved.visibility(), holder, context) {
                return None;
            }
        }

        if query.lower_bound == Some(query.receiver) {
            return lookup_virtual_dispatch_target(program, hierarchy, query.receiver, resolved.token);
        }

        let cacheable = matches!(
            resolved.visibility(),
            Visibility::Public | Visibility::Protected
        );
        let key = MethodKey {
            name: resolved.name,
            proto: resolved.proto,
        };

        if cacheable {
            if let Some(cached) = self
                .entries
                .get(&query.receiver)
                .and_then(|entry| entry.get(&key).copied())
            {
                match cached {
                    Some(target) => {
                        debug_assert!(program.method(target).is_some());
                        self.positive_hits.fetch_add(1, Ordering::Relaxed);
                        return Some(target);
                    }
                    None => {
                        self.negative_hits.fetch_add(1, Ordering::Relaxed);
                        return None;
                    }
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let target = Self::resolve_single_target(program, hierarchy, info, query.receiver, resolved.token);
        if cacheable {
            self.entries
                .entry(query.receiver)
                .or_default()
                .insert(key, target);
        }
        target
    }

    fn resolve_single_target<I: InstantiationInfo + ?Sized>(
        program: &Program,
        hierarchy: &ClassHierarchy,
        info: &I,
        receiver: Token,
        resolved: Token,
    ) -> Option<Token> {
        let receiver_class = program.class(receiver)?;
        if !receiver_class.is_program() {
            return None;
        }

        let mut target = None;
        let candidates = std::iter::once(receiver).chain(hierarchy.all_subtypes(receiver));
        for ty in candidates {
            let class = program.class(ty)?;
            if !class.is_program() {
                return None;
            }
            if info.is_pinned(ty) && !class.is_final() {
                return None;
            }
            if class.is_interface() {
                if info.is_instantiated_via_lambda(ty) {
                    return None;
                }
                continue;
            }
            if !info.is_instantiated(ty) {
                continue;
            }

            let candidate = lookup_virtual_dispatch_target(program, hierarchy, ty, resolved)?;
            match target {
                None => target = Some(candidate),
                Some(previous) if previous != candidate => return None,
                Some(_) => {}
            }
        }
        target
    }

    /// Invalidates entries after `ty` became instantiated.
    ///
    /// Removes the entries of `ty` and of every type reachable by walking up the hierarchy from
    /// `ty` and from each of its already instantiated subtypes. A seen set keeps the walk
    /// linear in the number of visited types.
    pub fn remove_instantiated_type<I: InstantiationInfo + ?Sized>(
        &self,
        hierarchy: &ClassHierarchy,
        info: &I,
        ty: Token,
    ) {
        let mut worklist = vec![ty];
        worklist.extend(
            hierarchy
                .all_subtypes(ty)
                .into_iter()
                .filter(|subtype| info.is_instantiated(*subtype)),
        );
        self.invalidate_upwards(hierarchy, worklist);
    }

    /// Invalidates entries that may change because `ty` was pinned or became a lambda target.
    pub fn invalidate_pinned_type(&self, hierarchy: &ClassHierarchy, ty: Token) {
        self.invalidate_upwards(hierarchy, vec![ty]);
    }

    fn invalidate_upwards(&self, hierarchy: &ClassHierarchy, mut worklist: Vec<Token>) {
        let mut seen = HashSet::new();
        while let Some(current) = worklist.pop() {
            if !seen.insert(current) {
                continue;
            }
            if self.entries.remove(&current).is_some() {
                self.invalidations.fetch_add(1, Ordering::Relaxed);
            }
            worklist.extend(hierarchy.supertypes(current).iter().copied());
        }
    }

    /// Number of receiver types with cached entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if an answer is cached for the receiver and method
    #[must_use]
    pub fn contains(&self, receiver: Token, key: &MethodKey) -> bool {
        self.entries
            .get(&receiver)
            .is_some_and(|entry| entry.contains_key(key))
    }

    /// Returns statistics about the cache usage
    #[must_use]
    pub fn stats(&self) -> SingleTargetStats {
        SingleTargetStats {
            positive_hits: self.positive_hits.load(Ordering::Relaxed),
            negative_hits: self.negative_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}
