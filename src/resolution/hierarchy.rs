//! Class hierarchy index.
//!
//! Precomputes the direct subtype and supertype relations of every class in a program, so that
//! dispatch resolution and the single-target cache can walk the hierarchy in both directions
//! without rescanning definitions. Supertype references that do not resolve to a definition are
//! kept aside as missing references for diagnostics.

use std::collections::{HashMap, HashSet};

use crate::program::{Program, Symbol, Token};

/// Precomputed subtype and supertype relations of a program.
#[derive(Debug, Default)]
pub struct ClassHierarchy {
    /// Type token -> direct subtypes (subclasses and implementors).
    subtypes: HashMap<Token, Vec<Token>>,
    /// Type token -> resolved direct supertypes (superclass first, then interfaces).
    supertypes: HashMap<Token, Vec<Token>>,
    /// Type token -> resolved superclass.
    superclass: HashMap<Token, Token>,
    /// Supertype references without a definition, per referencing type.
    missing: HashMap<Token, Vec<Symbol>>,
}

impl ClassHierarchy {
    /// Builds the hierarchy index of `program`.
    ///
    /// # Arguments
    ///
    /// * `program` - The program to index
    ///
    /// # Returns
    ///
    /// A new [`ClassHierarchy`] with all direct relations resolved.
    #[must_use]
    pub fn new(program: &Program) -> Self {
        let mut hierarchy = ClassHierarchy::default();

        for class in program.classes() {
            let token = class.token;
            let mut supers = Vec::with_capacity(1 + class.interfaces.len());

            let references = class.superclass.iter().chain(class.interfaces.iter());
            for (position, reference) in references.enumerate() {
                match program.class_by_symbol(*reference) {
                    Some(super_class) => {
                        if position == 0 && class.superclass.is_some() {
                            hierarchy.superclass.insert(token, super_class.token);
                        }
                        supers.push(super_class.token);
                        hierarchy
                            .subtypes
                            .entry(super_class.token)
                            .or_default()
                            .push(token);
                    }
                    None => hierarchy.missing.entry(token).or_default().push(*reference),
                }
            }

            hierarchy.supertypes.insert(token, supers);
        }

        hierarchy
    }

    /// Returns all direct subtypes of a given type.
    #[must_use]
    pub fn subtypes(&self, ty: Token) -> &[Token] {
        self.subtypes.get(&ty).map_or(&[], Vec::as_slice)
    }

    /// Returns the resolved direct supertypes of a given type.
    #[must_use]
    pub fn supertypes(&self, ty: Token) -> &[Token] {
        self.supertypes.get(&ty).map_or(&[], Vec::as_slice)
    }

    /// Returns the resolved superclass of a given type.
    #[must_use]
    pub fn superclass(&self, ty: Token) -> Option<Token> {
        self.superclass.get(&ty).copied()
    }

    /// Supertype references of `ty` that have no definition.
    #[must_use]
    pub fn missing_supertypes(&self, ty: Token) -> &[Symbol] {
        self.missing.get(&ty).map_or(&[], Vec::as_slice)
    }

    /// Returns all types in the subtype hierarchy of `ty` (transitive closure, excluding `ty`).
    ///
    /// The walk keeps a visited set, so cyclic hierarchies in malformed input terminate.
    #[must_use]
    pub fn all_subtypes(&self, ty: Token) -> Vec<Token> {
        let mut result = Vec::new();
        let mut worklist = vec![ty];
        let mut visited = HashSet::new();

        while let Some(current) = worklist.pop() {
            if !visited.insert(current) {
                continue;
            }

            for &subtype in self.subtypes(current) {
                if subtype != ty && !visited.contains(&subtype) {
                    result.push(subtype);
                    worklist.push(subtype);
                }
            }
        }

        result.sort_unstable();
        result.dedup();
        result
    }

    /// Returns all transitive supertypes of `ty` (excluding `ty`) in breadth-first order.
    #[must_use]
    pub fn all_supertypes(&self, ty: Token) -> Vec<Token> {
        let mut result = Vec::new();
        let mut visited = HashSet::from([ty]);
        let mut index = 0;
        let mut frontier = vec![ty];

        while index < frontier.len() {
            let current = frontier[index];
            index += 1;
            for &supertype in self.supertypes(current) {
                if visited.insert(supertype) {
                    result.push(supertype);
                    frontier.push(supertype);
                }
            }
        }

        result
    }

    /// Iterates over the superclass chain of `ty`, excluding `ty`.
    pub fn superclass_chain(&self, ty: Token) -> impl Iterator<Item = Token> + '_ {
        let mut visited = HashSet::from([ty]);
        std::iter::successors(self.superclass(ty), move |current| self.superclass(*current))
            .take_while(move |token| visited.insert(*token))
    }

    /// Returns true if `sub` equals `sup` or transitively extends or implements it.
    #[must_use]
    pub fn is_subtype_of(&self, sub: Token, sup: Token) -> bool {
        sub == sup || self.all_supertypes(sub).contains(&sup)
    }

    /// Returns statistics about the hierarchy.
    #[must_use]
    pub fn stats(&self) -> HierarchyStats {
        HierarchyStats {
            total_types: self.supertypes.len(),
            types_with_subtypes: self.subtypes.len(),
            max_direct_subtypes: self.subtypes.values().map(Vec::len).max().unwrap_or(0),
            missing_supertypes: self.missing.values().map(Vec::len).sum(),
        }
    }
}

/// Statistics about the class hierarchy.
#[derive(Debug, Clone, Default)]
pub struct HierarchyStats {
    /// Total number of types indexed.
    pub total_types: usize,
    /// Number of types that have at least one direct subtype.
    pub types_with_subtypes: usize,
    /// Maximum number of direct subtypes of any type.
    pub max_direct_subtypes: usize,
    /// Number of supertype references without a definition.
    pub missing_supertypes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::builder_with_object;

    fn program() -> Program {
        let mut builder = builder_with_object();
        builder.class("a.I", |c| {
            c.interface();
        });
        builder.class("a.A", |c| {
            c.implements("a.I");
        });
        builder.class("a.B", |c| {
            c.extends("a.A");
        });
        builder.class("a.C", |c| {
            c.extends("a.B").implements("a.Missing");
        });
        builder.build().unwrap()
    }

    fn token(program: &Program, name: &str) -> Token {
        program.class_by_name(name).unwrap().token
    }

    #[test]
    fn test_subtypes() {
        let program = program();
        let hierarchy = ClassHierarchy::new(&program);
        let (i, a, b, c) = (
            token(&program, "a.I"),
            token(&program, "a.A"),
            token(&program, "a.B"),
            token(&program, "a.C"),
        );

        assert_eq!(hierarchy.subtypes(i), &[a]);
        assert_eq!(hierarchy.all_subtypes(i), vec![a, b, c]);
        assert!(hierarchy.all_subtypes(c).is_empty());
    }

    #[test]
    fn test_supertypes() {
        let program = program();
        let hierarchy = ClassHierarchy::new(&program);
        let object = token(&program, "java.lang.Object");
        let (i, a, b, c) = (
            token(&program, "a.I"),
            token(&program, "a.A"),
            token(&program, "a.B"),
            token(&program, "a.C"),
        );

        assert_eq!(hierarchy.superclass(c), Some(b));
        assert_eq!(hierarchy.superclass_chain(c).collect::<Vec<_>>(), vec![b, a, object]);
        assert!(hierarchy.is_subtype_of(c, i));
        assert!(!hierarchy.is_subtype_of(a, b));
        assert_eq!(hierarchy.missing_supertypes(c).len(), 1);
        assert_eq!(hierarchy.stats().missing_supertypes, 1);
    }

    #[test]
    fn test_cyclic_hierarchy_terminates() {
        let mut builder = builder_with_object();
        builder.class("a.X", |c| {
            c.extends("a.Y");
        });
        builder.class("a.Y", |c| {
            c.extends("a.X");
        });
        let program = builder.build().unwrap();
        let hierarchy = ClassHierarchy::new(&program);
        let x = token(&program, "a.X");
        let y = token(&program, "a.Y");

        assert_eq!(hierarchy.all_subtypes(x), vec![y]);
        assert_eq!(hierarchy.all_supertypes(x), vec![y]);
        assert_eq!(hierarchy.superclass_chain(x).collect::<Vec<_>>(), vec![y]);
    }
}
