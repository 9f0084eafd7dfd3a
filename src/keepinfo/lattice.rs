//! Lattice traits for keep information.
//!
//! Keep information only ever grows during a pass: joining two values yields the least value
//! that carries every constraint of both. The traits here state that contract so that the
//! collection and the tests can treat all three item kinds uniformly.
//!
//! # Lattice Background
//!
//! - **Bottom (⊥)**: No constraints, every transformation is allowed
//! - **Top (⊤)**: Fully pinned, no transformation is allowed
//! - **Join (∨)**: Least upper bound, the union of constraints
//! - **Order (≤)**: `a ≤ b` iff every constraint of `a` is also a constraint of `b`

use std::fmt::Debug;

/// A join semi-lattice with a join (least upper bound) operation.
///
/// The join must satisfy:
///
/// - **Idempotent**: `x.join(x) = x`
/// - **Commutative**: `x.join(y) = y.join(x)`
/// - **Associative**: `x.join(y.join(z)) = (x.join(y)).join(z)`
pub trait JoinSemiLattice: Clone + Debug + PartialEq {
    /// Computes the join (least upper bound) of two lattice elements.
    #[must_use]
    fn join(&self, other: &Self) -> Self;

    /// Returns `true` if this is the top element.
    fn is_top(&self) -> bool;

    /// Partial order induced by the join: `self ≤ other` iff `self ∨ other = other`.
    fn is_less_than_or_equals(&self, other: &Self) -> bool {
        self.join(other) == *other
    }
}

/// A bounded join semi-lattice with explicit top and bottom elements.
pub trait Lattice: JoinSemiLattice {
    /// Returns the top (⊤) element of the lattice.
    fn top() -> Self;

    /// Returns the bottom (⊥) element of the lattice.
    ///
    /// Bottom is the identity of the join: `x.join(bottom) = x`.
    fn bottom() -> Self;

    /// Returns `true` if this is the bottom element.
    fn is_bottom(&self) -> bool;
}
