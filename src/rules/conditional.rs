//! Conditional (`-if`) rules.

use crate::{
    rules::{Captures, ClassSpec, KeepRule},
    Result,
};

/// A keep rule that applies only once a live class satisfies a precondition.
///
/// Wildcards captured while matching the precondition are substituted into back-references of
/// the consequence before it is applied.
///
/// # Examples
///
/// ```rust
/// use shaker::rules::{ClassSpec, IfRule, KeepRule};
///
/// // -if class com.foo.*Model -keep class com.foo.<1>Adapter
/// let rule = IfRule::new(
///     ClassSpec::named("com.foo.*Model")?,
///     KeepRule::keep(ClassSpec::named("com.foo.<1>Adapter")?),
/// );
/// assert!(!rule.consequence_rule().is_concrete());
/// # Ok::<(), shaker::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IfRule {
    precondition: ClassSpec,
    consequence: KeepRule,
}

impl IfRule {
    /// Creates a conditional rule
    #[must_use]
    pub fn new(precondition: ClassSpec, consequence: KeepRule) -> Self {
        IfRule {
            precondition,
            consequence,
        }
    }

    /// The precondition, including the member conditions a live class must satisfy
    #[must_use]
    pub fn precondition_matchers(&self) -> &ClassSpec {
        &self.precondition
    }

    /// The consequence, possibly containing back-references into the precondition
    #[must_use]
    pub fn consequence_rule(&self) -> &KeepRule {
        &self.consequence
    }

    /// Instantiates the consequence with the captures of a successful precondition match.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRule`] if a back-reference exceeds `captures`.
    pub fn materialize(&self, captures: &Captures) -> Result<KeepRule> {
        self.consequence.substitute(captures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::NamePattern;

    #[test]
    fn test_materialize_substitutes_captures() {
        let rule = IfRule::new(
            ClassSpec::named("com.foo.*Model").unwrap(),
            KeepRule::keep(ClassSpec::named("com.foo.<1>Adapter").unwrap()),
        );
        let mut captures = Captures::new();
        assert!(NamePattern::parse("com.foo.*Model")
            .unwrap()
            .matches("com.foo.UserModel", &mut captures));

        let materialized = rule.materialize(&captures).unwrap();
        assert_eq!(
            materialized.spec.concrete_name().as_deref(),
            Some("com.foo.UserAdapter")
        );
        assert!(rule.materialize(&Captures::new()).is_err());
    }
}
