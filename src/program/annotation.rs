//! Annotations attached to classes, members and parameters.

use crate::program::{Symbol, Token};

/// Retention of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum AnnotationVisibility {
    /// Only visible to tools at build time, never traced
    Build,
    /// Retained in the binary, not visible to reflection
    Class,
    /// Visible to reflection at runtime
    Runtime,
}

/// Value of an annotation element.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// Integral constant
    Int(i64),
    /// Boolean constant
    Bool(bool),
    /// String constant
    Str(String),
    /// Class literal
    Type(Symbol),
    /// Enum constant of the given enum type
    Enum {
        /// Enum class
        ty: Symbol,
        /// Name of the enum constant field
        name: Symbol,
    },
    /// Nested annotation
    Annotation(Box<Annotation>),
    /// Array of values
    Array(Vec<AnnotationValue>),
}

/// Named element of an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationElement {
    /// Element name, matching a method of the annotation interface
    pub name: Symbol,
    /// Element value
    pub value: AnnotationValue,
}

/// An annotation instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Annotation interface type
    pub ty: Symbol,
    /// Retention
    pub visibility: AnnotationVisibility,
    /// Element values
    pub elements: Vec<AnnotationElement>,
}

impl Annotation {
    /// Creates an annotation without elements
    #[must_use]
    pub fn new(ty: Symbol, visibility: AnnotationVisibility) -> Self {
        Annotation {
            ty,
            visibility,
            elements: Vec::new(),
        }
    }

    /// Returns true if the annotation is retained in the binary
    #[must_use]
    pub fn is_retained(&self) -> bool {
        self.visibility != AnnotationVisibility::Build
    }
}

/// Location of an annotation on a program item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnnotatedItem {
    /// Annotation on a class, method or field
    Item(Token),
    /// Annotation on the parameter at the given index of a method
    Parameter(Token, usize),
}

impl AnnotatedItem {
    /// The class, method or field that carries the annotation
    #[must_use]
    pub fn token(&self) -> Token {
        match self {
            AnnotatedItem::Item(token) | AnnotatedItem::Parameter(token, _) => *token,
        }
    }
}
