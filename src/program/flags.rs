//! Access and property flags for classes, methods and fields.
//!
//! Flag values follow the conventional JVM access-flag encoding so that definitions produced by
//! an external reader can be carried over without translation.
//!
//! # Key Types
//! - [`ClassFlags`]: Class modifiers and kinds (interface, enum, annotation)
//! - [`MethodFlags`]: Method modifiers
//! - [`FieldFlags`]: Field modifiers
//! - [`Visibility`]: Normalized visibility extracted from any of the above

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Class modifier flags
    pub struct ClassFlags: u32 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared final, no subclasses allowed
        const FINAL = 0x0010;
        /// Is an interface
        const INTERFACE = 0x0200;
        /// Declared abstract, must not be instantiated
        const ABSTRACT = 0x0400;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation interface
        const ANNOTATION = 0x2000;
        /// Declared as an enum class
        const ENUM = 0x4000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Method modifier flags
    pub struct MethodFlags: u32 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final, must not be overridden
        const FINAL = 0x0010;
        /// Declared synchronized
        const SYNCHRONIZED = 0x0020;
        /// Compiler generated bridge method
        const BRIDGE = 0x0040;
        /// Declared with variable number of arguments
        const VARARGS = 0x0080;
        /// Implemented outside the program
        const NATIVE = 0x0100;
        /// Declared abstract, no implementation
        const ABSTRACT = 0x0400;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Field modifier flags
    pub struct FieldFlags: u32 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final, assigned once
        const FINAL = 0x0010;
        /// Declared volatile
        const VOLATILE = 0x0040;
        /// Declared transient
        const TRANSIENT = 0x0080;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
        /// Element of an enum
        const ENUM = 0x4000;
    }
}

/// Normalized visibility of a definition, ordered from most to least restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
pub enum Visibility {
    /// Accessible only inside the holder and its nest
    Private,
    /// Accessible inside the holder's package
    PackagePrivate,
    /// Accessible inside the package and from subclasses
    Protected,
    /// Accessible from everywhere
    Public,
}

impl Visibility {
    fn from_bits(public: bool, private: bool, protected: bool) -> Self {
        if public {
            Visibility::Public
        } else if private {
            Visibility::Private
        } else if protected {
            Visibility::Protected
        } else {
            Visibility::PackagePrivate
        }
    }
}

impl MethodFlags {
    /// Extract the visibility of the method
    #[must_use]
    pub fn visibility(self) -> Visibility {
        Visibility::from_bits(
            self.contains(Self::PUBLIC),
            self.contains(Self::PRIVATE),
            self.contains(Self::PROTECTED),
        )
    }
}

impl FieldFlags {
    /// Extract the visibility of the field
    #[must_use]
    pub fn visibility(self) -> Visibility {
        Visibility::from_bits(
            self.contains(Self::PUBLIC),
            self.contains(Self::PRIVATE),
            self.contains(Self::PROTECTED),
        )
    }
}

impl ClassFlags {
    /// Extract the visibility of the class (public or package private)
    #[must_use]
    pub fn visibility(self) -> Visibility {
        Visibility::from_bits(self.contains(Self::PUBLIC), false, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility() {
        assert_eq!(MethodFlags::PUBLIC.visibility(), Visibility::Public);
        assert_eq!(
            (MethodFlags::PRIVATE | MethodFlags::STATIC).visibility(),
            Visibility::Private
        );
        assert_eq!(FieldFlags::PROTECTED.visibility(), Visibility::Protected);
        assert_eq!(FieldFlags::FINAL.visibility(), Visibility::PackagePrivate);
        assert_eq!(ClassFlags::empty().visibility(), Visibility::PackagePrivate);
        assert!(Visibility::Private < Visibility::Public);
    }
}
