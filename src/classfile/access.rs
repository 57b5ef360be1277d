//! Access flags of classes, fields and methods.
//!
//! The flag values are the ones stored in class files. Several bits carry a different meaning
//! depending on the kind of entity they belong to (e.g. `0x0020` is `ACC_SUPER` on a class and
//! `ACC_SYNCHRONIZED` on a method); both names are provided.

use bitflags::bitflags;
use strum::Display;

/// Bitmask covering the three visibility bits
pub const VISIBILITY_MASK: u16 = 0x0007;

bitflags! {
    /// Access and property flags of a class, field or method
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u16 {
        /// Accessible from everywhere
        const PUBLIC = 0x0001;
        /// Accessible only from the declaring class
        const PRIVATE = 0x0002;
        /// Accessible from subclasses and the declaring package
        const PROTECTED = 0x0004;
        /// Member belongs to the class, not to instances
        const STATIC = 0x0008;
        /// Class can not be extended, method can not be overridden, field is assigned once
        const FINAL = 0x0010;
        /// Class: treat superclass methods specially in invokespecial
        const SUPER = 0x0020;
        /// Method: invocation is wrapped by a monitor
        const SYNCHRONIZED = 0x0020;
        /// Field: can not be cached
        const VOLATILE = 0x0040;
        /// Method: bridge method generated by the compiler
        const BRIDGE = 0x0040;
        /// Field: not written by default serialization
        const TRANSIENT = 0x0080;
        /// Method: declared with variable arity
        const VARARGS = 0x0080;
        /// Method: implemented outside the bytecode
        const NATIVE = 0x0100;
        /// Class is an interface
        const INTERFACE = 0x0200;
        /// Class can not be instantiated, method has no implementation
        const ABSTRACT = 0x0400;
        /// Method uses strict floating point
        const STRICT = 0x0800;
        /// Not present in the source code
        const SYNTHETIC = 0x1000;
        /// Class is an annotation interface
        const ANNOTATION = 0x2000;
        /// Class or field is an enum (constant)
        const ENUM = 0x4000;
    }
}

/// The visibility of a class or member, derived from its access flags.
///
/// Ordered from most to least restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Visibility {
    /// `private`
    Private,
    /// No visibility flag: package-private
    Package,
    /// `protected`
    Protected,
    /// `public`
    Public,
}

impl AccessFlags {
    /// Returns the visibility expressed by these flags.
    ///
    /// Class files never combine visibility bits for valid entities; if they are
    /// combined anyway, the most restrictive one wins.
    #[must_use]
    pub fn visibility(self) -> Visibility {
        if self.contains(Self::PRIVATE) {
            Visibility::Private
        } else if self.contains(Self::PROTECTED) {
            Visibility::Protected
        } else if self.contains(Self::PUBLIC) {
            Visibility::Public
        } else {
            Visibility::Package
        }
    }

    /// Returns these flags with the visibility bits replaced.
    #[must_use]
    pub fn with_visibility(self, visibility: Visibility) -> Self {
        let cleared = Self::from_bits_retain(self.bits() & !VISIBILITY_MASK);
        match visibility {
            Visibility::Private => cleared | Self::PRIVATE,
            Visibility::Package => cleared,
            Visibility::Protected => cleared | Self::PROTECTED,
            Visibility::Public => cleared | Self::PUBLIC,
        }
    }

    /// Returns true if the static flag is set
    #[must_use]
    pub fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }
}
