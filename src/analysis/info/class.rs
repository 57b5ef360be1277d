//! Optimization facts of classes.

use bitflags::bitflags;

use crate::classfile::Token;

bitflags! {
    /// Usage facts of a class.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClassFlags: u8 {
        /// Pinned by the surrounding tool
        const KEPT = 1 << 0;
        /// Tested by an `instanceof` instruction
        const INSTANCEOFED = 1 << 1;
        /// Instantiated by a `new` instruction
        const INSTANTIATED = 1 << 2;
        /// Loaded as a class literal
        const DOT_CLASSED = 1 << 3;
        /// Caught by an exception handler
        const CAUGHT = 1 << 4;
    }
}

/// Read-only queries answered by every kind of class facts.
pub trait ClassInfo {
    /// Returns true if the class must not be optimized.
    fn is_kept(&self) -> bool;
    /// Returns true if the class is tested by `instanceof`.
    fn is_instanceofed(&self) -> bool;
    /// Returns true if the class may be instantiated.
    fn is_instantiated(&self) -> bool;
    /// Returns true if the class is loaded as a class literal.
    fn is_dot_classed(&self) -> bool;
    /// Returns true if the class is caught by an exception handler.
    fn is_caught(&self) -> bool;
}

/// Facts of a class, conservative for library classes.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassFacts {
    /// Conservative facts of a class outside the program
    Library,
    /// Computed facts of a program class
    Program(ProgramClassFacts),
}

/// Facts of a program class, widened by the analysis passes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramClassFacts {
    class: Token,
    flags: ClassFlags,
}

impl ProgramClassFacts {
    /// Creates fresh facts for `class`.
    #[must_use]
    pub fn new(class: Token) -> Self {
        Self {
            class,
            flags: ClassFlags::empty(),
        }
    }

    /// Returns the class these facts belong to.
    #[must_use]
    pub fn class(&self) -> Token {
        self.class
    }

    /// Marks the class as pinned.
    pub fn set_kept(&mut self) {
        self.flags.insert(ClassFlags::KEPT);
    }

    /// Records an `instanceof` test against the class.
    pub fn set_instanceofed(&mut self) {
        self.flags.insert(ClassFlags::INSTANCEOFED);
    }

    /// Records an instantiation of the class.
    pub fn set_instantiated(&mut self) {
        self.flags.insert(ClassFlags::INSTANTIATED);
    }

    /// Records a class literal of the class.
    pub fn set_dot_classed(&mut self) {
        self.flags.insert(ClassFlags::DOT_CLASSED);
    }

    /// Records an exception handler catching the class.
    pub fn set_caught(&mut self) {
        self.flags.insert(ClassFlags::CAUGHT);
    }
}

impl ClassInfo for ProgramClassFacts {
    fn is_kept(&self) -> bool {
        self.flags.contains(ClassFlags::KEPT)
    }

    fn is_instanceofed(&self) -> bool {
        self.flags.contains(ClassFlags::INSTANCEOFED)
    }

    fn is_instantiated(&self) -> bool {
        self.flags.contains(ClassFlags::INSTANTIATED)
    }

    fn is_dot_classed(&self) -> bool {
        self.flags.contains(ClassFlags::DOT_CLASSED)
    }

    fn is_caught(&self) -> bool {
        self.flags.contains(ClassFlags::CAUGHT)
    }
}

impl ClassFacts {
    /// Returns true for library (opaque) facts.
    #[must_use]
    pub fn is_library(&self) -> bool {
        matches!(self, ClassFacts::Library)
    }

    /// Returns the computed facts for modification, `None` for library facts.
    pub fn as_program_mut(&mut self) -> Option<&mut ProgramClassFacts> {
        match self {
            ClassFacts::Program(facts) => Some(facts),
            ClassFacts::Library => None,
        }
    }

    fn holds(&self, flag: ClassFlags) -> bool {
        match self {
            ClassFacts::Library => true,
            ClassFacts::Program(facts) => facts.flags.contains(flag),
        }
    }
}

impl ClassInfo for ClassFacts {
    fn is_kept(&self) -> bool {
        self.holds(ClassFlags::KEPT)
    }

    fn is_instanceofed(&self) -> bool {
        self.holds(ClassFlags::INSTANCEOFED)
    }

    fn is_instantiated(&self) -> bool {
        self.holds(ClassFlags::INSTANTIATED)
    }

    fn is_dot_classed(&self) -> bool {
        self.holds(ClassFlags::DOT_CLASSED)
    }

    fn is_caught(&self) -> bool {
        self.holds(ClassFlags::CAUGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_class_facts() {
        let facts = ClassFacts::Library;
        assert!(facts.is_library());
        assert!(facts.is_kept());
        assert!(facts.is_instanceofed());
        assert!(facts.is_instantiated());
        assert!(facts.is_dot_classed());
        assert!(facts.is_caught());
    }

    #[test]
    fn test_program_class_facts_are_sticky() {
        let mut facts = ClassFacts::Program(ProgramClassFacts::new(Token::class(1)));
        assert!(!facts.is_instanceofed());

        let program = facts.as_program_mut().unwrap();
        program.set_instanceofed();
        program.set_instanceofed();
        program.set_caught();

        assert!(facts.is_instanceofed());
        assert!(facts.is_caught());
        assert!(!facts.is_instantiated());
        assert!(!facts.is_dot_classed());
        assert!(!facts.is_kept());
    }
}
