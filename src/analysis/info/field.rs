//! Optimization facts of fields.

use crate::{
    analysis::info::value::{ReferenceValue, Value},
    classfile::{AccessFlags, ProgramClass, ProgramField, Token},
    Result,
};

/// Read-only queries answered by every kind of field facts.
pub trait FieldInfo {
    /// Returns true if the field must not be optimized.
    fn is_kept(&self) -> bool;
    /// Returns true if the field may be read.
    fn is_read(&self) -> bool;
    /// Returns true if the field may be written.
    fn is_written(&self) -> bool;
    /// Returns true if nothing prevents making the field private.
    fn can_be_made_private(&self) -> bool;
    /// Returns the generalized class of the values stored in the field, if recorded.
    fn referenced_class(&self) -> Option<ReferenceValue>;
    /// Returns the generalized value of the field, if recorded.
    fn value(&self) -> Option<Value>;
}

/// Conservative facts of a field outside the analyzed program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibraryFieldFacts;

impl FieldInfo for LibraryFieldFacts {
    fn is_kept(&self) -> bool {
        true
    }

    fn is_read(&self) -> bool {
        true
    }

    fn is_written(&self) -> bool {
        true
    }

    fn can_be_made_private(&self) -> bool {
        false
    }

    fn referenced_class(&self) -> Option<ReferenceValue> {
        None
    }

    fn value(&self) -> Option<Value> {
        None
    }
}

/// Facts of a program field, widened by the analysis passes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramFieldFacts {
    field: Token,
    kept: bool,
    read: bool,
    written: bool,
    can_be_made_private: bool,
    referenced_class: Option<ReferenceValue>,
    value: Option<Value>,
}

impl ProgramFieldFacts {
    /// Creates facts for `field` without a recorded value.
    #[must_use]
    pub fn new(field: Token) -> Self {
        Self {
            field,
            kept: false,
            read: false,
            written: false,
            can_be_made_private: true,
            referenced_class: None,
            value: None,
        }
    }

    /// Creates facts for `field` of `class`, seeding the value from its static shape.
    ///
    /// A `ConstantValue` attribute provides the value when present. Otherwise primitive fields
    /// start with the default value of their type and reference fields stay unset. Volatile
    /// fields may be accessed concurrently and start out read and written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for an invalid descriptor and
    /// [`crate::Error::InvalidConstantIndex`] for a dangling `ConstantValue` index.
    pub fn for_field(class: &ProgramClass, field: &ProgramField) -> Result<Self> {
        let field_type = field.field_type()?;
        let value = match field.constant_value {
            Some(index) => Value::from_constant(class.constant_pool.get(index)?, &field_type),
            None => Value::zero_for(&field_type),
        };

        let volatile = field.access.contains(AccessFlags::VOLATILE);
        Ok(Self {
            read: volatile,
            written: volatile,
            value,
            ..Self::new(field.token)
        })
    }

    /// Returns the field these facts belong to.
    #[must_use]
    pub fn field(&self) -> Token {
        self.field
    }

    /// Marks the field as pinned.
    ///
    /// Code outside the program may access a kept field, so it also counts as read and written.
    pub fn set_kept(&mut self) {
        self.kept = true;
        self.read = true;
        self.written = true;
        self.can_be_made_private = false;
    }

    /// Records a read of the field.
    pub fn set_read(&mut self) {
        self.read = true;
    }

    /// Records a write of the field.
    pub fn set_written(&mut self) {
        self.written = true;
    }

    /// Records that the field can not be made private.
    pub fn set_non_private(&mut self) {
        self.can_be_made_private = false;
    }

    /// Joins `class` into the recorded class of the stored values.
    pub fn generalize_referenced_class(&mut self, class: ReferenceValue) {
        self.referenced_class = Some(match &self.referenced_class {
            Some(old) => old.generalize(&class),
            None => class,
        });
    }

    /// Joins `value` into the recorded value of the field.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::IncompatibleValues`] if `value` has a different kind than the
    /// recorded value.
    pub fn generalize_value(&mut self, value: Value) -> Result<()> {
        self.value = Some(match &self.value {
            Some(old) => old.generalize(&value)?,
            None => value,
        });
        Ok(())
    }
}

impl FieldInfo for ProgramFieldFacts {
    fn is_kept(&self) -> bool {
        self.kept
    }

    fn is_read(&self) -> bool {
        self.read
    }

    fn is_written(&self) -> bool {
        self.written
    }

    fn can_be_made_private(&self) -> bool {
        self.can_be_made_private
    }

    fn referenced_class(&self) -> Option<ReferenceValue> {
        self.referenced_class
    }

    fn value(&self) -> Option<Value> {
        self.value
    }
}

/// The facts attached to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFacts {
    /// Conservative facts of a field outside the program
    Library(LibraryFieldFacts),
    /// Computed facts of a program field
    Program(ProgramFieldFacts),
}

impl FieldFacts {
    /// Returns true for library (opaque) facts.
    #[must_use]
    pub fn is_library(&self) -> bool {
        matches!(self, FieldFacts::Library(_))
    }

    /// Returns the computed facts for modification, `None` for library facts.
    pub fn as_program_mut(&mut self) -> Option<&mut ProgramFieldFacts> {
        match self {
            FieldFacts::Program(facts) => Some(facts),
            FieldFacts::Library(_) => None,
        }
    }
}

impl FieldInfo for FieldFacts {
    fn is_kept(&self) -> bool {
        match self {
            FieldFacts::Library(facts) => facts.is_kept(),
            FieldFacts::Program(facts) => facts.is_kept(),
        }
    }

    fn is_read(&self) -> bool {
        match self {
            FieldFacts::Library(facts) => facts.is_read(),
            FieldFacts::Program(facts) => facts.is_read(),
        }
    }

    fn is_written(&self) -> bool {
        match self {
            FieldFacts::Library(facts) => facts.is_written(),
            FieldFacts::Program(facts) => facts.is_written(),
        }
    }

    fn can_be_made_private(&self) -> bool {
        match self {
            FieldFacts::Library(facts) => facts.can_be_made_private(),
            FieldFacts::Program(facts) => facts.can_be_made_private(),
        }
    }

    fn referenced_class(&self) -> Option<ReferenceValue> {
        match self {
            FieldFacts::Library(facts) => facts.referenced_class(),
            FieldFacts::Program(facts) => facts.referenced_class(),
        }
    }

    fn value(&self) -> Option<Value> {
        match self {
            FieldFacts::Library(facts) => facts.value(),
            FieldFacts::Program(facts) => facts.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classfile::{AccessFlags, ClassBuilder},
        Error,
    };

    #[test]
    fn test_seeded_values() {
        let class = ClassBuilder::new("app/Constants")
            .constant_field("LIMIT", "I", AccessFlags::STATIC | AccessFlags::FINAL, |pool| {
                pool.integer(42)
            })
            .constant_field("NAME", "Ljava/lang/String;", AccessFlags::STATIC, |pool| {
                pool.string("constants")
            })
            .field("ratio", "D", AccessFlags::PRIVATE)
            .field("items", "[I", AccessFlags::PRIVATE)
            .build()
            .unwrap();

        let facts = |name: &str| {
            let field = class.fields.iter().find(|f| f.name == name).unwrap();
            ProgramFieldFacts::for_field(&class, field).unwrap()
        };

        assert_eq!(facts("LIMIT").value(), Some(Value::Integer(Some(42))));
        assert_eq!(facts("NAME").value(), None);
        assert_eq!(facts("ratio").value(), Some(Value::Double(Some(0.0))));
        assert_eq!(facts("items").value(), None);
    }

    #[test]
    fn test_fresh_and_library_facts() {
        let fresh = ProgramFieldFacts::new(Token::field(1));
        assert!(!fresh.is_kept());
        assert!(!fresh.is_read());
        assert!(!fresh.is_written());
        assert!(fresh.can_be_made_private());

        let library = FieldFacts::Library(LibraryFieldFacts);
        assert!(library.is_library());
        assert!(library.is_kept());
        assert!(library.is_read());
        assert!(library.is_written());
        assert!(!library.can_be_made_private());
        assert_eq!(library.value(), None);
    }

    #[test]
    fn test_generalize_field_values() {
        let mut facts = ProgramFieldFacts::new(Token::field(1));
        facts.generalize_value(Value::Integer(Some(0))).unwrap();
        facts.generalize_value(Value::Integer(Some(0))).unwrap();
        assert_eq!(facts.value(), Some(Value::Integer(Some(0))));
        facts.generalize_value(Value::Integer(Some(1))).unwrap();
        assert_eq!(facts.value(), Some(Value::Integer(None)));
        assert!(matches!(
            facts.generalize_value(Value::Float(None)),
            Err(Error::IncompatibleValues { .. })
        ));

        let target = ReferenceValue::new(Some(Token::class(2)), false);
        facts.generalize_referenced_class(target);
        assert_eq!(facts.referenced_class(), Some(target));
        facts.generalize_referenced_class(ReferenceValue::null());
        assert_eq!(
            facts.referenced_class(),
            Some(ReferenceValue::new(None, true))
        );
    }

    #[test]
    fn test_kept_fields_stay_public() {
        let mut facts = ProgramFieldFacts::new(Token::field(1));
        facts.set_kept();
        assert!(facts.is_kept());
        assert!(!facts.can_be_made_private());
    }

    #[test]
    fn test_kept_and_volatile_fields_are_accessed() {
        let mut kept = ProgramFieldFacts::new(Token::field(1));
        kept.set_kept();
        assert!(kept.is_read());
        assert!(kept.is_written());

        let class = ClassBuilder::new("app/Flags")
            .field("ready", "Z", AccessFlags::PRIVATE | AccessFlags::VOLATILE)
            .field("plain", "Z", AccessFlags::PRIVATE)
            .build()
            .unwrap();
        let facts = |name: &str| {
            let field = class.fields.iter().find(|f| f.name == name).unwrap();
            ProgramFieldFacts::for_field(&class, field).unwrap()
        };

        let ready = facts("ready");
        assert!(ready.is_read());
        assert!(ready.is_written());
        assert!(!ready.is_kept());
        assert_eq!(ready.value(), Some(Value::Integer(Some(0))));

        let plain = facts("plain");
        assert!(!plain.is_read());
        assert!(!plain.is_written());
    }
}
