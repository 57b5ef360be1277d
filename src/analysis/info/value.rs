//! Abstract values stored in method and field facts.
//!
//! A [`Value`] over-approximates the set of runtime values a field, parameter or return value
//! can take. Primitive values are either a known constant or "any value of this kind";
//! reference values track the class they are known to be an instance of and whether they may
//! be `null`.
//!
//! Values only ever move up the lattice through [`Value::generalize`], the join operation:
//!
//! ```rust
//! use classfacts::analysis::Value;
//!
//! let one = Value::Integer(Some(1));
//! let two = Value::Integer(Some(2));
//!
//! assert_eq!(one.generalize(&one)?, one);
//! assert_eq!(one.generalize(&two)?, Value::Integer(None));
//! # Ok::<(), classfacts::Error>(())
//! ```

use std::fmt;

use crate::{
    classfile::{Constant, FieldType, Token},
    Error, Result,
};

/// What is known about a reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReferenceValue {
    /// The class every non-null value is an instance of, if known
    pub class: Option<Token>,
    /// True if the value may be `null`
    pub may_be_null: bool,
}

impl ReferenceValue {
    /// Creates a reference value.
    #[must_use]
    pub fn new(class: Option<Token>, may_be_null: bool) -> Self {
        Self { class, may_be_null }
    }

    /// The `null` reference.
    #[must_use]
    pub fn null() -> Self {
        Self::new(None, true)
    }

    /// Joins two reference values: the class survives only if both agree.
    #[must_use]
    pub fn generalize(&self, other: &ReferenceValue) -> ReferenceValue {
        ReferenceValue {
            class: if self.class == other.class {
                self.class
            } else {
                None
            },
            may_be_null: self.may_be_null || other.may_be_null,
        }
    }
}

/// An abstract value of one of the JVM computational kinds.
///
/// Primitive variants hold `Some(constant)` when the value is known exactly and `None` when it
/// can be any value of that kind. `byte`, `char`, `short` and `boolean` values are
/// [`Value::Integer`]s, as on the operand stack.
#[derive(Debug, Clone, Copy)]
pub enum Value {
    /// `int` and its narrower forms
    Integer(Option<i32>),
    /// `long`
    Long(Option<i64>),
    /// `float`
    Float(Option<f32>),
    /// `double`
    Double(Option<f64>),
    /// Object and array references
    Reference(ReferenceValue),
}

impl Value {
    /// Returns the name of the computational kind of this value.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Reference(_) => "reference",
        }
    }

    /// Returns true if the exact value is known. `null` counts as a known reference.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        match self {
            Value::Integer(value) => value.is_some(),
            Value::Long(value) => value.is_some(),
            Value::Float(value) => value.is_some(),
            Value::Double(value) => value.is_some(),
            Value::Reference(reference) => reference.class.is_none() && reference.may_be_null,
        }
    }

    /// Returns true for `long` and `double` values, which take two slots.
    #[must_use]
    pub fn is_category2(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }

    /// Joins this value with `other`.
    ///
    /// Equal constants stay constant (floating point constants compare by bit pattern),
    /// differing constants widen to any value of their kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleValues`] if the values have different kinds.
    pub fn generalize(&self, other: &Value) -> Result<Value> {
        fn join<T: Copy>(left: Option<T>, right: Option<T>, same: impl Fn(T, T) -> bool) -> Option<T> {
            match (left, right) {
                (Some(left), Some(right)) if same(left, right) => Some(left),
                _ => None,
            }
        }

        match (self, other) {
            (Value::Integer(left), Value::Integer(right)) => {
                Ok(Value::Integer(join(*left, *right, |a, b| a == b)))
            }
            (Value::Long(left), Value::Long(right)) => {
                Ok(Value::Long(join(*left, *right, |a, b| a == b)))
            }
            (Value::Float(left), Value::Float(right)) => Ok(Value::Float(join(
                *left,
                *right,
                |a, b| a.to_bits() == b.to_bits(),
            ))),
            (Value::Double(left), Value::Double(right)) => Ok(Value::Double(join(
                *left,
                *right,
                |a, b| a.to_bits() == b.to_bits(),
            ))),
            (Value::Reference(left), Value::Reference(right)) => {
                Ok(Value::Reference(left.generalize(right)))
            }
            _ => Err(Error::IncompatibleValues {
                left: self.kind_name(),
                right: other.kind_name(),
            }),
        }
    }

    /// Returns the default value of a field of the given type, if it is primitive.
    ///
    /// Reference fields get no value; their contents are tracked through the referenced class
    /// instead.
    #[must_use]
    pub fn zero_for(field_type: &FieldType) -> Option<Value> {
        match field_type {
            FieldType::Byte
            | FieldType::Char
            | FieldType::Short
            | FieldType::Boolean
            | FieldType::Int => Some(Value::Integer(Some(0))),
            FieldType::Long => Some(Value::Long(Some(0))),
            FieldType::Float => Some(Value::Float(Some(0.0))),
            FieldType::Double => Some(Value::Double(Some(0.0))),
            FieldType::Object(_) | FieldType::Array(_) => None,
        }
    }

    /// Returns the value of a `ConstantValue` attribute for a field of the given type.
    ///
    /// Returns `None` when the constant kind does not match the field type, and for string
    /// constants.
    #[must_use]
    pub fn from_constant(constant: &Constant, field_type: &FieldType) -> Option<Value> {
        match (constant, field_type) {
            (
                Constant::Integer(value),
                FieldType::Byte
                | FieldType::Char
                | FieldType::Short
                | FieldType::Boolean
                | FieldType::Int,
            ) => Some(Value::Integer(Some(*value))),
            (Constant::Long(value), FieldType::Long) => Some(Value::Long(Some(*value))),
            (Constant::Float(value), FieldType::Float) => Some(Value::Float(Some(*value))),
            (Constant::Double(value), FieldType::Double) => Some(Value::Double(Some(*value))),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(left), Value::Integer(right)) => left == right,
            (Value::Long(left), Value::Long(right)) => left == right,
            (Value::Float(left), Value::Float(right)) => {
                left.map(f32::to_bits) == right.map(f32::to_bits)
            }
            (Value::Double(left), Value::Double(right)) => {
                left.map(f64::to_bits) == right.map(f64::to_bits)
            }
            (Value::Reference(left), Value::Reference(right)) => left == right,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(Some(value)) => write!(f, "int {value}"),
            Value::Long(Some(value)) => write!(f, "long {value}"),
            Value::Float(Some(value)) => write!(f, "float {value}"),
            Value::Double(Some(value)) => write!(f, "double {value}"),
            Value::Reference(ReferenceValue {
                class: Some(class),
                may_be_null,
            }) => {
                write!(f, "reference {class}")?;
                if *may_be_null {
                    write!(f, " or null")?;
                }
                Ok(())
            }
            Value::Reference(ReferenceValue {
                class: None,
                may_be_null: true,
            }) => write!(f, "null"),
            other => write!(f, "any {}", other.kind_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generalize_constants() {
        let five = Value::Long(Some(5));
        assert_eq!(five.generalize(&five).unwrap(), five);
        assert_eq!(
            five.generalize(&Value::Long(Some(6))).unwrap(),
            Value::Long(None)
        );
        assert_eq!(
            Value::Long(None).generalize(&five).unwrap(),
            Value::Long(None)
        );
    }

    #[test]
    fn test_generalize_floats_by_bits() {
        let nan = Value::Float(Some(f32::NAN));
        assert_eq!(nan.generalize(&nan).unwrap(), nan);

        let zero = Value::Double(Some(0.0));
        let negative_zero = Value::Double(Some(-0.0));
        assert_ne!(zero, negative_zero);
        assert_eq!(
            zero.generalize(&negative_zero).unwrap(),
            Value::Double(None)
        );
    }

    #[test]
    fn test_generalize_incompatible_kinds() {
        let result = Value::Float(None).generalize(&Value::Reference(ReferenceValue::null()));
        match result {
            Err(Error::IncompatibleValues { left, right }) => {
                assert_eq!(left, "float");
                assert_eq!(right, "reference");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_generalize_references() {
        let string = ReferenceValue::new(Some(Token::class(3)), false);
        let list = ReferenceValue::new(Some(Token::class(4)), false);

        assert_eq!(string.generalize(&string), string);
        assert_eq!(
            string.generalize(&ReferenceValue::null()),
            ReferenceValue::new(None, true)
        );
        assert_eq!(string.generalize(&list), ReferenceValue::new(None, false));
    }

    #[test]
    fn test_generalize_is_commutative_for_kinds() {
        let values = [
            Value::Integer(Some(1)),
            Value::Integer(None),
            Value::Integer(Some(2)),
        ];
        for left in &values {
            for right in &values {
                assert_eq!(
                    left.generalize(right).unwrap(),
                    right.generalize(left).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_zero_for_field_types() {
        assert_eq!(
            Value::zero_for(&FieldType::Boolean),
            Some(Value::Integer(Some(0)))
        );
        assert_eq!(Value::zero_for(&FieldType::Long), Some(Value::Long(Some(0))));
        assert_eq!(
            Value::zero_for(&FieldType::Object("a/B".to_string())),
            None
        );
        assert_eq!(
            Value::zero_for(&FieldType::Array(Box::new(FieldType::Int))),
            None
        );
    }

    #[test]
    fn test_from_constant_requires_matching_kind() {
        assert_eq!(
            Value::from_constant(&Constant::Integer(7), &FieldType::Short),
            Some(Value::Integer(Some(7)))
        );
        assert_eq!(
            Value::from_constant(&Constant::Double(1.5), &FieldType::Double),
            Some(Value::Double(Some(1.5)))
        );
        assert_eq!(
            Value::from_constant(&Constant::Integer(7), &FieldType::Long),
            None
        );
        assert_eq!(
            Value::from_constant(&Constant::Long(7), &FieldType::Int),
            None
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Integer(Some(3)).to_string(), "int 3");
        assert_eq!(Value::Double(None).to_string(), "any double");
        assert_eq!(Value::Reference(ReferenceValue::null()).to_string(), "null");
        assert_eq!(
            Value::Reference(ReferenceValue::new(Some(Token::class(1)), true)).to_string(),
            "reference 0x02000001 or null"
        );
    }
}
