//! Field and method descriptors.
//!
//! Descriptors are the type strings stored with every field and method, e.g. `I`,
//! `[Ljava/lang/String;` or `(IJLjava/lang/Object;)V`. The analysis derives the parameter slot
//! layout of a method from its descriptor: every parameter takes one local-variable slot, except
//! `long` and `double` (category-2 types) which take two consecutive slots.
//!
//! # Examples
//!
//! ```rust
//! use classfacts::classfile::MethodDescriptor;
//!
//! let descriptor = MethodDescriptor::parse("(IJLjava/lang/String;)V")?;
//! assert_eq!(descriptor.parameters.len(), 3);
//!
//! // Instance method: receiver slot first, then int, long (2 slots), reference.
//! assert_eq!(descriptor.parameter_slot_sizes(false), vec![1, 1, 2, 1]);
//! assert_eq!(descriptor.parameter_size(true), 4);
//! # Ok::<(), classfacts::Error>(())
//! ```

use std::fmt;

use crate::Result;

/// A field type as encoded in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `D`
    Double,
    /// `F`
    Float,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `S`
    Short,
    /// `Z`
    Boolean,
    /// `Lname;` with the internal class name
    Object(String),
    /// `[component`
    Array(Box<FieldType>),
}

impl FieldType {
    /// Parses a complete field descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the descriptor is empty, invalid or has
    /// trailing characters.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let mut parser = DescriptorParser::new(descriptor);
        let field_type = parser.field_type()?;
        if !parser.is_done() {
            return Err(malformed_error!(
                "Trailing characters in field descriptor '{}'",
                descriptor
            ));
        }
        Ok(field_type)
    }

    /// Returns the number of local-variable slots a value of this type occupies.
    #[must_use]
    pub fn slot_size(&self) -> u8 {
        if self.is_category2() {
            2
        } else {
            1
        }
    }

    /// Returns true for `long` and `double`, which take two slots.
    #[must_use]
    pub fn is_category2(&self) -> bool {
        matches!(self, FieldType::Long | FieldType::Double)
    }

    /// Returns true for the eight primitive types.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        !matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    /// Returns true for object and array types.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    /// Returns the element type of an array, following all dimensions.
    #[must_use]
    pub fn element_type(&self) -> &FieldType {
        match self {
            FieldType::Array(component) => component.element_type(),
            other => other,
        }
    }

    /// Returns the class name this type refers to, if any.
    ///
    /// Arrays of objects refer to their element class; primitive arrays refer to nothing.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match self.element_type() {
            FieldType::Object(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Byte => write!(f, "B"),
            FieldType::Char => write!(f, "C"),
            FieldType::Double => write!(f, "D"),
            FieldType::Float => write!(f, "F"),
            FieldType::Int => write!(f, "I"),
            FieldType::Long => write!(f, "J"),
            FieldType::Short => write!(f, "S"),
            FieldType::Boolean => write!(f, "Z"),
            FieldType::Object(name) => write!(f, "L{name};"),
            FieldType::Array(component) => write!(f, "[{component}"),
        }
    }
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Declared parameter types, without the receiver
    pub parameters: Vec<FieldType>,
    /// Return type, `None` for `void`
    pub return_type: Option<FieldType>,
}

impl MethodDescriptor {
    /// Parses a complete method descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the descriptor is not of the form
    /// `(parameters)return`.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let mut parser = DescriptorParser::new(descriptor);
        if parser.next() != Some(b'(') {
            return Err(malformed_error!(
                "Method descriptor '{}' does not start with '('",
                descriptor
            ));
        }

        let mut parameters = Vec::new();
        loop {
            match parser.peek() {
                Some(b')') => {
                    parser.next();
                    break;
                }
                Some(_) => parameters.push(parser.field_type()?),
                None => {
                    return Err(malformed_error!(
                        "Unterminated parameter list in '{}'",
                        descriptor
                    ))
                }
            }
        }

        let return_type = if parser.peek() == Some(b'V') {
            parser.next();
            None
        } else {
            Some(parser.field_type()?)
        };

        if !parser.is_done() {
            return Err(malformed_error!(
                "Trailing characters in method descriptor '{}'",
                descriptor
            ));
        }

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }

    /// Returns the slot size of every parameter, the receiver first for instance methods.
    #[must_use]
    pub fn parameter_slot_sizes(&self, is_static: bool) -> Vec<u8> {
        let receiver = if is_static { None } else { Some(1) };
        receiver
            .into_iter()
            .chain(self.parameters.iter().map(FieldType::slot_size))
            .collect()
    }

    /// Returns the total number of slots taken by the parameters (and receiver).
    #[must_use]
    pub fn parameter_size(&self, is_static: bool) -> usize {
        self.parameter_slot_sizes(is_static)
            .iter()
            .map(|size| usize::from(*size))
            .sum()
    }

    /// Returns the class names referenced by parameter and return types, in order.
    #[must_use]
    pub fn referenced_class_names(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .chain(self.return_type.iter())
            .filter_map(FieldType::class_name)
            .collect()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for parameter in &self.parameters {
            write!(f, "{parameter}")?;
        }
        write!(f, ")")?;
        match &self.return_type {
            Some(return_type) => write!(f, "{return_type}"),
            None => write!(f, "V"),
        }
    }
}

struct DescriptorParser<'a> {
    descriptor: &'a str,
    position: usize,
}

impl<'a> DescriptorParser<'a> {
    fn new(descriptor: &'a str) -> Self {
        Self {
            descriptor,
            position: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.descriptor.as_bytes().get(self.position).copied()
    }

    fn next(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.position += 1;
        Some(byte)
    }

    fn is_done(&self) -> bool {
        self.position == self.descriptor.len()
    }

    fn field_type(&mut self) -> Result<FieldType> {
        match self.next() {
            Some(b'B') => Ok(FieldType::Byte),
            Some(b'C') => Ok(FieldType::Char),
            Some(b'D') => Ok(FieldType::Double),
            Some(b'F') => Ok(FieldType::Float),
            Some(b'I') => Ok(FieldType::Int),
            Some(b'J') => Ok(FieldType::Long),
            Some(b'S') => Ok(FieldType::Short),
            Some(b'Z') => Ok(FieldType::Boolean),
            Some(b'L') => {
                let rest = &self.descriptor[self.position..];
                let Some(end) = rest.find(';') else {
                    return Err(malformed_error!(
                        "Unterminated class name in '{}'",
                        self.descriptor
                    ));
                };
                if end == 0 {
                    return Err(malformed_error!("Empty class name in '{}'", self.descriptor));
                }
                self.position += end + 1;
                Ok(FieldType::Object(rest[..end].to_string()))
            }
            Some(b'[') => Ok(FieldType::Array(Box::new(self.field_type()?))),
            Some(other) => Err(malformed_error!(
                "Invalid type character '{}' in '{}'",
                char::from(other),
                self.descriptor
            )),
            None => Err(malformed_error!(
                "Unexpected end of descriptor '{}'",
                self.descriptor
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_parse_primitive_field_types() {
        assert_eq!(FieldType::parse("I").unwrap(), FieldType::Int);
        assert_eq!(FieldType::parse("J").unwrap(), FieldType::Long);
        assert_eq!(FieldType::parse("Z").unwrap(), FieldType::Boolean);
        assert!(FieldType::parse("D").unwrap().is_category2());
        assert!(!FieldType::parse("F").unwrap().is_category2());
    }

    #[test]
    fn test_parse_reference_field_types() {
        let string = FieldType::parse("Ljava/lang/String;").unwrap();
        assert_eq!(string, FieldType::Object("java/lang/String".to_string()));
        assert_eq!(string.class_name(), Some("java/lang/String"));
        assert!(string.is_reference());

        let matrix = FieldType::parse("[[Ljava/lang/Object;").unwrap();
        assert_eq!(matrix.class_name(), Some("java/lang/Object"));
        assert_eq!(matrix.slot_size(), 1);

        let bytes = FieldType::parse("[B").unwrap();
        assert_eq!(bytes.class_name(), None);
        assert!(bytes.is_reference());
    }

    #[test]
    fn test_parse_invalid_field_types() {
        assert!(matches!(FieldType::parse(""), Err(Error::Malformed { .. })));
        assert!(matches!(FieldType::parse("X"), Err(Error::Malformed { .. })));
        assert!(matches!(
            FieldType::parse("Ljava/lang/String"),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(FieldType::parse("L;"), Err(Error::Malformed { .. })));
        assert!(matches!(FieldType::parse("II"), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_parse_method_descriptor() {
        let descriptor = MethodDescriptor::parse("(IJ[Ljava/lang/String;D)Ljava/lang/Object;")
            .unwrap();
        assert_eq!(descriptor.parameters.len(), 4);
        assert_eq!(
            descriptor.return_type,
            Some(FieldType::Object("java/lang/Object".to_string()))
        );
        assert_eq!(
            descriptor.referenced_class_names(),
            vec!["java/lang/String", "java/lang/Object"]
        );
    }

    #[test]
    fn test_parameter_slot_sizes() {
        let descriptor = MethodDescriptor::parse("(J)V").unwrap();
        assert_eq!(descriptor.parameter_slot_sizes(false), vec![1, 2]);
        assert_eq!(descriptor.parameter_slot_sizes(true), vec![2]);
        assert_eq!(descriptor.parameter_size(false), 3);
        assert_eq!(descriptor.parameter_size(true), 2);

        let empty = MethodDescriptor::parse("()V").unwrap();
        assert!(empty.parameter_slot_sizes(true).is_empty());
        assert_eq!(empty.parameter_size(false), 1);
    }

    #[test]
    fn test_parse_invalid_method_descriptors() {
        for descriptor in ["", "I", "(I", "(I)", "(I)VV", "(Q)V"] {
            assert!(
                matches!(MethodDescriptor::parse(descriptor), Err(Error::Malformed { .. })),
                "{descriptor} should be rejected"
            );
        }
    }

    #[test]
    fn test_descriptor_display() {
        let text = "(ZLjava/util/List;[[I)[J";
        assert_eq!(MethodDescriptor::parse(text).unwrap().to_string(), text);
        assert_eq!(MethodDescriptor::parse("()V").unwrap().to_string(), "()V");
    }
}
