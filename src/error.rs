use thiserror::Error;

use crate::classfile::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every variant describes a broken precondition: either the program model handed to the
/// analysis is not well-formed or not fully linked, or a caller violated the contract of a
/// fact-store operation. None of them is a data-dependent runtime condition; code outside the
/// analyzed program is modelled by opaque facts, not by errors.
///
/// # Error Categories
///
/// ## Program model errors
/// - [`Error::Malformed`] - Invalid descriptor or constant of the wrong kind
/// - [`Error::InvalidConstantIndex`] - Constant-pool index out of range
/// - [`Error::Unresolved`] - Constant-pool entry without its resolved reference
/// - [`Error::EntityNotFound`] - Token unknown to the class pool
///
/// ## Fact store errors
/// - [`Error::MissingFacts`] - No facts were attached to an entity
/// - [`Error::InvalidSlot`] - Slot index outside the parameter slots of a method
/// - [`Error::IncompatibleValues`] - Generalizing values of different kinds
///
/// # Examples
///
/// ```rust
/// use classfacts::{Error, analysis::Value};
///
/// let int = Value::Integer(Some(1));
/// let long = Value::Long(Some(1));
///
/// match int.generalize(&long) {
///     Err(Error::IncompatibleValues { left, right }) => {
///         assert_eq!(left, "int");
///         assert_eq!(right, "long");
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The program model contains structurally invalid data.
    ///
    /// Raised for unparsable descriptors or when a constant-pool index points at a
    /// constant of an unexpected kind. The error includes the source location where
    /// the problem was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A constant-pool index is zero or beyond the end of the pool.
    #[error("Invalid constant pool index - {0}")]
    InvalidConstantIndex(u16),

    /// A constant-pool entry does not carry the class or member it refers to.
    ///
    /// Marking visitors assume a fully linked program model; reaching an entry whose
    /// reference was never resolved means the linkage precondition is broken.
    #[error("Unresolved constant #{index} in class {class}")]
    Unresolved {
        /// The class whose constant pool holds the entry
        class: Token,
        /// The constant-pool index of the entry
        index: u16,
    },

    /// The class pool does not know the entity identified by this token.
    #[error("Unknown entity - {0}")]
    EntityNotFound(Token),

    /// No facts have been attached to the entity identified by this token.
    #[error("No optimization info attached to {0}")]
    MissingFacts(Token),

    /// A slot-indexed operation addressed a slot that is not a parameter slot.
    ///
    /// Slots at index 64 and above are not an error; they are always treated as set.
    #[error("Slot {slot} is outside the {size} parameter slots of method {method}")]
    InvalidSlot {
        /// The method whose facts were addressed
        method: Token,
        /// The offending slot index
        slot: usize,
        /// The number of parameter slots of the method
        size: usize,
    },

    /// Two abstract values of different computational kinds were generalized.
    #[error("Can not generalize {left} value with {right} value")]
    IncompatibleValues {
        /// Kind of the value being generalized
        left: &'static str,
        /// Kind of the value it was generalized with
        right: &'static str,
    },
}
