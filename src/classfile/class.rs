//! Classes, fields and methods of the program model.
//!
//! A [`ProgramClass`] owns its [`ConstantPool`], bootstrap methods, fields and methods. The same
//! structure describes both program classes (the code being optimized) and library classes
//! (code outside it, flagged with [`ProgramClass::is_library`]); library classes usually carry
//! member declarations only.
//!
//! Tokens are [`Token::new(0)`](Token::new) until the class is added to a
//! [`crate::classfile::ClassPool`], which assigns the final identities.

use crate::{
    classfile::{
        access::{AccessFlags, Visibility},
        constant::{BootstrapMethod, ConstantPool},
        descriptor::{FieldType, MethodDescriptor},
        instruction::Code,
        token::Token,
    },
    Result,
};

/// Name of instance initializers.
pub const INSTANCE_INITIALIZER: &str = "<init>";

/// Name of class initializers.
pub const CLASS_INITIALIZER: &str = "<clinit>";

/// Returns the package part of an internal class name, empty for the default package.
///
/// Array descriptors are reduced to their element class first.
///
/// ```rust
/// use classfacts::classfile::package_name;
///
/// assert_eq!(package_name("java/lang/String"), "java/lang");
/// assert_eq!(package_name("[Ljava/util/List;"), "java/util");
/// assert_eq!(package_name("Main"), "");
/// ```
#[must_use]
pub fn package_name(class_name: &str) -> &str {
    let element = class_name.trim_start_matches('[');
    let element = element
        .strip_prefix('L')
        .and_then(|name| name.strip_suffix(';'))
        .unwrap_or(element);
    match element.rfind('/') {
        Some(end) => &element[..end],
        None => "",
    }
}

/// A field declared by a class.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramField {
    /// Identity assigned by the class pool
    pub token: Token,
    /// Declaring class
    pub class: Token,
    /// Field name
    pub name: String,
    /// Field descriptor
    pub descriptor: String,
    /// Access flags
    pub access: AccessFlags,
    /// Index of the `ConstantValue` attribute's constant, if present
    pub constant_value: Option<u16>,
}

impl ProgramField {
    /// Parses the descriptor of this field.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for an invalid descriptor.
    pub fn field_type(&self) -> Result<FieldType> {
        FieldType::parse(&self.descriptor)
    }

    /// Returns true if the field is static.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.is_static()
    }

    /// Returns true if the field is final.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.access.contains(AccessFlags::FINAL)
    }

    /// Returns the visibility of the field.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.access.visibility()
    }
}

/// A method declared by a class.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramMethod {
    /// Identity assigned by the class pool
    pub token: Token,
    /// Declaring class
    pub class: Token,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Access flags
    pub access: AccessFlags,
    /// The body, absent for abstract and native methods and for most library methods
    pub code: Option<Code>,
}

impl ProgramMethod {
    /// Parses the descriptor of this method.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for an invalid descriptor.
    pub fn method_descriptor(&self) -> Result<MethodDescriptor> {
        MethodDescriptor::parse(&self.descriptor)
    }

    /// Returns the number of parameter slots, including the receiver of instance methods.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for an invalid descriptor.
    pub fn parameter_size(&self) -> Result<usize> {
        Ok(self.method_descriptor()?.parameter_size(self.is_static()))
    }

    /// Returns true if the method is static.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.is_static()
    }

    /// Returns true if the method is private.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.access.contains(AccessFlags::PRIVATE)
    }

    /// Returns true if the method is abstract.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.access.contains(AccessFlags::ABSTRACT)
    }

    /// Returns true if the method is native.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.access.contains(AccessFlags::NATIVE)
    }

    /// Returns true if the method is synchronized.
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.access.contains(AccessFlags::SYNCHRONIZED)
    }

    /// Returns true for `<init>` methods.
    #[must_use]
    pub fn is_instance_initializer(&self) -> bool {
        self.name == INSTANCE_INITIALIZER
    }

    /// Returns true for `<clinit>` methods.
    #[must_use]
    pub fn is_class_initializer(&self) -> bool {
        self.name == CLASS_INITIALIZER
    }

    /// Returns true for either kind of initializer.
    #[must_use]
    pub fn is_initializer(&self) -> bool {
        self.is_instance_initializer() || self.is_class_initializer()
    }

    /// Returns true if invocations of this method are dispatched virtually.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        !self.is_static() && !self.is_private() && !self.is_initializer()
    }

    /// Returns the visibility of the method.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.access.visibility()
    }
}

/// A class of the program model.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramClass {
    /// Identity assigned by the class pool
    pub token: Token,
    /// Internal name, e.g. `java/lang/String`
    pub name: String,
    /// Access flags
    pub access: AccessFlags,
    /// Internal name of the superclass, `None` only for `java/lang/Object`
    pub super_name: Option<String>,
    /// Internal names of the directly implemented interfaces
    pub interface_names: Vec<String>,
    /// The superclass, once linked
    pub super_class: Option<Token>,
    /// The directly implemented interfaces that resolved, once linked
    pub interfaces: Vec<Token>,
    /// The constant pool
    pub constant_pool: ConstantPool,
    /// Entries of the `BootstrapMethods` attribute
    pub bootstrap_methods: Vec<BootstrapMethod>,
    /// Declared fields
    pub fields: Vec<ProgramField>,
    /// Declared methods
    pub methods: Vec<ProgramMethod>,
    /// True for classes outside the program being optimized
    pub is_library: bool,
}

impl ProgramClass {
    /// Returns the declared field with the given name and descriptor.
    #[must_use]
    pub fn field(&self, name: &str, descriptor: &str) -> Option<&ProgramField> {
        self.fields
            .iter()
            .find(|field| field.name == name && field.descriptor == descriptor)
    }

    /// Returns the declared method with the given name and descriptor.
    #[must_use]
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&ProgramMethod> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }

    /// Returns the class initializer, if declared.
    #[must_use]
    pub fn class_initializer(&self) -> Option<&ProgramMethod> {
        self.methods.iter().find(|method| method.is_class_initializer())
    }

    /// Returns the package this class belongs to.
    #[must_use]
    pub fn package_name(&self) -> &str {
        package_name(&self.name)
    }

    /// Returns true if both classes are declared in the same package.
    #[must_use]
    pub fn is_in_same_package(&self, other: &ProgramClass) -> bool {
        self.package_name() == other.package_name()
    }

    /// Returns true if the class is an interface.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.access.contains(AccessFlags::INTERFACE)
    }

    /// Returns true if the class is public.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.access.contains(AccessFlags::PUBLIC)
    }

    /// Returns true if the class is final.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.access.contains(AccessFlags::FINAL)
    }

    /// Returns true if the class belongs to the program being optimized.
    #[must_use]
    pub fn is_program(&self) -> bool {
        !self.is_library
    }
}
