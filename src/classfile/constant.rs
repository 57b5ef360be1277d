//! Constant pool entries and their resolved cross-references.
//!
//! Instructions refer to classes, fields, methods and literals through indices into the
//! per-class [`ConstantPool`]. Once the [`crate::classfile::ClassPool`] is linked, every entry
//! that names a class or member also carries the [`Token`] of the entity it resolved to; the
//! marking visitors only ever follow these resolved references.
//!
//! Like in class files, index `0` is unusable and `long`/`double` constants take two entries.

use strum::{Display, FromRepr, IntoStaticStr};

use crate::{classfile::token::Token, Error, Result};

/// The kind of a method handle constant, as defined for `CONSTANT_MethodHandle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum ReferenceKind {
    /// `REF_getField`
    GetField = 1,
    /// `REF_getStatic`
    GetStatic = 2,
    /// `REF_putField`
    PutField = 3,
    /// `REF_putStatic`
    PutStatic = 4,
    /// `REF_invokeVirtual`
    InvokeVirtual = 5,
    /// `REF_invokeStatic`
    InvokeStatic = 6,
    /// `REF_invokeSpecial`
    InvokeSpecial = 7,
    /// `REF_newInvokeSpecial`
    NewInvokeSpecial = 8,
    /// `REF_invokeInterface`
    InvokeInterface = 9,
}

impl ReferenceKind {
    /// Returns true if the handle refers to a field rather than a method.
    #[must_use]
    pub fn is_field(self) -> bool {
        matches!(
            self,
            Self::GetField | Self::GetStatic | Self::PutField | Self::PutStatic
        )
    }
}

/// A class constant.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassConstant {
    /// Internal class name, or array descriptor for array classes
    pub name: String,
    /// The class this constant resolved to; the element class for object arrays
    pub referenced_class: Option<Token>,
}

impl ClassConstant {
    /// Returns true for array classes of a primitive element type, which never resolve.
    #[must_use]
    pub fn is_primitive_array(&self) -> bool {
        self.name.starts_with('[') && !self.name.trim_start_matches('[').starts_with('L')
    }
}

/// What a string constant is known to denote when it is used reflectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionTarget {
    /// Internal name of the denoted class
    pub class_name: String,
    /// Name of the denoted member, if the string names one
    pub member_name: Option<String>,
    /// Descriptor of the denoted member, if known
    pub descriptor: Option<String>,
}

/// A string constant.
#[derive(Debug, Clone, PartialEq)]
pub struct StringConstant {
    /// The string value
    pub value: String,
    /// Reflection target recorded by whoever built the program model
    pub reflection: Option<ReflectionTarget>,
    /// The class the reflection target resolved to
    pub referenced_class: Option<Token>,
    /// The member the reflection target resolved to
    pub referenced_member: Option<Token>,
}

/// A field, method or interface method reference.
#[derive(Debug, Clone, PartialEq)]
pub struct RefConstant {
    /// Index of the class constant the member is referenced through
    pub class_index: u16,
    /// Index of the name-and-type constant
    pub name_and_type_index: u16,
    /// The class named by `class_index`
    pub referenced_class: Option<Token>,
    /// The member the reference resolved to, possibly declared in a superclass
    pub referenced_member: Option<Token>,
}

/// A name-and-type constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAndTypeConstant {
    /// Member name
    pub name: String,
    /// Member descriptor
    pub descriptor: String,
}

/// A method handle constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodHandleConstant {
    /// How the referenced member is accessed
    pub kind: ReferenceKind,
    /// Index of the field or method reference constant
    pub reference_index: u16,
}

/// A method type constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTypeConstant {
    /// The method descriptor
    pub descriptor: String,
    /// Classes named by the descriptor that resolved
    pub referenced_classes: Vec<Token>,
}

/// A dynamically computed constant or call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicConstant {
    /// Index into the bootstrap methods of the declaring class
    pub bootstrap_method_index: u16,
    /// Index of the name-and-type constant
    pub name_and_type_index: u16,
    /// Classes named by the descriptor that resolved
    pub referenced_classes: Vec<Token>,
}

/// A bootstrap method entry of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    /// Index of the method handle constant
    pub method_handle_index: u16,
    /// Indices of the static arguments
    pub arguments: Vec<u16>,
}

/// One entry of a constant pool.
#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Constant {
    /// Index 0 and the second entry of `long`/`double` constants
    Unusable,
    /// `CONSTANT_Utf8`
    Utf8(String),
    /// `CONSTANT_Integer`
    Integer(i32),
    /// `CONSTANT_Float`
    Float(f32),
    /// `CONSTANT_Long`
    Long(i64),
    /// `CONSTANT_Double`
    Double(f64),
    /// `CONSTANT_String`
    String(StringConstant),
    /// `CONSTANT_Class`
    Class(ClassConstant),
    /// `CONSTANT_Fieldref`
    Fieldref(RefConstant),
    /// `CONSTANT_Methodref`
    Methodref(RefConstant),
    /// `CONSTANT_InterfaceMethodref`
    InterfaceMethodref(RefConstant),
    /// `CONSTANT_NameAndType`
    NameAndType(NameAndTypeConstant),
    /// `CONSTANT_MethodHandle`
    MethodHandle(MethodHandleConstant),
    /// `CONSTANT_MethodType`
    MethodType(MethodTypeConstant),
    /// `CONSTANT_Dynamic`
    Dynamic(DynamicConstant),
    /// `CONSTANT_InvokeDynamic`
    InvokeDynamic(DynamicConstant),
}

impl Constant {
    /// Returns the kind of this constant, for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.into()
    }

    /// Returns the member reference carried by field, method and interface method references.
    #[must_use]
    pub fn as_ref_constant(&self) -> Option<&RefConstant> {
        match self {
            Constant::Fieldref(reference)
            | Constant::Methodref(reference)
            | Constant::InterfaceMethodref(reference) => Some(reference),
            _ => None,
        }
    }

    fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

/// The constant pool of one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    /// Creates an empty pool holding only the unusable entry 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: vec![Constant::Unusable],
        }
    }

    /// Returns the number of entries, including the unusable ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the pool holds no usable entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Returns the constant at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConstantIndex`] for index 0, indices past the end and the
    /// second entry of `long`/`double` constants.
    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(usize::from(index)) {
            Some(Constant::Unusable) | None => Err(Error::InvalidConstantIndex(index)),
            Some(constant) => Ok(constant),
        }
    }

    /// Returns the constant at `index` for modification.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ConstantPool::get`].
    pub fn get_mut(&mut self, index: u16) -> Result<&mut Constant> {
        match self.entries.get_mut(usize::from(index)) {
            Some(Constant::Unusable) | None => Err(Error::InvalidConstantIndex(index)),
            Some(constant) => Ok(constant),
        }
    }

    /// Iterates over all usable entries with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, constant)| !matches!(constant, Constant::Unusable))
            .map(|(index, constant)| (index as u16, constant))
    }

    /// Iterates mutably over all usable entries with their indices.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u16, &mut Constant)> {
        self.entries
            .iter_mut()
            .enumerate()
            .filter(|(_, constant)| !matches!(constant, Constant::Unusable))
            .map(|(index, constant)| (index as u16, constant))
    }

    /// Appends a constant without looking for an equal one and returns its index.
    pub fn add(&mut self, constant: Constant) -> u16 {
        let index = self.entries.len() as u16;
        let wide = constant.is_wide();
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        index
    }

    fn intern(&mut self, constant: Constant, same: impl Fn(&Constant) -> bool) -> u16 {
        let existing = self
            .iter()
            .find(|(_, existing)| same(existing))
            .map(|(index, _)| index);
        match existing {
            Some(index) => index,
            None => self.add(constant),
        }
    }

    /// Interns a UTF-8 constant.
    pub fn utf8(&mut self, value: &str) -> u16 {
        self.intern(Constant::Utf8(value.to_string()), |c| {
            matches!(c, Constant::Utf8(existing) if existing == value)
        })
    }

    /// Interns an integer constant.
    pub fn integer(&mut self, value: i32) -> u16 {
        self.intern(Constant::Integer(value), |c| {
            matches!(c, Constant::Integer(existing) if *existing == value)
        })
    }

    /// Interns a float constant, comparing bit patterns.
    pub fn float(&mut self, value: f32) -> u16 {
        self.intern(Constant::Float(value), |c| {
            matches!(c, Constant::Float(existing) if existing.to_bits() == value.to_bits())
        })
    }

    /// Interns a long constant.
    pub fn long(&mut self, value: i64) -> u16 {
        self.intern(Constant::Long(value), |c| {
            matches!(c, Constant::Long(existing) if *existing == value)
        })
    }

    /// Interns a double constant, comparing bit patterns.
    pub fn double(&mut self, value: f64) -> u16 {
        self.intern(Constant::Double(value), |c| {
            matches!(c, Constant::Double(existing) if existing.to_bits() == value.to_bits())
        })
    }

    /// Interns a plain string constant.
    pub fn string(&mut self, value: &str) -> u16 {
        self.intern(
            Constant::String(StringConstant {
                value: value.to_string(),
                reflection: None,
                referenced_class: None,
                referenced_member: None,
            }),
            |c| matches!(c, Constant::String(existing) if existing.value == value && existing.reflection.is_none()),
        )
    }

    /// Adds a string constant that is known to denote a class or member reflectively.
    pub fn reflected_string(&mut self, value: &str, target: ReflectionTarget) -> u16 {
        self.add(Constant::String(StringConstant {
            value: value.to_string(),
            reflection: Some(target),
            referenced_class: None,
            referenced_member: None,
        }))
    }

    /// Interns a class constant.
    pub fn class(&mut self, name: &str) -> u16 {
        self.intern(
            Constant::Class(ClassConstant {
                name: name.to_string(),
                referenced_class: None,
            }),
            |c| matches!(c, Constant::Class(existing) if existing.name == name),
        )
    }

    /// Interns a name-and-type constant.
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        self.intern(
            Constant::NameAndType(NameAndTypeConstant {
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            }),
            |c| {
                matches!(c, Constant::NameAndType(existing)
                    if existing.name == name && existing.descriptor == descriptor)
            },
        )
    }

    fn member_ref(
        &mut self,
        class_name: &str,
        name: &str,
        descriptor: &str,
        wrap: fn(RefConstant) -> Constant,
    ) -> u16 {
        let class_index = self.class(class_name);
        let name_and_type_index = self.name_and_type(name, descriptor);
        let candidate = wrap(RefConstant {
            class_index,
            name_and_type_index,
            referenced_class: None,
            referenced_member: None,
        });
        let probe = candidate.clone();
        self.intern(candidate, move |c| {
            std::mem::discriminant(c) == std::mem::discriminant(&probe)
                && c.as_ref_constant().map(|r| (r.class_index, r.name_and_type_index))
                    == Some((class_index, name_and_type_index))
        })
    }

    /// Interns a field reference, including its class and name-and-type constants.
    pub fn fieldref(&mut self, class_name: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(class_name, name, descriptor, Constant::Fieldref)
    }

    /// Interns a method reference, including its class and name-and-type constants.
    pub fn methodref(&mut self, class_name: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(class_name, name, descriptor, Constant::Methodref)
    }

    /// Interns an interface method reference, including its class and name-and-type constants.
    pub fn interface_methodref(&mut self, class_name: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(class_name, name, descriptor, Constant::InterfaceMethodref)
    }

    /// Interns a method handle constant pointing at an existing reference constant.
    pub fn method_handle(&mut self, kind: ReferenceKind, reference_index: u16) -> u16 {
        self.intern(
            Constant::MethodHandle(MethodHandleConstant {
                kind,
                reference_index,
            }),
            |c| {
                matches!(c, Constant::MethodHandle(existing)
                    if existing.kind == kind && existing.reference_index == reference_index)
            },
        )
    }

    /// Interns a method type constant.
    pub fn method_type(&mut self, descriptor: &str) -> u16 {
        self.intern(
            Constant::MethodType(MethodTypeConstant {
                descriptor: descriptor.to_string(),
                referenced_classes: Vec::new(),
            }),
            |c| matches!(c, Constant::MethodType(existing) if existing.descriptor == descriptor),
        )
    }

    /// Adds a dynamically computed constant.
    pub fn dynamic(&mut self, bootstrap_method_index: u16, name: &str, descriptor: &str) -> u16 {
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.add(Constant::Dynamic(DynamicConstant {
            bootstrap_method_index,
            name_and_type_index,
            referenced_classes: Vec::new(),
        }))
    }

    /// Adds a dynamically computed call site.
    pub fn invoke_dynamic(
        &mut self,
        bootstrap_method_index: u16,
        name: &str,
        descriptor: &str,
    ) -> u16 {
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.add(Constant::InvokeDynamic(DynamicConstant {
            bootstrap_method_index,
            name_and_type_index,
            referenced_classes: Vec::new(),
        }))
    }

    /// Returns the class constant at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the entry is not a class constant.
    pub fn class_constant(&self, index: u16) -> Result<&ClassConstant> {
        match self.get(index)? {
            Constant::Class(class) => Ok(class),
            other => Err(malformed_error!(
                "Expected class constant at #{}, found {}",
                index,
                other.kind_name()
            )),
        }
    }

    /// Returns the field, method or interface method reference at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the entry is not a member reference.
    pub fn ref_constant(&self, index: u16) -> Result<&RefConstant> {
        let constant = self.get(index)?;
        constant.as_ref_constant().ok_or_else(|| {
            malformed_error!(
                "Expected member reference at #{}, found {}",
                index,
                constant.kind_name()
            )
        })
    }

    /// Returns the name-and-type constant at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the entry is not a name-and-type constant.
    pub fn name_and_type_constant(&self, index: u16) -> Result<&NameAndTypeConstant> {
        match self.get(index)? {
            Constant::NameAndType(name_and_type) => Ok(name_and_type),
            other => Err(malformed_error!(
                "Expected name-and-type constant at #{}, found {}",
                index,
                other.kind_name()
            )),
        }
    }

    /// Returns the class name, member name and descriptor of the reference at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the entry or one of its components has the wrong kind.
    pub fn ref_parts(&self, index: u16) -> Result<(&str, &str, &str)> {
        let reference = self.ref_constant(index)?;
        let class = self.class_constant(reference.class_index)?;
        let name_and_type = self.name_and_type_constant(reference.name_and_type_index)?;
        Ok((&class.name, &name_and_type.name, &name_and_type.descriptor))
    }
}
