//! Fluent builders for classes and method bodies.
//!
//! [`ClassBuilder`] assembles a [`ProgramClass`] together with its constant pool: every
//! instruction that names a class or member interns the required constants on the fly. Method
//! bodies are written through a closure receiving a [`CodeBuilder`], which lays out instruction
//! offsets and resolves branch [`Label`]s when the body is finished.
//!
//! # Examples
//!
//! ```rust
//! use classfacts::classfile::{AccessFlags, ClassBuilder, Opcode};
//!
//! let class = ClassBuilder::new("demo/Counter")
//!     .access(AccessFlags::PUBLIC)
//!     .field("count", "I", AccessFlags::PRIVATE)
//!     .method("increment", "()V", AccessFlags::PUBLIC, |code| {
//!         code.aload(0)
//!             .dup()
//!             .getfield("demo/Counter", "count", "I")
//!             .push_int(1)
//!             .op(Opcode::Iadd)
//!             .putfield("demo/Counter", "count", "I")
//!             .op(Opcode::Return);
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let body = class.methods[0].code.as_ref().unwrap();
//! assert_eq!(body.instructions.len(), 7);
//! assert_eq!(body.max_locals, 1);
//! # Ok::<(), classfacts::Error>(())
//! ```

use crate::{
    classfile::{
        access::AccessFlags,
        class::{ProgramClass, ProgramField, ProgramMethod},
        constant::{BootstrapMethod, Constant, ConstantPool, ReferenceKind},
        descriptor::MethodDescriptor,
        instruction::{Code, ExceptionHandler, Instruction, Opcode, Operand},
        token::Token,
    },
    Error, Result,
};

/// Name of the implicit superclass.
pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";

/// Builder for [`ProgramClass`] instances.
pub struct ClassBuilder {
    class: ProgramClass,
    error: Option<Error>,
}

impl ClassBuilder {
    /// Starts a public program class extending `java/lang/Object`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let super_name = (name != JAVA_LANG_OBJECT).then(|| JAVA_LANG_OBJECT.to_string());
        Self {
            class: ProgramClass {
                token: Token::new(0),
                name: name.to_string(),
                access: AccessFlags::PUBLIC | AccessFlags::SUPER,
                super_name,
                interface_names: Vec::new(),
                super_class: None,
                interfaces: Vec::new(),
                constant_pool: ConstantPool::new(),
                bootstrap_methods: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                is_library: false,
            },
            error: None,
        }
    }

    /// Replaces the access flags of the class.
    #[must_use]
    pub fn access(mut self, access: AccessFlags) -> Self {
        self.class.access = access;
        self
    }

    /// Sets the superclass.
    #[must_use]
    pub fn extends(mut self, super_name: &str) -> Self {
        self.class.super_name = Some(super_name.to_string());
        self
    }

    /// Adds a directly implemented interface.
    #[must_use]
    pub fn implements(mut self, interface_name: &str) -> Self {
        self.class.interface_names.push(interface_name.to_string());
        self
    }

    /// Marks the class as a library class.
    #[must_use]
    pub fn library(mut self) -> Self {
        self.class.is_library = true;
        self
    }

    /// Declares a field.
    #[must_use]
    pub fn field(mut self, name: &str, descriptor: &str, access: AccessFlags) -> Self {
        self.push_field(name, descriptor, access, None);
        self
    }

    /// Declares a field with a `ConstantValue` attribute, interned through `constant`.
    #[must_use]
    pub fn constant_field(
        mut self,
        name: &str,
        descriptor: &str,
        access: AccessFlags,
        constant: impl FnOnce(&mut ConstantPool) -> u16,
    ) -> Self {
        let index = constant(&mut self.class.constant_pool);
        self.push_field(name, descriptor, access, Some(index));
        self
    }

    fn push_field(
        &mut self,
        name: &str,
        descriptor: &str,
        access: AccessFlags,
        constant_value: Option<u16>,
    ) {
        self.class.fields.push(ProgramField {
            token: Token::new(0),
            class: Token::new(0),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access,
            constant_value,
        });
    }

    /// Declares a method without a body, e.g. abstract, native or library methods.
    #[must_use]
    pub fn declare_method(mut self, name: &str, descriptor: &str, access: AccessFlags) -> Self {
        self.push_method(name, descriptor, access, None);
        self
    }

    /// Declares a method whose body is written by `body`.
    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        descriptor: &str,
        access: AccessFlags,
        body: impl FnOnce(&mut CodeBuilder<'_>) -> Result<()>,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.build_code(descriptor, access, body) {
            Ok(code) => self.push_method(name, descriptor, access, Some(code)),
            Err(error) => self.error = Some(error),
        }
        self
    }

    fn build_code(
        &mut self,
        descriptor: &str,
        access: AccessFlags,
        body: impl FnOnce(&mut CodeBuilder<'_>) -> Result<()>,
    ) -> Result<Code> {
        let parameter_size = MethodDescriptor::parse(descriptor)?.parameter_size(access.is_static());
        let mut code = CodeBuilder::new(&mut self.class.constant_pool, parameter_size);
        body(&mut code)?;
        code.finish()
    }

    fn push_method(
        &mut self,
        name: &str,
        descriptor: &str,
        access: AccessFlags,
        code: Option<Code>,
    ) {
        self.class.methods.push(ProgramMethod {
            token: Token::new(0),
            class: Token::new(0),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access,
            code,
        });
    }

    /// Adds a bootstrap method invoking the given static method, without static arguments.
    ///
    /// Bootstrap methods are numbered in the order they are added.
    #[must_use]
    pub fn bootstrap_method(mut self, class_name: &str, name: &str, descriptor: &str) -> Self {
        let pool = &mut self.class.constant_pool;
        let reference = pool.methodref(class_name, name, descriptor);
        let method_handle_index = pool.method_handle(ReferenceKind::InvokeStatic, reference);
        self.class.bootstrap_methods.push(BootstrapMethod {
            method_handle_index,
            arguments: Vec::new(),
        });
        self
    }

    /// Gives direct access to the constant pool, e.g. for reflected strings.
    #[must_use]
    pub fn with_constants(mut self, edit: impl FnOnce(&mut ConstantPool)) -> Self {
        edit(&mut self.class.constant_pool);
        self
    }

    /// Finishes the class.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while building a method body, e.g. an invalid descriptor
    /// or an unplaced label.
    pub fn build(self) -> Result<ProgramClass> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.class),
        }
    }
}

/// A branch target inside a method body under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Builder for method bodies, handed to the closure of [`ClassBuilder::method`].
pub struct CodeBuilder<'a> {
    pool: &'a mut ConstantPool,
    parameter_size: usize,
    offset: u32,
    instructions: Vec<Instruction>,
    labels: Vec<Option<u32>>,
    branch_fixups: Vec<(usize, Label)>,
    handlers: Vec<(Label, Label, Label, u16)>,
    max_stack: u16,
    max_locals: Option<u16>,
    error: Option<Error>,
}

impl<'a> CodeBuilder<'a> {
    fn new(pool: &'a mut ConstantPool, parameter_size: usize) -> Self {
        Self {
            pool,
            parameter_size,
            offset: 0,
            instructions: Vec::new(),
            labels: Vec::new(),
            branch_fixups: Vec::new(),
            handlers: Vec::new(),
            max_stack: 0,
            max_locals: None,
            error: None,
        }
    }

    /// Gives access to the constant pool of the class under construction.
    pub fn constants(&mut self) -> &mut ConstantPool {
        &mut *self.pool
    }

    /// Appends an instruction as is, assigning its offset.
    pub fn raw(&mut self, mut instruction: Instruction) -> &mut Self {
        instruction.offset = self.offset;
        self.offset += instruction.length();
        self.instructions.push(instruction);
        self
    }

    /// Appends an operand-less instruction.
    pub fn op(&mut self, opcode: Opcode) -> &mut Self {
        self.raw(Instruction::simple(opcode))
    }

    /// Appends `dup`.
    pub fn dup(&mut self) -> &mut Self {
        self.op(Opcode::Dup)
    }

    /// Appends a local-variable instruction, picking the `_n` form for slots 0 to 3.
    ///
    /// `opcode` is the explicit form, e.g. [`Opcode::Iload`] or [`Opcode::Astore`].
    pub fn local(&mut self, opcode: Opcode, index: u16) -> &mut Self {
        let base = opcode as u8;
        let shorthand = if index > 3 {
            None
        } else if (Opcode::Iload as u8..=Opcode::Aload as u8).contains(&base) {
            Opcode::from_repr(Opcode::Iload0 as u8 + (base - Opcode::Iload as u8) * 4 + index as u8)
        } else if (Opcode::Istore as u8..=Opcode::Astore as u8).contains(&base) {
            Opcode::from_repr(
                Opcode::Istore0 as u8 + (base - Opcode::Istore as u8) * 4 + index as u8,
            )
        } else {
            None
        };
        match shorthand {
            Some(shorthand) => self.op(shorthand),
            None => self.raw(Instruction::new(opcode, Operand::Local(index))),
        }
    }

    /// Appends `iload`.
    pub fn iload(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Iload, index)
    }

    /// Appends `lload`.
    pub fn lload(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Lload, index)
    }

    /// Appends `dload`.
    pub fn dload(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Dload, index)
    }

    /// Appends `aload`.
    pub fn aload(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Aload, index)
    }

    /// Appends `istore`.
    pub fn istore(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Istore, index)
    }

    /// Appends `lstore`.
    pub fn lstore(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Lstore, index)
    }

    /// Appends `astore`.
    pub fn astore(&mut self, index: u16) -> &mut Self {
        self.local(Opcode::Astore, index)
    }

    /// Appends `iinc`.
    pub fn iinc(&mut self, index: u16, delta: i16) -> &mut Self {
        self.raw(Instruction::new(
            Opcode::Iinc,
            Operand::Increment { index, delta },
        ))
    }

    /// Pushes an int with the shortest instruction that encodes it.
    pub fn push_int(&mut self, value: i32) -> &mut Self {
        match value {
            -1..=5 => match Opcode::from_repr((Opcode::Iconst0 as i32 + value) as u8) {
                Some(opcode) => self.op(opcode),
                None => self,
            },
            _ if i8::try_from(value).is_ok() => {
                self.raw(Instruction::new(Opcode::Bipush, Operand::Immediate(value)))
            }
            _ if i16::try_from(value).is_ok() => {
                self.raw(Instruction::new(Opcode::Sipush, Operand::Immediate(value)))
            }
            _ => {
                let index = self.pool.integer(value);
                self.ldc(index)
            }
        }
    }

    /// Loads the constant at `index`, picking `ldc`, `ldc_w` or `ldc2_w`.
    pub fn ldc(&mut self, index: u16) -> &mut Self {
        let opcode = match self.pool.get(index) {
            Ok(Constant::Long(_) | Constant::Double(_)) => Opcode::Ldc2W,
            _ if index > 0xff => Opcode::LdcW,
            _ => Opcode::Ldc,
        };
        self.constant(opcode, index)
    }

    /// Loads a string literal.
    pub fn ldc_string(&mut self, value: &str) -> &mut Self {
        let index = self.pool.string(value);
        self.ldc(index)
    }

    /// Loads a class literal.
    pub fn ldc_class(&mut self, class_name: &str) -> &mut Self {
        let index = self.pool.class(class_name);
        self.ldc(index)
    }

    /// Appends an instruction with a constant-pool operand.
    pub fn constant(&mut self, opcode: Opcode, index: u16) -> &mut Self {
        self.raw(Instruction::new(opcode, Operand::Constant(index)))
    }

    fn field_access(
        &mut self,
        opcode: Opcode,
        class_name: &str,
        name: &str,
        descriptor: &str,
    ) -> &mut Self {
        let index = self.pool.fieldref(class_name, name, descriptor);
        self.constant(opcode, index)
    }

    /// Appends `getfield`.
    pub fn getfield(&mut self, class_name: &str, name: &str, descriptor: &str) -> &mut Self {
        self.field_access(Opcode::Getfield, class_name, name, descriptor)
    }

    /// Appends `putfield`.
    pub fn putfield(&mut self, class_name: &str, name: &str, descriptor: &str) -> &mut Self {
        self.field_access(Opcode::Putfield, class_name, name, descriptor)
    }

    /// Appends `getstatic`.
    pub fn getstatic(&mut self, class_name: &str, name: &str, descriptor: &str) -> &mut Self {
        self.field_access(Opcode::Getstatic, class_name, name, descriptor)
    }

    /// Appends `putstatic`.
    pub fn putstatic(&mut self, class_name: &str, name: &str, descriptor: &str) -> &mut Self {
        self.field_access(Opcode::Putstatic, class_name, name, descriptor)
    }

    /// Appends `invokevirtual`.
    pub fn invokevirtual(&mut self, class_name: &str, name: &str, descriptor: &str) -> &mut Self {
        let index = self.pool.methodref(class_name, name, descriptor);
        self.constant(Opcode::Invokevirtual, index)
    }

    /// Appends `invokespecial`.
    pub fn invokespecial(&mut self, class_name: &str, name: &str, descriptor: &str) -> &mut Self {
        let index = self.pool.methodref(class_name, name, descriptor);
        self.constant(Opcode::Invokespecial, index)
    }

    /// Appends `invokestatic`.
    pub fn invokestatic(&mut self, class_name: &str, name: &str, descriptor: &str) -> &mut Self {
        let index = self.pool.methodref(class_name, name, descriptor);
        self.constant(Opcode::Invokestatic, index)
    }

    /// Appends `invokeinterface`.
    pub fn invokeinterface(
        &mut self,
        class_name: &str,
        name: &str,
        descriptor: &str,
    ) -> &mut Self {
        let index = self.pool.interface_methodref(class_name, name, descriptor);
        self.constant(Opcode::Invokeinterface, index)
    }

    /// Appends `invokedynamic` for the given bootstrap method of the class.
    pub fn invokedynamic(&mut self, bootstrap: u16, name: &str, descriptor: &str) -> &mut Self {
        let index = self.pool.invoke_dynamic(bootstrap, name, descriptor);
        self.constant(Opcode::Invokedynamic, index)
    }

    /// Appends `new`.
    pub fn new_instance(&mut self, class_name: &str) -> &mut Self {
        let index = self.pool.class(class_name);
        self.constant(Opcode::New, index)
    }

    /// Appends `anewarray`.
    pub fn anewarray(&mut self, class_name: &str) -> &mut Self {
        let index = self.pool.class(class_name);
        self.constant(Opcode::Anewarray, index)
    }

    /// Appends `newarray` with the given array type code (e.g. `10` for `int`).
    pub fn newarray(&mut self, array_type: i32) -> &mut Self {
        self.raw(Instruction::new(
            Opcode::Newarray,
            Operand::Immediate(array_type),
        ))
    }

    /// Appends `checkcast`.
    pub fn checkcast(&mut self, class_name: &str) -> &mut Self {
        let index = self.pool.class(class_name);
        self.constant(Opcode::Checkcast, index)
    }

    /// Appends `instanceof`.
    pub fn instanceof(&mut self, class_name: &str) -> &mut Self {
        let index = self.pool.class(class_name);
        self.constant(Opcode::Instanceof, index)
    }

    /// Creates a label that can be branched to before it is placed.
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Places `label` at the offset of the next instruction.
    pub fn place(&mut self, label: Label) -> &mut Self {
        let offset = self.offset;
        match self.labels.get_mut(label.0) {
            Some(slot) if slot.is_none() => *slot = Some(offset),
            _ => {
                self.error.get_or_insert_with(|| {
                    malformed_error!("Label {} placed twice or not created here", label.0)
                });
            }
        }
        self
    }

    /// Appends a branch instruction targeting `label`.
    pub fn branch(&mut self, opcode: Opcode, label: Label) -> &mut Self {
        self.branch_fixups.push((self.instructions.len(), label));
        self.raw(Instruction::new(opcode, Operand::Branch(0)))
    }

    /// Appends `goto`.
    pub fn goto(&mut self, label: Label) -> &mut Self {
        self.branch(Opcode::Goto, label)
    }

    /// Adds an exception handler covering `[start, end)`; `catch_type` `None` catches all.
    pub fn try_catch(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        catch_type: Option<&str>,
    ) -> &mut Self {
        let catch_type = catch_type.map_or(0, |name| self.pool.class(name));
        self.handlers.push((start, end, handler, catch_type));
        self
    }

    /// Overrides the operand stack size recorded for the body.
    pub fn max_stack(&mut self, max_stack: u16) -> &mut Self {
        self.max_stack = max_stack;
        self
    }

    /// Overrides the computed number of local-variable slots.
    pub fn max_locals(&mut self, max_locals: u16) -> &mut Self {
        self.max_locals = Some(max_locals);
        self
    }

    fn resolve(&self, label: Label) -> Result<u32> {
        self.labels
            .get(label.0)
            .copied()
            .flatten()
            .ok_or_else(|| malformed_error!("Label {} was never placed", label.0))
    }

    fn finish(mut self) -> Result<Code> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }

        for (position, label) in std::mem::take(&mut self.branch_fixups) {
            let target = self.resolve(label)?;
            let instruction = &mut self.instructions[position];
            instruction.operand = Operand::Branch(target as i32 - instruction.offset as i32);
        }

        let exception_table = self
            .handlers
            .iter()
            .map(|(start, end, handler, catch_type)| {
                Ok(ExceptionHandler {
                    start: self.resolve(*start)?,
                    end: self.resolve(*end)?,
                    handler: self.resolve(*handler)?,
                    catch_type: *catch_type,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let used_locals = self
            .instructions
            .iter()
            .filter_map(|instruction| {
                let index = usize::from(instruction.local_index()?);
                let size = if instruction.opcode.is_wide_local() { 2 } else { 1 };
                Some(index + size)
            })
            .max()
            .unwrap_or(0);
        let computed = used_locals.max(self.parameter_size);
        let max_locals = match self.max_locals {
            Some(max_locals) => max_locals,
            None => u16::try_from(computed)
                .map_err(|_| malformed_error!("Method uses {} local slots", computed))?,
        };

        Ok(Code {
            max_stack: self.max_stack,
            max_locals,
            instructions: self.instructions,
            exception_table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_defaults() {
        let class = ClassBuilder::new("a/B").build().unwrap();
        assert_eq!(class.super_name.as_deref(), Some(JAVA_LANG_OBJECT));
        assert!(class.is_public());
        assert!(class.is_program());

        let object = ClassBuilder::new(JAVA_LANG_OBJECT).library().build().unwrap();
        assert_eq!(object.super_name, None);
        assert!(object.is_library);
    }

    #[test]
    fn test_shorthand_local_forms() {
        let class = ClassBuilder::new("a/B")
            .method("f", "(IJ)V", AccessFlags::STATIC, |code| {
                code.iload(0).lload(1).istore(3).astore(4).op(Opcode::Return);
                Ok(())
            })
            .build()
            .unwrap();
        let code = class.methods[0].code.as_ref().unwrap();
        let opcodes: Vec<_> = code.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                Opcode::Iload0,
                Opcode::Lload1,
                Opcode::Istore3,
                Opcode::Astore,
                Opcode::Return
            ]
        );
        assert_eq!(code.instructions[3].operand, Operand::Local(4));
        assert_eq!(code.max_locals, 5);
    }

    #[test]
    fn test_push_int_forms() {
        let class = ClassBuilder::new("a/B")
            .method("f", "()V", AccessFlags::STATIC, |code| {
                code.push_int(-1)
                    .push_int(5)
                    .push_int(100)
                    .push_int(1000)
                    .push_int(100_000);
                Ok(())
            })
            .build()
            .unwrap();
        let code = class.methods[0].code.as_ref().unwrap();
        let opcodes: Vec<_> = code.instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                Opcode::IconstM1,
                Opcode::Iconst5,
                Opcode::Bipush,
                Opcode::Sipush,
                Opcode::Ldc
            ]
        );
    }

    #[test]
    fn test_branch_offsets_are_relative() {
        let class = ClassBuilder::new("a/B")
            .method("loop", "()V", AccessFlags::STATIC, |code| {
                let head = code.new_label();
                let exit = code.new_label();
                code.place(head)
                    .iload(0)
                    .branch(Opcode::Ifeq, exit)
                    .goto(head)
                    .place(exit)
                    .op(Opcode::Return);
                Ok(())
            })
            .build()
            .unwrap();
        let code = class.methods[0].code.as_ref().unwrap();
        // iload_0 @0, ifeq @1, goto @4, return @7
        assert_eq!(code.instructions[1].operand, Operand::Branch(6));
        assert_eq!(code.instructions[2].offset, 4);
        assert_eq!(code.instructions[2].operand, Operand::Branch(-4));
    }

    #[test]
    fn test_exception_handlers() {
        let class = ClassBuilder::new("a/B")
            .method("guarded", "()V", AccessFlags::STATIC, |code| {
                let start = code.new_label();
                let end = code.new_label();
                let handler = code.new_label();
                code.place(start)
                    .invokestatic("a/C", "risky", "()V")
                    .place(end)
                    .op(Opcode::Return)
                    .place(handler)
                    .op(Opcode::Athrow)
                    .try_catch(start, end, handler, Some("java/io/IOException"));
                Ok(())
            })
            .build()
            .unwrap();
        let code = class.methods[0].code.as_ref().unwrap();
        assert_eq!(code.exception_table.len(), 1);
        let handler = &code.exception_table[0];
        assert_eq!((handler.start, handler.end, handler.handler), (0, 3, 4));
        assert_eq!(
            class
                .constant_pool
                .class_constant(handler.catch_type)
                .unwrap()
                .name,
            "java/io/IOException"
        );
    }

    #[test]
    fn test_unplaced_label_is_an_error() {
        let result = ClassBuilder::new("a/B")
            .method("f", "()V", AccessFlags::STATIC, |code| {
                let nowhere = code.new_label();
                code.goto(nowhere);
                Ok(())
            })
            .build();
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_invalid_descriptor_is_an_error() {
        let result = ClassBuilder::new("a/B")
            .method("f", "(", AccessFlags::STATIC, |_| Ok(()))
            .build();
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_bootstrap_methods() {
        let class = ClassBuilder::new("a/B")
            .bootstrap_method("a/Boot", "bootstrap", "()Ljava/lang/Object;")
            .method("f", "()V", AccessFlags::STATIC, |code| {
                code.invokedynamic(0, "run", "()Ljava/lang/Runnable;")
                    .op(Opcode::Pop)
                    .op(Opcode::Return);
                Ok(())
            })
            .build()
            .unwrap();
        assert_eq!(class.bootstrap_methods.len(), 1);
        let code = class.methods[0].code.as_ref().unwrap();
        let index = code.instructions[0].constant_index().unwrap();
        assert!(matches!(
            class.constant_pool.get(index).unwrap(),
            Constant::InvokeDynamic(_)
        ));
    }
}
