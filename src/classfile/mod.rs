//! The resolved program model the analysis runs on.
//!
//! This module provides an in-memory model of JVM classes, sufficient for computing
//! optimization facts: classes with their access flags, hierarchy, constant pools, fields and
//! methods, and method bodies as decoded instruction sequences.
//!
//! # Key Components
//!
//! - [`ClassPool`] - Owns all classes, assigns [`Token`]s and answers hierarchy queries
//! - [`ProgramClass`], [`ProgramField`], [`ProgramMethod`] - The entities of the model
//! - [`ConstantPool`] and [`Constant`] - Constant-pool entries with their resolved references
//! - [`Instruction`], [`Opcode`], [`Code`] - Decoded method bodies
//! - [`ClassBuilder`] and [`CodeBuilder`] - Fluent construction of classes and bodies
//!
//! # Linking
//!
//! Classes are added to the pool with symbolic references only. [`ClassPool::link`] resolves
//! the superclass and interface names and every constant-pool reference to tokens; the
//! analysis requires a linked pool.

mod access;
mod builder;
mod class;
mod constant;
mod descriptor;
mod instruction;
mod linker;
mod pool;
mod token;

pub use access::{AccessFlags, Visibility, VISIBILITY_MASK};
pub use builder::{ClassBuilder, CodeBuilder, Label, JAVA_LANG_OBJECT};
pub use class::{
    package_name, ProgramClass, ProgramField, ProgramMethod, CLASS_INITIALIZER,
    INSTANCE_INITIALIZER,
};
pub use constant::{
    BootstrapMethod, ClassConstant, Constant, ConstantPool, DynamicConstant,
    MethodHandleConstant, MethodTypeConstant, NameAndTypeConstant, RefConstant, ReferenceKind,
    ReflectionTarget, StringConstant,
};
pub use descriptor::{FieldType, MethodDescriptor};
pub use instruction::{
    Code, ExceptionHandler, Instruction, InstructionCategory, Opcode, Operand,
};
pub use pool::ClassPool;
pub use token::{Token, TokenKind};
