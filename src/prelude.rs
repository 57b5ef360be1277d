//! # classfacts Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the classfacts library. Import this module to get quick access to the essential
//! types for building a class pool and analyzing it.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all classfacts operations
pub use crate::Error;

/// The result type used throughout classfacts
pub use crate::Result;

// ================================================================================================
// Program Model
// ================================================================================================

/// Entity identity
pub use crate::classfile::{Token, TokenKind};

/// Classes, members and the pool holding them
pub use crate::classfile::{ClassPool, ProgramClass, ProgramField, ProgramMethod};

/// Access flags and visibility
pub use crate::classfile::{AccessFlags, Visibility};

/// Fluent construction of classes and method bodies
pub use crate::classfile::{ClassBuilder, CodeBuilder, Label};

/// Decoded instructions
pub use crate::classfile::{Code, Instruction, Opcode, Operand};

// ================================================================================================
// Analysis
// ================================================================================================

/// Entry point and configuration
pub use crate::analysis::{AnalysisConfig, OptimizationInfoAnalyzer};

/// Fact queries
pub use crate::analysis::{ClassInfo, FieldInfo, MethodInfo};

/// Fact records and their storage
pub use crate::analysis::{
    ClassFacts, FactStore, FieldFacts, MethodFacts, ProgramClassFacts, ProgramFieldFacts,
    ProgramMethodFacts, ReferenceValue, Value,
};

/// Side-effect analysis
pub use crate::analysis::{SideEffectInstructionChecker, SideEffectMethodMarker};
