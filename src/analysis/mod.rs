//! Optimization-info analysis for JVM class pools.
//!
//! This module computes the facts an optimizer consults before it changes code: which methods
//! have side effects, which parameters are used, which members could be made private, which
//! classes are tested with `instanceof`, and which restricted accesses a method body makes.
//!
//! # Architecture
//!
//! The analysis module is organized into focused sub-modules:
//!
//! - [`info`] - The facts records, their lattice operations and the [`FactStore`]
//! - [`effects`] - Instruction-level side-effect classification and its method-level fixpoint
//! - [`markers`] - Passes that populate facts from instructions and constant pools
//! - [`config`] - Settings shared by all passes
//!
//! Facts only ever grow. Each pass widens the facts it owns and never resets a fact another
//! pass established, so passes over different classes can run concurrently.
//!
//! # Usage
//!
//! ```rust
//! use classfacts::analysis::{AnalysisConfig, MethodInfo, OptimizationInfoAnalyzer};
//! use classfacts::classfile::{AccessFlags, ClassBuilder, ClassPool, Opcode};
//!
//! let mut pool = ClassPool::new();
//! pool.add(ClassBuilder::new("java/lang/Object").library().build()?)?;
//! pool.add(
//!     ClassBuilder::new("app/Counter")
//!         .field("count", "I", AccessFlags::PRIVATE | AccessFlags::STATIC)
//!         .method("bump", "()V", AccessFlags::STATIC, |code| {
//!             code.getstatic("app/Counter", "count", "I")
//!                 .push_int(1)
//!                 .op(Opcode::Iadd)
//!                 .putstatic("app/Counter", "count", "I")
//!                 .op(Opcode::Return);
//!             Ok(())
//!         })
//!         .build()?,
//! )?;
//! pool.link()?;
//!
//! let store = OptimizationInfoAnalyzer::new(AnalysisConfig::sequential()).analyze(&pool)?;
//! let bump = pool.class_by_name("app/Counter").unwrap().method("bump", "()V").unwrap();
//! // The field is also read, so writing it is observable
//! assert!(store.method(bump.token)?.has_side_effects());
//! # Ok::<(), classfacts::Error>(())
//! ```

pub mod config;
pub mod effects;
pub mod info;
pub mod markers;
mod merge;
mod pipeline;
mod resolve;

pub use config::AnalysisConfig;
pub use effects::{effect_class, EffectClass, SideEffectInstructionChecker, SideEffectMethodMarker};
pub use info::{
    ClassFacts, ClassFlags, ClassInfo, FactStore, FieldFacts, FieldInfo, LibraryFieldFacts,
    LibraryMethodFacts, MethodFacts, MethodFlags, MethodInfo, ProgramClassFacts,
    ProgramFieldFacts, ProgramMethodFacts, ReferenceValue, Value, MAX_TRACKED_SLOTS,
};
pub use markers::{
    run_class_markers, AccessMarker, ClassMarker, ClassUsageMarker, InstanceofMarker,
    MarkingContext, MethodBodyMarker, NonPrivateMemberMarker, ParameterUsageMarker,
    ReadWriteFieldMarker, CLASS_MARKERS,
};
pub use merge::HierarchyMerger;
pub use pipeline::OptimizationInfoAnalyzer;
