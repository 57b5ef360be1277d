//! The optimization-info data model.
//!
//! Every class, field and method of an analyzed program carries one facts record. Records come
//! in two variants behind a shared query trait:
//!
//! - **Library** facts describe code outside the analyzed program. They never change and
//!   answer every query with the value that assumes the worst.
//! - **Program** facts start optimistic and are widened monotonically by the analysis passes.
//!
//! # Key Components
//!
//! - [`MethodInfo`], [`FieldInfo`], [`ClassInfo`] - Read-only queries for downstream consumers
//! - [`ProgramMethodFacts`], [`ProgramFieldFacts`], [`ProgramClassFacts`] - Mutable program facts
//! - [`Value`] and [`ReferenceValue`] - Abstract values joined with [`Value::generalize`]
//! - [`FactStore`] - Side tables mapping entity tokens to their facts

mod class;
mod field;
mod method;
mod store;
mod value;

pub use class::{ClassFacts, ClassFlags, ClassInfo, ProgramClassFacts};
pub use field::{FieldFacts, FieldInfo, LibraryFieldFacts, ProgramFieldFacts};
pub use method::{
    LibraryMethodFacts, MethodFacts, MethodFlags, MethodInfo, ProgramMethodFacts,
    MAX_TRACKED_SLOTS,
};
pub use store::FactStore;
pub use value::{ReferenceValue, Value};
