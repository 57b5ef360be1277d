//! Marking passes that populate facts from instructions and constant pools.
//!
//! Every marker implements [`ClassMarker`] and visits one program class at a time: its
//! constant pool, its members and the instructions of its method bodies. Markers only ever add
//! facts, so running one twice leaves the store unchanged, and markers never depend on each
//! other's results. They can therefore run in any order, and on different classes in parallel.
//!
//! # Key Components
//!
//! - [`AccessMarker`] - Private, package-private and protected accesses of methods
//! - [`InstanceofMarker`] - Classes tested with `instanceof`
//! - [`NonPrivateMemberMarker`] - Members that can not be made private
//! - [`ParameterUsageMarker`] - Parameter slots that are used
//! - [`MethodBodyMarker`] - Boolean body facts and invocation counts
//! - [`ReadWriteFieldMarker`] - Field reads and writes
//! - [`ClassUsageMarker`] - Instantiated, caught and `.class`-loaded classes
//!
//! Apart from their class-level pass, the markers expose the single-entity operations the
//! passes are built from, for callers that drive the marking themselves.

mod access;
mod body;
mod class_usage;
mod fields;
mod instanceof;
mod nonprivate;
mod parameters;

pub use access::AccessMarker;
pub use body::MethodBodyMarker;
pub use class_usage::ClassUsageMarker;
pub use fields::ReadWriteFieldMarker;
pub use instanceof::InstanceofMarker;
pub use nonprivate::NonPrivateMemberMarker;
pub use parameters::ParameterUsageMarker;

use rayon::prelude::*;
use tracing::debug;

use crate::{
    analysis::{config::AnalysisConfig, info::FactStore},
    classfile::{ClassPool, ProgramClass},
    Result,
};

/// Everything a marker needs besides the class it visits.
#[derive(Clone, Copy)]
pub struct MarkingContext<'a> {
    /// The linked program model
    pub pool: &'a ClassPool,
    /// The facts being populated
    pub store: &'a FactStore,
    /// Analysis settings
    pub config: &'a AnalysisConfig,
}

impl<'a> MarkingContext<'a> {
    /// Creates a context.
    #[must_use]
    pub fn new(pool: &'a ClassPool, store: &'a FactStore, config: &'a AnalysisConfig) -> Self {
        Self {
            pool,
            store,
            config,
        }
    }
}

/// A pass that marks facts while visiting one program class.
pub trait ClassMarker: Send + Sync {
    /// Marks the facts derived from `class`.
    ///
    /// # Errors
    ///
    /// Returns an error if `class` references entities that are unresolved or lack facts.
    fn mark_class(&self, context: &MarkingContext<'_>, class: &ProgramClass) -> Result<()>;

    /// Returns the name of the marker, for diagnostics.
    fn name(&self) -> &'static str;
}

/// All class markers, in the order they are run.
pub static CLASS_MARKERS: [&'static dyn ClassMarker; 7] = [
    &MethodBodyMarker,
    &ReadWriteFieldMarker,
    &ClassUsageMarker,
    &InstanceofMarker,
    &AccessMarker,
    &NonPrivateMemberMarker,
    &ParameterUsageMarker,
];

/// Runs `markers` over every program class of the context's pool.
///
/// # Errors
///
/// Returns the first error raised by any marker.
pub fn run_class_markers(
    context: &MarkingContext<'_>,
    markers: &[&'static dyn ClassMarker],
) -> Result<()> {
    let classes: Vec<&ProgramClass> = context.pool.program_classes().collect();

    for marker in markers {
        if context.config.parallel {
            classes
                .par_iter()
                .try_for_each(|class| marker.mark_class(context, class))?;
        } else {
            classes
                .iter()
                .try_for_each(|class| marker.mark_class(context, class))?;
        }
        debug!(marker = marker.name(), classes = classes.len(), "marking pass finished");
    }

    Ok(())
}
