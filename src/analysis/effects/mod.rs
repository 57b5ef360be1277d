//! Side-effect analysis.
//!
//! [`SideEffectInstructionChecker`] classifies single instructions; [`SideEffectMethodMarker`]
//! lifts that classification to whole methods and propagates it through invocations until
//! nothing changes.

mod checker;
mod marker;

pub use checker::{effect_class, EffectClass, SideEffectInstructionChecker};
pub use marker::SideEffectMethodMarker;
