//! Marking of classes tested with `instanceof`.
//!
//! Passes that merge or remove classes must keep the run-time identity of such classes,
//! since the outcome of the test depends on it.

use tracing::trace;

use crate::{
    analysis::{
        markers::{ClassMarker, MarkingContext},
        resolve,
    },
    classfile::{Opcode, ProgramClass},
    Result,
};

/// Marks the classes referenced by `instanceof` instructions.
pub struct InstanceofMarker;

impl InstanceofMarker {
    /// Marks the class named by the class constant at `index` in `class` as tested.
    ///
    /// Arrays of primitives name no class and are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unresolved`] if the constant was never resolved.
    pub fn mark_instanceof(
        &self,
        context: &MarkingContext<'_>,
        class: &ProgramClass,
        index: u16,
    ) -> Result<()> {
        if let Some(tested) = resolve::referenced_class(class, index)? {
            trace!(class = %tested, from = %class.name, "instanceof");
            context
                .store
                .update_class(tested, |facts| facts.set_instanceofed())?;
        }
        Ok(())
    }
}

impl ClassMarker for InstanceofMarker {
    fn mark_class(&self, context: &MarkingContext<'_>, class: &ProgramClass) -> Result<()> {
        for code in class.methods.iter().filter_map(|method| method.code.as_ref()) {
            for instruction in &code.instructions {
                if instruction.opcode != Opcode::Instanceof {
                    continue;
                }
                if let Some(index) = instruction.constant_index() {
                    self.mark_instanceof(context, class, index)?;
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "instanceof"
    }
}
