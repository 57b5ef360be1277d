//! Boolean facts read straight off a method body, and invocation counting.

use tracing::trace;

use crate::{
    analysis::{
        info::{MethodFlags, ProgramMethodFacts},
        markers::{ClassMarker, MarkingContext},
        resolve,
    },
    classfile::{Code, Opcode, ProgramClass, ProgramMethod, INSTANCE_INITIALIZER},
    Result,
};

/// Marks the body facts of every method and counts the invocations of their targets.
///
/// | Fact | Set by |
/// |---|---|
/// | `catches_exceptions` | a non-empty exception table |
/// | `branches_backward` | a branch or switch with a negative offset |
/// | `has_synchronized_block` | `monitorenter` |
/// | `invokes_dynamically` | `invokedynamic` |
/// | `invokes_super_methods` | `invokespecial` of a method declared in another class |
/// | `assigns_final_field` | `putfield` or `putstatic` of a final field |
pub struct MethodBodyMarker;

impl MethodBodyMarker {
    /// Scans the body of `method` and records its facts.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unresolved`] if an invocation or field access was never resolved.
    pub fn mark_body(
        &self,
        context: &MarkingContext<'_>,
        class: &ProgramClass,
        method: &ProgramMethod,
    ) -> Result<()> {
        let Some(code) = &method.code else {
            return Ok(());
        };
        let flags = self.scan(context, class, code)?;
        if !flags.is_empty() {
            trace!(method = %method.name, class = %class.name, ?flags, "body facts");
            context
                .store
                .update_method(method.token, |facts| apply(facts, flags))?;
        }
        Ok(())
    }

    fn scan(
        &self,
        context: &MarkingContext<'_>,
        class: &ProgramClass,
        code: &Code,
    ) -> Result<MethodFlags> {
        let mut flags = MethodFlags::empty();
        if !code.exception_table.is_empty() {
            flags |= MethodFlags::CATCHES_EXCEPTIONS;
        }

        for instruction in &code.instructions {
            if instruction.branch_offsets().iter().any(|offset| *offset < 0) {
                flags |= MethodFlags::BRANCHES_BACKWARD;
            }

            match instruction.opcode {
                Opcode::Monitorenter => flags |= MethodFlags::HAS_SYNCHRONIZED_BLOCK,
                Opcode::Invokedynamic => flags |= MethodFlags::INVOKES_DYNAMICALLY,
                Opcode::Invokevirtual
                | Opcode::Invokespecial
                | Opcode::Invokestatic
                | Opcode::Invokeinterface => {
                    let Some(index) = instruction.constant_index() else {
                        continue;
                    };
                    let target = resolve::referenced_member(class, index)?;
                    context
                        .store
                        .update_method(target, |facts| facts.increment_invocation_count())?;

                    if instruction.opcode == Opcode::Invokespecial {
                        let invoked = context.pool.method(target)?;
                        if invoked.name != INSTANCE_INITIALIZER && invoked.class != class.token {
                            flags |= MethodFlags::INVOKES_SUPER_METHODS;
                        }
                    }
                }
                Opcode::Putfield | Opcode::Putstatic => {
                    let Some(index) = instruction.constant_index() else {
                        continue;
                    };
                    let field = resolve::referenced_member(class, index)?;
                    if context.pool.field(field)?.is_final() {
                        flags |= MethodFlags::ASSIGNS_FINAL_FIELD;
                    }
                }
                _ => {}
            }
        }
        Ok(flags)
    }
}

fn apply(facts: &mut ProgramMethodFacts, flags: MethodFlags) {
    let setters: [(MethodFlags, fn(&mut ProgramMethodFacts)); 6] = [
        (MethodFlags::CATCHES_EXCEPTIONS, ProgramMethodFacts::set_catches_exceptions),
        (MethodFlags::BRANCHES_BACKWARD, ProgramMethodFacts::set_branches_backward),
        (MethodFlags::HAS_SYNCHRONIZED_BLOCK, ProgramMethodFacts::set_synchronized_block),
        (MethodFlags::INVOKES_DYNAMICALLY, ProgramMethodFacts::set_invokes_dynamically),
        (MethodFlags::INVOKES_SUPER_METHODS, ProgramMethodFacts::set_invokes_super_methods),
        (MethodFlags::ASSIGNS_FINAL_FIELD, ProgramMethodFacts::set_assigns_final_field),
    ];
    for (flag, set) in setters {
        if flags.contains(flag) {
            set(facts);
        }
    }
}

impl ClassMarker for MethodBodyMarker {
    fn mark_class(&self, context: &MarkingContext<'_>, class: &ProgramClass) -> Result<()> {
        for method in &class.methods {
            self.mark_body(context, class, method)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "body"
    }
}
