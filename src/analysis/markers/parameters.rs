//! Marking of used parameters.
//!
//! A parameter is used if the method body reads or overwrites its slot. Parameters of methods
//! whose body is unknown or may be replaced are all used: methods without code, kept methods,
//! and methods that override a library method and may be called back from library code with
//! any arguments.

use tracing::trace;

use crate::{
    analysis::{
        info::{FactStore, MethodInfo, ProgramMethodFacts},
        markers::{ClassMarker, MarkingContext},
    },
    classfile::{Code, Opcode, ProgramClass, ProgramMethod, Token},
    Result,
};

/// Marks the parameter slots each method actually uses.
pub struct ParameterUsageMarker;

impl ParameterUsageMarker {
    /// Marks the parameter in `slot` of `method` as used.
    ///
    /// Library methods are left untouched, they already report every parameter as used.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidSlot`] if `slot` is below 64 but not a parameter slot,
    /// and [`crate::Error::MissingFacts`] if `method` has no facts attached.
    pub fn mark_parameter_used(&self, store: &FactStore, method: Token, slot: usize) -> Result<()> {
        store.try_update_method(method, |facts| facts.mark_parameter_used(slot))?;
        Ok(())
    }

    /// Returns the bitmask of used parameter slots of `method`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingFacts`] if `method` has no facts attached.
    pub fn used_parameters(&self, store: &FactStore, method: Token) -> Result<u64> {
        Ok(store.method(method)?.used_parameters())
    }

    fn mark_method(&self, context: &MarkingContext<'_>, method: &ProgramMethod) -> Result<()> {
        let opaque = method.code.is_none()
            || context.store.method(method.token)?.is_kept()
            || self.overrides_library_method(context, method)?;
        if opaque {
            context
                .store
                .update_method(method.token, ProgramMethodFacts::mark_all_parameters_used)?;
            return Ok(());
        }

        let parameter_size = method.parameter_size()?;
        let mut used = 0u64;
        if context.config.mark_this_parameter && !method.is_static() {
            used |= 1;
        }
        if let Some(code) = &method.code {
            used |= used_slots(code, parameter_size);
        }

        trace!(method = %method.name, used = format_args!("{used:#b}"), "parameters");
        context
            .store
            .try_update_method(method.token, |facts| facts.update_used_parameters(used))?;
        Ok(())
    }

    fn overrides_library_method(
        &self,
        context: &MarkingContext<'_>,
        method: &ProgramMethod,
    ) -> Result<bool> {
        for overridden in context.pool.overridden_methods(method.token)? {
            if context.pool.declaring_class(overridden)?.is_library {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Returns the mask of parameter slots below `parameter_size` that `code` loads or stores.
fn used_slots(code: &Code, parameter_size: usize) -> u64 {
    let tracked = parameter_size.min(64);
    let mut used = 0u64;
    let mut mark = |slot: usize| {
        if slot < tracked {
            used |= 1 << slot;
        }
    };

    for instruction in &code.instructions {
        let opcode = instruction.opcode;
        if !opcode.is_load() && !opcode.is_store() && opcode != Opcode::Iinc {
            continue;
        }
        let Some(slot) = instruction.local_index() else {
            continue;
        };
        let slot = usize::from(slot);
        mark(slot);
        if opcode.is_wide_local() {
            mark(slot + 1);
        }
    }
    used
}

impl ClassMarker for ParameterUsageMarker {
    fn mark_class(&self, context: &MarkingContext<'_>, class: &ProgramClass) -> Result<()> {
        for method in &class.methods {
            self.mark_method(context, method)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "parameters"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::config::AnalysisConfig,
        classfile::{AccessFlags, ClassBuilder, ClassPool},
        test::factories::{linked_pool, method_token},
        Error,
    };

    fn marked(config: &AnalysisConfig) -> (ClassPool, FactStore) {
        let pool = linked_pool(vec![ClassBuilder::new("app/Params")
            .method("wide", "(IJI)V", AccessFlags::STATIC, |code| {
                code.lload(1).op(Opcode::Pop2).op(Opcode::Return);
                Ok(())
            })
            .method("bumps", "(II)V", AccessFlags::STATIC, |code| {
                code.iinc(1, 1).op(Opcode::Return);
                Ok(())
            })
            .method("overwrites", "(Ljava/lang/String;)V", AccessFlags::STATIC, |code| {
                code.op(Opcode::AconstNull).astore(0).op(Opcode::Return);
                Ok(())
            })
            .method("ignores", "(I)V", AccessFlags::PUBLIC, |code| {
                code.iload(2).op(Opcode::Pop).op(Opcode::Return).max_locals(3);
                Ok(())
            })
            .method("hashCode", "()I", AccessFlags::PUBLIC, |code| {
                code.push_int(7).op(Opcode::Ireturn);
                Ok(())
            })
            .declare_method("declared", "(IJ)V", AccessFlags::PUBLIC | AccessFlags::NATIVE)
            .build()
            .unwrap()]);
        let store = FactStore::initialize(&pool, false).unwrap();
        let context = MarkingContext::new(&pool, &store, config);
        for class in pool.program_classes() {
            ParameterUsageMarker.mark_class(&context, class).unwrap();
        }
        (pool, store)
    }

    fn used(pool: &ClassPool, store: &FactStore, name: &str) -> u64 {
        ParameterUsageMarker
            .used_parameters(store, method_token(pool, "app/Params", name))
            .unwrap()
    }

    #[test]
    fn test_loads_stores_and_increments() {
        let (pool, store) = marked(&AnalysisConfig::sequential());

        assert_eq!(used(&pool, &store, "wide"), 0b110);
        assert_eq!(used(&pool, &store, "bumps"), 0b10);
        assert_eq!(used(&pool, &store, "overwrites"), 0b1);
    }

    #[test]
    fn test_receiver_follows_configuration() {
        let (pool, store) = marked(&AnalysisConfig::sequential());
        // Slot 2 is a local variable, not a parameter
        assert_eq!(used(&pool, &store, "ignores"), 0);

        let config = AnalysisConfig {
            mark_this_parameter: true,
            ..AnalysisConfig::sequential()
        };
        let (pool, store) = marked(&config);
        assert_eq!(used(&pool, &store, "ignores"), 0b1);
    }

    #[test]
    fn test_opaque_methods_use_every_parameter() {
        let (pool, store) = marked(&AnalysisConfig::sequential());

        assert_eq!(used(&pool, &store, "declared"), 0b1111);
        // Overrides java/lang/Object.hashCode
        assert_eq!(used(&pool, &store, "hashCode"), 0b1);
    }

    #[test]
    fn test_direct_marking() {
        let (pool, store) = marked(&AnalysisConfig::sequential());
        let bumps = method_token(&pool, "app/Params", "bumps");

        ParameterUsageMarker.mark_parameter_used(&store, bumps, 0).unwrap();
        assert_eq!(used(&pool, &store, "bumps"), 0b11);

        ParameterUsageMarker.mark_parameter_used(&store, bumps, 70).unwrap();
        assert!(matches!(
            ParameterUsageMarker.mark_parameter_used(&store, bumps, 5),
            Err(Error::InvalidSlot { slot: 5, size: 2, .. })
        ));
    }
}
