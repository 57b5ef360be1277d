//! Fixpoint computation of the `has_side_effects` method fact.

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::{
    analysis::{
        config::AnalysisConfig,
        effects::checker::SideEffectInstructionChecker,
        info::{FactStore, MethodInfo},
        resolve,
    },
    classfile::{ClassPool, Instruction, Opcode, ProgramClass, ProgramMethod, Token},
    Result,
};

/// Marks every program method that may have side effects.
///
/// Each round classifies the instructions of all methods not yet marked, using the facts
/// computed so far for invoked methods. Marking only ever adds facts, so the rounds stop once
/// one of them marks nothing new.
///
/// Native and synchronized methods always have side effects. Kept methods may be replaced or
/// invoked from outside, so they are marked without looking at their code. Methods that already
/// hold `has_no_side_effects` are left alone.
pub struct SideEffectMethodMarker<'a> {
    pool: &'a ClassPool,
    store: &'a FactStore,
    config: &'a AnalysisConfig,
}

impl<'a> SideEffectMethodMarker<'a> {
    /// Creates a marker over `pool` writing to `store`.
    #[must_use]
    pub fn new(pool: &'a ClassPool, store: &'a FactStore, config: &'a AnalysisConfig) -> Self {
        Self {
            pool,
            store,
            config,
        }
    }

    /// Runs the fixpoint and returns the number of methods marked.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unresolved`] for unlinked references and
    /// [`crate::Error::MissingFacts`] for entities without facts.
    pub fn mark(&self) -> Result<usize> {
        let mut pending = self.candidates()?;
        let mut marked = 0;
        let mut rounds = 0;

        loop {
            rounds += 1;
            let results: Vec<bool> = if self.config.parallel {
                pending
                    .par_iter()
                    .map(|(class, method)| self.has_side_effects(class, method))
                    .collect::<Result<_>>()?
            } else {
                pending
                    .iter()
                    .map(|(class, method)| self.has_side_effects(class, method))
                    .collect::<Result<_>>()?
            };

            let mut remaining = Vec::with_capacity(pending.len());
            let mut marked_now = 0;
            for ((class, method), effects) in pending.into_iter().zip(results) {
                if effects {
                    trace!(method = %method.name, class = %class.name, "has side effects");
                    self.store.update_method(method.token, |facts| facts.set_side_effects())?;
                    marked_now += 1;
                } else {
                    remaining.push((class, method));
                }
            }

            marked += marked_now;
            pending = remaining;
            if marked_now == 0 || pending.is_empty() {
                break;
            }
        }

        debug!(marked, rounds, "side effect analysis finished");
        Ok(marked)
    }

    fn candidates(&self) -> Result<Vec<(&'a ProgramClass, &'a ProgramMethod)>> {
        let mut candidates = Vec::new();
        for class in self.pool.program_classes() {
            for method in &class.methods {
                let facts = self.store.method(method.token)?;
                if !facts.has_no_side_effects() && !facts.has_side_effects() {
                    candidates.push((class, method));
                }
            }
        }
        Ok(candidates)
    }

    fn has_side_effects(&self, class: &ProgramClass, method: &ProgramMethod) -> Result<bool> {
        if method.is_native() || method.is_synchronized() {
            return Ok(true);
        }
        if self.store.method(method.token)?.is_kept() {
            return Ok(true);
        }
        let Some(code) = &method.code else {
            return Ok(false);
        };

        let mut checker =
            SideEffectInstructionChecker::new(false, true, self.config.optimize_conservatively);
        for instruction in &code.instructions {
            if checker.has_side_effects(self.pool, self.store, class, instruction)?
                || self.invocation_has_side_effects(class, instruction)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Covers the invocations the instruction checker leaves undecided.
    fn invocation_has_side_effects(
        &self,
        class: &ProgramClass,
        instruction: &Instruction,
    ) -> Result<bool> {
        match instruction.opcode {
            Opcode::Invokedynamic => Ok(true),
            Opcode::Invokevirtual | Opcode::Invokeinterface => {
                let Some(index) = instruction.constant_index() else {
                    return Ok(true);
                };
                let target = resolve::referenced_member(class, index)?;
                if self.method_has_side_effects(target)? {
                    return Ok(true);
                }
                for overrider in self.pool.overriding_methods(target)? {
                    if self.method_has_side_effects(overrider)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn method_has_side_effects(&self, method: Token) -> Result<bool> {
        let facts = self.store.method(method)?;
        Ok(!facts.has_no_side_effects() && facts.has_side_effects())
    }
}
