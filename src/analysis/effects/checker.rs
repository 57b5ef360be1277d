//! Classification of single instructions by their observable effects.
//!
//! An instruction has a side effect if its execution may be observed after the enclosing
//! method returns. The [`SideEffectInstructionChecker`] answers that question for one
//! instruction at a time, driven by three policy flags:
//!
//! | Instructions | Side effect |
//! |---|---|
//! | `athrow`, `monitorenter`, `monitorexit` | always |
//! | the six returns, `ret`, `jsr`, `jsr_w` | iff `include_return_instructions` |
//! | the eight array stores | iff `include_array_store_instructions` |
//! | division and remainder, array loads, array creation, `arraylength`, `checkcast` | iff `include_built_in_exceptions` |
//! | `getfield`, `putfield`, `getstatic`, `putstatic` | if `include_built_in_exceptions`, otherwise decided by the referenced field |
//! | `invokevirtual`, `invokeinterface`, `invokedynamic` | iff `include_built_in_exceptions` |
//! | `invokespecial`, `invokestatic` | decided by the facts of the invoked method |
//! | everything else | never |
//!
//! Virtual and dynamic invocations are not resolved: their targets are not known statically.
//! Passes that need a sound answer for them check the possible targets themselves, as
//! [`crate::analysis::SideEffectMethodMarker`] does.

use crate::{
    analysis::{
        info::{FactStore, FieldFacts, FieldInfo, MethodInfo},
        resolve,
    },
    classfile::{ClassPool, Instruction, Opcode, ProgramClass, Token},
    Result,
};

/// How the side effect of an opcode is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum EffectClass {
    /// Never observable
    Never,
    /// Always observable
    Always,
    /// Leaves the analyzed region
    Return,
    /// Stores into an array
    ArrayStore,
    /// May throw a built-in runtime exception
    BuiltInException,
    /// Accesses a field
    FieldAccess,
    /// Invokes a method chosen at run time
    VirtualInvocation,
    /// Invokes a statically known method
    DirectInvocation,
}

/// Returns how the side effect of `opcode` is decided.
#[must_use]
pub fn effect_class(opcode: Opcode) -> EffectClass {
    use Opcode::*;
    match opcode {
        Athrow | Monitorenter | Monitorexit => EffectClass::Always,
        Ireturn | Lreturn | Freturn | Dreturn | Areturn | Return | Ret | Jsr | JsrW => {
            EffectClass::Return
        }
        Iastore | Lastore | Fastore | Dastore | Aastore | Bastore | Castore | Sastore => {
            EffectClass::ArrayStore
        }
        Idiv | Ldiv | Fdiv | Ddiv | Irem | Lrem | Frem | Drem | Iaload | Laload | Faload
        | Daload | Aaload | Baload | Caload | Saload | Newarray | Anewarray | Multianewarray
        | Arraylength | Checkcast => EffectClass::BuiltInException,
        Getstatic | Putstatic | Getfield | Putfield => EffectClass::FieldAccess,
        Invokevirtual | Invokeinterface | Invokedynamic => EffectClass::VirtualInvocation,
        Invokespecial | Invokestatic => EffectClass::DirectInvocation,
        _ => EffectClass::Never,
    }
}

/// Decides whether single instructions have side effects.
#[derive(Debug, Clone)]
pub struct SideEffectInstructionChecker {
    include_return_instructions: bool,
    include_array_store_instructions: bool,
    include_built_in_exceptions: bool,
    has_side_effects: bool,
}

impl SideEffectInstructionChecker {
    /// Creates a checker with the given policy.
    #[must_use]
    pub fn new(
        include_return_instructions: bool,
        include_array_store_instructions: bool,
        include_built_in_exceptions: bool,
    ) -> Self {
        Self {
            include_return_instructions,
            include_array_store_instructions,
            include_built_in_exceptions,
            has_side_effects: false,
        }
    }

    /// Classifies `opcode` without looking at its operands.
    ///
    /// Returns `None` if the answer depends on the facts of the referenced field or method.
    #[must_use]
    pub fn classify(&self, opcode: Opcode) -> Option<bool> {
        match effect_class(opcode) {
            EffectClass::Never => Some(false),
            EffectClass::Always => Some(true),
            EffectClass::Return => Some(self.include_return_instructions),
            EffectClass::ArrayStore => Some(self.include_array_store_instructions),
            EffectClass::BuiltInException | EffectClass::VirtualInvocation => {
                Some(self.include_built_in_exceptions)
            }
            EffectClass::FieldAccess => self.include_built_in_exceptions.then_some(true),
            EffectClass::DirectInvocation => None,
        }
    }

    /// Decides whether `instruction` of a method in `class` has side effects.
    ///
    /// The answer is also kept until the next call and available through
    /// [`SideEffectInstructionChecker::last_result`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unresolved`] if the referenced field or method was never
    /// resolved, and [`crate::Error::MissingFacts`] if it has no facts attached.
    pub fn has_side_effects(
        &mut self,
        pool: &ClassPool,
        store: &FactStore,
        class: &ProgramClass,
        instruction: &Instruction,
    ) -> Result<bool> {
        self.has_side_effects = match self.classify(instruction.opcode) {
            Some(result) => result,
            None => self.deferred(pool, store, class, instruction)?,
        };
        Ok(self.has_side_effects)
    }

    /// Returns the answer of the most recent classification.
    #[must_use]
    pub fn last_result(&self) -> bool {
        self.has_side_effects
    }

    fn deferred(
        &self,
        pool: &ClassPool,
        store: &FactStore,
        class: &ProgramClass,
        instruction: &Instruction,
    ) -> Result<bool> {
        let Some(index) = instruction.constant_index() else {
            return Ok(true);
        };
        let member = resolve::referenced_member(class, index)?;

        match instruction.opcode {
            Opcode::Getstatic | Opcode::Putstatic | Opcode::Getfield | Opcode::Putfield => {
                if field_access_has_side_effects(store, member, instruction.opcode)? {
                    return Ok(true);
                }
            }
            _ => {
                let facts = store.method(member)?;
                if !facts.has_no_side_effects() && facts.has_side_effects() {
                    return Ok(true);
                }
            }
        }

        match instruction.opcode {
            Opcode::Getstatic | Opcode::Putstatic | Opcode::Invokestatic => {
                let owner = pool.declaring_class(member)?.token;
                initializer_has_side_effects(pool, store, class.token, owner)
            }
            _ => Ok(false),
        }
    }
}

fn field_access_has_side_effects(store: &FactStore, field: Token, opcode: Opcode) -> Result<bool> {
    let facts = store.field(field)?;
    Ok(match &*facts {
        FieldFacts::Library(_) => true,
        FieldFacts::Program(facts) => opcode.is_field_write() && facts.is_read(),
    })
}

/// Returns true if touching a static member of `owner` from `current` may run a class
/// initializer with side effects.
fn initializer_has_side_effects(
    pool: &ClassPool,
    store: &FactStore,
    current: Token,
    owner: Token,
) -> Result<bool> {
    // Initializers of the current class and its superclasses have already run
    if pool.is_subclass_of(current, owner) {
        return Ok(false);
    }
    let class = pool.class(owner)?;
    if class.is_library {
        return Ok(true);
    }
    match class.class_initializer() {
        Some(initializer) => {
            let facts = store.method(initializer.token)?;
            Ok(!facts.has_no_side_effects() && facts.has_side_effects())
        }
        None => Ok(false),
    }
}
