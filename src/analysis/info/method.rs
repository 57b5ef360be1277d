//! Optimization facts of methods.
//!
//! Every method carries one [`MethodFacts`] record, in one of two variants:
//!
//! - [`LibraryMethodFacts`] for code outside the analyzed program. These facts are fixed at
//!   construction and answer every query with the conservative value: the method is kept, has
//!   side effects, does everything the boolean facts can express, uses, escapes and modifies
//!   every parameter, and is invoked an unbounded number of times.
//! - [`ProgramMethodFacts`] for program code. These start optimistic (nothing observed yet)
//!   and are widened by the marking passes through the setters below; nothing is ever unset.
//!
//! Both variants answer the read-only [`MethodInfo`] queries.
//!
//! # Parameter slots
//!
//! Parameters are addressed by local-variable slot: the receiver of an instance method is
//! slot 0, and `long`/`double` parameters take two consecutive slots. The slot bitmasks hold
//! one bit per slot for the first 64 slots. Slots at index 64 and above can not be
//! represented and always read as set; marking them is accepted and has no effect.
//!
//! ```rust
//! use classfacts::analysis::{MethodInfo, ProgramMethodFacts};
//! use classfacts::classfile::Token;
//!
//! // Instance method taking one `long`: receiver in slot 0, the long in slots 1 and 2.
//! let mut facts = ProgramMethodFacts::new(Token::method(1), vec![1, 2]);
//! facts.mark_parameter_used(1)?;
//! facts.mark_parameter_used(2)?;
//!
//! assert_eq!(facts.used_parameters(), 0b110);
//! assert!(facts.is_parameter_used(70));
//! # Ok::<(), classfacts::Error>(())
//! ```

use bitflags::bitflags;

use crate::{
    analysis::info::value::Value,
    classfile::{ProgramMethod, Token},
    Error, Result,
};

/// Number of parameter slots the bitmasks can represent.
pub const MAX_TRACKED_SLOTS: usize = 64;

bitflags! {
    /// Boolean facts of a method.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodFlags: u32 {
        /// Pinned by the surrounding tool, never optimized
        const KEPT = 1 << 0;
        /// Has no observable effect at all
        const NO_SIDE_EFFECTS = 1 << 1;
        /// Has no effect outside its receiver
        const NO_EXTERNAL_SIDE_EFFECTS = 1 << 2;
        /// No parameter escapes into the heap
        const NO_ESCAPING_PARAMETERS = 1 << 3;
        /// Never returns a value obtained from outside
        const NO_EXTERNAL_RETURN_VALUES = 1 << 4;
        /// Was found to have side effects
        const HAS_SIDE_EFFECTS = 1 << 5;
        /// Referenced in a way that prevents making it private
        const NON_PRIVATE = 1 << 6;
        /// Has an exception handler
        const CATCHES_EXCEPTIONS = 1 << 7;
        /// Contains a backward branch
        const BRANCHES_BACKWARD = 1 << 8;
        /// Invokes a superclass method through `invokespecial`
        const INVOKES_SUPER_METHODS = 1 << 9;
        /// Contains `invokedynamic`
        const INVOKES_DYNAMICALLY = 1 << 10;
        /// Accesses private members or classes
        const ACCESSES_PRIVATE_CODE = 1 << 11;
        /// Accesses package-private members or classes
        const ACCESSES_PACKAGE_CODE = 1 << 12;
        /// Accesses protected members
        const ACCESSES_PROTECTED_CODE = 1 << 13;
        /// Contains `monitorenter`
        const HAS_SYNCHRONIZED_BLOCK = 1 << 14;
        /// Writes a final field
        const ASSIGNS_FINAL_FIELD = 1 << 15;
        /// Returns with values left on the operand stack
        const RETURNS_WITH_NON_EMPTY_STACK = 1 << 16;
        /// Modifies anything reachable from outside
        const MODIFIES_ANYTHING = 1 << 17;
        /// Returns newly created instances
        const RETURNS_NEW_INSTANCES = 1 << 18;
        /// Returns values obtained from outside
        const RETURNS_EXTERNAL_VALUES = 1 << 19;

        /// The facts widened by [`ProgramMethodFacts::merge`]
        const MERGED = Self::CATCHES_EXCEPTIONS.bits()
            | Self::BRANCHES_BACKWARD.bits()
            | Self::INVOKES_SUPER_METHODS.bits()
            | Self::INVOKES_DYNAMICALLY.bits()
            | Self::ACCESSES_PRIVATE_CODE.bits()
            | Self::ACCESSES_PACKAGE_CODE.bits()
            | Self::ACCESSES_PROTECTED_CODE.bits()
            | Self::HAS_SYNCHRONIZED_BLOCK.bits()
            | Self::ASSIGNS_FINAL_FIELD.bits();
    }
}

/// Read-only queries answered by every kind of method facts.
pub trait MethodInfo {
    /// Returns true if the method must not be optimized.
    fn is_kept(&self) -> bool;
    /// Returns true if the method has no observable effect.
    fn has_no_side_effects(&self) -> bool;
    /// Returns true if the method has no effect outside its receiver.
    fn has_no_external_side_effects(&self) -> bool;
    /// Returns true if no parameter escapes.
    fn has_no_escaping_parameters(&self) -> bool;
    /// Returns true if the method never returns externally obtained values.
    fn has_no_external_return_values(&self) -> bool;
    /// Returns true if the method was found to have side effects.
    fn has_side_effects(&self) -> bool;
    /// Returns true if nothing prevents making the method private.
    fn can_be_made_private(&self) -> bool;
    /// Returns true if the method has an exception handler.
    fn catches_exceptions(&self) -> bool;
    /// Returns true if the method contains a backward branch.
    fn branches_backward(&self) -> bool;
    /// Returns true if the method invokes superclass methods.
    fn invokes_super_methods(&self) -> bool;
    /// Returns true if the method contains `invokedynamic`.
    fn invokes_dynamically(&self) -> bool;
    /// Returns true if the method accesses private code.
    fn accesses_private_code(&self) -> bool;
    /// Returns true if the method accesses package-private code.
    fn accesses_package_code(&self) -> bool;
    /// Returns true if the method accesses protected code.
    fn accesses_protected_code(&self) -> bool;
    /// Returns true if the method contains a synchronized block.
    fn has_synchronized_block(&self) -> bool;
    /// Returns true if the method writes a final field.
    fn assigns_final_field(&self) -> bool;
    /// Returns true if the method may return with a non-empty operand stack.
    fn returns_with_non_empty_stack(&self) -> bool;
    /// Returns true if the method may modify anything reachable from outside.
    fn modifies_anything(&self) -> bool;
    /// Returns true if the method may return newly created instances.
    fn returns_new_instances(&self) -> bool;
    /// Returns true if the method may return externally obtained values.
    fn returns_external_values(&self) -> bool;
    /// Returns the number of invocations seen, saturating at `u32::MAX`.
    fn invocation_count(&self) -> u32;
    /// Returns the slot size of every parameter, the receiver first.
    fn parameter_slot_sizes(&self) -> &[u8];
    /// Returns true if the parameter in `slot` is used.
    fn is_parameter_used(&self, slot: usize) -> bool;
    /// Returns the bitmask of used parameter slots.
    fn used_parameters(&self) -> u64;
    /// Returns true if the parameter in `slot` has escaped.
    fn has_parameter_escaped(&self, slot: usize) -> bool;
    /// Returns the bitmask of escaped parameter slots.
    fn escaped_parameters(&self) -> u64;
    /// Returns true if the parameter in `slot` is escaping.
    fn is_parameter_escaping(&self, slot: usize) -> bool;
    /// Returns the bitmask of escaping parameter slots.
    fn escaping_parameters(&self) -> u64;
    /// Returns true if the parameter in `slot` may be modified.
    fn is_parameter_modified(&self, slot: usize) -> bool;
    /// Returns the bitmask of modified parameter slots.
    fn modified_parameters(&self) -> u64;
    /// Returns true if the parameter in `slot` may be returned.
    fn returns_parameter(&self, slot: usize) -> bool;
    /// Returns the bitmask of returned parameter slots.
    fn returned_parameters(&self) -> u64;
    /// Returns the generalized value passed in `slot`, if any was recorded.
    fn parameter_value(&self, slot: usize) -> Option<Value>;
    /// Returns the generalized return value, if any was recorded.
    fn return_value(&self) -> Option<Value>;

    /// Returns the total number of parameter slots.
    fn parameter_size(&self) -> usize {
        self.parameter_slot_sizes()
            .iter()
            .map(|size| usize::from(*size))
            .sum()
    }
}

/// Conservative facts of a method outside the analyzed program.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryMethodFacts {
    parameter_slot_sizes: Vec<u8>,
}

impl LibraryMethodFacts {
    /// Creates the facts for a method with the given parameter slot layout.
    #[must_use]
    pub fn new(parameter_slot_sizes: Vec<u8>) -> Self {
        Self {
            parameter_slot_sizes,
        }
    }
}

impl MethodInfo for LibraryMethodFacts {
    fn is_kept(&self) -> bool {
        true
    }

    fn has_no_side_effects(&self) -> bool {
        false
    }

    fn has_no_external_side_effects(&self) -> bool {
        false
    }

    fn has_no_escaping_parameters(&self) -> bool {
        false
    }

    fn has_no_external_return_values(&self) -> bool {
        false
    }

    fn has_side_effects(&self) -> bool {
        true
    }

    fn can_be_made_private(&self) -> bool {
        false
    }

    fn catches_exceptions(&self) -> bool {
        true
    }

    fn branches_backward(&self) -> bool {
        true
    }

    fn invokes_super_methods(&self) -> bool {
        true
    }

    fn invokes_dynamically(&self) -> bool {
        true
    }

    fn accesses_private_code(&self) -> bool {
        true
    }

    fn accesses_package_code(&self) -> bool {
        true
    }

    fn accesses_protected_code(&self) -> bool {
        true
    }

    fn has_synchronized_block(&self) -> bool {
        true
    }

    fn assigns_final_field(&self) -> bool {
        true
    }

    fn returns_with_non_empty_stack(&self) -> bool {
        true
    }

    fn modifies_anything(&self) -> bool {
        true
    }

    fn returns_new_instances(&self) -> bool {
        true
    }

    fn returns_external_values(&self) -> bool {
        true
    }

    fn invocation_count(&self) -> u32 {
        u32::MAX
    }

    fn parameter_slot_sizes(&self) -> &[u8] {
        &self.parameter_slot_sizes
    }

    fn is_parameter_used(&self, _slot: usize) -> bool {
        true
    }

    fn used_parameters(&self) -> u64 {
        u64::MAX
    }

    fn has_parameter_escaped(&self, _slot: usize) -> bool {
        true
    }

    fn escaped_parameters(&self) -> u64 {
        u64::MAX
    }

    fn is_parameter_escaping(&self, _slot: usize) -> bool {
        true
    }

    fn escaping_parameters(&self) -> u64 {
        u64::MAX
    }

    fn is_parameter_modified(&self, _slot: usize) -> bool {
        true
    }

    fn modified_parameters(&self) -> u64 {
        u64::MAX
    }

    fn returns_parameter(&self, _slot: usize) -> bool {
        true
    }

    fn returned_parameters(&self) -> u64 {
        u64::MAX
    }

    fn parameter_value(&self, _slot: usize) -> Option<Value> {
        None
    }

    fn return_value(&self) -> Option<Value> {
        None
    }
}

fn slot_is_set(mask: u64, slot: usize) -> bool {
    slot >= MAX_TRACKED_SLOTS || mask & (1 << slot) != 0
}

/// Facts of a program method, widened by the analysis passes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramMethodFacts {
    method: Token,
    flags: MethodFlags,
    invocation_count: u32,
    parameter_slot_sizes: Vec<u8>,
    parameter_size: usize,
    used_parameters: u64,
    escaped_parameters: u64,
    escaping_parameters: u64,
    modified_parameters: u64,
    returned_parameters: u64,
    parameter_values: Vec<Option<Value>>,
    return_value: Option<Value>,
}

macro_rules! flag_setters {
    ($($(#[$doc:meta])* $name:ident => $flag:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self) {
                self.flags.insert(MethodFlags::$flag);
            }
        )*
    };
}

impl ProgramMethodFacts {
    /// Creates fresh facts for the method `method` with the given parameter slot layout.
    #[must_use]
    pub fn new(method: Token, parameter_slot_sizes: Vec<u8>) -> Self {
        let parameter_size = parameter_slot_sizes
            .iter()
            .map(|size| usize::from(*size))
            .sum();
        Self {
            method,
            flags: MethodFlags::empty(),
            invocation_count: 0,
            parameter_slot_sizes,
            parameter_size,
            used_parameters: 0,
            escaped_parameters: 0,
            escaping_parameters: 0,
            modified_parameters: 0,
            returned_parameters: 0,
            parameter_values: vec![None; parameter_size],
            return_value: None,
        }
    }

    /// Creates fresh facts for `method`, deriving the slot layout from its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the descriptor can not be parsed.
    pub fn for_method(method: &ProgramMethod) -> Result<Self> {
        let slot_sizes = method
            .method_descriptor()?
            .parameter_slot_sizes(method.is_static());
        Ok(Self::new(method.token, slot_sizes))
    }

    /// Returns the method these facts belong to.
    #[must_use]
    pub fn method(&self) -> Token {
        self.method
    }

    /// Returns all boolean facts at once.
    #[must_use]
    pub fn flags(&self) -> MethodFlags {
        self.flags
    }

    /// Marks the method as having no side effects at all.
    ///
    /// Implies no external side effects and no escaping parameters.
    pub fn set_no_side_effects(&mut self) {
        self.flags.insert(
            MethodFlags::NO_SIDE_EFFECTS
                | MethodFlags::NO_EXTERNAL_SIDE_EFFECTS
                | MethodFlags::NO_ESCAPING_PARAMETERS,
        );
    }

    /// Marks the method as having no side effects outside its receiver.
    ///
    /// Implies no escaping parameters.
    pub fn set_no_external_side_effects(&mut self) {
        self.flags.insert(
            MethodFlags::NO_EXTERNAL_SIDE_EFFECTS | MethodFlags::NO_ESCAPING_PARAMETERS,
        );
    }

    flag_setters! {
        /// Marks the method as pinned.
        set_kept => KEPT;
        /// Marks that no parameter escapes.
        set_no_escaping_parameters => NO_ESCAPING_PARAMETERS;
        /// Marks that the method never returns externally obtained values.
        set_no_external_return_values => NO_EXTERNAL_RETURN_VALUES;
        /// Records that the method has side effects.
        set_side_effects => HAS_SIDE_EFFECTS;
        /// Records that the method can not be made private.
        set_non_private => NON_PRIVATE;
        /// Records an exception handler.
        set_catches_exceptions => CATCHES_EXCEPTIONS;
        /// Records a backward branch.
        set_branches_backward => BRANCHES_BACKWARD;
        /// Records a superclass method invocation.
        set_invokes_super_methods => INVOKES_SUPER_METHODS;
        /// Records an `invokedynamic`.
        set_invokes_dynamically => INVOKES_DYNAMICALLY;
        /// Records an access to private code.
        set_accesses_private_code => ACCESSES_PRIVATE_CODE;
        /// Records an access to package-private code.
        set_accesses_package_code => ACCESSES_PACKAGE_CODE;
        /// Records an access to protected code.
        set_accesses_protected_code => ACCESSES_PROTECTED_CODE;
        /// Records a synchronized block.
        set_synchronized_block => HAS_SYNCHRONIZED_BLOCK;
        /// Records a write to a final field.
        set_assigns_final_field => ASSIGNS_FINAL_FIELD;
        /// Records a return with a non-empty operand stack.
        set_returns_with_non_empty_stack => RETURNS_WITH_NON_EMPTY_STACK;
        /// Records a modification of externally reachable state.
        set_modifies_anything => MODIFIES_ANYTHING;
        /// Records that newly created instances may be returned.
        set_returns_new_instances => RETURNS_NEW_INSTANCES;
        /// Records that externally obtained values may be returned.
        set_returns_external_values => RETURNS_EXTERNAL_VALUES;
    }

    /// Counts one more invocation, saturating at `u32::MAX`.
    pub fn increment_invocation_count(&mut self) {
        self.invocation_count = self.invocation_count.saturating_add(1);
    }

    /// Returns the bit for `slot`, `None` for untracked slots at index 64 and above.
    fn slot_bit(&self, slot: usize) -> Result<Option<u64>> {
        if slot >= MAX_TRACKED_SLOTS {
            Ok(None)
        } else if slot >= self.parameter_size {
            Err(self.invalid_slot(slot))
        } else {
            Ok(Some(1 << slot))
        }
    }

    fn checked_mask(&self, mask: u64) -> Result<u64> {
        let valid = if self.parameter_size >= MAX_TRACKED_SLOTS {
            u64::MAX
        } else {
            (1u64 << self.parameter_size) - 1
        };
        match mask & !valid {
            0 => Ok(mask),
            outside => Err(self.invalid_slot(outside.trailing_zeros() as usize)),
        }
    }

    fn invalid_slot(&self, slot: usize) -> Error {
        Error::InvalidSlot {
            method: self.method,
            slot,
            size: self.parameter_size,
        }
    }

    /// Marks the parameter in `slot` as used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] for slots below 64 that are not parameter slots.
    pub fn mark_parameter_used(&mut self, slot: usize) -> Result<()> {
        if let Some(bit) = self.slot_bit(slot)? {
            self.used_parameters |= bit;
        }
        Ok(())
    }

    /// Adds the slots in `mask` to the used parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if `mask` has bits beyond the parameter slots.
    pub fn update_used_parameters(&mut self, mask: u64) -> Result<()> {
        self.used_parameters |= self.checked_mask(mask)?;
        Ok(())
    }

    /// Marks every parameter slot as used.
    pub fn mark_all_parameters_used(&mut self) {
        self.used_parameters |= self.all_slots();
    }

    fn all_slots(&self) -> u64 {
        if self.parameter_size >= MAX_TRACKED_SLOTS {
            u64::MAX
        } else {
            (1u64 << self.parameter_size) - 1
        }
    }

    /// Marks the parameter in `slot` as escaped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] for slots below 64 that are not parameter slots.
    pub fn mark_parameter_escaped(&mut self, slot: usize) -> Result<()> {
        if let Some(bit) = self.slot_bit(slot)? {
            self.escaped_parameters |= bit;
        }
        Ok(())
    }

    /// Adds the slots in `mask` to the escaped parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if `mask` has bits beyond the parameter slots.
    pub fn update_escaped_parameters(&mut self, mask: u64) -> Result<()> {
        self.escaped_parameters |= self.checked_mask(mask)?;
        Ok(())
    }

    /// Marks the parameter in `slot` as escaping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] for slots below 64 that are not parameter slots.
    pub fn mark_parameter_escaping(&mut self, slot: usize) -> Result<()> {
        if let Some(bit) = self.slot_bit(slot)? {
            self.escaping_parameters |= bit;
        }
        Ok(())
    }

    /// Adds the slots in `mask` to the escaping parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if `mask` has bits beyond the parameter slots.
    pub fn update_escaping_parameters(&mut self, mask: u64) -> Result<()> {
        self.escaping_parameters |= self.checked_mask(mask)?;
        Ok(())
    }

    /// Marks the parameter in `slot` as modified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] for slots below 64 that are not parameter slots.
    pub fn mark_parameter_modified(&mut self, slot: usize) -> Result<()> {
        if let Some(bit) = self.slot_bit(slot)? {
            self.modified_parameters |= bit;
        }
        Ok(())
    }

    /// Adds the slots in `mask` to the modified parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if `mask` has bits beyond the parameter slots.
    pub fn update_modified_parameters(&mut self, mask: u64) -> Result<()> {
        self.modified_parameters |= self.checked_mask(mask)?;
        Ok(())
    }

    /// Marks the parameter in `slot` as returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] for slots below 64 that are not parameter slots.
    pub fn mark_parameter_returned(&mut self, slot: usize) -> Result<()> {
        if let Some(bit) = self.slot_bit(slot)? {
            self.returned_parameters |= bit;
        }
        Ok(())
    }

    /// Adds the slots in `mask` to the returned parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if `mask` has bits beyond the parameter slots.
    pub fn update_returned_parameters(&mut self, mask: u64) -> Result<()> {
        self.returned_parameters |= self.checked_mask(mask)?;
        Ok(())
    }

    /// Joins `value` into the value recorded for the parameter in `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSlot`] if `slot` is not a parameter slot, and
    /// [`Error::IncompatibleValues`] if `value` has a different kind than the recorded value.
    pub fn generalize_parameter_value(&mut self, slot: usize, value: Value) -> Result<()> {
        let size = self.parameter_size;
        let method = self.method;
        let Some(current) = self.parameter_values.get_mut(slot) else {
            return Err(Error::InvalidSlot { method, slot, size });
        };
        *current = Some(match current {
            Some(old) => old.generalize(&value)?,
            None => value,
        });
        Ok(())
    }

    /// Joins `value` into the recorded return value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleValues`] if `value` has a different kind than the
    /// recorded value.
    pub fn generalize_return_value(&mut self, value: Value) -> Result<()> {
        self.return_value = Some(match &self.return_value {
            Some(old) => old.generalize(&value)?,
            None => value,
        });
        Ok(())
    }

    /// Widens these facts by the facts of an overriding or overridden method.
    ///
    /// Only the nine facts in [`MethodFlags::MERGED`] are combined; a fact that holds on either
    /// side holds afterwards. Bitmasks, counters and values are left alone.
    pub fn merge(&mut self, other: &impl MethodInfo) {
        let mut merged = MethodFlags::empty();
        merged.set(MethodFlags::CATCHES_EXCEPTIONS, other.catches_exceptions());
        merged.set(MethodFlags::BRANCHES_BACKWARD, other.branches_backward());
        merged.set(MethodFlags::INVOKES_SUPER_METHODS, other.invokes_super_methods());
        merged.set(MethodFlags::INVOKES_DYNAMICALLY, other.invokes_dynamically());
        merged.set(MethodFlags::ACCESSES_PRIVATE_CODE, other.accesses_private_code());
        merged.set(MethodFlags::ACCESSES_PACKAGE_CODE, other.accesses_package_code());
        merged.set(MethodFlags::ACCESSES_PROTECTED_CODE, other.accesses_protected_code());
        merged.set(MethodFlags::HAS_SYNCHRONIZED_BLOCK, other.has_synchronized_block());
        merged.set(MethodFlags::ASSIGNS_FINAL_FIELD, other.assigns_final_field());
        self.flags.insert(merged & MethodFlags::MERGED);
    }
}

impl MethodInfo for ProgramMethodFacts {
    fn is_kept(&self) -> bool {
        self.flags.contains(MethodFlags::KEPT)
    }

    fn has_no_side_effects(&self) -> bool {
        self.flags.contains(MethodFlags::NO_SIDE_EFFECTS)
    }

    fn has_no_external_side_effects(&self) -> bool {
        self.flags.contains(MethodFlags::NO_EXTERNAL_SIDE_EFFECTS)
    }

    fn has_no_escaping_parameters(&self) -> bool {
        self.flags.contains(MethodFlags::NO_ESCAPING_PARAMETERS)
    }

    fn has_no_external_return_values(&self) -> bool {
        self.flags.contains(MethodFlags::NO_EXTERNAL_RETURN_VALUES)
    }

    fn has_side_effects(&self) -> bool {
        !self.has_no_side_effects() && self.flags.contains(MethodFlags::HAS_SIDE_EFFECTS)
    }

    fn can_be_made_private(&self) -> bool {
        !self.flags.intersects(MethodFlags::KEPT | MethodFlags::NON_PRIVATE)
    }

    fn catches_exceptions(&self) -> bool {
        self.flags.contains(MethodFlags::CATCHES_EXCEPTIONS)
    }

    fn branches_backward(&self) -> bool {
        self.flags.contains(MethodFlags::BRANCHES_BACKWARD)
    }

    fn invokes_super_methods(&self) -> bool {
        self.flags.contains(MethodFlags::INVOKES_SUPER_METHODS)
    }

    fn invokes_dynamically(&self) -> bool {
        self.flags.contains(MethodFlags::INVOKES_DYNAMICALLY)
    }

    fn accesses_private_code(&self) -> bool {
        self.flags.contains(MethodFlags::ACCESSES_PRIVATE_CODE)
    }

    fn accesses_package_code(&self) -> bool {
        self.flags.contains(MethodFlags::ACCESSES_PACKAGE_CODE)
    }

    fn accesses_protected_code(&self) -> bool {
        self.flags.contains(MethodFlags::ACCESSES_PROTECTED_CODE)
    }

    fn has_synchronized_block(&self) -> bool {
        self.flags.contains(MethodFlags::HAS_SYNCHRONIZED_BLOCK)
    }

    fn assigns_final_field(&self) -> bool {
        self.flags.contains(MethodFlags::ASSIGNS_FINAL_FIELD)
    }

    fn returns_with_non_empty_stack(&self) -> bool {
        self.flags.contains(MethodFlags::RETURNS_WITH_NON_EMPTY_STACK)
    }

    fn modifies_anything(&self) -> bool {
        self.flags.contains(MethodFlags::MODIFIES_ANYTHING)
    }

    fn returns_new_instances(&self) -> bool {
        self.flags.contains(MethodFlags::RETURNS_NEW_INSTANCES)
    }

    fn returns_external_values(&self) -> bool {
        self.flags.contains(MethodFlags::RETURNS_EXTERNAL_VALUES)
    }

    fn invocation_count(&self) -> u32 {
        self.invocation_count
    }

    fn parameter_slot_sizes(&self) -> &[u8] {
        &self.parameter_slot_sizes
    }

    fn parameter_size(&self) -> usize {
        self.parameter_size
    }

    fn is_parameter_used(&self, slot: usize) -> bool {
        slot_is_set(self.used_parameters, slot)
    }

    fn used_parameters(&self) -> u64 {
        self.used_parameters
    }

    fn has_parameter_escaped(&self, slot: usize) -> bool {
        slot_is_set(self.escaped_parameters, slot)
    }

    fn escaped_parameters(&self) -> u64 {
        self.escaped_parameters
    }

    fn is_parameter_escaping(&self, slot: usize) -> bool {
        !self.has_no_escaping_parameters() && slot_is_set(self.escaping_parameters, slot)
    }

    fn escaping_parameters(&self) -> u64 {
        if self.has_no_escaping_parameters() {
            0
        } else {
            self.escaping_parameters
        }
    }

    fn is_parameter_modified(&self, slot: usize) -> bool {
        !self.has_no_side_effects()
            && (slot == 0 || !self.has_no_external_side_effects())
            && slot_is_set(self.modified_parameters, slot)
    }

    fn modified_parameters(&self) -> u64 {
        if self.has_no_side_effects() {
            0
        } else if self.has_no_external_side_effects() {
            self.modified_parameters & 1
        } else {
            self.modified_parameters
        }
    }

    fn returns_parameter(&self, slot: usize) -> bool {
        slot_is_set(self.returned_parameters, slot)
    }

    fn returned_parameters(&self) -> u64 {
        self.returned_parameters
    }

    fn parameter_value(&self, slot: usize) -> Option<Value> {
        self.parameter_values.get(slot).copied().flatten()
    }

    fn return_value(&self) -> Option<Value> {
        self.return_value
    }
}

/// The facts attached to one method.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodFacts {
    /// Conservative facts of a method outside the program
    Library(LibraryMethodFacts),
    /// Computed facts of a program method
    Program(ProgramMethodFacts),
}

impl MethodFacts {
    /// Returns true for library (opaque) facts.
    #[must_use]
    pub fn is_library(&self) -> bool {
        matches!(self, MethodFacts::Library(_))
    }

    /// Returns the computed facts, `None` for library facts.
    #[must_use]
    pub fn as_program(&self) -> Option<&ProgramMethodFacts> {
        match self {
            MethodFacts::Program(facts) => Some(facts),
            MethodFacts::Library(_) => None,
        }
    }

    /// Returns the computed facts for modification, `None` for library facts.
    pub fn as_program_mut(&mut self) -> Option<&mut ProgramMethodFacts> {
        match self {
            MethodFacts::Program(facts) => Some(facts),
            MethodFacts::Library(_) => None,
        }
    }
}

macro_rules! delegate_method_info {
    ($($name:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*) => {
        impl MethodInfo for MethodFacts {
            $(
                fn $name(&self, $($arg: $ty),*) -> $ret {
                    match self {
                        MethodFacts::Library(facts) => facts.$name($($arg),*),
                        MethodFacts::Program(facts) => facts.$name($($arg),*),
                    }
                }
            )*
        }
    };
}

delegate_method_info! {
    is_kept() -> bool;
    has_no_side_effects() -> bool;
    has_no_external_side_effects() -> bool;
    has_no_escaping_parameters() -> bool;
    has_no_external_return_values() -> bool;
    has_side_effects() -> bool;
    can_be_made_private() -> bool;
    catches_exceptions() -> bool;
    branches_backward() -> bool;
    invokes_super_methods() -> bool;
    invokes_dynamically() -> bool;
    accesses_private_code() -> bool;
    accesses_package_code() -> bool;
    accesses_protected_code() -> bool;
    has_synchronized_block() -> bool;
    assigns_final_field() -> bool;
    returns_with_non_empty_stack() -> bool;
    modifies_anything() -> bool;
    returns_new_instances() -> bool;
    returns_external_values() -> bool;
    invocation_count() -> u32;
    parameter_slot_sizes() -> &[u8];
    parameter_size() -> usize;
    is_parameter_used(slot: usize) -> bool;
    used_parameters() -> u64;
    has_parameter_escaped(slot: usize) -> bool;
    escaped_parameters() -> u64;
    is_parameter_escaping(slot: usize) -> bool;
    escaping_parameters() -> u64;
    is_parameter_modified(slot: usize) -> bool;
    modified_parameters() -> u64;
    returns_parameter(slot: usize) -> bool;
    returned_parameters() -> u64;
    parameter_value(slot: usize) -> Option<Value>;
    return_value() -> Option<Value>;
}
