//! Marking of the private, package-private and protected code a method accesses.
//!
//! A method that accesses restricted code can not be moved to another class (inlined,
//! merged or outlined) without breaking the access. The marker follows every constant an
//! instruction refers to, including nested ones:
//!
//! - class constants, with array classes reduced to their element class
//! - field and method references, through their class constant and resolved member
//! - string constants that carry a reflectively resolved class or member
//! - method handles, through their member reference
//! - method types, dynamic constants and call sites, through the classes of their
//!   descriptor and the handle and static arguments of their bootstrap method
//!
//! Restricted entities set, on the accessing method:
//!
//! | Accessed | Fact |
//! |---|---|
//! | non-public class | `accesses_package_code` |
//! | private member | `accesses_private_code` |
//! | protected member of another class | `accesses_protected_code` |
//! | package-private member | `accesses_package_code` |

use std::collections::HashSet;

use tracing::trace;

use crate::{
    analysis::{
        info::{FactStore, MethodFlags},
        markers::{ClassMarker, MarkingContext},
        resolve,
    },
    classfile::{ClassPool, Constant, Instruction, ProgramClass, Token, Visibility},
    Error, Result,
};

/// Marks which restricted code methods access.
pub struct AccessMarker;

impl AccessMarker {
    /// Marks on `method` the accesses made by `instruction`, an instruction of `method` in
    /// `class`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unresolved`] if a reachable constant was never resolved.
    pub fn mark_accesses_for(
        &self,
        context: &MarkingContext<'_>,
        class: &ProgramClass,
        method: Token,
        instruction: &Instruction,
    ) -> Result<()> {
        let mut scan = AccessScan::new(context.pool, class);
        if let Some(index) = instruction.constant_index() {
            scan.visit_constant(index)?;
        }
        apply(context.store, method, scan.flags)
    }
}

impl ClassMarker for AccessMarker {
    fn mark_class(&self, context: &MarkingContext<'_>, class: &ProgramClass) -> Result<()> {
        for method in &class.methods {
            let Some(code) = &method.code else {
                continue;
            };

            let mut scan = AccessScan::new(context.pool, class);
            for index in code
                .instructions
                .iter()
                .filter_map(Instruction::constant_index)
            {
                scan.visit_constant(index)?;
            }
            apply(context.store, method.token, scan.flags)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "access"
    }
}

fn apply(store: &FactStore, method: Token, flags: MethodFlags) -> Result<()> {
    if flags.is_empty() {
        return Ok(());
    }
    trace!(method = %method, flags = ?flags, "marking accesses");
    store.update_method(method, |facts| {
        if flags.contains(MethodFlags::ACCESSES_PRIVATE_CODE) {
            facts.set_accesses_private_code();
        }
        if flags.contains(MethodFlags::ACCESSES_PACKAGE_CODE) {
            facts.set_accesses_package_code();
        }
        if flags.contains(MethodFlags::ACCESSES_PROTECTED_CODE) {
            facts.set_accesses_protected_code();
        }
    })?;
    Ok(())
}

/// The restricted accesses reachable from a set of constants of one class.
struct AccessScan<'a> {
    pool: &'a ClassPool,
    class: &'a ProgramClass,
    visited: HashSet<u16>,
    flags: MethodFlags,
}

impl<'a> AccessScan<'a> {
    fn new(pool: &'a ClassPool, class: &'a ProgramClass) -> Self {
        Self {
            pool,
            class,
            visited: HashSet::new(),
            flags: MethodFlags::empty(),
        }
    }

    fn visit_constant(&mut self, index: u16) -> Result<()> {
        if !self.visited.insert(index) {
            return Ok(());
        }
        let class = self.class;

        match class.constant_pool.get(index)? {
            Constant::Class(_) => {
                if let Some(referenced) = resolve::referenced_class(class, index)? {
                    self.visit_class(referenced)?;
                }
            }
            Constant::Fieldref(reference)
            | Constant::Methodref(reference)
            | Constant::InterfaceMethodref(reference) => {
                self.visit_constant(reference.class_index)?;
                let member = resolve::referenced_member(class, index)?;
                self.visit_member(member)?;
            }
            Constant::String(string) => {
                if string.reflection.is_some() && string.referenced_class.is_none() {
                    return Err(Error::Unresolved {
                        class: class.token,
                        index,
                    });
                }
                if let Some(referenced) = string.referenced_class {
                    self.visit_class(referenced)?;
                }
                if let Some(member) = string.referenced_member {
                    self.visit_member(member)?;
                }
            }
            Constant::MethodHandle(handle) => self.visit_constant(handle.reference_index)?,
            Constant::MethodType(method_type) => {
                for referenced in &method_type.referenced_classes {
                    self.visit_class(*referenced)?;
                }
            }
            Constant::Dynamic(dynamic) | Constant::InvokeDynamic(dynamic) => {
                for referenced in &dynamic.referenced_classes {
                    self.visit_class(*referenced)?;
                }
                let bootstrap = class
                    .bootstrap_methods
                    .get(usize::from(dynamic.bootstrap_method_index))
                    .ok_or_else(|| {
                        malformed_error!(
                            "Bootstrap method {} of constant #{} is out of range",
                            dynamic.bootstrap_method_index,
                            index
                        )
                    })?;
                self.visit_constant(bootstrap.method_handle_index)?;
                for argument in &bootstrap.arguments {
                    self.visit_constant(*argument)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn visit_class(&mut self, class: Token) -> Result<()> {
        if !self.pool.class(class)?.is_public() {
            self.flags.insert(MethodFlags::ACCESSES_PACKAGE_CODE);
        }
        Ok(())
    }

    fn visit_member(&mut self, member: Token) -> Result<()> {
        let access = self.pool.member_access(member)?;
        match access.visibility() {
            Visibility::Private => self.flags.insert(MethodFlags::ACCESSES_PRIVATE_CODE),
            Visibility::Protected => {
                if self.pool.declaring_class(member)?.token != self.class.token {
                    self.flags.insert(MethodFlags::ACCESSES_PROTECTED_CODE);
                }
            }
            Visibility::Package => self.flags.insert(MethodFlags::ACCESSES_PACKAGE_CODE),
            Visibility::Public => {}
        }
        Ok(())
    }
}
