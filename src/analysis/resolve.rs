//! Lookups of resolved constant-pool references.
//!
//! The passes only run on a linked class pool, so a missing reference here is a broken
//! precondition and reported as [`Error::Unresolved`].

use crate::{
    classfile::{Constant, ProgramClass, Token},
    Error, Result,
};

/// Returns the member a field or method reference at `index` resolved to.
pub(crate) fn referenced_member(class: &ProgramClass, index: u16) -> Result<Token> {
    class
        .constant_pool
        .ref_constant(index)?
        .referenced_member
        .ok_or(Error::Unresolved {
            class: class.token,
            index,
        })
}

/// Returns the class the class constant at `index` resolved to.
///
/// Arrays of primitives resolve to no class and yield `None`.
pub(crate) fn referenced_class(class: &ProgramClass, index: u16) -> Result<Option<Token>> {
    let constant = class.constant_pool.class_constant(index)?;
    match constant.referenced_class {
        Some(token) => Ok(Some(token)),
        None if constant.is_primitive_array() => Ok(None),
        None => Err(Error::Unresolved {
            class: class.token,
            index,
        }),
    }
}

/// Returns the class a loaded constant at `index` denotes, if it is a class constant.
pub(crate) fn loaded_class(class: &ProgramClass, index: u16) -> Result<Option<Token>> {
    match class.constant_pool.get(index)? {
        Constant::Class(_) => referenced_class(class, index),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{ClassBuilder, ClassPool};

    #[test]
    fn test_unlinked_references_are_errors() {
        let mut pool = ClassPool::new();
        let token = pool
            .add(
                ClassBuilder::new("app/Lonely")
                    .with_constants(|constants| {
                        constants.fieldref("app/Other", "x", "I");
                        constants.class("[[J");
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let class = pool.class(token).unwrap();

        let (field_index, array_index) = {
            let mut field_index = 0;
            let mut array_index = 0;
            for (index, constant) in class.constant_pool.iter() {
                match constant {
                    Constant::Fieldref(_) => field_index = index,
                    Constant::Class(constant) if constant.name == "[[J" => array_index = index,
                    _ => {}
                }
            }
            (field_index, array_index)
        };

        assert!(matches!(
            referenced_member(class, field_index),
            Err(Error::Unresolved { .. })
        ));
        assert_eq!(referenced_class(class, array_index).unwrap(), None);
    }
}
