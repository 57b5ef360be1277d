//! Marking of members that can not be made private.
//!
//! A member stays non-private if it is referenced from a class other than its declaring class,
//! if the virtual machine or reflection reaches it by name, or if it takes part in virtual
//! dispatch. Three visitors feed the same [`NonPrivateMemberMarker::mark_non_private`]
//! operation:
//!
//! - the constant visitor, for member references and reflected strings in a constant pool
//! - the class visitor, for class initializers, default constructors and methods that override
//!   or are overridden
//! - the member visitor, i.e. direct calls by whoever pins members for other reasons

use tracing::trace;

use crate::{
    analysis::markers::{ClassMarker, MarkingContext},
    classfile::{Constant, ProgramClass, Token, INSTANCE_INITIALIZER},
    Error, Result,
};

/// Marks members that must keep their current visibility.
pub struct NonPrivateMemberMarker;

impl NonPrivateMemberMarker {
    /// Marks `member`, a method or a field, as not privatizable.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingFacts`] if the member has no facts attached.
    pub fn mark_non_private(&self, context: &MarkingContext<'_>, member: Token) -> Result<()> {
        trace!(member = %member, "non-private");
        if context.pool.is_method(member) {
            context
                .store
                .update_method(member, |facts| facts.set_non_private())?;
        } else {
            context
                .store
                .update_field(member, |facts| facts.set_non_private())?;
        }
        Ok(())
    }

    /// Marks the members referenced from other classes through the constant pool of `class`.
    ///
    /// Reflected members are marked even when they belong to `class` itself.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unresolved`] if a member reference was never resolved.
    pub fn mark_constants(&self, context: &MarkingContext<'_>, class: &ProgramClass) -> Result<()> {
        for (index, constant) in class.constant_pool.iter() {
            match constant {
                Constant::Fieldref(reference)
                | Constant::Methodref(reference)
                | Constant::InterfaceMethodref(reference) => {
                    let Some(member) = reference.referenced_member else {
                        return Err(Error::Unresolved {
                            class: class.token,
                            index,
                        });
                    };
                    if context.pool.declaring_class(member)?.token != class.token {
                        self.mark_non_private(context, member)?;
                    }
                }
                Constant::String(string) => {
                    if let Some(member) = string.referenced_member {
                        self.mark_non_private(context, member)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Marks the methods of `class` that the virtual machine or virtual dispatch depend on.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::EntityNotFound`] if the hierarchy of `class` is inconsistent.
    pub fn mark_methods(&self, context: &MarkingContext<'_>, class: &ProgramClass) -> Result<()> {
        for method in &class.methods {
            let required = method.is_class_initializer()
                || (method.name == INSTANCE_INITIALIZER && method.descriptor == "()V")
                || (method.is_virtual()
                    && (!context.pool.overridden_methods(method.token)?.is_empty()
                        || !context.pool.overriding_methods(method.token)?.is_empty()));
            if required {
                self.mark_non_private(context, method.token)?;
            }
        }
        Ok(())
    }
}

impl ClassMarker for NonPrivateMemberMarker {
    fn mark_class(&self, context: &MarkingContext<'_>, class: &ProgramClass) -> Result<()> {
        self.mark_methods(context, class)?;
        self.mark_constants(context, class)
    }

    fn name(&self) -> &'static str {
        "non-private"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            config::AnalysisConfig,
            info::{FactStore, FieldInfo, MethodInfo},
        },
        classfile::{AccessFlags, ClassBuilder, Opcode, ReflectionTarget},
        test::factories::{field_token, linked_pool, method_token},
    };

    fn privatizable(store: &FactStore, method: Token) -> bool {
        store.method(method).unwrap().can_be_made_private()
    }

    #[test]
    fn test_non_private_members() {
        let pool = linked_pool(vec![
            ClassBuilder::new("app/Animal")
                .method("<init>", "()V", AccessFlags::PUBLIC, |code| {
                    code.aload(0)
                        .invokespecial("java/lang/Object", "<init>", "()V")
                        .op(Opcode::Return);
                    Ok(())
                })
                .method("<clinit>", "()V", AccessFlags::STATIC, |code| {
                    code.op(Opcode::Return);
                    Ok(())
                })
                .method("speak", "()V", AccessFlags::PUBLIC, |code| {
                    code.op(Opcode::Return);
                    Ok(())
                })
                .method("helper", "()V", AccessFlags::PUBLIC, |code| {
                    code.op(Opcode::Return);
                    Ok(())
                })
                .method("internal", "()V", AccessFlags::PUBLIC, |code| {
                    code.op(Opcode::Return);
                    Ok(())
                })
                .method("reflected", "()V", AccessFlags::PUBLIC, |code| {
                    code.op(Opcode::Return);
                    Ok(())
                })
                .method("useInternal", "()V", AccessFlags::PUBLIC, |code| {
                    code.aload(0)
                        .invokevirtual("app/Animal", "internal", "()V")
                        .op(Opcode::Return);
                    Ok(())
                })
                .field("name", "Ljava/lang/String;", AccessFlags::PUBLIC)
                .field("age", "I", AccessFlags::PUBLIC)
                .with_constants(|constants| {
                    constants.reflected_string(
                        "reflected",
                        ReflectionTarget {
                            class_name: "app/Animal".to_string(),
                            member_name: Some("reflected".to_string()),
                            descriptor: Some("()V".to_string()),
                        },
                    );
                })
                .build()
                .unwrap(),
            ClassBuilder::new("app/Dog")
                .extends("app/Animal")
                .method("speak", "()V", AccessFlags::PUBLIC, |code| {
                    code.op(Opcode::Return);
                    Ok(())
                })
                .build()
                .unwrap(),
            ClassBuilder::new("app/Keeper")
                .method("feed", "(Lapp/Animal;)V", AccessFlags::STATIC, |code| {
                    code.aload(0)
                        .invokevirtual("app/Animal", "helper", "()V")
                        .aload(0)
                        .getfield("app/Animal", "name", "Ljava/lang/String;")
                        .op(Opcode::Pop)
                        .op(Opcode::Return);
                    Ok(())
                })
                .build()
                .unwrap(),
        ]);
        let store = FactStore::initialize(&pool, false).unwrap();
        let config = AnalysisConfig::sequential();
        let context = MarkingContext::new(&pool, &store, &config);
        for class in pool.program_classes() {
            NonPrivateMemberMarker.mark_class(&context, class).unwrap();
        }

        let animal = |name: &str| method_token(&pool, "app/Animal", name);
        assert!(!privatizable(&store, animal("<init>")));
        assert!(!privatizable(&store, animal("<clinit>")));
        assert!(!privatizable(&store, animal("speak")));
        assert!(!privatizable(&store, method_token(&pool, "app/Dog", "speak")));
        assert!(!privatizable(&store, animal("helper")));
        assert!(!privatizable(&store, animal("reflected")));
        assert!(privatizable(&store, animal("internal")));
        assert!(privatizable(&store, animal("useInternal")));

        let field = |name: &str| {
            store
                .field(field_token(&pool, "app/Animal", name))
                .unwrap()
                .can_be_made_private()
        };
        assert!(!field("name"));
        assert!(field("age"));
    }

    #[test]
    fn test_direct_marking_is_idempotent() {
        let pool = linked_pool(vec![ClassBuilder::new("app/Solo")
            .field("value", "J", AccessFlags::PRIVATE)
            .build()
            .unwrap()]);
        let store = FactStore::initialize(&pool, false).unwrap();
        let config = AnalysisConfig::sequential();
        let context = MarkingContext::new(&pool, &store, &config);
        let value = field_token(&pool, "app/Solo", "value");

        NonPrivateMemberMarker.mark_non_private(&context, value).unwrap();
        let once = store.field(value).unwrap().clone();
        NonPrivateMemberMarker.mark_non_private(&context, value).unwrap();

        assert_eq!(*store.field(value).unwrap(), once);
        assert!(!once.can_be_made_private());
    }
}
