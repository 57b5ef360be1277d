//! Resolution of names to tokens across the class pool.
//!
//! Linking runs in two phases:
//!
//! 1. **Hierarchy**: superclass and interface names become tokens and the reverse
//!    (subclass) index is rebuilt.
//! 2. **References**: every class, member, reflected-string, method-type and dynamic constant
//!    gets the tokens of the entities it names. Member references are resolved through the
//!    hierarchy of the referenced class, so a reference may point at a member declared in a
//!    superclass.
//!
//! Names that are missing from the pool are left unresolved and logged; consumers that
//! require fully linked input report them as [`crate::Error::Unresolved`].

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{
    classfile::{
        builder::JAVA_LANG_OBJECT,
        constant::Constant,
        descriptor::{FieldType, MethodDescriptor},
        pool::ClassPool,
        token::Token,
    },
    Result,
};

enum Resolution {
    Class(Option<Token>),
    Member {
        class: Option<Token>,
        member: Option<Token>,
    },
    Classes(Vec<Token>),
}

struct Linker<'a> {
    pool: &'a ClassPool,
    unresolved: usize,
}

impl Linker<'_> {
    fn class_named(&mut self, owner: &str, name: &str) -> Option<Token> {
        let token = self.pool.token_of(name);
        if token.is_none() {
            self.unresolved += 1;
            warn!(class = %name, from = %owner, "referenced class is not in the class pool");
        }
        token
    }

    /// Resolves a class constant name, which may be an array descriptor.
    fn class_constant(&mut self, owner: &str, name: &str) -> Result<Option<Token>> {
        if name.starts_with('[') {
            return Ok(match FieldType::parse(name)?.class_name() {
                Some(element) => self.class_named(owner, element),
                None => None,
            });
        }
        Ok(self.class_named(owner, name))
    }

    fn descriptor_classes<'d>(
        &mut self,
        owner: &str,
        names: impl IntoIterator<Item = &'d str>,
    ) -> Vec<Token> {
        names
            .into_iter()
            .filter_map(|name| self.class_named(owner, name))
            .collect()
    }

    fn member(
        &mut self,
        owner: &str,
        class: Option<Token>,
        name: &str,
        descriptor: &str,
        is_field: bool,
    ) -> Option<Token> {
        let class = class?;
        let member = if is_field {
            self.pool.resolve_field(class, name, descriptor)
        } else {
            self.pool.resolve_method(class, name, descriptor)
        };
        if member.is_none() {
            self.unresolved += 1;
            warn!(
                member = %name,
                descriptor = %descriptor,
                from = %owner,
                class = %class,
                "referenced member is not declared in the class hierarchy"
            );
        }
        member
    }

    fn resolve(&mut self, class: Token) -> Result<Vec<(u16, Resolution)>> {
        let classes = self.pool;
        let class = classes.class(class)?;
        let owner = class.name.as_str();
        let pool = &class.constant_pool;
        let mut resolutions = Vec::new();

        for (index, constant) in pool.iter() {
            let resolution = match constant {
                Constant::Class(constant) => {
                    Resolution::Class(self.class_constant(owner, &constant.name)?)
                }
                Constant::Fieldref(_) | Constant::Methodref(_) | Constant::InterfaceMethodref(_) => {
                    let (class_name, name, descriptor) = pool.ref_parts(index)?;
                    // Members of array types (`clone`, `length` via Object) live in Object
                    let lookup = if class_name.starts_with('[') {
                        JAVA_LANG_OBJECT
                    } else {
                        class_name
                    };
                    let referenced = self.class_named(owner, lookup);
                    let is_field = matches!(constant, Constant::Fieldref(_));
                    Resolution::Member {
                        class: referenced,
                        member: self.member(owner, referenced, name, descriptor, is_field),
                    }
                }
                Constant::String(string) => match &string.reflection {
                    Some(target) => {
                        let referenced = self.class_named(owner, &target.class_name);
                        let member = match (&target.member_name, &target.descriptor) {
                            (Some(name), Some(descriptor)) => self.member(
                                owner,
                                referenced,
                                name,
                                descriptor,
                                !descriptor.starts_with('('),
                            ),
                            (Some(name), None) => referenced.and_then(|class| {
                                self.pool.resolve_member_by_name(class, name)
                            }),
                            (None, _) => None,
                        };
                        Resolution::Member {
                            class: referenced,
                            member,
                        }
                    }
                    None => continue,
                },
                Constant::MethodType(method_type) => {
                    let descriptor = MethodDescriptor::parse(&method_type.descriptor)?;
                    Resolution::Classes(
                        self.descriptor_classes(owner, descriptor.referenced_class_names()),
                    )
                }
                Constant::Dynamic(dynamic) => {
                    let descriptor = &pool
                        .name_and_type_constant(dynamic.name_and_type_index)?
                        .descriptor;
                    let field_type = FieldType::parse(descriptor)?;
                    Resolution::Classes(self.descriptor_classes(owner, field_type.class_name()))
                }
                Constant::InvokeDynamic(dynamic) => {
                    let descriptor = &pool
                        .name_and_type_constant(dynamic.name_and_type_index)?
                        .descriptor;
                    let descriptor = MethodDescriptor::parse(descriptor)?;
                    Resolution::Classes(
                        self.descriptor_classes(owner, descriptor.referenced_class_names()),
                    )
                }
                _ => continue,
            };
            resolutions.push((index, resolution));
        }

        Ok(resolutions)
    }
}

fn apply(constant: &mut Constant, resolution: Resolution) {
    match (constant, resolution) {
        (Constant::Class(constant), Resolution::Class(class)) => {
            constant.referenced_class = class;
        }
        (
            Constant::Fieldref(reference)
            | Constant::Methodref(reference)
            | Constant::InterfaceMethodref(reference),
            Resolution::Member { class, member },
        ) => {
            reference.referenced_class = class;
            reference.referenced_member = member;
        }
        (Constant::String(string), Resolution::Member { class, member }) => {
            string.referenced_class = class;
            string.referenced_member = member;
        }
        (Constant::MethodType(method_type), Resolution::Classes(classes)) => {
            method_type.referenced_classes = classes;
        }
        (
            Constant::Dynamic(dynamic) | Constant::InvokeDynamic(dynamic),
            Resolution::Classes(classes),
        ) => {
            dynamic.referenced_classes = classes;
        }
        _ => {}
    }
}

fn link_hierarchy(pool: &mut ClassPool) -> Result<usize> {
    let mut linker = Linker {
        pool: &*pool,
        unresolved: 0,
    };
    let links: Vec<(Token, Option<Token>, Vec<Token>)> = pool
        .classes()
        .map(|class| {
            let super_class = class
                .super_name
                .as_deref()
                .and_then(|name| linker.class_named(&class.name, name));
            let interfaces = class
                .interface_names
                .iter()
                .filter_map(|name| linker.class_named(&class.name, name))
                .collect();
            (class.token, super_class, interfaces)
        })
        .collect();
    let unresolved = linker.unresolved;

    let mut subclasses: HashMap<Token, Vec<Token>> = HashMap::new();
    for (token, super_class, interfaces) in links {
        for parent in super_class.iter().chain(interfaces.iter()) {
            subclasses.entry(*parent).or_default().push(token);
        }
        let class = pool.class_mut(token)?;
        class.super_class = super_class;
        class.interfaces = interfaces;
    }
    pool.set_subclasses(subclasses);

    Ok(unresolved)
}

/// Links `pool` in place, returning the number of unresolved references.
pub(crate) fn link(pool: &mut ClassPool) -> Result<usize> {
    let mut unresolved = link_hierarchy(pool)?;

    let tokens: Vec<Token> = pool.classes().map(|class| class.token).collect();
    for token in tokens {
        let mut linker = Linker {
            pool: &*pool,
            unresolved: 0,
        };
        let resolutions = linker.resolve(token)?;
        unresolved += linker.unresolved;

        let class = pool.class_mut(token)?;
        for (index, resolution) in resolutions {
            apply(class.constant_pool.get_mut(index)?, resolution);
        }
    }

    debug!(classes = pool.len(), unresolved, "linked class pool");
    Ok(unresolved)
}
