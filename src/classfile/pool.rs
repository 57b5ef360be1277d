//! The class pool: every program and library class the analysis sees.
//!
//! The [`ClassPool`] owns all [`ProgramClass`]es and hands out the [`Token`]s that identify
//! classes, fields and methods. It indexes classes by name and members by token, and after
//! [`ClassPool::link`] it also knows the class hierarchy in both directions.
//!
//! # Lookups
//!
//! - **Token-based**: [`ClassPool::class`], [`ClassPool::field`], [`ClassPool::method`]
//! - **Name-based**: [`ClassPool::class_by_name`], [`ClassPool::resolve_method`],
//!   [`ClassPool::resolve_field`]
//! - **Hierarchy**: [`ClassPool::supertypes`], [`ClassPool::all_subclasses`],
//!   [`ClassPool::overriding_methods`], [`ClassPool::overridden_methods`]
//!
//! # Examples
//!
//! ```rust
//! use classfacts::classfile::{AccessFlags, ClassBuilder, ClassPool};
//!
//! let mut pool = ClassPool::new();
//! pool.add(ClassBuilder::new("java/lang/Object").library().build()?)?;
//! let base = pool.add(
//!     ClassBuilder::new("demo/Base")
//!         .declare_method("run", "()V", AccessFlags::PUBLIC | AccessFlags::ABSTRACT)
//!         .build()?,
//! )?;
//! let derived = pool.add(
//!     ClassBuilder::new("demo/Derived")
//!         .extends("demo/Base")
//!         .declare_method("run", "()V", AccessFlags::PUBLIC)
//!         .build()?,
//! )?;
//! pool.link()?;
//!
//! assert!(pool.is_subclass_of(derived, base));
//! let run = pool.resolve_method(base, "run", "()V").unwrap();
//! assert_eq!(pool.overriding_methods(run)?.len(), 1);
//! # Ok::<(), classfacts::Error>(())
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{
    classfile::{
        access::AccessFlags,
        class::{ProgramClass, ProgramField, ProgramMethod},
        linker,
        token::Token,
    },
    Error, Result,
};

#[derive(Debug, Clone, Copy)]
enum MemberLocation {
    Field(usize, usize),
    Method(usize, usize),
}

/// All classes of the program and the libraries it uses.
#[derive(Debug, Default)]
pub struct ClassPool {
    classes: Vec<ProgramClass>,
    by_name: HashMap<String, Token>,
    members: HashMap<Token, MemberLocation>,
    subclasses: HashMap<Token, Vec<Token>>,
    next_field: u32,
    next_method: u32,
}

impl ClassPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class, assigning tokens to it and all of its members.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if a class with the same name was already added.
    pub fn add(&mut self, mut class: ProgramClass) -> Result<Token> {
        if self.by_name.contains_key(&class.name) {
            return Err(malformed_error!("Duplicate class '{}'", class.name));
        }

        let index = self.classes.len();
        let token = Token::class(index as u32 + 1);
        class.token = token;

        for (position, field) in class.fields.iter_mut().enumerate() {
            self.next_field += 1;
            field.token = Token::field(self.next_field);
            field.class = token;
            self.members
                .insert(field.token, MemberLocation::Field(index, position));
        }
        for (position, method) in class.methods.iter_mut().enumerate() {
            self.next_method += 1;
            method.token = Token::method(self.next_method);
            method.class = token;
            self.members
                .insert(method.token, MemberLocation::Method(index, position));
        }

        self.by_name.insert(class.name.clone(), token);
        self.classes.push(class);
        Ok(token)
    }

    /// Resolves the hierarchy and every constant-pool reference.
    ///
    /// References to classes or members missing from the pool stay unresolved and are
    /// reported through the log. Returns the number of such references.
    ///
    /// # Errors
    ///
    /// Returns an error if a constant pool or descriptor is malformed.
    pub fn link(&mut self) -> Result<usize> {
        linker::link(self)
    }

    /// Returns the number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if the pool holds no class.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterates over all classes in insertion order.
    pub fn classes(&self) -> impl Iterator<Item = &ProgramClass> {
        self.classes.iter()
    }

    /// Iterates over the classes of the program being optimized.
    pub fn program_classes(&self) -> impl Iterator<Item = &ProgramClass> {
        self.classes.iter().filter(|class| class.is_program())
    }

    /// Iterates over the library classes.
    pub fn library_classes(&self) -> impl Iterator<Item = &ProgramClass> {
        self.classes.iter().filter(|class| class.is_library)
    }

    /// Iterates over every method together with its declaring class.
    pub fn methods(&self) -> impl Iterator<Item = (&ProgramClass, &ProgramMethod)> {
        self.classes
            .iter()
            .flat_map(|class| class.methods.iter().map(move |method| (class, method)))
    }

    /// Iterates over every field together with its declaring class.
    pub fn fields(&self) -> impl Iterator<Item = (&ProgramClass, &ProgramField)> {
        self.classes
            .iter()
            .flat_map(|class| class.fields.iter().map(move |field| (class, field)))
    }

    fn class_index(&self, token: Token) -> Result<usize> {
        let index = token.row() as usize;
        if token.is_class() && index >= 1 && index <= self.classes.len() {
            Ok(index - 1)
        } else {
            Err(Error::EntityNotFound(token))
        }
    }

    /// Returns the class identified by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntityNotFound`] for unknown tokens.
    pub fn class(&self, token: Token) -> Result<&ProgramClass> {
        Ok(&self.classes[self.class_index(token)?])
    }

    pub(crate) fn class_mut(&mut self, token: Token) -> Result<&mut ProgramClass> {
        let index = self.class_index(token)?;
        Ok(&mut self.classes[index])
    }

    /// Returns the class with the given internal name.
    #[must_use]
    pub fn class_by_name(&self, name: &str) -> Option<&ProgramClass> {
        let token = self.by_name.get(name)?;
        self.class(*token).ok()
    }

    /// Returns the token of the class with the given internal name.
    #[must_use]
    pub fn token_of(&self, name: &str) -> Option<Token> {
        self.by_name.get(name).copied()
    }

    /// Returns the field identified by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntityNotFound`] for unknown tokens.
    pub fn field(&self, token: Token) -> Result<&ProgramField> {
        match self.members.get(&token) {
            Some(MemberLocation::Field(class, position)) => {
                Ok(&self.classes[*class].fields[*position])
            }
            _ => Err(Error::EntityNotFound(token)),
        }
    }

    /// Returns the method identified by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntityNotFound`] for unknown tokens.
    pub fn method(&self, token: Token) -> Result<&ProgramMethod> {
        match self.members.get(&token) {
            Some(MemberLocation::Method(class, position)) => {
                Ok(&self.classes[*class].methods[*position])
            }
            _ => Err(Error::EntityNotFound(token)),
        }
    }

    /// Returns the class declaring the field or method identified by `member`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntityNotFound`] if `member` is not a known field or method.
    pub fn declaring_class(&self, member: Token) -> Result<&ProgramClass> {
        match self.members.get(&member) {
            Some(MemberLocation::Field(class, _) | MemberLocation::Method(class, _)) => {
                Ok(&self.classes[*class])
            }
            None => Err(Error::EntityNotFound(member)),
        }
    }

    /// Returns the access flags of a field or method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntityNotFound`] if `member` is not a known field or method.
    pub fn member_access(&self, member: Token) -> Result<AccessFlags> {
        match self.members.get(&member) {
            Some(MemberLocation::Field(..)) => Ok(self.field(member)?.access),
            Some(MemberLocation::Method(..)) => Ok(self.method(member)?.access),
            None => Err(Error::EntityNotFound(member)),
        }
    }

    /// Returns true if `token` identifies a known method.
    #[must_use]
    pub fn is_method(&self, token: Token) -> bool {
        matches!(self.members.get(&token), Some(MemberLocation::Method(..)))
    }

    pub(crate) fn set_subclasses(&mut self, subclasses: HashMap<Token, Vec<Token>>) {
        self.subclasses = subclasses;
    }

    /// Returns the classes directly extending or implementing `class`.
    #[must_use]
    pub fn subclasses(&self, class: Token) -> &[Token] {
        self.subclasses.get(&class).map_or(&[], Vec::as_slice)
    }

    /// Returns every class that transitively extends or implements `class`.
    #[must_use]
    pub fn all_subclasses(&self, class: Token) -> Vec<Token> {
        self.walk(class, |token| self.subclasses(token).to_vec())
    }

    /// Returns the superclass chain of `class`, nearest first.
    #[must_use]
    pub fn superclasses(&self, class: Token) -> Vec<Token> {
        let mut chain = Vec::new();
        let mut current = self.class(class).ok().and_then(|class| class.super_class);
        while let Some(token) = current {
            if token == class || chain.contains(&token) {
                break;
            }
            chain.push(token);
            current = self.class(token).ok().and_then(|class| class.super_class);
        }
        chain
    }

    /// Returns every transitive superclass and superinterface of `class`, breadth first.
    #[must_use]
    pub fn supertypes(&self, class: Token) -> Vec<Token> {
        self.walk(class, |token| match self.class(token) {
            Ok(class) => class
                .super_class
                .into_iter()
                .chain(class.interfaces.iter().copied())
                .collect(),
            Err(_) => Vec::new(),
        })
    }

    fn walk(&self, start: Token, next: impl Fn(Token) -> Vec<Token>) -> Vec<Token> {
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut found = Vec::new();
        while let Some(token) = queue.pop_front() {
            for neighbour in next(token) {
                if visited.insert(neighbour) {
                    found.push(neighbour);
                    queue.push_back(neighbour);
                }
            }
        }
        found
    }

    /// Returns true if `class` is `ancestor` or transitively extends or implements it.
    #[must_use]
    pub fn is_subclass_of(&self, class: Token, ancestor: Token) -> bool {
        class == ancestor || self.supertypes(class).contains(&ancestor)
    }

    /// Finds a method by name and descriptor in `class` or its supertypes.
    #[must_use]
    pub fn resolve_method(&self, class: Token, name: &str, descriptor: &str) -> Option<Token> {
        std::iter::once(class)
            .chain(self.supertypes(class))
            .filter_map(|token| self.class(token).ok())
            .find_map(|class| class.method(name, descriptor))
            .map(|method| method.token)
    }

    /// Finds a field by name and descriptor in `class` or its supertypes.
    #[must_use]
    pub fn resolve_field(&self, class: Token, name: &str, descriptor: &str) -> Option<Token> {
        std::iter::once(class)
            .chain(self.supertypes(class))
            .filter_map(|token| self.class(token).ok())
            .find_map(|class| class.field(name, descriptor))
            .map(|field| field.token)
    }

    /// Finds a member by name alone in `class` or its supertypes, fields first.
    #[must_use]
    pub fn resolve_member_by_name(&self, class: Token, name: &str) -> Option<Token> {
        let hierarchy: Vec<&ProgramClass> = std::iter::once(class)
            .chain(self.supertypes(class))
            .filter_map(|token| self.class(token).ok())
            .collect();
        hierarchy
            .iter()
            .find_map(|class| class.fields.iter().find(|field| field.name == name))
            .map(|field| field.token)
            .or_else(|| {
                hierarchy
                    .iter()
                    .find_map(|class| class.methods.iter().find(|method| method.name == name))
                    .map(|method| method.token)
            })
    }

    /// Returns the methods that may run in place of `method` on instances of its subclasses.
    ///
    /// For every class extending or implementing the declaring class, this is the method a
    /// virtual call would dispatch to, including one the subclass inherits from a superclass
    /// outside the hierarchy of `method`. Static, private and initializer methods are never
    /// overridden.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntityNotFound`] if `method` is unknown.
    pub fn overriding_methods(&self, method: Token) -> Result<Vec<Token>> {
        let target = self.method(method)?;
        if !target.is_virtual() {
            return Ok(Vec::new());
        }
        let mut implementations = Vec::new();
        for subclass in self.all_subclasses(target.class) {
            let Some(implementation) =
                self.dispatch_target(subclass, &target.name, &target.descriptor)
            else {
                continue;
            };
            if implementation != method && !implementations.contains(&implementation) {
                implementations.push(implementation);
            }
        }
        Ok(implementations)
    }

    /// Finds the virtual method a call on an instance of `class` dispatches to, searching the
    /// superclass chain before the interfaces.
    fn dispatch_target(&self, class: Token, name: &str, descriptor: &str) -> Option<Token> {
        std::iter::once(class)
            .chain(self.superclasses(class))
            .chain(self.supertypes(class))
            .filter_map(|token| self.class(token).ok())
            .filter_map(|class| class.method(name, descriptor))
            .find(|candidate| candidate.is_virtual())
            .map(|candidate| candidate.token)
    }

    /// Returns the methods of supertypes that `method` overrides or implements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntityNotFound`] if `method` is unknown.
    pub fn overridden_methods(&self, method: Token) -> Result<Vec<Token>> {
        let target = self.method(method)?;
        if !target.is_virtual() {
            return Ok(Vec::new());
        }
        Ok(self
            .supertypes(target.class)
            .into_iter()
            .filter_map(|token| self.class(token).ok())
            .filter_map(|class| class.method(&target.name, &target.descriptor))
            .filter(|candidate| candidate.is_virtual())
            .map(|candidate| candidate.token)
            .collect())
    }
}
