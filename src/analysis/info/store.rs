//! Side tables holding the facts of every program entity.
//!
//! The [`FactStore`] keeps one [`MethodFacts`], [`FieldFacts`] and [`ClassFacts`] record per
//! entity, keyed by the entity's [`Token`]. Records are stored in [`DashMap`]s, so passes that
//! run on different classes in parallel lock only the record they are touching.
//!
//! # Access pattern
//!
//! Reads go through [`FactStore::method`], [`FactStore::field`] and [`FactStore::class`], which
//! return a guard. Writes go through the scoped `update_*` functions, which hand the program
//! variant of a record to a closure and skip library records, whose facts never change.
//!
//! A guard on one record must never be held while another record is accessed: two passes
//! taking guards in opposite order would deadlock. Copy what is needed out of a guard first.
//!
//! ```rust
//! use classfacts::analysis::{FactStore, MethodInfo};
//! use classfacts::classfile::{AccessFlags, ClassBuilder, ClassPool};
//!
//! let mut pool = ClassPool::new();
//! pool.add(ClassBuilder::new("java/lang/Object").library().build()?)?;
//! let class = pool.add(
//!     ClassBuilder::new("app/Main")
//!         .declare_method("run", "(J)V", AccessFlags::PUBLIC | AccessFlags::ABSTRACT)
//!         .build()?,
//! )?;
//! pool.link()?;
//!
//! let store = FactStore::initialize(&pool, false)?;
//! let run = pool.class(class)?.methods[0].token;
//!
//! store.try_update_method(run, |facts| facts.mark_parameter_used(1))?;
//! assert_eq!(store.method(run)?.used_parameters(), 0b10);
//! # Ok::<(), classfacts::Error>(())
//! ```

use dashmap::{mapref::one::Ref, DashMap};
use rayon::prelude::*;
use tracing::debug;

use crate::{
    analysis::info::{
        class::{ClassFacts, ProgramClassFacts},
        field::{FieldFacts, LibraryFieldFacts, ProgramFieldFacts},
        method::{LibraryMethodFacts, MethodFacts, ProgramMethodFacts},
    },
    classfile::{ClassPool, ProgramClass, ProgramField, ProgramMethod, Token},
    Error, Result,
};

/// Facts of all methods, fields and classes of one analysis run.
#[derive(Debug, Default)]
pub struct FactStore {
    methods: DashMap<Token, MethodFacts>,
    fields: DashMap<Token, FieldFacts>,
    classes: DashMap<Token, ClassFacts>,
}

impl FactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with facts attached to every class, field and method of `pool`.
    ///
    /// Members of library classes get opaque facts, members of program classes computed
    /// facts seeded from their static shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for invalid descriptors and
    /// [`Error::InvalidConstantIndex`] for dangling `ConstantValue` indices.
    pub fn initialize(pool: &ClassPool, parallel: bool) -> Result<Self> {
        let store = Self::new();
        let classes: Vec<&ProgramClass> = pool.classes().collect();

        if parallel {
            classes
                .par_iter()
                .try_for_each(|class| store.attach_all(class))?;
        } else {
            classes
                .iter()
                .try_for_each(|class| store.attach_all(class))?;
        }

        debug!(
            classes = store.classes.len(),
            methods = store.methods.len(),
            fields = store.fields.len(),
            "attached optimization info"
        );
        Ok(store)
    }

    fn attach_all(&self, class: &ProgramClass) -> Result<()> {
        self.attach_class(class);
        for field in &class.fields {
            self.attach_field(class, field, class.is_program())?;
        }
        for method in &class.methods {
            self.attach_method(class, method, class.is_program())?;
        }
        Ok(())
    }

    /// Attaches facts to `class`, replacing any existing ones.
    pub fn attach_class(&self, class: &ProgramClass) {
        let facts = if class.is_program() {
            ClassFacts::Program(ProgramClassFacts::new(class.token))
        } else {
            ClassFacts::Library
        };
        self.classes.insert(class.token, facts);
    }

    /// Attaches facts to `method` of `class`, replacing any existing ones.
    ///
    /// `in_program` selects computed facts; otherwise the method gets opaque facts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the method descriptor can not be parsed.
    pub fn attach_method(
        &self,
        class: &ProgramClass,
        method: &ProgramMethod,
        in_program: bool,
    ) -> Result<()> {
        debug_assert_eq!(class.token, method.class);
        let facts = if in_program {
            MethodFacts::Program(ProgramMethodFacts::for_method(method)?)
        } else {
            let slot_sizes = method
                .method_descriptor()?
                .parameter_slot_sizes(method.is_static());
            MethodFacts::Library(LibraryMethodFacts::new(slot_sizes))
        };
        self.methods.insert(method.token, facts);
        Ok(())
    }

    /// Attaches facts to `field` of `class`, replacing any existing ones.
    ///
    /// `in_program` selects computed facts; otherwise the field gets opaque facts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for an invalid descriptor and
    /// [`Error::InvalidConstantIndex`] for a dangling `ConstantValue` index.
    pub fn attach_field(
        &self,
        class: &ProgramClass,
        field: &ProgramField,
        in_program: bool,
    ) -> Result<()> {
        let facts = if in_program {
            FieldFacts::Program(ProgramFieldFacts::for_field(class, field)?)
        } else {
            FieldFacts::Library(LibraryFieldFacts)
        };
        self.fields.insert(field.token, facts);
        Ok(())
    }

    /// Returns the facts of `method`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFacts`] if no facts are attached.
    pub fn method(&self, method: Token) -> Result<Ref<'_, Token, MethodFacts>> {
        self.methods.get(&method).ok_or(Error::MissingFacts(method))
    }

    /// Returns the facts of `field`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFacts`] if no facts are attached.
    pub fn field(&self, field: Token) -> Result<Ref<'_, Token, FieldFacts>> {
        self.fields.get(&field).ok_or(Error::MissingFacts(field))
    }

    /// Returns the facts of `class`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFacts`] if no facts are attached.
    pub fn class(&self, class: Token) -> Result<Ref<'_, Token, ClassFacts>> {
        self.classes.get(&class).ok_or(Error::MissingFacts(class))
    }

    /// Applies `update` to the computed facts of `method`.
    ///
    /// Returns `Ok(None)` without calling `update` if the method has opaque facts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFacts`] if no facts are attached.
    pub fn update_method<R>(
        &self,
        method: Token,
        update: impl FnOnce(&mut ProgramMethodFacts) -> R,
    ) -> Result<Option<R>> {
        let mut facts = self
            .methods
            .get_mut(&method)
            .ok_or(Error::MissingFacts(method))?;
        Ok(facts.as_program_mut().map(update))
    }

    /// Applies the fallible `update` to the computed facts of `method`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFacts`] if no facts are attached, or the error of `update`.
    pub fn try_update_method<R>(
        &self,
        method: Token,
        update: impl FnOnce(&mut ProgramMethodFacts) -> Result<R>,
    ) -> Result<Option<R>> {
        self.update_method(method, update)?.transpose()
    }

    /// Applies `update` to the computed facts of `field`.
    ///
    /// Returns `Ok(None)` without calling `update` if the field has opaque facts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFacts`] if no facts are attached.
    pub fn update_field<R>(
        &self,
        field: Token,
        update: impl FnOnce(&mut ProgramFieldFacts) -> R,
    ) -> Result<Option<R>> {
        let mut facts = self
            .fields
            .get_mut(&field)
            .ok_or(Error::MissingFacts(field))?;
        Ok(facts.as_program_mut().map(update))
    }

    /// Applies `update` to the computed facts of `class`.
    ///
    /// Returns `Ok(None)` without calling `update` if the class has opaque facts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFacts`] if no facts are attached.
    pub fn update_class<R>(
        &self,
        class: Token,
        update: impl FnOnce(&mut ProgramClassFacts) -> R,
    ) -> Result<Option<R>> {
        let mut facts = self
            .classes
            .get_mut(&class)
            .ok_or(Error::MissingFacts(class))?;
        Ok(facts.as_program_mut().map(update))
    }

    /// Pins `method`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFacts`] if no facts are attached.
    pub fn keep_method(&self, method: Token) -> Result<()> {
        self.update_method(method, ProgramMethodFacts::set_kept)?;
        Ok(())
    }

    /// Pins `field`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFacts`] if no facts are attached.
    pub fn keep_field(&self, field: Token) -> Result<()> {
        self.update_field(field, ProgramFieldFacts::set_kept)?;
        Ok(())
    }

    /// Pins `class`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFacts`] if no facts are attached.
    pub fn keep_class(&self, class: Token) -> Result<()> {
        self.update_class(class, ProgramClassFacts::set_kept)?;
        Ok(())
    }

    /// Returns the number of methods with attached facts.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Returns the number of fields with attached facts.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the number of classes with attached facts.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}
