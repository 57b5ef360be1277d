//! Widening of method facts across the override hierarchy.

use rayon::prelude::*;
use tracing::debug;

use crate::{
    analysis::info::{FactStore, MethodFacts},
    classfile::{ClassPool, ProgramMethod},
    Result,
};

/// Widens the facts of every overridable program method by those of its overriders.
///
/// A caller that invokes a virtual method may end up in any overriding method, so the
/// conservative body facts of the invoked method must hold for all of them. Overriders are
/// found transitively, and only the facts merged by
/// [`crate::analysis::ProgramMethodFacts::merge`] change.
pub struct HierarchyMerger<'a> {
    pool: &'a ClassPool,
    store: &'a FactStore,
}

impl<'a> HierarchyMerger<'a> {
    /// Creates a merger over `pool` writing to `store`.
    #[must_use]
    pub fn new(pool: &'a ClassPool, store: &'a FactStore) -> Self {
        Self { pool, store }
    }

    /// Merges every overridable program method and returns how many had overriders.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingFacts`] for methods without facts.
    pub fn merge(&self, parallel: bool) -> Result<usize> {
        let methods: Vec<&ProgramMethod> = self
            .pool
            .program_classes()
            .flat_map(|class| class.methods.iter())
            .filter(|method| method.is_virtual())
            .collect();

        let merged: usize = if parallel {
            methods
                .par_iter()
                .map(|method| self.merge_method(method))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .sum()
        } else {
            methods
                .iter()
                .map(|method| self.merge_method(method))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .sum()
        };

        debug!(methods = methods.len(), merged, "override merge finished");
        Ok(merged)
    }

    fn merge_method(&self, method: &ProgramMethod) -> Result<usize> {
        let overriders = self.pool.overriding_methods(method.token)?;
        for overrider in &overriders {
            // Copied out so no two entries are locked at once
            let facts: MethodFacts = self.store.method(*overrider)?.clone();
            self.store
                .update_method(method.token, |target| target.merge(&facts))?;
        }
        Ok(usize::from(!overriders.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::info::MethodInfo,
        classfile::{AccessFlags, ClassBuilder, CodeBuilder, Opcode},
        test::factories::{linked_pool, method_token},
    };

    fn ret(code: &mut CodeBuilder<'_>) -> crate::Result<()> {
        code.op(Opcode::Return);
        Ok(())
    }

    fn hierarchy() -> (ClassPool, FactStore) {
        let pool = linked_pool(vec![
            ClassBuilder::new("app/Animal")
                .method("speak", "()V", AccessFlags::PUBLIC, ret)
                .method("helper", "()V", AccessFlags::PRIVATE, ret)
                .build()
                .unwrap(),
            ClassBuilder::new("app/Dog")
                .extends("app/Animal")
                .method("speak", "()V", AccessFlags::PUBLIC, ret)
                .method("helper", "()V", AccessFlags::PRIVATE, ret)
                .build()
                .unwrap(),
            ClassBuilder::new("app/Puppy")
                .extends("app/Dog")
                .method("speak", "()V", AccessFlags::PUBLIC, ret)
                .build()
                .unwrap(),
        ]);
        let store = FactStore::initialize(&pool, false).unwrap();
        (pool, store)
    }

    #[test]
    fn test_merges_transitive_overriders() {
        let (pool, store) = hierarchy();
        let animal = method_token(&pool, "app/Animal", "speak");
        let dog = method_token(&pool, "app/Dog", "speak");
        let puppy = method_token(&pool, "app/Puppy", "speak");
        store
            .update_method(puppy, |facts| facts.set_synchronized_block())
            .unwrap();
        store
            .update_method(dog, |facts| facts.set_catches_exceptions())
            .unwrap();

        let merged = HierarchyMerger::new(&pool, &store).merge(false).unwrap();
        assert_eq!(merged, 2);

        let facts = store.method(animal).unwrap();
        assert!(facts.has_synchronized_block());
        assert!(facts.catches_exceptions());
        drop(facts);

        let facts = store.method(dog).unwrap();
        assert!(facts.has_synchronized_block());
        drop(facts);

        let facts = store.method(puppy).unwrap();
        assert!(!facts.catches_exceptions());
    }

    #[test]
    fn test_private_methods_are_untouched() {
        let (pool, store) = hierarchy();
        let helper = method_token(&pool, "app/Animal", "helper");
        store
            .update_method(method_token(&pool, "app/Dog", "helper"), |facts| {
                facts.set_synchronized_block()
            })
            .unwrap();
        HierarchyMerger::new(&pool, &store).merge(true).unwrap();

        assert!(!store.method(helper).unwrap().has_synchronized_block());
    }
}
