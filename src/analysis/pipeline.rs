//! The complete optimization-info analysis.

use std::time::Instant;

use tracing::debug;

use crate::{
    analysis::{
        config::AnalysisConfig,
        effects::SideEffectMethodMarker,
        info::FactStore,
        markers::{run_class_markers, MarkingContext, CLASS_MARKERS},
        merge::HierarchyMerger,
    },
    classfile::ClassPool,
    Result,
};

/// Computes the facts of a linked class pool.
///
/// The analyzer runs four phases, each finishing before the next starts:
///
/// 1. **Attachment**: fresh facts for every class and member, opaque for library code
/// 2. **Marking**: every class marker over every program class
/// 3. **Side effects**: the side-effect fixpoint over all program methods
/// 4. **Merging**: widening across the override hierarchy, if enabled
///
/// # Example
///
/// ```rust
/// use classfacts::prelude::*;
///
/// let mut pool = ClassPool::new();
/// pool.add(ClassBuilder::new("java/lang/Object").library().build()?)?;
/// pool.add(
///     ClassBuilder::new("app/Main")
///         .method("answer", "()I", AccessFlags::STATIC, |code| {
///             code.push_int(42).op(Opcode::Ireturn);
///             Ok(())
///         })
///         .build()?,
/// )?;
/// pool.link()?;
///
/// let store = OptimizationInfoAnalyzer::new(AnalysisConfig::default()).analyze(&pool)?;
/// let main = pool.class_by_name("app/Main").unwrap();
/// let answer = main.method("answer", "()I").unwrap();
/// assert!(!store.method(answer.token)?.has_side_effects());
/// # Ok::<(), classfacts::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct OptimizationInfoAnalyzer {
    config: AnalysisConfig,
}

impl OptimizationInfoAnalyzer {
    /// Creates an analyzer with the given configuration.
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyzes `pool` and returns the facts of every entity in it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unresolved`] if `pool` was not linked completely, and any error
    /// raised by a marking pass.
    pub fn analyze(&self, pool: &ClassPool) -> Result<FactStore> {
        self.analyze_with(pool, |_| Ok(()))
    }

    /// Analyzes `pool`, letting `keep` pin entities after attachment and before marking.
    ///
    /// # Errors
    ///
    /// Returns the error of `keep` or of any phase.
    pub fn analyze_with(
        &self,
        pool: &ClassPool,
        keep: impl FnOnce(&FactStore) -> Result<()>,
    ) -> Result<FactStore> {
        let start = Instant::now();
        let store = FactStore::initialize(pool, self.config.parallel)?;
        keep(&store)?;

        let context = MarkingContext::new(pool, &store, &self.config);
        run_class_markers(&context, &CLASS_MARKERS)?;

        let with_side_effects = SideEffectMethodMarker::new(pool, &store, &self.config).mark()?;

        let merged = if self.config.merge_overrides {
            HierarchyMerger::new(pool, &store).merge(self.config.parallel)?
        } else {
            0
        };

        debug!(
            classes = store.class_count(),
            methods = store.method_count(),
            fields = store.field_count(),
            with_side_effects,
            merged,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "analysis finished"
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::info::{ClassInfo, FieldInfo, MethodInfo},
        test::factories::{side_effect_program, SideEffectProgram},
    };

    #[test]
    fn test_sequential_and_parallel_runs_agree() {
        let SideEffectProgram { pool, .. } = side_effect_program();
        let sequential = OptimizationInfoAnalyzer::new(AnalysisConfig::sequential())
            .analyze(&pool)
            .unwrap();
        let parallel = OptimizationInfoAnalyzer::default().analyze(&pool).unwrap();

        for (_, method) in pool.methods() {
            assert_eq!(
                *sequential.method(method.token).unwrap(),
                *parallel.method(method.token).unwrap(),
                "{}",
                method.name
            );
        }
        for (_, field) in pool.fields() {
            assert_eq!(
                *sequential.field(field.token).unwrap(),
                *parallel.field(field.token).unwrap()
            );
        }
    }

    #[test]
    fn test_kept_entities_are_pinned_before_marking() {
        let SideEffectProgram { pool, adds, .. } = side_effect_program();
        let store = OptimizationInfoAnalyzer::new(AnalysisConfig::sequential())
            .analyze_with(&pool, |store| store.keep_method(adds))
            .unwrap();

        let facts = store.method(adds).unwrap();
        assert!(facts.is_kept());
        assert!(facts.has_side_effects());
        assert_eq!(facts.used_parameters(), (1 << facts.parameter_size()) - 1);
    }

    #[test]
    fn test_library_facts_stay_opaque() {
        let SideEffectProgram { pool, .. } = side_effect_program();
        let store = OptimizationInfoAnalyzer::default().analyze(&pool).unwrap();

        for class in pool.library_classes() {
            assert!(store.class(class.token).unwrap().is_kept());
            for field in &class.fields {
                assert!(store.field(field.token).unwrap().is_written());
            }
            for method in &class.methods {
                assert!(store.method(method.token).unwrap().has_side_effects());
            }
        }
    }
}
