//! Configuration for the optimization-info analysis.
//!
//! This module provides the settings that control which instructions count as side effects,
//! how parameter usage is reported, and how the passes are scheduled.

/// Configuration for [`crate::analysis::OptimizationInfoAnalyzer`].
///
/// The defaults are the conservative choices: instructions that may throw a built-in runtime
/// exception count as side effects, and per-class passes run in parallel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Treat instructions that may throw a built-in exception as side effects (default: true).
    ///
    /// Disabling this lets the side-effect analysis assume that division, array accesses, casts
    /// and field accesses on `null` never fail.
    pub optimize_conservatively: bool,

    /// Mark the receiver of every instance method as used (default: false).
    pub mark_this_parameter: bool,

    /// Run per-class passes on the rayon thread pool (default: true).
    pub parallel: bool,

    /// Widen the facts of overridable methods by those of their overriders (default: true).
    pub merge_overrides: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            optimize_conservatively: true,
            mark_this_parameter: false,
            parallel: true,
            merge_overrides: true,
        }
    }
}

impl AnalysisConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that assumes built-in exceptions are never thrown.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            optimize_conservatively: false,
            ..Self::default()
        }
    }

    /// Creates a configuration that runs every pass on the calling thread.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_configurations() {
        let default = AnalysisConfig::new();
        assert!(default.optimize_conservatively);
        assert!(default.parallel);
        assert!(!default.mark_this_parameter);

        let aggressive = AnalysisConfig::aggressive();
        assert!(!aggressive.optimize_conservatively);
        assert!(aggressive.merge_overrides);

        let sequential = AnalysisConfig::sequential();
        assert!(!sequential.parallel);
        assert!(sequential.optimize_conservatively);
    }
}
