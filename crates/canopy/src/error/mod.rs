//! # Error Types
//!
//! Error types for grammar construction and parsing.
//!
//! ## Overview
//!
//! Two error families exist, mirroring the two failure surfaces of the crate:
//!
//! - [`GrammarError`]: rejected grammar construction (negative weights,
//!   strict-mode undefined nonterminals, non-CNF rules handed to the CNF
//!   constructor). Surfaced by constructors, never by parsing.
//! - [`ParseError`]: fatal conditions during forest construction or
//!   probability evaluation. These indicate internal corruption and abort the
//!   current call; no partially built forest is visible afterwards.
//!
//! Ordinary "no parse" outcomes are not errors: an input the grammar cannot
//! produce yields probability 0 and no forest, and an Earley chart that
//! empties mid-parse simply has no successes.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors derive [`miette`]'s
//! `Diagnostic` for rich reporting.

use thiserror::Error;

use crate::grammar::NonTerminal;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Errors raised while constructing a [`Grammar`](crate::grammar::Grammar)
/// or a [`CnfGrammar`](crate::grammar::CnfGrammar).
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    /// A production carried a negative (or NaN) weight.
    #[error("production `{production}` has invalid weight {weight}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(canopy::grammar::negative_weight)))]
    NegativeWeight {
        /// Rendered form of the offending production.
        production: String,
        /// The rejected weight.
        weight: f64,
    },

    /// The collapsed empty-sentence weight of a CNF grammar was negative.
    #[error("empty-sentence weight {0} is negative")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(canopy::grammar::negative_empty_weight))
    )]
    NegativeEmptyWeight(f64),

    /// Strict mode only: a right-hand side references a nonterminal that has
    /// no productions of its own.
    #[error("nonterminal `{0}` is referenced but has no productions")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(canopy::grammar::undefined_nonterminal))
    )]
    UndefinedNonTerminal(NonTerminal),

    /// A rule handed to the CNF grammar constructor was neither `A -> B C`
    /// nor `A -> t`.
    #[error("rule `{0}` is not in Chomsky normal form")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(canopy::grammar::not_cnf)))]
    NotCnf(String),

    /// The builder was finalized without a start symbol.
    #[error("grammar has no start symbol")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(canopy::grammar::missing_start)))]
    MissingStart,
}

/// Fatal conditions during parsing or forest evaluation.
///
/// Both variants indicate an internal invariant was broken; callers cannot
/// recover the current parse, though the grammar remains usable.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseError {
    /// A probability estimate rose between fixpoint passes. The iteration is
    /// monotonically non-increasing, so an increase means the forest or the
    /// evaluator is corrupt.
    #[error("probability estimate for forest node {node} rose from {previous} to {current}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(canopy::parse::monotonicity)))]
    MonotonicityViolation {
        /// Id of the offending node.
        node: usize,
        /// Estimate from the previous pass.
        previous: f64,
        /// The (larger) estimate from the current pass.
        current: f64,
    },

    /// The forest builder met an impossible configuration, e.g. an
    /// intermediate node whose dot lies outside its production.
    #[error("malformed parse forest: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(canopy::parse::malformed_forest)))]
    MalformedForest {
        /// What was impossible about the configuration.
        message: String,
    },
}

impl ParseError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedForest {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_rule_text() {
        let err = GrammarError::NotCnf("S -> a b c".to_string());
        assert!(err.to_string().contains("S -> a b c"));
    }

    #[test]
    fn monotonicity_reports_both_estimates() {
        let err = ParseError::MonotonicityViolation {
            node: 3,
            previous: 0.25,
            current: 0.5,
        };
        let text = err.to_string();
        assert!(text.contains("0.25"));
        assert!(text.contains("0.5"));
    }
}
