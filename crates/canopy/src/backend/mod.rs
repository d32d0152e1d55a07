//! # Parser Backends
//!
//! Two recognizers share the [`Parser`] interface:
//!
//! - [`cyk::CykParser`]: bottom-up probability computation over a
//!   [`CnfGrammar`](crate::grammar::CnfGrammar).
//! - [`earley::EarleyParser`]: chart parsing over any [`Grammar`]
//!   (crate::grammar::Grammar), with forest construction via
//!   [`ForestParser`].
//!
//! `parse_probability` never fails on ordinary inputs: a sentence the grammar
//! cannot produce — including one containing terminals the grammar has never
//! heard of — yields `Ok(0.0)`. The `Err` channel is reserved for fatal
//! internal conditions (see [`ParseError`](crate::error::ParseError)).

pub mod cyk;
pub mod earley;

pub use cyk::CykParser;
pub use earley::EarleyParser;

use crate::error::ParseError;
use crate::forest::Forest;
use crate::grammar::Sentence;

/// A recognizer producing derivation probabilities.
pub trait Parser {
    /// Total probability that the grammar derives `sentence`, in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Only fatal internal conditions; "no parse" is `Ok(0.0)`.
    fn parse_probability(&self, sentence: &Sentence) -> Result<f64, ParseError>;

    /// Whether the grammar derives `sentence` with positive probability.
    ///
    /// # Errors
    ///
    /// Propagates [`Parser::parse_probability`] failures.
    fn accepts(&self, sentence: &Sentence) -> Result<bool, ParseError> {
        Ok(self.parse_probability(sentence)? > 0.0)
    }
}

/// A parser that can also materialize the shared packed parse forest.
pub trait ForestParser: Parser {
    /// Build the forest of every derivation of `sentence`, or `None` when
    /// the sentence is not derived.
    ///
    /// # Errors
    ///
    /// Only fatal internal conditions.
    fn parse_forest(&self, sentence: &Sentence) -> Result<Option<Forest>, ParseError>;
}
