//! Earley parser backend.
//!
//! Handles any grammar, including ambiguous, left-recursive, and nullable
//! ones; the grammar's nullable probabilities drive the eager ("magic")
//! handling of ε-derivations. Beyond recognition it builds the shared packed
//! parse forest and evaluates the total derivation probability over it.

pub(crate) mod chart;
mod parser;

use crate::backend::{ForestParser, Parser};
use crate::error::ParseError;
use crate::forest::Forest;
use crate::forest::builder::ForestBuilder;
use crate::grammar::{Grammar, Sentence};

use parser::Recognizer;

/// Chart parser over an arbitrary [`Grammar`].
///
/// ```rust
/// use canopy::backend::{EarleyParser, ForestParser, Parser};
/// use canopy::grammar::{GrammarBuilder, NonTerminal, Terminal, Sentence, Word};
///
/// // S -> a S | ε, equal weights: P("a"^k) = 0.5^(k+1).
/// let s = NonTerminal::new("S");
/// let a = Terminal::new("a");
/// let grammar = GrammarBuilder::new()
///     .start(s)
///     .production(s, [Word::from(a), Word::from(s)], 1.0)
///     .production(s, [], 1.0)
///     .build()?;
///
/// let parser = EarleyParser::new(&grammar);
/// let p = parser.parse_probability(&Sentence::from_letters("aa"))?;
/// assert!((p - 0.125).abs() < 1e-12);
/// assert!(parser.parse_forest(&Sentence::from_letters("b"))?.is_none());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct EarleyParser<'g> {
    grammar: &'g Grammar,
}

impl<'g> EarleyParser<'g> {
    /// Create a parser over `grammar`.
    #[must_use]
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }
}

impl Parser for EarleyParser<'_> {
    fn parse_probability(&self, sentence: &Sentence) -> Result<f64, ParseError> {
        match self.parse_forest(sentence)? {
            Some(forest) => forest.probability(self.grammar),
            None => Ok(0.0),
        }
    }
}

impl ForestParser for EarleyParser<'_> {
    fn parse_forest(&self, sentence: &Sentence) -> Result<Option<Forest>, ParseError> {
        let recognizer = Recognizer::new(self.grammar);
        let chart = recognizer.build_chart(sentence);
        let successes = recognizer.successes(&chart, sentence.len());
        if successes.is_empty() {
            return Ok(None);
        }
        ForestBuilder::new(self.grammar, &chart)
            .build(sentence.len(), &successes)
            .map(Some)
    }
}
