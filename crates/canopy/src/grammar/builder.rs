//! Fluent grammar construction.

use hashbrown::HashSet;

use crate::error::GrammarError;
use crate::grammar::{Grammar, NonTerminal, Production, Sentence, Word};

/// Builder for [`Grammar`]s.
///
/// ```rust
/// use canopy::grammar::{GrammarBuilder, NonTerminal, Terminal, Word};
///
/// let s = NonTerminal::new("S");
/// let grammar = GrammarBuilder::new()
///     .start(s)
///     .production(s, [Word::from(Terminal::new("a"))], 1.0)
///     .build()?;
/// assert_eq!(grammar.start(), s);
/// # Ok::<(), canopy::GrammarError>(())
/// ```
///
/// In strict mode, `build` additionally rejects grammars whose right-hand
/// sides reference a nonterminal that has no productions of its own.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    productions: Vec<Production>,
    start: Option<NonTerminal>,
    strict: bool,
}

impl GrammarBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start symbol.
    #[must_use]
    pub fn start(mut self, start: NonTerminal) -> Self {
        self.start = Some(start);
        self
    }

    /// Add a production `lhs -> rhs` with the given weight.
    #[must_use]
    pub fn production<I>(mut self, lhs: NonTerminal, rhs: I, weight: f64) -> Self
    where
        I: IntoIterator<Item = Word>,
    {
        self.productions
            .push(Production::new(lhs, Sentence::from_words(rhs), weight));
        self
    }

    /// Add an already-built production.
    #[must_use]
    pub fn push(mut self, production: Production) -> Self {
        self.productions.push(production);
        self
    }

    /// Enable or disable strict validation.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Finalize the grammar.
    ///
    /// # Errors
    ///
    /// [`GrammarError::MissingStart`] if no start symbol was set;
    /// [`GrammarError::NegativeWeight`] for invalid weights;
    /// [`GrammarError::UndefinedNonTerminal`] in strict mode for a referenced
    /// nonterminal without productions.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        let start = self.start.ok_or(GrammarError::MissingStart)?;

        if self.strict {
            let defined: HashSet<NonTerminal> =
                self.productions.iter().map(|p| p.lhs).collect();
            for production in &self.productions {
                for word in &production.rhs {
                    if let Word::NonTerminal(nt) = word
                        && !defined.contains(nt)
                    {
                        return Err(GrammarError::UndefinedNonTerminal(*nt));
                    }
                }
            }
        }

        Grammar::new(self.productions, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Terminal;

    #[test]
    fn missing_start_is_rejected() {
        let err = GrammarBuilder::new().build().unwrap_err();
        assert_eq!(err, GrammarError::MissingStart);
    }

    #[test]
    fn strict_mode_rejects_dangling_references() {
        let s = NonTerminal::new("S");
        let ghost = NonTerminal::new("Ghost");
        let err = GrammarBuilder::new()
            .start(s)
            .production(s, [Word::from(ghost)], 1.0)
            .strict(true)
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::UndefinedNonTerminal(ghost));
    }

    #[test]
    fn lenient_mode_accepts_dangling_references() {
        let s = NonTerminal::new("S");
        let ghost = NonTerminal::new("Ghost");
        let grammar = GrammarBuilder::new()
            .start(s)
            .production(s, [Word::from(ghost)], 1.0)
            .build()
            .unwrap();
        assert!(grammar.productions_from(ghost).is_empty());
    }

    #[test]
    fn builds_in_insertion_order() {
        let s = NonTerminal::new("S");
        let a = Terminal::new("a");
        let b = Terminal::new("b");
        let grammar = GrammarBuilder::new()
            .start(s)
            .production(s, [Word::from(a)], 1.0)
            .production(s, [Word::from(b)], 3.0)
            .build()
            .unwrap();
        assert_eq!(grammar.productions().len(), 2);
        assert_eq!(grammar.productions()[0].rhs[0], Word::from(a));
    }
}
