//! CYK recognizer over grammars in Chomsky normal form.
//!
//! Standard weighted CYK: a triangular table `T[i, l]` maps each nonterminal
//! to the probability that it derives `s[i .. i+l]`, filled bottom-up from
//! terminal rules and combined through binary rules over every split point.
//! Probabilities are summed over derivations, not maximized, so the result is
//! the total derivation probability of the sentence.

use hashbrown::HashMap;

use crate::backend::Parser;
use crate::error::ParseError;
use crate::grammar::{CnfGrammar, NonTerminal, Sentence, Word};

/// Bottom-up recognizer for a [`CnfGrammar`].
///
/// ```rust
/// use canopy::backend::{CykParser, Parser};
/// use canopy::grammar::{GrammarBuilder, NonTerminal, Terminal, Sentence, Word};
///
/// let s = NonTerminal::new("S");
/// let a = Terminal::new("a");
/// let grammar = GrammarBuilder::new()
///     .start(s)
///     .production(s, [Word::from(s), Word::from(s)], 2.0)
///     .production(s, [Word::from(a)], 8.0)
///     .build()?;
/// let cnf = grammar.to_cnf(false);
///
/// let parser = CykParser::new(&cnf);
/// let p = parser.parse_probability(&Sentence::from_letters("a"))?;
/// assert!((p - 0.8).abs() < 1e-9);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct CykParser<'g> {
    grammar: &'g CnfGrammar,
}

impl<'g> CykParser<'g> {
    /// Create a parser over `grammar`.
    #[must_use]
    pub fn new(grammar: &'g CnfGrammar) -> Self {
        Self { grammar }
    }

    fn probability(&self, sentence: &Sentence) -> f64 {
        let n = sentence.len();
        if n == 0 {
            return self.grammar.empty_probability();
        }

        // table[i][l - 1]: nonterminal -> probability of deriving s[i..i+l].
        let mut table: Vec<Vec<HashMap<NonTerminal, f64>>> =
            (0..n).map(|i| vec![HashMap::new(); n - i]).collect();

        for (i, word) in sentence.iter().enumerate() {
            if let Word::Terminal(t) = word {
                for (lhs, p) in self.grammar.terminal_expansions(*t) {
                    *table[i][0].entry(lhs).or_insert(0.0) += p;
                }
            }
        }

        for l in 2..=n {
            for i in 0..=n - l {
                let mut cell: HashMap<NonTerminal, f64> = HashMap::new();
                for k in 1..l {
                    for (lhs, left, right, p) in self.grammar.binary_expansions() {
                        let Some(&left_p) = table[i][k - 1].get(&left) else {
                            continue;
                        };
                        let Some(&right_p) = table[i + k][l - k - 1].get(&right) else {
                            continue;
                        };
                        *cell.entry(lhs).or_insert(0.0) += p * left_p * right_p;
                    }
                }
                table[i][l - 1] = cell;
            }
        }

        table[0][n - 1]
            .get(&self.grammar.start())
            .copied()
            .unwrap_or(0.0)
    }
}

impl Parser for CykParser<'_> {
    fn parse_probability(&self, sentence: &Sentence) -> Result<f64, ParseError> {
        Ok(self.probability(sentence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarBuilder, Terminal};

    #[test]
    fn single_terminal_rule() {
        let s = NonTerminal::new("S");
        let a = Terminal::new("a");
        let grammar = GrammarBuilder::new()
            .start(s)
            .production(s, [Word::from(a)], 1.0)
            .build()
            .unwrap();
        let cnf = grammar.to_cnf(false);
        let parser = CykParser::new(&cnf);

        assert!((parser.probability(&Sentence::from_letters("a")) - 1.0).abs() < 1e-12);
        assert_eq!(parser.probability(&Sentence::from_letters("b")), 0.0);
        assert_eq!(parser.probability(&Sentence::from_letters("aa")), 0.0);
    }

    #[test]
    fn nonterminal_input_words_never_match() {
        let s = NonTerminal::new("S");
        let a = Terminal::new("a");
        let grammar = GrammarBuilder::new()
            .start(s)
            .production(s, [Word::from(a)], 1.0)
            .build()
            .unwrap();
        let cnf = grammar.to_cnf(false);
        let parser = CykParser::new(&cnf);

        let bogus = Sentence::from_words([Word::from(NonTerminal::new("a"))]);
        assert_eq!(parser.probability(&bogus), 0.0);
    }
}
