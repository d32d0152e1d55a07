//! # Grammar Module
//!
//! Weighted context-free grammars.
//!
//! ## Overview
//!
//! A [`Grammar`] is an immutable set of weighted [`Production`]s plus a start
//! symbol. Weights, not probabilities, are the storage form: the probability
//! of a production is its weight normalized against the total weight of all
//! productions sharing its left-hand side, computed on query.
//!
//! ```rust
//! use canopy::grammar::{GrammarBuilder, NonTerminal, Terminal, Word};
//!
//! let s = NonTerminal::new("S");
//! let a = Terminal::new("a");
//! let grammar = GrammarBuilder::new()
//!     .start(s)
//!     .production(s, [Word::from(s), Word::from(s)], 2.0)
//!     .production(s, [Word::from(a)], 8.0)
//!     .build()?;
//!
//! let id = grammar.find_production(s, &[Word::from(a)]).unwrap();
//! assert!((grammar.probability(id) - 0.8).abs() < 1e-12);
//! # Ok::<(), canopy::GrammarError>(())
//! ```
//!
//! ## Submodules
//!
//! - [`symbol`]: interned terminals/nonterminals, words, sentences
//! - [`builder`]: fluent grammar construction with validation
//! - [`analysis`]: nullable-probability fixpoint
//! - [`cnf`]: Chomsky-normal-form conversion and CNF grammars

pub mod analysis;
pub mod builder;
pub mod cnf;
pub mod symbol;

pub use builder::GrammarBuilder;
pub use cnf::{CnfGrammar, CnfProduction};
pub use symbol::{NonTerminal, Sentence, Terminal, Word};

use std::fmt;

use hashbrown::{HashMap, HashSet};

use crate::error::GrammarError;

/// A weighted production `lhs -> rhs`.
///
/// Weights are non-negative reals; [`Grammar`] construction rejects anything
/// else. A production with an empty right-hand side is an *epsilon* rule; one
/// whose right-hand side is a single nonterminal is a *unit* rule.
#[derive(Clone, PartialEq, Debug)]
pub struct Production {
    /// Left-hand side.
    pub lhs: NonTerminal,
    /// Right-hand side.
    pub rhs: Sentence,
    /// Non-negative weight; normalized per left-hand side on query.
    pub weight: f64,
}

impl Production {
    /// Create a production.
    #[must_use]
    pub fn new(lhs: NonTerminal, rhs: Sentence, weight: f64) -> Self {
        Self { lhs, rhs, weight }
    }

    /// `lhs -> ε`.
    #[must_use]
    pub fn is_epsilon(&self) -> bool {
        self.rhs.is_empty()
    }

    /// `lhs -> B` for some nonterminal `B`.
    #[must_use]
    pub fn is_unit(&self) -> bool {
        matches!(&*self.rhs, [Word::NonTerminal(_)])
    }

    /// `lhs -> lhs`.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        matches!(&*self.rhs, [Word::NonTerminal(nt)] if *nt == self.lhs)
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} [{}]", self.lhs, self.rhs, self.weight)
    }
}

/// Index of a production within its owning [`Grammar`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ProductionId(usize);

impl ProductionId {
    /// The raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// An immutable weighted context-free grammar.
///
/// Construction validates weights and (optionally, see
/// [`GrammarBuilder::strict`]) that every referenced nonterminal has
/// productions. Nullable probabilities are computed once at construction and
/// served by [`Grammar::nullable_probability`]; the Earley parser uses them
/// as its nullability oracle.
#[derive(Clone, Debug)]
pub struct Grammar {
    productions: Vec<Production>,
    by_lhs: HashMap<NonTerminal, Vec<ProductionId>>,
    totals: HashMap<NonTerminal, f64>,
    nullable: HashMap<NonTerminal, f64>,
    start: NonTerminal,
}

impl Grammar {
    /// Build a grammar from productions and a start symbol.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::NegativeWeight`] if any production's weight is
    /// negative or NaN. Use [`GrammarBuilder`] for strict-mode validation.
    pub fn new(productions: Vec<Production>, start: NonTerminal) -> Result<Self, GrammarError> {
        for production in &productions {
            if production.weight.is_nan() || production.weight < 0.0 {
                return Err(GrammarError::NegativeWeight {
                    production: production.to_string(),
                    weight: production.weight,
                });
            }
        }

        let mut by_lhs: HashMap<NonTerminal, Vec<ProductionId>> = HashMap::new();
        let mut totals: HashMap<NonTerminal, f64> = HashMap::new();
        for (idx, production) in productions.iter().enumerate() {
            by_lhs
                .entry(production.lhs)
                .or_default()
                .push(ProductionId(idx));
            *totals.entry(production.lhs).or_insert(0.0) += production.weight;
        }

        let nullable = analysis::nullable_probabilities(&productions);

        Ok(Self {
            productions,
            by_lhs,
            totals,
            nullable,
            start,
        })
    }

    /// The start symbol.
    #[must_use]
    pub fn start(&self) -> NonTerminal {
        self.start
    }

    /// All productions, in construction order.
    #[must_use]
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// The production behind an id.
    #[must_use]
    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id.0]
    }

    /// Ids of all productions with left-hand side `lhs`.
    #[must_use]
    pub fn productions_from(&self, lhs: NonTerminal) -> &[ProductionId] {
        self.by_lhs.get(&lhs).map_or(&[], Vec::as_slice)
    }

    /// Probability of a production: its weight over the total weight of its
    /// left-hand side. 0 when the left-hand side carries no weight.
    #[must_use]
    pub fn probability(&self, id: ProductionId) -> f64 {
        let production = &self.productions[id.0];
        let total = self.totals.get(&production.lhs).copied().unwrap_or(0.0);
        if total > 0.0 {
            production.weight / total
        } else {
            0.0
        }
    }

    /// Total probability that `nt` derives the empty sentence.
    ///
    /// Computed by the fixpoint in [`analysis`]; joint nullability of a
    /// right-hand side is approximated as the product of the occurrences'
    /// marginals.
    #[must_use]
    pub fn nullable_probability(&self, nt: NonTerminal) -> f64 {
        self.nullable.get(&nt).copied().unwrap_or(0.0)
    }

    /// Look up a production by exact left- and right-hand side.
    ///
    /// Productions are expected to be unique by `(lhs, rhs)` — they model a
    /// set of rules. If duplicates were supplied anyway, the first match
    /// wins.
    #[must_use]
    pub fn find_production(&self, lhs: NonTerminal, rhs: &[Word]) -> Option<ProductionId> {
        self.productions_from(lhs)
            .iter()
            .copied()
            .find(|&id| *self.productions[id.index()].rhs == *rhs)
    }

    /// Every nonterminal mentioned by the grammar (left-hand sides,
    /// right-hand occurrences, and the start symbol), sorted by name.
    #[must_use]
    pub fn nonterminals(&self) -> Vec<NonTerminal> {
        let mut set: HashSet<NonTerminal> = HashSet::new();
        set.insert(self.start);
        for production in &self.productions {
            set.insert(production.lhs);
            for word in &production.rhs {
                if let Word::NonTerminal(nt) = word {
                    set.insert(*nt);
                }
            }
        }
        let mut all: Vec<NonTerminal> = set.into_iter().collect();
        all.sort_by_key(|nt| nt.name());
        all
    }

    /// Every terminal mentioned by the grammar, sorted by name.
    #[must_use]
    pub fn terminals(&self) -> Vec<Terminal> {
        let mut set: HashSet<Terminal> = HashSet::new();
        for production in &self.productions {
            for word in &production.rhs {
                if let Word::Terminal(t) = word {
                    set.insert(*t);
                }
            }
        }
        let mut all: Vec<Terminal> = set.into_iter().collect();
        all.sort_by_key(|t| t.name());
        all
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "start: {}", self.start)?;
        for production in &self.productions {
            writeln!(f, "{production}")?;
        }
        Ok(())
    }
}
