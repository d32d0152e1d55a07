//! # Canopy
//!
//! Probabilistic context-free grammar parsing.
//!
//! ## Overview
//!
//! Canopy takes a weighted CFG and answers one question two ways: *with what
//! probability does this grammar derive this sentence?*
//!
//! - **CNF normalization + CYK**: [`Grammar::to_cnf`](grammar::Grammar::to_cnf)
//!   rewrites any weighted grammar into Chomsky normal form, redistributing
//!   weights; [`CykParser`](backend::CykParser) answers probabilities
//!   bottom-up over the normalized grammar.
//! - **SPPF Earley parsing**: [`EarleyParser`](backend::EarleyParser) parses
//!   the original grammar directly, builds a shared packed parse forest
//!   ([`Forest`](forest::Forest)) holding *every* derivation, and evaluates
//!   the total derivation probability as a fixpoint over the forest — which
//!   handles ambiguity and nullable cycles.
//!
//! ## Quick Start
//!
//! ```rust
//! use canopy::backend::{CykParser, EarleyParser, ForestParser, Parser};
//! use canopy::grammar::{GrammarBuilder, NonTerminal, Sentence, Terminal, Word};
//!
//! // The ambiguous "Catalan" grammar:
//! //   S -> X X [2] | a [8]
//! //   X -> X X [2] | a [8]
//! let s = NonTerminal::new("S");
//! let x = NonTerminal::new("X");
//! let a = Terminal::new("a");
//! let grammar = GrammarBuilder::new()
//!     .start(s)
//!     .production(s, [Word::from(x), Word::from(x)], 2.0)
//!     .production(s, [Word::from(a)], 8.0)
//!     .production(x, [Word::from(x), Word::from(x)], 2.0)
//!     .production(x, [Word::from(a)], 8.0)
//!     .build()?;
//!
//! // Earley over the original grammar.
//! let earley = EarleyParser::new(&grammar);
//! let p = earley.parse_probability(&Sentence::from_letters("aa"))?;
//! assert!((p - 0.128).abs() < 1e-9);
//!
//! // CYK over the CNF rendition agrees.
//! let cnf = grammar.to_cnf(false);
//! let cyk = CykParser::new(&cnf);
//! let q = cyk.parse_probability(&Sentence::from_letters("aa"))?;
//! assert!((p - q).abs() < 1e-9);
//!
//! // The forest packs all derivations; "aaa" has more than one.
//! let forest = earley.parse_forest(&Sentence::from_letters("aaa"))?.unwrap();
//! assert!(forest.is_ambiguous());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Modules
//!
//! - [`grammar`]: symbols, sentences, weighted productions, grammars, CNF
//!   conversion
//! - [`backend`]: the CYK and Earley parsers behind the
//!   [`Parser`](backend::Parser) / [`ForestParser`](backend::ForestParser)
//!   traits
//! - [`forest`]: shared packed parse forests and their probabilities
//! - [`intern`]: the process-wide symbol table
//! - [`error`]: construction and parse errors
//!
//! ## Caveats carried by design
//!
//! CNF epsilon and unit elimination are weight-redistributing
//! approximations: grammars with epsilon cycles or unit cycles can lose
//! probability mass relative to the Earley answer. See
//! [`grammar::cnf`] for the exact contract.

pub mod backend;
pub mod error;
pub mod forest;
pub mod grammar;
pub mod intern;

pub use backend::{CykParser, EarleyParser, ForestParser, Parser};
pub use error::{GrammarError, ParseError};
pub use forest::{Family, Forest, NodeId, SppfNode};
pub use grammar::{
    CnfGrammar, CnfProduction, Grammar, GrammarBuilder, NonTerminal, Production, ProductionId,
    Sentence, Terminal, Word,
};
pub use intern::InternedStr;
