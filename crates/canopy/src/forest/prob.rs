//! Probability evaluation over the forest.
//!
//! Nullable derivations can make the packed structure cyclic, so node
//! probabilities cannot be computed in one topological sweep. Instead every
//! node starts at 1 and the whole forest is re-evaluated until stable:
//!
//! ```text
//! p'(v) = Σ over families f of  prob(production(f)) · Π over children c of p(c)
//! ```
//!
//! with unannotated families contributing factor 1 and leaves pinned to 1.
//! Estimates are clamped to [0, 1]. The update is monotone non-increasing
//! from the all-ones start (f64 rounding is monotone, so this holds exactly,
//! not just in real arithmetic); iteration stops once no estimate drops by
//! more than the tolerance. An estimate that *rises* can only mean the forest
//! or the evaluator is corrupt and is reported as fatal.

use crate::error::ParseError;
use crate::forest::Forest;
use crate::grammar::Grammar;

const TOLERANCE: f64 = 1e-15;

pub(crate) fn evaluate(forest: &Forest, grammar: &Grammar) -> Result<f64, ParseError> {
    let count = forest.node_count();
    let mut current = vec![1.0_f64; count];

    loop {
        let mut next = vec![1.0_f64; count];
        let mut converged = true;

        for (idx, node) in forest.nodes().iter().enumerate() {
            let families = node.families();
            if families.is_empty() {
                continue;
            }
            let mut total = 0.0;
            for family in families {
                let mut value = family
                    .production()
                    .map_or(1.0, |pid| grammar.probability(pid));
                for &child in family.children() {
                    value *= current[child.index()];
                }
                total += value;
            }
            let estimate = total.clamp(0.0, 1.0);
            if estimate > current[idx] {
                return Err(ParseError::MonotonicityViolation {
                    node: idx,
                    previous: current[idx],
                    current: estimate,
                });
            }
            if current[idx] - estimate > TOLERANCE {
                converged = false;
            }
            next[idx] = estimate;
        }

        current = next;
        if converged {
            return Ok(current[forest.root().index()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;
    use crate::forest::{Family, NodeId, SppfNode};
    use crate::grammar::{Grammar, NonTerminal, Production, Sentence, Terminal, Word};

    fn toy_grammar() -> Grammar {
        let s = NonTerminal::new("S");
        let a = Terminal::new("a");
        Grammar::new(
            vec![
                Production::new(
                    s,
                    Sentence::from_words([Word::from(s), Word::from(s)]),
                    1.0,
                ),
                Production::new(s, Sentence::from_words([Word::from(a)]), 3.0),
            ],
            s,
        )
        .unwrap()
    }

    #[test]
    fn leaf_only_forest_evaluates_to_one() {
        let forest = Forest::from_parts(
            vec![SppfNode::Epsilon { at: 0 }],
            NodeId::new(0),
        );
        let p = evaluate(&forest, &toy_grammar()).unwrap();
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn annotated_family_multiplies_production_probability() {
        let grammar = toy_grammar();
        let s = NonTerminal::new("S");
        let leaf_rule = grammar.find_production(s, &[Word::from(Terminal::new("a"))]).unwrap();

        let mut family = Family::new(smallvec![NodeId::new(1)]);
        family.set_production(leaf_rule);
        let forest = Forest::from_parts(
            vec![
                SppfNode::Symbol {
                    symbol: s,
                    start: 0,
                    end: 1,
                    families: vec![family],
                },
                SppfNode::Terminal {
                    terminal: Terminal::new("a"),
                    start: 0,
                    end: 1,
                },
            ],
            NodeId::new(0),
        );
        let p = evaluate(&forest, &grammar).unwrap();
        assert!((p - 0.75).abs() < 1e-12);
    }

    #[test]
    fn cyclic_self_family_converges_to_zero() {
        // A node whose only family is itself scaled by 0.25: estimates run
        // 1, 0.25, 0.0625, ... down to 0 without ever increasing.
        let grammar = toy_grammar();
        let s = NonTerminal::new("S");
        let branch = grammar
            .find_production(s, &[Word::from(s), Word::from(s)])
            .unwrap();

        let mut family = Family::new(smallvec![NodeId::new(0)]);
        family.set_production(branch);
        let forest = Forest::from_parts(
            vec![SppfNode::Symbol {
                symbol: s,
                start: 0,
                end: 0,
                families: vec![family],
            }],
            NodeId::new(0),
        );
        let p = evaluate(&forest, &grammar).unwrap();
        assert!(p < 1e-10);
    }
}
