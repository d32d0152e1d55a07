//! Nullable-probability analysis.
//!
//! For each nonterminal `A`, the probability that `A` derives the empty
//! sentence. Seeded by epsilon rules and propagated through productions whose
//! right-hand sides consist entirely of nullable nonterminals, iterated to a
//! fixpoint.
//!
//! Joint nullability of a right-hand side is approximated as the product of
//! its occurrences' marginal probabilities; this is exact only when the
//! occurrences derive ε independently. The approximation is part of the
//! grammar contract and is relied on by the CNF normalizer, so it must not be
//! "fixed" in isolation.

use hashbrown::HashMap;

use crate::grammar::{NonTerminal, Production, Word};

const TOLERANCE: f64 = 1e-15;

/// Upper bound on fixpoint passes. Ordinary grammars converge in a handful;
/// the bound only bites on degenerate self-recursive epsilon grammars whose
/// fixpoint is approached sublinearly.
const MAX_PASSES: usize = 10_000;

/// Compute the nullable probability of every left-hand side in `productions`.
///
/// Nonterminals without productions are absent from the result (their
/// nullable probability is 0).
#[must_use]
pub fn nullable_probabilities(productions: &[Production]) -> HashMap<NonTerminal, f64> {
    let mut by_lhs: HashMap<NonTerminal, Vec<&Production>> = HashMap::new();
    let mut totals: HashMap<NonTerminal, f64> = HashMap::new();
    for production in productions {
        by_lhs.entry(production.lhs).or_default().push(production);
        *totals.entry(production.lhs).or_insert(0.0) += production.weight;
    }

    let mut nullable: HashMap<NonTerminal, f64> =
        by_lhs.keys().map(|&nt| (nt, 0.0)).collect();

    // Estimates only ever grow, so plain iteration converges from below.
    for _ in 0..MAX_PASSES {
        let mut changed = false;
        for (nt, rules) in &by_lhs {
            let total = totals.get(nt).copied().unwrap_or(0.0);
            if total <= 0.0 {
                continue;
            }
            let mut mass = 0.0;
            for rule in rules {
                let mut contribution = rule.weight;
                for word in &rule.rhs {
                    match word {
                        Word::NonTerminal(x) => {
                            contribution *= nullable.get(x).copied().unwrap_or(0.0);
                        }
                        Word::Terminal(_) => {
                            contribution = 0.0;
                            break;
                        }
                    }
                    if contribution == 0.0 {
                        break;
                    }
                }
                mass += contribution;
            }
            let estimate = (mass / total).min(1.0);
            if let Some(current) = nullable.get_mut(nt)
                && estimate - *current > TOLERANCE
            {
                *current = estimate;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    nullable
}
