//! Chomsky-normal-form conversion.
//!
//! [`Grammar::to_cnf`] rewrites a weighted grammar into an equivalent
//! [`CnfGrammar`] through five steps, redistributing weights so that
//! derivation probabilities are preserved up to the documented epsilon/unit
//! caveats:
//!
//! 1. **START**: introduce a fresh start symbol `S0 -> S` so the start never
//!    appears on a right-hand side.
//! 2. **TERM**: replace terminals inside long rules with memoized stand-in
//!    nonterminals `T_x -> x`.
//! 3. **BIN**: break rules of length ≥ 3 into right-branching binary chains;
//!    the head link inherits the rule's weight, chain links weigh 1.
//! 4. **DEL**: remove epsilon rules. Every rule expands into `2^m` variants
//!    over its nullable occurrences; a variant that skips an occurrence is
//!    scaled by that occurrence's nullable probability, while the variant
//!    that keeps it is left unscaled. (The kept variant is deliberately not
//!    scaled by `1 − p`; the asymmetry is preserved for compatibility and
//!    loses mass on epsilon-heavy grammars.) Weight of variants that collapse
//!    to `S0 -> ε` accumulates into the grammar's empty weight.
//! 5. **UNIT**: relay unit rules `A -> B` into `B`'s expansions,
//!    proportionally to `B`'s weights. Eliminated units are remembered so
//!    they are never revived; weight that would flow through a revived unit
//!    or a unit whose target has no rules is discarded.
//!
//! Fresh nonterminals come from a single counter owned by the normalizer and
//! are probed against every name the input grammar uses.

use std::fmt;

use hashbrown::{HashMap, HashSet, hash_map::Entry};

use crate::error::GrammarError;
use crate::grammar::analysis::nullable_probabilities;
use crate::grammar::{Grammar, NonTerminal, Production, Sentence, Terminal, Word};

/// A rule of a grammar in Chomsky normal form.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum CnfProduction {
    /// `lhs -> left right`.
    Binary {
        /// Left-hand side.
        lhs: NonTerminal,
        /// First right-hand symbol.
        left: NonTerminal,
        /// Second right-hand symbol.
        right: NonTerminal,
        /// Non-negative weight.
        weight: f64,
    },
    /// `lhs -> terminal`.
    Terminal {
        /// Left-hand side.
        lhs: NonTerminal,
        /// The produced terminal.
        terminal: Terminal,
        /// Non-negative weight.
        weight: f64,
    },
}

impl CnfProduction {
    /// The rule's left-hand side.
    #[must_use]
    pub const fn lhs(&self) -> NonTerminal {
        match self {
            Self::Binary { lhs, .. } | Self::Terminal { lhs, .. } => *lhs,
        }
    }

    /// The rule's weight.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        match self {
            Self::Binary { weight, .. } | Self::Terminal { weight, .. } => *weight,
        }
    }
}

impl fmt::Display for CnfProduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary {
                lhs,
                left,
                right,
                weight,
            } => write!(f, "{lhs} -> {left} {right} [{weight}]"),
            Self::Terminal {
                lhs,
                terminal,
                weight,
            } => write!(f, "{lhs} -> {terminal} [{weight}]"),
        }
    }
}

/// A weighted grammar in Chomsky normal form.
///
/// Besides binary and terminal rules, the grammar carries an *empty weight*:
/// the weight of every epsilon derivation of the original grammar, collapsed
/// onto the start symbol. The start's normalization total includes it, so
/// [`CnfGrammar::empty_probability`] answers "probability of the empty
/// sentence" directly.
#[derive(Clone, Debug)]
pub struct CnfGrammar {
    productions: Vec<CnfProduction>,
    start: NonTerminal,
    empty_weight: f64,
    totals: HashMap<NonTerminal, f64>,
    by_terminal: HashMap<Terminal, Vec<usize>>,
    binary: Vec<usize>,
}

impl CnfGrammar {
    /// Build a CNF grammar from explicit CNF rules.
    ///
    /// # Errors
    ///
    /// [`GrammarError::NegativeWeight`] / [`GrammarError::NegativeEmptyWeight`]
    /// on invalid weights.
    pub fn new(
        productions: Vec<CnfProduction>,
        empty_weight: f64,
        start: NonTerminal,
    ) -> Result<Self, GrammarError> {
        for production in &productions {
            if production.weight().is_nan() || production.weight() < 0.0 {
                return Err(GrammarError::NegativeWeight {
                    production: production.to_string(),
                    weight: production.weight(),
                });
            }
        }
        if empty_weight.is_nan() || empty_weight < 0.0 {
            return Err(GrammarError::NegativeEmptyWeight(empty_weight));
        }
        Ok(Self::from_parts(productions, empty_weight, start))
    }

    /// Infallible assembly; callers have already validated the weights.
    fn from_parts(
        productions: Vec<CnfProduction>,
        empty_weight: f64,
        start: NonTerminal,
    ) -> Self {
        let mut totals: HashMap<NonTerminal, f64> = HashMap::new();
        let mut by_terminal: HashMap<Terminal, Vec<usize>> = HashMap::new();
        let mut binary = Vec::new();
        for (idx, production) in productions.iter().enumerate() {
            *totals.entry(production.lhs()).or_insert(0.0) += production.weight();
            match production {
                CnfProduction::Binary { .. } => binary.push(idx),
                CnfProduction::Terminal { terminal, .. } => {
                    by_terminal.entry(*terminal).or_default().push(idx);
                }
            }
        }
        *totals.entry(start).or_insert(0.0) += empty_weight;

        Self {
            productions,
            start,
            empty_weight,
            totals,
            by_terminal,
            binary,
        }
    }

    /// Build a CNF grammar from general productions, rejecting any rule that
    /// is not `A -> B C` or `A -> t`.
    ///
    /// # Errors
    ///
    /// [`GrammarError::NotCnf`] for a rule of any other shape, plus the
    /// weight errors of [`CnfGrammar::new`].
    pub fn from_productions(
        productions: Vec<Production>,
        empty_weight: f64,
        start: NonTerminal,
    ) -> Result<Self, GrammarError> {
        let mut rules = Vec::with_capacity(productions.len());
        for production in productions {
            match production.rhs.as_slice() {
                &[Word::Terminal(terminal)] => rules.push(CnfProduction::Terminal {
                    lhs: production.lhs,
                    terminal,
                    weight: production.weight,
                }),
                &[Word::NonTerminal(left), Word::NonTerminal(right)] => {
                    rules.push(CnfProduction::Binary {
                        lhs: production.lhs,
                        left,
                        right,
                        weight: production.weight,
                    });
                }
                _ => return Err(GrammarError::NotCnf(production.to_string())),
            }
        }
        Self::new(rules, empty_weight, start)
    }

    /// The start symbol.
    #[must_use]
    pub fn start(&self) -> NonTerminal {
        self.start
    }

    /// All rules.
    #[must_use]
    pub fn productions(&self) -> &[CnfProduction] {
        &self.productions
    }

    /// The collapsed weight of every epsilon derivation.
    #[must_use]
    pub fn empty_weight(&self) -> f64 {
        self.empty_weight
    }

    /// Probability of a rule: weight over the left-hand side's total, where
    /// the start's total includes the empty weight.
    #[must_use]
    pub fn probability(&self, production: &CnfProduction) -> f64 {
        let total = self.totals.get(&production.lhs()).copied().unwrap_or(0.0);
        if total > 0.0 {
            production.weight() / total
        } else {
            0.0
        }
    }

    /// Probability that the grammar derives the empty sentence.
    #[must_use]
    pub fn empty_probability(&self) -> f64 {
        let total = self.totals.get(&self.start).copied().unwrap_or(0.0);
        if total > 0.0 {
            self.empty_weight / total
        } else {
            0.0
        }
    }

    /// `(lhs, probability)` of every terminal rule producing `t`.
    pub fn terminal_expansions(
        &self,
        t: Terminal,
    ) -> impl Iterator<Item = (NonTerminal, f64)> + '_ {
        self.by_terminal
            .get(&t)
            .into_iter()
            .flatten()
            .map(|&idx| {
                let production = &self.productions[idx];
                (production.lhs(), self.probability(production))
            })
    }

    /// `(lhs, left, right, probability)` of every binary rule.
    pub fn binary_expansions(
        &self,
    ) -> impl Iterator<Item = (NonTerminal, NonTerminal, NonTerminal, f64)> + '_ {
        self.binary.iter().filter_map(|&idx| {
            match self.productions[idx] {
                CnfProduction::Binary {
                    lhs, left, right, ..
                } => Some((lhs, left, right, self.probability(&self.productions[idx]))),
                CnfProduction::Terminal { .. } => None,
            }
        })
    }
}

impl fmt::Display for CnfGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "start: {} [ε {}]", self.start, self.empty_weight)?;
        for production in &self.productions {
            writeln!(f, "{production}")?;
        }
        Ok(())
    }
}

impl Grammar {
    /// Convert this grammar to Chomsky normal form.
    ///
    /// With `simplify`, rules whose left-hand side is unreachable from the
    /// new start symbol and rules of weight 0 are pruned afterwards.
    #[must_use]
    pub fn to_cnf(&self, simplify: bool) -> CnfGrammar {
        Normalizer::new(self).run(simplify)
    }
}

/// The five-step rewrite. Holds the working rule set, the fresh-name counter,
/// the set of names the grammar already uses, and the accumulating empty
/// weight.
struct Normalizer {
    rules: Vec<Production>,
    used: HashSet<NonTerminal>,
    counter: usize,
    start: NonTerminal,
    empty_weight: f64,
}

impl Normalizer {
    fn new(grammar: &Grammar) -> Self {
        let mut used: HashSet<NonTerminal> = HashSet::new();
        used.insert(grammar.start());
        for production in grammar.productions() {
            used.insert(production.lhs);
            for word in &production.rhs {
                if let Word::NonTerminal(nt) = word {
                    used.insert(*nt);
                }
            }
        }
        Self {
            rules: grammar.productions().to_vec(),
            used,
            counter: 0,
            start: grammar.start(),
            empty_weight: 0.0,
        }
    }

    /// Mint a nonterminal the input grammar does not use.
    fn fresh(&mut self, base: &str) -> NonTerminal {
        loop {
            let candidate = NonTerminal::new(&format!("{base}{}", self.counter));
            self.counter += 1;
            if self.used.insert(candidate) {
                return candidate;
            }
        }
    }

    fn run(mut self, simplify: bool) -> CnfGrammar {
        self.introduce_start();
        self.isolate_terminals();
        self.binarize();
        self.delete_epsilons();
        self.eliminate_units();
        self.finish(simplify)
    }

    /// START: fresh `S0 -> S` of weight 1.
    fn introduce_start(&mut self) {
        let original = self.start;
        let fresh = self.fresh(original.name());
        self.rules.insert(
            0,
            Production::new(fresh, Sentence::from_words([Word::from(original)]), 1.0),
        );
        self.start = fresh;
    }

    /// TERM: replace terminal occurrences inside rules of length ≥ 2 with
    /// memoized stand-ins `T_x -> x`. Solitary terminals stay.
    fn isolate_terminals(&mut self) {
        let mut stand_ins: HashMap<Terminal, NonTerminal> = HashMap::new();
        let mut added: Vec<Production> = Vec::new();
        let rules = std::mem::take(&mut self.rules);

        let mut rewritten = Vec::with_capacity(rules.len());
        for rule in rules {
            if rule.rhs.len() < 2 || rule.rhs.iter().all(|w| w.is_nonterminal()) {
                rewritten.push(rule);
                continue;
            }
            let mut rhs = Sentence::new();
            for &word in &rule.rhs {
                match word {
                    Word::Terminal(t) => {
                        let stand_in = if let Some(&known) = stand_ins.get(&t) {
                            known
                        } else {
                            let minted = self.fresh(&format!("T_{}", t.name()));
                            stand_ins.insert(t, minted);
                            added.push(Production::new(
                                minted,
                                Sentence::from_words([Word::from(t)]),
                                1.0,
                            ));
                            minted
                        };
                        rhs.push(Word::from(stand_in));
                    }
                    Word::NonTerminal(_) => rhs.push(word),
                }
            }
            rewritten.push(Production::new(rule.lhs, rhs, rule.weight));
        }

        rewritten.extend(added);
        self.rules = rewritten;
    }

    /// BIN: break rules of length ≥ 3 into right-branching chains. The head
    /// inherits the rule's weight; chain links are deterministic and weigh 1.
    fn binarize(&mut self) {
        let rules = std::mem::take(&mut self.rules);
        let mut out = Vec::with_capacity(rules.len());

        for rule in rules {
            let len = rule.rhs.len();
            if len < 3 {
                out.push(rule);
                continue;
            }
            let mut lhs = rule.lhs;
            let mut weight = rule.weight;
            for idx in 0..len - 2 {
                let link = self.fresh(&format!("B_{}", rule.lhs.name()));
                out.push(Production::new(
                    lhs,
                    Sentence::from_words([rule.rhs[idx], Word::from(link)]),
                    weight,
                ));
                lhs = link;
                weight = 1.0;
            }
            out.push(Production::new(
                lhs,
                Sentence::from_words([rule.rhs[len - 2], rule.rhs[len - 1]]),
                1.0,
            ));
        }

        self.rules = out;
    }

    /// DEL: drop epsilon rules, expanding every rule over its nullable
    /// occurrences. Epsilon variants survive only at the new start symbol,
    /// as weight in the empty bucket.
    fn delete_epsilons(&mut self) {
        let nullable = nullable_probabilities(&self.rules);
        let rules = std::mem::take(&mut self.rules);
        let mut out = Vec::with_capacity(rules.len());

        for rule in rules {
            let positions: Vec<usize> = rule
                .rhs
                .iter()
                .enumerate()
                .filter_map(|(idx, word)| match word {
                    Word::NonTerminal(nt)
                        if nullable.get(nt).copied().unwrap_or(0.0) > 0.0 =>
                    {
                        Some(idx)
                    }
                    _ => None,
                })
                .collect();

            for mask in 0_usize..(1 << positions.len()) {
                let mut weight = rule.weight;
                let mut rhs = Sentence::new();
                for (idx, &word) in rule.rhs.iter().enumerate() {
                    if let Some(bit) = positions.iter().position(|&p| p == idx) {
                        if mask & (1 << bit) != 0 {
                            if let Word::NonTerminal(nt) = word {
                                weight *= nullable.get(&nt).copied().unwrap_or(0.0);
                            }
                            continue;
                        }
                    }
                    rhs.push(word);
                }
                if rhs.is_empty() {
                    if rule.lhs == self.start {
                        self.empty_weight += weight;
                    }
                } else {
                    out.push(Production::new(rule.lhs, rhs, weight));
                }
            }
        }

        self.rules = out;
    }

    /// UNIT: relay `A -> B` into `B`'s expansions proportionally to `B`'s
    /// weights. The deleted-set keeps eliminated units from being revived;
    /// weight that would revive one, or flow into a lhs without rules, is
    /// discarded.
    fn eliminate_units(&mut self) {
        let rules = std::mem::take(&mut self.rules);

        // Drop self-loops and merge duplicates by (lhs, rhs).
        let mut merged: Vec<Production> = Vec::with_capacity(rules.len());
        {
            let mut index: HashMap<(NonTerminal, Sentence), usize> = HashMap::new();
            for rule in rules {
                if rule.is_self_loop() {
                    continue;
                }
                match index.entry((rule.lhs, rule.rhs.clone())) {
                    Entry::Occupied(entry) => merged[*entry.get()].weight += rule.weight,
                    Entry::Vacant(entry) => {
                        entry.insert(merged.len());
                        merged.push(rule);
                    }
                }
            }
        }

        let mut deleted: HashSet<(NonTerminal, NonTerminal)> = HashSet::new();
        while let Some(pos) = merged.iter().position(Production::is_unit) {
            let unit = merged.remove(pos);
            let Some(target) = unit.rhs[0].as_nonterminal() else {
                continue;
            };
            let lhs = unit.lhs;
            deleted.insert((lhs, target));

            let total: f64 = merged
                .iter()
                .filter(|r| r.lhs == target)
                .map(|r| r.weight)
                .sum();
            if total <= 0.0 {
                continue;
            }
            let expansions: Vec<(Sentence, f64)> = merged
                .iter()
                .filter(|r| r.lhs == target)
                .map(|r| (r.rhs.clone(), r.weight))
                .collect();

            for (rhs, expansion_weight) in expansions {
                let weight = unit.weight * (expansion_weight / total);
                if let &[Word::NonTerminal(next)] = rhs.as_slice()
                    && (next == lhs || deleted.contains(&(lhs, next)))
                {
                    continue;
                }
                if let Some(existing) =
                    merged.iter_mut().find(|r| r.lhs == lhs && r.rhs == rhs)
                {
                    existing.weight += weight;
                } else {
                    merged.push(Production::new(lhs, rhs, weight));
                }
            }
        }

        self.rules = merged;
    }

    /// Partition the normalized rules into binary and terminal CNF rules.
    fn finish(self, simplify: bool) -> CnfGrammar {
        let mut productions = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            match rule.rhs.as_slice() {
                &[Word::Terminal(terminal)] => productions.push(CnfProduction::Terminal {
                    lhs: rule.lhs,
                    terminal,
                    weight: rule.weight,
                }),
                &[Word::NonTerminal(left), Word::NonTerminal(right)] => {
                    productions.push(CnfProduction::Binary {
                        lhs: rule.lhs,
                        left,
                        right,
                        weight: rule.weight,
                    });
                }
                _ => unreachable!("normalization left a non-CNF rule: {rule}"),
            }
        }

        if simplify {
            productions.retain(|p| p.weight() > 0.0);
            let reachable = reachable_from(&productions, self.start);
            productions.retain(|p| reachable.contains(&p.lhs()));
        }

        CnfGrammar::from_parts(productions, self.empty_weight, self.start)
    }
}

/// Left-hand sides reachable from `start` through binary rules.
fn reachable_from(productions: &[CnfProduction], start: NonTerminal) -> HashSet<NonTerminal> {
    let mut reachable: HashSet<NonTerminal> = HashSet::new();
    reachable.insert(start);
    let mut changed = true;
    while changed {
        changed = false;
        for production in productions {
            if !reachable.contains(&production.lhs()) {
                continue;
            }
            if let CnfProduction::Binary { left, right, .. } = production {
                changed |= reachable.insert(*left);
                changed |= reachable.insert(*right);
            }
        }
    }
    reachable
}
