//! The Earley recognizer.
//!
//! Classic chart parsing with two refinements required for probabilistic
//! forests:
//!
//! - items keep predecessor/reduction back-pointers (see
//!   [`chart`](super::chart)) so derivations can be reconstructed;
//! - prediction of a nullable nonterminal eagerly advances the predicting
//!   item ("magic" item). Completion alone cannot advance over a nonterminal
//!   that derives ε entirely inside the current state set, because the
//!   completer may run before the ε-completion exists. A post-pass per state
//!   set attaches the missing reduction edges to every complete same-origin
//!   item of the skipped nonterminal.

use crate::backend::earley::chart::{Chart, ItemId};
use crate::grammar::{Grammar, NonTerminal, Sentence, Terminal, Word};

pub(crate) struct Recognizer<'g> {
    grammar: &'g Grammar,
}

impl<'g> Recognizer<'g> {
    pub(crate) fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// Run recognition over `sentence`, returning the finished chart.
    ///
    /// The chart may be abandoned early: when a state set before the end of
    /// the input is empty no derivation can exist, and the caller will find
    /// no successes.
    pub(crate) fn build_chart(&self, sentence: &Sentence) -> Chart {
        let n = sentence.len();
        let mut chart = Chart::new(n);

        for &pid in self.grammar.productions_from(self.grammar.start()) {
            chart.add(0, pid, 0, 0);
        }

        for i in 0..=n {
            if chart.set(i).is_empty() && i < n {
                return chart;
            }
            // Index-ordered scan: items appended to S[i] during processing
            // are processed in the same sweep.
            let mut idx = 0;
            while idx < chart.set(i).len() {
                let id = chart.set(i).items()[idx];
                idx += 1;

                let (production, dot) = {
                    let item = chart.item(id);
                    (item.production, item.dot)
                };
                match self.grammar.production(production).rhs.get(dot) {
                    None => self.complete(&mut chart, i, id),
                    Some(&Word::NonTerminal(next)) => self.predict(&mut chart, i, id, next),
                    Some(&Word::Terminal(next)) => self.scan(&mut chart, i, id, next, sentence),
                }
            }
            self.attach_nullable_reductions(&mut chart, i);
        }

        chart
    }

    /// Completion: advance every item at the completed item's origin that is
    /// waiting for its left-hand side.
    fn complete(&self, chart: &mut Chart, i: usize, id: ItemId) {
        let (lhs, origin) = {
            let item = chart.item(id);
            (self.grammar.production(item.production).lhs, item.origin)
        };

        let mut idx = 0;
        while idx < chart.set(origin).len() {
            let waiting = chart.set(origin).items()[idx];
            idx += 1;

            let (production, dot, waiting_origin) = {
                let item = chart.item(waiting);
                (item.production, item.dot, item.origin)
            };
            if self.grammar.production(production).rhs.get(dot)
                != Some(&Word::NonTerminal(lhs))
            {
                continue;
            }
            let (advanced, _) = chart.add(i, production, dot + 1, waiting_origin);
            chart.add_reduction(advanced, origin, id);
            if dot > 0 {
                chart.add_predecessor(advanced, origin, waiting);
            }
        }
    }

    /// Prediction: seed items for `next`'s productions, and eagerly advance
    /// over `next` when it can derive ε.
    fn predict(&self, chart: &mut Chart, i: usize, id: ItemId, next: NonTerminal) {
        if !chart.set(i).already_predicted(next) {
            chart.mark_predicted(i, next);
            for &pid in self.grammar.productions_from(next) {
                chart.add(i, pid, 0, i);
            }
        }

        if self.grammar.nullable_probability(next) > 0.0 {
            let (production, dot, origin) = {
                let item = chart.item(id);
                (item.production, item.dot, item.origin)
            };
            let (magic, _) = chart.add(i, production, dot + 1, origin);
            chart.mark_magic(i, magic);
            if dot > 0 {
                chart.add_predecessor(magic, i, id);
            }
        }
    }

    /// Scan: move the dot over a matching input terminal into the next set.
    fn scan(&self, chart: &mut Chart, i: usize, id: ItemId, next: Terminal, sentence: &Sentence) {
        if sentence.get(i) != Some(&Word::Terminal(next)) {
            return;
        }
        let (production, dot, origin) = {
            let item = chart.item(id);
            (item.production, item.dot, item.origin)
        };
        let (advanced, _) = chart.add(i + 1, production, dot + 1, origin);
        if dot > 0 {
            chart.add_predecessor(advanced, i, id);
        }
    }

    /// Post-pass for magic items of `S[i]`: every complete item of the
    /// skipped nonterminal spanning `(i, i)` becomes a reduction target.
    fn attach_nullable_reductions(&self, chart: &mut Chart, i: usize) {
        if chart.set(i).magic_items().is_empty() {
            return;
        }

        let mut completed: Vec<(NonTerminal, ItemId)> = Vec::new();
        for &id in chart.set(i).items() {
            let item = chart.item(id);
            let production = self.grammar.production(item.production);
            if item.origin == i && item.dot == production.rhs.len() {
                completed.push((production.lhs, id));
            }
        }

        let magic: Vec<ItemId> = chart.set(i).magic_items().to_vec();
        for id in magic {
            let item = chart.item(id);
            let skipped = self
                .grammar
                .production(item.production)
                .rhs
                .get(item.dot - 1)
                .and_then(|w| w.as_nonterminal());
            let Some(skipped) = skipped else { continue };
            for &(lhs, target) in &completed {
                if lhs == skipped {
                    chart.add_reduction(id, i, target);
                }
            }
        }
    }

    /// Complete items at the end of the input that span the whole sentence
    /// and expand the start symbol.
    pub(crate) fn successes(&self, chart: &Chart, n: usize) -> Vec<ItemId> {
        chart
            .set(n)
            .items()
            .iter()
            .copied()
            .filter(|&id| {
                let item = chart.item(id);
                let production = self.grammar.production(item.production);
                item.origin == 0
                    && item.dot == production.rhs.len()
                    && production.lhs == self.grammar.start()
            })
            .collect()
    }
}
