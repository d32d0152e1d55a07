//! Chart data structures for the Earley parser.
//!
//! Items live in a per-parse arena and are addressed by [`ItemId`]; state
//! sets keep insertion-ordered id lists (new items are appended while the set
//! is being scanned) plus a dedup index keyed by (production, dot, origin).
//! Each item carries its back-pointers:
//!
//! - *predecessors*: edges to items of the same production whose dot is one
//!   position earlier, labeled with the state index the predecessor was
//!   advanced from;
//! - *reductions*: edges to completed child items, labeled with the state
//!   index the child began at.
//!
//! The forest builder walks these edges after the chart is complete.

use hashbrown::{HashMap, HashSet};

use crate::grammar::{NonTerminal, ProductionId};

/// Index of an item within its chart's arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct ItemId(usize);

impl ItemId {
    pub(crate) const fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct ItemKey {
    production: ProductionId,
    dot: usize,
    origin: usize,
}

/// An Earley item: a production, the dot position, and the input position
/// the item started at. `at` is the state set holding the item.
#[derive(Clone, Debug)]
pub(crate) struct Item {
    pub production: ProductionId,
    pub dot: usize,
    pub origin: usize,
    pub at: usize,
    pub predecessors: Vec<(usize, ItemId)>,
    pub reductions: Vec<(usize, ItemId)>,
}

/// One chart position: insertion-ordered items plus bookkeeping for
/// prediction short-circuiting and nullable ("magic") advances.
#[derive(Default)]
pub(crate) struct StateSet {
    items: Vec<ItemId>,
    index: HashMap<ItemKey, ItemId>,
    predicted: HashSet<NonTerminal>,
    magic: Vec<ItemId>,
}

impl StateSet {
    pub(crate) fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn already_predicted(&self, nt: NonTerminal) -> bool {
        self.predicted.contains(&nt)
    }

    pub(crate) fn magic_items(&self) -> &[ItemId] {
        &self.magic
    }
}

/// The whole chart: item arena plus one [`StateSet`] per input position.
pub(crate) struct Chart {
    arena: Vec<Item>,
    sets: Vec<StateSet>,
}

impl Chart {
    /// A chart for an input of `n` words: positions `0 ..= n`.
    pub(crate) fn new(n: usize) -> Self {
        let mut sets = Vec::with_capacity(n + 1);
        sets.resize_with(n + 1, StateSet::default);
        Self {
            arena: Vec::new(),
            sets,
        }
    }

    pub(crate) fn set(&self, position: usize) -> &StateSet {
        &self.sets[position]
    }

    pub(crate) fn item(&self, id: ItemId) -> &Item {
        &self.arena[id.0]
    }

    /// Insert `(production, dot, origin)` into the set at `position`,
    /// deduplicated. Returns the item id and whether it was newly added.
    pub(crate) fn add(
        &mut self,
        position: usize,
        production: ProductionId,
        dot: usize,
        origin: usize,
    ) -> (ItemId, bool) {
        let key = ItemKey {
            production,
            dot,
            origin,
        };
        if let Some(&id) = self.sets[position].index.get(&key) {
            return (id, false);
        }
        let id = ItemId(self.arena.len());
        self.arena.push(Item {
            production,
            dot,
            origin,
            at: position,
            predecessors: Vec::new(),
            reductions: Vec::new(),
        });
        let set = &mut self.sets[position];
        set.index.insert(key, id);
        set.items.push(id);
        (id, true)
    }

    /// Attach a predecessor edge, merging duplicates.
    pub(crate) fn add_predecessor(&mut self, id: ItemId, label: usize, target: ItemId) {
        let edges = &mut self.arena[id.0].predecessors;
        if !edges.contains(&(label, target)) {
            edges.push((label, target));
        }
    }

    /// Attach a reduction edge, merging duplicates.
    pub(crate) fn add_reduction(&mut self, id: ItemId, label: usize, target: ItemId) {
        let edges = &mut self.arena[id.0].reductions;
        if !edges.contains(&(label, target)) {
            edges.push((label, target));
        }
    }

    pub(crate) fn mark_predicted(&mut self, position: usize, nt: NonTerminal) {
        self.sets[position].predicted.insert(nt);
    }

    /// Record an item advanced eagerly over a nullable nonterminal; the
    /// post-pass revisits these to attach reduction edges.
    pub(crate) fn mark_magic(&mut self, position: usize, id: ItemId) {
        let magic = &mut self.sets[position].magic;
        if !magic.contains(&id) {
            magic.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, NonTerminal, Production, Sentence};

    #[test]
    fn add_deduplicates_by_key() {
        let s = NonTerminal::new("S");
        let grammar =
            Grammar::new(vec![Production::new(s, Sentence::new(), 1.0)], s).unwrap();
        let pid = grammar.productions_from(s)[0];

        let mut chart = Chart::new(2);
        let (a, fresh_a) = chart.add(0, pid, 0, 0);
        let (b, fresh_b) = chart.add(0, pid, 0, 0);
        assert!(fresh_a);
        assert!(!fresh_b);
        assert_eq!(a, b);

        // Same key in a different set is a different item.
        let (c, fresh_c) = chart.add(1, pid, 0, 0);
        assert!(fresh_c);
        assert_ne!(a, c);
        assert_eq!(chart.item(c).at, 1);
    }

    #[test]
    fn edges_merge() {
        let s = NonTerminal::new("S");
        let grammar =
            Grammar::new(vec![Production::new(s, Sentence::new(), 1.0)], s).unwrap();
        let pid = grammar.productions_from(s)[0];

        let mut chart = Chart::new(1);
        let (a, _) = chart.add(0, pid, 0, 0);
        let (b, _) = chart.add(1, pid, 0, 0);
        chart.add_reduction(a, 0, b);
        chart.add_reduction(a, 0, b);
        assert_eq!(chart.item(a).reductions.len(), 1);
    }
}
