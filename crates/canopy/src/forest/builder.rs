//! Forest construction from a completed Earley chart.
//!
//! Implements Scott's SPPF scheme: starting from the root symbol node, each
//! successful item is decomposed along its back-pointers into packed
//! families. Nodes are interned by value, so equal subderivations are shared;
//! a processed-item set breaks the recursion on cyclic (nullable)
//! derivations.
//!
//! After construction, families are deduplicated and annotated with the
//! production they instantiate:
//!
//! - a single-child family under a symbol node names a whole rule and is
//!   looked up by `(lhs, child)`;
//! - families of an intermediate node whose dot sits one short of the rule's
//!   length carry that rule (the "root" split); intermediate nodes deeper in
//!   the chain are transparent.
//!
//! Finally the surviving nodes are renumbered in preorder from the root.

use hashbrown::{HashMap, HashSet};
use smallvec::smallvec;

use crate::backend::earley::chart::{Chart, ItemId};
use crate::error::ParseError;
use crate::forest::{Family, Forest, NodeId, SppfNode};
use crate::grammar::{Grammar, NonTerminal, ProductionId, Sentence, Terminal, Word};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum NodeKey {
    Symbol(NonTerminal, usize, usize),
    Intermediate(ProductionId, usize, usize, usize),
    Terminal(Terminal, usize, usize),
    Epsilon(usize),
}

pub(crate) struct ForestBuilder<'a> {
    grammar: &'a Grammar,
    chart: &'a Chart,
    nodes: Vec<SppfNode>,
    interned: HashMap<NodeKey, NodeId>,
    processed: HashSet<ItemId>,
}

impl<'a> ForestBuilder<'a> {
    pub(crate) fn new(grammar: &'a Grammar, chart: &'a Chart) -> Self {
        Self {
            grammar,
            chart,
            nodes: Vec::new(),
            interned: HashMap::new(),
            processed: HashSet::new(),
        }
    }

    pub(crate) fn build(
        mut self,
        n: usize,
        successes: &[ItemId],
    ) -> Result<Forest, ParseError> {
        let root = self.intern(NodeKey::Symbol(self.grammar.start(), 0, n));
        for &success in successes {
            self.process(success, root)?;
        }
        self.dedup_families();
        self.annotate()?;
        Ok(self.into_preorder(root))
    }

    fn intern(&mut self, key: NodeKey) -> NodeId {
        if let Some(&id) = self.interned.get(&key) {
            return id;
        }
        let node = match key {
            NodeKey::Symbol(symbol, start, end) => SppfNode::Symbol {
                symbol,
                start,
                end,
                families: Vec::new(),
            },
            NodeKey::Intermediate(production, dot, start, end) => SppfNode::Intermediate {
                production,
                dot,
                start,
                end,
                families: Vec::new(),
            },
            NodeKey::Terminal(terminal, start, end) => SppfNode::Terminal {
                terminal,
                start,
                end,
            },
            NodeKey::Epsilon(at) => SppfNode::Epsilon { at },
        };
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        self.interned.insert(key, id);
        id
    }

    fn add_family(&mut self, node: NodeId, family: Family) -> Result<(), ParseError> {
        self.nodes[node.index()]
            .families_mut()
            .ok_or_else(|| ParseError::malformed("family attached to a leaf node"))?
            .push(family);
        Ok(())
    }

    /// Decompose `item` into families of `node`.
    ///
    /// Every chart item maps to exactly one forest node (complete items to
    /// their symbol node, partial items to their intermediate node), so the
    /// processed-set alone is enough to break cycles.
    fn process(&mut self, item_id: ItemId, node: NodeId) -> Result<(), ParseError> {
        if !self.processed.insert(item_id) {
            return Ok(());
        }
        let item = self.chart.item(item_id);
        let production = self.grammar.production(item.production);
        let pid = item.production;
        let dot = item.dot;
        let origin = item.origin;
        let end = item.at;

        if dot == 0 {
            if !production.rhs.is_empty() {
                return Err(ParseError::malformed(
                    "dotless item reached the builder for a non-epsilon rule",
                ));
            }
            let eps = self.intern(NodeKey::Epsilon(end));
            return self.add_family(node, Family::new(smallvec![eps]));
        }

        let previous = production.rhs[dot - 1];
        if dot == 1 {
            match previous {
                Word::Terminal(t) => {
                    if end == 0 {
                        return Err(ParseError::malformed("terminal item at position 0"));
                    }
                    let v = self.intern(NodeKey::Terminal(t, end - 1, end));
                    self.add_family(node, Family::new(smallvec![v]))?;
                }
                Word::NonTerminal(c) => {
                    let v = self.intern(NodeKey::Symbol(c, origin, end));
                    self.add_family(node, Family::new(smallvec![v]))?;
                    for &(label, target) in &item.reductions {
                        if label == origin {
                            self.process(target, v)?;
                        }
                    }
                }
            }
        } else {
            match previous {
                Word::Terminal(t) => {
                    if end == 0 {
                        return Err(ParseError::malformed("terminal item at position 0"));
                    }
                    let v = self.intern(NodeKey::Terminal(t, end - 1, end));
                    let w = self.intern(NodeKey::Intermediate(pid, dot - 1, origin, end - 1));
                    for &(label, target) in &item.predecessors {
                        if label == end - 1 {
                            self.process(target, w)?;
                        }
                    }
                    self.add_family(node, Family::new(smallvec![w, v]))?;
                }
                Word::NonTerminal(c) => {
                    for &(label, target) in &item.reductions {
                        let v = self.intern(NodeKey::Symbol(c, label, end));
                        let w = self.intern(NodeKey::Intermediate(pid, dot - 1, origin, label));
                        self.process(target, v)?;
                        for &(predecessor_label, predecessor) in &item.predecessors {
                            if predecessor_label == label {
                                self.process(predecessor, w)?;
                            }
                        }
                        self.add_family(node, Family::new(smallvec![w, v]))?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Finalize each node's family list: equal child tuples collapse.
    fn dedup_families(&mut self) {
        for node in &mut self.nodes {
            if let Some(families) = node.families_mut() {
                let mut seen = HashSet::new();
                families.retain(|family| seen.insert(family.children().to_vec()));
            }
        }
    }

    /// Attach to each family the production it instantiates.
    fn annotate(&mut self) -> Result<(), ParseError> {
        let mut assignments: Vec<(usize, usize, ProductionId)> = Vec::new();

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                SppfNode::Symbol {
                    symbol, families, ..
                } => {
                    for (family_idx, family) in families.iter().enumerate() {
                        let [child] = family.children() else { continue };
                        let rhs = self.child_words(*child)?;
                        let Some(pid) = self.grammar.find_production(*symbol, &rhs) else {
                            return Err(ParseError::malformed(format!(
                                "no production {symbol} -> {} behind a packed family",
                                Sentence::from_words(rhs.iter().copied()),
                            )));
                        };
                        assignments.push((idx, family_idx, pid));
                    }
                }
                SppfNode::Intermediate {
                    production,
                    dot,
                    families,
                    ..
                } => {
                    let len = self.grammar.production(*production).rhs.len();
                    if *dot == 0 || *dot >= len {
                        return Err(ParseError::malformed(
                            "intermediate node at unexpected dot position",
                        ));
                    }
                    // The "root" split of the rule carries the production;
                    // deeper splits are transparent.
                    if *dot + 1 == len {
                        for family_idx in 0..families.len() {
                            assignments.push((idx, family_idx, *production));
                        }
                    }
                }
                SppfNode::Terminal { .. } | SppfNode::Epsilon { .. } => {}
            }
        }

        for (node_idx, family_idx, pid) in assignments {
            if let Some(families) = self.nodes[node_idx].families_mut() {
                families[family_idx].set_production(pid);
            }
        }
        Ok(())
    }

    /// The right-hand side a single-child family stands for.
    fn child_words(&self, child: NodeId) -> Result<Vec<Word>, ParseError> {
        match self.nodes[child.index()] {
            SppfNode::Terminal { terminal, .. } => Ok(vec![Word::Terminal(terminal)]),
            SppfNode::Symbol { symbol, .. } => Ok(vec![Word::NonTerminal(symbol)]),
            SppfNode::Epsilon { .. } => Ok(Vec::new()),
            SppfNode::Intermediate { .. } => Err(ParseError::malformed(
                "intermediate node as the sole child of a symbol family",
            )),
        }
    }

    /// Renumber nodes in preorder from the root and drop anything the
    /// traversal cannot reach.
    fn into_preorder(self, root: NodeId) -> Forest {
        let mut remap: Vec<Option<usize>> = vec![None; self.nodes.len()];
        let mut order: Vec<NodeId> = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if remap[id.index()].is_some() {
                continue;
            }
            remap[id.index()] = Some(order.len());
            order.push(id);
            let node = &self.nodes[id.index()];
            for family in node.families().iter().rev() {
                for &child in family.children().iter().rev() {
                    if remap[child.index()].is_none() {
                        stack.push(child);
                    }
                }
            }
        }

        let mut nodes = Vec::with_capacity(order.len());
        for &old in &order {
            let mut node = self.nodes[old.index()].clone();
            if let Some(families) = node.families_mut() {
                for family in families {
                    for child in family.children_mut() {
                        *child = NodeId::new(
                            remap[child.index()]
                                .expect("children of reached nodes are reached"),
                        );
                    }
                }
            }
            nodes.push(node);
        }

        Forest::from_parts(nodes, NodeId::new(0))
    }
}
