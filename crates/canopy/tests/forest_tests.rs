//! Tests for forest structure, annotation, and evaluation.

use canopy::backend::{EarleyParser, ForestParser, Parser};
use canopy::grammar::{GrammarBuilder, NonTerminal, Sentence, Terminal, Word};
use canopy::{Forest, Grammar, SppfNode};

fn nt(name: &str) -> NonTerminal {
    NonTerminal::new(name)
}

fn t(name: &str) -> Terminal {
    Terminal::new(name)
}

fn ambiguous() -> Grammar {
    let s = nt("S");
    GrammarBuilder::new()
        .start(s)
        .production(s, [Word::from(s), Word::from(s)], 1.0)
        .production(s, [Word::from(t("a"))], 1.0)
        .build()
        .unwrap()
}

fn forest_of(grammar: &Grammar, input: &str) -> Forest {
    EarleyParser::new(grammar)
        .parse_forest(&Sentence::from_letters(input))
        .unwrap()
        .unwrap()
}

#[test]
fn root_is_node_zero_spanning_the_input() {
    let grammar = ambiguous();
    let forest = forest_of(&grammar, "aaa");
    assert_eq!(forest.root().index(), 0);
    match forest.node(forest.root()) {
        SppfNode::Symbol { symbol, start, end, .. } => {
            assert_eq!(*symbol, grammar.start());
            assert_eq!((*start, *end), (0, 3));
        }
        other => panic!("root is not a symbol node: {other:?}"),
    }
}

#[test]
fn annotated_families_name_rules_of_their_symbol() {
    let grammar = ambiguous();
    let forest = forest_of(&grammar, "aaa");

    for node in forest.nodes() {
        if let SppfNode::Symbol { symbol, families, .. } = node {
            for family in families {
                if let Some(pid) = family.production() {
                    assert_eq!(grammar.production(pid).lhs, *symbol);
                }
            }
        }
    }
}

#[test]
fn every_family_lives_on_an_interior_node() {
    let grammar = ambiguous();
    let forest = forest_of(&grammar, "aa");
    for node in forest.nodes() {
        if node.is_leaf() {
            assert!(node.families().is_empty());
        }
    }
}

#[test]
fn nodes_are_shared_across_derivations() {
    // "aaa" has two derivations sharing the three terminal leaves and the
    // inner spans; by-value interning means no (kind, span) appears twice.
    let grammar = ambiguous();
    let forest = forest_of(&grammar, "aaa");
    assert!(forest.is_ambiguous());

    let mut seen = std::collections::HashSet::new();
    for node in forest.nodes() {
        let key = match node {
            SppfNode::Symbol { symbol, start, end, .. } => {
                format!("sym:{symbol}:{start}:{end}")
            }
            SppfNode::Intermediate {
                production,
                dot,
                start,
                end,
                ..
            } => format!("int:{}:{dot}:{start}:{end}", production.index()),
            SppfNode::Terminal { terminal, start, .. } => format!("t:{terminal}:{start}"),
            SppfNode::Epsilon { at } => format!("eps:{at}"),
        };
        assert!(seen.insert(key), "duplicate node in forest");
    }
}

#[test]
fn unambiguous_forest_has_single_families() {
    let s = nt("S");
    let grammar = GrammarBuilder::new()
        .start(s)
        .production(s, [Word::from(t("a")), Word::from(t("b"))], 1.0)
        .build()
        .unwrap();
    let forest = forest_of(&grammar, "ab");
    assert!(!forest.is_ambiguous());
    for node in forest.nodes() {
        assert!(node.families().len() <= 1);
    }
}

#[test]
fn evaluation_never_trips_the_monotonicity_check() {
    // Deep ambiguity plus nullable cycles: the downward fixpoint must run to
    // convergence without an estimate ever rising.
    let grammar = ambiguous();
    let parser = EarleyParser::new(&grammar);
    for len in 1..8 {
        let sentence = Sentence::from_letters(&"a".repeat(len));
        let p = parser.parse_probability(&sentence).unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    let s = nt("S");
    let nullable = GrammarBuilder::new()
        .start(s)
        .production(s, [Word::from(t("a")), Word::from(s)], 1.0)
        .production(s, [], 1.0)
        .build()
        .unwrap();
    let parser = EarleyParser::new(&nullable);
    for len in 0..8 {
        let sentence = Sentence::from_letters(&"a".repeat(len));
        assert!(parser.parse_probability(&sentence).is_ok());
    }
}

#[test]
fn forest_survives_its_parser() {
    let grammar = ambiguous();
    let forest = {
        let parser = EarleyParser::new(&grammar);
        parser
            .parse_forest(&Sentence::from_letters("aa"))
            .unwrap()
            .unwrap()
    };
    // The forest owns its nodes; only the grammar is needed to evaluate.
    let p = forest.probability(&grammar).unwrap();
    assert!((p - 0.125).abs() < 1e-12);
    assert!(forest.node_count() > 0);
}

#[test]
fn spans_nest_consistently() {
    let grammar = ambiguous();
    let forest = forest_of(&grammar, "aaaa");
    for node in forest.nodes() {
        let (start, end) = node.span();
        assert!(start <= end);
        for family in node.families() {
            for &child in family.children() {
                let (child_start, child_end) = forest.node(child).span();
                assert!(start <= child_start && child_end <= end);
            }
        }
    }
}
