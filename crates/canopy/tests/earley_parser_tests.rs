//! Tests for the Earley backend.

use canopy::backend::{CykParser, EarleyParser, ForestParser, Parser};
use canopy::grammar::{GrammarBuilder, NonTerminal, Sentence, Terminal, Word};
use canopy::Grammar;

fn nt(name: &str) -> NonTerminal {
    NonTerminal::new(name)
}

fn t(name: &str) -> Terminal {
    Terminal::new(name)
}

fn catalan() -> Grammar {
    let s = nt("S");
    let x = nt("X");
    let a = t("a");
    GrammarBuilder::new()
        .start(s)
        .production(s, [Word::from(x), Word::from(x)], 2.0)
        .production(s, [Word::from(a)], 8.0)
        .production(x, [Word::from(x), Word::from(x)], 2.0)
        .production(x, [Word::from(a)], 8.0)
        .build()
        .unwrap()
}

#[test]
fn catalan_reference_values() {
    let grammar = catalan();
    let parser = EarleyParser::new(&grammar);

    let expected = [
        ("a", 0.8),
        ("aa", 0.128),
        ("aaa", 0.04096),
        ("aaaa", 0.016384),
        ("aaaaa", 0.007340032),
    ];
    for (input, probability) in expected {
        let p = parser
            .parse_probability(&Sentence::from_letters(input))
            .unwrap();
        assert!(
            (p - probability).abs() < 1e-6,
            "P({input:?}) = {p}, expected {probability}"
        );
    }
}

#[test]
fn agrees_with_cyk_on_epsilon_free_grammars() {
    let grammar = catalan();
    let earley = EarleyParser::new(&grammar);
    let cnf = grammar.to_cnf(false);
    let cyk = CykParser::new(&cnf);

    for len in 0..8 {
        let sentence = Sentence::from_letters(&"a".repeat(len));
        let p = earley.parse_probability(&sentence).unwrap();
        let q = cyk.parse_probability(&sentence).unwrap();
        assert!((p - q).abs() < 1e-9, "length {len}: earley {p} vs cyk {q}");
    }
}

#[test]
fn right_recursion_with_nullable_tail() {
    // S -> a S [1] | ε [1]: P("a"^k) = 0.5^(k+1).
    let s = nt("S");
    let grammar = GrammarBuilder::new()
        .start(s)
        .production(s, [Word::from(t("a")), Word::from(s)], 1.0)
        .production(s, [], 1.0)
        .build()
        .unwrap();
    let parser = EarleyParser::new(&grammar);

    for k in 0..6 {
        let sentence = Sentence::from_letters(&"a".repeat(k));
        let p = parser.parse_probability(&sentence).unwrap();
        let expected = 0.5_f64.powi(i32::try_from(k).unwrap() + 1);
        assert!(
            (p - expected).abs() < 1e-12,
            "P(a^{k}) = {p}, expected {expected}"
        );
    }
}

#[test]
fn purely_nullable_grammar() {
    let s = nt("S");
    let grammar = GrammarBuilder::new()
        .start(s)
        .production(s, [], 1.0)
        .build()
        .unwrap();
    let parser = EarleyParser::new(&grammar);

    let p = parser.parse_probability(&Sentence::from_letters("")).unwrap();
    assert!((p - 1.0).abs() < 1e-12);
    assert_eq!(parser.parse_probability(&Sentence::from_letters("a")).unwrap(), 0.0);
}

#[test]
fn unit_chain_collapse() {
    let (a, b, c) = (nt("A"), nt("B"), nt("C"));
    let grammar = GrammarBuilder::new()
        .start(a)
        .production(a, [Word::from(b)], 1.0)
        .production(b, [Word::from(c)], 1.0)
        .production(c, [Word::from(t("a"))], 1.0)
        .build()
        .unwrap();
    let parser = EarleyParser::new(&grammar);
    let p = parser.parse_probability(&Sentence::from_letters("a")).unwrap();
    assert!((p - 1.0).abs() < 1e-12);
}

#[test]
fn binary_ambiguity_packs_derivations() {
    // S -> S S [1] | a [1]: "aaa" derives two ways.
    let s = nt("S");
    let grammar = GrammarBuilder::new()
        .start(s)
        .production(s, [Word::from(s), Word::from(s)], 1.0)
        .production(s, [Word::from(t("a"))], 1.0)
        .build()
        .unwrap();
    let parser = EarleyParser::new(&grammar);

    let sentence = Sentence::from_letters("aaa");
    let forest = parser.parse_forest(&sentence).unwrap().unwrap();
    assert!(forest.is_ambiguous());

    // Both derivations contribute: 2 · 0.5 · P(a) · P(aa) = 0.0625.
    let p = parser.parse_probability(&sentence).unwrap();
    assert!((p - 0.0625).abs() < 1e-12);
}

#[test]
fn acceptance_agrees_with_forest_presence() {
    let grammar = catalan();
    let parser = EarleyParser::new(&grammar);
    for input in ["", "a", "aa", "ab", "b", "aaaa"] {
        let sentence = Sentence::from_letters(input);
        let accepted = parser.accepts(&sentence).unwrap();
        let forest = parser.parse_forest(&sentence).unwrap();
        assert_eq!(accepted, forest.is_some(), "input {input:?}");
    }
}

#[test]
fn dead_chart_is_a_clean_rejection() {
    let s = nt("S");
    let grammar = GrammarBuilder::new()
        .start(s)
        .production(s, [Word::from(t("a")), Word::from(t("b"))], 1.0)
        .build()
        .unwrap();
    let parser = EarleyParser::new(&grammar);

    assert_eq!(parser.parse_probability(&Sentence::from_letters("xb")).unwrap(), 0.0);
    assert!(parser.parse_forest(&Sentence::from_letters("xb")).unwrap().is_none());
    assert!((parser.parse_probability(&Sentence::from_letters("ab")).unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn unknown_terminals_have_probability_zero() {
    let grammar = catalan();
    let parser = EarleyParser::new(&grammar);
    assert_eq!(parser.parse_probability(&Sentence::from_letters("az")).unwrap(), 0.0);
    assert!(parser.parse_forest(&Sentence::from_letters("z")).unwrap().is_none());
}

#[test]
fn empty_grammar_rejects_everything() {
    let grammar = Grammar::new(Vec::new(), nt("S")).unwrap();
    let parser = EarleyParser::new(&grammar);
    assert_eq!(parser.parse_probability(&Sentence::from_letters("")).unwrap(), 0.0);
    assert_eq!(parser.parse_probability(&Sentence::from_letters("a")).unwrap(), 0.0);
}

#[test]
fn left_recursion_is_handled() {
    // S -> S a [1] | a [1]: unambiguous, P("a"^k) = 0.5^k.
    let s = nt("S");
    let grammar = GrammarBuilder::new()
        .start(s)
        .production(s, [Word::from(s), Word::from(t("a"))], 1.0)
        .production(s, [Word::from(t("a"))], 1.0)
        .build()
        .unwrap();
    let parser = EarleyParser::new(&grammar);

    for k in 1..6 {
        let sentence = Sentence::from_letters(&"a".repeat(k));
        let p = parser.parse_probability(&sentence).unwrap();
        let expected = 0.5_f64.powi(i32::try_from(k).unwrap());
        assert!(
            (p - expected).abs() < 1e-12,
            "P(a^{k}) = {p}, expected {expected}"
        );
    }
}

#[test]
fn nullable_in_the_middle_of_a_rule() {
    // S -> a M b, M -> ε [1] | m [1]: "ab" and "amb" each carry the
    // probability of M's choice.
    let s = nt("S");
    let m = nt("M");
    let grammar = GrammarBuilder::new()
        .start(s)
        .production(s, [Word::from(t("a")), Word::from(m), Word::from(t("b"))], 1.0)
        .production(m, [], 1.0)
        .production(m, [Word::from(t("m"))], 1.0)
        .build()
        .unwrap();
    let parser = EarleyParser::new(&grammar);

    let p_skip = parser.parse_probability(&Sentence::from_letters("ab")).unwrap();
    let p_mid = parser.parse_probability(&Sentence::from_letters("amb")).unwrap();
    assert!((p_skip - 0.5).abs() < 1e-12);
    assert!((p_mid - 0.5).abs() < 1e-12);
    assert_eq!(parser.parse_probability(&Sentence::from_letters("amm")).unwrap(), 0.0);
}
