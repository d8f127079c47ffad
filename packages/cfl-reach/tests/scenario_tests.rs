//! End-to-end scenarios: text inputs through simplification and solving

mod common;

use cfl_reach::config::{SolverConfig, SolverVariant};
use cfl_reach::features::cfl::application::{run_analysis, AliasAnalysis, GenericCfl, ValueFlowAnalysis};
use cfl_reach::features::cfl::domain::Grammar;
use cfl_reach::features::cfl::infrastructure::{write_pairs, EdgeListReader, GrammarFile, GraphFile};
use cfl_reach::features::cfl::ports::CflAnalysis;
use common::{plain_seeds, seeds, solve};
use pretty_assertions::assert_eq;
use std::fs;

#[test]
fn test_chain_closure_any_variant() {
    let grammar = Grammar::parse("a\ta\ta\n").unwrap();
    let a = grammar.symbol_id("a").unwrap();
    let input = plain_seeds(&grammar, "a", &[(1, 2), (2, 3)]);

    for variant in SolverVariant::ALL {
        let result = solve(&grammar, &input, variant);
        assert_eq!(result.pairs(a), vec![(1, 2), (1, 3), (2, 3)], "{}", variant.as_str());
        assert_eq!(result.stats.total_edges, 3);
    }
}

#[test]
fn test_bracket_matching_self_alias() {
    // V ::= ε | M ; M ::= a V abar
    let grammar = Grammar::parse("V\nV\tM\nM\ta\tV\tabar\n").unwrap();
    let v = grammar.symbol_id("V").unwrap();
    let m = grammar.symbol_id("M").unwrap();
    let input = seeds(&grammar, &[(1, 2, "a", 0), (2, 1, "abar", 0)]);

    for variant in SolverVariant::ALL {
        let result = solve(&grammar, &input, variant);
        assert_eq!(result.pairs(v), vec![(1, 1), (2, 2)], "{}", variant.as_str());
        // a(1,2) V(2,2) abar(2,1) closes back on node 1
        assert_eq!(result.pairs(m), vec![(1, 1)], "{}", variant.as_str());
    }
}

#[test]
fn test_direct_cycle_collapses_before_solving() {
    let grammar = Grammar::parse("a\ta\ta\n").unwrap();
    let text = "1\t2\ta\n2\t3\ta\n3\t1\ta\n3\t4\ta\n";
    let direct = vec!["a".to_string()];

    for variant in SolverVariant::ALL {
        let mut analysis = GenericCfl::from_edge_list(grammar.clone(), text, &direct).unwrap();
        let config = SolverConfig::default().variant(variant).scc(true);
        let run = run_analysis(&mut analysis, &config).unwrap();

        let simplify = run.report.simplify.clone().unwrap();
        assert_eq!(simplify.scc_merged, 2);
        assert_eq!(analysis.graph().num_nodes(), 2);
        assert_eq!(analysis.graph().rep_of(2), 1);
        assert_eq!(analysis.graph().rep_of(3), 1);

        let stats = run.report.solver.as_ref().unwrap();
        assert_eq!(stats.total_edges, 1, "{}", variant.as_str());
        assert_eq!(run.count_pairs(), vec![(1, 4)]);
    }

    // without merging the cycle expands to every pair among its members
    let mut analysis = GenericCfl::from_edge_list(grammar, text, &direct).unwrap();
    let run = run_analysis(&mut analysis, &SolverConfig::default().variant(SolverVariant::Focr)).unwrap();
    assert_eq!(run.report.solver.unwrap().total_edges, 12);
}

#[test]
fn test_generic_files_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let grammar_path = dir.path().join("grammar.txt");
    let graph_path = dir.path().join("graph.txt");
    fs::write(&grammar_path, "# balanced calls\nS\nS\tS\tS\nS\ta\nS\tcall_i\tR_i\nR_i\tS\tret_i\n").unwrap();
    fs::write(
        &graph_path,
        "1\t2\tcall_i\t3\n2\t3\ta\n3\t4\tret_i\t3\n3\t5\tret_i\t9\n5\t6\tunknown\n",
    )
    .unwrap();

    let mut analysis = GenericCfl::load(
        &GrammarFile::new(&grammar_path),
        &GraphFile::new(&graph_path, EdgeListReader::new()),
    )
    .unwrap();
    assert_eq!(analysis.graph().num_edges(), 4);

    let run = run_analysis(&mut analysis, &SolverConfig::default().variant(SolverVariant::Pocr)).unwrap();
    let pairs = run.count_pairs();
    assert!(pairs.contains(&(1, 4)));
    assert!(!pairs.contains(&(1, 5)));

    let out = dir.path().join("pairs.txt");
    fs::write(&out, write_pairs(&pairs)).unwrap();
    let written = fs::read_to_string(&out).unwrap();
    assert_eq!(written.lines().count(), pairs.len());

    let reread = GenericCfl::from_edge_list(analysis.grammar().clone(), &analysis.graph_text(), &[]).unwrap();
    assert_eq!(reread.graph().num_edges(), analysis.graph().num_edges());
}

#[test]
fn test_alias_with_every_simplification() {
    // 2 = 1; 3 = 2; 1 = 3 (assignment cycle); 4 = *1; 5 = *3
    let peg = "1\t2\ta\n2\t3\ta\n3\t1\ta\n1\t4\td\n3\t5\td\n";
    let mut plain = AliasAnalysis::from_peg_str(peg).unwrap();
    let v = plain.alias_symbol();
    let baseline = run_analysis(&mut plain, &SolverConfig::default()).unwrap();
    assert!(baseline.result.as_ref().unwrap().pairs(v).contains(&(4, 5)));

    let mut simplified = AliasAnalysis::from_peg_str(peg).unwrap();
    let config = SolverConfig::default()
        .variant(SolverVariant::Focr)
        .scc(true)
        .fold(true)
        .inter_dyck(true);
    let run = run_analysis(&mut simplified, &config).unwrap();
    let rep4 = simplified.graph().rep_of(4);
    let rep5 = simplified.graph().rep_of(5);
    let pairs = run.result.unwrap().pairs(v);
    assert!(rep4 == rep5 || pairs.contains(&(rep4, rep5)));
    assert!(simplified.graph().num_nodes() < plain.graph().num_nodes());
}

#[test]
fn test_value_flow_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prog.ivfg");
    fs::write(&path, "1\t1\tsrc\n1\t2\tcall_i\t1\n2\t3\ta\n3\t4\tret_i\t1\n3\t5\tret_i\t2\n").unwrap();

    let mut analysis = ValueFlowAnalysis::from_ivfg_file(&path).unwrap();
    assert_eq!(analysis.sources(), vec![1]);
    let run = run_analysis(&mut analysis, &SolverConfig::default().variant(SolverVariant::HierarchicalPocr)).unwrap();
    assert_eq!(run.count_pairs(), vec![(1, 4), (2, 3)]);
}

#[test]
fn test_missing_input_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AliasAnalysis::from_peg_file(&dir.path().join("absent.peg")).unwrap_err();
    assert!(matches!(err, cfl_reach::CflError::Io(_)));
}
