use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sipha_ambiguity::atn::AltSet;
use sipha_ambiguity::config::{GridConfig, InterpreterConfig};
use sipha_ambiguity::engine::AmbiguityEngine;
use sipha_ambiguity::enumerate::DecisionTarget;
use sipha_ambiguity::grid::{Grid, GridAligner};
use sipha_ambiguity::interpreter::GrammarInterpreter;
use sipha_ambiguity::lookahead::{LookaheadComputer, LookaheadRequest};
use sipha_ambiguity::progress::NoProgress;
use sipha_ambiguity::testing::fixtures;
use sipha_ambiguity::CallContext;
use std::hint::black_box;

fn bench_lookahead(c: &mut Criterion) {
    let grammar = fixtures::dangling_else_grammar();
    let atn = grammar.atn();
    let Some(start) = atn.rule_start(0) else {
        return;
    };

    c.bench_function("lookahead_rule_start", |b| {
        b.iter(|| {
            let request = LookaheadRequest::new(start).with_context(CallContext::empty());
            black_box(LookaheadComputer::new(atn).lookahead(black_box(&request)))
        });
    });
}

fn bench_interpreter(c: &mut Criterion) {
    let grammar = fixtures::expr_grammar();
    let mut group = c.benchmark_group("interpret_expression");

    for operands in [3, 5, 7] {
        let tokens = fixtures::expr_tokens(&grammar, operands);
        group.bench_with_input(BenchmarkId::from_parameter(operands), &tokens, |b, tokens| {
            b.iter(|| {
                let interpreter = GrammarInterpreter::new(&grammar, tokens, InterpreterConfig::default());
                black_box(interpreter.parse(0))
            });
        });
    }
    group.finish();
}

fn bench_analysis(c: &mut Criterion) {
    let grammar = fixtures::expr_grammar();
    let atn = grammar.atn();
    let Some(state) = atn.decision_state(0) else {
        return;
    };
    let mut group = c.benchmark_group("analyze_expression");

    for operands in [3, 4, 5] {
        let tokens = fixtures::expr_tokens(&grammar, operands);
        let target = DecisionTarget {
            rule_index: 0,
            state,
            decision: 0,
            start_index: 0,
            stop_index: tokens.len() - 1,
            conflicting_alternatives: AltSet::from_iter([1, 2]),
        };
        let engine = AmbiguityEngine::new(&grammar);
        group.bench_with_input(BenchmarkId::from_parameter(operands), &tokens, |b, tokens| {
            b.iter(|| black_box(engine.analyze(tokens, black_box(&target), &mut NoProgress)));
        });
    }
    group.finish();
}

fn bench_grid_alignment(c: &mut Criterion) {
    let rows: Vec<Vec<i32>> = (0..16)
        .map(|r| (0..12).map(|c| (r * 7 + c * 3) % 24).collect::<Vec<i32>>())
        .map(|mut row| {
            row.sort_unstable();
            row.dedup();
            row
        })
        .collect();
    let aligner = GridAligner::new(GridConfig::default());

    c.bench_function("grid_align_16_rows", |b| {
        b.iter(|| {
            let Ok(mut grid) = Grid::new(rows.clone(), None) else {
                return;
            };
            black_box(aligner.run(&mut grid)).ok();
        });
    });
}

criterion_group!(
    benches,
    bench_lookahead,
    bench_interpreter,
    bench_analysis,
    bench_grid_alignment
);
criterion_main!(benches);
