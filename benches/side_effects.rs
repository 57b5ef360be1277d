//! Benchmarks for the side-effect analysis.
//!
//! Measures:
//! - Opcode classification over the complete opcode set
//! - Instruction classification with deferred field and invocation lookups
//! - The full analysis of a synthetic program with long invocation chains

extern crate classfacts;

use classfacts::{
    analysis::{AnalysisConfig, FactStore, OptimizationInfoAnalyzer, SideEffectInstructionChecker},
    classfile::{AccessFlags, ClassBuilder, ClassPool, Opcode},
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

const CHAIN_LENGTH: usize = 200;

/// A program where `step0` invokes `step1` and so on, the last step writing a static field.
fn chain_program() -> ClassPool {
    let mut pool = ClassPool::new();
    pool.add(ClassBuilder::new("java/lang/Object").library().build().unwrap())
        .unwrap();

    let mut chain = ClassBuilder::new("bench/Chain")
        .field("sink", "I", AccessFlags::PRIVATE | AccessFlags::STATIC);
    for step in 0..CHAIN_LENGTH {
        let name = format!("step{step}");
        let next = format!("step{}", step + 1);
        chain = chain.method(&name, "(I)I", AccessFlags::STATIC, |code| {
            code.iload(0).push_int(31).op(Opcode::Imul);
            if step + 1 < CHAIN_LENGTH {
                code.invokestatic("bench/Chain", &next, "(I)I");
            } else {
                code.dup()
                    .getstatic("bench/Chain", "sink", "I")
                    .op(Opcode::Iadd)
                    .putstatic("bench/Chain", "sink", "I");
            }
            code.op(Opcode::Ireturn);
            Ok(())
        });
    }
    pool.add(chain.build().unwrap()).unwrap();
    pool.link().unwrap();
    pool
}

/// Benchmark classifying every opcode without looking at operands.
fn bench_classify_opcodes(c: &mut Criterion) {
    let checker = SideEffectInstructionChecker::new(false, true, true);
    let opcodes: Vec<Opcode> = (0u8..=0xc9).filter_map(Opcode::from_repr).collect();

    c.bench_function("classify_all_opcodes", |b| {
        b.iter(|| {
            opcodes
                .iter()
                .filter(|opcode| checker.classify(black_box(**opcode)) == Some(true))
                .count()
        });
    });
}

/// Benchmark classifying the instructions of one method body against attached facts.
fn bench_check_instructions(c: &mut Criterion) {
    let pool = chain_program();
    let store = FactStore::initialize(&pool, false).unwrap();
    let class = pool.class_by_name("bench/Chain").unwrap();
    let last = class
        .method(&format!("step{}", CHAIN_LENGTH - 1), "(I)I")
        .unwrap();
    let instructions = &last.code.as_ref().unwrap().instructions;

    c.bench_function("check_instructions", |b| {
        b.iter(|| {
            let mut checker = SideEffectInstructionChecker::new(false, true, false);
            instructions
                .iter()
                .filter(|instruction| {
                    checker
                        .has_side_effects(&pool, &store, class, black_box(instruction))
                        .unwrap()
                })
                .count()
        });
    });
}

/// Benchmark the complete analysis, sequential and parallel.
fn bench_analyze_chain(c: &mut Criterion) {
    let pool = chain_program();

    c.bench_function("analyze_chain_sequential", |b| {
        let analyzer = OptimizationInfoAnalyzer::new(AnalysisConfig::sequential());
        b.iter(|| black_box(analyzer.analyze(&pool).unwrap()));
    });
    c.bench_function("analyze_chain_parallel", |b| {
        let analyzer = OptimizationInfoAnalyzer::new(AnalysisConfig::default());
        b.iter(|| black_box(analyzer.analyze(&pool).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_classify_opcodes,
    bench_check_instructions,
    bench_analyze_chain
);
criterion_main!(benches);
