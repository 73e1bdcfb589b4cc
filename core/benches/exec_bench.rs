use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use ignis_core::bytecode::{BaseType, Opcode, OpcodeType};
use ignis_core::exec::memory::SliceMemory;
use ignis_core::exec::{ControlFlow, DefaultOpcodeProvider, ExecContext, Interpreter, RuntimeFunction};
use ignis_core::program::Program;
use ignis_core::rt::Runtime;

fn arithmetic_function(pairs: usize) -> Vec<Opcode> {
    // push; (push; op)*; leaves one cell behind
    let mut ops = vec![Opcode::new(OpcodeType::PushConstant, BaseType::IntConst, 1)];
    for i in 0..pairs {
        ops.push(Opcode::new(OpcodeType::PushConstant, BaseType::IntConst, i as i64));
        let op = match i % 4 {
            0 => OpcodeType::ArithmAdd,
            1 => OpcodeType::ArithmXor,
            2 => OpcodeType::ArithmMul,
            _ => OpcodeType::ArithmSub,
        };
        ops.push(Opcode::new(op, BaseType::U32, 0));
    }
    ops
}

fn bench_straight_line(c: &mut Criterion) {
    let program = Arc::new(Program::new());
    let mut runtime = Runtime::new(program.clone(), Box::new(SliceMemory::little_endian(0x100)));
    let ops = arithmetic_function(50);
    let function = RuntimeFunction::build(&ops, &DefaultOpcodeProvider, &runtime).unwrap();
    let mut flow = ControlFlow::new(program);

    c.bench_function("exec_straight_line_batched", |b| {
        b.iter(|| {
            flow.reset();
            let mut interp = Interpreter::new(&function);
            let mut ctx = ExecContext::new(&mut flow, &mut runtime);
            interp.run(&mut ctx).unwrap();
            black_box(flow.top())
        })
    });

    c.bench_function("exec_straight_line_stepped", |b| {
        b.iter(|| {
            flow.reset();
            let mut interp = Interpreter::new(&function);
            let mut ctx = ExecContext::new(&mut flow, &mut runtime);
            while let ignis_core::exec::StepResult::Continue = interp.step(&mut ctx).unwrap() {}
            black_box(flow.top())
        })
    });
}

fn bench_translation(c: &mut Criterion) {
    let program = Arc::new(Program::new());
    let runtime = Runtime::new(program, Box::new(SliceMemory::little_endian(0x100)));
    let ops = arithmetic_function(200);

    c.bench_function("translate_200_pairs", |b| {
        b.iter(|| {
            let function = RuntimeFunction::build(black_box(&ops), &DefaultOpcodeProvider, &runtime).unwrap();
            black_box(function.len())
        })
    });
}

criterion_group!(benches, bench_straight_line, bench_translation);
criterion_main!(benches);
