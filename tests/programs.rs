//! End-to-end programs run through the assembler and the processor.

use sap3::machine::Machine;
use sap3::processor::{Fault, FaultKind, Processor};
use sap3::program::Program;

fn run(source: &str) -> (Machine, Option<Fault>) {
    let processor = Processor::new(Program::from_source(source));
    let mut machine = Machine::default();
    let fault = processor.execute_until_halt(&mut machine);
    (machine, fault)
}

#[test]
fn test_increment_through_register_outputs_six() {
    let (machine, fault) = run("LDRI R1, 5\nMOV R1, A\nINC\nOUT\nHLT\n");

    assert!(fault.is_none());
    assert_eq!(machine.output, vec![6]);
    assert_eq!(machine.accumulator, 6);
    assert!(machine.halt);
}

#[test]
fn test_countdown_loop_runs_three_times() {
    let source = "\
; count down from three
        LDI 3
LOOP:   DEC
        OUT
        JNZ LOOP
        HLT
";
    let (machine, fault) = run(source);

    assert!(fault.is_none());
    // one OUT per iteration
    assert_eq!(machine.output, vec![2, 1, 0]);
    assert_eq!(machine.accumulator, 0);
    assert!(machine.flags.zero);
}

#[test]
fn test_store_past_memory_faults_without_writing() {
    let (machine, fault) = run("LDI 7\nSTA 600\nHLT\n");

    let fault = fault.expect("store past memory must fault");
    assert_eq!(fault.kind(), FaultKind::InvalidAddress);
    assert_eq!(fault.pc(), 1);
    assert!(machine.halt);
    assert!(machine.memory.iter().all(|&byte| byte == 0));
}

#[test]
fn test_unknown_opcode_keeps_prior_state() {
    let (machine, fault) = run("LDRI R2, 9\nFOO\nLDRI R3, 1\n");

    let fault = fault.expect("FOO must fault");
    assert_eq!(fault.kind(), FaultKind::UnknownInstruction);
    assert_eq!(fault.pc(), 1);
    assert_eq!(machine.registers[2], 9);
    assert_eq!(machine.registers[3], 0);
}

#[test]
fn test_add_with_carry_branch() {
    let source = "\
        LDI 200
        LDRI R0, 100
        ADD R0
        JC OVERFLOW
        LDRI R1, 1      ; not reached
        HLT
OVERFLOW:
        LDRI R1, 2
        HLT
";
    let (machine, fault) = run(source);

    assert!(fault.is_none());
    assert_eq!(machine.accumulator, 44);
    assert!(machine.flags.carry);
    assert_eq!(machine.registers[1], 2);
}

#[test]
fn test_stack_survives_accumulator_clobber() {
    let source = "\
        LDI 42
        PUSH
        LDI 0
        POP
        OUT
        HLT
";
    let (machine, fault) = run(source);

    assert!(fault.is_none());
    assert_eq!(machine.output, vec![42]);
    assert_eq!(machine.sp, 511);
}

#[test]
fn test_jump_to_missing_label_faults() {
    let (machine, fault) = run("JMP NOWHERE\nHLT\n");

    let fault = fault.expect("unresolved label must fault");
    assert_eq!(fault.kind(), FaultKind::UnresolvedLabel);
    assert_eq!(fault.pc(), 0);
    assert!(machine.halt);
}

#[test]
fn test_note_reports_live_values() {
    let source = "\
        LDRI R1, 5
        LDI 9
        NOTE r1 is {R1} and acc is {A}
        HLT
";
    let (machine, fault) = run(source);

    assert!(fault.is_none());
    assert_eq!(machine.notes, vec!["r1 is 5 and acc is 9".to_string()]);
}

#[test]
fn test_memory_arithmetic_round_trip() {
    let source = "\
; sum two cells seeded through the accumulator
        LDI 20
        STA 0x40
        LDI 30
        STA 0x41
        LDA 0x40
        ADD 0x41
        OUT
        HLT
";
    let (machine, fault) = run(source);

    assert!(fault.is_none());
    assert_eq!(machine.output, vec![50]);
    assert_eq!(machine.memory[0x40], 20);
    assert_eq!(machine.memory[0x41], 30);
}
