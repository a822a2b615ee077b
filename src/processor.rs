use std::borrow::Cow;
use std::error;
use std::fmt;

use log::*;

use crate::machine::Machine;
use crate::program::Program;

mod ops;

/// Ways a running program can fail. Every one of them is fatal and halts the
/// machine with its state intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    UnknownInstruction,
    OperandCount,
    InvalidRegister,
    InvalidAddress,
    InvalidValue,
    UnresolvedLabel,
    StackOverflow,
    StackUnderflow,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::UnknownInstruction => f.write_str("unknown instruction"),
            FaultKind::OperandCount => f.write_str("wrong number of operands"),
            FaultKind::InvalidRegister => f.write_str("register out of range"),
            FaultKind::InvalidAddress => f.write_str("memory address out of range"),
            FaultKind::InvalidValue => f.write_str("invalid numeric literal"),
            FaultKind::UnresolvedLabel => f.write_str("label not found"),
            FaultKind::StackOverflow => f.write_str("stack overflow"),
            FaultKind::StackUnderflow => f.write_str("stack underflow"),
        }
    }
}

/// A fatal execution fault, reported with the instruction index it occurred
/// at and the offending token where one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    kind: FaultKind,
    context: Option<Cow<'static, str>>,
    pc: usize,
}

impl Fault {
    fn new<C, S>(kind: FaultKind, context: C) -> Self
    where
        C: Into<Option<S>>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into().map(|inner| inner.into()),
            pc: 0,
        }
    }

    fn at(mut self, pc: usize) -> Self {
        self.pc = pc;
        self
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn pc(&self) -> usize {
        self.pc
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "fault [pc: {}]: {} - {}", self.pc, self.kind, context)
        } else {
            write!(f, "fault [pc: {}]: {}", self.pc, self.kind)
        }
    }
}

impl error::Error for Fault {}

/// Whether a handler left the program counter for the engine to advance, or
/// already transferred control itself. Every control-transfer handler sets
/// the PC to the label's raw index and reports [`Flow::Jump`]; a not-taken
/// conditional reports [`Flow::Advance`] like any other instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Normal sequencing: the engine advances the PC by one.
    Advance,
    /// The handler set the PC to its target already.
    Jump,
}

/// Executes an assembled [`Program`] against a [`Machine`].
#[derive(Debug, Clone)]
pub struct Processor {
    program: Program,
}

impl Processor {
    pub fn new(program: Program) -> Self {
        Self { program }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Runs a single fetch-decode-execute step. Stepping past the end of the
    /// program halts the machine.
    pub fn execute(&self, machine: &mut Machine) -> Result<(), Fault> {
        let line = match self.program.line(machine.pc) {
            Some(line) => line,
            None => {
                debug!("pc {} past end of program", machine.pc);
                machine.halt = true;
                return Ok(());
            }
        };

        let instruction = match line.instruction {
            Some(instruction) => instruction,
            None => {
                return Err(
                    Fault::new(FaultKind::UnknownInstruction, format!("`{}`", line.mnemonic))
                        .at(machine.pc),
                );
            }
        };

        match self.execute_instruction(machine, instruction, &line.operands) {
            Ok(Flow::Advance) => {
                machine.pc += 1;
                Ok(())
            }
            Ok(Flow::Jump) => Ok(()),
            Err(fault) => Err(fault.at(machine.pc)),
        }
    }

    /// Runs until the program ends, the machine halts, or a fault occurs.
    /// Faults never propagate past the loop: the fault is logged and returned
    /// as a value, and the caller keeps the final machine state either way.
    pub fn execute_until_halt(&self, machine: &mut Machine) -> Option<Fault> {
        while !machine.halt && machine.pc < self.program.len() {
            if let Err(fault) = self.execute(machine) {
                error!("{}", fault);
                machine.halt = true;
                return Some(fault);
            }
        }

        info!(
            "program terminated at pc {}, accumulator {} (0x{:02X})",
            machine.pc, machine.accumulator, machine.accumulator
        );
        None
    }
}
