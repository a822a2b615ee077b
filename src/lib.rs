//! A SAP-3 style 8-bit CPU simulator.
//!
//! Programs are written in a small human-readable instruction language,
//! assembled by [`Program`] into a decoded line sequence plus a label table,
//! and executed by [`Processor`] against a [`Machine`]: 512 bytes of memory,
//! 16 general-purpose registers, an accumulator, a descending stack and
//! carry/zero condition flags.

pub mod instruction;
pub mod machine;
pub mod processor;
pub mod program;

pub use instruction::Instruction;
pub use machine::Machine;
pub use processor::{Fault, FaultKind, Flow, Processor};
pub use program::Program;
