use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::instruction::Instruction;

pub mod parse;

/// A single decoded instruction line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// The comment- and label-stripped source text, kept for diagnostics.
    pub text: String,
    /// The mnemonic token as written.
    pub mnemonic: String,
    /// Table resolution of the mnemonic. `None` faults when executed, not
    /// when loaded.
    pub instruction: Option<Instruction>,
    /// Operand tokens. For NOTE this is the single raw remainder of the line.
    pub operands: Vec<String>,
}

/// An assembled program: the ordered decoded lines plus the label table.
/// Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    lines: Vec<Line>,
    labels: HashMap<String, usize>,
}

impl Program {
    /// Assembles program text. Unknown mnemonics and malformed operands are
    /// deferred to execution, so this cannot fail.
    pub fn from_source(source: &str) -> Self {
        parse::Loader::new(source).load()
    }

    /// Reads and assembles a program file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let source = fs::read_to_string(path)?;
        Ok(Self::from_source(&source))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The decoded line at `index`, if any. Index space is one-to-one with
    /// the program counter.
    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    /// Resolves a label to the index of the instruction following it.
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_from_source() -> Result<()> {
        let program = Program::from_source("LDI 3\nHLT\n");

        assert_eq!(program.len(), 2);
        assert!(!program.is_empty());
        assert_eq!(program.line(0).unwrap().instruction, Some(Instruction::LDI));
        assert_eq!(program.line(1).unwrap().instruction, Some(Instruction::HLT));
        assert!(program.line(2).is_none());

        Ok(())
    }

    #[test]
    fn test_empty_source() -> Result<()> {
        let program = Program::from_source("");

        assert!(program.is_empty());
        assert_eq!(program.label_count(), 0);

        Ok(())
    }
}
