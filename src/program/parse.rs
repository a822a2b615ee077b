//! Assembles the textual instruction language:
//!
//! ```text
//! ; count down from three
//!         LDI 3
//! LOOP:   DEC
//!         JNZ LOOP
//!         HLT
//! ```

use std::collections::HashMap;
use std::str::Lines;

use crate::instruction::Instruction;

use super::{Line, Program};

/// Comments run from this marker to the end of the line.
const COMMENT: char = ';';
/// Separates a label from the instruction that follows it.
const LABEL: char = ':';

/// Builds a [`Program`] from source text in a single sweep: strip comments,
/// register each label at the index of the instruction that follows it,
/// decode what remains. No semantic validation happens here; unknown
/// mnemonics and bad operands fault at execution time.
#[derive(Debug, Clone)]
pub struct Loader<'a> {
    lines: Lines<'a>,
    line_nr: usize,
    decoded: Vec<Line>,
    labels: HashMap<String, usize>,
}

impl<'a> Loader<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            line_nr: 0,
            decoded: Vec::new(),
            labels: HashMap::new(),
        }
    }

    /// Consumes `self` and assembles every source line.
    pub fn load(mut self) -> Program {
        while self.load_next_line() {}

        log::info!(
            "loaded {} instructions, {} labels",
            self.decoded.len(),
            self.labels.len()
        );

        Program {
            lines: self.decoded,
            labels: self.labels,
        }
    }

    /// Processes the next source line. Returns `false` once the input is
    /// exhausted.
    fn load_next_line(&mut self) -> bool {
        let line = match self.lines.next() {
            Some(line) => line,
            None => return false,
        };
        self.line_nr += 1;

        let mut line = match line.find(COMMENT) {
            Some(at) => &line[..at],
            None => line,
        };
        line = line.trim();

        if line.is_empty() {
            return true;
        }

        // NOTE takes the rest of the line verbatim, so a colon inside its
        // message is not a label delimiter.
        if !starts_with_note(line) {
            if let Some(at) = line.find(LABEL) {
                let label = line[..at].trim();
                let index = self.decoded.len();
                if let Some(previous) = self.labels.insert(label.to_string(), index) {
                    log::warn!(
                        "[{}] label `{}` redefined (was instruction {})",
                        self.line_nr,
                        label,
                        previous
                    );
                }
                log::debug!("[{}] label `{}` at instruction {}", self.line_nr, label, index);

                line = line[at + 1..].trim();
                if line.is_empty() {
                    return true;
                }
            }
        }

        let decoded = decode(line);
        log::debug!(
            "[{}] instruction {}: {}",
            self.line_nr,
            self.decoded.len(),
            decoded.text
        );
        self.decoded.push(decoded);
        true
    }
}

fn starts_with_note(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() >= 4 && bytes[..4].eq_ignore_ascii_case(b"NOTE")
}

/// Splits a stripped line into its mnemonic and operand tokens, resolving
/// the mnemonic against the instruction table once.
fn decode(line: &str) -> Line {
    let mut parts = line.splitn(2, char::is_whitespace);
    let mnemonic = parts.next().unwrap_or_default().to_string();
    let rest = parts.next().unwrap_or("").trim();
    let instruction = Instruction::from_mnemonic(&mnemonic);

    let operands = if instruction == Some(Instruction::NOTE) {
        if rest.is_empty() {
            Vec::new()
        } else {
            vec![rest.to_string()]
        }
    } else {
        rest.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    };

    Line {
        text: line.to_string(),
        mnemonic,
        instruction,
        operands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_strips_comments_and_blanks() -> Result<()> {
        let program = Program::from_source(
            "; a full-line comment\n\n  LDI 3 ; trailing comment\n   \nHLT\n",
        );

        assert_eq!(program.len(), 2);
        assert_eq!(program.line(0).unwrap().text, "LDI 3");
        assert_eq!(program.line(1).unwrap().text, "HLT");

        Ok(())
    }

    #[test]
    fn test_label_points_at_following_instruction() -> Result<()> {
        let program = Program::from_source("JMP END\nNOP\nEND: HLT\n");

        assert_eq!(program.len(), 3);
        assert_eq!(program.label("END"), Some(2));
        assert_eq!(program.line(2).unwrap().instruction, Some(Instruction::HLT));

        Ok(())
    }

    #[test]
    fn test_label_on_its_own_line() -> Result<()> {
        let program = Program::from_source("LOOP:\nDEC\nJNZ LOOP\n");

        // the label line consumes no index
        assert_eq!(program.len(), 2);
        assert_eq!(program.label("LOOP"), Some(0));
        assert_eq!(program.line(0).unwrap().instruction, Some(Instruction::DEC));

        Ok(())
    }

    #[test]
    fn test_trailing_label() -> Result<()> {
        let program = Program::from_source("JZ DONE\nDONE:\n");

        assert_eq!(program.len(), 1);
        assert_eq!(program.label("DONE"), Some(1));

        Ok(())
    }

    #[test]
    fn test_note_keeps_its_colon() -> Result<()> {
        let program = Program::from_source("NOTE counter: {R1}\n");

        assert_eq!(program.len(), 1);
        assert_eq!(program.label_count(), 0);
        let line = program.line(0).unwrap();
        assert_eq!(line.instruction, Some(Instruction::NOTE));
        assert_eq!(line.operands, vec!["counter: {R1}".to_string()]);

        Ok(())
    }

    #[test]
    fn test_duplicate_label_last_wins() -> Result<()> {
        let program = Program::from_source("X: NOP\nX: HLT\n");

        assert_eq!(program.label("X"), Some(1));

        Ok(())
    }

    #[test]
    fn test_operands_split_on_commas_and_whitespace() -> Result<()> {
        let program = Program::from_source("LDRI R1, 5\nMOV R1 , A\nLDR R2 0x20\n");

        assert_eq!(program.line(0).unwrap().operands, vec!["R1", "5"]);
        assert_eq!(program.line(1).unwrap().operands, vec!["R1", "A"]);
        assert_eq!(program.line(2).unwrap().operands, vec!["R2", "0x20"]);

        Ok(())
    }

    #[test]
    fn test_mnemonic_case_is_ignored() -> Result<()> {
        let program = Program::from_source("ldi 3\nhlt\n");

        assert_eq!(program.line(0).unwrap().instruction, Some(Instruction::LDI));
        assert_eq!(program.line(1).unwrap().instruction, Some(Instruction::HLT));

        Ok(())
    }

    #[test]
    fn test_unknown_mnemonic_is_kept_for_execution() -> Result<()> {
        let program = Program::from_source("FOO 1, 2\nHLT\n");

        let line = program.line(0).unwrap();
        assert_eq!(line.instruction, None);
        assert_eq!(line.mnemonic, "FOO");
        assert_eq!(line.operands, vec!["1", "2"]);

        Ok(())
    }
}
