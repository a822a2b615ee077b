use log::*;

use crate::instruction::Instruction;
use crate::machine::{Byte, Machine, MEMORY_SIZE, REGISTER_COUNT};

use super::{Fault, FaultKind, Flow, Processor};

/// Operand token naming the accumulator as a MOV endpoint.
const ACCUMULATOR: &str = "A";

/// Value returned by INP until a real input device exists.
const INPUT: Byte = 0;

impl Processor {
    /// Dispatches one decoded instruction to its handler. Handlers validate
    /// operand count and ranges themselves and mutate the machine directly;
    /// the returned [`Flow`] tells the engine whether the PC is already set.
    pub fn execute_instruction(
        &self,
        machine: &mut Machine,
        instruction: Instruction,
        operands: &[String],
    ) -> Result<Flow, Fault> {
        use Instruction::*;

        match instruction {
            NOP => {
                expect_operands(NOP, operands, 0)?;
                debug!("NOP");
                Ok(Flow::Advance)
            }
            LDA => self.lda(machine, operands),
            STA => self.sta(machine, operands),
            LDR => self.ldr(machine, operands),
            STR => self.str(machine, operands),
            LDRI => self.ldri(machine, operands),
            LDI => self.ldi(machine, operands),
            MOV => self.mov(machine, operands),
            ADD => self.add(machine, operands),
            SUB | AND | OR | XOR => self.alu(machine, operands, instruction),
            JMP | JG | JZ | JNZ | JC | JNC => self.jump(machine, operands, instruction),
            CMA | INC | DEC | RAL | RAR => self.unary(machine, operands, instruction),
            INP => self.inp(machine, operands),
            OUT => self.out(machine, operands),
            HLT => {
                expect_operands(HLT, operands, 0)?;
                machine.halt = true;
                debug!("HLT");
                Ok(Flow::Advance)
            }
            PUSH => self.push(machine, operands),
            POP => self.pop(machine, operands),
            NOTE => self.note(machine, operands),
        }
    }

    fn lda(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        expect_operands(Instruction::LDA, operands, 1)?;
        let address = parse_address(&operands[0])?;

        machine.accumulator = machine.memory[address];
        machine.update_zero();

        debug!("LDA 0x{:03X}: {}", address, machine.accumulator);
        Ok(Flow::Advance)
    }

    fn sta(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        expect_operands(Instruction::STA, operands, 1)?;
        let address = parse_address(&operands[0])?;

        machine.memory[address] = machine.accumulator;

        debug!("STA 0x{:03X}: {}", address, machine.accumulator);
        Ok(Flow::Advance)
    }

    fn ldr(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        expect_operands(Instruction::LDR, operands, 2)?;
        let register = parse_register(&operands[0])?;
        let address = parse_address(&operands[1])?;

        machine.registers[register] = machine.memory[address];

        debug!("LDR R{} 0x{:03X}: {}", register, address, machine.registers[register]);
        Ok(Flow::Advance)
    }

    fn str(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        expect_operands(Instruction::STR, operands, 2)?;
        let register = parse_register(&operands[0])?;
        let address = parse_address(&operands[1])?;

        machine.memory[address] = machine.registers[register];

        debug!("STR R{} 0x{:03X}: {}", register, address, machine.memory[address]);
        Ok(Flow::Advance)
    }

    fn ldri(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        expect_operands(Instruction::LDRI, operands, 2)?;
        let register = parse_register(&operands[0])?;
        let value = parse_value(&operands[1])?;

        machine.registers[register] = value;

        debug!("LDRI R{}: {}", register, value);
        Ok(Flow::Advance)
    }

    fn ldi(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        expect_operands(Instruction::LDI, operands, 1)?;
        let value = parse_value(&operands[0])?;

        machine.accumulator = value;

        debug!("LDI: {}", value);
        Ok(Flow::Advance)
    }

    /// Copies between two registers, or between a register and the
    /// accumulator when one endpoint is the `A` sentinel. Source first,
    /// destination second.
    fn mov(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        expect_operands(Instruction::MOV, operands, 2)?;
        let source = &operands[0];
        let destination = &operands[1];

        if destination.eq_ignore_ascii_case(ACCUMULATOR) {
            let register = parse_register(source)?;
            machine.accumulator = machine.registers[register];
        } else if source.eq_ignore_ascii_case(ACCUMULATOR) {
            let register = parse_register(destination)?;
            machine.registers[register] = machine.accumulator;
        } else {
            let from = parse_register(source)?;
            let to = parse_register(destination)?;
            machine.registers[to] = machine.registers[from];
        }

        debug!("MOV {} {}", source, destination);
        Ok(Flow::Advance)
    }

    /// ADD takes either a register or a memory address. The sum wraps to
    /// 8 bits; Carry records whether it exceeded 255, Zero is recomputed.
    fn add(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        expect_operands(Instruction::ADD, operands, 1)?;
        let token = &operands[0];

        let operand = if token.starts_with('R') || token.starts_with('r') {
            machine.registers[parse_register(token)?]
        } else {
            machine.memory[parse_address(token)?]
        };

        let sum = machine.accumulator as u16 + operand as u16;
        machine.flags.carry = sum > 0xFF;
        machine.accumulator = sum as Byte;
        machine.update_zero();

        debug!(
            "ADD {}: {} carry={}",
            token, machine.accumulator, machine.flags.carry
        );
        Ok(Flow::Advance)
    }

    /// SUB, AND, OR and XOR combine the accumulator with a memory cell.
    /// They recompute Zero and leave Carry untouched.
    fn alu(
        &self,
        machine: &mut Machine,
        operands: &[String],
        instruction: Instruction,
    ) -> Result<Flow, Fault> {
        expect_operands(instruction, operands, 1)?;
        let address = parse_address(&operands[0])?;
        let operand = machine.memory[address];

        machine.accumulator = match instruction {
            Instruction::SUB => machine.accumulator.wrapping_sub(operand),
            Instruction::AND => machine.accumulator & operand,
            Instruction::OR => machine.accumulator | operand,
            Instruction::XOR => machine.accumulator ^ operand,
            _ => unreachable!("not a memory ALU instruction"),
        };
        machine.update_zero();

        debug!("{} 0x{:03X}: {}", instruction, address, machine.accumulator);
        Ok(Flow::Advance)
    }

    /// All control transfers share one PC rule: a taken jump sets the PC to
    /// the label's index and reports [`Flow::Jump`]; a not-taken one falls
    /// through with a normal advance. The target must resolve either way.
    fn jump(
        &self,
        machine: &mut Machine,
        operands: &[String],
        instruction: Instruction,
    ) -> Result<Flow, Fault> {
        expect_operands(instruction, operands, 1)?;
        let label = &operands[0];
        let target = self
            .program()
            .label(label)
            .ok_or_else(|| Fault::new(FaultKind::UnresolvedLabel, format!("`{}`", label)))?;

        let taken = match instruction {
            Instruction::JMP => true,
            Instruction::JG => machine.accumulator > 0,
            Instruction::JZ => machine.flags.zero,
            Instruction::JNZ => !machine.flags.zero,
            Instruction::JC => machine.flags.carry,
            Instruction::JNC => !machine.flags.carry,
            _ => unreachable!("not a control-transfer instruction"),
        };

        if taken {
            machine.pc = target;
            debug!("{} {} -> {}", instruction, label, target);
            Ok(Flow::Jump)
        } else {
            debug!("{} {}: not taken", instruction, label);
            Ok(Flow::Advance)
        }
    }

    /// CMA, INC, DEC, RAL and RAR operate on the accumulator alone and
    /// recompute Zero. Rotates are circular and do not touch Carry.
    fn unary(
        &self,
        machine: &mut Machine,
        operands: &[String],
        instruction: Instruction,
    ) -> Result<Flow, Fault> {
        expect_operands(instruction, operands, 0)?;

        machine.accumulator = match instruction {
            Instruction::CMA => !machine.accumulator,
            Instruction::INC => machine.accumulator.wrapping_add(1),
            Instruction::DEC => machine.accumulator.wrapping_sub(1),
            Instruction::RAL => machine.accumulator.rotate_left(1),
            Instruction::RAR => machine.accumulator.rotate_right(1),
            _ => unreachable!("not a unary accumulator instruction"),
        };
        machine.update_zero();

        debug!("{}: {}", instruction, machine.accumulator);
        Ok(Flow::Advance)
    }

    fn inp(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        expect_operands(Instruction::INP, operands, 0)?;

        machine.accumulator = INPUT;
        machine.update_zero();

        debug!("INP: {}", machine.accumulator);
        Ok(Flow::Advance)
    }

    /// Emits the accumulator, or a register when one is named. The value is
    /// recorded on the machine and logged; nothing else changes.
    fn out(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        let value = match operands {
            [] => machine.accumulator,
            [register] => machine.registers[parse_register(register)?],
            _ => {
                return Err(Fault::new(
                    FaultKind::OperandCount,
                    format!("OUT takes at most one operand, found {}", operands.len()),
                ));
            }
        };

        machine.output.push(value);
        info!("{}", value);
        Ok(Flow::Advance)
    }

    fn push(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        expect_operands(Instruction::PUSH, operands, 0)?;
        if machine.sp == 0 {
            return Err(Fault::new(
                FaultKind::StackOverflow,
                "stack pointer at the bottom of memory",
            ));
        }

        machine.memory[machine.sp] = machine.accumulator;
        machine.sp -= 1;

        debug!("PUSH {}: sp {}", machine.accumulator, machine.sp);
        Ok(Flow::Advance)
    }

    fn pop(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        expect_operands(Instruction::POP, operands, 0)?;
        if machine.sp >= MEMORY_SIZE - 1 {
            return Err(Fault::new(
                FaultKind::StackUnderflow,
                "stack pointer at the top of memory",
            ));
        }

        machine.sp += 1;
        machine.accumulator = machine.memory[machine.sp];
        machine.update_zero();

        debug!("POP {}: sp {}", machine.accumulator, machine.sp);
        Ok(Flow::Advance)
    }

    /// Renders the message template with live machine values and emits it.
    /// A diagnostic aid, not a real instruction: flags and sequencing are
    /// those of a normal step.
    fn note(&self, machine: &mut Machine, operands: &[String]) -> Result<Flow, Fault> {
        let template = match operands.first() {
            Some(template) => template,
            None => {
                return Err(Fault::new(FaultKind::OperandCount, "NOTE needs a message"));
            }
        };

        let message = render_note(machine, strip_quotes(template));
        info!("note: {}", message);
        machine.notes.push(message);
        Ok(Flow::Advance)
    }
}

fn expect_operands(
    instruction: Instruction,
    operands: &[String],
    count: usize,
) -> Result<(), Fault> {
    if operands.len() != count {
        return Err(Fault::new(
            FaultKind::OperandCount,
            format!(
                "{} takes {} operands, found {}",
                instruction,
                count,
                operands.len()
            ),
        ));
    }
    Ok(())
}

/// Parses a register token such as `R3`, validating the index range.
fn parse_register(token: &str) -> Result<usize, Fault> {
    let index = token
        .strip_prefix('R')
        .or_else(|| token.strip_prefix('r'))
        .and_then(|index| index.parse::<usize>().ok())
        .ok_or_else(|| {
            Fault::new(
                FaultKind::InvalidRegister,
                format!("`{}` is not a register", token),
            )
        })?;

    if index >= REGISTER_COUNT {
        return Err(Fault::new(
            FaultKind::InvalidRegister,
            format!("`{}`: registers are R0 to R{}", token, REGISTER_COUNT - 1),
        ));
    }
    Ok(index)
}

/// Parses a memory address, `0x`-prefixed hexadecimal or bare decimal,
/// validating it against the memory size.
fn parse_address(token: &str) -> Result<usize, Fault> {
    let parsed = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => token.parse::<usize>(),
    };
    let address = parsed.map_err(|_| {
        Fault::new(
            FaultKind::InvalidValue,
            format!("`{}` is not an address", token),
        )
    })?;

    if address >= MEMORY_SIZE {
        return Err(Fault::new(
            FaultKind::InvalidAddress,
            format!("address {} is outside memory (0 to {})", address, MEMORY_SIZE - 1),
        ));
    }
    Ok(address)
}

/// Parses an immediate value, masked to 8 bits.
fn parse_value(token: &str) -> Result<Byte, Fault> {
    token
        .parse::<i64>()
        .map(|value| (value & 0xFF) as Byte)
        .map_err(|_| {
            Fault::new(
                FaultKind::InvalidValue,
                format!("`{}` is not a number", token),
            )
        })
}

fn strip_quotes(template: &str) -> &str {
    template
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(template)
}

/// Substitutes `{R<n>}`, `{A}` and `{0xNN}` placeholders with live register,
/// accumulator and memory values. Unknown placeholders are left as written.
fn render_note(machine: &Machine, template: &str) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) => {
                let token = &after[..close];
                match placeholder_value(machine, token) {
                    Some(value) => rendered.push_str(&value.to_string()),
                    None => {
                        rendered.push('{');
                        rendered.push_str(token);
                        rendered.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                rendered.push_str(&rest[open..]);
                return rendered;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

/// The machine value a placeholder refers to: the accumulator, a register,
/// or a `0x`-prefixed memory cell.
fn placeholder_value(machine: &Machine, token: &str) -> Option<Byte> {
    if token.eq_ignore_ascii_case(ACCUMULATOR) {
        return Some(machine.accumulator);
    }
    if let Ok(register) = parse_register(token) {
        return Some(machine.registers[register]);
    }
    if token.starts_with("0x") || token.starts_with("0X") {
        if let Ok(address) = parse_address(token) {
            return Some(machine.memory[address]);
        }
    }
    None
}
