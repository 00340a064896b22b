//! Computer: a tiny byte-code interpreter over token and cell memory.
//!
//! Each instruction takes three bytes. The first holds the opcode in its
//! low nibble and the two operand kinds in the upper bits; the other two
//! hold the operand values. Programs are produced by [`compile`].

use thiserror::Error;

use super::{ProcessingContext, ProcessingResult};
use crate::cell::{CELL_MEMORY_SIZE, CellMemory};
use crate::token::Token;

const INSTRUCTION_SIZE: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpCode {
    Mov,
    Add,
    Sub,
    Mul,
    Div,
    Xor,
    Or,
    And,
    IfGreater,
    IfGreaterEqual,
    IfEqual,
    IfNotEqual,
    IfLessEqual,
    IfLess,
    Else,
    EndIf,
}

const OPCODES: [OpCode; 16] = [
    OpCode::Mov,
    OpCode::Add,
    OpCode::Sub,
    OpCode::Mul,
    OpCode::Div,
    OpCode::Xor,
    OpCode::Or,
    OpCode::And,
    OpCode::IfGreater,
    OpCode::IfGreaterEqual,
    OpCode::IfEqual,
    OpCode::IfNotEqual,
    OpCode::IfLessEqual,
    OpCode::IfLess,
    OpCode::Else,
    OpCode::EndIf,
];

impl OpCode {
    fn code(self) -> u8 {
        OPCODES.iter().position(|&op| op == self).unwrap_or(0) as u8
    }

    fn is_condition(self) -> bool {
        matches!(
            self,
            Self::IfGreater
                | Self::IfGreaterEqual
                | Self::IfEqual
                | Self::IfNotEqual
                | Self::IfLessEqual
                | Self::IfLess
        )
    }
}

/// Where an operand value lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// `[a]`: token register `a`.
    Memory(u8),
    /// `[[a]]`: token register addressed by token register `a`.
    MemoryIndirect(u8),
    /// `(a)`: cell memory slot `a`.
    CellMemory(u8),
    /// A literal value.
    Constant(u8),
}

impl Operand {
    fn kind(self) -> u8 {
        match self {
            Self::Memory(_) => 0,
            Self::MemoryIndirect(_) => 1,
            Self::CellMemory(_) => 2,
            Self::Constant(_) => 3,
        }
    }

    fn value(self) -> u8 {
        match self {
            Self::Memory(v) | Self::MemoryIndirect(v) | Self::CellMemory(v) | Self::Constant(v) => v,
        }
    }

    fn decode(kind: u8, value: u8) -> Self {
        match kind & 0b11 {
            0 => Self::Memory(value),
            1 => Self::MemoryIndirect(value),
            2 => Self::CellMemory(value),
            _ => Self::Constant(value),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub op: OpCode,
    pub target: Operand,
    pub source: Operand,
}

impl Instruction {
    fn encode(self) -> [u8; INSTRUCTION_SIZE] {
        [
            self.op.code() | (self.target.kind() << 4) | (self.source.kind() << 6),
            self.target.value(),
            self.source.value(),
        ]
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            op: OPCODES[usize::from(bytes[0] & 0x0F)],
            target: Operand::decode(bytes[0] >> 4, bytes[1]),
            source: Operand::decode(bytes[0] >> 6, bytes[2]),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComputerProgram {
    pub instructions: Vec<Instruction>,
}

/// Memory an executing program reads and writes.
struct Machine<'a> {
    token: &'a mut Token,
    cell: &'a mut CellMemory,
}

impl Machine<'_> {
    fn read(&self, operand: Operand) -> u8 {
        match operand {
            Operand::Memory(a) => self.token.get(usize::from(a)),
            Operand::MemoryIndirect(a) => {
                let address = usize::from(self.token.get(usize::from(a)));
                self.token.get(address)
            }
            Operand::CellMemory(a) => self.cell[usize::from(a) % CELL_MEMORY_SIZE],
            Operand::Constant(v) => v,
        }
    }

    fn write(&mut self, operand: Operand, value: u8) {
        match operand {
            Operand::Memory(a) => self.token.set(usize::from(a), value),
            Operand::MemoryIndirect(a) => {
                let address = usize::from(self.token.get(usize::from(a)));
                self.token.set(address, value);
            }
            Operand::CellMemory(a) => self.cell[usize::from(a) % CELL_MEMORY_SIZE] = value,
            Operand::Constant(_) => {}
        }
    }
}

impl ComputerProgram {
    /// Decodes compiled byte code; a trailing partial instruction is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            instructions: bytes
                .chunks_exact(INSTRUCTION_SIZE)
                .map(Instruction::decode)
                .collect(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.instructions.iter().flat_map(|i| i.encode()).collect()
    }

    /// Runs at most `max_instructions` instructions against the token and
    /// the cell memory.
    pub fn execute(&self, token: &mut Token, cell: &mut CellMemory, max_instructions: usize) {
        let mut machine = Machine { token, cell };
        // (enclosing block active, current branch taken)
        let mut conditions: Vec<(bool, bool)> = Vec::new();
        let active = |conditions: &[(bool, bool)]| {
            conditions
                .last()
                .is_none_or(|&(outer, taken)| outer && taken)
        };

        for instruction in self.instructions.iter().take(max_instructions) {
            let Instruction { op, target, source } = *instruction;
            match op {
                _ if op.is_condition() => {
                    let outer = active(&conditions);
                    let taken = outer && compare(op, machine.read(target), machine.read(source));
                    conditions.push((outer, taken));
                }
                OpCode::Else => {
                    if let Some(top) = conditions.last_mut() {
                        top.1 = !top.1;
                    }
                }
                OpCode::EndIf => {
                    conditions.pop();
                }
                _ if !active(&conditions) => {}
                _ => {
                    let a = machine.read(target);
                    let b = machine.read(source);
                    let value = match op {
                        OpCode::Mov => b,
                        OpCode::Add => a.wrapping_add(b),
                        OpCode::Sub => a.wrapping_sub(b),
                        OpCode::Mul => a.wrapping_mul(b),
                        OpCode::Div => a.checked_div(b).unwrap_or(0),
                        OpCode::Xor => a ^ b,
                        OpCode::Or => a | b,
                        _ => a & b,
                    };
                    machine.write(target, value);
                }
            }
        }
    }
}

fn compare(op: OpCode, a: u8, b: u8) -> bool {
    match op {
        OpCode::IfGreater => a > b,
        OpCode::IfGreaterEqual => a >= b,
        OpCode::IfEqual => a == b,
        OpCode::IfNotEqual => a != b,
        OpCode::IfLessEqual => a <= b,
        _ => a < b,
    }
}

pub fn process(
    program: &ComputerProgram,
    token: &mut Token,
    ctx: &ProcessingContext,
) -> ProcessingResult {
    let mut memory = ctx.cell().memory;
    program.execute(token, &mut memory, ctx.params.computer_max_instructions);
    ProcessingResult {
        cell_memory: (memory != ctx.cell().memory).then_some(memory),
        ..ProcessingResult::default()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("line {line}: unknown instruction `{word}`")]
    UnknownInstruction { line: usize, word: String },
    #[error("line {line}: cannot parse operand `{text}`")]
    BadOperand { line: usize, text: String },
    #[error("line {line}: expected two operands")]
    MissingOperand { line: usize },
    #[error("line {line}: a constant cannot be written to")]
    ConstantTarget { line: usize },
    #[error("line {line}: `{word}` without matching `if`")]
    Unbalanced { line: usize, word: &'static str },
    #[error("{open} `if` block(s) are never closed")]
    UnclosedIf { open: usize },
    #[error("program has {count} instructions, at most {max} allowed")]
    TooLong { count: usize, max: usize },
}

/// Assembles program text into byte code.
///
/// One instruction per line, case-insensitive; `#` starts a comment.
///
/// ```text
/// mov [8], 2
/// if [1] >= (0)
///   add [[3]], 0x10
/// else
///   mov (0), [1]
/// endif
/// ```
pub fn compile(source: &str, max_instructions: usize) -> Result<Vec<u8>, CompileError> {
    let mut instructions = Vec::new();
    let mut depth = 0usize;

    for (number, raw) in source.lines().enumerate() {
        let line = number + 1;
        let text = raw.split('#').next().unwrap_or("").trim().to_ascii_lowercase();
        if text.is_empty() {
            continue;
        }
        let (word, rest) = text.split_once(char::is_whitespace).unwrap_or((text.as_str(), ""));
        let rest = rest.trim();

        let instruction = match word {
            "else" | "endif" => {
                if depth == 0 {
                    let word = if word == "else" { "else" } else { "endif" };
                    return Err(CompileError::Unbalanced { line, word });
                }
                let op = if word == "else" {
                    OpCode::Else
                } else {
                    depth -= 1;
                    OpCode::EndIf
                };
                Instruction {
                    op,
                    target: Operand::Constant(0),
                    source: Operand::Constant(0),
                }
            }
            "if" => {
                let (op, left, right) = split_condition(rest)
                    .ok_or(CompileError::MissingOperand { line })?;
                depth += 1;
                Instruction {
                    op,
                    target: parse_operand(left, line)?,
                    source: parse_operand(right, line)?,
                }
            }
            _ => {
                let op = match word {
                    "mov" => OpCode::Mov,
                    "add" => OpCode::Add,
                    "sub" => OpCode::Sub,
                    "mul" => OpCode::Mul,
                    "div" => OpCode::Div,
                    "xor" => OpCode::Xor,
                    "or" => OpCode::Or,
                    "and" => OpCode::And,
                    _ => {
                        return Err(CompileError::UnknownInstruction {
                            line,
                            word: word.to_string(),
                        });
                    }
                };
                let (left, right) = rest
                    .split_once(',')
                    .ok_or(CompileError::MissingOperand { line })?;
                let target = parse_operand(left, line)?;
                if matches!(target, Operand::Constant(_)) {
                    return Err(CompileError::ConstantTarget { line });
                }
                Instruction {
                    op,
                    target,
                    source: parse_operand(right, line)?,
                }
            }
        };
        instructions.push(instruction);
    }

    if depth > 0 {
        return Err(CompileError::UnclosedIf { open: depth });
    }
    if instructions.len() > max_instructions {
        return Err(CompileError::TooLong {
            count: instructions.len(),
            max: max_instructions,
        });
    }
    Ok(ComputerProgram { instructions }.to_bytes())
}

fn split_condition(text: &str) -> Option<(OpCode, &str, &str)> {
    // Two-character comparators first so `>=` is not read as `>`.
    const COMPARATORS: [(&str, OpCode); 7] = [
        (">=", OpCode::IfGreaterEqual),
        ("<=", OpCode::IfLessEqual),
        ("!=", OpCode::IfNotEqual),
        ("==", OpCode::IfEqual),
        (">", OpCode::IfGreater),
        ("<", OpCode::IfLess),
        ("=", OpCode::IfEqual),
    ];
    COMPARATORS.iter().find_map(|(symbol, op)| {
        text.split_once(symbol)
            .map(|(left, right)| (*op, left.trim(), right.trim()))
    })
}

fn parse_operand(text: &str, line: usize) -> Result<Operand, CompileError> {
    let text = text.trim();
    let bad = || CompileError::BadOperand {
        line,
        text: text.to_string(),
    };
    let number = |s: &str| -> Result<u8, CompileError> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x") {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => s.parse::<u8>(),
        };
        parsed.map_err(|_| bad())
    };

    if let Some(inner) = text.strip_prefix("[[").and_then(|s| s.strip_suffix("]]")) {
        Ok(Operand::MemoryIndirect(number(inner)?))
    } else if let Some(inner) = text.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Ok(Operand::Memory(number(inner)?))
    } else if let Some(inner) = text.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Ok(Operand::CellMemory(number(inner)?))
    } else if text.is_empty() {
        Err(CompileError::MissingOperand { line })
    } else {
        Ok(Operand::Constant(number(text)?))
    }
}
