//! Instruction stream decoding

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{DecodeError, Result};
use crate::opcode::{ConstantSlot, JumpKind, Opcode, OperandLayout};
use crate::operand::{ConstantIndex, Register};
use crate::reader::ByteReader;

/// Multiplier that recovers the real opcode from a permuted byte
pub const OPCODE_DECODE_MULTIPLIER: u8 = 203;

/// Multiplier a permuting producer applies (inverse of 203 mod 256)
pub const OPCODE_ENCODE_MULTIPLIER: u8 = 227;

/// How opcode bytes are stored in the stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BytecodeEncoding {
    /// The opcode byte is the opcode (stock Luau compiler)
    #[default]
    Direct,
    /// The opcode byte is `op * 227 mod 256` (Roblox client)
    PermutedOpcode,
}

impl BytecodeEncoding {
    /// Recover the opcode from a stored byte
    #[inline]
    pub const fn decode_opcode(self, raw: u8) -> u8 {
        match self {
            Self::Direct => raw,
            Self::PermutedOpcode => raw.wrapping_mul(OPCODE_DECODE_MULTIPLIER),
        }
    }

    /// Produce the stored byte for an opcode
    #[inline]
    pub const fn encode_opcode(self, op: u8) -> u8 {
        match self {
            Self::Direct => op,
            Self::PermutedOpcode => op.wrapping_mul(OPCODE_ENCODE_MULTIPLIER),
        }
    }
}

impl FromStr for BytecodeEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "luau" | "direct" => Ok(Self::Direct),
            "roblox" | "permuted" => Ok(Self::PermutedOpcode),
            other => Err(format!(
                "unknown bytecode encoding '{other}' (expected 'luau' or 'roblox')"
            )),
        }
    }
}

impl fmt::Display for BytecodeEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Direct => "luau",
            Self::PermutedOpcode => "roblox",
        })
    }
}

/// One decoded instruction: primary word plus optional auxiliary word.
///
/// `word` always carries the real opcode in its low byte, whatever encoding
/// the stream used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Instruction {
    /// Word offset of the primary word
    pub pc: u32,
    /// Decoded opcode
    pub opcode: Opcode,
    /// Primary word
    pub word: u32,
    /// Auxiliary word, if the opcode takes one
    pub aux: Option<u32>,
}

impl Instruction {
    /// Operand layout of this instruction's opcode
    #[inline]
    pub const fn layout(&self) -> OperandLayout {
        self.opcode.layout()
    }

    /// Field A (bits 8-15)
    #[inline]
    pub const fn a(&self) -> u8 {
        (self.word >> 8) as u8
    }

    /// Field B (bits 16-23)
    #[inline]
    pub const fn b(&self) -> u8 {
        (self.word >> 16) as u8
    }

    /// Field C (bits 24-31)
    #[inline]
    pub const fn c(&self) -> u8 {
        (self.word >> 24) as u8
    }

    /// Signed field D (bits 16-31)
    #[inline]
    pub const fn d(&self) -> i32 {
        (self.word as i32) >> 16
    }

    /// Signed field E (bits 8-31)
    #[inline]
    pub const fn e(&self) -> i32 {
        (self.word as i32) >> 8
    }

    /// Register in field A
    #[inline]
    pub const fn ra(&self) -> Register {
        Register(self.a())
    }

    /// Auxiliary word, or 0 when absent
    #[inline]
    pub fn aux_word(&self) -> u32 {
        self.aux.unwrap_or(0)
    }

    /// Length in words
    #[inline]
    pub const fn word_count(&self) -> usize {
        self.opcode.layout().word_count()
    }

    /// Absolute word offset this instruction may jump to
    pub fn jump_target(&self) -> Option<i64> {
        let pc = i64::from(self.pc);
        match self.layout().jump {
            JumpKind::None => None,
            JumpKind::D => Some(pc + 1 + i64::from(self.d())),
            JumpKind::E => Some(pc + 1 + i64::from(self.e())),
            JumpKind::FastCall => Some(pc + 2 + i64::from(self.c())),
        }
    }

    /// Constant index named by this instruction, if any
    pub fn constant_operand(&self) -> Option<ConstantIndex> {
        let index = match self.layout().constant {
            ConstantSlot::None => return None,
            ConstantSlot::B => u32::from(self.b()),
            ConstantSlot::C => u32::from(self.c()),
            // D is signed in general; constant indices are not
            ConstantSlot::D => u32::from(self.d() as u16),
            ConstantSlot::Aux => self.aux?,
            ConstantSlot::AuxLow24 => self.aux? & 0x00FF_FFFF,
        };
        Some(ConstantIndex(index))
    }
}

/// Decode a code stream of `code_size` words.
///
/// `code_size` counts auxiliary words too. An instruction whose auxiliary
/// word would fall past the end of the stream is truncated input.
pub fn decode_code(
    reader: &mut ByteReader<'_>,
    code_size: usize,
    encoding: BytecodeEncoding,
) -> Result<Vec<Instruction>> {
    let start = reader.position();
    let bytes = reader.read_bytes(code_size.saturating_mul(4))?;
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect();

    let mut instructions = Vec::with_capacity(words.len());
    let mut pc = 0;

    while pc < words.len() {
        let raw = words[pc];
        let op_byte = encoding.decode_opcode(raw as u8);
        let opcode = Opcode::from_byte(op_byte)
            .ok_or(DecodeError::UnsupportedOpcode { opcode: op_byte, pc })?;

        let aux = match opcode.layout().aux_words() {
            0 => None,
            _ => match words.get(pc + 1) {
                Some(&aux) => Some(aux),
                None => {
                    return Err(DecodeError::TruncatedInput {
                        offset: start + (pc + 1) * 4,
                        needed: 4,
                        remaining: 0,
                    });
                }
            },
        };

        instructions.push(Instruction {
            pc: pc as u32,
            opcode,
            word: (raw & !0xFF) | u32::from(op_byte),
            aux,
        });
        pc += opcode.layout().word_count();
    }

    Ok(instructions)
}
