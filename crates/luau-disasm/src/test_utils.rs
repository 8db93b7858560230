//! Bytecode writer for test fixtures

use crate::constant::tag;
use crate::instruction::BytecodeEncoding;
use crate::opcode::Opcode;
use crate::operand::ImportId;

pub fn write_varint(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

pub fn abc(op: Opcode, a: u8, b: u8, c: u8) -> u32 {
    u32::from(op.to_byte()) | u32::from(a) << 8 | u32::from(b) << 16 | u32::from(c) << 24
}

pub fn ad(op: Opcode, a: u8, d: i16) -> u32 {
    u32::from(op.to_byte()) | u32::from(a) << 8 | u32::from(d as u16) << 16
}

pub fn k_nil() -> Vec<u8> {
    vec![tag::NIL]
}

pub fn k_bool(value: bool) -> Vec<u8> {
    vec![tag::BOOLEAN, u8::from(value)]
}

pub fn k_number(value: f64) -> Vec<u8> {
    let mut out = vec![tag::NUMBER];
    out.extend_from_slice(&value.to_le_bytes());
    out
}

pub fn k_vector(value: [f32; 4]) -> Vec<u8> {
    let mut out = vec![tag::VECTOR];
    for v in value {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

pub fn k_string(id: u32) -> Vec<u8> {
    let mut out = vec![tag::STRING];
    write_varint(&mut out, id);
    out
}

pub fn k_import(ids: &[u32]) -> Vec<u8> {
    let mut out = vec![tag::IMPORT];
    out.extend_from_slice(&ImportId::pack(ids).0.to_le_bytes());
    out
}

pub fn k_table(keys: &[u32]) -> Vec<u8> {
    let mut out = vec![tag::TABLE];
    write_varint(&mut out, keys.len() as u32);
    for &key in keys {
        write_varint(&mut out, key);
    }
    out
}

pub fn k_closure(function: u32) -> Vec<u8> {
    let mut out = vec![tag::CLOSURE];
    write_varint(&mut out, function);
    out
}

/// One prototype record
#[derive(Debug, Clone, Default)]
pub struct FunctionWriter {
    pub max_stack: u8,
    pub num_params: u8,
    pub num_upvalues: u8,
    pub is_vararg: bool,
    pub flags: u8,
    pub type_info: Vec<u8>,
    /// Words, auxiliary words inline
    pub code: Vec<u32>,
    /// Pre-encoded constants (`k_*`)
    pub constants: Vec<Vec<u8>>,
    pub children: Vec<u32>,
    pub line_defined: u32,
    pub debug_name: u32,
    /// (gap log2, per-word deltas, per-interval deltas)
    pub line_info: Option<(u8, Vec<u8>, Vec<i32>)>,
    /// ((name, start, end, register) per local, upvalue names)
    pub debug_info: Option<(Vec<(u32, u32, u32, u8)>, Vec<u32>)>,
}

impl FunctionWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&self, version: u8) -> Vec<u8> {
        self.encode_with(version, BytecodeEncoding::Direct)
    }

    pub fn encode_with(&self, version: u8, encoding: BytecodeEncoding) -> Vec<u8> {
        let mut out = vec![
            self.max_stack,
            self.num_params,
            self.num_upvalues,
            u8::from(self.is_vararg),
        ];

        if version >= 4 {
            out.push(self.flags);
            write_varint(&mut out, self.type_info.len() as u32);
            out.extend_from_slice(&self.type_info);
        }

        write_varint(&mut out, self.code.len() as u32);
        let mut pc = 0;
        while pc < self.code.len() {
            let word = self.code[pc];
            let op = word as u8;
            let stored = (word & !0xFF) | u32::from(encoding.encode_opcode(op));
            out.extend_from_slice(&stored.to_le_bytes());
            let len = Opcode::from_byte(op).map_or(1, |op| op.layout().word_count());
            for &aux in self.code.iter().skip(pc + 1).take(len - 1) {
                out.extend_from_slice(&aux.to_le_bytes());
            }
            pc += len;
        }

        write_varint(&mut out, self.constants.len() as u32);
        for k in &self.constants {
            out.extend_from_slice(k);
        }

        write_varint(&mut out, self.children.len() as u32);
        for &child in &self.children {
            write_varint(&mut out, child);
        }

        write_varint(&mut out, self.line_defined);
        write_varint(&mut out, self.debug_name);

        match &self.line_info {
            None => out.push(0),
            Some((gap, offsets, lines)) => {
                out.push(1);
                out.push(*gap);
                out.extend_from_slice(offsets);
                for line in lines {
                    out.extend_from_slice(&line.to_le_bytes());
                }
            }
        }

        match &self.debug_info {
            None => out.push(0),
            Some((locals, upvalues)) => {
                out.push(1);
                write_varint(&mut out, locals.len() as u32);
                for &(name, start, end, reg) in locals {
                    write_varint(&mut out, name);
                    write_varint(&mut out, start);
                    write_varint(&mut out, end);
                    out.push(reg);
                }
                write_varint(&mut out, upvalues.len() as u32);
                for &name in upvalues {
                    write_varint(&mut out, name);
                }
            }
        }

        out
    }
}

/// A whole module
#[derive(Debug, Clone)]
pub struct ModuleWriter {
    pub version: u8,
    pub types_version: u8,
    pub strings: Vec<Vec<u8>>,
    pub functions: Vec<FunctionWriter>,
    pub entry: u32,
    pub encoding: BytecodeEncoding,
}

impl ModuleWriter {
    pub fn new(version: u8) -> Self {
        Self {
            version,
            types_version: 1,
            strings: Vec::new(),
            functions: Vec::new(),
            entry: 0,
            encoding: BytecodeEncoding::Direct,
        }
    }

    /// Add a string, returning its 1-based id
    pub fn string(&mut self, s: impl Into<Vec<u8>>) -> u32 {
        self.strings.push(s.into());
        self.strings.len() as u32
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.version];
        if self.version >= 4 {
            out.push(self.types_version);
        }

        write_varint(&mut out, self.strings.len() as u32);
        for s in &self.strings {
            write_varint(&mut out, s.len() as u32);
            out.extend_from_slice(s);
        }

        write_varint(&mut out, self.functions.len() as u32);
        for f in &self.functions {
            out.extend(f.encode_with(self.version, self.encoding));
        }

        write_varint(&mut out, self.entry);
        out
    }
}
