//! Function prototypes

use std::borrow::Cow;

use serde::Serialize;

use crate::constant::ConstantPool;
use crate::error::{DecodeError, ReferenceKind, Result};
use crate::instruction::{BytecodeEncoding, Instruction, decode_code};
use crate::opcode::Opcode;
use crate::operand::{FunctionIndex, Register, StringRef};
use crate::reader::ByteReader;
use crate::strings::StringTable;

/// The only type-metadata encoding whose bytes are kept
pub const SUPPORTED_TYPES_VERSION: u8 = 1;

/// Module-level state a prototype is decoded against
#[derive(Debug, Clone, Copy)]
pub(crate) struct PrototypeContext<'a> {
    pub version: u8,
    pub types_version: u8,
    pub strings: &'a StringTable,
    pub encoding: BytecodeEncoding,
    /// Index the prototype will occupy in the module
    pub function_index: usize,
}

/// Two-level delta-compressed map from code word to source line.
///
/// `abs_lines` holds one absolute line per `2^line_gap_log2` words and
/// `line_offsets` one small offset per word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineInfo {
    /// log2 of the interval length
    pub line_gap_log2: u8,
    /// Per-word offset from the interval's base line
    pub line_offsets: Vec<u8>,
    /// Base line per interval
    pub abs_lines: Vec<i32>,
}

impl LineInfo {
    fn decode(reader: &mut ByteReader<'_>, code_size: usize) -> Result<Self> {
        let line_gap_log2 = reader.read_u8()?;
        if line_gap_log2 >= 32 {
            return Err(DecodeError::InvalidLineGap(line_gap_log2));
        }

        let intervals = ((code_size as i64 - 1) >> line_gap_log2) + 1;
        let intervals = usize::try_from(intervals).unwrap_or(0);

        let mut last_offset = 0u8;
        let line_offsets = reader
            .read_bytes(code_size)?
            .iter()
            .map(|&delta| {
                last_offset = last_offset.wrapping_add(delta);
                last_offset
            })
            .collect();

        let mut last_line = 0i32;
        let mut abs_lines = Vec::with_capacity(intervals);
        for _ in 0..intervals {
            last_line = last_line.wrapping_add(reader.read_i32()?);
            abs_lines.push(last_line);
        }

        Ok(Self {
            line_gap_log2,
            line_offsets,
            abs_lines,
        })
    }

    /// Source line of the word at `pc`
    pub fn line_for(&self, pc: usize) -> Option<i32> {
        let offset = *self.line_offsets.get(pc)?;
        let base = *self.abs_lines.get(pc >> self.line_gap_log2)?;
        Some(base.wrapping_add(i32::from(offset)))
    }
}

/// A named local variable and the code range where it is live
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalVar {
    /// Variable name
    pub name: Option<StringRef>,
    /// First word where the variable is live
    pub start_pc: u32,
    /// Word after the last where it is live
    pub end_pc: u32,
    /// Register holding the variable
    pub register: Register,
}

/// Local and upvalue names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DebugInfo {
    /// Locals in declaration order
    pub locals: Vec<LocalVar>,
    /// Upvalue names in capture order
    pub upvalue_names: Vec<Option<StringRef>>,
}

impl DebugInfo {
    fn decode(reader: &mut ByteReader<'_>, strings: &StringTable) -> Result<Self> {
        let local_count = reader.read_count(4)?;
        let mut locals = Vec::with_capacity(local_count);
        for _ in 0..local_count {
            locals.push(LocalVar {
                name: strings.read_ref(reader)?,
                start_pc: reader.read_varint()?,
                end_pc: reader.read_varint()?,
                register: Register(reader.read_u8()?),
            });
        }

        let upvalue_count = reader.read_count(1)?;
        let mut upvalue_names = Vec::with_capacity(upvalue_count);
        for _ in 0..upvalue_count {
            upvalue_names.push(strings.read_ref(reader)?);
        }

        Ok(Self {
            locals,
            upvalue_names,
        })
    }
}

/// One compiled function
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prototype {
    /// Registers the function needs
    pub max_stack_size: u8,
    /// Fixed parameter count
    pub num_params: u8,
    /// Upvalue count
    pub num_upvalues: u8,
    /// Whether the function takes `...`
    pub is_vararg: bool,
    /// Compiler flags (version 4+)
    pub flags: u8,
    /// Opaque type metadata, kept only for the supported types version
    pub type_info: Option<Vec<u8>>,
    /// Length of the code stream in words, auxiliary words included
    pub code_size: usize,
    /// Decoded instructions
    pub instructions: Vec<Instruction>,
    /// Constant pool
    pub constants: ConstantPool,
    /// Functions that NEWCLOSURE may instantiate, by child slot
    pub child_functions: Vec<FunctionIndex>,
    /// Line of the `function` keyword
    pub line_defined: u32,
    /// Function name
    pub debug_name: Option<StringRef>,
    /// Line table
    pub line_info: Option<LineInfo>,
    /// Local and upvalue names
    pub debug_info: Option<DebugInfo>,
}

impl Prototype {
    /// Decode one prototype record at the reader's position
    pub(crate) fn decode(reader: &mut ByteReader<'_>, ctx: &PrototypeContext<'_>) -> Result<Self> {
        let max_stack_size = reader.read_u8()?;
        let num_params = reader.read_u8()?;
        let num_upvalues = reader.read_u8()?;
        let is_vararg = reader.read_u8()? != 0;

        let mut flags = 0;
        let mut type_info = None;
        if ctx.version >= 4 {
            flags = reader.read_u8()?;
            let type_size = reader.read_varint_usize()?;
            if type_size > 0 {
                if ctx.types_version == SUPPORTED_TYPES_VERSION {
                    type_info = Some(reader.read_bytes(type_size)?.to_vec());
                } else {
                    tracing::debug!(
                        function = ctx.function_index,
                        types_version = ctx.types_version,
                        type_size,
                        "skipping type info"
                    );
                    reader.skip(type_size)?;
                }
            }
        }

        let code_size = reader.read_count(4)?;
        let instructions = decode_code(reader, code_size, ctx.encoding)?;

        let constants = ConstantPool::decode(reader, ctx.strings, ctx.function_index)?;

        let child_count = reader.read_count(1)?;
        let mut child_functions = Vec::with_capacity(child_count);
        for _ in 0..child_count {
            let index = reader.read_varint()?;
            if index as usize >= ctx.function_index {
                return Err(DecodeError::dangling(
                    ReferenceKind::Function,
                    index,
                    ctx.function_index,
                ));
            }
            child_functions.push(FunctionIndex(index));
        }

        let line_defined = reader.read_varint()?;
        let debug_name = ctx.strings.read_ref(reader)?;

        let line_info = match reader.read_u8()? {
            0 => None,
            _ => Some(LineInfo::decode(reader, code_size)?),
        };

        let debug_info = match reader.read_u8()? {
            0 => None,
            _ => Some(DebugInfo::decode(reader, ctx.strings)?),
        };

        let proto = Self {
            max_stack_size,
            num_params,
            num_upvalues,
            is_vararg,
            flags,
            type_info,
            code_size,
            instructions,
            constants,
            child_functions,
            line_defined,
            debug_name,
            line_info,
            debug_info,
        };
        proto.check_operands()?;

        tracing::trace!(
            function = ctx.function_index,
            name = ?proto.debug_name.and_then(|id| ctx.strings.get_lossy(id)),
            code_size,
            constants = proto.constants.len(),
            children = proto.child_functions.len(),
            "decoded prototype"
        );

        Ok(proto)
    }

    /// Constant and child-prototype operands must land inside their tables
    fn check_operands(&self) -> Result<()> {
        for insn in &self.instructions {
            if let Some(k) = insn.constant_operand()
                && k.index() as usize >= self.constants.len()
            {
                return Err(DecodeError::dangling(
                    ReferenceKind::Constant,
                    k.index(),
                    self.constants.len(),
                ));
            }

            if insn.opcode == Opcode::NewClosure {
                let child = u32::from(insn.d() as u16);
                if child as usize >= self.child_functions.len() {
                    return Err(DecodeError::dangling(
                        ReferenceKind::ChildFunction,
                        child,
                        self.child_functions.len(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Function name, if it has a non-empty one
    pub fn name<'s>(&self, strings: &'s StringTable) -> Option<Cow<'s, str>> {
        self.debug_name
            .and_then(|id| strings.get_lossy(id))
            .filter(|name| !name.is_empty())
    }

    /// Source line of the word at `pc`, when line info is present
    pub fn line_for(&self, pc: usize) -> Option<i32> {
        self.line_info.as_ref()?.line_for(pc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FunctionWriter, abc, ad};

    fn decode(bytes: &[u8], function_index: usize) -> Result<Prototype> {
        let strings = StringTable::from_strings(["main", "x"]);
        let ctx = PrototypeContext {
            version: 6,
            types_version: 1,
            strings: &strings,
            encoding: BytecodeEncoding::Direct,
            function_index,
        };
        let mut reader = ByteReader::new(bytes);
        let proto = Prototype::decode(&mut reader, &ctx)?;
        assert_eq!(reader.remaining(), 0);
        Ok(proto)
    }

    #[test]
    fn test_decode_minimal() {
        let mut f = FunctionWriter::new();
        f.max_stack = 2;
        f.is_vararg = true;
        f.code = vec![abc(Opcode::Return, 0, 1, 0)];
        f.debug_name = 1;

        let proto = decode(&f.encode(6), 0).unwrap();
        assert_eq!(proto.max_stack_size, 2);
        assert!(proto.is_vararg);
        assert_eq!(proto.code_size, 1);
        assert_eq!(proto.instructions[0].opcode, Opcode::Return);
        assert_eq!(proto.debug_name, Some(StringRef::new(1)));
        assert!(proto.line_info.is_none());
    }

    #[test]
    fn test_type_info_kept() {
        let mut f = FunctionWriter::new();
        f.type_info = vec![1, 2, 3];
        let proto = decode(&f.encode(6), 0).unwrap();
        assert_eq!(proto.type_info, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_type_info_skipped_for_other_types_version() {
        let mut f = FunctionWriter::new();
        f.type_info = vec![9, 9];
        let strings = StringTable::default();
        let ctx = PrototypeContext {
            version: 5,
            types_version: 2,
            strings: &strings,
            encoding: BytecodeEncoding::Direct,
            function_index: 0,
        };
        let bytes = f.encode(5);
        let mut reader = ByteReader::new(&bytes);
        let proto = Prototype::decode(&mut reader, &ctx).unwrap();
        assert_eq!(proto.type_info, None);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_line_info() {
        let mut f = FunctionWriter::new();
        f.code = vec![
            ad(Opcode::LoadN, 0, 1),
            ad(Opcode::LoadN, 1, 2),
            ad(Opcode::LoadN, 2, 3),
            abc(Opcode::Return, 0, 1, 0),
        ];
        // gap 2^1: intervals at lines 10 and 12
        f.line_info = Some((1, vec![0, 1, 0, 3], vec![10, 2]));

        let proto = decode(&f.encode(6), 0).unwrap();
        let lines: Vec<_> = (0..4).map(|pc| proto.line_for(pc)).collect();
        assert_eq!(lines, vec![Some(10), Some(11), Some(13), Some(16)]);
        assert_eq!(proto.line_for(4), None);
    }

    #[test]
    fn test_skipped_type_info_truncated() {
        let mut f = FunctionWriter::new();
        f.type_info = vec![9, 9, 9];
        let strings = StringTable::default();
        let ctx = PrototypeContext {
            version: 5,
            types_version: 2,
            strings: &strings,
            encoding: BytecodeEncoding::Direct,
            function_index: 0,
        };
        // header, flags, size varint, then one of three type bytes
        let bytes = f.encode(5);
        let mut reader = ByteReader::new(&bytes[..7]);
        assert_eq!(
            Prototype::decode(&mut reader, &ctx),
            Err(DecodeError::TruncatedInput {
                offset: 6,
                needed: 3,
                remaining: 1,
            })
        );
    }

    #[test]
    fn test_line_info_truncated_mid_interval() {
        let mut f = FunctionWriter::new();
        f.code = vec![
            ad(Opcode::LoadN, 0, 1),
            ad(Opcode::LoadN, 1, 2),
            ad(Opcode::LoadN, 2, 3),
            abc(Opcode::Return, 0, 1, 0),
        ];
        f.line_info = Some((1, vec![0, 1, 0, 3], vec![10, 2]));

        // drop the debug info flag and half of the second interval
        let bytes = f.encode(6);
        let cut = bytes.len() - 3;
        assert_eq!(
            decode(&bytes[..cut], 0),
            Err(DecodeError::TruncatedInput {
                offset: cut - 2,
                needed: 4,
                remaining: 2,
            })
        );
    }

    #[test]
    fn test_line_gap_too_large() {
        let mut f = FunctionWriter::new();
        f.line_info = Some((32, vec![0], vec![1]));
        let result = decode(&f.encode(6), 0);
        assert_eq!(result, Err(DecodeError::InvalidLineGap(32)));
    }

    #[test]
    fn test_debug_info() {
        let mut f = FunctionWriter::new();
        f.debug_info = Some((vec![(2, 0, 1, 0)], vec![0]));

        let proto = decode(&f.encode(6), 0).unwrap();
        let debug = proto.debug_info.unwrap();
        assert_eq!(
            debug.locals,
            vec![LocalVar {
                name: Some(StringRef::new(2)),
                start_pc: 0,
                end_pc: 1,
                register: Register(0),
            }]
        );
        assert_eq!(debug.upvalue_names, vec![None]);
    }

    #[test]
    fn test_child_must_precede_parent() {
        let mut f = FunctionWriter::new();
        f.children = vec![0, 1];
        assert_eq!(
            decode(&f.encode(6), 1),
            Err(DecodeError::DanglingReference {
                kind: ReferenceKind::Function,
                index: 1,
                bound: 1,
            })
        );
    }

    #[test]
    fn test_constant_operand_out_of_pool() {
        let mut f = FunctionWriter::new();
        f.code = vec![ad(Opcode::LoadK, 0, 0), abc(Opcode::Return, 0, 1, 0)];
        assert_eq!(
            decode(&f.encode(6), 0),
            Err(DecodeError::DanglingReference {
                kind: ReferenceKind::Constant,
                index: 0,
                bound: 0,
            })
        );
    }

    #[test]
    fn test_newclosure_out_of_children() {
        let mut f = FunctionWriter::new();
        f.code = vec![ad(Opcode::NewClosure, 0, 1)];
        f.children = vec![0];
        assert_eq!(
            decode(&f.encode(6), 1),
            Err(DecodeError::DanglingReference {
                kind: ReferenceKind::ChildFunction,
                index: 1,
                bound: 1,
            })
        );
    }

    #[test]
    fn test_unnamed() {
        let f = FunctionWriter::new();
        let strings = StringTable::from_strings([""]);
        let proto = decode(&f.encode(6), 0).unwrap();
        assert_eq!(proto.name(&strings), None);
    }
}
