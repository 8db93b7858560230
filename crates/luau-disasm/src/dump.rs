//! Human-readable disassembly of a decoded module.
//!
//! One section per function in definition order:
//!
//! ```text
//! [name]
//! GETIMPORT R0 1 [print]
//! LOADK R1 K2 ['hello']
//! CALL R0 1 0
//! RETURN R0 0
//! ```
//!
//! Functions without a debug name are headed `[__unnamed_function__]`.
//! `PREPVARARGS` is omitted. Jump operands are printed as `L<pc>` with the
//! absolute word offset of the target.

use std::fmt::{self, Write};

use serde::Serialize;

use crate::constant::Constant;
use crate::instruction::Instruction;
use crate::module::Module;
use crate::number::{format_number, format_vector_component};
use crate::opcode::Opcode;
use crate::operand::ConstantIndex;
use crate::prototype::Prototype;

/// Header used for functions with no (or an empty) debug name
pub const UNNAMED_FUNCTION: &str = "__unnamed_function__";

/// Strings at least this long are cut and suffixed with `...`
const MAX_STRING_CONSTANT: usize = 32;

/// Optional decorations; the default output has none
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DumpOptions {
    /// Prefix each instruction with its source line when line info exists
    pub show_lines: bool,
    /// Prefix each instruction with its word offset
    pub show_pc: bool,
}

/// Render the whole module as text
pub fn dump(module: &Module, options: &DumpOptions) -> String {
    Disassembly { module, options }
        .to_string()
        .trim()
        .to_string()
}

/// Render one constant the way it appears between brackets in the listing
pub fn format_constant(module: &Module, function: &Prototype, index: ConstantIndex) -> String {
    let Some(constant) = function.constants.get(index) else {
        return String::new();
    };

    match constant {
        Constant::Nil => "nil".to_string(),
        Constant::Boolean(b) => b.to_string(),
        Constant::Number(n) => format_number(*n),
        Constant::Vector([x, y, z, w]) => {
            let mut parts = vec![
                format_vector_component(*x),
                format_vector_component(*y),
                format_vector_component(*z),
            ];
            if *w != 0.0 {
                parts.push(format_vector_component(*w));
            }
            parts.join(", ")
        }
        Constant::String(id) => {
            let Some(bytes) = id.and_then(|id| module.strings.get(id)) else {
                return String::new();
            };
            if bytes.iter().any(|&b| b < b' ') {
                return String::new();
            }
            if bytes.len() < MAX_STRING_CONSTANT {
                format!("'{}'", String::from_utf8_lossy(bytes))
            } else {
                format!(
                    "'{}'...",
                    String::from_utf8_lossy(&bytes[..MAX_STRING_CONSTANT])
                )
            }
        }
        Constant::Import(id) => id
            .segments()
            .map(|segment| {
                function
                    .constants
                    .get(segment)
                    .and_then(Constant::as_string)
                    .and_then(|s| module.strings.get_lossy(s))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join("."),
        Constant::Table(_) => "{...}".to_string(),
        Constant::Closure(index) => module
            .function(*index)
            .and_then(|f| f.name(&module.strings))
            .map(|name| format!("'{name}'"))
            .unwrap_or_default(),
    }
}

struct Disassembly<'a> {
    module: &'a Module,
    options: &'a DumpOptions,
}

impl fmt::Display for Disassembly<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for function in &self.module.functions {
            let ctx = DumpContext::new(self.module, function, self.options);
            ctx.write_function(f)?;
        }
        Ok(())
    }
}

/// Per-function lookups shared by every instruction line
struct DumpContext<'a> {
    module: &'a Module,
    function: &'a Prototype,
    options: &'a DumpOptions,
    pc_width: usize,
}

impl<'a> DumpContext<'a> {
    fn new(module: &'a Module, function: &'a Prototype, options: &'a DumpOptions) -> Self {
        let pc_width = function
            .instructions
            .last()
            .map_or(1, |insn| insn.pc.to_string().len());
        Self {
            module,
            function,
            options,
            pc_width,
        }
    }

    fn write_function(&self, f: &mut impl Write) -> fmt::Result {
        let name = self.function.name(&self.module.strings);
        writeln!(f, "[{}]", name.as_deref().unwrap_or(UNNAMED_FUNCTION))?;

        for insn in &self.function.instructions {
            if insn.opcode == Opcode::PrepVarArgs {
                continue;
            }
            if self.options.show_pc {
                write!(f, "{:>width$}: ", insn.pc, width = self.pc_width)?;
            }
            if self.options.show_lines
                && let Some(line) = self.function.line_for(insn.pc as usize)
            {
                write!(f, "{line}: ")?;
            }
            self.write_instruction(f, insn)?;
            f.write_char('\n')?;
        }

        f.write_char('\n')
    }

    fn write_instruction(&self, f: &mut impl Write, insn: &Instruction) -> fmt::Result {
        let name = insn.opcode.name();
        let a = insn.a();
        let b = i32::from(insn.b());
        let c = i32::from(insn.c());
        let d = insn.d();
        let aux = insn.aux_word();
        let target = insn.jump_target().unwrap_or_default();
        let k = insn
            .constant_operand()
            .map(|index| format_constant(self.module, self.function, index))
            .unwrap_or_default();
        let not = if aux >> 31 != 0 { " NOT" } else { "" };

        match insn.opcode {
            Opcode::Nop | Opcode::Break | Opcode::Coverage | Opcode::NativeCall => {
                f.write_str(name)
            }
            Opcode::LoadNil | Opcode::CloseUpvals | Opcode::PrepVarArgs => {
                write!(f, "{name} R{a}")
            }
            Opcode::LoadB if c != 0 => write!(f, "{name} R{a} {b} +{c}"),
            Opcode::LoadB | Opcode::GetUpval | Opcode::SetUpval => write!(f, "{name} R{a} {b}"),
            Opcode::LoadN | Opcode::DupTable => write!(f, "{name} R{a} {d}"),
            Opcode::LoadK | Opcode::DupClosure => write!(f, "{name} R{a} K{d} [{k}]"),
            Opcode::GetImport => write!(f, "{name} R{a} {d} [{k}]"),
            Opcode::Move | Opcode::Not | Opcode::Minus | Opcode::Length => {
                write!(f, "{name} R{a} R{b}")
            }
            Opcode::GetGlobal | Opcode::SetGlobal | Opcode::LoadKX => {
                write!(f, "{name} R{a} K{aux} [{k}]")
            }
            Opcode::GetTable
            | Opcode::SetTable
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::IDiv
            | Opcode::Mod
            | Opcode::Pow
            | Opcode::And
            | Opcode::Or
            | Opcode::Concat => write!(f, "{name} R{a} R{b} R{c}"),
            Opcode::GetTableKS | Opcode::SetTableKS | Opcode::NameCall => {
                write!(f, "{name} R{a} R{b} K{aux} [{k}]")
            }
            Opcode::GetTableN | Opcode::SetTableN => write!(f, "{name} R{a} R{b} {}", c + 1),
            Opcode::NewClosure => write!(f, "{name} R{a} P{d}"),
            Opcode::Call => write!(f, "{name} R{a} {} {}", b - 1, c - 1),
            Opcode::Return | Opcode::GetVarArgs => write!(f, "{name} R{a} {}", b - 1),
            Opcode::Jump | Opcode::JumpBack | Opcode::JumpX => write!(f, "{name} L{target}"),
            Opcode::JumpIf
            | Opcode::JumpIfNot
            | Opcode::ForNPrep
            | Opcode::ForNLoop
            | Opcode::ForGPrep
            | Opcode::ForGPrepINext
            | Opcode::ForGPrepNext => write!(f, "{name} R{a} L{target}"),
            Opcode::JumpIfEq
            | Opcode::JumpIfLe
            | Opcode::JumpIfLt
            | Opcode::JumpIfNotEq
            | Opcode::JumpIfNotLe
            | Opcode::JumpIfNotLt => write!(f, "{name} R{a} R{} L{target}", aux & 0xFF),
            Opcode::AddK
            | Opcode::SubK
            | Opcode::MulK
            | Opcode::DivK
            | Opcode::IDivK
            | Opcode::ModK
            | Opcode::PowK
            | Opcode::AndK
            | Opcode::OrK => write!(f, "{name} R{a} R{b} K{c} [{k}]"),
            Opcode::SubRK | Opcode::DivRK => write!(f, "{name} R{a} K{b} [{k}] R{c}"),
            Opcode::NewTable => {
                let hash_size = if b == 0 {
                    0
                } else {
                    1u64.checked_shl((b - 1) as u32).unwrap_or(0)
                };
                write!(f, "{name} R{a} {hash_size} {aux}")
            }
            Opcode::SetList => write!(f, "{name} R{a} R{b} {} [{aux}]", c - 1),
            Opcode::ForGLoop => {
                let inext = if (aux as i32) < 0 { " [inext]" } else { "" };
                write!(f, "{name} R{a} L{target} {}{inext}", aux & 0xFF)
            }
            Opcode::FastCall => write!(f, "{name} {a} L{target}"),
            Opcode::FastCall1 => write!(f, "{name} {a} R{b} L{target}"),
            Opcode::FastCall2 => write!(f, "{name} {a} R{b} R{} L{target}", aux & 0xFF),
            Opcode::FastCall2K => write!(f, "{name} {a} R{b} K{aux} L{target} [{k}]"),
            Opcode::FastCall3 => write!(
                f,
                "{name} {a} R{b} R{} R{} L{target}",
                aux & 0xFF,
                (aux >> 8) & 0xFF
            ),
            Opcode::Capture => {
                let (kind, prefix) = match a {
                    0 => ("VAL", 'R'),
                    1 => ("REF", 'R'),
                    2 => ("UPVAL", 'U'),
                    _ => ("", 'R'),
                };
                write!(f, "{name} {kind} {prefix}{b}")
            }
            Opcode::JumpXEqKNil => write!(f, "{name} R{a} L{target}{not}"),
            Opcode::JumpXEqKB => write!(f, "{name} R{a} {} L{target}{not}", aux & 1),
            Opcode::JumpXEqKN | Opcode::JumpXEqKS => {
                write!(f, "{name} R{a} K{} L{target}{not} [{k}]", aux & 0x00FF_FFFF)
            }
        }
    }
}
