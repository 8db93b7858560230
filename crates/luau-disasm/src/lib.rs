//! # Luau Disassembler
//!
//! Decodes Luau bytecode modules and renders them as disassembly text.
//!
//! ## Design Principles
//!
//! - **Bounds-checked**: Every read is checked; malformed input is an error, never a panic
//! - **All-or-nothing**: A decode either yields a complete [`Module`] or the first error
//! - **Table-driven**: Operand layouts come from a single opcode table
//! - **Deterministic**: The same module always renders to the same text
//!
//! ```ignore
//! let text = luau_disasm::disassemble_bytecode(&bytes, BytecodeEncoding::Direct)?;
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constant;
pub mod disassemble;
pub mod dump;
pub mod error;
pub mod instruction;
pub mod module;
pub mod number;
pub mod opcode;
pub mod operand;
pub mod prototype;
pub mod reader;
pub mod strings;

#[cfg(test)]
mod test_utils;

pub use constant::{Constant, ConstantPool};
pub use disassemble::{Compile, disassemble_bytecode, disassemble_source};
pub use dump::{DumpOptions, dump, format_constant};
pub use error::{CompileError, DecodeError, DisassembleError, ReferenceKind};
pub use instruction::{BytecodeEncoding, Instruction};
pub use module::{Module, VERSION_MAX, VERSION_MIN};
pub use opcode::{Opcode, OperandLayout};
pub use operand::{ConstantIndex, FunctionIndex, ImportId, Register, StringRef};
pub use prototype::{DebugInfo, LineInfo, LocalVar, Prototype};
pub use strings::StringTable;
