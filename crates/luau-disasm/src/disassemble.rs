//! Top-level entry points

use crate::dump::{DumpOptions, dump};
use crate::error::{CompileError, DisassembleError};
use crate::instruction::BytecodeEncoding;
use crate::module::Module;

/// Source-to-bytecode compiler.
///
/// Implementations return the raw module buffer. A compiler that reports
/// syntax errors the way `luau-compile --binary` does (a zero version byte
/// followed by the message) needs no special handling: the decoder turns it
/// into [`DecodeError::EmbeddedErrorMessage`](crate::DecodeError::EmbeddedErrorMessage).
pub trait Compile {
    /// Compile `source` into a bytecode buffer
    fn compile(&self, source: &str) -> Result<Vec<u8>, CompileError>;
}

impl<F> Compile for F
where
    F: Fn(&str) -> Result<Vec<u8>, CompileError>,
{
    fn compile(&self, source: &str) -> Result<Vec<u8>, CompileError> {
        self(source)
    }
}

/// Compile `source` and disassemble the result
pub fn disassemble_source(
    compiler: &impl Compile,
    source: &str,
) -> Result<String, DisassembleError> {
    let bytes = compiler.compile(source)?;
    disassemble_bytecode(&bytes, BytecodeEncoding::Direct)
}

/// Disassemble a bytecode buffer with default options
pub fn disassemble_bytecode(
    bytes: &[u8],
    encoding: BytecodeEncoding,
) -> Result<String, DisassembleError> {
    let module = Module::decode(bytes, encoding)?;
    Ok(dump(&module, &DumpOptions::default()))
}
