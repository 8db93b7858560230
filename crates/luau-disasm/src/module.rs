//! Bytecode module format

use serde::Serialize;

use crate::error::{DecodeError, ReferenceKind, Result};
use crate::instruction::BytecodeEncoding;
use crate::operand::FunctionIndex;
use crate::prototype::{Prototype, PrototypeContext};
use crate::reader::ByteReader;
use crate::strings::StringTable;

/// Oldest bytecode version accepted
pub const VERSION_MIN: u8 = 3;

/// Newest bytecode version accepted
pub const VERSION_MAX: u8 = 6;

/// Version byte announcing a compiler error message instead of bytecode
pub const VERSION_ERROR: u8 = 0;

/// Smallest possible encoded prototype, used to bound the function count
const MIN_PROTOTYPE_BYTES: usize = 10;

/// A decoded bytecode module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    /// Bytecode version
    pub version: u8,
    /// Type metadata encoding version (0 before version 4)
    pub types_version: u8,
    /// Strings shared by all functions
    pub strings: StringTable,
    /// Functions in definition order; children precede their parents
    pub functions: Vec<Prototype>,
    /// Function run when the chunk is loaded
    pub entry_function: FunctionIndex,
}

impl Module {
    /// Decode a module from a complete bytecode buffer.
    ///
    /// Decoding is all-or-nothing: the first error is returned and no
    /// partially built module escapes.
    pub fn decode(bytes: &[u8], encoding: BytecodeEncoding) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);

        let version = reader.read_u8()?;
        if version == VERSION_ERROR {
            return Err(DecodeError::EmbeddedErrorMessage(reader.rest().to_vec()));
        }
        if !(VERSION_MIN..=VERSION_MAX).contains(&version) {
            return Err(DecodeError::UnsupportedVersion {
                min: VERSION_MIN,
                max: VERSION_MAX,
                actual: version,
            });
        }

        let types_version = if version >= 4 { reader.read_u8()? } else { 0 };

        let strings = StringTable::decode(&mut reader)?;

        let function_count = reader.read_count(MIN_PROTOTYPE_BYTES)?;
        if function_count == 0 {
            return Err(DecodeError::EmptyModule);
        }

        tracing::debug!(
            version,
            types_version,
            %encoding,
            strings = strings.len(),
            functions = function_count,
            "decoding bytecode module"
        );

        let mut functions = Vec::with_capacity(function_count);
        for function_index in 0..function_count {
            let ctx = PrototypeContext {
                version,
                types_version,
                strings: &strings,
                encoding,
                function_index,
            };
            functions.push(Prototype::decode(&mut reader, &ctx)?);
        }

        let entry = reader.read_varint()?;
        if entry as usize >= functions.len() {
            return Err(DecodeError::dangling(
                ReferenceKind::Function,
                entry,
                functions.len(),
            ));
        }

        if reader.remaining() > 0 {
            tracing::debug!(
                offset = reader.position(),
                trailing = reader.remaining(),
                "ignoring trailing bytes after entry function"
            );
        }

        Ok(Self {
            version,
            types_version,
            strings,
            functions,
            entry_function: FunctionIndex(entry),
        })
    }

    /// Get the entry point function
    pub fn entry(&self) -> Option<&Prototype> {
        self.function(self.entry_function)
    }

    /// Get a function by index
    pub fn function(&self, index: FunctionIndex) -> Option<&Prototype> {
        self.functions.get(index.index() as usize)
    }
}
