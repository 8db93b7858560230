//! Decoding errors

use std::fmt;

use thiserror::Error;

/// The table an out-of-range index pointed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Module string table (1-based)
    String,
    /// Module function list
    Function,
    /// Constant pool of the current function
    Constant,
    /// Child prototype list of the current function
    ChildFunction,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Function => "function",
            Self::Constant => "constant",
            Self::ChildFunction => "child function",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while decoding a bytecode buffer.
///
/// Every variant is terminal for the decode call: no partial module is
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Version byte 0: the rest of the buffer is a compiler diagnostic,
    /// kept byte for byte
    #[error("{}", String::from_utf8_lossy(.0))]
    EmbeddedErrorMessage(Vec<u8>),

    /// Version byte outside the supported range
    #[error("bytecode version mismatch (expected [{min}..{max}], got {actual})")]
    UnsupportedVersion {
        /// Lowest supported version
        min: u8,
        /// Highest supported version
        max: u8,
        /// Version found in the buffer
        actual: u8,
    },

    /// Buffer exhausted in the middle of a read
    #[error("unexpected end of bytecode at offset {offset} (needed {needed} bytes, {remaining} left)")]
    TruncatedInput {
        /// Byte offset where the read started
        offset: usize,
        /// Bytes the read required
        needed: usize,
        /// Bytes actually left
        remaining: usize,
    },

    /// Unknown constant kind tag
    #[error("invalid constant tag {tag} at offset {offset}")]
    InvalidConstantTag {
        /// The tag byte
        tag: u8,
        /// Byte offset of the tag
        offset: usize,
    },

    /// Opcode not present in the opcode table
    #[error("unsupported opcode {opcode} at pc {pc}")]
    UnsupportedOpcode {
        /// Decoded opcode byte
        opcode: u8,
        /// Word offset of the instruction
        pc: usize,
    },

    /// Index outside the range valid at the time of use
    #[error("dangling {kind} reference {index} (valid range is below {bound})")]
    DanglingReference {
        /// Table the index points into
        kind: ReferenceKind,
        /// The offending index
        index: u32,
        /// Exclusive upper bound at the time of use
        bound: u32,
    },

    /// Variable-length integer with more than five bytes
    #[error("variable-length integer too long at offset {offset}")]
    VarIntTooLong {
        /// Byte offset where the varint started
        offset: usize,
    },

    /// Module declares no functions
    #[error("bytecode module contains no functions")]
    EmptyModule,

    /// Line gap exponent too large to shift by
    #[error("invalid line gap exponent {0}")]
    InvalidLineGap(u8),
}

impl DecodeError {
    pub(crate) fn dangling(kind: ReferenceKind, index: u32, bound: usize) -> Self {
        Self::DanglingReference {
            kind,
            index,
            bound: u32::try_from(bound).unwrap_or(u32::MAX),
        }
    }
}

/// Failure reported by a [`Compile`](crate::Compile) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("compilation failed: {message}")]
pub struct CompileError {
    /// Human-readable reason
    pub message: String,
}

impl CompileError {
    /// Create a compile error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors returned by the top-level disassembly entry points
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisassembleError {
    /// The compiler collaborator failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The bytecode could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, DecodeError>;
