//! Per-function constant pool

use serde::Serialize;

use crate::error::{DecodeError, ReferenceKind, Result};
use crate::operand::{ConstantIndex, FunctionIndex, ImportId, StringRef};
use crate::reader::ByteReader;
use crate::strings::StringTable;

/// Constant kind tags as written by the Luau compiler
pub mod tag {
    /// `nil`
    pub const NIL: u8 = 0;
    /// `true` / `false`
    pub const BOOLEAN: u8 = 1;
    /// IEEE double
    pub const NUMBER: u8 = 2;
    /// String table reference
    pub const STRING: u8 = 3;
    /// Packed global import path
    pub const IMPORT: u8 = 4;
    /// Table template (keys only)
    pub const TABLE: u8 = 5;
    /// Shared closure
    pub const CLOSURE: u8 = 6;
    /// Four-float vector
    pub const VECTOR: u8 = 7;
}

/// A constant value in the constant pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Constant {
    /// `nil`
    Nil,
    /// Boolean literal
    Boolean(bool),
    /// 64-bit floating point number
    Number(f64),
    /// `x, y, z, w`
    Vector([f32; 4]),
    /// String, or `None` when the stream stored index 0
    String(Option<StringRef>),
    /// Global path such as `math.floor`
    Import(ImportId),
    /// Table template, keeping only its key constants
    Table(Vec<ConstantIndex>),
    /// Prototype shared without upvalues
    Closure(FunctionIndex),
}

impl Constant {
    /// Check if this is a string
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Get the string reference if this is a non-empty string constant
    #[inline]
    pub fn as_string(&self) -> Option<StringRef> {
        match self {
            Self::String(s) => *s,
            _ => None,
        }
    }
}

/// Constant pool of one function, in stream order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConstantPool {
    constants: Vec<Constant>,
}

impl ConstantPool {
    /// Read a varint count followed by that many tagged constants.
    ///
    /// `function_index` is the index of the function that owns the pool:
    /// closures may only reference functions defined before it.
    pub fn decode(
        reader: &mut ByteReader<'_>,
        strings: &StringTable,
        function_index: usize,
    ) -> Result<Self> {
        let count = reader.read_count(1)?;
        let mut pool = Self {
            constants: Vec::with_capacity(count),
        };

        for _ in 0..count {
            let constant = pool.decode_one(reader, strings, function_index)?;
            pool.constants.push(constant);
        }

        Ok(pool)
    }

    fn decode_one(
        &self,
        reader: &mut ByteReader<'_>,
        strings: &StringTable,
        function_index: usize,
    ) -> Result<Constant> {
        let offset = reader.position();
        let constant = match reader.read_u8()? {
            tag::NIL => Constant::Nil,
            tag::BOOLEAN => Constant::Boolean(reader.read_u8()? != 0),
            tag::NUMBER => Constant::Number(reader.read_f64()?),
            tag::VECTOR => Constant::Vector([
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
            ]),
            tag::STRING => Constant::String(strings.read_ref(reader)?),
            tag::IMPORT => {
                let id = ImportId(reader.read_u32()?);
                for segment in id.segments() {
                    self.check_prior_string(segment)?;
                }
                Constant::Import(id)
            }
            tag::TABLE => {
                let key_count = reader.read_count(1)?;
                let mut keys = Vec::with_capacity(key_count);
                for _ in 0..key_count {
                    let key = reader.read_varint()?;
                    if key as usize >= self.constants.len() {
                        return Err(DecodeError::dangling(
                            ReferenceKind::Constant,
                            key,
                            self.constants.len(),
                        ));
                    }
                    keys.push(ConstantIndex(key));
                }
                Constant::Table(keys)
            }
            tag::CLOSURE => {
                let index = reader.read_varint()?;
                if index as usize >= function_index {
                    return Err(DecodeError::dangling(
                        ReferenceKind::Function,
                        index,
                        function_index,
                    ));
                }
                Constant::Closure(FunctionIndex(index))
            }
            tag => return Err(DecodeError::InvalidConstantTag { tag, offset }),
        };
        Ok(constant)
    }

    /// An import segment must name a string constant already in the pool
    fn check_prior_string(&self, index: ConstantIndex) -> Result<()> {
        match self.get(index) {
            Some(constant) if constant.is_string() => Ok(()),
            _ => Err(DecodeError::dangling(
                ReferenceKind::Constant,
                index.index(),
                self.constants.len(),
            )),
        }
    }

    /// Get a constant by index
    #[inline]
    pub fn get(&self, index: ConstantIndex) -> Option<&Constant> {
        self.constants.get(index.index() as usize)
    }

    /// Number of constants in the pool
    #[inline]
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Check if the pool is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Iterate over constants
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Constant> {
        self.constants.iter()
    }
}
