//! Module string table

use std::borrow::Cow;

use serde::{Serialize, Serializer};

use crate::error::{DecodeError, ReferenceKind, Result};
use crate::operand::StringRef;
use crate::reader::ByteReader;

/// Ordered pool of byte strings shared by every function of a module.
///
/// Entries are addressed 1-based through [`StringRef`]; a raw index of 0 in
/// the stream means "no string".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    strings: Vec<Box<[u8]>>,
}

impl StringTable {
    /// Read the table: a varint count, then `count` length-prefixed byte strings.
    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Self> {
        let count = reader.read_count(1)?;
        let mut strings = Vec::with_capacity(count);

        for _ in 0..count {
            let len = reader.read_varint_usize()?;
            strings.push(Box::from(reader.read_bytes(len)?));
        }

        Ok(Self { strings })
    }

    /// Build a table from owned strings (index 1 is the first element)
    pub fn from_strings<I, S>(strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        Self {
            strings: strings
                .into_iter()
                .map(|s| s.into().into_boxed_slice())
                .collect(),
        }
    }

    /// Look up a string
    #[inline]
    pub fn get(&self, id: StringRef) -> Option<&[u8]> {
        self.strings.get(id.slot()).map(|s| &**s)
    }

    /// Look up a string, replacing invalid UTF-8 sequences
    pub fn get_lossy(&self, id: StringRef) -> Option<Cow<'_, str>> {
        self.get(id).map(String::from_utf8_lossy)
    }

    /// Resolve a raw 1-based index read from the stream (0 = absent).
    pub fn resolve(&self, raw: u32) -> Result<Option<StringRef>> {
        match raw {
            0 => Ok(None),
            n if (n as usize) <= self.strings.len() => Ok(Some(StringRef::new(n))),
            n => Err(DecodeError::dangling(
                ReferenceKind::String,
                n,
                self.strings.len() + 1,
            )),
        }
    }

    /// Read a varint string reference and resolve it
    pub fn read_ref(&self, reader: &mut ByteReader<'_>) -> Result<Option<StringRef>> {
        let raw = reader.read_varint()?;
        self.resolve(raw)
    }

    /// Number of strings
    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the table is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterate over strings in index order
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.strings.iter().map(|s| &**s)
    }
}

impl Serialize for StringTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(String::from_utf8_lossy))
    }
}
