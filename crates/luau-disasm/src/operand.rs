//! Bytecode operands

use serde::Serialize;

/// Virtual register (0-255)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
pub struct Register(pub u8);

impl Register {
    /// Create a new register
    #[inline]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Get register index
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }
}

/// Index into the constant pool of the current function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
pub struct ConstantIndex(pub u32);

impl ConstantIndex {
    /// Create a new constant index
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get index value
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Index into the module's function list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
pub struct FunctionIndex(pub u32);

impl FunctionIndex {
    /// Get index value
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// 1-based reference into the module string table.
///
/// Only produced by [`StringTable::resolve`](crate::StringTable::resolve), so
/// it always points at an existing entry of the table it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
pub struct StringRef(u32);

impl StringRef {
    pub(crate) const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The 1-based id as stored in the bytecode
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// 0-based slot in the table
    #[inline]
    pub(crate) const fn slot(self) -> usize {
        (self.0 - 1) as usize
    }
}

/// Packed import path: `[count:2][id0:10][id1:10][id2:10]`.
///
/// Each id is a constant index of a string constant naming one path segment
/// (`game.Workspace.Part`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
pub struct ImportId(pub u32);

impl ImportId {
    /// Pack up to three constant indices (each below 1024)
    pub const fn pack(ids: &[u32]) -> Self {
        let count = if ids.len() > 3 { 3 } else { ids.len() };
        let mut packed = (count as u32) << 30;
        let mut i = 0;
        while i < count {
            packed |= (ids[i] & 1023) << (20 - 10 * i as u32);
            i += 1;
        }
        Self(packed)
    }

    /// Number of path segments (0-3)
    #[inline]
    pub const fn count(self) -> usize {
        (self.0 >> 30) as usize
    }

    /// Constant indices of the used segments, in path order
    pub fn segments(self) -> impl Iterator<Item = ConstantIndex> {
        let ids = [(self.0 >> 20) & 1023, (self.0 >> 10) & 1023, self.0 & 1023];
        ids.into_iter().take(self.count()).map(ConstantIndex)
    }
}
