//! Opcode table
//!
//! One row per Luau opcode. The row is the single source of truth for how an
//! instruction word is laid out: which of the A/B/C, D or E fields are
//! meaningful, whether an auxiliary word follows and what it encodes, how a
//! jump target is resolved, and which operand (if any) names a constant.
//!
//! Layouts of the primary word (opcode in the low byte):
//!
//! ```text
//! ABC: [op:8][A:8][B:8][C:8]
//! AD:  [op:8][A:8][D:16 signed]
//! E:   [op:8][E:24 signed]
//! ```

use serde::Serialize;

/// Which fields of the primary word carry operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Format {
    /// Opcode only
    None,
    /// Three 8-bit fields
    Abc,
    /// 8-bit A and signed 16-bit D
    Ad,
    /// Signed 24-bit E
    E,
}

/// Meaning of the auxiliary word following the primary word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuxKind {
    /// No auxiliary word
    None,
    /// Whole word is a constant index
    Constant,
    /// Low byte is a register
    Register,
    /// Packed import path (informative; the constant is named by D)
    Import,
    /// Array part size hint
    TableSize,
    /// Array index the values are stored from
    Count,
    /// Low byte is the variable count, sign bit selects the ipairs fast path
    ForGeneric,
    /// Bit 31 inverts the nil test
    KNil,
    /// Bit 0 is the boolean, bit 31 inverts the test
    KBool,
    /// Low 24 bits are a constant index, bit 31 inverts the test
    KConstant,
    /// Two argument registers in the low two bytes
    RegisterPair,
}

impl AuxKind {
    /// Number of auxiliary words an instruction of this kind occupies
    #[inline]
    pub const fn words(self) -> usize {
        match self {
            Self::None => 0,
            _ => 1,
        }
    }
}

/// How the absolute jump target is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JumpKind {
    /// Not a jump
    None,
    /// `pc + 1 + D`
    D,
    /// `pc + 1 + E`
    E,
    /// `pc + 2 + C`: past the CALL that the fast path replaces
    FastCall,
}

/// Operand that holds a constant index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstantSlot {
    /// No constant operand
    None,
    /// Field B
    B,
    /// Field C
    C,
    /// Field D
    D,
    /// Whole auxiliary word
    Aux,
    /// Low 24 bits of the auxiliary word
    AuxLow24,
}

/// Static description of an opcode's operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperandLayout {
    /// Primary word layout
    pub format: Format,
    /// Auxiliary word meaning
    pub aux: AuxKind,
    /// Jump target resolution
    pub jump: JumpKind,
    /// Constant-bearing operand
    pub constant: ConstantSlot,
}

impl OperandLayout {
    /// Number of auxiliary words following the primary word
    #[inline]
    pub const fn aux_words(&self) -> usize {
        self.aux.words()
    }

    /// Total instruction length in words
    #[inline]
    pub const fn word_count(&self) -> usize {
        1 + self.aux_words()
    }
}

macro_rules! opcode_table {
    ($(
        $(#[$doc:meta])*
        $variant:ident = $byte:literal, $name:literal, $format:ident, $aux:ident, $jump:ident, $k:ident;
    )*) => {
        /// Luau VM opcodes
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[repr(u8)]
        pub enum Opcode {
            $($(#[$doc])* $variant = $byte,)*
        }

        impl Opcode {
            /// Every opcode, in byte order
            pub const ALL: &'static [Opcode] = &[$(Self::$variant,)*];

            /// Convert from raw byte
            pub const fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Disassembly mnemonic
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Operand layout of this opcode
            pub const fn layout(self) -> OperandLayout {
                match self {
                    $(Self::$variant => OperandLayout {
                        format: Format::$format,
                        aux: AuxKind::$aux,
                        jump: JumpKind::$jump,
                        constant: ConstantSlot::$k,
                    },)*
                }
            }
        }
    };
}

opcode_table! {
    /// No-op
    Nop = 0, "NOP", None, None, None, None;
    /// Debugger break
    Break = 1, "BREAK", None, None, None, None;
    /// R(A) = nil
    LoadNil = 2, "LOADNIL", Abc, None, None, None;
    /// R(A) = B, then skip C instructions
    LoadB = 3, "LOADB", Abc, None, None, None;
    /// R(A) = D
    LoadN = 4, "LOADN", Ad, None, None, None;
    /// R(A) = K(D)
    LoadK = 5, "LOADK", Ad, None, None, D;
    /// R(A) = R(B)
    Move = 6, "MOVE", Abc, None, None, None;
    /// R(A) = _G[K(aux)]
    GetGlobal = 7, "GETGLOBAL", Abc, Constant, None, Aux;
    /// _G[K(aux)] = R(A)
    SetGlobal = 8, "SETGLOBAL", Abc, Constant, None, Aux;
    /// R(A) = Upvalue(B)
    GetUpval = 9, "GETUPVAL", Abc, None, None, None;
    /// Upvalue(B) = R(A)
    SetUpval = 10, "SETUPVAL", Abc, None, None, None;
    /// Close upvalues from R(A) upwards
    CloseUpvals = 11, "CLOSEUPVALS", Abc, None, None, None;
    /// R(A) = import K(D)
    GetImport = 12, "GETIMPORT", Ad, Import, None, D;
    /// R(A) = R(B)[R(C)]
    GetTable = 13, "GETTABLE", Abc, None, None, None;
    /// R(B)[R(C)] = R(A)
    SetTable = 14, "SETTABLE", Abc, None, None, None;
    /// R(A) = R(B)[K(aux)]
    GetTableKS = 15, "GETTABLEKS", Abc, Constant, None, Aux;
    /// R(B)[K(aux)] = R(A)
    SetTableKS = 16, "SETTABLEKS", Abc, Constant, None, Aux;
    /// R(A) = R(B)[C + 1]
    GetTableN = 17, "GETTABLEN", Abc, None, None, None;
    /// R(B)[C + 1] = R(A)
    SetTableN = 18, "SETTABLEN", Abc, None, None, None;
    /// R(A) = closure of child prototype D
    NewClosure = 19, "NEWCLOSURE", Ad, None, None, None;
    /// R(A + 1) = R(B); R(A) = R(B)[K(aux)]
    NameCall = 20, "NAMECALL", Abc, Constant, None, Aux;
    /// Call R(A) with B - 1 arguments and C - 1 results
    Call = 21, "CALL", Abc, None, None, None;
    /// Return B - 1 values starting at R(A)
    Return = 22, "RETURN", Abc, None, None, None;
    /// pc += D
    Jump = 23, "JUMP", Ad, None, D, None;
    /// pc += D, with an interrupt check
    JumpBack = 24, "JUMPBACK", Ad, None, D, None;
    /// if R(A) then pc += D
    JumpIf = 25, "JUMPIF", Ad, None, D, None;
    /// if not R(A) then pc += D
    JumpIfNot = 26, "JUMPIFNOT", Ad, None, D, None;
    /// if R(A) == R(aux) then pc += D
    JumpIfEq = 27, "JUMPIFEQ", Ad, Register, D, None;
    /// if R(A) <= R(aux) then pc += D
    JumpIfLe = 28, "JUMPIFLE", Ad, Register, D, None;
    /// if R(A) < R(aux) then pc += D
    JumpIfLt = 29, "JUMPIFLT", Ad, Register, D, None;
    /// if R(A) ~= R(aux) then pc += D
    JumpIfNotEq = 30, "JUMPIFNOTEQ", Ad, Register, D, None;
    /// if not R(A) <= R(aux) then pc += D
    JumpIfNotLe = 31, "JUMPIFNOTLE", Ad, Register, D, None;
    /// if not R(A) < R(aux) then pc += D
    JumpIfNotLt = 32, "JUMPIFNOTLT", Ad, Register, D, None;
    /// R(A) = R(B) + R(C)
    Add = 33, "ADD", Abc, None, None, None;
    /// R(A) = R(B) - R(C)
    Sub = 34, "SUB", Abc, None, None, None;
    /// R(A) = R(B) * R(C)
    Mul = 35, "MUL", Abc, None, None, None;
    /// R(A) = R(B) / R(C)
    Div = 36, "DIV", Abc, None, None, None;
    /// R(A) = R(B) % R(C)
    Mod = 37, "MOD", Abc, None, None, None;
    /// R(A) = R(B) ^ R(C)
    Pow = 38, "POW", Abc, None, None, None;
    /// R(A) = R(B) + K(C)
    AddK = 39, "ADDK", Abc, None, None, C;
    /// R(A) = R(B) - K(C)
    SubK = 40, "SUBK", Abc, None, None, C;
    /// R(A) = R(B) * K(C)
    MulK = 41, "MULK", Abc, None, None, C;
    /// R(A) = R(B) / K(C)
    DivK = 42, "DIVK", Abc, None, None, C;
    /// R(A) = R(B) % K(C)
    ModK = 43, "MODK", Abc, None, None, C;
    /// R(A) = R(B) ^ K(C)
    PowK = 44, "POWK", Abc, None, None, C;
    /// R(A) = R(B) and R(C)
    And = 45, "AND", Abc, None, None, None;
    /// R(A) = R(B) or R(C)
    Or = 46, "OR", Abc, None, None, None;
    /// R(A) = R(B) and K(C)
    AndK = 47, "ANDK", Abc, None, None, C;
    /// R(A) = R(B) or K(C)
    OrK = 48, "ORK", Abc, None, None, C;
    /// R(A) = R(B) .. ... .. R(C)
    Concat = 49, "CONCAT", Abc, None, None, None;
    /// R(A) = not R(B)
    Not = 50, "NOT", Abc, None, None, None;
    /// R(A) = -R(B)
    Minus = 51, "MINUS", Abc, None, None, None;
    /// R(A) = #R(B)
    Length = 52, "LENGTH", Abc, None, None, None;
    /// R(A) = {} with hash size 2^(B - 1) and array size aux
    NewTable = 53, "NEWTABLE", Abc, TableSize, None, None;
    /// R(A) = copy of table template K(D)
    DupTable = 54, "DUPTABLE", Ad, None, None, D;
    /// R(A)[aux...] = R(B) .. R(B + C - 2)
    SetList = 55, "SETLIST", Abc, Count, None, None;
    /// Numeric for loop prologue
    ForNPrep = 56, "FORNPREP", Ad, None, D, None;
    /// Numeric for loop step
    ForNLoop = 57, "FORNLOOP", Ad, None, D, None;
    /// Generic for loop step
    ForGLoop = 58, "FORGLOOP", Ad, ForGeneric, D, None;
    /// Generic for loop prologue specialised for ipairs
    ForGPrepINext = 59, "FORGPREP_INEXT", Ad, None, D, None;
    /// Builtin call with three arguments
    FastCall3 = 60, "FASTCALL3", Abc, RegisterPair, FastCall, None;
    /// Generic for loop prologue specialised for next/pairs
    ForGPrepNext = 61, "FORGPREP_NEXT", Ad, None, D, None;
    /// Enter natively compiled code
    NativeCall = 62, "NATIVECALL", None, None, None, None;
    /// R(A) .. R(A + B - 2) = ...
    GetVarArgs = 63, "GETVARARGS", Abc, None, None, None;
    /// R(A) = shared closure K(D)
    DupClosure = 64, "DUPCLOSURE", Ad, None, None, D;
    /// Vararg function prologue
    PrepVarArgs = 65, "PREPVARARGS", Abc, None, None, None;
    /// R(A) = K(aux)
    LoadKX = 66, "LOADKX", Abc, Constant, None, Aux;
    /// pc += E
    JumpX = 67, "JUMPX", E, None, E, None;
    /// Builtin A call with no register arguments
    FastCall = 68, "FASTCALL", Abc, None, FastCall, None;
    /// Coverage counter
    Coverage = 69, "COVERAGE", E, None, None, None;
    /// Upvalue capture for the preceding NEWCLOSURE
    Capture = 70, "CAPTURE", Abc, None, None, None;
    /// R(A) = K(B) - R(C)
    SubRK = 71, "SUBRK", Abc, None, None, B;
    /// R(A) = K(B) / R(C)
    DivRK = 72, "DIVRK", Abc, None, None, B;
    /// Builtin A call with argument R(B)
    FastCall1 = 73, "FASTCALL1", Abc, None, FastCall, None;
    /// Builtin A call with arguments R(B), R(aux)
    FastCall2 = 74, "FASTCALL2", Abc, Register, FastCall, None;
    /// Builtin A call with arguments R(B), K(aux)
    FastCall2K = 75, "FASTCALL2K", Abc, Constant, FastCall, Aux;
    /// Generic for loop prologue
    ForGPrep = 76, "FORGPREP", Ad, None, D, None;
    /// if R(A) == nil then pc += D
    JumpXEqKNil = 77, "JUMPXEQKNIL", Ad, KNil, D, None;
    /// if R(A) == aux bool then pc += D
    JumpXEqKB = 78, "JUMPXEQKB", Ad, KBool, D, None;
    /// if R(A) == K(aux) number then pc += D
    JumpXEqKN = 79, "JUMPXEQKN", Ad, KConstant, D, AuxLow24;
    /// if R(A) == K(aux) string then pc += D
    JumpXEqKS = 80, "JUMPXEQKS", Ad, KConstant, D, AuxLow24;
    /// R(A) = R(B) // R(C)
    IDiv = 81, "IDIV", Abc, None, None, None;
    /// R(A) = R(B) // K(C)
    IDivK = 82, "IDIVK", Abc, None, None, C;
}

impl Opcode {
    /// Convert to raw byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Whether the instruction transfers control to a computed target
    #[inline]
    pub const fn is_jump(self) -> bool {
        !matches!(self.layout().jump, JumpKind::None)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
