use serde::{Deserialize, Serialize};
use std::fmt;

/// Base data types of the bytecode. The numeric codes follow the convention
/// that OR-ing `0x08` into an unsigned code yields its signed counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BaseType {
    Void = 0x00,
    U8 = 0x01,
    U16 = 0x02,
    U32 = 0x03,
    U64 = 0x04,
    S8 = 0x09,
    S16 = 0x0A,
    S32 = 0x0B,
    S64 = 0x0C,
    /// Integer literal; widens losslessly to 64 bits, signedness by context.
    IntConst = 0x0D,
}

impl BaseType {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => BaseType::Void,
            0x01 => BaseType::U8,
            0x02 => BaseType::U16,
            0x03 => BaseType::U32,
            0x04 => BaseType::U64,
            0x09 => BaseType::S8,
            0x0A => BaseType::S16,
            0x0B => BaseType::S32,
            0x0C => BaseType::S64,
            0x0D => BaseType::IntConst,
            _ => return None,
        })
    }

    /// The signed counterpart of this type (identity for already-signed
    /// types and `IntConst`). `None` for `Void`.
    pub fn to_signed(self) -> Option<Self> {
        Self::from_code(self as u8 | 0x08)
    }

    pub fn size_in_bytes(self) -> usize {
        match self {
            BaseType::Void => 0,
            BaseType::U8 | BaseType::S8 => 1,
            BaseType::U16 | BaseType::S16 => 2,
            BaseType::U32 | BaseType::S32 => 4,
            BaseType::U64 | BaseType::S64 | BaseType::IntConst => 8,
        }
    }
}

/// Source-to-target cast selector stored in a `CastValue` opcode's parameter.
///
/// The compiler encodes the full cast matrix; at translation time it
/// collapses to a narrower "exec type": truncations and zero-extensions key
/// the handler on the unsigned narrow width, sign-extensions on the signed
/// source width. The stack cell is always kept canonically extended, so the
/// handler only has to re-interpret the narrow value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CastType {
    Int16To8 = 0x00,
    Int32To8 = 0x01,
    Int64To8 = 0x02,
    Int32To16 = 0x03,
    Int64To16 = 0x04,
    Int64To32 = 0x05,
    Uint8To16 = 0x06,
    Uint8To32 = 0x07,
    Uint8To64 = 0x08,
    Uint16To32 = 0x09,
    Uint16To64 = 0x0A,
    Uint32To64 = 0x0B,
    Sint8To16 = 0x0C,
    Sint8To32 = 0x0D,
    Sint8To64 = 0x0E,
    Sint16To32 = 0x0F,
    Sint16To64 = 0x10,
    Sint32To64 = 0x11,
}

impl CastType {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => CastType::Int16To8,
            0x01 => CastType::Int32To8,
            0x02 => CastType::Int64To8,
            0x03 => CastType::Int32To16,
            0x04 => CastType::Int64To16,
            0x05 => CastType::Int64To32,
            0x06 => CastType::Uint8To16,
            0x07 => CastType::Uint8To32,
            0x08 => CastType::Uint8To64,
            0x09 => CastType::Uint16To32,
            0x0A => CastType::Uint16To64,
            0x0B => CastType::Uint32To64,
            0x0C => CastType::Sint8To16,
            0x0D => CastType::Sint8To32,
            0x0E => CastType::Sint8To64,
            0x0F => CastType::Sint16To32,
            0x10 => CastType::Sint16To64,
            0x11 => CastType::Sint32To64,
            _ => return None,
        })
    }

    /// The type the cast handler is specialized on.
    pub fn exec_type(self) -> BaseType {
        match self {
            // Cast down: signedness of the target is irrelevant for the bits
            CastType::Int16To8 | CastType::Int32To8 | CastType::Int64To8 => BaseType::U8,
            CastType::Int32To16 | CastType::Int64To16 => BaseType::U16,
            CastType::Int64To32 => BaseType::U32,
            // Cast up from unsigned: add zeroes
            CastType::Uint8To16 | CastType::Uint8To32 | CastType::Uint8To64 => BaseType::U8,
            CastType::Uint16To32 | CastType::Uint16To64 => BaseType::U16,
            CastType::Uint32To64 => BaseType::U32,
            // Cast up from signed: replicate the sign bit
            CastType::Sint8To16 | CastType::Sint8To32 | CastType::Sint8To64 => BaseType::S8,
            CastType::Sint16To32 | CastType::Sint16To64 => BaseType::S16,
            CastType::Sint32To64 => BaseType::S32,
        }
    }
}

/// Opcode types of the static, compiler-produced bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpcodeType {
    Nop,
    MoveStack,
    MoveVarStack,
    PushConstant,
    Duplicate,
    Exchange,
    GetVariableValue,
    SetVariableValue,
    ReadMemory,
    WriteMemory,
    CastValue,
    MakeBool,
    ArithmAdd,
    ArithmSub,
    ArithmMul,
    ArithmDiv,
    ArithmMod,
    ArithmAnd,
    ArithmOr,
    ArithmXor,
    ArithmShl,
    ArithmShr,
    CompareEq,
    CompareNeq,
    CompareLt,
    CompareLe,
    CompareGt,
    CompareGe,
    ArithmNeg,
    ArithmNot,
    ArithmBitnot,
    Jump,
    JumpConditional,
    Call,
    Return,
    ExternalCall,
    ExternalJump,
}

impl OpcodeType {
    /// Control transfers are translated but executed by the outer dispatch
    /// loop, never by the core executors.
    pub fn is_control_transfer(self) -> bool {
        matches!(
            self,
            OpcodeType::Jump
                | OpcodeType::JumpConditional
                | OpcodeType::Call
                | OpcodeType::Return
                | OpcodeType::ExternalCall
                | OpcodeType::ExternalJump
        )
    }
}

/// One static opcode as produced by the compiler.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opcode {
    pub opcode_type: OpcodeType,
    pub data_type: BaseType,
    pub parameter: i64,
}

impl Opcode {
    pub fn new(opcode_type: OpcodeType, data_type: BaseType, parameter: i64) -> Self {
        Self {
            opcode_type,
            data_type,
            parameter,
        }
    }

    /// Shorthand for opcodes whose data type does not matter.
    pub fn untyped(opcode_type: OpcodeType, parameter: i64) -> Self {
        Self::new(opcode_type, BaseType::Void, parameter)
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}<{:?}> {}",
            self.opcode_type, self.data_type, self.parameter
        )
    }
}
