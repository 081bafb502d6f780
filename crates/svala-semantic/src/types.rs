use std::ops::BitOr;

use smol_str::SmolStr;
use svala_arena::Idx;
use svala_syntax::NetTypeToken;

use crate::symbols::SymbolId;

pub type TypeId = Idx<Type>;
pub type NetTypeId = Idx<NetType>;

/// Flag bits shared by all integral types.
///
/// The low three bits index the scalar table; the full byte participates
/// in the packed-vector interning key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegralFlags(u8);

impl IntegralFlags {
    pub const TWO_STATE: Self = Self(0);
    pub const FOUR_STATE: Self = Self(1);
    pub const SIGNED: Self = Self(2);
    pub const REG: Self = Self(4);

    /// Bit position where flags start in the vector-interning key.
    pub const BITWIDTH_BITS: u32 = 24;

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for IntegralFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bit,
    Logic,
    Reg,
}

impl ScalarKind {
    pub fn flags(self) -> IntegralFlags {
        match self {
            Self::Bit => IntegralFlags::TWO_STATE,
            Self::Logic => IntegralFlags::FOUR_STATE,
            Self::Reg => IntegralFlags::FOUR_STATE | IntegralFlags::REG,
        }
    }

    pub fn keyword_str(self) -> &'static str {
        match self {
            Self::Bit => "bit",
            Self::Logic => "logic",
            Self::Reg => "reg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedIntKind {
    ShortInt,
    Int,
    LongInt,
    Byte,
    Integer,
    Time,
}

impl PredefinedIntKind {
    pub fn width(self) -> u32 {
        match self {
            Self::ShortInt => 16,
            Self::Int => 32,
            Self::LongInt => 64,
            Self::Byte => 8,
            Self::Integer => 32,
            Self::Time => 64,
        }
    }

    pub fn four_state(self) -> bool {
        matches!(self, Self::Integer | Self::Time)
    }

    pub fn default_signed(self) -> bool {
        !matches!(self, Self::Time)
    }

    pub fn keyword_str(self) -> &'static str {
        match self {
            Self::ShortInt => "shortint",
            Self::Int => "int",
            Self::LongInt => "longint",
            Self::Byte => "byte",
            Self::Integer => "integer",
            Self::Time => "time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatKind {
    Real,
    RealTime,
    ShortReal,
}

impl FloatKind {
    pub fn keyword_str(self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::RealTime => "realtime",
            Self::ShortReal => "shortreal",
        }
    }
}

/// Coarse discriminant used to key per-type system methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Scalar,
    PredefinedInteger,
    Floating,
    PackedArray,
    Enum,
    String,
    CHandle,
    Void,
    Null,
    Event,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Scalar {
        scalar: ScalarKind,
        signed: bool,
    },
    PredefinedInteger {
        int: PredefinedIntKind,
        signed: bool,
    },
    Floating {
        float: FloatKind,
    },
    /// A packed vector over a scalar element, `[width-1:0]`.
    PackedArray {
        element: TypeId,
        width: u32,
        flags: IntegralFlags,
    },
    /// An enum type; `symbol` owns the value members.
    Enum {
        symbol: SymbolId,
        base: TypeId,
    },
    String,
    CHandle,
    Void,
    Null,
    Event,
    Error,
}

/// A semantic type, arena-allocated and interned by the compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub kind: TypeKind,
    pub name: SmolStr,
}

impl Type {
    pub fn tag(&self) -> TypeTag {
        match self.kind {
            TypeKind::Scalar { .. } => TypeTag::Scalar,
            TypeKind::PredefinedInteger { .. } => TypeTag::PredefinedInteger,
            TypeKind::Floating { .. } => TypeTag::Floating,
            TypeKind::PackedArray { .. } => TypeTag::PackedArray,
            TypeKind::Enum { .. } => TypeTag::Enum,
            TypeKind::String => TypeTag::String,
            TypeKind::CHandle => TypeTag::CHandle,
            TypeKind::Void => TypeTag::Void,
            TypeKind::Null => TypeTag::Null,
            TypeKind::Event => TypeTag::Event,
            TypeKind::Error => TypeTag::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TypeKind::Error)
    }

    /// Integral flag bits, for types that have them.
    pub fn integral_flags(&self) -> Option<IntegralFlags> {
        match self.kind {
            TypeKind::Scalar { scalar, signed } => {
                let mut flags = scalar.flags();
                if signed {
                    flags = flags | IntegralFlags::SIGNED;
                }
                Some(flags)
            }
            TypeKind::PackedArray { flags, .. } => Some(flags),
            TypeKind::PredefinedInteger { int, signed } => {
                let mut flags = if int.four_state() {
                    IntegralFlags::FOUR_STATE
                } else {
                    IntegralFlags::TWO_STATE
                };
                if signed {
                    flags = flags | IntegralFlags::SIGNED;
                }
                Some(flags)
            }
            _ => None,
        }
    }
}

/// A built-in net type singleton (wire, tri, supply0, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetType {
    pub token: NetTypeToken,
    pub name: SmolStr,
    pub data_type: TypeId,
}

/// Reasons a constant expression evaluation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstEvalError {
    NonConstant,
    DivideByZero,
    Overflow,
    Unresolved,
    Cycle,
    Unsupported,
}

/// A constant integer value, or the reason it could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstInt {
    Known(i64),
    Error(ConstEvalError),
}

impl ConstInt {
    pub fn known(self) -> Option<i64> {
        match self {
            Self::Known(v) => Some(v),
            Self::Error(_) => None,
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Self::Error(_))
    }
}
