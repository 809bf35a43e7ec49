use crate::ConstantIndex;
use std::fmt;

/// Decoded instructions produced by an [InstructionReader](crate::InstructionReader) for
/// execution in the runtime
///
/// For descriptions of each instruction's purpose, see corresponding [Op](crate::Op)
/// entries.
#[allow(missing_docs)]
pub enum Instruction {
    Error {
        message: String,
    },
    LoadConst {
        constant: ConstantIndex,
    },
    LoadNull,
    LoadUndef,
    LoadTrue,
    LoadFalse,
    LoadName {
        name: ConstantIndex,
    },
    StoreName {
        name: ConstantIndex,
    },
    LoadUpvalue {
        index: u8,
    },
    StoreUpvalue {
        index: u8,
    },
    Pop,
    BinaryOp {
        op: BinaryOp,
    },
    Not,
    Negate,
    MakeList {
        count: u32,
    },
    MakeMap {
        count: u32,
    },
    MakeSet {
        count: u32,
    },
    IndexGet,
    IndexSet,
    AttrGet {
        name: ConstantIndex,
    },
    AttrSet {
        name: ConstantIndex,
    },
    AttrCall {
        name: ConstantIndex,
        arg_count: u8,
    },
    Jump {
        offset: u16,
    },
    JumpBack {
        offset: u16,
    },
    JumpIfFalse {
        offset: u16,
    },
    JumpIfTrue {
        offset: u16,
    },
    Call {
        arg_count: u8,
    },
    Return,
    ReturnNone,
    MakeFunction {
        function: u32,
    },
    MakeClass {
        class: u32,
    },
    TryStart {
        catch_offset: u16,
    },
    TryEnd,
    Raise,
    Deconstruct,
}

/// The binary operations performed by the [Instruction::BinaryOp] instruction
///
/// Each operation pops its right-hand side, then its left-hand side, and pushes the
/// result.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        let symbol = match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            Remainder => "%",
            Power => "**",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            ShiftLeft => "<<",
            ShiftRight => ">>",
            Less => "<",
            LessOrEqual => "<=",
            Greater => ">",
            GreaterOrEqual => ">=",
            Equal => "==",
            NotEqual => "!=",
            And => "&&",
            Or => "||",
        };
        f.write_str(symbol)
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match self {
            Error { message } => write!(f, "Error: {message}"),
            LoadConst { constant } => write!(f, "LoadConst\tconstant: {constant}"),
            LoadNull => write!(f, "LoadNull"),
            LoadUndef => write!(f, "LoadUndef"),
            LoadTrue => write!(f, "LoadTrue"),
            LoadFalse => write!(f, "LoadFalse"),
            LoadName { name } => write!(f, "LoadName\tname: {name}"),
            StoreName { name } => write!(f, "StoreName\tname: {name}"),
            LoadUpvalue { index } => write!(f, "LoadUpvalue\tindex: {index}"),
            StoreUpvalue { index } => write!(f, "StoreUpvalue\tindex: {index}"),
            Pop => write!(f, "Pop"),
            BinaryOp { op } => write!(f, "BinaryOp\top: {op}"),
            Not => write!(f, "Not"),
            Negate => write!(f, "Negate"),
            MakeList { count } => write!(f, "MakeList\tcount: {count}"),
            MakeMap { count } => write!(f, "MakeMap\tcount: {count}"),
            MakeSet { count } => write!(f, "MakeSet\tcount: {count}"),
            IndexGet => write!(f, "IndexGet"),
            IndexSet => write!(f, "IndexSet"),
            AttrGet { name } => write!(f, "AttrGet\tname: {name}"),
            AttrSet { name } => write!(f, "AttrSet\tname: {name}"),
            AttrCall { name, arg_count } => {
                write!(f, "AttrCall\tname: {name}\targs: {arg_count}")
            }
            Jump { offset } => write!(f, "Jump\toffset: {offset}"),
            JumpBack { offset } => write!(f, "JumpBack\toffset: {offset}"),
            JumpIfFalse { offset } => write!(f, "JumpIfFalse\toffset: {offset}"),
            JumpIfTrue { offset } => write!(f, "JumpIfTrue\toffset: {offset}"),
            Call { arg_count } => write!(f, "Call\targs: {arg_count}"),
            Return => write!(f, "Return"),
            ReturnNone => write!(f, "ReturnNone"),
            MakeFunction { function } => write!(f, "MakeFunction\tfunction: {function}"),
            MakeClass { class } => write!(f, "MakeClass\tclass: {class}"),
            TryStart { catch_offset } => write!(f, "TryStart\tcatch: {catch_offset}"),
            TryEnd => write!(f, "TryEnd"),
            Raise => write!(f, "Raise"),
            Deconstruct => write!(f, "Deconstruct"),
        }
    }
}
