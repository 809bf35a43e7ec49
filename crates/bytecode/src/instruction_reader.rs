use crate::{Instruction, Op, Program};
use std::rc::Rc;

/// An iterator that converts bytecode into a series of [Instruction]s
#[derive(Clone, Default)]
pub struct InstructionReader {
    /// The program that the reader is reading from
    pub program: Rc<Program>,
    /// The reader's instruction pointer
    pub ip: usize,
}

impl InstructionReader {
    /// Initializes a reader with the given program
    pub fn new(program: Rc<Program>) -> Self {
        Self { program, ip: 0 }
    }
}

impl Iterator for InstructionReader {
    type Item = Instruction;

    fn next(&mut self) -> Option<Self::Item> {
        use Instruction::*;

        macro_rules! get_u8 {
            () => {{
                match self.program.bytes.get(self.ip) {
                    Some(byte) => {
                        self.ip += 1;
                        *byte
                    }
                    None => return out_of_bounds_access_error(self.ip),
                }
            }};
        }

        macro_rules! get_u16 {
            () => {{
                match self.program.bytes.get(self.ip..self.ip + 2) {
                    Some(u16_bytes) => {
                        self.ip += 2;
                        u16::from_le_bytes(u16_bytes.try_into().unwrap())
                    }
                    None => return out_of_bounds_access_error(self.ip),
                }
            }};
        }

        macro_rules! get_var_u32 {
            () => {{
                let mut result = 0;
                let mut shift_amount = 0;
                loop {
                    let Some(&byte) = self.program.bytes.get(self.ip) else {
                        return out_of_bounds_access_error(self.ip);
                    };
                    self.ip += 1;
                    result |= (byte as u32 & 0x7f) << shift_amount;
                    if byte & 0x80 == 0 {
                        break;
                    } else {
                        shift_amount += 7;
                    }
                }
                result
            }};
        }

        macro_rules! binary_op {
            ($op:ident) => {
                Some(Instruction::BinaryOp {
                    op: crate::instruction::BinaryOp::$op,
                })
            };
        }

        let op_ip = self.ip;
        let op = match self.program.bytes.get(op_ip) {
            Some(op) => Op::from(*op),
            None => return None,
        };
        self.ip += 1;

        match op {
            Op::LoadConst => Some(LoadConst {
                constant: get_var_u32!().into(),
            }),
            Op::LoadNull => Some(LoadNull),
            Op::LoadUndef => Some(LoadUndef),
            Op::LoadTrue => Some(LoadTrue),
            Op::LoadFalse => Some(LoadFalse),
            Op::LoadName => Some(LoadName {
                name: get_var_u32!().into(),
            }),
            Op::StoreName => Some(StoreName {
                name: get_var_u32!().into(),
            }),
            Op::LoadUpvalue => Some(LoadUpvalue { index: get_u8!() }),
            Op::StoreUpvalue => Some(StoreUpvalue { index: get_u8!() }),
            Op::Pop => Some(Pop),
            Op::Add => binary_op!(Add),
            Op::Subtract => binary_op!(Subtract),
            Op::Multiply => binary_op!(Multiply),
            Op::Divide => binary_op!(Divide),
            Op::Remainder => binary_op!(Remainder),
            Op::Power => binary_op!(Power),
            Op::BitAnd => binary_op!(BitAnd),
            Op::BitOr => binary_op!(BitOr),
            Op::BitXor => binary_op!(BitXor),
            Op::ShiftLeft => binary_op!(ShiftLeft),
            Op::ShiftRight => binary_op!(ShiftRight),
            Op::Less => binary_op!(Less),
            Op::LessOrEqual => binary_op!(LessOrEqual),
            Op::Greater => binary_op!(Greater),
            Op::GreaterOrEqual => binary_op!(GreaterOrEqual),
            Op::Equal => binary_op!(Equal),
            Op::NotEqual => binary_op!(NotEqual),
            Op::And => binary_op!(And),
            Op::Or => binary_op!(Or),
            Op::Not => Some(Not),
            Op::Negate => Some(Negate),
            Op::MakeList => Some(MakeList {
                count: get_var_u32!(),
            }),
            Op::MakeMap => Some(MakeMap {
                count: get_var_u32!(),
            }),
            Op::MakeSet => Some(MakeSet {
                count: get_var_u32!(),
            }),
            Op::IndexGet => Some(IndexGet),
            Op::IndexSet => Some(IndexSet),
            Op::AttrGet => Some(AttrGet {
                name: get_var_u32!().into(),
            }),
            Op::AttrSet => Some(AttrSet {
                name: get_var_u32!().into(),
            }),
            Op::AttrCall => Some(AttrCall {
                name: get_var_u32!().into(),
                arg_count: get_u8!(),
            }),
            Op::Jump => Some(Jump { offset: get_u16!() }),
            Op::JumpBack => Some(JumpBack { offset: get_u16!() }),
            Op::JumpIfFalse => Some(JumpIfFalse { offset: get_u16!() }),
            Op::JumpIfTrue => Some(JumpIfTrue { offset: get_u16!() }),
            Op::Call => Some(Call {
                arg_count: get_u8!(),
            }),
            Op::Return => Some(Return),
            Op::ReturnNone => Some(ReturnNone),
            Op::MakeFunction => Some(MakeFunction {
                function: get_var_u32!(),
            }),
            Op::MakeClass => Some(MakeClass {
                class: get_var_u32!(),
            }),
            Op::TryStart => Some(TryStart {
                catch_offset: get_u16!(),
            }),
            Op::TryEnd => Some(TryEnd),
            Op::Raise => Some(Raise),
            Op::Deconstruct => Some(Deconstruct),
            _ => Some(Error {
                message: format!("Unexpected opcode {op:?} found at instruction {op_ip}"),
            }),
        }
    }
}

#[inline(never)]
fn out_of_bounds_access_error(ip: usize) -> Option<Instruction> {
    Some(Instruction::Error {
        message: format!("Instruction access out of bounds at {ip}"),
    })
}
