//! Contains the bytecode model shared by Quill's compiler and runtime

#![warn(missing_docs)]

mod builder;
mod constant_pool;
mod instruction;
mod instruction_reader;
mod op;
mod program;

pub use crate::{
    builder::{BuilderError, JumpPlaceholder, ProgramBuilder},
    constant_pool::{Constant, ConstantIndex, ConstantPool, ConstantPoolBuilder},
    instruction::{BinaryOp, Instruction},
    instruction_reader::InstructionReader,
    op::Op,
    program::{ClassInfo, FunctionInfo, Program},
};
