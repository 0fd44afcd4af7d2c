//! Interpreter-side error taxonomy: structural errors raised while walking
//! the image into the instruction pipe, and runtime errors raised while
//! executing it (§7).

use thiserror::Error;

use crate::host::HostError;
use crate::memory::CacheError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("truncated instruction at byte offset {offset}")]
    TruncatedInstruction { offset: usize },
    #[error("unknown opcode 0x{opcode:04X} at byte offset {offset}")]
    UnknownOpcode { offset: usize, opcode: u16 },
    #[error("unknown operand kind 0x{code:02X} at byte offset {offset}")]
    UnknownOperandKind { offset: usize, code: u8 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("jump target {index} out of range [0, {len})")]
    JumpOutOfRange { index: i64, len: usize },
    #[error("register index {0} out of range")]
    RegisterOutOfRange(u8),
    #[error("RAM address {0} out of range")]
    RamOutOfRange(u32),
    #[error("operand stack overflow")]
    StackOverflow,
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("call stack overflow")]
    CallStackOverflow,
    #[error("call stack underflow")]
    CallStackUnderflow,
    #[error("division by zero at instruction {0}")]
    DivisionByZero(usize),
    #[error("operand is not readable in this position")]
    NotReadable,
    #[error("operand is not writable in this position")]
    NotWritable,
    #[error("memory subsystem error: {0}")]
    Memory(#[from] CacheError),
    #[error("host I/O error: {0}")]
    Host(#[from] HostError),
}
