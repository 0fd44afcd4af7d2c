//! Syntax-level errors the assembler can raise. All are fatal: the
//! assembler is a batch tool with no error recovery (§4.4).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error("{line}:{column}: unrecognized mnemonic '{mnemonic}'")]
    UnknownMnemonic {
        line: usize,
        column: usize,
        mnemonic: String,
    },

    #[error("{line}:{column}: illegal operand for '{mnemonic}': {reason}")]
    IllegalOperand {
        line: usize,
        column: usize,
        mnemonic: String,
        reason: String,
    },

    #[error("{line}:{column}: unexpected character '{found}'")]
    UnexpectedChar { line: usize, column: usize, found: char },

    #[error("{line}:{column}: unterminated token")]
    UnterminatedToken { line: usize, column: usize },

    #[error("{line}: label '{name}' is already declared")]
    LabelRedeclared { line: usize, name: String },

    #[error("label '{name}' is used but never declared")]
    UnresolvedLabel { name: String },

    #[error("{line}: empty instruction")]
    EmptyInstruction { line: usize },
}
