//! The top-level error type the CLI boundary deals in: every component
//! error folds into one of these two phases, each rendered as a single-line
//! `phase: diagnostic` per §7.

use thiserror::Error;

use crate::assembler::AssembleError;
use crate::interpreter::{LoadError, RuntimeError};

#[derive(Debug, Error)]
pub enum VmError {
    #[error("assemble: {0}")]
    Assemble(#[from] AssembleError),

    #[error("run: {0}")]
    Load(#[from] LoadError),

    #[error("run: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("run: {0}")]
    Io(#[from] std::io::Error),
}
