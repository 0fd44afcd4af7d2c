//! The Host I/O Stub (HS): the only suspension point in the VM (§4.6/§5).
//! `in`/`out` go through this trait; everything else runs to completion on
//! the calling thread.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::word::{self, Word};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum HostError {
    #[error("host read failed: {0}")]
    ReadFailed(String),
    #[error("host write failed: {0}")]
    WriteFailed(String),
    #[error("host input exhausted")]
    InputExhausted,
}

/// Blocking read/write of a single word to/from the operator.
pub trait HostIo {
    fn read_word(&mut self) -> Result<Word, HostError>;
    fn write_word(&mut self, value: Word) -> Result<(), HostError>;
}

/// Reads/writes decimal-integer words over stdin/stdout.
pub struct StdIoHost {
    stdin: io::Stdin,
    stdout: io::Stdout,
}

impl StdIoHost {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            stdout: io::stdout(),
        }
    }
}

impl Default for StdIoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostIo for StdIoHost {
    fn read_word(&mut self) -> Result<Word, HostError> {
        let mut line = String::new();
        let read = self
            .stdin
            .lock()
            .read_line(&mut line)
            .map_err(|e| HostError::ReadFailed(e.to_string()))?;
        if read == 0 {
            return Err(HostError::InputExhausted);
        }
        let value: i32 = line
            .trim()
            .parse()
            .map_err(|_| HostError::ReadFailed(format!("not a decimal integer: {:?}", line.trim())))?;
        Ok(word::from_i32(value))
    }

    fn write_word(&mut self, value: Word) -> Result<(), HostError> {
        writeln!(self.stdout, "{}", word::as_i32(value)).map_err(|e| HostError::WriteFailed(e.to_string()))
    }
}

/// In-memory host for tests: a queue of input words and a log of output
/// words, with no real I/O.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    pub inputs: VecDeque<Word>,
    pub outputs: Vec<Word>,
}

impl ScriptedHost {
    pub fn new(inputs: impl IntoIterator<Item = Word>) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            outputs: Vec::new(),
        }
    }
}

impl HostIo for ScriptedHost {
    fn read_word(&mut self) -> Result<Word, HostError> {
        self.inputs.pop_front().ok_or(HostError::InputExhausted)
    }

    fn write_word(&mut self, value: Word) -> Result<(), HostError> {
        self.outputs.push(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_host_round_trips() {
        let mut host = ScriptedHost::new([1, 2, 3]);
        assert_eq!(host.read_word(), Ok(1));
        host.write_word(42).unwrap();
        assert_eq!(host.outputs, vec![42]);
    }

    #[test]
    fn scripted_host_exhaustion_is_an_error() {
        let mut host = ScriptedHost::new([]);
        assert_eq!(host.read_word(), Err(HostError::InputExhausted));
    }
}
