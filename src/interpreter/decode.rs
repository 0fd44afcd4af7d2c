//! Walks the image into the instruction pipe at load time, and decodes one
//! instruction's header + operand words at execute time (§4.5's load/
//! execute phases).

use super::error::LoadError;
use crate::encoding::{self, ERR_OPCODE};
use crate::operand::{Operand, OperandKind};
use crate::word::Word;

pub struct DecodedInstruction {
    pub opcode: u16,
    pub lhs: Operand,
    pub rhs: Operand,
}

fn read_word(image: &[u8], offset: usize) -> Result<Word, LoadError> {
    let end = offset.checked_add(4).ok_or(LoadError::TruncatedInstruction { offset })?;
    if end > image.len() {
        return Err(LoadError::TruncatedInstruction { offset });
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&image[offset..end]);
    Ok(Word::from_le_bytes(buf))
}

fn decode_operand(image: &[u8], cursor: &mut usize, kind: OperandKind, instr_offset: usize) -> Result<Operand, LoadError> {
    let operand = match kind {
        OperandKind::Nul => Operand::Nul,
        OperandKind::Imm => {
            let w = read_word(image, *cursor)?;
            *cursor += 4;
            Operand::Imm(w as i32)
        }
        OperandKind::Flt => {
            let w = read_word(image, *cursor)?;
            *cursor += 4;
            Operand::Flt(f32::from_bits(w))
        }
        OperandKind::Reg => {
            let w = read_word(image, *cursor)?;
            *cursor += 4;
            Operand::Reg(w as u8)
        }
        OperandKind::Lbl => {
            let w = read_word(image, *cursor)?;
            *cursor += 4;
            Operand::Lbl(w as i32)
        }
        OperandKind::MemImm => {
            let w = read_word(image, *cursor)?;
            *cursor += 4;
            Operand::MemImm(w)
        }
        OperandKind::MemReg => {
            let w = read_word(image, *cursor)?;
            *cursor += 4;
            Operand::MemReg(w as u8)
        }
        OperandKind::MemRegImm => {
            let reg = read_word(image, *cursor)?;
            *cursor += 4;
            let imm = read_word(image, *cursor)?;
            *cursor += 4;
            Operand::MemRegImm(reg as u8, imm as i32)
        }
        OperandKind::MemRegReg => {
            let r1 = read_word(image, *cursor)?;
            *cursor += 4;
            let r2 = read_word(image, *cursor)?;
            *cursor += 4;
            Operand::MemRegReg(r1 as u8, r2 as u8)
        }
    };
    let _ = instr_offset;
    Ok(operand)
}

/// Decode the instruction starting at `offset`. Returns the decoded
/// instruction and the byte offset one past its last operand word.
pub fn decode_at(image: &[u8], offset: usize) -> Result<(DecodedInstruction, usize), LoadError> {
    let header = read_word(image, offset)?;
    let (opcode, lhs_code, rhs_code) = encoding::unpack_header(header);
    let lhs_kind = OperandKind::from_code(lhs_code).ok_or(LoadError::UnknownOperandKind { offset, code: lhs_code })?;
    let rhs_kind = OperandKind::from_code(rhs_code).ok_or(LoadError::UnknownOperandKind { offset, code: rhs_code })?;

    let mut cursor = offset + 4;
    let lhs = decode_operand(image, &mut cursor, lhs_kind, offset)?;
    let rhs = decode_operand(image, &mut cursor, rhs_kind, offset)?;

    Ok((DecodedInstruction { opcode, lhs, rhs }, cursor))
}

/// Walk the whole image once, building `pipe[i] = byte offset of instruction i`.
/// Stops at the `ERR` sentinel or at the end of the image (§4.5).
pub fn build_pipe(image: &[u8]) -> Result<Vec<usize>, LoadError> {
    let mut pipe = Vec::new();
    let mut offset = 0usize;

    while offset < image.len() {
        let (instr, next) = decode_at(image, offset)?;
        if instr.opcode == ERR_OPCODE {
            break;
        }
        if encoding::lookup_opcode(instr.opcode).is_none() {
            return Err(LoadError::UnknownOpcode { offset, opcode: instr.opcode });
        }
        pipe.push(offset);
        offset = next;
    }

    Ok(pipe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;

    #[test]
    fn pipe_has_one_entry_per_instruction() {
        let image = assemble("push 1\npush 2\nadd\nout\nhlt\n").unwrap();
        let pipe = build_pipe(&image).unwrap();
        assert_eq!(pipe.len(), 5);
    }

    #[test]
    fn truncated_image_is_an_error() {
        let image = vec![0x20, 0x00, 0x20, 0x00]; // header only, missing IMM operand word
        assert!(build_pipe(&image).is_err());
    }
}
