//! Parses one tokenized line into a `[header][lhs words][rhs words]` chunk
//! and appends it to the image. This is the single-pass step that consumes
//! the Lexer, the Label Table and the Encoding Registry together (§4.4); it
//! never hardcodes an opcode value or an operand's word length of its own.

use super::error::AssembleError;
use super::label_table::LabelTable;
use super::lexer::Token;
use crate::encoding::{self, OperandClass};
use crate::operand::OperandKind;
use crate::word::Word;

/// An operand as parsed from source, before label uses are patched into
/// signed pc-relative displacements.
#[derive(Debug, Clone, PartialEq)]
enum ParsedOperand {
    Nul,
    Imm(i32),
    Flt(f32),
    Reg(u8),
    Label(String),
    MemImm(u32),
    MemReg(u8),
    MemRegImm(u8, i32),
    MemRegReg(u8, u8),
}

impl ParsedOperand {
    fn kind(&self) -> OperandKind {
        match self {
            ParsedOperand::Nul => OperandKind::Nul,
            ParsedOperand::Imm(_) => OperandKind::Imm,
            ParsedOperand::Flt(_) => OperandKind::Flt,
            ParsedOperand::Reg(_) => OperandKind::Reg,
            ParsedOperand::Label(_) => OperandKind::Lbl,
            ParsedOperand::MemImm(_) => OperandKind::MemImm,
            ParsedOperand::MemReg(_) => OperandKind::MemReg,
            ParsedOperand::MemRegImm(..) => OperandKind::MemRegImm,
            ParsedOperand::MemRegReg(..) => OperandKind::MemRegReg,
        }
    }
}

fn illegal_operand(mnemonic: &str, line: usize, reason: &str) -> AssembleError {
    AssembleError::IllegalOperand {
        line,
        column: 1,
        mnemonic: mnemonic.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_register(toks: &mut &[Token]) -> Option<u8> {
    if let Some(Token::Ident(name)) = toks.first() {
        if let Some(idx) = encoding::lookup_register(name) {
            *toks = &toks[1..];
            return Some(idx);
        }
    }
    None
}

fn parse_number(toks: &mut &[Token]) -> Option<ParsedOperand> {
    match toks.first() {
        Some(Token::Imm(v)) => {
            let v = *v;
            *toks = &toks[1..];
            Some(ParsedOperand::Imm(v))
        }
        Some(Token::Flt(v)) => {
            let v = *v;
            *toks = &toks[1..];
            Some(ParsedOperand::Flt(v))
        }
        _ => None,
    }
}

fn parse_label(toks: &mut &[Token]) -> Option<String> {
    if let Some(Token::Ident(name)) = toks.first() {
        let name = name.clone();
        *toks = &toks[1..];
        return Some(name);
    }
    None
}

/// `operand_inside := IMM | REG | REG '+' IMM | REG '+' REG` (§4.4's grammar).
fn parse_memory(toks: &mut &[Token], mnemonic: &str, line: usize) -> Result<Option<ParsedOperand>, AssembleError> {
    if !matches!(toks.first(), Some(Token::LBracket)) {
        return Ok(None);
    }
    *toks = &toks[1..];

    let inner = if let Some(Token::Imm(v)) = toks.first() {
        let v = *v;
        *toks = &toks[1..];
        ParsedOperand::MemImm(v as u32)
    } else if let Some(reg) = parse_register(toks) {
        if matches!(toks.first(), Some(Token::Plus)) {
            *toks = &toks[1..];
            if let Some(Token::Imm(v)) = toks.first() {
                let v = *v;
                *toks = &toks[1..];
                ParsedOperand::MemRegImm(reg, v)
            } else if let Some(reg2) = parse_register(toks) {
                ParsedOperand::MemRegReg(reg, reg2)
            } else {
                return Err(illegal_operand(mnemonic, line, "expected a register or immediate after '+'"));
            }
        } else {
            ParsedOperand::MemReg(reg)
        }
    } else {
        return Err(illegal_operand(mnemonic, line, "expected an immediate or register inside '['"));
    };

    if !matches!(toks.first(), Some(Token::RBracket)) {
        return Err(illegal_operand(mnemonic, line, "missing closing ']'"));
    }
    *toks = &toks[1..];
    Ok(Some(inner))
}

/// Parse one operand slot per its `OperandClass`, trying register, then
/// memory, then (where admitted) immediate/float, then label, in that order
/// (§4.4: identifiers are first tried as register names; if no match, as a
/// label use).
fn parse_operand(class: OperandClass, mnemonic: &str, line: usize, toks: &mut &[Token]) -> Result<ParsedOperand, AssembleError> {
    match class {
        OperandClass::None => {
            if toks.is_empty() {
                Ok(ParsedOperand::Nul)
            } else {
                Err(illegal_operand(mnemonic, line, "does not take an operand here"))
            }
        }
        OperandClass::RegOrMem => {
            if let Some(reg) = parse_register(toks) {
                return Ok(ParsedOperand::Reg(reg));
            }
            if let Some(mem) = parse_memory(toks, mnemonic, line)? {
                return Ok(mem);
            }
            Err(illegal_operand(mnemonic, line, "expected a register or memory operand"))
        }
        OperandClass::Any => {
            if let Some(reg) = parse_register(toks) {
                return Ok(ParsedOperand::Reg(reg));
            }
            if let Some(mem) = parse_memory(toks, mnemonic, line)? {
                return Ok(mem);
            }
            if let Some(num) = parse_number(toks) {
                return Ok(num);
            }
            if let Some(name) = parse_label(toks) {
                return Ok(ParsedOperand::Label(name));
            }
            Err(illegal_operand(mnemonic, line, "expected an operand"))
        }
        OperandClass::LabelCapable => {
            if let Some(reg) = parse_register(toks) {
                return Ok(ParsedOperand::Reg(reg));
            }
            if let Some(mem) = parse_memory(toks, mnemonic, line)? {
                return Ok(mem);
            }
            if let Some(Token::Imm(v)) = toks.first() {
                let v = *v;
                *toks = &toks[1..];
                return Ok(ParsedOperand::Imm(v));
            }
            if let Some(name) = parse_label(toks) {
                return Ok(ParsedOperand::Label(name));
            }
            Err(illegal_operand(mnemonic, line, "expected a register, memory, immediate or label operand"))
        }
    }
}

fn push_word(image: &mut Vec<u8>, word: Word) {
    image.extend_from_slice(&word.to_le_bytes());
}

fn emit_operand(image: &mut Vec<u8>, labels: &mut LabelTable, instruction_index: usize, operand: ParsedOperand) {
    match operand {
        ParsedOperand::Nul => {}
        ParsedOperand::Imm(v) => push_word(image, v as u32),
        ParsedOperand::Flt(v) => push_word(image, v.to_bits()),
        ParsedOperand::Reg(r) => push_word(image, r as u32),
        ParsedOperand::Label(name) => {
            let patch_offset = image.len();
            let use_index = labels.record_use(&name, instruction_index, patch_offset);
            push_word(image, use_index);
        }
        ParsedOperand::MemImm(a) => push_word(image, a),
        ParsedOperand::MemReg(r) => push_word(image, r as u32),
        ParsedOperand::MemRegImm(r, a) => {
            push_word(image, r as u32);
            push_word(image, a as u32);
        }
        ParsedOperand::MemRegReg(r1, r2) => {
            push_word(image, r1 as u32);
            push_word(image, r2 as u32);
        }
    }
}

/// Encode one already-tokenized instruction line (a label declaration must
/// have been handled by the caller before reaching here). Appends the
/// header and operand words to `image` and advances `instruction_index`.
pub fn encode_instruction(
    image: &mut Vec<u8>,
    labels: &mut LabelTable,
    instruction_index: usize,
    line: usize,
    tokens: &[Token],
) -> Result<(), AssembleError> {
    let mut rest = tokens;
    let Some(Token::Ident(mnemonic)) = rest.first() else {
        return Err(AssembleError::EmptyInstruction { line });
    };
    let mnemonic = mnemonic.clone();
    rest = &rest[1..];

    let info = encoding::lookup_mnemonic(&mnemonic).ok_or_else(|| AssembleError::UnknownMnemonic {
        line,
        column: 1,
        mnemonic: mnemonic.clone(),
    })?;

    let lhs = parse_operand(info.lhs_class, &mnemonic, line, &mut rest)?;
    if mnemonic == encoding::LOOP_MNEMONIC && !matches!(lhs, ParsedOperand::Label(_)) {
        return Err(illegal_operand(&mnemonic, line, "'loop' admits only a label operand"));
    }

    let rhs = parse_operand(info.rhs_class, &mnemonic, line, &mut rest)?;

    if !rest.is_empty() {
        return Err(illegal_operand(&mnemonic, line, "unexpected trailing tokens"));
    }

    let header = encoding::pack_header(info.opcode, lhs.kind().code(), rhs.kind().code());
    push_word(image, header);
    emit_operand(image, labels, instruction_index, lhs);
    emit_operand(image, labels, instruction_index, rhs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::lexer::tokenize_line;

    fn encode_line(line_no: usize, src: &str, image: &mut Vec<u8>, labels: &mut LabelTable, idx: usize) {
        let toks = tokenize_line(line_no, src).unwrap();
        encode_instruction(image, labels, idx, line_no, &toks).unwrap();
    }

    #[test]
    fn push_immediate_emits_header_and_one_word() {
        let mut image = Vec::new();
        let mut labels = LabelTable::new();
        encode_line(1, "push 3", &mut image, &mut labels, 0);
        assert_eq!(image.len(), 8);
        let header = crate::word::from_le_bytes(image[0..4].try_into().unwrap());
        let (opcode, lhs, rhs) = encoding::unpack_header(header);
        assert_eq!(opcode, 0x0020);
        assert_eq!(lhs, OperandKind::Imm.code());
        assert_eq!(rhs, OperandKind::Nul.code());
        let operand = crate::word::from_le_bytes(image[4..8].try_into().unwrap());
        assert_eq!(crate::word::as_i32(operand), 3);
    }

    #[test]
    fn mov_register_to_memory_reg_plus_imm_emits_three_words() {
        let mut image = Vec::new();
        let mut labels = LabelTable::new();
        encode_line(1, "mov [bx+4], ax", &mut image, &mut labels, 0);
        assert_eq!(image.len(), 4 + 4 + 4 + 4);
    }

    #[test]
    fn loop_rejects_non_label_operand() {
        let mut image = Vec::new();
        let mut labels = LabelTable::new();
        let toks = tokenize_line(1, "loop 5").unwrap();
        assert!(encode_instruction(&mut image, &mut labels, 0, 1, &toks).is_err());
    }

    #[test]
    fn unknown_mnemonic_is_fatal() {
        let mut image = Vec::new();
        let mut labels = LabelTable::new();
        let toks = tokenize_line(1, "frobnicate ax").unwrap();
        assert!(encode_instruction(&mut image, &mut labels, 0, 1, &toks).is_err());
    }

    #[test]
    fn jmp_to_label_records_a_pending_use() {
        let mut image = Vec::new();
        let mut labels = LabelTable::new();
        encode_line(1, "jmp done", &mut image, &mut labels, 0);
        labels.declare(2, "done", 1).unwrap();
        let patches = labels.finalize().unwrap();
        assert_eq!(patches.len(), 1);
    }
}
