//! The Assembler (AS): a single-pass, line-oriented translator from source
//! text to an image of little-endian `Word`s (§4.4). One label declaration
//! or one instruction per source line; labels resolve to signed pc-relative
//! displacements once the whole source has been seen.

pub mod encoder;
pub mod error;
pub mod label_table;
pub mod lexer;

pub use error::AssembleError;

use encoding::ERR_OPCODE;
use label_table::LabelTable;
use lexer::Token;

use crate::encoding;

/// Assemble `source` into a byte image terminated by the `ERR` sentinel
/// header. Blank lines and comment-only lines are skipped; everything else
/// is either a label declaration (`name:`) or one instruction.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssembleError> {
    let mut image = Vec::new();
    let mut labels = LabelTable::new();
    let mut instruction_index = 0usize;

    for (offset, raw_line) in source.lines().enumerate() {
        let line_no = offset + 1;
        let tokens = lexer::tokenize_line(line_no, raw_line)?;
        if tokens.is_empty() {
            continue;
        }

        if let [Token::Ident(name), Token::Colon] = tokens.as_slice() {
            labels.declare(line_no, name, instruction_index)?;
            continue;
        }

        encoder::encode_instruction(&mut image, &mut labels, instruction_index, line_no, &tokens)?;
        instruction_index += 1;
    }

    let sentinel = encoding::pack_header(ERR_OPCODE, 0, 0);
    image.extend_from_slice(&sentinel.to_le_bytes());

    let patches = labels.finalize()?;
    for (patch_offset, displacement) in patches {
        image[patch_offset..patch_offset + 4].copy_from_slice(&displacement.to_le_bytes());
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_is_just_the_sentinel() {
        let image = assemble("").unwrap();
        assert_eq!(image.len(), 4);
        let word = crate::word::from_le_bytes(image[0..4].try_into().unwrap());
        assert_eq!(encoding::unpack_header(word).0, ERR_OPCODE);
    }

    #[test]
    fn assembly_is_deterministic() {
        let src = "push 3\npush 4\nadd\nout\nhlt\n";
        let a = assemble(src).unwrap();
        let b = assemble(src).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn label_forward_reference_resolves() {
        let src = "jmp skip\npush 1\nskip:\nhlt\n";
        let image = assemble(src).unwrap();
        // instructions: 0 jmp, 1 push, 2 hlt -- 3 words total before sentinel.
        let jmp_operand = crate::word::from_le_bytes(image[4..8].try_into().unwrap());
        assert_eq!(crate::word::as_i32(jmp_operand), 2 - 0);
    }

    #[test]
    fn label_backward_reference_resolves_negative() {
        let src = "top:\npush 1\njmp top\nhlt\n";
        let image = assemble(src).unwrap();
        // instructions: 0 push (after label "top" at index 0), 1 jmp, 2 hlt.
        let jmp_header_offset = 8; // after the push instruction's 8 bytes
        let jmp_operand_offset = jmp_header_offset + 4;
        let jmp_operand = crate::word::from_le_bytes(
            image[jmp_operand_offset..jmp_operand_offset + 4].try_into().unwrap(),
        );
        assert_eq!(crate::word::as_i32(jmp_operand), 0 - 1);
    }

    #[test]
    fn unresolved_label_fails_the_whole_assembly() {
        let src = "jmp nowhere\nhlt\n";
        assert!(assemble(src).is_err());
    }

    #[test]
    fn unknown_mnemonic_fails() {
        assert!(assemble("frobnicate\n").is_err());
    }

    #[test]
    fn redeclared_label_fails() {
        let src = "a:\nhlt\na:\nhlt\n";
        assert!(assemble(src).is_err());
    }

    #[test]
    fn comment_only_and_blank_lines_are_skipped() {
        let src = "; a comment\n\npush 1\n; another\nhlt\n";
        let image = assemble(src).unwrap();
        // 2 instructions (8 bytes each) + sentinel (4 bytes).
        assert_eq!(image.len(), 8 + 8 + 4);
    }
}
