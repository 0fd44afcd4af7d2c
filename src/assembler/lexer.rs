//! Hand-written tokenizer over a single line of source text. The assembler
//! is line-oriented (§4.4): one label declaration or one instruction per
//! line, `;` runs a comment to end of line, and commas between operands are
//! just punctuation with no grammatical weight.

use super::error::AssembleError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Imm(i32),
    Flt(f32),
    Colon,
    LBracket,
    RBracket,
    Plus,
}

/// Split `line` (comment already allowed, stripped here) into tokens.
/// `line_no` is 1-based, used only for diagnostics.
pub fn tokenize_line(line_no: usize, line: &str) -> Result<Vec<Token>, AssembleError> {
    let line = strip_comment(line);
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let mut prev_was_wordlike = false;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c == ',' {
            prev_was_wordlike = false;
            i += 1;
            continue;
        }
        match c {
            ':' => {
                tokens.push(Token::Colon);
                prev_was_wordlike = false;
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                prev_was_wordlike = false;
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                prev_was_wordlike = true;
                i += 1;
            }
            '+' if prev_was_wordlike => {
                tokens.push(Token::Plus);
                prev_was_wordlike = false;
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(word));
                prev_was_wordlike = true;
            }
            c if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' => {
                let (tok, consumed) = lex_number(line_no, &chars, i)?;
                tokens.push(tok);
                i += consumed;
                prev_was_wordlike = true;
            }
            other => {
                return Err(AssembleError::UnexpectedChar {
                    line: line_no,
                    column: i + 1,
                    found: other,
                });
            }
        }
    }

    Ok(tokens)
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Scan a numeric literal starting at `start`. Returns the token and the
/// number of characters consumed. A literal is `FLT` iff it has a
/// fractional part or an exponent (§4.4); otherwise it is `IMM`.
fn lex_number(line_no: usize, chars: &[char], start: usize) -> Result<(Token, usize), AssembleError> {
    let mut i = start;
    if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
        i += 1;
    }
    let digits_start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    let mut is_float = false;

    if i < chars.len() && chars[i] == '.' {
        is_float = true;
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }

    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let exp_start = i;
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        let exp_digits_start = j;
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_digits_start {
            is_float = true;
            i = j;
        } else {
            let _ = exp_start;
        }
    }

    if i == digits_start && !is_float {
        return Err(AssembleError::UnexpectedChar {
            line: line_no,
            column: start + 1,
            found: chars[start],
        });
    }

    let text: String = chars[start..i].iter().collect();
    if is_float {
        let value: f32 = text
            .parse()
            .map_err(|_| AssembleError::UnterminatedToken { line: line_no, column: start + 1 })?;
        Ok((Token::Flt(value), i - start))
    } else {
        let value: i32 = text
            .parse()
            .map_err(|_| AssembleError::UnterminatedToken { line: line_no, column: start + 1 })?;
        Ok((Token::Imm(value), i - start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_plain_instruction() {
        let toks = tokenize_line(1, "push 3").unwrap();
        assert_eq!(toks, vec![Token::Ident("push".into()), Token::Imm(3)]);
    }

    #[test]
    fn tokenizes_memory_register_plus_immediate() {
        let toks = tokenize_line(1, "mov ax, [bx+4]").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Ident("mov".into()),
                Token::Ident("ax".into()),
                Token::LBracket,
                Token::Ident("bx".into()),
                Token::Plus,
                Token::Imm(4),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn leading_sign_outside_brackets_is_a_signed_number() {
        let toks = tokenize_line(1, "push -5").unwrap();
        assert_eq!(toks, vec![Token::Ident("push".into()), Token::Imm(-5)]);
    }

    #[test]
    fn fractional_literal_is_float() {
        let toks = tokenize_line(1, "push 3.5").unwrap();
        assert_eq!(toks, vec![Token::Ident("push".into()), Token::Flt(3.5)]);
    }

    #[test]
    fn comment_is_stripped() {
        let toks = tokenize_line(1, "hlt ; stop here").unwrap();
        assert_eq!(toks, vec![Token::Ident("hlt".into())]);
    }

    #[test]
    fn label_declaration() {
        let toks = tokenize_line(1, "end:").unwrap();
        assert_eq!(toks, vec![Token::Ident("end".into()), Token::Colon]);
    }
}
