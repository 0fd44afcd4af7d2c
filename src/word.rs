//! The untyped 32-bit cell that flows through registers, the operand stack,
//! RAM and immediates. A `Word` carries no type tag of its own; callers pick
//! the interpretation (`as_i32`, `as_f32`, ...) the opcode calls for.

pub type Word = u32;

/// Reinterpret a `Word` as a signed integer.
#[inline]
pub fn as_i32(w: Word) -> i32 {
    w as i32
}

/// Build a `Word` from a signed integer, wrapping on overflow.
#[inline]
pub fn from_i32(v: i32) -> Word {
    v as u32
}

/// Reinterpret a `Word` as an IEEE-754 single precision float.
#[inline]
pub fn as_f32(w: Word) -> f32 {
    f32::from_bits(w)
}

/// Build a `Word` from a float, preserving its bit pattern.
#[inline]
pub fn from_f32(v: f32) -> Word {
    v.to_bits()
}

/// Split a little-endian 32-bit word into its byte representation.
#[inline]
pub fn to_le_bytes(w: Word) -> [u8; 4] {
    w.to_le_bytes()
}

/// Reassemble a `Word` from four little-endian bytes.
#[inline]
pub fn from_le_bytes(bytes: [u8; 4]) -> Word {
    Word::from_le_bytes(bytes)
}
