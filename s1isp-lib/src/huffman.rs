//! FDBAQ Huffman decoding.
//!
//! One hand-coded tree walker per bit-rate code. Input is an unpacked bit
//! sequence (one bit per byte, see [`crate::bits::unpack_bits`]); each
//! sample is one sign bit followed by a variable-length magnitude code. The
//! output codes carry the sign folded in: magnitudes `0..=magmax` for
//! positive samples, `magmax + 1..=2 * magmax + 1` for negative ones, which
//! keeps the on-wire distinction between +0 and -0.
//!
//! The walkers return the number of bits consumed, or the negated bit
//! position where the input ran out before `out` was filled. This is the
//! hot loop of FDBAQ decoding; keep it free of allocation.

use crate::enums::BrcCode;
use crate::{Error, Result};

macro_rules! next_bit {
    ($bits:ident, $idx:ident) => {{
        if $idx >= $bits.len() {
            return -($idx as isize);
        }
        let b = $bits[$idx];
        $idx += 1;
        b
    }};
}

pub fn decode_brc0(bits: &[u8], out: &mut [u8]) -> isize {
    let mut idx = 0usize;
    let mut sample = 0usize;
    while idx < bits.len() && sample < out.len() {
        let sign = bits[idx];
        idx += 1;
        out[sample] = if next_bit!(bits, idx) == 0 {
            if sign == 1 { 4 } else { 0 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 5 } else { 1 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 6 } else { 2 }
        } else {
            if sign == 1 { 7 } else { 3 }
        };
        sample += 1;
    }
    if sample == out.len() {
        idx as isize
    } else {
        -(idx as isize)
    }
}

pub fn decode_brc1(bits: &[u8], out: &mut [u8]) -> isize {
    let mut idx = 0usize;
    let mut sample = 0usize;
    while idx < bits.len() && sample < out.len() {
        let sign = bits[idx];
        idx += 1;
        out[sample] = if next_bit!(bits, idx) == 0 {
            if sign == 1 { 5 } else { 0 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 6 } else { 1 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 7 } else { 2 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 8 } else { 3 }
        } else {
            if sign == 1 { 9 } else { 4 }
        };
        sample += 1;
    }
    if sample == out.len() {
        idx as isize
    } else {
        -(idx as isize)
    }
}

pub fn decode_brc2(bits: &[u8], out: &mut [u8]) -> isize {
    let mut idx = 0usize;
    let mut sample = 0usize;
    while idx < bits.len() && sample < out.len() {
        let sign = bits[idx];
        idx += 1;
        out[sample] = if next_bit!(bits, idx) == 0 {
            if sign == 1 { 7 } else { 0 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 8 } else { 1 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 9 } else { 2 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 10 } else { 3 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 11 } else { 4 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 12 } else { 5 }
        } else {
            if sign == 1 { 13 } else { 6 }
        };
        sample += 1;
    }
    if sample == out.len() {
        idx as isize
    } else {
        -(idx as isize)
    }
}

pub fn decode_brc3(bits: &[u8], out: &mut [u8]) -> isize {
    let mut idx = 0usize;
    let mut sample = 0usize;
    while idx < bits.len() && sample < out.len() {
        let sign = bits[idx];
        idx += 1;
        out[sample] = if next_bit!(bits, idx) == 0 {
            // codes 0 and 1 share a two-deep left branch
            if next_bit!(bits, idx) == 0 {
                if sign == 1 { 10 } else { 0 }
            } else {
                if sign == 1 { 11 } else { 1 }
            }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 12 } else { 2 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 13 } else { 3 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 14 } else { 4 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 15 } else { 5 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 16 } else { 6 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 17 } else { 7 }
        } else if next_bit!(bits, idx) == 0 {
            if sign == 1 { 18 } else { 8 }
        } else {
            if sign == 1 { 19 } else { 9 }
        };
        sample += 1;
    }
    if sample == out.len() {
        idx as isize
    } else {
        -(idx as isize)
    }
}

pub fn decode_brc4(bits: &[u8], out: &mut [u8]) -> isize {
    let mut idx = 0usize;
    let mut sample = 0usize;
    while idx < bits.len() && sample < out.len() {
        let sign = bits[idx];
        idx += 1;
        out[sample] = if next_bit!(bits, idx) == 0 {
            if next_bit!(bits, idx) == 0 {
                // 00
                if sign == 1 { 16 } else { 0 }
            } else if next_bit!(bits, idx) == 0 {
                // 010
                if sign == 1 { 17 } else { 1 }
            } else {
                // 011
                if sign == 1 { 18 } else { 2 }
            }
        } else if next_bit!(bits, idx) == 0 {
            if next_bit!(bits, idx) == 0 {
                // 100
                if sign == 1 { 19 } else { 3 }
            } else {
                // 101
                if sign == 1 { 20 } else { 4 }
            }
        } else if next_bit!(bits, idx) == 0 {
            if next_bit!(bits, idx) == 0 {
                // 1100
                if sign == 1 { 21 } else { 5 }
            } else {
                // 1101
                if sign == 1 { 22 } else { 6 }
            }
        } else if next_bit!(bits, idx) == 0 {
            // 1110
            if sign == 1 { 23 } else { 7 }
        } else if next_bit!(bits, idx) == 0 {
            // 11110
            if sign == 1 { 24 } else { 8 }
        } else if next_bit!(bits, idx) == 0 {
            // 111110
            if sign == 1 { 25 } else { 9 }
        } else if next_bit!(bits, idx) == 0 {
            if next_bit!(bits, idx) == 0 {
                // 11111100
                if sign == 1 { 26 } else { 10 }
            } else {
                // 11111101
                if sign == 1 { 27 } else { 11 }
            }
        } else if next_bit!(bits, idx) == 0 {
            if next_bit!(bits, idx) == 0 {
                // 111111100
                if sign == 1 { 28 } else { 12 }
            } else {
                // 111111101
                if sign == 1 { 29 } else { 13 }
            }
        } else if next_bit!(bits, idx) == 0 {
            // 111111110
            if sign == 1 { 30 } else { 14 }
        } else {
            // 111111111
            if sign == 1 { 31 } else { 15 }
        };
        sample += 1;
    }
    if sample == out.len() {
        idx as isize
    } else {
        -(idx as isize)
    }
}

/// Decode `out.len()` samples with the tree selected by `brc`.
///
/// Returns the number of bits consumed.
///
/// # Errors
/// [`Error::UnexpectedEof`] if the bits run out before `out` is filled.
pub fn decode(brc: BrcCode, bits: &[u8], out: &mut [u8]) -> Result<usize> {
    let consumed = match brc {
        BrcCode::Brc0 => decode_brc0(bits, out),
        BrcCode::Brc1 => decode_brc1(bits, out),
        BrcCode::Brc2 => decode_brc2(bits, out),
        BrcCode::Brc3 => decode_brc3(bits, out),
        BrcCode::Brc4 => decode_brc4(bits, out),
    };
    if consumed < 0 || (consumed == 0 && !out.is_empty()) {
        return Err(Error::UnexpectedEof);
    }
    Ok(consumed as usize)
}
