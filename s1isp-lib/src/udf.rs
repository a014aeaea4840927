//! User data field decoding.
//!
//! The UDF carries `2 * number_of_quads` complex radar samples split into
//! four interleaves: even and odd indexed I and Q components (Ie, Io, Qe,
//! Qo), each padded to a 16-bit word boundary. How the samples are encoded
//! depends on the data format selected by the (test mode, BAQ mode) pair:
//!
//! * format A/B: 10-bit sign-magnitude samples (bypass)
//! * format C: BAQ 3/4/5-bit sign-magnitude codes with per-block thresholds
//! * format D: FDBAQ Huffman codes with a per-block bit-rate code

use num_complex::Complex32;

use crate::bits::{unpack_bits, BitReader};
use crate::enums::{BaqMode, BrcCode, TestMode};
use crate::huffman;
use crate::luts;
use crate::{Error, Result};

/// Nominal number of complex samples per interleave block (half of the 256
/// sample BAQ block, which spans even and odd samples).
pub const BLOCK_SIZE: usize = 128;

const BRC_CODE_BITS: usize = 3;
const THIDX_BITS: usize = 8;

/// User data format type selected by (test mode, BAQ mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Bypass data from a bypassed receive module.
    A,
    /// Bypass data in an operational mode.
    B,
    /// Block adaptive quantization to 3, 4 or 5 bits.
    C,
    /// Flexible dynamic block adaptive quantization.
    D,
}

/// Classify the user data format.
pub fn data_format(baq_mode: BaqMode, test_mode: TestMode) -> Result<DataFormat> {
    let bypass_test = matches!(
        test_mode,
        TestMode::ContingencyRxmFullyBypassed | TestMode::Bypass
    );
    let oper_test = matches!(
        test_mode,
        TestMode::Default | TestMode::ContingencyRxmFullyOperational | TestMode::Oper
    );

    match baq_mode {
        BaqMode::Bypass if bypass_test => Ok(DataFormat::A),
        BaqMode::Bypass if oper_test => Ok(DataFormat::B),
        BaqMode::Baq3 | BaqMode::Baq4 | BaqMode::Baq5 if oper_test => Ok(DataFormat::C),
        BaqMode::FdBaqMode0 | BaqMode::FdBaqMode1 | BaqMode::FdBaqMode2 if oper_test => {
            Ok(DataFormat::D)
        }
        _ => Err(Error::InvalidDataFormat {
            baq_mode: baq_mode.code(),
            test_mode: test_mode.code(),
        }),
    }
}

/// Interleave the four decoded channels back into acquisition order.
fn align_quads(ie: &[f32], io: &[f32], qe: &[f32], qo: &[f32]) -> Vec<Complex32> {
    let nq = ie.len();
    debug_assert!(io.len() == nq && qe.len() == nq && qo.len() == nq);
    let mut out = Vec::with_capacity(2 * nq);
    for k in 0..nq {
        out.push(Complex32::new(ie[k], qe[k]));
        out.push(Complex32::new(io[k], qo[k]));
    }
    out
}

/// Number of 16-bit words needed for `nbits` bits.
fn words(nbits: usize) -> usize {
    nbits.div_ceil(16)
}

/// Decode formats A and B: four interleaves of 10-bit sign-magnitude
/// samples.
pub fn bypass_decode(data: &[u8], nq: usize) -> Result<Vec<Complex32>> {
    if nq == 0 {
        return Ok(Vec::new());
    }
    let nbytes = 2 * words(10 * nq);
    if data.len() < 4 * nbytes {
        return Err(Error::UnexpectedEof);
    }

    let mut channels = Vec::with_capacity(4);
    for chan in 0..4 {
        let mut r = BitReader::new(&data[chan * nbytes..(chan + 1) * nbytes]);
        let mut samples = Vec::with_capacity(nq);
        for _ in 0..nq {
            samples.push(luts::bypass_value(r.read_u(10)? as u16));
        }
        channels.push(samples);
    }

    Ok(align_quads(&channels[0], &channels[1], &channels[2], &channels[3]))
}

/// Decode format C: BAQ 3/4/5-bit codes.
///
/// The Qe interleave carries an 8-bit threshold index ahead of each block;
/// the other interleaves are plain runs of sign-magnitude codes.
pub fn baq_decode(
    data: &[u8],
    nq: usize,
    baq_mode: BaqMode,
    block_size: usize,
) -> Result<Vec<Complex32>> {
    if nq == 0 {
        return Ok(Vec::new());
    }
    let bits_per_sample = match baq_mode {
        BaqMode::Baq3 => 3usize,
        BaqMode::Baq4 => 4,
        BaqMode::Baq5 => 5,
        other => {
            return Err(Error::InvalidCode { mode: "baq decode", code: other.code() });
        }
    };
    let nb = nq.div_ceil(block_size);

    let nbytes_plain = 2 * words(bits_per_sample * nq);
    let nbytes_qe = 2 * words(bits_per_sample * nq + THIDX_BITS * nb);
    if data.len() < 3 * nbytes_plain + nbytes_qe {
        return Err(Error::UnexpectedEof);
    }

    let read_plain = |chunk: &[u8]| -> Result<Vec<u8>> {
        let mut r = BitReader::new(chunk);
        let mut codes = Vec::with_capacity(nq);
        for _ in 0..nq {
            codes.push(r.read_u(bits_per_sample)? as u8);
        }
        Ok(codes)
    };

    let ie = read_plain(&data[..nbytes_plain])?;
    let io = read_plain(&data[nbytes_plain..2 * nbytes_plain])?;

    let qe_chunk = &data[2 * nbytes_plain..2 * nbytes_plain + nbytes_qe];
    let mut r = BitReader::new(qe_chunk);
    let mut qe = Vec::with_capacity(nq);
    let mut thidx = Vec::with_capacity(nb);
    for bidx in 0..nb {
        thidx.push(r.read_u(THIDX_BITS)? as u8);
        let count = block_size.min(nq - bidx * block_size);
        for _ in 0..count {
            qe.push(r.read_u(bits_per_sample)? as u8);
        }
    }

    let qo_chunk = &data[2 * nbytes_plain + nbytes_qe..];
    let qo = read_plain(&qo_chunk[..nbytes_plain])?;

    let mut channels = [
        Vec::with_capacity(nq),
        Vec::with_capacity(nq),
        Vec::with_capacity(nq),
        Vec::with_capacity(nq),
    ];
    for (bidx, &ti) in thidx.iter().enumerate() {
        let lut = luts::baq_reconstruction_lut(baq_mode, ti)?;
        let i0 = bidx * block_size;
        let i1 = (i0 + block_size).min(nq);
        for (chan, codes) in [&ie, &io, &qe, &qo].into_iter().enumerate() {
            channels[chan].extend(codes[i0..i1].iter().map(|&c| lut[c as usize]));
        }
    }

    Ok(align_quads(&channels[0], &channels[1], &channels[2], &channels[3]))
}

/// Cursor state for walking the unpacked FDBAQ bit sequence.
struct FdbaqCursor<'a> {
    bits: &'a [u8],
    idx: usize,
}

impl FdbaqCursor<'_> {
    fn read_u8(&mut self, n: usize) -> Result<u8> {
        if self.idx + n > self.bits.len() {
            return Err(Error::UnexpectedEof);
        }
        let mut value = 0u8;
        for _ in 0..n {
            value = (value << 1) | self.bits[self.idx];
            self.idx += 1;
        }
        Ok(value)
    }

    fn huffman(&mut self, brc: BrcCode, out: &mut [u8]) -> Result<()> {
        // the cursor can sit past the end after word padding on short input
        let rest = self.bits.get(self.idx..).ok_or(Error::UnexpectedEof)?;
        let consumed = huffman::decode(brc, rest, out)?;
        self.idx += consumed;
        Ok(())
    }

    /// Round the cursor up to the next 16-bit word boundary relative to
    /// `start`.
    fn pad_to_word(&mut self, start: usize) {
        self.idx = start + 16 * (self.idx - start).div_ceil(16);
    }
}

/// Decode format D: FDBAQ Huffman-coded samples.
///
/// Block structure per interleave: Ie blocks open with a 3-bit BRC, Qe
/// blocks with an 8-bit threshold index; Io and Qo reuse the BRC selected
/// by the matching Ie block.
pub fn fdbaq_decode(data: &[u8], nq: usize, block_size: usize) -> Result<Vec<Complex32>> {
    if nq == 0 {
        return Ok(Vec::new());
    }
    let nb = nq.div_ceil(block_size);
    let bits = unpack_bits(data);
    let mut cur = FdbaqCursor { bits: &bits, idx: 0 };

    let mut brcs = Vec::with_capacity(nb);
    let mut thidx = Vec::with_capacity(nb);
    let mut ie = vec![0u8; nq];
    let mut io = vec![0u8; nq];
    let mut qe = vec![0u8; nq];
    let mut qo = vec![0u8; nq];

    let start = cur.idx;
    for bidx in 0..nb {
        let brc = BrcCode::from_code(cur.read_u8(BRC_CODE_BITS)?)?;
        brcs.push(brc);
        let i0 = bidx * block_size;
        let i1 = (i0 + block_size).min(nq);
        cur.huffman(brc, &mut ie[i0..i1])?;
    }
    cur.pad_to_word(start);

    let start = cur.idx;
    for (bidx, &brc) in brcs.iter().enumerate() {
        let i0 = bidx * block_size;
        let i1 = (i0 + block_size).min(nq);
        cur.huffman(brc, &mut io[i0..i1])?;
    }
    cur.pad_to_word(start);

    let start = cur.idx;
    for (bidx, &brc) in brcs.iter().enumerate() {
        thidx.push(cur.read_u8(THIDX_BITS)?);
        let i0 = bidx * block_size;
        let i1 = (i0 + block_size).min(nq);
        cur.huffman(brc, &mut qe[i0..i1])?;
    }
    cur.pad_to_word(start);

    let start = cur.idx;
    for (bidx, &brc) in brcs.iter().enumerate() {
        let i0 = bidx * block_size;
        let i1 = (i0 + block_size).min(nq);
        cur.huffman(brc, &mut qo[i0..i1])?;
    }
    cur.pad_to_word(start);

    let mut channels = [
        Vec::with_capacity(nq),
        Vec::with_capacity(nq),
        Vec::with_capacity(nq),
        Vec::with_capacity(nq),
    ];
    for (bidx, (&brc, &ti)) in brcs.iter().zip(&thidx).enumerate() {
        let lut = luts::fdbaq_reconstruction_lut(brc, ti);
        let i0 = bidx * block_size;
        let i1 = (i0 + block_size).min(nq);
        for (chan, codes) in [&ie, &io, &qe, &qo].into_iter().enumerate() {
            channels[chan].extend(codes[i0..i1].iter().map(|&c| lut[c as usize]));
        }
    }

    Ok(align_quads(&channels[0], &channels[1], &channels[2], &channels[3]))
}

/// Decode a user data field into complex samples.
///
/// `nq` is the number of quads from the radar sample count service and
/// `block_size` the per-interleave block length in samples, i.e. half the
/// BAQ block length from the radar configuration service.
pub fn decode_user_data(
    data: &[u8],
    nq: usize,
    baq_mode: BaqMode,
    test_mode: TestMode,
    block_size: usize,
) -> Result<Vec<Complex32>> {
    match data_format(baq_mode, test_mode)? {
        DataFormat::A | DataFormat::B => bypass_decode(data, nq),
        DataFormat::C => baq_decode(data, nq, baq_mode, block_size),
        DataFormat::D => fdbaq_decode(data, nq, block_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Append `n` low bits of `value`, MSB first.
    fn push_bits(bits: &mut Vec<u8>, value: u32, n: usize) {
        for shift in (0..n).rev() {
            bits.push(((value >> shift) & 1) as u8);
        }
    }

    fn pad_to_word(bits: &mut Vec<u8>, start: usize) {
        while (bits.len() - start) % 16 != 0 {
            bits.push(0);
        }
    }

    fn pack(bits: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; bits.len().div_ceil(8)];
        for (i, b) in bits.iter().enumerate() {
            out[i / 8] |= b << (7 - i % 8);
        }
        out
    }

    #[test]
    fn classify_data_format() {
        assert_eq!(data_format(BaqMode::Bypass, TestMode::Bypass).unwrap(), DataFormat::A);
        assert_eq!(data_format(BaqMode::Bypass, TestMode::Default).unwrap(), DataFormat::B);
        assert_eq!(data_format(BaqMode::Baq5, TestMode::Oper).unwrap(), DataFormat::C);
        assert_eq!(
            data_format(BaqMode::FdBaqMode0, TestMode::Default).unwrap(),
            DataFormat::D
        );
        assert!(data_format(BaqMode::Baq3, TestMode::Bypass).is_err());
        assert!(data_format(BaqMode::Unknown(9), TestMode::Default).is_err());
    }

    #[test]
    fn bypass_roundtrip() {
        // nq quads; sample value k encoded as sign-magnitude k or -k
        let nq = 7;
        let encode = |values: &[i32]| {
            let mut bits = Vec::new();
            for &v in values {
                let code = if v < 0 { 0x200 | (-v as u32) } else { v as u32 };
                push_bits(&mut bits, code, 10);
            }
            pad_to_word(&mut bits, 0);
            bits
        };
        let ie: Vec<i32> = (0..nq as i32).collect();
        let io: Vec<i32> = (0..nq as i32).map(|v| -v).collect();
        let qe: Vec<i32> = (0..nq as i32).map(|v| v + 100).collect();
        let qo: Vec<i32> = (0..nq as i32).map(|v| 511 - v).collect();

        let mut bits = Vec::new();
        for chan in [&ie, &io, &qe, &qo] {
            bits.extend(encode(chan));
        }
        let data = pack(&bits);

        let out = bypass_decode(&data, nq).unwrap();
        assert_eq!(out.len(), 2 * nq);
        // consumed bits: 4 interleaves of 10 * nq bits, each padded to 16
        assert_eq!(data.len() * 8, 4 * 16 * (10 * nq).div_ceil(16));
        for k in 0..nq {
            assert_eq!(out[2 * k].re, ie[k] as f32);
            assert_eq!(out[2 * k].im, qe[k] as f32);
            assert_eq!(out[2 * k + 1].re, io[k] as f32);
            assert_eq!(out[2 * k + 1].im, qo[k] as f32);
        }
    }

    #[test]
    fn bypass_empty_and_truncated() {
        assert!(bypass_decode(&[], 0).unwrap().is_empty());
        assert!(matches!(bypass_decode(&[0u8; 8], 7), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn baq3_simple_reconstruction() {
        // one block, threshold index 0: codes map to 0, 1, 2, 3 with sign
        let nq = 5;
        let ie = [0u8, 1, 2, 3, 0b101]; // 0, 1, 2, 3, -1
        let io = [0u8; 5];
        let qe = [3u8, 3, 3, 3, 3];
        let qo = [0b100u8, 0b100, 0, 0, 0]; // -0, -0, 0, 0, 0

        let mut bits = Vec::new();
        let mut start = 0;
        for codes in [&ie[..], &io[..]] {
            for &c in codes {
                push_bits(&mut bits, u32::from(c), 3);
            }
            pad_to_word(&mut bits, start);
            start = bits.len();
        }
        push_bits(&mut bits, 0, 8); // threshold index
        for &c in &qe {
            push_bits(&mut bits, u32::from(c), 3);
        }
        pad_to_word(&mut bits, start);
        start = bits.len();
        for &c in &qo {
            push_bits(&mut bits, u32::from(c), 3);
        }
        pad_to_word(&mut bits, start);

        let out = baq_decode(&pack(&bits), nq, BaqMode::Baq3, BLOCK_SIZE).unwrap();
        assert_eq!(out.len(), 2 * nq);
        let re_even: Vec<f32> = (0..nq).map(|k| out[2 * k].re).collect();
        assert_eq!(re_even, [0.0, 1.0, 2.0, 3.0, -1.0]);
        let im_even: Vec<f32> = (0..nq).map(|k| out[2 * k].im).collect();
        assert_eq!(im_even, [3.0, 3.0, 3.0, 3.0, 3.0]);
        assert!(out[1].im == 0.0 && out[1].im.is_sign_negative());
    }

    #[test]
    fn baq_multi_block_thresholds() {
        // two blocks of 2 samples with different threshold indices; the
        // second block (thidx 255) uses sigma scaled reconstruction levels
        let nq = 4;
        let block_size = 2;
        let code = 1u8;

        let mut bits = Vec::new();
        let mut start = 0;
        for _ in 0..2 {
            // ie then io: 4 codes each
            for _ in 0..nq {
                push_bits(&mut bits, u32::from(code), 3);
            }
            pad_to_word(&mut bits, start);
            start = bits.len();
        }
        // qe: (thidx, 2 codes) per block
        push_bits(&mut bits, 0, 8);
        push_bits(&mut bits, u32::from(code), 3);
        push_bits(&mut bits, u32::from(code), 3);
        push_bits(&mut bits, 255, 8);
        push_bits(&mut bits, u32::from(code), 3);
        push_bits(&mut bits, u32::from(code), 3);
        pad_to_word(&mut bits, start);
        start = bits.len();
        for _ in 0..nq {
            push_bits(&mut bits, u32::from(code), 3);
        }
        pad_to_word(&mut bits, start);

        let out = baq_decode(&pack(&bits), nq, BaqMode::Baq3, block_size).unwrap();
        assert_eq!(out[0].im, 1.0);
        let sigma_scaled = (0.7681 * 255.99) as f32;
        assert!((out[4].im - sigma_scaled).abs() < 1e-3);
    }

    #[test]
    fn fdbaq_single_block() {
        // BRC0, threshold index 0 (simple reconstruction: 0, 1, 2, 3)
        let nq = 4;
        // sign+code bit patterns: 0|0 -> +0, 0|10 -> +1, 0|110 -> +2, 1|111 -> -3
        let samples: [&[u8]; 4] = [&[0, 0], &[0, 1, 0], &[0, 1, 1, 0], &[1, 1, 1, 1]];
        let expected = [0.0f32, 1.0, 2.0, -3.0];

        let mut bits = Vec::new();
        let mut start = 0;
        // ie: brc then codes
        push_bits(&mut bits, 0, 3);
        for s in samples {
            bits.extend_from_slice(s);
        }
        pad_to_word(&mut bits, start);
        start = bits.len();
        // io: codes only
        for s in samples {
            bits.extend_from_slice(s);
        }
        pad_to_word(&mut bits, start);
        start = bits.len();
        // qe: thidx then codes
        push_bits(&mut bits, 0, 8);
        for s in samples {
            bits.extend_from_slice(s);
        }
        pad_to_word(&mut bits, start);
        start = bits.len();
        // qo: codes only
        for s in samples {
            bits.extend_from_slice(s);
        }
        pad_to_word(&mut bits, start);

        let out = fdbaq_decode(&pack(&bits), nq, BLOCK_SIZE).unwrap();
        assert_eq!(out.len(), 2 * nq);
        for k in 0..nq {
            assert_eq!(out[2 * k].re, expected[k], "sample {k}");
            assert_eq!(out[2 * k].im, expected[k], "sample {k}");
        }
    }

    #[test]
    fn fdbaq_rejects_bad_brc() {
        let nq = 1;
        let mut bits = Vec::new();
        push_bits(&mut bits, 7, 3); // BRC 7 is out of range
        push_bits(&mut bits, 0, 13);
        let err = fdbaq_decode(&pack(&bits), nq, BLOCK_SIZE).unwrap_err();
        assert!(matches!(err, Error::InvalidBrc { value: 7 }));
    }

    #[test]
    fn fdbaq_truncated() {
        let nq = 64;
        let bits = vec![0u8; 8]; // far too short
        assert!(matches!(
            fdbaq_decode(&pack(&bits), nq, BLOCK_SIZE),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn empty_quads() {
        assert!(fdbaq_decode(&[], 0, BLOCK_SIZE).unwrap().is_empty());
        assert!(baq_decode(&[], 0, BaqMode::Baq3, BLOCK_SIZE).unwrap().is_empty());
    }
}
