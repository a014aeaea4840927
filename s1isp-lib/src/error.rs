#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The input ended before the requested bits/bytes could be read.
    ///
    /// Fatal for the packet being decoded; the stream loop may still
    /// terminate cleanly if the truncation falls on a packet boundary.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A packet failed one of the fixed-value sanity checks.
    ///
    /// The decoder still produces the offending record where it can, so
    /// callers decide whether to skip, count or halt.
    #[error("invalid packet at offset {offset}: {reason}")]
    InvalidPacket { reason: &'static str, offset: u64 },

    /// FDBAQ bit-rate code outside 0..=4.
    #[error("invalid BRC code: {value}")]
    InvalidBrc { value: u8 },

    /// A reconstruction table has no entry for this (mode, code) pair.
    #[error("invalid sample code {code} for {mode}")]
    InvalidCode { mode: &'static str, code: u8 },

    /// The (test mode, BAQ mode) pair does not name a known data format.
    #[error("invalid data format: baq mode {baq_mode}, test mode {test_mode}")]
    InvalidDataFormat { baq_mode: u8, test_mode: u8 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
