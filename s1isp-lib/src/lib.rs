#![doc = include_str!("../README.md")]

mod error;

pub mod bits;
pub mod enums;
pub mod headers;
pub mod huffman;
pub mod l0index;
pub mod luts;
pub mod stream;
pub mod subcom;
pub mod udf;

pub use error::{Error, Result};
pub use headers::{PrimaryHeader, SecondaryHeader};
pub use luts::{REF_FREQ, SYNC_MARKER};
