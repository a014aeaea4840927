//! Level-0 index file reading.
//!
//! The `.dat` companion of an L0 index component is a flat array of fixed
//! 36 byte entries locating data units inside the measurement file.

use std::io::Read;

use serde::Serialize;

use crate::{Error, Result};

/// One L0 index entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexEntry {
    /// Sensing date/time as an MJD2000 fractional day count.
    pub date_time: f64,
    /// Time delta to the previous entry in seconds.
    pub time_delta: f64,
    pub data_size: u64,
    pub channel: u32,
    pub vcid: u32,
    pub counter: u32,
}

impl IndexEntry {
    /// Size of an encoded index entry.
    pub const LEN: usize = 36;

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::LEN {
            return Err(Error::UnexpectedEof);
        }
        Ok(IndexEntry {
            date_time: f64::from_be_bytes(buf[0..8].try_into().unwrap()),
            time_delta: f64::from_be_bytes(buf[8..16].try_into().unwrap()),
            data_size: u64::from_be_bytes(buf[16..24].try_into().unwrap()),
            channel: u32::from_be_bytes(buf[24..28].try_into().unwrap()),
            vcid: u32::from_be_bytes(buf[28..32].try_into().unwrap()),
            counter: u32::from_be_bytes(buf[32..36].try_into().unwrap()),
        })
    }
}

/// Check that a file size holds a whole number of index entries and return
/// that count.
pub fn entry_count(file_size: u64) -> Result<u64> {
    if file_size % IndexEntry::LEN as u64 != 0 {
        return Err(Error::UnexpectedEof);
    }
    Ok(file_size / IndexEntry::LEN as u64)
}

/// Lazily read index entries from a byte stream.
pub fn read_index<R>(reader: R) -> impl Iterator<Item = Result<IndexEntry>>
where
    R: Read,
{
    IndexIter { reader, done: false }
}

struct IndexIter<R> {
    reader: R,
    done: bool,
}

impl<R> Iterator for IndexIter<R>
where
    R: Read,
{
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = [0u8; IndexEntry::LEN];
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => {
                    self.done = true;
                    return None;
                }
                Ok(0) => {
                    self.done = true;
                    return Some(Err(Error::UnexpectedEof));
                }
                Ok(n) => filled += n,
                Err(err) => {
                    self.done = true;
                    return Some(Err(Error::Io(err)));
                }
            }
        }
        Some(IndexEntry::decode(&buf))
    }
}
