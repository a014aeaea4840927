//! Streaming ISP decoding.
//!
//! [`StreamDecoder`] walks a byte-synchronized stream of concatenated ISPs
//! and yields one decoded record per packet, in packet order. Sub-commutated
//! ancillary words are collected on the side and can be handed to
//! [`crate::subcom::SubcomDecoder`] once iteration is done.

use std::io::{Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use num_complex::Complex32;
use tracing::{debug, warn};

use crate::enums::BaqMode;
use crate::headers::{PrimaryHeader, SecondaryHeader};
use crate::subcom::SubcomItem;
use crate::udf;
use crate::{Error, Result};

/// What to do with the user data field of each packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UdfMode {
    /// Skip over the user data without reading it.
    #[default]
    None,
    /// Keep the raw compressed bytes.
    Extract,
    /// Decode the samples.
    Decode,
}

/// User data attached to a decoded record.
#[derive(Debug, Clone, PartialEq)]
pub enum UserData {
    Raw(Vec<u8>),
    Samples(Vec<Complex32>),
}

/// One decoded ISP.
#[derive(Debug)]
pub struct DecodedRecord {
    /// Byte offset of the packet in the stream.
    pub offset: u64,
    pub primary_header: PrimaryHeader,
    pub secondary_header: SecondaryHeader,
    pub user_data: Option<UserData>,
    /// Per-packet decode problem (bad sync marker, UDF failure). The
    /// header metadata is still valid; callers decide whether to count,
    /// skip or halt.
    pub anomaly: Option<Error>,
}

/// Streaming decoder options.
#[derive(Default)]
pub struct DecoderOptions {
    /// Number of packets to skip (counted from `bytes_offset`).
    pub skip: usize,
    /// Stop after this many decoded records.
    pub max_count: Option<usize>,
    /// Byte offset of the first packet in the stream.
    pub bytes_offset: u64,
    pub udf_mode: UdfMode,
    /// Recover from invalid packets by scanning forward byte-by-byte for
    /// the next plausible packet header.
    pub resync: bool,
    /// Cooperative cancellation flag, checked once per packet. Records
    /// emitted before cancellation remain valid.
    pub cancel: Option<Arc<AtomicBool>>,
}

enum State {
    Scanning,
    Decoding,
    Done,
}

/// Iterator over the ISPs of a byte stream.
pub struct StreamDecoder<R> {
    reader: R,
    options: DecoderOptions,
    state: State,
    offset: u64,
    stream_len: u64,
    skipped: usize,
    emitted: usize,
    resyncing: bool,
    subcom: Vec<SubcomItem>,
}

impl<R> StreamDecoder<R>
where
    R: Read + Seek,
{
    pub fn new(mut reader: R, options: DecoderOptions) -> Result<Self> {
        let stream_len = reader.seek(SeekFrom::End(0))?;
        let offset = options.bytes_offset;
        reader.seek(SeekFrom::Start(offset))?;
        let state = if options.skip > 0 { State::Scanning } else { State::Decoding };
        Ok(StreamDecoder {
            reader,
            options,
            state,
            offset,
            stream_len,
            skipped: 0,
            emitted: 0,
            resyncing: false,
            subcom: Vec::new(),
        })
    }

    /// Sub-commutated ancillary words collected so far, in packet order.
    #[must_use]
    pub fn subcom_items(&self) -> &[SubcomItem] {
        &self.subcom
    }

    #[must_use]
    pub fn into_subcom_items(self) -> Vec<SubcomItem> {
        self.subcom
    }

    fn cancelled(&self) -> bool {
        self.options
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Read exactly `buf.len()` bytes, distinguishing a clean EOF at the
    /// first byte from a mid-packet truncation.
    fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(Error::UnexpectedEof);
            }
            filled += n;
        }
        Ok(true)
    }

    /// Restart parsing one byte past the current packet start.
    fn resync(&mut self) -> Result<()> {
        if !self.resyncing {
            warn!(offset = self.offset, "lost packet sync, scanning for next header");
            self.resyncing = true;
        }
        self.offset += 1;
        self.reader.seek(SeekFrom::Start(self.offset))?;
        Ok(())
    }

    fn next_record(&mut self) -> Option<Result<DecodedRecord>> {
        loop {
            if matches!(self.state, State::Done) {
                return None;
            }
            if self.cancelled() {
                debug!(packets = self.emitted, "decoding cancelled");
                self.state = State::Done;
                return None;
            }
            if self.options.max_count.is_some_and(|max| self.emitted >= max) {
                self.state = State::Done;
                return None;
            }

            let packet_offset = self.offset;
            let mut ph_buf = [0u8; PrimaryHeader::LEN];
            match self.read_exact_or_eof(&mut ph_buf) {
                Ok(true) => (),
                Ok(false) => {
                    self.state = State::Done;
                    return None;
                }
                Err(err) => {
                    self.state = State::Done;
                    return Some(Err(err));
                }
            }

            let primary_header = match PrimaryHeader::decode(&ph_buf) {
                Ok(h) => h,
                Err(err) => {
                    self.state = State::Done;
                    return Some(Err(err));
                }
            };
            if let Err(err) = primary_header.sanity_check(packet_offset) {
                if self.options.resync {
                    if let Err(io) = self.resync() {
                        self.state = State::Done;
                        return Some(Err(io));
                    }
                    continue;
                }
                self.state = State::Done;
                return Some(Err(err));
            }

            // a packet that runs past the end of the stream is either a
            // truncated download or a corrupted length field
            if packet_offset + primary_header.packet_size() as u64 > self.stream_len {
                if self.options.resync {
                    if let Err(io) = self.resync() {
                        self.state = State::Done;
                        return Some(Err(io));
                    }
                    continue;
                }
                self.state = State::Done;
                return Some(Err(Error::UnexpectedEof));
            }

            let data_field_len = primary_header.packet_data_length as usize + 1;

            if matches!(self.state, State::Scanning) {
                if let Err(err) = self
                    .reader
                    .seek(SeekFrom::Current(data_field_len as i64))
                    .map_err(Error::from)
                {
                    self.state = State::Done;
                    return Some(Err(err));
                }
                self.offset = packet_offset + primary_header.packet_size() as u64;
                self.skipped += 1;
                if self.skipped >= self.options.skip {
                    self.state = State::Decoding;
                }
                continue;
            }

            let mut sh_buf = [0u8; SecondaryHeader::LEN];
            match self.read_exact_or_eof(&mut sh_buf) {
                Ok(true) => (),
                Ok(false) => {
                    self.state = State::Done;
                    return Some(Err(Error::UnexpectedEof));
                }
                Err(err) => {
                    self.state = State::Done;
                    return Some(Err(err));
                }
            }
            let secondary_header = match SecondaryHeader::decode(&sh_buf) {
                Ok(h) => h,
                Err(err) => {
                    self.state = State::Done;
                    return Some(Err(err));
                }
            };

            let mut anomaly = None;
            let sync_ok = secondary_header.fixed_ancillary_data.sync_ok();
            if !sync_ok {
                if self.options.resync {
                    if let Err(io) = self.resync() {
                        self.state = State::Done;
                        return Some(Err(io));
                    }
                    continue;
                }
                anomaly = Some(Error::InvalidPacket {
                    reason: "sync marker mismatch",
                    offset: packet_offset,
                });
            }
            self.resyncing = false;

            let rcss = &secondary_header.radar_configuration_support;
            if rcss.error_flag {
                debug!(offset = packet_offset, "packet reports an on-board error");
            }
            if matches!(
                rcss.baq_mode,
                BaqMode::FdBaqMode0 | BaqMode::FdBaqMode1 | BaqMode::FdBaqMode2
            ) && rcss.baq_block_len_samples() != 256
            {
                debug!(
                    offset = packet_offset,
                    block_len = rcss.baq_block_len_samples(),
                    "unexpected BAQ block length for an FDBAQ packet"
                );
            }
            // radar packets must agree with the sampling window arithmetic
            if rcss.ses.signal_type.code() <= 7 {
                let nq = secondary_header.radar_sample_count.number_of_quads;
                match rcss.swl_n3rx_samples() {
                    Ok(n3rx) if u32::from(nq) * 2 != n3rx => {
                        debug!(
                            offset = packet_offset,
                            nq, n3rx, "quad count disagrees with sampling window length"
                        );
                    }
                    Err(ref err) => {
                        debug!(offset = packet_offset, %err, "sampling window length not computable");
                    }
                    _ => (),
                }
            }

            let udf_len = data_field_len - SecondaryHeader::LEN;
            let mut user_data = None;
            match self.options.udf_mode {
                UdfMode::None => {
                    if let Err(err) = self
                        .reader
                        .seek(SeekFrom::Current(udf_len as i64))
                        .map_err(Error::from)
                    {
                        self.state = State::Done;
                        return Some(Err(err));
                    }
                }
                UdfMode::Extract | UdfMode::Decode => {
                    let mut udf_buf = vec![0u8; udf_len];
                    match self.read_exact_or_eof(&mut udf_buf) {
                        Ok(true) => (),
                        Ok(false) => {
                            self.state = State::Done;
                            return Some(Err(Error::UnexpectedEof));
                        }
                        Err(err) => {
                            self.state = State::Done;
                            return Some(Err(err));
                        }
                    }
                    if matches!(self.options.udf_mode, UdfMode::Extract) {
                        user_data = Some(UserData::Raw(udf_buf));
                    } else if anomaly.is_none() {
                        let nq = secondary_header.radar_sample_count.number_of_quads as usize;
                        let block_size = (rcss.baq_block_len_samples() / 2) as usize;
                        match udf::decode_user_data(
                            &udf_buf,
                            nq,
                            rcss.baq_mode,
                            secondary_header.fixed_ancillary_data.test_mode,
                            block_size,
                        ) {
                            Ok(samples) => user_data = Some(UserData::Samples(samples)),
                            Err(err) => {
                                debug!(
                                    offset = packet_offset,
                                    pri_count = secondary_header.counters.pri_count,
                                    %err,
                                    "user data decode failed"
                                );
                                anomaly = Some(err);
                            }
                        }
                    }
                }
            }

            self.offset = packet_offset + primary_header.packet_size() as u64;
            self.emitted += 1;

            if sync_ok {
                self.subcom.push(SubcomItem {
                    pri_count: secondary_header.counters.pri_count,
                    data_word_index: secondary_header.subcom_ancillary_data.data_word_index,
                    data_word: secondary_header.subcom_ancillary_data.data_word,
                });
            }

            return Some(Ok(DecodedRecord {
                offset: packet_offset,
                primary_header,
                secondary_header,
                user_data,
                anomaly,
            }));
        }
    }
}

impl<R> Iterator for StreamDecoder<R>
where
    R: Read + Seek,
{
    type Item = Result<DecodedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

/// Everything produced by a full pass over a stream.
pub struct DecodeOutput {
    pub records: Vec<DecodedRecord>,
    /// Byte offset of each record's packet, parallel to `records`.
    pub offsets: Vec<u64>,
    pub subcom: Vec<SubcomItem>,
    /// Terminal stream error, if iteration did not end at a clean EOF.
    pub error: Option<Error>,
}

/// Decode a whole stream into memory.
///
/// Convenience wrapper around [`StreamDecoder`] for callers that do not
/// need lazy iteration. All records decoded before a terminal error are
/// kept.
pub fn decode_stream<R>(reader: R, options: DecoderOptions) -> Result<DecodeOutput>
where
    R: Read + Seek,
{
    let mut decoder = StreamDecoder::new(reader, options)?;
    let mut records = Vec::new();
    let mut error = None;
    for zult in &mut decoder {
        match zult {
            Ok(record) => records.push(record),
            Err(err) => {
                error = Some(err);
                break;
            }
        }
    }
    let offsets = records.iter().map(|r| r.offset).collect();
    Ok(DecodeOutput {
        records,
        offsets,
        subcom: decoder.into_subcom_items(),
        error,
    })
}
