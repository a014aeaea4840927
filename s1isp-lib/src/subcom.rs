//! Sub-commutated ancillary data reassembly.
//!
//! Slow-changing instrument status is multiplexed over consecutive packets
//! as 16-bit words tagged with a slot index 1..=64. A full 64-word cycle
//! concatenates to a 128 byte frame holding three fixed-layout records:
//! position/velocity/time (words 1-22), attitude (words 23-41) and
//! housekeeping temperatures (words 42-64).

use serde::Serialize;
use tracing::{info, warn};

use crate::bits::BitReader;
use crate::enums::AocsOpMode;
use crate::luts;
use crate::{Error, Result};

/// Words per sub-commutation cycle.
pub const CYCLE_LEN: usize = 64;

const PVT_FIRST_WORD: u8 = 1;
const ATT_FIRST_WORD: u8 = 23;
const HK_FIRST_WORD: u8 = 42;

/// One sub-commutated slot, as carried by a single packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubcomItem {
    pub pri_count: u32,
    /// Slot position in the cycle, 1..=64.
    pub data_word_index: u8,
    pub data_word: [u8; 2],
}

/// Position, velocity and time ancillary data (words 1-22).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PvtAncillaryData {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    /// GPS time stamp in yoctoseconds, 56 bits.
    pub time_stamp: u64,
}

impl PvtAncillaryData {
    fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = BitReader::new(buf);
        let x = f64::from_be_bytes(r.read_bytes(8)?.try_into().unwrap());
        let y = f64::from_be_bytes(r.read_bytes(8)?.try_into().unwrap());
        let z = f64::from_be_bytes(r.read_bytes(8)?.try_into().unwrap());
        let vx = f32::from_be_bytes(r.read_bytes(4)?.try_into().unwrap());
        let vy = f32::from_be_bytes(r.read_bytes(4)?.try_into().unwrap());
        let vz = f32::from_be_bytes(r.read_bytes(4)?.try_into().unwrap());
        r.skip(8)?;
        let time_stamp = r.read_u64(56)?;
        debug_assert_eq!(r.pos(), 352);
        Ok(PvtAncillaryData { x, y, z, vx, vy, vz, time_stamp })
    }
}

/// Pointing status flags carried with the attitude record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointingStatus {
    pub aocs_op_mode: AocsOpMode,
    pub roll_error: bool,
    pub pitch_error: bool,
    pub yaw_error: bool,
}

/// Attitude ancillary data (words 23-41).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttitudeAncillaryData {
    pub q0: f32,
    pub q1: f32,
    pub q2: f32,
    pub q3: f32,
    pub omega_x: f32,
    pub omega_y: f32,
    pub omega_z: f32,
    /// Attitude time stamp in yoctoseconds, 56 bits.
    pub time_stamp: u64,
    pub pointing_status: PointingStatus,
}

impl AttitudeAncillaryData {
    fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = BitReader::new(buf);
        let mut quat = [0f32; 7];
        for q in &mut quat {
            *q = f32::from_be_bytes(r.read_bytes(4)?.try_into().unwrap());
        }
        r.skip(8)?;
        let time_stamp = r.read_u64(56)?;
        let aocs_op_mode = AocsOpMode::from_code(r.read_u(8)? as u8);
        r.skip(5)?;
        let pointing_status = PointingStatus {
            aocs_op_mode,
            roll_error: r.read_bool()?,
            pitch_error: r.read_bool()?,
            yaw_error: r.read_bool()?,
        };
        debug_assert_eq!(r.pos(), 304);
        Ok(AttitudeAncillaryData {
            q0: quat[0],
            q1: quat[1],
            q2: quat[2],
            q3: quat[3],
            omega_x: quat[4],
            omega_y: quat[5],
            omega_z: quat[6],
            time_stamp,
            pointing_status,
        })
    }
}

/// Temperature codes of one antenna tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileTemperatures {
    pub efe_h: u8,
    pub efe_v: u8,
    pub ta: u8,
}

impl TileTemperatures {
    /// EFE H-polarization temperature in Celsius.
    pub fn efe_h_celsius(&self) -> Result<f64> {
        luts::efe_temperature(self.efe_h)
    }

    /// EFE V-polarization temperature in Celsius.
    pub fn efe_v_celsius(&self) -> Result<f64> {
        luts::efe_temperature(self.efe_v)
    }
}

/// Antenna and tile generation unit temperature housekeeping data
/// (words 42-64).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HkTemperatureAncillaryData {
    pub temperature_update_status: u16,
    pub tiles: [TileTemperatures; 14],
    /// TGU temperature code, 7 bits.
    pub tgu_temperature: u8,
}

impl HkTemperatureAncillaryData {
    fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = BitReader::new(buf);
        let temperature_update_status = r.read_u(16)? as u16;
        let mut tiles = [TileTemperatures { efe_h: 0, efe_v: 0, ta: 0 }; 14];
        for tile in &mut tiles {
            tile.efe_h = r.read_u(8)? as u8;
            tile.efe_v = r.read_u(8)? as u8;
            tile.ta = r.read_u(8)? as u8;
        }
        r.skip(9)?;
        let tgu_temperature = r.read_u(7)? as u8;
        debug_assert_eq!(r.pos(), 368);
        Ok(HkTemperatureAncillaryData {
            temperature_update_status,
            tiles,
            tgu_temperature,
        })
    }

    /// TGU temperature in Celsius.
    pub fn tgu_celsius(&self) -> Result<f64> {
        luts::tgu_temperature(self.tgu_temperature)
    }
}

/// The instrument status records of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecodedSubcomData {
    pub pvt: PvtAncillaryData,
    pub attitude: AttitudeAncillaryData,
    pub hk_temperature: HkTemperatureAncillaryData,
}

/// An accumulated sub-commutation cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SubcomCycle {
    pub words: Vec<SubcomItem>,
    /// Set when the cycle closed with fewer than 64 words.
    pub partial: bool,
}

impl SubcomCycle {
    /// Locate the contiguous word run starting at `first_word` spanning
    /// `len` bytes, and return those bytes.
    fn record_bytes(&self, first_word: u8, len: usize) -> Result<Vec<u8>> {
        let n_words = len / 2;
        let start = self
            .words
            .iter()
            .position(|w| w.data_word_index == first_word)
            .ok_or(Error::UnexpectedEof)?;
        let run = self.words.get(start..start + n_words).ok_or(Error::UnexpectedEof)?;
        let last_expected = first_word + n_words as u8 - 1;
        if run.last().map(|w| w.data_word_index) != Some(last_expected) {
            return Err(Error::UnexpectedEof);
        }
        let mut bytes = Vec::with_capacity(len);
        for w in run {
            bytes.extend_from_slice(&w.data_word);
        }
        Ok(bytes)
    }

    /// Decode the cycle into the three instrument status records.
    ///
    /// # Errors
    /// [`Error::UnexpectedEof`] when a record's word run is missing or has
    /// gaps, which is always the case for partial cycles.
    pub fn decode(&self) -> Result<DecodedSubcomData> {
        let pvt = PvtAncillaryData::decode(&self.record_bytes(PVT_FIRST_WORD, 44)?)?;
        let attitude = AttitudeAncillaryData::decode(&self.record_bytes(ATT_FIRST_WORD, 38)?)?;
        let hk_temperature = HkTemperatureAncillaryData::decode(&self.record_bytes(HK_FIRST_WORD, 46)?)?;
        Ok(DecodedSubcomData { pvt, attitude, hk_temperature })
    }
}

/// Accumulates sub-commutated words into cycles.
///
/// A new cycle starts when the word index goes backwards (an index 1 seen
/// out of order restarts accumulation) or when the PRI count jumps by more
/// than one, which means packets were lost in between. Cycles closed early
/// are kept with the `partial` flag set.
#[derive(Default)]
pub struct SubcomDecoder {
    cycles: Vec<SubcomCycle>,
    current: Vec<SubcomItem>,
    last_pri_count: Option<u32>,
}

impl SubcomDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn close_cycle(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let words = std::mem::take(&mut self.current);
        let partial = words.len() != CYCLE_LEN;
        if partial {
            warn!(words = words.len(), "incomplete sub-commutated data cycle");
        }
        self.cycles.push(SubcomCycle { words, partial });
    }

    /// Feed one word into the accumulator.
    pub fn feed(&mut self, item: SubcomItem) {
        // index 0 means the packet carried no sub-commutated data
        if item.data_word_index == 0 {
            return;
        }
        if item.data_word_index as usize > CYCLE_LEN {
            warn!(index = item.data_word_index, "sub-commutation word index out of range");
            return;
        }

        if self.current.is_empty() {
            if item.data_word_index != PVT_FIRST_WORD {
                warn!(
                    index = item.data_word_index,
                    "sub-commutated data cycle starts mid-frame"
                );
            }
        } else {
            let prev_index = self.current.last().map_or(0, |w| w.data_word_index);
            // signed difference: a decreasing count never reads as a gap
            let pri_gap = self
                .last_pri_count
                .is_some_and(|last| i64::from(item.pri_count) - i64::from(last) > 1);
            if item.data_word_index < prev_index || pri_gap {
                self.close_cycle();
            }
        }

        self.current.push(item);
        self.last_pri_count = Some(item.pri_count);

        if item.data_word_index as usize == CYCLE_LEN {
            self.close_cycle();
        }
    }

    /// Close the trailing cycle and return everything accumulated.
    pub fn finish(mut self) -> Vec<SubcomCycle> {
        self.close_cycle();
        info!(cycles = self.cycles.len(), "sub-commutated data cycles collected");
        self.cycles
    }

    /// Feed a batch of words and return the accumulated cycles.
    pub fn decode(items: impl IntoIterator<Item = SubcomItem>) -> Vec<SubcomCycle> {
        let mut decoder = Self::new();
        for item in items {
            decoder.feed(item);
        }
        decoder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(indices: impl IntoIterator<Item = u8>) -> Vec<SubcomItem> {
        indices
            .into_iter()
            .enumerate()
            .map(|(k, data_word_index)| SubcomItem {
                pri_count: k as u32,
                data_word_index,
                data_word: [data_word_index, k as u8],
            })
            .collect()
    }

    #[test]
    fn full_cycle_completes() {
        let cycles = SubcomDecoder::decode(items(1..=64));
        assert_eq!(cycles.len(), 1);
        let cycle = &cycles[0];
        assert!(!cycle.partial);
        assert_eq!(cycle.words.len(), CYCLE_LEN);
        // frame bytes are the words in order
        assert_eq!(cycle.words[0].data_word, [1, 0]);
        assert_eq!(cycle.words[63].data_word, [64, 63]);
    }

    #[test]
    fn restart_on_out_of_order_index() {
        // an index 1 mid-stream resets the accumulator
        let mut fed = items(1..=10);
        fed.extend(items(1..=64).into_iter().map(|mut w| {
            w.pri_count += 10;
            w
        }));
        let cycles = SubcomDecoder::decode(fed);
        assert_eq!(cycles.len(), 2);
        assert!(cycles[0].partial);
        assert_eq!(cycles[0].words.len(), 10);
        assert!(!cycles[1].partial);
    }

    #[test]
    fn pri_count_gap_splits_cycle() {
        let mut fed = items(1..=64);
        // drop words 20..30 and open a PRI gap
        fed.drain(20..30);
        for w in &mut fed[20..] {
            w.pri_count += 10;
        }
        let cycles = SubcomDecoder::decode(fed);
        assert_eq!(cycles.len(), 2);
        assert!(cycles[0].partial && cycles[1].partial);
    }

    #[test]
    fn pri_count_rollover_does_not_split_cycle() {
        let mut fed = items(1..=64);
        // counter wraps mid-cycle; the backwards jump is not a packet gap
        for (k, w) in fed.iter_mut().enumerate() {
            w.pri_count = (u32::MAX - 31).wrapping_add(k as u32);
        }
        let cycles = SubcomDecoder::decode(fed);
        assert_eq!(cycles.len(), 1);
        assert!(!cycles[0].partial);
    }

    #[test]
    fn zero_index_words_are_skipped() {
        let cycles = SubcomDecoder::decode(items([0, 0, 0]));
        assert!(cycles.is_empty());
    }

    #[test]
    fn trailing_words_flushed_as_partial() {
        let cycles = SubcomDecoder::decode(items(1..=10));
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].partial);
    }

    /// Build a cycle whose 128-byte frame encodes known record values.
    fn synthetic_cycle() -> SubcomCycle {
        let mut frame = Vec::with_capacity(128);
        // PVT: position, velocity, 56-bit time stamp
        frame.extend_from_slice(&7000.25f64.to_be_bytes());
        frame.extend_from_slice(&(-1234.5f64).to_be_bytes());
        frame.extend_from_slice(&42.0f64.to_be_bytes());
        frame.extend_from_slice(&1.5f32.to_be_bytes());
        frame.extend_from_slice(&(-2.5f32).to_be_bytes());
        frame.extend_from_slice(&3.25f32.to_be_bytes());
        let ts: u64 = 0x00ab_cdef_0123_4567;
        frame.extend_from_slice(&ts.to_be_bytes()); // high byte is padding
        // attitude: quaternions, rates, time stamp, pointing status
        for v in [0.5f32, -0.5, 0.25, 0.75, 0.01, -0.02, 0.03] {
            frame.extend_from_slice(&v.to_be_bytes());
        }
        frame.extend_from_slice(&ts.to_be_bytes());
        frame.push(5); // aocs op mode: normal pointing
        frame.push(0b0000_0101); // roll and yaw error flags
        // hk temperatures
        frame.extend_from_slice(&0xbeefu16.to_be_bytes());
        for tile in 0..14u8 {
            frame.extend_from_slice(&[100 + tile, 120 + tile, 10 + tile]);
        }
        frame.extend_from_slice(&[0, 33]); // 9 pad bits + 7-bit tgu code
        assert_eq!(frame.len(), 128);

        let words = frame
            .chunks(2)
            .enumerate()
            .map(|(k, w)| SubcomItem {
                pri_count: k as u32,
                data_word_index: k as u8 + 1,
                data_word: [w[0], w[1]],
            })
            .collect();
        SubcomCycle { words, partial: false }
    }

    #[test]
    fn decode_synthetic_frame() {
        let decoded = synthetic_cycle().decode().unwrap();

        assert_eq!(decoded.pvt.x, 7000.25);
        assert_eq!(decoded.pvt.y, -1234.5);
        assert_eq!(decoded.pvt.z, 42.0);
        assert_eq!(decoded.pvt.vx, 1.5);
        assert_eq!(decoded.pvt.vy, -2.5);
        assert_eq!(decoded.pvt.vz, 3.25);
        assert_eq!(decoded.pvt.time_stamp, 0x00ab_cdef_0123_4567);

        assert_eq!(decoded.attitude.q0, 0.5);
        assert_eq!(decoded.attitude.q3, 0.75);
        assert_eq!(decoded.attitude.omega_z, 0.03);
        assert_eq!(decoded.attitude.time_stamp, 0x00ab_cdef_0123_4567);
        let ps = decoded.attitude.pointing_status;
        assert_eq!(ps.aocs_op_mode, AocsOpMode::NormalPointing);
        assert!(ps.roll_error && !ps.pitch_error && ps.yaw_error);

        assert_eq!(decoded.hk_temperature.temperature_update_status, 0xbeef);
        assert_eq!(decoded.hk_temperature.tiles[0].efe_h, 100);
        assert_eq!(decoded.hk_temperature.tiles[13].ta, 23);
        assert_eq!(decoded.hk_temperature.tgu_temperature, 33);
        let tgu = decoded.hk_temperature.tgu_celsius().unwrap();
        assert!((tgu - 79.18).abs() < 1e-9);
    }

    #[test]
    fn partial_cycle_does_not_decode() {
        let cycles = SubcomDecoder::decode(items(1..=30));
        assert!(cycles[0].decode().is_err());
    }
}
