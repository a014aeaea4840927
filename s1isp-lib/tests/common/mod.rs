//! Synthetic packet construction shared by the integration tests.

use s1isp::headers::{
    PrimaryHeader, SasBeam, SecondaryHeader,
};
use s1isp::SYNC_MARKER;

/// MSB-first bit accumulator used to assemble header and sample fields.
pub struct BitWriter {
    bits: Vec<u8>,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter { bits: Vec::new() }
    }

    pub fn push(&mut self, value: u64, n: usize) {
        for shift in (0..n).rev() {
            self.bits.push(((value >> shift) & 1) as u8);
        }
    }

    pub fn push_flag(&mut self, value: bool) {
        self.push(u64::from(value), 1);
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Zero-fill to the next 16-bit word boundary past `start`.
    pub fn pad_to_word(&mut self, start: usize) {
        while (self.bits.len() - start) % 16 != 0 {
            self.bits.push(0);
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        assert!(self.bits.len() % 8 == 0, "bit count not byte aligned");
        let mut out = vec![0u8; self.bits.len() / 8];
        for (i, b) in self.bits.iter().enumerate() {
            out[i / 8] |= b << (7 - i % 8);
        }
        out
    }
}

pub fn encode_primary_header(h: &PrimaryHeader) -> [u8; 6] {
    let mut w = BitWriter::new();
    w.push(u64::from(h.version), 3);
    w.push(u64::from(h.packet_type), 1);
    w.push_flag(h.secondary_header_flag);
    w.push(u64::from(h.pid), 7);
    w.push(u64::from(h.pcat), 4);
    w.push(u64::from(h.sequence_flags), 2);
    w.push(u64::from(h.sequence_count), 14);
    w.push(u64::from(h.packet_data_length), 16);
    w.into_bytes().try_into().unwrap()
}

pub fn encode_secondary_header(sh: &SecondaryHeader) -> [u8; 62] {
    let mut w = BitWriter::new();

    w.push(u64::from(sh.datation.coarse_time), 32);
    w.push(u64::from(sh.datation.fine_time), 16);

    let fad = &sh.fixed_ancillary_data;
    w.push(u64::from(fad.sync_marker), 32);
    w.push(u64::from(fad.data_take_id), 32);
    w.push(u64::from(fad.ecc_num.code()), 8);
    w.push(0, 1);
    w.push(u64::from(fad.test_mode.code()), 3);
    w.push(u64::from(fad.rx_channel_id.code()), 4);
    w.push(u64::from(fad.instrument_configuration_id), 32);

    w.push(u64::from(sh.subcom_ancillary_data.data_word_index), 8);
    w.push(u64::from(sh.subcom_ancillary_data.data_word[0]), 8);
    w.push(u64::from(sh.subcom_ancillary_data.data_word[1]), 8);

    w.push(u64::from(sh.counters.space_packet_count), 32);
    w.push(u64::from(sh.counters.pri_count), 32);

    let rcss = &sh.radar_configuration_support;
    w.push_flag(rcss.error_flag);
    w.push(0, 2);
    w.push(u64::from(rcss.baq_mode.code()), 5);
    w.push(u64::from(rcss.baq_block_length), 8);
    w.push(0, 8);
    w.push(u64::from(rcss.range_decimation.code()), 8);
    w.push(u64::from(rcss.rx_gain), 8);
    w.push(u64::from(rcss.tx_ramp_rate), 16);
    w.push(u64::from(rcss.tx_pulse_start_freq), 16);
    w.push(u64::from(rcss.tx_pulse_length), 24);
    w.push(0, 3);
    w.push(u64::from(rcss.rank), 5);
    w.push(u64::from(rcss.pri), 24);
    w.push(u64::from(rcss.swst), 24);
    w.push(u64::from(rcss.swl), 24);

    let sas = &rcss.sas;
    w.push_flag(sas.ssb_flag);
    w.push(u64::from(sas.polarization.code()), 3);
    w.push(u64::from(sas.temperature_compensation.code()), 2);
    w.push(0, 2);
    match sas.beam {
        SasBeam::Image { elevation_beam_address, azimuth_beam_address } => {
            w.push(u64::from(elevation_beam_address), 4);
            w.push(0, 2);
            w.push(u64::from(azimuth_beam_address), 10);
        }
        SasBeam::Calibration { sas_test, cal_type, calibration_beam_address } => {
            w.push(u64::from(sas_test.code()), 1);
            w.push(u64::from(cal_type.code()), 3);
            w.push(0, 2);
            w.push(u64::from(calibration_beam_address), 10);
        }
    }

    let ses = &rcss.ses;
    w.push(u64::from(ses.cal_mode.code()), 2);
    w.push(0, 1);
    w.push(u64::from(ses.tx_pulse_number), 5);
    w.push(u64::from(ses.signal_type.code()), 4);
    w.push(0, 3);
    w.push_flag(ses.swap);
    w.push(u64::from(ses.swath_number), 8);

    w.push(u64::from(sh.radar_sample_count.number_of_quads), 16);
    w.push(0, 8);

    assert_eq!(w.len(), SecondaryHeader::LEN * 8);
    w.into_bytes().try_into().unwrap()
}

/// Assemble a full packet around a secondary header and raw user data.
pub fn make_packet(sh: &SecondaryHeader, udf: &[u8]) -> Vec<u8> {
    let ph = PrimaryHeader {
        version: 0,
        packet_type: 0,
        secondary_header_flag: true,
        pid: 65,
        pcat: 12,
        sequence_flags: PrimaryHeader::SEQ_UNSEGMENTED,
        sequence_count: (sh.counters.space_packet_count % (1 << 14)) as u16,
        packet_data_length: (SecondaryHeader::LEN + udf.len() - 1) as u16,
    };
    let mut packet = Vec::with_capacity(PrimaryHeader::LEN + SecondaryHeader::LEN + udf.len());
    packet.extend_from_slice(&encode_primary_header(&ph));
    packet.extend_from_slice(&encode_secondary_header(sh));
    packet.extend_from_slice(udf);
    packet
}

/// Encode a bypass user data field from signed sample values, interleaves
/// in wire order (Ie, Io, Qe, Qo).
pub fn bypass_udf(channels: [&[i32]; 4]) -> Vec<u8> {
    let mut w = BitWriter::new();
    for chan in channels {
        let start = w.len();
        for &v in chan {
            let code = if v < 0 { 0x200 | (-v as u64) } else { v as u64 };
            w.push(code, 10);
        }
        w.pad_to_word(start);
    }
    w.into_bytes()
}

/// A plausible secondary header template the tests tweak per packet.
pub fn base_secondary_header() -> SecondaryHeader {
    use s1isp::enums::*;
    use s1isp::headers::*;

    SecondaryHeader {
        datation: DatationService { coarse_time: 1_276_273_467, fine_time: 61863 },
        fixed_ancillary_data: FixedAncillaryDataService {
            sync_marker: SYNC_MARKER,
            data_take_id: 112_233,
            ecc_num: EccNumber::S3,
            test_mode: TestMode::Default,
            rx_channel_id: RxChannelId::RxV,
            instrument_configuration_id: 1,
        },
        subcom_ancillary_data: SubCommAncillaryDataService {
            data_word_index: 0,
            data_word: [0, 0],
        },
        counters: CountersService { space_packet_count: 0, pri_count: 0 },
        radar_configuration_support: RadarConfigurationSupportService {
            error_flag: false,
            baq_mode: BaqMode::Bypass,
            baq_block_length: 31,
            range_decimation: RangeDecimation::X4On9,
            rx_gain: 12,
            tx_ramp_rate: 0x8000 | 2002,
            tx_pulse_start_freq: 12970,
            tx_pulse_length: 1658,
            rank: 9,
            pri: 19499,
            swst: 5271,
            swl: 12178,
            sas: SasData {
                ssb_flag: false,
                polarization: Polarization::VVh,
                temperature_compensation: TemperatureCompensation::FeOnTaOn,
                beam: SasBeam::Image { elevation_beam_address: 6, azimuth_beam_address: 0 },
            },
            ses: SesData {
                cal_mode: CalMode::Pcc2IcalInterleaved,
                tx_pulse_number: 0,
                signal_type: SignalType::Noise,
                swap: false,
                swath_number: 2,
            },
        },
        radar_sample_count: RadarSampleCountService { number_of_quads: 2 },
    }
}
