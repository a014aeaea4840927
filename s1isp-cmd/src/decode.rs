use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use s1isp::headers::SasBeam;
use s1isp::stream::{DecodedRecord, DecoderOptions, StreamDecoder, UdfMode, UserData};
use s1isp::subcom::SubcomDecoder;

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Csv,
    Json,
    Jsonl,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Jsonl => "jsonl",
        }
    }
}

impl clap::ValueEnum for OutputFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Csv, Self::Json, Self::Jsonl]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.extension()))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DataMode {
    None,
    Extract,
    Decode,
}

impl clap::ValueEnum for DataMode {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::None, Self::Extract, Self::Decode]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::None => Some(clap::builder::PossibleValue::new("none")),
            Self::Extract => Some(clap::builder::PossibleValue::new("extract")),
            Self::Decode => Some(clap::builder::PossibleValue::new("decode")),
        }
    }
}

pub struct DecodeArgs {
    pub input: PathBuf,
    pub skip: usize,
    pub maxcount: Option<usize>,
    pub bytes_offset: u64,
    pub data: DataMode,
    pub output_format: OutputFormat,
    pub enum_value: bool,
    pub resync: bool,
    pub force: bool,
    pub output: Option<PathBuf>,
}

/// One flattened header record, ready for tabular serialization.
#[derive(Debug, Serialize)]
struct RecordRow {
    offset: u64,
    // primary header
    version: u8,
    packet_type: u8,
    secondary_header_flag: bool,
    pid: u8,
    pcat: u8,
    sequence_flags: u8,
    sequence_count: u16,
    packet_data_length: u16,
    // datation service
    coarse_time: u32,
    fine_time: u16,
    fine_time_sec: f64,
    // fixed ancillary data service
    sync_marker: u32,
    data_take_id: u32,
    ecc_num: String,
    test_mode: String,
    rx_channel_id: String,
    instrument_configuration_id: u32,
    // sub-commutation ancillary data service
    data_word_index: u8,
    // counters service
    space_packet_count: u32,
    pri_count: u32,
    // radar configuration support service
    error_flag: bool,
    baq_mode: String,
    baq_block_length: u8,
    range_decimation: String,
    rx_gain: u8,
    tx_ramp_rate: u16,
    tx_pulse_start_freq: u16,
    tx_pulse_length: u32,
    rank: u8,
    pri: u32,
    swst: u32,
    swl: u32,
    ssb_flag: bool,
    polarization: String,
    temperature_compensation: String,
    elevation_beam_address: Option<u8>,
    azimuth_beam_address: Option<u16>,
    sas_test: Option<String>,
    cal_type: Option<String>,
    calibration_beam_address: Option<u16>,
    cal_mode: String,
    tx_pulse_number: u8,
    signal_type: String,
    swap: bool,
    swath_number: u8,
    // radar sample count service
    number_of_quads: u16,
    // derived physical quantities
    rx_gain_db: f64,
    tx_ramp_rate_hz_per_sec: f64,
    tx_pulse_start_freq_hz: f64,
    tx_pulse_length_sec: f64,
    pri_sec: f64,
    swst_sec: f64,
    swl_sec: f64,
    n3rx_samples: Option<u32>,
    // user data (json/jsonl rows only; CSV dumps write a .udf.jsonl
    // sidecar instead, nested sequences do not fit a cell)
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<Vec<[f32; 2]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    udf_raw: Option<String>,
    // decode anomaly attached to this packet, if any
    anomaly: Option<String>,
}

/// One sidecar line holding the user data of a packet, keyed by the
/// packet's byte offset so it joins back onto the CSV rows.
#[derive(Debug, Serialize)]
struct UdfRow {
    offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<Vec<[f32; 2]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
}

/// Decoded samples as `[re, im]` pairs, or extracted bytes as hex.
fn user_data_cells(record: &DecodedRecord) -> (Option<Vec<[f32; 2]>>, Option<String>) {
    match &record.user_data {
        Some(UserData::Samples(samples)) => {
            (Some(samples.iter().map(|c| [c.re, c.im]).collect()), None)
        }
        Some(UserData::Raw(bytes)) => {
            (None, Some(bytes.iter().map(|b| format!("{b:02x}")).collect()))
        }
        None => (None, None),
    }
}

fn enum_cell<E: std::fmt::Display>(value: E, code: u8, numeric: bool) -> String {
    if numeric {
        code.to_string()
    } else {
        value.to_string()
    }
}

fn row_from_record(record: &DecodedRecord, numeric_enums: bool, inline_user_data: bool) -> RecordRow {
    let ph = &record.primary_header;
    let sh = &record.secondary_header;
    let fad = &sh.fixed_ancillary_data;
    let rcss = &sh.radar_configuration_support;
    let ses = &rcss.ses;
    let sas = &rcss.sas;

    let (elevation_beam_address, azimuth_beam_address, sas_test, cal_type, calibration_beam_address) =
        match sas.beam {
            SasBeam::Image { elevation_beam_address, azimuth_beam_address } => {
                (Some(elevation_beam_address), Some(azimuth_beam_address), None, None, None)
            }
            SasBeam::Calibration { sas_test, cal_type, calibration_beam_address } => (
                None,
                None,
                Some(enum_cell(sas_test, sas_test.code(), numeric_enums)),
                Some(enum_cell(cal_type, cal_type.code(), numeric_enums)),
                Some(calibration_beam_address),
            ),
        };

    let (samples, udf_raw) = if inline_user_data {
        user_data_cells(record)
    } else {
        (None, None)
    };

    RecordRow {
        offset: record.offset,
        version: ph.version,
        packet_type: ph.packet_type,
        secondary_header_flag: ph.secondary_header_flag,
        pid: ph.pid,
        pcat: ph.pcat,
        sequence_flags: ph.sequence_flags,
        sequence_count: ph.sequence_count,
        packet_data_length: ph.packet_data_length,
        coarse_time: sh.datation.coarse_time,
        fine_time: sh.datation.fine_time,
        fine_time_sec: sh.datation.fine_time_sec(),
        sync_marker: fad.sync_marker,
        data_take_id: fad.data_take_id,
        ecc_num: enum_cell(fad.ecc_num, fad.ecc_num.code(), numeric_enums),
        test_mode: enum_cell(fad.test_mode, fad.test_mode.code(), numeric_enums),
        rx_channel_id: enum_cell(fad.rx_channel_id, fad.rx_channel_id.code(), numeric_enums),
        instrument_configuration_id: fad.instrument_configuration_id,
        data_word_index: sh.subcom_ancillary_data.data_word_index,
        space_packet_count: sh.counters.space_packet_count,
        pri_count: sh.counters.pri_count,
        error_flag: rcss.error_flag,
        baq_mode: enum_cell(rcss.baq_mode, rcss.baq_mode.code(), numeric_enums),
        baq_block_length: rcss.baq_block_length,
        range_decimation: enum_cell(
            rcss.range_decimation,
            rcss.range_decimation.code(),
            numeric_enums,
        ),
        rx_gain: rcss.rx_gain,
        tx_ramp_rate: rcss.tx_ramp_rate,
        tx_pulse_start_freq: rcss.tx_pulse_start_freq,
        tx_pulse_length: rcss.tx_pulse_length,
        rank: rcss.rank,
        pri: rcss.pri,
        swst: rcss.swst,
        swl: rcss.swl,
        ssb_flag: sas.ssb_flag,
        polarization: enum_cell(sas.polarization, sas.polarization.code(), numeric_enums),
        temperature_compensation: enum_cell(
            sas.temperature_compensation,
            sas.temperature_compensation.code(),
            numeric_enums,
        ),
        elevation_beam_address,
        azimuth_beam_address,
        sas_test,
        cal_type,
        calibration_beam_address,
        cal_mode: enum_cell(ses.cal_mode, ses.cal_mode.code(), numeric_enums),
        tx_pulse_number: ses.tx_pulse_number,
        signal_type: enum_cell(ses.signal_type, ses.signal_type.code(), numeric_enums),
        swap: ses.swap,
        swath_number: ses.swath_number,
        number_of_quads: sh.radar_sample_count.number_of_quads,
        rx_gain_db: rcss.rx_gain_db(),
        tx_ramp_rate_hz_per_sec: rcss.tx_ramp_rate_hz_per_sec(),
        tx_pulse_start_freq_hz: rcss.tx_pulse_start_freq_hz(),
        tx_pulse_length_sec: rcss.tx_pulse_length_sec(),
        pri_sec: rcss.pri_sec(),
        swst_sec: rcss.swst_sec(),
        swl_sec: rcss.swl_sec(),
        n3rx_samples: rcss.swl_n3rx_samples().ok(),
        samples,
        udf_raw,
        anomaly: record.anomaly.as_ref().map(|e| e.to_string()),
    }
}

enum RowWriter {
    Csv(csv::Writer<BufWriter<File>>),
    Json { out: BufWriter<File>, rows: Vec<serde_json::Value> },
    Jsonl(BufWriter<File>),
}

impl RowWriter {
    fn create(path: &Path, format: OutputFormat) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("creating output {path:?}"))?;
        let out = BufWriter::new(file);
        Ok(match format {
            OutputFormat::Csv => Self::Csv(csv::Writer::from_writer(out)),
            OutputFormat::Json => Self::Json { out, rows: Vec::new() },
            OutputFormat::Jsonl => Self::Jsonl(out),
        })
    }

    fn write(&mut self, row: &RecordRow) -> Result<()> {
        match self {
            Self::Csv(w) => w.serialize(row)?,
            Self::Json { rows, .. } => rows.push(serde_json::to_value(row)?),
            Self::Jsonl(out) => {
                serde_json::to_writer(&mut *out, row)?;
                writeln!(out)?;
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        match self {
            Self::Csv(mut w) => w.flush()?,
            Self::Json { mut out, rows } => {
                serde_json::to_writer_pretty(&mut out, &rows)?;
                out.flush()?;
            }
            Self::Jsonl(mut out) => out.flush()?,
        }
        Ok(())
    }
}

pub fn decode(args: &DecodeArgs) -> Result<()> {
    let out_path = match &args.output {
        Some(path) => path.clone(),
        None => args.input.with_extension(args.output_format.extension()),
    };
    if !args.force && out_path.exists() {
        bail!("{out_path:?} exists; use --force");
    }

    let file = File::open(&args.input).with_context(|| format!("opening {:?}", args.input))?;
    let total_bytes = file.metadata()?.len();

    let options = DecoderOptions {
        skip: args.skip,
        max_count: args.maxcount,
        bytes_offset: args.bytes_offset,
        udf_mode: match args.data {
            DataMode::None => UdfMode::None,
            DataMode::Extract => UdfMode::Extract,
            DataMode::Decode => UdfMode::Decode,
        },
        resync: args.resync,
        cancel: None,
    };

    let bar = ProgressBar::new(total_bytes).with_style(
        ProgressStyle::with_template(
            "{bar:30} {bytes}/{total_bytes} ({per_sec}) {msg}",
        )?
        .progress_chars("=> "),
    );

    let mut decoder = StreamDecoder::new(file, options)?;
    let mut writer = RowWriter::create(&out_path, args.output_format)?;

    // CSV cells cannot hold the sample sequences, so user data rides in a
    // JSON-lines companion file joined on the packet offset
    let inline_user_data = !matches!(args.output_format, OutputFormat::Csv);
    let mut sidecar = if !inline_user_data && !matches!(args.data, DataMode::None) {
        let path = out_path.with_extension("udf.jsonl");
        if !args.force && path.exists() {
            bail!("{path:?} exists; use --force");
        }
        let file =
            File::create(&path).with_context(|| format!("creating sidecar {path:?}"))?;
        Some((BufWriter::new(file), path))
    } else {
        None
    };

    let mut count = 0usize;
    let mut anomalies = 0usize;
    let mut terminal: Option<s1isp::Error> = None;

    for zult in &mut decoder {
        match zult {
            Ok(record) => {
                if record.anomaly.is_some() {
                    anomalies += 1;
                }
                writer.write(&row_from_record(&record, args.enum_value, inline_user_data))?;
                if let Some((out, _)) = &mut sidecar {
                    let (samples, raw) = user_data_cells(&record);
                    if samples.is_some() || raw.is_some() {
                        let row = UdfRow { offset: record.offset, samples, raw };
                        serde_json::to_writer(&mut *out, &row)?;
                        writeln!(out)?;
                    }
                }
                count += 1;
                bar.set_position(record.offset);
                bar.set_message(format!("{count} packets"));
            }
            Err(err) => {
                terminal = Some(err);
                break;
            }
        }
    }
    bar.finish_and_clear();

    let cycles = SubcomDecoder::decode(decoder.into_subcom_items());
    let complete = cycles.iter().filter(|c| !c.partial).count();
    info!(
        "decoded {count} packets ({anomalies} with anomalies), \
         {complete}/{} sub-commutation cycles complete",
        cycles.len()
    );

    writer.finish()?;
    info!("records written to {out_path:?}");
    if let Some((mut out, path)) = sidecar {
        out.flush()?;
        info!("user data written to {path:?}");
    }

    if let Some(err) = terminal {
        if count > 0 {
            warn!("stream ended early after {count} records");
        }
        return Err(err.into());
    }
    Ok(())
}
