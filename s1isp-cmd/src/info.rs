use std::collections::BTreeMap;
use std::fs::File;
use std::io::stdout;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use s1isp::stream::{DecoderOptions, StreamDecoder};

#[derive(Debug, Default, Serialize)]
struct Summary {
    packets: usize,
    bytes: u64,
    anomalies: usize,
    data_take_ids: Vec<u32>,
    first_space_packet_count: Option<u32>,
    last_space_packet_count: Option<u32>,
    signal_types: BTreeMap<String, usize>,
    baq_modes: BTreeMap<String, usize>,
    swath_numbers: BTreeMap<u8, usize>,
}

fn summarize(path: &Path) -> Result<Summary> {
    let file = File::open(path).with_context(|| format!("opening {path:?}"))?;
    let decoder = StreamDecoder::new(file, DecoderOptions::default())?;

    let mut summary = Summary::default();
    for zult in decoder {
        let record = zult?;
        let sh = &record.secondary_header;
        let rcss = &sh.radar_configuration_support;

        summary.packets += 1;
        summary.bytes += record.primary_header.packet_size() as u64;
        if record.anomaly.is_some() {
            summary.anomalies += 1;
        }
        if !summary
            .data_take_ids
            .contains(&sh.fixed_ancillary_data.data_take_id)
        {
            summary.data_take_ids.push(sh.fixed_ancillary_data.data_take_id);
        }
        if summary.first_space_packet_count.is_none() {
            summary.first_space_packet_count = Some(sh.counters.space_packet_count);
        }
        summary.last_space_packet_count = Some(sh.counters.space_packet_count);
        *summary
            .signal_types
            .entry(rcss.ses.signal_type.to_string())
            .or_default() += 1;
        *summary.baq_modes.entry(rcss.baq_mode.to_string()).or_default() += 1;
        *summary.swath_numbers.entry(rcss.ses.swath_number).or_default() += 1;
    }
    Ok(summary)
}

pub fn info(path: &Path, json: bool) -> Result<()> {
    let summary = summarize(path)?;

    if json {
        serde_json::to_writer_pretty(stdout(), &summary).context("serializing summary")?;
        println!();
        return Ok(());
    }

    println!("{}", path.display());
    println!("packets:     {}", summary.packets);
    println!("bytes:       {}", summary.bytes);
    println!("anomalies:   {}", summary.anomalies);
    println!("data takes:  {:?}", summary.data_take_ids);
    if let (Some(first), Some(last)) =
        (summary.first_space_packet_count, summary.last_space_packet_count)
    {
        println!("packet counts: {first}..{last}");
    }
    println!("signal types:");
    for (name, count) in &summary.signal_types {
        println!("  {name:<16} {count}");
    }
    println!("baq modes:");
    for (name, count) in &summary.baq_modes {
        println!("  {name:<16} {count}");
    }
    println!("swath numbers:");
    for (number, count) in &summary.swath_numbers {
        println!("  {number:<16} {count}");
    }
    Ok(())
}
