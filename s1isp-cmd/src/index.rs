use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use s1isp::l0index::{entry_count, read_index};

pub fn dump(path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening {path:?}"))?;
    match entry_count(file.metadata()?.len()) {
        Ok(count) => println!("# {count} entries"),
        Err(_) => warn!("file size is not a whole number of index entries"),
    }

    println!("date_time,time_delta,data_size,channel,vcid,counter");
    for zult in read_index(BufReader::new(file)) {
        let e = zult?;
        println!(
            "{},{},{},{},{},{}",
            e.date_time, e.time_delta, e.data_size, e.channel, e.vcid, e.counter
        );
    }
    Ok(())
}
