mod decode;
mod index;
mod info;

use std::io::stderr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode ISP headers (and optionally sample data) to a tabular dump.
    Decode {
        /// L0 measurement data component file.
        input: PathBuf,

        /// Number of ISPs to skip at the beginning of the file.
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Maximum number of ISPs to decode.
        #[arg(long)]
        maxcount: Option<usize>,

        /// Number of bytes to skip at the beginning of the file.
        #[arg(long, default_value_t = 0)]
        bytes_offset: u64,

        /// What to do with the user data field of each packet.
        ///
        /// Extracted bytes or decoded samples are embedded in the json and
        /// jsonl rows; CSV dumps write them to a companion .udf.jsonl file
        /// keyed by packet offset.
        #[arg(long, default_value = "none")]
        data: decode::DataMode,

        /// Output format for the header dump.
        #[arg(short = 'f', long, default_value = "csv")]
        output_format: decode::OutputFormat,

        /// Dump enum fields as their numeric code instead of the symbolic
        /// name.
        #[arg(long, action)]
        enum_value: bool,

        /// Recover from corrupted packets by scanning for the next valid
        /// header instead of stopping.
        #[arg(long, action)]
        resync: bool,

        /// Overwrite the output file if it already exists.
        #[arg(long, action)]
        force: bool,

        /// Output file path (default: input basename plus the format
        /// extension).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Summarize the packets of an L0 measurement file.
    Info {
        /// L0 measurement data component file.
        input: PathBuf,

        /// Print the summary as JSON instead of text.
        #[arg(long, action)]
        json: bool,
    },
    /// Dump the entries of an L0 index component file.
    Index {
        /// L0 index data component file.
        input: PathBuf,
    },
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Decode {
            input,
            skip,
            maxcount,
            bytes_offset,
            data,
            output_format,
            enum_value,
            resync,
            force,
            output,
        } => decode::decode(&decode::DecodeArgs {
            input,
            skip,
            maxcount,
            bytes_offset,
            data,
            output_format,
            enum_value,
            resync,
            force,
            output,
        }),
        Commands::Info { input, json } => info::info(&input, json),
        Commands::Index { input } => index::dump(&input),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_env_filter(
            EnvFilter::try_from_env("S1ISP_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            // invalid telemetry and plain I/O problems get distinct codes
            let invalid = err
                .downcast_ref::<s1isp::Error>()
                .is_some_and(|e| matches!(e, s1isp::Error::InvalidPacket { .. }));
            if invalid {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            }
        }
    }
}
