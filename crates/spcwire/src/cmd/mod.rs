use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use spcwire_codec::{CodecConfig, PortDisposition};
use spcwire_envelope::{EnvelopeConfig, DEFAULT_MAX_MESSAGE_SIZE};

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod inspect;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a JSON document into a message envelope.
    Encode(EncodeArgs),
    /// Decode a message envelope and print its content.
    Decode(DecodeArgs),
    /// Print an envelope's header and descriptors without decoding content.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Message content as a JSON object.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read message content from a JSON file. Reads stdin when neither input is given.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
    /// Message id.
    #[arg(long, default_value = "0")]
    pub id: u32,
    /// Remote (destination) port name.
    #[arg(long, default_value = "0")]
    pub remote_port: u32,
    /// Remote port disposition (e.g. copy-send, move-send).
    #[arg(long, default_value = "copy-send")]
    pub remote_disposition: PortDisposition,
    /// Local (reply) port name.
    #[arg(long, default_value = "0")]
    pub local_port: u32,
    /// Local port disposition.
    #[arg(long, default_value = "none")]
    pub local_disposition: PortDisposition,
    /// Write the envelope to a file instead of stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
    #[command(flatten)]
    pub limits: LimitArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Envelope file. Reads stdin when omitted.
    pub path: Option<PathBuf>,
    /// Skip array/dictionary size-prefix validation.
    #[arg(long)]
    pub lenient: bool,
    #[command(flatten)]
    pub limits: LimitArgs,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Envelope file. Reads stdin when omitted.
    pub path: Option<PathBuf>,
    #[command(flatten)]
    pub limits: LimitArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug)]
pub struct LimitArgs {
    /// Maximum envelope size in bytes.
    #[arg(long, env = "SPCWIRE_MAX_MESSAGE_SIZE", default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    pub max_message_size: usize,
    /// Maximum container nesting depth.
    #[arg(long, env = "SPCWIRE_MAX_DEPTH", default_value_t = spcwire_codec::DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

impl LimitArgs {
    pub fn envelope_config(&self, validate_sizes: bool) -> EnvelopeConfig {
        EnvelopeConfig {
            codec: CodecConfig {
                max_depth: self.max_depth,
                validate_sizes,
            },
            max_message_size: self.max_message_size,
        }
    }
}

/// Read a whole input file, or stdin when no path is given.
pub fn read_input(path: Option<&Path>) -> CliResult<Vec<u8>> {
    match path {
        Some(path) => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err)),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| io_error("failed reading stdin", err))?;
            Ok(buf)
        }
    }
}
