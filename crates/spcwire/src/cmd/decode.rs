use spcwire_envelope::deserialize_with_config;

use crate::cmd::{read_input, DecodeArgs};
use crate::exit::{envelope_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let envelope = read_input(args.path.as_deref())?;
    let config = args.limits.envelope_config(!args.lenient);

    let msg = deserialize_with_config(&envelope, &config)
        .map_err(|err| envelope_error("decode failed", err))?;
    tracing::debug!(id = msg.id, entries = msg.content.len(), "decoded envelope");

    print_message(&msg, format);
    Ok(SUCCESS)
}
