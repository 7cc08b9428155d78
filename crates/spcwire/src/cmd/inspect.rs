use spcwire_envelope::parse_envelope_with_config;

use crate::cmd::{read_input, InspectArgs};
use crate::exit::{envelope_error, CliResult, SUCCESS};
use crate::output::{print_envelope, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let envelope = read_input(args.path.as_deref())?;
    let config = args.limits.envelope_config(true);

    let info = parse_envelope_with_config(&envelope, &config)
        .map_err(|err| envelope_error("inspect failed", err))?;

    print_envelope(&info, format);
    Ok(SUCCESS)
}
