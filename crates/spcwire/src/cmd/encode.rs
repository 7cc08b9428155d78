use std::fs;

use spcwire_codec::{Dictionary, Port};
use spcwire_envelope::{serialize_with_config, Message};

use crate::cmd::{read_input, EncodeArgs};
use crate::exit::{envelope_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::json::to_dictionary;
use crate::output::print_raw;

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let content = resolve_content(&args)?;
    let msg = build_message(&args, content);
    let config = args.limits.envelope_config(true);

    let envelope =
        serialize_with_config(&msg, &config).map_err(|err| envelope_error("encode failed", err))?;
    tracing::info!(
        id = msg.id,
        size = envelope.len(),
        entries = msg.content.len(),
        "encoded envelope"
    );

    match &args.out {
        Some(path) => fs::write(path, &envelope)
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?,
        None => print_raw(&envelope),
    }
    Ok(SUCCESS)
}

fn resolve_content(args: &EncodeArgs) -> CliResult<Dictionary> {
    let text = match &args.json {
        Some(json) => json.clone(),
        None => {
            let raw = read_input(args.file.as_deref())?;
            String::from_utf8(raw)
                .map_err(|_| CliError::new(USAGE, "message content is not valid UTF-8"))?
        }
    };
    let json: serde_json::Value = serde_json::from_str(&text)
        .map_err(|err| CliError::new(USAGE, format!("content is not valid JSON: {err}")))?;
    to_dictionary(&json)
}

fn build_message(args: &EncodeArgs, content: Dictionary) -> Message {
    Message::new(Port::new(args.remote_port, args.remote_disposition), content)
        .with_local_port(Port::new(args.local_port, args.local_disposition))
        .with_id(args.id)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use spcwire_codec::{PortDisposition, Value};

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: EncodeArgs,
    }

    fn parse(argv: &[&str]) -> EncodeArgs {
        let mut full = vec!["encode"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn inline_json_becomes_content() {
        let args = parse(&["--json", "{\"a\":1,\"b\":\"x\"}"]);
        let content = resolve_content(&args).unwrap();
        assert_eq!(content.get("a"), Some(&Value::UInt64(1)));
        assert_eq!(content.get("b"), Some(&Value::from("x")));
    }

    #[test]
    fn invalid_json_is_usage_error() {
        let args = parse(&["--json", "{not json"]);
        let err = resolve_content(&args).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn routing_flags_reach_the_header() {
        let args = parse(&[
            "--json",
            "{}",
            "--id",
            "42",
            "--remote-port",
            "4355",
            "--remote-disposition",
            "move-send",
            "--local-port",
            "8711",
            "--local-disposition",
            "make-send-once",
        ]);
        let msg = build_message(&args, Dictionary::new());

        assert_eq!(msg.id, 42);
        assert_eq!(msg.remote_port, Port::new(4355, PortDisposition::MoveSend));
        assert_eq!(
            msg.local_port,
            Port::new(8711, PortDisposition::MakeSendOnce)
        );
    }
}
