use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use spcwire_codec::Port;
use spcwire_envelope::{Descriptor, EnvelopeInfo, Message};

use crate::json::{from_value, port_to_json};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput {
    id: u32,
    remote_port: serde_json::Value,
    local_port: serde_json::Value,
    entries: usize,
    content: serde_json::Value,
}

#[derive(Serialize)]
struct DescriptorOutput {
    kind: &'static str,
    wire_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    disposition: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    length: Option<u32>,
}

#[derive(Serialize)]
struct EnvelopeOutput {
    bits: String,
    complex: bool,
    size: u32,
    id: u32,
    remote_port: u32,
    remote_disposition: u32,
    local_port: u32,
    local_disposition: u32,
    voucher_port: u32,
    descriptors: Vec<DescriptorOutput>,
    content_offset: usize,
    content_len: usize,
}

pub fn print_message(msg: &Message, format: OutputFormat) {
    let out = MessageOutput {
        id: msg.id,
        remote_port: port_to_json(&msg.remote_port),
        local_port: port_to_json(&msg.local_port),
        entries: msg.content.len(),
        content: from_value(&spcwire_codec::Value::Dict(msg.content.clone())),
    };

    match format {
        OutputFormat::Json => print_json(&out, false),
        OutputFormat::Pretty => print_json(&out, true),
        OutputFormat::Table => {
            let mut routing = Table::new();
            routing
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "REMOTE", "LOCAL", "ENTRIES"])
                .add_row(vec![
                    format!("0x{:x}", msg.id),
                    port_label(&msg.remote_port),
                    port_label(&msg.local_port),
                    msg.content.len().to_string(),
                ]);
            println!("{routing}");

            let mut content = Table::new();
            content
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "TYPE", "VALUE"]);
            for (key, value) in &msg.content {
                content.add_row(vec![
                    key.clone(),
                    value.value_type().to_string(),
                    from_value(value).to_string(),
                ]);
            }
            println!("{content}");
        }
    }
}

pub fn print_envelope(info: &EnvelopeInfo, format: OutputFormat) {
    let header = &info.header;
    let out = EnvelopeOutput {
        bits: format!("0x{:08x}", header.bits),
        complex: header.is_complex(),
        size: header.size,
        id: header.id,
        remote_port: header.remote_port,
        remote_disposition: header.remote_disposition_raw(),
        local_port: header.local_port,
        local_disposition: header.local_disposition_raw(),
        voucher_port: header.voucher_port,
        descriptors: info.descriptors.iter().map(descriptor_output).collect(),
        content_offset: info.content_offset,
        content_len: info.content_len,
    };

    match format {
        OutputFormat::Json => print_json(&out, false),
        OutputFormat::Pretty => print_json(&out, true),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["bits".to_string(), out.bits.clone()]);
            table.add_row(vec!["complex".to_string(), out.complex.to_string()]);
            table.add_row(vec!["size".to_string(), out.size.to_string()]);
            table.add_row(vec!["id".to_string(), format!("0x{:x}", out.id)]);
            table.add_row(vec![
                "remote".to_string(),
                format!("{} ({})", out.remote_port, out.remote_disposition),
            ]);
            table.add_row(vec![
                "local".to_string(),
                format!("{} ({})", out.local_port, out.local_disposition),
            ]);
            table.add_row(vec![
                "content".to_string(),
                format!("{} bytes at offset {}", out.content_len, out.content_offset),
            ]);
            println!("{table}");

            if !info.descriptors.is_empty() {
                let mut descriptors = Table::new();
                descriptors
                    .load_preset(UTF8_FULL)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(vec!["#", "KIND", "DETAIL"]);
                for (index, descriptor) in info.descriptors.iter().enumerate() {
                    descriptors.add_row(vec![
                        index.to_string(),
                        descriptor.kind_name().to_string(),
                        descriptor_detail(descriptor),
                    ]);
                }
                println!("{descriptors}");
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    println!("{}", rendered.unwrap_or_else(|_| "{}".to_string()));
}

fn port_label(port: &Port) -> String {
    if port.is_null() {
        "-".to_string()
    } else {
        format!("{} ({})", port.name, port.disposition)
    }
}

fn descriptor_output(descriptor: &Descriptor) -> DescriptorOutput {
    let mut out = DescriptorOutput {
        kind: descriptor.kind_name(),
        wire_size: descriptor.wire_size(),
        name: None,
        disposition: None,
        address: None,
        length: None,
    };
    match descriptor {
        Descriptor::Port(port) => {
            out.name = Some(port.name);
            out.disposition = Some(port.disposition.name());
        }
        Descriptor::Ool { address, size } => {
            out.address = Some(*address);
            out.length = Some(*size);
        }
        Descriptor::OolPorts { address, count } => {
            out.address = Some(*address);
            out.length = Some(*count);
        }
    }
    out
}

fn descriptor_detail(descriptor: &Descriptor) -> String {
    match descriptor {
        Descriptor::Port(port) => port_label(port),
        Descriptor::Ool { address, size } => format!("{size} bytes at 0x{address:x}"),
        Descriptor::OolPorts { address, count } => format!("{count} ports at 0x{address:x}"),
    }
}
