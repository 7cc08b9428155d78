use spcwire_codec::{CodecConfig, Dictionary, Port};

/// Default maximum envelope size: 16 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// A decoded message: header routing plus the content dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// Destination port and the right transferred with it.
    pub remote_port: Port,
    /// Reply port and the right transferred with it.
    pub local_port: Port,
    pub id: u32,
    pub content: Dictionary,
}

impl Message {
    /// Create a message addressed to `remote_port` with no reply port.
    pub fn new(remote_port: Port, content: Dictionary) -> Self {
        Self {
            remote_port,
            local_port: Port::NULL,
            id: 0,
            content,
        }
    }

    pub fn with_local_port(mut self, local_port: Port) -> Self {
        self.local_port = local_port;
        self
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }
}

/// Configuration for envelope encoding and decoding.
#[derive(Debug, Clone)]
pub struct EnvelopeConfig {
    /// Content codec settings.
    pub codec: CodecConfig,
    /// Maximum envelope size in bytes. Default: 16 MiB.
    pub max_message_size: usize,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            codec: CodecConfig::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}
