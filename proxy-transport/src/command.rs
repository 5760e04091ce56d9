// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Command packets
//!
//! Inbound command packets are classified solely by the leading payload byte.
//! Unknown bytes map to an explicit `Unsupported` variant, never a
//! fallthrough.

use crate::constants::*;
use crate::packet::Packet;
use crate::payload::PayloadReader;
use proxy_common::{ProxyError, Result};

/// Command classification by type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPacketType {
    ComQuit,
    ComInitDb,
    ComQuery,
    ComFieldList,
    ComPing,
    Unsupported(u8),
}

impl CommandPacketType {
    pub fn of(type_byte: u8) -> Self {
        match type_byte {
            COM_QUIT => Self::ComQuit,
            COM_INIT_DB => Self::ComInitDb,
            COM_QUERY => Self::ComQuery,
            COM_FIELD_LIST => Self::ComFieldList,
            COM_PING => Self::ComPing,
            other => Self::Unsupported(other),
        }
    }
}

/// Typed command packet, constructed from a classified payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPacket {
    Quit,
    /// COM_INIT_DB: select the given schema.
    InitDb { schema: String },
    /// COM_QUERY: execute the SQL text.
    Query { sql: String },
    /// COM_FIELD_LIST: list columns of the given table.
    FieldList { table: String },
    Ping,
    Unsupported { type_byte: u8 },
}

impl CommandPacket {
    /// Decode a command packet. The packet must be non-empty; the leading
    /// byte picks the concrete layout.
    pub fn from_packet(packet: &Packet) -> Result<Self> {
        let mut reader = PayloadReader::new(&packet.payload);
        let type_byte = reader.read_int1().map_err(|_| {
            ProxyError::ProtocolError("empty command packet".to_string())
        })?;
        match CommandPacketType::of(type_byte) {
            CommandPacketType::ComQuit => Ok(Self::Quit),
            CommandPacketType::ComInitDb => {
                let schema = String::from_utf8_lossy(&reader.read_rest()).to_string();
                Ok(Self::InitDb { schema })
            }
            CommandPacketType::ComQuery => {
                let sql = String::from_utf8_lossy(&reader.read_rest()).to_string();
                Ok(Self::Query { sql })
            }
            CommandPacketType::ComFieldList => {
                let table =
                    String::from_utf8_lossy(&reader.read_null_terminated()?).to_string();
                Ok(Self::FieldList { table })
            }
            CommandPacketType::ComPing => Ok(Self::Ping),
            CommandPacketType::Unsupported(byte) => {
                Ok(Self::Unsupported { type_byte: byte })
            }
        }
    }
}
