// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Generic packets: the raw frame plus the OK/ERR/EOF catalog entries
//!
//! A [`Packet`] is one framed unit of the protocol: a sequence id and a
//! payload. The typed packets below are pure data-to-bytes mappings that
//! serialize through the payload codec.

use crate::constants::*;
use crate::payload::PayloadWriter;

/// One framed protocol packet (header already stripped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub sequence_id: u8,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(sequence_id: u8, payload: Vec<u8>) -> Self {
        Self {
            sequence_id,
            payload,
        }
    }

    /// Leading payload byte, if any. Classifies the packet.
    pub fn header_byte(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    pub fn ok(sequence_id: u8) -> Self {
        OkPacket::default().to_packet(sequence_id)
    }

    pub fn eof(sequence_id: u8) -> Self {
        EofPacket::default().to_packet(sequence_id)
    }
}

/// OK packet: 0x00 header, affected rows, last insert id, status, warnings.
#[derive(Debug, Clone)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: u16,
    pub warnings: u16,
}

impl Default for OkPacket {
    fn default() -> Self {
        Self {
            affected_rows: 0,
            last_insert_id: 0,
            status_flags: SERVER_STATUS_AUTOCOMMIT,
            warnings: 0,
        }
    }
}

impl OkPacket {
    pub fn to_packet(&self, sequence_id: u8) -> Packet {
        let mut writer = PayloadWriter::new();
        writer.write_int1(OK_HEADER);
        writer.write_lenenc_int(self.affected_rows);
        writer.write_lenenc_int(self.last_insert_id);
        writer.write_int2(self.status_flags);
        writer.write_int2(self.warnings);
        Packet::new(sequence_id, writer.into_payload())
    }
}

/// ERR packet: 0xFF header, error code, '#' marker, SQLSTATE, message.
#[derive(Debug, Clone)]
pub struct ErrPacket {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl ErrPacket {
    pub fn new(error_code: u16, sql_state: &str, message: String) -> Self {
        debug_assert_eq!(sql_state.len(), 5);
        Self {
            error_code,
            sql_state: sql_state.to_string(),
            message,
        }
    }

    pub fn to_packet(&self, sequence_id: u8) -> Packet {
        let mut writer = PayloadWriter::new();
        writer.write_int1(ERR_HEADER);
        writer.write_int2(self.error_code);
        writer.write_int1(b'#');
        writer.write_bytes(self.sql_state.as_bytes());
        writer.write_bytes(self.message.as_bytes());
        Packet::new(sequence_id, writer.into_payload())
    }
}

/// EOF packet: 0xFE header, warnings, status flags.
#[derive(Debug, Clone)]
pub struct EofPacket {
    pub warnings: u16,
    pub status_flags: u16,
}

impl Default for EofPacket {
    fn default() -> Self {
        Self {
            warnings: 0,
            status_flags: SERVER_STATUS_AUTOCOMMIT,
        }
    }
}

impl EofPacket {
    pub fn to_packet(&self, sequence_id: u8) -> Packet {
        let mut writer = PayloadWriter::new();
        writer.write_int1(EOF_HEADER);
        writer.write_int2(self.warnings);
        writer.write_int2(self.status_flags);
        Packet::new(sequence_id, writer.into_payload())
    }
}
