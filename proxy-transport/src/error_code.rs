// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Vendor error-code table
//!
//! Maps classified errors to {error code, SQLSTATE, message}. Selection is
//! table-driven from the error cause; the wire-level ERR conversion happens
//! at exactly one place per engine boundary.

use crate::packet::{ErrPacket, Packet};
use proxy_common::ProxyError;

/// Server error codes with their SQLSTATE and message templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorCode {
    ErAccessDeniedError,
    ErDbaccessDeniedError,
    ErBadDbError,
    ErNoSuchTable,
    ErUnknownComError,
    ErInternalError,
}

impl ServerErrorCode {
    pub fn error_code(&self) -> u16 {
        match self {
            Self::ErAccessDeniedError => 1045,
            Self::ErDbaccessDeniedError => 1044,
            Self::ErBadDbError => 1049,
            Self::ErNoSuchTable => 1146,
            Self::ErUnknownComError => 1047,
            Self::ErInternalError => 1815,
        }
    }

    pub fn sql_state(&self) -> &'static str {
        match self {
            Self::ErAccessDeniedError => "28000",
            Self::ErDbaccessDeniedError => "42000",
            Self::ErBadDbError => "42000",
            Self::ErNoSuchTable => "42S02",
            Self::ErUnknownComError => "08S01",
            Self::ErInternalError => "HY000",
        }
    }
}

/// Build an ERR packet for a classified error code with pre-formatted
/// message arguments.
pub fn err_packet(code: ServerErrorCode, message: String, sequence_id: u8) -> Packet {
    ErrPacket::new(code.error_code(), code.sql_state(), message).to_packet(sequence_id)
}

/// The single ERR-conversion boundary: translate a classified [`ProxyError`]
/// into a wire-format ERR packet.
pub fn err_packet_for(cause: &ProxyError, sequence_id: u8) -> Packet {
    let (code, message) = classify(cause);
    err_packet(code, message, sequence_id)
}

fn classify(cause: &ProxyError) -> (ServerErrorCode, String) {
    match cause {
        ProxyError::AccessDenied {
            username,
            host,
            password_supplied,
        } => (
            ServerErrorCode::ErAccessDeniedError,
            format!(
                "Access denied for user '{username}'@'{host}' (using password: {})",
                if *password_supplied { "YES" } else { "NO" }
            ),
        ),
        ProxyError::DbAccessDenied {
            username,
            host,
            database,
        } => (
            ServerErrorCode::ErDbaccessDeniedError,
            format!("Access denied for user '{username}'@'{host}' to database '{database}'"),
        ),
        ProxyError::UnknownDatabase(name) => (
            ServerErrorCode::ErBadDbError,
            format!("Unknown database '{name}'"),
        ),
        ProxyError::NoSuchTable { schema, table } => (
            ServerErrorCode::ErNoSuchTable,
            format!("Table '{schema}.{table}' doesn't exist"),
        ),
        ProxyError::UnsupportedCommand(_) => (
            ServerErrorCode::ErUnknownComError,
            "Unknown command".to_string(),
        ),
        other => (
            ServerErrorCode::ErInternalError,
            format!("Internal error: {other}"),
        ),
    }
}
