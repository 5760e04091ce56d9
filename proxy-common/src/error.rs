// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Error types for the proxy

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    /// Malformed or truncated packet. Fatal to the connection.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Access denied for user '{username}'@'{host}'")]
    AccessDenied {
        username: String,
        host: String,
        password_supplied: bool,
    },

    #[error("Access denied for user '{username}'@'{host}' to database '{database}'")]
    DbAccessDenied {
        username: String,
        host: String,
        database: String,
    },

    #[error("Unknown database '{0}'")]
    UnknownDatabase(String),

    #[error("Table '{schema}.{table}' doesn't exist")]
    NoSuchTable { schema: String, table: String },

    #[error("Unknown command")]
    UnsupportedCommand(u8),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ProxyError {
    /// Whether the connection can keep serving commands after this error.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, ProxyError::ProtocolError(_) | ProxyError::IoError(_))
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
