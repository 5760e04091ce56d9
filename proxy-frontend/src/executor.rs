// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Command executor interfaces
//!
//! The protocol engine drives executors through these traits; the actual
//! query backend lives behind [`ExecutorFactory`]. Unknown command types
//! resolve to an executor that reports the failure, never a fallthrough.

use crate::session::Session;
use proxy_catalog::{ColumnMetaData, ColumnType};
use proxy_common::{ProxyError, Result};
use proxy_transport::command::CommandPacket;
use proxy_transport::constants::{MYSQL_TYPE_LONG, MYSQL_TYPE_LONGLONG, MYSQL_TYPE_VAR_STRING};
use proxy_transport::resultset::TextRow;

/// Backend-bound cursor producing rows lazily for a query command.
pub trait QueryCommandExecutor: Send {
    /// Column metadata for the result-set header packets.
    fn columns(&self) -> &[ColumnMetaData];

    /// Whether another row is available. Side-effect free; may be called
    /// repeatedly before consuming.
    fn has_next(&self) -> bool;

    /// Advance to the next row. Fails with a backend error on fetch failure.
    fn next(&mut self) -> Result<()>;

    /// The current row as wire-ready data.
    fn row_data(&self) -> TextRow;
}

/// Executor for commands that complete with a single OK.
pub trait StatusCommandExecutor: Send {
    fn execute(&mut self) -> Result<()>;
}

/// A resolved executor for one inbound command.
pub enum CommandExecutor {
    Query(Box<dyn QueryCommandExecutor>),
    Status(Box<dyn StatusCommandExecutor>),
    /// The command defines no reply (COM_QUIT); close the connection.
    NoResponse,
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandExecutor::Query(_) => f.write_str("Query(..)"),
            CommandExecutor::Status(_) => f.write_str("Status(..)"),
            CommandExecutor::NoResponse => f.write_str("NoResponse"),
        }
    }
}

/// Backend seam: resolves a typed command packet to an executor.
pub trait ExecutorFactory: Send + Sync {
    fn create(&self, session: &mut Session, command: &CommandPacket) -> Result<CommandExecutor>;
}

/// COM_PING: status no-op.
pub struct PingExecutor;

impl StatusCommandExecutor for PingExecutor {
    fn execute(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Resolution target for unknown command type bytes; reports the failure
/// when driven so the connection stays usable afterwards.
pub struct UnsupportedCommandExecutor {
    type_byte: u8,
}

impl UnsupportedCommandExecutor {
    pub fn new(type_byte: u8) -> Self {
        Self { type_byte }
    }
}

impl StatusCommandExecutor for UnsupportedCommandExecutor {
    fn execute(&mut self) -> Result<()> {
        Err(ProxyError::UnsupportedCommand(self.type_byte))
    }
}

/// MySQL column type byte for a catalog column type.
pub fn column_type_byte(column_type: ColumnType) -> u8 {
    match column_type {
        ColumnType::Long => MYSQL_TYPE_LONGLONG,
        ColumnType::Int => MYSQL_TYPE_LONG,
        ColumnType::Str => MYSQL_TYPE_VAR_STRING,
    }
}
