// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Command execute engine
//!
//! Classifies each inbound command packet by its leading type byte, resolves
//! an executor and drives it to completion. Query results stream one packet
//! per row with an immediate flush; before producing each row the loop checks
//! connection liveness and awaits writability, so a slow client pauses
//! production instead of growing an unbounded buffer.
//!
//! Decode and execution errors are converted to wire ERR packets here and
//! nowhere deeper; only connection-fatal errors propagate.

use crate::channel::ClientChannel;
use crate::executor::{
    CommandExecutor, ExecutorFactory, PingExecutor, QueryCommandExecutor,
    UnsupportedCommandExecutor,
};
use crate::session::Session;
use proxy_common::Result;
use proxy_transport::command::CommandPacket;
use proxy_transport::error_code::err_packet_for;
use proxy_transport::packet::{OkPacket, Packet};
use proxy_transport::resultset::{ColumnDefinition41, FieldCountPacket};
use crate::executor::column_type_byte;
use std::sync::Arc;
use tracing::{debug, warn};

/// First reply sequence id of an exchange (the request carries 0).
const FIRST_REPLY_SEQ: u8 = 1;

/// What the connection loop should do after one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Back to Idle, accept the next command.
    Continue,
    /// Close the connection (COM_QUIT or a dead channel).
    Close,
}

pub struct CommandExecuteEngine {
    factory: Arc<dyn ExecutorFactory>,
}

impl CommandExecuteEngine {
    pub fn new(factory: Arc<dyn ExecutorFactory>) -> Self {
        Self { factory }
    }

    /// Run one command. Recoverable errors become a single ERR packet and
    /// the connection returns to Idle; connection-fatal errors propagate.
    pub async fn execute<C: ClientChannel>(
        &self,
        channel: &mut C,
        session: &mut Session,
        packet: &Packet,
    ) -> Result<CommandOutcome> {
        match self.run(channel, session, packet).await {
            Ok(outcome) => Ok(outcome),
            Err(cause) if cause.is_connection_fatal() => Err(cause),
            Err(cause) => {
                warn!(connection_id = session.connection_id, "command failed: {cause}");
                channel
                    .write_packet(&err_packet_for(&cause, FIRST_REPLY_SEQ))
                    .await?;
                channel.flush().await?;
                Ok(CommandOutcome::Continue)
            }
        }
    }

    async fn run<C: ClientChannel>(
        &self,
        channel: &mut C,
        session: &mut Session,
        packet: &Packet,
    ) -> Result<CommandOutcome> {
        let command = CommandPacket::from_packet(packet)?;
        debug!(connection_id = session.connection_id, ?command, "dispatch");

        let executor = self.resolve(session, &command)?;
        match executor {
            CommandExecutor::NoResponse => Ok(CommandOutcome::Close),
            CommandExecutor::Status(mut status) => {
                status.execute()?;
                channel
                    .write_packet(&OkPacket::default().to_packet(FIRST_REPLY_SEQ))
                    .await?;
                channel.flush().await?;
                Ok(CommandOutcome::Continue)
            }
            CommandExecutor::Query(mut query) => {
                self.write_query_data(channel, query.as_mut()).await?;
                if channel.is_active() {
                    Ok(CommandOutcome::Continue)
                } else {
                    Ok(CommandOutcome::Close)
                }
            }
        }
    }

    fn resolve(&self, session: &mut Session, command: &CommandPacket) -> Result<CommandExecutor> {
        match command {
            CommandPacket::Quit => Ok(CommandExecutor::NoResponse),
            CommandPacket::Ping => Ok(CommandExecutor::Status(Box::new(PingExecutor))),
            CommandPacket::Unsupported { type_byte } => Ok(CommandExecutor::Status(Box::new(
                UnsupportedCommandExecutor::new(*type_byte),
            ))),
            other => self.factory.create(session, other),
        }
    }

    /// Stream a query result: field count, column definitions, EOF, then one
    /// row packet at a time, then the trailing EOF whose sequence id is
    /// rowCount + headerPacketCount + 1.
    async fn write_query_data<C: ClientChannel>(
        &self,
        channel: &mut C,
        executor: &mut dyn QueryCommandExecutor,
    ) -> Result<()> {
        if !channel.is_active() {
            return Ok(());
        }

        let columns = executor.columns().to_vec();
        let mut seq: u8 = 1;
        channel
            .write_packet(
                &FieldCountPacket {
                    column_count: columns.len() as u64,
                }
                .to_packet(seq),
            )
            .await?;
        for column in &columns {
            seq = seq.wrapping_add(1);
            let definition =
                ColumnDefinition41::new(column.name.clone(), column_type_byte(column.column_type));
            channel.write_packet(&definition.to_packet(seq)).await?;
        }
        seq = seq.wrapping_add(1);
        channel.write_packet(&Packet::eof(seq)).await?;
        channel.flush().await?;
        let header_packets = columns.len() as u64 + 2;

        let mut row_count: u64 = 0;
        while executor.has_next() {
            // Back-pressure: pause until the channel drains; abort if the
            // connection died while paused.
            if !channel.is_active() {
                return Ok(());
            }
            channel.writable().await?;
            if !channel.is_active() {
                return Ok(());
            }
            executor.next()?;
            row_count += 1;
            let row_seq = (header_packets + row_count) as u8;
            channel
                .write_packet(&executor.row_data().to_packet(row_seq))
                .await?;
            channel.flush().await?;
        }

        let eof_seq = (row_count + header_packets + 1) as u8;
        channel.write_packet(&Packet::eof(eof_seq)).await?;
        channel.flush().await?;
        Ok(())
    }
}
