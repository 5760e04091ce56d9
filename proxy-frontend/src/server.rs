// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! TCP server loop
//!
//! Accepts client connections and runs one protocol handler per connection:
//! handshake, authentication exchange, then the command loop. Each handler
//! owns its socket; the id generator is the only state shared across
//! connections besides the read-only executor factory and authenticator.

use crate::auth::{AuthenticationEngine, Authenticator};
use crate::channel::{ClientChannel, TcpChannel};
use crate::command::{CommandExecuteEngine, CommandOutcome};
use crate::executor::ExecutorFactory;
use crate::session::{ConnectionIdGenerator, Session};
use proxy_common::{ProxyError, Result};
use proxy_transport::error_code::err_packet_for;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

pub struct ProxyServer {
    authenticator: Arc<dyn Authenticator>,
    factory: Arc<dyn ExecutorFactory>,
    id_generator: ConnectionIdGenerator,
    bind_addr: String,
}

impl ProxyServer {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        factory: Arc<dyn ExecutorFactory>,
        bind_addr: String,
    ) -> Self {
        Self {
            authenticator,
            factory,
            id_generator: ConnectionIdGenerator::new(),
            bind_addr,
        }
    }

    /// Bind and serve until the task is cancelled.
    pub async fn start(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!(addr = %self.bind_addr, "proxy listening");
        self.serve(listener).await
    }

    /// Accept loop over an already-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (socket, peer) = listener.accept().await?;
            let connection_id = self.id_generator.next_id();
            let authenticator = self.authenticator.clone();
            let factory = self.factory.clone();

            debug!(connection_id, peer = %peer, "connection accepted");
            tokio::spawn(async move {
                if let Err(e) = handle_connection(socket, connection_id, authenticator, factory).await
                {
                    warn!(connection_id, "connection ended with error: {e}");
                }
            });
        }
    }
}

async fn handle_connection(
    socket: TcpStream,
    connection_id: u32,
    authenticator: Arc<dyn Authenticator>,
    factory: Arc<dyn ExecutorFactory>,
) -> Result<()> {
    let mut channel = TcpChannel::new(socket)?;
    let mut session = Session::new(connection_id);

    // Sequence id for a best-effort ERR: one past the request that failed.
    let mut reply_seq: u8 = 1;
    if let Err(e) =
        run_connection(&mut channel, &mut session, authenticator, factory, &mut reply_seq).await
    {
        // Best effort: tell the client why before closing. A transport
        // failure gets no farewell.
        if !matches!(e, ProxyError::IoError(_)) && channel.is_active() {
            let err = err_packet_for(&e, reply_seq);
            if let Err(write_err) = channel.write_packet(&err).await {
                debug!(connection_id, "error reply not delivered: {write_err}");
            } else if let Err(flush_err) = channel.flush().await {
                debug!(connection_id, "error reply not flushed: {flush_err}");
            }
        }
        channel.close();
        return Err(e);
    }

    channel.close();
    info!(connection_id, "connection closed");
    Ok(())
}

async fn run_connection(
    channel: &mut TcpChannel,
    session: &mut Session,
    authenticator: Arc<dyn Authenticator>,
    factory: Arc<dyn ExecutorFactory>,
    reply_seq: &mut u8,
) -> Result<()> {
    let mut auth_engine = AuthenticationEngine::new();

    let handshake = auth_engine.handshake(session);
    channel.write_packet(&handshake).await?;
    channel.flush().await?;

    let response = match channel.read_packet().await? {
        Some(packet) => {
            *reply_seq = packet.sequence_id.wrapping_add(1);
            packet
        }
        None => {
            debug!(
                connection_id = session.connection_id,
                "client left before handshake response"
            );
            return Ok(());
        }
    };

    let client_host = channel.remote_host();
    let (reply, authenticated) =
        auth_engine.auth(session, authenticator.as_ref(), &response, &client_host)?;
    channel.write_packet(&reply).await?;
    channel.flush().await?;
    if !authenticated {
        return Ok(());
    }

    let command_engine = CommandExecuteEngine::new(factory);
    loop {
        let command = match channel.read_packet().await {
            Ok(Some(packet)) => {
                *reply_seq = packet.sequence_id.wrapping_add(1);
                packet
            }
            Ok(None) => {
                debug!(connection_id = session.connection_id, "client disconnected");
                return Ok(());
            }
            Err(e) => {
                error!(
                    connection_id = session.connection_id,
                    "read failed: {e}"
                );
                return Err(e);
            }
        };

        match command_engine.execute(channel, session, &command).await? {
            CommandOutcome::Continue => {}
            CommandOutcome::Close => return Ok(()),
        }
    }
}
