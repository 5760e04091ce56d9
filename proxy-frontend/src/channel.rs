// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Client channel abstraction
//!
//! The engines write packets through [`ClientChannel`] instead of a socket so
//! the streaming contract (liveness check, writability back-pressure, packet
//! order) can be driven by a fake channel in tests. [`TcpChannel`] is the
//! production implementation over a tokio `TcpStream`.

use bytes::BytesMut;
use proxy_common::{ProxyError, Result};
use proxy_transport::{Packet, PacketCodec};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Write side of one client connection as the engines see it.
#[allow(async_fn_in_trait)]
pub trait ClientChannel {
    /// Whether the connection is still live. Checked before every streamed
    /// row; a dead channel aborts the production loop.
    fn is_active(&self) -> bool;

    /// Client host address for error messages: the remote IP, or the
    /// address's string form when it is not IP-based.
    fn remote_host(&self) -> String;

    /// Back-pressure gate: completes once the channel can accept more bytes.
    /// The streaming loop awaits this before producing each row.
    async fn writable(&mut self) -> Result<()>;

    /// Frame and buffer one packet.
    async fn write_packet(&mut self, packet: &Packet) -> Result<()>;

    /// Push buffered bytes to the peer.
    async fn flush(&mut self) -> Result<()>;
}

/// Production channel over a TCP socket, with the connection's read buffer
/// and framing codec.
pub struct TcpChannel {
    stream: TcpStream,
    codec: PacketCodec,
    read_buf: BytesMut,
    remote: SocketAddr,
    active: bool,
}

impl TcpChannel {
    pub fn new(stream: TcpStream) -> Result<Self> {
        let remote = stream.peer_addr()?;
        Ok(Self {
            stream,
            codec: PacketCodec::new(),
            read_buf: BytesMut::with_capacity(8192),
            remote,
            active: true,
        })
    }

    /// Read the next complete packet. `None` means the peer closed cleanly.
    pub async fn read_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            if let Some(packet) = self.codec.decode(&mut self.read_buf)? {
                return Ok(Some(packet));
            }
            // Suspension point: wait for more bytes.
            let n = match self.stream.read_buf(&mut self.read_buf).await {
                Ok(n) => n,
                Err(e) => {
                    self.active = false;
                    return Err(e.into());
                }
            };
            if n == 0 {
                self.active = false;
                if self.read_buf.is_empty() {
                    return Ok(None);
                }
                return Err(ProxyError::ProtocolError(
                    "connection closed mid-packet".to_string(),
                ));
            }
        }
    }

    pub fn close(&mut self) {
        self.active = false;
    }
}

impl ClientChannel for TcpChannel {
    fn is_active(&self) -> bool {
        self.active
    }

    fn remote_host(&self) -> String {
        self.remote.ip().to_string()
    }

    async fn writable(&mut self) -> Result<()> {
        if let Err(e) = self.stream.writable().await {
            self.active = false;
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        let mut framed = BytesMut::new();
        PacketCodec::encode_packet(packet, &mut framed);
        debug!(seq = packet.sequence_id, len = packet.payload.len(), "write packet");
        if let Err(e) = self.stream.write_all(&framed).await {
            self.active = false;
            return Err(e.into());
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if let Err(e) = self.stream.flush().await {
            self.active = false;
            return Err(e.into());
        }
        Ok(())
    }
}
