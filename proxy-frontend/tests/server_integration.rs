// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! End-to-end tests over a real TCP socket: the test plays the client side
//! of the wire protocol against a running server.

use proxy_common::{ProxyError, Result};
use proxy_frontend::executor::{CommandExecutor, ExecutorFactory, QueryCommandExecutor};
use proxy_frontend::session::Session;
use proxy_frontend::{ProxyAuthenticator, ProxyServer};
use proxy_catalog::{ColumnMetaData, ColumnType};
use proxy_transport::command::CommandPacket;
use proxy_transport::constants::{
    CLIENT_CONNECT_WITH_DB, CLIENT_PROTOCOL_41, CLIENT_SECURE_CONNECTION, COM_PING, COM_QUERY,
    COM_QUIT, EOF_HEADER, ERR_HEADER, OK_HEADER, UTF8MB4_GENERAL_CI,
};
use proxy_transport::handshake::scramble_password;
use proxy_transport::packet::Packet;
use proxy_transport::payload::{PayloadReader, PayloadWriter};
use proxy_transport::resultset::TextRow;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Two-column, two-row in-memory table; keeps the test free of the disk
/// backend.
struct FixtureExecutor {
    columns: Vec<ColumnMetaData>,
    remaining: Vec<Vec<&'static str>>,
    current: Option<TextRow>,
}

impl FixtureExecutor {
    fn new() -> Self {
        Self {
            columns: vec![
                ColumnMetaData {
                    name: "order_id".to_string(),
                    column_type: ColumnType::Long,
                    column_index: 1,
                },
                ColumnMetaData {
                    name: "status".to_string(),
                    column_type: ColumnType::Str,
                    column_index: 2,
                },
            ],
            remaining: vec![vec!["2", "paid"], vec!["1", "init"]],
            current: None,
        }
    }
}

impl QueryCommandExecutor for FixtureExecutor {
    fn columns(&self) -> &[ColumnMetaData] {
        &self.columns
    }

    fn has_next(&self) -> bool {
        !self.remaining.is_empty()
    }

    fn next(&mut self) -> Result<()> {
        let row = self
            .remaining
            .pop()
            .ok_or_else(|| ProxyError::ExecutionError("past end".to_string()))?;
        self.current = Some(TextRow::new(
            row.into_iter().map(|c| Some(c.as_bytes().to_vec())).collect(),
        ));
        Ok(())
    }

    fn row_data(&self) -> TextRow {
        match &self.current {
            Some(row) => row.clone(),
            None => TextRow::new(Vec::new()),
        }
    }
}

struct FixtureFactory;

impl ExecutorFactory for FixtureFactory {
    fn create(&self, _session: &mut Session, command: &CommandPacket) -> Result<CommandExecutor> {
        match command {
            CommandPacket::Query { .. } => {
                Ok(CommandExecutor::Query(Box::new(FixtureExecutor::new())))
            }
            _ => Err(ProxyError::ExecutionError("not wired in this test".to_string())),
        }
    }
}

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let authenticator = Arc::new(ProxyAuthenticator::new(
        "root".to_string(),
        "secret".to_string(),
        "orders_db".to_string(),
    ));
    let server = ProxyServer::new(authenticator, Arc::new(FixtureFactory), addr.to_string());
    tokio::spawn(async move {
        if let Err(e) = server.serve(listener).await {
            eprintln!("server error: {e:?}");
        }
    });
    addr
}

async fn read_packet(stream: &mut TcpStream) -> Packet {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await.unwrap();
    let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    let sequence_id = header[3];
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();
    Packet::new(sequence_id, payload)
}

async fn write_packet(stream: &mut TcpStream, packet: &Packet) {
    let mut frame = Vec::with_capacity(4 + packet.payload.len());
    frame.extend_from_slice(&(packet.payload.len() as u32).to_le_bytes()[..3]);
    frame.push(packet.sequence_id);
    frame.extend_from_slice(&packet.payload);
    stream.write_all(&frame).await.unwrap();
    stream.flush().await.unwrap();
}

/// Pull the 20-byte nonce out of the server's initial handshake.
fn parse_nonce(handshake: &Packet) -> Vec<u8> {
    let mut reader = PayloadReader::new(&handshake.payload);
    let protocol = reader.read_int1().unwrap();
    assert_eq!(protocol, 10);
    reader.read_null_terminated().unwrap(); // server version
    reader.read_int4().unwrap(); // connection id
    let mut nonce = reader.read_fixed(8).unwrap();
    reader.skip(1).unwrap(); // filler
    reader.skip(2).unwrap(); // capabilities low
    reader.skip(1).unwrap(); // charset
    reader.skip(2).unwrap(); // status
    reader.skip(2).unwrap(); // capabilities high
    reader.skip(1).unwrap(); // auth data length
    reader.skip(10).unwrap(); // reserved
    let part2 = reader.read_null_terminated().unwrap();
    nonce.extend_from_slice(&part2);
    assert_eq!(nonce.len(), 20);
    nonce
}

fn login_packet(username: &str, scramble: &[u8], database: &str) -> Packet {
    let mut writer = PayloadWriter::new();
    writer.write_int4(CLIENT_PROTOCOL_41 | CLIENT_SECURE_CONNECTION | CLIENT_CONNECT_WITH_DB);
    writer.write_int4(0x0100_0000);
    writer.write_int1(UTF8MB4_GENERAL_CI);
    writer.write_zeroes(23);
    writer.write_null_terminated(username.as_bytes());
    writer.write_int1(scramble.len() as u8);
    writer.write_bytes(scramble);
    writer.write_null_terminated(database.as_bytes());
    Packet::new(1, writer.into_payload())
}

async fn connect_and_login(addr: SocketAddr, password: &str) -> (TcpStream, Packet) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let handshake = read_packet(&mut stream).await;
    assert_eq!(handshake.sequence_id, 0);
    let nonce = parse_nonce(&handshake);
    let scramble = scramble_password(password, &nonce);
    write_packet(&mut stream, &login_packet("root", &scramble, "orders_db")).await;
    let reply = read_packet(&mut stream).await;
    (stream, reply)
}

#[tokio::test]
async fn test_login_and_ping() {
    let addr = start_server().await;
    let (mut stream, reply) = connect_and_login(addr, "secret").await;
    assert_eq!(reply.header_byte(), Some(OK_HEADER));
    assert_eq!(reply.sequence_id, 2);

    write_packet(&mut stream, &Packet::new(0, vec![COM_PING])).await;
    let pong = read_packet(&mut stream).await;
    assert_eq!(pong.header_byte(), Some(OK_HEADER));
    assert_eq!(pong.sequence_id, 1);

    write_packet(&mut stream, &Packet::new(0, vec![COM_QUIT])).await;
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let addr = start_server().await;
    let (_stream, reply) = connect_and_login(addr, "wrong").await;
    assert_eq!(reply.header_byte(), Some(ERR_HEADER));
    let code = u16::from_le_bytes([reply.payload[1], reply.payload[2]]);
    assert_eq!(code, 1045);
}

#[tokio::test]
async fn test_malformed_login_err_follows_request_sequence() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let handshake = read_packet(&mut stream).await;
    assert_eq!(handshake.sequence_id, 0);

    // Pre-4.1 capability flags make the response undecodable.
    let mut writer = PayloadWriter::new();
    writer.write_int4(0);
    writer.write_null_terminated(b"root");
    write_packet(&mut stream, &Packet::new(1, writer.into_payload())).await;

    // The reply sits one past the failing request, not at a fixed seq.
    let reply = read_packet(&mut stream).await;
    assert_eq!(reply.header_byte(), Some(ERR_HEADER));
    assert_eq!(reply.sequence_id, 2);
}

#[tokio::test]
async fn test_query_result_stream_over_tcp() {
    let addr = start_server().await;
    let (mut stream, reply) = connect_and_login(addr, "secret").await;
    assert_eq!(reply.header_byte(), Some(OK_HEADER));

    let mut query = vec![COM_QUERY];
    query.extend_from_slice(b"SELECT * FROM t_order");
    write_packet(&mut stream, &Packet::new(0, query)).await;

    // field count
    let field_count = read_packet(&mut stream).await;
    assert_eq!(field_count.sequence_id, 1);
    assert_eq!(field_count.payload, vec![0x02]);
    // column definitions
    let col1 = read_packet(&mut stream).await;
    assert!(col1.payload.windows(8).any(|w| w == b"order_id"));
    let col2 = read_packet(&mut stream).await;
    assert!(col2.payload.windows(6).any(|w| w == b"status"));
    // first EOF
    let eof = read_packet(&mut stream).await;
    assert_eq!(eof.header_byte(), Some(EOF_HEADER));
    assert_eq!(eof.sequence_id, 4);
    // rows in order
    let row1 = read_packet(&mut stream).await;
    assert_eq!(row1.payload[1], b'1');
    let row2 = read_packet(&mut stream).await;
    assert_eq!(row2.payload[1], b'2');
    // trailing EOF: 2 rows + 4 header packets + 1
    let eof = read_packet(&mut stream).await;
    assert_eq!(eof.header_byte(), Some(EOF_HEADER));
    assert_eq!(eof.sequence_id, 7);

    write_packet(&mut stream, &Packet::new(0, vec![COM_QUIT])).await;
}
