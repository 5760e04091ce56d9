// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Handshake packets
//!
//! The connection phase of the protocol:
//! 1. Server sends the initial handshake (v10)
//! 2. Client answers with HandshakeResponse41
//! 3. Server answers OK or ERR

use crate::constants::*;
use crate::packet::Packet;
use crate::payload::{PayloadReader, PayloadWriter};
use proxy_common::{ProxyError, Result};
use rand::Rng;
use sha1::{Digest, Sha1};

/// Initial handshake packet sent by the server.
#[derive(Debug, Clone)]
pub struct HandshakePacket {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    /// 20-byte nonce for mysql_native_password.
    pub auth_plugin_data: Vec<u8>,
    pub capability_flags: u32,
    pub character_set: u8,
    pub status_flags: u16,
    pub auth_plugin_name: String,
}

impl HandshakePacket {
    /// New handshake with a fresh random nonce. Nonce bytes stay in
    /// 1..=255: part 2 goes on the wire null-terminated, so an interior
    /// zero would truncate the nonce the client recovers.
    pub fn new(connection_id: u32) -> Self {
        let mut rng = rand::rng();
        let auth_plugin_data: Vec<u8> = (0..20).map(|_| rng.random_range(1..=255u8)).collect();

        Self {
            protocol_version: PROTOCOL_VERSION,
            server_version: SERVER_VERSION.to_string(),
            connection_id,
            auth_plugin_data,
            capability_flags: DEFAULT_CAPABILITY_FLAGS,
            character_set: UTF8MB4_GENERAL_CI,
            status_flags: SERVER_STATUS_AUTOCOMMIT,
            auth_plugin_name: "mysql_native_password".to_string(),
        }
    }

    pub fn to_packet(&self, sequence_id: u8) -> Packet {
        let mut writer = PayloadWriter::new();
        writer.write_int1(self.protocol_version);
        writer.write_null_terminated(self.server_version.as_bytes());
        writer.write_int4(self.connection_id);
        // Auth plugin data part 1 (8 bytes) + filler.
        writer.write_bytes(&self.auth_plugin_data[0..8]);
        writer.write_int1(0x00);
        writer.write_int2((self.capability_flags & 0xFFFF) as u16);
        writer.write_int1(self.character_set);
        writer.write_int2(self.status_flags);
        writer.write_int2((self.capability_flags >> 16) as u16);
        writer.write_int1(self.auth_plugin_data.len() as u8);
        writer.write_zeroes(10);
        // Auth plugin data part 2, null-terminated.
        writer.write_null_terminated(&self.auth_plugin_data[8..]);
        writer.write_null_terminated(self.auth_plugin_name.as_bytes());
        Packet::new(sequence_id, writer.into_payload())
    }
}

/// Client handshake response (Protocol 4.1).
#[derive(Debug, Clone)]
pub struct HandshakeResponse41 {
    pub sequence_id: u8,
    pub capability_flags: u32,
    pub max_packet_size: u32,
    pub character_set: u8,
    pub username: String,
    pub auth_response: Vec<u8>,
    pub database: Option<String>,
    pub auth_plugin_name: Option<String>,
}

impl HandshakeResponse41 {
    pub fn from_packet(packet: &Packet) -> Result<Self> {
        let mut reader = PayloadReader::new(&packet.payload);

        let capability_flags = reader.read_int4()?;
        if capability_flags & CLIENT_PROTOCOL_41 == 0 {
            return Err(ProxyError::ProtocolError(
                "client does not speak protocol 4.1".to_string(),
            ));
        }
        let max_packet_size = reader.read_int4()?;
        let character_set = reader.read_int1()?;
        reader.skip(23)?;

        let username_bytes = reader.read_null_terminated()?;
        let username = String::from_utf8_lossy(&username_bytes).to_string();

        let auth_response = if capability_flags & CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
            reader.read_lenenc_string()?
        } else if capability_flags & CLIENT_SECURE_CONNECTION != 0 {
            let len = reader.read_int1()? as usize;
            reader.read_fixed(len)?
        } else {
            reader.read_null_terminated()?
        };

        let database = if capability_flags & CLIENT_CONNECT_WITH_DB != 0 {
            let bytes = reader.read_null_terminated()?;
            if bytes.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&bytes).to_string())
            }
        } else {
            None
        };

        let auth_plugin_name = if capability_flags & CLIENT_PLUGIN_AUTH != 0
            && reader.remaining() > 0
        {
            let bytes = reader.read_null_terminated()?;
            if bytes.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&bytes).to_string())
            }
        } else {
            None
        };

        Ok(Self {
            sequence_id: packet.sequence_id,
            capability_flags,
            max_packet_size,
            character_set,
            username,
            auth_response,
            database,
            auth_plugin_name,
        })
    }
}

/// mysql_native_password check:
/// SHA1(password) XOR SHA1(nonce + SHA1(SHA1(password))) == auth_response.
pub fn verify_native_password(
    password: &str,
    auth_response: &[u8],
    auth_plugin_data: &[u8],
) -> bool {
    if password.is_empty() {
        return auth_response.is_empty();
    }

    let mut hasher = Sha1::new();
    hasher.update(password.as_bytes());
    let sha1_pass = hasher.finalize();

    let mut hasher = Sha1::new();
    hasher.update(sha1_pass);
    let sha1_sha1_pass = hasher.finalize();

    let mut hasher = Sha1::new();
    hasher.update(auth_plugin_data);
    hasher.update(sha1_sha1_pass);
    let hash = hasher.finalize();

    let expected: Vec<u8> = sha1_pass
        .iter()
        .zip(hash.iter())
        .map(|(a, b)| a ^ b)
        .collect();

    expected == auth_response
}

/// Compute the scramble a well-behaved client would send. Test helper for
/// driving the server side of the exchange.
pub fn scramble_password(password: &str, auth_plugin_data: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let mut hasher = Sha1::new();
    hasher.update(password.as_bytes());
    let sha1_pass = hasher.finalize();

    let mut hasher = Sha1::new();
    hasher.update(sha1_pass);
    let sha1_sha1_pass = hasher.finalize();

    let mut hasher = Sha1::new();
    hasher.update(auth_plugin_data);
    hasher.update(sha1_sha1_pass);
    let hash = hasher.finalize();

    sha1_pass
        .iter()
        .zip(hash.iter())
        .map(|(a, b)| a ^ b)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a HandshakeResponse41 payload the way a 4.1 client would.
    pub fn client_response_payload(
        username: &str,
        auth_response: &[u8],
        database: Option<&str>,
    ) -> Vec<u8> {
        let mut writer = PayloadWriter::new();
        let mut caps = CLIENT_PROTOCOL_41 | CLIENT_SECURE_CONNECTION;
        if database.is_some() {
            caps |= CLIENT_CONNECT_WITH_DB;
        }
        writer.write_int4(caps);
        writer.write_int4(0x0100_0000);
        writer.write_int1(UTF8MB4_GENERAL_CI);
        writer.write_zeroes(23);
        writer.write_null_terminated(username.as_bytes());
        writer.write_int1(auth_response.len() as u8);
        writer.write_bytes(auth_response);
        if let Some(db) = database {
            writer.write_null_terminated(db.as_bytes());
        }
        writer.into_payload()
    }

    #[test]
    fn test_handshake_packet_layout() {
        let handshake = HandshakePacket::new(42);
        let packet = handshake.to_packet(0);

        assert_eq!(packet.sequence_id, 0);
        assert_eq!(packet.payload[0], PROTOCOL_VERSION);

        let mut reader = PayloadReader::new(&packet.payload);
        assert_eq!(reader.read_int1().unwrap(), PROTOCOL_VERSION);
        assert_eq!(
            reader.read_null_terminated().unwrap(),
            SERVER_VERSION.as_bytes()
        );
        assert_eq!(reader.read_int4().unwrap(), 42);
        let part1 = reader.read_fixed(8).unwrap();
        assert_eq!(reader.read_int1().unwrap(), 0x00);
        assert_eq!(
            reader.read_int2().unwrap() as u32,
            DEFAULT_CAPABILITY_FLAGS & 0xFFFF
        );
        assert_eq!(reader.read_int1().unwrap(), UTF8MB4_GENERAL_CI);
        assert_eq!(reader.read_int2().unwrap(), SERVER_STATUS_AUTOCOMMIT);
        assert_eq!(
            reader.read_int2().unwrap() as u32,
            DEFAULT_CAPABILITY_FLAGS >> 16
        );
        assert_eq!(reader.read_int1().unwrap(), 20);
        reader.skip(10).unwrap();
        let part2 = reader.read_null_terminated().unwrap();
        assert_eq!([&part1[..], &part2[..]].concat(), handshake.auth_plugin_data);
        assert_eq!(
            reader.read_null_terminated().unwrap(),
            b"mysql_native_password"
        );
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_nonce_is_fresh_per_connection() {
        let first = HandshakePacket::new(1);
        let second = HandshakePacket::new(2);
        assert_eq!(first.auth_plugin_data.len(), 20);
        assert_ne!(first.auth_plugin_data, second.auth_plugin_data);
    }

    #[test]
    fn test_nonce_survives_null_terminated_serialization() {
        // Part 2 of the nonce is a null-terminated field; a zero byte inside
        // it would hand the client a short nonce and fail an otherwise valid
        // login, so nonce bytes must never be zero.
        for connection_id in 0..2000 {
            let handshake = HandshakePacket::new(connection_id);
            assert!(
                !handshake.auth_plugin_data.contains(&0),
                "nonce contains a zero byte: {:?}",
                handshake.auth_plugin_data
            );

            let packet = handshake.to_packet(0);
            let mut reader = PayloadReader::new(&packet.payload);
            reader.read_int1().unwrap();
            reader.read_null_terminated().unwrap();
            reader.read_int4().unwrap();
            let part1 = reader.read_fixed(8).unwrap();
            reader.skip(1 + 2 + 1 + 2 + 2 + 1 + 10).unwrap();
            let part2 = reader.read_null_terminated().unwrap();
            assert_eq!(part2.len(), 12);
            assert_eq!(
                [&part1[..], &part2[..]].concat(),
                handshake.auth_plugin_data
            );

            // A client scrambling the recovered nonce must pass the check
            // against the nonce the server kept.
            let recovered = [&part1[..], &part2[..]].concat();
            assert!(verify_native_password(
                "secret",
                &scramble_password("secret", &recovered),
                &handshake.auth_plugin_data
            ));
        }
    }

    #[test]
    fn test_response_parsing() {
        let payload = client_response_payload("root", &[7u8; 20], Some("orders_db"));
        let packet = Packet::new(1, payload);
        let response = HandshakeResponse41::from_packet(&packet).unwrap();

        assert_eq!(response.sequence_id, 1);
        assert_eq!(response.username, "root");
        assert_eq!(response.auth_response, vec![7u8; 20]);
        assert_eq!(response.database.as_deref(), Some("orders_db"));
    }

    #[test]
    fn test_response_without_database() {
        let payload = client_response_payload("app", &[], None);
        let response =
            HandshakeResponse41::from_packet(&Packet::new(1, payload)).unwrap();
        assert!(response.database.is_none());
        assert!(response.auth_response.is_empty());
    }

    #[test]
    fn test_pre41_client_rejected() {
        let mut writer = PayloadWriter::new();
        writer.write_int4(0); // no CLIENT_PROTOCOL_41
        writer.write_int4(0);
        let packet = Packet::new(1, writer.into_payload());
        assert!(HandshakeResponse41::from_packet(&packet).is_err());
    }

    #[test]
    fn test_truncated_response_is_decode_error() {
        let packet = Packet::new(1, vec![0x00, 0x02]);
        assert!(HandshakeResponse41::from_packet(&packet).is_err());
    }

    #[test]
    fn test_native_password_roundtrip() {
        let nonce = [3u8; 20];
        let scramble = scramble_password("secret", &nonce);
        assert!(verify_native_password("secret", &scramble, &nonce));
        assert!(!verify_native_password("wrong", &scramble, &nonce));
    }

    #[test]
    fn test_native_password_empty() {
        let nonce = [0u8; 20];
        assert!(verify_native_password("", &[], &nonce));
        assert!(!verify_native_password("", &[1, 2, 3], &nonce));
        assert!(!verify_native_password("secret", &[], &nonce));
    }
}
