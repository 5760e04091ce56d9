// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! MySQL wire protocol for the proxy frontend
//!
//! This crate implements the transport half of the protocol engine:
//! - Packet payload codec (fixed/length-encoded integers and strings)
//! - Packet framing with multi-packet (>16MB) reassembly
//! - Typed packet catalog (handshake, OK/ERR/EOF, commands, result sets)
//! - Vendor error-code table

pub mod codec;
pub mod command;
pub mod constants;
pub mod error_code;
pub mod handshake;
pub mod packet;
pub mod payload;
pub mod resultset;

pub use codec::PacketCodec;
pub use command::{CommandPacket, CommandPacketType};
pub use handshake::{verify_native_password, HandshakePacket, HandshakeResponse41};
pub use packet::Packet;
pub use payload::{PayloadReader, PayloadWriter};
