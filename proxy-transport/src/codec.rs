// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Packet framing layer
//!
//! Splits a raw byte stream into protocol packets using the 3-byte length +
//! 1-byte sequence-id header, reassembling multi-packet (>16MB-1) logical
//! payloads, and fragments outgoing payloads back into framed packets.

use crate::packet::Packet;
use bytes::{Buf, BufMut, BytesMut};
use proxy_common::{ProxyError, Result};

/// Largest payload a single frame can carry (16MB - 1).
pub const MAX_PAYLOAD_LEN: usize = 0xFF_FFFF;

/// Frame header size: 3-byte length + 1-byte sequence id.
pub const HEADER_LEN: usize = 4;

/// In-flight reassembly of a logical payload spanning several frames.
struct Pending {
    payload: Vec<u8>,
    first_seq: u8,
    next_seq: u8,
}

/// Stateful framing codec for one connection.
///
/// `decode` is fed the connection's read buffer and yields at most one packet
/// per call; `Ok(None)` means more bytes are needed (the read-side suspension
/// point). Encoding is stateless.
#[derive(Default)]
pub struct PacketCodec {
    pending: Option<Pending>,
}

impl PacketCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to extract one complete logical packet from `buf`.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Packet>> {
        loop {
            if buf.len() < HEADER_LEN {
                return Ok(None);
            }
            let payload_len =
                u32::from_le_bytes([buf[0], buf[1], buf[2], 0]) as usize;
            if buf.len() < HEADER_LEN + payload_len {
                return Ok(None);
            }
            let sequence_id = buf[3];
            buf.advance(HEADER_LEN);
            let frame = buf.split_to(payload_len);

            if let Some(mut pending) = self.pending.take() {
                if sequence_id != pending.next_seq {
                    return Err(ProxyError::ProtocolError(format!(
                        "fragment sequence gap: expected {}, got {sequence_id}",
                        pending.next_seq
                    )));
                }
                pending.payload.extend_from_slice(&frame);
                pending.next_seq = pending.next_seq.wrapping_add(1);
                if payload_len == MAX_PAYLOAD_LEN {
                    self.pending = Some(pending);
                    continue;
                }
                return Ok(Some(Packet::new(pending.first_seq, pending.payload)));
            }

            if payload_len == MAX_PAYLOAD_LEN {
                // Non-terminal fragment of a >16MB logical payload.
                self.pending = Some(Pending {
                    payload: frame.to_vec(),
                    first_seq: sequence_id,
                    next_seq: sequence_id.wrapping_add(1),
                });
                continue;
            }

            return Ok(Some(Packet::new(sequence_id, frame.to_vec())));
        }
    }

    /// Frame `payload` into `dst` starting at `start_seq`, fragmenting as
    /// needed. A final fragment of exactly MAX_PAYLOAD_LEN bytes is followed
    /// by a zero-length terminator frame. Returns the next free sequence id.
    pub fn encode(payload: &[u8], start_seq: u8, dst: &mut BytesMut) -> u8 {
        let mut seq = start_seq;
        let mut chunks = payload.chunks(MAX_PAYLOAD_LEN).peekable();
        // An empty payload still produces one zero-length frame.
        if chunks.peek().is_none() {
            Self::write_frame(&[], seq, dst);
            return seq.wrapping_add(1);
        }
        let mut last_len = 0;
        while let Some(chunk) = chunks.next() {
            Self::write_frame(chunk, seq, dst);
            seq = seq.wrapping_add(1);
            last_len = chunk.len();
        }
        if last_len == MAX_PAYLOAD_LEN {
            Self::write_frame(&[], seq, dst);
            seq = seq.wrapping_add(1);
        }
        seq
    }

    /// Frame a whole packet, carrying its own sequence id.
    pub fn encode_packet(packet: &Packet, dst: &mut BytesMut) -> u8 {
        Self::encode(&packet.payload, packet.sequence_id, dst)
    }

    fn write_frame(chunk: &[u8], seq: u8, dst: &mut BytesMut) {
        let len = (chunk.len() as u32).to_le_bytes();
        dst.put_slice(&len[0..3]);
        dst.put_u8(seq);
        dst.put_slice(chunk);
    }
}
