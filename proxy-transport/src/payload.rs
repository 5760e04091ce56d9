// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Packet payload codec
//!
//! Typed read/write operations over the primitive wire types used by the
//! MySQL protocol: little-endian fixed-width integers of 1/2/3/4/8 bytes,
//! length-encoded integers and strings, null-terminated strings and raw
//! byte runs. A reader is positioned over exactly one packet payload; it
//! never buffers across packet boundaries.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use proxy_common::{ProxyError, Result};
use std::io::{Cursor, Read};

/// First byte of a length-encoded integer marking a 2-byte value.
const LENENC_2: u8 = 0xFC;
/// First byte of a length-encoded integer marking a 3-byte value.
const LENENC_3: u8 = 0xFD;
/// First byte of a length-encoded integer marking an 8-byte value.
const LENENC_8: u8 = 0xFE;
/// NULL sentinel in length-encoded-string position.
const LENENC_NULL: u8 = 0xFB;
/// Error sentinel in length-encoded-string position.
const LENENC_ERR: u8 = 0xFF;

fn truncated(what: &str) -> ProxyError {
    ProxyError::ProtocolError(format!("truncated payload reading {what}"))
}

/// Reader positioned over a single packet payload.
pub struct PayloadReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> PayloadReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(payload),
        }
    }

    /// Bytes left unread in this payload.
    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len() - self.cursor.position() as usize
    }

    pub fn read_int1(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| truncated("int<1>"))
    }

    pub fn read_int2(&mut self) -> Result<u16> {
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| truncated("int<2>"))
    }

    pub fn read_int3(&mut self) -> Result<u32> {
        self.cursor
            .read_u24::<LittleEndian>()
            .map_err(|_| truncated("int<3>"))
    }

    pub fn read_int4(&mut self) -> Result<u32> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| truncated("int<4>"))
    }

    pub fn read_int8(&mut self) -> Result<u64> {
        self.cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| truncated("int<8>"))
    }

    /// Length-encoded integer, all four widths.
    pub fn read_lenenc_int(&mut self) -> Result<u64> {
        let first = self.read_int1()?;
        match first {
            0..=0xFA => Ok(first as u64),
            LENENC_2 => Ok(self.read_int2()? as u64),
            LENENC_3 => Ok(self.read_int3()? as u64),
            LENENC_8 => self.read_int8(),
            _ => Err(ProxyError::ProtocolError(format!(
                "invalid length-encoded integer prefix 0x{first:02X}"
            ))),
        }
    }

    /// Length-encoded string; fails on the NULL/error sentinels.
    pub fn read_lenenc_string(&mut self) -> Result<Vec<u8>> {
        let len = self.read_lenenc_int()?;
        self.read_fixed(len as usize)
    }

    /// Length-encoded string position that may hold the 0xFB NULL sentinel.
    pub fn read_lenenc_string_nullable(&mut self) -> Result<Option<Vec<u8>>> {
        let first = self.peek()?;
        match first {
            LENENC_NULL => {
                self.read_int1()?;
                Ok(None)
            }
            LENENC_ERR => Err(ProxyError::ProtocolError(
                "error sentinel in length-encoded string".to_string(),
            )),
            _ => self.read_lenenc_string().map(Some),
        }
    }

    /// Bytes until (and consuming) the 0x00 terminator.
    pub fn read_null_terminated(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let byte = self.read_int1()?;
            if byte == 0x00 {
                return Ok(out);
            }
            out.push(byte);
        }
    }

    /// Exactly `len` bytes.
    pub fn read_fixed(&mut self, len: usize) -> Result<Vec<u8>> {
        if self.remaining() < len {
            return Err(truncated("fixed-length bytes"));
        }
        let mut buf = vec![0u8; len];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|_| truncated("fixed-length bytes"))?;
        Ok(buf)
    }

    /// All bytes left in the payload.
    pub fn read_rest(&mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        // Reading to the end of an in-memory cursor cannot fail.
        let _ = self.cursor.read_to_end(&mut buf);
        buf
    }

    /// Discard `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_fixed(len).map(|_| ())
    }

    fn peek(&self) -> Result<u8> {
        let pos = self.cursor.position() as usize;
        self.cursor
            .get_ref()
            .get(pos)
            .copied()
            .ok_or_else(|| truncated("byte"))
    }
}

/// Writer assembling a single packet payload.
#[derive(Default)]
pub struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_int1(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_int2(&mut self, value: u16) {
        // Writes into a Vec cannot fail.
        self.buf.write_u16::<LittleEndian>(value).unwrap();
    }

    pub fn write_int3(&mut self, value: u32) {
        self.buf.write_u24::<LittleEndian>(value).unwrap();
    }

    pub fn write_int4(&mut self, value: u32) {
        self.buf.write_u32::<LittleEndian>(value).unwrap();
    }

    pub fn write_int8(&mut self, value: u64) {
        self.buf.write_u64::<LittleEndian>(value).unwrap();
    }

    /// Length-encoded integer in its minimal form.
    pub fn write_lenenc_int(&mut self, value: u64) {
        if value < 0xFB {
            self.write_int1(value as u8);
        } else if value < 0x1_0000 {
            self.write_int1(LENENC_2);
            self.write_int2(value as u16);
        } else if value < 0x100_0000 {
            self.write_int1(LENENC_3);
            self.write_int3(value as u32);
        } else {
            self.write_int1(LENENC_8);
            self.write_int8(value);
        }
    }

    pub fn write_lenenc_string(&mut self, value: &[u8]) {
        self.write_lenenc_int(value.len() as u64);
        self.buf.extend_from_slice(value);
    }

    pub fn write_null_terminated(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(value);
        self.buf.push(0x00);
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(value);
    }

    pub fn write_zeroes(&mut self, len: usize) {
        self.buf.resize(self.buf.len() + len, 0x00);
    }
}
