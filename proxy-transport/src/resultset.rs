// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Result-set packets
//!
//! A query response on the wire is: field-count packet, column definition
//! packets, EOF, row packets, EOF. Assembly of the full exchange lives in the
//! command execute engine so rows can stream one packet at a time; this
//! module only defines the individual packets.

use crate::constants::*;
use crate::packet::Packet;
use crate::payload::PayloadWriter;

/// Field-count packet opening a result set.
#[derive(Debug, Clone)]
pub struct FieldCountPacket {
    pub column_count: u64,
}

impl FieldCountPacket {
    pub fn to_packet(&self, sequence_id: u8) -> Packet {
        let mut writer = PayloadWriter::new();
        writer.write_lenenc_int(self.column_count);
        Packet::new(sequence_id, writer.into_payload())
    }
}

/// Column definition packet (Protocol 4.1).
#[derive(Debug, Clone)]
pub struct ColumnDefinition41 {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub character_set: u16,
    pub column_length: u32,
    pub column_type: u8,
    pub flags: u16,
    pub decimals: u8,
}

impl ColumnDefinition41 {
    pub fn new(name: String, column_type: u8) -> Self {
        Self {
            schema: String::new(),
            table: String::new(),
            name,
            character_set: 0x21,
            column_length: 255,
            column_type,
            flags: 0,
            decimals: 0,
        }
    }

    pub fn to_packet(&self, sequence_id: u8) -> Packet {
        let mut writer = PayloadWriter::new();
        writer.write_lenenc_string(b"def");
        writer.write_lenenc_string(self.schema.as_bytes());
        writer.write_lenenc_string(self.table.as_bytes());
        writer.write_lenenc_string(self.table.as_bytes()); // org_table
        writer.write_lenenc_string(self.name.as_bytes());
        writer.write_lenenc_string(self.name.as_bytes()); // org_name
        writer.write_lenenc_int(0x0C); // length of the fixed-length block
        writer.write_int2(self.character_set);
        writer.write_int4(self.column_length);
        writer.write_int1(self.column_type);
        writer.write_int2(self.flags);
        writer.write_int1(self.decimals);
        writer.write_int2(0x0000); // filler
        Packet::new(sequence_id, writer.into_payload())
    }
}

/// Text protocol row: one lenenc cell per column, NULL as 0xFB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRow {
    pub cells: Vec<Option<Vec<u8>>>,
}

impl TextRow {
    pub fn new(cells: Vec<Option<Vec<u8>>>) -> Self {
        Self { cells }
    }

    pub fn to_packet(&self, sequence_id: u8) -> Packet {
        let mut writer = PayloadWriter::new();
        for cell in &self.cells {
            match cell {
                Some(data) => writer.write_lenenc_string(data),
                None => writer.write_int1(NULL_CELL),
            }
        }
        Packet::new(sequence_id, writer.into_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadReader;

    #[test]
    fn test_field_count_packet() {
        let packet = FieldCountPacket { column_count: 3 }.to_packet(1);
        assert_eq!(packet.sequence_id, 1);
        assert_eq!(packet.payload, vec![0x03]);
    }

    #[test]
    fn test_column_definition_layout() {
        let mut column = ColumnDefinition41::new("order_id".to_string(), MYSQL_TYPE_LONGLONG);
        column.schema = "orders_db".to_string();
        column.table = "t_order".to_string();
        let packet = column.to_packet(2);

        let mut reader = PayloadReader::new(&packet.payload);
        assert_eq!(reader.read_lenenc_string().unwrap(), b"def");
        assert_eq!(reader.read_lenenc_string().unwrap(), b"orders_db");
        assert_eq!(reader.read_lenenc_string().unwrap(), b"t_order");
        assert_eq!(reader.read_lenenc_string().unwrap(), b"t_order");
        assert_eq!(reader.read_lenenc_string().unwrap(), b"order_id");
        assert_eq!(reader.read_lenenc_string().unwrap(), b"order_id");
        assert_eq!(reader.read_lenenc_int().unwrap(), 0x0C);
        assert_eq!(reader.read_int2().unwrap(), 0x21);
        assert_eq!(reader.read_int4().unwrap(), 255);
        assert_eq!(reader.read_int1().unwrap(), MYSQL_TYPE_LONGLONG);
        assert_eq!(reader.read_int2().unwrap(), 0);
        assert_eq!(reader.read_int1().unwrap(), 0);
        assert_eq!(reader.read_int2().unwrap(), 0);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_text_row_with_null_cell() {
        let row = TextRow::new(vec![
            Some(b"1".to_vec()),
            None,
            Some(b"init".to_vec()),
        ]);
        let packet = row.to_packet(5);
        assert_eq!(packet.sequence_id, 5);
        assert_eq!(
            packet.payload,
            vec![0x01, b'1', NULL_CELL, 0x04, b'i', b'n', b'i', b't']
        );
    }
}
