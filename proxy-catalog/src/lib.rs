// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Logic schema backed by a directory of CSV files
//!
//! Each `<table>.csv` file contributes one table; the header row declares
//! columns as `name:type` with types long/int/string. The schema is loaded
//! once at startup and read-only afterwards, so concurrent readers share it
//! via `Arc` without locking.

pub mod reader;
pub mod schema;

pub use reader::CsvRowReader;
pub use schema::{ColumnMetaData, ColumnType, LogicSchema};
