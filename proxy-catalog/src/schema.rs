// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Table metadata loaded from CSV headers

use crate::reader::CsvRowReader;
use proxy_common::{ProxyError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Field types a CSV header may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Long,
    Int,
    Str,
}

impl ColumnType {
    fn of(simple_name: &str) -> Result<Self> {
        match simple_name {
            "long" => Ok(Self::Long),
            "int" => Ok(Self::Int),
            "string" => Ok(Self::Str),
            other => Err(ProxyError::SchemaError(format!(
                "unknown csv field type '{other}'"
            ))),
        }
    }
}

/// One column of a table, in declaration order.
#[derive(Debug, Clone)]
pub struct ColumnMetaData {
    pub name: String,
    pub column_type: ColumnType,
    /// 1-based position within the table.
    pub column_index: usize,
}

/// Read-only table catalog for one logic schema.
#[derive(Debug)]
pub struct LogicSchema {
    schema_name: String,
    metadata: HashMap<String, Vec<ColumnMetaData>>,
    repository: HashMap<String, PathBuf>,
}

impl LogicSchema {
    /// Load every `*.csv` file under `data_dir`. The file stem names the
    /// table; the header row declares its columns.
    pub fn load(data_dir: &Path, schema_name: &str) -> Result<Self> {
        let mut metadata = HashMap::new();
        let mut repository = HashMap::new();

        for entry in fs::read_dir(data_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let table_name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| {
                    ProxyError::SchemaError(format!("bad csv file name: {}", path.display()))
                })?
                .to_string();

            let mut reader = CsvRowReader::open(&path)?;
            let header = reader.next_row()?.ok_or_else(|| {
                ProxyError::SchemaError(format!("empty csv file: {}", path.display()))
            })?;
            let columns = Self::parse_header(&table_name, &header)?;
            info!(table = %table_name, columns = columns.len(), "loaded table metadata");

            metadata.insert(table_name.clone(), columns);
            repository.insert(table_name, path);
        }

        Ok(Self {
            schema_name: schema_name.to_string(),
            metadata,
            repository,
        })
    }

    fn parse_header(table_name: &str, header: &[String]) -> Result<Vec<ColumnMetaData>> {
        let mut columns = Vec::with_capacity(header.len());
        for (index, cell) in header.iter().enumerate() {
            let (name, type_name) = cell.split_once(':').ok_or_else(|| {
                ProxyError::SchemaError(format!(
                    "csv header of '{table_name}' must be name:type, got '{cell}'"
                ))
            })?;
            columns.push(ColumnMetaData {
                name: name.to_string(),
                column_type: ColumnType::of(type_name)?,
                column_index: index + 1,
            });
        }
        Ok(columns)
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.metadata.keys().map(|s| s.as_str())
    }

    /// Ordered column metadata for a table.
    pub fn columns(&self, table_name: &str) -> Option<&[ColumnMetaData]> {
        self.metadata.get(table_name).map(|c| c.as_slice())
    }

    /// Open a fresh row reader positioned past the header row.
    pub fn row_reader(&self, table_name: &str) -> Result<CsvRowReader> {
        let path = self.repository.get(table_name).ok_or_else(|| {
            ProxyError::NoSuchTable {
                schema: self.schema_name.clone(),
                table: table_name.to_string(),
            }
        })?;
        let mut reader = CsvRowReader::open(path)?;
        // Skip the header row.
        reader.next_row()?;
        Ok(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture_dir(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("proxy-catalog-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        for (file, content) in files {
            let mut f = fs::File::create(dir.join(file)).unwrap();
            f.write_all(content.as_bytes()).unwrap();
        }
        dir
    }

    #[test]
    fn test_load_metadata_from_headers() {
        let dir = fixture_dir(
            "load",
            &[(
                "t_order.csv",
                "order_id:long,user_id:int,status:string\n1,10,init\n2,11,paid\n",
            )],
        );
        let schema = LogicSchema::load(&dir, "orders_db").unwrap();

        assert_eq!(schema.schema_name(), "orders_db");
        let columns = schema.columns("t_order").unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "order_id");
        assert_eq!(columns[0].column_type, ColumnType::Long);
        assert_eq!(columns[0].column_index, 1);
        assert_eq!(columns[2].name, "status");
        assert_eq!(columns[2].column_type, ColumnType::Str);
        assert_eq!(columns[2].column_index, 3);
    }

    #[test]
    fn test_row_reader_skips_header() {
        let dir = fixture_dir(
            "rows",
            &[("t_item.csv", "item_id:int,name:string\n1,widget\n2,gadget\n")],
        );
        let schema = LogicSchema::load(&dir, "db").unwrap();

        let mut reader = schema.row_reader("t_item").unwrap();
        assert_eq!(
            reader.next_row().unwrap().unwrap(),
            vec!["1".to_string(), "widget".to_string()]
        );
        assert_eq!(
            reader.next_row().unwrap().unwrap(),
            vec!["2".to_string(), "gadget".to_string()]
        );
        assert!(reader.next_row().unwrap().is_none());
    }

    #[test]
    fn test_missing_table() {
        let dir = fixture_dir("missing", &[("t_a.csv", "id:int\n")]);
        let schema = LogicSchema::load(&dir, "db").unwrap();
        assert!(schema.columns("t_b").is_none());
        assert!(matches!(
            schema.row_reader("t_b"),
            Err(ProxyError::NoSuchTable { .. })
        ));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let dir = fixture_dir("badheader", &[("t_bad.csv", "order_id,user_id\n")]);
        assert!(matches!(
            LogicSchema::load(&dir, "db"),
            Err(ProxyError::SchemaError(_))
        ));
    }

    #[test]
    fn test_unknown_field_type_rejected() {
        let dir = fixture_dir("badtype", &[("t_bad.csv", "order_id:decimal\n")]);
        assert!(LogicSchema::load(&dir, "db").is_err());
    }
}
