// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Streaming full scan over one CSV table

use proxy_catalog::{ColumnMetaData, CsvRowReader, LogicSchema};
use proxy_common::{ProxyError, Result};
use proxy_frontend::executor::QueryCommandExecutor;
use proxy_transport::resultset::TextRow;

/// Full-scan executor over a CSV table. Holds a one-row lookahead so
/// `has_next` answers without touching the file, and rows are read from disk
/// only as the streaming loop asks for them.
pub struct CsvQueryExecutor {
    columns: Vec<ColumnMetaData>,
    reader: CsvRowReader,
    lookahead: Option<Vec<String>>,
    current: Option<TextRow>,
}

impl std::fmt::Debug for CsvQueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvQueryExecutor")
            .field("columns", &self.columns.len())
            .finish_non_exhaustive()
    }
}

impl CsvQueryExecutor {
    pub fn new(schema: &LogicSchema, table_name: &str) -> Result<Self> {
        let columns = schema
            .columns(table_name)
            .ok_or_else(|| ProxyError::NoSuchTable {
                schema: schema.schema_name().to_string(),
                table: table_name.to_string(),
            })?
            .to_vec();
        let mut reader = schema.row_reader(table_name)?;
        let lookahead = reader.next_row()?;
        Ok(Self {
            columns,
            reader,
            lookahead,
            current: None,
        })
    }
}

impl QueryCommandExecutor for CsvQueryExecutor {
    fn columns(&self) -> &[ColumnMetaData] {
        &self.columns
    }

    fn has_next(&self) -> bool {
        self.lookahead.is_some()
    }

    fn next(&mut self) -> Result<()> {
        let row = self
            .lookahead
            .take()
            .ok_or_else(|| ProxyError::ExecutionError("scan advanced past last row".to_string()))?;
        // Every row packet must carry exactly the advertised field count.
        if row.len() != self.columns.len() {
            return Err(ProxyError::ExecutionError(format!(
                "row has {} cells, table declares {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.current = Some(TextRow::new(
            row.into_iter().map(|cell| Some(cell.into_bytes())).collect(),
        ));
        self.lookahead = self.reader.next_row()?;
        Ok(())
    }

    fn row_data(&self) -> TextRow {
        match &self.current {
            Some(row) => row.clone(),
            None => TextRow::new(Vec::new()),
        }
    }
}
