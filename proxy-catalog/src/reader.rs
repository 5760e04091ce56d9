// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Streaming row reader over one CSV file

use proxy_common::Result;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Forward-only reader yielding one row of cells at a time. Dropping the
/// reader releases the underlying file handle, which is how an aborted query
/// frees its backend resources.
pub struct CsvRowReader {
    lines: Lines<BufReader<File>>,
}

impl CsvRowReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
        })
    }

    /// Next row, or `None` at end of file. Blank lines are skipped.
    pub fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        for line in self.lines.by_ref() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            return Ok(Some(line.split(',').map(|s| s.to_string()).collect()));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_rows_and_skips_blank_lines() {
        let path = std::env::temp_dir().join(format!("proxy-reader-{}.csv", std::process::id()));
        let mut f = File::create(&path).unwrap();
        f.write_all(b"a,b\n\n1,2\r\n").unwrap();

        let mut reader = CsvRowReader::open(&path).unwrap();
        assert_eq!(reader.next_row().unwrap().unwrap(), vec!["a", "b"]);
        assert_eq!(reader.next_row().unwrap().unwrap(), vec!["1", "2"]);
        assert!(reader.next_row().unwrap().is_none());
    }
}
