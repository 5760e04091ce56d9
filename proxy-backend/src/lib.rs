// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! CSV-backed command executors
//!
//! Implements the frontend's executor interfaces against the CSV table
//! repository: full-scan query execution with one-row lookahead, schema
//! switching, and the status commands.

pub mod factory;
pub mod query;

pub use factory::CsvExecutorFactory;
pub use query::CsvQueryExecutor;
