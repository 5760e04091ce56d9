// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Executor resolution against the CSV schema

use crate::query::CsvQueryExecutor;
use proxy_catalog::LogicSchema;
use proxy_common::{ProxyError, Result};
use proxy_frontend::executor::{
    CommandExecutor, ExecutorFactory, StatusCommandExecutor, UnsupportedCommandExecutor,
};
use proxy_frontend::session::Session;
use proxy_transport::command::CommandPacket;
use proxy_transport::constants::COM_FIELD_LIST;
use std::sync::Arc;
use tracing::debug;

/// Status executor with nothing to do; the engine replies OK.
struct AcceptExecutor;

impl StatusCommandExecutor for AcceptExecutor {
    fn execute(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Resolves commands to executors over one loaded logic schema.
pub struct CsvExecutorFactory {
    schema: Arc<LogicSchema>,
}

impl CsvExecutorFactory {
    pub fn new(schema: Arc<LogicSchema>) -> Self {
        Self { schema }
    }

    fn query_executor(&self, sql: &str) -> Result<CommandExecutor> {
        // Session/variable statements get a bare OK so stock clients can
        // complete their connection chatter.
        let normalized = sql.trim().to_lowercase();
        if normalized.starts_with("set ")
            || normalized.starts_with("show ")
            || normalized.starts_with("select @@")
        {
            debug!(sql = %sql.trim(), "accepting client compatibility statement");
            return Ok(CommandExecutor::Status(Box::new(AcceptExecutor)));
        }

        let table = parse_select_all(sql).ok_or_else(|| {
            ProxyError::ExecutionError(format!(
                "unsupported statement '{}', only SELECT * FROM <table> is accepted",
                sql.trim()
            ))
        })?;
        let executor = CsvQueryExecutor::new(&self.schema, table)?;
        Ok(CommandExecutor::Query(Box::new(executor)))
    }

    fn init_db_executor(&self, session: &mut Session, schema_name: &str) -> Result<CommandExecutor> {
        if schema_name != self.schema.schema_name() {
            return Err(ProxyError::UnknownDatabase(schema_name.to_string()));
        }
        session.schema = Some(schema_name.to_string());
        Ok(CommandExecutor::Status(Box::new(AcceptExecutor)))
    }
}

impl ExecutorFactory for CsvExecutorFactory {
    fn create(&self, session: &mut Session, command: &CommandPacket) -> Result<CommandExecutor> {
        match command {
            CommandPacket::Query { sql } => self.query_executor(sql),
            CommandPacket::InitDb { schema } => self.init_db_executor(session, schema),
            CommandPacket::FieldList { .. } => Ok(CommandExecutor::Status(Box::new(
                UnsupportedCommandExecutor::new(COM_FIELD_LIST),
            ))),
            other => Err(ProxyError::ExecutionError(format!(
                "no executor for command {other:?}"
            ))),
        }
    }
}

/// Accept exactly `SELECT * FROM <table>`, case-insensitive, with an
/// optional trailing semicolon.
fn parse_select_all(sql: &str) -> Option<&str> {
    let sql = sql.trim().trim_end_matches(';').trim_end();
    let mut words = sql.split_whitespace();
    if !words.next()?.eq_ignore_ascii_case("select") {
        return None;
    }
    if words.next()? != "*" {
        return None;
    }
    if !words.next()?.eq_ignore_ascii_case("from") {
        return None;
    }
    let table = words.next()?;
    if words.next().is_some() {
        return None;
    }
    Some(table)
}
