// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Protocol frontend engines
//!
//! Per-connection protocol state machines on top of `proxy-transport`:
//! - Authentication engine (handshake/response exchange)
//! - Command execute engine (dispatch and result streaming)
//! - Connection session and id allocation
//! - TCP server loop

pub mod auth;
pub mod channel;
pub mod command;
pub mod executor;
pub mod server;
pub mod session;

pub use auth::{Authenticator, AuthenticationEngine, ProxyAuthenticator};
pub use channel::{ClientChannel, TcpChannel};
pub use command::CommandExecuteEngine;
pub use executor::{
    CommandExecutor, ExecutorFactory, QueryCommandExecutor, StatusCommandExecutor,
};
pub use server::ProxyServer;
pub use session::{ConnectionIdGenerator, Session};
