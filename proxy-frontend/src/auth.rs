// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Authentication engine
//!
//! Per-connection state machine: send the initial handshake, validate the
//! client's HandshakeResponse41, reply OK or a protocol-correct ERR.
//! Rejected connections are closed by the transport after the ERR flushes;
//! the protocol permits no auth retry on the same connection.

use crate::session::Session;
use proxy_common::{ProxyError, Result};
use proxy_transport::error_code::err_packet_for;
use proxy_transport::handshake::{verify_native_password, HandshakePacket, HandshakeResponse41};
use proxy_transport::packet::{OkPacket, Packet};
use tracing::info;

/// Why a login was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    InvalidCredentials,
    NoSchemaAccess(String),
}

/// Pluggable username/password + schema-access check.
pub trait Authenticator: Send + Sync {
    fn login(
        &self,
        username: &str,
        auth_response: &[u8],
        auth_plugin_data: &[u8],
        database: Option<&str>,
    ) -> std::result::Result<(), LoginFailure>;
}

/// Single-user authenticator over the configured credentials and the one
/// logic schema this proxy serves.
pub struct ProxyAuthenticator {
    username: String,
    password: String,
    schema_name: String,
}

impl ProxyAuthenticator {
    pub fn new(username: String, password: String, schema_name: String) -> Self {
        Self {
            username,
            password,
            schema_name,
        }
    }
}

impl Authenticator for ProxyAuthenticator {
    fn login(
        &self,
        username: &str,
        auth_response: &[u8],
        auth_plugin_data: &[u8],
        database: Option<&str>,
    ) -> std::result::Result<(), LoginFailure> {
        if username != self.username
            || !verify_native_password(&self.password, auth_response, auth_plugin_data)
        {
            return Err(LoginFailure::InvalidCredentials);
        }
        if let Some(database) = database {
            if database != self.schema_name {
                return Err(LoginFailure::NoSchemaAccess(database.to_string()));
            }
        }
        Ok(())
    }
}

/// Connection-phase states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    AwaitingHandshake,
    AwaitingResponse,
    Authenticated,
    Rejected,
}

/// Drives the handshake/authentication exchange for one connection.
pub struct AuthenticationEngine {
    phase: AuthPhase,
}

impl Default for AuthenticationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticationEngine {
    pub fn new() -> Self {
        Self {
            phase: AuthPhase::AwaitingHandshake,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    /// Produce the initial handshake packet, stashing the nonce in the
    /// session for the response check.
    pub fn handshake(&mut self, session: &mut Session) -> Packet {
        let handshake = HandshakePacket::new(session.connection_id);
        session.auth_plugin_data = handshake.auth_plugin_data.clone();
        self.phase = AuthPhase::AwaitingResponse;
        handshake.to_packet(0)
    }

    /// Validate the client's handshake response. Returns the reply packet
    /// and whether the connection is now authenticated.
    pub fn auth(
        &mut self,
        session: &mut Session,
        authenticator: &dyn Authenticator,
        packet: &Packet,
        client_host: &str,
    ) -> Result<(Packet, bool)> {
        if self.phase != AuthPhase::AwaitingResponse {
            return Err(ProxyError::ProtocolError(format!(
                "handshake response in phase {:?}",
                self.phase
            )));
        }
        let response = HandshakeResponse41::from_packet(packet)?;
        let reply_seq = response.sequence_id.wrapping_add(1);

        let login = authenticator.login(
            &response.username,
            &response.auth_response,
            &session.auth_plugin_data,
            response.database.as_deref(),
        );
        // The nonce is consumed by this one check.
        session.auth_plugin_data.clear();

        match login {
            Ok(()) => {
                session.authenticated = true;
                session.schema = response.database.clone();
                self.phase = AuthPhase::Authenticated;
                info!(
                    connection_id = session.connection_id,
                    username = %response.username,
                    "authenticated"
                );
                Ok((OkPacket::default().to_packet(reply_seq), true))
            }
            Err(failure) => {
                self.phase = AuthPhase::Rejected;
                let cause = match failure {
                    LoginFailure::NoSchemaAccess(database) => ProxyError::DbAccessDenied {
                        username: response.username.clone(),
                        host: client_host.to_string(),
                        database,
                    },
                    LoginFailure::InvalidCredentials => ProxyError::AccessDenied {
                        username: response.username.clone(),
                        host: client_host.to_string(),
                        password_supplied: !response.auth_response.is_empty(),
                    },
                };
                info!(
                    connection_id = session.connection_id,
                    username = %response.username,
                    "login rejected: {cause}"
                );
                Ok((err_packet_for(&cause, reply_seq), false))
            }
        }
    }
}
