// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Per-connection session state and connection-id allocation

use std::sync::atomic::{AtomicU32, Ordering};

/// Hands out strictly unique connection ids. The only process-wide mutable
/// state shared across connections; owned by the server, passed explicitly.
#[derive(Debug, Default)]
pub struct ConnectionIdGenerator {
    next: AtomicU32,
}

impl ConnectionIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(0),
        }
    }

    pub fn next_id(&self) -> u32 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Transient state owned exclusively by one connection's handler.
#[derive(Debug)]
pub struct Session {
    pub connection_id: u32,
    pub authenticated: bool,
    /// Handshake nonce, consumed once during authentication.
    pub auth_plugin_data: Vec<u8>,
    pub schema: Option<String>,
}

impl Session {
    pub fn new(connection_id: u32) -> Self {
        Self {
            connection_id,
            authenticated: false,
            auth_plugin_data: Vec::new(),
            schema: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_ids_are_monotonic() {
        let generator = ConnectionIdGenerator::new();
        assert_eq!(generator.next_id(), 1);
        assert_eq!(generator.next_id(), 2);
        assert_eq!(generator.next_id(), 3);
    }

    #[test]
    fn test_ids_unique_under_concurrency() {
        let generator = Arc::new(ConnectionIdGenerator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let generator = generator.clone();
            handles.push(std::thread::spawn(move || {
                (0..1000).map(|_| generator.next_id()).collect::<Vec<_>>()
            }));
        }
        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 8000);
    }

    #[test]
    fn test_new_session_is_unauthenticated() {
        let session = Session::new(7);
        assert_eq!(session.connection_id, 7);
        assert!(!session.authenticated);
        assert!(session.schema.is_none());
    }
}
