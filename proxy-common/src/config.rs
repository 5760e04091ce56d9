// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Configuration for the proxy frontend

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// MySQL protocol listen port
    pub query_port: u16,

    /// Directory holding the CSV table files
    pub data_dir: PathBuf,

    /// Name of the logic schema served to clients
    pub schema_name: String,

    /// Accepted username
    pub username: String,

    /// Accepted password (empty means passwordless login)
    pub password: String,

    /// Log level
    pub log_level: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            query_port: 3307,
            data_dir: PathBuf::from("data"),
            schema_name: "logic_db".to_string(),
            username: "root".to_string(),
            password: String::new(),
            log_level: "info".to_string(),
        }
    }
}

impl ProxyConfig {
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::ProxyError::InternalError(format!("bad config file: {e}")))?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.query_port == 0 {
            return Err(crate::ProxyError::InternalError(
                "query_port must be non-zero".to_string(),
            ));
        }
        if self.username.is_empty() {
            return Err(crate::ProxyError::InternalError(
                "username must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
