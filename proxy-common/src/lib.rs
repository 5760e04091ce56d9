// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Common foundational types for the proxy
//!
//! This crate provides:
//! - Error types and result handling
//! - Configuration management

pub mod config;
pub mod error;

pub use config::ProxyConfig;
pub use error::{ProxyError, Result};
