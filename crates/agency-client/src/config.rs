// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Client configuration loading from environment variables.

use std::env;
use std::path::PathBuf;

use crate::batch::{BatchLimits, DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_MAX_RECORDS};
use crate::error::{ConfigError, SourceError};
use crate::source::{CsvSource, EnvSource, RecordSource};
use crate::types::ClientId;

/// Default collector address
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:12345";

/// Default connection timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Agency client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Client identifier sent at session start
    pub client_id: ClientId,
    /// Collector address as `host:port` (resolved at connect time)
    pub server_address: String,
    /// Batch size bounds
    pub batch_limits: BatchLimits,
    /// CSV file with the records to send; unset means a single record from env
    pub data_file: Option<PathBuf>,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `CLI_ID`: client identifier, an integer in 0..=255
    ///
    /// Optional (with defaults):
    /// - `CLI_SERVER_ADDRESS`: collector address (default: 127.0.0.1:12345)
    /// - `CLI_BATCH_MAX_AMOUNT`: records per batch (default: 100)
    /// - `CLI_BATCH_MAX_BYTES`: payload bytes per batch, at most 65535 (default: 8192)
    /// - `CLI_DATA_FILE`: CSV file with records (default: unset)
    /// - `CLI_CONNECT_TIMEOUT_MS`: connection timeout (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_id = env::var("CLI_ID").map_err(|_| ConfigError::Missing("CLI_ID"))?;
        let client_id = raw_id
            .parse::<ClientId>()
            .map_err(|e| ConfigError::Invalid("CLI_ID", e.to_string()))?;

        let server_address = env::var("CLI_SERVER_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_SERVER_ADDRESS.to_string());

        let max_records = parse_var("CLI_BATCH_MAX_AMOUNT", DEFAULT_MAX_RECORDS)?;
        let max_payload_bytes = parse_var("CLI_BATCH_MAX_BYTES", DEFAULT_MAX_PAYLOAD_BYTES)?;
        let batch_limits = BatchLimits::new(max_records, max_payload_bytes).map_err(|e| match e {
            ConfigError::Invalid("max_records", reason) => {
                ConfigError::Invalid("CLI_BATCH_MAX_AMOUNT", reason)
            }
            ConfigError::Invalid(_, reason) => ConfigError::Invalid("CLI_BATCH_MAX_BYTES", reason),
            other => other,
        })?;

        let data_file = env::var("CLI_DATA_FILE")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let connect_timeout_ms = parse_var("CLI_CONNECT_TIMEOUT_MS", DEFAULT_CONNECT_TIMEOUT_MS)?;

        Ok(Self {
            client_id,
            server_address,
            batch_limits,
            data_file,
            connect_timeout_ms,
        })
    }

    /// Create a configuration with defaults for everything but the id.
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            batch_limits: BatchLimits::default(),
            data_file: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }

    /// Set the collector address.
    pub fn with_server_address(mut self, address: impl Into<String>) -> Self {
        self.server_address = address.into();
        self
    }

    /// Set the batch limits.
    pub fn with_batch_limits(mut self, limits: BatchLimits) -> Self {
        self.batch_limits = limits;
        self
    }

    /// Read records from a CSV file.
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    /// Open the configured record source: the CSV data file when set,
    /// otherwise the single record described by the environment.
    pub fn open_source(&self) -> Result<Box<dyn RecordSource>, SourceError> {
        match &self.data_file {
            Some(path) => Ok(Box::new(CsvSource::open(path)?)),
            None => Ok(Box::new(EnvSource::from_env()?)),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, format!("{value:?} is not a valid number"))),
        Err(_) => Ok(default),
    }
}
