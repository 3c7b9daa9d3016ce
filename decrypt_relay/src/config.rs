use std::env;

use crate::error::{RelayError, Result};

pub const PRIVATE_KEY_PATH: &str = "PRIVATE_KEY_PATH";
pub const RESULT_BUCKET_PATH: &str = "RESULT_BUCKET_PATH";
pub const DELETE_SOURCE_AFTER_RELAY: &str = "DELETE_SOURCE_AFTER_RELAY";
pub const S3_ENDPOINT: &str = "S3_ENDPOINT";
pub const SECRETS_MANAGER_ENDPOINT: &str = "SECRETS_MANAGER_ENDPOINT";

/// Settings for one invocation, read from the function's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Secret id holding the PEM wrapped PKCS#8 private key.
    pub private_key_path: String,
    /// Bucket receiving the decrypted objects.
    pub result_bucket_path: String,
    /// Remove the source object once its plaintext has been written.
    pub delete_source_after_relay: bool,
    pub s3_endpoint: Option<String>,
    pub secrets_manager_endpoint: Option<String>,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| RelayError::Config(format!("{name} must be configured")))
        };

        let delete_source_after_relay = match lookup(DELETE_SOURCE_AFTER_RELAY) {
            Some(value) => parse_flag(DELETE_SOURCE_AFTER_RELAY, &value)?,
            None => false,
        };

        Ok(Self {
            private_key_path: required(PRIVATE_KEY_PATH)?,
            result_bucket_path: required(RESULT_BUCKET_PATH)?,
            delete_source_after_relay,
            s3_endpoint: lookup(S3_ENDPOINT),
            secrets_manager_endpoint: lookup(SECRETS_MANAGER_ENDPOINT),
        })
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        other => Err(RelayError::Config(format!(
            "{name} must be a boolean, got {other:?}"
        ))),
    }
}
