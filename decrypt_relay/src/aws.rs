use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3 as s3;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_secretsmanager as sm;
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueOutput;
use tracing::debug;
use zeroize::Zeroizing;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::key_provider::SecretStore;
use crate::storage::ObjectStore;

pub struct S3ObjectStore {
    client: s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: s3::Client) -> Self {
        Self { client }
    }
}

pub struct SecretsManagerStore {
    client: sm::Client,
}

/// Builds the per-invocation SDK clients, honouring endpoint overrides.
pub async fn clients_from_config(config: &RelayConfig) -> (S3ObjectStore, SecretsManagerStore) {
    let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await;

    let s3_config = match &config.s3_endpoint {
        Some(endpoint) => s3::config::Builder::from(&sdk_config)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build(),
        None => s3::config::Builder::from(&sdk_config).build(),
    };
    let sm_config = match &config.secrets_manager_endpoint {
        Some(endpoint) => sm::config::Builder::from(&sdk_config)
            .endpoint_url(endpoint)
            .build(),
        None => sm::config::Builder::from(&sdk_config).build(),
    };

    (
        S3ObjectStore::new(s3::Client::from_conf(s3_config)),
        SecretsManagerStore {
            client: sm::Client::from_conf(sm_config),
        },
    )
}

impl ObjectStore for S3ObjectStore {
    async fn read(&self, location: &str, identifier: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(location)
            .key(identifier)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    RelayError::ObjectNotFound {
                        location: location.to_string(),
                        identifier: identifier.to_string(),
                    }
                } else {
                    RelayError::storage_access(location, identifier, DisplayErrorContext(&e))
                }
            })?;
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| RelayError::storage_access(location, identifier, e))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn write(&self, location: &str, identifier: &str, body: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(location)
            .key(identifier)
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| RelayError::storage_access(location, identifier, DisplayErrorContext(&e)))
    }

    async fn delete(&self, location: &str, identifier: &str) -> Result<()> {
        // S3 answers 204 for keys that are already gone
        self.client
            .delete_object()
            .bucket(location)
            .key(identifier)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| RelayError::storage_access(location, identifier, DisplayErrorContext(&e)))
    }
}

impl SecretStore for SecretsManagerStore {
    async fn secret_string(&self, secret_id: &str) -> Result<Zeroizing<String>> {
        let mut output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| RelayError::KeyRetrieval {
                secret_id: secret_id.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;
        debug!(secret_id, version = output.version_id(), "received secret value");
        take_secret_string(&mut output, secret_id)
    }
}

/// Moves the secret text out of the response so no unwiped copy is left behind.
fn take_secret_string(
    output: &mut GetSecretValueOutput,
    secret_id: &str,
) -> Result<Zeroizing<String>> {
    output
        .secret_string
        .take()
        .map(Zeroizing::new)
        .ok_or_else(|| RelayError::KeyRetrieval {
            secret_id: secret_id.to_string(),
            reason: "secret has no string value".to_string(),
        })
}
