//! Drives one invocation: load the key once, then relay every record in
//! delivery order.
//!
//! A record that fails at any stage is turned into a [`RecordOutcome`] and the
//! loop moves on. Only configuration and key problems fail the invocation, and
//! they do so before the first record is read.

use std::fmt;

use tracing::{error, info, warn};

use crate::config::RelayConfig;
use crate::crypto::{self, PrivateKeyMaterial};
use crate::error::{RelayError, Result};
use crate::event::{ChangeNotification, ObjectRef, Record};
use crate::key_provider::{fetch_private_key, SecretStore};
use crate::storage::{ObjectStore, StorageRelay};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Read,
    Decrypt,
    Write,
    Delete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Parse => "parse",
            Stage::Read => "read",
            Stage::Decrypt => "decrypt",
            Stage::Write => "write",
            Stage::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Relayed {
        identifier: String,
        source_deleted: bool,
    },
    Failed {
        /// `None` when the record never named an object.
        identifier: Option<String>,
        stage: Stage,
        cause: String,
    },
}

impl RecordOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RecordOutcome::Relayed { .. })
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            RecordOutcome::Relayed { .. } => None,
            RecordOutcome::Failed { stage, .. } => Some(*stage),
        }
    }
}

/// Per-record outcomes of a completed batch, in delivery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

pub struct BatchDispatcher<'a, K, S> {
    secrets: &'a K,
    store: &'a S,
    config: &'a RelayConfig,
}

impl<'a, K, S> BatchDispatcher<'a, K, S>
where
    K: SecretStore,
    S: ObjectStore,
{
    pub fn new(secrets: &'a K, store: &'a S, config: &'a RelayConfig) -> Self {
        Self {
            secrets,
            store,
            config,
        }
    }

    pub async fn dispatch(&self, notification: &ChangeNotification) -> Result<BatchReport> {
        info!(records = notification.len(), "received change notification");

        let key = match fetch_private_key(self.secrets, &self.config.private_key_path).await {
            Ok(key) => key,
            Err(e) => {
                error!(error = %e, "could not load private key, no records processed");
                return Err(e);
            }
        };

        let relay = StorageRelay::new(
            self.store,
            &self.config.result_bucket_path,
            self.config.delete_source_after_relay,
        );

        let mut report = BatchReport {
            outcomes: Vec::with_capacity(notification.len()),
        };
        for (position, record) in notification.records.iter().enumerate() {
            let outcome = match record {
                Record::Object(object) => relay_object(&relay, &key, object).await,
                Record::Malformed(reason) => RecordOutcome::Failed {
                    identifier: None,
                    stage: Stage::Parse,
                    cause: reason.clone(),
                },
            };
            if let RecordOutcome::Failed {
                identifier,
                stage,
                cause,
            } = &outcome
            {
                warn!(
                    position,
                    identifier = identifier.as_deref(),
                    %stage,
                    %cause,
                    "could not process record, skipping"
                );
            }
            report.outcomes.push(outcome);
        }
        drop(key);

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "finished processing batch"
        );
        Ok(report)
    }
}

async fn relay_object<S: ObjectStore>(
    relay: &StorageRelay<'_, S>,
    key: &PrivateKeyMaterial,
    object: &ObjectRef,
) -> RecordOutcome {
    let ObjectRef {
        source_location,
        object_identifier,
    } = object;
    info!(
        source = source_location.as_str(),
        identifier = object_identifier.as_str(),
        "processing record"
    );

    match run_pipeline(relay, key, source_location, object_identifier).await {
        Ok(source_deleted) => {
            info!(identifier = object_identifier.as_str(), source_deleted, "finished record");
            RecordOutcome::Relayed {
                identifier: object_identifier.clone(),
                source_deleted,
            }
        }
        Err((stage, e)) => RecordOutcome::Failed {
            identifier: Some(object_identifier.clone()),
            stage,
            cause: e.to_string(),
        },
    }
}

async fn run_pipeline<S: ObjectStore>(
    relay: &StorageRelay<'_, S>,
    key: &PrivateKeyMaterial,
    location: &str,
    identifier: &str,
) -> std::result::Result<bool, (Stage, RelayError)> {
    let ciphertext = relay
        .read_source(location, identifier)
        .await
        .map_err(|e| (Stage::Read, e))?;
    let plaintext = crypto::decrypt(&ciphertext, key).map_err(|e| (Stage::Decrypt, e))?;
    relay
        .write_destination(identifier, plaintext)
        .await
        .map_err(|e| (Stage::Write, e))?;
    relay
        .remove_source(location, identifier)
        .await
        .map_err(|e| (Stage::Delete, e))
}
