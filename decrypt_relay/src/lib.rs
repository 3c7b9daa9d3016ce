//! S3-triggered relay that decrypts RSA-OAEP objects with a private key held
//! in Secrets Manager and writes the plaintext to a result bucket under the
//! same key.

pub mod aws;
pub mod config;
pub mod crypto;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod key_provider;
pub mod storage;

use aws_lambda_events::event::s3::S3Event;
use lambda_runtime::{Error, LambdaEvent};
use tracing::error;

pub use config::RelayConfig;
pub use dispatcher::{BatchDispatcher, BatchReport, RecordOutcome, Stage};
pub use error::RelayError;
pub use event::{ChangeNotification, ObjectRef};

pub async fn function_handler(event: LambdaEvent<S3Event>) -> Result<(), Error> {
    let config = RelayConfig::from_env()
        .inspect_err(|e| error!(error = %e, "invalid configuration"))?;
    let (store, secrets) = aws::clients_from_config(&config).await;
    let notification = ChangeNotification::from_s3_event(&event.payload);

    BatchDispatcher::new(&secrets, &store, &config)
        .dispatch(&notification)
        .await?;
    Ok(())
}
