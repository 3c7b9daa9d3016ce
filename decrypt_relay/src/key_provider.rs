use std::future::Future;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::info;
use zeroize::Zeroizing;

use crate::crypto::PrivateKeyMaterial;
use crate::error::{RelayError, Result};

/// Source of secret text, looked up by identifier.
pub trait SecretStore {
    /// Fails with [`RelayError::KeyRetrieval`] when the store cannot be reached
    /// or has no string value under `secret_id`.
    fn secret_string(
        &self,
        secret_id: &str,
    ) -> impl Future<Output = Result<Zeroizing<String>>> + Send;
}

/// Fetches the PEM wrapped private key once and parses it.
pub async fn fetch_private_key<S: SecretStore>(
    store: &S,
    secret_id: &str,
) -> Result<PrivateKeyMaterial> {
    info!(secret_id, "fetching private key from secret store");
    let pem = store.secret_string(secret_id).await?;
    let key = parse_private_key_pem(&pem)?;
    info!(secret_id, modulus_bits = key.modulus_len() * 8, "got private key successfully");
    Ok(key)
}

/// Drops the `-----BEGIN/END ...-----` lines and every whitespace character,
/// then decodes the remaining base64 body as PKCS#8 DER.
pub fn parse_private_key_pem(pem: &str) -> Result<PrivateKeyMaterial> {
    let body = pem_body(pem);
    if body.is_empty() {
        return Err(RelayError::KeyFormat(
            "no key data between PEM markers".to_string(),
        ));
    }

    let der = Zeroizing::new(
        STANDARD
            .decode(body.as_bytes())
            .map_err(|e| RelayError::KeyFormat(format!("invalid base64 key body: {e}")))?,
    );
    PrivateKeyMaterial::from_pkcs8_der(&der)
}

// Sized up front so the buffer never reallocates and leaves key text behind.
fn pem_body(pem: &str) -> Zeroizing<String> {
    let mut body = Zeroizing::new(String::with_capacity(pem.len()));
    for line in pem.lines().map(str::trim) {
        if line.starts_with("-----") {
            continue;
        }
        body.extend(line.chars().filter(|ch| !ch.is_whitespace()));
    }
    body
}
