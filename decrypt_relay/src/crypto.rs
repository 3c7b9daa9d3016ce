//! RSA-OAEP decryption of single-block payloads.
//!
//! The padding is fixed to OAEP with SHA-1 for both the digest and MGF1 and an
//! empty label, which is what `RSA/ECB/OAEPPadding` and
//! `openssl pkeyutl -pkeyopt rsa_padding_mode:oaep` produce by default.
//! Payloads are never chunked: a ciphertext must be exactly one modulus long.

use std::fmt;

use aws_lc_rs::rsa::{
    OaepAlgorithm, OaepPrivateDecryptingKey, OaepPublicEncryptingKey, PrivateDecryptingKey,
    OAEP_SHA1_MGF1SHA1,
};

use crate::error::{RelayError, Result};

pub static OAEP_PADDING: &OaepAlgorithm = &OAEP_SHA1_MGF1SHA1;

/// Smallest modulus the RSA backend will load.
pub const MIN_MODULUS_BITS: usize = 2048;

/// A parsed RSA private key together with its public half.
///
/// The underlying key handles are freed when this value is dropped. `Debug`
/// never prints key material.
pub struct PrivateKeyMaterial {
    decrypting: OaepPrivateDecryptingKey,
    encrypting: OaepPublicEncryptingKey,
    modulus_len: usize,
}

impl PrivateKeyMaterial {
    /// Parses DER encoded PKCS#8 bytes. Only RSA keys of 2048 bits or more
    /// are accepted; smaller moduli fail with [`RelayError::KeyFormat`].
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let private_key = PrivateDecryptingKey::from_pkcs8(der).map_err(|e| {
            RelayError::KeyFormat(format!(
                "not a usable PKCS#8 RSA private key ({e}); \
                 RSA keys must be at least {MIN_MODULUS_BITS} bits"
            ))
        })?;
        let encrypting = OaepPublicEncryptingKey::new(private_key.public_key())
            .map_err(|e| RelayError::KeyFormat(format!("unusable public key: {e}")))?;
        let modulus_len = encrypting.ciphertext_size();
        let decrypting = OaepPrivateDecryptingKey::new(private_key)
            .map_err(|e| RelayError::KeyFormat(format!("unusable private key: {e}")))?;
        Ok(Self {
            decrypting,
            encrypting,
            modulus_len,
        })
    }

    /// Modulus length in bytes, which is also the only valid ciphertext length.
    pub fn modulus_len(&self) -> usize {
        self.modulus_len
    }

    /// Largest plaintext the public half can encrypt under [`OAEP_PADDING`].
    pub fn max_plaintext_size(&self) -> usize {
        self.encrypting.max_plaintext_size(OAEP_PADDING)
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKeyMaterial([REDACTED {}-bit RSA])", self.modulus_len * 8)
    }
}

pub fn decrypt(ciphertext: &[u8], key: &PrivateKeyMaterial) -> Result<Vec<u8>> {
    if ciphertext.len() != key.modulus_len {
        return Err(RelayError::Decryption(format!(
            "ciphertext is {} bytes, expected {} for this key",
            ciphertext.len(),
            key.modulus_len
        )));
    }

    let mut plaintext = vec![0u8; key.modulus_len];
    let written = key
        .decrypting
        .decrypt(OAEP_PADDING, ciphertext, &mut plaintext, None)
        .map_err(|_| RelayError::Decryption("OAEP padding check failed".to_string()))?
        .len();
    plaintext.truncate(written);
    Ok(plaintext)
}

/// Encrypts with the public half of `key`. Used to produce test and sample
/// objects; the relay itself only decrypts.
pub fn encrypt(plaintext: &[u8], key: &PrivateKeyMaterial) -> Result<Vec<u8>> {
    let max = key.max_plaintext_size();
    if plaintext.len() > max {
        return Err(RelayError::PlaintextTooLarge {
            len: plaintext.len(),
            max,
        });
    }

    let mut ciphertext = vec![0u8; key.encrypting.ciphertext_size()];
    let written = key
        .encrypting
        .encrypt(OAEP_PADDING, plaintext, &mut ciphertext, None)
        .map_err(|e| RelayError::Encryption(e.to_string()))?
        .len();
    ciphertext.truncate(written);
    Ok(ciphertext)
}
