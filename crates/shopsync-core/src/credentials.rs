//! Credential cipher boundary.
//!
//! Shop credentials are stored encrypted; the sync factory decrypts them
//! just before constructing the transport client. The real key management
//! lives outside this crate; callers provide the cipher.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::{Error, Result};

/// Opaque encrypt/decrypt capability for credentials at rest.
pub trait CredentialCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String>;
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Reversible base64 obfuscation, standing in for an external KMS when
/// none is configured. Not cryptographic protection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Cipher;

impl CredentialCipher for Base64Cipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(BASE64.encode(plaintext))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let bytes = BASE64
            .decode(ciphertext)
            .map_err(|error| Error::Credential(format!("invalid ciphertext: {error}")))?;
        String::from_utf8(bytes)
            .map_err(|error| Error::Credential(format!("decrypted value is not UTF-8: {error}")))
    }
}
