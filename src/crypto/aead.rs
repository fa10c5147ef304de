//! # AEAD Suite
//!
//! AES-256-GCM and ChaCha20-Poly1305 authenticated encryption, one key
//! driving both confidentiality and integrity.
//!
//! Output layout is `nonce ‖ ciphertext ‖ tag` when the suite generates the
//! nonce, or `ciphertext ‖ tag` when the caller supplies one through
//! [`CryptoFlags`]. Associated data from the flags is authenticated but not
//! encrypted.
//!
//! Tag verification happens inside the AEAD open; a mismatch surfaces as
//! `AuthenticationFailure` and yields no plaintext.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::core::buffer::SecureBuffer;
use crate::crypto::{Crypto, CryptoFlags, Decrypter, Encrypter};
use crate::error::{ProtocolError, Result};

const AEAD_KEY_LENGTH: usize = 32;
const AEAD_NONCE_LENGTH: usize = 12;
const AEAD_TAG_LENGTH: usize = 16;

/// AEAD primitive backing the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadCipher {
    Aes256Gcm,
    ChaCha20Poly1305,
}

enum CipherState {
    Gcm(Aes256Gcm),
    ChaCha(ChaCha20Poly1305),
}

impl CipherState {
    /// `nonce` must be exactly [`AEAD_NONCE_LENGTH`] bytes; callers validate.
    fn seal(&self, nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload { msg, aad };
        match self {
            CipherState::Gcm(cipher) => cipher
                .encrypt(aes_gcm::Nonce::from_slice(nonce), payload)
                .map_err(|_| ProtocolError::EncryptionFailure),
            CipherState::ChaCha(cipher) => cipher
                .encrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
                .map_err(|_| ProtocolError::EncryptionFailure),
        }
    }

    /// `nonce` must be exactly [`AEAD_NONCE_LENGTH`] bytes; callers validate.
    fn open(&self, nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload { msg, aad };
        match self {
            CipherState::Gcm(cipher) => cipher
                .decrypt(aes_gcm::Nonce::from_slice(nonce), payload)
                .map_err(|_| ProtocolError::AuthenticationFailure),
            CipherState::ChaCha(cipher) => cipher
                .decrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
                .map_err(|_| ProtocolError::AuthenticationFailure),
        }
    }
}

/// One direction of the AEAD suite.
pub struct AeadCrypto {
    state: CipherState,
    // Retained so the raw material zeroes on drop.
    _key: SecureBuffer,
    test_iv_counter: u64,
}

impl AeadCrypto {
    pub fn new(cipher: AeadCipher, key: Option<SecureBuffer>) -> Result<Self> {
        let key = key.ok_or_else(|| ProtocolError::ConfigError("AEAD key required".into()))?;
        if key.len() != AEAD_KEY_LENGTH {
            return Err(ProtocolError::ConfigError(format!(
                "AEAD needs a {AEAD_KEY_LENGTH}-byte key, got {}",
                key.len()
            )));
        }
        let state = match cipher {
            AeadCipher::Aes256Gcm => Aes256Gcm::new_from_slice(key.as_slice())
                .map(CipherState::Gcm)
                .map_err(|_| ProtocolError::ConfigError("invalid AEAD key".into()))?,
            AeadCipher::ChaCha20Poly1305 => {
                ChaCha20Poly1305::new_from_slice(key.as_slice())
                    .map(CipherState::ChaCha)
                    .map_err(|_| ProtocolError::ConfigError("invalid AEAD key".into()))?
            }
        };
        Ok(Self {
            state,
            _key: key,
            test_iv_counter: 0,
        })
    }

    fn next_nonce(&mut self, for_testing: bool) -> [u8; AEAD_NONCE_LENGTH] {
        let mut nonce = [0u8; AEAD_NONCE_LENGTH];
        if for_testing {
            self.test_iv_counter += 1;
            nonce[AEAD_NONCE_LENGTH - 8..].copy_from_slice(&self.test_iv_counter.to_be_bytes());
        } else {
            OsRng.fill_bytes(&mut nonce);
        }
        nonce
    }
}

impl Crypto for AeadCrypto {
    fn digest_length(&self) -> usize {
        0
    }

    fn tag_length(&self) -> usize {
        AEAD_TAG_LENGTH
    }

    fn overhead(&self) -> usize {
        AEAD_NONCE_LENGTH + AEAD_TAG_LENGTH
    }
}

impl Encrypter for AeadCrypto {
    fn encrypt(&mut self, bytes: &[u8], flags: Option<&CryptoFlags<'_>>) -> Result<Vec<u8>> {
        let aad = flags.and_then(|f| f.ad).unwrap_or(&[]);

        let out = match flags.and_then(|f| f.iv) {
            Some(explicit) => {
                if explicit.len() != AEAD_NONCE_LENGTH {
                    return Err(ProtocolError::EncryptionFailure);
                }
                self.state.seal(explicit, bytes, aad)?
            }
            None => {
                let nonce = self.next_nonce(flags.is_some_and(|f| f.for_testing));
                let sealed = self.state.seal(&nonce, bytes, aad)?;
                let mut out = Vec::with_capacity(AEAD_NONCE_LENGTH + sealed.len());
                out.extend_from_slice(&nonce);
                out.extend_from_slice(&sealed);
                out
            }
        };
        debug_assert!(out.len() <= self.encryption_capacity(bytes.len()));
        Ok(out)
    }
}

impl Decrypter for AeadCrypto {
    fn decrypt(&mut self, bytes: &[u8], flags: Option<&CryptoFlags<'_>>) -> Result<Vec<u8>> {
        let aad = flags.and_then(|f| f.ad).unwrap_or(&[]);

        match flags.and_then(|f| f.iv) {
            Some(explicit) => {
                if explicit.len() != AEAD_NONCE_LENGTH || bytes.len() < AEAD_TAG_LENGTH {
                    return Err(ProtocolError::DecryptionFailure);
                }
                self.state.open(explicit, bytes, aad)
            }
            None => {
                if bytes.len() < AEAD_NONCE_LENGTH + AEAD_TAG_LENGTH {
                    return Err(ProtocolError::DecryptionFailure);
                }
                let (nonce, sealed) = bytes.split_at(AEAD_NONCE_LENGTH);
                self.state.open(nonce, sealed, aad)
            }
        }
    }

    /// AEAD ciphers verify as part of open; this decrypts and discards the
    /// plaintext. Cheap rejection without decryption only exists for the
    /// HMAC suite.
    fn verify(&mut self, bytes: &[u8], flags: Option<&CryptoFlags<'_>>) -> Result<()> {
        self.decrypt(bytes, flags).map(|_| ())
    }
}
