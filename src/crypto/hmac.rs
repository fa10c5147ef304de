//! # HMAC Suite
//!
//! Keyed-digest authentication, optionally combined with AES-256-CBC.
//!
//! Two configurations share this type:
//! - **Digest-only** (control-channel authentication): `encrypt` prepends an
//!   HMAC over the input, `decrypt`/`verify` check and strip it. Output
//!   layout: `digest ‖ bytes`.
//! - **Cipher + HMAC** (classic data channel): CBC encryption with the HMAC
//!   computed over `iv ‖ ciphertext`. Output layout: `digest ‖ iv ‖
//!   ciphertext`, with the IV omitted when the caller supplied one through
//!   [`CryptoFlags`].
//!
//! HMAC comparison goes through `Mac::verify_slice`, which is constant-time.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Sha256, Sha512};

use crate::core::buffer::SecureBuffer;
use crate::crypto::{Crypto, CryptoFlags, Decrypter, Encrypter};
use crate::error::{ProtocolError, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const CBC_IV_LENGTH: usize = 16;
const CBC_KEY_LENGTH: usize = 32;

/// Digest algorithm backing the HMAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    pub fn digest_length(self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha512 => 64,
        }
    }
}

/// Keyed MAC prototype, cloned per operation.
#[derive(Clone)]
enum MacKind {
    Sha256(Hmac<Sha256>),
    Sha512(Hmac<Sha512>),
}

impl MacKind {
    fn new(algorithm: DigestAlgorithm, key: &[u8]) -> Result<Self> {
        match algorithm {
            DigestAlgorithm::Sha256 => Hmac::<Sha256>::new_from_slice(key)
                .map(MacKind::Sha256)
                .map_err(|_| ProtocolError::ConfigError("invalid HMAC key".into())),
            DigestAlgorithm::Sha512 => Hmac::<Sha512>::new_from_slice(key)
                .map(MacKind::Sha512)
                .map_err(|_| ProtocolError::ConfigError("invalid HMAC key".into())),
        }
    }

    fn sign(&self, parts: &[&[u8]]) -> Vec<u8> {
        match self {
            MacKind::Sha256(proto) => {
                let mut mac = proto.clone();
                for part in parts {
                    mac.update(part);
                }
                mac.finalize().into_bytes().to_vec()
            }
            MacKind::Sha512(proto) => {
                let mut mac = proto.clone();
                for part in parts {
                    mac.update(part);
                }
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// Constant-time digest check.
    fn verify(&self, parts: &[&[u8]], digest: &[u8]) -> Result<()> {
        let outcome = match self {
            MacKind::Sha256(proto) => {
                let mut mac = proto.clone();
                for part in parts {
                    mac.update(part);
                }
                mac.verify_slice(digest)
            }
            MacKind::Sha512(proto) => {
                let mut mac = proto.clone();
                for part in parts {
                    mac.update(part);
                }
                mac.verify_slice(digest)
            }
        };
        outcome.map_err(|_| ProtocolError::AuthenticationFailure)
    }
}

/// One direction of the HMAC suite.
pub struct HmacCrypto {
    algorithm: DigestAlgorithm,
    mac: MacKind,
    // Retained so the raw material zeroes on drop.
    _hmac_key: SecureBuffer,
    cipher_key: Option<SecureBuffer>,
    test_iv_counter: u64,
}

impl HmacCrypto {
    /// Authentication-only configuration (no cipher key).
    pub fn digest_only(
        algorithm: DigestAlgorithm,
        hmac_key: Option<SecureBuffer>,
    ) -> Result<Self> {
        let hmac_key = hmac_key
            .ok_or_else(|| ProtocolError::ConfigError("HMAC key required".into()))?;
        let mac = MacKind::new(algorithm, hmac_key.as_slice())?;
        Ok(Self {
            algorithm,
            mac,
            _hmac_key: hmac_key,
            cipher_key: None,
            test_iv_counter: 0,
        })
    }

    /// AES-256-CBC with HMAC authentication over `iv ‖ ciphertext`.
    pub fn with_cipher(
        algorithm: DigestAlgorithm,
        hmac_key: Option<SecureBuffer>,
        cipher_key: Option<SecureBuffer>,
    ) -> Result<Self> {
        let cipher_key = cipher_key
            .ok_or_else(|| ProtocolError::ConfigError("cipher key required".into()))?;
        if cipher_key.len() != CBC_KEY_LENGTH {
            return Err(ProtocolError::ConfigError(format!(
                "AES-256-CBC needs a {CBC_KEY_LENGTH}-byte key, got {}",
                cipher_key.len()
            )));
        }
        let mut boxed = Self::digest_only(algorithm, hmac_key)?;
        boxed.cipher_key = Some(cipher_key);
        Ok(boxed)
    }

    fn next_iv(&mut self, flags: Option<&CryptoFlags<'_>>) -> [u8; CBC_IV_LENGTH] {
        let mut iv = [0u8; CBC_IV_LENGTH];
        if flags.is_some_and(|f| f.for_testing) {
            self.test_iv_counter += 1;
            iv[CBC_IV_LENGTH - 8..].copy_from_slice(&self.test_iv_counter.to_be_bytes());
        } else {
            OsRng.fill_bytes(&mut iv);
        }
        iv
    }
}

impl Crypto for HmacCrypto {
    fn digest_length(&self) -> usize {
        self.algorithm.digest_length()
    }

    fn tag_length(&self) -> usize {
        0
    }

    fn overhead(&self) -> usize {
        let iv = if self.cipher_key.is_some() {
            CBC_IV_LENGTH
        } else {
            0
        };
        self.digest_length() + iv
    }
}

impl Encrypter for HmacCrypto {
    fn encrypt(&mut self, bytes: &[u8], flags: Option<&CryptoFlags<'_>>) -> Result<Vec<u8>> {
        if self.cipher_key.is_none() {
            // digest ‖ bytes
            let digest = self.mac.sign(&[bytes]);
            let mut out = Vec::with_capacity(digest.len() + bytes.len());
            out.extend_from_slice(&digest);
            out.extend_from_slice(bytes);
            debug_assert!(out.len() <= self.encryption_capacity(bytes.len()));
            return Ok(out);
        }

        let (iv, frame_iv) = match flags.and_then(|f| f.iv) {
            Some(explicit) => {
                let iv: [u8; CBC_IV_LENGTH] = explicit
                    .try_into()
                    .map_err(|_| ProtocolError::EncryptionFailure)?;
                (iv, false)
            }
            None => (self.next_iv(flags), true),
        };
        let Some(key) = self.cipher_key.as_ref() else {
            return Err(ProtocolError::EncryptionFailure);
        };
        let ciphertext = Aes256CbcEnc::new_from_slices(key.as_slice(), &iv)
            .map_err(|_| ProtocolError::EncryptionFailure)?
            .encrypt_padded_vec_mut::<Pkcs7>(bytes);
        let digest = self.mac.sign(&[iv.as_slice(), ciphertext.as_slice()]);

        let mut out = Vec::with_capacity(digest.len() + CBC_IV_LENGTH + ciphertext.len());
        out.extend_from_slice(&digest);
        if frame_iv {
            out.extend_from_slice(&iv);
        }
        out.extend_from_slice(&ciphertext);
        debug_assert!(out.len() <= self.encryption_capacity(bytes.len()));
        Ok(out)
    }
}

impl Decrypter for HmacCrypto {
    fn decrypt(&mut self, bytes: &[u8], flags: Option<&CryptoFlags<'_>>) -> Result<Vec<u8>> {
        let digest_len = self.digest_length();
        if bytes.len() < digest_len {
            return Err(ProtocolError::AuthenticationFailure);
        }
        let (digest, rest) = bytes.split_at(digest_len);

        match &self.cipher_key {
            None => {
                self.mac.verify(&[rest], digest)?;
                Ok(rest.to_vec())
            }
            Some(key) => {
                let (iv, ciphertext): (&[u8], &[u8]) = match flags.and_then(|f| f.iv) {
                    Some(explicit) => (explicit, rest),
                    None => {
                        if rest.len() < CBC_IV_LENGTH {
                            return Err(ProtocolError::AuthenticationFailure);
                        }
                        rest.split_at(CBC_IV_LENGTH)
                    }
                };
                self.mac.verify(&[iv, ciphertext], digest)?;
                Aes256CbcDec::new_from_slices(key.as_slice(), iv)
                    .map_err(|_| ProtocolError::DecryptionFailure)?
                    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                    .map_err(|_| ProtocolError::DecryptionFailure)
            }
        }
    }

    fn verify(&mut self, bytes: &[u8], flags: Option<&CryptoFlags<'_>>) -> Result<()> {
        let digest_len = self.digest_length();
        if bytes.len() < digest_len {
            return Err(ProtocolError::AuthenticationFailure);
        }
        let (digest, rest) = bytes.split_at(digest_len);

        match &self.cipher_key {
            None => self.mac.verify(&[rest], digest),
            Some(_) => match flags.and_then(|f| f.iv) {
                Some(explicit) => self.mac.verify(&[explicit, rest], digest),
                None => {
                    if rest.len() < CBC_IV_LENGTH {
                        return Err(ProtocolError::AuthenticationFailure);
                    }
                    let (iv, ciphertext) = rest.split_at(CBC_IV_LENGTH);
                    self.mac.verify(&[iv, ciphertext], digest)
                }
            },
        }
    }
}
