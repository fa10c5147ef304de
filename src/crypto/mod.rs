//! # Cryptographic Transform Layer
//!
//! Cipher+HMAC and AEAD abstractions over the data- and control-channel
//! payloads.
//!
//! ## Components
//! - **Capability traits**: [`Crypto`], [`Encrypter`], [`Decrypter`], the
//!   seams the packet serializers dispatch through. Two concrete families
//!   implement them: the HMAC suite ([`hmac::HmacCrypto`]) and the AEAD
//!   suite ([`aead::AeadCrypto`]), selected at session configuration.
//! - **[`CryptoFlags`]**: optional explicit IV and associated data, plus a
//!   testing flag for deterministic IV generation.
//! - **[`CryptoBox`]**: factory pairing one `Encrypter` and one `Decrypter`
//!   from a suite and directional key material.
//!
//! ## Security
//! - Key material lives in [`SecureBuffer`] and is zeroed on drop.
//! - Tag/HMAC comparison is constant-time.
//! - One `Encrypter` and one `Decrypter` per direction per session; replace
//!   both wholesale on rekey, never mutate keys in place.

pub mod aead;
pub mod hmac;

use crate::core::buffer::SecureBuffer;
use crate::error::Result;

pub use aead::{AeadCipher, AeadCrypto};
pub use hmac::{DigestAlgorithm, HmacCrypto};

/// Largest cipher block size across supported suites (AES).
pub const MAX_BLOCK_SIZE: usize = 16;

/// Optional per-call parameters for encrypt/decrypt/verify.
#[derive(Debug, Clone, Copy, Default)]
pub struct CryptoFlags<'a> {
    /// Explicit IV/nonce. When set on encrypt, the IV is not framed into the
    /// output and the caller must supply the same IV to decrypt. When absent,
    /// the encrypter generates a fresh IV and frames it.
    pub iv: Option<&'a [u8]>,
    /// Associated data authenticated but not encrypted (AEAD suites).
    pub ad: Option<&'a [u8]>,
    /// Generate deterministic (counter-based) IVs instead of random ones.
    /// Test vectors only; never enable on a live session.
    pub for_testing: bool,
}

/// Sizing and suite metadata shared by both directions.
pub trait Crypto {
    /// HMAC digest length, 0 when the suite has no digest.
    fn digest_length(&self) -> usize;

    /// AEAD tag length, 0 when the suite has no tag.
    fn tag_length(&self) -> usize;

    /// Fixed framing overhead (IV plus digest or tag).
    fn overhead(&self) -> usize;

    /// Destination sizing for an encrypted payload of `length` bytes.
    ///
    /// Callers must size output buffers with this formula; producing more
    /// than this is a fatal implementation error, and the concrete suites
    /// debug-assert against it.
    fn encryption_capacity(&self, length: usize) -> usize {
        2 * length + MAX_BLOCK_SIZE + self.overhead()
    }
}

/// Outbound half of a crypto suite.
pub trait Encrypter: Crypto + Send {
    /// Encrypt (or, for digest-only suites, authenticate) `bytes`.
    ///
    /// Fails with `ProtocolError::EncryptionFailure` on cipher failure.
    fn encrypt(&mut self, bytes: &[u8], flags: Option<&CryptoFlags<'_>>) -> Result<Vec<u8>>;
}

/// Inbound half of a crypto suite.
pub trait Decrypter: Crypto + Send {
    /// Invert [`Encrypter::encrypt`].
    ///
    /// Fails with `ProtocolError::AuthenticationFailure` on tag/HMAC
    /// mismatch (constant-time comparison) and
    /// `ProtocolError::DecryptionFailure` on cipher rejection.
    fn decrypt(&mut self, bytes: &[u8], flags: Option<&CryptoFlags<'_>>) -> Result<Vec<u8>>;

    /// Authentication-only check with no plaintext output; used to cheaply
    /// reject forged packets before decryption where the suite allows it.
    fn verify(&mut self, bytes: &[u8], flags: Option<&CryptoFlags<'_>>) -> Result<()>;
}

/// Cipher/digest suite selected at session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoSuite {
    /// HMAC-SHA256 authentication, no cipher.
    HmacSha256,
    /// HMAC-SHA512 authentication, no cipher.
    HmacSha512,
    /// AES-256-CBC with HMAC-SHA256 authentication.
    Aes256CbcHmacSha256,
    /// AES-256-GCM AEAD.
    Aes256Gcm,
    /// ChaCha20-Poly1305 AEAD.
    ChaCha20Poly1305,
}

/// Directional key material for a suite. Unused slots stay `None`
/// (digest-only suites take no cipher keys, AEAD suites take no HMAC keys).
///
/// Buffers are zeroed when the options are dropped.
#[derive(Debug, Default)]
pub struct CryptoOptions {
    pub cipher_enc_key: Option<SecureBuffer>,
    pub cipher_dec_key: Option<SecureBuffer>,
    pub hmac_enc_key: Option<SecureBuffer>,
    pub hmac_dec_key: Option<SecureBuffer>,
}

/// Factory for the per-direction transform pair of a session.
pub struct CryptoBox;

impl CryptoBox {
    /// Build the outbound `Encrypter` and inbound `Decrypter` for `suite`
    /// from directional key material.
    ///
    /// The returned boxes own their keys; dropping them zeroes the material.
    /// On rekey, configure a fresh pair and drop the old one only after any
    /// in-flight call on it has completed.
    pub fn configure(
        suite: CryptoSuite,
        options: CryptoOptions,
    ) -> Result<(Box<dyn Encrypter>, Box<dyn Decrypter>)> {
        match suite {
            CryptoSuite::HmacSha256 => Ok((
                Box::new(HmacCrypto::digest_only(
                    DigestAlgorithm::Sha256,
                    options.hmac_enc_key,
                )?),
                Box::new(HmacCrypto::digest_only(
                    DigestAlgorithm::Sha256,
                    options.hmac_dec_key,
                )?),
            )),
            CryptoSuite::HmacSha512 => Ok((
                Box::new(HmacCrypto::digest_only(
                    DigestAlgorithm::Sha512,
                    options.hmac_enc_key,
                )?),
                Box::new(HmacCrypto::digest_only(
                    DigestAlgorithm::Sha512,
                    options.hmac_dec_key,
                )?),
            )),
            CryptoSuite::Aes256CbcHmacSha256 => Ok((
                Box::new(HmacCrypto::with_cipher(
                    DigestAlgorithm::Sha256,
                    options.hmac_enc_key,
                    options.cipher_enc_key,
                )?),
                Box::new(HmacCrypto::with_cipher(
                    DigestAlgorithm::Sha256,
                    options.hmac_dec_key,
                    options.cipher_dec_key,
                )?),
            )),
            CryptoSuite::Aes256Gcm => Ok((
                Box::new(AeadCrypto::new(
                    AeadCipher::Aes256Gcm,
                    options.cipher_enc_key,
                )?),
                Box::new(AeadCrypto::new(
                    AeadCipher::Aes256Gcm,
                    options.cipher_dec_key,
                )?),
            )),
            CryptoSuite::ChaCha20Poly1305 => Ok((
                Box::new(AeadCrypto::new(
                    AeadCipher::ChaCha20Poly1305,
                    options.cipher_enc_key,
                )?),
                Box::new(AeadCrypto::new(
                    AeadCipher::ChaCha20Poly1305,
                    options.cipher_dec_key,
                )?),
            )),
        }
    }
}
