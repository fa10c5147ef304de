//! # Configuration Management
//!
//! Centralized configuration for the codec layer.
//!
//! This module provides structured session configuration (cipher suite,
//! control-channel digest, obfuscation method, compression framing, peer
//! id) as negotiated or provisioned by the layer above.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//!
//! Parsing is lenient (unknown suites load fine) but `validate()` rejects
//! anything the codec cannot actually instantiate, so callers can fail fast
//! before touching the network.

use crate::core::wire::PeerId;
use crate::crypto::{CryptoSuite, DigestAlgorithm};
use crate::error::{ProtocolError, Result};
use crate::obfuscation::XorMethod;
use crate::protocol::data::CompressionFraming;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Largest payload a TCP frame can carry (16-bit length prefix).
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

/// Full session configuration for one tunnel.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SessionConfig {
    /// Data-channel cipher and control-channel digest selection
    #[serde(default)]
    pub crypto: CryptoConfig,

    /// Obfuscation method applied to every wire packet
    #[serde(default)]
    pub obfuscation: ObfuscationConfig,

    /// Data-channel framing options
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CryptoConfig {
    /// Data-channel suite: `aes-256-gcm`, `chacha20-poly1305`,
    /// or `aes-256-cbc-hmac-sha256`
    #[serde(default = "default_suite")]
    pub suite: String,

    /// Control-channel HMAC digest: `sha256` or `sha512`
    #[serde(default = "default_digest")]
    pub digest: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObfuscationConfig {
    /// `none`, `xormask`, `xorptrpos`, `reverse`, or `obfuscate`
    #[serde(default = "default_method")]
    pub method: String,

    /// Hex-encoded mask for `xormask` and `obfuscate`
    #[serde(default)]
    pub mask: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// 24-bit DATA_V2 peer id; omit for legacy DATA_V1 framing
    #[serde(default)]
    pub peer_id: Option<u32>,

    /// `disabled`, `comp-lzo`, or `compress`
    #[serde(default = "default_framing")]
    pub compression_framing: String,
}

fn default_suite() -> String {
    "aes-256-gcm".to_string()
}

fn default_digest() -> String {
    "sha256".to_string()
}

fn default_method() -> String {
    "none".to_string()
}

fn default_framing() -> String {
    "disabled".to_string()
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            suite: default_suite(),
            digest: default_digest(),
        }
    }
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            mask: String::new(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            peer_id: None,
            compression_framing: default_framing(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config = toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject anything the codec cannot instantiate.
    pub fn validate(&self) -> Result<()> {
        self.crypto_suite()?;
        self.control_digest()?;
        self.xor_method()?;
        self.compression_framing()?;
        self.peer_id()?;
        Ok(())
    }

    /// Resolve the configured data-channel suite.
    pub fn crypto_suite(&self) -> Result<CryptoSuite> {
        match self.crypto.suite.as_str() {
            "aes-256-gcm" => Ok(CryptoSuite::Aes256Gcm),
            "chacha20-poly1305" => Ok(CryptoSuite::ChaCha20Poly1305),
            "aes-256-cbc-hmac-sha256" => Ok(CryptoSuite::Aes256CbcHmacSha256),
            other => Err(ProtocolError::ConfigError(format!(
                "Unknown cipher suite: {other}"
            ))),
        }
    }

    /// Resolve the configured control-channel digest.
    pub fn control_digest(&self) -> Result<DigestAlgorithm> {
        match self.crypto.digest.as_str() {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            other => Err(ProtocolError::ConfigError(format!(
                "Unknown digest: {other}"
            ))),
        }
    }

    /// Resolve the configured obfuscation method.
    pub fn xor_method(&self) -> Result<XorMethod> {
        let mask = || {
            hex::decode(&self.obfuscation.mask)
                .map_err(|e| ProtocolError::ConfigError(format!("Invalid xor mask hex: {e}")))
        };
        match self.obfuscation.method.as_str() {
            "none" => Ok(XorMethod::None),
            "xormask" => Ok(XorMethod::Mask(mask()?)),
            "xorptrpos" => Ok(XorMethod::Ptrpos),
            "reverse" => Ok(XorMethod::Reverse),
            "obfuscate" => Ok(XorMethod::Obfuscate(mask()?)),
            other => Err(ProtocolError::ConfigError(format!(
                "Unknown obfuscation method: {other}"
            ))),
        }
    }

    /// Resolve the configured compression framing.
    pub fn compression_framing(&self) -> Result<CompressionFraming> {
        match self.data.compression_framing.as_str() {
            "disabled" => Ok(CompressionFraming::Disabled),
            "comp-lzo" => Ok(CompressionFraming::CompLzo),
            "compress" => Ok(CompressionFraming::Compress),
            other => Err(ProtocolError::ConfigError(format!(
                "Unknown compression framing: {other}"
            ))),
        }
    }

    /// Resolve the configured peer id, defaulting to disabled (DATA_V1).
    pub fn peer_id(&self) -> Result<PeerId> {
        match self.data.peer_id {
            None => Ok(PeerId::DISABLED),
            Some(value) => PeerId::new(value)
                .map_err(|_| ProtocolError::ConfigError(format!("Invalid peer id: {value:#x}"))),
        }
    }
}
