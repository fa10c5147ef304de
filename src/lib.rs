//! # openvpn-protocol
//!
//! OpenVPN wire-protocol codec and cryptographic transform core for VPN
//! clients: control-channel handshake framing, data-channel tunnel payload
//! protection, and selectable reversible obfuscation against protocol
//! fingerprinting.
//!
//! ## Components
//! - **[`core`]**: secure buffers, the opcode/session-id/DATA_V2 header
//!   codec, and length-prefixed TCP stream reassembly
//! - **[`crypto`]**: cipher+HMAC and AEAD transform suites behind
//!   capability traits
//! - **[`obfuscation`]**: four bit-exact reversible XOR methods
//! - **[`protocol`]**: [`protocol::ControlPacket`] with its plain, HMAC, and
//!   AEAD serializations, and the per-peer [`protocol::DataChannel`]
//! - **[`service`]**, **[`utils`]**: collaborator seams (TLS, compression)
//!   and supporting utilities
//!
//! ## Scope
//! Everything here is a synchronous, non-blocking transform over
//! caller-owned buffers. TLS handshaking, compression algorithms, TUN/TAP
//! I/O, and the session/rekey state machine are collaborators above this
//! layer: this crate decides how bytes are shaped and protected, never when
//! to rekey, retry, or reconnect.
//!
//! ## Security
//! - Malformed wire data returns an error, never panics
//! - Tag and HMAC comparisons are constant-time
//! - Key material lives in zero-on-discard buffers

pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod obfuscation;
pub mod protocol;
pub mod service;
pub mod utils;

pub use crate::config::SessionConfig;
pub use crate::core::buffer::SecureBuffer;
pub use crate::core::codec::ObfuscatedPacketCodec;
pub use crate::core::stream::PacketStream;
pub use crate::core::wire::{PacketCode, PeerId};
pub use crate::crypto::{
    AeadCipher, Crypto, CryptoBox, CryptoFlags, CryptoOptions, CryptoSuite, Decrypter,
    DigestAlgorithm, Encrypter,
};
pub use crate::error::{ProtocolError, Result};
pub use crate::obfuscation::{Direction, XorMethod};
pub use crate::protocol::{
    AuthSerializer, CompressionFraming, ControlChannelSerializer, ControlPacket, CryptSerializer,
    DataChannel, PlainSerializer,
};
pub use crate::service::TlsChannel;
pub use crate::utils::{CompressionProvider, NoCompression};
