//! # Error Types
//!
//! Comprehensive error handling for the OpenVPN codec layer.
//!
//! This module defines all error variants that can occur while shaping and
//! protecting bytes, from buffer bounds violations to crypto failures on
//! untrusted wire input.
//!
//! ## Error Categories
//! - **Buffer Errors**: out-of-range reads/writes on owned buffers
//! - **Protocol Errors**: malformed headers, inconsistent declared lengths
//! - **Cryptographic Errors**: encryption, decryption, and authentication failures
//! - **Configuration Errors**: invalid or unparseable session configuration
//!
//! All errors implement `std::error::Error` for interoperability. Malformed
//! wire data must never crash the process: every decode path returns one of
//! these variants and leaves the discard decision to the caller.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Control-channel parsing errors
    pub const ERR_MISSING_OPCODE: &str = "Missing opcode";
    pub const ERR_UNKNOWN_OPCODE: &str = "Unknown opcode";
    pub const ERR_MISSING_SESSION_ID: &str = "Missing session id";
    pub const ERR_MISSING_ACK_COUNT: &str = "Missing ack count";
    pub const ERR_MISSING_ACKS: &str = "Missing acks";
    pub const ERR_MISSING_REMOTE_SESSION_ID: &str = "Missing ack remote session id";
    pub const ERR_MISSING_PACKET_ID: &str = "Missing packet id";
    pub const ERR_ACK_WITHOUT_IDS: &str = "Ack packet without ids";
    pub const ERR_NOT_A_CONTROL_PACKET: &str = "Opcode is not a control opcode";
    pub const ERR_TRAILING_BYTES: &str = "Unexpected trailing bytes";
    pub const ERR_MISSING_PREAMBLE: &str = "Missing authentication preamble";
    pub const ERR_MISSING_AD_TAG: &str = "Missing AD+TAG";

    /// Data-channel parsing errors
    pub const ERR_DATA_HEADER_SHORT: &str = "Data packet header too short";
    pub const ERR_NOT_A_DATA_PACKET: &str = "Opcode is not a data opcode";
    pub const ERR_DATA_FRAME_SHORT: &str = "Data frame shorter than packet id";
    pub const ERR_UNSUPPORTED_COMPRESSION: &str = "Unsupported compression header";
    pub const ERR_NO_COMPRESSION_PROVIDER: &str = "No compression provider configured";

    /// Buffer errors
    pub const ERR_NO_TERMINATOR: &str = "No null terminator within bounds";

    /// Wire-header errors
    pub const ERR_PEER_ID_RANGE: &str = "Peer id exceeds 24 bits";
    pub const ERR_HEADER_SHORT: &str = "Header too short";
    pub const ERR_SWAP_DESTINATION_SHORT: &str = "Swap destination smaller than source";
}

/// Primary error type for all codec operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Transport failure surfaced through the framed codec adapter.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read or write fell outside the bounds of an owned buffer.
    #[error("Buffer access out of range")]
    OutOfRange,

    /// Wire data failed structural validation (header/length inconsistency,
    /// insufficient bytes for a declared field).
    #[error("Malformed packet: {0}")]
    Malformed(&'static str),

    #[error("Encryption failed")]
    EncryptionFailure,

    #[error("Decryption failed")]
    DecryptionFailure,

    /// Tag or HMAC mismatch, or a replayed packet id.
    #[error("Authentication failed")]
    AuthenticationFailure,

    /// Compression collaborator rejected the payload.
    #[error("Compression failed")]
    CompressionFailure,

    #[error("Decompression failed")]
    DecompressionFailure,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
