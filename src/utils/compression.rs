//! # Compression Collaborator Seam
//!
//! Payload compression is outside this layer: the data channel only needs to
//! hand LZO-compressed payloads to something that can inflate them, and the
//! session above decides whether outbound payloads get compressed at all.
//!
//! [`CompressionProvider`] is that seam. The crate ships only the
//! [`NoCompression`] passthrough; real providers (LZO for interop with
//! stock servers) live with the session layer. Providers must enforce their
//! own decompressed-size limits; a decompression bomb from the wire is the
//! provider's to reject.

use crate::error::Result;

/// Compress/decompress collaborator consumed by the data channel.
pub trait CompressionProvider: Send + Sync {
    /// Compress `data`, returning the compressed bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::CompressionFailure` if compression fails.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress `data`, returning the original bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::DecompressionFailure` if the input is invalid
    /// or inflates past the provider's size limit.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Identity provider for sessions negotiated without compression.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompression;

impl CompressionProvider for NoCompression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}
