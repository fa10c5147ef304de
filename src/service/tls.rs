//! TLS channel collaborator interface.
//!
//! The control channel's TLS handshake is out of scope for the codec: the
//! session layer owns a TLS implementation and exposes it through this
//! trait as an opaque byte-stream pump. Control-channel payloads written
//! with `put_plaintext` come back out of `pull_ciphertext` wrapped for the
//! wire, and vice versa.

use crate::error::Result;

/// Opaque TLS byte-stream channel.
///
/// Pull methods return `None` when the channel has nothing buffered; that is
/// not an error, just an empty pump cycle.
pub trait TlsChannel: Send {
    /// Begin (or restart) the handshake.
    fn start(&mut self) -> Result<()>;

    /// True once the handshake has completed.
    fn is_connected(&self) -> bool;

    /// Feed wire-side ciphertext received from the peer.
    fn put_ciphertext(&mut self, data: &[u8]) -> Result<()>;

    /// Drain ciphertext that must be sent to the peer.
    fn pull_ciphertext(&mut self) -> Result<Option<Vec<u8>>>;

    /// Feed application plaintext to protect.
    fn put_plaintext(&mut self, data: &[u8]) -> Result<()>;

    /// Drain decrypted application plaintext.
    fn pull_plaintext(&mut self) -> Result<Option<Vec<u8>>>;
}
