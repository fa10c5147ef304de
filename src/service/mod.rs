//! # External Collaborators
//!
//! Interfaces this layer consumes but does not implement. TLS handshaking
//! and certificate validation live entirely behind [`tls::TlsChannel`]; the
//! codec only shuttles opaque ciphertext and plaintext through it.

pub mod tls;

pub use tls::TlsChannel;
