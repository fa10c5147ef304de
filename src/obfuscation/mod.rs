//! # Traffic Obfuscation
//!
//! Reversible, non-cryptographic transforms that defeat protocol
//! fingerprinting. Obfuscation hides the OpenVPN packet shape from
//! middleboxes; it is not a security mechanism and adds no confidentiality.
//!
//! The selected method must be configured identically on both ends of a
//! session or every packet decodes to garbage with no error signal.

pub mod xor;

pub use xor::{Direction, XorMethod};
