//! # Core Codec Components
//!
//! Low-level buffers, header codec, and stream framing.
//!
//! ## Components
//! - **Buffer**: zero-on-discard byte buffer for key material
//! - **Wire**: opcode/key byte, session id, and DATA_V2 word codec
//! - **Stream**: length-prefixed TCP reassembly with obfuscation
//! - **Codec**: tokio-util framing adapter over the stream logic
//!
//! ## Security
//! - Length validation before every field read; untrusted input cannot
//!   panic this layer
//! - Discarded buffer bytes are zeroed before memory is freed or reused

pub mod buffer;
pub mod codec;
pub mod stream;
pub mod wire;
