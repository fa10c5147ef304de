//! # Framed Codec Adapter
//!
//! `tokio_util` codec implementation over [`PacketStream`]'s framing, for
//! callers that drive a TCP transport with `Framed`. The codec carries the
//! session's obfuscation method so the length prefix and payload are shaped
//! exactly as [`PacketStream`] would shape them.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::MAX_FRAME_SIZE;
use crate::error::ProtocolError;
use crate::obfuscation::{Direction, XorMethod};

/// Length-prefixed, obfuscated packet framing for byte streams.
#[derive(Debug, Default, Clone)]
pub struct ObfuscatedPacketCodec {
    method: XorMethod,
}

impl ObfuscatedPacketCodec {
    pub fn new(method: XorMethod) -> Self {
        Self { method }
    }
}

impl Decoder for ObfuscatedPacketCodec {
    type Item = Vec<u8>;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 2 {
            return Ok(None);
        }
        let mut prefix = [src[0], src[1]];
        self.method.process(&mut prefix, Direction::Inbound);
        let length = u16::from_be_bytes(prefix) as usize;

        if src.len() < 2 + length {
            // Partial frame; reserve what the rest needs and wait.
            src.reserve(2 + length - src.len());
            return Ok(None);
        }

        src.advance(2);
        let mut packet = src.split_to(length).to_vec();
        self.method.process(&mut packet, Direction::Inbound);
        Ok(Some(packet))
    }
}

impl<'a> Encoder<&'a [u8]> for ObfuscatedPacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::OutOfRange);
        }
        dst.reserve(2 + item.len());

        let mut prefix = (item.len() as u16).to_be_bytes();
        self.method.process(&mut prefix, Direction::Outbound);
        dst.put_slice(&prefix);

        let mut body = item.to_vec();
        self.method.process(&mut body, Direction::Outbound);
        dst.put_slice(&body);
        Ok(())
    }
}
