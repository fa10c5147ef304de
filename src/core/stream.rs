//! # TCP Packet Stream
//!
//! Reassembles a length-prefixed TCP byte stream into discrete packets and
//! frames packets back into a stream.
//!
//! ## Wire Format
//! ```text
//! [ length(2, network order) ][ payload(length) ]  repeated
//! ```
//! Both the length prefix and the payload are obfuscated on the wire, each
//! as its own transform unit, so frames stay incrementally parseable under
//! every method while the prefix never travels in the clear. The same
//! method and mask must be configured symmetrically per session.
//!
//! The receive accumulator is external state owned by the caller: feed the
//! buffered bytes in, drop `bytes_consumed` from the front, retry when more
//! arrive. Nothing here blocks.

use crate::config::MAX_FRAME_SIZE;
use crate::error::{ProtocolError, Result};
use crate::obfuscation::{Direction, XorMethod};

/// Length-prefix size on the wire.
const LENGTH_PREFIX: usize = 2;

/// Stateless reassembly and framing over caller-owned buffers.
pub struct PacketStream;

impl PacketStream {
    /// Extract every complete packet currently available in `stream`.
    ///
    /// Returns the de-obfuscated packets in order and the number of bytes
    /// consumed. A trailing partial frame (incomplete prefix or payload)
    /// consumes nothing; the caller keeps those bytes for the next read.
    pub fn packets_from_inbound_stream(
        stream: &[u8],
        method: &XorMethod,
    ) -> (Vec<Vec<u8>>, usize) {
        let mut packets = Vec::new();
        let mut consumed = 0;

        loop {
            let remaining = &stream[consumed..];
            if remaining.len() < LENGTH_PREFIX {
                break;
            }
            let mut prefix = [remaining[0], remaining[1]];
            method.process(&mut prefix, Direction::Inbound);
            let length = u16::from_be_bytes(prefix) as usize;

            if remaining.len() < LENGTH_PREFIX + length {
                break;
            }
            let mut packet = remaining[LENGTH_PREFIX..LENGTH_PREFIX + length].to_vec();
            method.process(&mut packet, Direction::Inbound);
            packets.push(packet);
            consumed += LENGTH_PREFIX + length;
        }

        (packets, consumed)
    }

    /// Frame one packet for the wire: obfuscated 2-byte length prefix
    /// followed by the obfuscated payload.
    pub fn outbound_stream_from_packet(packet: &[u8], method: &XorMethod) -> Result<Vec<u8>> {
        if packet.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::OutOfRange);
        }

        let mut out = Vec::with_capacity(LENGTH_PREFIX + packet.len());
        let mut prefix = (packet.len() as u16).to_be_bytes();
        method.process(&mut prefix, Direction::Outbound);
        out.extend_from_slice(&prefix);

        let mut body = packet.to_vec();
        method.process(&mut body, Direction::Outbound);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Frame a batch of packets into one contiguous stream.
    pub fn outbound_stream_from_packets<P: AsRef<[u8]>>(
        packets: &[P],
        method: &XorMethod,
    ) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for packet in packets {
            out.extend_from_slice(&Self::outbound_stream_from_packet(
                packet.as_ref(),
                method,
            )?);
        }
        Ok(out)
    }
}
