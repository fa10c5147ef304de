//! # Data Channel
//!
//! Per-peer encrypt/decrypt of tunnel payloads, including the legacy
//! compression-header quirks of the wire format.
//!
//! ## Wire Format
//! ```text
//! DATA_V1: [ opcode/key(1) ]                 [ crypto box output ]
//! DATA_V2: [ opcode/key(1) ][ peer id(3) ]   [ crypto box output ]
//! ```
//! The box output decrypts to `packet_id(4) ‖ [compression byte] ‖ payload`.
//! The packet id doubles as the replay id; the wire format carries no
//! timestamp.
//!
//! ## Compression Headers
//! - `0xFA`: uncompressed
//! - `0xFB`: uncompressed, first two payload bytes swapped (legacy quirk)
//! - `0x66`: LZO-compressed, handed to the compression collaborator
//! - v2 framing: payloads normally carry no marker; a leading `0x50` is an
//!   escape whose second byte `0x00` means uncompressed
//!
//! Keys are replaced wholesale on rekey: build a fresh `DataChannel` and
//! drop this one; never mutate keys in place.

use tracing::{trace, warn};

use crate::core::wire::{
    self, PacketCode, OPCODE_LENGTH, PACKET_ID_LENGTH, PEER_ID_LENGTH, PeerId,
};
use crate::crypto::{
    Crypto, CryptoBox, CryptoFlags, CryptoOptions, CryptoSuite, Decrypter, Encrypter,
};
use crate::error::{constants, ProtocolError, Result};
use crate::utils::compression::CompressionProvider;
use crate::utils::metrics::global_metrics;

/// Uncompressed payload marker (comp-lzo framing).
pub const DATA_PACKET_NO_COMPRESS: u8 = 0xfa;
/// Uncompressed payload with the first two bytes swapped.
pub const DATA_PACKET_NO_COMPRESS_SWAP: u8 = 0xfb;
/// LZO-compressed payload marker.
pub const DATA_PACKET_LZO_COMPRESS: u8 = 0x66;
/// Escape marker of the v2 compression framing.
pub const DATA_PACKET_V2_INDICATOR: u8 = 0x50;
/// "Uncompressed" algorithm byte after a v2 escape.
pub const DATA_PACKET_V2_UNCOMPRESSED: u8 = 0x00;

/// Payload of an OpenVPN keepalive ping, bit-exact.
pub const DATA_PACKET_PING: [u8; 16] = [
    0x2a, 0x18, 0x7b, 0xf3, 0x64, 0x1e, 0xb4, 0xcb, 0x07, 0xed, 0x2d, 0x0a, 0x98, 0x1f, 0xc7,
    0x48,
];

/// Negotiated compression framing of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionFraming {
    /// No compression byte on the wire at all.
    #[default]
    Disabled,
    /// One marker byte per packet (`--comp-lzo`).
    CompLzo,
    /// v2 framing (`--compress`): marker only as an escape.
    Compress,
}

/// Per-peer data-channel state: peer id, crypto boxes, compression framing.
pub struct DataChannel {
    peer_id: PeerId,
    encrypter: Box<dyn Encrypter>,
    decrypter: Box<dyn Decrypter>,
    framing: CompressionFraming,
    compressor: Option<Box<dyn CompressionProvider>>,
}

impl DataChannel {
    /// Configure a channel from negotiated key material.
    ///
    /// A disabled `peer_id` selects legacy DATA_V1 framing; any other value
    /// selects DATA_V2 multiplexing.
    pub fn new(
        peer_id: PeerId,
        suite: CryptoSuite,
        options: CryptoOptions,
        framing: CompressionFraming,
        compressor: Option<Box<dyn CompressionProvider>>,
    ) -> Result<Self> {
        let (encrypter, decrypter) = CryptoBox::configure(suite, options)?;
        Ok(Self {
            peer_id,
            encrypter,
            decrypter,
            framing,
            compressor,
        })
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Wire-header length for this channel's framing.
    pub fn header_length(&self) -> usize {
        if self.peer_id.is_disabled() {
            OPCODE_LENGTH
        } else {
            OPCODE_LENGTH + PEER_ID_LENGTH
        }
    }

    /// Destination sizing for an encrypted payload of `length` bytes.
    pub fn encryption_capacity(&self, length: usize) -> usize {
        self.encrypter.encryption_capacity(length)
    }

    /// True when a decrypted payload is the keepalive ping.
    pub fn is_ping(payload: &[u8]) -> bool {
        payload == DATA_PACKET_PING.as_slice()
    }

    /// Assemble the pre-encryption frame: wire header, packet id,
    /// compression byte per framing, payload.
    pub fn assemble_data_packet(&self, key: u8, packet_id: u32, payload: &[u8]) -> Result<Vec<u8>> {
        let header_length = self.header_length();
        let mut frame =
            vec![0u8; header_length + PACKET_ID_LENGTH + 2 + payload.len()];

        let written = if self.peer_id.is_disabled() {
            wire::write_header(&mut frame, PacketCode::DataV1, key, None)?
        } else {
            wire::write_data_v2_header(&mut frame, key, self.peer_id)?
        };
        debug_assert_eq!(written, header_length);

        let mut offset = header_length;
        frame[offset..offset + PACKET_ID_LENGTH].copy_from_slice(&packet_id.to_be_bytes());
        offset += PACKET_ID_LENGTH;

        match self.framing {
            CompressionFraming::Disabled => {}
            CompressionFraming::CompLzo => {
                frame[offset] = DATA_PACKET_NO_COMPRESS;
                offset += 1;
            }
            CompressionFraming::Compress => {
                // Escape payloads whose first byte collides with the marker.
                if payload.first() == Some(&DATA_PACKET_V2_INDICATOR) {
                    frame[offset] = DATA_PACKET_V2_INDICATOR;
                    frame[offset + 1] = DATA_PACKET_V2_UNCOMPRESSED;
                    offset += 2;
                }
            }
        }

        frame[offset..offset + payload.len()].copy_from_slice(payload);
        frame.truncate(offset + payload.len());
        Ok(frame)
    }

    /// Encrypt an assembled frame into a wire packet.
    ///
    /// The frame's wire header stays cleartext (and, for AEAD suites, is the
    /// associated data); everything after it is encrypted. The packet id is
    /// the replay id and is covered by the authentication.
    pub fn encrypted_data_packet(
        &mut self,
        key: u8,
        packet_id: u32,
        frame: &[u8],
    ) -> Result<Vec<u8>> {
        let header_length = self.header_length();
        if frame.len() < header_length + PACKET_ID_LENGTH {
            return Err(ProtocolError::Malformed(constants::ERR_DATA_FRAME_SHORT));
        }
        trace!(key, packet_id, "sealing data packet");

        let (header, plaintext) = frame.split_at(header_length);
        let flags = CryptoFlags {
            ad: Some(header),
            ..Default::default()
        };
        let sealed = self.encrypter.encrypt(plaintext, Some(&flags))?;

        let mut out = Vec::with_capacity(header_length + sealed.len());
        out.extend_from_slice(header);
        out.extend_from_slice(&sealed);
        global_metrics().data_sealed();
        Ok(out)
    }

    /// Decrypt a wire packet into `(plain frame, packet id)`.
    ///
    /// The plain frame still leads with the packet id; feed it to
    /// [`parse_payload`](Self::parse_payload) to strip framing.
    pub fn decrypt_data_packet(&mut self, packet: &[u8]) -> Result<(Vec<u8>, u32)> {
        let (code_raw, _key) = wire::read_opcode_key(packet).map_err(|_| {
            global_metrics().malformed_discard();
            ProtocolError::Malformed(constants::ERR_DATA_HEADER_SHORT)
        })?;
        let header_length = match PacketCode::from_byte(code_raw) {
            Some(PacketCode::DataV1) => OPCODE_LENGTH,
            Some(PacketCode::DataV2) => {
                let peer_id = wire::read_data_v2_peer_id(packet).map_err(|e| {
                    global_metrics().malformed_discard();
                    e
                })?;
                trace!(peer_id, "DATA_V2 packet");
                OPCODE_LENGTH + PEER_ID_LENGTH
            }
            _ => {
                global_metrics().malformed_discard();
                return Err(ProtocolError::Malformed(constants::ERR_NOT_A_DATA_PACKET));
            }
        };
        if packet.len() <= header_length {
            global_metrics().malformed_discard();
            return Err(ProtocolError::Malformed(constants::ERR_DATA_HEADER_SHORT));
        }

        let (header, sealed) = packet.split_at(header_length);
        let flags = CryptoFlags {
            ad: Some(header),
            ..Default::default()
        };
        let plain = self
            .decrypter
            .decrypt(sealed, Some(&flags))
            .inspect_err(|_| {
                warn!("data packet failed authentication");
                global_metrics().auth_failure();
            })?;

        if plain.len() < PACKET_ID_LENGTH {
            global_metrics().malformed_discard();
            return Err(ProtocolError::Malformed(constants::ERR_DATA_FRAME_SHORT));
        }
        let packet_id = u32::from_be_bytes([plain[0], plain[1], plain[2], plain[3]]);
        global_metrics().data_opened();
        Ok((plain, packet_id))
    }

    /// Strip the leading packet id and compression framing from a decrypted
    /// frame, returning `(payload, compression marker)`.
    ///
    /// LZO-compressed payloads are inflated through the compression
    /// collaborator.
    pub fn parse_payload(&self, frame: &[u8]) -> Result<(Vec<u8>, Option<u8>)> {
        if frame.len() < PACKET_ID_LENGTH {
            return Err(ProtocolError::Malformed(constants::ERR_DATA_FRAME_SHORT));
        }
        let rest = &frame[PACKET_ID_LENGTH..];

        match self.framing {
            CompressionFraming::Disabled => Ok((rest.to_vec(), None)),
            CompressionFraming::CompLzo => {
                let marker = *rest.first().ok_or(ProtocolError::Malformed(
                    constants::ERR_DATA_FRAME_SHORT,
                ))?;
                let body = &rest[1..];
                match marker {
                    DATA_PACKET_NO_COMPRESS => Ok((body.to_vec(), Some(marker))),
                    DATA_PACKET_NO_COMPRESS_SWAP => {
                        if body.len() < 2 {
                            return Err(ProtocolError::Malformed(
                                constants::ERR_UNSUPPORTED_COMPRESSION,
                            ));
                        }
                        let mut payload = body.to_vec();
                        payload.swap(0, 1);
                        Ok((payload, Some(marker)))
                    }
                    DATA_PACKET_LZO_COMPRESS => {
                        let compressor = self.compressor.as_deref().ok_or_else(|| {
                            warn!("{}", constants::ERR_NO_COMPRESSION_PROVIDER);
                            ProtocolError::DecompressionFailure
                        })?;
                        Ok((compressor.decompress(body)?, Some(marker)))
                    }
                    _ => Err(ProtocolError::Malformed(
                        constants::ERR_UNSUPPORTED_COMPRESSION,
                    )),
                }
            }
            CompressionFraming::Compress => {
                if rest.first() == Some(&DATA_PACKET_V2_INDICATOR) {
                    if rest.len() < 2 || rest[1] != DATA_PACKET_V2_UNCOMPRESSED {
                        return Err(ProtocolError::Malformed(
                            constants::ERR_UNSUPPORTED_COMPRESSION,
                        ));
                    }
                    Ok((rest[2..].to_vec(), Some(DATA_PACKET_V2_INDICATOR)))
                } else {
                    Ok((rest.to_vec(), None))
                }
            }
        }
    }
}

impl std::fmt::Debug for DataChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataChannel")
            .field("peer_id", &self.peer_id)
            .field("framing", &self.framing)
            .finish_non_exhaustive()
    }
}
