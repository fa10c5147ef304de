// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::core::buffer::SecureBuffer;
use crate::core::wire::{PacketCode, PeerId};
use crate::crypto::{AeadCipher, CryptoOptions, CryptoSuite, DigestAlgorithm};
use crate::error::ProtocolError;
use crate::protocol::control::{
    AuthSerializer, ControlChannelSerializer, ControlPacket, CryptSerializer, PlainSerializer,
};
use crate::protocol::data::{
    CompressionFraming, DataChannel, DATA_PACKET_LZO_COMPRESS, DATA_PACKET_NO_COMPRESS,
    DATA_PACKET_NO_COMPRESS_SWAP, DATA_PACKET_PING,
};
use crate::utils::compression::CompressionProvider;

fn hmac_options() -> CryptoOptions {
    CryptoOptions {
        hmac_enc_key: Some(SecureBuffer::from_slice(&[0x11u8; 32])),
        hmac_dec_key: Some(SecureBuffer::from_slice(&[0x11u8; 32])),
        ..Default::default()
    }
}

fn aead_options() -> CryptoOptions {
    CryptoOptions {
        cipher_enc_key: Some(SecureBuffer::from_slice(&[0x22u8; 32])),
        cipher_dec_key: Some(SecureBuffer::from_slice(&[0x22u8; 32])),
        ..Default::default()
    }
}

fn cbc_options() -> CryptoOptions {
    CryptoOptions {
        cipher_enc_key: Some(SecureBuffer::from_slice(&[0x33u8; 32])),
        cipher_dec_key: Some(SecureBuffer::from_slice(&[0x33u8; 32])),
        hmac_enc_key: Some(SecureBuffer::from_slice(&[0x44u8; 32])),
        hmac_dec_key: Some(SecureBuffer::from_slice(&[0x44u8; 32])),
    }
}

// ============================================================================
// PLAIN SERIALIZATION
// ============================================================================

#[test]
fn test_plain_serialization_vector() {
    // sessionId = 8 zero bytes, ControlV1, key 0, packetId 1,
    // payload [0x00, 0x01], no acks -> 15 bytes
    let packet = ControlPacket::new(
        PacketCode::ControlV1,
        0,
        [0u8; 8],
        1,
        Some(vec![0x00, 0x01]),
    );
    let raw = packet.serialized();
    assert_eq!(raw.len(), 15);
    assert_eq!(
        raw,
        vec![0x04 << 3, 0, 0, 0, 0, 0, 0, 0, 0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01]
    );
}

#[test]
fn test_plain_roundtrip_with_payload() {
    let mut serializer = PlainSerializer::new();
    let packet = ControlPacket::new(
        PacketCode::HardResetClientV2,
        3,
        *b"\x01\x02\x03\x04\x05\x06\x07\x08",
        42,
        Some(b"tls bytes".to_vec()),
    );
    let raw = serializer.serialize(&packet).unwrap();
    let parsed = serializer.deserialize(&raw).unwrap();
    assert_eq!(parsed, packet);
}

#[test]
fn test_plain_roundtrip_without_payload() {
    let mut serializer = PlainSerializer::new();
    let packet = ControlPacket::new(PacketCode::SoftResetV1, 7, [9u8; 8], 7, None);
    let raw = serializer.serialize(&packet).unwrap();
    let parsed = serializer.deserialize(&raw).unwrap();
    assert_eq!(parsed, packet);
    assert!(!parsed.is_ack());
}

#[test]
fn test_ack_roundtrip_preserves_order() {
    let mut serializer = PlainSerializer::new();
    let packet = ControlPacket::ack(1, [2u8; 8], vec![9, 3, 7, 1], [5u8; 8]);
    assert!(packet.is_ack());

    let raw = serializer.serialize(&packet).unwrap();
    // header(9) + count(1) + 4 ids(16) + remote session id(8)
    assert_eq!(raw.len(), 34);
    let parsed = serializer.deserialize(&raw).unwrap();
    assert_eq!(parsed.ack_ids, vec![9, 3, 7, 1]);
    assert_eq!(parsed, packet);
}

#[test]
fn test_parse_rejects_truncations() {
    let mut serializer = PlainSerializer::new();
    let packet = ControlPacket::new(PacketCode::ControlV1, 0, [0u8; 8], 1, Some(vec![0xaa]));
    let raw = serializer.serialize(&packet).unwrap();

    // Every prefix shorter than the minimal non-ack packet must fail
    // cleanly, never panic.
    for end in 0..13 {
        assert!(
            matches!(
                serializer.deserialize(&raw[..end]),
                Err(ProtocolError::Malformed(_))
            ),
            "prefix of {end} bytes not rejected"
        );
    }
}

#[test]
fn test_parse_rejects_unknown_opcode() {
    let mut serializer = PlainSerializer::new();
    let mut raw = vec![0x02 << 3];
    raw.extend_from_slice(&[0u8; 12]);
    assert!(matches!(
        serializer.deserialize(&raw),
        Err(ProtocolError::Malformed(_))
    ));
}

#[test]
fn test_parse_rejects_data_opcode() {
    let mut serializer = PlainSerializer::new();
    let mut raw = vec![0x06 << 3];
    raw.extend_from_slice(&[0u8; 12]);
    assert!(matches!(
        serializer.deserialize(&raw),
        Err(ProtocolError::Malformed(_))
    ));
}

#[test]
fn test_parse_rejects_ack_count_mismatch() {
    let mut serializer = PlainSerializer::new();
    // AckV1 header declaring 5 ids but carrying only one
    let mut raw = vec![0x05 << 3];
    raw.extend_from_slice(&[0u8; 8]);
    raw.push(5);
    raw.extend_from_slice(&1u32.to_be_bytes());
    assert!(matches!(
        serializer.deserialize(&raw),
        Err(ProtocolError::Malformed(_))
    ));
}

#[test]
fn test_parse_rejects_ack_without_ids() {
    let mut serializer = PlainSerializer::new();
    let mut raw = vec![0x05 << 3];
    raw.extend_from_slice(&[0u8; 8]);
    raw.push(0);
    raw.extend_from_slice(&[0u8; 8]);
    assert!(matches!(
        serializer.deserialize(&raw),
        Err(ProtocolError::Malformed(_))
    ));
}

#[test]
fn test_parse_rejects_trailing_bytes_after_ack() {
    let mut serializer = PlainSerializer::new();
    let packet = ControlPacket::ack(0, [0u8; 8], vec![1], [0u8; 8]);
    let mut raw = serializer.serialize(&packet).unwrap();
    raw.push(0xcc);
    assert!(matches!(
        serializer.deserialize(&raw),
        Err(ProtocolError::Malformed(_))
    ));
}

// ============================================================================
// HMAC-AUTHENTICATED SERIALIZATION
// ============================================================================

#[test]
fn test_auth_roundtrip() {
    let mut sender = AuthSerializer::new(DigestAlgorithm::Sha256, hmac_options()).unwrap();
    let mut receiver = AuthSerializer::new(DigestAlgorithm::Sha256, hmac_options()).unwrap();

    let packet = ControlPacket::new(
        PacketCode::ControlV1,
        2,
        [0xabu8; 8],
        100,
        Some(b"handshake payload".to_vec()),
    );
    let wire = sender.serialize(&packet).unwrap();
    // header(9) + replay(4) + timestamp(4) + digest(32) + pid(4) + payload
    assert_eq!(wire.len(), 9 + 4 + 4 + 32 + 4 + 17);
    let parsed = receiver.deserialize(&wire).unwrap();
    assert_eq!(parsed, packet);
}

#[test]
fn test_auth_roundtrip_ack() {
    let mut sender = AuthSerializer::new(DigestAlgorithm::Sha512, hmac_options()).unwrap();
    let mut receiver = AuthSerializer::new(DigestAlgorithm::Sha512, hmac_options()).unwrap();

    let packet = ControlPacket::ack(0, [1u8; 8], vec![4, 5], [2u8; 8]);
    let parsed = receiver
        .deserialize(&sender.serialize(&packet).unwrap())
        .unwrap();
    assert_eq!(parsed, packet);
}

#[test]
fn test_auth_wire_field_order() {
    let mut sender = AuthSerializer::new(DigestAlgorithm::Sha256, hmac_options()).unwrap();
    let packet = ControlPacket::new(PacketCode::ControlV1, 0, [7u8; 8], 1, None);
    let wire = sender.serialize(&packet).unwrap();

    // opcode/key then session id in the clear
    assert_eq!(wire[0], 0x04 << 3);
    assert_eq!(&wire[1..9], &[7u8; 8]);
    // first replay id is 1, big-endian, right after the prefix
    assert_eq!(&wire[9..13], &[0, 0, 0, 1]);
    // packet id rides after the digest
    assert_eq!(&wire[49..53], &[0, 0, 0, 1]);
}

#[test]
fn test_auth_rejects_tampered_payload() {
    let mut sender = AuthSerializer::new(DigestAlgorithm::Sha256, hmac_options()).unwrap();
    let mut receiver = AuthSerializer::new(DigestAlgorithm::Sha256, hmac_options()).unwrap();

    let packet = ControlPacket::new(PacketCode::ControlV1, 0, [0u8; 8], 1, Some(vec![0x55]));
    let mut wire = sender.serialize(&packet).unwrap();
    let last = wire.len() - 1;
    wire[last] ^= 0x01;
    assert!(matches!(
        receiver.deserialize(&wire),
        Err(ProtocolError::AuthenticationFailure)
    ));
}

#[test]
fn test_auth_rejects_replayed_packet() {
    let mut sender = AuthSerializer::new(DigestAlgorithm::Sha256, hmac_options()).unwrap();
    let mut receiver = AuthSerializer::new(DigestAlgorithm::Sha256, hmac_options()).unwrap();

    let packet = ControlPacket::new(PacketCode::ControlV1, 0, [0u8; 8], 1, None);
    let wire = sender.serialize(&packet).unwrap();
    receiver.deserialize(&wire).unwrap();
    assert!(matches!(
        receiver.deserialize(&wire),
        Err(ProtocolError::AuthenticationFailure)
    ));

    // reset() forgets the window, like a fresh session after soft reset
    receiver.reset();
    receiver.deserialize(&wire).unwrap();
}

#[test]
fn test_auth_replay_ids_increment() {
    let mut sender = AuthSerializer::new(DigestAlgorithm::Sha256, hmac_options()).unwrap();
    let packet = ControlPacket::new(PacketCode::ControlV1, 0, [0u8; 8], 1, None);
    let first = sender.serialize(&packet).unwrap();
    let second = sender.serialize(&packet).unwrap();
    assert_eq!(&first[9..13], &[0, 0, 0, 1]);
    assert_eq!(&second[9..13], &[0, 0, 0, 2]);
}

#[test]
fn test_auth_rejects_short_preamble() {
    let mut receiver = AuthSerializer::new(DigestAlgorithm::Sha256, hmac_options()).unwrap();
    assert!(matches!(
        receiver.deserialize(&[0x20; 20]),
        Err(ProtocolError::Malformed(_))
    ));
}

// ============================================================================
// AEAD-ENCRYPTED SERIALIZATION
// ============================================================================

#[test]
fn test_crypt_roundtrip() {
    let mut sender = CryptSerializer::new(AeadCipher::Aes256Gcm, aead_options()).unwrap();
    let mut receiver = CryptSerializer::new(AeadCipher::Aes256Gcm, aead_options()).unwrap();

    let packet = ControlPacket::new(
        PacketCode::ControlV1,
        1,
        [0x42u8; 8],
        7,
        Some(b"tls-crypt payload".to_vec()),
    );
    let wire = sender.serialize(&packet).unwrap();
    // everything after the 17-byte prefix is unreadable
    assert_eq!(&wire[..1], &[(0x04 << 3) | 1]);
    assert_eq!(&wire[1..9], &[0x42u8; 8]);
    let parsed = receiver.deserialize(&wire).unwrap();
    assert_eq!(parsed, packet);
}

#[test]
fn test_crypt_roundtrip_chacha() {
    let mut sender =
        CryptSerializer::new(AeadCipher::ChaCha20Poly1305, aead_options()).unwrap();
    let mut receiver =
        CryptSerializer::new(AeadCipher::ChaCha20Poly1305, aead_options()).unwrap();

    let packet = ControlPacket::ack(2, [6u8; 8], vec![1, 2, 3], [8u8; 8]);
    let parsed = receiver
        .deserialize(&sender.serialize(&packet).unwrap())
        .unwrap();
    assert_eq!(parsed, packet);
}

#[test]
fn test_crypt_payload_not_in_clear() {
    let mut sender = CryptSerializer::new(AeadCipher::Aes256Gcm, aead_options()).unwrap();
    let secret = b"very recognizable secret bytes";
    let packet =
        ControlPacket::new(PacketCode::ControlV1, 0, [0u8; 8], 1, Some(secret.to_vec()));
    let wire = sender.serialize(&packet).unwrap();
    assert!(!wire
        .windows(secret.len())
        .any(|window| window == secret.as_slice()));
}

#[test]
fn test_crypt_rejects_tampered_prefix() {
    let mut sender = CryptSerializer::new(AeadCipher::Aes256Gcm, aead_options()).unwrap();
    let mut receiver = CryptSerializer::new(AeadCipher::Aes256Gcm, aead_options()).unwrap();

    let packet = ControlPacket::new(PacketCode::ControlV1, 0, [0u8; 8], 1, None);
    let mut wire = sender.serialize(&packet).unwrap();
    // flip a session id bit: the prefix is associated data, so the open fails
    wire[5] ^= 0x80;
    assert!(matches!(
        receiver.deserialize(&wire),
        Err(ProtocolError::AuthenticationFailure)
    ));
}

#[test]
fn test_crypt_rejects_replay() {
    let mut sender = CryptSerializer::new(AeadCipher::Aes256Gcm, aead_options()).unwrap();
    let mut receiver = CryptSerializer::new(AeadCipher::Aes256Gcm, aead_options()).unwrap();

    let packet = ControlPacket::new(PacketCode::ControlV1, 0, [0u8; 8], 9, None);
    let wire = sender.serialize(&packet).unwrap();
    receiver.deserialize(&wire).unwrap();
    assert!(matches!(
        receiver.deserialize(&wire),
        Err(ProtocolError::AuthenticationFailure)
    ));
}

#[test]
fn test_crypt_rejects_short_input() {
    let mut receiver = CryptSerializer::new(AeadCipher::Aes256Gcm, aead_options()).unwrap();
    assert!(matches!(
        receiver.deserialize(&[0u8; 30]),
        Err(ProtocolError::Malformed(_))
    ));
}

// ============================================================================
// DATA CHANNEL
// ============================================================================

/// Stand-in provider: "compression" is byte reversal, so the 0x66 path is
/// exercised without a real LZO dependency.
struct ReversingCompressor;

impl CompressionProvider for ReversingCompressor {
    fn compress(&self, data: &[u8]) -> crate::error::Result<Vec<u8>> {
        Ok(data.iter().rev().copied().collect())
    }

    fn decompress(&self, data: &[u8]) -> crate::error::Result<Vec<u8>> {
        Ok(data.iter().rev().copied().collect())
    }
}

fn data_channel(
    peer_id: PeerId,
    suite: CryptoSuite,
    framing: CompressionFraming,
) -> DataChannel {
    let options = match suite {
        CryptoSuite::Aes256CbcHmacSha256 => cbc_options(),
        _ => aead_options(),
    };
    DataChannel::new(
        peer_id,
        suite,
        options,
        framing,
        Some(Box::new(ReversingCompressor)),
    )
    .unwrap()
}

#[test]
fn test_data_v1_roundtrip_gcm() {
    let mut channel = data_channel(
        PeerId::DISABLED,
        CryptoSuite::Aes256Gcm,
        CompressionFraming::Disabled,
    );
    let frame = channel.assemble_data_packet(0, 77, b"ip packet bytes").unwrap();
    assert_eq!(frame[0], 0x06 << 3);

    let wire = channel.encrypted_data_packet(0, 77, &frame).unwrap();
    assert_eq!(wire[0], 0x06 << 3);

    let (plain, packet_id) = channel.decrypt_data_packet(&wire).unwrap();
    assert_eq!(packet_id, 77);
    let (payload, marker) = channel.parse_payload(&plain).unwrap();
    assert_eq!(payload, b"ip packet bytes");
    assert_eq!(marker, None);
}

#[test]
fn test_data_v2_roundtrip_all_suites() {
    let peer_id = PeerId::new(0x010203).unwrap();
    for suite in [
        CryptoSuite::Aes256Gcm,
        CryptoSuite::ChaCha20Poly1305,
        CryptoSuite::Aes256CbcHmacSha256,
    ] {
        let mut channel = data_channel(peer_id, suite, CompressionFraming::Disabled);
        let frame = channel.assemble_data_packet(2, 5, b"payload").unwrap();
        assert_eq!(&frame[..4], &[0x4a, 0x01, 0x02, 0x03]);

        let wire = channel.encrypted_data_packet(2, 5, &frame).unwrap();
        let (plain, packet_id) = channel.decrypt_data_packet(&wire).unwrap();
        assert_eq!(packet_id, 5);
        assert_eq!(channel.parse_payload(&plain).unwrap().0, b"payload");
    }
}

#[test]
fn test_data_comp_lzo_marker_roundtrip() {
    let mut channel = data_channel(
        PeerId::DISABLED,
        CryptoSuite::Aes256Gcm,
        CompressionFraming::CompLzo,
    );
    let frame = channel.assemble_data_packet(0, 1, b"abc").unwrap();
    // packet id, then the no-compress marker
    assert_eq!(frame[5], DATA_PACKET_NO_COMPRESS);

    let wire = channel.encrypted_data_packet(0, 1, &frame).unwrap();
    let (plain, _) = channel.decrypt_data_packet(&wire).unwrap();
    let (payload, marker) = channel.parse_payload(&plain).unwrap();
    assert_eq!(payload, b"abc");
    assert_eq!(marker, Some(DATA_PACKET_NO_COMPRESS));
}

#[test]
fn test_data_swap_marker_restores_bytes() {
    let channel = data_channel(
        PeerId::DISABLED,
        CryptoSuite::Aes256Gcm,
        CompressionFraming::CompLzo,
    );
    // frame: pid(4) ‖ 0xFB ‖ swapped payload
    let mut frame = 9u32.to_be_bytes().to_vec();
    frame.push(DATA_PACKET_NO_COMPRESS_SWAP);
    frame.extend_from_slice(&[0x22, 0x11, 0x33]);
    let (payload, marker) = channel.parse_payload(&frame).unwrap();
    assert_eq!(payload, vec![0x11, 0x22, 0x33]);
    assert_eq!(marker, Some(DATA_PACKET_NO_COMPRESS_SWAP));
}

#[test]
fn test_data_lzo_marker_uses_provider() {
    let channel = data_channel(
        PeerId::DISABLED,
        CryptoSuite::Aes256Gcm,
        CompressionFraming::CompLzo,
    );
    let mut frame = 1u32.to_be_bytes().to_vec();
    frame.push(DATA_PACKET_LZO_COMPRESS);
    frame.extend_from_slice(&[0x03, 0x02, 0x01]);
    let (payload, marker) = channel.parse_payload(&frame).unwrap();
    assert_eq!(payload, vec![0x01, 0x02, 0x03]);
    assert_eq!(marker, Some(DATA_PACKET_LZO_COMPRESS));
}

#[test]
fn test_data_unknown_marker_rejected() {
    let channel = data_channel(
        PeerId::DISABLED,
        CryptoSuite::Aes256Gcm,
        CompressionFraming::CompLzo,
    );
    let mut frame = 1u32.to_be_bytes().to_vec();
    frame.push(0x99);
    frame.push(0x00);
    assert!(matches!(
        channel.parse_payload(&frame),
        Err(ProtocolError::Malformed(_))
    ));
}

#[test]
fn test_data_v2_compress_framing_escape() {
    let mut channel = data_channel(
        PeerId::DISABLED,
        CryptoSuite::Aes256Gcm,
        CompressionFraming::Compress,
    );
    // Payload starting with the 0x50 marker must be escaped and restored.
    let tricky = [0x50, 0xaa, 0xbb];
    let frame = channel.assemble_data_packet(0, 3, &tricky).unwrap();
    let wire = channel.encrypted_data_packet(0, 3, &frame).unwrap();
    let (plain, _) = channel.decrypt_data_packet(&wire).unwrap();
    let (payload, marker) = channel.parse_payload(&plain).unwrap();
    assert_eq!(payload, tricky);
    assert_eq!(marker, Some(0x50));

    // Ordinary payloads travel bare.
    let frame = channel.assemble_data_packet(0, 4, b"plain").unwrap();
    let wire = channel.encrypted_data_packet(0, 4, &frame).unwrap();
    let (plain, _) = channel.decrypt_data_packet(&wire).unwrap();
    let (payload, marker) = channel.parse_payload(&plain).unwrap();
    assert_eq!(payload, b"plain");
    assert_eq!(marker, None);
}

#[test]
fn test_data_rejects_tampered_packet() {
    let mut channel = data_channel(
        PeerId::DISABLED,
        CryptoSuite::Aes256Gcm,
        CompressionFraming::Disabled,
    );
    let frame = channel.assemble_data_packet(0, 1, b"payload").unwrap();
    let mut wire = channel.encrypted_data_packet(0, 1, &frame).unwrap();
    let last = wire.len() - 1;
    wire[last] ^= 0x01;
    assert!(matches!(
        channel.decrypt_data_packet(&wire),
        Err(ProtocolError::AuthenticationFailure)
    ));
}

#[test]
fn test_data_rejects_non_data_opcode() {
    let mut channel = data_channel(
        PeerId::DISABLED,
        CryptoSuite::Aes256Gcm,
        CompressionFraming::Disabled,
    );
    let wire = [(0x04u8 << 3), 0, 0, 0, 0, 0];
    assert!(matches!(
        channel.decrypt_data_packet(&wire),
        Err(ProtocolError::Malformed(_))
    ));
    assert!(matches!(
        channel.decrypt_data_packet(&[]),
        Err(ProtocolError::Malformed(_))
    ));
}

#[test]
fn test_data_rekey_swaps_keys_wholesale() {
    let mut old_channel = data_channel(
        PeerId::DISABLED,
        CryptoSuite::Aes256Gcm,
        CompressionFraming::Disabled,
    );
    let frame = old_channel.assemble_data_packet(0, 1, b"before rekey").unwrap();
    let wire = old_channel.encrypted_data_packet(0, 1, &frame).unwrap();

    // A replacement channel with different keys must reject old traffic.
    let options = CryptoOptions {
        cipher_enc_key: Some(SecureBuffer::from_slice(&[0x77u8; 32])),
        cipher_dec_key: Some(SecureBuffer::from_slice(&[0x77u8; 32])),
        ..Default::default()
    };
    let mut new_channel = DataChannel::new(
        PeerId::DISABLED,
        CryptoSuite::Aes256Gcm,
        options,
        CompressionFraming::Disabled,
        None,
    )
    .unwrap();
    assert!(matches!(
        new_channel.decrypt_data_packet(&wire),
        Err(ProtocolError::AuthenticationFailure)
    ));
}

#[test]
fn test_ping_recognition() {
    assert!(DataChannel::is_ping(&DATA_PACKET_PING));
    assert!(!DataChannel::is_ping(b"not a ping"));
}

#[test]
fn test_encryption_capacity_bounds_wire_size() {
    let peer_id = PeerId::new(7).unwrap();
    for suite in [
        CryptoSuite::Aes256Gcm,
        CryptoSuite::Aes256CbcHmacSha256,
    ] {
        let mut channel = data_channel(peer_id, suite, CompressionFraming::CompLzo);
        for len in [0usize, 1, 100, 1500] {
            let payload = vec![0xabu8; len];
            let frame = channel.assemble_data_packet(0, 1, &payload).unwrap();
            let wire = channel.encrypted_data_packet(0, 1, &frame).unwrap();
            let sealed = wire.len() - channel.header_length();
            assert!(
                sealed <= channel.encryption_capacity(frame.len()),
                "suite {suite:?} len {len}"
            );
        }
    }
}
