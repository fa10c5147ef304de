//! # Control-Channel Packets
//!
//! Message model for the handshake/negotiation channel plus its three wire
//! serializations.
//!
//! ## Wire Forms
//! - **Plain**: `header(1) ‖ session_id(8) ‖ [ack block] ‖ [packet_id(4) ‖
//!   payload]`. The ack block (`count(1) ‖ count×id(4) ‖
//!   remote_session_id(8)`) is present exactly when the packet carries acks;
//!   the packet id and payload are present exactly when it is not a pure
//!   ack.
//! - **HMAC-authenticated** (tls-auth): the plain form plus a replay id,
//!   timestamp, and an HMAC over `replay ‖ timestamp ‖ plain`.
//! - **AEAD-encrypted** (tls-crypt): everything after the 17-byte cleartext
//!   prefix is encrypted, with the prefix as associated data.
//!
//! Parsing is the exact inverse of each form. Ack-id ordering is preserved
//! end to end; selective-repeat acknowledgement above this layer depends on
//! it.

use tracing::{debug, warn};

use crate::core::wire::{
    self, PacketCode, ACK_LENGTH_LENGTH, OPCODE_LENGTH, PACKET_ID_LENGTH, REPLAY_ID_LENGTH,
    REPLAY_TIMESTAMP_LENGTH, SESSION_ID_LENGTH,
};
use crate::crypto::{
    AeadCipher, Crypto, CryptoBox, CryptoFlags, CryptoOptions, CryptoSuite, Decrypter,
    DigestAlgorithm, Encrypter,
};
use crate::error::{constants, ProtocolError, Result};
use crate::utils::metrics::global_metrics;
use crate::utils::replay::ReplayWindow;
use crate::utils::time::unix_timestamp;

/// `opcode ‖ session_id`: the cleartext prefix every control form starts
/// with.
const PREFIX_LENGTH: usize = OPCODE_LENGTH + SESSION_ID_LENGTH;

/// `replay_id ‖ timestamp`: the anti-replay fields of the protected forms.
const REPLAY_HEADER_LENGTH: usize = REPLAY_ID_LENGTH + REPLAY_TIMESTAMP_LENGTH;

/// Associated-data length of the AEAD form: the full cleartext prefix.
const CRYPT_AD_LENGTH: usize = PREFIX_LENGTH + REPLAY_HEADER_LENGTH;

/// One control-channel message, immutable once constructed.
///
/// Invariant: [`is_ack`](Self::is_ack) holds exactly when `packet_id` and
/// `payload` are absent and `ack_ids` is non-empty; the constructors keep it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPacket {
    pub code: PacketCode,
    /// 3-bit key id.
    pub key: u8,
    pub session_id: [u8; SESSION_ID_LENGTH],
    pub packet_id: Option<u32>,
    pub payload: Option<Vec<u8>>,
    /// Acked packet ids, order preserved.
    pub ack_ids: Vec<u32>,
    pub ack_remote_session_id: Option<[u8; SESSION_ID_LENGTH]>,
}

impl ControlPacket {
    /// Non-ack control packet carrying a packet id and optional payload.
    pub fn new(
        code: PacketCode,
        key: u8,
        session_id: [u8; SESSION_ID_LENGTH],
        packet_id: u32,
        payload: Option<Vec<u8>>,
    ) -> Self {
        Self {
            code,
            key: key & 0b111,
            session_id,
            packet_id: Some(packet_id),
            payload,
            ack_ids: Vec::new(),
            ack_remote_session_id: None,
        }
    }

    /// Pure acknowledgement packet.
    pub fn ack(
        key: u8,
        session_id: [u8; SESSION_ID_LENGTH],
        ack_ids: Vec<u32>,
        ack_remote_session_id: [u8; SESSION_ID_LENGTH],
    ) -> Self {
        debug_assert!(!ack_ids.is_empty(), "ack packet needs at least one id");
        Self {
            code: PacketCode::AckV1,
            key: key & 0b111,
            session_id,
            packet_id: None,
            payload: None,
            ack_ids,
            ack_remote_session_id: Some(ack_remote_session_id),
        }
    }

    /// True for pure acknowledgements: no packet id, no payload, at least
    /// one acked id.
    pub fn is_ack(&self) -> bool {
        self.packet_id.is_none() && self.payload.is_none() && !self.ack_ids.is_empty()
    }

    fn plain_capacity(&self) -> usize {
        let mut n = PREFIX_LENGTH;
        if !self.ack_ids.is_empty() {
            n += ACK_LENGTH_LENGTH
                + self.ack_ids.len() * PACKET_ID_LENGTH
                + SESSION_ID_LENGTH;
        }
        if !self.is_ack() {
            n += PACKET_ID_LENGTH + self.payload.as_ref().map_or(0, Vec::len);
        }
        n
    }

    /// Plain serialization (see module docs for the layout).
    pub fn serialized(&self) -> Vec<u8> {
        debug_assert!(self.ack_ids.len() <= u8::MAX as usize);

        let mut raw = Vec::with_capacity(self.plain_capacity());
        raw.push((self.code.raw() << 3) | (self.key & 0b111));
        raw.extend_from_slice(&self.session_id);
        if !self.ack_ids.is_empty() {
            raw.push(self.ack_ids.len() as u8);
            for id in &self.ack_ids {
                raw.extend_from_slice(&id.to_be_bytes());
            }
            raw.extend_from_slice(&self.ack_remote_session_id.unwrap_or_default());
        }
        if !self.is_ack() {
            raw.extend_from_slice(&self.packet_id.unwrap_or(0).to_be_bytes());
            if let Some(payload) = &self.payload {
                raw.extend_from_slice(payload);
            }
        }
        raw
    }
}

/// Serialization strategy for one control-channel session direction pair.
///
/// Implementations hold per-session state (replay counters, windows);
/// `reset` returns them to the fresh-session state after a soft reset.
pub trait ControlChannelSerializer: Send {
    fn reset(&mut self);

    fn serialize(&mut self, packet: &ControlPacket) -> Result<Vec<u8>>;

    fn deserialize(&mut self, data: &[u8]) -> Result<ControlPacket>;
}

/// Plain form: no authentication, no encryption.
#[derive(Debug, Default)]
pub struct PlainSerializer;

impl PlainSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl ControlChannelSerializer for PlainSerializer {
    fn reset(&mut self) {}

    fn serialize(&mut self, packet: &ControlPacket) -> Result<Vec<u8>> {
        global_metrics().control_sealed();
        Ok(packet.serialized())
    }

    fn deserialize(&mut self, data: &[u8]) -> Result<ControlPacket> {
        let packet = parse_plain(data).inspect_err(|_| {
            global_metrics().malformed_discard();
        })?;
        global_metrics().control_opened();
        Ok(packet)
    }
}

/// The plain parse, shared by all three serializers.
fn parse_plain(data: &[u8]) -> Result<ControlPacket> {
    let mut offset = 0;

    if data.len() < OPCODE_LENGTH {
        return Err(ProtocolError::Malformed(constants::ERR_MISSING_OPCODE));
    }
    let code = PacketCode::from_byte(data[0] >> 3)
        .ok_or(ProtocolError::Malformed(constants::ERR_UNKNOWN_OPCODE))?;
    let key = data[0] & 0b111;
    if code.is_data() {
        return Err(ProtocolError::Malformed(constants::ERR_NOT_A_CONTROL_PACKET));
    }
    offset += OPCODE_LENGTH;

    debug!(?code, key, "parsing control packet");

    if data.len() < offset + SESSION_ID_LENGTH {
        return Err(ProtocolError::Malformed(constants::ERR_MISSING_SESSION_ID));
    }
    let mut session_id = [0u8; SESSION_ID_LENGTH];
    session_id.copy_from_slice(&data[offset..offset + SESSION_ID_LENGTH]);
    offset += SESSION_ID_LENGTH;

    if code.is_ack() {
        if data.len() < offset + ACK_LENGTH_LENGTH {
            return Err(ProtocolError::Malformed(constants::ERR_MISSING_ACK_COUNT));
        }
        let count = data[offset] as usize;
        offset += ACK_LENGTH_LENGTH;
        if count == 0 {
            return Err(ProtocolError::Malformed(constants::ERR_ACK_WITHOUT_IDS));
        }
        if data.len() < offset + count * PACKET_ID_LENGTH {
            return Err(ProtocolError::Malformed(constants::ERR_MISSING_ACKS));
        }
        let mut ack_ids = Vec::with_capacity(count);
        for _ in 0..count {
            ack_ids.push(u32::from_be_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ]));
            offset += PACKET_ID_LENGTH;
        }
        if data.len() < offset + SESSION_ID_LENGTH {
            return Err(ProtocolError::Malformed(
                constants::ERR_MISSING_REMOTE_SESSION_ID,
            ));
        }
        let mut remote = [0u8; SESSION_ID_LENGTH];
        remote.copy_from_slice(&data[offset..offset + SESSION_ID_LENGTH]);
        offset += SESSION_ID_LENGTH;
        if offset != data.len() {
            return Err(ProtocolError::Malformed(constants::ERR_TRAILING_BYTES));
        }
        return Ok(ControlPacket::ack(key, session_id, ack_ids, remote));
    }

    if data.len() < offset + PACKET_ID_LENGTH {
        return Err(ProtocolError::Malformed(constants::ERR_MISSING_PACKET_ID));
    }
    let packet_id = u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]);
    offset += PACKET_ID_LENGTH;

    let payload = if offset < data.len() {
        Some(data[offset..].to_vec())
    } else {
        None
    };

    Ok(ControlPacket::new(code, key, session_id, packet_id, payload))
}

/// HMAC-authenticated form (tls-auth).
///
/// Wire layout: `header(9) ‖ replay_id(4) ‖ timestamp(4) ‖ digest ‖ body`,
/// where `body` is the plain serialization minus its 9-byte header, and the
/// digest covers `replay_id ‖ timestamp ‖ plain serialization`.
pub struct AuthSerializer {
    encrypter: Box<dyn Encrypter>,
    decrypter: Box<dyn Decrypter>,
    digest_length: usize,
    outbound_replay_id: u32,
    timestamp: u32,
    replay_window: ReplayWindow,
}

impl AuthSerializer {
    /// Configure with HMAC keys only; the digest algorithm is negotiated
    /// with the `--tls-auth` key direction.
    pub fn new(digest: DigestAlgorithm, options: CryptoOptions) -> Result<Self> {
        let suite = match digest {
            DigestAlgorithm::Sha256 => CryptoSuite::HmacSha256,
            DigestAlgorithm::Sha512 => CryptoSuite::HmacSha512,
        };
        let (encrypter, decrypter) = CryptoBox::configure(suite, options)?;
        let digest_length = encrypter.digest_length();
        Ok(Self {
            encrypter,
            decrypter,
            digest_length,
            outbound_replay_id: 1,
            timestamp: unix_timestamp(),
            replay_window: ReplayWindow::new(),
        })
    }
}

impl ControlChannelSerializer for AuthSerializer {
    fn reset(&mut self) {
        self.outbound_replay_id = 1;
        self.replay_window.reset();
    }

    fn serialize(&mut self, packet: &ControlPacket) -> Result<Vec<u8>> {
        let plain = packet.serialized();

        // Signing preamble: replay_id ‖ timestamp ‖ plain
        let mut preamble = Vec::with_capacity(REPLAY_HEADER_LENGTH + plain.len());
        preamble.extend_from_slice(&self.outbound_replay_id.to_be_bytes());
        preamble.extend_from_slice(&self.timestamp.to_be_bytes());
        preamble.extend_from_slice(&plain);

        let signed = self.encrypter.encrypt(&preamble, None)?;
        let digest = &signed[..self.digest_length];

        let mut out = Vec::with_capacity(plain.len() + REPLAY_HEADER_LENGTH + self.digest_length);
        out.extend_from_slice(&plain[..PREFIX_LENGTH]);
        out.extend_from_slice(&preamble[..REPLAY_HEADER_LENGTH]);
        out.extend_from_slice(digest);
        out.extend_from_slice(&plain[PREFIX_LENGTH..]);

        self.outbound_replay_id += 1;
        global_metrics().control_sealed();
        Ok(out)
    }

    fn deserialize(&mut self, data: &[u8]) -> Result<ControlPacket> {
        let preamble_length = PREFIX_LENGTH + REPLAY_HEADER_LENGTH + self.digest_length;
        if data.len() < preamble_length {
            global_metrics().malformed_discard();
            return Err(ProtocolError::Malformed(constants::ERR_MISSING_PREAMBLE));
        }

        let auth_offset = PREFIX_LENGTH + REPLAY_HEADER_LENGTH;
        let digest = &data[auth_offset..auth_offset + self.digest_length];

        // Rebuild the signing order: the wire leads with
        // (header)(replay+timestamp); the digest covers them swapped.
        let mut stripped = Vec::with_capacity(data.len() - self.digest_length);
        stripped.extend_from_slice(&data[..auth_offset]);
        stripped.extend_from_slice(&data[auth_offset + self.digest_length..]);

        let mut preamble = vec![0u8; stripped.len()];
        wire::swap_copy(&mut preamble, &stripped, PREFIX_LENGTH, REPLAY_HEADER_LENGTH)?;

        let mut check = Vec::with_capacity(self.digest_length + preamble.len());
        check.extend_from_slice(digest);
        check.extend_from_slice(&preamble);
        self.decrypter.verify(&check, None).inspect_err(|_| {
            warn!("control packet failed HMAC verification");
            global_metrics().auth_failure();
        })?;

        let replay_id = u32::from_be_bytes([preamble[0], preamble[1], preamble[2], preamble[3]]);
        if !self.replay_window.check_and_update(replay_id) {
            global_metrics().auth_failure();
            return Err(ProtocolError::AuthenticationFailure);
        }

        let packet = parse_plain(&preamble[REPLAY_HEADER_LENGTH..]).inspect_err(|_| {
            global_metrics().malformed_discard();
        })?;
        global_metrics().control_opened();
        Ok(packet)
    }
}

/// AEAD-encrypted form (tls-crypt).
///
/// Wire layout: `header(9) ‖ replay_id(4) ‖ timestamp(4) ‖ iv ‖ ciphertext ‖
/// tag`, with the 17-byte cleartext prefix as associated data and the plain
/// serialization minus its header as plaintext.
pub struct CryptSerializer {
    encrypter: Box<dyn Encrypter>,
    decrypter: Box<dyn Decrypter>,
    ad_length: usize,
    outbound_replay_id: u32,
    timestamp: u32,
    replay_window: ReplayWindow,
}

impl CryptSerializer {
    pub fn new(cipher: AeadCipher, options: CryptoOptions) -> Result<Self> {
        let suite = match cipher {
            AeadCipher::Aes256Gcm => CryptoSuite::Aes256Gcm,
            AeadCipher::ChaCha20Poly1305 => CryptoSuite::ChaCha20Poly1305,
        };
        let (encrypter, decrypter) = CryptoBox::configure(suite, options)?;
        Ok(Self {
            encrypter,
            decrypter,
            ad_length: CRYPT_AD_LENGTH,
            outbound_replay_id: 1,
            timestamp: unix_timestamp(),
            replay_window: ReplayWindow::new(),
        })
    }

    /// Override how much of the cleartext prefix is bound as associated
    /// data. The conventional value (and maximum) is the full 17-byte
    /// prefix.
    pub fn with_ad_length(mut self, ad_length: usize) -> Result<Self> {
        if ad_length == 0 || ad_length > CRYPT_AD_LENGTH {
            return Err(ProtocolError::ConfigError(format!(
                "ad length must be within 1..={CRYPT_AD_LENGTH}"
            )));
        }
        self.ad_length = ad_length;
        Ok(self)
    }
}

impl ControlChannelSerializer for CryptSerializer {
    fn reset(&mut self) {
        self.outbound_replay_id = 1;
        self.replay_window.reset();
    }

    fn serialize(&mut self, packet: &ControlPacket) -> Result<Vec<u8>> {
        let plain = packet.serialized();
        let body = &plain[PREFIX_LENGTH..];

        let mut out = Vec::with_capacity(
            CRYPT_AD_LENGTH + self.encrypter.encryption_capacity(body.len()),
        );
        out.extend_from_slice(&plain[..PREFIX_LENGTH]);
        out.extend_from_slice(&self.outbound_replay_id.to_be_bytes());
        out.extend_from_slice(&self.timestamp.to_be_bytes());

        let flags = CryptoFlags {
            ad: Some(&out[..self.ad_length]),
            ..Default::default()
        };
        let sealed = self.encrypter.encrypt(body, Some(&flags))?;
        out.extend_from_slice(&sealed);

        self.outbound_replay_id += 1;
        global_metrics().control_sealed();
        Ok(out)
    }

    fn deserialize(&mut self, data: &[u8]) -> Result<ControlPacket> {
        if data.len() < CRYPT_AD_LENGTH + self.decrypter.overhead() {
            global_metrics().malformed_discard();
            return Err(ProtocolError::Malformed(constants::ERR_MISSING_AD_TAG));
        }

        let flags = CryptoFlags {
            ad: Some(&data[..self.ad_length]),
            ..Default::default()
        };
        let body = self
            .decrypter
            .decrypt(&data[CRYPT_AD_LENGTH..], Some(&flags))
            .inspect_err(|_| {
                warn!("control packet failed AEAD open");
                global_metrics().auth_failure();
            })?;

        let replay_offset = PREFIX_LENGTH;
        let replay_id = u32::from_be_bytes([
            data[replay_offset],
            data[replay_offset + 1],
            data[replay_offset + 2],
            data[replay_offset + 3],
        ]);
        if !self.replay_window.check_and_update(replay_id) {
            global_metrics().auth_failure();
            return Err(ProtocolError::AuthenticationFailure);
        }

        let mut plain = Vec::with_capacity(PREFIX_LENGTH + body.len());
        plain.extend_from_slice(&data[..PREFIX_LENGTH]);
        plain.extend_from_slice(&body);

        let packet = parse_plain(&plain).inspect_err(|_| {
            global_metrics().malformed_discard();
        })?;
        global_metrics().control_opened();
        Ok(packet)
    }
}
