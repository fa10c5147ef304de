//! Sliding-Window Replay Protection
//!
//! Control packets under the HMAC and AEAD serializers carry a 32-bit replay
//! id that increments per packet. This module tracks seen ids in a 64-entry
//! sliding bitmap (the IPsec anti-replay shape) so retransmitted or replayed
//! ciphertext is rejected while moderate reordering is tolerated.
//!
//! The window is per serializer direction and therefore per session; it is
//! reset together with the serializer on rekey.

use tracing::{debug, warn};

/// Number of ids the window remembers behind the highest seen.
const WINDOW_SIZE: u32 = 64;

/// Sliding-bitmap replay-id tracker.
#[derive(Debug, Default)]
pub struct ReplayWindow {
    /// Highest id accepted so far; 0 means nothing seen yet.
    top: u32,
    /// Bit `n` set means `top - n` was seen.
    bitmap: u64,
}

impl ReplayWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` and report whether it is fresh.
    ///
    /// Returns `false` for ids already seen, ids older than the window, and
    /// the reserved id 0.
    pub fn check_and_update(&mut self, id: u32) -> bool {
        if id == 0 {
            warn!("Replay id 0 is reserved, rejecting");
            return false;
        }
        if id > self.top {
            let advance = id - self.top;
            self.bitmap = if advance >= WINDOW_SIZE {
                0
            } else {
                self.bitmap << advance
            };
            self.bitmap |= 1;
            self.top = id;
            return true;
        }

        let offset = self.top - id;
        if offset >= WINDOW_SIZE {
            warn!(id, top = self.top, "Replay id fell behind the window");
            return false;
        }
        let bit = 1u64 << offset;
        if self.bitmap & bit != 0 {
            warn!(id, "Replayed packet id");
            return false;
        }
        self.bitmap |= bit;
        debug!(id, top = self.top, "Accepted reordered packet id");
        true
    }

    /// Forget everything; used when the serializer is reset.
    pub fn reset(&mut self) {
        self.top = 0;
        self.bitmap = 0;
    }
}
