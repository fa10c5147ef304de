#![no_main]

use libfuzzer_sys::fuzz_target;
use openvpn_protocol::{ControlChannelSerializer, PlainSerializer};

fuzz_target!(|data: &[u8]| {
    // Fuzz control packet parsing - test for panics, crashes, out-of-bounds
    let mut serializer = PlainSerializer::new();
    if let Ok(packet) = serializer.deserialize(data) {
        // Whatever parses must re-serialize without panicking
        let _ = serializer.serialize(&packet);
    }
});
