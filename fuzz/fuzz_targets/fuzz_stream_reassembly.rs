#![no_main]

use libfuzzer_sys::fuzz_target;
use openvpn_protocol::{PacketStream, XorMethod};

fuzz_target!(|data: &[u8]| {
    // Fuzz TCP stream reassembly under every obfuscation method - consumed
    // bytes must never exceed the input and parsing must never panic
    let methods = [
        XorMethod::None,
        XorMethod::Mask(vec![0x42, 0x13]),
        XorMethod::Ptrpos,
        XorMethod::Reverse,
        XorMethod::Obfuscate(vec![0x99]),
    ];
    for method in &methods {
        let (_, consumed) = PacketStream::packets_from_inbound_stream(data, method);
        assert!(consumed <= data.len());
    }
});
