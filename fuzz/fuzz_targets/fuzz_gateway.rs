#![no_main]

use libfuzzer_sys::fuzz_target;
use mmo_transport::{Gateway, PacketKind};
use uuid::Uuid;

fuzz_target!(|data: &[u8]| {
    let Ok(gateway) = Gateway::with_defaults() else {
        return;
    };

    // Every converter must reject malformed payloads without panicking
    for kind in PacketKind::ALL {
        let _ = gateway.decode(kind, Uuid::nil(), 0, data);
    }
});
