#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use mmo_transport::core::codec::EnvelopeCodec;
use mmo_transport::core::envelope::Envelope;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Whole-frame parse and streaming decode must both fail cleanly on garbage
    let _ = Envelope::from_bytes(data);

    let mut codec = EnvelopeCodec::new(64 * 1024);
    let mut buffer = BytesMut::from(data);
    while let Ok(Some(_)) = codec.decode(&mut buffer) {}
});
