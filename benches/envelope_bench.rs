use bytes::{Bytes, BytesMut};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use mmo_transport::core::codec::EnvelopeCodec;
use mmo_transport::core::envelope::Envelope;
use mmo_transport::{Alias, Crypto, EntityState, Gateway, Packet, Position, TokenCodec};
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};
use uuid::Uuid;

#[allow(clippy::unwrap_used)]
fn bench_envelope_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope_codec");
    let payload_sizes = [8usize, 64, 512, 4096, 65536];
    let token = "x".repeat(96);

    for &size in &payload_sizes {
        let envelope = Envelope::new(token.clone(), Alias::from_name("MOVE"), Bytes::from(vec![0u8; size]));
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(format!("encode_{size}b"), |b| {
            b.iter_batched(
                || envelope.clone(),
                |envelope| {
                    let mut buf = BytesMut::with_capacity(envelope.encoded_len());
                    let mut codec = EnvelopeCodec::default();
                    codec.encode(envelope, &mut buf).unwrap();
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("decode_{size}b"), |b| {
            let mut encoded = BytesMut::new();
            EnvelopeCodec::default().encode(envelope.clone(), &mut encoded).unwrap();
            let encoded = encoded.freeze();
            b.iter_batched(
                || BytesMut::from(&encoded[..]),
                |mut buf| {
                    let decoded = EnvelopeCodec::default().decode(&mut buf).unwrap();
                    assert!(decoded.is_some());
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_gateway(c: &mut Criterion) {
    let gateway = Gateway::with_defaults().unwrap();
    let source = Uuid::new_v4();
    let update = Packet::entity_update(
        source,
        EntityState {
            name: "goblin-warlord".into(),
            position: Position::new(1200, -340),
            hp: 870,
            max_hp: 1000,
            move_speed: 3.25,
            alive: true,
            moving: true,
            attacking: false,
            target: Some(Uuid::new_v4()),
        },
    );

    c.bench_function("gateway_encode_entity_update", |b| {
        b.iter(|| gateway.encode(&update).unwrap())
    });

    let bytes = gateway.encode(&update).unwrap();
    c.bench_function("gateway_decode_entity_update", |b| {
        b.iter(|| gateway.decode(&update, source, 0, &bytes).unwrap())
    });
}

#[allow(clippy::unwrap_used)]
fn bench_tokens(c: &mut Criterion) {
    let crypto = Arc::new(Crypto::new(&[0x5A; 32]));
    let tokens = TokenCodec::new(crypto.clone(), crypto);
    let source = Uuid::new_v4();

    c.bench_function("token_seal", |b| b.iter(|| tokens.seal(source).unwrap()));

    let sealed = tokens.seal(source).unwrap();
    c.bench_function("token_open", |b| b.iter(|| tokens.open(&sealed).unwrap()));
}

criterion_group!(benches, bench_envelope_codec, bench_gateway, bench_tokens);
criterion_main!(benches);
