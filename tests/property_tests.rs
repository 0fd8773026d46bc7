//! Property-based tests using proptest
//!
//! These tests validate codec invariants across a wide range of randomly
//! generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::{Bytes, BytesMut};
use mmo_transport::core::binary::{PacketReader, PacketWriter};
use mmo_transport::core::codec::EnvelopeCodec;
use mmo_transport::core::envelope::Envelope;
use mmo_transport::{Alias, EntityState, Gateway, Packet, Position};
use proptest::prelude::*;
use tokio_util::codec::{Decoder, Encoder};
use uuid::Uuid;

fn any_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

// Property: primitives come back in the order and with the values written
proptest! {
    #[test]
    fn prop_primitive_sequence(
        a in any::<i32>(),
        b in any::<i64>(),
        c in any::<f64>().prop_filter("NaN never equals itself", |v| !v.is_nan()),
        d in any::<bool>(),
        s in ".{0,200}",
    ) {
        let mut writer = PacketWriter::new();
        writer.write_i32(a);
        writer.write_string(&s).unwrap();
        writer.write_i64(b);
        writer.write_f64(c);
        writer.write_bool(d);
        let bytes = writer.into_bytes();

        let mut reader = PacketReader::new(&bytes);
        prop_assert_eq!(reader.read_i32().unwrap(), a);
        prop_assert_eq!(reader.read_string().unwrap(), s);
        prop_assert_eq!(reader.read_i64().unwrap(), b);
        prop_assert_eq!(reader.read_f64().unwrap(), c);
        prop_assert_eq!(reader.read_bool().unwrap(), d);
        prop_assert!(reader.finish().is_ok());
    }
}

// Property: a reader over arbitrary bytes never panics
proptest! {
    #[test]
    fn prop_reader_never_panics(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut reader = PacketReader::new(&data);
        let _ = reader.read_string();
        let _ = reader.read_bool();
        let _ = reader.read_uuid();
        let _ = reader.read_f32();
    }
}

// Property: any envelope survives the stream codec, even when fed byte by byte
proptest! {
    #[test]
    fn prop_envelope_through_codec(
        token in "[A-Za-z0-9+/=]{0,120}",
        high in any::<i64>(),
        low in any::<i64>(),
        payload in prop::collection::vec(any::<u8>(), 0..2048),
    ) {
        let envelope = Envelope::new(token, Alias::from_halves(high, low), Bytes::from(payload));
        let mut codec = EnvelopeCodec::default();
        let mut encoded = BytesMut::new();
        codec.encode(envelope.clone(), &mut encoded).unwrap();

        let mut buffer = BytesMut::new();
        let mut decoded = None;
        for byte in encoded.iter() {
            prop_assert!(decoded.is_none());
            buffer.extend_from_slice(&[*byte]);
            decoded = codec.decode(&mut buffer).unwrap();
        }

        prop_assert_eq!(decoded, Some(envelope));
        prop_assert!(buffer.is_empty());
    }
}

// Property: the stream decoder never panics on garbage
proptest! {
    #[test]
    fn prop_codec_never_panics(data in prop::collection::vec(any::<u8>(), 0..1024)) {
        let mut codec = EnvelopeCodec::new(4096);
        let mut buffer = BytesMut::from(&data[..]);
        while let Ok(Some(_)) = codec.decode(&mut buffer) {}
    }
}

// Property: gateway decode(encode(p)) == p for every catalogue packet
proptest! {
    #[test]
    fn prop_move_and_attack_roundtrip(source in any_uuid(), target in any_uuid(), x in any::<i32>(), z in any::<i32>()) {
        let gateway = Gateway::with_defaults().unwrap();
        for packet in [Packet::move_to(source, x, z), Packet::attack(source, target), Packet::animate_die(source, target)] {
            let bytes = gateway.encode(&packet).unwrap();
            let decoded = gateway.decode(&packet, source, 0, &bytes).unwrap();
            prop_assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn prop_entity_update_roundtrip(
        source in any_uuid(),
        name in "[a-z]{1,24}",
        x in any::<i32>(),
        z in any::<i32>(),
        hp in 0..10_000i32,
        speed in 0.0f32..50.0,
        flags in any::<(bool, bool, bool)>(),
        target in prop::option::of(any_uuid()),
    ) {
        let gateway = Gateway::with_defaults().unwrap();
        let packet = Packet::entity_update(source, EntityState {
            name,
            position: Position::new(x, z),
            hp,
            max_hp: hp + 1,
            move_speed: speed,
            alive: flags.0,
            moving: flags.1,
            attacking: flags.2,
            target,
        });

        let bytes = gateway.encode(&packet).unwrap();
        prop_assert_eq!(gateway.decode(&packet, source, 7, &bytes).unwrap(), packet);
    }
}
