#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Boundary conditions and malformed input across the wire layers

use bytes::{BufMut, Bytes, BytesMut};
use mmo_transport::core::codec::EnvelopeCodec;
use mmo_transport::core::envelope::Envelope;
use mmo_transport::protocol::converters::AttackConverter;
use mmo_transport::{Alias, Crypto, Gateway, Packet, PacketKind, ProtocolError, TokenCodec};
use rand::Rng;
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};
use uuid::Uuid;

// ============================================================================
// ENVELOPE FRAMING
// ============================================================================

#[test]
fn test_envelope_empty_payload() {
    let envelope = Envelope::new("t".into(), Alias::from_name("GOODBYE"), Bytes::new());
    let mut buf = BytesMut::new();
    EnvelopeCodec::default().encode(envelope.clone(), &mut buf).unwrap();

    let decoded = EnvelopeCodec::default().decode(&mut buf).unwrap().expect("complete frame");
    assert_eq!(decoded, envelope);
    assert!(buf.is_empty());
}

#[test]
fn test_envelope_empty_token() {
    let envelope = Envelope::new(String::new(), Alias::from_name("MOVE"), Bytes::from_static(&[1]));
    let bytes = envelope.to_bytes().unwrap();
    assert_eq!(Envelope::from_bytes(&bytes).unwrap(), envelope);
}

#[test]
fn test_claimed_length_over_limit_rejected_before_buffering() {
    let mut buf = BytesMut::new();
    buf.put_u16(0);
    buf.put_i64(1);
    buf.put_i64(2);
    buf.put_i32(20_000_000);

    let mut codec = EnvelopeCodec::new(1024 * 1024);
    match codec.decode(&mut buf) {
        Err(ProtocolError::OversizedPacket(20_000_000)) => {}
        other => panic!("Unexpected result: {other:?}"),
    }
}

#[test]
fn test_negative_length_rejected() {
    let mut buf = BytesMut::new();
    buf.put_u16(0);
    buf.put_i64(1);
    buf.put_i64(2);
    buf.put_i32(-1);

    assert!(matches!(
        EnvelopeCodec::default().decode(&mut buf),
        Err(ProtocolError::PacketRead(_))
    ));
    assert!(matches!(Envelope::from_bytes(&buf), Err(ProtocolError::PacketRead(_))));
}

#[test]
fn test_encoder_refuses_payload_over_limit() {
    let envelope = Envelope::new("t".into(), Alias::from_name("MOVE"), Bytes::from(vec![0u8; 2048]));
    let mut buf = BytesMut::new();
    let err = EnvelopeCodec::new(1024).encode(envelope, &mut buf).unwrap_err();
    assert!(matches!(err, ProtocolError::OversizedPacket(2048)));
    assert!(buf.is_empty());
}

#[test]
fn test_partial_frame_waits_for_rest() {
    let envelope = Envelope::new("token".into(), Alias::from_name("MOVE"), Bytes::from_static(&[0; 8]));
    let encoded = envelope.to_bytes().unwrap();
    let mut codec = EnvelopeCodec::default();

    let mut buf = BytesMut::from(&encoded[..encoded.len() - 1]);
    assert!(codec.decode(&mut buf).unwrap().is_none());

    buf.extend_from_slice(&encoded[encoded.len() - 1..]);
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(envelope));
}

#[test]
fn test_two_frames_in_one_read() {
    let first = Envelope::new("a".into(), Alias::from_name("MOVE"), Bytes::from_static(&[1, 2]));
    let second = Envelope::new("b".into(), Alias::from_name("ATTACK"), Bytes::from_static(&[3]));
    let mut codec = EnvelopeCodec::default();
    let mut buf = BytesMut::new();
    codec.encode(first.clone(), &mut buf).unwrap();
    codec.encode(second.clone(), &mut buf).unwrap();

    assert_eq!(codec.decode(&mut buf).unwrap(), Some(first));
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(second));
    assert!(codec.decode(&mut buf).unwrap().is_none());
}

#[test]
fn test_trailing_bytes_rejected_by_whole_frame_parse() {
    let envelope = Envelope::new("t".into(), Alias::from_name("MOVE"), Bytes::from_static(&[1]));
    let mut bytes = envelope.to_bytes().unwrap().to_vec();
    bytes.push(0xFF);
    assert!(Envelope::from_bytes(&bytes).is_err());
}

#[test]
fn test_random_garbage_never_panics() {
    let mut rng = rand::rng();
    for _ in 0..500 {
        let len = rng.random_range(0..256);
        let data: Vec<u8> = (0..len).map(|_| rng.random()).collect();

        let _ = Envelope::from_bytes(&data);
        let mut buf = BytesMut::from(&data[..]);
        let mut codec = EnvelopeCodec::new(4096);
        while let Ok(Some(_)) = codec.decode(&mut buf) {}
    }
}

// ============================================================================
// TOKENS
// ============================================================================

fn tokens() -> TokenCodec {
    let crypto = Arc::new(Crypto::new(&[0x11; 32]));
    TokenCodec::new(crypto.clone(), crypto)
}

#[test]
fn test_tampered_token_rejected() {
    let codec = tokens();
    let sealed = codec.seal(Uuid::new_v4()).unwrap();

    let mut chars: Vec<char> = sealed.chars().collect();
    let last = chars.len() - 2;
    chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
    let tampered: String = chars.into_iter().collect();

    assert!(codec.open(&tampered).is_err());
}

#[test]
fn test_non_base64_token_rejected() {
    assert!(tokens().open("not base64 at all!").is_err());
    assert!(tokens().open("").is_err());
}

#[test]
fn test_token_from_other_key_rejected() {
    let other = Arc::new(Crypto::new(&[0x22; 32]));
    let sealed = TokenCodec::new(other.clone(), other).seal(Uuid::new_v4()).unwrap();
    assert!(tokens().open(&sealed).is_err());
}

// ============================================================================
// GATEWAY
// ============================================================================

#[test]
fn test_truncated_payload_for_every_kind() {
    let gateway = Gateway::with_defaults().unwrap();
    let source = Uuid::new_v4();
    let packets = [
        Packet::hello(source, "alice", "secret"),
        Packet::move_to(source, 7, -7),
        Packet::attack(source, Uuid::new_v4()),
        Packet::animate_die(source, Uuid::new_v4()),
    ];

    for packet in packets {
        let bytes = gateway.encode(&packet).unwrap();
        let truncated = &bytes[..bytes.len() - 1];
        assert!(
            gateway.decode(&packet, source, 0, truncated).is_err(),
            "{} accepted a truncated payload",
            packet.kind()
        );
    }
}

#[test]
fn test_converter_bound_to_wrong_alias() {
    let gateway = Gateway::new();
    gateway.bind(PacketKind::Move, AttackConverter).unwrap();

    let err = gateway.encode(&Packet::move_to(Uuid::nil(), 1, 2)).unwrap_err();
    assert!(matches!(err, ProtocolError::ConverterMismatch { kind: PacketKind::Move, .. }));
}

#[test]
fn test_unknown_alias_has_no_converter() {
    let gateway = Gateway::with_defaults().unwrap();
    let alias = Alias::from_name("TELEPORT");
    assert!(matches!(
        gateway.decode(alias, Uuid::nil(), 0, &[]),
        Err(ProtocolError::ConverterNotBound(a)) if a == alias
    ));
}

#[test]
fn test_disconnect_sentinel_is_never_encoded() {
    let gateway = Gateway::with_defaults().unwrap();
    assert!(!gateway.is_bound(PacketKind::Disconnect));
    assert!(gateway.encode(&Packet::disconnect(Uuid::nil())).is_err());
}
