use proptest::prelude::*;

use super::*;
use crate::codec::CodecError;

fn roundtrip(op: &Op) -> Op {
    let mut writer = ByteWriter::new();
    op.encode(&mut writer);
    let mut reader = ByteReader::new(writer.as_bytes());
    let decoded = Op::decode(&mut reader).unwrap();
    assert!(reader.eof(), "trailing bytes after {op}");
    decoded
}

#[test]
fn test_digest_lengths() {
    let msg = b"digest length check";
    assert_eq!(Op::Sha1.apply(msg).unwrap().len(), 20);
    assert_eq!(Op::Ripemd160.apply(msg).unwrap().len(), 20);
    assert_eq!(Op::Sha256.apply(msg).unwrap().len(), 32);
    assert_eq!(Op::Keccak256.apply(msg).unwrap().len(), 32);
}

#[test]
fn test_sha256_known_vector() {
    let digest = Op::Sha256.apply(b"hello").unwrap();
    assert_eq!(
        hex::encode(digest),
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
}

#[test]
fn test_keccak256_known_vector() {
    // Keccak-256, not the NIST SHA3-256 variant.
    let digest = Op::Keccak256.apply(b"").unwrap();
    assert_eq!(
        hex::encode(digest),
        "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
    );
}

#[test]
fn test_append_prepend() {
    assert_eq!(Op::Append(vec![3, 4]).apply(&[1, 2]).unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(Op::Prepend(vec![3, 4]).apply(&[1, 2]).unwrap(), vec![3, 4, 1, 2]);
}

#[test]
fn test_hexlify_unhexlify() {
    assert_eq!(Op::Hexlify.apply(&[0xde, 0xad]).unwrap(), b"dead".to_vec());
    assert_eq!(Op::Unhexlify.apply(b"dead").unwrap(), vec![0xde, 0xad]);
    assert!(matches!(
        Op::Unhexlify.apply(b"abc"),
        Err(OpError::BadHex { .. })
    ));
    assert!(matches!(
        Op::Unhexlify.apply(b"zz"),
        Err(OpError::BadHex { .. })
    ));
}

#[test]
fn test_substr_exact() {
    let msg = b"abcdefgh";
    assert_eq!(
        Op::Substr { start: 2, len: 3 }.apply(msg).unwrap(),
        b"cde".to_vec()
    );
    assert_eq!(
        Op::Substr {
            start: 3,
            len: SUBSTR_TO_END
        }
        .apply(msg)
        .unwrap(),
        b"defgh".to_vec()
    );
}

#[test]
fn test_substr_out_of_range() {
    let msg = b"abc";
    assert!(matches!(
        Op::Substr { start: 1, len: 5 }.apply(msg),
        Err(OpError::MessageTooShort { op: "substr", .. })
    ));
    assert!(matches!(
        Op::Substr {
            start: 4,
            len: SUBSTR_TO_END
        }
        .apply(msg),
        Err(OpError::MessageTooShort { .. })
    ));
}

#[test]
fn test_left_right() {
    let msg = b"abcdef";
    assert_eq!(Op::Left(2).apply(msg).unwrap(), b"ab".to_vec());
    assert_eq!(Op::Right(2).apply(msg).unwrap(), b"ef".to_vec());
    assert!(matches!(
        Op::Left(7).apply(msg),
        Err(OpError::MessageTooShort { op: "left", .. })
    ));
    assert!(matches!(
        Op::Right(7).apply(msg),
        Err(OpError::MessageTooShort { op: "right", .. })
    ));
}

#[test]
fn test_and_or_cycling() {
    assert_eq!(
        Op::And(vec![0x0f]).apply(&[0xab, 0xcd]).unwrap(),
        vec![0x0b, 0x0d]
    );
    assert_eq!(
        Op::Or(vec![0xf0, 0x0f]).apply(&[0x01, 0x20, 0x03]).unwrap(),
        vec![0xf1, 0x2f, 0xf3]
    );
}

#[test]
fn test_decode_rejects_unknown_tag() {
    let mut writer = ByteWriter::new();
    writer.write_varuint(0x42);
    let mut reader = ByteReader::new(writer.as_bytes());
    assert!(matches!(
        Op::decode(&mut reader),
        Err(CodecError::UnknownOpTag { tag: 0x42 })
    ));
}

#[test]
fn test_decode_rejects_oversized_data() {
    let mut writer = ByteWriter::new();
    writer.write_varuint(u64::from(TAG_APPEND));
    writer.write_varuint(MAX_OP_DATA_LEN as u64 + 1);
    let mut reader = ByteReader::new(writer.as_bytes());
    assert!(matches!(
        Op::decode(&mut reader),
        Err(CodecError::BodyTooLong { .. })
    ));
}

#[test]
fn test_decode_rejects_empty_data() {
    let mut writer = ByteWriter::new();
    writer.write_varuint(u64::from(TAG_XOR));
    writer.write_varuint(0);
    let mut reader = ByteReader::new(writer.as_bytes());
    assert!(matches!(
        Op::decode(&mut reader),
        Err(CodecError::EmptyBody { context: "xor" })
    ));
}

#[test]
fn test_decode_rejects_zero_substr_len() {
    let mut writer = ByteWriter::new();
    writer.write_varuint(u64::from(TAG_SUBSTR));
    writer.write_varuint(5);
    writer.write_varuint(0);
    let mut reader = ByteReader::new(writer.as_bytes());
    assert!(matches!(
        Op::decode(&mut reader),
        Err(CodecError::InvalidImmediate { op: "substr", .. })
    ));
}

#[test]
fn test_parameterless_roundtrip() {
    for op in [
        Op::Sha1,
        Op::Ripemd160,
        Op::Sha256,
        Op::Keccak256,
        Op::Reverse,
        Op::Hexlify,
        Op::Unhexlify,
    ] {
        assert_eq!(roundtrip(&op), op);
    }
}

proptest! {
    /// APPEND/PREPEND concatenate exactly.
    #[test]
    fn append_prepend_concatenate(
        msg in prop::collection::vec(any::<u8>(), 0..64),
        data in prop::collection::vec(any::<u8>(), 1..64),
    ) {
        let appended = Op::Append(data.clone()).apply(&msg).unwrap();
        prop_assert_eq!(&appended[..msg.len()], &msg[..]);
        prop_assert_eq!(&appended[msg.len()..], &data[..]);

        let prepended = Op::Prepend(data.clone()).apply(&msg).unwrap();
        prop_assert_eq!(&prepended[..data.len()], &data[..]);
        prop_assert_eq!(&prepended[data.len()..], &msg[..]);
    }

    /// REVERSE is an involution.
    #[test]
    fn reverse_involution(msg in prop::collection::vec(any::<u8>(), 0..128)) {
        let once = Op::Reverse.apply(&msg).unwrap();
        let twice = Op::Reverse.apply(&once).unwrap();
        prop_assert_eq!(twice, msg);
    }

    /// XOR with the same key is an involution.
    #[test]
    fn xor_involution(
        msg in prop::collection::vec(any::<u8>(), 0..128),
        key in prop::collection::vec(any::<u8>(), 1..32),
    ) {
        let once = Op::Xor(key.clone()).apply(&msg).unwrap();
        let twice = Op::Xor(key).apply(&once).unwrap();
        prop_assert_eq!(twice, msg);
    }

    /// HEXLIFY then UNHEXLIFY is the identity.
    #[test]
    fn hexlify_roundtrip(msg in prop::collection::vec(any::<u8>(), 0..128)) {
        let hexed = Op::Hexlify.apply(&msg).unwrap();
        prop_assert_eq!(Op::Unhexlify.apply(&hexed).unwrap(), msg);
    }

    /// SUBSTR with in-range bounds slices exactly.
    #[test]
    fn substr_slices(
        msg in prop::collection::vec(any::<u8>(), 1..128),
        start in 0usize..64,
        len in 1usize..64,
    ) {
        let op = Op::Substr { start: start as u64, len: len as u64 };
        let result = op.apply(&msg);
        if start + len <= msg.len() {
            prop_assert_eq!(result.unwrap(), msg[start..start + len].to_vec());
        } else {
            let is_too_short = matches!(result, Err(OpError::MessageTooShort { .. }));
            prop_assert!(is_too_short);
        }
    }

    /// Wire round-trip for every parameterized shape.
    #[test]
    fn parameterized_roundtrip(
        data in prop::collection::vec(any::<u8>(), 1..64),
        start in any::<u32>(),
        len in 1u32..,
    ) {
        for op in [
            Op::Append(data.clone()),
            Op::Prepend(data.clone()),
            Op::Xor(data.clone()),
            Op::And(data.clone()),
            Op::Or(data.clone()),
            Op::Substr { start: u64::from(start), len: u64::from(len) },
            Op::Left(u64::from(len)),
            Op::Right(u64::from(len)),
        ] {
            prop_assert_eq!(roundtrip(&op), op);
        }
    }

    /// Applying any decodable op never panics.
    #[test]
    fn apply_never_panics(
        msg in prop::collection::vec(any::<u8>(), 0..256),
        key in prop::collection::vec(any::<u8>(), 1..16),
        n in any::<u32>(),
    ) {
        for op in [
            Op::Sha1,
            Op::Sha256,
            Op::Keccak256,
            Op::Ripemd160,
            Op::Reverse,
            Op::Hexlify,
            Op::Unhexlify,
            Op::Append(key.clone()),
            Op::Prepend(key.clone()),
            Op::Xor(key.clone()),
            Op::And(key.clone()),
            Op::Or(key.clone()),
            Op::Left(u64::from(n)),
            Op::Right(u64::from(n)),
            Op::Substr { start: u64::from(n), len: SUBSTR_TO_END },
        ] {
            let _ = op.apply(&msg);
        }
    }
}
