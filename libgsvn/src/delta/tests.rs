use super::*;

fn window_bytes(version: Version, window: &Window) -> Vec<u8> {
    let mut out = vec![b'S', b'V', b'N', version as u8];
    window.encode(version, &mut out).unwrap();
    out
}

#[test]
fn decodes_plain_single_window_stream() {
    let window = Window {
        source_offset: 0,
        source_length: 0,
        target_length: 3,
        instructions: vec![Instruction::FromNew { length: 3 }],
        new_data: b"abc".to_vec(),
    };
    let bytes = window_bytes(Version::Plain, &window);
    let delta = Delta::decode(&bytes).unwrap();
    assert_eq!(delta.windows.len(), 1);
    assert_eq!(delta.apply(b"").unwrap(), b"abc");
}

#[test]
fn from_source_copies_a_slice_of_the_source() {
    let window = Window {
        source_offset: 2,
        source_length: 3,
        target_length: 3,
        instructions: vec![Instruction::FromSource { offset: 0, length: 3 }],
        new_data: vec![],
    };
    let bytes = window_bytes(Version::Plain, &window);
    let delta = Delta::decode(&bytes).unwrap();
    assert_eq!(delta.apply(b"xyabcde").unwrap(), b"abc");
}

#[test]
fn from_target_repeat_wraps_to_reproduce_run_length() {
    // FROM_NEW "a" then FROM_TARGET off=0 length=4 against empty source
    // must produce "aaaaa"
    let window = Window {
        source_offset: 0,
        source_length: 0,
        target_length: 5,
        instructions: vec![
            Instruction::FromNew { length: 1 },
            Instruction::FromTarget { offset: 0, length: 4 },
        ],
        new_data: b"a".to_vec(),
    };
    let bytes = window_bytes(Version::Plain, &window);
    let delta = Delta::decode(&bytes).unwrap();
    assert_eq!(delta.apply(b"").unwrap(), b"aaaaa");
}

#[test]
fn rejects_bad_magic() {
    assert!(Delta::decode(b"nope").is_err());
}

#[test]
fn rejects_unsupported_version() {
    assert!(Delta::decode(b"SVN\x02").is_err());
}

#[test]
fn deflated_window_round_trips() {
    let target = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_vec();
    let encoded = Delta::encode(&target, true).unwrap();
    assert_eq!(&encoded[0..4], b"SVN\x01");
    let delta = Delta::decode(&encoded).unwrap();
    assert_eq!(delta.apply(b"").unwrap(), target);
}

#[test]
fn encoder_splits_large_targets_into_multiple_windows() {
    let target = vec![7u8; MAX_ENCODER_WINDOW * 2 + 10];
    let encoded = Delta::encode(&target, false).unwrap();
    let delta = Delta::decode(&encoded).unwrap();
    assert_eq!(delta.windows.len(), 3);
    assert_eq!(delta.apply(b"").unwrap(), target);
}

#[test]
fn instruction_with_small_length_packs_into_header_byte() {
    let mut bytes = Vec::new();
    Instruction::FromNew { length: 10 }.encode(&mut bytes).unwrap();
    assert_eq!(bytes, vec![TAG_FROM_NEW | 10]);
}

#[test]
fn instruction_with_large_length_uses_trailing_varint() {
    let mut bytes = Vec::new();
    Instruction::FromNew { length: 1000 }.encode(&mut bytes).unwrap();
    assert_eq!(bytes[0], TAG_FROM_NEW);
    let mut r = &bytes[1..];
    assert_eq!(read_varint(&mut r).unwrap(), 1000);
}

#[quickcheck_macros::quickcheck]
fn encode_decode_round_trips_arbitrary_bytes(data: Vec<u8>) -> bool {
    let encoded = Delta::encode(&data, false).unwrap();
    Delta::decode(&encoded).unwrap().apply(b"").unwrap() == data
}
