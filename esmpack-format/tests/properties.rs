use esmpack_format::{bundle, BundleEntry, BundleReader, OpenError};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;

/// Entry lists with unique names, in arbitrary order.
fn entries() -> impl Strategy<Value = Vec<BundleEntry>> {
    btree_map(
        "[a-z0-9_./-]{1,24}",
        (
            prop_oneof![Just(""), Just("text/javascript"), Just("application/wasm")],
            any::<i64>(),
            vec(any::<u8>(), 0..64),
        ),
        0..8,
    )
    .prop_map(|map| {
        map.into_iter()
            .map(|(name, (ty, last_modified, content))| {
                BundleEntry::new(name, ty, last_modified, content)
            })
            .collect::<Vec<_>>()
    })
    .prop_shuffle()
}

proptest! {
    #[test]
    fn round_trip(input in entries()) {
        let reader = BundleReader::open(bundle(input.clone()).unwrap()).unwrap();
        prop_assert_eq!(reader.len(), input.len());

        for (entry, expected) in reader.entries().zip(input.iter()) {
            prop_assert_eq!(&entry.name, &expected.name);
            prop_assert_eq!(&entry.content_type, &expected.content_type);
            prop_assert_eq!(entry.last_modified, expected.last_modified);
            prop_assert_eq!(entry.size, expected.content.len() as u64);
        }

        for expected in input.iter() {
            let file = reader.read_file(&expected.name).unwrap();
            prop_assert_eq!(file.bytes(), &expected.content[..]);
        }
    }

    #[test]
    fn deterministic(input in entries()) {
        prop_assert_eq!(bundle(input.clone()).unwrap(), bundle(input).unwrap());
    }

    #[test]
    fn any_flipped_byte_is_rejected(input in entries(), pos in any::<prop::sample::Index>(), bit in 0u8..8) {
        let mut buf = bundle(input).unwrap();
        let pos = pos.index(buf.len());
        buf[pos] ^= 1 << bit;
        prop_assert!(BundleReader::open(buf).is_err());
    }

    #[test]
    fn flipped_content_byte_is_a_checksum_mismatch(input in entries(), pos in any::<prop::sample::Index>(), bit in 0u8..8) {
        let mut buf = bundle(input).unwrap();
        let content_len = BundleReader::open(buf.clone()).unwrap().content_len();
        prop_assume!(content_len > 0);

        // Content sits between the entry table and the 4-byte trailer
        let content_start = buf.len() - 4 - content_len;
        let pos = content_start + pos.index(content_len);
        buf[pos] ^= 1 << bit;
        prop_assert!(matches!(
            BundleReader::open(buf),
            Err(OpenError::ChecksumMismatch { .. })
        ), "expected ChecksumMismatch");
    }
}
