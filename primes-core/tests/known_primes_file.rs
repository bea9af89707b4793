//! Decoding NCC files from disk and feeding them into the accelerated test.

use primes_core::{
    decode_gaps, is_prime, is_prime_with, ncc::DecodeError, AnchorIndex, KnownPrimes,
};
use std::{fs::File, io::Write, path::Path};

/// Write `values` as an NCC stream, resyncing on gaps above `u16::MAX`.
fn write_ncc(path: &Path, values: &[u64]) {
    let mut buf = Vec::new();
    let mut iter = values.iter();

    if let Some(first) = iter.next() {
        buf.extend_from_slice(&first.to_le_bytes());
        let mut last = *first;

        for &v in iter {
            match u16::try_from(v - last) {
                Ok(delta) => buf.extend_from_slice(&delta.to_le_bytes()),
                Err(_) => {
                    buf.extend_from_slice(&0u16.to_le_bytes());
                    buf.extend_from_slice(&v.to_le_bytes());
                }
            }
            last = v;
        }
    }

    File::create(path).unwrap().write_all(&buf).unwrap();
}

fn primes_up_to(limit: u64) -> Vec<u64> {
    (0..=limit).filter(|&n| is_prime(n)).collect()
}

#[test]
fn small_primes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.ncc");
    write_ncc(&path, &[2, 3, 5, 7, 11, 13]);

    assert_eq!(decode_gaps(&path, 6, 0).unwrap(), vec![2, 3, 5, 7, 11, 13]);
}

#[test]
fn resync_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("resync.ncc");
    write_ncc(&path, &[2, 3, 100_000, 100_003]);

    assert_eq!(
        decode_gaps(&path, 4, 0).unwrap(),
        vec![2, 3, 100_000, 100_003]
    );
}

#[test]
fn missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.ncc");

    match decode_gaps(&path, 1, 0) {
        Err(DecodeError::Open { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected open failure, got {other:?}"),
    }
}

#[test]
fn truncated_files() {
    let dir = tempfile::tempdir().unwrap();

    let anchor = dir.path().join("anchor.ncc");
    File::create(&anchor)
        .unwrap()
        .write_all(&2u64.to_le_bytes()[..5])
        .unwrap();
    assert!(matches!(
        decode_gaps(&anchor, 1, 0),
        Err(DecodeError::ShortReadAnchor { offset: 0 })
    ));

    let delta = dir.path().join("delta.ncc");
    let mut bytes = 2u64.to_le_bytes().to_vec();
    bytes.push(1);
    File::create(&delta).unwrap().write_all(&bytes).unwrap();
    assert!(matches!(
        decode_gaps(&delta, 2, 0),
        Err(DecodeError::ShortReadDelta { offset: 8 })
    ));
}

#[test]
fn huge_length_is_a_short_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("single.ncc");
    write_ncc(&path, &[2]);

    assert!(matches!(
        decode_gaps(&path, usize::MAX / 4, 0),
        Err(DecodeError::ShortReadDelta { offset: 8 })
    ));

    let index = AnchorIndex::scan_file(&path).unwrap();
    let file = File::open(&path).unwrap();
    assert!(matches!(
        index.decode_range(file, 0, usize::MAX),
        Err(DecodeError::ShortReadDelta { offset: 8 })
    ));
}

#[test]
fn start_past_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.ncc");
    write_ncc(&path, &[2, 3, 5]);

    assert!(matches!(
        decode_gaps(&path, 1, 1_000),
        Err(DecodeError::ShortReadAnchor { offset: 1_000 })
    ));
}

#[test]
fn resume_from_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sparse.ncc");

    // Force a few anchors by jumping past the 16 bit delta range.
    let mut values = primes_up_to(2_000);
    values.extend([1_000_003, 1_000_033, 1_000_037, 5_000_011, 5_000_077]);
    write_ncc(&path, &values);

    let index = AnchorIndex::scan_file(&path).unwrap();
    assert_eq!(index.len(), values.len() as u64);
    assert_eq!(index.entries().len(), 3);

    for entry in index.entries() {
        let decoded = decode_gaps(&path, 2, entry.offset).unwrap();
        assert_eq!(decoded[0], entry.value);
        assert_eq!(decoded[0], values[entry.position as usize]);
    }

    let file = File::open(&path).unwrap();
    let tail = index.decode_range(file, 300, values.len() - 300).unwrap();
    assert_eq!(tail, values[300..]);
}

#[test]
fn decoded_list_accelerates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("primes.ncc");
    let primes = primes_up_to(50_000);
    write_ncc(&path, &primes);

    let known = KnownPrimes::new(decode_gaps(&path, primes.len(), 0).unwrap()).unwrap();
    assert_eq!(known.last(), primes.last().copied());

    for n in (1_000_000_000u64..1_000_010_000).chain([4_294_967_291, 4_294_967_297]) {
        assert_eq!(is_prime_with(n, &known), is_prime(n), "mismatch at {n}");
    }
}
