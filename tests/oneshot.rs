use lz4_engine::{compress, compress_hc, compress_with_level, decompress, Error, DEFAULT_HC_LEVEL, MAX_INPUT_SIZE, MAX_LEVEL};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut data = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill(&mut data[..]);
    data
}

fn assert_roundtrip(data: &[u8]) {
    for &level in &[0, 1, DEFAULT_HC_LEVEL, MAX_LEVEL] {
        let compressed = compress_with_level(data, level).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), data, "level {}, {} bytes", level, data.len());
    }
}

#[test]
fn tiny_inputs() {
    assert_roundtrip(b"");
    assert_roundtrip(b"x");
    for len in 1..40 {
        assert_roundtrip(&vec![b'z'; len]);
        assert_roundtrip(&random_bytes(len, len as u64));
    }
}

#[test]
fn around_the_window_boundary() {
    // a random prefix that repeats right at, just inside and just outside the 64KiB window
    let prefix = random_bytes(64, 1);
    for &distance in &[65_534usize, 65_535, 65_536, 65_537] {
        let mut data = prefix.clone();
        data.extend(random_bytes(distance - prefix.len(), distance as u64));
        data.extend_from_slice(&prefix);
        data.extend_from_slice(b"closing literals");
        assert_roundtrip(&data);
    }

    for &len in &[65_535usize, 65_536, 65_537] {
        let data: Vec<u8> = (0..len).map(|i| (i % 1000) as u8).collect();
        assert_roundtrip(&data);
    }
}

#[test]
fn random_data_expands_only_slightly() {
    let data = random_bytes(128 * 1024, 42);
    for compressed in &[compress(&data).unwrap(), compress_hc(&data).unwrap()] {
        assert!(compressed.len() > data.len());
        assert!(compressed.len() < data.len() + data.len() / 200 + 32);
        assert_eq!(decompress(compressed).unwrap(), data);
    }
}

#[test]
fn compressed_output_compresses_again() {
    let text = include_bytes!("../src/raw/compress/hc.rs");
    let once = compress(text).unwrap();
    let twice = compress_hc(&once).unwrap();
    assert_eq!(decompress(&decompress(&twice).unwrap()).unwrap(), &text[..]);
}

#[test]
fn deterministic() {
    let text = include_bytes!("../src/framed/decompress.rs");
    for &level in &[0, 3, DEFAULT_HC_LEVEL] {
        assert_eq!(compress_with_level(text, level).unwrap(), compress_with_level(text, level).unwrap());
    }
}

#[test]
fn hc_beats_fast_on_runs() {
    let data = vec![b'a'; 128 * 1024];
    let fast = compress(&data).unwrap();
    for level in 1..=MAX_LEVEL {
        assert!(compress_with_level(&data, level).unwrap().len() <= fast.len());
    }
}

#[test]
fn hc_is_no_worse_on_text() {
    let text = include_bytes!("../src/framed/compress.rs");
    assert!(compress_hc(text).unwrap().len() <= compress(text).unwrap().len());
}

#[test]
fn corrupt_streams_are_rejected() {
    let text = include_bytes!("../src/lib.rs");
    let compressed = compress(text).unwrap();
    // cut off in the middle
    let truncated = &compressed[..compressed.len() / 2];
    match decompress(truncated) {
        Err(Error::CorruptStream(_)) => {}
        other => panic!("expected a corrupt stream, got {:?}", other.map(|v| v.len())),
    }
}

#[cfg(target_pointer_width = "64")]
#[test]
fn one_byte_too_many() {
    // zeroed allocations are lazy, so this does not actually touch 2GiB
    let data = vec![0u8; MAX_INPUT_SIZE + 1];
    match compress(&data) {
        Err(Error::SizeLimitExceeded { size, max }) => {
            assert_eq!(size, MAX_INPUT_SIZE as u64 + 1);
            assert_eq!(max, MAX_INPUT_SIZE);
        }
        _ => panic!("expected the size limit to be enforced"),
    }
}

#[cfg(target_pointer_width = "64")]
#[test]
#[ignore = "compresses 2GiB"]
fn exactly_the_limit() {
    let data = vec![0u8; MAX_INPUT_SIZE];
    let compressed = compress(&data).unwrap();
    assert_eq!(decompress(&compressed).unwrap().len(), MAX_INPUT_SIZE);
}

proptest! {
    #[test]
    fn arbitrary_bytes_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        prop_assert_eq!(decompress(&compress(&data).unwrap()).unwrap(), data.clone());
        prop_assert_eq!(decompress(&compress_hc(&data).unwrap()).unwrap(), data);
    }

    #[test]
    fn repetitive_bytes_roundtrip(
        alphabet in proptest::collection::vec(any::<u8>(), 1..4),
        picks in proptest::collection::vec(any::<usize>(), 0..8192),
    ) {
        let data: Vec<u8> = picks.iter().map(|&i| alphabet[i % alphabet.len()]).collect();
        prop_assert_eq!(decompress(&compress(&data).unwrap()).unwrap(), data.clone());
        prop_assert_eq!(decompress(&compress_with_level(&data, 4).unwrap()).unwrap(), data);
    }

    #[test]
    fn garbage_never_panics(size in 0u32..100_000, body in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut data = size.to_le_bytes().to_vec();
        data.extend_from_slice(&body);
        if let Ok(decoded) = decompress(&data) {
            prop_assert_eq!(decoded.len(), size as usize);
        }
    }
}
