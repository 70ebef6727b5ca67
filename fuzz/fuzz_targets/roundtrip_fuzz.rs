#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4_engine::{BlockSize, CompressionSettings, LZ4FrameReader, MAX_LEVEL};
use std::io::{Cursor, Read};

fuzz_target!(|data: &[u8]| {
    let (level, data) = match data.split_first() {
        Some((&first, rest)) => (u32::from(first) % (MAX_LEVEL + 1), rest),
        None => return,
    };

    let oneshot = lz4_engine::compress_with_level(data, level).expect("Could not compress input data");
    assert_eq!(lz4_engine::decompress(&oneshot).expect("Could not decompress block"), data);

    let mut output = Vec::new();
    CompressionSettings::default()
        .level(level)
        .block_size(BlockSize::Max64KB)
        .block_checksums(true)
        .compress(Cursor::new(data), &mut output)
        .expect("Could not compress input data");

    let mut lz4_reader = LZ4FrameReader::new(Cursor::new(output))
        .expect("Could not create frame reader")
        .into_read();

    let mut roundtripped = Vec::new();
    lz4_reader.read_to_end(&mut roundtripped).expect("Could not read decompressed data");
    assert!(roundtripped.iter().eq(data));
});
