//! `stream_contract` 集成测试：以连续内存流为参照，验证 `BlockStream` 的读写、寻址、截断与关闭契约。
//!
//! # 测试目标（Why）
//! - 同一操作序列作用于 `BlockStream` 与 `std::io::Cursor<Vec<u8>>` 后，长度、位置、内容必须一致；
//! - 覆盖块边界、读过末尾、越界参数、关闭后访问等边界场景。
//!
//! # 结构安排（How）
//! - `test_data`：可辨识的循环字节模式，便于定位错位；
//! - `assert_matches_reference`：统一比较长度、位置与内容，并检查单块上限。

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use spark_block_stream::{
    BlockStream, BlockStreamError, GrowthConfig, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, SeekOrigin,
    error::codes,
};

const BASE_PATTERN: [u8; 8] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];

/// 生成长度为 `len` 的测试数据：每 8 字节一轮，轮次递增后叠加到基础模式上。
fn test_data(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| BASE_PATTERN[i % 8].wrapping_add((i / 8) as u8))
        .collect()
}

fn assert_matches_reference(subject: &BlockStream, reference: &Cursor<Vec<u8>>) {
    assert_eq!(
        subject.length().unwrap(),
        reference.get_ref().len() as u64,
        "长度应与参照流一致"
    );
    assert_eq!(
        subject.position().unwrap(),
        reference.position(),
        "位置应与参照流一致"
    );
    assert!(
        subject
            .allocation_sizes()
            .iter()
            .flatten()
            .all(|&size| size <= MAX_BLOCK_SIZE),
        "单块尺寸不得超过上限"
    );
    assert_eq!(subject.to_bytes().unwrap().as_ref(), reference.get_ref().as_slice());
}

#[test]
fn new_stream_is_open_and_empty() {
    let subject = BlockStream::new();
    assert!(subject.can_read() && subject.can_seek() && subject.can_write());
    assert_eq!(subject.length().unwrap(), 0);
    assert_eq!(subject.position().unwrap(), 0);
    assert!(subject.allocation_sizes().is_empty());
}

#[test]
fn zero_length_write_changes_nothing() {
    let mut subject = BlockStream::new();
    subject.write_from(&test_data(10), 0, 0).unwrap();
    subject.write_from(&[], 0, 0).unwrap();
    assert_eq!(subject.write(&[]).unwrap(), 0);

    assert_eq!(subject.length().unwrap(), 0);
    assert_eq!(subject.position().unwrap(), 0);
    assert_eq!(subject.block_count(), 0);
    assert!(subject.allocation_sizes().is_empty());
}

#[test]
fn write_then_read_back_for_various_lengths() {
    for len in [0usize, 16, 240, 256, 257, 400, 95_000, 285_000] {
        for prewrite in [false, true] {
            let prelen = if prewrite { len } else { 0 };
            let nonce = test_data(prelen);
            let payload = test_data(len);

            let mut subject = BlockStream::new();
            let mut reference = Cursor::new(Vec::new());
            subject.write_all(&nonce).unwrap();
            reference.write_all(&nonce).unwrap();
            subject.write_all(&payload).unwrap();
            reference.write_all(&payload).unwrap();
            assert_matches_reference(&subject, &reference);

            subject.set_position(prelen as i64).unwrap();
            let mut read_back = vec![0u8; len];
            assert_eq!(subject.read_into(&mut read_back, 0, len).unwrap(), len);
            assert_eq!(read_back, payload, "len={len} prewrite={prewrite}");
            assert_eq!(subject.position().unwrap(), (prelen + len) as u64);
        }
    }
}

#[test]
fn reading_past_end_returns_only_available_bytes() {
    let payload = test_data(100);
    let mut subject = BlockStream::new();
    subject.write_all(&payload).unwrap();
    subject.set_position(0).unwrap();

    let mut out = vec![0u8; 110];
    assert_eq!(subject.read_into(&mut out, 0, 110).unwrap(), 100);
    assert_eq!(&out[..100], payload.as_slice());
    assert_eq!(subject.read_into(&mut out, 0, 110).unwrap(), 0);
}

#[test]
fn read_into_honours_destination_offset() {
    let mut subject = BlockStream::new();
    subject.write_all(b"abcdef").unwrap();
    subject.set_position(1).unwrap();

    let mut out = [b'.'; 8];
    assert_eq!(subject.read_into(&mut out, 2, 3).unwrap(), 3);
    assert_eq!(&out, b"..bcd...");
}

#[test]
fn byte_writes_across_boundary_equal_bulk_write() {
    let payload = test_data(MIN_BLOCK_SIZE + 1);

    let mut bytewise = BlockStream::new();
    for &byte in &payload {
        bytewise.write_byte(byte).unwrap();
    }
    let mut bulk = BlockStream::new();
    bulk.write_all(&payload).unwrap();

    assert_eq!(bytewise.to_bytes().unwrap(), bulk.to_bytes().unwrap());
    assert_eq!(bytewise.length().unwrap(), bulk.length().unwrap());
    assert_eq!(bytewise.allocation_sizes()[..2], [Some(256), Some(256)]);
}

#[test]
fn read_byte_matches_reference_through_end() {
    let payload = test_data(86_000);
    let mut subject = BlockStream::new();
    subject.write_all(&payload).unwrap();
    subject.set_position(0).unwrap();

    for expected in &payload {
        assert_eq!(subject.read_byte().unwrap(), Some(*expected));
    }
    assert_eq!(subject.read_byte().unwrap(), None);
    assert_eq!(subject.read_byte().unwrap(), None);
}

#[test]
fn seek_variants_match_reference() {
    let cases = [
        SeekFrom::Start(0),
        SeekFrom::Start(10),
        SeekFrom::End(0),
        SeekFrom::End(-10),
        SeekFrom::Current(10),
        SeekFrom::Current(-30),
    ];
    for target in cases {
        let payload = test_data(100);
        let mut subject = BlockStream::new();
        let mut reference = Cursor::new(Vec::new());
        subject.write_all(&payload).unwrap();
        reference.write_all(&payload).unwrap();
        subject.seek(SeekFrom::Start(50)).unwrap();
        reference.seek(SeekFrom::Start(50)).unwrap();

        assert_eq!(
            subject.seek(target).unwrap(),
            reference.seek(target).unwrap(),
            "{target:?}"
        );
        assert_matches_reference(&subject, &reference);

        let mut a = Vec::new();
        let mut b = Vec::new();
        subject.read_to_end(&mut a).unwrap();
        reference.read_to_end(&mut b).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn seeking_past_end_extends_length_immediately() {
    let mut subject = BlockStream::new();
    assert_eq!(subject.seek_from_origin(1000, SeekOrigin::Begin).unwrap(), 1000);
    assert_eq!(subject.length().unwrap(), 1000);
    assert_eq!(subject.position().unwrap(), 1000);
    assert_eq!(subject.allocation_sizes()[0], Some(1000));

    subject.set_position(0).unwrap();
    let mut out = Vec::new();
    subject.read_to_end(&mut out).unwrap();
    assert_eq!(out, vec![0u8; 1000]);
}

#[test]
fn setting_position_past_end_zero_fills_gap() {
    let mut subject = BlockStream::new();
    subject.write_all(&test_data(10)).unwrap();
    subject.set_position(50).unwrap();
    assert_eq!(subject.length().unwrap(), 50);
    subject.write_all(b"z").unwrap();

    let bytes = subject.to_bytes().unwrap();
    assert_eq!(&bytes[..10], test_data(10).as_slice());
    assert!(bytes[10..50].iter().all(|&b| b == 0));
    assert_eq!(bytes[50], b'z');
}

#[test]
fn shrinking_zeroes_discarded_suffix() {
    let payload = test_data(10_000);
    let mut subject = BlockStream::new();
    subject.write_all(&payload).unwrap();
    let blocks_before = subject.allocation_sizes();

    subject.set_length(512).unwrap();
    assert_eq!(subject.length().unwrap(), 512);
    assert_eq!(subject.position().unwrap(), 512);
    assert_eq!(subject.allocation_sizes(), blocks_before, "截断不释放块");

    subject.set_length(10_000).unwrap();
    subject.set_position(0).unwrap();
    let mut out = vec![0u8; 10_000];
    assert_eq!(subject.read_into(&mut out, 0, 10_000).unwrap(), 10_000);
    assert_eq!(&out[..512], &payload[..512]);
    assert!(out[512..].iter().all(|&b| b == 0));
}

#[test]
fn shrinking_mid_block_then_regrowing_reads_cleared_data() {
    let payload = test_data(MIN_BLOCK_SIZE);
    let mut subject = BlockStream::new();
    subject.write_all(&payload).unwrap();
    subject.write_all(&payload).unwrap();
    subject.set_length(MIN_BLOCK_SIZE as i64 + 1).unwrap();
    subject.set_length(MIN_BLOCK_SIZE as i64 * 2).unwrap();

    let bytes = subject.to_bytes().unwrap();
    assert_eq!(&bytes[..MIN_BLOCK_SIZE], payload.as_slice());
    assert_eq!(bytes[MIN_BLOCK_SIZE], payload[0]);
    assert!(bytes[MIN_BLOCK_SIZE + 1..].iter().all(|&b| b == 0));
}

#[test]
fn shrinking_keeps_cursor_before_new_length() {
    let mut subject = BlockStream::new();
    subject.write_all(&test_data(300)).unwrap();
    subject.set_position(5).unwrap();
    subject.set_length(100).unwrap();
    assert_eq!(subject.position().unwrap(), 5);
    assert_eq!(subject.read_byte().unwrap(), Some(test_data(6)[5]));
}

#[test]
fn bad_arguments_are_rejected_without_side_effects() {
    let mut subject = BlockStream::new();
    let mut buf = [0u8; 10];

    let err = subject.read_into(&mut buf, 0, 20).unwrap_err();
    assert!(err.is_argument_error());
    assert!(subject.read_into(&mut buf, 11, 0).is_err());
    assert!(subject.write_from(&buf, 5, 6).is_err());
    assert!(subject.write_from(&buf, usize::MAX, 1).is_err());

    assert_eq!(
        subject.set_position(-10).unwrap_err(),
        BlockStreamError::OutOfRange {
            name: "position",
            value: -10
        }
    );
    assert_eq!(subject.set_length(-10).unwrap_err().code(), codes::INVALID_ARGUMENT);
    assert_eq!(
        SeekOrigin::try_from(123).unwrap_err().code(),
        codes::UNKNOWN_SEEK_ORIGIN
    );

    assert_eq!(subject.length().unwrap(), 0);
    assert!(subject.allocation_sizes().is_empty());
}

#[test]
fn seeking_before_begin_fails_for_every_origin() {
    for origin in [SeekOrigin::Begin, SeekOrigin::Current, SeekOrigin::End] {
        let mut subject = BlockStream::new();
        let err = subject.seek_from_origin(-1, origin).unwrap_err();
        assert_eq!(err, BlockStreamError::SeekBeforeBegin { target: -1 });
        assert!(!err.is_argument_error());
        assert_eq!(subject.position().unwrap(), 0);
    }

    let mut subject = BlockStream::new();
    let err = subject.seek(SeekFrom::Current(-1)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    let inner = err
        .get_ref()
        .and_then(|e| e.downcast_ref::<BlockStreamError>())
        .unwrap();
    assert_eq!(inner.code(), codes::SEEK_BEFORE_BEGIN);
}

#[test]
fn unsatisfiable_capacity_fails_without_side_effects() {
    let mut subject = BlockStream::new();
    subject.write_all(b"abc").unwrap();
    let blocks = subject.allocation_sizes();

    let err = subject.set_length(i64::MAX).unwrap_err();
    assert!(matches!(err, BlockStreamError::AllocationFailed { .. }));
    assert_eq!(err.code(), codes::ALLOCATION_FAILED);

    let err = subject.set_position(i64::MAX).unwrap_err();
    assert!(matches!(err, BlockStreamError::AllocationFailed { .. }));

    let err = subject.seek(SeekFrom::Start(i64::MAX as u64)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::OutOfMemory);

    assert_eq!(subject.length().unwrap(), 3);
    assert_eq!(subject.position().unwrap(), 3);
    assert_eq!(subject.allocation_sizes(), blocks);
    assert_eq!(subject.to_bytes().unwrap().as_ref(), b"abc");

    subject.write_all(b"de").unwrap();
    assert_eq!(subject.to_bytes().unwrap().as_ref(), b"abcde");
}

#[test]
fn closed_stream_rejects_everything_but_flush() {
    let mut subject = BlockStream::new();
    subject.write_all(&test_data(1000)).unwrap();
    subject.close();
    subject.close();

    assert!(!subject.can_read() && !subject.can_seek() && !subject.can_write());
    assert!(subject.is_closed());
    assert!(subject.allocation_sizes().is_empty());
    subject.flush().unwrap();

    let mut buf = [0u8; 1];
    let results = [
        subject.length().map(drop),
        subject.position().map(drop),
        subject.set_length(0),
        subject.set_position(0),
        subject.seek_from_origin(0, SeekOrigin::Begin).map(drop),
        subject.write_from(&buf, 0, 1),
        subject.write_byte(1),
        subject.read_into(&mut buf, 0, 1).map(drop),
        subject.read_byte().map(drop),
        subject.to_bytes().map(drop),
    ];
    for result in results {
        assert_eq!(result.unwrap_err(), BlockStreamError::Closed);
    }
    assert!(subject.read(&mut buf).is_err());
}

#[test]
fn custom_geometry_caps_every_block() {
    let config = GrowthConfig::from_toml_str("min_block_size = 8\nmax_block_size = 32\n").unwrap();
    let mut subject = BlockStream::with_config(config).unwrap();
    let payload = test_data(1000);
    subject.write_all(&payload).unwrap();

    assert!(subject.allocation_sizes().iter().flatten().all(|&s| s <= 32));
    assert_eq!(subject.to_bytes().unwrap().as_ref(), payload.as_slice());
    assert!(BlockStream::with_config(GrowthConfig {
        min_block_size: 64,
        max_block_size: 32,
        start_block_count: 1,
    })
    .is_err());
}

#[test]
fn io_copy_streams_through_blocks() {
    let payload = test_data(200_000);
    let mut subject = BlockStream::new();
    io::copy(&mut payload.as_slice(), &mut subject).unwrap();
    subject.rewind().unwrap();

    let mut sink = Vec::new();
    io::copy(&mut subject, &mut sink).unwrap();
    assert_eq!(sink, payload);
}
