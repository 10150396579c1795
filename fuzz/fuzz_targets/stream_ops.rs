#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spark_block_stream::{BlockStream, GrowthConfig, SeekOrigin};

/// Fuzz 指令：描述一次分块流操作序列。
///
/// - **Why**：游标缓存与块边界的组合极多，手写用例难以穷举；Fuzzer 生成任意指令流，
///   与连续内存上的朴素实现逐步比对，暴露错位、越界 panic 与长度漂移。
/// - **How**：块尺寸由输入决定（限制在很小的范围内），使短输入也能跨越大量块边界。
/// - **What**：任何一步出现内容、长度或位置不一致即 panic，由 libFuzzer 记录复现样本。
#[derive(Debug, Arbitrary)]
struct StreamCase {
    min_block: u8,
    max_block: u8,
    ops: Vec<StreamOp>,
}

#[derive(Debug, Arbitrary)]
enum StreamOp {
    Write(Vec<u8>),
    WriteByte(u8),
    Read(u16),
    ReadByte,
    Seek { offset: i16, origin: u8 },
    SetPosition(u16),
    SetLength(u16),
}

fuzz_target!(|case: StreamCase| {
    let min = usize::from(case.min_block.max(1));
    let max = min.max(usize::from(case.max_block));
    let Ok(config) = GrowthConfig::new(min, max, 1) else {
        return;
    };
    let Ok(mut stream) = BlockStream::with_config(config) else {
        return;
    };

    let mut data: Vec<u8> = Vec::new();
    let mut position = 0usize;

    for op in case.ops {
        match op {
            StreamOp::Write(bytes) => {
                stream.write_from(&bytes, 0, bytes.len()).unwrap();
                overwrite(&mut data, &mut position, &bytes);
            }
            StreamOp::WriteByte(byte) => {
                stream.write_byte(byte).unwrap();
                overwrite(&mut data, &mut position, &[byte]);
            }
            StreamOp::Read(count) => {
                let count = usize::from(count);
                let mut out = vec![0u8; count];
                let read = stream.read_into(&mut out, 0, count).unwrap();
                let end = (position + count).min(data.len());
                assert_eq!(&out[..read], &data[position..end]);
                position = end;
            }
            StreamOp::ReadByte => {
                let expected = data.get(position).copied();
                assert_eq!(stream.read_byte().unwrap(), expected);
                if expected.is_some() {
                    position += 1;
                }
            }
            StreamOp::Seek { offset, origin } => {
                let Ok(origin) = SeekOrigin::try_from(i32::from(origin % 4)) else {
                    continue;
                };
                let base = match origin {
                    SeekOrigin::Begin => 0,
                    SeekOrigin::Current => position as i64,
                    SeekOrigin::End => data.len() as i64,
                };
                let target = base + i64::from(offset);
                let result = stream.seek_from_origin(i64::from(offset), origin);
                if target < 0 {
                    assert!(result.is_err());
                } else {
                    assert_eq!(result.unwrap(), target as u64);
                    move_to(&mut data, &mut position, target as usize);
                }
            }
            StreamOp::SetPosition(target) => {
                stream.set_position(i64::from(target)).unwrap();
                move_to(&mut data, &mut position, usize::from(target));
            }
            StreamOp::SetLength(length) => {
                let length = usize::from(length);
                stream.set_length(length as i64).unwrap();
                data.resize(length, 0);
                position = position.min(length);
            }
        }

        assert_eq!(stream.length().unwrap(), data.len() as u64);
        assert_eq!(stream.position().unwrap(), position as u64);
        assert!(stream.allocation_sizes().iter().flatten().all(|&size| size <= max));
    }

    assert_eq!(stream.to_bytes().unwrap().as_ref(), data.as_slice());
});

fn overwrite(data: &mut Vec<u8>, position: &mut usize, bytes: &[u8]) {
    let end = *position + bytes.len();
    if end > data.len() {
        data.resize(end, 0);
    }
    data[*position..end].copy_from_slice(bytes);
    *position = end;
}

fn move_to(data: &mut Vec<u8>, position: &mut usize, target: usize) {
    if target > data.len() {
        data.resize(target, 0);
    }
    *position = target;
}
