//! 逻辑位置在块序列上的缓存分解。
//!
//! 顺序读写只做增量推进（O(1)），显式寻址才从头线性遍历块边界重建分解。

use crate::allocator::BlockAllocator;

/// 位置 = `base + offset`，`index` 指向包含该位置的块。
///
/// 位置恰好等于全部块尺寸之和时，`index == block_count` 且 `offset == 0`，
/// 下一次写入会先追加块再落到该索引上。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Cursor {
    pub(crate) index: usize,
    pub(crate) base: u64,
    pub(crate) offset: usize,
}

impl Cursor {
    pub(crate) fn position(&self) -> u64 {
        self.base + self.offset as u64
    }

    /// 从第一个块开始遍历，定位 `position` 所在的块。
    pub(crate) fn locate(allocator: &BlockAllocator, position: u64) -> Self {
        let mut cursor = Self::default();
        let mut remaining = position;
        while cursor.index < allocator.block_count() {
            let len = allocator.block(cursor.index).len() as u64;
            if remaining < len {
                break;
            }
            cursor.base += len;
            cursor.index += 1;
            remaining -= len;
        }
        debug_assert!(
            cursor.index < allocator.block_count() || remaining == 0,
            "position {position} lies beyond allocated storage"
        );
        cursor.offset = remaining as usize;
        cursor
    }

    /// 在长度为 `block_len` 的当前块内前进 `n` 字节，触达块尾时滚动到下一块起点。
    pub(crate) fn advance(&mut self, n: usize, block_len: usize) {
        self.offset += n;
        if self.offset == block_len {
            self.index += 1;
            self.base += block_len as u64;
            self.offset = 0;
        }
    }
}
