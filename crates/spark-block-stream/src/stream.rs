//! `BlockStream`：可读、可写、可寻址、可截断的分块内存流。
//!
//! # 模块定位（Why）
//! - 对外行为与一块连续内存缓冲等价，内部却由一组互不相连的块承载，
//!   任何一次分配都不会越过最大块尺寸，扩容也从不复制既有数据；
//! - 同时实现 `std::io::{Read, Write, Seek}`，可直接替换 `Cursor<Vec<u8>>` 接入现有 IO 代码。
//!
//! # 核心机制（How）
//! - 逻辑长度 `length` 与缓存游标 [`Cursor`] 分离维护：顺序读写沿块增量推进游标，
//!   显式寻址与截断才重新遍历块边界；
//! - 需要容量时统一委托 [`BlockAllocator::ensure_capacity`]；
//! - 生命周期只有 `Open -> Closed` 一次跃迁，关闭后除 `flush` 外的操作均返回
//!   [`BlockStreamError::Closed`]。
//!
//! # 契约说明（What）
//! - 不变式：`length <= capacity`，`position <= length`；
//! - 把位置设到长度之外（含寻址）会立即预留容量并把长度扩展到该位置，新区域读出为 0；
//! - 缩短长度会把被丢弃的逻辑区间清零，但块本身不会释放；
//! - 单一所有者，不做内部同步；跨线程共享需调用方自行加锁。

use std::io;

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::allocator::BlockAllocator;
use crate::config::GrowthConfig;
use crate::cursor::Cursor;
use crate::error::{BlockStreamError, Result};

/// 寻址原点。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SeekOrigin {
    /// 相对流起点。
    Begin,
    /// 相对当前位置。
    Current,
    /// 相对逻辑长度。
    End,
}

impl TryFrom<i32> for SeekOrigin {
    type Error = BlockStreamError;

    /// 按 `0 = Begin`、`1 = Current`、`2 = End` 解析原始判别值，其余取值为参数错误。
    fn try_from(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(Self::Begin),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            origin => Err(BlockStreamError::UnknownSeekOrigin { origin }),
        }
    }
}

/// 分块内存流。
///
/// # 教案式说明
/// - **意图 (Why)**：长时间增长的连续缓冲会不断申请更大的连续内存并整体搬迁；
///   `BlockStream` 只追加块，单块不超过 [`GrowthConfig::max_block_size`]，
///   而总容量仍沿连续缓冲的倍增曲线增长，容量行为可预测；
/// - **契约 (What)**：
///   - 读操作在数据耗尽时返回 0 或 `None`，从不因到达末尾而报错；
///   - 参数类错误在任何状态变更之前返回；
///   - 零长度写入不分配、不改变任何状态；
/// - **执行 (How)**：见模块文档；
/// - **风险 (Trade-offs)**：寻址越过末尾会立即分配并扩展长度，
///   与“延迟到下一次写入”的常见流约定不同，这是刻意保留的行为。
///
/// ```
/// use std::io::{Read, Seek, SeekFrom, Write};
/// use spark_block_stream::BlockStream;
///
/// let mut stream = BlockStream::new();
/// stream.write_all(b"hello blocks").unwrap();
/// stream.seek(SeekFrom::Start(6)).unwrap();
/// let mut tail = String::new();
/// stream.read_to_string(&mut tail).unwrap();
/// assert_eq!(tail, "blocks");
/// ```
#[derive(Debug)]
pub struct BlockStream {
    allocator: BlockAllocator,
    length: u64,
    cursor: Cursor,
    closed: bool,
}

impl Default for BlockStream {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStream {
    /// 以默认增长参数创建空流：长度、位置、容量均为 0，不持有任何块。
    pub fn new() -> Self {
        Self::from_validated(GrowthConfig::default())
    }

    /// 以自定义增长参数创建空流。
    pub fn with_config(config: GrowthConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: GrowthConfig) -> Self {
        Self {
            allocator: BlockAllocator::new(config),
            length: 0,
            cursor: Cursor::default(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(BlockStreamError::Closed)
        } else {
            Ok(())
        }
    }

    pub fn can_read(&self) -> bool {
        !self.closed
    }

    pub fn can_seek(&self) -> bool {
        !self.closed
    }

    pub fn can_write(&self) -> bool {
        !self.closed
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn config(&self) -> &GrowthConfig {
        self.allocator.config()
    }

    /// 逻辑长度。
    pub fn length(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.length)
    }

    /// 当前读写位置。
    pub fn position(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.cursor.position())
    }

    /// 设置读写位置；负值返回 [`BlockStreamError::OutOfRange`]。
    ///
    /// 位置超过当前长度时立即预留容量并把长度扩展到该位置。
    pub fn set_position(&mut self, value: i64) -> Result<()> {
        self.ensure_open()?;
        let position = u64::try_from(value).map_err(|_| BlockStreamError::OutOfRange {
            name: "position",
            value,
        })?;
        self.reposition(position)
    }

    /// 增长曲线意义上的容量，与连续倍增缓冲的容量口径一致。
    pub fn capacity(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.allocator.capacity())
    }

    /// 已分配块的字节总和。
    pub fn allocated_bytes(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.allocator.allocated_bytes())
    }

    /// 已分配的块数。
    pub fn block_count(&self) -> usize {
        self.allocator.block_count()
    }

    /// 按索引顺序列出块尺寸，预留但尚未填充的索引槽位为 `None`；关闭后为空。
    ///
    /// 仅用于诊断与验证增长曲线。
    pub fn allocation_sizes(&self) -> Vec<Option<usize>> {
        self.allocator.allocation_sizes()
    }

    /// 从当前位置读取最多 `count` 字节到 `dst[offset..offset + count]`，返回实际读取的字节数。
    ///
    /// # 契约
    /// - `offset + count` 超出 `dst` 时返回参数错误且不读取任何数据；
    /// - 剩余数据不足时只读取剩余部分，位置已在末尾时返回 0；
    /// - 可跨越任意多个块边界。
    pub fn read_into(&mut self, dst: &mut [u8], offset: usize, count: usize) -> Result<usize> {
        self.ensure_open()?;
        check_bounds(dst.len(), offset, count)?;
        if count == 0 {
            return Ok(0);
        }
        Ok(self.copy_out(&mut dst[offset..offset + count]))
    }

    /// 读取单个字节；已到末尾时返回 `Ok(None)`。
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        self.ensure_open()?;
        if self.cursor.position() >= self.length {
            return Ok(None);
        }
        let block = self.allocator.block(self.cursor.index);
        let value = block[self.cursor.offset];
        let block_len = block.len();
        self.cursor.advance(1, block_len);
        Ok(Some(value))
    }

    /// 把 `src[offset..offset + count]` 写入当前位置，必要时先扩容；写过末尾时同步扩展长度。
    ///
    /// `count == 0` 是完全的空操作：不分配、不移动位置、不改变长度。
    pub fn write_from(&mut self, src: &[u8], offset: usize, count: usize) -> Result<()> {
        self.ensure_open()?;
        check_bounds(src.len(), offset, count)?;
        if count == 0 {
            return Ok(());
        }
        self.copy_in(&src[offset..offset + count])
    }

    /// 写入单个字节，扩容与长度规则与 [`write_from`](Self::write_from) 一致。
    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.ensure_open()?;
        let end = self.end_of_write(1)?;
        self.allocator.ensure_capacity(end)?;

        let index = self.cursor.index;
        let offset = self.cursor.offset;
        let block = self.allocator.block_mut(index);
        block[offset] = value;
        let block_len = block.len();
        self.cursor.advance(1, block_len);
        self.extend_length_to_cursor();
        Ok(())
    }

    /// 将 `Buf` 的全部剩余内容写入当前位置，返回写入的字节数。
    ///
    /// 扩容按剩余总量一次性完成，与一次等长的 [`write_from`](Self::write_from) 得到相同的块布局。
    pub fn write_buf<B: Buf>(&mut self, mut buf: B) -> Result<usize> {
        self.ensure_open()?;
        let total = buf.remaining();
        if total == 0 {
            return Ok(0);
        }
        let end = self.end_of_write(total)?;
        self.allocator.ensure_capacity(end)?;
        while buf.has_remaining() {
            let chunk = buf.chunk();
            let n = chunk.len();
            self.copy_in(chunk)?;
            buf.advance(n);
        }
        Ok(total)
    }

    /// 按原点寻址并返回新位置。
    ///
    /// 结果为负时返回 [`BlockStreamError::SeekBeforeBegin`]；结果超过长度时与
    /// [`set_position`](Self::set_position) 一样立即扩展长度。
    pub fn seek_from_origin(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        self.ensure_open()?;
        let base = match origin {
            SeekOrigin::Begin => 0,
            SeekOrigin::Current => self.cursor.position(),
            SeekOrigin::End => self.length,
        };
        let target = i128::from(base) + i128::from(offset);
        if target < 0 {
            return Err(BlockStreamError::SeekBeforeBegin { target });
        }
        let position = u64::try_from(target).map_err(|_| {
            BlockStreamError::invalid_argument("offset", "seek target exceeds the addressable range")
        })?;
        self.reposition(position)?;
        Ok(position)
    }

    /// 设置逻辑长度。
    ///
    /// - 负值返回参数错误；
    /// - 增长时只保证容量，新增区域由新块的零初始化保证读出为 0；
    /// - 缩短时清零 `[value, old_length)`，块保持分配；位置越过新长度时回退到新长度。
    pub fn set_length(&mut self, value: i64) -> Result<()> {
        self.ensure_open()?;
        let length = u64::try_from(value).map_err(|_| {
            BlockStreamError::invalid_argument("value", "length must be non-negative")
        })?;

        self.allocator.ensure_capacity(length)?;
        if length < self.length {
            trace!(
                target: "spark_block_stream",
                from = self.length,
                to = length,
                "truncating stream"
            );
            self.allocator.zero_range(length, self.length - length);
            if length < self.cursor.position() {
                self.reposition(length)?;
            }
        }
        self.length = length;
        Ok(())
    }

    /// 复制 `[0, length)` 为一段连续的只读字节，不移动位置。
    pub fn to_bytes(&self) -> Result<Bytes> {
        self.ensure_open()?;
        let total = usize::try_from(self.length).map_err(|_| BlockStreamError::AllocationFailed {
            requested: self.length,
        })?;
        let mut out = BytesMut::with_capacity(total);
        let mut remaining = total;
        for block in self.allocator.blocks() {
            if remaining == 0 {
                break;
            }
            let n = block.len().min(remaining);
            out.extend_from_slice(&block[..n]);
            remaining -= n;
        }
        Ok(out.freeze())
    }

    /// 关闭流并释放全部块；重复调用无副作用。
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        debug!(
            target: "spark_block_stream",
            length = self.length,
            blocks = self.allocator.block_count(),
            "closing block stream"
        );
        self.allocator.release();
        self.length = 0;
        self.cursor = Cursor::default();
        self.closed = true;
    }

    /// 位置设置的唯一实现：越过长度时先扩容并扩展长度，再从头定位游标。
    fn reposition(&mut self, position: u64) -> Result<()> {
        if position > self.length {
            self.allocator.ensure_capacity(position)?;
            self.length = position;
        }
        self.cursor = Cursor::locate(&self.allocator, position);
        trace!(
            target: "spark_block_stream",
            position,
            block = self.cursor.index,
            "repositioned cursor"
        );
        Ok(())
    }

    fn end_of_write(&self, count: usize) -> Result<u64> {
        self.cursor
            .position()
            .checked_add(count as u64)
            .ok_or(BlockStreamError::invalid_argument(
                "count",
                "write would overflow the addressable range",
            ))
    }

    fn extend_length_to_cursor(&mut self) {
        let position = self.cursor.position();
        if position > self.length {
            self.length = position;
        }
    }

    /// 从游标处复制到 `dst`，受逻辑长度约束。
    fn copy_out(&mut self, dst: &mut [u8]) -> usize {
        let available = self.length.saturating_sub(self.cursor.position());
        let to_read = (dst.len() as u64).min(available) as usize;

        let mut cursor = self.cursor;
        let mut read = 0;
        while read < to_read {
            let block = self.allocator.block(cursor.index);
            let n = (block.len() - cursor.offset).min(to_read - read);
            dst[read..read + n].copy_from_slice(&block[cursor.offset..cursor.offset + n]);
            read += n;
            cursor.advance(n, block.len());
        }
        self.cursor = cursor;
        read
    }

    /// 扩容后从游标处写入 `src`，并按需扩展长度。
    fn copy_in(&mut self, src: &[u8]) -> Result<()> {
        let end = self.end_of_write(src.len())?;
        self.allocator.ensure_capacity(end)?;

        let mut cursor = self.cursor;
        let mut written = 0;
        while written < src.len() {
            let block = self.allocator.block_mut(cursor.index);
            let n = (block.len() - cursor.offset).min(src.len() - written);
            block[cursor.offset..cursor.offset + n].copy_from_slice(&src[written..written + n]);
            written += n;
            let block_len = block.len();
            cursor.advance(n, block_len);
        }
        self.cursor = cursor;
        self.extend_length_to_cursor();
        Ok(())
    }
}

fn check_bounds(len: usize, offset: usize, count: usize) -> Result<()> {
    if offset > len {
        return Err(BlockStreamError::invalid_argument(
            "offset",
            "offset lies beyond the end of the buffer",
        ));
    }
    if count > len - offset {
        return Err(BlockStreamError::invalid_argument(
            "count",
            "offset + count exceeds the buffer length",
        ));
    }
    Ok(())
}

impl io::Read for BlockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        Ok(self.read_into(buf, 0, len)?)
    }
}

impl io::Write for BlockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_from(buf, 0, buf.len())?;
        Ok(buf.len())
    }

    /// 空操作；与其它操作不同，关闭后调用同样成功。
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for BlockStream {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, origin) = match pos {
            io::SeekFrom::Start(n) => {
                let offset = i64::try_from(n).map_err(|_| {
                    BlockStreamError::invalid_argument("offset", "seek target exceeds i64::MAX")
                })?;
                (offset, SeekOrigin::Begin)
            }
            io::SeekFrom::Current(delta) => (delta, SeekOrigin::Current),
            io::SeekFrom::End(delta) => (delta, SeekOrigin::End),
        };
        Ok(self.seek_from_origin(offset, origin)?)
    }
}
