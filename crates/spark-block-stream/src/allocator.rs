//! 块分配器：决定何时追加多少个、多大的块，并维护块句柄索引。
//!
//! # 模块定位（Why）
//! - 连续缓冲按倍数扩容时，最终会申请并复制一整块超大内存；本模块改为只追加新块、从不重新分配旧块，
//!   从而把单次分配上限控制在 [`GrowthConfig::max_block_size`] 之内；
//! - 增长曲线刻意复刻连续内存流的倍增算法，使同样的写入序列在两种实现下得到一致（或仅差一个最大块）的容量。
//!
//! # 设计要点（How）
//! - [`plan_growth`] 是纯函数：给定当前容量与目标容量，给出本次追加的块尺寸与块数；
//! - 索引扩张（句柄槽位按倍数增加）与字节增长（按增长公式追加块）是两套独立的倍增过程，
//!   分别由 `reserve_slots` 与 `ensure_capacity` 负责，互不混用；
//! - 新块先全部分配到临时向量，成功后再一次性挂入索引，内存耗尽时实例状态保持不变。
//!
//! # 容量口径（What）
//! - `capacity`：增长曲线意义上的容量，每次增长累加 `desired`，驱动下一次增长判定；
//! - `allocated_bytes`：已挂入索引的块尺寸之和，按最大块切分时可能比 `capacity` 多出不足一个最大块。

use tracing::debug;

use crate::config::GrowthConfig;
use crate::error::{BlockStreamError, Result};

/// 一次增长的分配方案。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct GrowthPlan {
    /// 计入增长曲线的字节数。
    pub(crate) desired: u64,
    /// 每个新块的尺寸。
    pub(crate) block_size: usize,
    /// 新块数量。
    pub(crate) block_count: usize,
}

/// 计算把容量从 `capacity` 提升到至少 `required` 所需的分配方案；容量已足够时返回 `None`。
///
/// 1. 缺口 `extra = required - capacity`，申请量取 `max(extra, min_block_size)`；
/// 2. 当前容量大于申请量时改为申请 `capacity`，即每次增长至少翻倍；
/// 3. 申请量不超过最大块时分配一个等大的块，否则切成 `ceil(desired / max)` 个最大块。
pub(crate) fn plan_growth(
    capacity: u64,
    required: u64,
    config: &GrowthConfig,
) -> Result<Option<GrowthPlan>> {
    if capacity >= required {
        return Ok(None);
    }

    let extra = required - capacity;
    let mut desired = extra.max(config.min_block_size as u64);
    if capacity > desired {
        desired = capacity;
    }

    let max_block = config.max_block_size as u64;
    let (block_size, block_count) = if desired <= max_block {
        (desired, 1)
    } else {
        (max_block, desired.div_ceil(max_block))
    };

    let overflow = || BlockStreamError::AllocationFailed {
        requested: desired,
    };
    Ok(Some(GrowthPlan {
        desired,
        block_size: usize::try_from(block_size).map_err(|_| overflow())?,
        block_count: usize::try_from(block_count).map_err(|_| overflow())?,
    }))
}

/// 分块存储的唯一所有者。
///
/// `blocks` 只保存已分配的块，`slots` 记录索引预留的句柄槽位数；
/// `slots - blocks.len()` 即尚未填充的预留槽位。
#[derive(Debug)]
pub(crate) struct BlockAllocator {
    config: GrowthConfig,
    blocks: Vec<Box<[u8]>>,
    slots: usize,
    capacity: u64,
    allocated: u64,
}

impl BlockAllocator {
    pub(crate) fn new(config: GrowthConfig) -> Self {
        Self {
            config,
            blocks: Vec::new(),
            slots: 0,
            capacity: 0,
            allocated: 0,
        }
    }

    pub(crate) fn config(&self) -> &GrowthConfig {
        &self.config
    }

    pub(crate) fn capacity(&self) -> u64 {
        self.capacity
    }

    pub(crate) fn allocated_bytes(&self) -> u64 {
        self.allocated
    }

    pub(crate) fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub(crate) fn block(&self, index: usize) -> &[u8] {
        &self.blocks[index]
    }

    pub(crate) fn block_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.blocks[index]
    }

    pub(crate) fn blocks(&self) -> impl Iterator<Item = &[u8]> {
        self.blocks.iter().map(|block| &**block)
    }

    /// 按索引顺序返回块尺寸，未填充的预留槽位以 `None` 表示。
    pub(crate) fn allocation_sizes(&self) -> Vec<Option<usize>> {
        let mut sizes = Vec::with_capacity(self.slots);
        sizes.extend(self.blocks.iter().map(|block| Some(block.len())));
        sizes.resize(self.slots, None);
        sizes
    }

    /// 保证增长曲线容量不小于 `required`；只追加零初始化的新块，不触碰已有块。
    pub(crate) fn ensure_capacity(&mut self, required: u64) -> Result<()> {
        let Some(plan) = plan_growth(self.capacity, required, &self.config)? else {
            return Ok(());
        };

        debug!(
            target: "spark_block_stream",
            capacity = self.capacity,
            required,
            desired = plan.desired,
            block_size = plan.block_size,
            blocks = plan.block_count,
            "growing block storage"
        );

        let mut fresh = Vec::new();
        fresh
            .try_reserve_exact(plan.block_count)
            .map_err(|_| BlockStreamError::AllocationFailed {
                requested: plan.desired,
            })?;
        for _ in 0..plan.block_count {
            fresh.push(allocate_block(plan.block_size)?);
        }

        self.reserve_slots(plan.block_count)?;
        self.blocks.append(&mut fresh);
        self.capacity += plan.desired;
        self.allocated += plan.block_size as u64 * plan.block_count as u64;
        Ok(())
    }

    /// 为 `additional` 个新块预留句柄槽位：首次按 `max(additional, start_block_count)` 预留，
    /// 之后不足时成倍扩张。
    fn reserve_slots(&mut self, additional: usize) -> Result<()> {
        let needed = self
            .blocks
            .len()
            .checked_add(additional)
            .ok_or(BlockStreamError::AllocationFailed { requested: u64::MAX })?;
        if needed <= self.slots {
            return Ok(());
        }

        let mut slots = if self.slots == 0 {
            additional.max(self.config.start_block_count)
        } else {
            self.slots
        };
        while slots < needed {
            slots = slots.saturating_mul(2);
        }

        if self.slots != 0 {
            debug!(
                target: "spark_block_stream",
                from = self.slots,
                to = slots,
                "doubling block index"
            );
        }

        self.blocks
            .try_reserve_exact(slots - self.blocks.len())
            .map_err(|_| BlockStreamError::AllocationFailed {
                requested: slots.saturating_mul(size_of::<Box<[u8]>>()) as u64,
            })?;
        self.slots = slots;
        Ok(())
    }

    /// 将 `[start, start + count)` 清零；调用方保证区间位于已分配范围内。
    pub(crate) fn zero_range(&mut self, start: u64, count: u64) {
        let mut skip = start;
        let mut remaining = count;
        for block in self.blocks.iter_mut() {
            if remaining == 0 {
                break;
            }
            let len = block.len() as u64;
            if skip >= len {
                skip -= len;
                continue;
            }
            let from = skip as usize;
            let n = (len - skip).min(remaining) as usize;
            block[from..from + n].fill(0);
            remaining -= n as u64;
            skip = 0;
        }
    }

    /// 释放全部块与索引。
    pub(crate) fn release(&mut self) {
        self.blocks = Vec::new();
        self.slots = 0;
        self.capacity = 0;
        self.allocated = 0;
    }
}

/// 分配一个零初始化的块；内存不足时返回错误而非中止进程。
///
/// `vec![0; n]` 走 `alloc_zeroed` 可省去一次清零遍历，但失败即中止，故此处先 `try_reserve_exact` 再填零。
fn allocate_block(size: usize) -> Result<Box<[u8]>> {
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(size)
        .map_err(|_| BlockStreamError::AllocationFailed {
            requested: size as u64,
        })?;
    storage.resize(size, 0);
    Ok(storage.into_boxed_slice())
}
