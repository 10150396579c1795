#![deny(unsafe_code)]

//! `spark-block-stream` 提供分块存储的可寻址内存流。
//!
//! # 模块定位（Why）
//! - 连续内存缓冲按倍数扩容，长期增长后会反复申请并搬迁越来越大的单块内存；
//!   [`BlockStream`] 以“只追加、从不重分配”的块序列承载数据，单块尺寸受 [`MAX_BLOCK_SIZE`] 约束；
//! - 总容量刻意沿连续缓冲的倍增曲线增长，替换后内存占用可预期。
//!
//! # 设计概要（How）
//! - `allocator`：增长方案计算与块索引维护，两者是相互独立的倍增过程；
//! - `cursor`：逻辑位置到 `(块索引, 块基址, 块内偏移)` 的缓存分解，顺序访问均摊 O(1)；
//! - `stream`：读、写、寻址、截断与关闭语义，并实现 `std::io::{Read, Write, Seek}`；
//! - `config`：增长参数及其 TOML 加载；`error`：错误域与稳定错误码。
//!
//! # 使用约束（What）
//! - 单一所有者，不提供内部同步；
//! - 日志通过 `tracing` 以 `spark_block_stream` 为 target 输出，本 crate 不安装订阅者。

mod allocator;
mod config;
mod cursor;
pub mod error;
mod stream;

pub use config::{GrowthConfig, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, START_BLOCK_COUNT};
pub use error::{BlockStreamError, Result};
pub use stream::{BlockStream, SeekOrigin};
