//! 块增长参数。
//!
//! # 模块定位（Why）
//! - 分配器的三个常量（最小块、最大块、初始索引槽位数）决定了增长曲线与单次分配上限，
//!   测试与压测需要替换它们来缩短场景，因此以具名常量 + 可配置结构体的形式暴露；
//! - 与框架其它声明式配置一致，支持 `serde` 反序列化并从 TOML 文本加载。
//!
//! # 契约说明（What）
//! - `min_block_size >= 1`，`max_block_size >= min_block_size`，`start_block_count >= 1`；
//! - 默认值把最大块控制在大对象阈值（约 85 KB）之下。

use serde::Deserialize;

use crate::error::{BlockStreamError, Result};

/// 单次增长申请的最小字节数。
pub const MIN_BLOCK_SIZE: usize = 256;

/// 单个块的最大字节数，低于常见运行时的大对象阈值。
pub const MAX_BLOCK_SIZE: usize = 85_000 - 32;

/// 块索引首次预留的槽位数；耗尽后按倍数扩张。
pub const START_BLOCK_COUNT: usize = 10;

/// 分配器增长参数。
///
/// # 教案式说明
/// - **意图 (Why)**：把增长曲线的全部旋钮收敛到一个值类型中，流实例在构造时持有一份副本，运行期不可变；
/// - **契约 (What)**：通过 [`GrowthConfig::validate`] 的实例才能交给
///   [`BlockStream::with_config`](crate::BlockStream::with_config)；
/// - **执行 (How)**：字段缺省时取具名常量，TOML 中出现未知字段视为错误，避免拼写错误被静默忽略。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrowthConfig {
    pub min_block_size: usize,
    pub max_block_size: usize,
    pub start_block_count: usize,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            min_block_size: MIN_BLOCK_SIZE,
            max_block_size: MAX_BLOCK_SIZE,
            start_block_count: START_BLOCK_COUNT,
        }
    }
}

impl GrowthConfig {
    /// 以显式参数构造并立即校验。
    pub fn new(
        min_block_size: usize,
        max_block_size: usize,
        start_block_count: usize,
    ) -> Result<Self> {
        let config = Self {
            min_block_size,
            max_block_size,
            start_block_count,
        };
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文本加载，例如：
    ///
    /// ```
    /// use spark_block_stream::GrowthConfig;
    ///
    /// let cfg = GrowthConfig::from_toml_str("max_block_size = 4096").unwrap();
    /// assert_eq!(cfg.max_block_size, 4096);
    /// assert_eq!(cfg.min_block_size, spark_block_stream::MIN_BLOCK_SIZE);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|err| BlockStreamError::InvalidConfig {
            detail: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验参数之间的约束。
    pub fn validate(&self) -> Result<()> {
        if self.min_block_size == 0 {
            return Err(invalid("min_block_size must be at least 1"));
        }
        if self.max_block_size < self.min_block_size {
            return Err(invalid("max_block_size must not be smaller than min_block_size"));
        }
        if self.start_block_count == 0 {
            return Err(invalid("start_block_count must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(detail: &str) -> BlockStreamError {
    BlockStreamError::InvalidConfig {
        detail: detail.to_owned(),
    }
}
