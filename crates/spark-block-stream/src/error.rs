//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义 [`BlockStream`](crate::BlockStream) 对外暴露的全部失败语义，
//!   让参数错误、范围错误、寻址错误、关闭态错误与内存耗尽在类型层面可区分；
//! - 通过稳定的字符串错误码（[`BlockStreamError::code`]）对齐框架 `codes::*` 的命名习惯，便于日志检索与告警聚合。
//!
//! ## 设计要求（What）
//! - 所有错误均在任何状态变更之前同步返回，不存在“部分写入后失败”的中间态（内存耗尽除外，见下）；
//! - 实现 `thiserror::Error`，并可无损转换为 [`std::io::Error`]，以便 `Read`/`Write`/`Seek` 实现直接 `?` 传播。

use std::io;

use thiserror::Error;

/// 稳定错误码常量。
///
/// 与 `spark_core::error::codes` 一致采用 `域.语义` 的点分命名；字符串一经发布不得修改。
pub mod codes {
    pub const INVALID_ARGUMENT: &str = "block_stream.invalid_argument";
    pub const OUT_OF_RANGE: &str = "block_stream.out_of_range";
    pub const SEEK_BEFORE_BEGIN: &str = "block_stream.seek_before_begin";
    pub const UNKNOWN_SEEK_ORIGIN: &str = "block_stream.unknown_seek_origin";
    pub const CLOSED: &str = "block_stream.closed";
    pub const ALLOCATION_FAILED: &str = "block_stream.allocation_failed";
    pub const INVALID_CONFIG: &str = "block_stream.invalid_config";
}

/// 分块内存流的错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：宿主流契约把“参数非法”“位置越界”“寻址到起点之前”“流已关闭”视为不同的异常类别，
///   调用方据此决定是修正参数、放弃本次寻址还是重建实例；
/// - **契约 (What)**：
///   - `InvalidArgument`/`UnknownSeekOrigin`：调用参数本身不合法；
///   - `OutOfRange`：向 `Position` 赋负值；
///   - `SeekBeforeBegin`：相对寻址的算术结果落在 0 之前，区别于字面参数错误；
///   - `Closed`：实例已关闭，除 `flush` 外的所有操作均返回该错误；
///   - `AllocationFailed`：宿主无法提供块存储，属于致命错误，不做重试；
///   - `InvalidConfig`：增长参数自相矛盾或无法解析。
/// - **设计权衡 (Trade-offs)**：参数名使用 `&'static str` 而非 `String`，错误构造零分配。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum BlockStreamError {
    /// 读写参数或目标长度不合法。
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        name: &'static str,
        reason: &'static str,
    },

    /// 数值超出允许范围，例如负的流位置。
    #[error("argument `{name}` out of range: {value}")]
    OutOfRange { name: &'static str, value: i64 },

    /// 寻址结果位于流起点之前。
    #[error("attempted to seek before the beginning of the stream (target {target})")]
    SeekBeforeBegin { target: i128 },

    /// 无法识别的寻址原点。
    #[error("unknown seek origin {origin}")]
    UnknownSeekOrigin { origin: i32 },

    /// 流已关闭。
    #[error("cannot access a closed stream")]
    Closed,

    /// 无法为新块取得内存。
    #[error("failed to allocate {requested} bytes of block storage")]
    AllocationFailed { requested: u64 },

    /// 增长参数非法。
    #[error("invalid growth configuration: {detail}")]
    InvalidConfig { detail: String },
}

impl BlockStreamError {
    pub(crate) fn invalid_argument(name: &'static str, reason: &'static str) -> Self {
        Self::InvalidArgument { name, reason }
    }

    /// 返回稳定错误码，取值见 [`codes`]。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => codes::INVALID_ARGUMENT,
            Self::OutOfRange { .. } => codes::OUT_OF_RANGE,
            Self::SeekBeforeBegin { .. } => codes::SEEK_BEFORE_BEGIN,
            Self::UnknownSeekOrigin { .. } => codes::UNKNOWN_SEEK_ORIGIN,
            Self::Closed => codes::CLOSED,
            Self::AllocationFailed { .. } => codes::ALLOCATION_FAILED,
            Self::InvalidConfig { .. } => codes::INVALID_CONFIG,
        }
    }

    /// 是否属于调用参数类错误（参数、范围、原点）。
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::OutOfRange { .. } | Self::UnknownSeekOrigin { .. }
        )
    }
}

impl From<BlockStreamError> for io::Error {
    /// 映射到 `io::ErrorKind`，原始错误保留为 `source`，可通过 `get_ref` 取回。
    ///
    /// 寻址到起点之前与 `std::io::Cursor` 一致归入 `InvalidInput`；需要与参数错误区分时，
    /// 取回内部的 [`BlockStreamError`] 匹配变体或比较 [`code`](BlockStreamError::code)。
    fn from(err: BlockStreamError) -> Self {
        let kind = match &err {
            BlockStreamError::InvalidArgument { .. }
            | BlockStreamError::OutOfRange { .. }
            | BlockStreamError::SeekBeforeBegin { .. }
            | BlockStreamError::UnknownSeekOrigin { .. }
            | BlockStreamError::InvalidConfig { .. } => io::ErrorKind::InvalidInput,
            BlockStreamError::AllocationFailed { .. } => io::ErrorKind::OutOfMemory,
            BlockStreamError::Closed => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// crate 统一结果别名，与 `spark_core::Result` 的写法保持一致。
pub type Result<T, E = BlockStreamError> = core::result::Result<T, E>;
