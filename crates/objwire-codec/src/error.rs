//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 编码与解码的所有失败路径都在这里集中定义，调用方只需匹配一个枚举；
//! - 每个变体映射到稳定的点分错误码（见 [`codes`]），便于日志聚合与跨语言对齐。
//!
//! ## 设计要求（What）
//! - 任一错误都会使当前 `encode`/`decode` 调用整体作废，编解码器不做部分恢复；
//! - [`CodecError::is_incomplete`] 区分“数据尚未到齐”与“数据已损坏”，流式调用方据此决定等待还是断开。

use objwire_endian::UnsupportedEndianness;
use thiserror::Error;

/// 稳定错误码常量。
pub mod codes {
    /// 字符串、函数块或表超出 16 位长度/计数上限。
    pub const ENCODE_VALUE_TOO_LARGE: &str = "objwire.encode.value_too_large";
    /// 值类型无法跨进程序列化。
    pub const ENCODE_UNSUPPORTED_TYPE: &str = "objwire.encode.unsupported_type";
    /// 单次编码的可缓存对象超过 16 位引用编号空间。
    pub const ENCODE_REFERENCE_OVERFLOW: &str = "objwire.encode.reference_overflow";
    /// 句柄不属于当前堆。
    pub const ENCODE_DANGLING_HANDLE: &str = "objwire.encode.dangling_handle";
    /// 未知标签或无法解析的引用。
    pub const DECODE_MALFORMED: &str = "objwire.decode.malformed";
    /// 输入在字段中途耗尽。
    pub const DECODE_TRUNCATED: &str = "objwire.decode.truncated";
    /// 起始偏移越过输入末尾。
    pub const DECODE_OFFSET_OUT_OF_RANGE: &str = "objwire.decode.offset_out_of_range";
    /// 表嵌套层级超过限额。
    pub const BUDGET_DEPTH_EXCEEDED: &str = "objwire.budget.depth_exceeded";
    /// 帧长度超过限额。
    pub const BUDGET_FRAME_EXCEEDED: &str = "objwire.budget.frame_exceeded";
    /// 主机字节序无法识别且配置要求严格模式。
    pub const PLATFORM_ENDIANNESS: &str = "objwire.platform.endianness";
}

/// 超限对象的种类，用于 [`CodecError::ValueTooLarge`]。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthKind {
    /// 字符串字节长度。
    String,
    /// 函数块字节长度。
    Function,
    /// 表的直接条目数。
    Table,
}

impl core::fmt::Display for LengthKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            LengthKind::String => "string",
            LengthKind::Function => "function blob",
            LengthKind::Table => "table",
        })
    }
}

/// 编解码错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把长度超限、类型不支持、流损坏、流截断、预算超限等失败归入单一枚举，
///   调用方可以用 `?` 直接传播，也可以按 [`CodecError::code`] 做统一观测；
/// - **契约 (What)**：
///   - 所有变体均为 `Send + Sync + 'static`；
///   - 偏移量字段一律是**全局**偏移（跨分片的绝对位置）；
///   - `TruncatedStream` 是唯一的“可等待”错误，见 [`CodecError::is_incomplete`]；
/// - **权衡 (Trade-offs)**：`MalformedStream` 使用 `&'static str` 描述原因，避免在热路径分配字符串。
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CodecError {
    /// 字符串、函数块或表超出 65535 上限。
    #[error("cannot serialize {kind}: length {len} > 65535")]
    ValueTooLarge {
        /// 超限对象种类。
        kind: LengthKind,
        /// 实际长度或条目数。
        len: usize,
    },

    /// 值类型不在可序列化集合内。
    #[error("cannot serialize value of type `{type_name}`")]
    UnsupportedType {
        /// 宿主类型名。
        type_name: &'static str,
    },

    /// 可缓存对象数量耗尽 16 位引用编号。
    #[error("reference id space exhausted: more than 65535 shared objects in one value graph")]
    ReferenceOverflow,

    /// 句柄在当前堆中不存在。
    #[error("handle #{id} does not belong to this heap")]
    DanglingHandle {
        /// 句柄编号。
        id: u32,
    },

    /// 流内容无法解析。
    #[error("malformed stream at offset {offset}: {reason}")]
    MalformedStream {
        /// 出错位置（全局偏移）。
        offset: u64,
        /// 原因描述。
        reason: &'static str,
    },

    /// 输入在字段中途耗尽。
    #[error("truncated stream at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedStream {
        /// 当前字段起始位置（全局偏移）。
        offset: u64,
        /// 完成该字段所需字节数。
        needed: usize,
        /// 实际剩余字节数。
        available: usize,
    },

    /// 起始偏移越界。
    #[error("start offset {offset} is beyond input length {len}")]
    OffsetOutOfRange {
        /// 请求的起始偏移。
        offset: u64,
        /// 输入总长度。
        len: u64,
    },

    /// 表嵌套超过深度限额。
    #[error("table nesting depth {depth} exceeds configured limit {limit}")]
    DepthLimitExceeded {
        /// 即将进入的层级。
        depth: u16,
        /// 配置的上限。
        limit: u16,
    },

    /// 帧长度超过限额。
    #[error("frame length {len} exceeds configured limit {limit} bytes")]
    FrameTooLarge {
        /// 实际帧长度。
        len: usize,
        /// 配置的上限。
        limit: usize,
    },

    /// 严格模式下主机字节序无法识别。
    #[error(transparent)]
    UnsupportedEndianness(#[from] UnsupportedEndianness),
}

impl CodecError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::ValueTooLarge { .. } => codes::ENCODE_VALUE_TOO_LARGE,
            CodecError::UnsupportedType { .. } => codes::ENCODE_UNSUPPORTED_TYPE,
            CodecError::ReferenceOverflow => codes::ENCODE_REFERENCE_OVERFLOW,
            CodecError::DanglingHandle { .. } => codes::ENCODE_DANGLING_HANDLE,
            CodecError::MalformedStream { .. } => codes::DECODE_MALFORMED,
            CodecError::TruncatedStream { .. } => codes::DECODE_TRUNCATED,
            CodecError::OffsetOutOfRange { .. } => codes::DECODE_OFFSET_OUT_OF_RANGE,
            CodecError::DepthLimitExceeded { .. } => codes::BUDGET_DEPTH_EXCEEDED,
            CodecError::FrameTooLarge { .. } => codes::BUDGET_FRAME_EXCEEDED,
            CodecError::UnsupportedEndianness(_) => codes::PLATFORM_ENDIANNESS,
        }
    }

    /// 是否仅因数据不足而失败；补齐后续分片后可从同一偏移重试。
    pub fn is_incomplete(&self) -> bool {
        matches!(self, CodecError::TruncatedStream { .. })
    }

    pub(crate) fn malformed(offset: u64, reason: &'static str) -> Self {
        CodecError::MalformedStream { offset, reason }
    }
}

/// 配置加载错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件无法读取。
    #[error("failed to read codec configuration from {}", path.display())]
    Io {
        /// 文件路径。
        path: std::path::PathBuf,
        /// 底层 I/O 错误。
        #[source]
        source: std::io::Error,
    },
    /// TOML 文本无法解析为 [`crate::CodecConfig`]。
    #[error("invalid codec configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
