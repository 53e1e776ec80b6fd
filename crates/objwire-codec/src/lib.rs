#![warn(missing_docs)]

//! # objwire-codec
//!
//! ## 教案目的（Why）
//! - **定位**：把动态类型的值图（含共享子对象与环）序列化为紧凑的带标签二进制流，供进程间传递；
//! - **架构角色**：依赖 `objwire-endian` 完成主机序与线上大端序的转换，对宿主运行时只暴露
//!   [`Heap`]/[`Value`] 与闭包桥接 [`ClosureSerializer`]；
//! - **设计策略**：以对象身份做结构共享，第二次出现的字符串、函数块或表写成 3 字节引用记录，
//!   因而环形结构可以有限编码。
//!
//! ## 交互契约（What）
//! - 编码：[`ObjectCodec::encode`] 输出连续缓冲，[`ObjectCodec::encode_chunks`] 输出零拷贝分片；
//! - 解码：[`ObjectCodec::decode`]/[`ObjectCodec::decode_chunks`] 支持限定值数量与续读偏移，
//!   [`StreamDecoder`] 面向分片陆续到达的场景；
//! - 错误：所有失败都是 [`CodecError`]，[`CodecError::code`] 给出稳定错误码。
//!
//! ## 风险提示（Trade-offs）
//! - 字符串/函数块长度与表条目数受 16 位字段限制（65535）；
//! - 递归深度受 [`CodecLimits::max_depth`] 约束，默认 200 层。
//!
//! ```
//! use objwire_codec::{Heap, ObjectCodec, Value};
//!
//! let mut heap = Heap::new();
//! let name = heap.string("x");
//! let table = heap.alloc_table(Default::default());
//! heap.push_entry(table, Value::Integer(1), name);
//!
//! let codec = ObjectCodec::new();
//! let bytes = codec.encode(&heap, table.into())?;
//! assert_eq!(bytes.as_ref(), [0x05, 0x00, 0x01, 0x07, 0, 0, 0, 1, 0x04, 0x00, 0x01, b'x']);
//!
//! let mut decoded_heap = Heap::new();
//! let decoded = codec.decode(&mut decoded_heap, &bytes, 0, 0)?;
//! assert_eq!(decoded.next_offset, bytes.len() as u64);
//! # Ok::<(), objwire_codec::CodecError>(())
//! ```

mod closure;
mod codec;
mod config;
mod decode;
mod encode;
mod error;
mod limits;
mod stream;
mod value;
mod wire;

pub use crate::closure::{ClosureError, ClosureSerializer};
pub use crate::codec::ObjectCodec;
pub use crate::config::{CodecConfig, EndianFallback, EndianSection, LimitsSection};
pub use crate::decode::Decoded;
pub use crate::encode::{EncodedPayload, OutputMode, SHARED_PAYLOAD_THRESHOLD};
pub use crate::error::{CodecError, ConfigError, LengthKind, codes};
pub use crate::limits::{CodecLimits, DEFAULT_MAX_DEPTH};
pub use crate::stream::{DecodeOutcome, StreamDecoder};
pub use crate::value::{
    Checkpoint, FunctionBlob, FunctionRef, Heap, Object, ObjectId, StrRef, Table, TableRef, Value,
};
pub use crate::wire::{MAX_LENGTH, MAX_REFERENCE_ID, Tag};
pub use objwire_endian::{ByteOrder, EndianInfo, NumericKind, UnsupportedEndianness};

use bytes::Bytes;

/// 以默认编解码器编码一个值，见 [`ObjectCodec::encode`]。
pub fn encode(heap: &Heap, value: Value) -> Result<Bytes, CodecError> {
    ObjectCodec::new().encode(heap, value)
}

/// 以默认编解码器解码，见 [`ObjectCodec::decode`]。
pub fn decode(
    heap: &mut Heap,
    input: &[u8],
    max_values: usize,
    start_offset: u64,
) -> Result<Decoded, CodecError> {
    ObjectCodec::new().decode(heap, input, max_values, start_offset)
}
