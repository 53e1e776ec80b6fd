//! 解码路径：在分片序列上按全局偏移读取值。
//!
//! # 实现策略（How）
//! - [`DecodeContext`] 同时维护“当前分片下标 + 分片内偏移”与“全局偏移”，任一字段跨越分片边界时
//!   逐段拼接，空分片直接跳过；
//! - 字符串与函数块在读完后登记到引用表，表在读取子节点**之前**登记，保证自引用能够解析；
//! - 每个顶层值开始时清空引用表，引用编号只在单个顶层值内有效；
//! - 任一错误都会把堆回滚到调用开始时的水位，调用方不会看到半成品对象。
//!
//! # 契约（What）
//! - 输入在字段中途耗尽时返回 [`CodecError::TruncatedStream`]，与内容损坏
//!   ([`CodecError::MalformedStream`]) 严格区分；
//! - `max_values == 0` 表示解码到输入末尾。

use bytes::Bytes;
use objwire_endian::EndianInfo;
use smallvec::SmallVec;

use crate::error::CodecError;
use crate::limits::{CodecLimits, DepthTracked, FrameDepth, enter_frame};
use crate::value::{FunctionBlob, Heap, Table, Value};
use crate::wire::Tag;

/// 预分配表容量的上限，防止伪造的条目数一次性申请大块内存。
const TABLE_PREALLOC_LIMIT: usize = 256;

/// 一次解码调用的结果。
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    /// 按出现顺序解码出的顶层值。
    pub values: Vec<Value>,
    /// 最后一个已解码值之后的全局偏移，可作为下一次调用的 `start_offset`。
    pub next_offset: u64,
}

/// 单次解码调用的游标与缓存。
pub(crate) struct DecodeContext<'a, C> {
    chunks: &'a [C],
    chunk_index: usize,
    local_offset: usize,
    global_offset: u64,
    total_len: u64,
    references: SmallVec<[Value; 16]>,
    depth: FrameDepth,
    endian: EndianInfo,
}

impl<C> DepthTracked for DecodeContext<'_, C> {
    fn frame_depth(&mut self) -> &mut FrameDepth {
        &mut self.depth
    }
}

impl<'a, C: AsRef<[u8]>> DecodeContext<'a, C> {
    /// 构造游标并定位到 `start_offset`。
    pub(crate) fn new(
        chunks: &'a [C],
        start_offset: u64,
        endian: EndianInfo,
        limits: &CodecLimits,
    ) -> Result<Self, CodecError> {
        let total_len: u64 = chunks.iter().map(|chunk| chunk.as_ref().len() as u64).sum();
        if start_offset > total_len {
            return Err(CodecError::OffsetOutOfRange {
                offset: start_offset,
                len: total_len,
            });
        }

        let mut chunk_index = 0;
        let mut skip = start_offset;
        while let Some(chunk) = chunks.get(chunk_index) {
            let len = chunk.as_ref().len() as u64;
            if skip < len {
                break;
            }
            skip -= len;
            chunk_index += 1;
        }

        Ok(Self {
            chunks,
            chunk_index,
            local_offset: skip as usize,
            global_offset: start_offset,
            total_len,
            references: SmallVec::new(),
            depth: FrameDepth::new(limits.max_depth),
            endian,
        })
    }

    pub(crate) fn position(&self) -> u64 {
        self.global_offset
    }

    pub(crate) fn at_end(&self) -> bool {
        self.global_offset == self.total_len
    }

    fn remaining(&self) -> u64 {
        self.total_len - self.global_offset
    }

    fn ensure(&self, needed: usize) -> Result<(), CodecError> {
        let remaining = self.remaining();
        if remaining < needed as u64 {
            return Err(CodecError::TruncatedStream {
                offset: self.global_offset,
                needed,
                available: remaining as usize,
            });
        }
        Ok(())
    }

    /// 当前分片中尚未读取的部分；已耗尽的分片（含空分片）被跳过。
    fn current_chunk(&mut self) -> &'a [u8] {
        let chunks = self.chunks;
        while let Some(chunk) = chunks.get(self.chunk_index) {
            let chunk = chunk.as_ref();
            if self.local_offset < chunk.len() {
                return &chunk[self.local_offset..];
            }
            self.chunk_index += 1;
            self.local_offset = 0;
        }
        &[]
    }

    fn advance(&mut self, n: usize) {
        self.local_offset += n;
        self.global_offset += n as u64;
    }

    /// 从游标处拷贝 `dst.len()` 字节；调用前必须已通过 [`Self::ensure`]。
    fn fill(&mut self, dst: &mut [u8]) {
        let mut filled = 0;
        while filled < dst.len() {
            let chunk = self.current_chunk();
            if chunk.is_empty() {
                break;
            }
            let take = chunk.len().min(dst.len() - filled);
            dst[filled..filled + take].copy_from_slice(&chunk[..take]);
            self.advance(take);
            filled += take;
        }
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        self.fill(&mut out);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16, CodecError> {
        let wire = self.read_array::<2>()?;
        Ok(self.endian.u16_from_wire(wire))
    }

    pub(crate) fn read_payload(&mut self, len: usize) -> Result<Bytes, CodecError> {
        self.ensure(len)?;
        let chunk = self.current_chunk();
        if chunk.len() >= len {
            let bytes = Bytes::copy_from_slice(&chunk[..len]);
            self.advance(len);
            return Ok(bytes);
        }
        let mut joined = vec![0u8; len];
        self.fill(&mut joined);
        Ok(Bytes::from(joined))
    }

    fn begin_top_level(&mut self) {
        self.references.clear();
    }

    fn decode_value(&mut self, heap: &mut Heap) -> Result<Value, CodecError> {
        let tag_offset = self.global_offset;
        let byte = self.read_u8()?;
        let tag = Tag::from_byte(byte).ok_or(CodecError::malformed(tag_offset, "unknown tag"))?;
        let value = match tag {
            Tag::Nil => Value::Nil,
            Tag::Boolean => Value::Boolean(self.read_u8()? != 0),
            Tag::Integer => {
                let wire = self.read_array::<4>()?;
                Value::Integer(self.endian.i32_from_wire(wire))
            }
            Tag::Double => {
                let wire = self.read_array::<8>()?;
                Value::Double(self.endian.f64_from_wire(wire))
            }
            Tag::String => {
                let len = self.read_u16()?;
                let bytes = self.read_payload(usize::from(len))?;
                let value = heap.string(bytes);
                self.references.push(value);
                value
            }
            Tag::Function => {
                let len = self.read_u16()?;
                let bytes = self.read_payload(usize::from(len))?;
                let value = Value::Function(heap.alloc_function(FunctionBlob::new(bytes)));
                self.references.push(value);
                value
            }
            Tag::Table => self.decode_table(heap)?,
            Tag::Reference => {
                let id = self.read_u16()?;
                if id == 0 {
                    return Err(CodecError::malformed(tag_offset, "reference id 0 is reserved"));
                }
                *self
                    .references
                    .get(usize::from(id) - 1)
                    .ok_or(CodecError::malformed(tag_offset, "reference to unknown id"))?
            }
        };
        Ok(value)
    }

    fn decode_table(&mut self, heap: &mut Heap) -> Result<Value, CodecError> {
        let count = self.read_u16()?;
        let handle = heap.alloc_table(Table::with_capacity(
            usize::from(count).min(TABLE_PREALLOC_LIMIT),
        ));
        self.references.push(Value::Table(handle));

        let mut frame = enter_frame(self)?;
        for _ in 0..count {
            let key = frame.decode_value(heap)?;
            let value = frame.decode_value(heap)?;
            heap.push_entry(handle, key, value);
        }
        Ok(Value::Table(handle))
    }
}

/// 解码分片序列中的顶层值。
pub(crate) fn decode_chunks<C: AsRef<[u8]>>(
    heap: &mut Heap,
    chunks: &[C],
    max_values: usize,
    start_offset: u64,
    endian: EndianInfo,
    limits: &CodecLimits,
) -> Result<Decoded, CodecError> {
    let mark = heap.checkpoint();
    let outcome = decode_values(heap, chunks, max_values, start_offset, endian, limits);
    if let Err(err) = &outcome {
        heap.rollback(mark);
        tracing::debug!(code = err.code(), error = %err, start_offset, "decode failed");
    }
    outcome
}

fn decode_values<C: AsRef<[u8]>>(
    heap: &mut Heap,
    chunks: &[C],
    max_values: usize,
    start_offset: u64,
    endian: EndianInfo,
    limits: &CodecLimits,
) -> Result<Decoded, CodecError> {
    let mut ctx = DecodeContext::new(chunks, start_offset, endian, limits)?;
    let mut values = Vec::new();
    while (max_values == 0 || values.len() < max_values) && !ctx.at_end() {
        ctx.begin_top_level();
        let begin = ctx.position();
        let value = ctx.decode_value(heap)?;
        let end = ctx.position();
        limits.check_frame((end - begin) as usize)?;
        tracing::trace!(begin, end, kind = value.type_name(), "decoded value");
        values.push(value);
    }
    Ok(Decoded {
        values,
        next_offset: ctx.position(),
    })
}
