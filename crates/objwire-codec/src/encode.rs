//! 编码路径：深度优先遍历值图，边走边写。
//!
//! # 实现策略（How）
//! - [`EncodeContext`] 显式携带引用计数器、“身份 → 编号”映射、深度计数与输出缓冲，
//!   取代递归调用间传递全局指针的做法，每次编码独占一份；
//! - 字符串、函数块、表在写出前先查缓存：命中则写 3 字节引用记录并停止，未命中则分配下一个编号；
//! - 表的条目数在遍历结束后才确定，先预留 2 字节占位，遍历完成后回填；
//! - 分片模式下，较大的字符串/函数块负载直接共享 `Bytes`，不做拷贝。

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};
use objwire_endian::EndianInfo;

use crate::error::{CodecError, LengthKind};
use crate::limits::{CodecLimits, DepthTracked, FrameDepth, enter_frame};
use crate::value::{Heap, ObjectId, TableRef, Value, integral_i32};
use crate::wire::{MAX_LENGTH, MAX_REFERENCE_ID, Tag};

/// 分片模式下，不小于该长度的负载以共享分片输出。
pub const SHARED_PAYLOAD_THRESHOLD: usize = 256;

/// 输出形态。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// 单块连续缓冲。
    #[default]
    Contiguous,
    /// 写出过程中产生的分片列表，适合向量化发送。
    Chunked,
}

/// 编码结果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodedPayload {
    /// 连续缓冲。
    Contiguous(Bytes),
    /// 分片列表，按顺序拼接即为完整编码。
    Chunked(Vec<Bytes>),
}

impl EncodedPayload {
    /// 编码总长度。
    pub fn len(&self) -> usize {
        match self {
            EncodedPayload::Contiguous(bytes) => bytes.len(),
            EncodedPayload::Chunked(chunks) => chunks.iter().map(Bytes::len).sum(),
        }
    }

    /// 是否为空（合法编码永远非空）。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 转为连续缓冲；分片形态会拼接一次。
    pub fn into_bytes(self) -> Bytes {
        match self {
            EncodedPayload::Contiguous(bytes) => bytes,
            EncodedPayload::Chunked(mut chunks) if chunks.len() == 1 => chunks.remove(0),
            EncodedPayload::Chunked(chunks) => {
                let total = chunks.iter().map(Bytes::len).sum();
                let mut joined = BytesMut::with_capacity(total);
                for chunk in &chunks {
                    joined.put_slice(chunk);
                }
                joined.freeze()
            }
        }
    }

    /// 转为分片列表；连续形态返回单个分片。
    pub fn into_chunks(self) -> Vec<Bytes> {
        match self {
            EncodedPayload::Contiguous(bytes) => vec![bytes],
            EncodedPayload::Chunked(chunks) => chunks,
        }
    }
}

/// 已写出的分片。
#[derive(Debug)]
enum Fragment {
    Inline(BytesMut),
    Shared(Bytes),
}

/// 表条目数占位的位置。
#[derive(Clone, Copy, Debug)]
struct CountSlot {
    fragment: usize,
    offset: usize,
}

/// 支持占位回填与负载共享的输出缓冲。
#[derive(Debug)]
struct FragmentWriter {
    sealed: Vec<Fragment>,
    current: BytesMut,
    share_payloads: bool,
    written: usize,
}

impl FragmentWriter {
    fn new(mode: OutputMode) -> Self {
        Self {
            sealed: Vec::new(),
            current: BytesMut::with_capacity(64),
            share_payloads: mode == OutputMode::Chunked,
            written: 0,
        }
    }

    fn len(&self) -> usize {
        self.written
    }

    fn put_u8(&mut self, byte: u8) {
        self.current.put_u8(byte);
        self.written += 1;
    }

    fn put_slice(&mut self, bytes: &[u8]) {
        self.current.put_slice(bytes);
        self.written += bytes.len();
    }

    fn put_payload(&mut self, payload: &Bytes) {
        if self.share_payloads && payload.len() >= SHARED_PAYLOAD_THRESHOLD {
            self.seal();
            self.sealed.push(Fragment::Shared(payload.clone()));
            self.written += payload.len();
        } else {
            self.put_slice(payload);
        }
    }

    fn seal(&mut self) {
        if !self.current.is_empty() {
            let filled = self.current.split();
            self.sealed.push(Fragment::Inline(filled));
        }
    }

    fn reserve_count(&mut self) -> CountSlot {
        let slot = CountSlot {
            fragment: self.sealed.len(),
            offset: self.current.len(),
        };
        self.put_slice(&[0, 0]);
        slot
    }

    fn patch_count(&mut self, slot: CountSlot, wire: [u8; 2]) {
        // 占位写入时 `current` 非空，封存后必然落在 Inline 分片中。
        let target = if slot.fragment == self.sealed.len() {
            Some(&mut self.current)
        } else {
            match self.sealed.get_mut(slot.fragment) {
                Some(Fragment::Inline(buf)) => Some(buf),
                _ => None,
            }
        };
        if let Some(buf) = target {
            buf[slot.offset..slot.offset + 2].copy_from_slice(&wire);
        }
    }

    fn finish(mut self) -> EncodedPayload {
        if !self.share_payloads {
            return EncodedPayload::Contiguous(self.current.freeze());
        }
        self.seal();
        let chunks = self
            .sealed
            .into_iter()
            .map(|fragment| match fragment {
                Fragment::Inline(buf) => buf.freeze(),
                Fragment::Shared(bytes) => bytes,
            })
            .collect();
        EncodedPayload::Chunked(chunks)
    }
}

/// 单次编码调用的全部可变状态。
pub(crate) struct EncodeContext<'h> {
    heap: &'h Heap,
    endian: EndianInfo,
    references: HashMap<ObjectId, u16>,
    last_reference: u16,
    depth: FrameDepth,
    out: FragmentWriter,
}

impl DepthTracked for EncodeContext<'_> {
    fn frame_depth(&mut self) -> &mut FrameDepth {
        &mut self.depth
    }
}

impl<'h> EncodeContext<'h> {
    pub(crate) fn new(
        heap: &'h Heap,
        endian: EndianInfo,
        limits: &CodecLimits,
        mode: OutputMode,
    ) -> Self {
        Self {
            heap,
            endian,
            references: HashMap::new(),
            last_reference: 0,
            depth: FrameDepth::new(limits.max_depth),
            out: FragmentWriter::new(mode),
        }
    }

    pub(crate) fn written(&self) -> usize {
        self.out.len()
    }

    pub(crate) fn finish(self) -> EncodedPayload {
        self.out.finish()
    }

    pub(crate) fn encode_value(&mut self, value: Value) -> Result<(), CodecError> {
        match value {
            Value::Nil => self.out.put_u8(Tag::Nil.byte()),
            Value::Boolean(flag) => {
                self.out.put_u8(Tag::Boolean.byte());
                self.out.put_u8(u8::from(flag));
            }
            Value::Integer(int) => self.write_integer(int),
            Value::Double(double) => match integral_i32(double) {
                Some(int) => self.write_integer(int),
                None => {
                    self.out.put_u8(Tag::Double.byte());
                    let wire = self.endian.f64_to_wire(double);
                    self.out.put_slice(&wire);
                }
            },
            Value::String(handle) => {
                let heap = self.heap;
                let bytes = heap
                    .str_bytes(handle)
                    .ok_or(CodecError::DanglingHandle {
                        id: handle.id().get(),
                    })?;
                if !self.begin_shared(handle.id())? {
                    self.write_blob(Tag::String, LengthKind::String, bytes)?;
                }
            }
            Value::Function(handle) => {
                let heap = self.heap;
                let blob = heap
                    .function(handle)
                    .ok_or(CodecError::DanglingHandle {
                        id: handle.id().get(),
                    })?;
                if !self.begin_shared(handle.id())? {
                    self.write_blob(Tag::Function, LengthKind::Function, blob.as_bytes())?;
                }
            }
            Value::Table(handle) => self.encode_table(handle)?,
            Value::Userdata(_) => {
                return Err(CodecError::UnsupportedType {
                    type_name: value.type_name(),
                });
            }
        }
        Ok(())
    }

    fn write_integer(&mut self, int: i32) {
        self.out.put_u8(Tag::Integer.byte());
        let wire = self.endian.i32_to_wire(int);
        self.out.put_slice(&wire);
    }

    fn write_blob(&mut self, tag: Tag, kind: LengthKind, bytes: &Bytes) -> Result<(), CodecError> {
        if bytes.len() > MAX_LENGTH {
            return Err(CodecError::ValueTooLarge {
                kind,
                len: bytes.len(),
            });
        }
        self.out.put_u8(tag.byte());
        let wire = self.endian.u16_to_wire(bytes.len() as u16);
        self.out.put_slice(&wire);
        self.out.put_payload(bytes);
        Ok(())
    }

    /// 查询或登记可共享对象。
    ///
    /// 已登记时写出引用记录并返回 `true`；否则分配下一个编号并返回 `false`，调用方继续完整编码。
    fn begin_shared(&mut self, id: ObjectId) -> Result<bool, CodecError> {
        if let Some(&reference) = self.references.get(&id) {
            self.out.put_u8(Tag::Reference.byte());
            let wire = self.endian.u16_to_wire(reference);
            self.out.put_slice(&wire);
            return Ok(true);
        }
        if self.last_reference == MAX_REFERENCE_ID {
            return Err(CodecError::ReferenceOverflow);
        }
        self.last_reference += 1;
        self.references.insert(id, self.last_reference);
        Ok(false)
    }

    fn encode_table(&mut self, handle: TableRef) -> Result<(), CodecError> {
        let heap = self.heap;
        let table = heap.get_table(handle).ok_or(CodecError::DanglingHandle {
            id: handle.id().get(),
        })?;
        // 先登记身份再遍历子节点，自引用表在再次进入时折叠为引用记录。
        if self.begin_shared(handle.id())? {
            return Ok(());
        }
        if table.len() > MAX_LENGTH {
            return Err(CodecError::ValueTooLarge {
                kind: LengthKind::Table,
                len: table.len(),
            });
        }

        let mut frame = enter_frame(self)?;
        frame.out.put_u8(Tag::Table.byte());
        let slot = frame.out.reserve_count();
        let mut count: u16 = 0;
        for &(key, value) in table.entries() {
            frame.encode_value(key)?;
            frame.encode_value(value)?;
            count += 1;
        }
        let wire = frame.endian.u16_to_wire(count);
        frame.out.patch_count(slot, wire);
        Ok(())
    }
}

/// 编码一个顶层值。
pub(crate) fn encode_value(
    heap: &Heap,
    value: Value,
    endian: EndianInfo,
    limits: &CodecLimits,
    mode: OutputMode,
) -> Result<EncodedPayload, CodecError> {
    let mut ctx = EncodeContext::new(heap, endian, limits, mode);
    let outcome = ctx
        .encode_value(value)
        .and_then(|()| limits.check_frame(ctx.written()));
    match outcome {
        Ok(()) => {
            tracing::trace!(
                len = ctx.written(),
                references = ctx.last_reference,
                "encoded value"
            );
            Ok(ctx.finish())
        }
        Err(err) => {
            tracing::debug!(code = err.code(), error = %err, "encode failed");
            Err(err)
        }
    }
}
