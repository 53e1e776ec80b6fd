//! 增量解码：分片陆续到达，逐个取出完整的顶层值。

use std::collections::VecDeque;

use bytes::Bytes;

use crate::codec::ObjectCodec;
use crate::error::CodecError;
use crate::value::{Heap, Value};

/// 增量解码的单步结果。
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeOutcome<T> {
    /// 成功解析出完整对象。
    Complete(T),
    /// 数据不足，等待更多输入。
    Incomplete,
}

/// 基于分片队列的流式解码器。
///
/// # 教案式说明
/// - **意图 (Why)**：网络分片到达的时机与值边界无关，调用方不应为了拼出完整值而自行拷贝缓冲；
/// - **逻辑 (How)**：
///   - [`StreamDecoder::push`] 追加分片，不拷贝；
///   - [`StreamDecoder::next_value`] 以 `max_values = 1` 在已缓冲分片上解码，
///     遇到 [`CodecError::TruncatedStream`] 视为“尚未到齐”，堆保持不变；
///   - 成功后推进读指针并丢弃已完全消费的分片；
/// - **契约 (What)**：
///   - 返回 `Incomplete` 时不消费任何字节，补齐后重试得到同样的结果；
///   - 未完成的值已缓冲的字节数超过 `max_frame_size` 时返回 [`CodecError::FrameTooLarge`]，
///     不再等待后续分片；
///   - 返回其他错误时同样不消费字节，流已损坏，调用方应丢弃解码器；
///   - 错误中的偏移以队首分片的起点为 0 计算。
#[derive(Debug, Default)]
pub struct StreamDecoder {
    codec: ObjectCodec,
    chunks: VecDeque<Bytes>,
    front_offset: usize,
    buffered: usize,
    position: u64,
}

impl StreamDecoder {
    /// 以给定编解码器创建。
    pub fn new(codec: ObjectCodec) -> Self {
        Self {
            codec,
            chunks: VecDeque::new(),
            front_offset: 0,
            buffered: 0,
            position: 0,
        }
    }

    /// 追加一个分片；空分片被忽略。
    pub fn push(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.buffered += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// 已缓冲但尚未消费的字节数。
    pub fn buffered_len(&self) -> usize {
        self.buffered
    }

    /// 已消费的总字节数。
    pub fn position(&self) -> u64 {
        self.position
    }

    /// 尝试取出下一个顶层值。
    pub fn next_value(&mut self, heap: &mut Heap) -> Result<DecodeOutcome<Value>, CodecError> {
        if self.buffered == 0 {
            return Ok(DecodeOutcome::Incomplete);
        }
        let codec = self.codec;
        let start = self.front_offset as u64;
        let chunks = self.chunks.make_contiguous();
        let decoded = match codec.decode_chunks(heap, chunks, 1, start) {
            Ok(decoded) => decoded,
            Err(err) if err.is_incomplete() => {
                // 未完成的值至少跨越全部已缓冲字节。
                codec.limits().check_frame(self.buffered).inspect_err(|err| {
                    tracing::debug!(
                        code = err.code(),
                        error = %err,
                        "partial value over frame budget"
                    );
                })?;
                return Ok(DecodeOutcome::Incomplete);
            }
            Err(err) => return Err(err),
        };
        let consumed = (decoded.next_offset - start) as usize;
        self.consume(consumed);
        Ok(match decoded.values.into_iter().next() {
            Some(value) => DecodeOutcome::Complete(value),
            None => DecodeOutcome::Incomplete,
        })
    }

    fn consume(&mut self, n: usize) {
        self.position += n as u64;
        self.buffered -= n;
        self.front_offset += n;
        while let Some(front) = self.chunks.front() {
            if self.front_offset < front.len() {
                break;
            }
            self.front_offset -= front.len();
            self.chunks.pop_front();
        }
    }
}
