//! 编解码器门面。
//!
//! 把限额与主机字节序快照组合为 [`ObjectCodec`]，对外提供连续/分片两种输出的编码入口，
//! 以及单块/分片两种输入的解码入口。

use bytes::Bytes;
use objwire_endian::EndianInfo;

use crate::config::{CodecConfig, EndianFallback};
use crate::decode::{self, Decoded};
use crate::encode::{self, EncodedPayload, OutputMode};
use crate::error::CodecError;
use crate::limits::CodecLimits;
use crate::value::{Heap, Value};

/// 对象图编解码器。
///
/// # 教案式说明
/// - **意图 (Why)**：把主机字节序快照与限额绑定成一个可复制的小对象，编码、解码、流式解码共用；
/// - **逻辑 (How)**：
///   - 编码：深度优先遍历值图，重复出现的字符串/函数块/表折叠为引用记录；
///   - 解码：在单块或分片输入上按全局偏移读取，可限制单次解码的值数量并从任意偏移续读；
/// - **契约 (What)**：
///   - 编解码器本身无状态，所有缓存都存在于单次调用内部；
///   - 同一对象图在同一堆上编码两次得到相同字节；
/// - **风险 (Trade-offs)**：引用编号只有 16 位，单个值图内可共享对象超过 65535 个时编码失败。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectCodec {
    endian: EndianInfo,
    limits: CodecLimits,
}

impl Default for ObjectCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectCodec {
    /// 使用主机字节序与默认限额。
    pub fn new() -> Self {
        Self::with_limits(CodecLimits::default())
    }

    /// 使用主机字节序与给定限额。
    pub fn with_limits(limits: CodecLimits) -> Self {
        Self {
            endian: *EndianInfo::host(),
            limits,
        }
    }

    /// 由配置构造。
    ///
    /// `endian.fallback = "reject"` 且主机字节序探测发生过回退时返回
    /// [`CodecError::UnsupportedEndianness`]，携带首个回退的数值种类。
    pub fn from_config(config: &CodecConfig) -> Result<Self, CodecError> {
        let endian = *EndianInfo::host();
        if config.endian.fallback == EndianFallback::Reject
            && let Some(kind) = endian.fallback_kinds().next()
        {
            return Err(objwire_endian::UnsupportedEndianness { kind }.into());
        }
        Ok(Self {
            endian,
            limits: config.to_limits(),
        })
    }

    /// 当前限额。
    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    /// 主机字节序快照。
    pub fn endian(&self) -> &EndianInfo {
        &self.endian
    }

    /// 编码为连续缓冲。
    pub fn encode(&self, heap: &Heap, value: Value) -> Result<Bytes, CodecError> {
        self.encode_with(heap, value, OutputMode::Contiguous)
            .map(EncodedPayload::into_bytes)
    }

    /// 编码为分片列表，较大的负载以共享分片输出而不拷贝。
    pub fn encode_chunks(&self, heap: &Heap, value: Value) -> Result<Vec<Bytes>, CodecError> {
        self.encode_with(heap, value, OutputMode::Chunked)
            .map(EncodedPayload::into_chunks)
    }

    /// 按指定输出形态编码。
    pub fn encode_with(
        &self,
        heap: &Heap,
        value: Value,
        mode: OutputMode,
    ) -> Result<EncodedPayload, CodecError> {
        encode::encode_value(heap, value, self.endian, &self.limits, mode)
    }

    /// 从连续输入解码。
    ///
    /// - `max_values == 0` 表示解码到末尾；
    /// - `start_offset` 等于输入长度时返回空结果，大于时返回 [`CodecError::OffsetOutOfRange`]。
    pub fn decode(
        &self,
        heap: &mut Heap,
        input: &[u8],
        max_values: usize,
        start_offset: u64,
    ) -> Result<Decoded, CodecError> {
        self.decode_chunks(heap, &[input], max_values, start_offset)
    }

    /// 从分片输入解码，偏移按所有分片拼接后的全局位置计算。
    pub fn decode_chunks<C: AsRef<[u8]>>(
        &self,
        heap: &mut Heap,
        chunks: &[C],
        max_values: usize,
        start_offset: u64,
    ) -> Result<Decoded, CodecError> {
        decode::decode_chunks(
            heap,
            chunks,
            max_values,
            start_offset,
            self.endian,
            &self.limits,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_default_codec() {
        let codec = ObjectCodec::from_config(&CodecConfig::default()).expect("host is exact");
        assert_eq!(codec, ObjectCodec::new());
        assert_eq!(codec.endian(), EndianInfo::host());
    }

    #[test]
    fn reject_mode_accepts_recognised_hosts() {
        let config =
            CodecConfig::from_toml_str("[endian]\nfallback = \"reject\"\n").expect("valid config");
        assert!(EndianInfo::host().is_exact());
        assert!(ObjectCodec::from_config(&config).is_ok());
    }
}
