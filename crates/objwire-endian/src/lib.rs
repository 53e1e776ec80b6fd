#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # objwire-endian
//!
//! ## 教案目的（Why）
//! - **定位**：为 `objwire-codec` 提供主机字节序探测与“主机序 ⇄ 线上大端序”的原地重排；
//! - **架构角色**：位于依赖图最底层，编解码器仅通过 [`EndianInfo`] 的只读快照访问探测结果；
//! - **设计策略**：识别四类布局（大端、小端、中端大、中端小），而不仅是常见的两类，以兼容历史上按半字交换的浮点表示。
//!
//! ## 交互契约（What）
//! - [`EndianInfo::host`] 在首次调用时完成探测并缓存，之后只读，可在任意线程并发访问；
//! - [`reorder`] 对四种布局均自反，编码与解码使用同一分类调用；
//! - 严格模式 [`EndianInfo::detect_strict`] 把无法识别的布局报告为 [`UnsupportedEndianness`]。
//!
//! ## 风险提示（Trade-offs）
//! - 宽松模式沿用“无法识别即视为小端”的回退策略，并通过 `tracing::warn!` 记录；
//!   对结果正确性敏感的部署应改用严格模式。

mod order;
mod probe;

pub use crate::order::{ByteOrder, reorder};
pub use crate::probe::{
    EndianInfo, F32_ONE_LEAD, F64_ONE_LEAD, NumericKind, UnsupportedEndianness,
    classify_float_layout, classify_integer_layout,
};
