//! TOML 配置。
//!
//! ```toml
//! [limits]
//! max_depth = 200        # 0 表示不限制
//! max_frame_size = 0     # 0 表示不限制
//!
//! [endian]
//! fallback = "little"    # 或 "reject"
//! ```
//!
//! 缺省的节与字段取默认值，未知字段视为错误。

use std::{fs, num::NonZeroU16, path::Path};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::limits::{CodecLimits, DEFAULT_MAX_DEPTH};

/// 编解码器配置根。
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// `[limits]` 节。
    pub limits: LimitsSection,
    /// `[endian]` 节。
    pub endian: EndianSection,
}

/// `[limits]` 节。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsSection {
    /// 表嵌套深度上限，0 表示不限制。
    pub max_depth: u16,
    /// 帧长上限（字节），0 表示不限制。
    pub max_frame_size: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_frame_size: 0,
        }
    }
}

/// `[endian]` 节。
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndianSection {
    /// 主机字节序无法识别时的处理方式。
    pub fallback: EndianFallback,
}

/// 无法识别的主机字节序如何处理。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndianFallback {
    /// 回退为小端并输出告警。
    #[default]
    Little,
    /// 构造编解码器时报错。
    Reject,
}

impl CodecConfig {
    /// 解析 TOML 文本。
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// 读取并解析 TOML 文件。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// 转换为运行时限额。
    pub fn to_limits(&self) -> CodecLimits {
        let max_frame_size = match self.limits.max_frame_size {
            0 => None,
            limit => Some(limit),
        };
        CodecLimits::unbounded()
            .with_max_depth(NonZeroU16::new(self.limits.max_depth))
            .with_max_frame_size(max_frame_size)
    }
}
