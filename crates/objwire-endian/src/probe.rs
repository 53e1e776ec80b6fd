//! 主机字节序探测。
//!
//! # 模块定位（Why）
//! - 编解码器需要知道主机如何存放 16/32/64 位整数与单/双精度浮点，才能把数值规整为线上大端格式；
//! - 探测只需在进程生命周期内执行一次，结果只读共享，天然可跨线程使用。
//!
//! # 实现策略（How）
//! - 整数：写入数值 `1`，观察最低有效字节 `0x01` 落在哪个偏移；
//! - 浮点：`1.0` 的原始字节并不以 `0x01` 开头，因此改为观察 IEEE-754 位模式最高两个字节
//!   （`f64` 为 `0x3F 0xF0`，`f32` 为 `0x3F 0x80`）的位置；
//! - 四种布局都不匹配时，宽松模式回退为 `Little` 并输出 `warn!`，严格模式返回
//!   [`UnsupportedEndianness`]。

use core::fmt;

use thiserror::Error;

use crate::order::ByteOrder;

/// 参与探测的数值种类。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericKind {
    /// 16 位整数，线协议的长度/计数/引用编号均使用该分类。
    Int16,
    /// 32 位整数。
    Int32,
    /// 64 位整数。
    Int64,
    /// 单精度浮点。
    Float32,
    /// 双精度浮点。
    Float64,
}

impl NumericKind {
    /// 全部种类，按探测顺序排列。
    pub const ALL: [NumericKind; 5] = [
        NumericKind::Int16,
        NumericKind::Int32,
        NumericKind::Int64,
        NumericKind::Float32,
        NumericKind::Float64,
    ];

    /// 元素宽度（字节）。
    pub const fn width(self) -> usize {
        match self {
            NumericKind::Int16 => 2,
            NumericKind::Int32 | NumericKind::Float32 => 4,
            NumericKind::Int64 | NumericKind::Float64 => 8,
        }
    }

    /// 稳定名称，用于日志字段。
    pub const fn as_str(self) -> &'static str {
        match self {
            NumericKind::Int16 => "int16",
            NumericKind::Int32 => "int32",
            NumericKind::Int64 => "int64",
            NumericKind::Float32 => "float32",
            NumericKind::Float64 => "float64",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            NumericKind::Int16 => 1 << 0,
            NumericKind::Int32 => 1 << 1,
            NumericKind::Int64 => 1 << 2,
            NumericKind::Float32 => 1 << 3,
            NumericKind::Float64 => 1 << 4,
        }
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 主机布局无法归入四种已知分类。
///
/// 严格探测模式下返回，携带首个无法识别的数值种类。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("host byte order for {kind} matches none of big/little/middle-big/middle-little")]
pub struct UnsupportedEndianness {
    /// 无法识别的数值种类。
    pub kind: NumericKind,
}

/// `f64` 值 `1.0` 的最高两个字节。
pub const F64_ONE_LEAD: [u8; 2] = [0x3f, 0xf0];
/// `f32` 值 `1.0` 的最高两个字节。
pub const F32_ONE_LEAD: [u8; 2] = [0x3f, 0x80];

/// 根据整数 `1` 的本机字节，判断布局。
///
/// # 契约说明（What）
/// - 检查顺序：偏移 0 → `Little`；末尾 → `Big`；`mid - 1` → `MiddleBig`；`mid` → `MiddleLittle`；
/// - 任何分支都不匹配时返回 `None`，由调用方决定回退或报错；
/// - `native.len() < 2` 时返回 `None`。
pub fn classify_integer_layout(native: &[u8]) -> Option<ByteOrder> {
    let size = native.len();
    if size < 2 {
        return None;
    }
    let mid = size / 2;
    if native[0] == 0x01 {
        Some(ByteOrder::Little)
    } else if native[size - 1] == 0x01 {
        Some(ByteOrder::Big)
    } else if native[mid - 1] == 0x01 {
        Some(ByteOrder::MiddleBig)
    } else if native[mid] == 0x01 {
        Some(ByteOrder::MiddleLittle)
    } else {
        None
    }
}

/// 根据浮点 `1.0` 的本机字节与其最高两字节 `lead`，判断布局。
///
/// # 契约说明（What）
/// - `Big`：`lead` 位于偏移 0、1；`Little`：位于末尾且顺序颠倒；
/// - `MiddleBig`：位于后半块开头 `mid`、`mid + 1`；
/// - `MiddleLittle`：位于前半块末尾 `mid - 1`、`mid - 2`（顺序颠倒）；
/// - `native.len() < 4` 时无法区分半块，返回 `None`。
pub fn classify_float_layout(native: &[u8], lead: [u8; 2]) -> Option<ByteOrder> {
    let size = native.len();
    if size < 4 {
        return None;
    }
    let mid = size / 2;
    let [hi, next] = lead;
    if native[0] == hi && native[1] == next {
        Some(ByteOrder::Big)
    } else if native[size - 1] == hi && native[size - 2] == next {
        Some(ByteOrder::Little)
    } else if native[mid] == hi && native[mid + 1] == next {
        Some(ByteOrder::MiddleBig)
    } else if native[mid - 1] == hi && native[mid - 2] == next {
        Some(ByteOrder::MiddleLittle)
    } else {
        None
    }
}

/// 每种数值的主机布局快照。
///
/// # 教案式说明
/// - **意图 (Why)**：把一次性探测的结果固化为不可变结构，编码/解码路径只读访问，无需加锁；
/// - **逻辑 (How)**：[`EndianInfo::detect`] 逐种类执行探测，未识别的种类记录在 `fallbacks` 位图中；
/// - **契约 (What)**：
///   - 结构体为 `Copy`，可按值嵌入编解码器；
///   - [`EndianInfo::host`] 返回进程级缓存，首次调用时完成探测；
/// - **风险 (Trade-offs)**：回退到 `Little` 在罕见硬件上可能静默得到错误结果，
///   对此敏感的部署应使用 [`EndianInfo::detect_strict`]。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndianInfo {
    /// 16 位整数布局。
    pub int16: ByteOrder,
    /// 32 位整数布局。
    pub int32: ByteOrder,
    /// 64 位整数布局。
    pub int64: ByteOrder,
    /// 单精度浮点布局。
    pub float32: ByteOrder,
    /// 双精度浮点布局。
    pub float64: ByteOrder,
    fallbacks: u8,
}

static HOST: spin::Once<EndianInfo> = spin::Once::new();

impl EndianInfo {
    /// 所有种类都与线上格式一致的布局，常用于测试与文档。
    pub const CANONICAL: EndianInfo = EndianInfo::uniform(ByteOrder::Big);

    /// 构造所有种类共享同一布局的快照。
    pub const fn uniform(order: ByteOrder) -> Self {
        Self {
            int16: order,
            int32: order,
            int64: order,
            float32: order,
            float64: order,
            fallbacks: 0,
        }
    }

    /// 进程级探测结果。
    ///
    /// 首次调用执行 [`EndianInfo::detect`]，之后始终返回同一引用。
    pub fn host() -> &'static EndianInfo {
        HOST.call_once(EndianInfo::detect)
    }

    /// 宽松探测：无法识别的种类回退为 `Little`。
    pub fn detect() -> Self {
        Self::from_probed(NumericKind::ALL.map(probe))
    }

    /// 由逐种类的探测结果（按 [`NumericKind::ALL`] 顺序）构建快照。
    ///
    /// `None` 表示该种类无法识别：记录回退、输出 `warn!` 并视为 `Little`。
    pub fn from_probed(probed: [Option<ByteOrder>; 5]) -> Self {
        let mut fallbacks = 0u8;
        let mut resolved = [ByteOrder::Little; 5];
        for ((slot, kind), outcome) in resolved.iter_mut().zip(NumericKind::ALL).zip(probed) {
            *slot = match outcome {
                Some(order) => order,
                None => {
                    tracing::warn!(
                        kind = kind.as_str(),
                        "exotic host byte order, falling back to little-endian"
                    );
                    fallbacks |= kind.bit();
                    ByteOrder::Little
                }
            };
        }
        let [int16, int32, int64, float32, float64] = resolved;
        Self {
            int16,
            int32,
            int64,
            float32,
            float64,
            fallbacks,
        }
    }

    /// 严格探测：任一种类无法识别即返回错误。
    pub fn detect_strict() -> Result<Self, UnsupportedEndianness> {
        let mut resolved = [ByteOrder::Big; 5];
        for (slot, kind) in resolved.iter_mut().zip(NumericKind::ALL) {
            *slot = probe(kind).ok_or(UnsupportedEndianness { kind })?;
        }
        let [int16, int32, int64, float32, float64] = resolved;
        Ok(Self {
            int16,
            int32,
            int64,
            float32,
            float64,
            fallbacks: 0,
        })
    }

    /// 查询指定种类的布局。
    pub const fn order(&self, kind: NumericKind) -> ByteOrder {
        match kind {
            NumericKind::Int16 => self.int16,
            NumericKind::Int32 => self.int32,
            NumericKind::Int64 => self.int64,
            NumericKind::Float32 => self.float32,
            NumericKind::Float64 => self.float64,
        }
    }

    /// 所有种类均被精确识别（未发生回退）。
    pub const fn is_exact(&self) -> bool {
        self.fallbacks == 0
    }

    /// 发生回退的种类。
    pub fn fallback_kinds(&self) -> impl Iterator<Item = NumericKind> + '_ {
        NumericKind::ALL
            .into_iter()
            .filter(move |kind| self.fallbacks & kind.bit() != 0)
    }

    /// 主机 `u16` → 线上字节。
    pub fn u16_to_wire(&self, value: u16) -> [u8; 2] {
        let mut bytes = value.to_ne_bytes();
        self.int16.reorder_element(&mut bytes);
        bytes
    }

    /// 线上字节 → 主机 `u16`。
    pub fn u16_from_wire(&self, mut bytes: [u8; 2]) -> u16 {
        self.int16.reorder_element(&mut bytes);
        u16::from_ne_bytes(bytes)
    }

    /// 主机 `i32` → 线上字节。
    pub fn i32_to_wire(&self, value: i32) -> [u8; 4] {
        let mut bytes = value.to_ne_bytes();
        self.int32.reorder_element(&mut bytes);
        bytes
    }

    /// 线上字节 → 主机 `i32`。
    pub fn i32_from_wire(&self, mut bytes: [u8; 4]) -> i32 {
        self.int32.reorder_element(&mut bytes);
        i32::from_ne_bytes(bytes)
    }

    /// 主机 `f64` → 线上字节。
    pub fn f64_to_wire(&self, value: f64) -> [u8; 8] {
        let mut bytes = value.to_ne_bytes();
        self.float64.reorder_element(&mut bytes);
        bytes
    }

    /// 线上字节 → 主机 `f64`。
    pub fn f64_from_wire(&self, mut bytes: [u8; 8]) -> f64 {
        self.float64.reorder_element(&mut bytes);
        f64::from_ne_bytes(bytes)
    }
}

impl Default for EndianInfo {
    fn default() -> Self {
        *EndianInfo::host()
    }
}

fn probe(kind: NumericKind) -> Option<ByteOrder> {
    match kind {
        NumericKind::Int16 => classify_integer_layout(&1u16.to_ne_bytes()),
        NumericKind::Int32 => classify_integer_layout(&1u32.to_ne_bytes()),
        NumericKind::Int64 => classify_integer_layout(&1u64.to_ne_bytes()),
        NumericKind::Float32 => classify_float_layout(&1.0f32.to_ne_bytes(), F32_ONE_LEAD),
        NumericKind::Float64 => classify_float_layout(&1.0f64.to_ne_bytes(), F64_ONE_LEAD),
    }
}
