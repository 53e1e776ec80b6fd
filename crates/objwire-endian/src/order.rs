//! 字节序分类与原地重排。
//!
//! # 模块定位（Why）
//! - 线协议统一使用大端（网络序）承载所有多字节数值，主机端需要在“本机布局 ⇄ 线上布局”之间来回转换；
//! - 除常见的大端/小端外，历史上还存在按半字交换的“中端”浮点布局，本模块把四种布局收敛为一个枚举。
//!
//! # 契约说明（What）
//! - [`reorder`] 对同一 [`ByteOrder`] 自反：连续调用两次必然还原输入；
//! - 编码（主机 → 线上）与解码（线上 → 主机）使用**同一个**分类调用同一个函数。

use core::fmt;

/// 主机存放多字节数值的四类布局。
///
/// # 教案式说明
/// - **意图 (Why)**：探测结果需要在编码、解码两端复用，使用 `Copy` 枚举即可零成本传递；
/// - **契约 (What)**：
///   - `Big`：与线上格式一致，重排为空操作；
///   - `Little`：整体逆序；
///   - `MiddleBig`：前后两个半块整体交换（半块内部保持顺序）；
///   - `MiddleLittle`：两个半块各自逆序，半块位置不变。
/// - **风险 (Trade-offs)**：`Middle*` 仅为兼容历史硬件保留，现代主机几乎只会出现 `Big`/`Little`。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// 大端，最高有效字节位于最低地址。
    Big,
    /// 小端，最低有效字节位于最低地址。
    Little,
    /// 半字交换的大端布局。
    MiddleBig,
    /// 半字内部逆序的布局（PDP-11 风格）。
    MiddleLittle,
}

impl ByteOrder {
    /// 全部布局，便于测试遍历。
    pub const ALL: [ByteOrder; 4] = [
        ByteOrder::Big,
        ByteOrder::Little,
        ByteOrder::MiddleBig,
        ByteOrder::MiddleLittle,
    ];

    /// 返回稳定的小写名称，用于日志字段与配置文本。
    pub const fn as_str(self) -> &'static str {
        match self {
            ByteOrder::Big => "big",
            ByteOrder::Little => "little",
            ByteOrder::MiddleBig => "middle-big",
            ByteOrder::MiddleLittle => "middle-little",
        }
    }

    /// 对单个元素执行主机序与线上序之间的互转。
    ///
    /// `element` 的长度即元素宽度；长度为 0 或 1 时不做任何事。
    pub fn reorder_element(self, element: &mut [u8]) {
        let size = element.len();
        if size < 2 {
            return;
        }
        match self {
            ByteOrder::Big => {}
            ByteOrder::Little => element.reverse(),
            ByteOrder::MiddleBig => {
                let half = size / 2;
                let (front, back) = element.split_at_mut(half);
                front.swap_with_slice(&mut back[..half]);
            }
            ByteOrder::MiddleLittle => {
                // 两个半块同步做镜像交换，循环上界必须是 size / 4（不含）。
                let half = size / 2;
                for i in 0..size / 4 {
                    element.swap(i, half - 1 - i);
                    element.swap(half + i, size - 1 - i);
                }
            }
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 以 `element_size` 为步长，对 `buf` 中每个元素原地重排。
///
/// # 教案式说明
/// - **意图 (Why)**：编解码器既会转换单个数值，也可能批量转换数值数组，统一入口减少调用方切片样板；
/// - **执行 (How)**：按 `chunks_exact_mut(element_size)` 逐个调用 [`ByteOrder::reorder_element`]；
/// - **契约 (What)**：
///   - `element_size` 为 0 或 1 时直接返回；
///   - `buf.len()` 不是 `element_size` 整数倍时，尾部不足一个元素的字节保持原样；
///   - 对同一 `order` 调用两次得到原始字节。
pub fn reorder(buf: &mut [u8], element_size: usize, order: ByteOrder) {
    if element_size < 2 || order == ByteOrder::Big {
        return;
    }
    for element in buf.chunks_exact_mut(element_size) {
        order.reorder_element(element);
    }
}
