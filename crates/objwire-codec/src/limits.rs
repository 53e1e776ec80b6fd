//! 编解码限额与递归深度守卫。
//!
//! # 实现策略（How）
//! - [`CodecLimits`] 是可复制的纯数据，编码、解码与流式解码共用同一份；
//! - 表递归通过 `enter_frame` 进入，返回的 `FrameGuard` 在离开作用域时回退深度，
//!   提前返回的错误路径也不会漏减计数；
//! - 帧长只在编码输出完成或顶层值跨度确定后检查，流式解码对未完成的值按已缓冲字节数检查。

use core::{
    num::NonZeroU16,
    ops::{Deref, DerefMut},
};

use crate::error::CodecError;

/// 默认的表嵌套深度上限。
pub const DEFAULT_MAX_DEPTH: u16 = 200;

/// 编解码限额。
///
/// # 教案式说明
/// - **意图 (Why)**：深层嵌套的表会让递归编解码无限制地消耗原生调用栈，恶意输入可以借此拖垮进程；
///   帧长上限则阻止单个值占满内存；
/// - **契约 (What)**：
///   - `max_depth`：表嵌套层数上限，`None` 表示不限制（仅建议在可信输入上使用）；
///   - `max_frame_size`：编码输出总长 / 单个顶层值解码跨度的字节上限；
/// - **权衡 (Trade-offs)**：默认深度 200 足以覆盖常见配置型数据，同时远低于默认线程栈可承受的递归层数。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodecLimits {
    /// 表嵌套深度上限。
    pub max_depth: Option<NonZeroU16>,
    /// 帧长上限（字节）。
    pub max_frame_size: Option<usize>,
}

impl CodecLimits {
    /// 不设任何限制。
    pub const fn unbounded() -> Self {
        Self {
            max_depth: None,
            max_frame_size: None,
        }
    }

    /// 替换深度上限。
    pub const fn with_max_depth(mut self, max_depth: Option<NonZeroU16>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// 替换帧长上限。
    pub const fn with_max_frame_size(mut self, max_frame_size: Option<usize>) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub(crate) fn check_frame(&self, len: usize) -> Result<(), CodecError> {
        match self.max_frame_size {
            Some(limit) if len > limit => Err(CodecError::FrameTooLarge { len, limit }),
            _ => Ok(()),
        }
    }
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_depth: NonZeroU16::new(DEFAULT_MAX_DEPTH),
            max_frame_size: None,
        }
    }
}

/// 递归深度计数器，编码与解码上下文共用。
#[derive(Debug)]
pub(crate) struct FrameDepth {
    limit: Option<NonZeroU16>,
    current: u16,
}

impl FrameDepth {
    pub(crate) fn new(limit: Option<NonZeroU16>) -> Self {
        Self { limit, current: 0 }
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> u16 {
        self.current
    }

    fn enter(&mut self) -> Result<(), CodecError> {
        let next = self.current.saturating_add(1);
        if let Some(limit) = self.limit
            && next > limit.get()
        {
            return Err(CodecError::DepthLimitExceeded {
                depth: next,
                limit: limit.get(),
            });
        }
        self.current = next;
        Ok(())
    }

    fn leave(&mut self) {
        self.current = self.current.saturating_sub(1);
    }
}

/// 持有深度计数器的上下文。
pub(crate) trait DepthTracked {
    fn frame_depth(&mut self) -> &mut FrameDepth;
}

/// 进入一层表递归，返回离开作用域时自动回退深度的守卫。
///
/// 守卫解引用为上下文本身，递归调用通过 `&mut *guard` 继续使用上下文。
pub(crate) fn enter_frame<C: DepthTracked>(ctx: &mut C) -> Result<FrameGuard<'_, C>, CodecError> {
    ctx.frame_depth().enter()?;
    Ok(FrameGuard { ctx })
}

/// 表递归的 RAII 深度守卫。
#[must_use = "guard drops to release table nesting depth"]
pub(crate) struct FrameGuard<'c, C: DepthTracked> {
    ctx: &'c mut C,
}

impl<C: DepthTracked> Deref for FrameGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.ctx
    }
}

impl<C: DepthTracked> DerefMut for FrameGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.ctx
    }
}

impl<C: DepthTracked> Drop for FrameGuard<'_, C> {
    fn drop(&mut self) {
        self.ctx.frame_depth().leave();
    }
}
