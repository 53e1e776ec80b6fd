//! 闭包桥接。
//!
//! 编解码器本身不理解闭包，只搬运不透明的函数块字节。闭包与字节之间的转换由宿主运行时
//! 实现 [`ClosureSerializer`] 完成，[`Heap::store_closure`] / [`Heap::load_closure`]
//! 负责把结果接入对象堆。

use bytes::Bytes;
use thiserror::Error;

use crate::value::{FunctionBlob, FunctionRef, Heap};
use crate::wire::MAX_LENGTH;

/// 宿主提供的闭包转储/恢复能力。
pub trait ClosureSerializer {
    /// 宿主闭包类型。
    type Closure;
    /// 宿主错误类型。
    type Error: std::error::Error + Send + Sync + 'static;

    /// 转储闭包为字节。
    fn dump(&self, closure: &Self::Closure) -> Result<Bytes, Self::Error>;

    /// 由字节恢复闭包。
    fn load(&self, blob: &[u8]) -> Result<Self::Closure, Self::Error>;
}

/// 闭包桥接错误。
#[derive(Debug, Error)]
pub enum ClosureError {
    /// 宿主序列化器失败。
    #[error("closure serializer failed")]
    Serializer(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// 转储结果超过线协议长度上限。
    #[error("closure dump of {len} bytes exceeds 65535")]
    TooLarge {
        /// 转储长度。
        len: usize,
    },
    /// 句柄不指向当前堆中的函数块。
    #[error("handle #{id} is not a function blob in this heap")]
    NotAFunction {
        /// 句柄编号。
        id: u32,
    },
}

impl Heap {
    /// 转储闭包并分配为函数块。
    ///
    /// 超过 65535 字节的转储在此处即被拒绝，而不是等到编码时才失败。
    pub fn store_closure<S: ClosureSerializer>(
        &mut self,
        serializer: &S,
        closure: &S::Closure,
    ) -> Result<FunctionRef, ClosureError> {
        let bytes = serializer
            .dump(closure)
            .map_err(|err| ClosureError::Serializer(Box::new(err)))?;
        if bytes.len() > MAX_LENGTH {
            return Err(ClosureError::TooLarge { len: bytes.len() });
        }
        Ok(self.alloc_function(FunctionBlob::new(bytes)))
    }

    /// 由函数块恢复闭包。
    pub fn load_closure<S: ClosureSerializer>(
        &self,
        serializer: &S,
        handle: FunctionRef,
    ) -> Result<S::Closure, ClosureError> {
        let blob = self.function(handle).ok_or(ClosureError::NotAFunction {
            id: handle.id().get(),
        })?;
        serializer
            .load(blob.as_bytes())
            .map_err(|err| ClosureError::Serializer(Box::new(err)))
    }
}
