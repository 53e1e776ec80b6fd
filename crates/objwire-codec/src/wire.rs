//! 线协议常量与标签。
//!
//! ```text
//! value        := tag payload
//! Nil          := 0x00
//! Boolean      := 0x01 u8
//! Double       := 0x03 f64(be)
//! String       := 0x04 u16(be):len bytes[len]
//! Table        := 0x05 u16(be):count (value value){count}
//! FunctionBlob := 0x06 u16(be):len bytes[len]
//! Integer      := 0x07 i32(be)
//! Reference    := 0x14 u16(be):id
//! ```

/// 字符串/函数块长度与表条目数的上限。
pub const MAX_LENGTH: usize = u16::MAX as usize;

/// 引用编号上限；编号 0 保留为“尚未缓存”。
pub const MAX_REFERENCE_ID: u16 = u16::MAX;

/// 值标签。
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// 空值，无负载。
    Nil = 0x00,
    /// 布尔值，1 字节负载。
    Boolean = 0x01,
    /// 双精度浮点，8 字节负载。
    Double = 0x03,
    /// 字符串，2 字节长度 + 原始字节。
    String = 0x04,
    /// 表，2 字节条目数 + 键值对。
    Table = 0x05,
    /// 闭包转储，2 字节长度 + 原始字节。
    Function = 0x06,
    /// 32 位整数，4 字节负载。
    Integer = 0x07,
    /// 对先前对象的引用，2 字节编号。
    Reference = 0x14,
}

impl Tag {
    /// 标签字节。
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// 解析标签字节，未知值返回 `None`。
    pub const fn from_byte(byte: u8) -> Option<Tag> {
        match byte {
            0x00 => Some(Tag::Nil),
            0x01 => Some(Tag::Boolean),
            0x03 => Some(Tag::Double),
            0x04 => Some(Tag::String),
            0x05 => Some(Tag::Table),
            0x06 => Some(Tag::Function),
            0x07 => Some(Tag::Integer),
            0x14 => Some(Tag::Reference),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_bytes_match_wire_table() {
        let expected = [
            (Tag::Nil, 0x00),
            (Tag::Boolean, 0x01),
            (Tag::Double, 0x03),
            (Tag::String, 0x04),
            (Tag::Table, 0x05),
            (Tag::Function, 0x06),
            (Tag::Integer, 0x07),
            (Tag::Reference, 0x14),
        ];
        for (tag, byte) in expected {
            assert_eq!(tag.byte(), byte);
            assert_eq!(Tag::from_byte(byte), Some(tag));
        }
    }

    #[test]
    fn gaps_in_the_tag_space_are_rejected() {
        for byte in [0x02u8, 0x08, 0x13, 0x15, 0xff] {
            assert_eq!(Tag::from_byte(byte), None);
        }
    }
}
