//! 动态类型值与对象堆。
//!
//! # 模块定位（Why）
//! - 线协议按**对象身份**而非值相等来折叠重复的字符串、函数块与表，因此这些对象必须拥有稳定身份；
//! - 表允许包含自身，若用引用计数直接互指会形成所有权环；改为“堆 + 整数句柄”后，
//!   自引用只是堆里的一条边，不存在生命周期问题。
//!
//! # 结构说明（How）
//! - [`Heap`] 是对象竞技场（arena），按分配顺序存放 [`Object`]；
//! - [`StrRef`]、[`TableRef`]、[`FunctionRef`] 是带类型的句柄，包装同一个 [`ObjectId`]，句柄相等即身份相等；
//! - [`Value`] 为 `Copy` 枚举，标量按值存放，堆对象只存句柄。
//!
//! # 契约说明（What）
//! - 句柄只在签发它的堆上有效；跨堆使用会在编码时报告 `DanglingHandle`；
//! - 堆不回收对象，[`Heap::rollback`] 只用于撤销一次失败解码产生的半成品。

use core::fmt;

use bytes::Bytes;

/// 堆内对象编号。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    /// 原始编号。
    pub const fn get(self) -> u32 {
        self.0
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(ObjectId);

        impl $name {
            /// 句柄对应的对象编号。
            pub const fn id(self) -> ObjectId {
                self.0
            }
        }
    };
}

handle!(
    /// 字符串对象句柄。
    StrRef
);
handle!(
    /// 表对象句柄。
    TableRef
);
handle!(
    /// 函数块对象句柄。
    FunctionRef
);

/// 动态类型值。
///
/// # 教案式说明
/// - **意图 (Why)**：覆盖宿主脚本语言中可跨进程传递的全部值类型，外加一个仅存在于宿主内部、
///   无法序列化的 `Userdata`；
/// - **契约 (What)**：
///   - `Integer` 与 `Double` 都是“数字”，编码时按 [`Value::number`] 的规则归类；
///   - `String`/`Table`/`Function` 通过句柄比较相等，即身份相等而非内容相等；
///   - 线协议中的引用记录从不以 `Value` 形式出现，解码时直接还原为被引用对象的句柄。
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    /// 空值。
    Nil,
    /// 布尔值。
    Boolean(bool),
    /// 无小数部分且落在 `i32` 范围内的数字。
    Integer(i32),
    /// 其余数字。
    Double(f64),
    /// 字符串。
    String(StrRef),
    /// 表。
    Table(TableRef),
    /// 已由外部序列化器转储的闭包。
    Function(FunctionRef),
    /// 宿主私有句柄，不可序列化。
    Userdata(u64),
}

impl Value {
    /// 按“整数当且仅当等于自身截断值”的规则构造数字。
    ///
    /// 超出 `i32` 范围、带小数部分或为 NaN/∞ 的数字保持为 `Double`。
    pub fn number(n: f64) -> Value {
        match integral_i32(n) {
            Some(i) => Value::Integer(i),
            None => Value::Double(n),
        }
    }

    /// 宿主类型名，用于错误信息与日志。
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Double(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
            Value::Userdata(_) => "userdata",
        }
    }

    /// 引用缓存所用的对象身份；标量返回 `None`。
    pub const fn identity(&self) -> Option<ObjectId> {
        match self {
            Value::String(s) => Some(s.0),
            Value::Table(t) => Some(t.0),
            Value::Function(f) => Some(f.0),
            _ => None,
        }
    }

    /// 若为表则返回句柄。
    pub const fn as_table(&self) -> Option<TableRef> {
        match self {
            Value::Table(t) => Some(*t),
            _ => None,
        }
    }

    /// 若为字符串则返回句柄。
    pub const fn as_str(&self) -> Option<StrRef> {
        match self {
            Value::String(s) => Some(*s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::number(value)
    }
}

impl From<StrRef> for Value {
    fn from(value: StrRef) -> Self {
        Value::String(value)
    }
}

impl From<TableRef> for Value {
    fn from(value: TableRef) -> Self {
        Value::Table(value)
    }
}

impl From<FunctionRef> for Value {
    fn from(value: FunctionRef) -> Self {
        Value::Function(value)
    }
}

pub(crate) fn integral_i32(n: f64) -> Option<i32> {
    if n.trunc() == n && n >= i32::MIN as f64 && n <= i32::MAX as f64 {
        Some(n as i32)
    } else {
        None
    }
}

/// 按插入顺序保存键值对的表。
///
/// 线协议原样保留条目顺序；同一个键出现多次时全部保留，[`Table::get`] 返回首个匹配。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    entries: Vec<(Value, Value)>,
}

impl Table {
    /// 空表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 预留容量的空表。
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// 追加一个条目。
    pub fn push(&mut self, key: Value, value: Value) {
        self.entries.push((key, value));
    }

    /// 设置键：已存在则覆盖首个匹配条目的值，否则追加。
    pub fn set(&mut self, key: Value, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// 按 [`Value`] 相等查找值。
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// 全部条目。
    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    /// 条目数。
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 闭包转储结果，对编解码器而言是不透明字节。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionBlob(Bytes);

impl FunctionBlob {
    /// 包装转储字节。
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// 转储字节。
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}

/// 堆中存放的对象。
#[derive(Clone, Debug, PartialEq)]
pub enum Object {
    /// 字符串字节，不要求 UTF-8。
    String(Bytes),
    /// 闭包转储。
    Function(FunctionBlob),
    /// 表。
    Table(Table),
}

/// 堆的分配水位，用于撤销失败操作留下的对象。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// 对象竞技场。
///
/// # 教案式说明
/// - **意图 (Why)**：为字符串、函数块、表提供稳定身份，使“同一对象出现两次”可以被识别并折叠为引用；
/// - **逻辑 (How)**：对象按分配顺序追加到 `Vec`，下标即 [`ObjectId`]；
/// - **契约 (What)**：
///   - 分配永不失败（除非内存耗尽），返回的句柄在堆存活期间一直有效；
///   - 通过表句柄修改表内容，所有持有该句柄的位置都能观察到变化；
/// - **风险 (Trade-offs)**：不做垃圾回收，长期存活的堆应由调用方按消息粒度重建。
#[derive(Clone, Debug, Default)]
pub struct Heap {
    objects: Vec<Object>,
}

impl Heap {
    /// 空堆。
    pub fn new() -> Self {
        Self::default()
    }

    /// 已分配对象数。
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// 是否未分配任何对象。
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn alloc(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    /// 分配字符串。
    pub fn alloc_string(&mut self, bytes: impl Into<Bytes>) -> StrRef {
        StrRef(self.alloc(Object::String(bytes.into())))
    }

    /// 分配字符串并包装为 [`Value`]。
    pub fn string(&mut self, bytes: impl Into<Bytes>) -> Value {
        Value::String(self.alloc_string(bytes))
    }

    /// 分配函数块。
    pub fn alloc_function(&mut self, blob: FunctionBlob) -> FunctionRef {
        FunctionRef(self.alloc(Object::Function(blob)))
    }

    /// 分配表。
    pub fn alloc_table(&mut self, table: Table) -> TableRef {
        TableRef(self.alloc(Object::Table(table)))
    }

    /// 分配空表并包装为 [`Value`]。
    pub fn table(&mut self) -> Value {
        Value::Table(self.alloc_table(Table::new()))
    }

    /// 按编号读取对象。
    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.index())
    }

    /// 字符串字节。
    pub fn str_bytes(&self, handle: StrRef) -> Option<&Bytes> {
        match self.object(handle.0)? {
            Object::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// 函数块。
    pub fn function(&self, handle: FunctionRef) -> Option<&FunctionBlob> {
        match self.object(handle.0)? {
            Object::Function(blob) => Some(blob),
            _ => None,
        }
    }

    /// 只读访问表。
    pub fn get_table(&self, handle: TableRef) -> Option<&Table> {
        match self.object(handle.0)? {
            Object::Table(table) => Some(table),
            _ => None,
        }
    }

    /// 可变访问表。
    pub fn get_table_mut(&mut self, handle: TableRef) -> Option<&mut Table> {
        match self.objects.get_mut(handle.0.index())? {
            Object::Table(table) => Some(table),
            _ => None,
        }
    }

    /// 向表追加条目；句柄无效时返回 `false`。
    pub fn push_entry(&mut self, handle: TableRef, key: Value, value: Value) -> bool {
        match self.get_table_mut(handle) {
            Some(table) => {
                table.push(key, value);
                true
            }
            None => false,
        }
    }

    /// 记录当前分配水位。
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.objects.len())
    }

    /// 丢弃水位之后分配的全部对象；之后签发的句柄随之失效。
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.objects.truncate(checkpoint.0);
    }

    /// 字符串内容的便捷视图，非 UTF-8 时返回 `None`。
    pub fn str_utf8(&self, handle: StrRef) -> Option<&str> {
        self.str_bytes(handle)
            .and_then(|bytes| core::str::from_utf8(bytes).ok())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "string#{}", s.0.0),
            Value::Table(t) => write!(f, "table#{}", t.0.0),
            Value::Function(h) => write!(f, "function#{}", h.0.0),
            Value::Userdata(u) => write!(f, "userdata({u:#x})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_classification_follows_truncation_rule() {
        assert_eq!(Value::number(5.0), Value::Integer(5));
        assert_eq!(Value::number(-7.0), Value::Integer(-7));
        assert_eq!(Value::number(0.5), Value::Double(0.5));
        assert_eq!(Value::number(4_294_967_296.0), Value::Double(4_294_967_296.0));
        assert!(matches!(Value::number(f64::NAN), Value::Double(d) if d.is_nan()));
        assert_eq!(Value::number(f64::INFINITY), Value::Double(f64::INFINITY));
    }

    #[test]
    fn handles_compare_by_identity() {
        let mut heap = Heap::new();
        let a = heap.string("same");
        let b = heap.string("same");
        assert_ne!(a, b);
        assert_eq!(a, a);
        assert_ne!(a.identity(), b.identity());
        assert_eq!(Value::Integer(1).identity(), None);
    }

    #[test]
    fn table_mutation_is_visible_through_every_copy_of_the_handle() {
        let mut heap = Heap::new();
        let shared = heap.alloc_table(Table::new());
        let outer = heap.alloc_table(Table::new());
        heap.push_entry(outer, Value::Integer(1), shared.into());
        heap.push_entry(outer, Value::Integer(2), shared.into());

        heap.push_entry(shared, Value::Boolean(true), Value::Integer(9));

        let table = heap.get_table(outer).expect("outer table");
        for (_, value) in table.entries() {
            let inner = value.as_table().expect("table value");
            assert_eq!(heap.get_table(inner).expect("inner").len(), 1);
        }
    }

    #[test]
    fn set_overwrites_first_match() {
        let mut table = Table::new();
        table.set(Value::Integer(1), Value::Boolean(false));
        table.set(Value::Integer(1), Value::Boolean(true));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&Value::Integer(1)), Some(&Value::Boolean(true)));
        assert_eq!(table.get(&Value::Integer(2)), None);
    }

    #[test]
    fn rollback_discards_later_allocations() {
        let mut heap = Heap::new();
        let kept = heap.alloc_string("kept");
        let mark = heap.checkpoint();
        let dropped = heap.alloc_table(Table::new());
        heap.rollback(mark);
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.str_utf8(kept), Some("kept"));
        assert!(heap.get_table(dropped).is_none());
    }

    #[test]
    fn typed_accessors_reject_mismatched_objects() {
        let mut heap = Heap::new();
        let s = heap.alloc_string("x");
        let forged = TableRef(s.id());
        assert!(heap.get_table(forged).is_none());
    }
}
