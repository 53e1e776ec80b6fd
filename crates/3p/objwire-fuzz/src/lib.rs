//! objwire-fuzz 公共支持库。
//!
//! # 教案式定位
//! - **Why**：fuzz target 与回归测试共用同一套“任意值图”构造与比较逻辑，避免两处实现漂移；
//! - **What**：[`GraphSpec`] 由 `arbitrary` 生成，[`GraphSpec::build`] 在堆上构造可能含共享与环的值图，
//!   [`same_graph`] 判断两张图是否同构（对象身份一一对应）；
//! - **How**：`Alias` 节点引用此前已分配的对象，若指向仍在构造中的祖先表即形成环。

use std::collections::HashMap;

use arbitrary::Arbitrary;
use objwire_codec::{FunctionBlob, Heap, ObjectCodec, ObjectId, Table, Value};

/// 构造时的最大嵌套层数，超过后的节点退化为 `Nil`。
const MAX_BUILD_DEPTH: usize = 48;

/// 值图节点描述。
#[derive(Debug, Arbitrary)]
pub enum NodeSpec {
    Nil,
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(Vec<u8>),
    Func(Vec<u8>),
    Table(Vec<(NodeSpec, NodeSpec)>),
    /// 引用第 `n % 已分配数` 个已分配对象。
    Alias(u16),
    Userdata(u64),
}

/// 一次 fuzz 用例：根节点加编码限额。
#[derive(Debug, Arbitrary)]
pub struct GraphSpec {
    pub root: NodeSpec,
    pub max_depth: Option<u8>,
}

impl GraphSpec {
    /// 在 `heap` 上构造值图。
    pub fn build(&self, heap: &mut Heap) -> Value {
        let mut objects = Vec::new();
        build_node(&self.root, heap, &mut objects, 0)
    }
}

fn build_node(node: &NodeSpec, heap: &mut Heap, objects: &mut Vec<Value>, depth: usize) -> Value {
    if depth > MAX_BUILD_DEPTH {
        return Value::Nil;
    }
    match node {
        NodeSpec::Nil => Value::Nil,
        NodeSpec::Bool(b) => Value::Boolean(*b),
        NodeSpec::Int(i) => Value::Integer(*i),
        NodeSpec::Double(d) => Value::Double(*d),
        NodeSpec::Str(bytes) => {
            let value = heap.string(bytes.clone());
            objects.push(value);
            value
        }
        NodeSpec::Func(bytes) => {
            let value = Value::Function(heap.alloc_function(FunctionBlob::new(bytes.clone())));
            objects.push(value);
            value
        }
        NodeSpec::Table(entries) => {
            let handle = heap.alloc_table(Table::new());
            objects.push(handle.into());
            for (key, value) in entries {
                let key = build_node(key, heap, objects, depth + 1);
                let value = build_node(value, heap, objects, depth + 1);
                heap.push_entry(handle, key, value);
            }
            handle.into()
        }
        NodeSpec::Alias(n) => match objects.len() {
            0 => Value::Nil,
            len => objects[usize::from(*n) % len],
        },
        NodeSpec::Userdata(u) => Value::Userdata(*u),
    }
}

/// 判断两张值图是否同构：标量按编码规则相等，堆对象按身份一一对应。
pub fn same_graph(left_heap: &Heap, left: Value, right_heap: &Heap, right: Value) -> bool {
    let mut pairs = HashMap::new();
    same_node(left_heap, left, right_heap, right, &mut pairs)
}

fn scalar_bits(value: Value) -> Option<(u8, u64)> {
    match value {
        Value::Nil => Some((0, 0)),
        Value::Boolean(b) => Some((1, u64::from(b))),
        Value::Integer(i) => Some((7, i as u64)),
        Value::Double(d) => match Value::number(d) {
            Value::Integer(i) => Some((7, i as u64)),
            _ => Some((3, d.to_bits())),
        },
        _ => None,
    }
}

fn same_node(
    left_heap: &Heap,
    left: Value,
    right_heap: &Heap,
    right: Value,
    pairs: &mut HashMap<ObjectId, ObjectId>,
) -> bool {
    if let (Some(a), Some(b)) = (scalar_bits(left), scalar_bits(right)) {
        return a == b;
    }
    let (Some(left_id), Some(right_id)) = (left.identity(), right.identity()) else {
        return false;
    };
    if let Some(&seen) = pairs.get(&left_id) {
        return seen == right_id;
    }
    pairs.insert(left_id, right_id);

    match (left, right) {
        (Value::String(a), Value::String(b)) => left_heap.str_bytes(a) == right_heap.str_bytes(b),
        (Value::Function(a), Value::Function(b)) => left_heap.function(a) == right_heap.function(b),
        (Value::Table(a), Value::Table(b)) => {
            let (Some(a), Some(b)) = (left_heap.get_table(a), right_heap.get_table(b)) else {
                return false;
            };
            a.len() == b.len()
                && a.entries().iter().zip(b.entries()).all(|(&(ak, av), &(bk, bv))| {
                    same_node(left_heap, ak, right_heap, bk, pairs)
                        && same_node(left_heap, av, right_heap, bv, pairs)
                })
        }
        _ => false,
    }
}

/// 编码成功的值图必须可解码，且与原图同构；分片输出必须与连续输出一致。
pub fn check_roundtrip(spec: &GraphSpec) {
    let mut heap = Heap::new();
    let value = spec.build(&mut heap);
    let limits = objwire_codec::CodecLimits::default()
        .with_max_depth(spec.max_depth.and_then(|d| core::num::NonZeroU16::new(u16::from(d))));
    let codec = ObjectCodec::with_limits(limits);

    let Ok(bytes) = codec.encode(&heap, value) else {
        return;
    };
    let chunks = codec.encode_chunks(&heap, value).expect("chunked encode agrees");
    assert_eq!(chunks.concat(), bytes.to_vec());

    let mut decoded_heap = Heap::new();
    let decoded = codec
        .decode_chunks(&mut decoded_heap, &chunks, 0, 0)
        .expect("own output decodes");
    assert_eq!(decoded.values.len(), 1);
    assert_eq!(decoded.next_offset, bytes.len() as u64);
    assert!(same_graph(&heap, value, &decoded_heap, decoded.values[0]));
}

/// 任意字节解码：不得 panic，失败时堆必须回滚。
pub fn check_decode(input: &[u8]) {
    let codec = ObjectCodec::new();
    let mut heap = Heap::new();
    let split = input.first().map_or(0, |b| usize::from(*b) % (input.len() + 1));
    let (head, tail) = input.split_at(split);
    match codec.decode_chunks(&mut heap, &[head, tail], 0, 0) {
        Ok(decoded) => assert!(decoded.next_offset <= input.len() as u64),
        Err(_) => assert!(heap.is_empty()),
    }
}
