//! 集成测试共享的值树模型。
//!
//! `Tree` 是与堆无关的纯值描述：可以在任意堆上构建，也可以从解码结果中读回，
//! 用于跨堆比较“结构相等”。只适用于无环值。

#![allow(dead_code)]

use objwire_codec::{FunctionBlob, Heap, Value};

/// 与堆无关的值树。
#[derive(Clone, Debug, PartialEq)]
pub enum Tree {
    Nil,
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(Vec<u8>),
    Func(Vec<u8>),
    Table(Vec<(Tree, Tree)>),
}

impl Tree {
    /// 按编码器的数字归类规则构造。
    pub fn number(n: f64) -> Tree {
        match Value::number(n) {
            Value::Integer(i) => Tree::Int(i),
            _ => Tree::Double(n),
        }
    }

    pub fn str(text: &str) -> Tree {
        Tree::Str(text.as_bytes().to_vec())
    }

    /// 在堆上分配，每个字符串/函数块/表都是独立对象。
    pub fn build(&self, heap: &mut Heap) -> Value {
        match self {
            Tree::Nil => Value::Nil,
            Tree::Bool(b) => Value::Boolean(*b),
            Tree::Int(i) => Value::Integer(*i),
            Tree::Double(d) => Value::Double(*d),
            Tree::Str(bytes) => heap.string(bytes.clone()),
            Tree::Func(bytes) => heap.alloc_function(FunctionBlob::new(bytes.clone())).into(),
            Tree::Table(entries) => {
                let handle = heap.alloc_table(Default::default());
                for (key, value) in entries {
                    let key = key.build(heap);
                    let value = value.build(heap);
                    heap.push_entry(handle, key, value);
                }
                handle.into()
            }
        }
    }

    /// 条目按调试表示排序后的副本，用于与顺序无关的比较。
    pub fn canonical(&self) -> Tree {
        match self {
            Tree::Table(entries) => {
                let mut entries: Vec<_> = entries
                    .iter()
                    .map(|(k, v)| (k.canonical(), v.canonical()))
                    .collect();
                entries.sort_by_cached_key(|entry| format!("{entry:?}"));
                Tree::Table(entries)
            }
            other => other.clone(),
        }
    }
}

/// 从堆中读回值树；共享子对象会被展开为多份。
pub fn snapshot(heap: &Heap, value: Value) -> Tree {
    match value {
        Value::Nil => Tree::Nil,
        Value::Boolean(b) => Tree::Bool(b),
        Value::Integer(i) => Tree::Int(i),
        Value::Double(d) => Tree::Double(d),
        Value::String(s) => Tree::Str(heap.str_bytes(s).expect("live string").to_vec()),
        Value::Function(f) => Tree::Func(heap.function(f).expect("live blob").as_bytes().to_vec()),
        Value::Table(t) => Tree::Table(
            heap.get_table(t)
                .expect("live table")
                .entries()
                .iter()
                .map(|&(k, v)| (snapshot(heap, k), snapshot(heap, v)))
                .collect(),
        ),
        Value::Userdata(_) => panic!("userdata never appears in decoded output"),
    }
}

/// 十六进制文本转字节，允许空白分隔。
pub fn unhex(text: &str) -> Vec<u8> {
    let compact: String = text.split_whitespace().collect();
    hex::decode(compact).expect("valid hex literal")
}

/// 一组覆盖全部标签的顶层值，第三个值内部含共享子表。
pub fn mixed_stream(heap: &mut Heap) -> Vec<Value> {
    let shared = heap.alloc_table(Default::default());
    let key = heap.string("k");
    heap.push_entry(shared, key, Value::Double(0.25));
    let outer = heap.alloc_table(Default::default());
    heap.push_entry(outer, Value::Integer(1), shared.into());
    heap.push_entry(outer, Value::Integer(2), shared.into());
    let blob = heap.alloc_function(FunctionBlob::new(vec![0xde, 0xad, 0xbe, 0xef]));

    vec![
        Value::Integer(-42),
        heap.string("hello"),
        outer.into(),
        Value::Nil,
        Value::Boolean(true),
        Value::Double(1.5e300),
        blob.into(),
    ]
}
