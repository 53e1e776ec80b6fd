//! 线协议黄金向量。
//!
//! 每条向量固定一个值的编码字节；编码必须逐字节一致，解码必须还原为同一结构。
//! 向量一旦发布即为兼容性契约，修改前需确认所有对端同步升级。

mod support;

use objwire_codec::{FunctionBlob, Heap, ObjectCodec, Value};
use support::{Tree, snapshot, unhex};

struct Vector {
    name: &'static str,
    tree: Tree,
    hex: &'static str,
}

fn vectors() -> Vec<Vector> {
    vec![
        Vector {
            name: "nil",
            tree: Tree::Nil,
            hex: "00",
        },
        Vector {
            name: "true",
            tree: Tree::Bool(true),
            hex: "01 01",
        },
        Vector {
            name: "false",
            tree: Tree::Bool(false),
            hex: "01 00",
        },
        Vector {
            name: "integer five",
            tree: Tree::Int(5),
            hex: "07 00000005",
        },
        Vector {
            name: "negative integer",
            tree: Tree::Int(-2),
            hex: "07 fffffffe",
        },
        Vector {
            name: "fractional double",
            tree: Tree::Double(0.5),
            hex: "03 3fe0000000000000",
        },
        Vector {
            name: "double beyond i32",
            tree: Tree::Double(4_294_967_296.0),
            hex: "03 41f0000000000000",
        },
        Vector {
            name: "string AB",
            tree: Tree::str("AB"),
            hex: "04 0002 4142",
        },
        Vector {
            name: "empty string",
            tree: Tree::str(""),
            hex: "04 0000",
        },
        Vector {
            name: "function blob",
            tree: Tree::Func(vec![0xde, 0xad]),
            hex: "06 0002 dead",
        },
        Vector {
            name: "empty table",
            tree: Tree::Table(Vec::new()),
            hex: "05 0000",
        },
        Vector {
            name: "table {1 = \"x\"}",
            tree: Tree::Table(vec![(Tree::Int(1), Tree::str("x"))]),
            hex: "05 0001 07 00000001 04 0001 78",
        },
    ]
}

#[test]
fn encoding_matches_golden_bytes() {
    let codec = ObjectCodec::new();
    for vector in vectors() {
        let mut heap = Heap::new();
        let value = vector.tree.build(&mut heap);
        let bytes = codec.encode(&heap, value).expect(vector.name);
        assert_eq!(
            hex::encode(&bytes),
            hex::encode(unhex(vector.hex)),
            "vector `{}`",
            vector.name
        );
    }
}

#[test]
fn decoding_golden_bytes_restores_the_value() {
    let codec = ObjectCodec::new();
    for vector in vectors() {
        let input = unhex(vector.hex);
        let mut heap = Heap::new();
        let decoded = codec.decode(&mut heap, &input, 0, 0).expect(vector.name);
        assert_eq!(decoded.values.len(), 1, "vector `{}`", vector.name);
        assert_eq!(decoded.next_offset, input.len() as u64);
        assert_eq!(
            snapshot(&heap, decoded.values[0]),
            vector.tree,
            "vector `{}`",
            vector.name
        );
    }
}

#[test]
fn integral_doubles_travel_as_integers() {
    let heap = Heap::new();
    let codec = ObjectCodec::new();
    assert_eq!(
        codec.encode(&heap, Value::Double(2.0)).expect("encode").as_ref(),
        unhex("07 00000002")
    );
    assert_eq!(
        codec.encode(&heap, Value::Double(-0.0)).expect("encode").as_ref(),
        unhex("07 00000000")
    );
}

#[test]
fn nonzero_boolean_bytes_decode_as_true() {
    let mut heap = Heap::new();
    let decoded = objwire_codec::decode(&mut heap, &unhex("01 02 01 ff"), 0, 0).expect("decode");
    assert_eq!(
        decoded.values,
        vec![Value::Boolean(true), Value::Boolean(true)]
    );
}

#[test]
fn shared_string_and_self_reference_vectors() {
    let codec = ObjectCodec::new();

    // 表占编号 1，字符串占编号 2。
    let mut heap = Heap::new();
    let shared = heap.string("a");
    let table = heap.alloc_table(Default::default());
    heap.push_entry(table, Value::Integer(1), shared);
    heap.push_entry(table, Value::Integer(2), shared);
    assert_eq!(
        hex::encode(codec.encode(&heap, table.into()).expect("encode")),
        "0500020700000001040001610700000002140002"
    );

    let mut heap = Heap::new();
    let table = heap.alloc_table(Default::default());
    heap.push_entry(table, Value::Integer(1), table.into());
    assert_eq!(
        hex::encode(codec.encode(&heap, table.into()).expect("encode")),
        "0500010700000001140001"
    );

    let mut heap = Heap::new();
    let blob = heap.alloc_function(FunctionBlob::new(vec![0x01]));
    let table = heap.alloc_table(Default::default());
    heap.push_entry(table, blob.into(), blob.into());
    assert_eq!(
        hex::encode(objwire_codec::encode(&heap, table.into()).expect("encode")),
        "05000106000101140002"
    );
}
