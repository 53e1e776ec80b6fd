//! 长度、计数、引用编号、深度与帧长的边界。

mod support;

use core::num::NonZeroU16;

use bytes::Bytes;
use objwire_codec::{
    CodecError, CodecLimits, FunctionBlob, Heap, LengthKind, ObjectCodec, Table, TableRef, Value,
    codes,
};
use support::unhex;
use tracing_test::traced_test;

fn table_with_entries(heap: &mut Heap, count: usize) -> TableRef {
    let mut table = Table::with_capacity(count);
    for i in 0..count {
        table.push(Value::Integer(i as i32), Value::Nil);
    }
    heap.alloc_table(table)
}

fn nested_tables(heap: &mut Heap, depth: usize) -> Value {
    let mut current = heap.alloc_table(Table::new());
    for _ in 1..depth {
        let parent = heap.alloc_table(Table::new());
        heap.push_entry(parent, Value::Nil, current.into());
        current = parent;
    }
    current.into()
}

#[test]
fn string_length_boundary() {
    let codec = ObjectCodec::new();
    let mut heap = Heap::new();

    let max = heap.string(vec![b'a'; 65_535]);
    let bytes = codec.encode(&heap, max).expect("65535 bytes fit");
    assert_eq!(bytes.len(), 3 + 65_535);
    assert_eq!(&bytes[..3], [0x04, 0xff, 0xff]);

    let over = heap.string(vec![b'a'; 65_536]);
    let err = codec.encode(&heap, over).expect_err("65536 bytes overflow");
    assert_eq!(
        err,
        CodecError::ValueTooLarge {
            kind: LengthKind::String,
            len: 65_536,
        }
    );
    assert_eq!(err.code(), codes::ENCODE_VALUE_TOO_LARGE);
}

#[test]
fn function_blob_length_boundary() {
    let codec = ObjectCodec::new();
    let mut heap = Heap::new();
    let max = heap.alloc_function(FunctionBlob::new(Bytes::from(vec![0u8; 65_535])));
    assert!(codec.encode(&heap, max.into()).is_ok());
    let over = heap.alloc_function(FunctionBlob::new(Bytes::from(vec![0u8; 65_536])));
    assert_eq!(
        codec.encode(&heap, over.into()),
        Err(CodecError::ValueTooLarge {
            kind: LengthKind::Function,
            len: 65_536,
        })
    );
}

#[test]
fn table_entry_count_boundary() {
    let codec = ObjectCodec::new();
    let mut heap = Heap::new();

    let max = table_with_entries(&mut heap, 65_535);
    let bytes = codec.encode(&heap, max.into()).expect("65535 entries fit");
    assert_eq!(&bytes[..3], [0x05, 0xff, 0xff]);

    let mut decoded_heap = Heap::new();
    let decoded = codec
        .decode(&mut decoded_heap, &bytes, 0, 0)
        .expect("decode");
    let table = decoded.values[0].as_table().expect("table");
    assert_eq!(decoded_heap.get_table(table).expect("live").len(), 65_535);

    let over = table_with_entries(&mut heap, 65_536);
    assert_eq!(
        codec.encode(&heap, over.into()),
        Err(CodecError::ValueTooLarge {
            kind: LengthKind::Table,
            len: 65_536,
        })
    );
}

#[test]
fn reference_id_space_is_sixteen_bits() {
    let codec = ObjectCodec::new();
    let mut heap = Heap::new();

    // 表本身占用编号 1，剩余 65534 个编号留给字符串。
    let fits = heap.alloc_table(Table::new());
    for i in 0..65_534 {
        let text = heap.string(i.to_string());
        heap.push_entry(fits, Value::Integer(i), text);
    }
    assert!(codec.encode(&heap, fits.into()).is_ok());

    let extra = heap.string("one too many");
    heap.push_entry(fits, Value::Integer(-1), extra);
    let err = codec
        .encode(&heap, fits.into())
        .expect_err("65536th shared object");
    assert_eq!(err, CodecError::ReferenceOverflow);
    assert_eq!(err.code(), codes::ENCODE_REFERENCE_OVERFLOW);
}

#[test]
fn nesting_depth_is_bounded_on_encode() {
    let codec = ObjectCodec::new();
    let mut heap = Heap::new();

    let at_limit = nested_tables(&mut heap, 200);
    assert!(codec.encode(&heap, at_limit).is_ok());

    let too_deep = nested_tables(&mut heap, 201);
    assert_eq!(
        codec.encode(&heap, too_deep),
        Err(CodecError::DepthLimitExceeded {
            depth: 201,
            limit: 200,
        })
    );

    let unbounded = ObjectCodec::with_limits(CodecLimits::unbounded());
    assert!(unbounded.encode(&heap, too_deep).is_ok());
}

#[test]
fn nesting_depth_is_bounded_on_decode() {
    let mut heap = Heap::new();
    let deep = nested_tables(&mut heap, 64);
    let bytes = ObjectCodec::with_limits(CodecLimits::unbounded())
        .encode(&heap, deep)
        .expect("encode");

    let shallow = ObjectCodec::with_limits(
        CodecLimits::default().with_max_depth(NonZeroU16::new(16)),
    );
    let mut decoded_heap = Heap::new();
    let err = shallow
        .decode(&mut decoded_heap, &bytes, 0, 0)
        .expect_err("depth 17 rejected");
    assert_eq!(err, CodecError::DepthLimitExceeded { depth: 17, limit: 16 });
    assert!(decoded_heap.is_empty());

    let decoded = ObjectCodec::new()
        .decode(&mut decoded_heap, &bytes, 0, 0)
        .expect("within default limit");
    assert_eq!(decoded.values.len(), 1);
    assert_eq!(decoded_heap.len(), 64);
}

#[test]
fn userdata_is_not_serializable() {
    let codec = ObjectCodec::new();
    let mut heap = Heap::new();
    assert_eq!(
        codec.encode(&heap, Value::Userdata(0xfeed)),
        Err(CodecError::UnsupportedType {
            type_name: "userdata",
        })
    );

    let table = heap.alloc_table(Table::new());
    heap.push_entry(table, Value::Integer(1), Value::Userdata(1));
    let err = codec
        .encode(&heap, table.into())
        .expect_err("nested userdata");
    assert_eq!(err.code(), codes::ENCODE_UNSUPPORTED_TYPE);
}

#[test]
fn frame_size_limit_applies_to_both_directions() {
    let limited = ObjectCodec::with_limits(CodecLimits::default().with_max_frame_size(Some(4)));
    let mut heap = Heap::new();
    let text = heap.string("AB");
    assert_eq!(
        limited.encode(&heap, text),
        Err(CodecError::FrameTooLarge { len: 5, limit: 4 })
    );
    assert!(limited.encode(&heap, Value::Boolean(true)).is_ok());

    let mut decoded_heap = Heap::new();
    let input = unhex("01 01  04 0002 4142");
    let err = limited
        .decode(&mut decoded_heap, &input, 0, 0)
        .expect_err("second value exceeds the frame limit");
    assert_eq!(err, CodecError::FrameTooLarge { len: 5, limit: 4 });
    assert_eq!(err.code(), codes::BUDGET_FRAME_EXCEEDED);
}

#[test]
fn unknown_tags_and_bad_offsets_are_rejected() {
    let mut heap = Heap::new();
    for tag in [0x02u8, 0x08, 0x13, 0xff] {
        let err = objwire_codec::decode(&mut heap, &[tag], 0, 0).expect_err("unknown tag");
        assert_eq!(
            err,
            CodecError::MalformedStream {
                offset: 0,
                reason: "unknown tag",
            }
        );
        assert!(!err.is_incomplete());
    }

    let input = unhex("00 00");
    let empty = objwire_codec::decode(&mut heap, &input, 0, 2).expect("offset at end");
    assert!(empty.values.is_empty());
    assert_eq!(empty.next_offset, 2);
    assert_eq!(
        objwire_codec::decode(&mut heap, &input, 0, 3),
        Err(CodecError::OffsetOutOfRange { offset: 3, len: 2 })
    );
}

#[traced_test]
#[test]
fn failures_are_logged_with_their_stable_code() {
    let mut heap = Heap::new();
    let _ = objwire_codec::decode(&mut heap, &[0x02], 0, 0);
    assert!(logs_contain("decode failed"));
    assert!(logs_contain(codes::DECODE_MALFORMED));

    let _ = objwire_codec::encode(&heap, Value::Userdata(7));
    assert!(logs_contain(codes::ENCODE_UNSUPPORTED_TYPE));
}
