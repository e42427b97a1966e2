//! Decode Tests
//!
//! Tests for turning raw frames into values.

use respwire::protocol::{decode, ByteReader, ByteSource, Decoder, Kind, Value};
use respwire::RespError;

fn decode_bytes(input: &[u8]) -> Value {
    decode(&mut ByteReader::new(input))
}

// =============================================================================
// Simple Strings
// =============================================================================

#[test]
fn test_simple_string() {
    let v = decode_bytes(b"+OK\r\n");
    assert_eq!(v.kind(), Kind::SimpleString);
    assert!(v.error().is_none());
    assert_eq!(v.as_str().unwrap(), "OK");
    assert_eq!(v.as_slice(), Some(&b"OK"[..]));
}

#[test]
fn test_simple_string_empty() {
    let v = decode_bytes(b"+\r\n");
    assert_eq!(v.kind(), Kind::SimpleString);
    assert_eq!(v.as_str().unwrap(), "");
}

#[test]
fn test_simple_string_with_lf() {
    let v = decode_bytes(b"+Hello\nWorld\r\n");
    assert_eq!(v.kind(), Kind::Invalid);
    assert!(matches!(v.error(), Some(RespError::MalformedSimpleString)));
}

#[test]
fn test_simple_string_with_bare_cr() {
    let v = decode_bytes(b"+Hello\rWorld\r\n");
    assert_eq!(v.kind(), Kind::Invalid);
    assert!(matches!(v.error(), Some(RespError::MalformedSimpleString)));
}

#[test]
fn test_simple_string_truncated() {
    let v = decode_bytes(b"+Hello");
    assert_eq!(v.kind(), Kind::Invalid);
    assert!(matches!(v.error(), Some(RespError::UnexpectedEof)));
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_error_frame() {
    let v = decode_bytes(b"-ERR unknown command\r\n");
    assert_eq!(v.kind(), Kind::Error);
    assert!(matches!(v.error(), Some(RespError::Reply(m)) if m == "ERR unknown command"));
    assert_eq!(v.to_string(), "(error) ERR unknown command");

    // Accessors report the carried error
    assert!(matches!(v.as_str(), Err(RespError::Reply(_))));
}

#[test]
fn test_error_inside_array_is_kept() {
    let v = decode_bytes(b"*2\r\n:1\r\n-WRONGTYPE nope\r\n");
    assert_eq!(v.kind(), Kind::Invalid);
    assert!(matches!(v.error(), Some(RespError::Reply(m)) if m == "WRONGTYPE nope"));
}

// =============================================================================
// Integers
// =============================================================================

#[test]
fn test_integers() {
    assert_eq!(decode_bytes(b":0\r\n").as_int().unwrap(), 0);
    assert_eq!(decode_bytes(b":1234\r\n").as_int().unwrap(), 1234);
    assert_eq!(decode_bytes(b":-123456789101\r\n").as_int().unwrap(), -123456789101);
}

#[test]
fn test_malformed_integer() {
    for input in [&b":\r\n"[..], b":-\r\n", b":12a\r\n", b": 1\r\n"] {
        let v = decode_bytes(input);
        assert_eq!(v.kind(), Kind::Invalid);
        assert!(matches!(v.error(), Some(RespError::MalformedInteger)));
    }
}

// =============================================================================
// Bulk Strings
// =============================================================================

#[test]
fn test_bulk_string() {
    let v = decode_bytes(b"$5\r\nKey 2\r\n");
    assert_eq!(v.kind(), Kind::BulkString);
    assert_eq!(v.as_str().unwrap(), "Key 2");
}

#[test]
fn test_bulk_string_binary_payload() {
    let v = decode_bytes(b"$4\r\n\r\n\0\xff\r\n");
    assert_eq!(v.as_bytes().unwrap(), Some(vec![b'\r', b'\n', 0, 0xff]));
    assert!(matches!(v.as_str(), Err(RespError::InvalidUtf8)));
}

#[test]
fn test_bulk_string_empty() {
    let v = decode_bytes(b"$0\r\n\r\n");
    assert_eq!(v.kind(), Kind::BulkString);
    assert_eq!(v.as_bytes().unwrap(), Some(Vec::new()));
}

#[test]
fn test_bulk_nil() {
    let v = decode_bytes(b"$-1\r\n");
    assert_eq!(v.kind(), Kind::Nil);
    assert!(v.is_nil());
    assert!(v.error().is_none());
    assert_eq!(v.as_bytes().unwrap(), None);
    assert_eq!(v.to_string(), "(nil)");
}

#[test]
fn test_bulk_negative_size() {
    let v = decode_bytes(b"$-2\r\n");
    assert_eq!(v.kind(), Kind::Invalid);
    assert!(matches!(v.error(), Some(RespError::BadSize)));
}

#[test]
fn test_bulk_short_payload() {
    let v = decode_bytes(b"$10\r\nabc");
    assert_eq!(v.kind(), Kind::Invalid);
    assert!(matches!(v.error(), Some(RespError::UnexpectedEof)));
}

#[test]
fn test_bulk_missing_trailer() {
    let v = decode_bytes(b"$3\r\nabcd\r\n");
    assert!(matches!(v.error(), Some(RespError::MalformedBulkString)));

    let v = decode_bytes(b"$3\r\nabc\rX");
    assert!(matches!(v.error(), Some(RespError::NoCrlf)));
}

// =============================================================================
// Arrays
// =============================================================================

#[test]
fn test_empty_array() {
    let v = decode_bytes(b"*0\r\n");
    assert_eq!(v.kind(), Kind::Array);
    assert_eq!(v.items().map(<[Value]>::len), Some(0));
    assert_eq!(v.to_string(), "(empty array)");
}

#[test]
fn test_null_array() {
    let v = decode_bytes(b"*-1\r\n");
    assert_eq!(v.kind(), Kind::Nil);
}

#[test]
fn test_negative_array_count() {
    let v = decode_bytes(b"*-5\r\n");
    assert_eq!(v.kind(), Kind::Invalid);
    assert!(matches!(v.error(), Some(RespError::BadSize)));
}

#[test]
fn test_mixed_array() {
    let v = decode_bytes(b"*4\r\n+Key 1\r\n:1234\r\n$5\r\nKey 2\r\n$-1\r\n");
    let items = v.items().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[0].kind(), Kind::SimpleString);
    assert_eq!(items[1].as_int().unwrap(), 1234);
    assert_eq!(items[2].as_str().unwrap(), "Key 2");
    assert!(items[3].is_nil());
}

#[test]
fn test_nested_arrays() {
    let v = decode_bytes(b"*2\r\n*2\r\n:1\r\n:2\r\n*1\r\n*0\r\n");
    let outer = v.items().unwrap();
    assert_eq!(outer.len(), 2);

    let first = outer[0].items().unwrap();
    assert_eq!(first[0].as_int().unwrap(), 1);
    assert_eq!(first[1].as_int().unwrap(), 2);

    let second = outer[1].items().unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].kind(), Kind::Array);
    assert_eq!(second[0].items().map(<[Value]>::len), Some(0));
}

#[test]
fn test_nesting_limit() {
    let depth = 1000;
    let mut input = b"*1\r\n".repeat(depth);
    input.extend_from_slice(b":1\r\n");

    let v = Decoder::with_max_depth(depth).decode(&mut ByteReader::new(&input[..]));
    assert_eq!(v.kind(), Kind::Array);

    let v = decode_bytes(&input);
    assert!(matches!(v.error(), Some(RespError::NestingTooDeep { max: 512 })));
}

#[test]
fn test_truncated_array() {
    let v = decode_bytes(b"*3\r\n:1\r\n:2\r\n");
    assert_eq!(v.kind(), Kind::Invalid);
    assert!(matches!(v.error(), Some(RespError::UnexpectedEof)));
}

#[test]
fn test_as_array_wraps_scalars() {
    let v = decode_bytes(b":7\r\n");
    let items = v.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0], v);
}

#[test]
fn test_string_lists() {
    let v = decode_bytes(b"*3\r\n$3\r\nSET\r\n+key\r\n$-1\r\n");
    assert_eq!(v.as_string_list().unwrap(), vec!["SET", "key", ""]);
    assert_eq!(
        v.as_bytes_list().unwrap(),
        vec![b"SET".to_vec(), b"key".to_vec(), Vec::new()]
    );
}

// =============================================================================
// Stream Behavior
// =============================================================================

#[test]
fn test_bad_type_character() {
    let mut r = ByteReader::new(&b"!oops\r\n"[..]);
    let v = decode(&mut r);
    assert_eq!(v.kind(), Kind::Invalid);
    assert!(matches!(v.error(), Some(RespError::BadTypeCharacter(b'!'))));
    assert_eq!(
        v.error().unwrap().to_string(),
        "unrecognized type character '!'"
    );

    // The offending byte is left in the stream
    assert_eq!(r.read_byte().unwrap(), b'!');
}

#[test]
fn test_consecutive_frames() {
    let mut r = ByteReader::new(&b":1\r\n+two\r\n$5\r\nthree\r\n"[..]);
    assert_eq!(decode(&mut r).as_int().unwrap(), 1);
    assert_eq!(decode(&mut r).as_str().unwrap(), "two");
    assert_eq!(decode(&mut r).as_str().unwrap(), "three");
    assert!(matches!(decode(&mut r).error(), Some(RespError::UnexpectedEof)));
}

#[test]
fn test_display_nested() {
    let v = decode_bytes(b"*2\r\n:1\r\n$2\r\nhi\r\n");
    assert_eq!(v.to_string(), "1) (integer) 1\n2) \"hi\"");
}
