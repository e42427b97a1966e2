//! Scan Tests
//!
//! Tests for filling typed destinations from frames.

use std::collections::{BTreeMap, HashMap};

use respwire::protocol::{decode, scan, scan_value, ByteReader, Decoder, FromWire, Value};
use respwire::{RespError, Result, TypeError};

fn reader(input: &[u8]) -> ByteReader<&[u8]> {
    ByteReader::new(input)
}

fn decoded(input: &[u8]) -> Value {
    decode(&mut reader(input))
}

// =============================================================================
// Scalars
// =============================================================================

#[test]
fn test_scan_integers() {
    let mut src = reader(b":-123456789101\r\n:23456\r\n");
    let mut big = 0i64;
    let mut small = 0u16;
    scan(&mut src, &mut [&mut big, &mut small]).unwrap();
    assert_eq!(big, -123456789101);
    assert_eq!(small, 23456);
}

#[test]
fn test_scan_integer_out_of_range() {
    let mut small = 0u16;
    let err = scan(&mut reader(b":-1\r\n"), &mut [&mut small]).unwrap_err();
    assert!(matches!(err, RespError::Type(TypeError { from: "Integer", to: "u16" })));
}

#[test]
fn test_scan_simple_strings() {
    let mut src = reader(b"+Hello\r\n+World\r\n");
    let (mut a, mut b) = (String::new(), String::new());
    scan(&mut src, &mut [&mut a, &mut b]).unwrap();
    assert_eq!(a, "Hello");
    assert_eq!(b, "World");
}

#[test]
fn test_scan_malformed_simple_string() {
    let mut s = String::from("unchanged");
    let err = scan(&mut reader(b"+Hel\nlo\r\n"), &mut [&mut s]).unwrap_err();
    assert!(matches!(err, RespError::MalformedSimpleString));
    assert_eq!(s, "unchanged");
}

#[test]
fn test_integer_to_string() {
    let mut s = String::new();
    scan_value(&mut s, &decoded(b":45678910\r\n")).unwrap();
    assert_eq!(s, "45678910");
}

#[test]
fn test_text_to_numbers() {
    let mut n = 0i64;
    scan_value(&mut n, &decoded(b"$4\r\n-250\r\n")).unwrap();
    assert_eq!(n, -250);

    let mut x = 0f64;
    scan_value(&mut x, &decoded(b"+2.5\r\n")).unwrap();
    assert_eq!(x, 2.5);

    let mut flag = false;
    scan_value(&mut flag, &decoded(b"$1\r\n1\r\n")).unwrap();
    assert!(flag);
}

#[test]
fn test_non_numeric_text() {
    let mut n = 0i32;
    let err = scan_value(&mut n, &decoded(b"+abc\r\n")).unwrap_err();
    assert!(matches!(err, RespError::Type(TypeError { from: "SimpleString", to: "i32" })));
    assert_eq!(
        err.to_string(),
        "Scan: unable to coerce SimpleString to i32"
    );
}

#[test]
fn test_wrong_source_kind() {
    let mut n = 0i64;
    let err = scan_value(&mut n, &decoded(b"*1\r\n:1\r\n")).unwrap_err();
    assert!(matches!(err, RespError::Type(TypeError { from: "Array", .. })));

    let err = scan_value(&mut n, &decoded(b"$-1\r\n")).unwrap_err();
    assert!(matches!(err, RespError::Type(TypeError { from: "Nil", .. })));
}

#[test]
fn test_error_frame_stops_scan() {
    let mut src = reader(b":1\r\n-ERR nope\r\n:3\r\n");
    let (mut a, mut b, mut c) = (0i64, 0i64, 0i64);
    let err = scan(&mut src, &mut [&mut a, &mut b, &mut c]).unwrap_err();
    assert!(matches!(err, RespError::Reply(ref m) if m == "ERR nope"));
    assert_eq!((a, b, c), (1, 0, 0));
}

#[test]
fn test_option_destination() {
    let mut v: Option<String> = Some("stale".into());
    scan_value(&mut v, &decoded(b"$-1\r\n")).unwrap();
    assert_eq!(v, None);

    scan_value(&mut v, &decoded(b"$3\r\nnew\r\n")).unwrap();
    assert_eq!(v.as_deref(), Some("new"));
}

#[test]
fn test_value_destination() {
    let mut v = Value::default();
    assert!(v.is_nil());
    scan_value(&mut v, &decoded(b":9\r\n")).unwrap();
    assert_eq!(v.as_int().unwrap(), 9);
}

// =============================================================================
// Collections
// =============================================================================

#[test]
fn test_scan_vec() {
    let mut out: Vec<i64> = vec![99; 5];
    scan_value(&mut out, &decoded(b"*3\r\n:1\r\n$1\r\n2\r\n+3\r\n")).unwrap();
    assert_eq!(out, vec![1, 2, 3]);
}

#[test]
fn test_scan_vec_of_strings() {
    let mut out: Vec<String> = Vec::new();
    scan_value(&mut out, &decoded(b"*2\r\n$3\r\nGET\r\n:5\r\n")).unwrap();
    assert_eq!(out, vec!["GET", "5"]);
}

#[test]
fn test_scan_bytes() {
    let mut out: Vec<u8> = Vec::new();
    scan_value(&mut out, &decoded(b"$3\r\n\x00\x01\x02\r\n")).unwrap();
    assert_eq!(out, vec![0, 1, 2]);
}

#[test]
fn test_fixed_array_shorter_source() {
    let mut out = [7i64; 4];
    scan_value(&mut out, &decoded(b"*2\r\n:1\r\n:2\r\n")).unwrap();
    assert_eq!(out, [1, 2, 0, 0]);
}

#[test]
fn test_fixed_array_longer_source() {
    let mut out = [0i64; 1];
    let err = scan_value(&mut out, &decoded(b"*2\r\n:1\r\n:2\r\n")).unwrap_err();
    assert!(matches!(err, RespError::ArrayLength));
}

#[test]
fn test_scan_map() {
    let mut src = reader(b"*4\r\n+Key 1\r\n:1234\r\n$5\r\nKey 2\r\n:45678910\r\n");
    let mut map: HashMap<String, i64> = HashMap::new();
    scan(&mut src, &mut [&mut map]).unwrap();

    assert_eq!(map.len(), 2);
    assert_eq!(map["Key 1"], 1234);
    assert_eq!(map["Key 2"], 45678910);
}

#[test]
fn test_scan_map_odd_length() {
    let mut map: BTreeMap<String, i64> = BTreeMap::new();
    let err = scan_value(&mut map, &decoded(b"*3\r\n+a\r\n:1\r\n+b\r\n")).unwrap_err();
    assert!(matches!(err, RespError::MapLength));
}

#[test]
fn test_nested_collections() {
    let mut out: Vec<Vec<u16>> = Vec::new();
    scan_value(&mut out, &decoded(b"*2\r\n*2\r\n:1\r\n:2\r\n*0\r\n")).unwrap();
    assert_eq!(out, vec![vec![1, 2], vec![]]);
}

// =============================================================================
// Application Types
// =============================================================================

#[derive(Debug, Default, PartialEq)]
struct Entry {
    key: String,
    hits: u32,
}

impl FromWire for Entry {
    fn from_wire(&mut self, value: &Value) -> Result<()> {
        let [key, hits] = value.items().ok_or(RespError::WrongType)? else {
            return Err(RespError::ArrayLength);
        };
        scan_value(&mut self.key, key)?;
        scan_value(&mut self.hits, hits)
    }
}

#[test]
fn test_custom_destination() {
    let mut entries: Vec<Entry> = Vec::new();
    let input = b"*2\r\n*2\r\n+a\r\n:3\r\n*2\r\n+b\r\n$2\r\n10\r\n";
    scan_value(&mut entries, &decoded(input)).unwrap();
    assert_eq!(
        entries,
        vec![
            Entry { key: "a".into(), hits: 3 },
            Entry { key: "b".into(), hits: 10 },
        ]
    );
}

#[derive(Default)]
struct Fragile;

impl FromWire for Fragile {
    fn from_wire(&mut self, _value: &Value) -> Result<()> {
        panic!("bad conversion")
    }
}

#[test]
fn test_panic_becomes_type_error() {
    let mut f = Fragile;
    let err = scan_value(&mut f, &decoded(b":1\r\n")).unwrap_err();
    assert!(matches!(err, RespError::Type(TypeError { from: "Integer", .. })));
}

#[test]
fn test_decoder_depth_applies_to_scan() {
    let mut out: Vec<Vec<i64>> = Vec::new();
    let err = Decoder::with_max_depth(1)
        .scan(&mut reader(b"*1\r\n*1\r\n:1\r\n"), &mut [&mut out])
        .unwrap_err();
    assert!(matches!(err, RespError::NestingTooDeep { max: 1 }));
}
