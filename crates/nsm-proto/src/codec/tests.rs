//! Unit tests for the primitive codec.

use std::io::Cursor;

use rstest::rstest;

use super::*;

fn reader(bytes: Vec<u8>) -> WireReader<Cursor<Vec<u8>>> {
    WireReader::new(Cursor::new(bytes))
}

#[rstest]
fn integers_are_big_endian() {
    let mut writer = WireWriter::new(Vec::new());
    writer.write_short(0x0102).expect("write short");
    writer.write_int(0x0304_0506).expect("write int");
    writer.write_long(-2).expect("write long");

    let bytes = writer.into_inner();
    assert_eq!(
        bytes,
        vec![
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe
        ]
    );
}

#[rstest]
#[case(Scalar::Bool(true))]
#[case(Scalar::Char(-5))]
#[case(Scalar::Short(-300))]
#[case(Scalar::Int(123_456))]
#[case(Scalar::Long(-9_876_543_210))]
#[case(Scalar::Float(1.5))]
#[case(Scalar::Double(-0.25))]
fn scalars_occupy_their_fixed_width(#[case] value: Scalar) {
    let mut writer = WireWriter::new(Vec::new());
    writer.write_scalar(value).expect("write scalar");
    let bytes = writer.into_inner();
    assert_eq!(Some(bytes.len()), value.field_type().width());

    let decoded = reader(bytes)
        .read_scalar(value.field_type())
        .expect("read scalar");
    assert_eq!(decoded, value);
}

#[rstest]
fn terminated_strings_include_the_nul_in_their_length() {
    let mut writer = WireWriter::new(Vec::new());
    writer.write_terminated_string("ok").expect("write string");
    assert_eq!(writer.into_inner(), vec![0, 0, 0, 3, b'o', b'k', 0]);
}

#[rstest]
#[case(vec![0, 0, 0, 3, b'a', b'b', 0], "ab")]
#[case(vec![0, 0, 0, 2, b'a', b'b'], "ab")]
#[case(vec![0, 0, 0, 2, 0, 0], "\0")]
#[case(vec![0, 0, 0, 0], "")]
fn reader_strips_exactly_one_trailing_nul(#[case] bytes: Vec<u8>, #[case] expected: &str) {
    assert_eq!(reader(bytes).read_string().expect("read string"), expected);
}

#[rstest]
fn invalid_utf8_is_replaced() {
    let text = reader(vec![0, 0, 0, 2, 0xff, b'x'])
        .read_string()
        .expect("read string");
    assert_eq!(text, "\u{fffd}x");
}

#[rstest]
fn negative_lengths_are_rejected() {
    let error = reader(vec![0xff, 0xff, 0xff, 0xfe])
        .read_string()
        .expect_err("negative length must fail");
    assert!(matches!(error, CodecError::NegativeLength { length: -2 }));
}

#[rstest]
fn oversized_lengths_are_rejected() {
    let error = reader(vec![0x7f, 0xff, 0xff, 0xff])
        .read_string()
        .expect_err("oversized length must fail");
    assert!(matches!(error, CodecError::LengthLimit { .. }));
}

#[rstest]
fn short_reads_are_io_errors() {
    let error = reader(vec![0, 0, 0, 5, b'a'])
        .read_string()
        .expect_err("truncated string must fail");
    assert!(matches!(error, CodecError::Io(_)));
}

#[rstest]
fn composite_types_are_not_scalars() {
    let error = reader(vec![0; 8])
        .read_scalar(FieldType::Text)
        .expect_err("text is not a scalar");
    assert!(matches!(
        error,
        CodecError::NotScalar {
            field_type: FieldType::Text
        }
    ));
}
