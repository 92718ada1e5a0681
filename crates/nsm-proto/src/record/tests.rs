//! Unit tests for typed records.

use std::io::Cursor;

use rstest::{fixture, rstest};

use super::*;
use crate::codec::{WireReader, WireWriter};

fn encode(record: &TypedRecord) -> Vec<u8> {
    let mut writer = WireWriter::new(Vec::new());
    record.encode(&mut writer).expect("encode record");
    writer.into_inner()
}

fn decode(bytes: Vec<u8>, kind: RecordKind) -> Result<TypedRecord, ProtocolError> {
    TypedRecord::decode(&mut WireReader::new(Cursor::new(bytes)), kind)
}

fn crate_record(slot: i32) -> TypedRecord {
    let mut module = TypedRecord::configuration("module", "ecl_module");
    module.add_value("threshold", slot * 10).expect("threshold");
    module.set_text("serial", format!("M-{slot}")).expect("serial");

    let mut record = TypedRecord::configuration("crate", "ecl_crate");
    record.add_value("leaf", slot).expect("leaf");
    record.add_objects("module", [module]).expect("modules");
    record
}

#[fixture]
fn configuration() -> TypedRecord {
    let mut record = TypedRecord::configuration("ecl_daq", "ecl_daq_conf")
        .with_id(7)
        .with_table("daq")
        .with_revision(3);
    record.add_value("enabled", true).expect("enabled");
    record.add_value("gain", 2.5_f64).expect("gain");
    record.add_value("mask", 0x0f_i16).expect("mask");
    record.set_text("runtype", "physics").expect("runtype");
    record
        .set_enum(
            "trigger",
            EnumValue::new(
                vec![("gdl".to_owned(), 1), ("pulse".to_owned(), 2)],
                "pulse",
            ),
        )
        .expect("trigger");
    record
        .add_objects("outer", [crate_record(41), crate_record(42)])
        .expect("outer");
    record
}

#[fixture]
fn status() -> TypedRecord {
    let mut record = TypedRecord::status("ECL_STATUS", "ECL01").with_revision(2);
    record.add_field("rate", FieldType::Float, 0).expect("rate");
    record.add_field("adc", FieldType::Int, 3).expect("adc");
    record.add_value("rate", 120.5_f32).expect("rate value");
    for sample in [5, 6, 7, 8] {
        record.add_value("adc", sample).expect("adc value");
    }
    record
}

#[rstest]
fn configuration_round_trips_with_nested_objects(configuration: TypedRecord) {
    let decoded =
        decode(encode(&configuration), RecordKind::Configuration).expect("decode configuration");
    assert_eq!(decoded, configuration);
    assert_eq!(decoded.format_name(), Some("ecl_daq_conf"));
    assert_eq!(decoded.get_text("outer[1].module.serial"), "M-42");
    assert_eq!(decoded.get_enum("trigger").map(EnumValue::value), Some(2));
}

#[rstest]
fn status_encodes_the_latest_window(status: TypedRecord) {
    let decoded = decode(encode(&status), RecordKind::Status).expect("decode status");
    assert_eq!(decoded.node(), Some("ECL01"));
    assert_eq!(decoded.history("adc"), &[Scalar::Int(6), Scalar::Int(7), Scalar::Int(8)]);
    assert_eq!(decoded.get_int("adc[0]"), 6);
    assert_eq!(decoded.get_int("adc"), 8);
    assert!((decoded.get_float("rate") - 120.5).abs() < f32::EPSILON);
}

#[rstest]
fn short_status_history_is_zero_padded_at_the_front() {
    let mut record = TypedRecord::status("HV", "HV01");
    record.add_field("channels", FieldType::Short, 3).expect("channels");
    record.add_value("channels", 9_i16).expect("value");

    let decoded = decode(encode(&record), RecordKind::Status).expect("decode");
    assert_eq!(
        decoded.history("channels"),
        &[Scalar::Short(0), Scalar::Short(0), Scalar::Short(9)]
    );
}

#[rstest]
fn path_lookup_resolves_indices_and_defaults(configuration: TypedRecord) {
    assert_eq!(configuration.get_int("outer[1].leaf"), 42);
    assert_eq!(configuration.get_int("outer.leaf"), 41);
    assert_eq!(configuration.get_int("outer[0].module[0].threshold"), 410);
    assert!(configuration.get_object("outer[1]").is_some());
    assert!(configuration.get_object("outer[2]").is_none());
    assert_eq!(configuration.find("outer[9].leaf"), None);
}

#[rstest]
fn missing_values_read_as_zero(configuration: TypedRecord) {
    assert_eq!(configuration.get_int("absent"), 0);
    assert!(!configuration.get_bool("absent"));
    assert_eq!(configuration.get_text("absent"), "");
    assert_eq!(configuration.get_int("runtype"), 0);
}

#[rstest]
fn has_value_only_reports_scalars(configuration: TypedRecord) {
    assert!(configuration.has_value("gain"));
    assert!(!configuration.has_value("runtype"));
    assert!(!configuration.has_value("trigger"));
    assert!(!configuration.has_value("outer"));
}

#[rstest]
fn configuration_values_overwrite_while_status_values_append() {
    let mut config = TypedRecord::configuration("c", "f");
    config.add_value("count", 1).expect("first");
    config.add_value("count", 2).expect("second");
    assert_eq!(config.history("count"), &[Scalar::Int(2)]);

    let mut status = TypedRecord::status("s", "n");
    status.add_value("count", 1).expect("first");
    status.add_value("count", 2).expect("second");
    assert_eq!(status.history("count"), &[Scalar::Int(1), Scalar::Int(2)]);
}

#[rstest]
fn values_are_cast_to_the_declared_type() {
    let mut record = TypedRecord::configuration("c", "f");
    record.add_field("ratio", FieldType::Double, 0).expect("declare");
    record.add_value("ratio", 3).expect("value");
    assert_eq!(record.history("ratio"), &[Scalar::Double(3.0)]);
}

#[rstest]
fn add_field_declares_once() {
    let mut record = TypedRecord::configuration("c", "f");
    assert!(record.add_field("x", FieldType::Int, 0).expect("first"));
    assert!(!record.add_field("x", FieldType::Double, 0).expect("second"));
    assert_eq!(record.field_type("x"), Some(FieldType::Int));
    assert_eq!(record.len(), 1);
}

#[rstest]
fn object_declarations_create_empty_nested_records() {
    let mut record = TypedRecord::configuration("c", "f");
    record.add_field("slots", FieldType::Object, 4).expect("declare");
    assert_eq!(record.get_objects("slots").len(), 4);

    let slot = record.object_mut("slots[2]").expect("slot exists");
    slot.add_value("gain", 5).expect("gain");
    assert_eq!(record.get_int("slots[2].gain"), 5);
}

#[rstest]
#[case(FieldType::Text)]
#[case(FieldType::Enum)]
fn status_records_reject_text_and_enum(#[case] field_type: FieldType) {
    let mut record = TypedRecord::status("s", "n");
    let error = record
        .add_field("label", field_type, 0)
        .expect_err("status must reject");
    assert!(matches!(error, ProtocolError::UnsupportedField { .. }));
}

#[rstest]
fn select_enum_rejects_unknown_labels(mut configuration: TypedRecord) {
    configuration.select_enum("trigger", "gdl").expect("known label");
    assert_eq!(configuration.get_int("trigger"), 1);
    let error = configuration
        .select_enum("trigger", "random")
        .expect_err("unknown label");
    assert!(matches!(error, ProtocolError::UnknownEnumLabel { .. }));
}

#[rstest]
fn nested_records_must_share_the_parent_kind() {
    let mut record = TypedRecord::configuration("c", "f");
    let error = record
        .add_objects("child", [TypedRecord::status("s", "n")])
        .expect_err("kind mismatch");
    assert!(matches!(error, ProtocolError::RecordKindMismatch { .. }));
}

#[rstest]
fn objects_of_objects_round_trip_for_status_records() {
    let mut leaf = TypedRecord::status("leaf", "n");
    leaf.add_value("v", 1_i64).expect("v");
    let mut middle = TypedRecord::status("middle", "n");
    middle.add_objects("leaves", [leaf.clone(), leaf]).expect("leaves");
    let mut root = TypedRecord::status("root", "n");
    root.add_objects("middles", [middle]).expect("middles");

    let decoded = decode(encode(&root), RecordKind::Status).expect("decode");
    assert_eq!(decoded, root);
    assert_eq!(decoded.get_long("middles.leaves[1].v"), 1);
}

#[rstest]
fn unknown_type_tags_are_malformed() {
    let mut writer = WireWriter::new(Vec::new());
    writer.write_int(0).expect("id");
    for text in ["r", "f", ""] {
        writer.write_string(text).expect("header");
    }
    writer.write_int(0).expect("revision");
    writer.write_int(1).expect("field count");
    writer.write_string("x").expect("name");
    writer.write_int(99).expect("tag");

    let error = decode(writer.into_inner(), RecordKind::Configuration).expect_err("bad tag");
    assert!(matches!(error, ProtocolError::UnknownFieldType { tag: 99 }));
}

#[rstest]
fn excessive_nesting_is_malformed() {
    let mut writer = WireWriter::new(Vec::new());
    for _ in 0..=MAX_NESTING_DEPTH {
        writer.write_int(0).expect("id");
        for text in ["r", "f", ""] {
            writer.write_string(text).expect("header");
        }
        writer.write_int(0).expect("revision");
        writer.write_int(1).expect("field count");
        writer.write_string("child").expect("name");
        writer.write_int(FieldType::Object.tag()).expect("tag");
        writer.write_int(1).expect("object count");
    }

    let error = decode(writer.into_inner(), RecordKind::Configuration).expect_err("too deep");
    assert!(matches!(error, ProtocolError::NestingTooDeep { .. }));
}

#[rstest]
fn truncated_records_are_transport_errors(configuration: TypedRecord) {
    let mut bytes = encode(&configuration);
    bytes.truncate(bytes.len() / 2);
    let error = decode(bytes, RecordKind::Configuration).expect_err("truncated");
    assert!(error.is_transport());
}
