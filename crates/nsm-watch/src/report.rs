//! Log lines for inbound updates and cache snapshots.

use tracing::{debug, info};

use nsm_client::ListenerCache;
use nsm_proto::{FieldType, Lookup, Message, RecordKind, TypedRecord};

const UPDATE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::update");
const SNAPSHOT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::snapshot");

/// Logs one inbound message. Record updates go out at info with a one-line
/// field summary; everything else at debug.
pub fn log_update(message: &Message) {
    match message.record() {
        Some(record) => info!(
            target: UPDATE_TARGET,
            command = %message.command(),
            node = message.node(),
            kind = %record.kind(),
            record = record.name(),
            revision = record.revision(),
            fields = %summarise(record),
            "record update"
        ),
        None => debug!(
            target: UPDATE_TARGET,
            command = %message.command(),
            node = message.node(),
            params = ?message.params(),
            payload = message.payload(),
            "message"
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SnapshotEntry {
    pub(crate) kind: RecordKind,
    pub(crate) key: String,
    pub(crate) age_ms: u64,
    pub(crate) fields: String,
}

/// Every cached record, status first, each namespace sorted by key.
pub(crate) fn snapshot(cache: &ListenerCache) -> Vec<SnapshotEntry> {
    [RecordKind::Status, RecordKind::Configuration]
        .into_iter()
        .flat_map(|kind| {
            cache.names(kind).into_iter().filter_map(move |key| {
                let entry = cache.entry(kind, &key)?;
                let age_ms = entry
                    .received_at()
                    .elapsed()
                    .map_or(0, |age| u64::try_from(age.as_millis()).unwrap_or(u64::MAX));
                Some(SnapshotEntry {
                    kind,
                    fields: summarise(entry.record()),
                    key,
                    age_ms,
                })
            })
        })
        .collect()
}

/// Logs one line per cached record with its age and field summary.
pub fn log_snapshot(cache: &ListenerCache) {
    let entries = snapshot(cache);
    for entry in &entries {
        info!(
            target: SNAPSHOT_TARGET,
            kind = %entry.kind,
            key = entry.key,
            age_ms = entry.age_ms,
            fields = %entry.fields,
            "cached record"
        );
    }
    info!(target: SNAPSHOT_TARGET, records = entries.len(), "cache snapshot complete");
}

/// Renders the current value of every top-level field as `name=value`.
///
/// Scalars show their latest value, TEXT is quoted, ENUM shows the selected
/// label and OBJECT arrays show their element count.
#[must_use]
pub fn summarise(record: &TypedRecord) -> String {
    record
        .fields()
        .map(|schema| {
            let name = schema.name();
            let value = match schema.field_type() {
                FieldType::Object => format!("[{}]", record.get_objects(name).len()),
                _ => match record.find(name) {
                    Some(Lookup::Scalar(scalar)) => scalar.to_string(),
                    Some(Lookup::Text(text)) => format!("{text:?}"),
                    Some(Lookup::Enum(value)) => value.selected().to_owned(),
                    Some(Lookup::Record(_)) | None => "-".to_owned(),
                },
            };
            format!("{name}={value}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use nsm_proto::EnumValue;

    use super::*;

    #[rstest]
    fn summarises_configuration_fields_in_order() {
        let mut record = TypedRecord::configuration("daq", "daq_conf");
        record.add_value("threshold", 12_i32).expect("threshold");
        record.set_text("comment", "cosmic run").expect("comment");
        record
            .set_enum(
                "mode",
                EnumValue::new(vec![("LOCAL".to_owned(), 0), ("GLOBAL".to_owned(), 1)], "GLOBAL"),
            )
            .expect("mode");
        record
            .add_objects(
                "crate",
                vec![
                    TypedRecord::configuration("crate", "crate_conf"),
                    TypedRecord::configuration("crate", "crate_conf"),
                ],
            )
            .expect("crates");

        assert_eq!(
            summarise(&record),
            r#"threshold=12 comment="cosmic run" mode=GLOBAL crate=[2]"#
        );
    }

    #[rstest]
    fn snapshots_list_status_before_configuration() {
        let cache = ListenerCache::new();
        let mut status = TypedRecord::status("STATUS", "ECL02");
        status.add_value("rate", 7_i32).expect("rate");
        cache.store(RecordKind::Status, "ECL02", Arc::new(status));
        cache.store(
            RecordKind::Status,
            "ECL01",
            Arc::new(TypedRecord::status("STATUS", "ECL01")),
        );
        let mut config = TypedRecord::configuration("daq", "daq_conf");
        config.set_text("comment", "cosmic run").expect("comment");
        cache.store(RecordKind::Configuration, "daq", Arc::new(config));

        let listed: Vec<_> = snapshot(&cache)
            .into_iter()
            .map(|entry| (entry.kind, entry.key, entry.fields))
            .collect();

        assert_eq!(
            listed,
            vec![
                (RecordKind::Status, "ECL01".to_owned(), String::new()),
                (RecordKind::Status, "ECL02".to_owned(), "rate=7".to_owned()),
                (
                    RecordKind::Configuration,
                    "daq".to_owned(),
                    r#"comment="cosmic run""#.to_owned()
                ),
            ]
        );
    }

    #[rstest]
    fn status_fields_show_their_latest_value() {
        let mut record = TypedRecord::status("STATUS", "ECL01");
        record.add_value("busy", true).expect("busy");
        record.add_value("busy", false).expect("busy");
        record.add_field("rate", FieldType::Int, 1).expect("rate");

        assert_eq!(summarise(&record), "busy=false rate=-");
    }
}
